use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use super::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BillId(pub Uuid);

impl BillId {
    pub fn new() -> Self {
        BillId(Uuid::new_v4())
    }
}

impl Default for BillId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BillId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for BillId {
    type Err = uuid::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(BillId(Uuid::parse_str(s)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DinerId(pub Uuid);

impl DinerId {
    pub fn new() -> Self {
        DinerId(Uuid::new_v4())
    }
}

impl Default for DinerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DinerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for DinerId {
    type Err = uuid::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(DinerId(Uuid::parse_str(s)?))
    }
}

/// One charge line from a receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub description: String,
    pub price: Money,
    pub assigned_to: Option<DinerId>,
}

impl Item {
    pub fn new(description: impl Into<String>, price: Money) -> Self {
        Item { description: description.into(), price, assigned_to: None }
    }
}

/// A participant among whom the bill is split. Diners never own items: the
/// bill's item collection is authoritative, and a diner's "items" are the
/// subset currently assigned to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diner {
    pub id: DinerId,
    pub name: String,
    pub tip_percentage: Decimal,
}

impl Diner {
    pub fn new(name: impl Into<String>, tip_percentage: Decimal) -> Self {
        Diner { id: DinerId::new(), name: name.into(), tip_percentage }
    }
}

/// The flattened per-diner view handed to export/share collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DinerSummary {
    pub name: String,
    pub items: Vec<Item>,
    pub subtotal: Money,
    pub tip_amount: Money,
    pub total: Money,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SplitError {
    #[error("item index {0} is out of range")]
    ItemOutOfRange(usize),
    #[error("diner not found: {0}")]
    DinerNotFound(DinerId),
}

/// The aggregate of items, diners, and tip policy for one receipt.
///
/// `items` is the single source of truth; every `assigned_to`, if set, must
/// reference a diner present in `diners`. Mutation goes through the
/// assignment operations below, which uphold that invariant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bill {
    pub id: BillId,
    pub date: DateTime<Utc>,
    items: Vec<Item>,
    diners: Vec<Diner>,
    pub tip_percentage: Decimal,
}

impl Bill {
    /// Build a bill from finalized items and diners. Items arriving with an
    /// assignment to an unknown diner are treated as unassigned.
    pub fn new(
        date: DateTime<Utc>,
        mut items: Vec<Item>,
        diners: Vec<Diner>,
        tip_percentage: Decimal,
    ) -> Self {
        for item in &mut items {
            if let Some(d) = item.assigned_to {
                if !diners.iter().any(|diner| diner.id == d) {
                    item.assigned_to = None;
                }
            }
        }
        Bill { id: BillId::new(), date, items, diners, tip_percentage }
    }

    /// Rebuild a bill from persisted parts. Unlike [`Bill::new`], a dangling
    /// diner reference is an error here: the store should never have produced
    /// one.
    pub fn restore(
        id: BillId,
        date: DateTime<Utc>,
        items: Vec<Item>,
        diners: Vec<Diner>,
        tip_percentage: Decimal,
    ) -> Result<Self, SplitError> {
        for item in &items {
            if let Some(d) = item.assigned_to {
                if !diners.iter().any(|diner| diner.id == d) {
                    return Err(SplitError::DinerNotFound(d));
                }
            }
        }
        Ok(Bill { id, date, items, diners, tip_percentage })
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn diners(&self) -> &[Diner] {
        &self.diners
    }

    pub fn diner(&self, diner_id: DinerId) -> Option<&Diner> {
        self.diners.iter().find(|d| d.id == diner_id)
    }

    // ── Mutation ─────────────────────────────────────────────────────────────

    /// Assign the item at `index` to `diner_id`. Nothing is mutated when
    /// either side of the assignment is invalid.
    pub fn assign_item(&mut self, index: usize, diner_id: DinerId) -> Result<(), SplitError> {
        if self.diner(diner_id).is_none() {
            return Err(SplitError::DinerNotFound(diner_id));
        }
        let item = self
            .items
            .get_mut(index)
            .ok_or(SplitError::ItemOutOfRange(index))?;
        item.assigned_to = Some(diner_id);
        Ok(())
    }

    /// Return the item at `index` to the shared/unallocated pool.
    pub fn unassign_item(&mut self, index: usize) -> Result<(), SplitError> {
        let item = self
            .items
            .get_mut(index)
            .ok_or(SplitError::ItemOutOfRange(index))?;
        item.assigned_to = None;
        Ok(())
    }

    pub fn add_diner(&mut self, name: impl Into<String>, tip_percentage: Decimal) -> DinerId {
        let diner = Diner::new(name, tip_percentage);
        let id = diner.id;
        self.diners.push(diner);
        id
    }

    /// Remove a diner. Items assigned to it become unassigned; they must
    /// never be left pointing at a diner the bill no longer knows.
    pub fn remove_diner(&mut self, diner_id: DinerId) -> Result<(), SplitError> {
        let pos = self
            .diners
            .iter()
            .position(|d| d.id == diner_id)
            .ok_or(SplitError::DinerNotFound(diner_id))?;
        self.diners.remove(pos);
        for item in &mut self.items {
            if item.assigned_to == Some(diner_id) {
                item.assigned_to = None;
            }
        }
        Ok(())
    }

    // ── Arithmetic ───────────────────────────────────────────────────────────

    /// Sum of all item prices, assigned or not.
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(|i| i.price).sum()
    }

    /// Bill-level tip on the full subtotal, at the bill's default percentage.
    pub fn tip_amount(&self) -> Money {
        self.subtotal().percent_of(self.tip_percentage)
    }

    pub fn total(&self) -> Money {
        self.subtotal() + self.tip_amount()
    }

    /// Computed authoritative total. An OCR-reported total is only ever
    /// compared against this, never stored in its place.
    pub fn total_amount(&self) -> Money {
        self.subtotal()
    }

    pub fn diner_items(&self, diner_id: DinerId) -> impl Iterator<Item = &Item> {
        self.items
            .iter()
            .filter(move |i| i.assigned_to == Some(diner_id))
    }

    pub fn diner_subtotal(&self, diner_id: DinerId) -> Money {
        self.diner_items(diner_id).map(|i| i.price).sum()
    }

    /// Tip on the diner's subtotal at the diner's own percentage.
    pub fn diner_tip(&self, diner_id: DinerId) -> Result<Money, SplitError> {
        let diner = self
            .diner(diner_id)
            .ok_or(SplitError::DinerNotFound(diner_id))?;
        Ok(self.diner_subtotal(diner_id).percent_of(diner.tip_percentage))
    }

    pub fn diner_total(&self, diner_id: DinerId) -> Result<Money, SplitError> {
        Ok(self.diner_subtotal(diner_id) + self.diner_tip(diner_id)?)
    }

    /// Items nobody has claimed. Counted in the bill subtotal, excluded from
    /// every diner's share, and surfaced so the caller can deal with them.
    pub fn unassigned_items(&self) -> impl Iterator<Item = &Item> {
        self.items.iter().filter(|i| i.assigned_to.is_none())
    }

    pub fn get_diner_summary(&self, diner_id: DinerId) -> Result<DinerSummary, SplitError> {
        let diner = self
            .diner(diner_id)
            .ok_or(SplitError::DinerNotFound(diner_id))?;
        let subtotal = self.diner_subtotal(diner_id);
        let tip_amount = subtotal.percent_of(diner.tip_percentage);
        Ok(DinerSummary {
            name: diner.name.clone(),
            items: self.diner_items(diner_id).cloned().collect(),
            subtotal,
            tip_amount,
            total: subtotal + tip_amount,
        })
    }
}
