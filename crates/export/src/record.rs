use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use divvy_core::{Bill, BillId, DinerId, Money};

/// The serializable per-bill record handed to persistence and share targets.
/// Assignment state stays out of it: the record is a snapshot of what was
/// charged and who was at the table, not of the editing session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillRecord {
    pub id: BillId,
    pub date: DateTime<Utc>,
    pub items: Vec<ItemRecord>,
    pub diners: Vec<DinerRecord>,
    pub total_amount: Money,
    pub tip_percentage: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub description: String,
    pub price: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DinerRecord {
    pub id: DinerId,
    pub name: String,
    pub tip_percentage: Decimal,
}

impl From<&Bill> for BillRecord {
    fn from(bill: &Bill) -> Self {
        BillRecord {
            id: bill.id,
            date: bill.date,
            items: bill
                .items()
                .iter()
                .map(|i| ItemRecord { description: i.description.clone(), price: i.price })
                .collect(),
            diners: bill
                .diners()
                .iter()
                .map(|d| DinerRecord {
                    id: d.id,
                    name: d.name.clone(),
                    tip_percentage: d.tip_percentage,
                })
                .collect(),
            total_amount: bill.total_amount(),
            tip_percentage: bill.tip_percentage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use divvy_core::Item;

    fn sample_bill() -> Bill {
        let mut bill = Bill::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 21, 30, 0).unwrap(),
            vec![
                Item::new("Hamburguesa", Money::from_cents(1099)),
                Item::new("Refresco", Money::from_cents(250)),
            ],
            vec![],
            Decimal::from(15),
        );
        bill.add_diner("Juan", Decimal::from(15));
        bill
    }

    #[test]
    fn record_mirrors_the_bill() {
        let bill = sample_bill();
        let record = BillRecord::from(&bill);
        assert_eq!(record.id, bill.id);
        assert_eq!(record.items.len(), 2);
        assert_eq!(record.diners.len(), 1);
        assert_eq!(record.total_amount, Money::from_cents(1349));
        assert_eq!(record.tip_percentage, Decimal::from(15));
    }

    #[test]
    fn record_serde_round_trips() {
        let record = BillRecord::from(&sample_bill());
        let json = serde_json::to_string(&record).unwrap();
        let back: BillRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn date_is_iso_8601_on_the_wire() {
        let record = BillRecord::from(&sample_bill());
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("2024-06-01T21:30:00Z"), "json was {json}");
    }

    #[test]
    fn prices_serialize_as_exact_decimal_strings() {
        let record = BillRecord::from(&sample_bill());
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"10.99\""), "json was {json}");
    }

    #[test]
    fn diner_id_survives_round_trip() {
        let bill = sample_bill();
        let record = BillRecord::from(&bill);
        let json = serde_json::to_string(&record).unwrap();
        let back: BillRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.diners[0].id, bill.diners()[0].id);
    }
}
