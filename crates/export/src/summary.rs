use std::fmt::Write as _;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

use divvy_core::{Bill, DinerId, SplitError};

use crate::record::BillRecord;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Split(#[from] SplitError),
}

const RULE: &str = "==================================================";

/// Flattened share text for one diner: their items, subtotal, tip, total.
pub fn diner_text_summary(bill: &Bill, diner_id: DinerId) -> Result<String, SplitError> {
    let diner = bill
        .diner(diner_id)
        .ok_or(SplitError::DinerNotFound(diner_id))?;
    let tip_pct = diner.tip_percentage;
    let summary = bill.get_diner_summary(diner_id)?;

    let mut out = String::new();
    let _ = writeln!(out, "Bill summary for {}", summary.name);
    let _ = writeln!(out, "{RULE}");
    for item in &summary.items {
        let _ = writeln!(out, "{}: {}", item.description, item.price);
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Subtotal: {}", summary.subtotal);
    let _ = writeln!(out, "Tip ({tip_pct}%): {}", summary.tip_amount);
    let _ = writeln!(out, "Total: {}", summary.total);
    Ok(out)
}

/// Whole-bill share text: every item with its assignee, shared items called
/// out, then the bill-level arithmetic.
pub fn bill_text_summary(bill: &Bill) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Bill from {}", bill.date.format("%Y-%m-%d %H:%M"));
    let _ = writeln!(out, "{RULE}");
    for item in bill.items() {
        let assignee = item
            .assigned_to
            .and_then(|id| bill.diner(id))
            .map(|d| d.name.as_str())
            .unwrap_or("shared");
        let _ = writeln!(out, "{}: {} ({assignee})", item.description, item.price);
    }

    let shared = bill.unassigned_items().count();
    if shared > 0 {
        let _ = writeln!(out);
        let _ = writeln!(out, "{shared} item(s) not assigned to anyone");
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Subtotal: {}", bill.subtotal());
    let _ = writeln!(out, "Tip ({}%): {}", bill.tip_percentage, bill.tip_amount());
    let _ = writeln!(out, "Total: {}", bill.total());
    out
}

/// Serialize the bill's export record as pretty JSON.
pub fn write_json<W: Write>(bill: &Bill, writer: W) -> Result<(), ExportError> {
    serde_json::to_writer_pretty(writer, &BillRecord::from(bill))?;
    Ok(())
}

/// Write the JSON record into `dir` under a timestamped name and return the
/// path.
pub fn export_json_file(bill: &Bill, dir: &Path) -> Result<PathBuf, ExportError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("bill_{}.json", bill.date.format("%Y%m%d_%H%M%S")));
    let file = std::fs::File::create(&path)?;
    write_json(bill, file)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use divvy_core::{Item, Money};
    use rust_decimal::Decimal;

    fn sample_bill() -> (Bill, DinerId) {
        let mut bill = Bill::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 21, 30, 0).unwrap(),
            vec![
                Item::new("Hamburguesa", Money::from_cents(1099)),
                Item::new("Refresco", Money::from_cents(250)),
                Item::new("Papas fritas", Money::from_cents(399)),
            ],
            vec![],
            Decimal::from(15),
        );
        let juan = bill.add_diner("Juan", Decimal::from(15));
        bill.assign_item(0, juan).unwrap();
        bill.assign_item(1, juan).unwrap();
        (bill, juan)
    }

    #[test]
    fn diner_summary_lists_items_and_arithmetic() {
        let (bill, juan) = sample_bill();
        let text = diner_text_summary(&bill, juan).unwrap();
        assert!(text.contains("Bill summary for Juan"));
        assert!(text.contains("Hamburguesa: $10.99"));
        assert!(text.contains("Refresco: $2.50"));
        assert!(!text.contains("Papas fritas"));
        assert!(text.contains("Subtotal: $13.49"));
        assert!(text.contains("Tip (15%): $2.02"));
        assert!(text.contains("Total: $15.51"));
    }

    #[test]
    fn diner_summary_unknown_diner_errors() {
        let (bill, _) = sample_bill();
        let ghost = DinerId::new();
        assert_eq!(
            diner_text_summary(&bill, ghost).unwrap_err(),
            SplitError::DinerNotFound(ghost)
        );
    }

    #[test]
    fn bill_summary_surfaces_shared_items() {
        let (bill, _) = sample_bill();
        let text = bill_text_summary(&bill);
        assert!(text.contains("Papas fritas: $3.99 (shared)"));
        assert!(text.contains("1 item(s) not assigned to anyone"));
        assert!(text.contains("Subtotal: $17.48"));
        assert!(text.contains("Tip (15%): $2.62"));
        assert!(text.contains("Total: $20.10"));
    }

    #[test]
    fn json_export_writes_parseable_record() {
        let (bill, _) = sample_bill();
        let mut buf = Vec::new();
        write_json(&bill, &mut buf).unwrap();
        let record: crate::record::BillRecord = serde_json::from_slice(&buf).unwrap();
        assert_eq!(record.items.len(), 3);
        assert_eq!(record.total_amount, Money::from_cents(1748));
    }

    #[test]
    fn json_file_is_timestamped() {
        let (bill, _) = sample_bill();
        let dir = tempfile::tempdir().unwrap();
        let path = export_json_file(&bill, dir.path()).unwrap();
        assert!(path.exists());
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "bill_20240601_213000.json"
        );
    }
}
