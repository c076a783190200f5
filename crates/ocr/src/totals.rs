use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_total,
    r"(?i)\b(?:total|grand\s+total|amount\s+due|total\s+due|total\s+a\s+pagar|importe)\s*[:\$]?\s*\$?\s*([\d.,]*\d[.,]\d{2})\b");
re!(re_subtotal,
    r"(?i)\bsub\s*total\b\s*[:\$]?\s*\$?\s*([\d.,]*\d[.,]\d{2})\b");
re!(re_tax,
    r"(?i)\b(?:tax|vat|iva)\b\s*[:\$]?\s*\$?\s*([\d.,]*\d[.,]\d{2})\b");
re!(re_summary_label,
    r"(?i)^\s*(?:sub\s*total|total(?:\s+a\s+pagar|\s+due)?|grand\s+total|amount\s+due|importe|tax|vat|iva|propina|tip|servicio|service|cash|efectivo|change|cambio)\b");

// ── Extraction ───────────────────────────────────────────────────────────────

/// The total printed on the ticket, if a labeled line carries one. Used only
/// to reconcile the parsed items, never as the bill's own total.
pub fn expected_total(text: &str) -> Option<Decimal> {
    let c = re_total().captures(text)?;
    parse_amount_str(c.get(1)?.as_str())
}

pub fn printed_subtotal(text: &str) -> Option<Decimal> {
    let c = re_subtotal().captures(text)?;
    parse_amount_str(c.get(1)?.as_str())
}

pub fn printed_tax(text: &str) -> Option<Decimal> {
    let c = re_tax().captures(text)?;
    parse_amount_str(c.get(1)?.as_str())
}

/// Whether a line is receipt bookkeeping (total, subtotal, tax, tip, change)
/// rather than a charge. The pipeline keeps these out of the item list while
/// still reconciling against the printed total.
pub fn is_summary_line(line: &str) -> bool {
    re_summary_label().is_match(line)
}

/// Normalize `1,234.56`, `1.234,56`, and `17,48` alike: the last separator is
/// the decimal point, every other one is grouping noise.
fn parse_amount_str(s: &str) -> Option<Decimal> {
    let sep = s.rfind(['.', ',']);
    let mut clean = String::with_capacity(s.len());
    for (i, c) in s.char_indices() {
        match c {
            '.' | ',' if Some(i) != sep => {}
            ',' => clean.push('.'),
            c => clean.push(c),
        }
    }
    Decimal::from_str(&clean).ok()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
