use divvy_core::{Item, Money};
use serde::{Deserialize, Serialize};

/// A `(description, price)` candidate recovered from one receipt line.
/// Candidates become [`Item`]s once the user confirms the parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedItem {
    pub description: String,
    pub price: Money,
}

impl ParsedItem {
    pub fn new(description: impl Into<String>, price: Money) -> Self {
        ParsedItem { description: description.into(), price }
    }
}

impl From<ParsedItem> for Item {
    fn from(p: ParsedItem) -> Self {
        Item::new(p.description, p.price)
    }
}
