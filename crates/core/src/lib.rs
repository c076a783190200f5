pub mod bill;
pub mod config;
pub mod money;

pub use bill::{Bill, BillId, Diner, DinerId, DinerSummary, Item, SplitError};
pub use config::{AppConfig, ConfigError, OcrConfig};
pub use money::Money;
