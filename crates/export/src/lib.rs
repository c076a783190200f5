pub mod record;
pub mod summary;

pub use record::{BillRecord, DinerRecord, ItemRecord};
pub use summary::{
    bill_text_summary, diner_text_summary, export_json_file, write_json, ExportError,
};
