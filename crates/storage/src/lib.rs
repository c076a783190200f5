pub mod backup;
pub mod db;

pub use backup::{backup_database, restore_database};
pub use db::{
    clear_bills, create_db, delete_bill, get_bill, list_bills, save_bill, BillSummaryRow, DbPool,
    StorageError,
};
