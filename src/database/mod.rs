pub mod a1;
pub mod attendee_repo;
pub mod google_sheets;
pub mod memory_sheet;
pub mod service_account;
pub mod sheet_client;

pub use google_sheets::GoogleSheetsClient;
pub use memory_sheet::MemorySheet;
pub use sheet_client::{CellPosition, SheetClient, SheetError};
