//! `stockpile-inventory` — per-store stock records, the transaction ledger,
//! and the transfer status workflow.

pub mod ledger;
pub mod record;
pub mod transfer;

pub use ledger::{EntryType, LedgerEntry};
pub use record::InventoryRecord;
pub use transfer::{NewTransfer, StockEffect, Transfer, TransferStatus};
