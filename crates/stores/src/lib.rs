//! `stockpile-stores` — store directory.

pub mod store;

pub use store::Store;
