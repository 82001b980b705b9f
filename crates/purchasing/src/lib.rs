//! `stockpile-purchasing` — purchases: stock intake from suppliers.

pub mod purchase;

pub use purchase::{NewPurchase, Purchase, PurchaseLine};
