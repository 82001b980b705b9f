//! `stockpile-api` — HTTP surface over the inventory system.

pub mod app;
pub mod authz;
pub mod context;
pub mod middleware;
