//! `stockpile-catalog` — products, variants, and attribute values.

pub mod product;

pub use product::{AttributeValue, NewVariant, Product, Variant};
