use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockpile_core::{DomainError, DomainResult, InventoryId, StoreId, VariantId};

/// Stock of one product variant at one store.
///
/// # Invariants
/// - `quantity >= 0` at all times.
/// - Quantity changes only through [`InventoryRecord::apply_delta`], and every
///   caller pairs the change with a ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub id: InventoryId,
    pub variant_id: VariantId,
    pub store_id: StoreId,
    pub quantity: i64,
    pub low_stock_threshold: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryRecord {
    pub fn new(
        id: InventoryId,
        variant_id: VariantId,
        store_id: StoreId,
        quantity: i64,
        low_stock_threshold: i64,
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if quantity < 0 {
            return Err(DomainError::field("quantity", "cannot be negative"));
        }
        if low_stock_threshold < 0 {
            return Err(DomainError::field("low_stock_threshold", "cannot be negative"));
        }

        Ok(Self {
            id,
            variant_id,
            store_id,
            quantity,
            low_stock_threshold,
            created_at: at,
            updated_at: at,
        })
    }

    /// Apply a signed stock delta.
    ///
    /// A delta that would drive the quantity negative fails with
    /// `InsufficientStock` and leaves the record untouched.
    pub fn apply_delta(&mut self, delta: i64, at: DateTime<Utc>) -> DomainResult<()> {
        if delta == 0 {
            return Err(DomainError::validation("delta cannot be zero"));
        }

        let next = self.quantity + delta;
        if next < 0 {
            return Err(DomainError::insufficient_stock(self.quantity, -delta));
        }

        self.quantity = next;
        self.updated_at = at;
        Ok(())
    }

    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.low_stock_threshold
    }
}
