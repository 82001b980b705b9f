use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockpile_core::{DomainError, DomainResult, PurchaseId, StoreId, UserId, VariantId};

/// One purchased line: a variant, a quantity, and what it cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseLine {
    pub variant_id: VariantId,
    pub quantity: i64,
    pub unit_cost_cents: i64,
}

/// Input for creating a purchase.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewPurchase {
    pub store_id: StoreId,
    pub supplier: String,
    pub reference: Option<String>,
    pub lines: Vec<PurchaseLine>,
    pub user_id: UserId,
}

/// A received purchase.
///
/// Purchases are received on creation: the storage layer credits the store's
/// inventory for every line and appends `purchase` ledger entries in the same
/// commit that persists this entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: PurchaseId,
    pub store_id: StoreId,
    pub supplier: String,
    pub reference: Option<String>,
    pub lines: Vec<PurchaseLine>,
    pub user_id: UserId,
    pub received_at: DateTime<Utc>,
}

impl Purchase {
    pub fn new(id: PurchaseId, cmd: NewPurchase, at: DateTime<Utc>) -> DomainResult<Self> {
        if cmd.supplier.trim().is_empty() {
            return Err(DomainError::field("supplier", "cannot be empty"));
        }
        if cmd.lines.is_empty() {
            return Err(DomainError::field("lines", "cannot be empty"));
        }
        for line in &cmd.lines {
            if line.quantity <= 0 {
                return Err(DomainError::field("lines.quantity", "must be greater than zero"));
            }
            if line.unit_cost_cents < 0 {
                return Err(DomainError::field("lines.unit_cost_cents", "cannot be negative"));
            }
        }

        Ok(Self {
            id,
            store_id: cmd.store_id,
            supplier: cmd.supplier,
            reference: cmd.reference,
            lines: cmd.lines,
            user_id: cmd.user_id,
            received_at: at,
        })
    }

    pub fn total_cost_cents(&self) -> i64 {
        self.lines
            .iter()
            .map(|l| l.quantity * l.unit_cost_cents)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(lines: Vec<PurchaseLine>) -> NewPurchase {
        NewPurchase {
            store_id: StoreId::new(),
            supplier: "Acme Wholesale".to_string(),
            reference: Some("PO-1042".to_string()),
            lines,
            user_id: UserId::new(),
        }
    }

    fn line(quantity: i64, unit_cost_cents: i64) -> PurchaseLine {
        PurchaseLine {
            variant_id: VariantId::new(),
            quantity,
            unit_cost_cents,
        }
    }

    #[test]
    fn totals_sum_across_lines() {
        let p = Purchase::new(
            PurchaseId::new(),
            cmd(vec![line(10, 250), line(4, 1_000)]),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(p.total_cost_cents(), 6_500);
    }

    #[test]
    fn empty_lines_are_rejected() {
        let err = Purchase::new(PurchaseId::new(), cmd(vec![]), Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation { field: Some(f), .. } if f == "lines"));
    }

    #[test]
    fn non_positive_line_quantity_is_rejected() {
        let err = Purchase::new(PurchaseId::new(), cmd(vec![line(0, 100)]), Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
    }

    #[test]
    fn blank_supplier_is_rejected() {
        let mut c = cmd(vec![line(1, 100)]);
        c.supplier = "  ".to_string();
        assert!(Purchase::new(PurchaseId::new(), c, Utc::now()).is_err());
    }
}
