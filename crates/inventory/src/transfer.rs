//! Inventory transfer workflow.
//!
//! A transfer moves stock of one variant between two stores through an
//! auditable status lifecycle:
//!
//! ```text
//! pending ──► in_transit ──► completed
//!    │             │
//!    └──► cancelled ◄┘   (restores source stock when leaving in_transit)
//! ```
//!
//! The state machine here is pure: transitions mutate the transfer and report
//! the stock movement to perform as a [`StockEffect`]. The storage layer is
//! responsible for applying that effect, appending the matching ledger entry,
//! and committing all of it atomically.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockpile_core::{DomainError, DomainResult, StoreId, TransferId, UserId, VariantId};

use crate::ledger::EntryType;

/// Transfer status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Pending,
    InTransit,
    Completed,
    Cancelled,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "pending",
            TransferStatus::InTransit => "in_transit",
            TransferStatus::Completed => "completed",
            TransferStatus::Cancelled => "cancelled",
        }
    }
}

impl core::str::FromStr for TransferStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransferStatus::Pending),
            "in_transit" => Ok(TransferStatus::InTransit),
            "completed" => Ok(TransferStatus::Completed),
            "cancelled" => Ok(TransferStatus::Cancelled),
            other => Err(DomainError::field(
                "status",
                format!("unknown transfer status '{other}'"),
            )),
        }
    }
}

impl core::fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input for creating a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewTransfer {
    pub from_store_id: StoreId,
    pub to_store_id: StoreId,
    pub variant_id: VariantId,
    pub quantity: i64,
    pub notes: Option<String>,
    pub user_id: UserId,
}

/// A stock movement a transition requires: `delta` against the inventory
/// record of `variant` at `store_id`, audited as `entry_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockEffect {
    pub store_id: StoreId,
    pub delta: i64,
    pub entry_type: EntryType,
}

/// The transfer workflow entity.
///
/// # Invariants
/// - `from_store_id != to_store_id`
/// - `quantity > 0`
/// - status changes only through [`Transfer::transition`] / [`Transfer::cancel`];
///   transfers are never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: TransferId,
    pub from_store_id: StoreId,
    pub to_store_id: StoreId,
    pub variant_id: VariantId,
    pub quantity: i64,
    pub status: TransferStatus,
    pub notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transfer {
    fn validate(cmd: &NewTransfer) -> DomainResult<()> {
        if cmd.quantity <= 0 {
            return Err(DomainError::field("quantity", "must be greater than zero"));
        }
        if cmd.from_store_id == cmd.to_store_id {
            return Err(DomainError::field(
                "to_store_id",
                "destination store must differ from source store",
            ));
        }
        Ok(())
    }

    fn build(id: TransferId, cmd: NewTransfer, status: TransferStatus, at: DateTime<Utc>) -> Self {
        Self {
            id,
            from_store_id: cmd.from_store_id,
            to_store_id: cmd.to_store_id,
            variant_id: cmd.variant_id,
            quantity: cmd.quantity,
            status,
            notes: cmd.notes,
            cancellation_reason: None,
            user_id: cmd.user_id,
            created_at: at,
            updated_at: at,
        }
    }

    /// Create a transfer in `pending`: no stock has moved yet.
    pub fn pending(id: TransferId, cmd: NewTransfer, at: DateTime<Utc>) -> DomainResult<Self> {
        Self::validate(&cmd)?;
        Ok(Self::build(id, cmd, TransferStatus::Pending, at))
    }

    /// Create a transfer in `completed` (the synchronous one-shot path).
    ///
    /// Returns the entity plus the paired debit/credit effects the caller must
    /// apply in the same commit.
    pub fn completed(
        id: TransferId,
        cmd: NewTransfer,
        at: DateTime<Utc>,
    ) -> DomainResult<(Self, [StockEffect; 2])> {
        Self::validate(&cmd)?;
        let transfer = Self::build(id, cmd, TransferStatus::Completed, at);
        let effects = [
            StockEffect {
                store_id: transfer.from_store_id,
                delta: -transfer.quantity,
                entry_type: EntryType::TransferOut,
            },
            StockEffect {
                store_id: transfer.to_store_id,
                delta: transfer.quantity,
                entry_type: EntryType::TransferIn,
            },
        ];
        Ok((transfer, effects))
    }

    /// Move the transfer to `to`, returning the stock effect the transition
    /// requires (if any). Invalid transitions fail without mutating anything.
    pub fn transition(
        &mut self,
        to: TransferStatus,
        at: DateTime<Utc>,
    ) -> DomainResult<Option<StockEffect>> {
        use TransferStatus::*;

        let effect = match (self.status, to) {
            (Pending, InTransit) => Some(StockEffect {
                store_id: self.from_store_id,
                delta: -self.quantity,
                entry_type: EntryType::TransferOut,
            }),
            (InTransit, Completed) => Some(StockEffect {
                store_id: self.to_store_id,
                delta: self.quantity,
                entry_type: EntryType::TransferIn,
            }),
            (Pending, Cancelled) => None,
            (InTransit, Cancelled) => Some(StockEffect {
                store_id: self.from_store_id,
                delta: self.quantity,
                entry_type: EntryType::TransferCancel,
            }),
            (Completed | Cancelled, Cancelled) => {
                return Err(DomainError::invalid_transition(
                    "already completed/cancelled transfers cannot be cancelled again",
                ));
            }
            (from, to) => {
                return Err(DomainError::invalid_transition(format!(
                    "cannot move transfer from '{from}' to '{to}'"
                )));
            }
        };

        self.status = to;
        self.updated_at = at;
        Ok(effect)
    }

    /// Cancel the transfer, recording an optional reason.
    pub fn cancel(
        &mut self,
        reason: Option<String>,
        at: DateTime<Utc>,
    ) -> DomainResult<Option<StockEffect>> {
        let effect = self.transition(TransferStatus::Cancelled, at)?;
        self.cancellation_reason = reason;
        Ok(effect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(quantity: i64) -> NewTransfer {
        NewTransfer {
            from_store_id: StoreId::new(),
            to_store_id: StoreId::new(),
            variant_id: VariantId::new(),
            quantity,
            notes: None,
            user_id: UserId::new(),
        }
    }

    fn pending(quantity: i64) -> Transfer {
        Transfer::pending(TransferId::new(), cmd(quantity), Utc::now()).unwrap()
    }

    #[test]
    fn same_store_fails_on_to_store_id() {
        let mut c = cmd(5);
        c.to_store_id = c.from_store_id;
        let err = Transfer::pending(TransferId::new(), c, Utc::now()).unwrap_err();
        assert!(
            matches!(err, DomainError::Validation { field: Some(f), .. } if f == "to_store_id")
        );
    }

    #[test]
    fn quantity_must_be_positive() {
        for q in [0, -3] {
            let err = Transfer::pending(TransferId::new(), cmd(q), Utc::now()).unwrap_err();
            assert!(
                matches!(err, DomainError::Validation { field: Some(f), .. } if f == "quantity")
            );
        }
    }

    #[test]
    fn one_shot_creation_pairs_debit_and_credit() {
        let (transfer, effects) =
            Transfer::completed(TransferId::new(), cmd(25), Utc::now()).unwrap();
        assert_eq!(transfer.status, TransferStatus::Completed);
        assert_eq!(effects[0].store_id, transfer.from_store_id);
        assert_eq!(effects[0].delta, -25);
        assert_eq!(effects[0].entry_type, EntryType::TransferOut);
        assert_eq!(effects[1].store_id, transfer.to_store_id);
        assert_eq!(effects[1].delta, 25);
        assert_eq!(effects[1].entry_type, EntryType::TransferIn);
    }

    #[test]
    fn pending_to_in_transit_debits_source() {
        let mut t = pending(25);
        let effect = t.transition(TransferStatus::InTransit, Utc::now()).unwrap();
        assert_eq!(t.status, TransferStatus::InTransit);
        assert_eq!(
            effect,
            Some(StockEffect {
                store_id: t.from_store_id,
                delta: -25,
                entry_type: EntryType::TransferOut,
            })
        );
    }

    #[test]
    fn in_transit_to_completed_credits_destination() {
        let mut t = pending(25);
        t.transition(TransferStatus::InTransit, Utc::now()).unwrap();
        let effect = t.transition(TransferStatus::Completed, Utc::now()).unwrap();
        assert_eq!(t.status, TransferStatus::Completed);
        assert_eq!(
            effect,
            Some(StockEffect {
                store_id: t.to_store_id,
                delta: 25,
                entry_type: EntryType::TransferIn,
            })
        );
    }

    #[test]
    fn cancelling_pending_moves_no_stock() {
        let mut t = pending(25);
        let effect = t.cancel(Some("ordered by mistake".into()), Utc::now()).unwrap();
        assert_eq!(t.status, TransferStatus::Cancelled);
        assert_eq!(effect, None);
        assert_eq!(t.cancellation_reason.as_deref(), Some("ordered by mistake"));
    }

    #[test]
    fn cancelling_in_transit_restores_source() {
        let mut t = pending(25);
        t.transition(TransferStatus::InTransit, Utc::now()).unwrap();
        let effect = t.cancel(None, Utc::now()).unwrap();
        assert_eq!(
            effect,
            Some(StockEffect {
                store_id: t.from_store_id,
                delta: 25,
                entry_type: EntryType::TransferCancel,
            })
        );
    }

    #[test]
    fn double_cancel_fails_without_state_change() {
        let mut t = pending(25);
        t.cancel(None, Utc::now()).unwrap();
        let before = t.clone();
        let err = t.cancel(None, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition(_)));
        assert_eq!(t, before);
    }

    #[test]
    fn cancelling_completed_fails() {
        let mut t = pending(25);
        t.transition(TransferStatus::InTransit, Utc::now()).unwrap();
        t.transition(TransferStatus::Completed, Utc::now()).unwrap();
        let err = t.cancel(None, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition(_)));
        assert_eq!(t.status, TransferStatus::Completed);
    }

    #[test]
    fn pending_cannot_jump_to_completed() {
        let mut t = pending(25);
        let before = t.clone();
        let err = t.transition(TransferStatus::Completed, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition(_)));
        assert_eq!(t, before);
    }

    #[test]
    fn completed_is_terminal() {
        let mut t = pending(25);
        t.transition(TransferStatus::InTransit, Utc::now()).unwrap();
        t.transition(TransferStatus::Completed, Utc::now()).unwrap();
        for target in [TransferStatus::Pending, TransferStatus::InTransit] {
            assert!(t.transition(target, Utc::now()).is_err());
        }
    }

    #[test]
    fn status_string_roundtrip() {
        for s in [
            TransferStatus::Pending,
            TransferStatus::InTransit,
            TransferStatus::Completed,
            TransferStatus::Cancelled,
        ] {
            assert_eq!(s.as_str().parse::<TransferStatus>().unwrap(), s);
        }
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // Out-and-back through in_transit must always net to zero on the
            // source store, whatever the quantity.
            #[test]
            fn cancel_after_dispatch_restores_source(quantity in 1i64..1_000_000) {
                let mut t = pending(quantity);
                let out = t
                    .transition(TransferStatus::InTransit, Utc::now())
                    .unwrap()
                    .unwrap();
                let back = t.cancel(None, Utc::now()).unwrap().unwrap();
                prop_assert_eq!(out.store_id, back.store_id);
                prop_assert_eq!(out.delta + back.delta, 0);
            }

            // A completed lifecycle debits the source and credits the
            // destination by exactly the transfer quantity.
            #[test]
            fn full_lifecycle_is_balanced(quantity in 1i64..1_000_000) {
                let mut t = pending(quantity);
                let out = t
                    .transition(TransferStatus::InTransit, Utc::now())
                    .unwrap()
                    .unwrap();
                let into = t
                    .transition(TransferStatus::Completed, Utc::now())
                    .unwrap()
                    .unwrap();
                prop_assert_eq!(out.delta, -quantity);
                prop_assert_eq!(into.delta, quantity);
                prop_assert_ne!(out.store_id, into.store_id);
            }
        }
    }
}
