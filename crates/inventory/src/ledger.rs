//! Append-only inventory transaction ledger.
//!
//! Every quantity change on an [`crate::InventoryRecord`] is mirrored by
//! exactly one ledger entry; entries are never updated or deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockpile_core::{EntryId, InventoryId};

/// Why a quantity changed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    TransferOut,
    TransferIn,
    TransferCancel,
    Purchase,
    Adjustment,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::TransferOut => "transfer_out",
            EntryType::TransferIn => "transfer_in",
            EntryType::TransferCancel => "transfer_cancel",
            EntryType::Purchase => "purchase",
            EntryType::Adjustment => "adjustment",
        }
    }
}

impl core::str::FromStr for EntryType {
    type Err = stockpile_core::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transfer_out" => Ok(EntryType::TransferOut),
            "transfer_in" => Ok(EntryType::TransferIn),
            "transfer_cancel" => Ok(EntryType::TransferCancel),
            "purchase" => Ok(EntryType::Purchase),
            "adjustment" => Ok(EntryType::Adjustment),
            other => Err(stockpile_core::DomainError::validation(format!(
                "unknown entry type '{other}'"
            ))),
        }
    }
}

impl core::fmt::Display for EntryType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable audit row: a signed quantity delta against one inventory record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub inventory_id: InventoryId,
    pub entry_type: EntryType,
    /// Signed delta: negative for stock leaving the record.
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn new(
        inventory_id: InventoryId,
        entry_type: EntryType,
        quantity: i64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EntryId::new(),
            inventory_id,
            entry_type,
            quantity,
            occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_type_string_roundtrip() {
        for t in [
            EntryType::TransferOut,
            EntryType::TransferIn,
            EntryType::TransferCancel,
            EntryType::Purchase,
            EntryType::Adjustment,
        ] {
            assert_eq!(t.as_str().parse::<EntryType>().unwrap(), t);
        }
    }

    #[test]
    fn unknown_entry_type_is_rejected() {
        assert!("restock".parse::<EntryType>().is_err());
    }
}
