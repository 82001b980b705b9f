//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $t:ident, $name:literal) => {
        $(#[$doc])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $t(Uuid);

        impl $t {
            /// Create a new identifier (UUIDv7, time-ordered). Prefer passing
            /// ids explicitly in tests for determinism.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $t {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$t> for Uuid {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = Uuid::from_str(s)
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                Ok(Self(uuid))
            }
        }
    };
}

uuid_id!(
    /// Identifier of a user (actor identity).
    UserId,
    "UserId"
);
uuid_id!(
    /// Identifier of a store (physical or logical location).
    StoreId,
    "StoreId"
);
uuid_id!(
    /// Identifier of a product.
    ProductId,
    "ProductId"
);
uuid_id!(
    /// Identifier of a product variant.
    VariantId,
    "VariantId"
);
uuid_id!(
    /// Identifier of an inventory record (one variant at one store).
    InventoryId,
    "InventoryId"
);
uuid_id!(
    /// Identifier of an inventory transfer.
    TransferId,
    "TransferId"
);
uuid_id!(
    /// Identifier of an inventory ledger entry.
    EntryId,
    "EntryId"
);
uuid_id!(
    /// Identifier of a purchase.
    PurchaseId,
    "PurchaseId"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_roundtrip() {
        let id = TransferId::new();
        let parsed: TransferId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = "not-a-uuid".parse::<StoreId>().unwrap_err();
        assert!(matches!(err, DomainError::InvalidId(_)));
    }
}
