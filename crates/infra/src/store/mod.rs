//! The storage abstraction every API handler talks to.
//!
//! A [`Datastore`] owns all persistent state and exposes coarse-grained
//! operations that are atomic per call: a transfer transition that debits
//! stock either commits the status change, the quantity change, and the
//! ledger entry together, or commits nothing.

use async_trait::async_trait;

use stockpile_auth::{Role, User};
use stockpile_catalog::{NewVariant, Product, Variant};
use stockpile_core::{
    DomainError, InventoryId, ProductId, PurchaseId, StoreId, TransferId, UserId, VariantId,
};
use stockpile_inventory::{InventoryRecord, LedgerEntry, NewTransfer, Transfer, TransferStatus};
use stockpile_purchasing::{NewPurchase, Purchase};
use stockpile_stores::Store;

pub mod memory;

#[cfg(feature = "postgres")]
pub mod postgres;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("storage backend failure: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Result of a transfer operation: the transfer itself plus the inventory
/// records the operation touched, as committed.
#[derive(Debug, Clone)]
pub struct TransferOutcome {
    pub transfer: Transfer,
    pub source: Option<InventoryRecord>,
    pub destination: Option<InventoryRecord>,
}

#[async_trait]
pub trait Datastore: Send + Sync {
    // users
    async fn create_user(
        &self,
        email: String,
        display_name: String,
        role: Role,
        store_ids: Vec<StoreId>,
    ) -> StoreResult<User>;
    async fn user(&self, id: UserId) -> StoreResult<Option<User>>;
    async fn list_users(&self) -> StoreResult<Vec<User>>;
    /// Soft delete: the user stays in the directory for transfer attribution.
    async fn deactivate_user(&self, id: UserId) -> StoreResult<User>;

    // stores
    async fn create_store(
        &self,
        name: String,
        code: String,
        address: Option<String>,
    ) -> StoreResult<Store>;
    async fn store(&self, id: StoreId) -> StoreResult<Option<Store>>;
    async fn list_stores(&self) -> StoreResult<Vec<Store>>;
    async fn rename_store(&self, id: StoreId, name: String) -> StoreResult<Store>;
    /// Soft delete: the store stays addressable for transfer/ledger history.
    async fn deactivate_store(&self, id: StoreId) -> StoreResult<Store>;

    // products
    async fn create_product(
        &self,
        name: String,
        description: Option<String>,
        variants: Vec<NewVariant>,
    ) -> StoreResult<Product>;
    async fn product(&self, id: ProductId) -> StoreResult<Option<Product>>;
    async fn list_products(&self) -> StoreResult<Vec<Product>>;
    async fn add_variant(&self, product_id: ProductId, new: NewVariant) -> StoreResult<Product>;
    async fn rename_product(&self, id: ProductId, name: String) -> StoreResult<Product>;
    async fn deactivate_product(&self, id: ProductId) -> StoreResult<Product>;
    /// Look up a variant across all products.
    async fn variant(&self, id: VariantId) -> StoreResult<Option<(Product, Variant)>>;

    // inventory records
    async fn create_record(
        &self,
        variant_id: VariantId,
        store_id: StoreId,
        quantity: i64,
        low_stock_threshold: i64,
    ) -> StoreResult<InventoryRecord>;
    async fn record(&self, id: InventoryId) -> StoreResult<Option<InventoryRecord>>;
    async fn record_for(
        &self,
        variant_id: VariantId,
        store_id: StoreId,
    ) -> StoreResult<Option<InventoryRecord>>;
    async fn list_records(&self, store_id: Option<StoreId>) -> StoreResult<Vec<InventoryRecord>>;
    /// Apply a manual stock adjustment, audited as an `adjustment` entry.
    async fn adjust_record(&self, id: InventoryId, delta: i64) -> StoreResult<InventoryRecord>;
    async fn entries_for(&self, id: InventoryId) -> StoreResult<Vec<LedgerEntry>>;

    // transfers
    async fn create_transfer(
        &self,
        cmd: NewTransfer,
        initial: TransferStatus,
    ) -> StoreResult<TransferOutcome>;
    async fn transfer(&self, id: TransferId) -> StoreResult<Option<Transfer>>;
    async fn list_transfers(&self) -> StoreResult<Vec<Transfer>>;
    async fn transition_transfer(
        &self,
        id: TransferId,
        to: TransferStatus,
    ) -> StoreResult<TransferOutcome>;
    async fn cancel_transfer(
        &self,
        id: TransferId,
        reason: Option<String>,
    ) -> StoreResult<TransferOutcome>;

    // purchases
    async fn create_purchase(&self, cmd: NewPurchase) -> StoreResult<Purchase>;
    async fn purchase(&self, id: PurchaseId) -> StoreResult<Option<Purchase>>;
    async fn list_purchases(&self) -> StoreResult<Vec<Purchase>>;
}
