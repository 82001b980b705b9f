//! In-memory [`Datastore`] for development and tests.
//!
//! One `Mutex` over the whole state gives every operation the same atomicity
//! the SQL backend gets from transactions: multi-record operations validate
//! against scratch copies and only write back once every step has succeeded.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use stockpile_auth::{Role, User};
use stockpile_catalog::{NewVariant, Product, Variant};
use stockpile_core::{
    DomainError, InventoryId, ProductId, PurchaseId, StoreId, TransferId, UserId, VariantId,
};
use stockpile_inventory::{
    EntryType, InventoryRecord, LedgerEntry, NewTransfer, StockEffect, Transfer, TransferStatus,
};
use stockpile_purchasing::{NewPurchase, Purchase};
use stockpile_stores::Store;

use super::{Datastore, StoreError, StoreResult, TransferOutcome};

#[derive(Debug, Default)]
struct State {
    users: HashMap<UserId, User>,
    stores: HashMap<StoreId, Store>,
    products: HashMap<ProductId, Product>,
    records: HashMap<InventoryId, InventoryRecord>,
    entries: Vec<LedgerEntry>,
    transfers: HashMap<TransferId, Transfer>,
    purchases: HashMap<PurchaseId, Purchase>,
}

impl State {
    fn record_for(&self, variant_id: VariantId, store_id: StoreId) -> Option<&InventoryRecord> {
        self.records
            .values()
            .find(|r| r.variant_id == variant_id && r.store_id == store_id)
    }

    fn require_store(&self, id: StoreId, field: &str) -> Result<(), DomainError> {
        if self.stores.contains_key(&id) {
            Ok(())
        } else {
            Err(DomainError::field(field, format!("unknown store '{id}'")))
        }
    }

    fn require_variant(&self, id: VariantId, field: &str) -> Result<(), DomainError> {
        if self.products.values().any(|p| p.variant(id).is_some()) {
            Ok(())
        } else {
            Err(DomainError::field(field, format!("unknown variant '{id}'")))
        }
    }

    /// Apply a stock effect on scratch copies: returns the updated record and
    /// its ledger entry without touching the state.
    fn stage_effect(
        &self,
        variant_id: VariantId,
        effect: StockEffect,
    ) -> Result<(InventoryRecord, LedgerEntry), DomainError> {
        let now = Utc::now();
        let mut record = match self.record_for(variant_id, effect.store_id) {
            Some(r) => r.clone(),
            None if effect.delta < 0 => {
                return Err(DomainError::insufficient_stock(0, -effect.delta));
            }
            None => InventoryRecord::new(
                InventoryId::new(),
                variant_id,
                effect.store_id,
                0,
                0,
                now,
            )?,
        };
        record.apply_delta(effect.delta, now)?;
        let entry = LedgerEntry::new(record.id, effect.entry_type, effect.delta, now);
        Ok((record, entry))
    }

    fn commit_effect(&mut self, record: InventoryRecord, entry: LedgerEntry) {
        self.records.insert(record.id, record);
        self.entries.push(entry);
    }
}

#[derive(Debug, Default)]
pub struct InMemoryDatastore {
    state: Mutex<State>,
}

impl InMemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| StoreError::Backend("state lock poisoned".to_string()))
    }
}

#[async_trait]
impl Datastore for InMemoryDatastore {
    async fn create_user(
        &self,
        email: String,
        display_name: String,
        role: Role,
        store_ids: Vec<StoreId>,
    ) -> StoreResult<User> {
        let mut state = self.lock()?;
        if state.users.values().any(|u| u.email == email) {
            return Err(DomainError::conflict(format!("email '{email}' is already registered")).into());
        }
        let user = User::new(UserId::new(), email, display_name, role, store_ids, Utc::now())?;
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let state = self.lock()?;
        let mut users: Vec<_> = state.users.values().cloned().collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn deactivate_user(&self, id: UserId) -> StoreResult<User> {
        let mut state = self.lock()?;
        let user = state.users.get_mut(&id).ok_or(DomainError::NotFound)?;
        user.deactivate();
        Ok(user.clone())
    }

    async fn create_store(
        &self,
        name: String,
        code: String,
        address: Option<String>,
    ) -> StoreResult<Store> {
        let mut state = self.lock()?;
        if state.stores.values().any(|s| s.code == code) {
            return Err(DomainError::conflict(format!("store code '{code}' is already in use")).into());
        }
        let store = Store::new(StoreId::new(), name, code, address, Utc::now())?;
        state.stores.insert(store.id, store.clone());
        Ok(store)
    }

    async fn store(&self, id: StoreId) -> StoreResult<Option<Store>> {
        Ok(self.lock()?.stores.get(&id).cloned())
    }

    async fn list_stores(&self) -> StoreResult<Vec<Store>> {
        let state = self.lock()?;
        let mut stores: Vec<_> = state.stores.values().cloned().collect();
        stores.sort_by_key(|s| s.created_at);
        Ok(stores)
    }

    async fn rename_store(&self, id: StoreId, name: String) -> StoreResult<Store> {
        let mut state = self.lock()?;
        let store = state.stores.get_mut(&id).ok_or(DomainError::NotFound)?;
        store.rename(name, Utc::now())?;
        Ok(store.clone())
    }

    async fn deactivate_store(&self, id: StoreId) -> StoreResult<Store> {
        let mut state = self.lock()?;
        let store = state.stores.get_mut(&id).ok_or(DomainError::NotFound)?;
        store.deactivate(Utc::now());
        Ok(store.clone())
    }

    async fn create_product(
        &self,
        name: String,
        description: Option<String>,
        variants: Vec<NewVariant>,
    ) -> StoreResult<Product> {
        let mut state = self.lock()?;
        let now = Utc::now();
        let mut product = Product::new(ProductId::new(), name, description, now)?;
        for variant in variants {
            product.add_variant(variant, now)?;
        }
        state.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        Ok(self.lock()?.products.get(&id).cloned())
    }

    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        let state = self.lock()?;
        let mut products: Vec<_> = state.products.values().cloned().collect();
        products.sort_by_key(|p| p.created_at);
        Ok(products)
    }

    async fn add_variant(&self, product_id: ProductId, new: NewVariant) -> StoreResult<Product> {
        let mut state = self.lock()?;
        let product = state
            .products
            .get_mut(&product_id)
            .ok_or(DomainError::NotFound)?;
        product.add_variant(new, Utc::now())?;
        Ok(product.clone())
    }

    async fn rename_product(&self, id: ProductId, name: String) -> StoreResult<Product> {
        let mut state = self.lock()?;
        let product = state.products.get_mut(&id).ok_or(DomainError::NotFound)?;
        product.rename(name, Utc::now())?;
        Ok(product.clone())
    }

    async fn deactivate_product(&self, id: ProductId) -> StoreResult<Product> {
        let mut state = self.lock()?;
        let product = state.products.get_mut(&id).ok_or(DomainError::NotFound)?;
        product.deactivate(Utc::now());
        Ok(product.clone())
    }

    async fn variant(&self, id: VariantId) -> StoreResult<Option<(Product, Variant)>> {
        let state = self.lock()?;
        Ok(state.products.values().find_map(|p| {
            p.variant(id).map(|v| (p.clone(), v.clone()))
        }))
    }

    async fn create_record(
        &self,
        variant_id: VariantId,
        store_id: StoreId,
        quantity: i64,
        low_stock_threshold: i64,
    ) -> StoreResult<InventoryRecord> {
        let mut state = self.lock()?;
        state.require_store(store_id, "store_id")?;
        state.require_variant(variant_id, "variant_id")?;
        if state.record_for(variant_id, store_id).is_some() {
            return Err(DomainError::conflict(
                "inventory record already exists for this variant and store",
            )
            .into());
        }
        let record = InventoryRecord::new(
            InventoryId::new(),
            variant_id,
            store_id,
            quantity,
            low_stock_threshold,
            Utc::now(),
        )?;
        state.records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn record(&self, id: InventoryId) -> StoreResult<Option<InventoryRecord>> {
        Ok(self.lock()?.records.get(&id).cloned())
    }

    async fn record_for(
        &self,
        variant_id: VariantId,
        store_id: StoreId,
    ) -> StoreResult<Option<InventoryRecord>> {
        Ok(self.lock()?.record_for(variant_id, store_id).cloned())
    }

    async fn list_records(&self, store_id: Option<StoreId>) -> StoreResult<Vec<InventoryRecord>> {
        let state = self.lock()?;
        let mut records: Vec<_> = state
            .records
            .values()
            .filter(|r| store_id.is_none_or(|s| r.store_id == s))
            .cloned()
            .collect();
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }

    async fn adjust_record(&self, id: InventoryId, delta: i64) -> StoreResult<InventoryRecord> {
        let mut state = self.lock()?;
        let now = Utc::now();
        let mut record = state.records.get(&id).ok_or(DomainError::NotFound)?.clone();
        record.apply_delta(delta, now)?;
        let entry = LedgerEntry::new(record.id, EntryType::Adjustment, delta, now);
        state.commit_effect(record.clone(), entry);
        Ok(record)
    }

    async fn entries_for(&self, id: InventoryId) -> StoreResult<Vec<LedgerEntry>> {
        let state = self.lock()?;
        Ok(state
            .entries
            .iter()
            .filter(|e| e.inventory_id == id)
            .cloned()
            .collect())
    }

    async fn create_transfer(
        &self,
        cmd: NewTransfer,
        initial: TransferStatus,
    ) -> StoreResult<TransferOutcome> {
        let mut state = self.lock()?;
        state.require_store(cmd.from_store_id, "from_store_id")?;
        state.require_store(cmd.to_store_id, "to_store_id")?;
        state.require_variant(cmd.variant_id, "variant_id")?;

        let now = Utc::now();
        match initial {
            TransferStatus::Pending => {
                let transfer = Transfer::pending(TransferId::new(), cmd, now)?;
                state.transfers.insert(transfer.id, transfer.clone());
                Ok(TransferOutcome {
                    transfer,
                    source: None,
                    destination: None,
                })
            }
            TransferStatus::Completed => {
                let (transfer, [debit, credit]) =
                    Transfer::completed(TransferId::new(), cmd, now)?;
                let (source, out_entry) = state.stage_effect(transfer.variant_id, debit)?;
                let (destination, in_entry) = state.stage_effect(transfer.variant_id, credit)?;
                state.commit_effect(source.clone(), out_entry);
                state.commit_effect(destination.clone(), in_entry);
                state.transfers.insert(transfer.id, transfer.clone());
                Ok(TransferOutcome {
                    transfer,
                    source: Some(source),
                    destination: Some(destination),
                })
            }
            other => Err(DomainError::field(
                "status",
                format!("transfers cannot be created as '{other}'"),
            )
            .into()),
        }
    }

    async fn transfer(&self, id: TransferId) -> StoreResult<Option<Transfer>> {
        Ok(self.lock()?.transfers.get(&id).cloned())
    }

    async fn list_transfers(&self) -> StoreResult<Vec<Transfer>> {
        let state = self.lock()?;
        let mut transfers: Vec<_> = state.transfers.values().cloned().collect();
        transfers.sort_by_key(|t| t.created_at);
        Ok(transfers)
    }

    async fn transition_transfer(
        &self,
        id: TransferId,
        to: TransferStatus,
    ) -> StoreResult<TransferOutcome> {
        let mut state = self.lock()?;
        let mut transfer = state.transfers.get(&id).ok_or(DomainError::NotFound)?.clone();
        let effect = transfer.transition(to, Utc::now())?;
        let outcome = commit_transition(&mut state, transfer, effect)?;
        Ok(outcome)
    }

    async fn cancel_transfer(
        &self,
        id: TransferId,
        reason: Option<String>,
    ) -> StoreResult<TransferOutcome> {
        let mut state = self.lock()?;
        let mut transfer = state.transfers.get(&id).ok_or(DomainError::NotFound)?.clone();
        let effect = transfer.cancel(reason, Utc::now())?;
        let outcome = commit_transition(&mut state, transfer, effect)?;
        Ok(outcome)
    }

    async fn create_purchase(&self, cmd: NewPurchase) -> StoreResult<Purchase> {
        let mut state = self.lock()?;
        state.require_store(cmd.store_id, "store_id")?;
        for line in &cmd.lines {
            state.require_variant(line.variant_id, "lines.variant_id")?;
        }

        let now = Utc::now();
        let purchase = Purchase::new(PurchaseId::new(), cmd, now)?;
        // Lines may repeat a variant, so each line stages against the records
        // staged so far rather than the pre-operation state.
        let mut records: Vec<InventoryRecord> = Vec::new();
        let mut entries = Vec::with_capacity(purchase.lines.len());
        for line in &purchase.lines {
            let idx = match records.iter().position(|r| r.variant_id == line.variant_id) {
                Some(i) => i,
                None => {
                    let record = match state.record_for(line.variant_id, purchase.store_id) {
                        Some(r) => r.clone(),
                        None => InventoryRecord::new(
                            InventoryId::new(),
                            line.variant_id,
                            purchase.store_id,
                            0,
                            0,
                            now,
                        )?,
                    };
                    records.push(record);
                    records.len() - 1
                }
            };
            records[idx].apply_delta(line.quantity, now)?;
            entries.push(LedgerEntry::new(
                records[idx].id,
                EntryType::Purchase,
                line.quantity,
                now,
            ));
        }
        for record in records {
            state.records.insert(record.id, record);
        }
        state.entries.extend(entries);
        state.purchases.insert(purchase.id, purchase.clone());
        Ok(purchase)
    }

    async fn purchase(&self, id: PurchaseId) -> StoreResult<Option<Purchase>> {
        Ok(self.lock()?.purchases.get(&id).cloned())
    }

    async fn list_purchases(&self) -> StoreResult<Vec<Purchase>> {
        let state = self.lock()?;
        let mut purchases: Vec<_> = state.purchases.values().cloned().collect();
        purchases.sort_by_key(|p| p.received_at);
        Ok(purchases)
    }
}

fn commit_transition(
    state: &mut State,
    transfer: Transfer,
    effect: Option<StockEffect>,
) -> Result<TransferOutcome, StoreError> {
    let mut outcome = TransferOutcome {
        transfer,
        source: None,
        destination: None,
    };
    if let Some(effect) = effect {
        let (record, entry) = state.stage_effect(outcome.transfer.variant_id, effect)?;
        if effect.store_id == outcome.transfer.from_store_id {
            outcome.source = Some(record.clone());
        } else {
            outcome.destination = Some(record.clone());
        }
        state.commit_effect(record, entry);
    }
    state
        .transfers
        .insert(outcome.transfer.id, outcome.transfer.clone());
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockpile_catalog::AttributeValue;
    use stockpile_purchasing::PurchaseLine;

    struct Fixture {
        store: InMemoryDatastore,
        source: StoreId,
        destination: StoreId,
        variant: VariantId,
        user: UserId,
    }

    /// Two stores, one variant, 100 units at the source.
    async fn fixture() -> Fixture {
        let store = InMemoryDatastore::new();
        let source = store
            .create_store("Downtown".into(), "DT-01".into(), None)
            .await
            .unwrap()
            .id;
        let destination = store
            .create_store("Airport".into(), "AP-01".into(), None)
            .await
            .unwrap()
            .id;
        let product = store
            .create_product(
                "Trail Jacket".into(),
                None,
                vec![NewVariant {
                    sku: "JKT-M".into(),
                    attributes: vec![AttributeValue {
                        name: "size".into(),
                        value: "M".into(),
                    }],
                    price_cents: Some(12_900),
                }],
            )
            .await
            .unwrap();
        let variant = product.variants[0].id;
        store
            .create_record(variant, source, 100, 5)
            .await
            .unwrap();
        let user = store
            .create_user("ops@example.com".into(), "Ops".into(), Role::new("staff"), vec![])
            .await
            .unwrap()
            .id;
        Fixture {
            store,
            source,
            destination,
            variant,
            user,
        }
    }

    fn transfer_cmd(f: &Fixture, quantity: i64) -> NewTransfer {
        NewTransfer {
            from_store_id: f.source,
            to_store_id: f.destination,
            variant_id: f.variant,
            quantity,
            notes: None,
            user_id: f.user,
        }
    }

    async fn quantity_at(f: &Fixture, store_id: StoreId) -> i64 {
        f.store
            .record_for(f.variant, store_id)
            .await
            .unwrap()
            .map(|r| r.quantity)
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn one_shot_transfer_moves_stock_and_writes_paired_entries() {
        let f = fixture().await;
        let outcome = f
            .store
            .create_transfer(transfer_cmd(&f, 25), TransferStatus::Completed)
            .await
            .unwrap();

        assert_eq!(outcome.transfer.status, TransferStatus::Completed);
        assert_eq!(quantity_at(&f, f.source).await, 75);
        assert_eq!(quantity_at(&f, f.destination).await, 25);

        let source = outcome.source.unwrap();
        let out_entries = f.store.entries_for(source.id).await.unwrap();
        assert_eq!(out_entries.len(), 1);
        assert_eq!(out_entries[0].entry_type, EntryType::TransferOut);
        assert_eq!(out_entries[0].quantity, -25);

        let destination = outcome.destination.unwrap();
        let in_entries = f.store.entries_for(destination.id).await.unwrap();
        assert_eq!(in_entries.len(), 1);
        assert_eq!(in_entries[0].entry_type, EntryType::TransferIn);
        assert_eq!(in_entries[0].quantity, 25);
    }

    #[tokio::test]
    async fn insufficient_stock_commits_nothing() {
        let f = fixture().await;
        let err = f
            .store
            .create_transfer(transfer_cmd(&f, 500), TransferStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Domain(DomainError::InsufficientStock {
                available: 100,
                requested: 500
            })
        ));
        assert_eq!(quantity_at(&f, f.source).await, 100);
        assert!(f.store.list_transfers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn pending_lifecycle_debits_then_credits() {
        let f = fixture().await;
        let id = f
            .store
            .create_transfer(transfer_cmd(&f, 25), TransferStatus::Pending)
            .await
            .unwrap()
            .transfer
            .id;
        assert_eq!(quantity_at(&f, f.source).await, 100);

        f.store
            .transition_transfer(id, TransferStatus::InTransit)
            .await
            .unwrap();
        assert_eq!(quantity_at(&f, f.source).await, 75);
        assert_eq!(quantity_at(&f, f.destination).await, 0);

        f.store
            .transition_transfer(id, TransferStatus::Completed)
            .await
            .unwrap();
        assert_eq!(quantity_at(&f, f.source).await, 75);
        assert_eq!(quantity_at(&f, f.destination).await, 25);
    }

    #[tokio::test]
    async fn cancelling_in_transit_restores_source_with_audit() {
        let f = fixture().await;
        let id = f
            .store
            .create_transfer(transfer_cmd(&f, 25), TransferStatus::Pending)
            .await
            .unwrap()
            .transfer
            .id;
        f.store
            .transition_transfer(id, TransferStatus::InTransit)
            .await
            .unwrap();

        let outcome = f
            .store
            .cancel_transfer(id, Some("truck broke down".into()))
            .await
            .unwrap();
        assert_eq!(outcome.transfer.status, TransferStatus::Cancelled);
        assert_eq!(
            outcome.transfer.cancellation_reason.as_deref(),
            Some("truck broke down")
        );
        assert_eq!(quantity_at(&f, f.source).await, 100);

        let record = f.store.record_for(f.variant, f.source).await.unwrap().unwrap();
        let entries = f.store.entries_for(record.id).await.unwrap();
        let types: Vec<_> = entries.iter().map(|e| e.entry_type).collect();
        assert_eq!(types, vec![EntryType::TransferOut, EntryType::TransferCancel]);
    }

    #[tokio::test]
    async fn double_cancel_is_rejected() {
        let f = fixture().await;
        let id = f
            .store
            .create_transfer(transfer_cmd(&f, 25), TransferStatus::Pending)
            .await
            .unwrap()
            .transfer
            .id;
        f.store.cancel_transfer(id, None).await.unwrap();
        let err = f.store.cancel_transfer(id, None).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Domain(DomainError::InvalidTransition(_))
        ));
        assert_eq!(quantity_at(&f, f.source).await, 100);
    }

    #[tokio::test]
    async fn pending_cannot_jump_to_completed() {
        let f = fixture().await;
        let id = f
            .store
            .create_transfer(transfer_cmd(&f, 25), TransferStatus::Pending)
            .await
            .unwrap()
            .transfer
            .id;
        let err = f
            .store
            .transition_transfer(id, TransferStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Domain(DomainError::InvalidTransition(_))
        ));
        assert_eq!(
            f.store.transfer(id).await.unwrap().unwrap().status,
            TransferStatus::Pending
        );
    }

    #[tokio::test]
    async fn dispatch_without_source_record_is_insufficient_stock() {
        let f = fixture().await;
        let mut cmd = transfer_cmd(&f, 10);
        cmd.from_store_id = f.destination;
        cmd.to_store_id = f.source;
        let id = f
            .store
            .create_transfer(cmd, TransferStatus::Pending)
            .await
            .unwrap()
            .transfer
            .id;
        let err = f
            .store
            .transition_transfer(id, TransferStatus::InTransit)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Domain(DomainError::InsufficientStock {
                available: 0,
                requested: 10
            })
        ));
    }

    #[tokio::test]
    async fn adjustment_writes_ledger_entry() {
        let f = fixture().await;
        let record = f.store.record_for(f.variant, f.source).await.unwrap().unwrap();
        let updated = f.store.adjust_record(record.id, -3).await.unwrap();
        assert_eq!(updated.quantity, 97);
        let entries = f.store.entries_for(record.id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].entry_type, EntryType::Adjustment);
        assert_eq!(entries[0].quantity, -3);
    }

    #[tokio::test]
    async fn purchase_credits_every_line() {
        let f = fixture().await;
        let purchase = f
            .store
            .create_purchase(NewPurchase {
                store_id: f.destination,
                supplier: "Acme Wholesale".into(),
                reference: None,
                lines: vec![PurchaseLine {
                    variant_id: f.variant,
                    quantity: 40,
                    unit_cost_cents: 800,
                }],
                user_id: f.user,
            })
            .await
            .unwrap();
        assert_eq!(purchase.total_cost_cents(), 32_000);
        assert_eq!(quantity_at(&f, f.destination).await, 40);

        let record = f
            .store
            .record_for(f.variant, f.destination)
            .await
            .unwrap()
            .unwrap();
        let entries = f.store.entries_for(record.id).await.unwrap();
        assert_eq!(entries[0].entry_type, EntryType::Purchase);
        assert_eq!(entries[0].quantity, 40);
    }

    #[tokio::test]
    async fn repeated_purchase_lines_accumulate_on_one_record() {
        let f = fixture().await;
        f.store
            .create_purchase(NewPurchase {
                store_id: f.destination,
                supplier: "Acme Wholesale".into(),
                reference: None,
                lines: vec![
                    PurchaseLine {
                        variant_id: f.variant,
                        quantity: 10,
                        unit_cost_cents: 800,
                    },
                    PurchaseLine {
                        variant_id: f.variant,
                        quantity: 7,
                        unit_cost_cents: 750,
                    },
                ],
                user_id: f.user,
            })
            .await
            .unwrap();

        // One record for the (variant, store) pair, both deltas on its ledger.
        let records = f.store.list_records(Some(f.destination)).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].quantity, 17);

        let entries = f.store.entries_for(records[0].id).await.unwrap();
        let deltas: Vec<_> = entries.iter().map(|e| e.quantity).collect();
        assert_eq!(deltas, vec![10, 7]);
    }

    #[tokio::test]
    async fn repeated_purchase_lines_compose_with_existing_stock() {
        let f = fixture().await;
        f.store
            .create_purchase(NewPurchase {
                store_id: f.source,
                supplier: "Acme Wholesale".into(),
                reference: None,
                lines: vec![
                    PurchaseLine {
                        variant_id: f.variant,
                        quantity: 10,
                        unit_cost_cents: 800,
                    },
                    PurchaseLine {
                        variant_id: f.variant,
                        quantity: 7,
                        unit_cost_cents: 750,
                    },
                ],
                user_id: f.user,
            })
            .await
            .unwrap();

        assert_eq!(quantity_at(&f, f.source).await, 117);
        let record = f.store.record_for(f.variant, f.source).await.unwrap().unwrap();
        let entries = f.store.entries_for(record.id).await.unwrap();
        assert_eq!(entries.iter().map(|e| e.quantity).sum::<i64>(), 17);
    }

    #[tokio::test]
    async fn duplicate_record_is_a_conflict() {
        let f = fixture().await;
        let err = f
            .store
            .create_record(f.variant, f.source, 10, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::Conflict(_))));
    }

    #[tokio::test]
    async fn deactivated_user_stays_in_directory() {
        let f = fixture().await;
        let user = f.store.deactivate_user(f.user).await.unwrap();
        assert!(!user.active);

        let listed = f.store.list_users().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(!listed[0].active);
    }

    #[tokio::test]
    async fn unknown_store_fails_validation() {
        let f = fixture().await;
        let mut cmd = transfer_cmd(&f, 10);
        cmd.to_store_id = StoreId::new();
        let err = f
            .store
            .create_transfer(cmd, TransferStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Domain(DomainError::Validation { field: Some(f), .. }) if f == "to_store_id"
        ));
    }
}
