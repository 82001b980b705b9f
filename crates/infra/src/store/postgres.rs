//! PostgreSQL [`Datastore`] built on `sqlx`.
//!
//! Every multi-record operation runs inside a transaction and takes
//! `SELECT .. FOR UPDATE` row locks on the inventory records it is about to
//! change, so concurrent transfers against the same stock serialize instead
//! of double-spending it.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgConnection, Row};
use uuid::Uuid;

use stockpile_auth::{Role, User};
use stockpile_catalog::{NewVariant, Product, Variant};
use stockpile_core::{
    DomainError, EntryId, InventoryId, ProductId, PurchaseId, StoreId, TransferId, UserId,
    VariantId,
};
use stockpile_inventory::{
    EntryType, InventoryRecord, LedgerEntry, NewTransfer, StockEffect, Transfer, TransferStatus,
};
use stockpile_purchasing::{NewPurchase, Purchase, PurchaseLine};
use stockpile_stores::Store;

use super::{Datastore, StoreError, StoreResult, TransferOutcome};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id UUID PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    display_name TEXT NOT NULL,
    role TEXT NOT NULL,
    store_ids UUID[] NOT NULL DEFAULT '{}',
    active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS stores (
    id UUID PRIMARY KEY,
    name TEXT NOT NULL,
    code TEXT NOT NULL UNIQUE,
    address TEXT,
    active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS products (
    id UUID PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    variants JSONB NOT NULL DEFAULT '[]',
    active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS inventory_records (
    id UUID PRIMARY KEY,
    variant_id UUID NOT NULL,
    store_id UUID NOT NULL REFERENCES stores(id),
    quantity BIGINT NOT NULL CHECK (quantity >= 0),
    low_stock_threshold BIGINT NOT NULL CHECK (low_stock_threshold >= 0),
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL,
    UNIQUE (variant_id, store_id)
);

CREATE TABLE IF NOT EXISTS ledger_entries (
    id UUID PRIMARY KEY,
    inventory_id UUID NOT NULL REFERENCES inventory_records(id),
    entry_type TEXT NOT NULL,
    quantity BIGINT NOT NULL,
    occurred_at TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS ledger_entries_inventory_idx
    ON ledger_entries (inventory_id, occurred_at);

CREATE TABLE IF NOT EXISTS transfers (
    id UUID PRIMARY KEY,
    from_store_id UUID NOT NULL REFERENCES stores(id),
    to_store_id UUID NOT NULL REFERENCES stores(id),
    variant_id UUID NOT NULL,
    quantity BIGINT NOT NULL CHECK (quantity > 0),
    status TEXT NOT NULL,
    notes TEXT,
    cancellation_reason TEXT,
    user_id UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS purchases (
    id UUID PRIMARY KEY,
    store_id UUID NOT NULL REFERENCES stores(id),
    supplier TEXT NOT NULL,
    reference TEXT,
    lines JSONB NOT NULL,
    user_id UUID NOT NULL,
    received_at TIMESTAMPTZ NOT NULL
);
"#;

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

fn unique_conflict(err: sqlx::Error, message: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Domain(DomainError::conflict(message))
        }
        _ => err.into(),
    }
}

pub struct PostgresDatastore {
    pool: PgPool,
}

impl PostgresDatastore {
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
        Ok(Self { pool })
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create all tables if they do not exist yet.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        tracing::info!("database schema ensured");
        Ok(())
    }
}

// row mapping

fn map_user(row: &PgRow) -> StoreResult<User> {
    Ok(User {
        id: UserId::from_uuid(row.try_get("id")?),
        email: row.try_get("email")?,
        display_name: row.try_get("display_name")?,
        role: Role::new(row.try_get::<String, _>("role")?),
        store_ids: row
            .try_get::<Vec<Uuid>, _>("store_ids")?
            .into_iter()
            .map(StoreId::from_uuid)
            .collect(),
        active: row.try_get("active")?,
        created_at: row.try_get("created_at")?,
    })
}

fn map_store(row: &PgRow) -> StoreResult<Store> {
    Ok(Store {
        id: StoreId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        code: row.try_get("code")?,
        address: row.try_get("address")?,
        active: row.try_get("active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn map_product(row: &PgRow) -> StoreResult<Product> {
    Ok(Product {
        id: ProductId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        variants: row.try_get::<Json<Vec<Variant>>, _>("variants")?.0,
        active: row.try_get("active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn map_record(row: &PgRow) -> StoreResult<InventoryRecord> {
    Ok(InventoryRecord {
        id: InventoryId::from_uuid(row.try_get("id")?),
        variant_id: VariantId::from_uuid(row.try_get("variant_id")?),
        store_id: StoreId::from_uuid(row.try_get("store_id")?),
        quantity: row.try_get("quantity")?,
        low_stock_threshold: row.try_get("low_stock_threshold")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn map_entry(row: &PgRow) -> StoreResult<LedgerEntry> {
    let entry_type: String = row.try_get("entry_type")?;
    Ok(LedgerEntry {
        id: EntryId::from_uuid(row.try_get("id")?),
        inventory_id: InventoryId::from_uuid(row.try_get("inventory_id")?),
        entry_type: entry_type.parse::<EntryType>()?,
        quantity: row.try_get("quantity")?,
        occurred_at: row.try_get("occurred_at")?,
    })
}

fn map_transfer(row: &PgRow) -> StoreResult<Transfer> {
    let status: String = row.try_get("status")?;
    Ok(Transfer {
        id: TransferId::from_uuid(row.try_get("id")?),
        from_store_id: StoreId::from_uuid(row.try_get("from_store_id")?),
        to_store_id: StoreId::from_uuid(row.try_get("to_store_id")?),
        variant_id: VariantId::from_uuid(row.try_get("variant_id")?),
        quantity: row.try_get("quantity")?,
        status: status.parse::<TransferStatus>()?,
        notes: row.try_get("notes")?,
        cancellation_reason: row.try_get("cancellation_reason")?,
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn map_purchase(row: &PgRow) -> StoreResult<Purchase> {
    Ok(Purchase {
        id: PurchaseId::from_uuid(row.try_get("id")?),
        store_id: StoreId::from_uuid(row.try_get("store_id")?),
        supplier: row.try_get("supplier")?,
        reference: row.try_get("reference")?,
        lines: row.try_get::<Json<Vec<PurchaseLine>>, _>("lines")?.0,
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        received_at: row.try_get("received_at")?,
    })
}

// transactional helpers

async fn store_exists(conn: &mut PgConnection, id: StoreId, field: &str) -> StoreResult<()> {
    let found = sqlx::query("SELECT 1 FROM stores WHERE id = $1")
        .bind(Uuid::from(id))
        .fetch_optional(conn)
        .await?;
    if found.is_some() {
        Ok(())
    } else {
        Err(DomainError::field(field, format!("unknown store '{id}'")).into())
    }
}

async fn variant_exists(conn: &mut PgConnection, id: VariantId, field: &str) -> StoreResult<()> {
    let found = sqlx::query(
        "SELECT 1 FROM products p, jsonb_array_elements(p.variants) v WHERE v->>'id' = $1",
    )
    .bind(id.to_string())
    .fetch_optional(conn)
    .await?;
    if found.is_some() {
        Ok(())
    } else {
        Err(DomainError::field(field, format!("unknown variant '{id}'")).into())
    }
}

async fn record_for_update(
    conn: &mut PgConnection,
    variant_id: VariantId,
    store_id: StoreId,
) -> StoreResult<Option<InventoryRecord>> {
    let row = sqlx::query(
        "SELECT * FROM inventory_records WHERE variant_id = $1 AND store_id = $2 FOR UPDATE",
    )
    .bind(Uuid::from(variant_id))
    .bind(Uuid::from(store_id))
    .fetch_optional(conn)
    .await?;
    row.as_ref().map(map_record).transpose()
}

async fn insert_record(conn: &mut PgConnection, record: &InventoryRecord) -> StoreResult<()> {
    sqlx::query(
        "INSERT INTO inventory_records \
         (id, variant_id, store_id, quantity, low_stock_threshold, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(Uuid::from(record.id))
    .bind(Uuid::from(record.variant_id))
    .bind(Uuid::from(record.store_id))
    .bind(record.quantity)
    .bind(record.low_stock_threshold)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(conn)
    .await
    .map_err(|e| unique_conflict(e, "inventory record already exists for this variant and store"))?;
    Ok(())
}

/// Apply a stock effect inside the caller's transaction: locks (or creates)
/// the inventory record, updates its quantity, and appends the ledger entry.
async fn apply_effect(
    conn: &mut PgConnection,
    variant_id: VariantId,
    effect: StockEffect,
) -> StoreResult<InventoryRecord> {
    let now = Utc::now();
    let mut record = match record_for_update(conn, variant_id, effect.store_id).await? {
        Some(r) => r,
        None if effect.delta < 0 => {
            return Err(DomainError::insufficient_stock(0, -effect.delta).into());
        }
        None => {
            let record =
                InventoryRecord::new(InventoryId::new(), variant_id, effect.store_id, 0, 0, now)?;
            insert_record(conn, &record).await?;
            record
        }
    };

    record.apply_delta(effect.delta, now)?;
    sqlx::query("UPDATE inventory_records SET quantity = $2, updated_at = $3 WHERE id = $1")
        .bind(Uuid::from(record.id))
        .bind(record.quantity)
        .bind(record.updated_at)
        .execute(&mut *conn)
        .await?;

    let entry = LedgerEntry::new(record.id, effect.entry_type, effect.delta, now);
    sqlx::query(
        "INSERT INTO ledger_entries (id, inventory_id, entry_type, quantity, occurred_at) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(Uuid::from(entry.id))
    .bind(Uuid::from(entry.inventory_id))
    .bind(entry.entry_type.as_str())
    .bind(entry.quantity)
    .bind(entry.occurred_at)
    .execute(conn)
    .await?;

    Ok(record)
}

async fn insert_transfer(conn: &mut PgConnection, transfer: &Transfer) -> StoreResult<()> {
    sqlx::query(
        "INSERT INTO transfers \
         (id, from_store_id, to_store_id, variant_id, quantity, status, notes, \
          cancellation_reason, user_id, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(Uuid::from(transfer.id))
    .bind(Uuid::from(transfer.from_store_id))
    .bind(Uuid::from(transfer.to_store_id))
    .bind(Uuid::from(transfer.variant_id))
    .bind(transfer.quantity)
    .bind(transfer.status.as_str())
    .bind(&transfer.notes)
    .bind(&transfer.cancellation_reason)
    .bind(Uuid::from(transfer.user_id))
    .bind(transfer.created_at)
    .bind(transfer.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

async fn transfer_for_update(
    conn: &mut PgConnection,
    id: TransferId,
) -> StoreResult<Transfer> {
    let row = sqlx::query("SELECT * FROM transfers WHERE id = $1 FOR UPDATE")
        .bind(Uuid::from(id))
        .fetch_optional(conn)
        .await?
        .ok_or(DomainError::NotFound)?;
    map_transfer(&row)
}

async fn update_transfer(conn: &mut PgConnection, transfer: &Transfer) -> StoreResult<()> {
    sqlx::query(
        "UPDATE transfers SET status = $2, cancellation_reason = $3, updated_at = $4 WHERE id = $1",
    )
    .bind(Uuid::from(transfer.id))
    .bind(transfer.status.as_str())
    .bind(&transfer.cancellation_reason)
    .bind(transfer.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Row locks on the two sides of a transfer must always be taken in the same
/// order, otherwise concurrent opposite-direction transfers can deadlock.
fn in_lock_order(mut effects: [StockEffect; 2]) -> [StockEffect; 2] {
    if Uuid::from(effects[1].store_id) < Uuid::from(effects[0].store_id) {
        effects.swap(0, 1);
    }
    effects
}

fn attach_record(outcome: &mut TransferOutcome, record: InventoryRecord) {
    if record.store_id == outcome.transfer.from_store_id {
        outcome.source = Some(record);
    } else {
        outcome.destination = Some(record);
    }
}

#[async_trait]
impl Datastore for PostgresDatastore {
    async fn create_user(
        &self,
        email: String,
        display_name: String,
        role: Role,
        store_ids: Vec<StoreId>,
    ) -> StoreResult<User> {
        let user = User::new(UserId::new(), email, display_name, role, store_ids, Utc::now())?;
        sqlx::query(
            "INSERT INTO users (id, email, display_name, role, store_ids, active, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(Uuid::from(user.id))
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(user.role.as_str())
        .bind(user.store_ids.iter().map(|s| Uuid::from(*s)).collect::<Vec<_>>())
        .bind(user.active)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| unique_conflict(e, "email is already registered"))?;
        Ok(user)
    }

    async fn user(&self, id: UserId) -> StoreResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = $1")
            .bind(Uuid::from(id))
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(map_user).transpose()
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let rows = sqlx::query("SELECT * FROM users ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(map_user).collect()
    }

    async fn deactivate_user(&self, id: UserId) -> StoreResult<User> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query("SELECT * FROM users WHERE id = $1 FOR UPDATE")
            .bind(Uuid::from(id))
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(DomainError::NotFound)?;
        let mut user = map_user(&row)?;
        user.deactivate();
        sqlx::query("UPDATE users SET active = FALSE WHERE id = $1")
            .bind(Uuid::from(user.id))
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(user)
    }

    async fn create_store(
        &self,
        name: String,
        code: String,
        address: Option<String>,
    ) -> StoreResult<Store> {
        let store = Store::new(StoreId::new(), name, code, address, Utc::now())?;
        sqlx::query(
            "INSERT INTO stores (id, name, code, address, active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(Uuid::from(store.id))
        .bind(&store.name)
        .bind(&store.code)
        .bind(&store.address)
        .bind(store.active)
        .bind(store.created_at)
        .bind(store.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| unique_conflict(e, "store code is already in use"))?;
        Ok(store)
    }

    async fn store(&self, id: StoreId) -> StoreResult<Option<Store>> {
        let row = sqlx::query("SELECT * FROM stores WHERE id = $1")
            .bind(Uuid::from(id))
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(map_store).transpose()
    }

    async fn list_stores(&self) -> StoreResult<Vec<Store>> {
        let rows = sqlx::query("SELECT * FROM stores ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(map_store).collect()
    }

    async fn rename_store(&self, id: StoreId, name: String) -> StoreResult<Store> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query("SELECT * FROM stores WHERE id = $1 FOR UPDATE")
            .bind(Uuid::from(id))
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(DomainError::NotFound)?;
        let mut store = map_store(&row)?;
        store.rename(name, Utc::now())?;
        sqlx::query("UPDATE stores SET name = $2, updated_at = $3 WHERE id = $1")
            .bind(Uuid::from(store.id))
            .bind(&store.name)
            .bind(store.updated_at)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(store)
    }

    async fn deactivate_store(&self, id: StoreId) -> StoreResult<Store> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query("SELECT * FROM stores WHERE id = $1 FOR UPDATE")
            .bind(Uuid::from(id))
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(DomainError::NotFound)?;
        let mut store = map_store(&row)?;
        store.deactivate(Utc::now());
        sqlx::query("UPDATE stores SET active = FALSE, updated_at = $2 WHERE id = $1")
            .bind(Uuid::from(store.id))
            .bind(store.updated_at)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(store)
    }

    async fn create_product(
        &self,
        name: String,
        description: Option<String>,
        variants: Vec<NewVariant>,
    ) -> StoreResult<Product> {
        let now = Utc::now();
        let mut product = Product::new(ProductId::new(), name, description, now)?;
        for variant in variants {
            product.add_variant(variant, now)?;
        }
        sqlx::query(
            "INSERT INTO products (id, name, description, variants, active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(Uuid::from(product.id))
        .bind(&product.name)
        .bind(&product.description)
        .bind(Json(&product.variants))
        .bind(product.active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(product)
    }

    async fn product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        let row = sqlx::query("SELECT * FROM products WHERE id = $1")
            .bind(Uuid::from(id))
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(map_product).transpose()
    }

    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query("SELECT * FROM products ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(map_product).collect()
    }

    async fn add_variant(&self, product_id: ProductId, new: NewVariant) -> StoreResult<Product> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query("SELECT * FROM products WHERE id = $1 FOR UPDATE")
            .bind(Uuid::from(product_id))
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(DomainError::NotFound)?;
        let mut product = map_product(&row)?;
        product.add_variant(new, Utc::now())?;
        sqlx::query("UPDATE products SET variants = $2, updated_at = $3 WHERE id = $1")
            .bind(Uuid::from(product.id))
            .bind(Json(&product.variants))
            .bind(product.updated_at)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(product)
    }

    async fn rename_product(&self, id: ProductId, name: String) -> StoreResult<Product> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query("SELECT * FROM products WHERE id = $1 FOR UPDATE")
            .bind(Uuid::from(id))
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(DomainError::NotFound)?;
        let mut product = map_product(&row)?;
        product.rename(name, Utc::now())?;
        sqlx::query("UPDATE products SET name = $2, updated_at = $3 WHERE id = $1")
            .bind(Uuid::from(product.id))
            .bind(&product.name)
            .bind(product.updated_at)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(product)
    }

    async fn deactivate_product(&self, id: ProductId) -> StoreResult<Product> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query("SELECT * FROM products WHERE id = $1 FOR UPDATE")
            .bind(Uuid::from(id))
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(DomainError::NotFound)?;
        let mut product = map_product(&row)?;
        product.deactivate(Utc::now());
        sqlx::query("UPDATE products SET active = FALSE, updated_at = $2 WHERE id = $1")
            .bind(Uuid::from(product.id))
            .bind(product.updated_at)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(product)
    }

    async fn variant(&self, id: VariantId) -> StoreResult<Option<(Product, Variant)>> {
        let row = sqlx::query(
            "SELECT * FROM products p WHERE EXISTS \
             (SELECT 1 FROM jsonb_array_elements(p.variants) v WHERE v->>'id' = $1)",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else { return Ok(None) };
        let product = map_product(&row)?;
        let variant = product.variant(id).cloned();
        Ok(variant.map(|v| (product, v)))
    }

    async fn create_record(
        &self,
        variant_id: VariantId,
        store_id: StoreId,
        quantity: i64,
        low_stock_threshold: i64,
    ) -> StoreResult<InventoryRecord> {
        let mut tx = self.pool.begin().await?;
        store_exists(&mut tx, store_id, "store_id").await?;
        variant_exists(&mut tx, variant_id, "variant_id").await?;
        let record = InventoryRecord::new(
            InventoryId::new(),
            variant_id,
            store_id,
            quantity,
            low_stock_threshold,
            Utc::now(),
        )?;
        insert_record(&mut tx, &record).await?;
        tx.commit().await?;
        Ok(record)
    }

    async fn record(&self, id: InventoryId) -> StoreResult<Option<InventoryRecord>> {
        let row = sqlx::query("SELECT * FROM inventory_records WHERE id = $1")
            .bind(Uuid::from(id))
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(map_record).transpose()
    }

    async fn record_for(
        &self,
        variant_id: VariantId,
        store_id: StoreId,
    ) -> StoreResult<Option<InventoryRecord>> {
        let row = sqlx::query(
            "SELECT * FROM inventory_records WHERE variant_id = $1 AND store_id = $2",
        )
        .bind(Uuid::from(variant_id))
        .bind(Uuid::from(store_id))
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(map_record).transpose()
    }

    async fn list_records(&self, store_id: Option<StoreId>) -> StoreResult<Vec<InventoryRecord>> {
        let rows = match store_id {
            Some(store_id) => {
                sqlx::query(
                    "SELECT * FROM inventory_records WHERE store_id = $1 ORDER BY created_at",
                )
                .bind(Uuid::from(store_id))
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query("SELECT * FROM inventory_records ORDER BY created_at")
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        rows.iter().map(map_record).collect()
    }

    async fn adjust_record(&self, id: InventoryId, delta: i64) -> StoreResult<InventoryRecord> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query("SELECT * FROM inventory_records WHERE id = $1 FOR UPDATE")
            .bind(Uuid::from(id))
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(DomainError::NotFound)?;
        let record = map_record(&row)?;
        let effect = StockEffect {
            store_id: record.store_id,
            delta,
            entry_type: EntryType::Adjustment,
        };
        let record = apply_effect(&mut tx, record.variant_id, effect).await?;
        tx.commit().await?;
        Ok(record)
    }

    async fn entries_for(&self, id: InventoryId) -> StoreResult<Vec<LedgerEntry>> {
        let rows = sqlx::query(
            "SELECT * FROM ledger_entries WHERE inventory_id = $1 ORDER BY occurred_at, id",
        )
        .bind(Uuid::from(id))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(map_entry).collect()
    }

    async fn create_transfer(
        &self,
        cmd: NewTransfer,
        initial: TransferStatus,
    ) -> StoreResult<TransferOutcome> {
        let mut tx = self.pool.begin().await?;
        store_exists(&mut tx, cmd.from_store_id, "from_store_id").await?;
        store_exists(&mut tx, cmd.to_store_id, "to_store_id").await?;
        variant_exists(&mut tx, cmd.variant_id, "variant_id").await?;

        let now = Utc::now();
        let outcome = match initial {
            TransferStatus::Pending => {
                let transfer = Transfer::pending(TransferId::new(), cmd, now)?;
                insert_transfer(&mut tx, &transfer).await?;
                TransferOutcome {
                    transfer,
                    source: None,
                    destination: None,
                }
            }
            TransferStatus::Completed => {
                let (transfer, effects) = Transfer::completed(TransferId::new(), cmd, now)?;
                let mut outcome = TransferOutcome {
                    transfer,
                    source: None,
                    destination: None,
                };
                for effect in in_lock_order(effects) {
                    let record = apply_effect(&mut tx, outcome.transfer.variant_id, effect).await?;
                    attach_record(&mut outcome, record);
                }
                insert_transfer(&mut tx, &outcome.transfer).await?;
                outcome
            }
            other => {
                return Err(DomainError::field(
                    "status",
                    format!("transfers cannot be created as '{other}'"),
                )
                .into());
            }
        };
        tx.commit().await?;
        Ok(outcome)
    }

    async fn transfer(&self, id: TransferId) -> StoreResult<Option<Transfer>> {
        let row = sqlx::query("SELECT * FROM transfers WHERE id = $1")
            .bind(Uuid::from(id))
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(map_transfer).transpose()
    }

    async fn list_transfers(&self) -> StoreResult<Vec<Transfer>> {
        let rows = sqlx::query("SELECT * FROM transfers ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(map_transfer).collect()
    }

    async fn transition_transfer(
        &self,
        id: TransferId,
        to: TransferStatus,
    ) -> StoreResult<TransferOutcome> {
        let mut tx = self.pool.begin().await?;
        let mut transfer = transfer_for_update(&mut tx, id).await?;
        let effect = transfer.transition(to, Utc::now())?;
        let mut outcome = TransferOutcome {
            transfer,
            source: None,
            destination: None,
        };
        if let Some(effect) = effect {
            let record = apply_effect(&mut tx, outcome.transfer.variant_id, effect).await?;
            attach_record(&mut outcome, record);
        }
        update_transfer(&mut tx, &outcome.transfer).await?;
        tx.commit().await?;
        Ok(outcome)
    }

    async fn cancel_transfer(
        &self,
        id: TransferId,
        reason: Option<String>,
    ) -> StoreResult<TransferOutcome> {
        let mut tx = self.pool.begin().await?;
        let mut transfer = transfer_for_update(&mut tx, id).await?;
        let effect = transfer.cancel(reason, Utc::now())?;
        let mut outcome = TransferOutcome {
            transfer,
            source: None,
            destination: None,
        };
        if let Some(effect) = effect {
            let record = apply_effect(&mut tx, outcome.transfer.variant_id, effect).await?;
            attach_record(&mut outcome, record);
        }
        update_transfer(&mut tx, &outcome.transfer).await?;
        tx.commit().await?;
        Ok(outcome)
    }

    async fn create_purchase(&self, cmd: NewPurchase) -> StoreResult<Purchase> {
        let mut tx = self.pool.begin().await?;
        store_exists(&mut tx, cmd.store_id, "store_id").await?;
        for line in &cmd.lines {
            variant_exists(&mut tx, line.variant_id, "lines.variant_id").await?;
        }

        let purchase = Purchase::new(PurchaseId::new(), cmd, Utc::now())?;
        for line in &purchase.lines {
            let effect = StockEffect {
                store_id: purchase.store_id,
                delta: line.quantity,
                entry_type: EntryType::Purchase,
            };
            apply_effect(&mut tx, line.variant_id, effect).await?;
        }
        sqlx::query(
            "INSERT INTO purchases (id, store_id, supplier, reference, lines, user_id, received_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(Uuid::from(purchase.id))
        .bind(Uuid::from(purchase.store_id))
        .bind(&purchase.supplier)
        .bind(&purchase.reference)
        .bind(Json(&purchase.lines))
        .bind(Uuid::from(purchase.user_id))
        .bind(purchase.received_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(purchase)
    }

    async fn purchase(&self, id: PurchaseId) -> StoreResult<Option<Purchase>> {
        let row = sqlx::query("SELECT * FROM purchases WHERE id = $1")
            .bind(Uuid::from(id))
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(map_purchase).transpose()
    }

    async fn list_purchases(&self) -> StoreResult<Vec<Purchase>> {
        let rows = sqlx::query("SELECT * FROM purchases ORDER BY received_at")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(map_purchase).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_order_is_direction_independent() {
        let a = StoreId::new();
        let b = StoreId::new();
        let debit = StockEffect {
            store_id: a,
            delta: -5,
            entry_type: EntryType::TransferOut,
        };
        let credit = StockEffect {
            store_id: b,
            delta: 5,
            entry_type: EntryType::TransferIn,
        };

        let forward = in_lock_order([debit, credit]);
        let backward = in_lock_order([credit, debit]);
        assert_eq!(forward.map(|e| e.store_id), backward.map(|e| e.store_id));
    }
}
