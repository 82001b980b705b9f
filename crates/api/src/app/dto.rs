//! Request DTOs and JSON mapping helpers.

use serde::Deserialize;
use serde_json::{Value, json};

use stockpile_auth::User;
use stockpile_catalog::{NewVariant, Product, Variant};
use stockpile_core::{StoreId, VariantId};
use stockpile_inventory::{InventoryRecord, LedgerEntry, Transfer};
use stockpile_purchasing::{Purchase, PurchaseLine};
use stockpile_stores::Store;
use stockpile_infra::TransferOutcome;

// requests

#[derive(Debug, Deserialize)]
pub struct CreateStoreRequest {
    pub name: String,
    pub code: String,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStoreRequest {
    pub name: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub display_name: String,
    pub role: String,
    #[serde(default)]
    pub store_ids: Vec<StoreId>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub variants: Vec<NewVariant>,
}

#[derive(Debug, Deserialize)]
pub struct RenameProductRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateRecordRequest {
    pub variant_id: VariantId,
    pub store_id: StoreId,
    pub quantity: i64,
    #[serde(default)]
    pub low_stock_threshold: i64,
}

#[derive(Debug, Deserialize)]
pub struct AdjustRecordRequest {
    pub delta: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateTransferRequest {
    pub from_store_id: StoreId,
    pub to_store_id: StoreId,
    pub variant_id: VariantId,
    pub quantity: i64,
    pub notes: Option<String>,
    /// `"pending"` to enter the multi-step workflow; omitted, the transfer
    /// completes synchronously.
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TransitionTransferRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct CancelTransferRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePurchaseRequest {
    pub store_id: StoreId,
    pub supplier: String,
    pub reference: Option<String>,
    pub lines: Vec<PurchaseLine>,
}

// json views

pub fn store_to_json(store: &Store) -> Value {
    json!({
        "id": store.id.to_string(),
        "name": store.name,
        "code": store.code,
        "address": store.address,
        "active": store.active,
        "created_at": store.created_at,
        "updated_at": store.updated_at,
    })
}

pub fn user_to_json(user: &User) -> Value {
    json!({
        "id": user.id.to_string(),
        "email": user.email,
        "display_name": user.display_name,
        "role": user.role.as_str(),
        "store_ids": user.store_ids.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
        "active": user.active,
        "created_at": user.created_at,
    })
}

pub fn variant_to_json(variant: &Variant) -> Value {
    json!({
        "id": variant.id.to_string(),
        "sku": variant.sku,
        "attributes": variant.attributes,
        "price_cents": variant.price_cents,
    })
}

pub fn product_to_json(product: &Product) -> Value {
    json!({
        "id": product.id.to_string(),
        "name": product.name,
        "description": product.description,
        "variants": product.variants.iter().map(variant_to_json).collect::<Vec<_>>(),
        "active": product.active,
        "created_at": product.created_at,
        "updated_at": product.updated_at,
    })
}

pub fn record_to_json(record: &InventoryRecord) -> Value {
    json!({
        "id": record.id.to_string(),
        "variant_id": record.variant_id.to_string(),
        "store_id": record.store_id.to_string(),
        "quantity": record.quantity,
        "low_stock_threshold": record.low_stock_threshold,
        "low_stock": record.is_low_stock(),
        "created_at": record.created_at,
        "updated_at": record.updated_at,
    })
}

pub fn entry_to_json(entry: &LedgerEntry) -> Value {
    json!({
        "id": entry.id.to_string(),
        "inventory_id": entry.inventory_id.to_string(),
        "entry_type": entry.entry_type.as_str(),
        "quantity": entry.quantity,
        "occurred_at": entry.occurred_at,
    })
}

pub fn transfer_to_json(transfer: &Transfer) -> Value {
    json!({
        "id": transfer.id.to_string(),
        "from_store_id": transfer.from_store_id.to_string(),
        "to_store_id": transfer.to_store_id.to_string(),
        "variant_id": transfer.variant_id.to_string(),
        "quantity": transfer.quantity,
        "status": transfer.status.as_str(),
        "notes": transfer.notes,
        "cancellation_reason": transfer.cancellation_reason,
        "user_id": transfer.user_id.to_string(),
        "created_at": transfer.created_at,
        "updated_at": transfer.updated_at,
    })
}

/// Transfer plus the inventory records the operation touched.
pub fn transfer_outcome_to_json(outcome: &TransferOutcome) -> Value {
    json!({
        "transfer": transfer_to_json(&outcome.transfer),
        "source_record": outcome.source.as_ref().map(record_to_json),
        "destination_record": outcome.destination.as_ref().map(record_to_json),
    })
}

/// Detail view with the related entities hydrated.
pub fn transfer_detail_to_json(
    transfer: &Transfer,
    from_store: Option<&Store>,
    to_store: Option<&Store>,
    variant: Option<&(Product, Variant)>,
    user: Option<&User>,
) -> Value {
    let mut value = transfer_to_json(transfer);
    value["from_store"] = from_store.map(store_to_json).unwrap_or(Value::Null);
    value["to_store"] = to_store.map(store_to_json).unwrap_or(Value::Null);
    value["variant"] = variant
        .map(|(product, variant)| {
            let mut v = variant_to_json(variant);
            v["product_id"] = json!(product.id.to_string());
            v["product_name"] = json!(product.name);
            v
        })
        .unwrap_or(Value::Null);
    value["user"] = user.map(user_to_json).unwrap_or(Value::Null);
    value
}

pub fn purchase_to_json(purchase: &Purchase) -> Value {
    json!({
        "id": purchase.id.to_string(),
        "store_id": purchase.store_id.to_string(),
        "supplier": purchase.supplier,
        "reference": purchase.reference,
        "lines": purchase.lines.iter().map(|l| json!({
            "variant_id": l.variant_id.to_string(),
            "quantity": l.quantity,
            "unit_cost_cents": l.unit_cost_cents,
        })).collect::<Vec<_>>(),
        "total_cost_cents": purchase.total_cost_cents(),
        "user_id": purchase.user_id.to_string(),
        "received_at": purchase.received_at,
    })
}
