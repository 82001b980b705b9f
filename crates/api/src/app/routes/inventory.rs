use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;

use stockpile_auth::{Action, Resource};
use stockpile_core::{InventoryId, StoreId};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_records).post(create_record))
        .route("/low-stock", get(list_low_stock))
        .route("/:id", get(get_record))
        .route("/:id/adjust", post(adjust_record))
        .route("/:id/transactions", get(get_transactions))
}

#[derive(Debug, Deserialize)]
pub struct RecordFilter {
    pub store_id: Option<String>,
}

fn parse_id(id: &str) -> Result<InventoryId, axum::response::Response> {
    id.parse().map_err(errors::domain_error_to_response)
}

fn parse_filter(filter: &RecordFilter) -> Result<Option<StoreId>, axum::response::Response> {
    match &filter.store_id {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(errors::domain_error_to_response),
        None => Ok(None),
    }
}

pub async fn list_records(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Query(filter): Query<RecordFilter>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&services, &actor, Resource::Inventory, Action::View) {
        return resp;
    }
    let store_id = match parse_filter(&filter) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.store.list_records(store_id).await {
        Ok(records) => Json(
            records.iter().map(dto::record_to_json).collect::<Vec<_>>(),
        )
        .into_response(),
        Err(e) => errors::store_error_to_response(e, actor.user_id()),
    }
}

/// Records at or below their low-stock threshold.
pub async fn list_low_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Query(filter): Query<RecordFilter>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&services, &actor, Resource::Inventory, Action::View) {
        return resp;
    }
    let store_id = match parse_filter(&filter) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.store.list_records(store_id).await {
        Ok(records) => Json(
            records
                .iter()
                .filter(|r| r.is_low_stock())
                .map(dto::record_to_json)
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(e) => errors::store_error_to_response(e, actor.user_id()),
    }
}

pub async fn create_record(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<dto::CreateRecordRequest>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&services, &actor, Resource::Inventory, Action::Create)
    {
        return resp;
    }
    match services
        .store
        .create_record(
            body.variant_id,
            body.store_id,
            body.quantity,
            body.low_stock_threshold,
        )
        .await
    {
        Ok(record) => (StatusCode::CREATED, Json(dto::record_to_json(&record))).into_response(),
        Err(e) => errors::store_error_to_response(e, actor.user_id()),
    }
}

pub async fn get_record(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&services, &actor, Resource::Inventory, Action::View) {
        return resp;
    }
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.store.record(id).await {
        Ok(Some(record)) => Json(dto::record_to_json(&record)).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "record not found"),
        Err(e) => errors::store_error_to_response(e, actor.user_id()),
    }
}

pub async fn adjust_record(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::AdjustRecordRequest>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&services, &actor, Resource::Inventory, Action::Update)
    {
        return resp;
    }
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.store.adjust_record(id, body.delta).await {
        Ok(record) => Json(dto::record_to_json(&record)).into_response(),
        Err(e) => errors::store_error_to_response(e, actor.user_id()),
    }
}

pub async fn get_transactions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&services, &actor, Resource::Inventory, Action::View) {
        return resp;
    }
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.store.entries_for(id).await {
        Ok(entries) => Json(
            entries.iter().map(dto::entry_to_json).collect::<Vec<_>>(),
        )
        .into_response(),
        Err(e) => errors::store_error_to_response(e, actor.user_id()),
    }
}
