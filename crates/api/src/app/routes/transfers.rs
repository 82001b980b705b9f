//! Inventory transfer endpoints.
//!
//! Creation defaults to the synchronous one-shot flow: the transfer lands in
//! `completed` with stock already moved. A body carrying `"status": "pending"`
//! enters the multi-step workflow driven by the `/:id/status` and
//! `/:id/cancel` endpoints instead.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
};
use chrono::Utc;

use stockpile_auth::{Action, Resource};
use stockpile_core::TransferId;
use stockpile_inventory::{NewTransfer, TransferStatus};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_transfers).post(create_transfer))
        .route("/:id", get(get_transfer))
        .route("/:id/status", patch(transition_transfer))
        .route("/:id/cancel", patch(cancel_transfer))
}

fn parse_id(id: &str) -> Result<TransferId, axum::response::Response> {
    id.parse().map_err(errors::domain_error_to_response)
}

pub async fn list_transfers(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&services, &actor, Resource::Transfer, Action::View) {
        return resp;
    }
    match services.store.list_transfers().await {
        Ok(transfers) => Json(
            transfers
                .iter()
                .map(dto::transfer_to_json)
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(e) => errors::store_error_to_response(e, actor.user_id()),
    }
}

pub async fn create_transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<dto::CreateTransferRequest>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&services, &actor, Resource::Transfer, Action::Create)
    {
        return resp;
    }

    let initial = match body.status.as_deref() {
        None => TransferStatus::Completed,
        Some(raw) => match raw.parse::<TransferStatus>() {
            Ok(status) => status,
            Err(e) => return errors::domain_error_to_response(e),
        },
    };

    let cmd = NewTransfer {
        from_store_id: body.from_store_id,
        to_store_id: body.to_store_id,
        variant_id: body.variant_id,
        quantity: body.quantity,
        notes: body.notes,
        user_id: actor.user_id(),
    };

    match services.store.create_transfer(cmd, initial).await {
        Ok(outcome) => (
            StatusCode::CREATED,
            Json(dto::transfer_outcome_to_json(&outcome)),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e, actor.user_id()),
    }
}

pub async fn get_transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&services, &actor, Resource::Transfer, Action::View) {
        return resp;
    }
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let transfer = match services.store.transfer(id).await {
        Ok(Some(t)) => t,
        Ok(None) => {
            return errors::json_error(StatusCode::NOT_FOUND, "not_found", "transfer not found");
        }
        Err(e) => return errors::store_error_to_response(e, actor.user_id()),
    };

    // Hydrate related entities for the detail view; lookups that fail
    // individually just leave their slot null.
    let from_store = services.store.store(transfer.from_store_id).await.ok().flatten();
    let to_store = services.store.store(transfer.to_store_id).await.ok().flatten();
    let variant = services.store.variant(transfer.variant_id).await.ok().flatten();
    let user = services.store.user(transfer.user_id).await.ok().flatten();

    Json(dto::transfer_detail_to_json(
        &transfer,
        from_store.as_ref(),
        to_store.as_ref(),
        variant.as_ref(),
        user.as_ref(),
    ))
    .into_response()
}

pub async fn transition_transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::TransitionTransferRequest>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&services, &actor, Resource::Transfer, Action::Update)
    {
        return resp;
    }
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let to = match body.status.parse::<TransferStatus>() {
        Ok(status) => status,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.store.transition_transfer(id, to).await {
        Ok(outcome) => {
            tracing::info!(
                transfer_id = %outcome.transfer.id,
                status = %outcome.transfer.status,
                user_id = %actor.user_id(),
                at = %Utc::now(),
                "transfer transitioned"
            );
            Json(dto::transfer_outcome_to_json(&outcome)).into_response()
        }
        Err(e) => errors::store_error_to_response(e, actor.user_id()),
    }
}

pub async fn cancel_transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::CancelTransferRequest>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&services, &actor, Resource::Transfer, Action::Update)
    {
        return resp;
    }
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.store.cancel_transfer(id, body.reason).await {
        Ok(outcome) => Json(dto::transfer_outcome_to_json(&outcome)).into_response(),
        Err(e) => errors::store_error_to_response(e, actor.user_id()),
    }
}
