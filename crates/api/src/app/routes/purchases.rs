use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use stockpile_auth::{Action, Resource};
use stockpile_core::PurchaseId;
use stockpile_purchasing::NewPurchase;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_purchases).post(create_purchase))
        .route("/:id", get(get_purchase))
}

pub async fn list_purchases(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&services, &actor, Resource::Purchase, Action::View) {
        return resp;
    }
    match services.store.list_purchases().await {
        Ok(purchases) => Json(
            purchases
                .iter()
                .map(dto::purchase_to_json)
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(e) => errors::store_error_to_response(e, actor.user_id()),
    }
}

pub async fn create_purchase(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<dto::CreatePurchaseRequest>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&services, &actor, Resource::Purchase, Action::Create)
    {
        return resp;
    }
    let cmd = NewPurchase {
        store_id: body.store_id,
        supplier: body.supplier,
        reference: body.reference,
        lines: body.lines,
        user_id: actor.user_id(),
    };
    match services.store.create_purchase(cmd).await {
        Ok(purchase) => (StatusCode::CREATED, Json(dto::purchase_to_json(&purchase))).into_response(),
        Err(e) => errors::store_error_to_response(e, actor.user_id()),
    }
}

pub async fn get_purchase(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&services, &actor, Resource::Purchase, Action::View) {
        return resp;
    }
    let id: PurchaseId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.store.purchase(id).await {
        Ok(Some(purchase)) => Json(dto::purchase_to_json(&purchase)).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "purchase not found"),
        Err(e) => errors::store_error_to_response(e, actor.user_id()),
    }
}
