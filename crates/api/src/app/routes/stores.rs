use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use stockpile_auth::{Action, Resource};
use stockpile_core::StoreId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_stores).post(create_store))
        .route("/:id", get(get_store).patch(update_store))
}

pub async fn list_stores(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&services, &actor, Resource::Store, Action::View) {
        return resp;
    }
    match services.store.list_stores().await {
        Ok(stores) => Json(
            stores.iter().map(dto::store_to_json).collect::<Vec<_>>(),
        )
        .into_response(),
        Err(e) => errors::store_error_to_response(e, actor.user_id()),
    }
}

pub async fn create_store(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<dto::CreateStoreRequest>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&services, &actor, Resource::Store, Action::Create) {
        return resp;
    }
    match services
        .store
        .create_store(body.name, body.code, body.address)
        .await
    {
        Ok(store) => (StatusCode::CREATED, Json(dto::store_to_json(&store))).into_response(),
        Err(e) => errors::store_error_to_response(e, actor.user_id()),
    }
}

pub async fn get_store(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&services, &actor, Resource::Store, Action::View) {
        return resp;
    }
    let id: StoreId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.store.store(id).await {
        Ok(Some(store)) => Json(dto::store_to_json(&store)).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "store not found"),
        Err(e) => errors::store_error_to_response(e, actor.user_id()),
    }
}

/// Rename and/or deactivate. Setting `active: false` is a soft delete.
pub async fn update_store(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateStoreRequest>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&services, &actor, Resource::Store, Action::Update) {
        return resp;
    }
    let id: StoreId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    if let Some(name) = body.name {
        if let Err(e) = services.store.rename_store(id, name).await {
            return errors::store_error_to_response(e, actor.user_id());
        }
    }
    if body.active == Some(false) {
        if let Err(e) = services.store.deactivate_store(id).await {
            return errors::store_error_to_response(e, actor.user_id());
        }
    }

    match services.store.store(id).await {
        Ok(Some(store)) => Json(dto::store_to_json(&store)).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "store not found"),
        Err(e) => errors::store_error_to_response(e, actor.user_id()),
    }
}
