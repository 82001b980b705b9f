use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use stockpile_auth::{Action, Resource};
use stockpile_catalog::NewVariant;
use stockpile_core::ProductId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/:id",
            get(get_product)
                .patch(rename_product)
                .delete(deactivate_product),
        )
        .route("/:id/variants", post(add_variant))
}

fn parse_id(id: &str) -> Result<ProductId, axum::response::Response> {
    id.parse().map_err(errors::domain_error_to_response)
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&services, &actor, Resource::Product, Action::View) {
        return resp;
    }
    match services.store.list_products().await {
        Ok(products) => Json(
            products.iter().map(dto::product_to_json).collect::<Vec<_>>(),
        )
        .into_response(),
        Err(e) => errors::store_error_to_response(e, actor.user_id()),
    }
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<dto::CreateProductRequest>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&services, &actor, Resource::Product, Action::Create) {
        return resp;
    }
    match services
        .store
        .create_product(body.name, body.description, body.variants)
        .await
    {
        Ok(product) => (StatusCode::CREATED, Json(dto::product_to_json(&product))).into_response(),
        Err(e) => errors::store_error_to_response(e, actor.user_id()),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&services, &actor, Resource::Product, Action::View) {
        return resp;
    }
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.store.product(id).await {
        Ok(Some(product)) => Json(dto::product_to_json(&product)).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "product not found"),
        Err(e) => errors::store_error_to_response(e, actor.user_id()),
    }
}

pub async fn rename_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::RenameProductRequest>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&services, &actor, Resource::Product, Action::Update) {
        return resp;
    }
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.store.rename_product(id, body.name).await {
        Ok(product) => Json(dto::product_to_json(&product)).into_response(),
        Err(e) => errors::store_error_to_response(e, actor.user_id()),
    }
}

pub async fn add_variant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<NewVariant>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&services, &actor, Resource::Product, Action::Update) {
        return resp;
    }
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.store.add_variant(id, body).await {
        Ok(product) => (StatusCode::CREATED, Json(dto::product_to_json(&product))).into_response(),
        Err(e) => errors::store_error_to_response(e, actor.user_id()),
    }
}

pub async fn deactivate_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&services, &actor, Resource::Product, Action::Delete) {
        return resp;
    }
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.store.deactivate_product(id).await {
        Ok(product) => Json(dto::product_to_json(&product)).into_response(),
        Err(e) => errors::store_error_to_response(e, actor.user_id()),
    }
}
