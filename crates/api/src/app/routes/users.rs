use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use stockpile_auth::{Action, Resource, Role};
use stockpile_core::UserId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", get(get_user).patch(update_user))
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&services, &actor, Resource::User, Action::View) {
        return resp;
    }
    match services.store.list_users().await {
        Ok(users) => Json(users.iter().map(dto::user_to_json).collect::<Vec<_>>()).into_response(),
        Err(e) => errors::store_error_to_response(e, actor.user_id()),
    }
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<dto::CreateUserRequest>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&services, &actor, Resource::User, Action::Create) {
        return resp;
    }
    match services
        .store
        .create_user(
            body.email,
            body.display_name,
            Role::new(body.role),
            body.store_ids,
        )
        .await
    {
        Ok(user) => (StatusCode::CREATED, Json(dto::user_to_json(&user))).into_response(),
        Err(e) => errors::store_error_to_response(e, actor.user_id()),
    }
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&services, &actor, Resource::User, Action::View) {
        return resp;
    }
    let id: UserId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.store.user(id).await {
        Ok(Some(user)) => Json(dto::user_to_json(&user)).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "user not found"),
        Err(e) => errors::store_error_to_response(e, actor.user_id()),
    }
}

/// Setting `active: false` is a soft delete; the user stays in the directory
/// so past transfers keep their initiator.
pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateUserRequest>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require(&services, &actor, Resource::User, Action::Update) {
        return resp;
    }
    let id: UserId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    if body.active == Some(false) {
        if let Err(e) = services.store.deactivate_user(id).await {
            return errors::store_error_to_response(e, actor.user_id());
        }
    }

    match services.store.user(id).await {
        Ok(Some(user)) => Json(dto::user_to_json(&user)).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "user not found"),
        Err(e) => errors::store_error_to_response(e, actor.user_id()),
    }
}
