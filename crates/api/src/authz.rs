//! One authorization guard for every handler.

use axum::http::StatusCode;

use stockpile_auth::{Action, Resource, authorize};

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::ActorContext;

/// Check the actor's role against the permission table.
///
/// Returns the ready-to-send 403 response on denial so handlers can stay in
/// the guard-then-act shape.
pub fn require(
    services: &AppServices,
    actor: &ActorContext,
    resource: Resource,
    action: Action,
) -> Result<(), axum::response::Response> {
    authorize(&services.permissions, actor.role(), resource, action)
        .map_err(|e| errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string()))
}
