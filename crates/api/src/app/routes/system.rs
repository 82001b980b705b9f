use axum::{Json, http::StatusCode, response::IntoResponse};

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(
    axum::extract::Extension(actor): axum::extract::Extension<crate::context::ActorContext>,
) -> impl IntoResponse {
    Json(serde_json::json!({
        "user_id": actor.user_id().to_string(),
        "role": actor.role().as_str(),
        "store_ids": actor.store_ids().iter().map(|s| s.to_string()).collect::<Vec<_>>(),
    }))
}
