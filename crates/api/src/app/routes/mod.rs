use axum::{Router, routing::get};

pub mod inventory;
pub mod products;
pub mod purchases;
pub mod stores;
pub mod system;
pub mod transfers;
pub mod users;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/stores", stores::router())
        .nest("/users", users::router())
        .nest("/products", products::router())
        .nest("/inventory/records", inventory::router())
        .nest("/inventory/transfers", transfers::router())
        .nest("/purchases", purchases::router())
}
