//! Shared application state: the datastore and the permission table.

use std::sync::Arc;

use stockpile_auth::PermissionTable;
use stockpile_infra::{Datastore, InMemoryDatastore};

pub struct AppServices {
    pub store: Arc<dyn Datastore>,
    pub permissions: PermissionTable,
}

/// Select and initialize the backing store.
///
/// With the `postgres` feature enabled and `DATABASE_URL` set, state lives in
/// PostgreSQL; otherwise everything is held in memory and lost on restart.
pub async fn build_services() -> AppServices {
    AppServices {
        store: build_store().await,
        permissions: PermissionTable::default_table(),
    }
}

#[cfg(feature = "postgres")]
async fn build_store() -> Arc<dyn Datastore> {
    match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let store = stockpile_infra::PostgresDatastore::connect(&url)
                .await
                .unwrap_or_else(|e| panic!("failed to connect to postgres: {e}"));
            if let Err(e) = store.migrate().await {
                panic!("failed to run migrations: {e}");
            }
            tracing::info!("using postgres datastore");
            Arc::new(store)
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set, falling back to in-memory datastore");
            Arc::new(InMemoryDatastore::new())
        }
    }
}

#[cfg(not(feature = "postgres"))]
async fn build_store() -> Arc<dyn Datastore> {
    tracing::info!("using in-memory datastore");
    Arc::new(InMemoryDatastore::new())
}
