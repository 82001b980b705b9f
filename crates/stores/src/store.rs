use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockpile_core::{DomainError, DomainResult, StoreId};

/// A store: one physical or logical location that holds inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    pub id: StoreId,
    pub name: String,
    pub code: String,
    pub address: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Store {
    pub fn new(
        id: StoreId,
        name: impl Into<String>,
        code: impl Into<String>,
        address: Option<String>,
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = name.into();
        let code = code.into();
        if name.trim().is_empty() {
            return Err(DomainError::field("name", "cannot be empty"));
        }
        if code.trim().is_empty() {
            return Err(DomainError::field("code", "cannot be empty"));
        }

        Ok(Self {
            id,
            name,
            code,
            address,
            active: true,
            created_at: at,
            updated_at: at,
        })
    }

    pub fn rename(&mut self, name: impl Into<String>, at: DateTime<Utc>) -> DomainResult<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::field("name", "cannot be empty"));
        }
        self.name = name;
        self.updated_at = at;
        Ok(())
    }

    pub fn deactivate(&mut self, at: DateTime<Utc>) {
        self.active = false;
        self.updated_at = at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_store_is_active() {
        let store = Store::new(StoreId::new(), "Downtown", "DT-01", None, Utc::now()).unwrap();
        assert!(store.active);
    }

    #[test]
    fn blank_code_is_rejected() {
        let err = Store::new(StoreId::new(), "Downtown", " ", None, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation { field: Some(f), .. } if f == "code"));
    }

    #[test]
    fn rename_updates_timestamp() {
        let t0 = Utc::now();
        let mut store = Store::new(StoreId::new(), "Downtown", "DT-01", None, t0).unwrap();
        let t1 = t0 + chrono::Duration::seconds(5);
        store.rename("Uptown", t1).unwrap();
        assert_eq!(store.name, "Uptown");
        assert_eq!(store.updated_at, t1);
    }
}
