//! User directory entity.
//!
//! Users exist for authorization context and audit attribution only: a role,
//! store memberships, and a display identity. Credentials and token issuance
//! live outside this system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockpile_core::{DomainError, DomainResult, StoreId, UserId};

use crate::Role;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub store_ids: Vec<StoreId>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        id: UserId,
        email: impl Into<String>,
        display_name: impl Into<String>,
        role: Role,
        store_ids: Vec<StoreId>,
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let email = email.into();
        let display_name = display_name.into();

        if email.trim().is_empty() || !email.contains('@') {
            return Err(DomainError::field("email", "must be a valid email address"));
        }
        if display_name.trim().is_empty() {
            return Err(DomainError::field("display_name", "cannot be empty"));
        }

        Ok(Self {
            id,
            email,
            display_name,
            role,
            store_ids,
            active: true,
            created_at: at,
        })
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_is_active_until_deactivated() {
        let mut user = User::new(
            UserId::new(),
            "ops@example.com",
            "Ops",
            Role::new("staff"),
            vec![StoreId::new()],
            Utc::now(),
        )
        .unwrap();
        assert!(user.active);
        user.deactivate();
        assert!(!user.active);
    }

    #[test]
    fn email_must_look_like_an_email() {
        let err = User::new(
            UserId::new(),
            "not-an-email",
            "Ops",
            Role::new("staff"),
            vec![],
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation { field: Some(f), .. } if f == "email"));
    }

    #[test]
    fn display_name_cannot_be_blank() {
        let err = User::new(
            UserId::new(),
            "ops@example.com",
            "   ",
            Role::new("viewer"),
            vec![],
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
    }
}
