use stockpile_auth::{JwtClaims, Role};
use stockpile_core::{StoreId, UserId};

/// The authenticated actor, injected into every protected request.
#[derive(Debug, Clone)]
pub struct ActorContext {
    user_id: UserId,
    role: Role,
    store_ids: Vec<StoreId>,
}

impl ActorContext {
    pub fn from_claims(claims: &JwtClaims) -> Self {
        Self {
            user_id: claims.sub,
            role: claims.role.clone(),
            store_ids: claims.store_ids.clone(),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn store_ids(&self) -> &[StoreId] {
        &self.store_ids
    }
}
