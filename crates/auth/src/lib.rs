//! `stockpile-auth` — pure authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: the API layer
//! feeds it validated claims and asks a single question per request.

pub mod claims;
pub mod jwt;
pub mod policy;
pub mod roles;
pub mod user;

pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtError, JwtValidator};
pub use policy::{Action, AuthzError, PermissionTable, Resource, authorize};
pub use roles::Role;
pub use user::User;
