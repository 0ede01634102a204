//! `gatehouse-auth`: credential and token lifecycle plus RBAC guards.
//!
//! This crate is decoupled from HTTP and from any storage engine: persistence
//! is reached only through the [`UserStore`] contract, and the signing secret
//! and store handle are injected at construction.
//!
//! - [`password`]: Argon2id hashing and constant-time verification
//! - [`token`]: HS256 access/refresh token issuance and validation
//! - [`sync`]: idempotent persistence of the latest token pair
//! - [`authorize`]: role and ownership guards over a request [`Principal`]
//! - [`account`]: signup and login orchestration

pub mod account;
pub mod authorize;
pub mod claims;
pub mod error;
pub mod password;
pub mod principal;
pub mod roles;
pub mod store;
pub mod sync;
pub mod token;
pub mod user;

pub use account::{AccountService, LoginRequest, SignupRequest};
pub use authorize::{AuthzError, require_ownership_or_admin, require_role};
pub use claims::{ClaimsSeed, TokenClaims, validate_claims};
pub use error::{AuthError, ErrorKind};
pub use password::{CREDENTIALS_INCORRECT, CredentialHasher, HashCost, HashError, Verification};
pub use principal::Principal;
pub use roles::Role;
pub use store::{StoreError, UserStore, bounded};
pub use sync::TokenStoreSync;
pub use token::{SigningSecret, TokenError, TokenPair, TokenService, TokenTtl};
pub use user::{PageRequest, TokenPatch, UserField, UserKey, UserPage, UserRecord};
