//! `gatehouse-core`: identity primitives shared by every crate.
//!
//! Nothing here knows about tokens, passwords, HTTP or storage engines.

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::UserId;
