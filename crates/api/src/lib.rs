//! HTTP API: routing, token middleware and response mapping.
//!
//! No authentication or authorization logic lives here; handlers call into
//! `gatehouse-auth` and translate its errors into JSON responses.

pub mod app;
pub mod middleware;
