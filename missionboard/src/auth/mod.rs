//! Session authentication for the API.

pub mod middleware;

pub use middleware::{BearerToken, RequireAdmin, SessionUser};
