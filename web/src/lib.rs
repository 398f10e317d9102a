//! Axum integration for MissionBoard.
//!
//! This crate holds the pieces of the HTTP shell that do not depend on the
//! membership domain:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         Imperative Shell (Axum)         │  ← HTTP, JSON, bearer tokens
//! │  - Request parsing (AppJson)            │  ← Correlation ids
//! │  - Error mapping (AppError)             │  ← Logging
//! ├─────────────────────────────────────────┤
//! │         Functional Core                 │
//! │  - Registration / subscription reducers │  ← Pure decisions
//! │  - Effect descriptions (commits)        │  ← Persisted by services
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Request Flow
//!
//! 1. **HTTP Request** arrives at an Axum handler
//! 2. **Extract data** from request (JSON, path, bearer token)
//! 3. **Call a service**, which loads state, runs a reducer and persists commits
//! 4. **Map result** to an HTTP response (`AppError` for failures)

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;

// Re-export key types for convenience
pub use error::AppError;
pub use extractors::{AppJson, CorrelationId};
pub use middleware::{correlation_id, CORRELATION_ID_HEADER};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
