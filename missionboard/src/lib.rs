//! MissionBoard - membership management backend
//!
//! Organizations manage their members, run events that members and the
//! public register for, sell membership plans and record payments.
//!
//! # Architecture
//!
//! ```text
//!   HTTP (axum)          api/   handlers, DTOs, auth extractors
//!        │
//!        ▼
//!   Services             app/   load state, run a reducer, persist commits
//!        │
//!        ├──────────────► aggregates/   pure decisions (reducers)
//!        ▼
//!   Repositories         store/ PostgreSQL (sqlx) or in-memory
//! ```
//!
//! # Key Features
//!
//! ## 1. Capacity-Safe Registration
//!
//! A registration is decided inside the store's unit of work: the event row
//! is locked, its registrations are loaded, the registration reducer decides
//! and the resulting rows are written before the lock is released.
//!
//! ```text
//! seats_taken = Σ (1 + guests) over CONFIRMED and ATTENDED registrations
//!
//! if seats_taken + 1 + guests > capacity {
//!     WAITLISTED
//! } else {
//!     CONFIRMED
//! }
//! ```
//!
//! ## 2. Waitlist Promotion
//!
//! Cancelling a seat-holding registration confirms the oldest waitlisted
//! party that fits into the freed seats.
//!
//! ## 3. Subscription Periods
//!
//! Billing periods use calendar-month arithmetic; days past the end of a
//! short month clamp to its last day.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod aggregates;
pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;
pub mod mocks;
pub mod server;
pub mod store;
pub mod types;

pub use aggregates::{
    EventAction, EventReducer, RegistrationAction, RegistrationReducer, SubscriptionAction,
    SubscriptionReducer,
};
pub use config::Config;
pub use error::{MissionBoardError, Result};
pub use server::{build_router, AppState};
pub use types::*;
