//! HTTP handlers, grouped by resource.
//!
//! Handlers only translate between JSON and the services in [`crate::app`];
//! every rule lives in the services and reducers.

pub mod events;
pub mod members;
pub mod organization;
pub mod payments;
pub mod plans;
pub mod public;
pub mod registrations;
pub mod subscriptions;
