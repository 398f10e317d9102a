//! Aggregates (reducers) for MissionBoard.
//!
//! Each aggregate owns one decision:
//! - **Registration**: capacity decision, re-registration, cancellation and
//!   waitlist promotion for one event
//! - **Event**: event fields and the status lifecycle
//! - **Subscription**: subscribing to a plan, billing periods, cancellation

pub mod event;
pub mod registration;
pub mod subscription;

pub use event::{
    EventAction, EventDetails, EventEnvironment, EventReducer, EventRejection, EventState,
};
pub use registration::{
    RegistrationAction, RegistrationEnvironment, RegistrationReducer, RegistrationRejection,
    RegistrationState,
};
pub use subscription::{
    SubscriptionAction, SubscriptionEnvironment, SubscriptionReducer, SubscriptionRejection,
    SubscriptionState,
};
