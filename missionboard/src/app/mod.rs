//! Application services.
//!
//! Services are the imperative shell around the reducers:
//! 1. Load the state a decision needs from the store
//! 2. Run the reducer with the command
//! 3. Turn a rejection into a [`crate::error::MissionBoardError`], or persist
//!    the committed facts
//! 4. Record metrics and log the outcome
//!
//! Every service is scoped to one organization: entities of other
//! organizations are reported as not found.

pub mod billing;
pub mod events;
pub mod members;
pub mod registrations;
pub mod validation;

pub use billing::{PaymentInput, PaymentService, PlanInput, PlanService, SubscriptionService};
pub use events::EventService;
pub use members::{MemberInput, MemberService, OrganizationInput, OrganizationService};
pub use registrations::{
    CancellationOutcome, PublicRegistration, RegistrationOutcome, RegistrationRequest,
    RegistrationService,
};

use crate::error::{MissionBoardError, Result};
use crate::types::OrganizationId;

/// Treat an entity of another organization as missing.
pub(crate) fn scoped<T>(
    entity: Option<T>,
    organization_id: OrganizationId,
    owner: impl Fn(&T) -> OrganizationId,
    resource: &'static str,
    id: impl ToString,
) -> Result<T> {
    entity
        .filter(|e| owner(e) == organization_id)
        .ok_or_else(|| MissionBoardError::not_found(resource, id))
}
