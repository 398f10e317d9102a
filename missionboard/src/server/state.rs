//! Application state shared by all handlers.

use crate::app::{
    EventService, MemberService, OrganizationService, PaymentService, PlanService,
    RegistrationService, SubscriptionService,
};
use crate::store::MissionBoardStore;
use missionboard_core::environment::Clock;
use std::sync::Arc;

/// State handed to every handler.
///
/// Services are cheap to build (a couple of `Arc` clones), so handlers ask
/// for the one they need instead of the state holding each of them.
#[derive(Clone)]
pub struct AppState {
    /// Storage
    pub store: Arc<dyn MissionBoardStore>,
    /// Clock for timestamps and session expiry
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Create new application state
    #[must_use]
    pub fn new(store: Arc<dyn MissionBoardStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Event management
    #[must_use]
    pub fn events(&self) -> EventService {
        EventService::new(Arc::clone(&self.store), Arc::clone(&self.clock))
    }

    /// Event registration
    #[must_use]
    pub fn registrations(&self) -> RegistrationService {
        RegistrationService::new(Arc::clone(&self.store), Arc::clone(&self.clock))
    }

    /// Member administration
    #[must_use]
    pub fn members(&self) -> MemberService {
        MemberService::new(Arc::clone(&self.store), Arc::clone(&self.clock))
    }

    /// Organization settings
    #[must_use]
    pub fn organization(&self) -> OrganizationService {
        OrganizationService::new(Arc::clone(&self.store))
    }

    /// Membership plans
    #[must_use]
    pub fn plans(&self) -> PlanService {
        PlanService::new(Arc::clone(&self.store), Arc::clone(&self.clock))
    }

    /// Subscriptions
    #[must_use]
    pub fn subscriptions(&self) -> SubscriptionService {
        SubscriptionService::new(Arc::clone(&self.store), Arc::clone(&self.clock))
    }

    /// Payments
    #[must_use]
    pub fn payments(&self) -> PaymentService {
        PaymentService::new(Arc::clone(&self.store), Arc::clone(&self.clock))
    }
}
