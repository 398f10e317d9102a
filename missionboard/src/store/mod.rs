//! Repository traits over the relational store.
//!
//! Two implementations exist:
//! - [`postgres::PostgresStore`]: production, backed by a `sqlx` pool
//! - [`crate::mocks::InMemoryStore`]: tests, backed by `HashMap`s behind a mutex
//!
//! # Dyn Compatibility
//!
//! The traits return `Pin<Box<dyn Future>>` instead of using `async fn` so the
//! HTTP layer can hold an `Arc<dyn MissionBoardStore>`. Arguments are taken by
//! value; the returned future only borrows `self`.
//!
//! Lookups by id are not scoped to an organization. Callers compare the
//! entity's `organization_id` with the session's organization and treat a
//! mismatch as not found.

pub mod postgres;

use crate::aggregates::{RegistrationAction, RegistrationState};
use crate::error::Result;
use crate::types::{
    Attendee, Event, EventId, EventOverview, EventStatus, Member, MemberId, MemberStatus,
    MembershipPlan, Organization, OrganizationId, Payment, PaymentId, PaymentStatus, PlanId,
    Registration, Session, Subscription, SubscriptionId, SubscriptionStatus,
};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;
use uuid::Uuid;

/// Future returned by every repository method.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Decision run against an event's registrations while the event is locked.
///
/// Returns the facts to persist, or an error to abort without writing.
pub type RegistrationDecision =
    Box<dyn FnOnce(&mut RegistrationState) -> Result<Vec<RegistrationAction>> + Send>;

/// Filter for member listings
#[derive(Clone, Debug, Default)]
pub struct MemberFilter {
    /// Only members with this status
    pub status: Option<MemberStatus>,
    /// Case-insensitive substring of name or email
    pub search: Option<String>,
}

/// Filter for event listings
#[derive(Clone, Debug, Default)]
pub struct EventFilter {
    /// Only events of this organization (`None` = all organizations)
    pub organization_id: Option<OrganizationId>,
    /// Only events with this status
    pub status: Option<EventStatus>,
    /// Include private events
    pub include_private: bool,
    /// Only events starting at or after this instant
    pub from: Option<DateTime<Utc>>,
}

impl EventFilter {
    /// Events shown on the public pages: scheduled, public, upcoming
    #[must_use]
    pub const fn public(now: DateTime<Utc>) -> Self {
        Self {
            organization_id: None,
            status: Some(EventStatus::Scheduled),
            include_private: false,
            from: Some(now),
        }
    }

    /// All events of an organization
    #[must_use]
    pub const fn organization(organization_id: OrganizationId) -> Self {
        Self {
            organization_id: Some(organization_id),
            status: None,
            include_private: true,
            from: None,
        }
    }

    pub(crate) fn matches(&self, event: &Event) -> bool {
        self.organization_id
            .is_none_or(|org| event.organization_id == org)
            && self.status.is_none_or(|status| event.status == status)
            && (self.include_private || !event.is_private)
            && self.from.is_none_or(|from| event.date >= from)
    }
}

/// Filter for subscription listings
#[derive(Clone, Copy, Debug, Default)]
pub struct SubscriptionFilter {
    /// Only subscriptions of this member
    pub member_id: Option<MemberId>,
    /// Only subscriptions with this status
    pub status: Option<SubscriptionStatus>,
}

/// Organization settings
pub trait OrganizationRepository: Send + Sync {
    /// Load an organization.
    fn get_organization(&self, id: OrganizationId) -> StoreFuture<'_, Option<Organization>>;

    /// Overwrite an organization's settings.
    fn update_organization(&self, organization: Organization) -> StoreFuture<'_, Organization>;
}

/// Members
pub trait MemberRepository: Send + Sync {
    /// List an organization's members, ordered by name.
    fn list_members(
        &self,
        organization_id: OrganizationId,
        filter: MemberFilter,
    ) -> StoreFuture<'_, Vec<Member>>;

    /// Load a member by id.
    fn get_member(&self, id: MemberId) -> StoreFuture<'_, Option<Member>>;

    /// Load a member by (lowercase) email.
    fn find_member_by_email(&self, email: String) -> StoreFuture<'_, Option<Member>>;

    /// Insert a member. A taken email is a conflict.
    fn insert_member(&self, member: Member) -> StoreFuture<'_, Member>;

    /// Overwrite a member. A taken email is a conflict.
    fn update_member(&self, member: Member) -> StoreFuture<'_, Member>;

    /// Delete a member and their registrations. Returns whether a row existed.
    fn delete_member(&self, id: MemberId) -> StoreFuture<'_, bool>;
}

/// Events
pub trait EventRepository: Send + Sync {
    /// List events with their attendance summaries, ordered by date.
    fn list_events(&self, filter: EventFilter) -> StoreFuture<'_, Vec<EventOverview>>;

    /// Load an event with its attendance summary.
    fn get_event(&self, id: EventId) -> StoreFuture<'_, Option<EventOverview>>;

    /// Insert or overwrite an event.
    fn save_event(&self, event: Event) -> StoreFuture<'_, Event>;

    /// Delete an event and its registrations. Returns whether a row existed.
    fn delete_event(&self, id: EventId) -> StoreFuture<'_, bool>;
}

/// Event registrations
pub trait RegistrationRepository: Send + Sync {
    /// Run `decide` against the event's registrations and persist the facts
    /// it returns, as one unit of work.
    ///
    /// The event is locked for the duration, so concurrent decisions for the
    /// same event are serialized. An unknown event is `NotFound`; an error
    /// from `decide` aborts without writing.
    fn decide_registration(
        &self,
        event_id: EventId,
        decide: RegistrationDecision,
    ) -> StoreFuture<'_, Vec<RegistrationAction>>;

    /// Registrations of an event with registrant contact details, oldest first.
    fn list_attendees(&self, event_id: EventId) -> StoreFuture<'_, Vec<Attendee>>;

    /// The member's registration for an event, whatever its status.
    fn find_registration(
        &self,
        event_id: EventId,
        member_id: MemberId,
    ) -> StoreFuture<'_, Option<Registration>>;
}

/// Membership plans
pub trait PlanRepository: Send + Sync {
    /// List an organization's plans, ordered by price.
    fn list_plans(
        &self,
        organization_id: OrganizationId,
        active_only: bool,
    ) -> StoreFuture<'_, Vec<MembershipPlan>>;

    /// Load a plan by id.
    fn get_plan(&self, id: PlanId) -> StoreFuture<'_, Option<MembershipPlan>>;

    /// Insert or overwrite a plan.
    fn save_plan(&self, plan: MembershipPlan) -> StoreFuture<'_, MembershipPlan>;

    /// Delete a plan. A plan referenced by subscriptions is a conflict.
    fn delete_plan(&self, id: PlanId) -> StoreFuture<'_, bool>;
}

/// Subscriptions
pub trait SubscriptionRepository: Send + Sync {
    /// List an organization's subscriptions, newest first.
    fn list_subscriptions(
        &self,
        organization_id: OrganizationId,
        filter: SubscriptionFilter,
    ) -> StoreFuture<'_, Vec<Subscription>>;

    /// Load a subscription by id.
    fn get_subscription(&self, id: SubscriptionId) -> StoreFuture<'_, Option<Subscription>>;

    /// The member's ACTIVE or TRIALING subscription, if any.
    fn current_subscription(&self, member_id: MemberId) -> StoreFuture<'_, Option<Subscription>>;

    /// Insert or overwrite a subscription. A second current subscription for
    /// the same member is a conflict.
    fn save_subscription(&self, subscription: Subscription) -> StoreFuture<'_, Subscription>;
}

/// Payments
pub trait PaymentRepository: Send + Sync {
    /// List an organization's payments, newest first.
    fn list_payments(
        &self,
        organization_id: OrganizationId,
        status: Option<PaymentStatus>,
    ) -> StoreFuture<'_, Vec<Payment>>;

    /// Load a payment by id.
    fn get_payment(&self, id: PaymentId) -> StoreFuture<'_, Option<Payment>>;

    /// Insert or overwrite a payment.
    fn save_payment(&self, payment: Payment) -> StoreFuture<'_, Payment>;
}

/// Sessions issued by the authentication layer
pub trait SessionRepository: Send + Sync {
    /// Look a session up by bearer token.
    fn find_session(&self, token: Uuid) -> StoreFuture<'_, Option<Session>>;
}

/// Everything the HTTP layer needs from storage.
pub trait MissionBoardStore:
    OrganizationRepository
    + MemberRepository
    + EventRepository
    + RegistrationRepository
    + PlanRepository
    + SubscriptionRepository
    + PaymentRepository
    + SessionRepository
{
    /// Check the store is reachable.
    fn ping(&self) -> StoreFuture<'_, ()>;
}
