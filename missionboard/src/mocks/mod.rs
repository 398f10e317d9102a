//! In-memory store for tests.
//!
//! [`InMemoryStore`] implements every repository trait over `HashMap`s behind
//! one mutex. It enforces the same constraints as the `PostgreSQL` schema:
//! unique member emails, one registration per member and event, one current
//! subscription per member, plans restricted while subscribed to, and the
//! delete cascades.

use crate::aggregates::{RegistrationAction, RegistrationState};
use crate::error::{MissionBoardError, Result};
use crate::store::{
    EventFilter, EventRepository, MemberFilter, MemberRepository, MissionBoardStore,
    OrganizationRepository, PaymentRepository, PlanRepository, RegistrationDecision,
    RegistrationRepository, SessionRepository, StoreFuture, SubscriptionFilter,
    SubscriptionRepository,
};
use crate::types::{
    AttendanceSummary, Attendee, Event, EventId, EventOverview, Member, MemberId,
    MembershipPlan, Organization, OrganizationId, Payment, PaymentId, PaymentStatus, PlanId,
    Registration, RegistrationId, Session, Subscription, SubscriptionId,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Debug, Default)]
struct Tables {
    organizations: HashMap<OrganizationId, Organization>,
    members: HashMap<MemberId, Member>,
    sessions: HashMap<Uuid, Session>,
    events: HashMap<EventId, Event>,
    registrations: HashMap<RegistrationId, Registration>,
    plans: HashMap<PlanId, MembershipPlan>,
    subscriptions: HashMap<SubscriptionId, Subscription>,
    payments: HashMap<PaymentId, Payment>,
}

impl Tables {
    fn registrations_of(&self, event_id: EventId) -> Vec<Registration> {
        let mut registrations: Vec<Registration> = self
            .registrations
            .values()
            .filter(|r| r.event_id == event_id)
            .cloned()
            .collect();
        registrations.sort_by_key(|r| (r.registered_at, *r.id.as_uuid()));
        registrations
    }

    fn overview(&self, event: &Event) -> EventOverview {
        let registrations = self.registrations_of(event.id);
        EventOverview {
            attendance: AttendanceSummary::compute(event.capacity, &registrations),
            event: event.clone(),
        }
    }

    fn email_taken(&self, email: &str, except: MemberId) -> bool {
        self.members
            .values()
            .any(|m| m.id != except && m.email == email)
    }
}

/// In-memory implementation of [`MissionBoardStore`].
#[derive(Clone, Debug, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| MissionBoardError::Database("In-memory store lock poisoned".to_string()))
    }

    /// Seed an organization. Organizations are provisioned outside the API.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lock is poisoned.
    pub fn insert_organization(&self, organization: Organization) -> Result<()> {
        self.tables()?
            .organizations
            .insert(organization.id, organization);
        Ok(())
    }

    /// Seed a session, as the external authentication layer would.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lock is poisoned.
    pub fn insert_session(&self, session: Session) -> Result<()> {
        self.tables()?.sessions.insert(session.token, session);
        Ok(())
    }

    /// All registrations of an event, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lock is poisoned.
    pub fn registrations(&self, event_id: EventId) -> Result<Vec<Registration>> {
        Ok(self.tables()?.registrations_of(event_id))
    }
}

fn ready<'a, T: Send + 'a>(result: Result<T>) -> StoreFuture<'a, T> {
    Box::pin(std::future::ready(result))
}

impl OrganizationRepository for InMemoryStore {
    fn get_organization(&self, id: OrganizationId) -> StoreFuture<'_, Option<Organization>> {
        ready(
            self.tables()
                .map(|t| t.organizations.get(&id).cloned()),
        )
    }

    fn update_organization(&self, organization: Organization) -> StoreFuture<'_, Organization> {
        ready(self.tables().and_then(|mut t| {
            match t.organizations.get_mut(&organization.id) {
                Some(existing) => {
                    *existing = organization.clone();
                    Ok(organization)
                }
                None => Err(MissionBoardError::not_found("Organization", organization.id)),
            }
        }))
    }
}

impl MemberRepository for InMemoryStore {
    fn list_members(
        &self,
        organization_id: OrganizationId,
        filter: MemberFilter,
    ) -> StoreFuture<'_, Vec<Member>> {
        let search = filter.search.map(|s| s.to_lowercase());
        ready(self.tables().map(|t| {
            let mut members: Vec<Member> = t
                .members
                .values()
                .filter(|m| m.organization_id == organization_id)
                .filter(|m| filter.status.is_none_or(|status| m.status == status))
                .filter(|m| {
                    search.as_deref().is_none_or(|s| {
                        m.name.to_lowercase().contains(s) || m.email.to_lowercase().contains(s)
                    })
                })
                .cloned()
                .collect();
            members.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.as_uuid().cmp(b.id.as_uuid())));
            members
        }))
    }

    fn get_member(&self, id: MemberId) -> StoreFuture<'_, Option<Member>> {
        ready(self.tables().map(|t| t.members.get(&id).cloned()))
    }

    fn find_member_by_email(&self, email: String) -> StoreFuture<'_, Option<Member>> {
        ready(
            self.tables()
                .map(|t| t.members.values().find(|m| m.email == email).cloned()),
        )
    }

    fn insert_member(&self, member: Member) -> StoreFuture<'_, Member> {
        ready(self.tables().and_then(|mut t| {
            if t.members.contains_key(&member.id) || t.email_taken(&member.email, member.id) {
                return Err(MissionBoardError::conflict(
                    "Duplicate value violates members_email_key",
                ));
            }
            t.members.insert(member.id, member.clone());
            Ok(member)
        }))
    }

    fn update_member(&self, member: Member) -> StoreFuture<'_, Member> {
        ready(self.tables().and_then(|mut t| {
            if !t.members.contains_key(&member.id) {
                return Err(MissionBoardError::not_found("Member", member.id));
            }
            if t.email_taken(&member.email, member.id) {
                return Err(MissionBoardError::conflict(
                    "Duplicate value violates members_email_key",
                ));
            }
            t.members.insert(member.id, member.clone());
            Ok(member)
        }))
    }

    fn delete_member(&self, id: MemberId) -> StoreFuture<'_, bool> {
        ready(self.tables().and_then(|mut t| {
            if t.registrations.values().any(|r| r.member_id == id) {
                return Err(MissionBoardError::conflict(
                    "Operation violates event_registrations_member_id_fkey",
                ));
            }
            if t.members.remove(&id).is_none() {
                return Ok(false);
            }
            t.sessions.retain(|_, s| s.member_id != id);
            t.subscriptions.retain(|_, s| s.member_id != id);
            for event in t.events.values_mut() {
                if event.organizer_id == Some(id) {
                    event.organizer_id = None;
                }
            }
            for payment in t.payments.values_mut() {
                if payment.member_id == Some(id) {
                    payment.member_id = None;
                }
            }
            Ok(true)
        }))
    }
}

impl EventRepository for InMemoryStore {
    fn list_events(&self, filter: EventFilter) -> StoreFuture<'_, Vec<EventOverview>> {
        ready(self.tables().map(|t| {
            let mut events: Vec<&Event> = t.events.values().filter(|e| filter.matches(e)).collect();
            events.sort_by_key(|e| (e.date, *e.id.as_uuid()));
            events.into_iter().map(|e| t.overview(e)).collect()
        }))
    }

    fn get_event(&self, id: EventId) -> StoreFuture<'_, Option<EventOverview>> {
        ready(self.tables().map(|t| t.events.get(&id).map(|e| t.overview(e))))
    }

    fn save_event(&self, event: Event) -> StoreFuture<'_, Event> {
        ready(self.tables().map(|mut t| {
            t.events.insert(event.id, event.clone());
            event
        }))
    }

    fn delete_event(&self, id: EventId) -> StoreFuture<'_, bool> {
        ready(self.tables().map(|mut t| {
            let existed = t.events.remove(&id).is_some();
            t.registrations.retain(|_, r| r.event_id != id);
            existed
        }))
    }
}

impl RegistrationRepository for InMemoryStore {
    fn decide_registration(
        &self,
        event_id: EventId,
        decide: RegistrationDecision,
    ) -> StoreFuture<'_, Vec<RegistrationAction>> {
        // The lock is held from load to write, like the row lock in PostgreSQL.
        ready(self.tables().and_then(|mut t| {
            let event = t
                .events
                .get(&event_id)
                .cloned()
                .ok_or_else(|| MissionBoardError::not_found("Event", event_id))?;

            let mut state = RegistrationState::new(event, t.registrations_of(event_id));
            let facts = decide(&mut state)?;

            for registration in facts.iter().filter_map(RegistrationAction::registration) {
                let duplicate = t.registrations.values().any(|r| {
                    r.id != registration.id
                        && r.event_id == registration.event_id
                        && r.member_id == registration.member_id
                });
                if duplicate {
                    return Err(MissionBoardError::conflict(
                        "Duplicate value violates event_registrations_event_member_key",
                    ));
                }
            }
            for registration in facts.iter().filter_map(RegistrationAction::registration) {
                t.registrations.insert(registration.id, registration.clone());
            }
            Ok(facts)
        }))
    }

    fn list_attendees(&self, event_id: EventId) -> StoreFuture<'_, Vec<Attendee>> {
        ready(self.tables().map(|t| {
            t.registrations_of(event_id)
                .into_iter()
                .filter_map(|registration| {
                    let member = t.members.get(&registration.member_id)?;
                    Some(Attendee {
                        member_name: member.name.clone(),
                        member_email: member.email.clone(),
                        registration,
                    })
                })
                .collect()
        }))
    }

    fn find_registration(
        &self,
        event_id: EventId,
        member_id: MemberId,
    ) -> StoreFuture<'_, Option<Registration>> {
        ready(self.tables().map(|t| {
            t.registrations
                .values()
                .find(|r| r.event_id == event_id && r.member_id == member_id)
                .cloned()
        }))
    }
}

impl PlanRepository for InMemoryStore {
    fn list_plans(
        &self,
        organization_id: OrganizationId,
        active_only: bool,
    ) -> StoreFuture<'_, Vec<MembershipPlan>> {
        ready(self.tables().map(|t| {
            let mut plans: Vec<MembershipPlan> = t
                .plans
                .values()
                .filter(|p| p.organization_id == organization_id && (!active_only || p.active))
                .cloned()
                .collect();
            plans.sort_by(|a, b| a.price.cmp(&b.price).then_with(|| a.name.cmp(&b.name)));
            plans
        }))
    }

    fn get_plan(&self, id: PlanId) -> StoreFuture<'_, Option<MembershipPlan>> {
        ready(self.tables().map(|t| t.plans.get(&id).cloned()))
    }

    fn save_plan(&self, plan: MembershipPlan) -> StoreFuture<'_, MembershipPlan> {
        ready(self.tables().map(|mut t| {
            t.plans.insert(plan.id, plan.clone());
            plan
        }))
    }

    fn delete_plan(&self, id: PlanId) -> StoreFuture<'_, bool> {
        ready(self.tables().and_then(|mut t| {
            if t.subscriptions.values().any(|s| s.plan_id == id) {
                return Err(MissionBoardError::conflict(
                    "Operation violates subscriptions_plan_id_fkey",
                ));
            }
            Ok(t.plans.remove(&id).is_some())
        }))
    }
}

impl SubscriptionRepository for InMemoryStore {
    fn list_subscriptions(
        &self,
        organization_id: OrganizationId,
        filter: SubscriptionFilter,
    ) -> StoreFuture<'_, Vec<Subscription>> {
        ready(self.tables().map(|t| {
            let mut subscriptions: Vec<Subscription> = t
                .subscriptions
                .values()
                .filter(|s| s.organization_id == organization_id)
                .filter(|s| filter.member_id.is_none_or(|m| s.member_id == m))
                .filter(|s| filter.status.is_none_or(|status| s.status == status))
                .cloned()
                .collect();
            subscriptions.sort_by(|a, b| {
                b.created_at
                    .cmp(&a.created_at)
                    .then(a.id.as_uuid().cmp(b.id.as_uuid()))
            });
            subscriptions
        }))
    }

    fn get_subscription(&self, id: SubscriptionId) -> StoreFuture<'_, Option<Subscription>> {
        ready(self.tables().map(|t| t.subscriptions.get(&id).cloned()))
    }

    fn current_subscription(&self, member_id: MemberId) -> StoreFuture<'_, Option<Subscription>> {
        ready(self.tables().map(|t| {
            t.subscriptions
                .values()
                .find(|s| s.member_id == member_id && s.status.is_current())
                .cloned()
        }))
    }

    fn save_subscription(&self, subscription: Subscription) -> StoreFuture<'_, Subscription> {
        ready(self.tables().and_then(|mut t| {
            if !t.plans.contains_key(&subscription.plan_id)
                || !t.members.contains_key(&subscription.member_id)
            {
                return Err(MissionBoardError::conflict(
                    "Operation violates subscriptions foreign key",
                ));
            }
            let second_current = subscription.status.is_current()
                && t.subscriptions.values().any(|s| {
                    s.id != subscription.id
                        && s.member_id == subscription.member_id
                        && s.status.is_current()
                });
            if second_current {
                return Err(MissionBoardError::conflict(
                    "Duplicate value violates subscriptions_current_member_key",
                ));
            }
            t.subscriptions.insert(subscription.id, subscription.clone());
            Ok(subscription)
        }))
    }
}

impl PaymentRepository for InMemoryStore {
    fn list_payments(
        &self,
        organization_id: OrganizationId,
        status: Option<PaymentStatus>,
    ) -> StoreFuture<'_, Vec<Payment>> {
        ready(self.tables().map(|t| {
            let mut payments: Vec<Payment> = t
                .payments
                .values()
                .filter(|p| p.organization_id == organization_id)
                .filter(|p| status.is_none_or(|s| p.status == s))
                .cloned()
                .collect();
            payments.sort_by(|a, b| {
                b.created_at
                    .cmp(&a.created_at)
                    .then(a.id.as_uuid().cmp(b.id.as_uuid()))
            });
            payments
        }))
    }

    fn get_payment(&self, id: PaymentId) -> StoreFuture<'_, Option<Payment>> {
        ready(self.tables().map(|t| t.payments.get(&id).cloned()))
    }

    fn save_payment(&self, payment: Payment) -> StoreFuture<'_, Payment> {
        ready(self.tables().map(|mut t| {
            t.payments.insert(payment.id, payment.clone());
            payment
        }))
    }
}

impl SessionRepository for InMemoryStore {
    fn find_session(&self, token: Uuid) -> StoreFuture<'_, Option<Session>> {
        ready(self.tables().map(|t| t.sessions.get(&token).copied()))
    }
}

impl MissionBoardStore for InMemoryStore {
    fn ping(&self) -> StoreFuture<'_, ()> {
        ready(self.tables().map(|_| ()))
    }
}
