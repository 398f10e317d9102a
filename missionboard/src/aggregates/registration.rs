//! Registration aggregate: capacity decisions and waitlist promotion.
//!
//! The state is one event together with every registration for it. A
//! `Register` command confirms the registrant when nobody is waitlisted and
//! their seats (themselves plus guests) still fit in the event's capacity;
//! otherwise they join the back of the waitlist. After every cancellation the
//! waitlist is promoted in registration order for as long as the head of the
//! queue fits. A party larger than the whole capacity is refused outright, so
//! the head of the queue can always eventually be seated.
//!
//! The reducer commits facts carrying the full updated registration; the
//! registration repository writes them inside the transaction that loaded
//! the state.

use crate::error::MissionBoardError;
use crate::types::{
    AttendanceSummary, Event, EventStatus, MemberId, Registration, RegistrationId,
    RegistrationStatus,
};
use chrono::{DateTime, Utc};
use missionboard_core::{effect::Effect, environment::Clock, reducer::Reducer, smallvec, SmallVec};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ============================================================================
// Actions (Commands + Facts)
// ============================================================================

/// Actions for the Registration aggregate
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistrationAction {
    // Commands
    /// Register a member (or re-register after a cancellation)
    Register {
        /// Identifier used if a new row is created
        registration_id: RegistrationId,
        /// Registrant
        member_id: MemberId,
        /// Additional guests
        guests_count: u32,
        /// Registrant notes
        notes: Option<String>,
    },

    /// Cancel the member's own registration
    Cancel {
        /// Registrant
        member_id: MemberId,
    },

    /// Cancel a registration on behalf of the organization
    AdminCancel {
        /// Registration to cancel
        registration_id: RegistrationId,
    },

    /// Check a confirmed registrant in
    MarkAttended {
        /// Registration to mark
        registration_id: RegistrationId,
    },

    // Facts
    /// A new registration row was created
    Registered {
        /// The new registration
        registration: Registration,
    },

    /// A cancelled registration row was reused
    Reregistered {
        /// The updated registration (same id)
        registration: Registration,
    },

    /// A registration was cancelled
    RegistrationCancelled {
        /// The cancelled registration
        registration: Registration,
    },

    /// A waitlisted registration was confirmed
    WaitlistPromoted {
        /// The promoted registration
        registration: Registration,
    },

    /// A confirmed registrant attended
    AttendanceMarked {
        /// The updated registration
        registration: Registration,
    },

    /// A command was rejected
    RegistrationRejected {
        /// Why
        reason: RegistrationRejection,
    },
}

impl RegistrationAction {
    /// The registration row a fact writes, if this action is a write
    #[must_use]
    pub const fn registration(&self) -> Option<&Registration> {
        match self {
            Self::Registered { registration }
            | Self::Reregistered { registration }
            | Self::RegistrationCancelled { registration }
            | Self::WaitlistPromoted { registration }
            | Self::AttendanceMarked { registration } => Some(registration),
            _ => None,
        }
    }
}

/// Reasons a registration command is rejected
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum RegistrationRejection {
    /// Event is not SCHEDULED
    #[error("Event is not open for registration (status {status})")]
    EventNotOpen {
        /// Current event status
        status: EventStatus,
    },

    /// Registration deadline has passed
    #[error("Registration deadline {deadline} has passed")]
    DeadlinePassed {
        /// The deadline
        deadline: DateTime<Utc>,
    },

    /// Party is larger than the event's whole capacity
    #[error("A party of {seats} cannot fit in an event of capacity {capacity}")]
    PartyExceedsCapacity {
        /// Seats requested (registrant plus guests)
        seats: u64,
        /// Event capacity
        capacity: u32,
    },

    /// Member already holds a non-cancelled registration
    #[error("Already registered for this event (status {status})")]
    AlreadyRegistered {
        /// Status of the existing registration
        status: RegistrationStatus,
    },

    /// Member has no registration for the event
    #[error("No registration found for member {member_id}")]
    NotRegistered {
        /// The member
        member_id: MemberId,
    },

    /// Registration id is unknown for this event
    #[error("Registration {registration_id} not found")]
    RegistrationNotFound {
        /// The registration id
        registration_id: RegistrationId,
    },

    /// Registration is already cancelled or was attended
    #[error("Registration cannot be cancelled (status {status})")]
    NotCancellable {
        /// Current status
        status: RegistrationStatus,
    },

    /// Only confirmed registrations can be checked in
    #[error("Only confirmed registrations can be marked attended (status {status})")]
    NotConfirmed {
        /// Current status
        status: RegistrationStatus,
    },
}

impl From<RegistrationRejection> for MissionBoardError {
    fn from(rejection: RegistrationRejection) -> Self {
        match rejection {
            RegistrationRejection::AlreadyRegistered { .. } => {
                Self::Conflict(rejection.to_string())
            }
            RegistrationRejection::NotRegistered { member_id } => {
                Self::not_found("Registration for member", member_id)
            }
            RegistrationRejection::RegistrationNotFound { registration_id } => {
                Self::not_found("Registration", registration_id)
            }
            RegistrationRejection::EventNotOpen { .. }
            | RegistrationRejection::DeadlinePassed { .. }
            | RegistrationRejection::PartyExceedsCapacity { .. }
            | RegistrationRejection::NotCancellable { .. }
            | RegistrationRejection::NotConfirmed { .. } => Self::Validation(rejection.to_string()),
        }
    }
}

// ============================================================================
// State
// ============================================================================

/// One event and all of its registrations
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistrationState {
    /// The event being registered for
    pub event: Event,
    /// Every registration row for the event, oldest first
    pub registrations: Vec<Registration>,
    /// Last rejection
    pub last_error: Option<RegistrationRejection>,
}

impl RegistrationState {
    /// Creates the state for an event and its registrations
    #[must_use]
    pub const fn new(event: Event, registrations: Vec<Registration>) -> Self {
        Self {
            event,
            registrations,
            last_error: None,
        }
    }

    /// Seats held by CONFIRMED and ATTENDED registrations
    #[must_use]
    pub fn seats_taken(&self) -> u64 {
        self.registrations
            .iter()
            .filter(|r| r.status.holds_seat())
            .map(Registration::seats)
            .sum()
    }

    /// Whether `seats` more seats fit in the event's capacity
    #[must_use]
    pub fn has_room_for(&self, seats: u64) -> bool {
        self.event
            .capacity
            .is_none_or(|capacity| self.seats_taken() + seats <= u64::from(capacity.value()))
    }

    /// Seat and waitlist figures
    #[must_use]
    pub fn summary(&self) -> AttendanceSummary {
        AttendanceSummary::compute(self.event.capacity, &self.registrations)
    }

    /// The member's registration, whatever its status
    #[must_use]
    pub fn find_by_member(&self, member_id: MemberId) -> Option<&Registration> {
        self.registrations.iter().find(|r| r.member_id == member_id)
    }

    /// Registration by id
    #[must_use]
    pub fn find(&self, registration_id: RegistrationId) -> Option<&Registration> {
        self.registrations.iter().find(|r| r.id == registration_id)
    }

    /// Oldest WAITLISTED registration by registration timestamp
    #[must_use]
    pub fn oldest_waitlisted(&self) -> Option<&Registration> {
        self.registrations
            .iter()
            .filter(|r| r.status == RegistrationStatus::Waitlisted)
            .min_by_key(|r| r.registered_at)
    }

    fn upsert(&mut self, registration: &Registration) {
        match self.registrations.iter_mut().find(|r| r.id == registration.id) {
            Some(existing) => *existing = registration.clone(),
            None => self.registrations.push(registration.clone()),
        }
    }
}

// ============================================================================
// Environment
// ============================================================================

/// Environment for the Registration aggregate
#[derive(Clone)]
pub struct RegistrationEnvironment {
    /// Clock for timestamps and deadline checks
    pub clock: Arc<dyn Clock>,
}

impl RegistrationEnvironment {
    /// Creates a new `RegistrationEnvironment`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the Registration aggregate
#[derive(Clone, Copy, Debug, Default)]
pub struct RegistrationReducer;

impl RegistrationReducer {
    /// Creates a new `RegistrationReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn validate_register(
        state: &RegistrationState,
        member_id: MemberId,
        seats: u64,
        now: DateTime<Utc>,
    ) -> Result<(), RegistrationRejection> {
        if state.event.status != EventStatus::Scheduled {
            return Err(RegistrationRejection::EventNotOpen {
                status: state.event.status,
            });
        }

        if let Some(deadline) = state.event.registration_deadline {
            if now > deadline {
                return Err(RegistrationRejection::DeadlinePassed { deadline });
            }
        }

        if let Some(existing) = state.find_by_member(member_id) {
            if !existing.status.is_cancelled() {
                return Err(RegistrationRejection::AlreadyRegistered {
                    status: existing.status,
                });
            }
        }

        if let Some(capacity) = state.event.capacity {
            if seats > u64::from(capacity.value()) {
                return Err(RegistrationRejection::PartyExceedsCapacity {
                    seats,
                    capacity: capacity.value(),
                });
            }
        }

        Ok(())
    }

    fn validate_cancel(registration: &Registration) -> Result<(), RegistrationRejection> {
        if registration.status.is_cancelled() || registration.status == RegistrationStatus::Attended
        {
            return Err(RegistrationRejection::NotCancellable {
                status: registration.status,
            });
        }
        Ok(())
    }

    /// Applies a fact to state
    fn apply_event(state: &mut RegistrationState, action: &RegistrationAction) {
        match action {
            RegistrationAction::RegistrationRejected { reason } => {
                state.last_error = Some(reason.clone());
            }
            fact => {
                if let Some(registration) = fact.registration() {
                    state.upsert(registration);
                    state.last_error = None;
                }
            }
        }
    }

    fn reject(
        state: &mut RegistrationState,
        reason: RegistrationRejection,
    ) -> SmallVec<[Effect<RegistrationAction>; 4]> {
        Self::apply_event(state, &RegistrationAction::RegistrationRejected { reason });
        SmallVec::new()
    }

    fn register(
        state: &mut RegistrationState,
        registration_id: RegistrationId,
        member_id: MemberId,
        guests_count: u32,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> SmallVec<[Effect<RegistrationAction>; 4]> {
        let seats = 1 + u64::from(guests_count);
        if let Err(reason) = Self::validate_register(state, member_id, seats, now) {
            return Self::reject(state, reason);
        }

        // Newcomers never overtake the waitlist.
        let status = if state.oldest_waitlisted().is_none() && state.has_room_for(seats) {
            RegistrationStatus::Confirmed
        } else {
            RegistrationStatus::Waitlisted
        };

        let fact = match state.find_by_member(member_id) {
            Some(cancelled) => RegistrationAction::Reregistered {
                registration: Registration {
                    status,
                    guests_count,
                    notes,
                    registered_at: now,
                    updated_at: now,
                    ..cancelled.clone()
                },
            },
            None => RegistrationAction::Registered {
                registration: Registration {
                    id: registration_id,
                    event_id: state.event.id,
                    member_id,
                    status,
                    guests_count,
                    notes,
                    registered_at: now,
                    updated_at: now,
                },
            },
        };

        Self::apply_event(state, &fact);
        smallvec![Effect::Commit(fact)]
    }

    fn cancel(
        state: &mut RegistrationState,
        registration: Registration,
        cancelled_status: RegistrationStatus,
        now: DateTime<Utc>,
    ) -> SmallVec<[Effect<RegistrationAction>; 4]> {
        if let Err(reason) = Self::validate_cancel(&registration) {
            return Self::reject(state, reason);
        }

        let cancelled = RegistrationAction::RegistrationCancelled {
            registration: Registration {
                status: cancelled_status,
                updated_at: now,
                ..registration
            },
        };
        Self::apply_event(state, &cancelled);

        let mut effects = SmallVec::new();
        effects.push(Effect::Commit(cancelled));
        while let Some(promoted) = Self::promote_next(state, now) {
            effects.push(Effect::Commit(promoted));
        }
        effects
    }

    /// Confirms the oldest waitlisted registration if its seats fit.
    ///
    /// Stops at the head of the queue: a later, smaller party is never
    /// promoted ahead of it.
    fn promote_next(
        state: &mut RegistrationState,
        now: DateTime<Utc>,
    ) -> Option<RegistrationAction> {
        let next = state.oldest_waitlisted()?;
        if !state.has_room_for(next.seats()) {
            return None;
        }

        let promoted = RegistrationAction::WaitlistPromoted {
            registration: Registration {
                status: RegistrationStatus::Confirmed,
                updated_at: now,
                ..next.clone()
            },
        };
        Self::apply_event(state, &promoted);
        Some(promoted)
    }
}

impl Reducer for RegistrationReducer {
    type State = RegistrationState;
    type Action = RegistrationAction;
    type Environment = RegistrationEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let now = env.clock.now();

        match action {
            // ========== Commands ==========
            RegistrationAction::Register {
                registration_id,
                member_id,
                guests_count,
                notes,
            } => Self::register(state, registration_id, member_id, guests_count, notes, now),

            RegistrationAction::Cancel { member_id } => {
                let Some(registration) = state.find_by_member(member_id).cloned() else {
                    return Self::reject(state, RegistrationRejection::NotRegistered { member_id });
                };
                Self::cancel(state, registration, RegistrationStatus::CanceledByUser, now)
            }

            RegistrationAction::AdminCancel { registration_id } => {
                let Some(registration) = state.find(registration_id).cloned() else {
                    return Self::reject(
                        state,
                        RegistrationRejection::RegistrationNotFound { registration_id },
                    );
                };
                Self::cancel(state, registration, RegistrationStatus::CanceledByAdmin, now)
            }

            RegistrationAction::MarkAttended { registration_id } => {
                let Some(registration) = state.find(registration_id).cloned() else {
                    return Self::reject(
                        state,
                        RegistrationRejection::RegistrationNotFound { registration_id },
                    );
                };
                if registration.status != RegistrationStatus::Confirmed {
                    return Self::reject(
                        state,
                        RegistrationRejection::NotConfirmed {
                            status: registration.status,
                        },
                    );
                }

                let fact = RegistrationAction::AttendanceMarked {
                    registration: Registration {
                        status: RegistrationStatus::Attended,
                        updated_at: now,
                        ..registration
                    },
                };
                Self::apply_event(state, &fact);
                smallvec![Effect::Commit(fact)]
            }

            // ========== Facts (replayed) ==========
            fact => {
                Self::apply_event(state, &fact);
                SmallVec::new()
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{Capacity, Location, OrganizationId};
    use chrono::Duration;
    use missionboard_core::effect::commits;
    use missionboard_testing::{assertions, test_clock, FixedClock, ReducerTest};

    fn env() -> RegistrationEnvironment {
        RegistrationEnvironment::new(Arc::new(test_clock()))
    }

    fn env_at(now: DateTime<Utc>) -> RegistrationEnvironment {
        RegistrationEnvironment::new(Arc::new(FixedClock::new(now)))
    }

    fn now() -> DateTime<Utc> {
        test_clock().now()
    }

    fn event(capacity: Option<u32>) -> Event {
        Event {
            id: crate::types::EventId::new(),
            organization_id: OrganizationId::new(),
            organizer_id: None,
            name: "Spring Gala".to_string(),
            description: None,
            date: now() + Duration::days(30),
            end_date: None,
            location: Location::default(),
            capacity: capacity.map(Capacity::new),
            is_private: false,
            registration_deadline: None,
            status: EventStatus::Scheduled,
            created_at: now(),
            updated_at: now(),
        }
    }

    fn existing(
        event: &Event,
        member_id: MemberId,
        status: RegistrationStatus,
        guests_count: u32,
        minutes_ago: i64,
    ) -> Registration {
        Registration {
            id: RegistrationId::new(),
            event_id: event.id,
            member_id,
            status,
            guests_count,
            notes: None,
            registered_at: now() - Duration::minutes(minutes_ago),
            updated_at: now() - Duration::minutes(minutes_ago),
        }
    }

    fn register(member_id: MemberId, guests_count: u32) -> RegistrationAction {
        RegistrationAction::Register {
            registration_id: RegistrationId::new(),
            member_id,
            guests_count,
            notes: None,
        }
    }

    #[test]
    fn test_unlimited_capacity_always_confirms() {
        let event = event(None);
        let crowd: Vec<_> = (0..50)
            .map(|i| existing(&event, MemberId::new(), RegistrationStatus::Confirmed, 3, i))
            .collect();
        let member_id = MemberId::new();

        ReducerTest::new(RegistrationReducer::new())
            .with_env(env())
            .given_state(RegistrationState::new(event, crowd))
            .when_action(register(member_id, 10))
            .then_state(move |state| {
                let registration = state.find_by_member(member_id).unwrap();
                assert_eq!(registration.status, RegistrationStatus::Confirmed);
                assert!(state.last_error.is_none());
            })
            .then_effects(|effects| {
                assertions::assert_single_commit(effects, |a| {
                    matches!(a, RegistrationAction::Registered { .. })
                });
            })
            .run();
    }

    #[test]
    fn test_full_event_waitlists_next_registrant() {
        let event = event(Some(3));
        let holder = existing(&event, MemberId::new(), RegistrationStatus::Confirmed, 2, 5);
        let member_id = MemberId::new();

        ReducerTest::new(RegistrationReducer::new())
            .with_env(env())
            .given_state(RegistrationState::new(event, vec![holder]))
            .when_action(register(member_id, 0))
            .then_state(move |state| {
                assert_eq!(
                    state.find_by_member(member_id).unwrap().status,
                    RegistrationStatus::Waitlisted
                );
                assert_eq!(state.seats_taken(), 3);
            })
            .run();
    }

    #[test]
    fn test_guests_count_towards_capacity() {
        let event = event(Some(4));
        let holder = existing(&event, MemberId::new(), RegistrationStatus::Attended, 1, 5);
        let member_id = MemberId::new();

        // 2 taken + 3 requested > 4
        ReducerTest::new(RegistrationReducer::new())
            .with_env(env())
            .given_state(RegistrationState::new(event, vec![holder]))
            .when_action(register(member_id, 2))
            .then_state(move |state| {
                assert_eq!(
                    state.find_by_member(member_id).unwrap().status,
                    RegistrationStatus::Waitlisted
                );
            })
            .run();
    }

    #[test]
    fn test_exact_fit_is_confirmed() {
        let event = event(Some(4));
        let holder = existing(&event, MemberId::new(), RegistrationStatus::Confirmed, 1, 5);
        let member_id = MemberId::new();

        ReducerTest::new(RegistrationReducer::new())
            .with_env(env())
            .given_state(RegistrationState::new(event, vec![holder]))
            .when_action(register(member_id, 1))
            .then_state(move |state| {
                assert_eq!(
                    state.find_by_member(member_id).unwrap().status,
                    RegistrationStatus::Confirmed
                );
                assert_eq!(state.summary().capacity_percentage, Some(100));
            })
            .run();
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let event = event(None);
        let member_id = MemberId::new();
        let mine = existing(&event, member_id, RegistrationStatus::Waitlisted, 0, 5);

        ReducerTest::new(RegistrationReducer::new())
            .with_env(env())
            .given_state(RegistrationState::new(event, vec![mine]))
            .when_action(register(member_id, 0))
            .then_state(|state| {
                assert_eq!(
                    state.last_error,
                    Some(RegistrationRejection::AlreadyRegistered {
                        status: RegistrationStatus::Waitlisted
                    })
                );
                assert_eq!(state.registrations.len(), 1);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_reregistration_reuses_cancelled_row() {
        let event = event(Some(10));
        let member_id = MemberId::new();
        let cancelled = existing(&event, member_id, RegistrationStatus::CanceledByAdmin, 0, 60);
        let original_id = cancelled.id;

        ReducerTest::new(RegistrationReducer::new())
            .with_env(env())
            .given_state(RegistrationState::new(event, vec![cancelled]))
            .when_action(RegistrationAction::Register {
                registration_id: RegistrationId::new(),
                member_id,
                guests_count: 2,
                notes: Some("Bringing family".to_string()),
            })
            .then_state(move |state| {
                assert_eq!(state.registrations.len(), 1);
                let registration = &state.registrations[0];
                assert_eq!(registration.id, original_id);
                assert_eq!(registration.status, RegistrationStatus::Confirmed);
                assert_eq!(registration.guests_count, 2);
                assert_eq!(registration.notes.as_deref(), Some("Bringing family"));
                assert_eq!(registration.registered_at, now());
            })
            .then_effects(move |effects| {
                assertions::assert_single_commit(effects, |a| {
                    matches!(
                        a,
                        RegistrationAction::Reregistered { registration }
                            if registration.id == original_id
                    )
                });
            })
            .run();
    }

    #[test]
    fn test_reregistration_can_land_on_waitlist() {
        let event = event(Some(1));
        let member_id = MemberId::new();
        let cancelled = existing(&event, member_id, RegistrationStatus::CanceledByUser, 0, 60);
        let holder = existing(&event, MemberId::new(), RegistrationStatus::Confirmed, 0, 30);

        ReducerTest::new(RegistrationReducer::new())
            .with_env(env())
            .given_state(RegistrationState::new(event, vec![cancelled, holder]))
            .when_action(register(member_id, 0))
            .then_state(move |state| {
                assert_eq!(
                    state.find_by_member(member_id).unwrap().status,
                    RegistrationStatus::Waitlisted
                );
            })
            .run();
    }

    #[test]
    fn test_registration_after_deadline_rejected() {
        let mut event = event(None);
        event.registration_deadline = Some(now() - Duration::seconds(1));

        ReducerTest::new(RegistrationReducer::new())
            .with_env(env())
            .given_state(RegistrationState::new(event, vec![]))
            .when_action(register(MemberId::new(), 0))
            .then_state(|state| {
                assert!(matches!(
                    state.last_error,
                    Some(RegistrationRejection::DeadlinePassed { .. })
                ));
                assert!(state.registrations.is_empty());
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_registration_at_deadline_accepted() {
        let mut event = event(None);
        event.registration_deadline = Some(now());

        ReducerTest::new(RegistrationReducer::new())
            .with_env(env_at(now()))
            .given_state(RegistrationState::new(event, vec![]))
            .when_action(register(MemberId::new(), 0))
            .then_state(|state| {
                assert!(state.last_error.is_none());
                assert_eq!(state.registrations.len(), 1);
            })
            .run();
    }

    #[test]
    fn test_registration_for_cancelled_event_rejected() {
        let mut event = event(None);
        event.status = EventStatus::Canceled;

        ReducerTest::new(RegistrationReducer::new())
            .with_env(env())
            .given_state(RegistrationState::new(event, vec![]))
            .when_action(register(MemberId::new(), 0))
            .then_state(|state| {
                assert_eq!(
                    state.last_error,
                    Some(RegistrationRejection::EventNotOpen {
                        status: EventStatus::Canceled
                    })
                );
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_cancel_promotes_oldest_waitlisted() {
        let event = event(Some(1));
        let confirmed_member = MemberId::new();
        let confirmed = existing(&event, confirmed_member, RegistrationStatus::Confirmed, 0, 90);
        let older = existing(&event, MemberId::new(), RegistrationStatus::Waitlisted, 0, 60);
        let newer = existing(&event, MemberId::new(), RegistrationStatus::Waitlisted, 0, 30);
        let (older_id, newer_id) = (older.id, newer.id);

        ReducerTest::new(RegistrationReducer::new())
            .with_env(env())
            // Newer first in storage order: the timestamp decides
            .given_state(RegistrationState::new(event, vec![confirmed, newer, older]))
            .when_action(RegistrationAction::Cancel {
                member_id: confirmed_member,
            })
            .then_state(move |state| {
                assert_eq!(
                    state.find_by_member(confirmed_member).unwrap().status,
                    RegistrationStatus::CanceledByUser
                );
                assert_eq!(state.find(older_id).unwrap().status, RegistrationStatus::Confirmed);
                assert_eq!(state.find(newer_id).unwrap().status, RegistrationStatus::Waitlisted);
            })
            .then_effects(move |effects| {
                let facts = assertions::committed(effects);
                assert_eq!(facts.len(), 2);
                assert!(matches!(facts[0], RegistrationAction::RegistrationCancelled { .. }));
                assert!(matches!(
                    facts[1],
                    RegistrationAction::WaitlistPromoted { registration }
                        if registration.id == older_id
                ));
            })
            .run();
    }

    #[test]
    fn test_cancel_without_waitlist_promotes_nothing() {
        let event = event(Some(5));
        let member_id = MemberId::new();
        let mine = existing(&event, member_id, RegistrationStatus::Confirmed, 0, 10);

        ReducerTest::new(RegistrationReducer::new())
            .with_env(env())
            .given_state(RegistrationState::new(event, vec![mine]))
            .when_action(RegistrationAction::Cancel { member_id })
            .then_effects(|effects| {
                assertions::assert_single_commit(effects, |a| {
                    matches!(a, RegistrationAction::RegistrationCancelled { .. })
                });
            })
            .run();
    }

    #[test]
    fn test_cancel_waitlisted_in_full_event_promotes_nothing() {
        let event = event(Some(1));
        let holder = existing(&event, MemberId::new(), RegistrationStatus::Confirmed, 0, 90);
        let member_id = MemberId::new();
        let mine = existing(&event, member_id, RegistrationStatus::Waitlisted, 0, 60);
        let other = existing(&event, MemberId::new(), RegistrationStatus::Waitlisted, 0, 30);
        let other_id = other.id;

        ReducerTest::new(RegistrationReducer::new())
            .with_env(env())
            .given_state(RegistrationState::new(event, vec![holder, mine, other]))
            .when_action(RegistrationAction::Cancel { member_id })
            .then_state(move |state| {
                assert_eq!(state.find(other_id).unwrap().status, RegistrationStatus::Waitlisted);
            })
            .then_effects(|effects| assertions::assert_effects_count(effects, 1))
            .run();
    }

    #[test]
    fn test_waitlist_head_keeps_its_place_until_it_fits() {
        let reducer = RegistrationReducer::new();
        let env = env();
        let event = event(Some(3));
        let (alice, bob, carol, dave, erin) = (
            MemberId::new(),
            MemberId::new(),
            MemberId::new(),
            MemberId::new(),
            MemberId::new(),
        );
        let mut state = RegistrationState::new(
            event.clone(),
            vec![
                existing(&event, alice, RegistrationStatus::Confirmed, 0, 90),
                existing(&event, bob, RegistrationStatus::Confirmed, 0, 80),
                existing(&event, carol, RegistrationStatus::Waitlisted, 2, 60),
                existing(&event, dave, RegistrationStatus::Waitlisted, 0, 30),
            ],
        );
        let status = |state: &RegistrationState, member: MemberId| {
            state.find_by_member(member).unwrap().status
        };

        // One seat freed: Carol's party of three still does not fit, and Dave
        // may not jump ahead of her.
        let facts = commits(reducer.reduce(
            &mut state,
            RegistrationAction::Cancel { member_id: alice },
            &env,
        ));
        assert_eq!(facts.len(), 1);
        assert_eq!(status(&state, carol), RegistrationStatus::Waitlisted);
        assert_eq!(status(&state, dave), RegistrationStatus::Waitlisted);

        // A newcomer queues behind the waitlist even though a seat is free.
        reducer.reduce(&mut state, register(erin, 0), &env);
        assert_eq!(status(&state, erin), RegistrationStatus::Waitlisted);
        assert_eq!(state.seats_taken(), 1);

        // Bob leaves: Carol's party now fits and takes every seat.
        let facts = commits(reducer.reduce(
            &mut state,
            RegistrationAction::Cancel { member_id: bob },
            &env,
        ));
        assert_eq!(facts.len(), 2);
        assert!(matches!(
            &facts[1],
            RegistrationAction::WaitlistPromoted { registration }
                if registration.member_id == carol
        ));
        assert_eq!(status(&state, dave), RegistrationStatus::Waitlisted);
        assert_eq!(state.seats_taken(), 3);
    }

    #[test]
    fn test_cancel_promotes_as_many_as_fit_in_order() {
        let event = event(Some(3));
        let member_id = MemberId::new();
        let family = existing(&event, member_id, RegistrationStatus::Confirmed, 2, 90);
        let first = existing(&event, MemberId::new(), RegistrationStatus::Waitlisted, 0, 60);
        let second = existing(&event, MemberId::new(), RegistrationStatus::Waitlisted, 1, 50);
        let third = existing(&event, MemberId::new(), RegistrationStatus::Waitlisted, 0, 40);
        let (first_id, second_id, third_id) = (first.id, second.id, third.id);

        ReducerTest::new(RegistrationReducer::new())
            .with_env(env())
            .given_state(RegistrationState::new(event, vec![family, third, second, first]))
            .when_action(RegistrationAction::Cancel { member_id })
            .then_state(move |state| {
                assert_eq!(state.find(first_id).unwrap().status, RegistrationStatus::Confirmed);
                assert_eq!(state.find(second_id).unwrap().status, RegistrationStatus::Confirmed);
                assert_eq!(state.find(third_id).unwrap().status, RegistrationStatus::Waitlisted);
                assert_eq!(state.seats_taken(), 3);
            })
            .then_effects(move |effects| {
                let facts = assertions::committed(effects);
                let promoted: Vec<_> = facts
                    .iter()
                    .filter_map(|fact| match fact {
                        RegistrationAction::WaitlistPromoted { registration } => {
                            Some(registration.id)
                        }
                        _ => None,
                    })
                    .collect();
                assert_eq!(promoted, vec![first_id, second_id]);
            })
            .run();
    }

    #[test]
    fn test_cancelling_queue_head_lets_next_party_in() {
        let event = event(Some(2));
        let holder = existing(&event, MemberId::new(), RegistrationStatus::Confirmed, 0, 90);
        let member_id = MemberId::new();
        let head = existing(&event, member_id, RegistrationStatus::Waitlisted, 1, 60);
        let next = existing(&event, MemberId::new(), RegistrationStatus::Waitlisted, 0, 30);
        let next_id = next.id;

        ReducerTest::new(RegistrationReducer::new())
            .with_env(env())
            .given_state(RegistrationState::new(event, vec![holder, head, next]))
            .when_action(RegistrationAction::Cancel { member_id })
            .then_state(move |state| {
                assert_eq!(state.find(next_id).unwrap().status, RegistrationStatus::Confirmed);
            })
            .then_effects(|effects| assertions::assert_effects_count(effects, 2))
            .run();
    }

    #[test]
    fn test_party_larger_than_capacity_rejected() {
        ReducerTest::new(RegistrationReducer::new())
            .with_env(env())
            .given_state(RegistrationState::new(event(Some(2)), vec![]))
            .when_action(register(MemberId::new(), 2))
            .then_state(|state| {
                assert_eq!(
                    state.last_error,
                    Some(RegistrationRejection::PartyExceedsCapacity {
                        seats: 3,
                        capacity: 2
                    })
                );
                assert!(state.registrations.is_empty());
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_cancel_without_registration_is_not_registered() {
        let member_id = MemberId::new();

        ReducerTest::new(RegistrationReducer::new())
            .with_env(env())
            .given_state(RegistrationState::new(event(None), vec![]))
            .when_action(RegistrationAction::Cancel { member_id })
            .then_state(move |state| {
                assert_eq!(
                    state.last_error,
                    Some(RegistrationRejection::NotRegistered { member_id })
                );
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_cancel_twice_rejected() {
        let event = event(None);
        let member_id = MemberId::new();
        let mine = existing(&event, member_id, RegistrationStatus::Confirmed, 0, 10);

        ReducerTest::new(RegistrationReducer::new())
            .with_env(env())
            .given_state(RegistrationState::new(event, vec![mine]))
            .given_action(RegistrationAction::Cancel { member_id })
            .when_action(RegistrationAction::Cancel { member_id })
            .then_state(|state| {
                assert_eq!(
                    state.last_error,
                    Some(RegistrationRejection::NotCancellable {
                        status: RegistrationStatus::CanceledByUser
                    })
                );
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_admin_cancel_marks_cancelled_by_admin() {
        let event = event(None);
        let mine = existing(&event, MemberId::new(), RegistrationStatus::Confirmed, 0, 10);
        let registration_id = mine.id;

        ReducerTest::new(RegistrationReducer::new())
            .with_env(env())
            .given_state(RegistrationState::new(event, vec![mine]))
            .when_action(RegistrationAction::AdminCancel { registration_id })
            .then_state(move |state| {
                assert_eq!(
                    state.find(registration_id).unwrap().status,
                    RegistrationStatus::CanceledByAdmin
                );
            })
            .run();
    }

    #[test]
    fn test_attended_registration_cannot_be_cancelled() {
        let event = event(None);
        let mine = existing(&event, MemberId::new(), RegistrationStatus::Attended, 0, 10);
        let registration_id = mine.id;

        ReducerTest::new(RegistrationReducer::new())
            .with_env(env())
            .given_state(RegistrationState::new(event, vec![mine]))
            .when_action(RegistrationAction::AdminCancel { registration_id })
            .then_state(|state| {
                assert!(matches!(
                    state.last_error,
                    Some(RegistrationRejection::NotCancellable { .. })
                ));
            })
            .run();
    }

    #[test]
    fn test_mark_attended_requires_confirmed() {
        let event = event(Some(1));
        let confirmed = existing(&event, MemberId::new(), RegistrationStatus::Confirmed, 0, 20);
        let waiting = existing(&event, MemberId::new(), RegistrationStatus::Waitlisted, 0, 10);
        let (confirmed_id, waiting_id) = (confirmed.id, waiting.id);

        ReducerTest::new(RegistrationReducer::new())
            .with_env(env())
            .given_state(RegistrationState::new(
                event.clone(),
                vec![confirmed.clone(), waiting.clone()],
            ))
            .when_action(RegistrationAction::MarkAttended {
                registration_id: confirmed_id,
            })
            .then_state(move |state| {
                assert_eq!(state.find(confirmed_id).unwrap().status, RegistrationStatus::Attended);
                assert_eq!(state.seats_taken(), 1);
            })
            .run();

        ReducerTest::new(RegistrationReducer::new())
            .with_env(env())
            .given_state(RegistrationState::new(event, vec![confirmed, waiting]))
            .when_action(RegistrationAction::MarkAttended {
                registration_id: waiting_id,
            })
            .then_state(|state| {
                assert_eq!(
                    state.last_error,
                    Some(RegistrationRejection::NotConfirmed {
                        status: RegistrationStatus::Waitlisted
                    })
                );
            })
            .run();
    }

    #[test]
    fn test_capacity_one_scenario() {
        let reducer = RegistrationReducer::new();
        let env = env();
        let mut state = RegistrationState::new(event(Some(1)), vec![]);
        let (alice, bob) = (MemberId::new(), MemberId::new());

        reducer.reduce(&mut state, register(alice, 0), &env);
        reducer.reduce(&mut state, register(bob, 0), &env);
        assert_eq!(state.find_by_member(alice).unwrap().status, RegistrationStatus::Confirmed);
        assert_eq!(state.find_by_member(bob).unwrap().status, RegistrationStatus::Waitlisted);

        let facts = commits(reducer.reduce(
            &mut state,
            RegistrationAction::Cancel { member_id: alice },
            &env,
        ));

        assert_eq!(facts.len(), 2);
        assert_eq!(
            state.find_by_member(alice).unwrap().status,
            RegistrationStatus::CanceledByUser
        );
        assert_eq!(state.find_by_member(bob).unwrap().status, RegistrationStatus::Confirmed);
    }

    #[test]
    fn test_rejection_maps_to_error_kind() {
        let conflict: MissionBoardError = RegistrationRejection::AlreadyRegistered {
            status: RegistrationStatus::Confirmed,
        }
        .into();
        assert!(matches!(conflict, MissionBoardError::Conflict(_)));

        let missing: MissionBoardError = RegistrationRejection::NotRegistered {
            member_id: MemberId::new(),
        }
        .into();
        assert!(matches!(missing, MissionBoardError::NotFound { .. }));

        let closed: MissionBoardError =
            RegistrationRejection::DeadlinePassed { deadline: now() }.into();
        assert!(matches!(closed, MissionBoardError::Validation(_)));

        let oversized: MissionBoardError = RegistrationRejection::PartyExceedsCapacity {
            seats: 5,
            capacity: 4,
        }
        .into();
        assert!(matches!(oversized, MissionBoardError::Validation(_)));
    }
}
