//! Event aggregate: creation, edits and the status lifecycle.
//!
//! ```text
//! SCHEDULED ──cancel──▶ CANCELED ──┐
//!     │                            │
//!     └──complete──▶ COMPLETED ────┴──archive──▶ ARCHIVED
//! ```
//!
//! A scheduled event can also be archived directly. Only scheduled events
//! accept edits.

use crate::error::MissionBoardError;
use crate::types::{
    Capacity, Event, EventId, EventStatus, Location, MemberId, OrganizationId,
};
use chrono::{DateTime, Utc};
use missionboard_core::{effect::Effect, environment::Clock, reducer::Reducer, smallvec, SmallVec};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Maximum length of an event name, in characters
pub const MAX_NAME_LENGTH: usize = 200;

// ============================================================================
// Actions (Commands + Facts)
// ============================================================================

/// Editable fields of an event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDetails {
    /// Event name
    pub name: String,
    /// Longer description
    pub description: Option<String>,
    /// Start date and time
    pub date: DateTime<Utc>,
    /// Optional end date and time
    pub end_date: Option<DateTime<Utc>>,
    /// Location fields
    pub location: Location,
    /// Seat limit (`None` = unlimited)
    pub capacity: Option<Capacity>,
    /// Hidden from the public pages
    pub is_private: bool,
    /// Registrations close after this instant
    pub registration_deadline: Option<DateTime<Utc>>,
}

impl From<&Event> for EventDetails {
    fn from(event: &Event) -> Self {
        Self {
            name: event.name.clone(),
            description: event.description.clone(),
            date: event.date,
            end_date: event.end_date,
            location: event.location.clone(),
            capacity: event.capacity,
            is_private: event.is_private,
            registration_deadline: event.registration_deadline,
        }
    }
}

/// Actions for the Event aggregate
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventAction {
    // Commands
    /// Create a new event
    CreateEvent {
        /// Event identifier
        id: EventId,
        /// Owning organization
        organization_id: OrganizationId,
        /// Organizing member
        organizer_id: Option<MemberId>,
        /// Event fields
        details: EventDetails,
    },
    /// Replace an event's editable fields
    UpdateEvent {
        /// New field values
        details: EventDetails,
    },
    /// Call the event off
    CancelEvent,
    /// Mark the event as having taken place
    CompleteEvent,
    /// Hide the event from listings
    ArchiveEvent,

    // Facts
    /// Event was created
    EventCreated {
        /// The new event
        event: Event,
    },
    /// Event fields were changed
    EventUpdated {
        /// The updated event
        event: Event,
    },
    /// Event status changed
    EventStatusChanged {
        /// Previous status
        from: EventStatus,
        /// The updated event
        event: Event,
    },
    /// A command was rejected
    EventRejected {
        /// Why
        reason: EventRejection,
    },
}

impl EventAction {
    /// The event row a fact writes, if this action is a write
    #[must_use]
    pub const fn event(&self) -> Option<&Event> {
        match self {
            Self::EventCreated { event }
            | Self::EventUpdated { event }
            | Self::EventStatusChanged { event, .. } => Some(event),
            _ => None,
        }
    }
}

/// Reasons an event command is rejected
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum EventRejection {
    /// Field validation failed
    #[error("{0}")]
    Invalid(String),
    /// No event loaded
    #[error("Event not found")]
    NotFound,
    /// Create on an existing id
    #[error("Event {0} already exists")]
    AlreadyExists(EventId),
    /// Status does not allow the command
    #[error("Cannot {action} an event with status {status}")]
    InvalidTransition {
        /// Attempted operation
        action: String,
        /// Current status
        status: EventStatus,
    },
}

impl From<EventRejection> for MissionBoardError {
    fn from(rejection: EventRejection) -> Self {
        match rejection {
            EventRejection::NotFound => Self::not_found("Event", "unknown"),
            EventRejection::AlreadyExists(_) => Self::Conflict(rejection.to_string()),
            EventRejection::Invalid(_) | EventRejection::InvalidTransition { .. } => {
                Self::Validation(rejection.to_string())
            }
        }
    }
}

// ============================================================================
// State and Environment
// ============================================================================

/// State for the Event aggregate
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventState {
    /// The event, once created or loaded
    pub event: Option<Event>,
    /// Last rejection
    pub last_error: Option<EventRejection>,
}

impl EventState {
    /// State for a loaded event
    #[must_use]
    pub const fn loaded(event: Event) -> Self {
        Self {
            event: Some(event),
            last_error: None,
        }
    }
}

/// Environment for the Event aggregate
#[derive(Clone)]
pub struct EventEnvironment {
    /// Clock for timestamps
    pub clock: Arc<dyn Clock>,
}

impl EventEnvironment {
    /// Creates a new `EventEnvironment`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the Event aggregate
#[derive(Clone, Copy, Debug, Default)]
pub struct EventReducer;

impl EventReducer {
    /// Creates a new `EventReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates the editable fields of an event
    ///
    /// # Errors
    ///
    /// Returns a message describing the first invalid field.
    pub fn validate_details(details: &EventDetails) -> Result<(), String> {
        let name = details.name.trim();
        if name.is_empty() {
            return Err("Event name cannot be empty".to_string());
        }

        let length = name.chars().count();
        if length > MAX_NAME_LENGTH {
            return Err(format!(
                "Event name too long: {length} characters (max {MAX_NAME_LENGTH})"
            ));
        }

        if let Some(end) = details.end_date {
            if end < details.date {
                return Err("End date must not be before the start date".to_string());
            }
        }

        if details.capacity.is_some_and(|c| c.value() == 0) {
            return Err("Capacity must be greater than zero".to_string());
        }

        if let Some(deadline) = details.registration_deadline {
            if deadline > details.date {
                return Err("Registration deadline must not be after the event date".to_string());
            }
        }

        Ok(())
    }

    fn require_status(
        state: &EventState,
        action: &str,
        allowed: impl Fn(EventStatus) -> bool,
    ) -> Result<Event, EventRejection> {
        let event = state.event.as_ref().ok_or(EventRejection::NotFound)?;
        if !allowed(event.status) {
            return Err(EventRejection::InvalidTransition {
                action: action.to_string(),
                status: event.status,
            });
        }
        Ok(event.clone())
    }

    /// Applies a fact to state
    fn apply_event(state: &mut EventState, action: &EventAction) {
        match action {
            EventAction::EventRejected { reason } => {
                state.last_error = Some(reason.clone());
            }
            fact => {
                if let Some(event) = fact.event() {
                    state.event = Some(event.clone());
                    state.last_error = None;
                }
            }
        }
    }

    fn decide(
        state: &mut EventState,
        decision: Result<EventAction, EventRejection>,
    ) -> SmallVec<[Effect<EventAction>; 4]> {
        match decision {
            Ok(fact) => {
                Self::apply_event(state, &fact);
                smallvec![Effect::Commit(fact)]
            }
            Err(reason) => {
                Self::apply_event(state, &EventAction::EventRejected { reason });
                SmallVec::new()
            }
        }
    }

    fn change_status(
        state: &EventState,
        action: &str,
        to: EventStatus,
        allowed: impl Fn(EventStatus) -> bool,
        now: DateTime<Utc>,
    ) -> Result<EventAction, EventRejection> {
        let event = Self::require_status(state, action, allowed)?;
        Ok(EventAction::EventStatusChanged {
            from: event.status,
            event: Event {
                status: to,
                updated_at: now,
                ..event
            },
        })
    }
}

impl Reducer for EventReducer {
    type State = EventState;
    type Action = EventAction;
    type Environment = EventEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let now = env.clock.now();

        let decision = match action {
            // ========== Commands ==========
            EventAction::CreateEvent {
                id,
                organization_id,
                organizer_id,
                details,
            } => {
                if state.event.is_some() {
                    Err(EventRejection::AlreadyExists(id))
                } else {
                    Self::validate_details(&details)
                        .map_err(EventRejection::Invalid)
                        .map(|()| EventAction::EventCreated {
                            event: Event {
                                id,
                                organization_id,
                                organizer_id,
                                name: details.name.trim().to_string(),
                                description: details.description,
                                date: details.date,
                                end_date: details.end_date,
                                location: details.location,
                                capacity: details.capacity,
                                is_private: details.is_private,
                                registration_deadline: details.registration_deadline,
                                status: EventStatus::Scheduled,
                                created_at: now,
                                updated_at: now,
                            },
                        })
                }
            }

            EventAction::UpdateEvent { details } => {
                Self::require_status(state, "update", |s| s == EventStatus::Scheduled).and_then(
                    |event| {
                        Self::validate_details(&details).map_err(EventRejection::Invalid)?;
                        Ok(EventAction::EventUpdated {
                            event: Event {
                                name: details.name.trim().to_string(),
                                description: details.description,
                                date: details.date,
                                end_date: details.end_date,
                                location: details.location,
                                capacity: details.capacity,
                                is_private: details.is_private,
                                registration_deadline: details.registration_deadline,
                                updated_at: now,
                                ..event
                            },
                        })
                    },
                )
            }

            EventAction::CancelEvent => Self::change_status(
                state,
                "cancel",
                EventStatus::Canceled,
                |s| s == EventStatus::Scheduled,
                now,
            ),

            EventAction::CompleteEvent => Self::change_status(
                state,
                "complete",
                EventStatus::Completed,
                |s| s == EventStatus::Scheduled,
                now,
            ),

            EventAction::ArchiveEvent => Self::change_status(
                state,
                "archive",
                EventStatus::Archived,
                |s| s != EventStatus::Archived,
                now,
            ),

            // ========== Facts (replayed) ==========
            fact => {
                Self::apply_event(state, &fact);
                return SmallVec::new();
            }
        };

        Self::decide(state, decision)
    }
}
