//! Event registration: registering, cancelling, check-in and the public
//! registration form.
//!
//! Every command goes through [`RegistrationRepository::decide_registration`],
//! so the capacity check and the write happen while the event is locked.
//!
//! [`RegistrationRepository::decide_registration`]: crate::store::RegistrationRepository::decide_registration

use super::validation::{normalize_email, optional_text, required_text};
use crate::aggregates::{RegistrationAction, RegistrationEnvironment, RegistrationReducer};
use crate::error::{MissionBoardError, Result};
use crate::metrics;
use crate::store::{MissionBoardStore, RegistrationDecision};
use crate::types::{
    Attendee, Event, EventId, Member, MemberId, MemberRole, MemberStatus, OrganizationId,
    Registration, RegistrationId,
};
use missionboard_core::effect::commits;
use missionboard_core::environment::Clock;
use missionboard_core::reducer::Reducer;
use std::sync::Arc;

/// Maximum length of a registrant name on the public form
const MAX_MEMBER_NAME_LENGTH: usize = 200;

/// Registration details supplied by a member
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegistrationRequest {
    /// Additional guests
    pub guests_count: u32,
    /// Notes for the organizers
    pub notes: Option<String>,
}

/// Public registration form
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicRegistration {
    /// Registrant name
    pub name: String,
    /// Registrant email; identifies returning registrants
    pub email: String,
    /// Registrant phone
    pub phone: Option<String>,
    /// Additional guests
    pub guests_count: u32,
    /// Notes for the organizers
    pub notes: Option<String>,
}

/// Result of a registration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistrationOutcome {
    /// The confirmed or waitlisted registration
    pub registration: Registration,
    /// `true` for a new row, `false` when a cancelled row was reused
    pub created: bool,
}

/// Result of a cancellation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CancellationOutcome {
    /// The cancelled registration
    pub cancelled: Registration,
    /// Waitlisted registrations confirmed into the freed seats, oldest first
    pub promoted: Vec<Registration>,
}

/// Who may see the event a command targets
#[derive(Clone, Copy, Debug)]
enum Audience {
    /// Members and administrators of one organization
    Organization(OrganizationId),
    /// Anyone; private events are hidden
    Public,
}

impl Audience {
    fn can_see(self, event: &Event) -> bool {
        match self {
            Self::Organization(organization_id) => event.organization_id == organization_id,
            Self::Public => !event.is_private,
        }
    }
}

/// Registration service
#[derive(Clone)]
pub struct RegistrationService {
    store: Arc<dyn MissionBoardStore>,
    clock: Arc<dyn Clock>,
    env: RegistrationEnvironment,
}

impl RegistrationService {
    /// Create a new registration service
    #[must_use]
    pub fn new(store: Arc<dyn MissionBoardStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            env: RegistrationEnvironment::new(Arc::clone(&clock)),
            clock,
        }
    }

    /// Register a member for an event of their organization.
    ///
    /// # Errors
    ///
    /// - [`MissionBoardError::NotFound`]: unknown event or another organization's
    /// - [`MissionBoardError::Conflict`]: the member is already registered
    /// - [`MissionBoardError::Validation`]: event not open or deadline passed
    pub async fn register(
        &self,
        member: &Member,
        event_id: EventId,
        request: RegistrationRequest,
    ) -> Result<RegistrationOutcome> {
        self.register_member(
            Audience::Organization(member.organization_id),
            member.id,
            event_id,
            request,
        )
        .await
    }

    /// Register through the public form.
    ///
    /// A registrant whose email is unknown becomes a PENDING member of the
    /// event's organization.
    ///
    /// # Errors
    ///
    /// - [`MissionBoardError::NotFound`]: unknown or private event
    /// - [`MissionBoardError::Validation`]: malformed form, event not open,
    ///   deadline passed
    /// - [`MissionBoardError::Conflict`]: already registered, or the email
    ///   belongs to another organization's member
    /// - [`MissionBoardError::Forbidden`]: the member is suspended
    pub async fn register_public(
        &self,
        event_id: EventId,
        form: PublicRegistration,
    ) -> Result<RegistrationOutcome> {
        let name = required_text("Name", &form.name, MAX_MEMBER_NAME_LENGTH)?;
        let email = normalize_email(&form.email)?;

        let event = self
            .store
            .get_event(event_id)
            .await?
            .map(|overview| overview.event)
            .filter(|event| Audience::Public.can_see(event))
            .ok_or_else(|| MissionBoardError::not_found("Event", event_id))?;

        let member = self
            .find_or_create_member(&event, name, email, optional_text(form.phone))
            .await?;

        self.register_member(
            Audience::Public,
            member.id,
            event_id,
            RegistrationRequest {
                guests_count: form.guests_count,
                notes: form.notes,
            },
        )
        .await
    }

    /// Cancel the member's own registration, promoting from the waitlist.
    ///
    /// # Errors
    ///
    /// - [`MissionBoardError::NotFound`]: unknown event or no registration
    /// - [`MissionBoardError::Validation`]: already cancelled or attended
    pub async fn cancel(&self, member: &Member, event_id: EventId) -> Result<CancellationOutcome> {
        let facts = self
            .decide(
                Audience::Organization(member.organization_id),
                event_id,
                RegistrationAction::Cancel {
                    member_id: member.id,
                },
            )
            .await?;
        Self::cancellation_outcome(event_id, facts)
    }

    /// Cancel a registration on behalf of the organization.
    ///
    /// # Errors
    ///
    /// - [`MissionBoardError::NotFound`]: unknown event or registration
    /// - [`MissionBoardError::Validation`]: already cancelled or attended
    pub async fn admin_cancel(
        &self,
        organization_id: OrganizationId,
        event_id: EventId,
        registration_id: RegistrationId,
    ) -> Result<CancellationOutcome> {
        let facts = self
            .decide(
                Audience::Organization(organization_id),
                event_id,
                RegistrationAction::AdminCancel { registration_id },
            )
            .await?;
        Self::cancellation_outcome(event_id, facts)
    }

    /// Check a confirmed registrant in.
    ///
    /// # Errors
    ///
    /// - [`MissionBoardError::NotFound`]: unknown event or registration
    /// - [`MissionBoardError::Validation`]: the registration is not confirmed
    pub async fn mark_attended(
        &self,
        organization_id: OrganizationId,
        event_id: EventId,
        registration_id: RegistrationId,
    ) -> Result<Registration> {
        let facts = self
            .decide(
                Audience::Organization(organization_id),
                event_id,
                RegistrationAction::MarkAttended { registration_id },
            )
            .await?;

        let registration = facts
            .into_iter()
            .find_map(|fact| match fact {
                RegistrationAction::AttendanceMarked { registration } => Some(registration),
                _ => None,
            })
            .ok_or_else(|| MissionBoardError::Database("Check-in produced no fact".into()))?;

        tracing::info!(
            event_id = %event_id,
            registration_id = %registration_id,
            "Attendance marked"
        );
        Ok(registration)
    }

    /// The member's registration for an event, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns [`MissionBoardError::NotFound`] for unknown events, events of
    /// other organizations and members without a registration.
    pub async fn own_registration(
        &self,
        member: &Member,
        event_id: EventId,
    ) -> Result<Registration> {
        self.visible_event(member.organization_id, event_id).await?;
        self.store
            .find_registration(event_id, member.id)
            .await?
            .ok_or_else(|| MissionBoardError::not_found("Registration", event_id))
    }

    /// Registrations of an event with contact details, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`MissionBoardError::NotFound`] for unknown events and events
    /// of other organizations.
    pub async fn attendees(
        &self,
        organization_id: OrganizationId,
        event_id: EventId,
    ) -> Result<Vec<Attendee>> {
        self.visible_event(organization_id, event_id).await?;
        self.store.list_attendees(event_id).await
    }

    async fn visible_event(
        &self,
        organization_id: OrganizationId,
        event_id: EventId,
    ) -> Result<()> {
        let visible = self
            .store
            .get_event(event_id)
            .await?
            .is_some_and(|o| Audience::Organization(organization_id).can_see(&o.event));
        if visible {
            Ok(())
        } else {
            Err(MissionBoardError::not_found("Event", event_id))
        }
    }

    async fn register_member(
        &self,
        audience: Audience,
        member_id: MemberId,
        event_id: EventId,
        request: RegistrationRequest,
    ) -> Result<RegistrationOutcome> {
        let facts = self
            .decide(
                audience,
                event_id,
                RegistrationAction::Register {
                    registration_id: RegistrationId::new(),
                    member_id,
                    guests_count: request.guests_count,
                    notes: optional_text(request.notes),
                },
            )
            .await?;

        let outcome = facts
            .into_iter()
            .find_map(|fact| match fact {
                RegistrationAction::Registered { registration } => Some(RegistrationOutcome {
                    registration,
                    created: true,
                }),
                RegistrationAction::Reregistered { registration } => Some(RegistrationOutcome {
                    registration,
                    created: false,
                }),
                _ => None,
            })
            .ok_or_else(|| MissionBoardError::Database("Registration produced no fact".into()))?;

        metrics::record_registration(outcome.registration.status, !outcome.created);
        tracing::info!(
            event_id = %event_id,
            member_id = %member_id,
            registration_id = %outcome.registration.id,
            status = %outcome.registration.status,
            guests = outcome.registration.guests_count,
            reused = !outcome.created,
            "Registration decided"
        );
        Ok(outcome)
    }

    async fn find_or_create_member(
        &self,
        event: &Event,
        name: String,
        email: String,
        phone: Option<String>,
    ) -> Result<Member> {
        let existing = match self.store.find_member_by_email(email.clone()).await? {
            Some(member) => Some(member),
            None => {
                let member = Member {
                    id: MemberId::new(),
                    organization_id: event.organization_id,
                    name,
                    email: email.clone(),
                    phone,
                    status: MemberStatus::Pending,
                    role: MemberRole::Member,
                    joined_at: self.clock.now(),
                    notes: None,
                };
                match self.store.insert_member(member).await {
                    Ok(member) => {
                        metrics::record_member_created("public");
                        tracing::info!(
                            member_id = %member.id,
                            organization_id = %member.organization_id,
                            "Member created from public registration"
                        );
                        return Ok(member);
                    }
                    // Lost a race with another form using the same email.
                    Err(MissionBoardError::Conflict(_)) => {
                        self.store.find_member_by_email(email).await?
                    }
                    Err(err) => return Err(err),
                }
            }
        };

        let member =
            existing.ok_or_else(|| MissionBoardError::conflict("Email is already in use"))?;
        if member.organization_id != event.organization_id {
            return Err(MissionBoardError::conflict(
                "Email is registered with another organization",
            ));
        }
        if member.status == MemberStatus::Suspended {
            return Err(MissionBoardError::Forbidden("Member is suspended".to_string()));
        }
        Ok(member)
    }

    async fn decide(
        &self,
        audience: Audience,
        event_id: EventId,
        action: RegistrationAction,
    ) -> Result<Vec<RegistrationAction>> {
        let env = self.env.clone();
        let decide: RegistrationDecision = Box::new(move |state| {
            if !audience.can_see(&state.event) {
                return Err(MissionBoardError::not_found("Event", event_id));
            }
            let effects = RegistrationReducer::new().reduce(state, action, &env);
            match state.last_error.take() {
                Some(rejection) => Err(rejection.into()),
                None => Ok(commits(effects)),
            }
        });

        self.store.decide_registration(event_id, decide).await
    }

    fn cancellation_outcome(
        event_id: EventId,
        facts: Vec<RegistrationAction>,
    ) -> Result<CancellationOutcome> {
        let mut cancelled = None;
        let mut promoted = Vec::new();
        for fact in facts {
            match fact {
                RegistrationAction::RegistrationCancelled { registration } => {
                    cancelled = Some(registration);
                }
                RegistrationAction::WaitlistPromoted { registration } => {
                    promoted.push(registration);
                }
                _ => {}
            }
        }
        let cancelled = cancelled
            .ok_or_else(|| MissionBoardError::Database("Cancellation produced no fact".into()))?;

        metrics::record_registration_cancelled();
        tracing::info!(
            event_id = %event_id,
            registration_id = %cancelled.id,
            status = %cancelled.status,
            "Registration cancelled"
        );
        for promoted in &promoted {
            metrics::record_waitlist_promotion();
            tracing::info!(
                event_id = %event_id,
                registration_id = %promoted.id,
                member_id = %promoted.member_id,
                "Waitlisted registration promoted"
            );
        }

        Ok(CancellationOutcome { cancelled, promoted })
    }
}
