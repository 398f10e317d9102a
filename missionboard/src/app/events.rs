//! Event management and the public event pages.

use super::scoped;
use crate::aggregates::{EventAction, EventDetails, EventEnvironment, EventReducer, EventState};
use crate::error::{MissionBoardError, Result};
use crate::store::{EventFilter, MissionBoardStore};
use crate::types::{Event, EventId, EventOverview, EventStatus, MemberId, OrganizationId};
use chrono::{DateTime, Utc};
use missionboard_core::effect::commits;
use missionboard_core::environment::Clock;
use missionboard_core::reducer::Reducer;
use std::sync::Arc;

/// Event service
#[derive(Clone)]
pub struct EventService {
    store: Arc<dyn MissionBoardStore>,
    clock: Arc<dyn Clock>,
    reducer: EventReducer,
    env: EventEnvironment,
}

impl EventService {
    /// Create a new event service
    #[must_use]
    pub fn new(store: Arc<dyn MissionBoardStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            env: EventEnvironment::new(Arc::clone(&clock)),
            clock,
            reducer: EventReducer::new(),
        }
    }

    /// Events of an organization, including private ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn list(
        &self,
        organization_id: OrganizationId,
        status: Option<EventStatus>,
        from: Option<DateTime<Utc>>,
    ) -> Result<Vec<EventOverview>> {
        let filter = EventFilter {
            status,
            from,
            ..EventFilter::organization(organization_id)
        };
        self.store.list_events(filter).await
    }

    /// An event of the organization with its attendance summary.
    ///
    /// # Errors
    ///
    /// Returns [`MissionBoardError::NotFound`] for unknown events and events
    /// of other organizations.
    pub async fn get(
        &self,
        organization_id: OrganizationId,
        event_id: EventId,
    ) -> Result<EventOverview> {
        let overview = self.store.get_event(event_id).await?;
        scoped(
            overview,
            organization_id,
            |o| o.event.organization_id,
            "Event",
            event_id,
        )
    }

    /// Upcoming, scheduled public events of every organization.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn list_public(&self) -> Result<Vec<EventOverview>> {
        self.store
            .list_events(EventFilter::public(self.clock.now()))
            .await
    }

    /// A public event. Private events are reported as not found.
    ///
    /// # Errors
    ///
    /// Returns [`MissionBoardError::NotFound`] for unknown or private events.
    pub async fn get_public(&self, event_id: EventId) -> Result<EventOverview> {
        self.store
            .get_event(event_id)
            .await?
            .filter(|o| !o.event.is_private)
            .ok_or_else(|| MissionBoardError::not_found("Event", event_id))
    }

    /// Create an event.
    ///
    /// # Errors
    ///
    /// Returns [`MissionBoardError::Validation`] for invalid details.
    pub async fn create(
        &self,
        organization_id: OrganizationId,
        organizer_id: Option<MemberId>,
        details: EventDetails,
    ) -> Result<Event> {
        let event_id = EventId::new();
        let event = self
            .execute(
                EventState::default(),
                EventAction::CreateEvent {
                    id: event_id,
                    organization_id,
                    organizer_id,
                    details,
                },
            )
            .await?;

        tracing::info!(
            event_id = %event.id,
            organization_id = %organization_id,
            capacity = ?event.capacity.map(|c| c.value()),
            "Event created"
        );
        Ok(event)
    }

    /// Replace the editable fields of a scheduled event.
    ///
    /// Capacity changes do not move registrations between the confirmed list
    /// and the waitlist.
    ///
    /// # Errors
    ///
    /// Returns [`MissionBoardError::NotFound`] or
    /// [`MissionBoardError::Validation`].
    pub async fn update(
        &self,
        organization_id: OrganizationId,
        event_id: EventId,
        details: EventDetails,
    ) -> Result<Event> {
        self.transition(organization_id, event_id, EventAction::UpdateEvent { details })
            .await
    }

    /// Cancel a scheduled event.
    ///
    /// # Errors
    ///
    /// Returns [`MissionBoardError::NotFound`] or
    /// [`MissionBoardError::Validation`] for a non-scheduled event.
    pub async fn cancel(
        &self,
        organization_id: OrganizationId,
        event_id: EventId,
    ) -> Result<Event> {
        self.transition(organization_id, event_id, EventAction::CancelEvent)
            .await
    }

    /// Mark a scheduled event as completed.
    ///
    /// # Errors
    ///
    /// Returns [`MissionBoardError::NotFound`] or
    /// [`MissionBoardError::Validation`] for a non-scheduled event.
    pub async fn complete(
        &self,
        organization_id: OrganizationId,
        event_id: EventId,
    ) -> Result<Event> {
        self.transition(organization_id, event_id, EventAction::CompleteEvent)
            .await
    }

    /// Archive an event.
    ///
    /// # Errors
    ///
    /// Returns [`MissionBoardError::NotFound`] or
    /// [`MissionBoardError::Validation`] for an archived event.
    pub async fn archive(
        &self,
        organization_id: OrganizationId,
        event_id: EventId,
    ) -> Result<Event> {
        self.transition(organization_id, event_id, EventAction::ArchiveEvent)
            .await
    }

    /// Delete an event with its registrations.
    ///
    /// # Errors
    ///
    /// Returns [`MissionBoardError::NotFound`] for unknown events.
    pub async fn delete(&self, organization_id: OrganizationId, event_id: EventId) -> Result<()> {
        self.get(organization_id, event_id).await?;
        if !self.store.delete_event(event_id).await? {
            return Err(MissionBoardError::not_found("Event", event_id));
        }
        tracing::info!(event_id = %event_id, "Event deleted");
        Ok(())
    }

    async fn transition(
        &self,
        organization_id: OrganizationId,
        event_id: EventId,
        action: EventAction,
    ) -> Result<Event> {
        let overview = self.get(organization_id, event_id).await?;
        let from = overview.event.status;
        let event = self
            .execute(EventState::loaded(overview.event), action)
            .await?;

        if from != event.status {
            tracing::info!(event_id = %event_id, %from, to = %event.status, "Event status changed");
        }
        Ok(event)
    }

    async fn execute(&self, mut state: EventState, action: EventAction) -> Result<Event> {
        let effects = self.reducer.reduce(&mut state, action, &self.env);
        if let Some(rejection) = state.last_error.take() {
            return Err(rejection.into());
        }

        let mut saved = None;
        for fact in commits(effects) {
            if let Some(event) = fact.event() {
                saved = Some(self.store.save_event(event.clone()).await?);
            }
        }
        saved.ok_or_else(|| MissionBoardError::Database("Event decision produced no fact".into()))
    }
}
