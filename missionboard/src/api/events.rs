//! Event management API endpoints.
//!
//! - GET /api/events - List the organization's events
//! - POST /api/events - Create an event (admin)
//! - GET /api/events/:id - Event detail with attendance summary
//! - PUT /api/events/:id - Update a scheduled event (admin)
//! - DELETE /api/events/:id - Delete an event and its registrations (admin)
//! - POST /api/events/:id/cancel | /complete | /archive - Lifecycle (admin)

use crate::aggregates::EventDetails;
use crate::auth::{RequireAdmin, SessionUser};
use crate::server::state::AppState;
use crate::types::{Capacity, Event, EventId, EventOverview, EventStatus, Location};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use missionboard_web::{AppJson, WebResult};
use serde::Deserialize;

// ============================================================================
// Request Types
// ============================================================================

/// Event fields submitted by the dashboard.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequest {
    /// Event name
    pub name: String,
    /// Longer description
    pub description: Option<String>,
    /// Start date and time
    pub date: DateTime<Utc>,
    /// End date and time
    pub end_date: Option<DateTime<Utc>>,
    /// Venue name
    pub venue: Option<String>,
    /// Street address
    pub address: Option<String>,
    /// City
    pub city: Option<String>,
    /// Seat limit (omit for unlimited)
    pub capacity: Option<u32>,
    /// Hide from the public pages
    #[serde(default)]
    pub is_private: bool,
    /// Registrations close after this instant
    pub registration_deadline: Option<DateTime<Utc>>,
}

impl From<EventRequest> for EventDetails {
    fn from(request: EventRequest) -> Self {
        Self {
            name: request.name,
            description: request.description,
            date: request.date,
            end_date: request.end_date,
            location: Location {
                venue: request.venue,
                address: request.address,
                city: request.city,
            },
            capacity: request.capacity.map(Capacity::new),
            is_private: request.is_private,
            registration_deadline: request.registration_deadline,
        }
    }
}

/// Query parameters for listing events.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEventsQuery {
    /// Filter by status
    pub status: Option<EventStatus>,
    /// Only events starting at or after this instant
    pub from: Option<DateTime<Utc>>,
}

// ============================================================================
// Handlers
// ============================================================================

/// List the organization's events, including private ones.
///
/// # Example
///
/// ```bash
/// curl "http://localhost:8080/api/events?status=SCHEDULED" \
///   -H "Authorization: Bearer <session_token>"
/// ```
pub async fn list_events(
    user: SessionUser,
    State(state): State<AppState>,
    Query(query): Query<ListEventsQuery>,
) -> WebResult<Json<Vec<EventOverview>>> {
    let events = state
        .events()
        .list(user.organization_id(), query.status, query.from)
        .await?;
    Ok(Json(events))
}

/// Get an event with its attendance summary.
pub async fn get_event(
    user: SessionUser,
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
) -> WebResult<Json<EventOverview>> {
    let event = state.events().get(user.organization_id(), event_id).await?;
    Ok(Json(event))
}

/// Create an event. The administrator becomes its organizer.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/events \
///   -H "Authorization: Bearer <session_token>" \
///   -H "Content-Type: application/json" \
///   -d '{
///     "name": "Spring Meetup",
///     "date": "2025-04-01T18:00:00Z",
///     "venue": "Community Hall",
///     "capacity": 40,
///     "registrationDeadline": "2025-03-30T00:00:00Z"
///   }'
/// ```
pub async fn create_event(
    admin: RequireAdmin,
    State(state): State<AppState>,
    AppJson(request): AppJson<EventRequest>,
) -> WebResult<(StatusCode, Json<Event>)> {
    let event = state
        .events()
        .create(admin.organization_id(), Some(admin.member.id), request.into())
        .await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// Replace a scheduled event's fields.
pub async fn update_event(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
    AppJson(request): AppJson<EventRequest>,
) -> WebResult<Json<Event>> {
    let event = state
        .events()
        .update(admin.organization_id(), event_id, request.into())
        .await?;
    Ok(Json(event))
}

/// Delete an event and its registrations.
pub async fn delete_event(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
) -> WebResult<StatusCode> {
    state
        .events()
        .delete(admin.organization_id(), event_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Cancel a scheduled event.
pub async fn cancel_event(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
) -> WebResult<Json<Event>> {
    let event = state
        .events()
        .cancel(admin.organization_id(), event_id)
        .await?;
    Ok(Json(event))
}

/// Mark a scheduled event as completed.
pub async fn complete_event(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
) -> WebResult<Json<Event>> {
    let event = state
        .events()
        .complete(admin.organization_id(), event_id)
        .await?;
    Ok(Json(event))
}

/// Archive an event.
pub async fn archive_event(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
) -> WebResult<Json<Event>> {
    let event = state
        .events()
        .archive(admin.organization_id(), event_id)
        .await?;
    Ok(Json(event))
}
