//! Registration API endpoints.
//!
//! Member endpoints (own registration):
//! - GET /api/events/:id/register
//! - POST /api/events/:id/register - 201 for a new registration, 200 when a
//!   cancelled one is reused
//! - DELETE /api/events/:id/register - Cancel; promotes from the waitlist
//!
//! Admin endpoints:
//! - GET /api/events/:id/registrations - Attendee list
//! - DELETE /api/events/:id/registrations/:rid - Cancel on behalf of the organization
//! - POST /api/events/:id/registrations/:rid/attend - Check in

use crate::app::{CancellationOutcome, RegistrationOutcome, RegistrationRequest};
use crate::auth::{RequireAdmin, SessionUser};
use crate::server::state::AppState;
use crate::types::{Attendee, EventId, Registration, RegistrationId};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use missionboard_web::{AppJson, WebResult};
use serde::{Deserialize, Serialize};

/// Registration form for members.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Additional guests
    #[serde(default)]
    pub guests_count: u32,
    /// Notes for the organizers
    pub notes: Option<String>,
}

/// Result of an administrative cancellation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationResponse {
    /// The cancelled registration
    pub cancelled: Registration,
    /// Waitlisted registrations confirmed into the freed seats
    pub promoted: Vec<Registration>,
}

impl From<CancellationOutcome> for CancellationResponse {
    fn from(outcome: CancellationOutcome) -> Self {
        Self {
            cancelled: outcome.cancelled,
            promoted: outcome.promoted,
        }
    }
}

/// 201 for a new row, 200 for a reused one.
pub(crate) fn registration_response(
    outcome: RegistrationOutcome,
) -> (StatusCode, Json<Registration>) {
    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    (status, Json(outcome.registration))
}

/// The caller's registration for an event.
pub async fn get_own_registration(
    user: SessionUser,
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
) -> WebResult<Json<Registration>> {
    let registration = state
        .registrations()
        .own_registration(&user.member, event_id)
        .await?;
    Ok(Json(registration))
}

/// Register the caller for an event.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/events/<event_id>/register \
///   -H "Authorization: Bearer <session_token>" \
///   -H "Content-Type: application/json" \
///   -d '{ "guestsCount": 1, "notes": "Vegetarian" }'
/// ```
pub async fn register(
    user: SessionUser,
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
    AppJson(request): AppJson<RegisterRequest>,
) -> WebResult<(StatusCode, Json<Registration>)> {
    let outcome = state
        .registrations()
        .register(
            &user.member,
            event_id,
            RegistrationRequest {
                guests_count: request.guests_count,
                notes: request.notes,
            },
        )
        .await?;
    Ok(registration_response(outcome))
}

/// Cancel the caller's registration.
pub async fn cancel_own_registration(
    user: SessionUser,
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
) -> WebResult<Json<Registration>> {
    let outcome = state
        .registrations()
        .cancel(&user.member, event_id)
        .await?;
    Ok(Json(outcome.cancelled))
}

/// Registrations of an event with registrant contact details.
pub async fn list_attendees(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
) -> WebResult<Json<Vec<Attendee>>> {
    let attendees = state
        .registrations()
        .attendees(admin.organization_id(), event_id)
        .await?;
    Ok(Json(attendees))
}

/// Cancel a registration on behalf of the organization.
pub async fn admin_cancel_registration(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path((event_id, registration_id)): Path<(EventId, RegistrationId)>,
) -> WebResult<Json<CancellationResponse>> {
    let outcome = state
        .registrations()
        .admin_cancel(admin.organization_id(), event_id, registration_id)
        .await?;
    Ok(Json(outcome.into()))
}

/// Check a confirmed registrant in.
pub async fn mark_attended(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path((event_id, registration_id)): Path<(EventId, RegistrationId)>,
) -> WebResult<Json<Registration>> {
    let registration = state
        .registrations()
        .mark_attended(admin.organization_id(), event_id, registration_id)
        .await?;
    Ok(Json(registration))
}
