//! Public pages (no authentication).
//!
//! - GET /api/public/events - Upcoming public events
//! - GET /api/public/events/:id - Public event detail with remaining seats
//! - POST /api/public/events/:id/register - Register by name and email

use super::registrations::registration_response;
use crate::app::PublicRegistration;
use crate::server::state::AppState;
use crate::types::{EventId, EventOverview, Registration};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use missionboard_web::{AppJson, WebResult};
use serde::Deserialize;

/// Registration form on the public event page.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicRegisterRequest {
    /// Registrant name
    pub name: String,
    /// Registrant email
    pub email: String,
    /// Registrant phone
    pub phone: Option<String>,
    /// Additional guests
    #[serde(default)]
    pub guests_count: u32,
    /// Notes for the organizers
    pub notes: Option<String>,
}

impl From<PublicRegisterRequest> for PublicRegistration {
    fn from(request: PublicRegisterRequest) -> Self {
        Self {
            name: request.name,
            email: request.email,
            phone: request.phone,
            guests_count: request.guests_count,
            notes: request.notes,
        }
    }
}

/// Scheduled, non-private events from now on.
pub async fn list_public_events(
    State(state): State<AppState>,
) -> WebResult<Json<Vec<EventOverview>>> {
    Ok(Json(state.events().list_public().await?))
}

/// A public event. Private and unknown events are both 404.
pub async fn get_public_event(
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
) -> WebResult<Json<EventOverview>> {
    Ok(Json(state.events().get_public(event_id).await?))
}

/// Register for a public event, creating a pending member for unknown emails.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/public/events/<event_id>/register \
///   -H "Content-Type: application/json" \
///   -d '{ "name": "Ada Lovelace", "email": "ada@example.com", "guestsCount": 0 }'
/// ```
pub async fn register_public(
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
    AppJson(request): AppJson<PublicRegisterRequest>,
) -> WebResult<(StatusCode, Json<Registration>)> {
    let outcome = state
        .registrations()
        .register_public(event_id, request.into())
        .await?;
    Ok(registration_response(outcome))
}
