//! Organization settings endpoints.

use crate::app::OrganizationInput;
use crate::auth::{RequireAdmin, SessionUser};
use crate::server::state::AppState;
use crate::types::Organization;
use axum::{extract::State, Json};
use missionboard_web::{AppJson, WebResult};
use serde::Deserialize;

/// Organization settings form.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationRequest {
    /// Display name
    pub name: String,
    /// Public contact address
    pub contact_email: Option<String>,
    /// IANA timezone name
    pub timezone: String,
    /// ISO 4217 code
    pub default_currency: String,
}

/// The caller's organization.
pub async fn get_organization(
    user: SessionUser,
    State(state): State<AppState>,
) -> WebResult<Json<Organization>> {
    let organization = state.organization().get(user.organization_id()).await?;
    Ok(Json(organization))
}

/// Replace the organization's settings.
pub async fn update_organization(
    admin: RequireAdmin,
    State(state): State<AppState>,
    AppJson(request): AppJson<OrganizationRequest>,
) -> WebResult<Json<Organization>> {
    let input = OrganizationInput {
        name: request.name,
        contact_email: request.contact_email,
        timezone: request.timezone,
        default_currency: request.default_currency,
    };
    let organization = state
        .organization()
        .update(admin.organization_id(), input)
        .await?;
    Ok(Json(organization))
}
