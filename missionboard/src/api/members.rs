//! Member administration endpoints (admin only).

use crate::app::MemberInput;
use crate::auth::RequireAdmin;
use crate::server::state::AppState;
use crate::store::MemberFilter;
use crate::types::{Member, MemberId, MemberRole, MemberStatus};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use missionboard_web::{AppJson, WebResult};
use serde::Deserialize;

/// Member fields submitted by the dashboard.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRequest {
    /// Full name
    pub name: String,
    /// Email address
    pub email: String,
    /// Phone number
    pub phone: Option<String>,
    /// Membership status (defaults to ACTIVE)
    pub status: Option<MemberStatus>,
    /// Role (defaults to MEMBER)
    pub role: Option<MemberRole>,
    /// Administrator notes
    pub notes: Option<String>,
}

impl From<MemberRequest> for MemberInput {
    fn from(request: MemberRequest) -> Self {
        Self {
            name: request.name,
            email: request.email,
            phone: request.phone,
            status: request.status.unwrap_or(MemberStatus::Active),
            role: request.role.unwrap_or(MemberRole::Member),
            notes: request.notes,
        }
    }
}

/// Query parameters for listing members.
#[derive(Debug, Default, Deserialize)]
pub struct ListMembersQuery {
    /// Filter by status
    pub status: Option<MemberStatus>,
    /// Name or email substring
    pub search: Option<String>,
}

/// List members, ordered by name.
///
/// # Example
///
/// ```bash
/// curl "http://localhost:8080/api/members?status=ACTIVE&search=ada" \
///   -H "Authorization: Bearer <session_token>"
/// ```
pub async fn list_members(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<ListMembersQuery>,
) -> WebResult<Json<Vec<Member>>> {
    let filter = MemberFilter {
        status: query.status,
        search: query.search,
    };
    let members = state
        .members()
        .list(admin.organization_id(), filter)
        .await?;
    Ok(Json(members))
}

/// Get a member.
pub async fn get_member(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(member_id): Path<MemberId>,
) -> WebResult<Json<Member>> {
    let member = state
        .members()
        .get(admin.organization_id(), member_id)
        .await?;
    Ok(Json(member))
}

/// Add a member.
pub async fn create_member(
    admin: RequireAdmin,
    State(state): State<AppState>,
    AppJson(request): AppJson<MemberRequest>,
) -> WebResult<(StatusCode, Json<Member>)> {
    let member = state
        .members()
        .create(admin.organization_id(), request.into())
        .await?;
    Ok((StatusCode::CREATED, Json(member)))
}

/// Replace a member's fields.
pub async fn update_member(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(member_id): Path<MemberId>,
    AppJson(request): AppJson<MemberRequest>,
) -> WebResult<Json<Member>> {
    let member = state
        .members()
        .update(admin.organization_id(), member_id, request.into())
        .await?;
    Ok(Json(member))
}

/// Remove a member with their registrations and subscriptions.
pub async fn delete_member(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(member_id): Path<MemberId>,
) -> WebResult<StatusCode> {
    state
        .members()
        .delete(admin.organization_id(), member_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
