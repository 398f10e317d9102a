//! Authentication extractors.
//!
//! Sessions are issued by the external authentication layer into the
//! `sessions` table; this backend only validates them.
//!
//! - [`BearerToken`]: the raw `Authorization: Bearer <token>` value
//! - [`SessionUser`]: a valid session and its member
//! - [`RequireAdmin`]: a session whose member is an OWNER or ADMIN
//!
//! # Usage
//!
//! ```rust,ignore
//! async fn list_members(admin: RequireAdmin, State(state): State<AppState>) -> WebResult<...> {
//!     state.members().list(admin.organization_id(), filter).await?;
//! }
//! ```

use crate::server::state::AppState;
use crate::types::{Member, MemberStatus, OrganizationId};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use missionboard_web::AppError;
use uuid::Uuid;

/// Bearer token extracted from `Authorization: Bearer <token>` header.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| {
                AppError::unauthorized("Invalid authorization format. Expected 'Bearer <token>'")
            })?
            .trim();

        if token.is_empty() {
            return Err(AppError::unauthorized("Empty bearer token"));
        }

        Ok(Self(token.to_string()))
    }
}

/// Authenticated member.
///
/// Use as a handler parameter to require a valid, unexpired session.
/// Suspended members are refused with 403.
#[derive(Debug, Clone)]
pub struct SessionUser {
    /// The authenticated member
    pub member: Member,
}

impl SessionUser {
    /// The organization every request of this user is scoped to
    #[must_use]
    pub const fn organization_id(&self) -> OrganizationId {
        self.member.organization_id
    }
}

#[async_trait]
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let bearer = BearerToken::from_request_parts(parts, state).await?;
        let token = Uuid::parse_str(&bearer.0)
            .map_err(|_| AppError::unauthorized("Invalid session token format"))?;

        let session = state
            .store
            .find_session(token)
            .await?
            .ok_or_else(|| AppError::unauthorized("Unknown session"))?;
        if session.is_expired(state.clock.now()) {
            return Err(AppError::unauthorized("Session expired"));
        }

        let member = state
            .store
            .get_member(session.member_id)
            .await?
            .ok_or_else(|| AppError::unauthorized("Session member no longer exists"))?;
        if member.status == MemberStatus::Suspended {
            tracing::warn!(member_id = %member.id, "Suspended member attempted access");
            return Err(AppError::forbidden("Member is suspended"));
        }

        Ok(Self { member })
    }
}

/// Require the OWNER or ADMIN role.
///
/// Returns 403 Forbidden for other members.
#[derive(Debug, Clone)]
pub struct RequireAdmin {
    /// The authenticated administrator
    pub member: Member,
}

impl RequireAdmin {
    /// The organization the administrator manages
    #[must_use]
    pub const fn organization_id(&self) -> OrganizationId {
        self.member.organization_id
    }
}

#[async_trait]
impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = SessionUser::from_request_parts(parts, state).await?;
        if !user.member.role.is_admin() {
            return Err(AppError::forbidden("Administrator role required"));
        }
        Ok(Self {
            member: user.member,
        })
    }
}
