//! Member administration and organization settings.

use super::scoped;
use super::validation::{normalize_currency, normalize_email, optional_text, required_text};
use crate::error::{MissionBoardError, Result};
use crate::metrics;
use crate::store::{MemberFilter, MissionBoardStore};
use crate::types::{Member, MemberId, MemberRole, MemberStatus, Organization, OrganizationId};
use missionboard_core::environment::Clock;
use std::sync::Arc;

const MAX_NAME_LENGTH: usize = 200;

/// Member fields editable from the dashboard
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberInput {
    /// Full name
    pub name: String,
    /// Email address
    pub email: String,
    /// Phone number
    pub phone: Option<String>,
    /// Membership status
    pub status: MemberStatus,
    /// Role
    pub role: MemberRole,
    /// Administrator notes
    pub notes: Option<String>,
}

/// Organization settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrganizationInput {
    /// Display name
    pub name: String,
    /// Public contact address
    pub contact_email: Option<String>,
    /// IANA timezone name
    pub timezone: String,
    /// Default ISO 4217 currency
    pub default_currency: String,
}

/// Member service
#[derive(Clone)]
pub struct MemberService {
    store: Arc<dyn MissionBoardStore>,
    clock: Arc<dyn Clock>,
}

impl MemberService {
    /// Create a new member service
    #[must_use]
    pub fn new(store: Arc<dyn MissionBoardStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Members of the organization, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn list(
        &self,
        organization_id: OrganizationId,
        filter: MemberFilter,
    ) -> Result<Vec<Member>> {
        let filter = MemberFilter {
            search: optional_text(filter.search),
            ..filter
        };
        self.store.list_members(organization_id, filter).await
    }

    /// A member of the organization.
    ///
    /// # Errors
    ///
    /// Returns [`MissionBoardError::NotFound`] for unknown members and members
    /// of other organizations.
    pub async fn get(
        &self,
        organization_id: OrganizationId,
        member_id: MemberId,
    ) -> Result<Member> {
        let member = self.store.get_member(member_id).await?;
        scoped(member, organization_id, |m| m.organization_id, "Member", member_id)
    }

    /// Add a member to the organization.
    ///
    /// # Errors
    ///
    /// - [`MissionBoardError::Validation`]: blank name or malformed email
    /// - [`MissionBoardError::Conflict`]: the email is taken
    pub async fn create(
        &self,
        organization_id: OrganizationId,
        input: MemberInput,
    ) -> Result<Member> {
        let member = Member {
            id: MemberId::new(),
            organization_id,
            name: required_text("Name", &input.name, MAX_NAME_LENGTH)?,
            email: normalize_email(&input.email)?,
            phone: optional_text(input.phone),
            status: input.status,
            role: input.role,
            joined_at: self.clock.now(),
            notes: optional_text(input.notes),
        };

        let member = self.store.insert_member(member).await?;
        metrics::record_member_created("dashboard");
        tracing::info!(
            member_id = %member.id,
            organization_id = %organization_id,
            role = %member.role,
            "Member created"
        );
        Ok(member)
    }

    /// Replace a member's editable fields.
    ///
    /// # Errors
    ///
    /// - [`MissionBoardError::NotFound`]: unknown member
    /// - [`MissionBoardError::Validation`]: blank name or malformed email
    /// - [`MissionBoardError::Conflict`]: the email is taken
    pub async fn update(
        &self,
        organization_id: OrganizationId,
        member_id: MemberId,
        input: MemberInput,
    ) -> Result<Member> {
        let existing = self.get(organization_id, member_id).await?;
        let member = Member {
            name: required_text("Name", &input.name, MAX_NAME_LENGTH)?,
            email: normalize_email(&input.email)?,
            phone: optional_text(input.phone),
            status: input.status,
            role: input.role,
            notes: optional_text(input.notes),
            ..existing
        };

        let member = self.store.update_member(member).await?;
        tracing::info!(member_id = %member_id, status = %member.status, "Member updated");
        Ok(member)
    }

    /// Remove a member who never registered for an event.
    ///
    /// Registrations outlive their member until the event itself is deleted,
    /// so a member with any registration is kept; mark them INACTIVE instead.
    ///
    /// # Errors
    ///
    /// - [`MissionBoardError::NotFound`]: unknown member
    /// - [`MissionBoardError::Conflict`]: the member has event registrations
    pub async fn delete(&self, organization_id: OrganizationId, member_id: MemberId) -> Result<()> {
        self.get(organization_id, member_id).await?;
        if !self.store.delete_member(member_id).await? {
            return Err(MissionBoardError::not_found("Member", member_id));
        }
        tracing::info!(member_id = %member_id, "Member deleted");
        Ok(())
    }
}

/// Organization settings service
#[derive(Clone)]
pub struct OrganizationService {
    store: Arc<dyn MissionBoardStore>,
}

impl OrganizationService {
    /// Create a new organization service
    #[must_use]
    pub fn new(store: Arc<dyn MissionBoardStore>) -> Self {
        Self { store }
    }

    /// The organization's settings.
    ///
    /// # Errors
    ///
    /// Returns [`MissionBoardError::NotFound`] if the organization is gone.
    pub async fn get(&self, organization_id: OrganizationId) -> Result<Organization> {
        self.store
            .get_organization(organization_id)
            .await?
            .ok_or_else(|| MissionBoardError::not_found("Organization", organization_id))
    }

    /// Replace the organization's settings.
    ///
    /// # Errors
    ///
    /// Returns [`MissionBoardError::Validation`] for a blank name or timezone,
    /// a malformed contact email or currency code.
    pub async fn update(
        &self,
        organization_id: OrganizationId,
        input: OrganizationInput,
    ) -> Result<Organization> {
        let existing = self.get(organization_id).await?;
        let organization = Organization {
            name: required_text("Name", &input.name, MAX_NAME_LENGTH)?,
            contact_email: optional_text(input.contact_email)
                .map(|email| normalize_email(&email))
                .transpose()?,
            timezone: required_text("Timezone", &input.timezone, 64)?,
            default_currency: normalize_currency(&input.default_currency)?,
            ..existing
        };

        let organization = self.store.update_organization(organization).await?;
        tracing::info!(organization_id = %organization_id, "Organization settings updated");
        Ok(organization)
    }
}
