//! Organizations, members and sessions.

use super::rows::{convert_all, MemberRow, OrganizationRow, SessionRow};
use super::PostgresStore;
use crate::store::{
    MemberFilter, MemberRepository, OrganizationRepository, SessionRepository, StoreFuture,
};
use crate::types::{Member, MemberId, Organization, OrganizationId, Session};
use uuid::Uuid;

const MEMBER_COLUMNS: &str =
    "id, organization_id, name, email, phone, status, role, joined_at, notes";

/// Escape `LIKE` wildcards so user input matches literally.
fn like_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

impl OrganizationRepository for PostgresStore {
    fn get_organization(&self, id: OrganizationId) -> StoreFuture<'_, Option<Organization>> {
        Box::pin(async move {
            let row: Option<OrganizationRow> = sqlx::query_as(
                "SELECT id, name, contact_email, timezone, default_currency, created_at
                 FROM organizations WHERE id = $1",
            )
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

            Ok(row.map(Organization::from))
        })
    }

    fn update_organization(&self, organization: Organization) -> StoreFuture<'_, Organization> {
        Box::pin(async move {
            let row: OrganizationRow = sqlx::query_as(
                "UPDATE organizations
                 SET name = $2, contact_email = $3, timezone = $4, default_currency = $5
                 WHERE id = $1
                 RETURNING id, name, contact_email, timezone, default_currency, created_at",
            )
            .bind(organization.id.as_uuid())
            .bind(&organization.name)
            .bind(&organization.contact_email)
            .bind(&organization.timezone)
            .bind(&organization.default_currency)
            .fetch_one(&self.pool)
            .await?;

            Ok(Organization::from(row))
        })
    }
}

impl MemberRepository for PostgresStore {
    fn list_members(
        &self,
        organization_id: OrganizationId,
        filter: MemberFilter,
    ) -> StoreFuture<'_, Vec<Member>> {
        Box::pin(async move {
            let search = filter.search.as_deref().map(like_pattern);
            let rows: Vec<MemberRow> = sqlx::query_as(&format!(
                "SELECT {MEMBER_COLUMNS} FROM members
                 WHERE organization_id = $1
                   AND ($2::text IS NULL OR status = $2)
                   AND ($3::text IS NULL OR name ILIKE $3 OR email ILIKE $3)
                 ORDER BY name, id"
            ))
            .bind(organization_id.as_uuid())
            .bind(filter.status.map(|s| s.as_str()))
            .bind(search)
            .fetch_all(&self.pool)
            .await?;

            convert_all(rows)
        })
    }

    fn get_member(&self, id: MemberId) -> StoreFuture<'_, Option<Member>> {
        Box::pin(async move {
            let row: Option<MemberRow> =
                sqlx::query_as(&format!("SELECT {MEMBER_COLUMNS} FROM members WHERE id = $1"))
                    .bind(id.as_uuid())
                    .fetch_optional(&self.pool)
                    .await?;

            row.map(Member::try_from).transpose()
        })
    }

    fn find_member_by_email(&self, email: String) -> StoreFuture<'_, Option<Member>> {
        Box::pin(async move {
            let row: Option<MemberRow> = sqlx::query_as(&format!(
                "SELECT {MEMBER_COLUMNS} FROM members WHERE email = $1"
            ))
            .bind(&email)
            .fetch_optional(&self.pool)
            .await?;

            row.map(Member::try_from).transpose()
        })
    }

    fn insert_member(&self, member: Member) -> StoreFuture<'_, Member> {
        Box::pin(async move {
            sqlx::query(
                "INSERT INTO members
                     (id, organization_id, name, email, phone, status, role, joined_at, notes)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(member.id.as_uuid())
            .bind(member.organization_id.as_uuid())
            .bind(&member.name)
            .bind(&member.email)
            .bind(&member.phone)
            .bind(member.status.as_str())
            .bind(member.role.as_str())
            .bind(member.joined_at)
            .bind(&member.notes)
            .execute(&self.pool)
            .await?;

            Ok(member)
        })
    }

    fn update_member(&self, member: Member) -> StoreFuture<'_, Member> {
        Box::pin(async move {
            let result = sqlx::query(
                "UPDATE members
                 SET name = $2, email = $3, phone = $4, status = $5, role = $6, notes = $7
                 WHERE id = $1",
            )
            .bind(member.id.as_uuid())
            .bind(&member.name)
            .bind(&member.email)
            .bind(&member.phone)
            .bind(member.status.as_str())
            .bind(member.role.as_str())
            .bind(&member.notes)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                return Err(crate::error::MissionBoardError::not_found("Member", member.id));
            }
            Ok(member)
        })
    }

    fn delete_member(&self, id: MemberId) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let result = sqlx::query("DELETE FROM members WHERE id = $1")
                .bind(id.as_uuid())
                .execute(&self.pool)
                .await?;

            Ok(result.rows_affected() > 0)
        })
    }
}

impl SessionRepository for PostgresStore {
    fn find_session(&self, token: Uuid) -> StoreFuture<'_, Option<Session>> {
        Box::pin(async move {
            let row: Option<SessionRow> =
                sqlx::query_as("SELECT token, member_id, expires_at FROM sessions WHERE token = $1")
                    .bind(token)
                    .fetch_optional(&self.pool)
                    .await?;

            Ok(row.map(Session::from))
        })
    }
}
