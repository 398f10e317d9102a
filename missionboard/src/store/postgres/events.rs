//! Events and registrations.

use super::rows::{
    convert_all, count_to_db, AttendeeRow, EventOverviewRow, EventRow, RegistrationRow,
};
use super::PostgresStore;
use crate::aggregates::{RegistrationAction, RegistrationState};
use crate::error::{MissionBoardError, Result};
use crate::store::{
    EventFilter, EventRepository, RegistrationDecision, RegistrationRepository, StoreFuture,
};
use crate::types::{Attendee, Event, EventId, EventOverview, MemberId, Registration};
use sqlx::{Postgres, Transaction};

const EVENT_COLUMNS: &str = "e.id, e.organization_id, e.organizer_id, e.name, e.description, \
     e.date, e.end_date, e.venue, e.address, e.city, e.capacity, e.is_private, \
     e.registration_deadline, e.status, e.created_at, e.updated_at";

const REGISTRATION_COLUMNS: &str = "r.id, r.event_id, r.member_id, r.status, r.guests_count, \
     r.notes, r.registered_at, r.updated_at";

/// Aggregated seat and waitlist counts, grouped per event.
fn overview_query(filter_clause: &str) -> String {
    format!(
        "SELECT {EVENT_COLUMNS},
             COALESCE(SUM(1 + r.guests_count)
                 FILTER (WHERE r.status IN ('CONFIRMED', 'ATTENDED')), 0)::BIGINT AS seats_taken,
             COUNT(r.id) FILTER (WHERE r.status = 'WAITLISTED') AS waitlisted
         FROM events e
         LEFT JOIN event_registrations r ON r.event_id = e.id
         WHERE {filter_clause}
         GROUP BY e.id
         ORDER BY e.date, e.id"
    )
}

impl EventRepository for PostgresStore {
    fn list_events(&self, filter: EventFilter) -> StoreFuture<'_, Vec<EventOverview>> {
        Box::pin(async move {
            let rows: Vec<EventOverviewRow> = sqlx::query_as(&overview_query(
                "($1::uuid IS NULL OR e.organization_id = $1)
                 AND ($2::text IS NULL OR e.status = $2)
                 AND ($3 OR NOT e.is_private)
                 AND ($4::timestamptz IS NULL OR e.date >= $4)",
            ))
            .bind(filter.organization_id.map(|id| *id.as_uuid()))
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.include_private)
            .bind(filter.from)
            .fetch_all(&self.pool)
            .await?;

            convert_all(rows)
        })
    }

    fn get_event(&self, id: EventId) -> StoreFuture<'_, Option<EventOverview>> {
        Box::pin(async move {
            let row: Option<EventOverviewRow> = sqlx::query_as(&overview_query("e.id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

            row.map(EventOverview::try_from).transpose()
        })
    }

    fn save_event(&self, event: Event) -> StoreFuture<'_, Event> {
        Box::pin(async move {
            let capacity = event
                .capacity
                .map(|c| count_to_db(c.value(), "Capacity"))
                .transpose()?;

            sqlx::query(
                "INSERT INTO events
                     (id, organization_id, organizer_id, name, description, date, end_date,
                      venue, address, city, capacity, is_private, registration_deadline,
                      status, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
                 ON CONFLICT (id) DO UPDATE SET
                     organizer_id = EXCLUDED.organizer_id,
                     name = EXCLUDED.name,
                     description = EXCLUDED.description,
                     date = EXCLUDED.date,
                     end_date = EXCLUDED.end_date,
                     venue = EXCLUDED.venue,
                     address = EXCLUDED.address,
                     city = EXCLUDED.city,
                     capacity = EXCLUDED.capacity,
                     is_private = EXCLUDED.is_private,
                     registration_deadline = EXCLUDED.registration_deadline,
                     status = EXCLUDED.status,
                     updated_at = EXCLUDED.updated_at",
            )
            .bind(event.id.as_uuid())
            .bind(event.organization_id.as_uuid())
            .bind(event.organizer_id.map(|id| *id.as_uuid()))
            .bind(&event.name)
            .bind(&event.description)
            .bind(event.date)
            .bind(event.end_date)
            .bind(&event.location.venue)
            .bind(&event.location.address)
            .bind(&event.location.city)
            .bind(capacity)
            .bind(event.is_private)
            .bind(event.registration_deadline)
            .bind(event.status.as_str())
            .bind(event.created_at)
            .bind(event.updated_at)
            .execute(&self.pool)
            .await?;

            Ok(event)
        })
    }

    fn delete_event(&self, id: EventId) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let result = sqlx::query("DELETE FROM events WHERE id = $1")
                .bind(id.as_uuid())
                .execute(&self.pool)
                .await?;

            Ok(result.rows_affected() > 0)
        })
    }
}

async fn upsert_registration(
    tx: &mut Transaction<'_, Postgres>,
    registration: &Registration,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO event_registrations
             (id, event_id, member_id, status, guests_count, notes, registered_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         ON CONFLICT (id) DO UPDATE SET
             status = EXCLUDED.status,
             guests_count = EXCLUDED.guests_count,
             notes = EXCLUDED.notes,
             registered_at = EXCLUDED.registered_at,
             updated_at = EXCLUDED.updated_at",
    )
    .bind(registration.id.as_uuid())
    .bind(registration.event_id.as_uuid())
    .bind(registration.member_id.as_uuid())
    .bind(registration.status.as_str())
    .bind(count_to_db(registration.guests_count, "Guest count")?)
    .bind(&registration.notes)
    .bind(registration.registered_at)
    .bind(registration.updated_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

impl RegistrationRepository for PostgresStore {
    fn decide_registration(
        &self,
        event_id: EventId,
        decide: RegistrationDecision,
    ) -> StoreFuture<'_, Vec<RegistrationAction>> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await?;

            // Row lock serializes concurrent decisions for this event.
            let event: Option<EventRow> = sqlx::query_as(&format!(
                "SELECT {EVENT_COLUMNS} FROM events e WHERE e.id = $1 FOR UPDATE"
            ))
            .bind(event_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?;
            let event = event.ok_or_else(|| MissionBoardError::not_found("Event", event_id))?;

            let rows: Vec<RegistrationRow> = sqlx::query_as(&format!(
                "SELECT {REGISTRATION_COLUMNS} FROM event_registrations r
                 WHERE r.event_id = $1
                 ORDER BY r.registered_at, r.id"
            ))
            .bind(event_id.as_uuid())
            .fetch_all(&mut *tx)
            .await?;

            let mut state = RegistrationState::new(Event::try_from(event)?, convert_all(rows)?);
            let facts = decide(&mut state)?;

            for registration in facts.iter().filter_map(RegistrationAction::registration) {
                upsert_registration(&mut tx, registration).await?;
            }

            tx.commit().await?;
            tracing::debug!(
                event_id = %event_id,
                facts = facts.len(),
                "Registration decision committed"
            );
            Ok(facts)
        })
    }

    fn list_attendees(&self, event_id: EventId) -> StoreFuture<'_, Vec<Attendee>> {
        Box::pin(async move {
            let rows: Vec<AttendeeRow> = sqlx::query_as(&format!(
                "SELECT {REGISTRATION_COLUMNS}, m.name AS member_name, m.email AS member_email
                 FROM event_registrations r
                 JOIN members m ON m.id = r.member_id
                 WHERE r.event_id = $1
                 ORDER BY r.registered_at, r.id"
            ))
            .bind(event_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;

            convert_all(rows)
        })
    }

    fn find_registration(
        &self,
        event_id: EventId,
        member_id: MemberId,
    ) -> StoreFuture<'_, Option<Registration>> {
        Box::pin(async move {
            let row: Option<RegistrationRow> = sqlx::query_as(&format!(
                "SELECT {REGISTRATION_COLUMNS} FROM event_registrations r
                 WHERE r.event_id = $1 AND r.member_id = $2"
            ))
            .bind(event_id.as_uuid())
            .bind(member_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

            row.map(Registration::try_from).transpose()
        })
    }
}
