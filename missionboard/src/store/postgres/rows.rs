//! Row types and their conversion into domain entities.
//!
//! Rows mirror the table columns (`i32`/`i64` numbers, `TEXT` enums); the
//! `TryFrom` impls validate stored values on the way out.

use crate::error::{MissionBoardError, Result};
use crate::types::{
    Attendee, AttendanceSummary, Capacity, Event, EventId, EventOverview, Location, Member,
    MemberId, MembershipPlan, Money, Organization, OrganizationId, ParseEnumError, Payment,
    PaymentId, PlanId, Registration, RegistrationId, Session, Subscription, SubscriptionId,
};
use chrono::{DateTime, Utc};
use std::str::FromStr;
use uuid::Uuid;

fn decode<T>(value: &str) -> Result<T>
where
    T: FromStr<Err = ParseEnumError>,
{
    value
        .parse()
        .map_err(|e: ParseEnumError| MissionBoardError::Database(e.to_string()))
}

fn non_negative<T, S>(value: S, column: &str) -> Result<T>
where
    T: TryFrom<S>,
    S: Copy + std::fmt::Display,
{
    T::try_from(value)
        .map_err(|_| MissionBoardError::Database(format!("Invalid stored {column}: {value}")))
}

/// Money as stored (`BIGINT` cents)
pub(super) fn cents_to_db(money: Money) -> Result<i64> {
    i64::try_from(money.cents()).map_err(|_| MissionBoardError::validation("Amount is too large"))
}

/// Counts as stored (`INTEGER`)
pub(super) fn count_to_db(value: u32, what: &str) -> Result<i32> {
    i32::try_from(value).map_err(|_| MissionBoardError::validation(format!("{what} is too large")))
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct OrganizationRow {
    id: Uuid,
    name: String,
    contact_email: Option<String>,
    timezone: String,
    default_currency: String,
    created_at: DateTime<Utc>,
}

impl From<OrganizationRow> for Organization {
    fn from(row: OrganizationRow) -> Self {
        Self {
            id: OrganizationId::from_uuid(row.id),
            name: row.name,
            contact_email: row.contact_email,
            timezone: row.timezone,
            default_currency: row.default_currency.trim_end().to_string(),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct MemberRow {
    id: Uuid,
    organization_id: Uuid,
    name: String,
    email: String,
    phone: Option<String>,
    status: String,
    role: String,
    joined_at: DateTime<Utc>,
    notes: Option<String>,
}

impl TryFrom<MemberRow> for Member {
    type Error = MissionBoardError;

    fn try_from(row: MemberRow) -> Result<Self> {
        Ok(Self {
            id: MemberId::from_uuid(row.id),
            organization_id: OrganizationId::from_uuid(row.organization_id),
            name: row.name,
            email: row.email,
            phone: row.phone,
            status: decode(&row.status)?,
            role: decode(&row.role)?,
            joined_at: row.joined_at,
            notes: row.notes,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct EventRow {
    id: Uuid,
    organization_id: Uuid,
    organizer_id: Option<Uuid>,
    name: String,
    description: Option<String>,
    date: DateTime<Utc>,
    end_date: Option<DateTime<Utc>>,
    venue: Option<String>,
    address: Option<String>,
    city: Option<String>,
    capacity: Option<i32>,
    is_private: bool,
    registration_deadline: Option<DateTime<Utc>>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = MissionBoardError;

    fn try_from(row: EventRow) -> Result<Self> {
        let capacity = row
            .capacity
            .map(|c| non_negative::<u32, _>(c, "capacity").map(Capacity::new))
            .transpose()?;

        Ok(Self {
            id: EventId::from_uuid(row.id),
            organization_id: OrganizationId::from_uuid(row.organization_id),
            organizer_id: row.organizer_id.map(MemberId::from_uuid),
            name: row.name,
            description: row.description,
            date: row.date,
            end_date: row.end_date,
            location: Location {
                venue: row.venue,
                address: row.address,
                city: row.city,
            },
            capacity,
            is_private: row.is_private,
            registration_deadline: row.registration_deadline,
            status: decode(&row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct EventOverviewRow {
    #[sqlx(flatten)]
    event: EventRow,
    seats_taken: i64,
    waitlisted: i64,
}

impl TryFrom<EventOverviewRow> for EventOverview {
    type Error = MissionBoardError;

    fn try_from(row: EventOverviewRow) -> Result<Self> {
        let event = Event::try_from(row.event)?;
        let seats_taken = non_negative(row.seats_taken, "seat count")?;
        let waitlisted = non_negative(row.waitlisted, "waitlist count")?;
        Ok(Self {
            attendance: AttendanceSummary::from_counts(event.capacity, seats_taken, waitlisted),
            event,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct RegistrationRow {
    id: Uuid,
    event_id: Uuid,
    member_id: Uuid,
    status: String,
    guests_count: i32,
    notes: Option<String>,
    registered_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RegistrationRow> for Registration {
    type Error = MissionBoardError;

    fn try_from(row: RegistrationRow) -> Result<Self> {
        Ok(Self {
            id: RegistrationId::from_uuid(row.id),
            event_id: EventId::from_uuid(row.event_id),
            member_id: MemberId::from_uuid(row.member_id),
            status: decode(&row.status)?,
            guests_count: non_negative(row.guests_count, "guests_count")?,
            notes: row.notes,
            registered_at: row.registered_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct AttendeeRow {
    #[sqlx(flatten)]
    registration: RegistrationRow,
    member_name: String,
    member_email: String,
}

impl TryFrom<AttendeeRow> for Attendee {
    type Error = MissionBoardError;

    fn try_from(row: AttendeeRow) -> Result<Self> {
        Ok(Self {
            registration: Registration::try_from(row.registration)?,
            member_name: row.member_name,
            member_email: row.member_email,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct PlanRow {
    id: Uuid,
    organization_id: Uuid,
    name: String,
    description: Option<String>,
    price_cents: i64,
    currency: String,
    billing_interval: String,
    features: Vec<String>,
    active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<PlanRow> for MembershipPlan {
    type Error = MissionBoardError;

    fn try_from(row: PlanRow) -> Result<Self> {
        Ok(Self {
            id: PlanId::from_uuid(row.id),
            organization_id: OrganizationId::from_uuid(row.organization_id),
            name: row.name,
            description: row.description,
            price: Money::from_cents(non_negative(row.price_cents, "price_cents")?),
            currency: row.currency.trim_end().to_string(),
            interval: decode(&row.billing_interval)?,
            features: row.features,
            active: row.active,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct SubscriptionRow {
    id: Uuid,
    organization_id: Uuid,
    member_id: Uuid,
    plan_id: Uuid,
    status: String,
    start_date: DateTime<Utc>,
    current_period_start: DateTime<Utc>,
    current_period_end: DateTime<Utc>,
    canceled_at: Option<DateTime<Utc>>,
    trial_ends_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = MissionBoardError;

    fn try_from(row: SubscriptionRow) -> Result<Self> {
        Ok(Self {
            id: SubscriptionId::from_uuid(row.id),
            organization_id: OrganizationId::from_uuid(row.organization_id),
            member_id: MemberId::from_uuid(row.member_id),
            plan_id: PlanId::from_uuid(row.plan_id),
            status: decode(&row.status)?,
            start_date: row.start_date,
            current_period_start: row.current_period_start,
            current_period_end: row.current_period_end,
            canceled_at: row.canceled_at,
            trial_ends_at: row.trial_ends_at,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct PaymentRow {
    id: Uuid,
    organization_id: Uuid,
    member_id: Option<Uuid>,
    subscription_id: Option<Uuid>,
    amount_cents: i64,
    currency: String,
    status: String,
    method: String,
    description: Option<String>,
    paid_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = MissionBoardError;

    fn try_from(row: PaymentRow) -> Result<Self> {
        Ok(Self {
            id: PaymentId::from_uuid(row.id),
            organization_id: OrganizationId::from_uuid(row.organization_id),
            member_id: row.member_id.map(MemberId::from_uuid),
            subscription_id: row.subscription_id.map(SubscriptionId::from_uuid),
            amount: Money::from_cents(non_negative(row.amount_cents, "amount_cents")?),
            currency: row.currency.trim_end().to_string(),
            status: decode(&row.status)?,
            method: decode(&row.method)?,
            description: row.description,
            paid_at: row.paid_at,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct SessionRow {
    token: Uuid,
    member_id: Uuid,
    expires_at: DateTime<Utc>,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Self {
            token: row.token,
            member_id: MemberId::from_uuid(row.member_id),
            expires_at: row.expires_at,
        }
    }
}

/// Convert a batch of rows, failing on the first invalid one.
pub(super) fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = MissionBoardError>,
{
    rows.into_iter().map(T::try_from).collect()
}
