//! Domain types for MissionBoard.
//!
//! Value objects, entities and status enums shared by the reducers, the
//! repositories and the HTTP API. Entities serialize in camelCase; status
//! enums serialize (and are stored) as upper-snake-case text.

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[doc = concat!("Creates a new random `", stringify!($name), "`")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Create a `", stringify!($name), "` from a `Uuid`")]
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// Unique identifier for an organization
    OrganizationId
);
entity_id!(
    /// Unique identifier for a member (user)
    MemberId
);
entity_id!(
    /// Unique identifier for an event
    EventId
);
entity_id!(
    /// Unique identifier for an event registration
    RegistrationId
);
entity_id!(
    /// Unique identifier for a membership plan
    PlanId
);
entity_id!(
    /// Unique identifier for a subscription
    SubscriptionId
);
entity_id!(
    /// Unique identifier for a payment
    PaymentId
);

// ============================================================================
// Money and Capacity
// ============================================================================

/// Amount of money in minor units (cents)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Maximum number of seats an event offers
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capacity(pub u32);

impl Capacity {
    /// Creates a new `Capacity`
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Returns the capacity value
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Status enums
// ============================================================================

/// Error returned when a stored or submitted enum value is not recognised
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("Unknown {kind} value: {value}")]
pub struct ParseEnumError {
    /// Enum being parsed
    pub kind: &'static str,
    /// Rejected input
    pub value: String,
}

macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Upper-snake-case text used in JSON and in the database
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => $text ),+
                }
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $text => Ok(Self::$variant), )+
                    other => Err(ParseEnumError {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum!(
    /// Event lifecycle status
    EventStatus, "event status" {
        /// Open for registration
        Scheduled => "SCHEDULED",
        /// Took place
        Completed => "COMPLETED",
        /// Hidden from listings
        Archived => "ARCHIVED",
        /// Called off
        Canceled => "CANCELED",
    }
);

text_enum!(
    /// Status of an event registration
    RegistrationStatus, "registration status" {
        /// Holds a seat
        Confirmed => "CONFIRMED",
        /// Checked in at the event (still holds a seat)
        Attended => "ATTENDED",
        /// Waiting for a seat to free up
        Waitlisted => "WAITLISTED",
        /// Cancelled by the registrant
        CanceledByUser => "CANCELED_BY_USER",
        /// Cancelled by an administrator
        CanceledByAdmin => "CANCELED_BY_ADMIN",
    }
);

impl RegistrationStatus {
    /// Whether this registration counts against the event's capacity
    #[must_use]
    pub const fn holds_seat(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Attended)
    }

    /// Whether this registration has been cancelled
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::CanceledByUser | Self::CanceledByAdmin)
    }
}

text_enum!(
    /// Membership status of a member
    MemberStatus, "member status" {
        /// Active member
        Active => "ACTIVE",
        /// Lapsed member
        Inactive => "INACTIVE",
        /// Signed up but not yet approved
        Pending => "PENDING",
        /// Blocked by an administrator
        Suspended => "SUSPENDED",
    }
);

text_enum!(
    /// Role of a member within their organization
    MemberRole, "member role" {
        /// Organization owner
        Owner => "OWNER",
        /// Administrator
        Admin => "ADMIN",
        /// Regular member
        Member => "MEMBER",
    }
);

impl MemberRole {
    /// Whether this role may use the administrative dashboard
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Owner | Self::Admin)
    }
}

text_enum!(
    /// Subscription status
    SubscriptionStatus, "subscription status" {
        /// Paid and current
        Active => "ACTIVE",
        /// In a free trial
        Trialing => "TRIALING",
        /// Renewal payment outstanding
        PastDue => "PAST_DUE",
        /// Cancelled
        Canceled => "CANCELED",
    }
);

impl SubscriptionStatus {
    /// Whether the subscription currently grants membership
    #[must_use]
    pub const fn is_current(&self) -> bool {
        matches!(self, Self::Active | Self::Trialing)
    }
}

text_enum!(
    /// Billing interval of a membership plan
    BillingInterval, "billing interval" {
        /// Billed every calendar month
        Monthly => "MONTHLY",
        /// Billed every calendar year
        Yearly => "YEARLY",
    }
);

impl BillingInterval {
    /// Number of calendar months in one billing period
    #[must_use]
    pub const fn months(&self) -> u32 {
        match self {
            Self::Monthly => 1,
            Self::Yearly => 12,
        }
    }

    /// End of the billing period starting at `start`.
    ///
    /// Calendar arithmetic: a day that does not exist in the target month
    /// clamps to that month's last day (2024-01-31 + 1 month = 2024-02-29).
    /// Returns `None` when the result is out of range.
    #[must_use]
    pub fn period_end(&self, start: DateTime<Utc>) -> Option<DateTime<Utc>> {
        start.checked_add_months(Months::new(self.months()))
    }
}

text_enum!(
    /// Payment status
    PaymentStatus, "payment status" {
        /// Awaiting settlement
        Pending => "PENDING",
        /// Settled
        Completed => "COMPLETED",
        /// Declined or errored
        Failed => "FAILED",
    }
);

text_enum!(
    /// How a payment was made
    PaymentMethod, "payment method" {
        /// Card payment
        Card => "CARD",
        /// Bank transfer
        BankTransfer => "BANK_TRANSFER",
        /// Cash
        Cash => "CASH",
        /// Anything else
        Other => "OTHER",
    }
);

// ============================================================================
// Entities
// ============================================================================

/// Organization owning members, events, plans and payments
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    /// Unique organization identifier
    pub id: OrganizationId,
    /// Display name
    pub name: String,
    /// Public contact address
    pub contact_email: Option<String>,
    /// IANA timezone name used by the dashboard
    pub timezone: String,
    /// Default ISO 4217 currency for plans and payments
    pub default_currency: String,
    /// When the organization was created
    pub created_at: DateTime<Utc>,
}

/// Member (user) of an organization
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// Unique member identifier
    pub id: MemberId,
    /// Organization the member belongs to
    pub organization_id: OrganizationId,
    /// Full name
    pub name: String,
    /// Email address (unique, stored lowercase)
    pub email: String,
    /// Phone number
    pub phone: Option<String>,
    /// Membership status
    pub status: MemberStatus,
    /// Role within the organization
    pub role: MemberRole,
    /// When the member joined
    pub joined_at: DateTime<Utc>,
    /// Free-form administrator notes
    pub notes: Option<String>,
}

/// Where an event takes place
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// Venue name
    pub venue: Option<String>,
    /// Street address
    pub address: Option<String>,
    /// City
    pub city: Option<String>,
}

/// Event organized by an organization
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Unique event identifier
    pub id: EventId,
    /// Owning organization
    pub organization_id: OrganizationId,
    /// Member who organizes the event
    pub organizer_id: Option<MemberId>,
    /// Event name
    pub name: String,
    /// Longer description
    pub description: Option<String>,
    /// Start date and time
    pub date: DateTime<Utc>,
    /// Optional end date and time
    pub end_date: Option<DateTime<Utc>>,
    /// Location fields
    #[serde(flatten)]
    pub location: Location,
    /// Seat limit (`None` = unlimited)
    pub capacity: Option<Capacity>,
    /// Hidden from the public pages
    pub is_private: bool,
    /// Registrations are rejected after this instant
    pub registration_deadline: Option<DateTime<Utc>>,
    /// Lifecycle status
    pub status: EventStatus,
    /// When the event was created
    pub created_at: DateTime<Utc>,
    /// When the event was last changed
    pub updated_at: DateTime<Utc>,
}

/// A member's registration for an event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    /// Unique registration identifier
    pub id: RegistrationId,
    /// Event registered for
    pub event_id: EventId,
    /// Registrant
    pub member_id: MemberId,
    /// Current status
    pub status: RegistrationStatus,
    /// Additional guests brought by the registrant
    pub guests_count: u32,
    /// Notes left by the registrant
    pub notes: Option<String>,
    /// When the registrant (last) registered; orders the waitlist
    pub registered_at: DateTime<Utc>,
    /// When the row last changed
    pub updated_at: DateTime<Utc>,
}

impl Registration {
    /// Seats this registration occupies: the registrant plus their guests
    #[must_use]
    pub fn seats(&self) -> u64 {
        1 + u64::from(self.guests_count)
    }
}

/// Registration joined with the registrant's contact details
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    /// The registration
    #[serde(flatten)]
    pub registration: Registration,
    /// Registrant name
    pub member_name: String,
    /// Registrant email
    pub member_email: String,
}

/// Seat and waitlist figures for one event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSummary {
    /// Seats held by CONFIRMED and ATTENDED registrations
    pub seats_taken: u64,
    /// Number of WAITLISTED registrations
    pub waitlisted: u64,
    /// Seats still available (`None` = unlimited)
    pub remaining_seats: Option<u64>,
    /// `seats_taken / capacity` as a whole percentage, rounded down
    pub capacity_percentage: Option<u64>,
}

impl AttendanceSummary {
    /// Builds a summary from pre-aggregated counts
    #[must_use]
    pub fn from_counts(capacity: Option<Capacity>, seats_taken: u64, waitlisted: u64) -> Self {
        let capacity = capacity.map(|c| u64::from(c.value()));
        Self {
            seats_taken,
            waitlisted,
            remaining_seats: capacity.map(|c| c.saturating_sub(seats_taken)),
            capacity_percentage: capacity
                .filter(|c| *c > 0)
                .map(|c| seats_taken.saturating_mul(100) / c),
        }
    }

    /// Builds a summary by counting an event's registrations
    #[must_use]
    pub fn compute<'a>(
        capacity: Option<Capacity>,
        registrations: impl IntoIterator<Item = &'a Registration>,
    ) -> Self {
        let (seats_taken, waitlisted) =
            registrations
                .into_iter()
                .fold((0, 0), |(seats, waiting), registration| {
                    match registration.status {
                        status if status.holds_seat() => (seats + registration.seats(), waiting),
                        RegistrationStatus::Waitlisted => (seats, waiting + 1),
                        _ => (seats, waiting),
                    }
                });
        Self::from_counts(capacity, seats_taken, waitlisted)
    }
}

/// Event together with its attendance summary
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventOverview {
    /// The event
    #[serde(flatten)]
    pub event: Event,
    /// Seat and waitlist figures
    pub attendance: AttendanceSummary,
}

/// Membership plan members can subscribe to
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipPlan {
    /// Unique plan identifier
    pub id: PlanId,
    /// Owning organization
    pub organization_id: OrganizationId,
    /// Plan name
    pub name: String,
    /// Longer description
    pub description: Option<String>,
    /// Price per billing period, in cents
    #[serde(rename = "priceCents")]
    pub price: Money,
    /// ISO 4217 currency code
    pub currency: String,
    /// Billing interval
    pub interval: BillingInterval,
    /// Features listed on the plan
    pub features: Vec<String>,
    /// Whether new subscriptions are accepted
    pub active: bool,
    /// When the plan was created
    pub created_at: DateTime<Utc>,
}

/// A member's subscription to a plan
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    /// Unique subscription identifier
    pub id: SubscriptionId,
    /// Owning organization
    pub organization_id: OrganizationId,
    /// Subscriber
    pub member_id: MemberId,
    /// Plan subscribed to
    pub plan_id: PlanId,
    /// Current status
    pub status: SubscriptionStatus,
    /// When the subscription started
    pub start_date: DateTime<Utc>,
    /// Start of the current billing period
    pub current_period_start: DateTime<Utc>,
    /// End of the current billing period
    pub current_period_end: DateTime<Utc>,
    /// When the subscription was cancelled
    pub canceled_at: Option<DateTime<Utc>>,
    /// End of the free trial, if any
    pub trial_ends_at: Option<DateTime<Utc>>,
    /// When the row was created
    pub created_at: DateTime<Utc>,
}

/// Recorded payment
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    /// Unique payment identifier
    pub id: PaymentId,
    /// Owning organization
    pub organization_id: OrganizationId,
    /// Paying member
    pub member_id: Option<MemberId>,
    /// Subscription paid for
    pub subscription_id: Option<SubscriptionId>,
    /// Amount in cents
    #[serde(rename = "amountCents")]
    pub amount: Money,
    /// ISO 4217 currency code
    pub currency: String,
    /// Settlement status
    pub status: PaymentStatus,
    /// Payment method
    pub method: PaymentMethod,
    /// Free-form description
    pub description: Option<String>,
    /// When the payment completed
    pub paid_at: Option<DateTime<Utc>>,
    /// When the payment was recorded
    pub created_at: DateTime<Utc>,
}

/// Session issued by the external authentication layer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Session {
    /// Bearer token
    pub token: Uuid,
    /// Authenticated member
    pub member_id: MemberId,
    /// Expiry instant
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Whether the session has expired at `now`
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn registration(status: RegistrationStatus, guests_count: u32) -> Registration {
        let now = Utc::now();
        Registration {
            id: RegistrationId::new(),
            event_id: EventId::new(),
            member_id: MemberId::new(),
            status,
            guests_count,
            notes: None,
            registered_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_monthly_period_end_clamps_to_month_end() {
        let start = Utc.with_ymd_and_hms(2024, 1, 31, 9, 0, 0).unwrap();
        let end = BillingInterval::Monthly.period_end(start).unwrap();
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 2, 29, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_yearly_period_end() {
        let start = Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap();
        let end = BillingInterval::Yearly.period_end(start).unwrap();
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 2, 28, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_unknown_billing_interval_is_rejected() {
        let err = "WEEKLY".parse::<BillingInterval>().unwrap_err();
        assert_eq!(err.kind, "billing interval");
        assert!(serde_json::from_str::<BillingInterval>("\"WEEKLY\"").is_err());
        assert_eq!(
            serde_json::from_str::<BillingInterval>("\"YEARLY\"").unwrap(),
            BillingInterval::Yearly
        );
    }

    #[test]
    fn test_status_text_round_trips_through_database_form() {
        for status in [
            RegistrationStatus::Confirmed,
            RegistrationStatus::CanceledByAdmin,
        ] {
            assert_eq!(status.as_str().parse::<RegistrationStatus>().unwrap(), status);
        }
        assert_eq!(
            serde_json::to_string(&RegistrationStatus::CanceledByUser).unwrap(),
            "\"CANCELED_BY_USER\""
        );
    }

    #[test]
    fn test_attendance_summary_counts_guests_as_seats() {
        let registrations = [
            registration(RegistrationStatus::Confirmed, 2),
            registration(RegistrationStatus::Attended, 0),
            registration(RegistrationStatus::Waitlisted, 1),
            registration(RegistrationStatus::CanceledByUser, 4),
        ];

        let summary = AttendanceSummary::compute(Some(Capacity::new(8)), &registrations);

        assert_eq!(summary.seats_taken, 4);
        assert_eq!(summary.waitlisted, 1);
        assert_eq!(summary.remaining_seats, Some(4));
        assert_eq!(summary.capacity_percentage, Some(50));
    }

    #[test]
    fn test_attendance_summary_unlimited_event() {
        let summary = AttendanceSummary::from_counts(None, 12, 0);
        assert_eq!(summary.remaining_seats, None);
        assert_eq!(summary.capacity_percentage, None);
    }

    #[test]
    fn test_capacity_percentage_rounds_down() {
        let summary = AttendanceSummary::from_counts(Some(Capacity::new(3)), 2, 0);
        assert_eq!(summary.capacity_percentage, Some(66));
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_cents(1250).to_string(), "12.50");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
    }
}
