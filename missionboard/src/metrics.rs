//! Business metrics for MissionBoard.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `missionboard_registrations_total{outcome}` - Registrations by outcome
//!   (confirmed, waitlisted, reregistered, cancelled)
//! - `missionboard_waitlist_promotions_total` - Waitlisted registrations promoted
//! - `missionboard_subscriptions_total{status}` - Subscriptions created, renewed, cancelled
//! - `missionboard_payments_total{status}` - Payments recorded by status
//! - `missionboard_members_created_total{source}` - Members created (dashboard, public)

use crate::types::{PaymentStatus, RegistrationStatus};
use metrics::describe_counter;

/// Initialize and register all business metrics descriptions.
///
/// This should be called once at application startup, before any metrics are recorded.
pub fn register_business_metrics() {
    describe_counter!(
        "missionboard_registrations_total",
        "Total number of event registrations by outcome"
    );
    describe_counter!(
        "missionboard_waitlist_promotions_total",
        "Total number of waitlisted registrations promoted to confirmed"
    );
    describe_counter!(
        "missionboard_subscriptions_total",
        "Total number of subscription changes by status (created, renewed, cancelled)"
    );
    describe_counter!(
        "missionboard_payments_total",
        "Total number of recorded payments by status"
    );
    describe_counter!(
        "missionboard_members_created_total",
        "Total number of members created, by source"
    );

    tracing::info!("Business metrics registered");
}

// ============================================================================
// Metric Recording Functions
// ============================================================================

/// Record a registration decision.
pub fn record_registration(status: RegistrationStatus, reused: bool) {
    let outcome = match (status, reused) {
        (_, true) => "reregistered",
        (RegistrationStatus::Waitlisted, false) => "waitlisted",
        _ => "confirmed",
    };
    metrics::counter!("missionboard_registrations_total", "outcome" => outcome).increment(1);
}

/// Record a cancelled registration.
pub fn record_registration_cancelled() {
    metrics::counter!("missionboard_registrations_total", "outcome" => "cancelled").increment(1);
}

/// Record a waitlist promotion.
pub fn record_waitlist_promotion() {
    metrics::counter!("missionboard_waitlist_promotions_total").increment(1);
}

/// Record a subscription change (`created`, `renewed` or `cancelled`).
pub fn record_subscription(change: &'static str) {
    metrics::counter!("missionboard_subscriptions_total", "status" => change).increment(1);
}

/// Record a payment.
pub fn record_payment(status: PaymentStatus) {
    metrics::counter!("missionboard_payments_total", "status" => status.as_str()).increment(1);
}

/// Record a member creation (`dashboard` or `public`).
pub fn record_member_created(source: &'static str) {
    metrics::counter!("missionboard_members_created_total", "source" => source).increment(1);
}
