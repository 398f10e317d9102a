//! Router configuration.

use super::health::readiness_check;
use super::state::AppState;
use crate::api::{
    events, members, organization, payments, plans, public, registrations, subscriptions,
};
use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use missionboard_web::{correlation_id, handlers::health_check};
use tower_http::trace::TraceLayer;

/// Build the complete Axum router.
///
/// - `/health`, `/ready`: probes (no authentication)
/// - `/api/public/...`: public event pages (no authentication)
/// - `/api/...`: dashboard endpoints (bearer session token)
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Organization settings
        .route(
            "/organization",
            get(organization::get_organization).put(organization::update_organization),
        )
        // Members
        .route(
            "/members",
            get(members::list_members).post(members::create_member),
        )
        .route(
            "/members/:id",
            get(members::get_member)
                .put(members::update_member)
                .delete(members::delete_member),
        )
        // Events
        .route("/events", get(events::list_events).post(events::create_event))
        .route(
            "/events/:id",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::delete_event),
        )
        .route("/events/:id/cancel", post(events::cancel_event))
        .route("/events/:id/complete", post(events::complete_event))
        .route("/events/:id/archive", post(events::archive_event))
        // Registrations
        .route(
            "/events/:id/register",
            get(registrations::get_own_registration)
                .post(registrations::register)
                .delete(registrations::cancel_own_registration),
        )
        .route(
            "/events/:id/registrations",
            get(registrations::list_attendees),
        )
        .route(
            "/events/:id/registrations/:rid",
            delete(registrations::admin_cancel_registration),
        )
        .route(
            "/events/:id/registrations/:rid/attend",
            post(registrations::mark_attended),
        )
        // Plans
        .route("/plans", get(plans::list_plans).post(plans::create_plan))
        .route(
            "/plans/:id",
            get(plans::get_plan)
                .put(plans::update_plan)
                .delete(plans::delete_plan),
        )
        // Subscriptions
        .route(
            "/subscriptions",
            get(subscriptions::list_subscriptions).post(subscriptions::create_subscription),
        )
        .route("/subscriptions/:id", get(subscriptions::get_subscription))
        .route(
            "/subscriptions/:id/cancel",
            post(subscriptions::cancel_subscription),
        )
        .route(
            "/subscriptions/:id/renew",
            post(subscriptions::renew_subscription),
        )
        // Payments
        .route(
            "/payments",
            get(payments::list_payments).post(payments::create_payment),
        )
        .route("/payments/:id", get(payments::get_payment))
        .route("/payments/:id/status", put(payments::update_payment_status))
        // Public pages
        .route("/public/events", get(public::list_public_events))
        .route("/public/events/:id", get(public::get_public_event))
        .route("/public/events/:id/register", post(public::register_public));

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(correlation_id))
        .with_state(state)
}
