//! Subscription endpoints (admin only).

use crate::auth::RequireAdmin;
use crate::server::state::AppState;
use crate::store::SubscriptionFilter;
use crate::types::{MemberId, PlanId, Subscription, SubscriptionId, SubscriptionStatus};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use missionboard_web::{AppJson, WebResult};
use serde::Deserialize;

/// Subscribe a member to a plan.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    /// Subscriber
    pub member_id: MemberId,
    /// Plan
    pub plan_id: PlanId,
    /// Start of the first period (defaults to now)
    pub start_date: Option<DateTime<Utc>>,
    /// End of a free trial
    pub trial_ends_at: Option<DateTime<Utc>>,
}

/// Query parameters for listing subscriptions.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSubscriptionsQuery {
    /// Only this member's subscriptions
    pub member_id: Option<MemberId>,
    /// Filter by status
    pub status: Option<SubscriptionStatus>,
}

/// List subscriptions, newest first.
pub async fn list_subscriptions(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<ListSubscriptionsQuery>,
) -> WebResult<Json<Vec<Subscription>>> {
    let filter = SubscriptionFilter {
        member_id: query.member_id,
        status: query.status,
    };
    let subscriptions = state
        .subscriptions()
        .list(admin.organization_id(), filter)
        .await?;
    Ok(Json(subscriptions))
}

/// Get a subscription.
pub async fn get_subscription(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(subscription_id): Path<SubscriptionId>,
) -> WebResult<Json<Subscription>> {
    let subscription = state
        .subscriptions()
        .get(admin.organization_id(), subscription_id)
        .await?;
    Ok(Json(subscription))
}

/// Subscribe a member to a plan.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/subscriptions \
///   -H "Authorization: Bearer <session_token>" \
///   -H "Content-Type: application/json" \
///   -d '{ "memberId": "<member_id>", "planId": "<plan_id>" }'
/// ```
pub async fn create_subscription(
    admin: RequireAdmin,
    State(state): State<AppState>,
    AppJson(request): AppJson<SubscribeRequest>,
) -> WebResult<(StatusCode, Json<Subscription>)> {
    let subscription = state
        .subscriptions()
        .subscribe(
            admin.organization_id(),
            request.member_id,
            request.plan_id,
            request.start_date,
            request.trial_ends_at,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(subscription)))
}

/// Cancel a subscription.
pub async fn cancel_subscription(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(subscription_id): Path<SubscriptionId>,
) -> WebResult<Json<Subscription>> {
    let subscription = state
        .subscriptions()
        .cancel(admin.organization_id(), subscription_id)
        .await?;
    Ok(Json(subscription))
}

/// Start the next billing period.
pub async fn renew_subscription(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(subscription_id): Path<SubscriptionId>,
) -> WebResult<Json<Subscription>> {
    let subscription = state
        .subscriptions()
        .renew(admin.organization_id(), subscription_id)
        .await?;
    Ok(Json(subscription))
}
