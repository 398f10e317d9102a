//! Membership plan endpoints.
//!
//! Any member may read plans; only administrators change them.

use crate::app::PlanInput;
use crate::auth::{RequireAdmin, SessionUser};
use crate::server::state::AppState;
use crate::types::{BillingInterval, MembershipPlan, Money, PlanId};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use missionboard_web::{AppJson, WebResult};
use serde::Deserialize;

/// Plan fields submitted by the dashboard.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRequest {
    /// Plan name
    pub name: String,
    /// Longer description
    pub description: Option<String>,
    /// Price per period in cents
    pub price_cents: u64,
    /// ISO 4217 code (defaults to the organization's currency)
    pub currency: Option<String>,
    /// Billing interval
    pub interval: BillingInterval,
    /// Listed features
    #[serde(default)]
    pub features: Vec<String>,
    /// Accepts new subscriptions
    #[serde(default = "default_active")]
    pub active: bool,
}

const fn default_active() -> bool {
    true
}

impl From<PlanRequest> for PlanInput {
    fn from(request: PlanRequest) -> Self {
        Self {
            name: request.name,
            description: request.description,
            price: Money::from_cents(request.price_cents),
            currency: request.currency,
            interval: request.interval,
            features: request.features,
            active: request.active,
        }
    }
}

/// Query parameters for listing plans.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPlansQuery {
    /// Hide inactive plans
    #[serde(default)]
    pub active_only: bool,
}

/// List plans, cheapest first.
pub async fn list_plans(
    user: SessionUser,
    State(state): State<AppState>,
    Query(query): Query<ListPlansQuery>,
) -> WebResult<Json<Vec<MembershipPlan>>> {
    let plans = state
        .plans()
        .list(user.organization_id(), query.active_only)
        .await?;
    Ok(Json(plans))
}

/// Get a plan.
pub async fn get_plan(
    user: SessionUser,
    State(state): State<AppState>,
    Path(plan_id): Path<PlanId>,
) -> WebResult<Json<MembershipPlan>> {
    let plan = state.plans().get(user.organization_id(), plan_id).await?;
    Ok(Json(plan))
}

/// Create a plan.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/plans \
///   -H "Authorization: Bearer <session_token>" \
///   -H "Content-Type: application/json" \
///   -d '{ "name": "Standard", "priceCents": 1500, "interval": "MONTHLY" }'
/// ```
pub async fn create_plan(
    admin: RequireAdmin,
    State(state): State<AppState>,
    AppJson(request): AppJson<PlanRequest>,
) -> WebResult<(StatusCode, Json<MembershipPlan>)> {
    let plan = state
        .plans()
        .create(admin.organization_id(), request.into())
        .await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

/// Replace a plan's fields.
pub async fn update_plan(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(plan_id): Path<PlanId>,
    AppJson(request): AppJson<PlanRequest>,
) -> WebResult<Json<MembershipPlan>> {
    let plan = state
        .plans()
        .update(admin.organization_id(), plan_id, request.into())
        .await?;
    Ok(Json(plan))
}

/// Delete a plan no subscription references.
pub async fn delete_plan(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(plan_id): Path<PlanId>,
) -> WebResult<StatusCode> {
    state
        .plans()
        .delete(admin.organization_id(), plan_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
