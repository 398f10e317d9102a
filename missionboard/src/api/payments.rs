//! Payment endpoints (admin only).

use crate::app::PaymentInput;
use crate::auth::RequireAdmin;
use crate::server::state::AppState;
use crate::types::{
    MemberId, Money, Payment, PaymentId, PaymentMethod, PaymentStatus, SubscriptionId,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use missionboard_web::{AppJson, WebResult};
use serde::Deserialize;

/// Record a payment.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    /// Paying member (taken from the subscription when omitted)
    pub member_id: Option<MemberId>,
    /// Subscription paid for
    pub subscription_id: Option<SubscriptionId>,
    /// Amount in cents
    pub amount_cents: u64,
    /// ISO 4217 code (defaults to the organization's currency)
    pub currency: Option<String>,
    /// Settlement status (defaults to PENDING)
    pub status: Option<PaymentStatus>,
    /// Payment method (defaults to OTHER)
    pub method: Option<PaymentMethod>,
    /// Free-form description
    pub description: Option<String>,
}

impl From<PaymentRequest> for PaymentInput {
    fn from(request: PaymentRequest) -> Self {
        Self {
            member_id: request.member_id,
            subscription_id: request.subscription_id,
            amount: Money::from_cents(request.amount_cents),
            currency: request.currency,
            status: request.status.unwrap_or(PaymentStatus::Pending),
            method: request.method.unwrap_or(PaymentMethod::Other),
            description: request.description,
        }
    }
}

/// New status for a payment.
#[derive(Debug, Deserialize)]
pub struct PaymentStatusRequest {
    /// Target status
    pub status: PaymentStatus,
}

/// Query parameters for listing payments.
#[derive(Debug, Default, Deserialize)]
pub struct ListPaymentsQuery {
    /// Filter by status
    pub status: Option<PaymentStatus>,
}

/// List payments, newest first.
pub async fn list_payments(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<ListPaymentsQuery>,
) -> WebResult<Json<Vec<Payment>>> {
    let payments = state
        .payments()
        .list(admin.organization_id(), query.status)
        .await?;
    Ok(Json(payments))
}

/// Get a payment.
pub async fn get_payment(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(payment_id): Path<PaymentId>,
) -> WebResult<Json<Payment>> {
    let payment = state
        .payments()
        .get(admin.organization_id(), payment_id)
        .await?;
    Ok(Json(payment))
}

/// Record a payment.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/payments \
///   -H "Authorization: Bearer <session_token>" \
///   -H "Content-Type: application/json" \
///   -d '{ "subscriptionId": "<id>", "amountCents": 1500, "status": "COMPLETED", "method": "CARD" }'
/// ```
pub async fn create_payment(
    admin: RequireAdmin,
    State(state): State<AppState>,
    AppJson(request): AppJson<PaymentRequest>,
) -> WebResult<(StatusCode, Json<Payment>)> {
    let payment = state
        .payments()
        .record(admin.organization_id(), request.into())
        .await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

/// Change a payment's status.
pub async fn update_payment_status(
    admin: RequireAdmin,
    State(state): State<AppState>,
    Path(payment_id): Path<PaymentId>,
    AppJson(request): AppJson<PaymentStatusRequest>,
) -> WebResult<Json<Payment>> {
    let payment = state
        .payments()
        .update_status(admin.organization_id(), payment_id, request.status)
        .await?;
    Ok(Json(payment))
}
