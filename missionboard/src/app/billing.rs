//! Membership plans, subscriptions and payments.

use super::scoped;
use super::validation::{normalize_currency, optional_text, required_text};
use crate::aggregates::{
    SubscriptionAction, SubscriptionEnvironment, SubscriptionReducer, SubscriptionState,
};
use crate::error::{MissionBoardError, Result};
use crate::metrics;
use crate::store::{MissionBoardStore, SubscriptionFilter};
use crate::types::{
    BillingInterval, MemberId, MembershipPlan, Money, OrganizationId, Payment, PaymentId,
    PaymentMethod, PaymentStatus, PlanId, Subscription, SubscriptionId,
};
use chrono::{DateTime, Utc};
use missionboard_core::effect::commits;
use missionboard_core::environment::Clock;
use missionboard_core::reducer::Reducer;
use std::sync::Arc;

const MAX_PLAN_NAME_LENGTH: usize = 200;

// ============================================================================
// Plans
// ============================================================================

/// Plan fields editable from the dashboard
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlanInput {
    /// Plan name
    pub name: String,
    /// Longer description
    pub description: Option<String>,
    /// Price per period
    pub price: Money,
    /// ISO 4217 currency (defaults to the organization's)
    pub currency: Option<String>,
    /// Billing interval
    pub interval: BillingInterval,
    /// Listed features
    pub features: Vec<String>,
    /// Accepts new subscriptions
    pub active: bool,
}

/// Membership plan service
#[derive(Clone)]
pub struct PlanService {
    store: Arc<dyn MissionBoardStore>,
    clock: Arc<dyn Clock>,
}

impl PlanService {
    /// Create a new plan service
    #[must_use]
    pub fn new(store: Arc<dyn MissionBoardStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Plans of the organization, cheapest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn list(
        &self,
        organization_id: OrganizationId,
        active_only: bool,
    ) -> Result<Vec<MembershipPlan>> {
        self.store.list_plans(organization_id, active_only).await
    }

    /// A plan of the organization.
    ///
    /// # Errors
    ///
    /// Returns [`MissionBoardError::NotFound`] for unknown plans.
    pub async fn get(
        &self,
        organization_id: OrganizationId,
        plan_id: PlanId,
    ) -> Result<MembershipPlan> {
        let plan = self.store.get_plan(plan_id).await?;
        scoped(plan, organization_id, |p| p.organization_id, "Membership plan", plan_id)
    }

    /// Create a plan.
    ///
    /// # Errors
    ///
    /// Returns [`MissionBoardError::Validation`] for a blank name or a
    /// malformed currency.
    pub async fn create(
        &self,
        organization_id: OrganizationId,
        input: PlanInput,
    ) -> Result<MembershipPlan> {
        let currency = self.currency_or_default(organization_id, input.currency.as_deref()).await?;
        let plan = MembershipPlan {
            id: PlanId::new(),
            organization_id,
            name: required_text("Name", &input.name, MAX_PLAN_NAME_LENGTH)?,
            description: optional_text(input.description),
            price: input.price,
            currency,
            interval: input.interval,
            features: clean_features(input.features),
            active: input.active,
            created_at: self.clock.now(),
        };

        let plan = self.store.save_plan(plan).await?;
        tracing::info!(
            plan_id = %plan.id,
            price = %plan.price,
            interval = %plan.interval,
            "Plan created"
        );
        Ok(plan)
    }

    /// Replace a plan's editable fields, including its active flag.
    ///
    /// # Errors
    ///
    /// Returns [`MissionBoardError::NotFound`] or
    /// [`MissionBoardError::Validation`].
    pub async fn update(
        &self,
        organization_id: OrganizationId,
        plan_id: PlanId,
        input: PlanInput,
    ) -> Result<MembershipPlan> {
        let existing = self.get(organization_id, plan_id).await?;
        let currency = match input.currency.as_deref() {
            Some(currency) => normalize_currency(currency)?,
            None => existing.currency.clone(),
        };
        let plan = MembershipPlan {
            name: required_text("Name", &input.name, MAX_PLAN_NAME_LENGTH)?,
            description: optional_text(input.description),
            price: input.price,
            currency,
            interval: input.interval,
            features: clean_features(input.features),
            active: input.active,
            ..existing
        };

        let plan = self.store.save_plan(plan).await?;
        tracing::info!(plan_id = %plan_id, active = plan.active, "Plan updated");
        Ok(plan)
    }

    /// Delete a plan.
    ///
    /// # Errors
    ///
    /// - [`MissionBoardError::NotFound`]: unknown plan
    /// - [`MissionBoardError::Conflict`]: subscriptions reference the plan
    pub async fn delete(&self, organization_id: OrganizationId, plan_id: PlanId) -> Result<()> {
        self.get(organization_id, plan_id).await?;
        if !self.store.delete_plan(plan_id).await? {
            return Err(MissionBoardError::not_found("Membership plan", plan_id));
        }
        tracing::info!(plan_id = %plan_id, "Plan deleted");
        Ok(())
    }

    async fn currency_or_default(
        &self,
        organization_id: OrganizationId,
        currency: Option<&str>,
    ) -> Result<String> {
        match currency {
            Some(currency) => normalize_currency(currency),
            None => Ok(self
                .store
                .get_organization(organization_id)
                .await?
                .ok_or_else(|| MissionBoardError::not_found("Organization", organization_id))?
                .default_currency),
        }
    }
}

fn clean_features(features: Vec<String>) -> Vec<String> {
    features
        .into_iter()
        .filter_map(|f| optional_text(Some(f)))
        .collect()
}

// ============================================================================
// Subscriptions
// ============================================================================

/// Subscription service
#[derive(Clone)]
pub struct SubscriptionService {
    store: Arc<dyn MissionBoardStore>,
    reducer: SubscriptionReducer,
    env: SubscriptionEnvironment,
}

impl SubscriptionService {
    /// Create a new subscription service
    #[must_use]
    pub fn new(store: Arc<dyn MissionBoardStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            reducer: SubscriptionReducer::new(),
            env: SubscriptionEnvironment::new(clock),
        }
    }

    /// Subscriptions of the organization, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn list(
        &self,
        organization_id: OrganizationId,
        filter: SubscriptionFilter,
    ) -> Result<Vec<Subscription>> {
        self.store.list_subscriptions(organization_id, filter).await
    }

    /// A subscription of the organization.
    ///
    /// # Errors
    ///
    /// Returns [`MissionBoardError::NotFound`] for unknown subscriptions.
    pub async fn get(
        &self,
        organization_id: OrganizationId,
        subscription_id: SubscriptionId,
    ) -> Result<Subscription> {
        let subscription = self.store.get_subscription(subscription_id).await?;
        scoped(
            subscription,
            organization_id,
            |s| s.organization_id,
            "Subscription",
            subscription_id,
        )
    }

    /// Subscribe a member to a plan.
    ///
    /// # Errors
    ///
    /// - [`MissionBoardError::NotFound`]: unknown member or plan
    /// - [`MissionBoardError::Conflict`]: inactive plan, or the member already
    ///   holds an ACTIVE or TRIALING subscription
    /// - [`MissionBoardError::Validation`]: trial ends before the start, or
    ///   the period end cannot be represented
    pub async fn subscribe(
        &self,
        organization_id: OrganizationId,
        member_id: MemberId,
        plan_id: PlanId,
        start_date: Option<DateTime<Utc>>,
        trial_ends_at: Option<DateTime<Utc>>,
    ) -> Result<Subscription> {
        let member = self.store.get_member(member_id).await?;
        scoped(member, organization_id, |m| m.organization_id, "Member", member_id)?;
        let plan = self.store.get_plan(plan_id).await?;
        let plan = scoped(
            plan,
            organization_id,
            |p| p.organization_id,
            "Membership plan",
            plan_id,
        )?;
        let current = self.store.current_subscription(member_id).await?;

        let subscription = self
            .execute(
                SubscriptionState::for_plan(plan, current),
                SubscriptionAction::Subscribe {
                    id: SubscriptionId::new(),
                    organization_id,
                    member_id,
                    start_date,
                    trial_ends_at,
                },
            )
            .await?;

        metrics::record_subscription("created");
        tracing::info!(
            subscription_id = %subscription.id,
            member_id = %member_id,
            plan_id = %plan_id,
            status = %subscription.status,
            period_end = %subscription.current_period_end,
            "Subscription created"
        );
        Ok(subscription)
    }

    /// Cancel a subscription.
    ///
    /// # Errors
    ///
    /// Returns [`MissionBoardError::NotFound`], or
    /// [`MissionBoardError::Validation`] if already cancelled.
    pub async fn cancel(
        &self,
        organization_id: OrganizationId,
        subscription_id: SubscriptionId,
    ) -> Result<Subscription> {
        let existing = self.get(organization_id, subscription_id).await?;
        let subscription = self
            .execute(
                SubscriptionState::for_subscription(existing, None),
                SubscriptionAction::Cancel,
            )
            .await?;

        metrics::record_subscription("cancelled");
        tracing::info!(subscription_id = %subscription_id, "Subscription cancelled");
        Ok(subscription)
    }

    /// Start a subscription's next billing period.
    ///
    /// # Errors
    ///
    /// Returns [`MissionBoardError::NotFound`], or
    /// [`MissionBoardError::Validation`] for a cancelled subscription.
    pub async fn renew(
        &self,
        organization_id: OrganizationId,
        subscription_id: SubscriptionId,
    ) -> Result<Subscription> {
        let existing = self.get(organization_id, subscription_id).await?;
        let plan = self.store.get_plan(existing.plan_id).await?;
        let subscription = self
            .execute(
                SubscriptionState::for_subscription(existing, plan),
                SubscriptionAction::Renew,
            )
            .await?;

        metrics::record_subscription("renewed");
        tracing::info!(
            subscription_id = %subscription_id,
            period_end = %subscription.current_period_end,
            "Subscription renewed"
        );
        Ok(subscription)
    }

    async fn execute(
        &self,
        mut state: SubscriptionState,
        action: SubscriptionAction,
    ) -> Result<Subscription> {
        let effects = self.reducer.reduce(&mut state, action, &self.env);
        if let Some(rejection) = state.last_error.take() {
            return Err(rejection.into());
        }

        let mut saved = None;
        for fact in commits(effects) {
            if let Some(subscription) = fact.subscription() {
                saved = Some(self.store.save_subscription(subscription.clone()).await?);
            }
        }
        saved.ok_or_else(|| {
            MissionBoardError::Database("Subscription decision produced no fact".into())
        })
    }
}

// ============================================================================
// Payments
// ============================================================================

/// A payment to record
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentInput {
    /// Paying member
    pub member_id: Option<MemberId>,
    /// Subscription paid for
    pub subscription_id: Option<SubscriptionId>,
    /// Amount (must be positive)
    pub amount: Money,
    /// ISO 4217 currency (defaults to the organization's)
    pub currency: Option<String>,
    /// Settlement status
    pub status: PaymentStatus,
    /// Payment method
    pub method: PaymentMethod,
    /// Free-form description
    pub description: Option<String>,
}

/// Payment service
#[derive(Clone)]
pub struct PaymentService {
    store: Arc<dyn MissionBoardStore>,
    clock: Arc<dyn Clock>,
}

impl PaymentService {
    /// Create a new payment service
    #[must_use]
    pub fn new(store: Arc<dyn MissionBoardStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Payments of the organization, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn list(
        &self,
        organization_id: OrganizationId,
        status: Option<PaymentStatus>,
    ) -> Result<Vec<Payment>> {
        self.store.list_payments(organization_id, status).await
    }

    /// A payment of the organization.
    ///
    /// # Errors
    ///
    /// Returns [`MissionBoardError::NotFound`] for unknown payments.
    pub async fn get(
        &self,
        organization_id: OrganizationId,
        payment_id: PaymentId,
    ) -> Result<Payment> {
        let payment = self.store.get_payment(payment_id).await?;
        scoped(payment, organization_id, |p| p.organization_id, "Payment", payment_id)
    }

    /// Record a payment.
    ///
    /// When only a subscription is given, the payment is attributed to its
    /// member.
    ///
    /// # Errors
    ///
    /// Returns [`MissionBoardError::Validation`] for a zero amount, a
    /// malformed currency, or a member or subscription outside the
    /// organization.
    pub async fn record(
        &self,
        organization_id: OrganizationId,
        input: PaymentInput,
    ) -> Result<Payment> {
        if input.amount.is_zero() {
            return Err(MissionBoardError::validation("Amount must be greater than zero"));
        }

        let subscription = match input.subscription_id {
            Some(id) => Some(
                self.store
                    .get_subscription(id)
                    .await?
                    .filter(|s| s.organization_id == organization_id)
                    .ok_or_else(|| {
                        MissionBoardError::validation(format!("Unknown subscription {id}"))
                    })?,
            ),
            None => None,
        };

        let member_id = match (input.member_id, &subscription) {
            (Some(member_id), Some(s)) if s.member_id != member_id => {
                return Err(MissionBoardError::validation(
                    "Subscription belongs to another member",
                ));
            }
            (Some(member_id), _) => Some(member_id),
            (None, Some(s)) => Some(s.member_id),
            (None, None) => None,
        };
        if let Some(member_id) = member_id {
            let known = self
                .store
                .get_member(member_id)
                .await?
                .is_some_and(|m| m.organization_id == organization_id);
            if !known {
                return Err(MissionBoardError::validation(format!(
                    "Unknown member {member_id}"
                )));
            }
        }

        let currency = match input.currency.as_deref() {
            Some(currency) => normalize_currency(currency)?,
            None => {
                self.store
                    .get_organization(organization_id)
                    .await?
                    .ok_or_else(|| MissionBoardError::not_found("Organization", organization_id))?
                    .default_currency
            }
        };

        let now = self.clock.now();
        let payment = Payment {
            id: PaymentId::new(),
            organization_id,
            member_id,
            subscription_id: input.subscription_id,
            amount: input.amount,
            currency,
            status: input.status,
            method: input.method,
            description: optional_text(input.description),
            paid_at: (input.status == PaymentStatus::Completed).then_some(now),
            created_at: now,
        };

        let payment = self.store.save_payment(payment).await?;
        metrics::record_payment(payment.status);
        tracing::info!(
            payment_id = %payment.id,
            amount = %payment.amount,
            currency = %payment.currency,
            status = %payment.status,
            "Payment recorded"
        );
        Ok(payment)
    }

    /// Change a payment's status. Completing a payment stamps `paid_at`.
    ///
    /// # Errors
    ///
    /// Returns [`MissionBoardError::NotFound`] for unknown payments.
    pub async fn update_status(
        &self,
        organization_id: OrganizationId,
        payment_id: PaymentId,
        status: PaymentStatus,
    ) -> Result<Payment> {
        let existing = self.get(organization_id, payment_id).await?;
        let from = existing.status;
        let paid_at = match status {
            PaymentStatus::Completed => existing.paid_at.or_else(|| Some(self.clock.now())),
            PaymentStatus::Pending | PaymentStatus::Failed => None,
        };
        let payment = Payment {
            status,
            paid_at,
            ..existing
        };

        let payment = self.store.save_payment(payment).await?;
        if from != status {
            metrics::record_payment(status);
        }
        tracing::info!(payment_id = %payment_id, %from, to = %status, "Payment status updated");
        Ok(payment)
    }
}
