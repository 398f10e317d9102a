//! Membership plans, subscriptions and payments.

use super::rows::{cents_to_db, convert_all, PaymentRow, PlanRow, SubscriptionRow};
use super::PostgresStore;
use crate::store::{
    PaymentRepository, PlanRepository, StoreFuture, SubscriptionFilter, SubscriptionRepository,
};
use crate::types::{
    MemberId, MembershipPlan, OrganizationId, Payment, PaymentId, PaymentStatus, PlanId,
    Subscription, SubscriptionId,
};

const PLAN_COLUMNS: &str = "id, organization_id, name, description, price_cents, currency, \
     billing_interval, features, active, created_at";

const SUBSCRIPTION_COLUMNS: &str = "id, organization_id, member_id, plan_id, status, start_date, \
     current_period_start, current_period_end, canceled_at, trial_ends_at, created_at";

const PAYMENT_COLUMNS: &str = "id, organization_id, member_id, subscription_id, amount_cents, \
     currency, status, method, description, paid_at, created_at";

impl PlanRepository for PostgresStore {
    fn list_plans(
        &self,
        organization_id: OrganizationId,
        active_only: bool,
    ) -> StoreFuture<'_, Vec<MembershipPlan>> {
        Box::pin(async move {
            let rows: Vec<PlanRow> = sqlx::query_as(&format!(
                "SELECT {PLAN_COLUMNS} FROM membership_plans
                 WHERE organization_id = $1 AND (NOT $2 OR active)
                 ORDER BY price_cents, name"
            ))
            .bind(organization_id.as_uuid())
            .bind(active_only)
            .fetch_all(&self.pool)
            .await?;

            convert_all(rows)
        })
    }

    fn get_plan(&self, id: PlanId) -> StoreFuture<'_, Option<MembershipPlan>> {
        Box::pin(async move {
            let row: Option<PlanRow> = sqlx::query_as(&format!(
                "SELECT {PLAN_COLUMNS} FROM membership_plans WHERE id = $1"
            ))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

            row.map(MembershipPlan::try_from).transpose()
        })
    }

    fn save_plan(&self, plan: MembershipPlan) -> StoreFuture<'_, MembershipPlan> {
        Box::pin(async move {
            sqlx::query(
                "INSERT INTO membership_plans
                     (id, organization_id, name, description, price_cents, currency,
                      billing_interval, features, active, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                 ON CONFLICT (id) DO UPDATE SET
                     name = EXCLUDED.name,
                     description = EXCLUDED.description,
                     price_cents = EXCLUDED.price_cents,
                     currency = EXCLUDED.currency,
                     billing_interval = EXCLUDED.billing_interval,
                     features = EXCLUDED.features,
                     active = EXCLUDED.active",
            )
            .bind(plan.id.as_uuid())
            .bind(plan.organization_id.as_uuid())
            .bind(&plan.name)
            .bind(&plan.description)
            .bind(cents_to_db(plan.price)?)
            .bind(&plan.currency)
            .bind(plan.interval.as_str())
            .bind(&plan.features)
            .bind(plan.active)
            .bind(plan.created_at)
            .execute(&self.pool)
            .await?;

            Ok(plan)
        })
    }

    fn delete_plan(&self, id: PlanId) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            // Subscriptions reference plans ON DELETE RESTRICT; the violation
            // surfaces as a conflict.
            let result = sqlx::query("DELETE FROM membership_plans WHERE id = $1")
                .bind(id.as_uuid())
                .execute(&self.pool)
                .await?;

            Ok(result.rows_affected() > 0)
        })
    }
}

impl SubscriptionRepository for PostgresStore {
    fn list_subscriptions(
        &self,
        organization_id: OrganizationId,
        filter: SubscriptionFilter,
    ) -> StoreFuture<'_, Vec<Subscription>> {
        Box::pin(async move {
            let rows: Vec<SubscriptionRow> = sqlx::query_as(&format!(
                "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions
                 WHERE organization_id = $1
                   AND ($2::uuid IS NULL OR member_id = $2)
                   AND ($3::text IS NULL OR status = $3)
                 ORDER BY created_at DESC, id"
            ))
            .bind(organization_id.as_uuid())
            .bind(filter.member_id.map(|id| *id.as_uuid()))
            .bind(filter.status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await?;

            convert_all(rows)
        })
    }

    fn get_subscription(&self, id: SubscriptionId) -> StoreFuture<'_, Option<Subscription>> {
        Box::pin(async move {
            let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
                "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE id = $1"
            ))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

            row.map(Subscription::try_from).transpose()
        })
    }

    fn current_subscription(&self, member_id: MemberId) -> StoreFuture<'_, Option<Subscription>> {
        Box::pin(async move {
            let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
                "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions
                 WHERE member_id = $1 AND status IN ('ACTIVE', 'TRIALING')"
            ))
            .bind(member_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

            row.map(Subscription::try_from).transpose()
        })
    }

    fn save_subscription(&self, subscription: Subscription) -> StoreFuture<'_, Subscription> {
        Box::pin(async move {
            sqlx::query(
                "INSERT INTO subscriptions
                     (id, organization_id, member_id, plan_id, status, start_date,
                      current_period_start, current_period_end, canceled_at, trial_ends_at,
                      created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                 ON CONFLICT (id) DO UPDATE SET
                     status = EXCLUDED.status,
                     current_period_start = EXCLUDED.current_period_start,
                     current_period_end = EXCLUDED.current_period_end,
                     canceled_at = EXCLUDED.canceled_at,
                     trial_ends_at = EXCLUDED.trial_ends_at",
            )
            .bind(subscription.id.as_uuid())
            .bind(subscription.organization_id.as_uuid())
            .bind(subscription.member_id.as_uuid())
            .bind(subscription.plan_id.as_uuid())
            .bind(subscription.status.as_str())
            .bind(subscription.start_date)
            .bind(subscription.current_period_start)
            .bind(subscription.current_period_end)
            .bind(subscription.canceled_at)
            .bind(subscription.trial_ends_at)
            .bind(subscription.created_at)
            .execute(&self.pool)
            .await?;

            Ok(subscription)
        })
    }
}

impl PaymentRepository for PostgresStore {
    fn list_payments(
        &self,
        organization_id: OrganizationId,
        status: Option<PaymentStatus>,
    ) -> StoreFuture<'_, Vec<Payment>> {
        Box::pin(async move {
            let rows: Vec<PaymentRow> = sqlx::query_as(&format!(
                "SELECT {PAYMENT_COLUMNS} FROM payments
                 WHERE organization_id = $1 AND ($2::text IS NULL OR status = $2)
                 ORDER BY created_at DESC, id"
            ))
            .bind(organization_id.as_uuid())
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await?;

            convert_all(rows)
        })
    }

    fn get_payment(&self, id: PaymentId) -> StoreFuture<'_, Option<Payment>> {
        Box::pin(async move {
            let row: Option<PaymentRow> =
                sqlx::query_as(&format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1"))
                    .bind(id.as_uuid())
                    .fetch_optional(&self.pool)
                    .await?;

            row.map(Payment::try_from).transpose()
        })
    }

    fn save_payment(&self, payment: Payment) -> StoreFuture<'_, Payment> {
        Box::pin(async move {
            sqlx::query(
                "INSERT INTO payments
                     (id, organization_id, member_id, subscription_id, amount_cents, currency,
                      status, method, description, paid_at, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                 ON CONFLICT (id) DO UPDATE SET
                     amount_cents = EXCLUDED.amount_cents,
                     currency = EXCLUDED.currency,
                     status = EXCLUDED.status,
                     method = EXCLUDED.method,
                     description = EXCLUDED.description,
                     paid_at = EXCLUDED.paid_at",
            )
            .bind(payment.id.as_uuid())
            .bind(payment.organization_id.as_uuid())
            .bind(payment.member_id.map(|id| *id.as_uuid()))
            .bind(payment.subscription_id.map(|id| *id.as_uuid()))
            .bind(cents_to_db(payment.amount)?)
            .bind(&payment.currency)
            .bind(payment.status.as_str())
            .bind(payment.method.as_str())
            .bind(&payment.description)
            .bind(payment.paid_at)
            .bind(payment.created_at)
            .execute(&self.pool)
            .await?;

            Ok(payment)
        })
    }
}
