//! Subscription aggregate: subscribing, cancelling and renewing.
//!
//! Billing periods use calendar arithmetic from [`BillingInterval::period_end`];
//! a period end that cannot be represented rejects the command.

use crate::error::MissionBoardError;
use crate::types::{
    BillingInterval, MemberId, MembershipPlan, OrganizationId, PlanId, Subscription,
    SubscriptionId, SubscriptionStatus,
};
use chrono::{DateTime, Utc};
use missionboard_core::{effect::Effect, environment::Clock, reducer::Reducer, smallvec, SmallVec};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ============================================================================
// Actions (Commands + Facts)
// ============================================================================

/// Actions for the Subscription aggregate
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubscriptionAction {
    // Commands
    /// Subscribe a member to the plan in state
    Subscribe {
        /// Identifier of the new subscription
        id: SubscriptionId,
        /// Owning organization
        organization_id: OrganizationId,
        /// Subscriber
        member_id: MemberId,
        /// First day of the subscription (defaults to now)
        start_date: Option<DateTime<Utc>>,
        /// End of a free trial
        trial_ends_at: Option<DateTime<Utc>>,
    },
    /// Cancel the subscription in state
    Cancel,
    /// Start the next billing period of the subscription in state
    Renew,

    // Facts
    /// A subscription was created
    Subscribed {
        /// The new subscription
        subscription: Subscription,
    },
    /// A subscription was cancelled
    SubscriptionCancelled {
        /// The cancelled subscription
        subscription: Subscription,
    },
    /// A subscription moved to its next period
    SubscriptionRenewed {
        /// The renewed subscription
        subscription: Subscription,
    },
    /// A command was rejected
    SubscriptionRejected {
        /// Why
        reason: SubscriptionRejection,
    },
}

impl SubscriptionAction {
    /// The subscription row a fact writes, if this action is a write
    #[must_use]
    pub const fn subscription(&self) -> Option<&Subscription> {
        match self {
            Self::Subscribed { subscription }
            | Self::SubscriptionCancelled { subscription }
            | Self::SubscriptionRenewed { subscription } => Some(subscription),
            _ => None,
        }
    }
}

/// Reasons a subscription command is rejected
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum SubscriptionRejection {
    /// No plan loaded
    #[error("Membership plan not found")]
    PlanNotFound,
    /// Plan no longer accepts subscriptions
    #[error("Membership plan {plan_id} is not active")]
    PlanInactive {
        /// The plan
        plan_id: PlanId,
    },
    /// Member already has a current subscription
    #[error("Member already has an active subscription ({subscription_id})")]
    AlreadySubscribed {
        /// The existing subscription
        subscription_id: SubscriptionId,
    },
    /// No subscription loaded
    #[error("Subscription not found")]
    SubscriptionNotFound,
    /// Subscription is already cancelled
    #[error("Subscription {subscription_id} is already cancelled")]
    AlreadyCanceled {
        /// The subscription
        subscription_id: SubscriptionId,
    },
    /// Cancelled subscriptions cannot be renewed
    #[error("Cannot renew cancelled subscription {subscription_id}")]
    RenewCanceled {
        /// The subscription
        subscription_id: SubscriptionId,
    },
    /// Trial must end after the subscription starts
    #[error("Trial end must be after the start date")]
    InvalidTrial,
    /// Period end is outside the representable date range
    #[error("Billing period starting {start} cannot be computed for a {interval} plan")]
    PeriodOutOfRange {
        /// Period start
        start: DateTime<Utc>,
        /// Plan interval
        interval: BillingInterval,
    },
}

impl From<SubscriptionRejection> for MissionBoardError {
    fn from(rejection: SubscriptionRejection) -> Self {
        match rejection {
            SubscriptionRejection::PlanNotFound => Self::not_found("Membership plan", "unknown"),
            SubscriptionRejection::SubscriptionNotFound => {
                Self::not_found("Subscription", "unknown")
            }
            SubscriptionRejection::PlanInactive { .. }
            | SubscriptionRejection::AlreadySubscribed { .. } => {
                Self::Conflict(rejection.to_string())
            }
            SubscriptionRejection::AlreadyCanceled { .. }
            | SubscriptionRejection::RenewCanceled { .. }
            | SubscriptionRejection::InvalidTrial
            | SubscriptionRejection::PeriodOutOfRange { .. } => {
                Self::Validation(rejection.to_string())
            }
        }
    }
}

// ============================================================================
// State and Environment
// ============================================================================

/// State for the Subscription aggregate
///
/// For `Subscribe`, `subscription` holds the member's current subscription
/// (if any). For `Cancel` and `Renew` it holds the targeted subscription.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubscriptionState {
    /// Plan the subscription is (or will be) on
    pub plan: Option<MembershipPlan>,
    /// Subscription being acted on
    pub subscription: Option<Subscription>,
    /// Last rejection
    pub last_error: Option<SubscriptionRejection>,
}

impl SubscriptionState {
    /// State for subscribing a member to `plan`
    #[must_use]
    pub const fn for_plan(plan: MembershipPlan, current: Option<Subscription>) -> Self {
        Self {
            plan: Some(plan),
            subscription: current,
            last_error: None,
        }
    }

    /// State for acting on an existing subscription
    #[must_use]
    pub const fn for_subscription(
        subscription: Subscription,
        plan: Option<MembershipPlan>,
    ) -> Self {
        Self {
            plan,
            subscription: Some(subscription),
            last_error: None,
        }
    }
}

/// Environment for the Subscription aggregate
#[derive(Clone)]
pub struct SubscriptionEnvironment {
    /// Clock for default start dates and cancellation timestamps
    pub clock: Arc<dyn Clock>,
}

impl SubscriptionEnvironment {
    /// Creates a new `SubscriptionEnvironment`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the Subscription aggregate
#[derive(Clone, Copy, Debug, Default)]
pub struct SubscriptionReducer;

impl SubscriptionReducer {
    /// Creates a new `SubscriptionReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn period_end(
        interval: BillingInterval,
        start: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, SubscriptionRejection> {
        interval
            .period_end(start)
            .ok_or(SubscriptionRejection::PeriodOutOfRange { start, interval })
    }

    fn subscribe(
        state: &SubscriptionState,
        id: SubscriptionId,
        organization_id: OrganizationId,
        member_id: MemberId,
        start_date: Option<DateTime<Utc>>,
        trial_ends_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<SubscriptionAction, SubscriptionRejection> {
        let plan = state.plan.as_ref().ok_or(SubscriptionRejection::PlanNotFound)?;
        if !plan.active {
            return Err(SubscriptionRejection::PlanInactive { plan_id: plan.id });
        }

        if let Some(current) = state.subscription.as_ref().filter(|s| s.status.is_current()) {
            return Err(SubscriptionRejection::AlreadySubscribed {
                subscription_id: current.id,
            });
        }

        let start = start_date.unwrap_or(now);
        if trial_ends_at.is_some_and(|trial_end| trial_end <= start) {
            return Err(SubscriptionRejection::InvalidTrial);
        }
        let current_period_end = Self::period_end(plan.interval, start)?;

        Ok(SubscriptionAction::Subscribed {
            subscription: Subscription {
                id,
                organization_id,
                member_id,
                plan_id: plan.id,
                status: if trial_ends_at.is_some() {
                    SubscriptionStatus::Trialing
                } else {
                    SubscriptionStatus::Active
                },
                start_date: start,
                current_period_start: start,
                current_period_end,
                canceled_at: None,
                trial_ends_at,
                created_at: now,
            },
        })
    }

    fn cancel(
        state: &SubscriptionState,
        now: DateTime<Utc>,
    ) -> Result<SubscriptionAction, SubscriptionRejection> {
        let subscription = state
            .subscription
            .clone()
            .ok_or(SubscriptionRejection::SubscriptionNotFound)?;
        if subscription.status == SubscriptionStatus::Canceled {
            return Err(SubscriptionRejection::AlreadyCanceled {
                subscription_id: subscription.id,
            });
        }

        Ok(SubscriptionAction::SubscriptionCancelled {
            subscription: Subscription {
                status: SubscriptionStatus::Canceled,
                canceled_at: Some(now),
                ..subscription
            },
        })
    }

    fn renew(state: &SubscriptionState) -> Result<SubscriptionAction, SubscriptionRejection> {
        let subscription = state
            .subscription
            .clone()
            .ok_or(SubscriptionRejection::SubscriptionNotFound)?;
        if subscription.status == SubscriptionStatus::Canceled {
            return Err(SubscriptionRejection::RenewCanceled {
                subscription_id: subscription.id,
            });
        }
        let plan = state.plan.as_ref().ok_or(SubscriptionRejection::PlanNotFound)?;

        let start = subscription.current_period_end;
        let end = Self::period_end(plan.interval, start)?;

        Ok(SubscriptionAction::SubscriptionRenewed {
            subscription: Subscription {
                status: SubscriptionStatus::Active,
                current_period_start: start,
                current_period_end: end,
                ..subscription
            },
        })
    }

    /// Applies a fact to state
    fn apply_event(state: &mut SubscriptionState, action: &SubscriptionAction) {
        match action {
            SubscriptionAction::SubscriptionRejected { reason } => {
                state.last_error = Some(reason.clone());
            }
            fact => {
                if let Some(subscription) = fact.subscription() {
                    state.subscription = Some(subscription.clone());
                    state.last_error = None;
                }
            }
        }
    }
}

impl Reducer for SubscriptionReducer {
    type State = SubscriptionState;
    type Action = SubscriptionAction;
    type Environment = SubscriptionEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let now = env.clock.now();

        let decision = match action {
            SubscriptionAction::Subscribe {
                id,
                organization_id,
                member_id,
                start_date,
                trial_ends_at,
            } => Self::subscribe(
                state,
                id,
                organization_id,
                member_id,
                start_date,
                trial_ends_at,
                now,
            ),
            SubscriptionAction::Cancel => Self::cancel(state, now),
            SubscriptionAction::Renew => Self::renew(state),
            fact => {
                Self::apply_event(state, &fact);
                return SmallVec::new();
            }
        };

        match decision {
            Ok(fact) => {
                Self::apply_event(state, &fact);
                smallvec![Effect::Commit(fact)]
            }
            Err(reason) => {
                Self::apply_event(state, &SubscriptionAction::SubscriptionRejected { reason });
                SmallVec::new()
            }
        }
    }
}
