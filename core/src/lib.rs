//! # MissionBoard Core
//!
//! Core traits and types shared by the MissionBoard crates.
//!
//! Business rules (registration capacity, waitlist promotion, subscription
//! periods, event lifecycle) are written as reducers: pure functions that
//! validate a command against the loaded state, update that state in place and
//! return descriptions of what the imperative shell must do next.
//!
//! ## Core Concepts
//!
//! - **State**: The slice of persisted data a decision needs (one event and its
//!   registrations, one subscription and its plan, ...)
//! - **Action**: Commands (requests) and the facts they produce
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions (not execution)
//! - **Environment**: Injected dependencies via traits (clock)
//!
//! ## Example
//!
//! ```ignore
//! use missionboard_core::*;
//!
//! impl Reducer for RegistrationReducer {
//!     type State = RegistrationState;
//!     type Action = RegistrationAction;
//!     type Environment = RegistrationEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut RegistrationState,
//!         action: RegistrationAction,
//!         env: &RegistrationEnvironment,
//!     ) -> SmallVec<[Effect<RegistrationAction>; 4]> {
//!         // Decide, apply, then describe what must be persisted
//!         smallvec![Effect::Commit(fact)]
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{smallvec, SmallVec};

/// Reducer module - The core trait for business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`
///
/// They contain all business logic and are deterministic and testable.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    ///
    /// # Example
    ///
    /// ```ignore
    /// impl Reducer for SubscriptionReducer {
    ///     type State = SubscriptionState;
    ///     type Action = SubscriptionAction;
    ///     type Environment = SubscriptionEnvironment;
    ///
    ///     fn reduce(
    ///         &self,
    ///         state: &mut SubscriptionState,
    ///         action: SubscriptionAction,
    ///         env: &SubscriptionEnvironment,
    ///     ) -> SmallVec<[Effect<SubscriptionAction>; 4]> {
    ///         match action {
    ///             SubscriptionAction::Cancel => {
    ///                 // Business logic here
    ///                 SmallVec::new()
    ///             }
    ///             _ => SmallVec::new(),
    ///         }
    ///     }
    /// }
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// This is a pure function that:
        /// 1. Validates the action
        /// 2. Updates state in place
        /// 3. Returns effect descriptions to be executed
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe side effects to be performed by the caller of a reducer.
/// They are values (not execution) and can be inspected in tests.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should happen,
    /// returned from reducers and executed by the service layer.
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects carry or produce (feedback loop)
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects in parallel
        Parallel(Vec<Effect<Action>>),

        /// Run effects sequentially
        Sequential(Vec<Effect<Action>>),

        /// A decided fact that must be written to storage.
        ///
        /// Commits are applied in order, inside the same unit of work that
        /// loaded the state the reducer decided on.
        Commit(Action),

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Effect::Commit(action) => f.debug_tuple("Effect::Commit").field(action).finish(),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Combine effects to run in parallel
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Chain effects to run sequentially
        #[must_use]
        pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Sequential(effects)
        }

        /// Flatten this effect into the committed actions it carries, in order.
        ///
        /// `Future` effects are skipped; they are not part of the unit of work.
        #[must_use]
        pub fn into_commits(self) -> Vec<Action> {
            let mut out = Vec::new();
            self.collect_commits(&mut out);
            out
        }

        fn collect_commits(self, out: &mut Vec<Action>) {
            match self {
                Effect::Commit(action) => out.push(action),
                Effect::Parallel(effects) | Effect::Sequential(effects) => {
                    for effect in effects {
                        effect.collect_commits(out);
                    }
                },
                Effect::None | Effect::Future(_) => {},
            }
        }
    }

    /// Collect every committed action from a reducer's output, in order.
    #[must_use]
    pub fn commits<A, I>(effects: I) -> Vec<A>
    where
        I: IntoIterator<Item = Effect<A>>,
    {
        effects.into_iter().flat_map(Effect::into_commits).collect()
    }
}

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// via the Environment parameter.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use missionboard_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let _now = clock.now();
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::effect::{commits, Effect};

    #[test]
    fn commits_are_flattened_in_order() {
        let effects = vec![
            Effect::Commit(1),
            Effect::chain(vec![Effect::Commit(2), Effect::None, Effect::Commit(3)]),
            Effect::merge(vec![Effect::Commit(4)]),
        ];

        assert_eq!(commits(effects), vec![1, 2, 3, 4]);
    }

    #[test]
    fn future_effects_are_not_commits() {
        let effect: Effect<u8> = Effect::Future(Box::pin(async { Some(7) }));
        assert!(effect.into_commits().is_empty());
    }

    #[test]
    fn debug_output_names_variants() {
        let effect: Effect<u8> = Effect::Commit(5);
        assert_eq!(format!("{effect:?}"), "Effect::Commit(5)");
        let effect: Effect<u8> = Effect::Future(Box::pin(async { None }));
        assert_eq!(format!("{effect:?}"), "Effect::Future(<future>)");
    }
}
