//! Validator predicates gating state transitions.
//!
//! A validator is a pure boolean function over a boxed value, paired with the
//! human-readable reason surfaced when a transition is rejected.

use super::value::TokenValue;
use std::fmt;
use std::sync::Arc;

/// Pure predicate that determines whether a boxed value is acceptable at a
/// grammar node, plus the failure message shown when it is not.
///
/// Validators are evaluated before a transition advances the machine. The
/// predicate must not mutate state; the same validator is shared by every
/// machine walking the template it is attached to.
///
/// # Example
///
/// ```rust
/// use tokenstate::core::{TokenValue, Validator};
///
/// let non_empty = Validator::new("Value cannot be empty", |v: &TokenValue| !v.key.is_empty());
///
/// assert!(non_empty.check(&TokenValue::new("Joe")));
/// assert!(!non_empty.check(&TokenValue::new("")));
/// assert_eq!(non_empty.message(), "Value cannot be empty");
/// ```
#[derive(Clone)]
pub struct Validator {
    message: String,
    predicate: Arc<dyn Fn(&TokenValue) -> bool + Send + Sync>,
}

impl Validator {
    /// Create a validator from a failure message and a pure predicate.
    ///
    /// The predicate must be deterministic and thread-safe; it is shared
    /// read-only across every machine bound to the owning template.
    pub fn new<F>(message: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&TokenValue) -> bool + Send + Sync + 'static,
    {
        Self {
            message: message.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Evaluate the predicate against a boxed value.
    pub fn check(&self, value: &TokenValue) -> bool {
        (self.predicate)(value)
    }

    /// The reason reported when `check` fails.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}
