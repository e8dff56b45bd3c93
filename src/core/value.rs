//! Boxed token values and whole-token bindings.
//!
//! A "boxed" value is the canonical domain object committed at one grammar
//! step. Its "unboxed" projection is the raw text a user typed (or would
//! type) to produce it; unboxing lives on the runtime `State`, which stages
//! not-yet-valid input before it is boxed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The canonical domain value committed at one grammar step.
///
/// `key` is the identity the validator operates on. `display_key` is an
/// optional shorter label for read-only rendering. `meta` carries arbitrary
/// application data attached to a candidate (ids, categories, ...) and is
/// never inspected by the engine.
///
/// # Example
///
/// ```rust
/// use tokenstate::core::TokenValue;
///
/// let value = TokenValue::new("First Name").with_display("First");
/// assert_eq!(value.key, "First Name");
/// assert_eq!(value.display(), "First");
/// ```
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct TokenValue {
    /// Identity of the value; validators operate on this.
    pub key: String,
    /// Optional short label for read-only rendering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_key: Option<String>,
    /// Application metadata carried alongside the value, opaque to the engine.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, String>,
}

impl TokenValue {
    /// Create a value from its key.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            display_key: None,
            meta: BTreeMap::new(),
        }
    }

    /// Attach a short display label.
    pub fn with_display(mut self, display_key: impl Into<String>) -> Self {
        self.display_key = Some(display_key.into());
        self
    }

    /// Attach one metadata entry.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// The label to render: `display_key` when present, otherwise `key`.
    pub fn display(&self) -> &str {
        self.display_key.as_deref().unwrap_or(&self.key)
    }
}

/// The values committed at one grammar step.
///
/// Single-value steps carry exactly one value. Multivalue steps carry the
/// archived values plus the final current one, in commit order.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum StepValue {
    /// One committed value.
    Single(TokenValue),
    /// All values committed at a multivalue step, oldest first.
    Many(Vec<TokenValue>),
}

impl StepValue {
    /// The value a subsequent step's name resolution sees: the single value,
    /// or the last committed value of a multivalue step.
    pub fn last(&self) -> Option<&TokenValue> {
        match self {
            StepValue::Single(value) => Some(value),
            StepValue::Many(values) => values.last(),
        }
    }

    /// Number of values in this step.
    pub fn len(&self) -> usize {
        match self {
            StepValue::Single(_) => 1,
            StepValue::Many(values) => values.len(),
        }
    }

    /// True when a multivalue step carries no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An ordered, whole-token sequence of step values: one entry per grammar
/// node along the path from root to terminal.
///
/// This is the external-value shape consumed by
/// [`TokenStateMachine::bind_values`](crate::machine::TokenStateMachine::bind_values)
/// and produced by [`TokenStateMachine::committed`](crate::machine::TokenStateMachine::committed).
///
/// # Example
///
/// ```rust
/// use tokenstate::core::{TokenBinding, TokenValue};
///
/// let binding = TokenBinding::new()
///     .single(TokenValue::new("First Name"))
///     .single(TokenValue::new("Joe"));
/// assert_eq!(binding.len(), 2);
/// ```
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct TokenBinding {
    steps: Vec<StepValue>,
}

impl TokenBinding {
    /// Create an empty binding.
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Append a single-value step.
    pub fn single(mut self, value: TokenValue) -> Self {
        self.steps.push(StepValue::Single(value));
        self
    }

    /// Append a multivalue step.
    pub fn many(mut self, values: Vec<TokenValue>) -> Self {
        self.steps.push(StepValue::Many(values));
        self
    }

    /// Append a pre-built step.
    pub fn push(&mut self, step: StepValue) {
        self.steps.push(step);
    }

    /// The steps in root-to-terminal order.
    pub fn steps(&self) -> &[StepValue] {
        &self.steps
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// True when no steps have been bound.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl From<Vec<StepValue>> for TokenBinding {
    fn from(steps: Vec<StepValue>) -> Self {
        Self { steps }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_falls_back_to_key() {
        let plain = TokenValue::new("Last Name");
        assert_eq!(plain.display(), "Last Name");

        let labelled = TokenValue::new("Last Name").with_display("Last");
        assert_eq!(labelled.display(), "Last");
    }

    #[test]
    fn meta_is_preserved() {
        let value = TokenValue::new("age").with_meta("column", "user_age");
        assert_eq!(value.meta.get("column").map(String::as_str), Some("user_age"));
    }

    #[test]
    fn step_last_returns_final_commit() {
        let single = StepValue::Single(TokenValue::new("a"));
        assert_eq!(single.last().map(|v| v.key.as_str()), Some("a"));

        let many = StepValue::Many(vec![TokenValue::new("a"), TokenValue::new("b")]);
        assert_eq!(many.last().map(|v| v.key.as_str()), Some("b"));
        assert_eq!(many.len(), 2);

        let empty = StepValue::Many(Vec::new());
        assert!(empty.last().is_none());
        assert!(empty.is_empty());
    }

    #[test]
    fn binding_preserves_step_order() {
        let binding = TokenBinding::new()
            .single(TokenValue::new("field"))
            .many(vec![TokenValue::new("x"), TokenValue::new("y")]);

        assert_eq!(binding.len(), 2);
        assert!(matches!(binding.steps()[0], StepValue::Single(_)));
        assert!(matches!(binding.steps()[1], StepValue::Many(_)));
    }

    #[test]
    fn value_serializes_compactly() {
        let value = TokenValue::new("First Name");
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"key":"First Name"}"#);

        let back: TokenValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn binding_round_trips_through_json() {
        let binding = TokenBinding::new()
            .single(TokenValue::new("Tag").with_display("T"))
            .many(vec![TokenValue::new("red"), TokenValue::new("blue")]);

        let json = serde_json::to_string(&binding).unwrap();
        let back: TokenBinding = serde_json::from_str(&json).unwrap();
        assert_eq!(back, binding);
    }
}
