//! Immutable grammar templates.
//!
//! A [`StateTemplate`] describes one entry step of a query token: what it is
//! called, how values are validated, and which templates may follow it.
//! Templates form a directed graph (usually a chain) and are shared
//! read-only across every machine walking them; all per-instance mutable
//! data (typed text, filtered candidates) lives on the runtime
//! [`State`](super::state::State).

use super::validator::Validator;
use super::value::TokenValue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Suggestion lists are capped to this many entries.
pub const MAX_SUGGESTIONS: usize = 10;

/// Variant tag carried by every template, used for default behavior and for
/// strategy lookup by the rendering layer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum TemplateKind {
    /// Free-text value entry.
    ValueEntry,
    /// Entry from a candidate set with autocomplete suggestions.
    OptionEntry,
    /// Numeric entry; the typed text itself is the final value once it
    /// parses.
    NumericEntry,
}

impl TemplateKind {
    /// The tag's display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ValueEntry => "ValueEntry",
            Self::OptionEntry => "OptionEntry",
            Self::NumericEntry => "NumericEntry",
        }
    }
}

/// Future produced by an asynchronous candidate source.
pub type OptionFuture = Pin<Box<dyn Future<Output = Vec<TokenValue>> + Send>>;

/// Asynchronous candidate source: maps a prefix to candidate values.
pub type OptionFetch = Arc<dyn Fn(String) -> OptionFuture + Send + Sync>;

/// Where an option-entry template gets its candidates.
///
/// Static sources hold the full candidate set up front; dynamic sources are
/// consulted with the typed prefix and are the engine's only suspension
/// point.
#[derive(Clone)]
pub enum OptionSource {
    /// Fixed candidate list known at construction.
    Static(Vec<TokenValue>),
    /// Candidates fetched per prefix (e.g. from a server).
    Dynamic(OptionFetch),
}

impl OptionSource {
    /// Candidates known without consulting the source.
    pub fn initial(&self) -> &[TokenValue] {
        match self {
            OptionSource::Static(candidates) => candidates,
            OptionSource::Dynamic(_) => &[],
        }
    }

    /// True when resolving candidates requires a fetch.
    pub fn is_dynamic(&self) -> bool {
        matches!(self, OptionSource::Dynamic(_))
    }
}

impl fmt::Debug for OptionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionSource::Static(candidates) => {
                f.debug_tuple("Static").field(&candidates.len()).finish()
            }
            OptionSource::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// Lazily resolved display name for a template.
///
/// Derived names receive the values committed at prior steps, so a prompt
/// can read e.g. "Enter a value for First Name".
#[derive(Clone)]
pub enum NameResolver {
    /// Fixed prompt.
    Literal(String),
    /// Prompt computed from the values committed before this step.
    Derived(Arc<dyn Fn(&[TokenValue]) -> String + Send + Sync>),
}

impl NameResolver {
    /// Resolve the display name against the values committed so far.
    pub fn resolve(&self, prior: &[TokenValue]) -> String {
        match self {
            NameResolver::Literal(name) => name.clone(),
            NameResolver::Derived(resolve) => resolve(prior),
        }
    }
}

impl fmt::Debug for NameResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameResolver::Literal(name) => f.debug_tuple("Literal").field(name).finish(),
            NameResolver::Derived(_) => f.write_str("Derived(..)"),
        }
    }
}

/// One immutable grammar node.
///
/// Construct templates through [`TemplateBuilder`](crate::builder::TemplateBuilder);
/// once built they never change and a single instance is safely shared by
/// any number of live machines.
///
/// # Example
///
/// ```rust
/// use tokenstate::builder::TemplateBuilder;
/// use tokenstate::core::{TemplateKind, TokenValue};
///
/// let field = TemplateBuilder::option_entry(
///     "Choose a field",
///     vec![TokenValue::new("First Name"), TokenValue::new("Last Name")],
/// )
/// .child(TemplateBuilder::value_entry("Enter a value"))
/// .build()
/// .unwrap();
///
/// assert_eq!(field.kind(), TemplateKind::OptionEntry);
/// assert_eq!(field.children().len(), 1);
/// assert!(field.children()[0].is_terminal());
/// ```
#[derive(Debug)]
pub struct StateTemplate {
    pub(crate) kind: TemplateKind,
    pub(crate) name: NameResolver,
    pub(crate) validator: Option<Validator>,
    pub(crate) allow_unknown: bool,
    pub(crate) default_value: Option<TokenValue>,
    pub(crate) multivalue: bool,
    pub(crate) children: Vec<Arc<StateTemplate>>,
    pub(crate) options: OptionSource,
}

impl StateTemplate {
    /// The variant tag.
    pub fn kind(&self) -> TemplateKind {
        self.kind
    }

    /// Resolve the display name against the values committed at prior steps.
    pub fn resolve_name(&self, prior: &[TokenValue]) -> String {
        self.name.resolve(prior)
    }

    /// Whether values outside the known candidate set are acceptable.
    pub fn allow_unknown(&self) -> bool {
        self.allow_unknown
    }

    /// The value used when this step is not explicitly filled.
    pub fn default_value(&self) -> Option<&TokenValue> {
        self.default_value.as_ref()
    }

    /// Whether multiple values may be archived here before advancing.
    pub fn is_multivalue(&self) -> bool {
        self.multivalue
    }

    /// The only legal next nodes, in order.
    pub fn children(&self) -> &[Arc<StateTemplate>] {
        &self.children
    }

    /// True when the grammar ends at this node.
    pub fn is_terminal(&self) -> bool {
        self.children.is_empty()
    }

    /// Candidates known without consulting a dynamic source.
    pub fn initial_options(&self) -> &[TokenValue] {
        self.options.initial()
    }

    pub(crate) fn option_source(&self) -> &OptionSource {
        &self.options
    }

    /// Validate a boxed value against this template.
    ///
    /// A custom validator takes precedence; otherwise the kind default
    /// applies. Option membership is judged against `candidates`, the
    /// calling state's current candidate set, so templates with dynamic
    /// sources stay immutable.
    pub fn validate(&self, value: Option<&TokenValue>, candidates: &[TokenValue]) -> bool {
        let Some(value) = value else {
            return false;
        };
        if let Some(validator) = &self.validator {
            return validator.check(value);
        }
        match self.kind {
            TemplateKind::ValueEntry => !value.key.is_empty(),
            TemplateKind::OptionEntry => {
                self.allow_unknown || candidates.iter().any(|c| c.key == value.key)
            }
            TemplateKind::NumericEntry => {
                value.key.parse::<f64>().map(f64::is_finite).unwrap_or(false)
            }
        }
    }

    /// The reason reported when validation fails.
    pub fn validation_message(&self) -> &str {
        if let Some(validator) = &self.validator {
            return validator.message();
        }
        match self.kind {
            TemplateKind::ValueEntry => "Value cannot be empty",
            TemplateKind::OptionEntry => "Value must be one of the suggested options",
            TemplateKind::NumericEntry => "Value must be numeric",
        }
    }

    /// Box raw typed text into a domain value.
    ///
    /// Option templates resolve the text against the known candidates so a
    /// committed value carries the candidate's display label and metadata;
    /// unrecognized text becomes an unknown value (validation then decides
    /// whether it is acceptable).
    pub fn box_value(&self, raw: &str, candidates: &[TokenValue]) -> TokenValue {
        match self.kind {
            TemplateKind::OptionEntry => candidates
                .iter()
                .find(|c| c.key == raw)
                .cloned()
                .unwrap_or_else(|| TokenValue::new(raw)),
            TemplateKind::ValueEntry | TemplateKind::NumericEntry => TokenValue::new(raw),
        }
    }

    /// Filter candidates by case-insensitive key prefix, capped to the first
    /// [`MAX_SUGGESTIONS`] matches.
    pub fn filter_options(candidates: &[TokenValue], prefix: &str) -> Vec<TokenValue> {
        let needle = prefix.to_lowercase();
        candidates
            .iter()
            .filter(|c| c.key.to_lowercase().starts_with(&needle))
            .take(MAX_SUGGESTIONS)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::TemplateBuilder;

    fn names() -> Vec<TokenValue> {
        vec![TokenValue::new("First Name"), TokenValue::new("Last Name")]
    }

    #[test]
    fn filter_is_case_insensitive_prefix_match() {
        let filtered = StateTemplate::filter_options(&names(), "f");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].key, "First Name");
    }

    #[test]
    fn filter_empty_prefix_returns_everything() {
        assert_eq!(StateTemplate::filter_options(&names(), "").len(), 2);
    }

    #[test]
    fn filter_caps_at_ten() {
        let candidates: Vec<TokenValue> = (0..25)
            .map(|i| TokenValue::new(format!("tag{i:02}")))
            .collect();
        assert_eq!(
            StateTemplate::filter_options(&candidates, "tag").len(),
            MAX_SUGGESTIONS
        );
    }

    #[test]
    fn value_entry_accepts_non_empty() {
        let template = TemplateBuilder::value_entry("Enter a value")
            .build()
            .unwrap();

        assert!(template.validate(Some(&TokenValue::new("Joe")), &[]));
        assert!(!template.validate(Some(&TokenValue::new("")), &[]));
        assert!(!template.validate(None, &[]));
    }

    #[test]
    fn option_entry_requires_membership() {
        let template = TemplateBuilder::option_entry("Field", names()).build().unwrap();
        let candidates = names();

        assert!(template.validate(Some(&TokenValue::new("First Name")), &candidates));
        assert!(!template.validate(Some(&TokenValue::new("Middle Name")), &candidates));
    }

    #[test]
    fn option_entry_allow_unknown_accepts_free_text() {
        let template = TemplateBuilder::option_entry("Field", names())
            .allow_unknown(true)
            .build()
            .unwrap();

        assert!(template.validate(Some(&TokenValue::new("Middle Name")), &names()));
    }

    #[test]
    fn numeric_entry_requires_finite_number() {
        let template = TemplateBuilder::numeric_entry().build().unwrap();

        assert!(template.validate(Some(&TokenValue::new("42")), &[]));
        assert!(template.validate(Some(&TokenValue::new("-3.5")), &[]));
        assert!(!template.validate(Some(&TokenValue::new("abc")), &[]));
        assert!(!template.validate(Some(&TokenValue::new("inf")), &[]));
    }

    #[test]
    fn custom_validator_takes_precedence() {
        let template = TemplateBuilder::value_entry("Name")
            .validator(Validator::new("must be short", |v: &TokenValue| {
                v.key.len() <= 3
            }))
            .build()
            .unwrap();

        assert!(template.validate(Some(&TokenValue::new("Joe")), &[]));
        assert!(!template.validate(Some(&TokenValue::new("Joseph")), &[]));
        assert_eq!(template.validation_message(), "must be short");
    }

    #[test]
    fn box_value_resolves_candidates() {
        let candidates = vec![TokenValue::new("First Name").with_display("First")];
        let template = TemplateBuilder::option_entry("Field", candidates.clone())
            .build()
            .unwrap();

        let boxed = template.box_value("First Name", &candidates);
        assert_eq!(boxed.display(), "First");

        let unknown = template.box_value("Nickname", &candidates);
        assert_eq!(unknown.key, "Nickname");
        assert!(unknown.display_key.is_none());
    }

    #[test]
    fn derived_name_sees_prior_values() {
        let template = TemplateBuilder::value_entry("placeholder")
            .derived_name(|prior: &[TokenValue]| {
                match prior.last() {
                    Some(field) => format!("Enter a value for {}", field.key),
                    None => "Enter a value".to_string(),
                }
            })
            .build()
            .unwrap();

        assert_eq!(template.resolve_name(&[]), "Enter a value");
        assert_eq!(
            template.resolve_name(&[TokenValue::new("First Name")]),
            "Enter a value for First Name"
        );
    }
}
