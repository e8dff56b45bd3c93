//! Builder API for ergonomic template graph construction.
//!
//! This module provides a fluent builder and a macro for declaring token
//! grammars with minimal boilerplate while keeping templates immutable
//! after construction.

pub mod error;
pub mod macros;

pub use error::BuildError;

use crate::core::{
    NameResolver, OptionFuture, OptionSource, StateTemplate, TemplateKind, TokenValue, Validator,
};
use std::sync::Arc;

/// Fluent builder for one grammar node and (recursively) its children.
///
/// Kind-specific constructors seed the defaults described by each node type;
/// `build()` validates required fields and produces a shareable
/// [`StateTemplate`].
///
/// # Example
///
/// ```rust
/// use tokenstate::builder::TemplateBuilder;
/// use tokenstate::core::TokenValue;
///
/// let root = TemplateBuilder::option_entry(
///     "Choose a field",
///     vec![TokenValue::new("First Name"), TokenValue::new("Last Name")],
/// )
/// .child(TemplateBuilder::value_entry("Enter a value"))
/// .build()
/// .unwrap();
///
/// assert_eq!(root.children().len(), 1);
/// ```
pub struct TemplateBuilder {
    kind: TemplateKind,
    name: Option<NameResolver>,
    validator: Option<Validator>,
    allow_unknown: Option<bool>,
    default_value: Option<TokenValue>,
    multivalue: bool,
    children: Vec<TemplateBuilder>,
    options: Option<OptionSource>,
}

impl TemplateBuilder {
    fn with_kind(kind: TemplateKind) -> Self {
        Self {
            kind,
            name: None,
            validator: None,
            allow_unknown: None,
            default_value: None,
            multivalue: false,
            children: Vec::new(),
            options: None,
        }
    }

    /// Free-text value entry with a literal prompt.
    pub fn value_entry(name: impl Into<String>) -> Self {
        let mut builder = Self::with_kind(TemplateKind::ValueEntry);
        builder.name = Some(NameResolver::Literal(name.into()));
        builder
    }

    /// Option entry over a fixed candidate set.
    pub fn option_entry(name: impl Into<String>, candidates: Vec<TokenValue>) -> Self {
        let mut builder = Self::with_kind(TemplateKind::OptionEntry);
        builder.name = Some(NameResolver::Literal(name.into()));
        builder.options = Some(OptionSource::Static(candidates));
        builder
    }

    /// Option entry whose candidates are fetched per prefix.
    pub fn option_entry_async<F>(name: impl Into<String>, fetch: F) -> Self
    where
        F: Fn(String) -> OptionFuture + Send + Sync + 'static,
    {
        let mut builder = Self::with_kind(TemplateKind::OptionEntry);
        builder.name = Some(NameResolver::Literal(name.into()));
        builder.options = Some(OptionSource::Dynamic(Arc::new(fetch)));
        builder
    }

    /// Numeric entry. The name defaults to "Enter a value" and unknown
    /// values are always allowed: valid numeric text is itself the final
    /// value.
    pub fn numeric_entry() -> Self {
        Self::with_kind(TemplateKind::NumericEntry)
    }

    /// Set or replace the literal prompt.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(NameResolver::Literal(name.into()));
        self
    }

    /// Resolve the prompt lazily from the values committed at prior steps.
    pub fn derived_name<F>(mut self, resolve: F) -> Self
    where
        F: Fn(&[TokenValue]) -> String + Send + Sync + 'static,
    {
        self.name = Some(NameResolver::Derived(Arc::new(resolve)));
        self
    }

    /// Replace the kind-default validation.
    pub fn validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Whether values outside the candidate set are acceptable.
    /// Ignored by numeric entry, which always allows them.
    pub fn allow_unknown(mut self, allow: bool) -> Self {
        self.allow_unknown = Some(allow);
        self
    }

    /// Value used when this step is not explicitly filled.
    pub fn default_value(mut self, value: TokenValue) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Whether multiple values may be archived here before advancing.
    pub fn multivalue(mut self, multivalue: bool) -> Self {
        self.multivalue = multivalue;
        self
    }

    /// Append a legal next node.
    pub fn child(mut self, child: TemplateBuilder) -> Self {
        self.children.push(child);
        self
    }

    /// Build this node and, recursively, its children.
    pub fn build(self) -> Result<Arc<StateTemplate>, BuildError> {
        let kind = self.kind;
        let name = match self.name {
            Some(name) => name,
            None => match kind {
                TemplateKind::NumericEntry => NameResolver::Literal("Enter a value".to_string()),
                TemplateKind::ValueEntry | TemplateKind::OptionEntry => {
                    return Err(BuildError::MissingName)
                }
            },
        };
        let options = match (kind, self.options) {
            (TemplateKind::OptionEntry, Some(options)) => options,
            (TemplateKind::OptionEntry, None) => return Err(BuildError::MissingOptions),
            (_, _) => OptionSource::Static(Vec::new()),
        };
        let allow_unknown = match kind {
            TemplateKind::ValueEntry => self.allow_unknown.unwrap_or(true),
            TemplateKind::OptionEntry => self.allow_unknown.unwrap_or(false),
            TemplateKind::NumericEntry => true,
        };

        let mut children = Vec::with_capacity(self.children.len());
        for child in self.children {
            children.push(child.build()?);
        }

        Ok(Arc::new(StateTemplate {
            kind,
            name,
            validator: self.validator,
            allow_unknown,
            default_value: self.default_value,
            multivalue: self.multivalue,
            children,
            options,
        }))
    }
}
