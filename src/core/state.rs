//! Runtime binding of a template within one machine.
//!
//! A `State` is created when the machine advances into a template node and
//! conceptually destroyed when the machine rewinds past it or resets. It
//! stages raw typed text (the unboxed value), holds the boxed value once one
//! is committed, and (for multivalue nodes) accumulates the archive of
//! previously committed values.

use super::template::{OptionSource, StateTemplate, TemplateKind};
use super::value::TokenValue;
use crate::events::{Emitter, ListenerToken, StateEvent, StateEventKind};
use std::sync::Arc;
use tracing::debug;

/// One runtime step of a token being edited.
///
/// The template is shared and read-only; everything mutable lives here.
#[derive(Debug)]
pub struct State {
    template: Arc<StateTemplate>,
    value: Option<TokenValue>,
    unboxed: Option<String>,
    is_default: bool,
    archive: Vec<TokenValue>,
    candidates: Vec<TokenValue>,
    options: Vec<TokenValue>,
    emitter: Emitter<StateEvent>,
}

impl State {
    pub(crate) fn new(template: Arc<StateTemplate>) -> Self {
        let candidates = template.initial_options().to_vec();
        let options = StateTemplate::filter_options(&candidates, "");
        let value = template.default_value().cloned();
        let unboxed = value.as_ref().map(|v| v.key.clone());
        Self {
            template,
            value,
            unboxed,
            is_default: true,
            archive: Vec::new(),
            candidates,
            options,
            emitter: Emitter::new(),
        }
    }

    /// The grammar node this state is bound to.
    pub fn template(&self) -> &Arc<StateTemplate> {
        &self.template
    }

    /// The template's variant tag.
    pub fn kind(&self) -> TemplateKind {
        self.template.kind()
    }

    /// Resolve the display name against the values committed at prior steps.
    pub fn name(&self, prior: &[TokenValue]) -> String {
        self.template.resolve_name(prior)
    }

    /// The committed boxed value, if any.
    pub fn value(&self) -> Option<&TokenValue> {
        self.value.as_ref()
    }

    /// The staged raw text projection of the value.
    pub fn unboxed_value(&self) -> Option<&str> {
        self.unboxed.as_deref()
    }

    /// The template's default value.
    pub fn default_value(&self) -> Option<&TokenValue> {
        self.template.default_value()
    }

    /// True until a caller commits a value at this step.
    pub fn is_default(&self) -> bool {
        self.is_default
    }

    /// Validate the current boxed value against the template.
    pub fn is_valid(&self) -> bool {
        self.template.validate(self.value.as_ref(), &self.candidates)
    }

    /// The reason `is_valid` would report failure.
    pub fn validation_message(&self) -> &str {
        self.template.validation_message()
    }

    /// Commit a boxed value, syncing the unboxed projection and emitting
    /// `value changed`.
    pub fn set_value(&mut self, value: Option<TokenValue>) {
        self.is_default = false;
        self.unboxed = value.as_ref().map(|v| v.key.clone());
        self.value = value;
        let event = StateEvent::ValueChanged(self.value.clone());
        self.emitter.emit(&event);
    }

    /// Stage raw typed text.
    ///
    /// Emits `unboxed value change attempted` with the candidate text, then
    /// boxes it (option nodes resolve against the known candidates, falling
    /// back to an unknown value) and emits `value changed`. Validation only
    /// happens later, when the machine is asked to advance.
    pub fn set_unboxed_value(&mut self, raw: Option<String>) {
        self.is_default = false;
        let attempt = StateEvent::UnboxedValueChangeAttempted(raw.clone());
        self.emitter.emit(&attempt);
        self.value = raw
            .as_deref()
            .map(|text| self.template.box_value(text, &self.candidates));
        self.unboxed = raw;
        let event = StateEvent::ValueChanged(self.value.clone());
        self.emitter.emit(&event);
    }

    /// The current filtered suggestion subset.
    pub fn options(&self) -> &[TokenValue] {
        &self.options
    }

    /// Recompute the suggestion subset from the known candidates and emit
    /// `options changed`. No-op on non-option nodes.
    pub fn refresh_options(&mut self, prefix: &str) -> &[TokenValue] {
        if self.kind() != TemplateKind::OptionEntry {
            return &[];
        }
        self.options = StateTemplate::filter_options(&self.candidates, prefix);
        debug!(prefix, matches = self.options.len(), "options refreshed");
        let event = StateEvent::OptionsChanged(self.options.clone());
        self.emitter.emit(&event);
        &self.options
    }

    /// Consult the template's candidate source, then filter and emit as
    /// [`refresh_options`](Self::refresh_options) does.
    ///
    /// For dynamic sources this replaces the known candidate set and is the
    /// engine's only suspension point; for static sources it completes
    /// immediately.
    pub async fn fetch_options(&mut self, prefix: &str) -> &[TokenValue] {
        let fetch = match self.template.option_source() {
            OptionSource::Dynamic(fetch) => Some(Arc::clone(fetch)),
            OptionSource::Static(_) => None,
        };
        if let Some(fetch) = fetch {
            self.candidates = fetch(prefix.to_string()).await;
        }
        self.refresh_options(prefix)
    }

    /// Values already committed at this step, oldest first.
    pub fn archived_values(&self) -> &[TokenValue] {
        &self.archive
    }

    /// Register a listener on this state's event channel.
    pub fn on<F>(&mut self, kind: StateEventKind, callback: F) -> ListenerToken
    where
        F: FnMut(&StateEvent) + Send + 'static,
    {
        self.emitter.on(kind, callback)
    }

    /// Detach a listener; idempotent.
    pub fn off(&mut self, token: ListenerToken) -> bool {
        self.emitter.off(token)
    }

    pub(crate) fn archive_current(&mut self) {
        if let Some(value) = self.value.take() {
            self.archive.push(value);
        }
        self.set_value(None);
    }

    pub(crate) fn unarchive_latest(&mut self) -> Option<()> {
        let value = self.archive.pop()?;
        self.set_value(Some(value));
        Some(())
    }

    pub(crate) fn remove_archived(&mut self, index: usize) -> Option<TokenValue> {
        if index >= self.archive.len() {
            return None;
        }
        Some(self.archive.remove(index))
    }
}
