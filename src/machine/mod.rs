//! The token state machine.
//!
//! A [`TokenStateMachine`] is the runtime walker over a template graph: it
//! tracks the current position, gates every advance on validation, supports
//! backing up exactly one step, accumulates archived values at multivalue
//! nodes, and announces every settled change through its event channel.
//!
//! One machine exists per token: one for the token being actively edited,
//! one per committed token, one per suggestion. Machines are reset and
//! reused rather than reconstructed.

mod error;

pub use error::{StateTransitionError, ValueArchiveError};

use crate::core::{State, StateTemplate, StepValue, TokenBinding, TokenValue};
use crate::events::{Emitter, ListenerToken, MachineEvent, MachineEventKind};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// What a successful [`transition`](TokenStateMachine::transition) did.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TransitionOutcome {
    /// The machine advanced into a child state.
    Advanced,
    /// The current state was terminal; the token is finished. What
    /// "finished" means (commit, suggest, ...) is the orchestrator's call;
    /// the machine's position does not change.
    Completed,
}

/// Runtime walker over a token template graph.
///
/// All operations run to completion before any other operation on the same
/// machine begins; the only suspension point is
/// [`bind_values`](Self::bind_values) when a node resolves candidates
/// asynchronously. While one is in flight, no other mutating call may be
/// issued for this machine (a single-writer contract, not a lock).
///
/// # Example
///
/// ```rust
/// use tokenstate::builder::TemplateBuilder;
/// use tokenstate::core::TokenValue;
/// use tokenstate::machine::{TokenStateMachine, TransitionOutcome};
///
/// let root = TemplateBuilder::option_entry(
///     "Choose a field",
///     vec![TokenValue::new("First Name"), TokenValue::new("Last Name")],
/// )
/// .child(TemplateBuilder::value_entry("Enter a value"))
/// .build()
/// .unwrap();
///
/// let mut machine = TokenStateMachine::new(root);
/// machine.state_mut().set_unboxed_value(Some("First Name".to_string()));
/// assert_eq!(machine.transition().unwrap(), TransitionOutcome::Advanced);
///
/// machine.state_mut().set_unboxed_value(Some("Joe".to_string()));
/// assert_eq!(machine.transition().unwrap(), TransitionOutcome::Completed);
/// ```
#[derive(Debug)]
pub struct TokenStateMachine {
    id: Uuid,
    root: Arc<StateTemplate>,
    path: Vec<State>,
    emitter: Emitter<MachineEvent>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TokenStateMachine {
    /// Create a machine positioned at the graph root with no value.
    pub fn new(root: Arc<StateTemplate>) -> Self {
        let now = Utc::now();
        let path = vec![State::new(Arc::clone(&root))];
        let machine = Self {
            id: Uuid::new_v4(),
            root,
            path,
            emitter: Emitter::new(),
            created_at: now,
            updated_at: now,
        };
        debug!(machine = %machine.id, "machine created");
        machine
    }

    /// Unique id of this machine instance.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// When this machine was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When this machine last changed.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// The state bound to the graph root; always exists.
    pub fn root_state(&self) -> &State {
        &self.path[0]
    }

    /// The state the user is actively filling.
    pub fn state(&self) -> &State {
        self.path.last().expect("machine always has a current state")
    }

    /// Mutable access to the current state, for staging values.
    pub fn state_mut(&mut self) -> &mut State {
        self.path
            .last_mut()
            .expect("machine always has a current state")
    }

    /// Previously committed states along the path from root to current.
    pub fn history(&self) -> &[State] {
        &self.path[..self.path.len() - 1]
    }

    /// Number of completed transitions since the last reset.
    pub fn depth(&self) -> usize {
        self.path.len() - 1
    }

    /// Boxed values committed at prior steps, in path order.
    pub fn committed_values(&self) -> Vec<TokenValue> {
        self.history()
            .iter()
            .filter_map(|state| state.value().cloned())
            .collect()
    }

    /// Display name of the current state, resolved against prior values.
    pub fn current_name(&self) -> String {
        let prior = self.committed_values();
        self.state().name(&prior)
    }

    /// True when the current state is terminal and holds a valid value.
    pub fn is_complete(&self) -> bool {
        self.state().template().is_terminal() && self.state().is_valid()
    }

    /// Register a listener on this machine's event channel.
    pub fn on<F>(&mut self, kind: MachineEventKind, callback: F) -> ListenerToken
    where
        F: FnMut(&MachineEvent) + Send + 'static,
    {
        self.emitter.on(kind, callback)
    }

    /// Detach a listener; idempotent.
    pub fn off(&mut self, token: ListenerToken) -> bool {
        self.emitter.off(token)
    }

    /// Advance into the first child of the current template.
    ///
    /// Fails with [`StateTransitionError`] when the current state does not
    /// validate; the position is unchanged and `state change failed` is
    /// emitted. On success the machine either advances (emitting
    /// `state changed`) or, at a terminal node, reports
    /// [`TransitionOutcome::Completed`] with its position unchanged.
    pub fn transition(&mut self) -> Result<TransitionOutcome, StateTransitionError> {
        self.transition_into(0)
    }

    /// Advance into the child at `index`, for grammars with branching
    /// continuations. `transition()` is `transition_into(0)`.
    pub fn transition_into(
        &mut self,
        index: usize,
    ) -> Result<TransitionOutcome, StateTransitionError> {
        if !self.state().is_valid() {
            let reason = self.state().validation_message().to_string();
            return Err(self.reject_transition(StateTransitionError::ValidationFailed { reason }));
        }

        let children = self.state().template().children();
        let available = children.len();
        let child = children.get(index).cloned();

        if available == 0 {
            if index > 0 {
                return Err(self.reject_transition(StateTransitionError::UnknownBranch {
                    index,
                    available: 0,
                }));
            }
            self.touch();
            debug!(machine = %self.id, depth = self.depth(), "token completed");
            self.emitter.emit(&MachineEvent::StateChanged);
            return Ok(TransitionOutcome::Completed);
        }

        let Some(template) = child else {
            return Err(
                self.reject_transition(StateTransitionError::UnknownBranch { index, available })
            );
        };

        self.path.push(State::new(template));
        self.touch();
        debug!(machine = %self.id, state = %self.current_name(), depth = self.depth(), "advanced");
        self.emitter.emit(&MachineEvent::StateChanged);
        Ok(TransitionOutcome::Advanced)
    }

    /// Move back exactly one step, discarding the abandoned step's value.
    ///
    /// With empty history the current (root) state is returned unchanged and
    /// no event fires; that is the "nothing left to rewind" signal.
    pub fn rewind(&mut self) -> &State {
        if self.path.len() > 1 {
            self.path.pop();
            self.touch();
            debug!(machine = %self.id, depth = self.depth(), "rewound");
            self.emitter.emit(&MachineEvent::StateChanged);
        }
        self.state()
    }

    /// Commit the current value into the node's archive and clear it so a
    /// new value can be entered. The position does not change; only
    /// [`transition`](Self::transition) moves the grammar forward.
    pub fn archive(&mut self) -> Result<(), ValueArchiveError> {
        if !self.state().template().is_multivalue() {
            let state = self.current_name();
            return Err(self.reject_archive(ValueArchiveError::NotMultivalue { state }));
        }
        if !self.state().is_valid() {
            let reason = self.state().validation_message().to_string();
            return Err(self.reject_archive(ValueArchiveError::InvalidValue { reason }));
        }
        self.state_mut().archive_current();
        self.touch();
        self.emitter.emit(&MachineEvent::StateChanged);
        Ok(())
    }

    /// Pop the most recently archived value back into the current editable
    /// value.
    pub fn unarchive(&mut self) -> Result<(), ValueArchiveError> {
        if !self.state().template().is_multivalue() {
            let state = self.current_name();
            return Err(self.reject_archive(ValueArchiveError::NotMultivalue { state }));
        }
        match self.state_mut().unarchive_latest() {
            Some(()) => {
                self.touch();
                self.emitter.emit(&MachineEvent::StateChanged);
                Ok(())
            }
            None => Err(self.reject_archive(ValueArchiveError::EmptyArchive)),
        }
    }

    /// Remove one archived entry, preserving the order of the rest.
    pub fn remove_archived_value(&mut self, index: usize) -> Result<(), ValueArchiveError> {
        if !self.state().template().is_multivalue() {
            let state = self.current_name();
            return Err(self.reject_archive(ValueArchiveError::NotMultivalue { state }));
        }
        let len = self.state().archived_values().len();
        match self.state_mut().remove_archived(index) {
            Some(_) => {
                self.touch();
                self.emitter.emit(&MachineEvent::StateChanged);
                Ok(())
            }
            None => Err(self.reject_archive(ValueArchiveError::IndexOutOfRange { index, len })),
        }
    }

    /// Return to the root with empty history and no value, ready for reuse.
    pub fn reset(&mut self) {
        self.reset_silent();
        debug!(machine = %self.id, "reset");
        self.emitter.emit(&MachineEvent::StateChanged);
    }

    /// Pre-fill the machine from an externally supplied structured value.
    ///
    /// Resets, then walks the graph consuming one step of `binding` per
    /// node, resolving asynchronous candidate sources where a node has one
    /// and validating each step as it binds. `Many` steps archive all but
    /// their last value (multivalue nodes only). Resolves once the terminal
    /// node is reached; on any rejection the machine is reset and the error
    /// returned.
    ///
    /// With `trigger_events = false` the per-step `state changed` emissions
    /// are suppressed (silent pre-population); one final emission still
    /// announces the settled machine.
    pub async fn bind_values(
        &mut self,
        binding: &TokenBinding,
        trigger_events: bool,
    ) -> Result<(), StateTransitionError> {
        self.reset_silent();
        match self.bind_steps(binding, trigger_events).await {
            Ok(()) => {
                self.touch();
                debug!(machine = %self.id, steps = binding.len(), "values bound");
                self.emitter.emit(&MachineEvent::StateChanged);
                Ok(())
            }
            Err(err) => {
                self.reset_silent();
                Err(self.reject_transition(err))
            }
        }
    }

    /// Project the machine back into the external-value shape: one step per
    /// node along the committed path, stopping at the first unfilled state.
    /// Multivalue steps are canonicalized to [`StepValue::Many`].
    pub fn committed(&self) -> TokenBinding {
        let mut binding = TokenBinding::new();
        for state in &self.path {
            if state.template().is_multivalue() {
                let mut values = state.archived_values().to_vec();
                if let Some(value) = state.value() {
                    values.push(value.clone());
                }
                if values.is_empty() {
                    break;
                }
                binding.push(StepValue::Many(values));
            } else if let Some(value) = state.value() {
                binding.push(StepValue::Single(value.clone()));
            } else {
                break;
            }
        }
        binding
    }

    fn reset_silent(&mut self) {
        self.path.clear();
        self.path.push(State::new(Arc::clone(&self.root)));
        self.touch();
    }

    async fn bind_steps(
        &mut self,
        binding: &TokenBinding,
        trigger_events: bool,
    ) -> Result<(), StateTransitionError> {
        let total = binding.len();
        if total == 0 {
            return Err(StateTransitionError::BindingTooShort { consumed: 0 });
        }
        for (index, step) in binding.steps().iter().enumerate() {
            match step {
                StepValue::Single(value) => {
                    self.bind_one(value).await;
                    self.ensure_bound_valid()?;
                }
                StepValue::Many(values) => {
                    if !self.state().template().is_multivalue() {
                        return Err(StateTransitionError::BindingNotMultivalue {
                            state: self.current_name(),
                        });
                    }
                    let Some((last, rest)) = values.split_last() else {
                        return Err(StateTransitionError::BindingRejected {
                            state: self.current_name(),
                            reason: "no values supplied for multivalue step".to_string(),
                        });
                    };
                    for value in rest {
                        self.bind_one(value).await;
                        self.ensure_bound_valid()?;
                        self.state_mut().archive_current();
                    }
                    self.bind_one(last).await;
                    self.ensure_bound_valid()?;
                }
            }

            let is_last = index + 1 == total;
            if self.state().template().is_terminal() {
                if !is_last {
                    return Err(StateTransitionError::BindingTooLong {
                        remaining: total - index - 1,
                    });
                }
            } else if is_last {
                return Err(StateTransitionError::BindingTooShort { consumed: total });
            } else {
                self.advance_for_binding(trigger_events);
            }
        }
        Ok(())
    }

    async fn bind_one(&mut self, value: &TokenValue) {
        if self.state().template().option_source().is_dynamic() {
            self.state_mut().fetch_options(&value.key).await;
        }
        self.state_mut().set_value(Some(value.clone()));
    }

    fn ensure_bound_valid(&self) -> Result<(), StateTransitionError> {
        if self.state().is_valid() {
            Ok(())
        } else {
            Err(StateTransitionError::BindingRejected {
                state: self.current_name(),
                reason: self.state().validation_message().to_string(),
            })
        }
    }

    fn advance_for_binding(&mut self, trigger_events: bool) {
        let template = Arc::clone(&self.state().template().children()[0]);
        self.path.push(State::new(template));
        self.touch();
        if trigger_events {
            self.emitter.emit(&MachineEvent::StateChanged);
        }
    }

    fn reject_transition(&mut self, err: StateTransitionError) -> StateTransitionError {
        warn!(machine = %self.id, error = %err, "transition rejected");
        self.emitter.emit(&MachineEvent::StateChangeFailed {
            message: err.to_string(),
        });
        err
    }

    fn reject_archive(&mut self, err: ValueArchiveError) -> ValueArchiveError {
        warn!(machine = %self.id, error = %err, "archive operation rejected");
        self.emitter.emit(&MachineEvent::StateChangeFailed {
            message: err.to_string(),
        });
        err
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::TemplateBuilder;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc as StdArc, Mutex};

    fn name_grammar() -> Arc<StateTemplate> {
        TemplateBuilder::option_entry(
            "Choose a field",
            vec![TokenValue::new("First Name"), TokenValue::new("Last Name")],
        )
        .child(TemplateBuilder::value_entry("Enter a value"))
        .build()
        .unwrap()
    }

    fn tag_grammar() -> Arc<StateTemplate> {
        TemplateBuilder::option_entry(
            "Tag",
            vec![
                TokenValue::new("red"),
                TokenValue::new("green"),
                TokenValue::new("blue"),
            ],
        )
        .multivalue(true)
        .build()
        .unwrap()
    }

    #[test]
    fn new_machine_sits_at_root() {
        let machine = TokenStateMachine::new(name_grammar());
        assert_eq!(machine.depth(), 0);
        assert!(machine.history().is_empty());
        assert!(machine.state().is_default());
    }

    #[test]
    fn simple_string_walk() {
        let mut machine = TokenStateMachine::new(name_grammar());

        let narrowed = machine.state_mut().refresh_options("F").to_vec();
        assert_eq!(narrowed.len(), 1);
        assert_eq!(narrowed[0].key, "First Name");

        machine
            .state_mut()
            .set_unboxed_value(Some("First Name".to_string()));
        assert_eq!(machine.transition().unwrap(), TransitionOutcome::Advanced);
        assert_eq!(machine.current_name(), "Enter a value");

        machine.state_mut().set_unboxed_value(Some("Joe".to_string()));
        assert_eq!(machine.transition().unwrap(), TransitionOutcome::Completed);
        assert!(machine.is_complete());

        let binding = machine.committed();
        assert_eq!(binding.len(), 2);
        assert_eq!(binding.steps()[0].last().unwrap().key, "First Name");
        assert_eq!(binding.steps()[1].last().unwrap().key, "Joe");
    }

    #[test]
    fn invalid_state_blocks_transition() {
        let mut machine = TokenStateMachine::new(name_grammar());
        machine
            .state_mut()
            .set_unboxed_value(Some("Middle Name".to_string()));

        let err = machine.transition().unwrap_err();
        assert_eq!(
            err,
            StateTransitionError::ValidationFailed {
                reason: "Value must be one of the suggested options".to_string(),
            }
        );
        assert_eq!(machine.depth(), 0);
        assert_eq!(
            machine.state().value().map(|v| v.key.as_str()),
            Some("Middle Name")
        );
    }

    #[test]
    fn numeric_entry_gates_on_parseability() {
        let root = TemplateBuilder::numeric_entry().build().unwrap();
        let mut machine = TokenStateMachine::new(root);

        machine.state_mut().set_unboxed_value(Some("abc".to_string()));
        assert!(!machine.state().is_valid());
        let err = machine.transition().unwrap_err();
        assert!(matches!(err, StateTransitionError::ValidationFailed { .. }));
        assert_eq!(machine.depth(), 0);

        machine.state_mut().set_unboxed_value(Some("42".to_string()));
        assert_eq!(machine.transition().unwrap(), TransitionOutcome::Completed);
    }

    #[test]
    fn rewind_undoes_one_transition() {
        let mut machine = TokenStateMachine::new(name_grammar());
        machine
            .state_mut()
            .set_unboxed_value(Some("Last Name".to_string()));
        machine.transition().unwrap();
        machine.state_mut().set_unboxed_value(Some("Doe".to_string()));

        let state = machine.rewind();
        assert_eq!(state.value().map(|v| v.key.as_str()), Some("Last Name"));
        assert_eq!(machine.depth(), 0);
    }

    #[test]
    fn rewind_at_root_is_a_signal_not_a_move() {
        let mut machine = TokenStateMachine::new(name_grammar());
        let events = StdArc::new(AtomicUsize::new(0));

        let counter = StdArc::clone(&events);
        machine.on(MachineEventKind::StateChanged, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        machine.rewind();
        assert_eq!(machine.depth(), 0);
        assert_eq!(events.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn archive_rejected_off_multivalue_nodes() {
        let mut machine = TokenStateMachine::new(name_grammar());
        machine
            .state_mut()
            .set_unboxed_value(Some("First Name".to_string()));

        let err = machine.archive().unwrap_err();
        assert!(matches!(err, ValueArchiveError::NotMultivalue { .. }));
        assert_eq!(
            machine.state().value().map(|v| v.key.as_str()),
            Some("First Name")
        );
    }

    #[test]
    fn archive_accumulates_without_advancing() {
        let mut machine = TokenStateMachine::new(tag_grammar());

        machine.state_mut().set_unboxed_value(Some("red".to_string()));
        machine.archive().unwrap();
        machine.state_mut().set_unboxed_value(Some("blue".to_string()));
        machine.archive().unwrap();

        assert_eq!(machine.depth(), 0);
        assert_eq!(machine.state().archived_values().len(), 2);
        assert!(machine.state().value().is_none());
    }

    #[test]
    fn archive_requires_a_valid_value() {
        let mut machine = TokenStateMachine::new(tag_grammar());
        machine
            .state_mut()
            .set_unboxed_value(Some("purple".to_string()));

        let err = machine.archive().unwrap_err();
        assert!(matches!(err, ValueArchiveError::InvalidValue { .. }));
        assert!(machine.state().archived_values().is_empty());
    }

    #[test]
    fn unarchive_restores_most_recent() {
        let mut machine = TokenStateMachine::new(tag_grammar());
        machine.state_mut().set_unboxed_value(Some("red".to_string()));
        machine.archive().unwrap();
        machine.state_mut().set_unboxed_value(Some("green".to_string()));
        machine.archive().unwrap();

        machine.unarchive().unwrap();
        assert_eq!(machine.state().value().map(|v| v.key.as_str()), Some("green"));
        assert_eq!(machine.state().archived_values().len(), 1);
    }

    fn set_and_archive(machine: &mut TokenStateMachine, key: &str) {
        machine.state_mut().set_unboxed_value(Some(key.to_string()));
        machine.archive().unwrap();
    }

    #[test]
    fn unarchive_on_empty_archive_fails() {
        let mut machine = TokenStateMachine::new(tag_grammar());
        let err = machine.unarchive().unwrap_err();
        assert_eq!(err, ValueArchiveError::EmptyArchive);
    }

    #[test]
    fn remove_archived_value_preserves_order() {
        let mut machine = TokenStateMachine::new(tag_grammar());
        for key in ["red", "green", "blue"] {
            set_and_archive(&mut machine, key);
        }

        machine.remove_archived_value(1).unwrap();
        let remaining: Vec<&str> = machine
            .state()
            .archived_values()
            .iter()
            .map(|v| v.key.as_str())
            .collect();
        assert_eq!(remaining, vec!["red", "blue"]);

        let err = machine.remove_archived_value(7).unwrap_err();
        assert_eq!(err, ValueArchiveError::IndexOutOfRange { index: 7, len: 2 });
        assert_eq!(machine.state().archived_values().len(), 2);
    }

    #[test]
    fn reset_returns_to_root() {
        let mut machine = TokenStateMachine::new(name_grammar());
        machine
            .state_mut()
            .set_unboxed_value(Some("First Name".to_string()));
        machine.transition().unwrap();

        machine.reset();
        assert_eq!(machine.depth(), 0);
        assert!(machine.state().value().is_none());
        assert!(machine.state().is_default());
    }

    #[test]
    fn failed_transition_emits_failure_event() {
        let mut machine = TokenStateMachine::new(name_grammar());
        let message = StdArc::new(Mutex::new(String::new()));

        let sink = StdArc::clone(&message);
        machine.on(MachineEventKind::StateChangeFailed, move |event| {
            if let MachineEvent::StateChangeFailed { message } = event {
                *sink.lock().unwrap() = message.clone();
            }
        });

        machine.state_mut().set_unboxed_value(Some("Nope".to_string()));
        machine.transition().unwrap_err();
        assert_eq!(
            *message.lock().unwrap(),
            "Value must be one of the suggested options"
        );
    }

    #[test]
    fn observer_sees_machine_already_settled() {
        let root = name_grammar();
        let mut machine = TokenStateMachine::new(root);
        let emissions = StdArc::new(AtomicUsize::new(0));

        // emission happens inside transition(), after the position moved
        let counter = StdArc::clone(&emissions);
        machine.on(MachineEventKind::StateChanged, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        machine
            .state_mut()
            .set_unboxed_value(Some("First Name".to_string()));
        machine.transition().unwrap();

        assert_eq!(machine.depth(), 1);
        assert_eq!(emissions.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn transition_into_rejects_unknown_branch() {
        let mut machine = TokenStateMachine::new(name_grammar());
        machine
            .state_mut()
            .set_unboxed_value(Some("First Name".to_string()));

        let err = machine.transition_into(3).unwrap_err();
        assert_eq!(
            err,
            StateTransitionError::UnknownBranch {
                index: 3,
                available: 1,
            }
        );
        assert_eq!(machine.depth(), 0);
    }

    #[test]
    fn derived_name_resolves_against_history() {
        let root = TemplateBuilder::option_entry(
            "Choose a field",
            vec![TokenValue::new("First Name"), TokenValue::new("Last Name")],
        )
        .child(
            TemplateBuilder::value_entry("placeholder").derived_name(|prior| {
                match prior.last() {
                    Some(field) => format!("Enter a value for {}", field.key),
                    None => "Enter a value".to_string(),
                }
            }),
        )
        .build()
        .unwrap();

        let mut machine = TokenStateMachine::new(root);
        machine
            .state_mut()
            .set_unboxed_value(Some("Last Name".to_string()));
        machine.transition().unwrap();

        assert_eq!(machine.current_name(), "Enter a value for Last Name");
    }
}
