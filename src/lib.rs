//! Tokenstate: a state machine for structured, multi-step query tokens.
//!
//! An application declares a small grammar of value-entry steps (pick a
//! field, then a value, then optionally more values) as an immutable
//! template graph, and drives a UI one step at a time through a
//! [`TokenStateMachine`] walking that graph. The machine gates every advance
//! on validation, supports backing up exactly one step, accumulates multiple
//! committed values at multivalue nodes, and announces every settled change
//! through per-machine and per-state event channels so disconnected UI
//! strategies stay synchronized without polling.
//!
//! # Core Concepts
//!
//! - **Templates**: the declarative grammar, shared read-only across machines
//! - **States**: the runtime binding of one template inside one machine
//! - **Machine**: the walker: transition, rewind, archive, reset, bind
//! - **Events**: synchronous per-entity publish/subscribe
//!
//! # Example
//!
//! ```rust
//! use tokenstate::builder::TemplateBuilder;
//! use tokenstate::core::TokenValue;
//! use tokenstate::machine::{TokenStateMachine, TransitionOutcome};
//!
//! // Grammar: pick a field, then enter a value.
//! let root = TemplateBuilder::option_entry(
//!     "Choose a field",
//!     vec![TokenValue::new("First Name"), TokenValue::new("Last Name")],
//! )
//! .child(TemplateBuilder::value_entry("Enter a value"))
//! .build()
//! .unwrap();
//!
//! let mut machine = TokenStateMachine::new(root);
//!
//! // Typing "F" narrows the suggestions.
//! let suggestions = machine.state_mut().refresh_options("F").to_vec();
//! assert_eq!(suggestions.len(), 1);
//!
//! // Select the suggestion and advance.
//! machine
//!     .state_mut()
//!     .set_unboxed_value(Some("First Name".to_string()));
//! assert_eq!(machine.transition().unwrap(), TransitionOutcome::Advanced);
//!
//! // Enter a value; the terminal transition completes the token.
//! machine.state_mut().set_unboxed_value(Some("Joe".to_string()));
//! assert_eq!(machine.transition().unwrap(), TransitionOutcome::Completed);
//!
//! let binding = machine.committed();
//! assert_eq!(binding.steps()[0].last().unwrap().key, "First Name");
//! assert_eq!(binding.steps()[1].last().unwrap().key, "Joe");
//! ```

pub mod builder;
pub mod core;
pub mod events;
pub mod machine;
pub mod registry;
pub mod snapshot;

// Re-export commonly used types
pub use crate::core::{
    State, StateTemplate, StepValue, TemplateKind, TokenBinding, TokenValue, Validator,
};
pub use builder::{BuildError, TemplateBuilder};
pub use events::{ListenerToken, MachineEvent, MachineEventKind, StateEvent, StateEventKind};
pub use machine::{StateTransitionError, TokenStateMachine, TransitionOutcome, ValueArchiveError};
pub use registry::StrategyRegistry;
pub use snapshot::{Snapshot, SnapshotError};
