//! Core token grammar types.
//!
//! This module contains the declarative and runtime halves of a token:
//! - Immutable grammar templates ([`StateTemplate`]) and their variant tags
//! - Validator predicates with failure messages
//! - Boxed values and whole-token bindings
//! - The runtime [`State`] bound to one template inside one machine
//!
//! Templates are pure data shared across machines; all mutation happens on
//! states and machines.

mod state;
mod template;
mod validator;
mod value;

pub use state::State;
pub use template::{
    NameResolver, OptionFetch, OptionFuture, OptionSource, StateTemplate, TemplateKind,
    MAX_SUGGESTIONS,
};
pub use validator::Validator;
pub use value::{StepValue, TokenBinding, TokenValue};
