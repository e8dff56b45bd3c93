//! Synchronous publish/subscribe channels.
//!
//! Every machine and every runtime state owns its own [`Emitter`]; there is
//! no global registry. Dispatch is single-threaded and happens inside the
//! mutating call that caused the event, so an observer reacting to
//! "state changed" always sees the machine already settled in its new
//! position.

use crate::core::TokenValue;
use std::fmt;

/// An event type dispatched through an [`Emitter`].
///
/// `Kind` is the subscription key: listeners register for one kind and only
/// receive events of that kind.
pub trait EmitterEvent {
    /// Discriminant used to route events to listeners.
    type Kind: Copy + PartialEq + fmt::Debug;

    /// The discriminant of this event.
    fn kind(&self) -> Self::Kind;
}

/// Handle returned by [`Emitter::on`], used to detach the listener.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ListenerToken(u64);

struct Listener<E: EmitterEvent> {
    token: ListenerToken,
    kind: E::Kind,
    callback: Box<dyn FnMut(&E) + Send>,
}

/// Per-entity event channel with synchronous dispatch.
///
/// Registration hands back a [`ListenerToken`]; detaching through the token
/// is idempotent and takes effect immediately: a detached listener never
/// sees another event.
///
/// # Example
///
/// ```rust
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use tokenstate::events::{Emitter, MachineEvent, MachineEventKind};
///
/// let mut emitter: Emitter<MachineEvent> = Emitter::new();
/// let seen = Arc::new(AtomicUsize::new(0));
///
/// let counter = Arc::clone(&seen);
/// let token = emitter.on(MachineEventKind::StateChanged, move |_| {
///     counter.fetch_add(1, Ordering::SeqCst);
/// });
///
/// emitter.emit(&MachineEvent::StateChanged);
/// emitter.off(token);
/// emitter.emit(&MachineEvent::StateChanged);
///
/// assert_eq!(seen.load(Ordering::SeqCst), 1);
/// ```
pub struct Emitter<E: EmitterEvent> {
    next_id: u64,
    listeners: Vec<Listener<E>>,
}

impl<E: EmitterEvent> Emitter<E> {
    /// Create a channel with no listeners.
    pub fn new() -> Self {
        Self {
            next_id: 0,
            listeners: Vec::new(),
        }
    }

    /// Register a listener for one event kind.
    pub fn on<F>(&mut self, kind: E::Kind, callback: F) -> ListenerToken
    where
        F: FnMut(&E) + Send + 'static,
    {
        let token = ListenerToken(self.next_id);
        self.next_id += 1;
        self.listeners.push(Listener {
            token,
            kind,
            callback: Box::new(callback),
        });
        token
    }

    /// Detach a listener. Returns `false` when the token was already
    /// detached or never registered here; detaching twice is a no-op.
    pub fn off(&mut self, token: ListenerToken) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.token != token);
        self.listeners.len() != before
    }

    /// Dispatch an event to every listener registered for its kind, in
    /// registration order.
    pub fn emit(&mut self, event: &E) {
        let kind = event.kind();
        for listener in self.listeners.iter_mut() {
            if listener.kind == kind {
                (listener.callback)(event);
            }
        }
    }

    /// Number of attached listeners across all kinds.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl<E: EmitterEvent> Default for Emitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: EmitterEvent> fmt::Debug for Emitter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Events emitted by a [`TokenStateMachine`](crate::machine::TokenStateMachine).
#[derive(Clone, PartialEq, Debug)]
pub enum MachineEvent {
    /// The position or a committed value advanced or rewound.
    StateChanged,
    /// A transition or archive attempt was rejected.
    StateChangeFailed {
        /// Human-readable rejection reason.
        message: String,
    },
}

/// Subscription kinds for [`MachineEvent`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MachineEventKind {
    StateChanged,
    StateChangeFailed,
}

impl EmitterEvent for MachineEvent {
    type Kind = MachineEventKind;

    fn kind(&self) -> MachineEventKind {
        match self {
            MachineEvent::StateChanged => MachineEventKind::StateChanged,
            MachineEvent::StateChangeFailed { .. } => MachineEventKind::StateChangeFailed,
        }
    }
}

/// Events emitted by a runtime [`State`](crate::core::State).
#[derive(Clone, PartialEq, Debug)]
pub enum StateEvent {
    /// The filtered suggestion subset was recomputed.
    OptionsChanged(Vec<TokenValue>),
    /// A boxed value was committed (or cleared) at this node.
    ValueChanged(Option<TokenValue>),
    /// The UI proposed raw text that has not been committed yet.
    UnboxedValueChangeAttempted(Option<String>),
}

/// Subscription kinds for [`StateEvent`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StateEventKind {
    OptionsChanged,
    ValueChanged,
    UnboxedValueChangeAttempted,
}

impl EmitterEvent for StateEvent {
    type Kind = StateEventKind;

    fn kind(&self) -> StateEventKind {
        match self {
            StateEvent::OptionsChanged(_) => StateEventKind::OptionsChanged,
            StateEvent::ValueChanged(_) => StateEventKind::ValueChanged,
            StateEvent::UnboxedValueChangeAttempted(_) => {
                StateEventKind::UnboxedValueChangeAttempted
            }
        }
    }
}
