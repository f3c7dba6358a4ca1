// SPDX-License-Identifier: MIT OR Apache-2.0
//! Notifications exposed to the surrounding application.

use crate::connection::Connection;
use crate::graph::Graph;
use crate::id::{ConnectionId, NodeId};
use crate::viewport::Viewport;

/// Read-only editor notification
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    /// A node was clicked without dragging
    NodeTapped(NodeId),
    /// A node was tapped twice in quick succession
    NodeDoubleTapped(NodeId),
    /// A node drag passed the drag threshold
    DragStarted(Vec<NodeId>),
    /// A node drag ended; `committed` is false when cancelled
    DragStopped {
        /// Dragged nodes
        nodes: Vec<NodeId>,
        /// Whether positions were committed
        committed: bool,
    },
    /// A connection was committed
    ConnectionCreated(Connection),
    /// A connection was removed (directly or by cascade)
    ConnectionDeleted(ConnectionId),
    /// The selection changed
    SelectionChanged {
        /// Selected nodes
        nodes: Vec<NodeId>,
        /// Selected connections
        connections: Vec<ConnectionId>,
    },
    /// Pan or zoom changed
    ViewportChanged(Viewport),
}

type Listener = Box<dyn FnMut(&EditorEvent)>;

/// Caller hook deciding whether a connection gesture may complete
pub type ConnectionValidator = Box<dyn Fn(&Connection, &Graph) -> bool>;

/// Fan-out of editor events to listeners
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<Listener>,
}

impl EventBus {
    /// No listeners
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener
    pub fn listen(&mut self, listener: impl FnMut(&EditorEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Number of listeners
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Whether nobody listens
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Deliver an event to every listener in registration order
    pub fn emit(&mut self, event: &EditorEvent) {
        tracing::trace!(?event, "editor event");
        for listener in &mut self.listeners {
            listener(event);
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus").field("listeners", &self.listeners.len()).finish()
    }
}
