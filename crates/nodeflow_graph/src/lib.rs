// SPDX-License-Identifier: MIT OR Apache-2.0
//! Headless node-graph canvas engine.
//!
//! This crate provides the model and interaction core behind a node editor:
//! - Graph store with transactions, diffs, undo/redo and structural invariants
//! - Viewport transforms, spatial hit-testing and snapping
//! - Connection routing (straight, step, smoothstep, bezier)
//! - Pointer/keyboard interaction state machine
//! - Lazily attached extensions (minimap, autopan, level of detail, stats, debug)
//! - JSON/RON snapshots and RON engine config
//!
//! ## Architecture
//!
//! [`GraphEditor`] owns a [`GraphStore`] and everything derived from it. All
//! mutations go through the store as transactions; each committed
//! [`GraphDiff`] is fanned out to the spatial index, the routed paths, the
//! selection, the extensions and the event listeners, in that order.
//! Rendering is left to the host, which reads node bounds, routed paths and
//! extension overlays.

pub mod config;
pub mod connection;
pub mod diff;
pub mod editor;
pub mod error;
pub mod events;
pub mod extension;
pub mod extensions;
pub mod geometry;
pub mod graph;
pub mod history;
pub mod id;
pub mod interaction;
pub mod node;
pub mod port;
pub mod routing;
pub mod selection;
pub mod snap;
pub mod snapshot;
pub mod spatial;
pub mod store;
pub mod viewport;

pub use config::{EngineConfig, ExtensionConfig, MarqueeMode};
pub use connection::{Connection, Endpoint};
pub use diff::{GraphChange, GraphDiff};
pub use editor::{CanvasHit, GraphEditor};
pub use error::{GraphConstraintViolation, InvalidGesture, SerializationError};
pub use events::EditorEvent;
pub use extension::{Extension, ExtensionRegistry, Overlay};
pub use geometry::{Point, Rect, Size};
pub use graph::Graph;
pub use id::{ConnectionId, NodeId, PortId};
pub use interaction::{InteractionMode, Key, Modifiers, PointerButton, PointerEvent, ResizeHandle};
pub use node::{Node, NodePatch};
pub use port::{Port, PortDirection, PortSide};
pub use routing::{LinkStyle, RoutedPath, Router};
pub use selection::Selection;
pub use snapshot::GraphSnapshot;
pub use spatial::SpatialIndex;
pub use store::{CapacityPolicy, GraphStore, Transaction};
pub use viewport::Viewport;
