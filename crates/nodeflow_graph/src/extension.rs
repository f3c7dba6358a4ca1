// SPDX-License-Identifier: MIT OR Apache-2.0
//! Key-addressed registry of optional engine behaviours.
//!
//! Extensions are registered as factories and only instantiated on first
//! lookup, or when the editor is built if their config marks them eager. Hook
//! dispatch and overlay collection only reach attached instances. Hooks never
//! touch the engine directly; they hand back [`ExtensionEffect`]s that the
//! editor applies.

use crate::diff::GraphDiff;
use crate::geometry::{Point, Rect};
use crate::graph::Graph;
use crate::spatial::SpatialIndex;
use crate::viewport::Viewport;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use std::any::Any;

/// Read-only engine state handed to every hook
#[derive(Debug, Clone, Copy)]
pub struct ExtensionContext<'a> {
    /// Current graph
    pub graph: &'a Graph,
    /// Current camera
    pub viewport: &'a Viewport,
    /// Current hit-test index
    pub spatial: &'a SpatialIndex,
}

/// Kind of pointer gesture in progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureKind {
    /// Moving nodes
    DragNodes,
    /// Creating a connection
    Connect,
    /// Rubber-band selection
    Marquee,
    /// Resizing a node
    Resize,
    /// Panning the canvas
    Pan,
}

/// Gesture lifecycle as seen by extensions; cursors are in screen pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEvent {
    /// A gesture passed its threshold
    Started {
        /// Gesture kind
        kind: GestureKind,
        /// Cursor position
        cursor: Point,
    },
    /// The cursor moved during a gesture
    Moved {
        /// Gesture kind
        kind: GestureKind,
        /// Cursor position
        cursor: Point,
    },
    /// The gesture finished
    Ended {
        /// Gesture kind
        kind: GestureKind,
        /// False when cancelled or aborted
        committed: bool,
    },
}

/// Request from an extension to the engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExtensionEffect {
    /// Pan the viewport by a screen-space delta
    PanViewport(Point),
}

/// Coordinate space of overlay geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlaySpace {
    /// Screen pixels
    Screen,
    /// World units
    World,
}

/// What an overlay rectangle represents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayRole {
    /// Background frame
    Frame,
    /// A node
    Node,
    /// The visible area
    Viewport,
    /// A spatial-index cell
    Cell,
    /// A hit-test rectangle
    HitRect,
}

/// One overlay primitive
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayPrimitive {
    /// Rectangle
    Rect {
        /// Geometry
        rect: Rect,
        /// Meaning
        role: OverlayRole,
    },
    /// Text label
    Label {
        /// Top-left of the text
        at: Point,
        /// Text
        text: String,
    },
}

/// Geometry contributed by one extension for the renderer
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    /// Contributing extension
    pub key: String,
    /// Space the primitives are expressed in
    pub space: OverlaySpace,
    /// Primitives in paint order
    pub primitives: Vec<OverlayPrimitive>,
}

/// Optional behaviour attached to an editor. Every hook defaults to a no-op.
pub trait Extension: Any {
    /// Registry key
    fn key(&self) -> &str;

    /// Called once when the extension is instantiated
    fn on_attach(&mut self, _ctx: &ExtensionContext<'_>) {}

    /// Called after every committed transaction
    fn on_graph_change(&mut self, _diff: &GraphDiff, _ctx: &ExtensionContext<'_>) -> Vec<ExtensionEffect> {
        Vec::new()
    }

    /// Called after pan or zoom changed
    fn on_viewport_change(&mut self, _ctx: &ExtensionContext<'_>) -> Vec<ExtensionEffect> {
        Vec::new()
    }

    /// Called for gesture lifecycle events
    fn on_gesture(&mut self, _event: &GestureEvent, _ctx: &ExtensionContext<'_>) -> Vec<ExtensionEffect> {
        Vec::new()
    }

    /// Called once per frame with the elapsed seconds
    fn on_frame(&mut self, _dt: f32, _ctx: &ExtensionContext<'_>) -> Vec<ExtensionEffect> {
        Vec::new()
    }

    /// Geometry to paint on top of the graph
    fn overlay(&self, _ctx: &ExtensionContext<'_>) -> Option<Overlay> {
        None
    }

    /// Downcast support
    fn as_any(&self) -> &dyn Any;
}

/// Builds an extension from its options
pub type ExtensionFactory = Box<dyn Fn(&serde_json::Value) -> Box<dyn Extension>>;

/// Deserialize extension options, falling back to defaults on `null` or bad input
pub fn parse_options<T: DeserializeOwned + Default>(key: &str, options: &serde_json::Value) -> T {
    if options.is_null() {
        return T::default();
    }
    match serde_json::from_value(options.clone()) {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::warn!(extension = key, %err, "invalid extension options, using defaults");
            T::default()
        }
    }
}

struct Slot {
    factory: ExtensionFactory,
    options: serde_json::Value,
    instance: Option<Box<dyn Extension>>,
}

/// Registered extensions in registration order
#[derive(Default)]
pub struct ExtensionRegistry {
    slots: IndexMap<String, Slot>,
}

impl ExtensionRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory; replaces (and detaches) an earlier one under the same key
    pub fn register<F>(&mut self, key: impl Into<String>, options: serde_json::Value, factory: F)
    where
        F: Fn(&serde_json::Value) -> Box<dyn Extension> + 'static,
    {
        let key = key.into();
        let slot = Slot {
            factory: Box::new(factory),
            options,
            instance: None,
        };
        if self.slots.insert(key.clone(), slot).is_some() {
            tracing::debug!(extension = %key, "extension re-registered");
        }
    }

    /// Remove an extension; `false` when it was not registered
    pub fn unregister(&mut self, key: &str) -> bool {
        self.slots.shift_remove(key).is_some()
    }

    /// Registered keys in order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    /// Number of registered extensions
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether a key is registered
    pub fn is_registered(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    /// Whether a key has been instantiated
    pub fn is_attached(&self, key: &str) -> bool {
        self.slots.get(key).is_some_and(|slot| slot.instance.is_some())
    }

    /// Look up an extension, attaching it on first access
    pub fn get(&mut self, key: &str, ctx: &ExtensionContext<'_>) -> Option<&mut (dyn Extension + 'static)> {
        let slot = self.slots.get_mut(key)?;
        Self::ensure_attached(key, slot, ctx);
        slot.instance.as_deref_mut()
    }

    /// Look up an already attached extension without attaching it
    pub fn attached(&self, key: &str) -> Option<&dyn Extension> {
        self.slots.get(key)?.instance.as_deref()
    }

    /// Typed lookup, attaching on first access
    pub fn get_as<T: Extension>(&mut self, key: &str, ctx: &ExtensionContext<'_>) -> Option<&T> {
        let extension = self.get(key, ctx)?;
        extension.as_any().downcast_ref::<T>()
    }

    /// Typed lookup of an attached extension
    pub fn attached_as<T: Extension>(&self, key: &str) -> Option<&T> {
        self.attached(key)?.as_any().downcast_ref::<T>()
    }

    /// Instantiate every registered extension now
    pub fn attach_all(&mut self, ctx: &ExtensionContext<'_>) {
        for (key, slot) in &mut self.slots {
            Self::ensure_attached(key, slot, ctx);
        }
    }

    /// Drop the instance of an extension; it re-attaches on next access
    pub fn detach(&mut self, key: &str) -> bool {
        self.slots
            .get_mut(key)
            .and_then(|slot| slot.instance.take())
            .is_some()
    }

    /// Deliver a committed diff
    pub fn dispatch_graph_change(&mut self, diff: &GraphDiff, ctx: &ExtensionContext<'_>) -> Vec<ExtensionEffect> {
        self.dispatch(ctx, |extension, ctx| extension.on_graph_change(diff, ctx))
    }

    /// Deliver a viewport change
    pub fn dispatch_viewport_change(&mut self, ctx: &ExtensionContext<'_>) -> Vec<ExtensionEffect> {
        self.dispatch(ctx, |extension, ctx| extension.on_viewport_change(ctx))
    }

    /// Deliver a gesture event
    pub fn dispatch_gesture(&mut self, event: &GestureEvent, ctx: &ExtensionContext<'_>) -> Vec<ExtensionEffect> {
        self.dispatch(ctx, |extension, ctx| extension.on_gesture(event, ctx))
    }

    /// Deliver a frame tick
    pub fn dispatch_frame(&mut self, dt: f32, ctx: &ExtensionContext<'_>) -> Vec<ExtensionEffect> {
        self.dispatch(ctx, |extension, ctx| extension.on_frame(dt, ctx))
    }

    /// Collect overlays of attached extensions in registration order
    pub fn overlays(&self, ctx: &ExtensionContext<'_>) -> Vec<Overlay> {
        self.slots
            .values()
            .filter_map(|slot| slot.instance.as_ref()?.overlay(ctx))
            .collect()
    }

    fn dispatch(
        &mut self,
        ctx: &ExtensionContext<'_>,
        mut hook: impl FnMut(&mut dyn Extension, &ExtensionContext<'_>) -> Vec<ExtensionEffect>,
    ) -> Vec<ExtensionEffect> {
        let mut effects = Vec::new();
        for slot in self.slots.values_mut() {
            if let Some(extension) = slot.instance.as_deref_mut() {
                effects.extend(hook(extension, ctx));
            }
        }
        effects
    }

    fn ensure_attached(key: &str, slot: &mut Slot, ctx: &ExtensionContext<'_>) {
        if slot.instance.is_some() {
            return;
        }
        let mut extension = (slot.factory)(&slot.options);
        extension.on_attach(ctx);
        tracing::info!(extension = key, "extension attached");
        slot.instance = Some(extension);
    }
}

impl std::fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut list = f.debug_map();
        for (key, slot) in &self.slots {
            list.entry(key, &slot.instance.is_some());
        }
        list.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use crate::store::GraphStore;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Counter {
        seen_nodes: usize,
        diffs: usize,
    }

    impl Extension for Counter {
        fn key(&self) -> &str {
            "counter"
        }

        fn on_attach(&mut self, ctx: &ExtensionContext<'_>) {
            self.seen_nodes = ctx.graph.node_count();
        }

        fn on_graph_change(&mut self, _diff: &GraphDiff, _ctx: &ExtensionContext<'_>) -> Vec<ExtensionEffect> {
            self.diffs += 1;
            vec![ExtensionEffect::PanViewport(Point::new(1.0, 0.0))]
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn counter_registry(built: Rc<Cell<usize>>) -> ExtensionRegistry {
        let mut registry = ExtensionRegistry::new();
        registry.register("counter", serde_json::Value::Null, move |_| {
            built.set(built.get() + 1);
            Box::new(Counter { seen_nodes: 0, diffs: 0 })
        });
        registry
    }

    #[test]
    fn test_attach_is_lazy() {
        let built = Rc::new(Cell::new(0));
        let mut registry = counter_registry(built.clone());
        let mut store = GraphStore::default();
        store.add_node(Node::new("a", "t")).unwrap();
        let viewport = Viewport::default();
        let spatial = SpatialIndex::default();
        let ctx = ExtensionContext {
            graph: store.graph(),
            viewport: &viewport,
            spatial: &spatial,
        };

        assert!(registry.is_registered("counter"));
        assert!(!registry.is_attached("counter"));
        assert_eq!(built.get(), 0);

        let counter = registry.get_as::<Counter>("counter", &ctx).unwrap();
        assert_eq!(counter.seen_nodes, 1);
        registry.get("counter", &ctx).unwrap();
        assert_eq!(built.get(), 1);
    }

    #[test]
    fn test_missing_extension_is_not_fatal() {
        let mut registry = ExtensionRegistry::new();
        let graph = Graph::default();
        let viewport = Viewport::default();
        let spatial = SpatialIndex::default();
        let ctx = ExtensionContext {
            graph: &graph,
            viewport: &viewport,
            spatial: &spatial,
        };
        assert!(registry.get("minimap", &ctx).is_none());
        assert!(registry.dispatch_frame(0.016, &ctx).is_empty());
        assert!(registry.overlays(&ctx).is_empty());
    }

    #[test]
    fn test_dispatch_reaches_attached_extensions_only() {
        let built = Rc::new(Cell::new(0));
        let mut registry = counter_registry(built.clone());
        let mut store = GraphStore::default();
        let diff = store.add_node(Node::new("a", "t")).unwrap();
        let viewport = Viewport::default();
        let spatial = SpatialIndex::default();
        let ctx = ExtensionContext {
            graph: store.graph(),
            viewport: &viewport,
            spatial: &spatial,
        };

        assert!(registry.dispatch_graph_change(&diff, &ctx).is_empty());
        assert!(registry.dispatch_viewport_change(&ctx).is_empty());
        assert!(registry.dispatch_frame(0.016, &ctx).is_empty());
        assert!(registry.overlays(&ctx).is_empty());
        assert!(!registry.is_attached("counter"));
        assert_eq!(built.get(), 0);

        registry.get("counter", &ctx).unwrap();
        let effects = registry.dispatch_graph_change(&diff, &ctx);
        assert_eq!(effects, vec![ExtensionEffect::PanViewport(Point::new(1.0, 0.0))]);
        assert_eq!(registry.attached_as::<Counter>("counter").unwrap().diffs, 1);

        assert!(registry.detach("counter"));
        assert!(!registry.is_attached("counter"));
    }

    #[test]
    fn test_parse_options_falls_back() {
        #[derive(Debug, Default, PartialEq, serde::Deserialize)]
        struct Options {
            margin: f32,
        }
        let parsed: Options = parse_options("x", &serde_json::json!({ "margin": 4.0 }));
        assert_eq!(parsed.margin, 4.0);
        let fallback: Options = parse_options("x", &serde_json::json!("nonsense"));
        assert_eq!(fallback, Options::default());
    }
}
