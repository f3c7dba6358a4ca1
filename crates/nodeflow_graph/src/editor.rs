// SPDX-License-Identifier: MIT OR Apache-2.0
//! The editor facade.
//!
//! [`GraphEditor`] owns the store and everything derived from it. Every commit
//! made through the editor is followed, before control returns, by the same
//! fan-out: spatial index and routed paths are synchronized from the diff, the
//! selection is pruned, extensions see the diff, and connection events fire.

use crate::config::{ConfigError, EngineConfig};
use crate::connection::{Connection, Endpoint};
use crate::diff::GraphDiff;
use crate::error::{GraphConstraintViolation, SerializationError};
use crate::events::{ConnectionValidator, EditorEvent, EventBus};
use crate::extension::{Extension, ExtensionContext, ExtensionEffect, ExtensionRegistry, Overlay};
use crate::extensions;
use crate::geometry::{Point, Rect, Size};
use crate::graph::{Graph, ZOrder};
use crate::history;
use crate::id::{ConnectionId, NodeId};
use crate::interaction::{InteractionMode, ResizeHandle};
use crate::node::{Node, NodePatch, Placement};
use crate::routing::{RoutedPath, Router};
use crate::selection::Selection;
use crate::snap::SnapEngine;
use crate::snapshot::GraphSnapshot;
use crate::spatial::{EntityKey, SpatialIndex};
use crate::store::{GraphStore, Transaction};
use crate::viewport::Viewport;
use indexmap::{IndexMap, IndexSet};

type Result<T> = std::result::Result<T, GraphConstraintViolation>;

/// What lies under a world position, in pointer-down priority order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanvasHit {
    /// A port anchor
    Port(Endpoint),
    /// A resize handle on a node's edge or corner
    ResizeHandle(NodeId, ResizeHandle),
    /// A node body
    Node(NodeId),
    /// A routed connection
    Connection(ConnectionId),
}

/// Single-threaded node-graph editing engine
pub struct GraphEditor {
    pub(crate) config: EngineConfig,
    pub(crate) store: GraphStore,
    pub(crate) spatial: SpatialIndex,
    pub(crate) router: Router,
    pub(crate) snap: SnapEngine,
    pub(crate) selection: Selection,
    pub(crate) viewport: Viewport,
    pub(crate) events: EventBus,
    pub(crate) extensions: ExtensionRegistry,
    pub(crate) validator: Option<ConnectionValidator>,
    pub(crate) paths: IndexMap<ConnectionId, RoutedPath>,
    pub(crate) mode: InteractionMode,
    pub(crate) last_cursor: Point,
    pub(crate) last_tap: Option<(NodeId, u64)>,
}

impl GraphEditor {
    /// Build an editor from a validated config
    pub fn new(config: EngineConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: EngineConfig) -> Self {
        let mut editor = Self {
            store: GraphStore::new(config.store_settings()),
            spatial: SpatialIndex::new(config.spatial_cell_size),
            router: Router::new(config.router),
            snap: SnapEngine::from_config(&config.snap),
            selection: Selection::new(),
            viewport: config.viewport(),
            events: EventBus::new(),
            extensions: ExtensionRegistry::new(),
            validator: None,
            paths: IndexMap::new(),
            mode: InteractionMode::Idle,
            last_cursor: Point::ZERO,
            last_tap: None,
            config,
        };
        let eager = extensions::register_configured(&mut editor.extensions, &editor.config.extensions);
        for key in eager {
            let ctx = ExtensionContext {
                graph: editor.store.graph(),
                viewport: &editor.viewport,
                spatial: &editor.spatial,
            };
            editor.extensions.get(&key, &ctx);
        }
        editor
    }

    // ------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------

    /// Active config
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current graph
    pub fn graph(&self) -> &Graph {
        self.store.graph()
    }

    /// The underlying store
    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    /// Hit-test index
    pub fn spatial(&self) -> &SpatialIndex {
        &self.spatial
    }

    /// Router in use
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Current camera
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Current selection
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Snap chain (toggle or reconfigure at runtime)
    pub fn snap_engine_mut(&mut self) -> &mut SnapEngine {
        &mut self.snap
    }

    /// Current interaction state
    pub fn mode(&self) -> &InteractionMode {
        &self.mode
    }

    /// Committed path of a connection
    pub fn path(&self, id: &ConnectionId) -> Option<&RoutedPath> {
        self.paths.get(id)
    }

    /// Committed paths in connection order
    pub fn paths(&self) -> impl Iterator<Item = (&ConnectionId, &RoutedPath)> {
        self.paths.iter()
    }

    /// Path to paint for a connection: the live path while a gesture moves
    /// its endpoints, the committed one otherwise
    pub fn display_path(&self, id: &ConnectionId) -> Option<&RoutedPath> {
        self.mode.live_path(id).or_else(|| self.paths.get(id))
    }

    /// Position to paint for a node, staged positions included
    pub fn display_bounds(&self, id: &NodeId) -> Option<Rect> {
        let node = self.graph().node(id)?;
        Some(self.mode.staged_bounds(node).unwrap_or_else(|| node.bounds()))
    }

    // ------------------------------------------------------------------
    // Listeners and hooks
    // ------------------------------------------------------------------

    /// Receive editor events
    pub fn listen(&mut self, listener: impl FnMut(&EditorEvent) + 'static) {
        self.events.listen(listener);
    }

    /// Install the before-complete hook for connect gestures
    pub fn set_connection_validator(&mut self, validator: impl Fn(&Connection, &Graph) -> bool + 'static) {
        self.validator = Some(Box::new(validator));
    }

    /// Remove the before-complete hook
    pub fn clear_connection_validator(&mut self) {
        self.validator = None;
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Run several mutations as one transaction
    pub fn transaction<R>(
        &mut self,
        label: impl Into<String>,
        f: impl FnOnce(&mut Transaction<'_>) -> Result<R>,
    ) -> Result<R> {
        let (value, diff) = self.store.transaction(label, f)?;
        self.after_commit(&diff);
        Ok(value)
    }

    /// Add a node
    pub fn add_node(&mut self, node: Node) -> Result<GraphDiff> {
        let diff = self.store.add_node(node)?;
        self.after_commit(&diff);
        Ok(diff)
    }

    /// Remove a node and its connections
    pub fn remove_node(&mut self, id: &NodeId) -> GraphDiff {
        let diff = self.store.remove_node(id);
        self.after_commit(&diff);
        diff
    }

    /// Patch a node
    pub fn update_node(&mut self, id: &NodeId, patch: &NodePatch) -> Result<GraphDiff> {
        let diff = self.store.update_node(id, patch)?;
        self.after_commit(&diff);
        Ok(diff)
    }

    /// Bring a node to the top of its layer
    pub fn raise_node(&mut self, id: &NodeId) -> GraphDiff {
        let diff = self.store.raise_node(id);
        self.after_commit(&diff);
        diff
    }

    /// Add a connection
    pub fn add_connection(&mut self, connection: Connection) -> Result<GraphDiff> {
        let diff = self.store.add_connection(connection)?;
        self.after_commit(&diff);
        Ok(diff)
    }

    /// Remove a connection
    pub fn remove_connection(&mut self, id: &ConnectionId) -> GraphDiff {
        let diff = self.store.remove_connection(id);
        self.after_commit(&diff);
        diff
    }

    /// Remove everything
    pub fn clear(&mut self) -> GraphDiff {
        self.cancel();
        let diff = self.store.clear();
        self.after_commit(&diff);
        diff
    }

    /// Undo the last transaction
    pub fn undo(&mut self) -> history::Result<GraphDiff> {
        self.cancel();
        let diff = self.store.undo()?;
        self.after_commit(&diff);
        Ok(diff)
    }

    /// Redo the last undone transaction
    pub fn redo(&mut self) -> history::Result<GraphDiff> {
        self.cancel();
        let diff = self.store.redo()?;
        self.after_commit(&diff);
        Ok(diff)
    }

    /// Delete selected connections and nodes in one transaction
    pub fn delete_selection(&mut self) -> GraphDiff {
        let connections: Vec<ConnectionId> = self.selection.connections().iter().cloned().collect();
        let nodes: Vec<NodeId> = self.selection.nodes().iter().cloned().collect();
        if connections.is_empty() && nodes.is_empty() {
            return GraphDiff::default();
        }
        let result = self.store.transaction("Delete selection", |tx| {
            for id in &connections {
                tx.remove_connection(id);
            }
            for id in &nodes {
                tx.remove_node(id);
            }
            Ok(())
        });
        match result {
            Ok((_, diff)) => {
                self.after_commit(&diff);
                diff
            }
            Err(err) => {
                tracing::debug!(%err, "delete selection rejected");
                GraphDiff::default()
            }
        }
    }

    /// Capture the graph as a snapshot
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot::from_graph(self.graph())
    }

    /// Replace the graph with a snapshot; the current graph survives a failure
    pub fn load_snapshot(&mut self, snapshot: GraphSnapshot) -> std::result::Result<GraphDiff, SerializationError> {
        self.cancel();
        let diff = snapshot.load_into(&mut self.store)?;
        self.after_commit(&diff);
        Ok(diff)
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    /// Select a node
    pub fn select_node(&mut self, id: NodeId, add_to_selection: bool) {
        if self.graph().contains_node(&id) {
            self.selection.select_node(id, add_to_selection);
            self.emit_selection();
        }
    }

    /// Select a connection
    pub fn select_connection(&mut self, id: ConnectionId, add_to_selection: bool) {
        if self.graph().connection(&id).is_some() {
            self.selection.select_connection(id, add_to_selection);
            self.emit_selection();
        }
    }

    /// Select every node
    pub fn select_all(&mut self) {
        let ids: Vec<NodeId> = self.graph().node_ids().cloned().collect();
        self.selection.set_nodes(ids, false);
        self.emit_selection();
    }

    /// Clear the selection
    pub fn clear_selection(&mut self) {
        if !self.selection.is_empty() {
            self.selection.clear();
            self.emit_selection();
        }
    }

    pub(crate) fn emit_selection(&mut self) {
        let event = EditorEvent::SelectionChanged {
            nodes: self.selection.nodes().iter().cloned().collect(),
            connections: self.selection.connections().iter().cloned().collect(),
        };
        self.events.emit(&event);
    }

    // ------------------------------------------------------------------
    // Viewport
    // ------------------------------------------------------------------

    /// Resize the canvas (screen pixels)
    pub fn set_canvas_size(&mut self, width: f32, height: f32) {
        let size = Size::new(width, height);
        if size.is_valid() && size != self.viewport.canvas {
            self.viewport.canvas = size;
            self.viewport_changed(false);
        }
    }

    /// Pan by a screen-space delta
    pub fn pan_by(&mut self, delta: Point) {
        let before = self.viewport.pan;
        self.viewport.pan_by(delta);
        if self.viewport.pan != before {
            self.viewport_changed(false);
        }
    }

    /// Zoom around a screen point
    pub fn zoom_at(&mut self, screen_anchor: Point, zoom: f32) -> bool {
        let changed = self.viewport.zoom_at(screen_anchor, zoom);
        if changed {
            self.viewport_changed(true);
        }
        changed
    }

    /// Fit all nodes into the canvas
    pub fn fit_to_graph(&mut self, margin: f32) {
        let Some(bounds) = self.graph().nodes().map(Node::bounds).reduce(|a, b| a.union(&b)) else {
            return;
        };
        let zoom = self.viewport.zoom;
        self.viewport.fit(bounds, margin);
        self.viewport_changed(zoom != self.viewport.zoom);
    }

    pub(crate) fn viewport_changed(&mut self, zoom_changed: bool) {
        if zoom_changed {
            self.reroute_all();
        }
        let ctx = ExtensionContext {
            graph: self.store.graph(),
            viewport: &self.viewport,
            spatial: &self.spatial,
        };
        let effects = self.extensions.dispatch_viewport_change(&ctx);
        // viewport hooks are not re-run for their own pans
        for effect in effects {
            match effect {
                ExtensionEffect::PanViewport(delta) => {
                    tracing::trace!(?delta, "pan requested from a viewport hook");
                    self.viewport.pan_by(delta);
                }
            }
        }
        self.events.emit(&EditorEvent::ViewportChanged(self.viewport));
    }

    // ------------------------------------------------------------------
    // Extensions
    // ------------------------------------------------------------------

    /// Registry of extensions
    pub fn extensions_mut(&mut self) -> &mut ExtensionRegistry {
        &mut self.extensions
    }

    /// Look up an extension by key, attaching it on first access
    pub fn extension(&mut self, key: &str) -> Option<&mut (dyn Extension + 'static)> {
        let ctx = ExtensionContext {
            graph: self.store.graph(),
            viewport: &self.viewport,
            spatial: &self.spatial,
        };
        self.extensions.get(key, &ctx)
    }

    /// Typed extension lookup, attaching on first access
    pub fn extension_as<T: Extension>(&mut self, key: &str) -> Option<&T> {
        let ctx = ExtensionContext {
            graph: self.store.graph(),
            viewport: &self.viewport,
            spatial: &self.spatial,
        };
        self.extensions.get_as::<T>(key, &ctx)
    }

    /// Overlays of every attached extension
    pub fn overlays(&self) -> Vec<Overlay> {
        let ctx = ExtensionContext {
            graph: self.store.graph(),
            viewport: &self.viewport,
            spatial: &self.spatial,
        };
        self.extensions.overlays(&ctx)
    }

    /// Advance one frame: extensions run their per-frame hooks and any
    /// resulting viewport movement is applied to the gesture in progress
    pub fn tick(&mut self, dt: f32) {
        let ctx = ExtensionContext {
            graph: self.store.graph(),
            viewport: &self.viewport,
            spatial: &self.spatial,
        };
        let effects = self.extensions.dispatch_frame(dt, &ctx);
        self.apply_effects(effects);
    }

    pub(crate) fn apply_effects(&mut self, effects: Vec<ExtensionEffect>) {
        let mut panned = false;
        for effect in effects {
            match effect {
                ExtensionEffect::PanViewport(delta) => {
                    self.viewport.pan_by(delta);
                    panned = true;
                }
            }
        }
        if panned {
            self.viewport_changed(false);
            self.refresh_gesture();
        }
    }

    // ------------------------------------------------------------------
    // Hit testing
    // ------------------------------------------------------------------

    /// Topmost entity at a world position: port, resize handle, node, then connection
    pub fn hit_test(&self, world: Point) -> Option<CanvasHit> {
        let hits = self.spatial.query_point(world, 0.0);
        if let Some(endpoint) = hits.iter().find_map(|hit| hit.key.as_port()) {
            return Some(CanvasHit::Port(endpoint.clone()));
        }
        if let Some(node_id) = hits.iter().find_map(|hit| hit.key.as_node()) {
            let handle = self
                .graph()
                .node(node_id)
                .and_then(|node| ResizeHandle::locate(&node.bounds(), world, self.config.resize_handle_size));
            if let Some(handle) = handle {
                return Some(CanvasHit::ResizeHandle(node_id.clone(), handle));
            }
            return Some(CanvasHit::Node(node_id.clone()));
        }
        self.connection_at(world).map(CanvasHit::Connection)
    }

    /// Nearest connection whose path passes within the port hit radius
    pub fn connection_at(&self, world: Point) -> Option<ConnectionId> {
        let tolerance = self.config.port_hit_radius / self.viewport.zoom.max(f32::EPSILON);
        self.spatial
            .query_point(world, tolerance)
            .into_iter()
            .filter_map(|hit| {
                let id = hit.key.as_connection()?;
                let distance = self.paths.get(id)?.distance_to(world);
                (distance <= tolerance).then(|| (id.clone(), distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    // ------------------------------------------------------------------
    // Derived state
    // ------------------------------------------------------------------

    pub(crate) fn after_commit(&mut self, diff: &GraphDiff) {
        if diff.is_empty() && !diff.cleared {
            return;
        }
        self.sync_derived(diff);

        if self.selection.prune(self.store.graph(), diff) {
            self.emit_selection();
        }

        let ctx = ExtensionContext {
            graph: self.store.graph(),
            viewport: &self.viewport,
            spatial: &self.spatial,
        };
        let effects = self.extensions.dispatch_graph_change(diff, &ctx);

        for connection in diff.added_connections() {
            self.events.emit(&EditorEvent::ConnectionCreated(connection.clone()));
        }
        for connection in diff.removed_connections() {
            self.events.emit(&EditorEvent::ConnectionDeleted(connection.id.clone()));
        }
        self.apply_effects(effects);
    }

    fn sync_derived(&mut self, diff: &GraphDiff) {
        if diff.cleared {
            self.rebuild_derived();
            return;
        }
        let graph = self.store.graph();
        let nodes = diff.touched_nodes();
        for id in &nodes {
            self.spatial
                .sync_node(graph, id, self.config.port_outset, self.config.port_hit_radius);
        }
        let mut affected: IndexSet<ConnectionId> = diff.touched_connections();
        for id in &nodes {
            affected.extend(graph.connections_for_node(id).map(|c| c.id.clone()));
        }
        for id in &affected {
            self.reroute(id);
        }
    }

    fn rebuild_derived(&mut self) {
        self.spatial.clear();
        self.paths.clear();
        let graph = self.store.graph();
        for id in graph.node_ids() {
            self.spatial
                .sync_node(graph, id, self.config.port_outset, self.config.port_hit_radius);
        }
        self.reroute_all();
        tracing::debug!(
            nodes = self.store.graph().node_count(),
            entries = self.spatial.len(),
            "spatial index rebuilt"
        );
    }

    fn reroute_all(&mut self) {
        let ids: Vec<ConnectionId> = self.store.graph().connections().map(|c| c.id.clone()).collect();
        for id in &ids {
            self.reroute(id);
        }
    }

    fn reroute(&mut self, id: &ConnectionId) {
        let graph = self.store.graph();
        let routed = graph.connection(id).and_then(|connection| {
            let path = self.router.route_connection(
                graph,
                connection,
                self.config.default_link_style,
                self.config.port_outset,
                self.viewport.zoom,
            )?;
            let z = [&connection.source.node, &connection.target.node]
                .into_iter()
                .filter_map(|node| graph.z_order(node))
                .max()
                .unwrap_or(ZOrder {
                    placement: Placement::Back,
                    stamp: 0,
                });
            Some((path, z))
        });
        let key = EntityKey::Connection(id.clone());
        match routed {
            Some((path, z)) => {
                self.spatial.insert(key, path.bounds(), z);
                self.paths.insert(id.clone(), path);
            }
            None => {
                self.spatial.remove(&key);
                self.paths.shift_remove(id);
            }
        }
    }
}

impl Default for GraphEditor {
    fn default() -> Self {
        Self::build(EngineConfig::default())
    }
}

impl std::fmt::Debug for GraphEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphEditor")
            .field("store", &self.store)
            .field("viewport", &self.viewport)
            .field("selection", &self.selection)
            .field("mode", &self.mode)
            .field("extensions", &self.extensions)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtensionConfig;
    use crate::connection::Endpoint;
    use crate::extensions::{Stats, STATS};
    use crate::port::Port;
    use std::any::Any;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Nudge {
        remaining: u32,
    }

    impl Extension for Nudge {
        fn key(&self) -> &str {
            "nudge"
        }

        fn on_viewport_change(&mut self, _ctx: &ExtensionContext<'_>) -> Vec<ExtensionEffect> {
            if self.remaining == 0 {
                return Vec::new();
            }
            self.remaining -= 1;
            vec![ExtensionEffect::PanViewport(Point::new(5.0, 0.0))]
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn pair() -> GraphEditor {
        let mut editor = GraphEditor::default();
        editor
            .add_node(
                Node::new("a", "t")
                    .with_position(0.0, 0.0)
                    .with_output(Port::output("out", "Out")),
            )
            .unwrap();
        editor
            .add_node(
                Node::new("b", "t")
                    .with_position(400.0, 0.0)
                    .with_input(Port::input("in", "In")),
            )
            .unwrap();
        editor
            .add_connection(Connection::new("c", Endpoint::new("a", "out"), Endpoint::new("b", "in")))
            .unwrap();
        editor
    }

    #[test]
    fn test_commit_syncs_spatial_and_paths() {
        let mut editor = pair();
        assert!(editor.spatial().contains(&EntityKey::Node("a".into())));
        assert!(editor.spatial().contains(&EntityKey::Port(Endpoint::new("b", "in"))));
        let path = editor.path(&"c".into()).unwrap();
        assert!(path.start().approx_eq(Point::new(180.0, 40.0)));

        editor
            .update_node(&"b".into(), &NodePatch::position(Point::new(400.0, 200.0)))
            .unwrap();
        let path = editor.path(&"c".into()).unwrap();
        assert!(path.end().approx_eq(Point::new(400.0, 240.0)));

        editor.remove_node(&"b".into());
        assert!(editor.path(&"c".into()).is_none());
        assert!(!editor.spatial().contains(&EntityKey::Connection("c".into())));
        assert!(!editor.spatial().contains(&EntityKey::Port(Endpoint::new("b", "in"))));
    }

    #[test]
    fn test_hit_priority() {
        let editor = pair();
        assert_eq!(
            editor.hit_test(Point::new(180.0, 40.0)),
            Some(CanvasHit::Port(Endpoint::new("a", "out")))
        );
        assert_eq!(
            editor.hit_test(Point::new(175.0, 75.0)),
            Some(CanvasHit::ResizeHandle("a".into(), ResizeHandle::BottomRight))
        );
        assert_eq!(
            editor.hit_test(Point::new(2.0, 30.0)),
            Some(CanvasHit::ResizeHandle("a".into(), ResizeHandle::Left))
        );
        assert_eq!(
            editor.hit_test(Point::new(5.0, 5.0)),
            Some(CanvasHit::ResizeHandle("a".into(), ResizeHandle::TopLeft))
        );
        assert_eq!(editor.hit_test(Point::new(50.0, 30.0)), Some(CanvasHit::Node("a".into())));
        assert_eq!(editor.hit_test(Point::new(290.0, 40.0)), Some(CanvasHit::Connection("c".into())));
        assert_eq!(editor.hit_test(Point::new(290.0, 600.0)), None);
    }

    #[test]
    fn test_connection_events_and_selection_pruning() {
        let mut editor = pair();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        editor.listen(move |event| sink.borrow_mut().push(event.clone()));

        editor.select_node("b".into(), false);
        editor.remove_node(&"b".into());
        assert!(editor.selection().is_empty());

        let events = events.borrow();
        assert!(events.contains(&EditorEvent::ConnectionDeleted("c".into())));
        assert!(matches!(
            events.last(),
            Some(EditorEvent::ConnectionDeleted(_)) | Some(EditorEvent::SelectionChanged { .. })
        ));
    }

    #[test]
    fn test_undo_redo_resync() {
        let mut editor = pair();
        editor.remove_node(&"b".into());
        editor.undo().unwrap();
        assert!(editor.path(&"c".into()).is_some());
        editor.redo().unwrap();
        assert!(editor.path(&"c".into()).is_none());
    }

    #[test]
    fn test_delete_selection_is_one_transaction() {
        let mut editor = pair();
        let revision = editor.store().revision();
        editor.select_node("a".into(), false);
        editor.select_node("b".into(), true);
        let diff = editor.delete_selection();
        assert_eq!(diff.revision, revision + 1);
        assert!(editor.graph().is_empty());
        assert_eq!(editor.graph().connection_count(), 0);
    }

    #[test]
    fn test_stats_extension_sees_commits() {
        let mut config = EngineConfig::default();
        config.extensions.push(ExtensionConfig::new(STATS));
        let mut editor = GraphEditor::new(config).unwrap();
        assert!(!editor.extensions_mut().is_attached(STATS));

        // commits and frames do not attach a lazy extension
        editor.add_node(Node::new("early", "t")).unwrap();
        editor.tick(0.016);
        assert!(!editor.extensions_mut().is_attached(STATS));

        editor.extension(STATS).unwrap();
        editor.add_node(Node::new("a", "t")).unwrap();
        let stats = editor.extension_as::<Stats>(STATS).unwrap().stats();
        assert_eq!(stats.nodes, 2);
        assert_eq!(stats.transactions, 1);
    }

    #[test]
    fn test_viewport_event_carries_hook_pans() {
        let mut editor = GraphEditor::default();
        editor
            .extensions_mut()
            .register("nudge", serde_json::Value::Null, |_| Box::new(Nudge { remaining: 1 }));
        editor.extension("nudge").unwrap();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        editor.listen(move |event| sink.borrow_mut().push(event.clone()));

        editor.pan_by(Point::new(10.0, 0.0));

        assert_eq!(editor.viewport().pan, Point::new(15.0, 0.0));
        let viewports: Vec<Viewport> = events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                EditorEvent::ViewportChanged(viewport) => Some(*viewport),
                _ => None,
            })
            .collect();
        assert_eq!(viewports, vec![*editor.viewport()]);
    }

    #[test]
    fn test_zoom_reroutes_bezier() {
        let mut editor = pair();
        editor
            .update_node(&"b".into(), &NodePatch::position(Point::new(380.0, 200.0)))
            .unwrap();
        let before = editor.path(&"c".into()).unwrap().length();
        assert!(editor.zoom_at(Point::ZERO, 0.25));
        let after = editor.path(&"c".into()).unwrap().length();
        assert!(after > before);
    }

    #[test]
    fn test_load_snapshot_rebuilds() {
        let source = pair();
        let snapshot = source.snapshot();
        let mut editor = GraphEditor::default();
        editor.add_node(Node::new("z", "t")).unwrap();
        editor.load_snapshot(snapshot).unwrap();
        assert!(!editor.spatial().contains(&EntityKey::Node("z".into())));
        assert!(editor.path(&"c".into()).is_some());
    }
}
