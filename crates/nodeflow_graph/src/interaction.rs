// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pointer-driven editing state machine.
//!
//! A press picks a gesture by hit priority (port, resize handle, node, empty
//! canvas). Moves stage the gesture without touching the store; only a release
//! commits, as one transaction. Cancelling, or losing the entity a gesture
//! works on, returns to [`InteractionMode::Idle`] with no graph mutation.

use crate::connection::{Connection, Endpoint};
use crate::config::MarqueeMode;
use crate::editor::{CanvasHit, GraphEditor};
use crate::error::InvalidGesture;
use crate::events::EditorEvent;
use crate::extension::{ExtensionContext, GestureEvent, GestureKind};
use crate::geometry::{Point, Rect, Size};
use crate::id::{ConnectionId, NodeId};
use crate::node::{Node, NodePatch};
use crate::port::PortDirection;
use crate::routing::RoutedPath;
use crate::snap::{Guide, SnapContext};
use indexmap::{IndexMap, IndexSet};

/// Mouse button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerButton {
    /// Left button / touch
    #[default]
    Primary,
    /// Right button
    Secondary,
    /// Middle button
    Middle,
}

/// Keyboard modifiers held during an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    /// Shift
    pub shift: bool,
    /// Control / command
    pub ctrl: bool,
    /// Alt / option
    pub alt: bool,
}

impl Modifiers {
    /// Only shift held
    pub const SHIFT: Self = Self {
        shift: true,
        ctrl: false,
        alt: false,
    };

    /// Only ctrl held
    pub const CTRL: Self = Self {
        shift: false,
        ctrl: true,
        alt: false,
    };
}

/// A pointer event in screen pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    /// Cursor position
    pub position: Point,
    /// Button pressed or released (ignored for moves)
    pub button: PointerButton,
    /// Held modifiers
    pub modifiers: Modifiers,
    /// Timestamp in milliseconds, used for double taps
    pub time_ms: u64,
}

impl PointerEvent {
    /// Primary-button event at a screen position
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            position: Point::new(x, y),
            button: PointerButton::Primary,
            modifiers: Modifiers::default(),
            time_ms: 0,
        }
    }

    /// Change the button
    pub fn with_button(mut self, button: PointerButton) -> Self {
        self.button = button;
        self
    }

    /// Change the modifiers
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Change the timestamp
    pub fn at(mut self, time_ms: u64) -> Self {
        self.time_ms = time_ms;
        self
    }
}

/// Keys the editor reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Cancel the gesture
    Escape,
    /// Delete the selection
    Delete,
    /// Delete the selection
    Backspace,
    /// Any character key (shortcuts use lowercase letters)
    Char(char),
}

/// Nodes being moved
#[derive(Debug, Clone)]
pub struct NodeDrag {
    /// Node under the press
    pub pressed: NodeId,
    /// Press position (screen)
    pub press_screen: Point,
    /// Press position (world)
    pub press_world: Point,
    /// Committed positions of the dragged nodes
    pub start_positions: IndexMap<NodeId, Point>,
    /// Staged, snapped positions
    pub staged: IndexMap<NodeId, Point>,
    /// Whether the drag threshold was passed
    pub started: bool,
    /// Snap guides of the last move
    pub guides: Vec<Guide>,
    /// Paths of connections touching the dragged nodes, at staged positions
    pub live_paths: IndexMap<ConnectionId, RoutedPath>,
    toggle_on_tap: bool,
}

/// Connection being created
#[derive(Debug, Clone)]
pub struct ConnectionDrag {
    /// Port the drag started from
    pub origin: Endpoint,
    /// Direction of that port
    pub direction: PortDirection,
    /// Press position (screen)
    pub press_screen: Point,
    /// Cursor (world)
    pub cursor: Point,
    /// Compatible port within snap distance
    pub candidate: Option<Endpoint>,
    /// Temporary connection geometry
    pub preview: Option<RoutedPath>,
    /// Whether the drag threshold was passed
    pub started: bool,
}

/// Box selection state
#[derive(Debug, Clone)]
pub struct BoxSelection {
    /// Start position (world)
    pub start: Point,
    /// Current position (world)
    pub current: Point,
    /// Press position (screen)
    pub press_screen: Point,
    /// Shift held at press: extend the selection
    pub additive: bool,
    /// Whether the drag threshold was passed
    pub started: bool,
}

impl BoxSelection {
    /// Selection rectangle (world)
    pub fn rect(&self) -> Rect {
        Rect::from_points(self.start, self.current)
    }
}

/// Edge or corner of a node grabbed to resize it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResizeHandle {
    /// Top edge
    Top,
    /// Bottom edge
    Bottom,
    /// Left edge
    Left,
    /// Right edge
    Right,
    /// Top-left corner
    TopLeft,
    /// Top-right corner
    TopRight,
    /// Bottom-left corner
    BottomLeft,
    /// Bottom-right corner
    BottomRight,
}

impl ResizeHandle {
    /// Handle under `p` on a node with `bounds`.
    ///
    /// Corners are `size` squares; edges are strips half as thick.
    pub fn locate(bounds: &Rect, p: Point, size: f32) -> Option<Self> {
        if size <= 0.0 || !bounds.contains(p) {
            return None;
        }
        let (left, right) = (p.x - bounds.min.x, bounds.max.x - p.x);
        let (top, bottom) = (p.y - bounds.min.y, bounds.max.y - p.y);
        let corner = |a: f32, b: f32| a <= size && b <= size;
        let edge = size / 2.0;
        let handle = if corner(right, bottom) {
            Self::BottomRight
        } else if corner(left, bottom) {
            Self::BottomLeft
        } else if corner(right, top) {
            Self::TopRight
        } else if corner(left, top) {
            Self::TopLeft
        } else if bottom <= edge {
            Self::Bottom
        } else if right <= edge {
            Self::Right
        } else if top <= edge {
            Self::Top
        } else if left <= edge {
            Self::Left
        } else {
            return None;
        };
        Some(handle)
    }

    fn moves_left(self) -> bool {
        matches!(self, Self::Left | Self::TopLeft | Self::BottomLeft)
    }

    fn moves_right(self) -> bool {
        matches!(self, Self::Right | Self::TopRight | Self::BottomRight)
    }

    fn moves_top(self) -> bool {
        matches!(self, Self::Top | Self::TopLeft | Self::TopRight)
    }

    fn moves_bottom(self) -> bool {
        matches!(self, Self::Bottom | Self::BottomLeft | Self::BottomRight)
    }

    /// Bounds after dragging this handle by `delta`.
    ///
    /// Edges the handle does not touch stay put, and neither side shrinks below `min`.
    pub fn resize(self, start: &Rect, delta: Point, min: f32) -> Rect {
        let mut bounds = *start;
        if self.moves_left() {
            bounds.min.x = (start.min.x + delta.x).min(start.max.x - min);
        }
        if self.moves_right() {
            bounds.max.x = (start.max.x + delta.x).max(start.min.x + min);
        }
        if self.moves_top() {
            bounds.min.y = (start.min.y + delta.y).min(start.max.y - min);
        }
        if self.moves_bottom() {
            bounds.max.y = (start.max.y + delta.y).max(start.min.y + min);
        }
        bounds
    }
}

/// Node being resized from one of its handles
#[derive(Debug, Clone)]
pub struct NodeResize {
    /// Resized node
    pub node: NodeId,
    /// Grabbed edge or corner
    pub handle: ResizeHandle,
    /// Press position (screen)
    pub press_screen: Point,
    /// Press position (world)
    pub press_world: Point,
    /// Committed bounds
    pub start: Rect,
    /// Staged bounds
    pub staged: Rect,
    /// Whether the drag threshold was passed
    pub started: bool,
    /// Paths of the node's connections at the staged size
    pub live_paths: IndexMap<ConnectionId, RoutedPath>,
}

/// Graph editor interaction mode
#[derive(Debug, Clone, Default)]
pub enum InteractionMode {
    /// Nothing in progress
    #[default]
    Idle,
    /// Dragging nodes
    DraggingNodes(NodeDrag),
    /// Creating a connection
    CreatingConnection(ConnectionDrag),
    /// Box selection
    MarqueeSelecting(BoxSelection),
    /// Resizing a node
    ResizingNode(NodeResize),
    /// Panning the view
    Panning {
        /// Last cursor position (screen)
        last: Point,
    },
}

impl InteractionMode {
    /// Whether no gesture is in progress
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Gesture kind, if any
    pub fn gesture_kind(&self) -> Option<GestureKind> {
        match self {
            Self::Idle => None,
            Self::DraggingNodes(_) => Some(GestureKind::DragNodes),
            Self::CreatingConnection(_) => Some(GestureKind::Connect),
            Self::MarqueeSelecting(_) => Some(GestureKind::Marquee),
            Self::ResizingNode(_) => Some(GestureKind::Resize),
            Self::Panning { .. } => Some(GestureKind::Pan),
        }
    }

    /// Whether the gesture passed its drag threshold
    pub fn is_started(&self) -> bool {
        match self {
            Self::Idle => false,
            Self::DraggingNodes(drag) => drag.started,
            Self::CreatingConnection(drag) => drag.started,
            Self::MarqueeSelecting(marquee) => marquee.started,
            Self::ResizingNode(resize) => resize.started,
            Self::Panning { .. } => true,
        }
    }

    /// Live path of a connection moved by the gesture
    pub fn live_path(&self, id: &ConnectionId) -> Option<&RoutedPath> {
        match self {
            Self::DraggingNodes(drag) => drag.live_paths.get(id),
            Self::ResizingNode(resize) => resize.live_paths.get(id),
            _ => None,
        }
    }

    /// Staged bounds of a node moved or resized by the gesture
    pub fn staged_bounds(&self, node: &Node) -> Option<Rect> {
        match self {
            Self::DraggingNodes(drag) => drag
                .staged
                .get(&node.id)
                .map(|position| Rect::from_origin_size(*position, node.size)),
            Self::ResizingNode(resize) if resize.node == node.id => Some(resize.staged),
            _ => None,
        }
    }

    /// Temporary connection while connecting
    pub fn preview(&self) -> Option<&RoutedPath> {
        match self {
            Self::CreatingConnection(drag) => drag.preview.as_ref(),
            _ => None,
        }
    }

    /// Snap guides while dragging
    pub fn guides(&self) -> &[Guide] {
        match self {
            Self::DraggingNodes(drag) => &drag.guides,
            _ => &[],
        }
    }

    /// Marquee rectangle while box selecting
    pub fn marquee(&self) -> Option<Rect> {
        match self {
            Self::MarqueeSelecting(marquee) if marquee.started => Some(marquee.rect()),
            _ => None,
        }
    }
}

impl GraphEditor {
    /// Pointer pressed
    pub fn pointer_down(&mut self, event: PointerEvent) {
        if !self.mode.is_idle() {
            self.cancel();
        }
        self.last_cursor = event.position;
        match event.button {
            PointerButton::Middle => {
                self.mode = InteractionMode::Panning { last: event.position };
                self.gesture(GestureEvent::Started {
                    kind: GestureKind::Pan,
                    cursor: event.position,
                });
            }
            PointerButton::Primary => self.primary_down(event),
            PointerButton::Secondary => {}
        }
    }

    /// Pointer moved
    pub fn pointer_move(&mut self, event: PointerEvent) {
        self.last_cursor = event.position;
        if let InteractionMode::Panning { last } = &mut self.mode {
            let delta = event.position - *last;
            *last = event.position;
            self.pan_by(delta);
            self.gesture(GestureEvent::Moved {
                kind: GestureKind::Pan,
                cursor: event.position,
            });
            return;
        }
        self.update_gesture(event.position);
    }

    /// Pointer released: commits the gesture in progress
    pub fn pointer_up(&mut self, event: PointerEvent) {
        self.last_cursor = event.position;
        if matches!(self.mode, InteractionMode::Panning { .. }) {
            self.mode = InteractionMode::Idle;
            self.gesture(GestureEvent::Ended {
                kind: GestureKind::Pan,
                committed: true,
            });
            return;
        }
        self.update_gesture(event.position);
        match std::mem::take(&mut self.mode) {
            InteractionMode::DraggingNodes(drag) => self.finish_drag(drag, event),
            InteractionMode::CreatingConnection(drag) => self.finish_connect(drag),
            InteractionMode::MarqueeSelecting(marquee) => self.finish_marquee(marquee),
            InteractionMode::ResizingNode(resize) => self.finish_resize(resize),
            InteractionMode::Idle | InteractionMode::Panning { .. } => {}
        }
    }

    /// Wheel or trackpad scroll (screen pixels)
    pub fn wheel(&mut self, position: Point, delta: Point, modifiers: Modifiers) {
        if self.config.scroll_to_zoom != modifiers.ctrl {
            let factor = 1.0 + delta.y * 0.001;
            if factor > 0.0 {
                self.zoom_at(position, self.viewport.zoom * factor);
            }
        } else {
            self.pan_by(-delta);
        }
        self.refresh_gesture();
    }

    /// Key pressed; returns whether the editor handled it
    pub fn key_down(&mut self, key: Key, modifiers: Modifiers) -> bool {
        match key {
            Key::Escape => {
                let active = !self.mode.is_idle();
                self.cancel();
                active
            }
            Key::Delete | Key::Backspace if self.mode.is_idle() => !self.delete_selection().is_empty(),
            Key::Char('z') if modifiers.ctrl && modifiers.shift => self.redo().is_ok(),
            Key::Char('z') if modifiers.ctrl => self.undo().is_ok(),
            Key::Char('y') if modifiers.ctrl => self.redo().is_ok(),
            Key::Char('a') if modifiers.ctrl && self.mode.is_idle() => {
                self.select_all();
                true
            }
            _ => false,
        }
    }

    /// Abort the gesture in progress without committing
    pub fn cancel(&mut self) {
        let mode = std::mem::take(&mut self.mode);
        if let Some(kind) = mode.gesture_kind() {
            tracing::debug!(?kind, "gesture cancelled");
            self.end_gesture(&mode, false);
        }
    }

    /// Re-run the gesture at the last cursor (after the viewport moved under it)
    pub(crate) fn refresh_gesture(&mut self) {
        if !matches!(self.mode, InteractionMode::Idle | InteractionMode::Panning { .. }) {
            self.update_gesture(self.last_cursor);
        }
    }

    fn primary_down(&mut self, event: PointerEvent) {
        let world = self.viewport.screen_to_world(event.position);
        let shift = event.modifiers.shift;
        match self.hit_test(world) {
            Some(CanvasHit::Port(origin)) => {
                let Some(port) = self.graph().port(&origin) else {
                    return;
                };
                self.mode = InteractionMode::CreatingConnection(ConnectionDrag {
                    direction: port.direction,
                    origin,
                    press_screen: event.position,
                    cursor: world,
                    candidate: None,
                    preview: None,
                    started: false,
                });
            }
            Some(CanvasHit::ResizeHandle(node, handle)) => {
                let Some(bounds) = self.graph().node(&node).map(Node::bounds) else {
                    return;
                };
                self.mode = InteractionMode::ResizingNode(NodeResize {
                    node,
                    handle,
                    press_screen: event.position,
                    press_world: world,
                    start: bounds,
                    staged: bounds,
                    started: false,
                    live_paths: IndexMap::new(),
                });
            }
            Some(CanvasHit::Node(pressed)) => {
                let was_selected = self.selection.contains_node(&pressed);
                if !was_selected {
                    self.selection.select_node(pressed.clone(), shift);
                    self.emit_selection();
                }
                let graph = self.store.graph();
                let start_positions: IndexMap<NodeId, Point> = self
                    .selection
                    .nodes()
                    .iter()
                    .filter_map(|id| graph.node(id).map(|n| (id.clone(), n.position)))
                    .collect();
                self.mode = InteractionMode::DraggingNodes(NodeDrag {
                    pressed,
                    press_screen: event.position,
                    press_world: world,
                    staged: start_positions.clone(),
                    start_positions,
                    started: false,
                    guides: Vec::new(),
                    live_paths: IndexMap::new(),
                    toggle_on_tap: shift && was_selected,
                });
            }
            Some(CanvasHit::Connection(id)) => self.select_connection(id, shift),
            None => {
                self.mode = InteractionMode::MarqueeSelecting(BoxSelection {
                    start: world,
                    current: world,
                    press_screen: event.position,
                    additive: shift,
                    started: false,
                });
            }
        }
    }

    fn update_gesture(&mut self, cursor: Point) {
        self.mode = match std::mem::take(&mut self.mode) {
            InteractionMode::DraggingNodes(drag) => self.update_drag(drag, cursor),
            InteractionMode::CreatingConnection(drag) => self.update_connect(drag, cursor),
            InteractionMode::MarqueeSelecting(marquee) => self.update_marquee(marquee, cursor),
            InteractionMode::ResizingNode(resize) => self.update_resize(resize, cursor),
            other => other,
        };
    }

    fn passes_threshold(&self, press: Point, cursor: Point) -> bool {
        press.distance(cursor) > self.config.drag_threshold
    }

    fn update_drag(&mut self, mut drag: NodeDrag, cursor: Point) -> InteractionMode {
        let missing = drag
            .start_positions
            .keys()
            .find(|id| !self.store.graph().contains_node(id))
            .cloned();
        if let Some(missing) = missing {
            return self.abort(InteractionMode::DraggingNodes(drag), InvalidGesture::NodeVanished(missing));
        }
        if !drag.started {
            if !self.passes_threshold(drag.press_screen, cursor) {
                return InteractionMode::DraggingNodes(drag);
            }
            drag.started = true;
            let nodes: Vec<NodeId> = drag.start_positions.keys().cloned().collect();
            self.events.emit(&EditorEvent::DragStarted(nodes));
            self.gesture(GestureEvent::Started {
                kind: GestureKind::DragNodes,
                cursor,
            });
        } else {
            self.gesture(GestureEvent::Moved {
                kind: GestureKind::DragNodes,
                cursor,
            });
        }

        let world = self.viewport.screen_to_world(cursor);
        let delta = world - drag.press_world;
        let others = self.snap_neighbours(&drag.start_positions);
        let graph = self.store.graph();
        drag.guides.clear();
        let mut moved: IndexMap<NodeId, Node> = IndexMap::new();
        for (id, start) in &drag.start_positions {
            let Some(node) = graph.node(id) else {
                continue;
            };
            let candidate = *start + delta;
            let ctx = SnapContext {
                position: candidate,
                size: node.size,
                others: &others,
                zoom: self.viewport.zoom,
            };
            let position = match self.snap.snap(&ctx) {
                Some(result) => {
                    drag.guides.extend(result.guides);
                    result.position
                }
                None => candidate,
            };
            drag.staged.insert(id.clone(), position);
            moved.insert(id.clone(), Node { position, ..node.clone() });
        }
        drag.live_paths = self.live_paths(&moved);
        InteractionMode::DraggingNodes(drag)
    }

    fn finish_drag(&mut self, drag: NodeDrag, event: PointerEvent) {
        if !drag.started {
            self.handle_tap(drag.pressed, drag.toggle_on_tap, event);
            return;
        }
        let moves: Vec<(NodeId, Point)> = drag
            .staged
            .iter()
            .filter(|(id, position)| drag.start_positions.get(*id) != Some(*position))
            .map(|(id, position)| (id.clone(), *position))
            .collect();
        let committed = match self.transaction("Move nodes", |tx| {
            for (id, position) in &moves {
                tx.update_node(id, &NodePatch::position(*position))?;
            }
            Ok(())
        }) {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(reason = %InvalidGesture::from(err), "node drag rejected");
                false
            }
        };
        let nodes = drag.start_positions.keys().cloned().collect();
        self.events.emit(&EditorEvent::DragStopped { nodes, committed });
        self.gesture(GestureEvent::Ended {
            kind: GestureKind::DragNodes,
            committed,
        });
    }

    fn handle_tap(&mut self, id: NodeId, toggle: bool, event: PointerEvent) {
        if toggle {
            self.selection.toggle_node(id.clone());
            self.emit_selection();
        } else if !event.modifiers.shift && self.selection.len() > 1 {
            self.selection.select_node(id.clone(), false);
            self.emit_selection();
        }
        self.events.emit(&EditorEvent::NodeTapped(id.clone()));

        let double = match &self.last_tap {
            Some((last, at)) => *last == id && event.time_ms.saturating_sub(*at) <= self.config.double_tap_ms,
            None => false,
        };
        if double {
            self.last_tap = None;
            self.events.emit(&EditorEvent::NodeDoubleTapped(id));
        } else {
            self.last_tap = Some((id, event.time_ms));
        }
    }

    fn update_connect(&mut self, mut drag: ConnectionDrag, cursor: Point) -> InteractionMode {
        let origin_anchor = self.store.graph().anchor(&drag.origin, self.config.port_outset);
        let Some(origin_anchor) = origin_anchor else {
            let reason = InvalidGesture::PortVanished(drag.origin.clone());
            return self.abort(InteractionMode::CreatingConnection(drag), reason);
        };
        if !drag.started {
            if !self.passes_threshold(drag.press_screen, cursor) {
                return InteractionMode::CreatingConnection(drag);
            }
            drag.started = true;
            self.gesture(GestureEvent::Started {
                kind: GestureKind::Connect,
                cursor,
            });
        } else {
            self.gesture(GestureEvent::Moved {
                kind: GestureKind::Connect,
                cursor,
            });
        }

        let graph = self.store.graph();
        let world = self.viewport.screen_to_world(cursor);
        let wanted = drag.direction.opposite();
        drag.cursor = world;
        drag.candidate = self
            .spatial
            .query_point(world, self.config.port_snap_distance)
            .into_iter()
            .filter_map(|hit| hit.key.as_port().cloned())
            .find(|endpoint| {
                *endpoint != drag.origin && graph.port(endpoint).is_some_and(|port| port.direction == wanted)
            });

        let style = self.config.default_link_style;
        let zoom = self.viewport.zoom;
        drag.preview = Some(
            match drag
                .candidate
                .as_ref()
                .and_then(|candidate| graph.anchor(candidate, self.config.port_outset))
            {
                Some(target) => self.router.route(style, origin_anchor, target, zoom),
                None => self.router.route_to_cursor(style, origin_anchor, world, zoom),
            },
        );
        InteractionMode::CreatingConnection(drag)
    }

    fn finish_connect(&mut self, drag: ConnectionDrag) {
        if !drag.started {
            return;
        }
        let committed = match &drag.candidate {
            Some(target) => match self.complete_connection(&drag.origin, target) {
                Ok(()) => true,
                Err(reason) => {
                    tracing::debug!(%reason, "connection gesture aborted");
                    false
                }
            },
            None => {
                tracing::debug!(origin = %drag.origin, "connection released on empty canvas");
                false
            }
        };
        self.gesture(GestureEvent::Ended {
            kind: GestureKind::Connect,
            committed,
        });
    }

    /// Normalize to output -> input, run the caller hook, then commit
    fn complete_connection(&mut self, origin: &Endpoint, target: &Endpoint) -> Result<(), InvalidGesture> {
        let graph = self.store.graph();
        let from = graph
            .port(origin)
            .ok_or_else(|| InvalidGesture::PortVanished(origin.clone()))?;
        let to = graph
            .port(target)
            .ok_or_else(|| InvalidGesture::PortVanished(target.clone()))?;
        let (source, sink) = match (from.direction, to.direction) {
            (PortDirection::Output, PortDirection::Input) => (origin.clone(), target.clone()),
            (PortDirection::Input, PortDirection::Output) => (target.clone(), origin.clone()),
            _ => {
                return Err(InvalidGesture::IncompatibleDirection {
                    from: origin.clone(),
                    to: target.clone(),
                })
            }
        };
        let connection = Connection::between(source, sink);
        if let Some(validator) = &self.validator {
            if !validator(&connection, graph) {
                return Err(InvalidGesture::RejectedByValidator);
            }
        }
        self.add_connection(connection)?;
        Ok(())
    }

    fn update_marquee(&mut self, mut marquee: BoxSelection, cursor: Point) -> InteractionMode {
        if !marquee.started {
            if !self.passes_threshold(marquee.press_screen, cursor) {
                return InteractionMode::MarqueeSelecting(marquee);
            }
            marquee.started = true;
            self.gesture(GestureEvent::Started {
                kind: GestureKind::Marquee,
                cursor,
            });
        } else {
            self.gesture(GestureEvent::Moved {
                kind: GestureKind::Marquee,
                cursor,
            });
        }
        marquee.current = self.viewport.screen_to_world(cursor);
        InteractionMode::MarqueeSelecting(marquee)
    }

    fn finish_marquee(&mut self, marquee: BoxSelection) {
        if !marquee.started {
            if !marquee.additive {
                self.clear_selection();
            }
            return;
        }
        let rect = marquee.rect();
        let hits: IndexSet<NodeId> = self
            .spatial
            .query_rect(&rect)
            .into_iter()
            .filter_map(|key| key.as_node().cloned())
            .collect();
        let graph = self.store.graph();
        let picked: Vec<NodeId> = graph
            .nodes()
            .filter(|node| hits.contains(&node.id))
            .filter(|node| match self.config.marquee_mode {
                MarqueeMode::Contain => rect.contains_rect(&node.bounds()),
                MarqueeMode::Intersect => rect.intersects(&node.bounds()),
            })
            .map(|node| node.id.clone())
            .collect();
        self.selection.set_nodes(picked, marquee.additive);
        self.emit_selection();
        self.gesture(GestureEvent::Ended {
            kind: GestureKind::Marquee,
            committed: true,
        });
    }

    fn update_resize(&mut self, mut resize: NodeResize, cursor: Point) -> InteractionMode {
        let node = self.store.graph().node(&resize.node).cloned();
        let Some(node) = node else {
            let reason = InvalidGesture::NodeVanished(resize.node.clone());
            return self.abort(InteractionMode::ResizingNode(resize), reason);
        };
        if !resize.started {
            if !self.passes_threshold(resize.press_screen, cursor) {
                return InteractionMode::ResizingNode(resize);
            }
            resize.started = true;
            self.gesture(GestureEvent::Started {
                kind: GestureKind::Resize,
                cursor,
            });
        } else {
            self.gesture(GestureEvent::Moved {
                kind: GestureKind::Resize,
                cursor,
            });
        }
        let delta = self.viewport.screen_to_world(cursor) - resize.press_world;
        resize.staged = resize.handle.resize(&resize.start, delta, self.config.min_node_size);
        let mut moved = IndexMap::new();
        moved.insert(
            node.id.clone(),
            Node {
                position: resize.staged.min,
                size: Size::new(resize.staged.width(), resize.staged.height()),
                ..node
            },
        );
        resize.live_paths = self.live_paths(&moved);
        InteractionMode::ResizingNode(resize)
    }

    fn finish_resize(&mut self, resize: NodeResize) {
        if !resize.started {
            return;
        }
        let staged = resize.staged;
        let patch = NodePatch::size(Size::new(staged.width(), staged.height())).with_position(staged.min);
        let committed = staged == resize.start
            || match self.update_node(&resize.node, &patch) {
                Ok(_) => true,
                Err(err) => {
                    tracing::debug!(reason = %InvalidGesture::from(err), "resize rejected");
                    false
                }
            };
        self.gesture(GestureEvent::Ended {
            kind: GestureKind::Resize,
            committed,
        });
    }

    /// Bounds of visible nodes that are not part of the drag
    fn snap_neighbours(&self, dragged: &IndexMap<NodeId, Point>) -> Vec<Rect> {
        let graph = self.store.graph();
        self.spatial
            .query_rect(&self.viewport.visible_world())
            .into_iter()
            .filter_map(|key| {
                let id = key.as_node()?;
                if dragged.contains_key(id) {
                    return None;
                }
                graph.node(id).map(Node::bounds)
            })
            .collect()
    }

    /// Route every connection touching `moved` using the staged snapshots
    fn live_paths(&self, moved: &IndexMap<NodeId, Node>) -> IndexMap<ConnectionId, RoutedPath> {
        let graph = self.store.graph();
        let outset = self.config.port_outset;
        let anchor = |endpoint: &Endpoint| match moved.get(&endpoint.node) {
            Some(node) => node.anchor(&endpoint.port, outset),
            None => graph.anchor(endpoint, outset),
        };
        let mut paths = IndexMap::new();
        for id in moved.keys() {
            for connection in graph.connections_for_node(id) {
                if paths.contains_key(&connection.id) {
                    continue;
                }
                let (Some(from), Some(to)) = (anchor(&connection.source), anchor(&connection.target)) else {
                    continue;
                };
                let style = connection.style.unwrap_or(self.config.default_link_style);
                let path = self.router.route(style, from, to, self.viewport.zoom);
                paths.insert(connection.id.clone(), path);
            }
        }
        paths
    }

    fn abort(&mut self, mode: InteractionMode, reason: InvalidGesture) -> InteractionMode {
        tracing::debug!(%reason, "gesture aborted");
        self.end_gesture(&mode, false);
        InteractionMode::Idle
    }

    fn end_gesture(&mut self, mode: &InteractionMode, committed: bool) {
        if !mode.is_started() {
            return;
        }
        if let InteractionMode::DraggingNodes(drag) = mode {
            let nodes = drag.start_positions.keys().cloned().collect();
            self.events.emit(&EditorEvent::DragStopped { nodes, committed });
        }
        if let Some(kind) = mode.gesture_kind() {
            self.gesture(GestureEvent::Ended { kind, committed });
        }
    }

    fn gesture(&mut self, event: GestureEvent) {
        let ctx = ExtensionContext {
            graph: self.store.graph(),
            viewport: &self.viewport,
            spatial: &self.spatial,
        };
        let effects = self.extensions.dispatch_gesture(&event, &ctx);
        self.apply_effects(effects);
    }
}
