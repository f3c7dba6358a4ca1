// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the graph.
//!
//! Nodes are value snapshots. Every change goes through a [`NodePatch`] that
//! produces a replacement node stored under the same [`NodeId`].

use crate::geometry::{Point, Rect, Size};
use crate::id::{NodeId, PortId};
use crate::port::{Port, PortSide};
use serde::{Deserialize, Serialize};

/// Size given to nodes built without an explicit size
pub const DEFAULT_NODE_SIZE: Size = Size::new(180.0, 80.0);

/// Arithmetic operator carried by operator nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorKind {
    /// `a + b`
    Add,
    /// `a - b`
    Subtract,
    /// `a * b`
    Multiply,
    /// `a / b`
    Divide,
}

/// Caller-owned node payload.
///
/// The engine never interprets it; it only asks [`same_as`](Self::same_as)
/// whether a data patch changed anything.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodePayload {
    /// No payload
    #[default]
    Empty,
    /// Numeric constant
    Number {
        /// Constant value
        value: f64,
    },
    /// Binary operator
    Operator {
        /// Operation applied to the two inputs
        op: OperatorKind,
    },
    /// Named function call
    Function {
        /// Function name
        name: String,
        /// Number of arguments
        arity: u8,
    },
    /// Result sink
    Result {
        /// Last value shown by the sink
        value: Option<f64>,
    },
    /// Anything else, kept as JSON
    Custom {
        /// Arbitrary JSON document
        value: serde_json::Value,
    },
}

impl NodePayload {
    /// Bitwise equality: unlike `==`, a NaN value equals itself
    pub fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Number { value: a }, Self::Number { value: b }) => a.to_bits() == b.to_bits(),
            (Self::Result { value: a }, Self::Result { value: b }) => a.map(f64::to_bits) == b.map(f64::to_bits),
            _ => self == other,
        }
    }
}

/// Explicit paint layer; within a layer later nodes paint above earlier ones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// Always below normal nodes
    Back,
    /// Insertion order
    #[default]
    Normal,
    /// Always above normal nodes
    Front,
}

/// World-space attachment point of a port
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    /// Anchor position
    pub point: Point,
    /// Side the port sits on (gives the routing direction)
    pub side: PortSide,
}

/// A node instance in the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique instance ID
    pub id: NodeId,
    /// Node type discriminator
    #[serde(rename = "type")]
    pub node_type: String,
    /// Top-left corner in world units
    pub position: Point,
    /// Node size in world units
    pub size: Size,
    /// Input ports
    pub inputs: Vec<Port>,
    /// Output ports
    pub outputs: Vec<Port>,
    /// Caller payload
    #[serde(default)]
    pub data: NodePayload,
    /// Paint layer
    #[serde(default)]
    pub placement: Placement,
}

impl Node {
    /// Create a node with no ports at the origin
    pub fn new(id: impl Into<NodeId>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            position: Point::ZERO,
            size: DEFAULT_NODE_SIZE,
            inputs: Vec::new(),
            outputs: Vec::new(),
            data: NodePayload::Empty,
            placement: Placement::Normal,
        }
    }

    /// Set the position
    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = Point::new(x, y);
        self
    }

    /// Set the size
    pub fn with_size(mut self, w: f32, h: f32) -> Self {
        self.size = Size::new(w, h);
        self
    }

    /// Append an input port
    pub fn with_input(mut self, port: Port) -> Self {
        self.inputs.push(port);
        self
    }

    /// Append an output port
    pub fn with_output(mut self, port: Port) -> Self {
        self.outputs.push(port);
        self
    }

    /// Set the payload
    pub fn with_data(mut self, data: NodePayload) -> Self {
        self.data = data;
        self
    }

    /// Set the paint layer
    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    /// Get an input port by index
    pub fn input(&self, index: usize) -> Option<&Port> {
        self.inputs.get(index)
    }

    /// Get an output port by index
    pub fn output(&self, index: usize) -> Option<&Port> {
        self.outputs.get(index)
    }

    /// Get a port by ID
    pub fn port(&self, port_id: &PortId) -> Option<&Port> {
        self.ports().find(|p| p.id == *port_id)
    }

    /// Get all ports, inputs first
    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.inputs.iter().chain(self.outputs.iter())
    }

    /// World-space bounds
    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.position, self.size)
    }

    /// First duplicated port id, if any
    pub fn duplicate_port(&self) -> Option<&PortId> {
        let mut seen = std::collections::HashSet::new();
        self.ports().map(|p| &p.id).find(|id| !seen.insert(*id))
    }

    /// Anchor point of a port, `outset` world units outside the node edge
    pub fn anchor(&self, port_id: &PortId, outset: f32) -> Option<Anchor> {
        let port = self.port(port_id)?;
        let side = port.side;
        let ratio = match port.offset {
            Some(ratio) => ratio.clamp(0.0, 1.0),
            None => {
                let on_side: Vec<&Port> = self.ports().filter(|p| p.side == side).collect();
                let index = on_side.iter().position(|p| p.id == *port_id).unwrap_or(0);
                (index as f32 + 1.0) / (on_side.len() as f32 + 1.0)
            }
        };

        let Rect { min, max } = self.bounds();
        let point = match side {
            PortSide::Left => Point::new(min.x - outset, min.y + self.size.h * ratio),
            PortSide::Right => Point::new(max.x + outset, min.y + self.size.h * ratio),
            PortSide::Top => Point::new(min.x + self.size.w * ratio, min.y - outset),
            PortSide::Bottom => Point::new(min.x + self.size.w * ratio, max.y + outset),
        };
        Some(Anchor { point, side })
    }

    /// Whether position is finite and size finite and non-negative
    pub fn has_valid_geometry(&self) -> bool {
        let Size { w, h } = self.size;
        self.position.is_finite() && w.is_finite() && h.is_finite() && w >= 0.0 && h >= 0.0
    }

    /// Whether `other` holds the same content, payload compared with [`NodePayload::same_as`]
    pub fn same_as(&self, other: &Node) -> bool {
        self.id == other.id
            && self.node_type == other.node_type
            && self.position == other.position
            && self.size == other.size
            && self.inputs == other.inputs
            && self.outputs == other.outputs
            && self.placement == other.placement
            && self.data.same_as(&other.data)
    }

    /// Produce the replacement snapshot described by `patch`
    pub fn patched(&self, patch: &NodePatch) -> Node {
        let mut node = self.clone();
        if let Some(position) = patch.position {
            node.position = position;
        }
        if let Some(size) = patch.size {
            node.size = size;
        }
        if let Some(node_type) = &patch.node_type {
            node.node_type.clone_from(node_type);
        }
        if let Some(data) = &patch.data {
            node.data = data.clone();
        }
        if let Some(placement) = patch.placement {
            node.placement = placement;
        }
        if let Some(inputs) = &patch.inputs {
            node.inputs.clone_from(inputs);
        }
        if let Some(outputs) = &patch.outputs {
            node.outputs.clone_from(outputs);
        }
        node
    }
}

/// Partial update applied by `update_node`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodePatch {
    /// New position
    pub position: Option<Point>,
    /// New size
    pub size: Option<Size>,
    /// New type discriminator
    pub node_type: Option<String>,
    /// New payload
    pub data: Option<NodePayload>,
    /// New paint layer
    pub placement: Option<Placement>,
    /// Replacement input ports
    pub inputs: Option<Vec<Port>>,
    /// Replacement output ports
    pub outputs: Option<Vec<Port>>,
}

impl NodePatch {
    /// Patch moving a node
    pub fn position(position: Point) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    /// Patch resizing a node
    pub fn size(size: Size) -> Self {
        Self {
            size: Some(size),
            ..Self::default()
        }
    }

    /// Patch replacing the payload
    pub fn data(data: NodePayload) -> Self {
        Self {
            data: Some(data),
            ..Self::default()
        }
    }

    /// Also move the node
    pub fn with_position(mut self, position: Point) -> Self {
        self.position = Some(position);
        self
    }

    /// Whether the patch touches the port lists
    pub fn changes_ports(&self) -> bool {
        self.inputs.is_some() || self.outputs.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operator_node() -> Node {
        Node::new("op", "operator")
            .with_position(100.0, 100.0)
            .with_size(100.0, 50.0)
            .with_input(Port::input("a", "A").with_offset(0.3))
            .with_input(Port::input("b", "B").with_offset(0.7))
            .with_output(Port::output("out", "Out"))
    }

    #[test]
    fn test_anchor_uses_offset_ratio_and_outset() {
        let node = operator_node();
        let a = node.anchor(&PortId::from("a"), 6.0).unwrap();
        let b = node.anchor(&PortId::from("b"), 6.0).unwrap();
        assert!(a.point.approx_eq(Point::new(94.0, 115.0)));
        assert!(b.point.approx_eq(Point::new(94.0, 135.0)));
        assert_eq!(a.side, PortSide::Left);
    }

    #[test]
    fn test_anchor_spreads_ports_evenly_by_default() {
        let node = Node::new("n", "t")
            .with_size(100.0, 90.0)
            .with_output(Port::output("x", "X"))
            .with_output(Port::output("y", "Y"));
        let x = node.anchor(&PortId::from("x"), 0.0).unwrap();
        let y = node.anchor(&PortId::from("y"), 0.0).unwrap();
        assert!(x.point.approx_eq(Point::new(100.0, 30.0)));
        assert!(y.point.approx_eq(Point::new(100.0, 60.0)));
    }

    #[test]
    fn test_anchor_on_top_and_bottom() {
        let node = Node::new("n", "t")
            .with_size(100.0, 50.0)
            .with_input(Port::input("top", "T").on_side(PortSide::Top))
            .with_output(Port::output("bottom", "B").on_side(PortSide::Bottom));
        let top = node.anchor(&PortId::from("top"), 4.0).unwrap();
        let bottom = node.anchor(&PortId::from("bottom"), 4.0).unwrap();
        assert!(top.point.approx_eq(Point::new(50.0, -4.0)));
        assert!(bottom.point.approx_eq(Point::new(50.0, 54.0)));
    }

    #[test]
    fn test_duplicate_port_detection() {
        let node = Node::new("n", "t")
            .with_input(Port::input("p", "In"))
            .with_output(Port::output("p", "Out"));
        assert_eq!(node.duplicate_port(), Some(&PortId::from("p")));
        assert!(operator_node().duplicate_port().is_none());
    }

    #[test]
    fn test_patch_produces_replacement() {
        let node = operator_node();
        let patched = node.patched(&NodePatch::position(Point::new(5.0, 6.0)));
        assert_eq!(patched.position, Point::new(5.0, 6.0));
        assert_eq!(patched.id, node.id);
        assert_eq!(patched.inputs, node.inputs);
        assert_eq!(node.position, Point::new(100.0, 100.0));
    }

    #[test]
    fn test_payload_same_as_tracks_values() {
        let a = NodePayload::Number { value: 1.0 };
        let b = NodePayload::Number { value: 2.0 };
        assert!(a.same_as(&a.clone()));
        assert!(!a.same_as(&b));
        assert!(!NodePayload::Operator { op: OperatorKind::Add }.same_as(&NodePayload::Operator {
            op: OperatorKind::Multiply
        }));

        let nan = NodePayload::Number { value: f64::NAN };
        assert_ne!(nan, nan.clone());
        assert!(nan.same_as(&nan.clone()));
        assert!(NodePayload::Result { value: Some(f64::NAN) }.same_as(&NodePayload::Result { value: Some(f64::NAN) }));
    }
}
