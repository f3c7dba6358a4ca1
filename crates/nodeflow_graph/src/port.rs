// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port definitions for node inputs/outputs.

use crate::geometry::Point;
use crate::id::PortId;
use serde::{Deserialize, Serialize};

/// Port direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortDirection {
    /// Input port (connection target)
    Input,
    /// Output port (connection source)
    Output,
}

impl PortDirection {
    /// The direction a compatible port must have
    pub fn opposite(self) -> Self {
        match self {
            Self::Input => Self::Output,
            Self::Output => Self::Input,
        }
    }
}

/// Node edge a port is attached to.
///
/// The side decides the default anchor placement and the direction a routed
/// link leaves (or enters) the port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortSide {
    /// Top edge
    Top,
    /// Right edge
    Right,
    /// Bottom edge
    Bottom,
    /// Left edge
    Left,
}

impl PortSide {
    /// Outward unit vector for this side
    pub fn direction(self) -> Point {
        match self {
            Self::Top => Point::new(0.0, -1.0),
            Self::Right => Point::new(1.0, 0.0),
            Self::Bottom => Point::new(0.0, 1.0),
            Self::Left => Point::new(-1.0, 0.0),
        }
    }

    /// The side facing this one
    pub fn opposite(self) -> Self {
        match self {
            Self::Top => Self::Bottom,
            Self::Right => Self::Left,
            Self::Bottom => Self::Top,
            Self::Left => Self::Right,
        }
    }

    /// Whether links leave this side horizontally
    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }

    /// Default side for a port direction (inputs left, outputs right)
    pub fn default_for(direction: PortDirection) -> Self {
        match direction {
            PortDirection::Input => Self::Left,
            PortDirection::Output => Self::Right,
        }
    }
}

/// Visual shape hint for the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortShape {
    /// Circle (default)
    #[default]
    Circle,
    /// Square
    Square,
    /// Diamond
    Diamond,
    /// Triangle pointing along the port direction
    Triangle,
}

/// A port on a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    /// Port ID, unique within the owning node
    pub id: PortId,
    /// Port name
    pub name: String,
    /// Port direction
    pub direction: PortDirection,
    /// Edge of the node the port sits on
    pub side: PortSide,
    /// Shape hint
    #[serde(default)]
    pub shape: PortShape,
    /// Maximum number of attached connections.
    ///
    /// `None` falls back to the engine default: the configured input capacity
    /// for inputs, unlimited for outputs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<usize>,
    /// Placement along the side as a ratio in `[0, 1]`.
    ///
    /// `None` spreads the ports of one side evenly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<f32>,
}

impl Port {
    /// Create a new port on the default side for its direction
    pub fn new(id: impl Into<PortId>, name: impl Into<String>, direction: PortDirection) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            direction,
            side: PortSide::default_for(direction),
            shape: PortShape::default(),
            max_connections: None,
            offset: None,
        }
    }

    /// Create a new input port
    pub fn input(id: impl Into<PortId>, name: impl Into<String>) -> Self {
        Self::new(id, name, PortDirection::Input)
    }

    /// Create a new output port
    pub fn output(id: impl Into<PortId>, name: impl Into<String>) -> Self {
        Self::new(id, name, PortDirection::Output)
    }

    /// Place the port on a side
    pub fn on_side(mut self, side: PortSide) -> Self {
        self.side = side;
        self
    }

    /// Set the shape hint
    pub fn with_shape(mut self, shape: PortShape) -> Self {
        self.shape = shape;
        self
    }

    /// Set an explicit connection capacity
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = Some(max);
        self
    }

    /// Set the placement ratio along the side
    pub fn with_offset(mut self, ratio: f32) -> Self {
        self.offset = Some(ratio);
        self
    }

    /// Effective capacity given the engine's default input capacity
    pub fn capacity(&self, default_input_capacity: usize) -> Option<usize> {
        match (self.max_connections, self.direction) {
            (Some(max), _) => Some(max),
            (None, PortDirection::Input) => Some(default_input_capacity),
            (None, PortDirection::Output) => None,
        }
    }

    /// Check if a connection from this port to another one has compatible directions
    pub fn can_connect(&self, other: &Port) -> bool {
        self.direction == PortDirection::Output && other.direction == PortDirection::Input
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sides() {
        assert_eq!(Port::input("i", "In").side, PortSide::Left);
        assert_eq!(Port::output("o", "Out").side, PortSide::Right);
    }

    #[test]
    fn test_capacity_defaults() {
        let input = Port::input("i", "In");
        let output = Port::output("o", "Out");
        assert_eq!(input.capacity(1), Some(1));
        assert_eq!(input.capacity(3), Some(3));
        assert_eq!(output.capacity(1), None);
        assert_eq!(output.with_max_connections(2).capacity(1), Some(2));
    }

    #[test]
    fn test_direction_compatibility() {
        let input = Port::input("i", "In");
        let output = Port::output("o", "Out");
        assert!(output.can_connect(&input));
        assert!(!input.can_connect(&output));
        assert!(!output.can_connect(&output));
    }

    #[test]
    fn test_side_directions_are_unit_vectors() {
        for side in [PortSide::Top, PortSide::Right, PortSide::Bottom, PortSide::Left] {
            assert!((side.direction().length() - 1.0).abs() < 1e-6);
            assert!(side.direction().approx_eq(-side.opposite().direction()));
        }
    }
}
