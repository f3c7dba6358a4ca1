// SPDX-License-Identifier: MIT OR Apache-2.0
//! Engine configuration.
//!
//! Every field has a default, so a RON file only needs the values it changes.

use crate::history::MAX_HISTORY;
use crate::routing::{LinkStyle, RouterConfig};
use crate::snap::SnapConfig;
use crate::spatial::DEFAULT_CELL_SIZE;
use crate::store::{CapacityPolicy, StoreSettings};
use crate::viewport::{Viewport, DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Config loading or validation failure
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid RON for this schema
    #[error("RON error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    /// Encoding failed
    #[error("RON encode error: {0}")]
    Encode(#[from] ron::Error),

    /// A value is out of range
    #[error("Invalid config value `{field}`: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

/// How a marquee decides which nodes it selects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarqueeMode {
    /// Node bounds must lie fully inside the rectangle
    #[default]
    Contain,
    /// Any overlap selects the node
    Intersect,
}

/// One entry of the ordered extension list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionConfig {
    /// Registry key (`minimap`, `autopan`, ...)
    pub key: String,
    /// Attach on startup instead of on first access
    #[serde(default)]
    pub eager: bool,
    /// Extension-specific options, interpreted by the extension itself
    #[serde(default)]
    pub options: serde_json::Value,
}

impl ExtensionConfig {
    /// Lazily attached extension with default options
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            eager: false,
            options: serde_json::Value::Null,
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Lower zoom bound
    pub min_zoom: f32,
    /// Upper zoom bound
    pub max_zoom: f32,
    /// Radius (world units) within which a connect gesture snaps to a port
    pub port_snap_distance: f32,
    /// Wheel zooms when true, pans when false
    pub scroll_to_zoom: bool,
    /// Capacity of input ports without an explicit limit
    pub max_input_connections: usize,
    /// Extensions in registration order
    pub extensions: Vec<ExtensionConfig>,
    /// What happens when a connection targets a full port
    pub capacity_policy: CapacityPolicy,
    /// Distance of port anchors outside the node edge (world units)
    pub port_outset: f32,
    /// Hit radius of port anchors (world units)
    pub port_hit_radius: f32,
    /// Edge length of the corner resize handles; edge strips are half as thick (world units)
    pub resize_handle_size: f32,
    /// Smallest size a resize can produce (world units)
    pub min_node_size: f32,
    /// Pointer travel (screen px) before a press becomes a drag
    pub drag_threshold: f32,
    /// Maximum gap between two taps of a double tap
    pub double_tap_ms: u64,
    /// Spatial hash cell edge (world units)
    pub spatial_cell_size: f32,
    /// Style of connections without an override
    pub default_link_style: LinkStyle,
    /// Router tuning
    pub router: RouterConfig,
    /// Snapping
    pub snap: SnapConfig,
    /// Undo depth; 0 disables history
    pub history_depth: usize,
    /// Marquee selection rule
    pub marquee_mode: MarqueeMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            port_snap_distance: 24.0,
            scroll_to_zoom: true,
            max_input_connections: 1,
            extensions: Vec::new(),
            capacity_policy: CapacityPolicy::Reject,
            port_outset: 0.0,
            port_hit_radius: 8.0,
            resize_handle_size: 12.0,
            min_node_size: 40.0,
            drag_threshold: 3.0,
            double_tap_ms: 300,
            spatial_cell_size: DEFAULT_CELL_SIZE,
            default_link_style: LinkStyle::Bezier,
            router: RouterConfig::default(),
            snap: SnapConfig::default(),
            history_depth: MAX_HISTORY,
            marquee_mode: MarqueeMode::Contain,
        }
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("must be a positive number, got {value}")))
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("must be zero or positive, got {value}")))
    }
}

impl EngineConfig {
    /// Parse from a RON string and validate
    pub fn from_ron_str(content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = ron::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a RON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_ron_str(&content)?;
        tracing::info!(path = %path.display(), extensions = config.extensions.len(), "config loaded");
        Ok(config)
    }

    /// Pretty RON
    pub fn to_ron(&self) -> Result<String, ConfigError> {
        let pretty = ron::ser::PrettyConfig::default().struct_names(true);
        Ok(ron::ser::to_string_pretty(self, pretty)?)
    }

    /// Save as RON
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_ron()?)?;
        Ok(())
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("min_zoom", self.min_zoom)?;
        positive("max_zoom", self.max_zoom)?;
        if self.min_zoom > self.max_zoom {
            return Err(invalid(
                "max_zoom",
                format!("{} is below min_zoom {}", self.max_zoom, self.min_zoom),
            ));
        }
        non_negative("port_snap_distance", self.port_snap_distance)?;
        if self.max_input_connections == 0 {
            return Err(invalid("max_input_connections", "must be at least 1"));
        }
        non_negative("port_outset", self.port_outset)?;
        positive("port_hit_radius", self.port_hit_radius)?;
        non_negative("resize_handle_size", self.resize_handle_size)?;
        positive("min_node_size", self.min_node_size)?;
        non_negative("drag_threshold", self.drag_threshold)?;
        positive("spatial_cell_size", self.spatial_cell_size)?;

        non_negative("router.step_offset", self.router.step_offset)?;
        non_negative("router.step_corner_radius", self.router.step_corner_radius)?;
        non_negative("router.smooth_corner_radius", self.router.smooth_corner_radius)?;
        non_negative("router.bezier_curvature", self.router.bezier_curvature)?;
        non_negative("router.bezier_min_offset", self.router.bezier_min_offset)?;
        non_negative("router.bezier_max_offset", self.router.bezier_max_offset)?;
        if self.router.bezier_min_offset > self.router.bezier_max_offset {
            return Err(invalid("router.bezier_max_offset", "is below bezier_min_offset"));
        }
        if self.router.curve_samples == 0 {
            return Err(invalid("router.curve_samples", "must be at least 1"));
        }

        if let Some(cell) = self.snap.grid_size {
            positive("snap.grid_size", cell)?;
        }
        if let Some(tolerance) = self.snap.alignment_tolerance_px {
            non_negative("snap.alignment_tolerance_px", tolerance)?;
        }

        let mut seen = std::collections::HashSet::new();
        for extension in &self.extensions {
            if extension.key.trim().is_empty() {
                return Err(invalid("extensions", "empty extension key"));
            }
            if !seen.insert(extension.key.as_str()) {
                return Err(invalid("extensions", format!("`{}` listed twice", extension.key)));
            }
        }
        Ok(())
    }

    /// Store settings derived from this config
    pub fn store_settings(&self) -> StoreSettings {
        StoreSettings {
            max_input_connections: self.max_input_connections,
            capacity_policy: self.capacity_policy,
            history_depth: self.history_depth,
        }
    }

    /// Initial viewport derived from this config
    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.min_zoom, self.max_zoom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.max_input_connections, 1);
        assert_eq!(config.default_link_style, LinkStyle::Bezier);
        assert_eq!(config.marquee_mode, MarqueeMode::Contain);
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let config = EngineConfig::from_ron_str(
            r#"(
                max_zoom: 2.0,
                scroll_to_zoom: false,
                capacity_policy: replace,
                snap: (enabled: true, grid_size: Some(10.0)),
                extensions: [(key: "minimap"), (key: "stats", eager: true)],
            )"#,
        )
        .unwrap();
        assert_eq!(config.max_zoom, 2.0);
        assert_eq!(config.min_zoom, DEFAULT_MIN_ZOOM);
        assert!(!config.scroll_to_zoom);
        assert_eq!(config.capacity_policy, CapacityPolicy::Replace);
        assert!(config.snap.enabled);
        assert_eq!(config.snap.grid_size, Some(10.0));
        assert_eq!(config.extensions.len(), 2);
        assert!(config.extensions[1].eager);
    }

    #[test]
    fn test_ron_round_trip() {
        let mut config = EngineConfig::default();
        config.extensions.push(ExtensionConfig::new("autopan"));
        config.default_link_style = LinkStyle::SmoothStep;
        let text = config.to_ron().unwrap();
        let back = EngineConfig::from_ron_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = EngineConfig::default();
        config.min_zoom = 5.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "max_zoom", .. })
        ));

        let mut config = EngineConfig::default();
        config.spatial_cell_size = f32::NAN;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.extensions = vec![ExtensionConfig::new("stats"), ExtensionConfig::new("stats")];
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.max_input_connections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_ron_is_an_error() {
        assert!(matches!(
            EngineConfig::from_ron_str("(min_zoom: \"low\")"),
            Err(ConfigError::Ron(_))
        ));
    }
}
