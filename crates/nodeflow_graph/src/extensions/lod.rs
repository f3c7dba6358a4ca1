// SPDX-License-Identifier: MIT OR Apache-2.0
//! Zoom-driven level of detail.

use super::LEVEL_OF_DETAIL;
use crate::extension::{parse_options, Extension, ExtensionContext, ExtensionEffect};
use serde::{Deserialize, Serialize};
use std::any::Any;

/// How much a renderer should draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelOfDetail {
    /// Boxes only
    Minimal,
    /// Boxes, titles and ports
    Simplified,
    /// Everything
    #[default]
    Full,
}

/// Zoom thresholds; below `simplified` the level drops, below `minimal` it drops again
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LodOptions {
    /// Zoom under which the level is `simplified`
    pub simplified: f32,
    /// Zoom under which the level is `minimal`
    pub minimal: f32,
}

impl Default for LodOptions {
    fn default() -> Self {
        Self {
            simplified: 0.6,
            minimal: 0.3,
        }
    }
}

impl LodOptions {
    /// Level for a zoom factor
    pub fn level(&self, zoom: f32) -> LevelOfDetail {
        if zoom < self.minimal {
            LevelOfDetail::Minimal
        } else if zoom < self.simplified {
            LevelOfDetail::Simplified
        } else {
            LevelOfDetail::Full
        }
    }
}

/// Tracks the current level from viewport changes
#[derive(Debug, Clone, Default)]
pub struct LodTracker {
    options: LodOptions,
    level: LevelOfDetail,
}

impl LodTracker {
    /// Build from registry options
    pub fn from_options(options: &serde_json::Value) -> Self {
        Self {
            options: parse_options(LEVEL_OF_DETAIL, options),
            level: LevelOfDetail::Full,
        }
    }

    /// Current level
    pub fn level(&self) -> LevelOfDetail {
        self.level
    }

    fn refresh(&mut self, zoom: f32) {
        let level = self.options.level(zoom);
        if level != self.level {
            tracing::debug!(?level, zoom, "level of detail changed");
            self.level = level;
        }
    }
}

impl Extension for LodTracker {
    fn key(&self) -> &str {
        LEVEL_OF_DETAIL
    }

    fn on_attach(&mut self, ctx: &ExtensionContext<'_>) {
        self.refresh(ctx.viewport.zoom);
    }

    fn on_viewport_change(&mut self, ctx: &ExtensionContext<'_>) -> Vec<ExtensionEffect> {
        self.refresh(ctx.viewport.zoom);
        Vec::new()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::spatial::SpatialIndex;
    use crate::viewport::Viewport;

    #[test]
    fn test_thresholds() {
        let options = LodOptions::default();
        assert_eq!(options.level(1.0), LevelOfDetail::Full);
        assert_eq!(options.level(0.6), LevelOfDetail::Full);
        assert_eq!(options.level(0.5), LevelOfDetail::Simplified);
        assert_eq!(options.level(0.2), LevelOfDetail::Minimal);
    }

    #[test]
    fn test_tracks_viewport() {
        let graph = Graph::default();
        let spatial = SpatialIndex::default();
        let mut viewport = Viewport::default();
        viewport.zoom = 0.2;
        let mut tracker = LodTracker::from_options(&serde_json::json!({ "simplified": 0.8 }));
        tracker.on_attach(&ExtensionContext {
            graph: &graph,
            viewport: &viewport,
            spatial: &spatial,
        });
        assert_eq!(tracker.level(), LevelOfDetail::Minimal);

        viewport.zoom = 0.7;
        tracker.on_viewport_change(&ExtensionContext {
            graph: &graph,
            viewport: &viewport,
            spatial: &spatial,
        });
        assert_eq!(tracker.level(), LevelOfDetail::Simplified);
    }
}
