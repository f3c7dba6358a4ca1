// SPDX-License-Identifier: MIT OR Apache-2.0
//! Built-in extensions.

pub mod autopan;
pub mod debug;
pub mod lod;
pub mod minimap;
pub mod stats;

use crate::config::ExtensionConfig;
use crate::extension::{Extension, ExtensionRegistry};

pub use autopan::{Autopan, AutopanOptions};
pub use debug::{DebugOptions, DebugOverlay};
pub use lod::{LevelOfDetail, LodOptions, LodTracker};
pub use minimap::{Minimap, MinimapLayout, MinimapOptions};
pub use stats::{GraphStats, Stats};

/// Key of the minimap extension
pub const MINIMAP: &str = "minimap";
/// Key of the autopan extension
pub const AUTOPAN: &str = "autopan";
/// Key of the level-of-detail extension
pub const LEVEL_OF_DETAIL: &str = "level-of-detail";
/// Key of the statistics extension
pub const STATS: &str = "stats";
/// Key of the debug overlay extension
pub const DEBUG: &str = "debug";

/// Constructor of a built-in extension
pub type Builder = fn(&serde_json::Value) -> Box<dyn Extension>;

fn build_minimap(options: &serde_json::Value) -> Box<dyn Extension> {
    Box::new(Minimap::from_options(options))
}

fn build_autopan(options: &serde_json::Value) -> Box<dyn Extension> {
    Box::new(Autopan::from_options(options))
}

fn build_lod(options: &serde_json::Value) -> Box<dyn Extension> {
    Box::new(LodTracker::from_options(options))
}

fn build_stats(_options: &serde_json::Value) -> Box<dyn Extension> {
    Box::new(Stats::default())
}

fn build_debug(options: &serde_json::Value) -> Box<dyn Extension> {
    Box::new(DebugOverlay::from_options(options))
}

/// Factory for a built-in key
pub fn builtin(key: &str) -> Option<Builder> {
    let builder: Builder = match key {
        MINIMAP => build_minimap,
        AUTOPAN => build_autopan,
        LEVEL_OF_DETAIL => build_lod,
        STATS => build_stats,
        DEBUG => build_debug,
        _ => return None,
    };
    Some(builder)
}

/// Register the configured built-ins in list order.
///
/// Unknown keys are skipped with a warning. Returns the keys flagged `eager`.
pub fn register_configured(registry: &mut ExtensionRegistry, configs: &[ExtensionConfig]) -> Vec<String> {
    let mut eager = Vec::new();
    for config in configs {
        let Some(builder) = builtin(&config.key) else {
            tracing::warn!(extension = %config.key, "unknown extension key, skipped");
            continue;
        };
        registry.register(config.key.clone(), config.options.clone(), builder);
        if config.eager {
            eager.push(config.key.clone());
        }
    }
    eager
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_configured_skips_unknown() {
        let mut registry = ExtensionRegistry::new();
        let mut stats = ExtensionConfig::new(STATS);
        stats.eager = true;
        let configs = vec![ExtensionConfig::new(MINIMAP), ExtensionConfig::new("sparkles"), stats];

        let eager = register_configured(&mut registry, &configs);
        assert_eq!(registry.keys().collect::<Vec<_>>(), vec![MINIMAP, STATS]);
        assert_eq!(eager, vec![STATS.to_string()]);
    }

    #[test]
    fn test_builtin_keys_match_instances() {
        for key in [MINIMAP, AUTOPAN, LEVEL_OF_DETAIL, STATS, DEBUG] {
            let builder = builtin(key).unwrap();
            assert_eq!(builder(&serde_json::Value::Null).key(), key);
        }
        assert!(builtin("nope").is_none());
    }
}
