// SPDX-License-Identifier: MIT OR Apache-2.0
//! Subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use nodeflow_graph::config::ConfigError;
use nodeflow_graph::extensions::{Stats, STATS};
use nodeflow_graph::{EngineConfig, GraphEditor, GraphSnapshot, LinkStyle, Node, Rect, SerializationError};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// CLI failure
#[derive(Debug, Error)]
pub enum CliError {
    /// Reading or writing a file failed
    #[error("{path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Engine config could not be loaded
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    /// Snapshot could not be decoded or breaks a graph invariant
    #[error("{path}: {source}")]
    Snapshot {
        /// File involved
        path: PathBuf,
        /// Underlying error
        source: SerializationError,
    },

    /// Statistics could not be encoded
    #[error("encoding output: {0}")]
    Output(#[from] serde_json::Error),
}

type Result<T> = std::result::Result<T, CliError>;

/// Node-graph snapshot tools
#[derive(Parser)]
#[command(name = "nodeflow")]
#[command(about = "Validate, route and inspect node-graph snapshots")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Engine config (RON); defaults apply when omitted
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Link style override
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum StyleChoice {
    Straight,
    Step,
    SmoothStep,
    Bezier,
}

impl From<StyleChoice> for LinkStyle {
    fn from(choice: StyleChoice) -> Self {
        match choice {
            StyleChoice::Straight => LinkStyle::Straight,
            StyleChoice::Step => LinkStyle::Step,
            StyleChoice::SmoothStep => LinkStyle::SmoothStep,
            StyleChoice::Bezier => LinkStyle::Bezier,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load a snapshot and report whether it satisfies every graph invariant
    Check {
        /// Snapshot file (.json or .ron)
        input: PathBuf,
    },

    /// Route every connection and print its length and SVG path
    Route {
        /// Snapshot file (.json or .ron)
        input: PathBuf,

        /// Style for connections without their own
        #[arg(long, value_enum)]
        style: Option<StyleChoice>,
    },

    /// Print graph statistics as JSON
    Stats {
        /// Snapshot file (.json or .ron)
        input: PathBuf,
    },

    /// Re-encode a snapshot; the format follows the output extension
    Convert {
        /// Snapshot file (.json or .ron)
        input: PathBuf,

        /// Destination (.json or .ron)
        output: PathBuf,
    },

    /// Write the default engine config as RON
    InitConfig {
        /// Destination file
        output: PathBuf,
    },
}

/// Execute a parsed command line
pub fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Check { input } => {
            let editor = load_editor(config, &input)?;
            let graph = editor.graph();
            println!(
                "{}: ok ({} nodes, {} connections)",
                input.display(),
                graph.node_count(),
                graph.connection_count()
            );
        }
        Commands::Route { input, style } => {
            let mut config = config;
            if let Some(style) = style {
                config.default_link_style = style.into();
            }
            let editor = load_editor(config, &input)?;
            for (id, path) in editor.paths() {
                println!("{id}\t{:.2}\t{}", path.length(), path.to_svg());
            }
        }
        Commands::Stats { input } => {
            let snapshot = read_snapshot(&input)?;
            let mut editor = GraphEditor::new(config)?;
            if !editor.extensions_mut().is_registered(STATS) {
                editor
                    .extensions_mut()
                    .register(STATS, serde_json::Value::Null, |_| Box::new(Stats::default()));
            }
            // Attach before loading so the load itself is counted.
            editor.extension_as::<Stats>(STATS);
            editor
                .load_snapshot(snapshot)
                .map_err(|source| CliError::Snapshot {
                    path: input.clone(),
                    source,
                })?;
            let bounds = editor.graph().nodes().map(Node::bounds).reduce(|a, b| a.union(&b));
            let stats = editor.extension_as::<Stats>(STATS).map(Stats::stats);
            let report = serde_json::json!({
                "stats": stats,
                "bounds": bounds.map(|r: Rect| [r.min.x, r.min.y, r.max.x, r.max.y]),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Convert { input, output } => {
            let snapshot = read_snapshot(&input)?;
            snapshot
                .validate(config.store_settings())
                .map_err(|source| CliError::Snapshot {
                    path: input.clone(),
                    source,
                })?;
            let encoded = if is_ron(&output) {
                snapshot.to_ron()
            } else {
                snapshot.to_json()
            }
            .map_err(|source| CliError::Snapshot {
                path: output.clone(),
                source,
            })?;
            write(&output, &encoded)?;
            tracing::info!(from = %input.display(), to = %output.display(), "snapshot converted");
        }
        Commands::InitConfig { output } => {
            config.save(&output)?;
        }
    }
    Ok(())
}

fn is_ron(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("ron"))
}

fn read_snapshot(path: &Path) -> Result<GraphSnapshot> {
    let content = fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let decoded = if is_ron(path) {
        GraphSnapshot::from_ron(&content)
    } else {
        GraphSnapshot::from_json(&content)
    };
    decoded.map_err(|source| CliError::Snapshot {
        path: path.to_path_buf(),
        source,
    })
}

fn load_editor(config: EngineConfig, path: &Path) -> Result<GraphEditor> {
    let snapshot = read_snapshot(path)?;
    let mut editor = GraphEditor::new(config)?;
    editor.load_snapshot(snapshot).map_err(|source| CliError::Snapshot {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), nodes = editor.graph().node_count(), "snapshot loaded");
    Ok(editor)
}

fn write(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}
