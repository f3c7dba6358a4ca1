// SPDX-License-Identifier: MIT OR Apache-2.0
//! `nodeflow` - command-line tools for node-graph snapshots
//!
//! Loads JSON or RON snapshots through the same engine an editor embeds, so a
//! file that passes `check` here loads in any host.

mod commands;

use clap::Parser;
use commands::Cli;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn main() {
    let cli = Cli::parse();

    let directive = if cli.verbose { "nodeflow=debug" } else { "nodeflow=info" };
    let mut env_filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = directive.parse() {
        env_filter = env_filter.add_directive(directive);
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("Starting nodeflow v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = commands::run(cli) {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}
