// SnapTrace - Execution Snapshot Tracer
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! SnapTrace - Execution Snapshot Tracer
//!
//! Steps a program under a debug adapter and writes one snapshot of its frames and
//! heap per executed line.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use eyre::Result;
use snaptrace_common::env::{SNAPTRACE_ADAPTER, SNAPTRACE_CONFIG};
use snaptrace_engine::Language;

mod cmd;
mod config;

use config::FileConfig;

/// Command-line interface for SnapTrace
#[derive(Debug, Parser)]
#[command(name = "snaptrace")]
#[command(about = "SnapTrace - Execution snapshot tracer for program visualization")]
#[command(version)]
pub struct Cli {
    /// Configuration file (default: ./snaptrace.toml when present)
    #[arg(long, global = true, env = SNAPTRACE_CONFIG)]
    pub config: Option<PathBuf>,

    /// Also write logs to a daily rolling file
    #[arg(long, global = true)]
    pub log_file: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Trace a program and write its snapshots as JSON
    Trace {
        /// Settings that override the configuration file
        #[command(flatten)]
        overrides: Overrides,

        /// Write the trace to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pretty-print the JSON trace
        #[arg(long)]
        pretty: bool,
    },
    /// Print the effective configuration as TOML
    Config {
        /// Settings that override the configuration file
        #[command(flatten)]
        overrides: Overrides,
    },
}

/// Command-line settings layered over the configuration file
#[derive(Debug, Clone, Default, Args)]
pub struct Overrides {
    /// Program to trace (Python script or Java main class)
    pub program: Option<String>,

    /// Language of the program
    #[arg(long)]
    pub language: Option<Language>,

    /// Debug adapter command line, e.g. "python3 -m debugpy.adapter"
    #[arg(long, env = SNAPTRACE_ADAPTER)]
    pub adapter: Option<String>,

    /// Frame that marks the start of traceable code
    #[arg(long)]
    pub entry_frame: Option<String>,

    /// Maximum number of pauses to handle
    #[arg(long)]
    pub max_steps: Option<usize>,

    /// Maximum number of heap nodes expanded per pause
    #[arg(long)]
    pub max_heap_nodes: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Do not detect declaration lines from the source text
    #[arg(long)]
    pub no_detect_declarations: bool,
}

impl Overrides {
    /// Apply to a loaded configuration
    pub fn apply(&self, config: &mut FileConfig) -> Result<()> {
        if let Some(language) = self.language {
            config.trace.language = language;
        }
        if let Some(adapter) = &self.adapter {
            config.adapter.set_command_line(adapter)?;
        }
        if let Some(entry_frame) = &self.entry_frame {
            config.trace.entry_frame = Some(entry_frame.clone());
        }
        if let Some(max_steps) = self.max_steps {
            config.trace.max_steps = max_steps;
        }
        if let Some(max_heap_nodes) = self.max_heap_nodes {
            config.trace.max_heap_nodes = max_heap_nodes;
        }
        if let Some(timeout) = self.timeout {
            config.trace.request_timeout_secs = timeout;
        }
        if self.no_detect_declarations {
            config.trace.detect_declarations = false;
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenv::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();

    if let Err(e) = snaptrace_common::logging::init_logging("snaptrace", cli.log_file) {
        eprintln!("Warning: failed to initialize logging: {e}");
    }

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = FileConfig::discover(cli.config.as_deref())?;

    match cli.command {
        Commands::Trace { overrides, output, pretty } => {
            overrides.apply(&mut config)?;
            let program = overrides.program.as_deref().unwrap_or("configured program");
            tracing::info!("Tracing {program}");
            cmd::trace_program(config, overrides.program.as_deref(), output.as_deref(), pretty)
                .await
        }
        Commands::Config { overrides } => {
            overrides.apply(&mut config)?;
            cmd::show_config(&config, overrides.program.as_deref())
        }
    }
}
