//! CLI Adapter
//!
//! Command-line interface for the yield engine.
//! Uses clap derive macros for argument parsing.

mod commands;

pub use commands::{
    BreakEvenCmd, CliApp, Command, CompareCmd, LeaderboardCmd, MarketArgs, MetricsCmd,
    MultiChainCmd, OpportunitiesCmd, OptimizeCmd, PositionsCmd, RebalanceCmd, SortArg, WorthItCmd,
};

use anyhow::Result;

use crate::config::Config;

/// Initialize the CLI application
pub fn init() -> CliApp {
    use clap::Parser;
    CliApp::parse()
}

/// Execute the CLI command
pub async fn execute(app: CliApp, config: Config) -> Result<()> {
    commands::execute(app, config).await
}
