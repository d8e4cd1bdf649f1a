//! Command-line interface for the portfolio tracker.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `run` | Daily cycle: value, analyze, recommend, notify |
//! | `test` | Check configuration, one quote and the notification channels |
//! | `recommend` | Print the recommendation report |
//! | `show` | Print holdings (at cost unless `--live`) |
//! | `add` | Buy shares, merging into an existing position |
//! | `update` | Overwrite share count, average price or notes |
//! | `remove` | Sell some or all shares of a position |
//! | `cash` | Set the available cash balance |
//!
//! Configuration comes from the environment (and `.env`); see `config.rs`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "portfolio-tracker",
    version,
    about = "Portfolio valuation, signal scoring and daily recommendations"
)]
pub struct Cli {
    /// Portfolio JSON file. Overrides PORTFOLIO_FILE.
    #[arg(long, global = true)]
    pub portfolio: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the daily update and send it to every notification channel.
    Run {
        /// Print the messages instead of sending them.
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },

    /// System test: portfolio file, one live quote, notification channels.
    Test,

    /// Generate and print recommendations.
    Recommend {
        /// Emit the full report as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Show holdings.
    Show {
        /// Price positions with live quotes and compare to the benchmark.
        #[arg(long, default_value_t = false)]
        live: bool,
    },

    /// Add shares of a stock.
    Add {
        symbol: String,
        shares: f64,
        /// Price paid per share.
        price: f64,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Update an existing position.
    Update {
        symbol: String,
        #[arg(long)]
        shares: Option<f64>,
        #[arg(long)]
        avg_price: Option<f64>,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Remove a position, or only some of its shares.
    Remove {
        symbol: String,
        /// Shares to sell; the whole position when omitted.
        #[arg(long)]
        shares: Option<f64>,
    },

    /// Set available cash.
    Cash { amount: f64 },
}
