//! # talkstart CLI Module
//!
//! This module implements the CLI interface for talkstart.
//!
//! ## Available Commands
//!
//! - `screen` - Run a screening (interactive, or scripted with `--answers`)
//! - `catalog` - List age groups and milestone questions
//! - `server` - Start the HTTP server

mod commands;
mod wizard;

use crate::error::AppError;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use commands::*;
pub use wizard::{Wizard, parse_answers, render_report, run_scripted};

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// talkstart - Toddler Speech Screening
///
/// Answer a few yes/no questions about your child's speech and get a
/// milestone-based result with guidance.
#[derive(Parser, Debug)]
#[command(name = "talkstart")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the configuration file (default: ./talkstart.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to a custom JSON catalog of age groups
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a speech screening
    Screen {
        /// Age group id (e.g. 12-18); prompts when omitted
        #[arg(short, long)]
        age_group: Option<String>,

        /// Answers in question order, e.g. "yyny" or "yes,no,yes,yes"
        #[arg(short = 'A', long, requires = "age_group")]
        answers: Option<String>,

        /// Write the JSON report here when results are saved
        #[arg(short, long)]
        save: Option<PathBuf>,
    },

    /// List age groups and their milestone questions
    Catalog,

    /// Start HTTP server
    Server {
        /// Host to bind to (overrides config)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), AppError> {
    let ctx = Context::load(&cli)?;

    let result = match cli.command {
        Some(Commands::Screen {
            age_group,
            answers,
            save,
        }) => cmd_screen(&ctx, age_group.as_deref(), answers.as_deref(), save.as_deref()),
        Some(Commands::Catalog) => cmd_catalog(&ctx),
        Some(Commands::Server { host, port }) => cmd_server(&ctx, host, port).await,
        None => {
            // No subcommand - run the interactive wizard
            cmd_screen(&ctx, None, None, None)
        }
    };

    ctx.shutdown().await;
    result
}
