//! # talkstart - Toddler Speech Screening
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 apps/talkstart (THE BINARY)              │
//! │                                                          │
//! │  ┌─────────────┐   ┌─────────────┐   ┌───────────────┐  │
//! │  │   Wizard    │   │  HTTP API   │   │   Analytics   │  │
//! │  │   (clap)    │   │   (axum)    │   │  (reqwest)    │  │
//! │  └──────┬──────┘   └──────┬──────┘   └───────┬───────┘  │
//! │         └─────────────────┼──────────────────┘          │
//! │                           ▼                             │
//! │                  ┌─────────────────┐                    │
//! │                  │ talkstart-core  │                    │
//! │                  │  (THE LOGIC)    │                    │
//! │                  └─────────────────┘                    │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Interactive screening
//! talkstart
//!
//! # Scripted screening
//! talkstart screen --age-group 18-24 --answers yyny --save report.json
//!
//! # HTTP server
//! talkstart server --host 0.0.0.0 --port 8080
//! ```

use clap::Parser;
use talkstart::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Parsed first so --verbose can raise the default log level
    let cli = cli::Cli::parse();
    init_tracing(cli.verbose);

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// TALKSTART_LOG_FORMAT=json switches to machine-parseable output.
/// RUST_LOG, when set, replaces the default filter.
fn init_tracing(verbose: bool) {
    let log_format =
        std::env::var("TALKSTART_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_filter = if verbose {
        "talkstart=debug,talkstart_core=debug,tower_http=debug"
    } else {
        "talkstart=info,tower_http=debug"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    // Logs go to stderr so reports on stdout stay pipeable
    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn print_banner() {
    println!(
        r#"
  talkstart v{}

  Toddler speech screening - a few yes/no questions, a clear next step.
  Not a diagnosis. Talk to your pediatrician about any concern.
"#,
        env!("CARGO_PKG_VERSION")
    );
}
