//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use super::{Cli, Wizard, parse_answers, render_report, run_scripted};
use crate::analytics::{AnalyticsDelivery, build_sink};
use crate::api::{self, AppState};
use crate::config::AppConfig;
use crate::error::AppError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use talkstart_core::{AgeGroupId, AnalyticsSink, Catalog, ScreeningReport, ScreeningSession};

// =============================================================================
// COMMAND CONTEXT
// =============================================================================

/// How long shutdown waits for queued analytics events.
pub const ANALYTICS_FLUSH_TIMEOUT: Duration = Duration::from_secs(3);

/// Everything a command needs, resolved once from the CLI flags.
pub struct Context {
    pub config: AppConfig,
    pub catalog: Arc<Catalog>,
    pub sink: Arc<dyn AnalyticsSink>,
    pub delivery: Option<AnalyticsDelivery>,
    pub json_mode: bool,
    pub verbose: bool,
}

impl Context {
    /// Load config, catalog and analytics sink.
    pub fn load(cli: &Cli) -> Result<Self, AppError> {
        let config = AppConfig::load(cli.config.as_deref())?;
        let catalog = Arc::new(config.load_catalog(cli.catalog.as_deref())?);
        let (sink, delivery) = build_sink(&config.analytics);
        Ok(Self {
            config,
            catalog,
            sink,
            delivery,
            json_mode: cli.json_mode,
            verbose: cli.verbose,
        })
    }

    /// Release the sink and wait for pending analytics to be delivered.
    ///
    /// Sessions created from this context must already be dropped.
    pub async fn shutdown(self) {
        let Self { sink, delivery, .. } = self;
        drop(sink);
        if let Some(delivery) = delivery {
            delivery.finish(ANALYTICS_FLUSH_TIMEOUT).await;
        }
    }

    fn new_session(&self) -> ScreeningSession {
        ScreeningSession::new(self.catalog.clone(), self.sink.clone())
    }
}

// =============================================================================
// OUTPUT PATHS
// =============================================================================

/// Validate output path.
///
/// For output files, we validate the parent directory exists.
fn validate_output_path(path: &Path) -> Result<PathBuf, AppError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    // Canonicalize parent to resolve ".." and symlinks
    let canonical_parent = parent.canonicalize().map_err(|e| {
        AppError::Io(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(AppError::Io(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| AppError::Io("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

/// Write a report as pretty JSON.
pub fn write_report(path: &Path, report: &ScreeningReport) -> Result<(), AppError> {
    let target = validate_output_path(path)?;
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| AppError::Io(format!("Serialize report: {}", e)))?;
    std::fs::write(&target, json)
        .map_err(|e| AppError::Io(format!("Write {}: {}", target.display(), e)))?;
    tracing::info!("Report written to {:?}", target);
    Ok(())
}

/// Save the session's results to `path`. Counts as a user save.
pub fn export_results(
    session: &ScreeningSession,
    path: &Path,
) -> Result<ScreeningReport, AppError> {
    let report = session.save_results()?;
    write_report(path, &report)?;
    Ok(report)
}

// =============================================================================
// SCREEN COMMAND
// =============================================================================

/// Run a screening, interactively or from `--answers`.
pub fn cmd_screen(
    ctx: &Context,
    age_group: Option<&str>,
    answers: Option<&str>,
    save: Option<&Path>,
) -> Result<(), AppError> {
    let mut session = ctx.new_session();
    let group = age_group.map(AgeGroupId::new);

    let Some(answers) = answers else {
        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        let report = Wizard::new(stdin.lock(), stdout.lock())
            .with_save_path(save.map(Path::to_path_buf))
            .verbose(ctx.verbose)
            .run(&mut session, group.as_ref())?;
        tracing::debug!(completed = report.is_some(), "Interactive screening finished");
        return Ok(());
    };

    let values = parse_answers(answers)?;
    let group = group.ok_or_else(|| {
        AppError::InvalidInput("--answers requires --age-group".to_string())
    })?;
    let report = run_scripted(&mut session, &group, &values)?;

    if let Some(path) = save {
        export_results(&session, path)?;
    }

    if ctx.json_mode {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| AppError::Io(e.to_string()))?;
        println!("{}", json);
    } else {
        println!("{}", render_report(&report));
    }

    Ok(())
}

// =============================================================================
// CATALOG COMMAND
// =============================================================================

/// List the catalog.
pub fn cmd_catalog(ctx: &Context) -> Result<(), AppError> {
    if ctx.json_mode {
        let output = serde_json::json!({ "groups": ctx.catalog.groups() });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Screening Catalog");
    println!("=================");
    for group in ctx.catalog.groups() {
        println!();
        println!("{} {} [{}] - {}", group.icon, group.name, group.id, group.range);
        for m in &group.milestones {
            if ctx.verbose {
                println!("  {:>4}  {} ({})", m.id, m.question, m.category);
            } else {
                println!("  {:>4}  {}", m.id, m.question);
            }
        }
    }

    Ok(())
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(
    ctx: &Context,
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), AppError> {
    let host = host.unwrap_or_else(|| ctx.config.server.host.clone());
    let port = port.unwrap_or(ctx.config.server.port);

    println!("talkstart Screening Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:       {}", host);
    println!("  Port:       {}", port);
    println!("  Age groups: {}", ctx.catalog.len());
    println!(
        "  Analytics:  {}",
        if ctx.config.analytics.is_active() {
            ctx.config.analytics.measurement_id.as_str()
        } else {
            "log only"
        }
    );
    println!();
    println!("Endpoints:");
    println!("  GET    /health                 - Health check");
    println!("  GET    /catalog                - Age groups and questions");
    println!("  POST   /sessions               - Start a session");
    println!("  GET    /sessions/{{id}}          - Session state");
    println!("  POST   /sessions/{{id}}/begin    - Welcome -> age selection");
    println!("  POST   /sessions/{{id}}/select   - Choose an age group");
    println!("  POST   /sessions/{{id}}/answer   - Answer the current question");
    println!("  POST   /sessions/{{id}}/back     - Age selection -> welcome");
    println!("  POST   /sessions/{{id}}/restart  - Results -> welcome");
    println!("  POST   /sessions/{{id}}/save     - Export results");
    println!("  POST   /sessions/{{id}}/feedback - Rate the results");
    println!("  DELETE /sessions/{{id}}          - Discard a session");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let addr = format!("{}:{}", host, port);
    let state = AppState::new(ctx.catalog.clone(), ctx.sink.clone());
    api::run_server(&addr, state).await
}

// =============================================================================
// TESTS
// =============================================================================
