mod cli;
mod project;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use rf_core::config::{Config, Credentials};
use rf_core::{MemorySceneStore, Stage};
use rf_pipeline::{
    CancellationToken, PipelineCoordinator, PipelineReport, ProgressReport, ProgressSender,
    StageResult,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

enum Action {
    Full,
    Stage(Stage),
    Retry(Stage),
}

enum Outcome {
    Pipeline(PipelineReport),
    Stage(StageResult),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "reelforge=debug,rf_core=debug,rf_pipeline=debug,rf_providers=debug".to_string()
        } else {
            "reelforge=info,rf_core=info,rf_pipeline=info,rf_providers=warn".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    let (project, action) = match cli.command {
        Commands::CheckConfig => return check_config(cli.config.as_deref()),
        Commands::Run { project } => (project, Action::Full),
        Commands::Stage { project, stage } => (project, Action::Stage(stage)),
        Commands::Retry { project, stage } => (project, Action::Retry(stage)),
    };

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_project(project, action, cli.config.as_deref()))
}

async fn run_project(project_path: PathBuf, action: Action, config_path: Option<&Path>) -> Result<()> {
    let config = Config::load_or_default(config_path);
    for warning in config.validate() {
        tracing::warn!("{warning}");
    }
    let credentials = Credentials::from_config(&config).with_env_overrides();

    let scenes = project::load(&project_path)?;
    tracing::info!(scenes = scenes.len(), "Loaded project {}", project_path.display());

    let store = MemorySceneStore::new(scenes.clone());
    let cancel = CancellationToken::new();
    let providers = rf_providers::http_providers(&config.providers);
    let coordinator = PipelineCoordinator::new(Arc::new(store.clone()), providers, Arc::new(config))
        .with_progress(ProgressSender::new(print_progress))
        .with_cancellation(cancel.clone());

    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received; stopping after the current scene");
            interrupt.cancel();
        }
    });

    let outcome = match action {
        Action::Full => coordinator
            .run_full(&scenes, &credentials)
            .await
            .map(Outcome::Pipeline),
        Action::Stage(stage) => coordinator
            .run_stage(stage, &scenes, &credentials)
            .await
            .map(Outcome::Stage),
        Action::Retry(stage) => coordinator
            .retry_failed(stage, &credentials)
            .await
            .map(Outcome::Stage),
    };

    // Persist whatever the run managed to write, even when it aborted.
    project::save(&project_path, &store.snapshot())?;

    let (failed, cancelled) = match outcome? {
        Outcome::Pipeline(report) => {
            println!();
            for stage in Stage::ALL {
                print_summary(report.stage(stage));
            }
            print_errors(&report.errors());
            (report.failed(), report.cancelled())
        }
        Outcome::Stage(result) => {
            println!();
            print_summary(&result);
            print_errors(&result.errors());
            (result.failed, result.cancelled)
        }
    };

    if cancelled {
        anyhow::bail!("Run cancelled; progress saved to {}", project_path.display());
    }
    if failed > 0 {
        anyhow::bail!("{failed} scene(s) failed; rerun with `retry` to try them again");
    }
    Ok(())
}

fn print_progress(report: &ProgressReport) {
    println!(
        "[{}] {}/{} ({:.0}%)",
        report.stage,
        report.completed,
        report.total,
        report.percent()
    );
}

fn print_summary(result: &StageResult) {
    println!(
        "{:<7} {} completed, {} failed, {} skipped, {} ineligible{}",
        format!("{}:", result.stage),
        result.completed,
        result.failed,
        result.skipped,
        result.ineligible,
        if result.cancelled { " (cancelled)" } else { "" }
    );
}

fn print_errors(errors: &[String]) {
    if errors.is_empty() {
        return;
    }
    println!("\nErrors:");
    for error in errors {
        println!("  {error}");
    }
}

fn check_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let contents = std::fs::read_to_string(p)?;
            Config::from_json(&contents)?
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!("✓ Configuration is valid");
    println!("  Inter-item delay: {}ms", config.pipeline.inter_item_delay_ms);
    println!("  Aspect ratio: {}", config.image.aspect_ratio.as_str());
    println!(
        "  Voice: {}",
        config.voice.voice_id.as_deref().unwrap_or("(none)")
    );
    println!("  Image provider: {}", config.providers.image.base_url);
    println!("  Voice provider: {}", config.providers.voice.base_url);
    println!("  Render provider: {}", config.providers.render.base_url);

    let warnings = config.validate();
    if !warnings.is_empty() {
        println!("\nWarnings:");
        for warning in &warnings {
            println!("  ! {warning}");
        }
    }

    Ok(())
}
