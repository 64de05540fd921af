//! content-pipeline binary
//!
//! Serves the HTTP API and exposes every operation on the command line:
//! steps can be invoked one by one, runs triggered and inspected, and the
//! deployment artifacts (workflow definition, code archive) produced.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;

use content_pipeline::api::{create_router, AppState, ApiError};
use content_pipeline::config::PipelineConfig;
use content_pipeline::logging::init_logging;
use content_pipeline::package::{build_package, upload_artifact, PackageOptions};
use content_pipeline::seed::{apply_seed, parse_seed};
use content_pipeline::steps::{run_step, StepKind};
use content_pipeline::workflow::{build_definition, DefinitionOptions};

#[derive(Debug, Parser)]
#[command(name = "content-pipeline", version, about = "AI content pipeline steps and trigger service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API
    Serve,

    /// Run one step with a JSON input and print its JSON output
    Invoke {
        /// research, refine, image_prompt, image_gen, metadata, assemble or update_status
        step: String,
        /// Input file, or `-` for stdin
        #[arg(long, short, default_value = "-")]
        input: String,
    },

    /// Start a workflow run for a post
    Trigger { post_id: String },

    /// Show the status of a run
    Status { run_id: String },

    /// Print the workflow definition
    Definition {
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Build the deployment archive
    Package {
        /// Built binary to ship as `bootstrap`
        #[arg(long)]
        binary: PathBuf,
        #[arg(long, default_value = "dist")]
        out: PathBuf,
        /// Also upload the archive to the content bucket
        #[arg(long)]
        upload: bool,
    },

    /// Import website settings and posts from a JSON file
    Seed { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.command {
        Command::Definition { .. } => PipelineConfig::load_unchecked(),
        _ => PipelineConfig::load(),
    }
    .context("failed to load configuration")?;
    init_logging(&config.logging);

    match cli.command {
        Command::Serve => serve(&config).await,
        Command::Invoke { step, input } => invoke(&config, &step, &input).await,
        Command::Trigger { post_id } => {
            let state = AppState::from_config(&config).await?;
            let receipt = state.trigger.trigger(&post_id).await?;
            print_json(&receipt)
        }
        Command::Status { run_id } => {
            let state = AppState::from_config(&config).await?;
            let status = state.trigger.run_status(&run_id).await?;
            print_json(&status)
        }
        Command::Definition { output } => {
            let definition = build_definition(&DefinitionOptions::from(&config));
            let text = serde_json::to_string_pretty(&definition)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, text + "\n")
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    tracing::info!(path = %path.display(), "Definition written");
                    Ok(())
                }
                None => {
                    println!("{}", text);
                    Ok(())
                }
            }
        }
        Command::Package { binary, out, upload } => {
            let options = PackageOptions {
                name: content_pipeline::version::PKG_NAME.to_string(),
                version: content_pipeline::version::VERSION.to_string(),
                workflow: config.workflow.name.clone(),
                binary,
                out_dir: out,
            };
            let path = build_package(&options)?;
            println!("{}", path.display());
            if upload {
                let state = AppState::from_config(&config).await?;
                let uri = upload_artifact(state.steps.store.as_ref(), &path, &options.version).await?;
                println!("{}", uri);
            }
            Ok(())
        }
        Command::Seed { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let state = AppState::from_config(&config).await?;
            let summary = apply_seed(parse_seed(&raw)?, &state.steps.settings, &state.steps.posts).await?;
            print_json(&summary)
        }
    }
}

async fn serve(config: &PipelineConfig) -> Result<()> {
    let state = AppState::from_config(config).await?;
    state.db.health_check().await.context("database health check failed")?;

    let app = create_router(state);
    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!(
        addr = %addr,
        version = content_pipeline::version::VERSION,
        workflow = %config.workflow.name,
        "Starting content pipeline server"
    );
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// Run a step; failures print the same error body the HTTP endpoint returns
/// and exit non-zero.
async fn invoke(config: &PipelineConfig, step: &str, input: &str) -> Result<()> {
    let kind: StepKind = step.parse()?;
    let raw = if input == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(input).with_context(|| format!("failed to read {}", input))?
    };
    let input: serde_json::Value = serde_json::from_str(&raw).context("step input is not JSON")?;

    let state = AppState::from_config(config).await?;
    match run_step(&state.steps, kind, input).await {
        Ok(output) => print_json(&output),
        Err(e) => {
            let err = ApiError::Step(e);
            let body = serde_json::json!({
                "error": err.error_type(),
                "message": err.to_string(),
                "code": err.code(),
            });
            eprintln!("{}", serde_json::to_string_pretty(&body)?);
            std::process::exit(1);
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Signal for graceful shutdown (Ctrl-C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for CTRL-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received CTRL-C signal, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM signal, shutting down"),
    }
}
