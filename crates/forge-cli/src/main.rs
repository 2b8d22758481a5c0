mod report;
mod server;
mod shell;
mod viewer;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use forge_client::{Config, GeminiBackend, Orchestrator};
use rmcp::{ServiceExt, transport::stdio};

use crate::shell::{Outcome, Shell};

#[derive(Parser)]
#[command(
    name = "forge",
    about = "Stellar Forge: AI-designed interstellar propulsion inventions"
)]
struct Cli {
    /// Config file (defaults to $FORGE_CONFIG or ~/.stellar-forge/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one invention and print it
    Generate {
        /// What to invent
        prompt: String,

        /// Also write the document, simulation and 3D model into this directory
        #[arg(long)]
        out: Option<PathBuf>,

        /// Skip the concept image request
        #[arg(long)]
        no_image: bool,
    },

    /// Start MCP server on stdio transport
    Serve,

    /// Validate and print the resolved configuration
    Config,
}

fn load_config(cli: &Cli) -> Result<Config> {
    Config::load(cli.config.as_deref()).context("invalid configuration")
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Credentials are checked before anything talks to the backend.
    let config = load_config(&cli)?;

    match &cli.command {
        Commands::Generate {
            prompt,
            out,
            no_image,
        } => cmd_generate(&config, prompt, out.as_deref(), *no_image).await,
        Commands::Serve => cmd_serve(&config).await,
        Commands::Config => cmd_config(&config),
    }
}

#[cfg(unix)]
async fn terminate_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = term.recv() => {}
                _ = tokio::signal::ctrl_c() => {}
            }
        }
        Err(e) => {
            tracing::warn!("cannot listen for SIGTERM: {e}");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

async fn cmd_serve(config: &Config) -> Result<()> {
    tracing::info!(model = %config.text_model, "starting MCP server");

    let server = server::ForgeServer::new(config).context("failed to create backend")?;
    let service = match server.clone().serve(stdio()).await {
        Ok(service) => service,
        Err(e) => {
            // A client that hangs up before the handshake is a normal exit.
            tracing::info!("client left before initialization: {e}");
            server.shutdown().await;
            return Ok(());
        }
    };

    let signalled = tokio::select! {
        result = service.waiting() => {
            result?;
            false
        }
        _ = terminate_signal() => {
            tracing::info!("received shutdown signal");
            true
        }
    };
    server.shutdown().await;

    if signalled {
        // The blocking stdin reader would hold runtime shutdown until EOF.
        std::process::exit(0);
    }
    Ok(())
}

async fn cmd_generate(config: &Config, prompt: &str, out: Option<&Path>, no_image: bool) -> Result<()> {
    let backend = GeminiBackend::new(config).context("failed to create backend")?;
    let orchestrator = Orchestrator::new(backend, config.generate_images && !no_image);
    let shell = Shell::new(Arc::new(orchestrator));

    let output = match shell.generate(prompt).await {
        Outcome::Completed(output) => output,
        Outcome::Failed { message, .. } => anyhow::bail!("{message}"),
        Outcome::Ignored => anyhow::bail!("prompt is empty"),
        Outcome::Detached => anyhow::bail!("generation was interrupted"),
    };

    println!("{}", report::terminal_text(&output));

    if let Some(dir) = out {
        let summary = report::write_exports(&output, dir)?;
        for path in &summary.written {
            println!("wrote {}", path.display());
        }
        for alert in &summary.alerts {
            eprintln!("export failed: {alert}");
        }
    }
    Ok(())
}

fn cmd_config(config: &Config) -> Result<()> {
    println!("{config}");
    Ok(())
}
