use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use burger_server::{app, jobs, shutdown};
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use modkit::jobs::TokioScheduler;
use runtime::{AppConfig, CliArgs};
use tokio_util::sync::CancellationToken;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const JOB_STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Backend Burger Server - users and Path of Exile item catalog API
#[derive(Parser)]
#[command(name = "burger-server")]
#[command(about = "Backend Burger Server - users and Path of Exile item catalog API")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Check configuration
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
    };

    // home_dir is normalized and created while loading
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    let logging_config = config.logging.clone().unwrap_or_default();
    runtime::init_logging_from_config(&logging_config, config.home_dir());
    tracing::info!("Backend Burger Server starting");

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => check_config(config),
    }
}

async fn run_server(config: AppConfig) -> Result<()> {
    let cancel = CancellationToken::new();
    let ctx = app::build_context(&config, cancel.clone());

    app::seed_catalog(&ctx, &config)
        .await
        .context("failed to seed the item catalog")?;

    let scheduler = TokioScheduler::new(cancel.child_token());
    jobs::register_jobs(&scheduler, &config, &ctx)?;

    let router = app::build_router(&ctx, &config);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| {
            anyhow!(
                "Invalid bind address '{}:{}': {}",
                config.server.host,
                config.server.port,
                e
            )
        })?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;
    tracing::info!("HTTP server bound on {}", addr);

    let signals = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = shutdown::wait_for_shutdown().await {
                tracing::error!(error = %e, "signal handler failed");
            }
            tracing::info!("shutdown signal received");
            cancel.cancel();
        })
    };

    let graceful = {
        let cancel = cancel.clone();
        async move {
            cancel.cancelled().await;
            tracing::info!("HTTP server shutting down gracefully (cancellation)");
        }
    };

    let served = axum::serve(listener, router)
        .with_graceful_shutdown(graceful)
        .await
        .map_err(|e| anyhow!(e));

    cancel.cancel();
    signals.abort();
    scheduler.shutdown(JOB_STOP_TIMEOUT).await;
    tracing::info!("Backend Burger Server stopped");
    served
}

fn check_config(config: AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");
    if let Some(path) = app::catalog_seed_file(&config) {
        if !path.is_file() {
            return Err(anyhow!("catalog seed file not found: {}", path.display()));
        }
    }
    println!("Configuration check passed");
    println!("{}", config.to_yaml()?);
    Ok(())
}
