//! Live Operations Dashboard Binary

use clap::{Parser, Subcommand, ValueEnum};
use ops_dashboard::{render, Config, Dashboard, HttpApi, IncidentTrigger, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "ops-dashboard", version, about = "Live operational dashboard client")]
struct Cli {
    /// Backend REST base URL (overrides DASHBOARD_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// Push channel URL (overrides DASHBOARD_WS_URL)
    #[arg(long)]
    ws_url: Option<String>,

    /// Poll interval in seconds for both resources
    #[arg(long)]
    poll_interval: Option<u64>,

    /// Log output format
    #[arg(long, value_enum, env = "DASHBOARD_LOG_FORMAT", default_value = "json")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the live dashboard; each stdin line simulates an incident for that service
    Watch,
    /// Ask the backend to simulate one incident, then exit
    Simulate {
        #[arg(long)]
        service: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    initialize_tracing(cli.log_format);

    info!("Starting ops-dashboard v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&cli);

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    info!(
        "Dashboard configuration - API: {}, push channel: {}, services every {:?}, alerts every {:?}",
        config.api_url,
        config.push_url(),
        config.services_interval,
        config.alerts_interval
    );

    match cli.command.unwrap_or(Command::Watch) {
        Command::Watch => watch(config).await,
        Command::Simulate { service } => simulate(config, service).await,
    }
}

fn load_config(cli: &Cli) -> Config {
    let mut config = Config::from_env();

    if let Some(api_url) = &cli.api_url {
        config.api_url = api_url.trim_end_matches('/').to_string();
    }

    if let Some(ws_url) = &cli.ws_url {
        config.ws_url = Some(ws_url.clone());
    }

    if let Some(seconds) = cli.poll_interval {
        config.services_interval = Duration::from_secs(seconds);
        config.alerts_interval = Duration::from_secs(seconds);
    }

    config
}

async fn watch(config: Config) -> Result<()> {
    let dashboard = Dashboard::start(config)?;
    let mut view = dashboard.view();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    println!("{}", render::render(&view.snapshot()));

    loop {
        tokio::select! {
            result = &mut shutdown => {
                if let Err(e) = result {
                    warn!("Failed to wait for shutdown signal: {}", e);
                }
                break;
            }
            changed = view.changed() => {
                if !changed {
                    break;
                }
                println!("{}", render::render(&view.snapshot()));
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    let service = line.trim();
                    if !service.is_empty() {
                        dashboard.simulate_incident(service);
                    }
                }
                Ok(None) => stdin_open = false,
                Err(e) => {
                    warn!("Stopped reading commands from stdin: {}", e);
                    stdin_open = false;
                }
            },
        }
    }

    info!("Shutting down dashboard");
    dashboard.shutdown();
    Ok(())
}

async fn simulate(config: Config, service: String) -> Result<()> {
    let api = HttpApi::new(config.api_url.clone(), config.http_timeout)?;
    let trigger = IncidentTrigger::new(Arc::new(api));

    if let Err(e) = trigger.fire(service).await {
        warn!("Incident trigger task failed: {}", e);
    }

    Ok(())
}

/// Initialize structured logging
fn initialize_tracing(format: LogFormat) {
    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false);

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer.json())
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer.compact())
            .init(),
    }
}
