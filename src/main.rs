//! healthsoc-gateway -- Agent gateway with a daily spending ceiling.
//!
//! This is the application entry point. It wires together all modules:
//!   - Configuration loading and validation
//!   - Database initialization
//!   - Budget tracker for the metered agent
//!   - Agent profiles and registry
//!   - HTTP server
//!   - Graceful shutdown on SIGTERM / SIGINT

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use healthsoc_gateway::AppState;
use healthsoc_gateway::agents::AgentRegistry;
use healthsoc_gateway::agents::openai::OpenAiConfig;
use healthsoc_gateway::agents::profile::resolve_profiles;
use healthsoc_gateway::api;
use healthsoc_gateway::budget::{BudgetTracker, SystemClock};
use healthsoc_gateway::config::Config;
use healthsoc_gateway::db::Database;

// ---------------------------------------------------------------------------
// CLI argument parsing (minimal, no clap dependency)
// ---------------------------------------------------------------------------

struct CliArgs {
    config_path: PathBuf,
}

fn parse_args() -> CliArgs {
    let mut args = std::env::args().skip(1);
    let mut config_path = PathBuf::from("healthsoc.toml");

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                if let Some(path) = args.next() {
                    config_path = PathBuf::from(path);
                } else {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("healthsoc-gateway {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                eprintln!("Run with --help for usage information.");
                std::process::exit(1);
            }
        }
    }

    CliArgs { config_path }
}

fn print_usage() {
    println!(
        "\
healthsoc-gateway {version} -- Agent gateway with a daily budget

USAGE:
    healthsoc-gateway [OPTIONS]

OPTIONS:
    -c, --config <PATH>    Path to configuration file [default: healthsoc.toml]
    -h, --help             Print this help message
    -V, --version          Print version information

ENVIRONMENT:
    RUST_LOG               Override log level (e.g. RUST_LOG=debug)
    HEALTHSOC_CONFIG       Alternative to --config flag
    HEALTHSOC_*            Override individual settings (see healthsoc.toml)
",
        version = env!("CARGO_PKG_VERSION")
    );
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to build Tokio runtime")
        .block_on(async_main())
}

async fn async_main() -> anyhow::Result<()> {
    // 1. Parse CLI arguments
    let cli = parse_args();

    // Allow HEALTHSOC_CONFIG env var as alternative to --config flag
    let config_path = std::env::var("HEALTHSOC_CONFIG")
        .map(PathBuf::from)
        .unwrap_or(cli.config_path);

    // 2. Load configuration
    let config = Config::load(&config_path)?;

    // 3. Initialize tracing/logging
    init_tracing(&config);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        "Starting healthsoc-gateway"
    );

    for key in config.env_overrides.all().keys() {
        tracing::debug!(setting = %key, "Overridden from environment");
    }

    config.validate()?;

    // 4. Open database
    let db = Database::open(&config.database.path)?;
    tracing::info!(path = %config.database.path.display(), "Database opened");

    // 5. Create budget tracker
    let budget = BudgetTracker::from_config(db, &config.budget, Arc::new(SystemClock))?;
    if config.budget.enabled {
        tracing::info!(
            agent = %config.budget.metered_agent,
            daily_limit_eur = config.budget.daily_limit_eur,
            timezone = %config.budget.timezone,
            on_store_error = %config.budget.on_store_error,
            "Daily budget enforced"
        );
    } else {
        tracing::warn!("Budget enforcement is DISABLED -- no run will be metered");
    }

    // 6. Resolve agent profiles and build the registry
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.agents.timeout_secs))
        .build()?;
    let profiles = resolve_profiles(&config.agents, &client).await?;
    let agents = AgentRegistry::from_profiles(profiles, &OpenAiConfig::from(&config.agents), &client);
    tracing::info!(agents = ?agents.ids(), "Agents registered");

    if config.agents.api_key.is_none() {
        tracing::warn!("No upstream API key configured -- agent runs will likely fail");
    }

    // 7. Build shared application state
    let listen_addr = config.listen_addr();
    let state = AppState::new(config, budget, agents);

    // 8. Build the router
    let app = build_app(state);

    // 9. Bind and serve
    let listener = TcpListener::bind(&listen_addr).await?;
    tracing::info!(addr = %listen_addr, "Listening");

    println!();
    println!("  healthsoc-gateway v{} is running", env!("CARGO_PKG_VERSION"));
    println!("  Runs:   http://{listen_addr}/agents/{{agent_id}}/runs");
    println!("  Budget: http://{listen_addr}/budget");
    println!("  Health: http://{listen_addr}/health");
    println!();

    // 10. Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down gracefully");

    Ok(())
}

// ---------------------------------------------------------------------------
// Router assembly
// ---------------------------------------------------------------------------

/// Build the application router with all middleware layers.
fn build_app(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config);

    // -- Request ID layer (X-Request-ID) --------------------------------------
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let trace = TraceLayer::new_for_http();

    api::build_api_router()
        .layer(propagate_id)
        .layer(request_id)
        .layer(trace)
        .layer(cors)
        .with_state(state)
}

/// Build the CORS layer from config.
fn build_cors_layer(config: &Config) -> CorsLayer {
    if config.server.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .server
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

// ---------------------------------------------------------------------------
// Tracing initialization
// ---------------------------------------------------------------------------

/// Set up the tracing subscriber based on configuration.
fn init_tracing(config: &Config) {
    // RUST_LOG env var takes precedence over config file
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.logging.level;
        EnvFilter::new(format!("healthsoc_gateway={level},tower_http={level},warn"))
    });

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if config.logging.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

// ---------------------------------------------------------------------------
// Graceful shutdown
// ---------------------------------------------------------------------------

/// Wait for a shutdown signal (SIGTERM or SIGINT / Ctrl+C).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl+C)");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
