use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use wagate::config::Config;
use wagate::driver::{SessionDriver, SubprocessDriver};
use wagate::ratelimit::RateLimiter;
use wagate::server::{AppState, build_app};
use wagate::session::{self, SessionTracker};

#[derive(Parser)]
#[command(name = "wagate", about = "HTTP gateway for a WhatsApp Web session", version)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, default_value = "wagate.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("wagate=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config).await?;

    tokio::fs::create_dir_all(&config.session.auth_path)
        .await
        .with_context(|| {
            format!(
                "creating auth storage at {}",
                config.session.auth_path.display()
            )
        })?;

    let tracker = SessionTracker::new();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    session::spawn_event_loop(tracker.clone(), event_rx);

    info!(command = ?config.bridge.command, "Starting session bridge");
    let driver: Arc<dyn SessionDriver> = Arc::new(
        SubprocessDriver::spawn(&config.bridge.command, &config.session.auth_path, event_tx)
            .context("spawning session bridge")?,
    );

    // Initialize in the background: a failure is recorded in the tracker and
    // the process stays up so /status remains inspectable.
    {
        let driver = Arc::clone(&driver);
        let tracker = tracker.clone();
        tokio::spawn(async move {
            info!("Initializing WhatsApp session");
            if let Err(e) = driver.initialize().await {
                error!(error = %e, "Failed to initialize session driver");
                tracker.fail_init(&e.to_string());
            }
        });
    }

    let state = AppState {
        tracker,
        limiter: Arc::new(RateLimiter::new()),
        driver,
    };
    let app = build_app(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid listen address")?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "Gateway listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutting down");
}
