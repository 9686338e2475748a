use anyhow::Context;
use clap::Parser;
use itmo_answer::api::{AppState, create_router};
use itmo_answer::config::Config;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Answers questions about ITMO University")]
struct Args {
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    #[arg(long, default_value_t = 5000)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber (handles both tracing and log crate)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(true)
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;
    tracing::info!(
        max_concurrent = config.max_concurrent_requests,
        requests_per_second = config.requests_per_second,
        max_queued = ?config.max_queued_requests,
        "loaded configuration"
    );

    let state = AppState::from_config(&config)?;
    let app = create_router(state);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}
