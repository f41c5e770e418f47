// Data validator entry point.
//
// Startup sequence:
// 1. Load `.env` (if present) so RUST_LOG and credentials can live there
// 2. Initialize tracing
// 3. Load config (copying defaults on first run)
// 4. Build the shared OpenRouter client
// 5. Serve HTTP until Ctrl+C / SIGTERM, then drain in-flight requests

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use data_validator::config;
use data_validator::routes;
use data_validator::state::AppState;
use validator_llm::OpenRouterClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. .env
    let dotenv_path = dotenvy::dotenv().ok();

    // 2. Tracing
    init_tracing()?;
    info!("Data validator starting up");
    if let Some(path) = dotenv_path {
        info!("Loaded environment from {}", path.display());
    }

    // 3. Config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: model={}, timeout={}s, max_concurrency={}, price=${}",
        config.llm.model,
        config.llm.timeout_secs,
        config.llm.max_concurrency,
        config.pricing.price_per_request
    );

    // 4. Upstream client
    let settings = config.client_settings()?;
    let client = Arc::new(
        OpenRouterClient::new(settings).context("failed to build OpenRouter client")?,
    );
    let state = AppState::new(client.clone(), config.pricing.price_per_request);
    let app = routes::create_router(state);

    // 5. Serve
    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on http://{}", listener.local_addr()?);

    let shutdown_client = client.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!("Shutdown requested, draining in-flight requests");
            // Requests still waiting for an upstream slot fail fast with 503.
            shutdown_client.close();
        })
        .await
        .context("HTTP server error")?;

    info!("Data validator shut down");
    Ok(())
}

/// Initialize tracing to stdout, filtered by `RUST_LOG`.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("data_validator=info,validator_llm=info,tower_http=info,warn")
        }))
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}

/// Resolve when the process receives Ctrl+C or (on Unix) SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
