use std::net::SocketAddr;

use fanout::config::Config;
use fanout::server::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    dotenvy::dotenv().ok();

    let config = Config::load();
    tracing::info!(
        port = config.port,
        base_url = %config.base_url,
        max_requests = config.max_requests,
        request_timeout_ms = config.request_timeout_ms,
        heavy_partitions = config.heavy_partitions,
        "fanout starting"
    );

    // Parallelism is fixed once here; handlers never touch it.
    rayon::ThreadPoolBuilder::new()
        .num_threads(config.heavy_partitions)
        .build_global()?;

    let state = AppState::new(&config)?;
    let app = server::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("server running at http://localhost:{}", config.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await
        .inspect_err(|e| tracing::error!("serving error: {e:?}"))?;

    tracing::info!("fanout shutting down");
    Ok(())
}
