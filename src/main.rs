/// Meeting Mirror server binary
use meeting_mirror::{config::ServerConfig, context::AppContext, error::AppResult, server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> AppResult<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "meeting_mirror=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;
    tracing::info!(
        "Starting Meeting Mirror v{} (log level {})",
        env!("CARGO_PKG_VERSION"),
        config.logging.level
    );

    let ctx = AppContext::new(config).await?;

    server::serve(ctx).await
}
