use std::sync::Arc;

use story_relay::config::Config;
use story_relay::routes;
use story_relay::services::llm::OpenAiClient;
use story_relay::state::AppState;
use tokio::net::TcpListener;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("story_relay=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    // Create the upstream client
    let model = Arc::new(OpenAiClient::new(&config));

    let listener = TcpListener::bind(config.listen_addr()?).await?;
    tracing::info!(
        text_model = %config.text_model,
        image_model = %config.image_model,
        "Listening on {}",
        listener.local_addr()?
    );

    let app = routes::router(AppState::new(config, model));
    axum::serve(listener, app).await?;

    Ok(())
}
