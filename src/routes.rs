use std::convert::Infallible;

use axum::{
    Router,
    extract::{Query, State, rejection::QueryRejection},
    response::{
        Html,
        sse::{Event, KeepAlive, Sse},
    },
    routing::get,
};
use futures_util::stream::Stream;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::{ApiError, RelayError};
use crate::models::GenerationParams;
use crate::services::relay::spawn_relay;
use crate::state::AppState;

const DEFAULT_PAGES: usize = 5;
const DEFAULT_IMAGES: usize = 1;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/generate-story-stream", get(generate_story_stream))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::AllowMethods::any())
                .allow_headers(tower_http::cors::AllowHeaders::any()),
        )
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryQuery {
    pub prompt: Option<String>,
    pub num_images: Option<usize>,
    pub num_pages: Option<usize>,
}

impl StoryQuery {
    pub fn into_params(self, max_pages: usize) -> Result<GenerationParams, RelayError> {
        let prompt = self
            .prompt
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .ok_or_else(|| RelayError::Validation("Prompt is required".to_string()))?;

        let num_pages = self.num_pages.unwrap_or(DEFAULT_PAGES);
        if !(1..=max_pages).contains(&num_pages) {
            return Err(RelayError::Validation(format!(
                "numPages must be between 1 and {max_pages}"
            )));
        }

        let num_images = self.num_images.unwrap_or(DEFAULT_IMAGES);
        if num_images > max_pages {
            return Err(RelayError::Validation(format!(
                "numImages must be between 0 and {max_pages}"
            )));
        }

        Ok(GenerationParams {
            prompt,
            num_pages,
            num_images,
        })
    }
}

async fn index() -> Html<&'static str> {
    Html(include_str!("index.html"))
}

async fn health_check() -> &'static str {
    "OK"
}

async fn generate_story_stream(
    State(state): State<AppState>,
    query: Result<Query<StoryQuery>, QueryRejection>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let Query(query) = query.map_err(|rejection| RelayError::Validation(rejection.body_text()))?;
    let params = query.into_params(state.config.max_pages)?;

    let text = state.model.stream_story(&params).await.map_err(|err| {
        tracing::error!(error = %err, "could not open story stream");
        ApiError(err)
    })?;

    let cancel = CancellationToken::new();
    let mut events = spawn_relay(state.model.clone(), params, text, cancel.clone());

    // Dropping the body (client disconnect) cancels the generation.
    let guard = cancel.drop_guard();
    let stream = async_stream::stream! {
        let _guard = guard;
        while let Some(event) = events.recv().await {
            match Event::default().json_data(&event) {
                Ok(sse) => {
                    yield Ok::<_, Infallible>(sse);
                }
                Err(err) => tracing::error!(error = %err, "could not encode story event"),
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
