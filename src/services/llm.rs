use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use serde::Deserialize;
use serde_json::json;

use crate::config::Config;
use crate::error::{RelayError, Result};
use crate::models::{GenerationParams, PAGE_BREAK};

/// Text fragments of the story as the model produces them.
pub type TextStream = BoxStream<'static, Result<String>>;

/// The text and image services a story is generated with.
#[async_trait]
pub trait StoryModel: Send + Sync {
    /// Opens a streaming completion for the story text.
    async fn stream_story(&self, params: &GenerationParams) -> Result<TextStream>;

    /// Generates one illustration and returns its URL.
    async fn generate_image(&self, prompt: &str) -> Result<String>;
}

pub struct OpenAiClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    text_model: String,
    image_model: String,
    image_size: String,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    delta: ChatDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChatDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: Option<String>,
}

impl OpenAiClient {
    pub fn new(config: &Config) -> Self {
        OpenAiClient {
            client: reqwest::Client::new(),
            api_url: config.api_base_url.clone(),
            api_key: config.api_key.clone(),
            text_model: config.text_model.clone(),
            image_model: config.image_model.clone(),
            image_size: config.image_size.clone(),
        }
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(format!("{}/{}", self.api_url, path))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Upstream(format!("{path} returned {status}: {body}")));
        }
        Ok(response)
    }
}

pub fn system_instruction(num_pages: usize) -> String {
    format!(
        "You are a children's story writer. Create a {num_pages}-page story, with each page having 2-3 sentences. Ensure you generate exactly {num_pages} pages. Clearly separate each page with '{PAGE_BREAK}'."
    )
}

/// Extracts the text delta carried by one chat-completion chunk.
fn parse_chunk(data: &str) -> Result<Option<String>> {
    let chunk: ChatChunk = serde_json::from_str(data)?;
    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty()))
}

#[async_trait]
impl StoryModel for OpenAiClient {
    async fn stream_story(&self, params: &GenerationParams) -> Result<TextStream> {
        let response = self
            .post(
                "chat/completions",
                json!({
                    "model": self.text_model,
                    "messages": [
                        { "role": "system", "content": system_instruction(params.num_pages) },
                        { "role": "user", "content": format!("Generate a children's story about: {}", params.prompt) },
                    ],
                    "max_tokens": params.max_tokens(),
                    "stream": true,
                }),
            )
            .await?;

        let stream = async_stream::stream! {
            let mut events = response.bytes_stream().eventsource();
            while let Some(event) = events.next().await {
                let event = match event {
                    Ok(event) => event,
                    Err(e) => {
                        yield Err(RelayError::Upstream(format!("text stream interrupted: {e}")));
                        return;
                    }
                };

                let data = event.data.trim();
                if data == "[DONE]" {
                    return;
                }
                if data.is_empty() {
                    continue;
                }

                match parse_chunk(data) {
                    Ok(Some(content)) => {
                        yield Ok(content);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        };

        Ok(stream.boxed())
    }

    async fn generate_image(&self, prompt: &str) -> Result<String> {
        let response = self
            .post(
                "images/generations",
                json!({
                    "model": self.image_model,
                    "prompt": prompt,
                    "n": 1,
                    "size": self.image_size,
                }),
            )
            .await?;

        let image: ImageResponse = serde_json::from_str(&response.text().await?)?;
        image
            .data
            .into_iter()
            .next()
            .and_then(|data| data.url)
            .ok_or_else(|| RelayError::Upstream("image response carried no url".to_string()))
    }
}
