use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span};

use crate::error::RelayError;
use crate::models::{GENERATION_FAILED, GenerationParams, Story, StoryEvent};
use crate::services::illustrator::{image_prompt, styled_prompt};
use crate::services::llm::{StoryModel, TextStream};
use crate::services::segmenter::PageSegmenter;

const EVENT_BUFFER: usize = 64;

/// Why a generation stopped before finishing the story.
#[derive(Debug)]
enum Halt {
    /// Nobody is listening anymore.
    Disconnected,
    Failed(RelayError),
}

impl From<RelayError> for Halt {
    fn from(err: RelayError) -> Self {
        Halt::Failed(err)
    }
}

/// Runs one generation on its own task and returns the events it emits.
///
/// The channel closes right after the terminal event. Cancelling `cancel`
/// aborts whatever upstream call is in flight.
pub fn spawn_relay(
    model: Arc<dyn StoryModel>,
    params: GenerationParams,
    text: TextStream,
    cancel: CancellationToken,
) -> mpsc::Receiver<StoryEvent> {
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let span = info_span!("story", id = %uuid::Uuid::new_v4());

    tokio::spawn(
        async move {
            relay_story(model.as_ref(), &params, text, &tx, &cancel).await;
        }
        .instrument(span),
    );

    rx
}

/// Drives a generation to its terminal event.
pub async fn relay_story(
    model: &dyn StoryModel,
    params: &GenerationParams,
    text: TextStream,
    tx: &mpsc::Sender<StoryEvent>,
    cancel: &CancellationToken,
) {
    info!(
        pages = params.num_pages,
        images = params.num_images,
        "generating story"
    );

    match tell_story(model, params, text, tx, cancel).await {
        Ok(story) => {
            if emit(tx, StoryEvent::StoryComplete { story }).await.is_ok() {
                info!("story complete");
            }
        }
        Err(Halt::Disconnected) => info!("client went away, abandoning story"),
        Err(Halt::Failed(err)) => {
            error!(error = %err, "story generation failed");
            let _ = emit(
                tx,
                StoryEvent::Error {
                    message: GENERATION_FAILED.to_string(),
                },
            )
            .await;
        }
    }
}

async fn tell_story(
    model: &dyn StoryModel,
    params: &GenerationParams,
    mut text: TextStream,
    tx: &mpsc::Sender<StoryEvent>,
    cancel: &CancellationToken,
) -> Result<Story, Halt> {
    let mut segmenter = PageSegmenter::new(params.num_pages);
    let mut announced = 0;

    loop {
        let fragment = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Halt::Disconnected),
            fragment = text.next() => fragment,
        };
        let Some(fragment) = fragment else { break };
        let fragment = fragment?;

        let completed = segmenter.push(&fragment);
        emit(tx, StoryEvent::Text { content: fragment }).await?;
        for page_text in completed {
            announced += 1;
            emit(
                tx,
                StoryEvent::PageComplete {
                    page_number: announced,
                    page_text,
                },
            )
            .await?;
        }
    }

    if let Some(page_text) = segmenter.finish() {
        announced += 1;
        emit(
            tx,
            StoryEvent::PageComplete {
                page_number: announced,
                page_text,
            },
        )
        .await?;
    }
    debug!(pages = segmenter.completed(), "text stream finished");

    let mut story = segmenter.into_pages();

    // Placeholder pages are announced too, so every image follows its page.
    for (index, page) in story.iter().enumerate().skip(announced) {
        emit(
            tx,
            StoryEvent::PageComplete {
                page_number: index + 1,
                page_text: page.page_text.clone(),
            },
        )
        .await?;
    }

    for index in 0..params.illustrated_pages() {
        let prompt = styled_prompt(&image_prompt(&story[index].page_text));
        debug!(page = index + 1, %prompt, "requesting illustration");

        let image_url = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Halt::Disconnected),
            result = model.generate_image(&prompt) => result?,
        };

        story[index].image_url = Some(image_url.clone());
        emit(
            tx,
            StoryEvent::Image {
                page_number: index + 1,
                image_url,
            },
        )
        .await?;
    }

    Ok(story)
}

async fn emit(tx: &mpsc::Sender<StoryEvent>, event: StoryEvent) -> Result<(), Halt> {
    tx.send(event).await.map_err(|_| Halt::Disconnected)
}
