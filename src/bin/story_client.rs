//! Terminal client for the story relay.
//!
//! Usage: `story-client <prompt> [numPages] [numImages]`
//!
//! Streams a story from `STORY_RELAY_URL` (default `http://localhost:3001`),
//! printing each page as it completes, then lets you page through the result
//! with `n`, `p` and `q`.

use anyhow::{Context, Result, bail};
use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use std::io::Write;
use story_relay::client::{Phase, StoryView};
use story_relay::models::StoryEvent;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let Some(prompt) = args.next() else {
        bail!("usage: story-client <prompt> [numPages] [numImages]");
    };
    let num_pages: usize = args
        .next()
        .map(|n| n.parse())
        .transpose()
        .context("numPages must be a number")?
        .unwrap_or(5);
    let num_images: usize = args
        .next()
        .map(|n| n.parse())
        .transpose()
        .context("numImages must be a number")?
        .unwrap_or(1);

    let base_url =
        std::env::var("STORY_RELAY_URL").unwrap_or_else(|_| "http://localhost:3001".to_string());

    let pages = num_pages.to_string();
    let images = num_images.to_string();
    let response = reqwest::Client::new()
        .get(format!(
            "{}/generate-story-stream",
            base_url.trim_end_matches('/')
        ))
        .query(&[
            ("prompt", prompt.as_str()),
            ("numPages", pages.as_str()),
            ("numImages", images.as_str()),
        ])
        .send()
        .await
        .context("could not reach the story relay")?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        bail!("relay refused the request ({status}): {body}");
    }

    let mut view = StoryView::new();
    let id = view.start(num_pages);
    let mut events = response.bytes_stream().eventsource();

    while let Some(event) = events.next().await {
        let event = match event {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(error = %err, "story stream broke");
                break;
            }
        };
        let event: StoryEvent = match serde_json::from_str(&event.data) {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(error = %err, data = %event.data, "skipping unreadable event");
                continue;
            }
        };

        match &event {
            StoryEvent::PageComplete {
                page_number,
                page_text,
            } => println!("\n[page {page_number}] {page_text}"),
            StoryEvent::Image {
                page_number,
                image_url,
            } => println!("[image for page {page_number}] {image_url}"),
            _ => {}
        }

        view.apply(id, event);
        if !view.phase().is_live() {
            break;
        }
    }
    view.connection_lost(id);

    if let Some(error) = view.error() {
        eprintln!("\n{error}");
    }
    if view.pages().is_empty() {
        return Ok(());
    }

    browse(&mut view).await
}

/// Interactive page navigation over whatever pages are known.
async fn browse(view: &mut StoryView) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        render(view);
        let Some(line) = lines.next_line().await? else {
            return Ok(());
        };
        match line.trim() {
            "n" => view.next_page(),
            "p" => view.previous_page(),
            "q" => return Ok(()),
            _ => {}
        }
    }
}

fn render(view: &StoryView) {
    let Some(page) = view.current() else { return };
    let status = match view.phase() {
        Phase::Complete => "",
        _ => " (incomplete)",
    };

    println!(
        "\n--- Page {} of {}{status} ---",
        view.current_index() + 1,
        view.pages().len()
    );
    println!("{}", page.page_text);
    if let Some(url) = &page.image_url {
        println!("Illustration: {url}");
    }
    print!("[n]ext, [p]revious, [q]uit > ");
    let _ = std::io::stdout().flush();
}
