use serde::{Deserialize, Serialize};

/// Literal delimiter the text model places between story pages.
pub const PAGE_BREAK: &str = "---PAGE BREAK---";

/// Text used for pages the text model never produced.
pub const PLACEHOLDER_PAGE: &str = "...";

/// Message shown to the client for any failure after streaming has begun.
pub const GENERATION_FAILED: &str = "Failed to generate story or images.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub page_text: String,
    pub image_url: Option<String>,
}

impl Page {
    pub fn new(page_text: impl Into<String>) -> Self {
        Self {
            page_text: page_text.into(),
            image_url: None,
        }
    }

    pub fn placeholder() -> Self {
        Self::new(PLACEHOLDER_PAGE)
    }
}

pub type Story = Vec<Page>;

/// Validated parameters of a single generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationParams {
    pub prompt: String,
    pub num_pages: usize,
    pub num_images: usize,
}

impl GenerationParams {
    /// Number of pages that will carry an illustration.
    pub fn illustrated_pages(&self) -> usize {
        self.num_images.min(self.num_pages)
    }

    /// Completion token budget handed to the text model.
    pub fn max_tokens(&self) -> u32 {
        (self.num_pages as u32).saturating_mul(150)
    }
}

/// Events written to the client, one `data:` line each.
///
/// Page numbers are 1-based on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoryEvent {
    Text {
        content: String,
    },
    PageComplete {
        #[serde(rename = "pageNumber")]
        page_number: usize,
        #[serde(rename = "pageText")]
        page_text: String,
    },
    Image {
        #[serde(rename = "pageNumber")]
        page_number: usize,
        #[serde(rename = "imageUrl")]
        image_url: String,
    },
    StoryComplete {
        story: Story,
    },
    Error {
        message: String,
    },
}

impl StoryEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::StoryComplete { .. } | Self::Error { .. })
    }
}
