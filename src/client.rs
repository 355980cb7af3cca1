//! Client-side reconstruction of a story from its event stream.
//!
//! [`StoryView`] is a reducer: feed it the events of one generation and it
//! keeps the pages, the page being generated and the page being viewed.

use crate::models::{PAGE_BREAK, Page, StoryEvent};

pub const CONNECTION_LOST: &str = "Failed to connect to story generation stream.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    /// Text is arriving.
    Streaming,
    /// All text is in, illustrations are arriving.
    ImagesPending,
    Complete,
    Failed,
}

impl Phase {
    pub fn is_live(self) -> bool {
        matches!(self, Phase::Streaming | Phase::ImagesPending)
    }
}

/// Identifies one call to [`StoryView::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct GenerationId(u64);

#[derive(Debug)]
pub struct StoryView {
    generation: GenerationId,
    phase: Phase,
    num_pages: usize,
    pages: Vec<Page>,
    draft: String,
    generating: usize,
    current: usize,
    error: Option<String>,
}

impl Default for StoryView {
    fn default() -> Self {
        Self::new()
    }
}

impl StoryView {
    pub fn new() -> Self {
        Self {
            generation: GenerationId(0),
            phase: Phase::Idle,
            num_pages: 0,
            pages: Vec::new(),
            draft: String::new(),
            generating: 0,
            current: 0,
            error: None,
        }
    }

    /// Begins a new generation, abandoning any that is still running.
    ///
    /// Events tagged with an older id are ignored from here on.
    pub fn start(&mut self, num_pages: usize) -> GenerationId {
        let generation = GenerationId(self.generation.0 + 1);
        *self = Self {
            generation,
            phase: Phase::Streaming,
            num_pages,
            ..Self::new()
        };
        generation
    }

    pub fn apply(&mut self, generation: GenerationId, event: StoryEvent) {
        if generation != self.generation || !self.phase.is_live() {
            return;
        }

        match event {
            StoryEvent::Text { content } => {
                self.draft.push_str(&content);
                self.show_draft();
            }
            StoryEvent::PageComplete {
                page_number,
                page_text,
            } => {
                let Some(index) = page_number
                    .checked_sub(1)
                    .filter(|&index| index < self.num_pages)
                else {
                    return;
                };
                self.page_mut(index).page_text = page_text;
                self.generating = self.generating.max(index + 1);
                self.consume_completed_draft();
            }
            StoryEvent::Image {
                page_number,
                image_url,
            } => {
                self.phase = Phase::ImagesPending;
                if let Some(page) = page_number
                    .checked_sub(1)
                    .and_then(|index| self.pages.get_mut(index))
                {
                    page.image_url = Some(image_url);
                }
            }
            StoryEvent::StoryComplete { story } => {
                self.pages = story;
                self.phase = Phase::Complete;
                self.clamp_current();
            }
            StoryEvent::Error { message } => self.fail(message),
        }
    }

    /// The transport broke before a terminal event arrived.
    pub fn connection_lost(&mut self, generation: GenerationId) {
        if generation == self.generation && self.phase.is_live() {
            self.fail(CONNECTION_LOST.to_string());
        }
    }

    pub fn next_page(&mut self) {
        if !self.pages.is_empty() {
            self.current = (self.current + 1).min(self.pages.len() - 1);
        }
    }

    pub fn previous_page(&mut self) {
        self.current = self.current.saturating_sub(1);
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn current(&self) -> Option<&Page> {
        self.pages.get(self.current)
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Index of the page whose text is still arriving.
    pub fn generating_page(&self) -> usize {
        self.generating
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn fail(&mut self, message: String) {
        self.error = Some(message);
        self.phase = Phase::Failed;
    }

    /// Mirrors the unfinished text into the page being generated.
    ///
    /// Breaks already in the draft but not yet confirmed by a
    /// `page_complete` push the live text onto the following pages.
    fn show_draft(&mut self) {
        let mut segments: Vec<&str> = self.draft.split(PAGE_BREAK).collect();
        let tail = segments.pop().unwrap_or_default().trim_start().to_string();
        let pending = segments.iter().filter(|s| !s.trim().is_empty()).count();

        let index = self.generating + pending;
        if index >= self.num_pages || tail.is_empty() {
            return;
        }
        self.page_mut(index).page_text = tail;
    }

    /// Drops the draft text of the first page that has now been confirmed.
    fn consume_completed_draft(&mut self) {
        let mut offset = 0;
        while let Some(pos) = self.draft[offset..].find(PAGE_BREAK) {
            let segment = &self.draft[offset..offset + pos];
            let blank = segment.trim().is_empty();
            offset += pos + PAGE_BREAK.len();
            if !blank {
                self.draft.drain(..offset);
                return;
            }
        }
    }

    fn page_mut(&mut self, index: usize) -> &mut Page {
        if self.pages.len() <= index {
            self.pages.resize_with(index + 1, || Page::new(""));
        }
        &mut self.pages[index]
    }

    fn clamp_current(&mut self) {
        self.current = self.current.min(self.pages.len().saturating_sub(1));
    }
}
