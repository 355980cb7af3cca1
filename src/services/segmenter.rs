use crate::models::{PAGE_BREAK, Page};

/// Splits the streamed story text into pages as fragments arrive.
///
/// Only the text after the last seen marker is buffered, so a marker that
/// straddles two fragments is found once both halves are in the buffer.
#[derive(Debug)]
pub struct PageSegmenter {
    num_pages: usize,
    buffer: String,
    pages: Vec<String>,
}

impl PageSegmenter {
    pub fn new(num_pages: usize) -> Self {
        Self {
            num_pages,
            buffer: String::new(),
            pages: Vec::new(),
        }
    }

    /// Appends a fragment and returns the pages it completed, in order.
    pub fn push(&mut self, fragment: &str) -> Vec<String> {
        self.buffer.push_str(fragment);
        if !self.buffer.contains(PAGE_BREAK) {
            return Vec::new();
        }

        let mut segments: Vec<&str> = self.buffer.split(PAGE_BREAK).collect();
        let remainder = segments.pop().unwrap_or_default().to_string();

        let mut completed = Vec::new();
        for segment in segments {
            let page = segment.trim();
            if !page.is_empty() && self.pages.len() < self.num_pages {
                self.pages.push(page.to_string());
                completed.push(page.to_string());
            }
        }

        self.buffer = remainder;
        completed
    }

    /// Flushes the trailing text at end of stream.
    pub fn finish(&mut self) -> Option<String> {
        let page = self.buffer.trim().to_string();
        self.buffer.clear();
        if page.is_empty() || self.pages.len() >= self.num_pages {
            return None;
        }
        self.pages.push(page.clone());
        Some(page)
    }

    /// Number of pages completed so far.
    pub fn completed(&self) -> usize {
        self.pages.len()
    }

    /// The finished story, padded with placeholders or truncated to the
    /// requested page count.
    pub fn into_pages(self) -> Vec<Page> {
        let mut pages: Vec<Page> = self.pages.into_iter().map(Page::new).collect();
        pages.resize_with(self.num_pages, Page::placeholder);
        pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(fragments: &[&str], num_pages: usize) -> (Vec<String>, Vec<Page>) {
        let mut segmenter = PageSegmenter::new(num_pages);
        let mut emitted = Vec::new();
        for fragment in fragments {
            emitted.extend(segmenter.push(fragment));
        }
        emitted.extend(segmenter.finish());
        (emitted, segmenter.into_pages())
    }

    fn texts(pages: &[Page]) -> Vec<&str> {
        pages.iter().map(|p| p.page_text.as_str()).collect()
    }

    #[test]
    fn splits_curious_fox_story() {
        let (emitted, pages) = segment(
            &[
                "Once",
                " upon a time.",
                "---PAGE BREAK---",
                " Page two.",
                "---PAGE BREAK---",
                " Page three.",
            ],
            3,
        );
        assert_eq!(emitted, vec!["Once upon a time.", "Page two.", "Page three."]);
        assert_eq!(texts(&pages), vec!["Once upon a time.", "Page two.", "Page three."]);
    }

    #[test]
    fn pads_missing_pages_with_placeholder() {
        let (emitted, pages) = segment(&["A short tale."], 2);
        assert_eq!(emitted, vec!["A short tale."]);
        assert_eq!(texts(&pages), vec!["A short tale.", "..."]);
    }

    #[test]
    fn drops_pages_beyond_requested_count() {
        let (emitted, pages) = segment(
            &["One.---PAGE BREAK---Two.---PAGE BREAK---Three.---PAGE BREAK---Four."],
            2,
        );
        assert_eq!(emitted, vec!["One.", "Two."]);
        assert_eq!(texts(&pages), vec!["One.", "Two."]);
    }

    #[test]
    fn detects_marker_split_across_fragments() {
        let mut segmenter = PageSegmenter::new(2);
        assert!(segmenter.push("First page.---PAGE ").is_empty());
        assert_eq!(segmenter.push("BREAK---Second"), vec!["First page."]);
        assert_eq!(segmenter.finish(), Some("Second".to_string()));
    }

    #[test]
    fn skips_empty_segments_between_markers() {
        let (emitted, _) = segment(&["---PAGE BREAK---  ---PAGE BREAK---Only page."], 3);
        assert_eq!(emitted, vec!["Only page."]);
    }

    #[test]
    fn segmentation_ignores_fragment_boundaries() {
        let text = "Once upon a time.---PAGE BREAK--- The fox ran.---PAGE BREAK--- The end.";
        let (_, whole) = segment(&[text], 3);

        for size in 1..text.len() {
            let chars: Vec<char> = text.chars().collect();
            let fragments: Vec<String> = chars
                .chunks(size)
                .map(|chunk| chunk.iter().collect())
                .collect();
            let refs: Vec<&str> = fragments.iter().map(String::as_str).collect();
            let (_, split) = segment(&refs, 3);
            assert_eq!(split, whole, "chunk size {size}");
        }
    }

    #[test]
    fn always_yields_requested_page_count() {
        for num_pages in 1..=10 {
            for markers in 0..12 {
                let text = vec!["Page."; markers + 1].join(PAGE_BREAK);
                let (_, pages) = segment(&[text.as_str()], num_pages);
                assert_eq!(pages.len(), num_pages);
            }
        }
    }
}
