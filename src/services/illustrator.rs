use regex::Regex;
use std::sync::LazyLock;

const STYLE_QUALIFIER: &str = "Children's story illustration, no text, high quality: ";

static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]").expect("sentence terminator pattern is valid"));

/// Derives the image prompt for a page: its first sentence, terminator
/// included. Falls back to the whole page when no sentence can be found.
pub fn image_prompt(page_text: &str) -> String {
    let text = page_text.trim();
    if let Some(end) = SENTENCE_END.find(text) {
        let sentence = text[..end.start()].trim();
        if !sentence.is_empty() {
            return format!("{sentence}{}", end.as_str());
        }
    }
    text.to_string()
}

/// Prepends the fixed illustration style to a page prompt.
pub fn styled_prompt(prompt: &str) -> String {
    format!("{STYLE_QUALIFIER}{prompt}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_first_sentence() {
        assert_eq!(
            image_prompt("The fox found a key. It opened a door."),
            "The fox found a key."
        );
    }

    #[test]
    fn keeps_the_terminator_that_ended_the_sentence() {
        assert_eq!(image_prompt("Look out! A bear."), "Look out!");
        assert_eq!(image_prompt("  Who is there? Nobody."), "Who is there?");
    }

    #[test]
    fn whole_text_without_terminator() {
        assert_eq!(image_prompt(" A fox in the snow "), "A fox in the snow");
    }

    #[test]
    fn placeholder_page_prompts_with_itself() {
        assert_eq!(image_prompt("..."), "...");
    }

    #[test]
    fn styled_prompt_prepends_qualifier() {
        assert_eq!(
            styled_prompt("A fox."),
            "Children's story illustration, no text, high quality: A fox."
        );
    }
}
