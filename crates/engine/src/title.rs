//! Session title derivation from the first user message.

use regex::Regex;
use std::sync::OnceLock;

use shared::types::UNTITLED_TITLE;

const MAX_WORDS: usize = 5;
const MAX_CHARS: usize = 40;

fn markup_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // emphasis, inline code, headings, links, and bare bracket spans
    RE.get_or_init(|| Regex::new(r"(\*|_|`|#|\[.*?\]\(.*?\)|\[.*?\])").unwrap())
}

/// Derives a short human-readable title from message content. The caller
/// runs this exactly once per session, the first time the message list
/// becomes non-empty while the title still carries the placeholder.
pub fn derive(content: &str) -> String {
    let cleaned = markup_pattern().replace_all(content, "");
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut title = cleaned
        .split(' ')
        .take(MAX_WORDS)
        .collect::<Vec<_>>()
        .join(" ");

    if title.chars().count() > MAX_CHARS {
        title = title.chars().take(MAX_CHARS).collect::<String>();
        title = title.trim_end().to_string();
    }

    // Ellipsis whenever the title shows less than the cleaned message,
    // whether the word cap or the character cap did the cutting.
    if !title.is_empty() && cleaned.chars().count() > title.chars().count() {
        title.push_str("...");
    }

    if title.is_empty() {
        UNTITLED_TITLE.to_string()
    } else {
        title
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_message_untouched() {
        assert_eq!(derive("Build me a todo app"), "Build me a todo app");
    }

    #[test]
    fn test_long_message_takes_first_five_words() {
        let content = "please write a script that installs docker and configures \
                       the daemon with sensible defaults for my homelab server";
        assert_eq!(derive(content), "please write a script that...");
    }

    #[test]
    fn test_character_cap_applies_after_word_cap() {
        let content = "supercalifragilistic expialidocious antidisestablishmentarianism floccinaucinihilipilification pneumonoultramicroscopic";
        let title = derive(content);
        assert!(title.ends_with("..."));
        assert!(title.chars().count() <= MAX_CHARS + 3);
    }

    #[test]
    fn test_markdown_is_stripped() {
        assert_eq!(derive("**Build** me a `todo` app"), "Build me a todo app");
        assert_eq!(derive("# Heading only"), "Heading only");
        assert_eq!(derive("see [the docs](https://example.com) please"), "see please");
    }

    #[test]
    fn test_empty_after_cleaning_falls_back() {
        assert_eq!(derive("** ** `` ##"), UNTITLED_TITLE);
        assert_eq!(derive(""), UNTITLED_TITLE);
    }

    #[test]
    fn test_whitespace_collapsed() {
        assert_eq!(derive("fix   my\n\nbroken    cron"), "fix my broken cron");
    }
}
