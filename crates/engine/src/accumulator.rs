//! Streaming accumulation for one exchange.
//!
//! Folds incremental text and citation chunks into a single in-progress
//! assistant message. Modeled as an explicit state machine so the UI
//! indicator and the commit/failure transitions have one home.

use shared::agent_api::StreamChunk;
use shared::types::Citation;

/// Prefixed to the error detail shown in place of the assistant reply.
pub const ERROR_PREFACE: &str = "Sorry, I encountered an error. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    AwaitingFirstChunk,
    Streaming,
    Complete,
    Failed,
}

/// Progress indicator shown while the exchange runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    UsingSearch,
    Thinking,
    Generating,
}

impl Indicator {
    pub fn label(&self) -> &'static str {
        match self {
            Indicator::UsingSearch => "Using Tool: Google Search",
            Indicator::Thinking => "Thinking...",
            Indicator::Generating => "Generating response...",
        }
    }
}

pub struct Accumulator {
    phase: Phase,
    search_enabled: bool,
    text: String,
    citations: Vec<Citation>,
}

impl Accumulator {
    pub fn new(search_enabled: bool) -> Self {
        Self {
            phase: Phase::Idle,
            search_enabled,
            text: String::new(),
            citations: Vec::new(),
        }
    }

    /// Marks the request as issued.
    pub fn start(&mut self) {
        if self.phase == Phase::Idle {
            self.phase = Phase::AwaitingFirstChunk;
        }
    }

    /// Folds one stream chunk in. Returns true when the visible message
    /// content changed and the caller should propagate an update.
    pub fn apply(&mut self, chunk: StreamChunk) -> bool {
        match chunk {
            StreamChunk::Text(fragment) => {
                self.enter_streaming();
                self.text.push_str(&fragment);
                true
            }
            StreamChunk::Citation { uri, title } => {
                self.enter_streaming();
                // dedup by uri, first-seen order and first-seen title win
                if self.citations.iter().any(|c| c.uri == uri) {
                    return false;
                }
                self.citations.push(Citation { uri, title });
                true
            }
            StreamChunk::Done => {
                // zero chunks before Done is a valid, empty completion
                self.phase = Phase::Complete;
                false
            }
        }
    }

    /// Replaces the accumulated content with a user-visible error string.
    pub fn fail(&mut self, detail: &str) {
        self.phase = Phase::Failed;
        self.text = format!("{ERROR_PREFACE}\n\nDetails: {detail}");
        self.citations.clear();
    }

    fn enter_streaming(&mut self) {
        if matches!(self.phase, Phase::Idle | Phase::AwaitingFirstChunk) {
            self.phase = Phase::Streaming;
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn indicator(&self) -> Option<Indicator> {
        match self.phase {
            Phase::AwaitingFirstChunk if self.search_enabled => Some(Indicator::UsingSearch),
            Phase::AwaitingFirstChunk => Some(Indicator::Thinking),
            Phase::Streaming => Some(Indicator::Generating),
            _ => None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn citations(&self) -> &[Citation] {
        &self.citations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn citation(uri: &str, title: &str) -> StreamChunk {
        StreamChunk::Citation {
            uri: uri.to_string(),
            title: title.to_string(),
        }
    }

    #[test]
    fn test_text_appends_in_arrival_order() {
        let mut acc = Accumulator::new(false);
        acc.start();
        acc.apply(StreamChunk::Text("Hello, ".to_string()));
        acc.apply(StreamChunk::Text("world".to_string()));
        acc.apply(StreamChunk::Done);
        assert_eq!(acc.text(), "Hello, world");
        assert_eq!(acc.phase(), Phase::Complete);
    }

    #[test]
    fn test_citation_dedup_keeps_first_seen() {
        let mut acc = Accumulator::new(true);
        acc.start();
        acc.apply(citation("https://a.com", "first title"));
        acc.apply(citation("https://b.com", "b"));
        acc.apply(citation("https://a.com", "second title"));
        acc.apply(StreamChunk::Done);

        let citations = acc.citations();
        assert_eq!(citations.len(), 2);
        assert_eq!(citations[0].uri, "https://a.com");
        assert_eq!(citations[0].title, "first title");
        assert_eq!(citations[1].uri, "https://b.com");
    }

    #[test]
    fn test_indicator_progression() {
        let mut acc = Accumulator::new(false);
        assert_eq!(acc.indicator(), None);
        acc.start();
        assert_eq!(acc.indicator(), Some(Indicator::Thinking));
        acc.apply(StreamChunk::Text("x".to_string()));
        assert_eq!(acc.indicator(), Some(Indicator::Generating));
        acc.apply(StreamChunk::Done);
        assert_eq!(acc.indicator(), None);
    }

    #[test]
    fn test_search_indicator_before_first_chunk() {
        let mut acc = Accumulator::new(true);
        acc.start();
        assert_eq!(acc.indicator(), Some(Indicator::UsingSearch));
    }

    #[test]
    fn test_empty_stream_completes_with_empty_text() {
        let mut acc = Accumulator::new(false);
        acc.start();
        acc.apply(StreamChunk::Done);
        assert_eq!(acc.phase(), Phase::Complete);
        assert_eq!(acc.text(), "");
    }

    #[test]
    fn test_failure_replaces_content() {
        let mut acc = Accumulator::new(false);
        acc.start();
        acc.apply(StreamChunk::Text("partial".to_string()));
        acc.fail("connection reset");
        assert_eq!(acc.phase(), Phase::Failed);
        assert_eq!(
            acc.text(),
            "Sorry, I encountered an error. Please try again.\n\nDetails: connection reset"
        );
    }
}
