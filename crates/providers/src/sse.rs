/// SSE (Server-Sent Events) parser for streaming responses.
///
/// SSE format: events separated by a blank line, each containing optional
/// `event:` and `data:` lines.

/// A single parsed SSE event.
#[derive(Debug, Clone)]
pub struct SseEvent {
    /// The `event:` field, if present.
    pub event: Option<String>,
    /// The `data:` field content.
    pub data: String,
}

/// Incremental SSE parser that buffers incomplete lines across chunk boundaries.
pub struct SseParser {
    buffer: String,
    /// Trailing bytes of a UTF-8 sequence cut off by a chunk boundary.
    pending: Vec<u8>,
}

impl SseParser {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            pending: Vec::new(),
        }
    }

    /// Feed raw bytes from the HTTP response. Returns any complete SSE events found.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.pending.extend_from_slice(chunk);
        let (text, consumed) = match std::str::from_utf8(&self.pending) {
            Ok(text) => (text.to_string(), self.pending.len()),
            // a decode error at the very end is a character split across
            // chunks; those bytes wait for the next feed
            Err(err) if err.error_len().is_none() => (
                String::from_utf8_lossy(&self.pending[..err.valid_up_to()]).into_owned(),
                err.valid_up_to(),
            ),
            Err(_) => (
                String::from_utf8_lossy(&self.pending).into_owned(),
                self.pending.len(),
            ),
        };
        self.pending.drain(..consumed);
        // Normalize CRLF so the boundary scan only has to handle one form.
        self.buffer.push_str(&text.replace("\r\n", "\n"));

        let mut events = Vec::new();

        // Split on double newline (SSE event boundary)
        while let Some(boundary) = self.buffer.find("\n\n") {
            let block = self.buffer[..boundary].to_string();
            self.buffer = self.buffer[boundary + 2..].to_string();

            let mut event_type: Option<String> = None;
            let mut data_lines: Vec<String> = Vec::new();

            for line in block.lines() {
                if let Some(val) = line.strip_prefix("event:") {
                    event_type = Some(val.trim().to_string());
                } else if let Some(val) = line.strip_prefix("data:") {
                    data_lines.push(val.trim_start_matches(' ').to_string());
                }
                // Ignore other fields (id:, retry:, comments starting with :)
            }

            if !data_lines.is_empty() {
                events.push(SseEvent {
                    event: event_type,
                    data: data_lines.join("\n"),
                });
            }
        }

        events
    }
}

impl Default for SseParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_sse() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"data: hello\n\ndata: world\n\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data, "hello");
        assert_eq!(events[1].data, "world");
    }

    #[test]
    fn test_event_types() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"event: message\ndata: {\"type\":\"chunk\"}\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event.as_deref(), Some("message"));
        assert_eq!(events[0].data, "{\"type\":\"chunk\"}");
    }

    #[test]
    fn test_split_across_chunks() {
        let mut parser = SseParser::new();
        let events1 = parser.feed(b"data: hel");
        assert_eq!(events1.len(), 0);
        let events2 = parser.feed(b"lo\n\n");
        assert_eq!(events2.len(), 1);
        assert_eq!(events2[0].data, "hello");
    }

    #[test]
    fn test_multibyte_char_split_across_chunks() {
        let mut parser = SseParser::new();
        let bytes = "data: caf\u{e9}\n\n".as_bytes();
        // cut inside the two-byte e-acute
        assert!(parser.feed(&bytes[..10]).is_empty());
        let events = parser.feed(&bytes[10..]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "caf\u{e9}");
    }

    #[test]
    fn test_invalid_bytes_do_not_wedge_the_parser() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"data: a\xffb\n\ndata: ok\n\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data, "a\u{fffd}b");
        assert_eq!(events[1].data, "ok");
    }

    #[test]
    fn test_crlf_delimiters() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"data: hello\r\n\r\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "hello");
    }

    #[test]
    fn test_comments_are_ignored() {
        let mut parser = SseParser::new();
        let events = parser.feed(b": keep-alive\n\ndata: x\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "x");
    }
}
