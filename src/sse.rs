//! Incremental parsing of server-sent event bodies.
//!
//! Bytes arrive in arbitrary slices; events are delimited by a blank line and
//! only their `data:` lines matter for chat completions.

/// One complete event payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    Data(String),
    Done,
}

#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes and drain every event completed by them.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(bytes);
        let mut frames = Vec::new();

        while let Some((end, delimiter)) = find_event_end(&self.buffer) {
            let event: Vec<u8> = self.buffer.drain(..end + delimiter).collect();
            let text = String::from_utf8_lossy(&event[..end]);
            if let Some(frame) = parse_event(&text) {
                frames.push(frame);
            }
        }

        frames
    }

    /// Flush a trailing event that was never terminated by a blank line.
    pub fn finish(&mut self) -> Option<SseFrame> {
        let rest = std::mem::take(&mut self.buffer);
        parse_event(&String::from_utf8_lossy(&rest))
    }
}

/// Position of the first blank line and the length of its delimiter.
/// Splitting on bytes keeps multi-byte characters intact across slices.
fn find_event_end(buffer: &[u8]) -> Option<(usize, usize)> {
    let lf = buffer.windows(2).position(|w| w == b"\n\n").map(|i| (i, 2));
    let crlf = buffer
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|i| (i, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

fn parse_event(text: &str) -> Option<SseFrame> {
    let data: Vec<&str> = text
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|value| value.strip_prefix(' ').unwrap_or(value).trim_end_matches('\r'))
        .collect();

    if data.is_empty() {
        return None;
    }

    let payload = data.join("\n");
    if payload.trim() == "[DONE]" {
        Some(SseFrame::Done)
    } else if payload.trim().is_empty() {
        None
    } else {
        Some(SseFrame::Data(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_data_and_done_frames() {
        let mut parser = SseParser::new();
        let frames = parser.feed(b"data: {\"a\":1}\n\ndata: [DONE]\n\n");
        assert_eq!(
            frames,
            vec![SseFrame::Data("{\"a\":1}".to_string()), SseFrame::Done]
        );
    }

    #[test]
    fn event_split_across_reads() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"data: {\"x\"").is_empty());
        assert!(parser.feed(b":2}\n").is_empty());
        let frames = parser.feed(b"\n");
        assert_eq!(frames, vec![SseFrame::Data("{\"x\":2}".to_string())]);
    }

    #[test]
    fn multibyte_character_split_across_reads() {
        let mut parser = SseParser::new();
        let body = "data: héllo\n\n".as_bytes();
        // split inside the two-byte 'é'
        assert!(parser.feed(&body[..8]).is_empty());
        let frames = parser.feed(&body[8..]);
        assert_eq!(frames, vec![SseFrame::Data("héllo".to_string())]);
    }

    #[test]
    fn comments_and_event_lines_are_ignored() {
        let mut parser = SseParser::new();
        let frames = parser.feed(b": keep-alive\n\nevent: message\ndata: hi\n\n");
        assert_eq!(frames, vec![SseFrame::Data("hi".to_string())]);
    }

    #[test]
    fn crlf_delimiters() {
        let mut parser = SseParser::new();
        let frames = parser.feed(b"data: one\r\n\r\ndata: [DONE]\r\n\r\n");
        assert_eq!(frames, vec![SseFrame::Data("one".to_string()), SseFrame::Done]);
    }

    #[test]
    fn finish_flushes_unterminated_event() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"data: tail").is_empty());
        assert_eq!(parser.finish(), Some(SseFrame::Data("tail".to_string())));
        assert_eq!(parser.finish(), None);
    }
}
