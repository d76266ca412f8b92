/// Incremental server-sent-events decoder. Feed raw body chunks with `push`;
/// complete `data:` payloads come out in order no matter where the network
/// split the bytes.
#[derive(Debug, Default)]
pub struct SseDecoder {
    bytes: Vec<u8>,
    data: String,
    has_data: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.bytes.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(pos) = self.bytes.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.bytes.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            self.process_line(line.trim_end_matches(|c| c == '\n' || c == '\r'), &mut events);
        }

        events
    }

    /// Flushes whatever is left once the body has ended.
    pub fn finish(&mut self) -> Vec<String> {
        let mut events = Vec::new();
        if !self.bytes.is_empty() {
            let raw = std::mem::take(&mut self.bytes);
            let line = String::from_utf8_lossy(&raw);
            self.process_line(line.trim_end_matches(|c| c == '\n' || c == '\r'), &mut events);
        }
        self.process_line("", &mut events);
        events
    }

    fn process_line(&mut self, line: &str, events: &mut Vec<String>) {
        if line.is_empty() {
            if self.has_data {
                events.push(std::mem::take(&mut self.data));
                self.has_data = false;
            }
            return;
        }

        if let Some(value) = line.strip_prefix("data:") {
            if self.has_data {
                self.data.push('\n');
            }
            self.data.push_str(value.strip_prefix(' ').unwrap_or(value));
            self.has_data = true;
        }
        // comments, event:, id: and retry: lines carry nothing we use
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = "data: {\"a\":1}\r\n\r\n: keep-alive\r\ndata: {\"b\":\"é\"}\r\n\r\ndata: {\"c\":3}\n\n";

    #[test]
    fn test_whole_body() {
        let mut decoder = SseDecoder::new();
        let mut events = decoder.push(BODY.as_bytes());
        events.extend(decoder.finish());
        assert_eq!(events, vec!["{\"a\":1}", "{\"b\":\"é\"}", "{\"c\":3}"]);
    }

    #[test]
    fn test_split_at_every_byte() {
        let mut decoder = SseDecoder::new();
        let mut events = Vec::new();
        for byte in BODY.as_bytes() {
            events.extend(decoder.push(std::slice::from_ref(byte)));
        }
        events.extend(decoder.finish());
        assert_eq!(events, vec!["{\"a\":1}", "{\"b\":\"é\"}", "{\"c\":3}"]);
    }

    #[test]
    fn test_unterminated_tail_flushed_on_finish() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"last\":true}").is_empty());
        assert_eq!(decoder.finish(), vec!["{\"last\":true}"]);
    }

    #[test]
    fn test_multiline_data_joined() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"data: line one\ndata: line two\n\n");
        assert_eq!(events, vec!["line one\nline two"]);
    }
}
