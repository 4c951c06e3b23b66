// src/llm/sse.rs
// Incremental line assembly for server-sent-event byte streams.

/// Buffers raw network chunks and yields complete SSE lines.
///
/// A chunk may contain zero or more complete or partial lines, and a
/// multi-byte character can be split across two chunks, so bytes are only
/// decoded once a full line is available. Blank lines (frame separators)
/// are dropped.
#[derive(Default)]
pub struct SseLineBuffer {
    buf: Vec<u8>,
}

impl SseLineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk, draining every complete line it closes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);
            if !line.is_empty() {
                lines.push(line.to_string());
            }
        }
        lines
    }
}

/// Extract the payload of a `data: ` line, if this is one.
pub fn data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data: ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_complete_line() {
        let mut buf = SseLineBuffer::new();
        let lines = buf.push(b"data: {\"x\":1}\n\n");
        assert_eq!(lines, vec!["data: {\"x\":1}"]);
    }

    #[test]
    fn test_line_split_across_chunks() {
        let mut buf = SseLineBuffer::new();
        assert!(buf.push(b"data: {\"cont").is_empty());
        let lines = buf.push(b"ent\":\"He\"}\n");
        assert_eq!(lines, vec!["data: {\"content\":\"He\"}"]);
    }

    #[test]
    fn test_multiple_lines_in_one_chunk() {
        let mut buf = SseLineBuffer::new();
        let lines = buf.push(b"data: a\n\ndata: b\n\n");
        assert_eq!(lines, vec!["data: a", "data: b"]);
    }

    #[test]
    fn test_crlf_terminators() {
        let mut buf = SseLineBuffer::new();
        let lines = buf.push(b"data: a\r\n\r\n");
        assert_eq!(lines, vec!["data: a"]);
    }

    #[test]
    fn test_multibyte_char_split_across_chunks() {
        let mut buf = SseLineBuffer::new();
        let full = "data: coração\n".as_bytes();
        // Split inside the two-byte 'ç'
        let split_at = full.len() - 4;
        assert!(buf.push(&full[..split_at]).is_empty());
        let lines = buf.push(&full[split_at..]);
        assert_eq!(lines, vec!["data: coração"]);
    }

    #[test]
    fn test_data_payload() {
        assert_eq!(data_payload("data: [DONE]"), Some("[DONE]"));
        assert_eq!(data_payload(": keep-alive"), None);
        assert_eq!(data_payload("event: ping"), None);
    }
}
