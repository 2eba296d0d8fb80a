//! NDJSON line decoding.
//!
//! Network chunks arrive with arbitrary boundaries. [`StreamDecoder`] keeps
//! the trailing partial line between chunks and only hands out complete,
//! trimmed, non-empty lines, so the emitted sequence does not depend on how
//! the body was split.
//!
//! Lines are cut on the raw `\n` byte before UTF-8 decoding. A newline byte
//! never occurs inside a multi-byte sequence, so a character split across two
//! chunks is reassembled before it is decoded.

/// Incremental newline-delimited line decoder.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    pending: Vec<u8>,
    /// Prefix of `pending` already known to contain no newline.
    scanned: usize,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return every line it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(offset) = self.pending[self.scanned..]
            .iter()
            .position(|byte| *byte == b'\n')
        {
            let index = self.scanned + offset;
            let mut line = self.pending.drain(..=index).collect::<Vec<u8>>();
            line.pop();
            self.scanned = 0;
            if let Some(line) = normalize(&line) {
                lines.push(line);
            }
        }
        self.scanned = self.pending.len();
        lines
    }

    /// Flush the residual partial line at end of stream.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.pending);
        self.scanned = 0;
        normalize(&rest)
    }

    /// Bytes buffered without a terminating newline yet.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Decode all lines of a complete body delivered as `chunks`.
pub fn decode_all<'a, I>(chunks: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut decoder = StreamDecoder::new();
    let mut lines = Vec::new();
    for chunk in chunks {
        lines.extend(decoder.push(chunk));
    }
    lines.extend(decoder.finish());
    lines
}

fn normalize(raw: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(raw);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const BODY: &str = "{\"token\":\"Hel\"}\n\n{\"token\":\"lo ☃\"}\r\n   \n{\"done\":true,\"content\":\"Hello ☃\"}\ntrailing";

    fn whole() -> Vec<String> {
        decode_all([BODY.as_bytes()])
    }

    #[test]
    fn test_single_chunk() {
        assert_eq!(
            whole(),
            vec![
                "{\"token\":\"Hel\"}",
                "{\"token\":\"lo ☃\"}",
                "{\"done\":true,\"content\":\"Hello ☃\"}",
                "trailing",
            ]
        );
    }

    #[test]
    fn test_chunk_boundary_invariance() {
        let bytes = BODY.as_bytes();
        let expected = whole();

        // Every pair of cut points, including cuts inside the snowman.
        for first in 0..=bytes.len() {
            for second in first..=bytes.len() {
                let chunks = [&bytes[..first], &bytes[first..second], &bytes[second..]];
                assert_eq!(
                    decode_all(chunks.iter().copied()),
                    expected,
                    "split at {first}/{second}"
                );
            }
        }
    }

    #[test]
    fn test_byte_at_a_time() {
        let chunks: Vec<&[u8]> = BODY.as_bytes().chunks(1).collect();
        assert_eq!(decode_all(chunks), whole());
    }

    #[test]
    fn test_trailing_partial_flushed_once() {
        let mut decoder = StreamDecoder::new();
        assert_eq!(decoder.push(b"{\"a\":1}\n  partial  "), vec!["{\"a\":1}"]);
        assert_eq!(decoder.pending_len(), "  partial  ".len());
        assert_eq!(decoder.finish(), Some("partial".to_string()));
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_whitespace_only_lines_suppressed() {
        let lines = decode_all([b"\n \n\t\r\n".as_slice(), b"  ".as_slice()]);
        assert!(lines.is_empty());
    }

    #[test]
    fn test_line_split_without_newline_waits() {
        let mut decoder = StreamDecoder::new();
        assert!(decoder.push(b"{\"tok").is_empty());
        assert!(decoder.push(b"en\":\"x\"").is_empty());
        assert_eq!(decoder.push(b"}\n"), vec!["{\"token\":\"x\"}"]);
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn test_long_line_across_many_chunks() {
        let mut decoder = StreamDecoder::new();
        for _ in 0..10_000 {
            assert!(decoder.push(b"ab").is_empty());
        }
        assert_eq!(decoder.pending_len(), 20_000);

        let lines = decoder.push(b"\nnext\nta");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "ab".repeat(10_000));
        assert_eq!(lines[1], "next");

        assert!(decoder.push(b"il").is_empty());
        assert_eq!(decoder.push(b"\n"), vec!["tail"]);
    }
}
