//! Line reassembly across chunk boundaries
//!
//! Network reads do not respect record boundaries. [`LineDecoder`] keeps
//! the trailing partial line of each chunk and prepends it to the next
//! one. Bytes are buffered before UTF-8 decoding so a multi-byte
//! character split across two reads is decoded intact.

use futures::stream::{self, Stream, StreamExt};
use std::collections::VecDeque;
use tracing::warn;

/// Incremental splitter of a byte stream into text lines
#[derive(Debug, Default)]
pub struct LineDecoder {
    pending: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return every line it completed
    ///
    /// Blank lines are skipped and a trailing `\r` is stripped.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut rest = chunk;

        while let Some(pos) = rest.iter().position(|b| *b == b'\n') {
            self.pending.extend_from_slice(&rest[..pos]);
            rest = &rest[pos + 1..];

            let raw = std::mem::take(&mut self.pending);
            if let Some(line) = to_line(&raw) {
                lines.push(line);
            }
        }

        self.pending.extend_from_slice(rest);
        lines
    }

    /// Bytes buffered after the last newline
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// End of stream: discard any unterminated trailing line
    ///
    /// Returns the number of discarded bytes; a non-whitespace remainder
    /// is logged as a truncation.
    pub fn finish(&mut self) -> usize {
        let raw = std::mem::take(&mut self.pending);
        if to_line(&raw).is_some() {
            warn!(
                bytes = raw.len(),
                "Stream ended with an unterminated line; discarding truncated record"
            );
        }
        raw.len()
    }
}

fn to_line(raw: &[u8]) -> Option<String> {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    let text = String::from_utf8_lossy(raw);
    if text.trim().is_empty() {
        None
    } else {
        Some(text.into_owned())
    }
}

struct DecodeState<S> {
    chunks: S,
    decoder: LineDecoder,
    ready: VecDeque<String>,
    done: bool,
}

/// Lazily turn a stream of byte chunks into a stream of complete lines
///
/// A transport error is yielded once and ends the stream. On a clean end
/// the trailing partial line is discarded.
pub fn ndjson_lines<S, B, E>(chunks: S) -> impl Stream<Item = Result<String, E>>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
{
    let state = DecodeState {
        chunks,
        decoder: LineDecoder::new(),
        ready: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(line) = state.ready.pop_front() {
                return Some((Ok(line), state));
            }
            if state.done {
                return None;
            }

            match state.chunks.next().await {
                Some(Ok(chunk)) => {
                    let lines = state.decoder.push(chunk.as_ref());
                    state.ready.extend(lines);
                }
                Some(Err(e)) => {
                    state.done = true;
                    return Some((Err(e), state));
                }
                None => {
                    state.decoder.finish();
                    state.done = true;
                }
            }
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const BODY: &str = concat!(
        "{\"job_id\":\"J1\",\"status\":\"started\"}\n",
        "{\"email\":\"x@y.com\",\"category\":\"valid\"}\r\n",
        "\n",
        "{\"email\":\"zoë@y.com\",\"category\":\"invalid\"}\n",
        "{\"job_id\":\"J1\",\"status\":\"completed\"}\n",
    );

    fn decode_all(chunks: &[&[u8]]) -> Vec<String> {
        let mut decoder = LineDecoder::new();
        let mut lines = Vec::new();
        for chunk in chunks {
            lines.extend(decoder.push(chunk));
        }
        decoder.finish();
        lines
    }

    fn split_at_points(bytes: &[u8], mut points: Vec<usize>) -> Vec<&[u8]> {
        points.sort_unstable();
        points.dedup();
        let mut chunks = Vec::new();
        let mut start = 0;
        for p in points {
            chunks.push(&bytes[start..p]);
            start = p;
        }
        chunks.push(&bytes[start..]);
        chunks
    }

    #[test]
    fn test_single_chunk() {
        let lines = decode_all(&[BODY.as_bytes()]);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "{\"email\":\"x@y.com\",\"category\":\"valid\"}");
        assert!(lines[2].contains("zoë"));
    }

    #[test]
    fn test_partial_line_buffered_until_newline() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.push(b"{\"email\":\"a@").is_empty());
        assert_eq!(decoder.pending_len(), 12);
        let lines = decoder.push(b"b.com\"}\n{\"em");
        assert_eq!(lines, vec!["{\"email\":\"a@b.com\"}"]);
        assert_eq!(decoder.pending_len(), 4);
    }

    #[test]
    fn test_trailing_partial_line_is_discarded() {
        let lines = decode_all(&[&b"{\"a\":1}\n{\"b\":"[..]]);
        assert_eq!(lines, vec!["{\"a\":1}"]);

        let mut decoder = LineDecoder::new();
        decoder.push(b"{\"b\":");
        assert_eq!(decoder.finish(), 5);
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn test_multibyte_char_split_across_chunks() {
        let bytes = "{\"email\":\"zoë@y.com\"}\n".as_bytes();
        let split = bytes.iter().position(|b| *b == 0xC3).unwrap() + 1;
        let lines = decode_all(&[&bytes[..split], &bytes[split..]]);
        assert_eq!(lines, vec!["{\"email\":\"zoë@y.com\"}"]);
    }

    #[tokio::test]
    async fn test_stream_adapter_yields_lines_in_order() {
        let chunks: Vec<Result<&[u8], std::io::Error>> = vec![
            Ok(&b"{\"a\":1}\n{\"b\""[..]),
            Ok(&b":2}\n"[..]),
            Ok(&b"{\"c\":3}"[..]),
        ];
        let lines: Vec<_> = ndjson_lines(stream::iter(chunks))
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(lines, vec!["{\"a\":1}", "{\"b\":2}"]);
    }

    #[tokio::test]
    async fn test_stream_adapter_stops_after_error() {
        let chunks: Vec<Result<&[u8], String>> = vec![
            Ok(&b"{\"a\":1}\n"[..]),
            Err("connection reset".to_string()),
            Ok(&b"{\"b\":2}\n"[..]),
        ];
        let items: Vec<_> = ndjson_lines(stream::iter(chunks)).collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_deref(), Ok("{\"a\":1}"));
        assert_eq!(items[1], Err("connection reset".to_string()));
    }

    proptest! {
        #[test]
        fn prop_split_boundaries_do_not_change_lines(
            points in proptest::collection::vec(0..=BODY.len(), 0..12)
        ) {
            let bytes = BODY.as_bytes();
            let whole = decode_all(&[bytes]);
            let split = decode_all(&split_at_points(bytes, points));
            prop_assert_eq!(whole, split);
        }
    }
}
