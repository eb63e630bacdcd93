//! Framed event decoder
//!
//! The planner streams newline-delimited frames. Only lines starting with
//! the exact `data: ` prefix carry an event; everything else (`event:` lines,
//! comments, blank separators) is skipped. Chunks may split anywhere, including
//! inside a UTF-8 code point, so bytes are buffered until a line terminator.

use async_stream::stream;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::event::{Event, EventStream};

/// Prefix marking a data frame
pub const DATA_PREFIX: &str = "data: ";

/// Longest frame excerpt included in diagnostics
const DIAGNOSTIC_EXCERPT: usize = 120;

/// Incremental line splitter that extracts data frame payloads
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return the payloads of every data frame it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buffer[start..].iter().position(|b| *b == b'\n') {
            let end = start + offset;
            let mut line = &self.buffer[start..end];
            if let Some(stripped) = line.strip_suffix(b"\r") {
                line = stripped;
            }
            if let Some(frame) = data_payload(line) {
                frames.push(frame);
            }
            start = end + 1;
        }
        self.buffer.drain(..start);
        frames
    }

    /// End of input; an unterminated remainder can never be a complete frame
    pub fn finish(self) {
        if !self.buffer.is_empty() {
            tracing::debug!(
                bytes = self.buffer.len(),
                "Discarding unterminated trailing line"
            );
        }
    }
}

fn data_payload(line: &[u8]) -> Option<String> {
    let payload = line.strip_prefix(DATA_PREFIX.as_bytes())?;
    match std::str::from_utf8(payload) {
        Ok(text) => Some(text.to_string()),
        Err(e) => {
            tracing::warn!(error = %e, "Dropping data frame with invalid UTF-8");
            None
        }
    }
}

/// Parse a frame payload, reporting failures as diagnostics instead of errors
pub fn parse_frame(frame: &str) -> Option<Event> {
    match Event::parse(frame) {
        Ok(event) => {
            tracing::debug!(tag = event.tag(), "Decoded event");
            Some(event)
        }
        Err(e) => {
            let excerpt: String = frame.chars().take(DIAGNOSTIC_EXCERPT).collect();
            tracing::warn!(error = %e, frame = %excerpt, "Dropping malformed frame");
            None
        }
    }
}

/// Decode a chunked byte stream into parsed events
///
/// One chunk is requested at a time. A transport error ends the stream after
/// being yielded. Cancelling `cancel` stops further reads; events already
/// decoded from the last chunk are still delivered.
pub fn decode_events<S, B, E>(byte_stream: S, cancel: CancellationToken) -> EventStream
where
    S: futures::Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<Error> + Send + 'static,
{
    Box::pin(stream! {
        let mut decoder = FrameDecoder::new();
        let mut byte_stream = std::pin::pin!(byte_stream);

        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tracing::debug!("Stream read cancelled");
                    break;
                }
                next = byte_stream.next() => next,
            };

            match next {
                Some(Ok(chunk)) => {
                    for frame in decoder.push(chunk.as_ref()) {
                        if let Some(event) = parse_frame(&frame) {
                            yield Ok(event);
                        }
                    }
                }
                Some(Err(e)) => {
                    yield Err(e.into());
                    break;
                }
                None => break,
            }
        }

        decoder.finish();
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use futures::stream;

    const STEP: &str = "data: {\"type\":\"step\",\"step\":\"Analyzing\",\"content\":\"Looking at options\"}\n";
    const RESULT: &str = "data: {\"type\":\"result\",\"content\":\"Done\",\"itinerary\":{\"destination\":\"Kyoto\"}}\n";

    fn chunks(parts: Vec<Vec<u8>>) -> impl futures::Stream<Item = Result<Vec<u8>, Error>> {
        stream::iter(parts.into_iter().map(Ok))
    }

    fn whole(body: &str) -> Vec<Vec<u8>> {
        vec![body.as_bytes().to_vec()]
    }

    async fn collect_tags(stream: EventStream) -> Vec<String> {
        stream
            .map(|e| e.unwrap().tag().to_string())
            .collect()
            .await
    }

    #[test]
    fn test_push_emits_complete_lines_only() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(b"data: {\"type\":").is_empty());
        let frames = decoder.push(b"\"complete\"}\ndata: {\"ty");
        assert_eq!(frames, vec!["{\"type\":\"complete\"}".to_string()]);
        // the held-back tail joins the next chunk
        let frames = decoder.push(b"pe\":\"resume\"}\n");
        assert_eq!(frames, vec!["{\"type\":\"resume\"}".to_string()]);
    }

    #[test]
    fn test_non_data_lines_filtered() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.push(
            b"event: step\r\n: keep-alive\r\n\r\ndata:{\"no\":\"space\"}\r\n DATA: x\r\ndata: {\"a\":1}\r\n",
        );
        assert_eq!(frames, vec!["{\"a\":1}".to_string()]);
    }

    #[test]
    fn test_crlf_stripped() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.push(b"data: {\"type\":\"complete\"}\r\n");
        assert_eq!(frames, vec!["{\"type\":\"complete\"}".to_string()]);
    }

    #[test]
    fn test_utf8_split_across_chunks() {
        let line = "data: {\"type\":\"message\",\"content\":\"Zürich\"}\n".as_bytes();
        let split = line.iter().position(|b| *b == 0xC3).unwrap() + 1;
        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(&line[..split]).is_empty());
        let frames = decoder.push(&line[split..]);
        assert_eq!(frames.len(), 1);
        assert!(frames[0].contains("Zürich"));
    }

    #[test]
    fn test_invalid_utf8_line_dropped() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.push(b"data: \xff\xfe\ndata: {\"ok\":true}\n");
        assert_eq!(frames, vec!["{\"ok\":true}".to_string()]);
    }

    #[test]
    fn test_parse_frame_absorbs_failures() {
        assert!(parse_frame("not-json").is_none());
        assert!(parse_frame("{\"type\":\"complete\"}").is_some());
    }

    #[tokio::test]
    async fn test_decode_events_in_order() {
        let body = format!("{STEP}{RESULT}");
        let tags = collect_tags(decode_events(chunks(whole(&body)), CancellationToken::new())).await;
        assert_eq!(tags, vec!["step", "result"]);
    }

    #[tokio::test]
    async fn test_fragmentation_does_not_change_events() {
        let body = format!("event: step\n{STEP}data: not-json\n{RESULT}");
        let bytes = body.as_bytes();

        let reference: Vec<Event> = decode_events(chunks(whole(&body)), CancellationToken::new())
            .map(|e| e.unwrap())
            .collect()
            .await;
        assert_eq!(reference.len(), 2);

        for size in [1, 2, 3, 7, 16, 64] {
            let parts: Vec<Vec<u8>> = bytes.chunks(size).map(<[u8]>::to_vec).collect();
            let split: Vec<Event> = decode_events(chunks(parts), CancellationToken::new())
                .map(|e| e.unwrap())
                .collect()
                .await;
            assert_eq!(split, reference, "chunk size {size}");
        }
    }

    #[tokio::test]
    async fn test_malformed_frame_between_valid_frames() {
        let body = format!("{STEP}data: not-json\n{RESULT}");
        let tags = collect_tags(decode_events(chunks(whole(&body)), CancellationToken::new())).await;
        assert_eq!(tags, vec!["step", "result"]);
    }

    #[tokio::test]
    async fn test_unterminated_remainder_discarded() {
        let parts = vec![
            STEP.as_bytes().to_vec(),
            b"data: {\"type\":\"complete\"}".to_vec(),
        ];
        let tags = collect_tags(decode_events(chunks(parts), CancellationToken::new())).await;
        assert_eq!(tags, vec!["step"]);
    }

    #[tokio::test]
    async fn test_transport_error_ends_stream() {
        let parts = vec![
            Ok(STEP.as_bytes().to_vec()),
            Err(Error::UnexpectedResponse("connection reset".into())),
            Ok(RESULT.as_bytes().to_vec()),
        ];
        let items: Vec<_> = decode_events(stream::iter(parts), CancellationToken::new())
            .collect()
            .await;
        assert_eq!(items.len(), 2);
        assert!(matches!(items[0].as_ref().unwrap().kind, EventKind::Step(_)));
        assert!(items[1].is_err());
    }

    #[tokio::test]
    async fn test_cancelled_before_read_yields_nothing() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let tags = collect_tags(decode_events(chunks(whole(STEP)), cancel)).await;
        assert!(tags.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_delivers_decoded_chunk_then_stops() {
        let cancel = CancellationToken::new();
        let parts = vec![
            format!("{STEP}{STEP}").into_bytes(),
            RESULT.as_bytes().to_vec(),
        ];
        let mut events = decode_events(chunks(parts), cancel.clone());

        assert!(events.next().await.unwrap().is_ok());
        cancel.cancel();
        // second frame of the chunk already read
        assert!(events.next().await.unwrap().is_ok());
        assert!(events.next().await.is_none());
    }
}
