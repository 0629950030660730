//! Streaming decoder for `event:`/`data:` framed responses
//!
//! The chat service multiplexes named events over one connection as
//! line-oriented frames. The decoder keeps only a line buffer and the last
//! seen event name, so memory stays bounded no matter how long the response
//! runs, and the caller consumes events lazily as they arrive.

use crate::error::{ConfabError, Result};
use async_stream::try_stream;
use futures::Stream;
use futures_util::{pin_mut, StreamExt};

/// Reserved `data:` payload that ends the stream without being emitted.
pub const DONE_SENTINEL: &str = "[DONE]";

/// One decoded frame from the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEvent {
    /// Name carried by the most recent `event:` line, if any was seen.
    pub event: Option<String>,
    /// Payload of the `data:` line.
    pub data: String,
}

/// Decode a byte-chunk stream into a lazy sequence of [`StreamEvent`].
///
/// Chunk boundaries need not align with line boundaries. Lines matching
/// neither prefix, and blank framing lines, are ignored. Once the sentinel
/// payload arrives the sequence ends; the decoder is not restartable. A
/// source error propagates at the point the consumer pulls it, with no
/// partial event emitted for the broken line.
pub fn decode_sse<S, B, E>(source: S) -> impl Stream<Item = Result<StreamEvent>>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<ConfabError>,
{
    try_stream! {
        pin_mut!(source);
        let mut buffer = String::new();
        let mut current_event: Option<String> = None;

        while let Some(chunk) = source.next().await {
            let chunk = chunk.map_err(Into::into)?;
            buffer.push_str(&String::from_utf8_lossy(chunk.as_ref()));

            while let Some(newline_pos) = buffer.find('\n') {
                let line = buffer[..newline_pos].trim_end_matches('\r').to_string();
                buffer.drain(..=newline_pos);

                if let Some(name) = line.strip_prefix("event:") {
                    current_event = Some(name.trim().to_string());
                } else if let Some(payload) = line.strip_prefix("data:") {
                    let payload = payload.trim();
                    if payload == DONE_SENTINEL {
                        return;
                    }
                    yield StreamEvent {
                        event: current_event.clone(),
                        data: payload.to_string(),
                    };
                }
            }
        }
    }
}
