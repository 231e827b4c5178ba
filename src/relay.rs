//! Streaming relay: progress frames onto a half-duplex text stream.
//!
//! Frames use a line-oriented event framing: each event is one
//! `data: <JSON>\n\n` line whose JSON is a chat-completion delta chunk,
//! and the literal `data: [DONE]\n\n` sentinel ends the stream. The
//! polling task pushes frames onto a queue; the relay pulls and
//! serializes them, which keeps tick cadence independent of outbound
//! backpressure.

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;

use crate::error::GenError;
use crate::job::ProgressFrame;

/// End-of-stream sentinel.
pub const DONE_SENTINEL: &str = "data: [DONE]\n\n";

/// Serialize one frame into its wire event.
pub fn encode_frame(frame: &ProgressFrame) -> String {
    let payload = serde_json::json!({
        "choices": [ { "delta": { "content": frame.text } } ]
    });
    format!("data: {payload}\n\n")
}

/// Producer half of a relay queue.
///
/// Once a send fails the receiver is gone, so the sink stops forwarding
/// altogether: write failures on a closed relay are swallowed, and the
/// polling task keeps running to its terminal state regardless.
pub struct FrameSink {
    tx: mpsc::UnboundedSender<ProgressFrame>,
    open: bool,
}

impl FrameSink {
    pub fn new(tx: mpsc::UnboundedSender<ProgressFrame>) -> Self {
        Self { tx, open: true }
    }

    /// Create a connected sink/receiver pair.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn send(&mut self, frame: ProgressFrame) {
        if !self.open {
            return;
        }
        if self.tx.send(frame).is_err() {
            self.open = false;
            tracing::debug!("relay closed; abandoning further sends");
        }
    }
}

/// Turn a frame queue into the outbound wire stream.
///
/// Frames are serialized in arrival order; the terminal frame is followed
/// by the sentinel and closes the stream.
pub fn frame_stream(
    rx: mpsc::UnboundedReceiver<ProgressFrame>,
) -> impl Stream<Item = Result<Bytes, GenError>> + Send {
    async_stream::stream! {
        let mut rx = rx;
        while let Some(frame) = rx.recv().await {
            let terminal = frame.is_terminal;
            yield Ok(Bytes::from(encode_frame(&frame)));
            if terminal {
                yield Ok(Bytes::from(DONE_SENTINEL));
                break;
            }
        }
    }
}

/// Forward an upstream byte stream unmodified while buffering an
/// identical copy; once the stream closes, hand the buffer to
/// `finalize` for post-hoc extraction.
pub fn tee_stream<S, E, F, Fut>(
    upstream: S,
    finalize: F,
) -> impl Stream<Item = Result<Bytes, GenError>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
    F: FnOnce(Vec<u8>) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    async_stream::stream! {
        let mut buffered: Vec<u8> = Vec::new();
        let mut upstream = std::pin::pin!(upstream);
        while let Some(chunk) = upstream.next().await {
            match chunk {
                Ok(bytes) => {
                    buffered.extend_from_slice(&bytes);
                    yield Ok(bytes);
                }
                Err(error) => {
                    tracing::warn!(%error, "upstream stream failed mid-relay");
                    yield Err(GenError::HttpError(error.to_string()));
                    break;
                }
            }
        }
        finalize(buffered).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn frame_encoding_is_wire_exact() {
        let frame = ProgressFrame::progress("queued", 0);
        assert_eq!(
            encode_frame(&frame),
            "data: {\"choices\":[{\"delta\":{\"content\":\"Status: queued (Progress: 0%)\"}}]}\n\n"
        );
    }

    #[tokio::test]
    async fn terminal_frame_closes_the_stream_with_the_sentinel() {
        let (mut sink, rx) = FrameSink::channel();
        sink.send(ProgressFrame::progress("in_progress", 10));
        sink.send(ProgressFrame::completed("http://vid.mp4"));
        sink.send(ProgressFrame::progress("late", 99));

        let events: Vec<String> = frame_stream(rx)
            .map(|item| String::from_utf8(item.unwrap().to_vec()).unwrap())
            .collect()
            .await;

        assert_eq!(events.len(), 3);
        assert!(events[0].contains("Status: in_progress (Progress: 10%)"));
        assert!(events[1].contains("http://vid.mp4"));
        assert_eq!(events[2], DONE_SENTINEL);
    }

    #[tokio::test]
    async fn sink_swallows_sends_after_the_receiver_is_gone() {
        let (mut sink, rx) = FrameSink::channel();
        drop(rx);
        sink.send(ProgressFrame::progress("in_progress", 10));
        sink.send(ProgressFrame::completed("http://vid.mp4"));
    }

    #[tokio::test]
    async fn tee_forwards_identical_bytes_and_finalizes_once() {
        let chunks: Vec<Result<Bytes, std::convert::Infallible>> =
            vec![Ok(Bytes::from("data: a\n\n")), Ok(Bytes::from("data: b\n\n"))];
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_finalize = calls.clone();

        let relayed: Vec<Bytes> = tee_stream(stream::iter(chunks), move |buffered| async move {
            assert_eq!(buffered, b"data: a\n\ndata: b\n\n");
            calls_in_finalize.fetch_add(1, Ordering::SeqCst);
        })
        .map(|item| item.unwrap())
        .collect()
        .await;

        assert_eq!(relayed.concat(), b"data: a\n\ndata: b\n\n".to_vec());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
