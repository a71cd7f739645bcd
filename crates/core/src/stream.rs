//! Streaming output channel between the execution loop and external readers.
//!
//! Single producer (the loop), single consumer per read session. A reader
//! may detach after an HTTP response completes and a new one may attach for
//! the next request; consumption resumes from the current buffer position.
//! `push` never blocks the producer; `finish` is idempotent and ends the
//! stream once the buffer drains.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Inner {
    buffer: Mutex<VecDeque<String>>,
    finished: AtomicBool,
    notify: Notify,
}

/// A buffered, order-preserving channel of text chunks.
///
/// Cloning is cheap and shares the same buffer, so the loop can hold one
/// handle while the gateway hands another to each attaching reader.
#[derive(Debug, Clone, Default)]
pub struct StreamingChannel {
    inner: Arc<Inner>,
}

impl StreamingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk. Non-blocking; wakes a parked reader if any.
    pub fn push(&self, chunk: impl Into<String>) {
        let chunk = chunk.into();
        if chunk.is_empty() {
            return;
        }
        self.inner
            .buffer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(chunk);
        self.inner.notify.notify_waiters();
    }

    /// Mark the stream finished. Readers drain the remaining buffer and then
    /// observe end-of-stream. Calling this twice is a no-op.
    pub fn finish(&self) {
        self.inner.finished.store(true, Ordering::Release);
        self.inner.notify.notify_waiters();
    }

    pub fn is_finished(&self) -> bool {
        self.inner.finished.load(Ordering::Acquire)
    }

    /// Take the next chunk, suspending until one is available.
    /// Returns `None` once finished and drained.
    pub async fn next_chunk(&self) -> Option<String> {
        loop {
            let notified = self.inner.notify.notified();
            {
                let mut buffer = self.inner.buffer.lock().unwrap_or_else(|e| e.into_inner());
                if let Some(chunk) = buffer.pop_front() {
                    return Some(chunk);
                }
                if self.is_finished() {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// A lazy sequence of chunks starting at the current buffer position,
    /// ending when the channel is finished and drained.
    pub fn stream(&self) -> impl futures::Stream<Item = String> + Send + 'static {
        let channel = self.clone();
        futures::stream::unfold(channel, |channel| async move {
            channel.next_chunk().await.map(|chunk| (chunk, channel))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::time::Duration;

    #[tokio::test]
    async fn chunks_arrive_in_push_order() {
        let channel = StreamingChannel::new();
        channel.push("one");
        channel.push("two");
        channel.push("three");
        channel.finish();

        let chunks: Vec<_> = channel.stream().collect().await;
        assert_eq!(chunks, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn reader_blocks_until_push() {
        let channel = StreamingChannel::new();
        let reader = {
            let channel = channel.clone();
            tokio::spawn(async move { channel.next_chunk().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        channel.push("late chunk");

        let chunk = tokio::time::timeout(Duration::from_millis(200), reader)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(chunk.as_deref(), Some("late chunk"));
    }

    #[tokio::test]
    async fn sequential_readers_resume_from_current_position() {
        let channel = StreamingChannel::new();
        channel.push("a");
        channel.push("b");

        // First read session consumes one chunk and detaches.
        assert_eq!(channel.next_chunk().await.as_deref(), Some("a"));

        channel.push("c");
        channel.finish();

        // A new reader attaches and continues where the first left off.
        let rest: Vec<_> = channel.stream().collect().await;
        assert_eq!(rest, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn finish_is_idempotent() {
        let channel = StreamingChannel::new();
        channel.push("only");
        channel.finish();
        channel.finish();

        assert_eq!(channel.next_chunk().await.as_deref(), Some("only"));
        assert_eq!(channel.next_chunk().await, None);
        assert_eq!(channel.next_chunk().await, None);
    }

    #[tokio::test]
    async fn empty_chunks_are_dropped() {
        let channel = StreamingChannel::new();
        channel.push("");
        channel.push("real");
        channel.finish();

        let chunks: Vec<_> = channel.stream().collect().await;
        assert_eq!(chunks, vec!["real"]);
    }
}
