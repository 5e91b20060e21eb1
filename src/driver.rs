//! Lifecycle of one outstanding completion request.
//!
//! `StreamDriver::submit` builds a handle; every `StreamHandle::pull` consumes
//! the handle and resolves to exactly one [`Pulled`] value. Only a fragment
//! hands the handle back, so a stream that has completed or failed cannot be
//! pulled again.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::conversation::ChatMessage;
use crate::error::StreamError;
use crate::provider::{CompletionClient, CompletionStream, WireMessage};

pub struct StreamDriver {
    client: Arc<dyn CompletionClient>,
    model: String,
    idle_timeout: Duration,
}

impl StreamDriver {
    pub fn new(client: Arc<dyn CompletionClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            idle_timeout: Duration::from_secs(60),
        }
    }

    /// Longest wait for a single chunk before the stream counts as failed.
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Prepare a request for the whole transcript. The connection is opened
    /// by the first pull so that connect errors arrive as `Failed`.
    pub fn submit(&self, history: &[ChatMessage]) -> StreamHandle {
        let messages = WireMessage::from_history(history);
        info!(model = %self.model, messages = messages.len(), "submitting completion request");
        StreamHandle {
            request: Some(Request {
                client: Arc::clone(&self.client),
                model: self.model.clone(),
                messages,
            }),
            stream: None,
            idle_timeout: self.idle_timeout,
            fragments: 0,
        }
    }
}

struct Request {
    client: Arc<dyn CompletionClient>,
    model: String,
    messages: Vec<WireMessage>,
}

pub struct StreamHandle {
    request: Option<Request>,
    stream: Option<Box<dyn CompletionStream>>,
    idle_timeout: Duration,
    fragments: usize,
}

impl fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamHandle")
            .field("open", &self.stream.is_some())
            .field("fragments", &self.fragments)
            .finish()
    }
}

/// Result of a single pull
#[derive(Debug)]
pub enum Pulled {
    Fragment(String, StreamHandle),
    Complete,
    Failed(StreamError),
}

impl StreamHandle {
    /// Wait for the next non-empty fragment or a terminal result.
    pub async fn pull(mut self) -> Pulled {
        match self.next_fragment().await {
            Ok(Some(text)) => {
                self.fragments += 1;
                Pulled::Fragment(text, self)
            }
            Ok(None) => {
                info!(fragments = self.fragments, "completion stream finished");
                Pulled::Complete
            }
            Err(err) => {
                warn!(fragments = self.fragments, error = %err, "completion stream failed");
                Pulled::Failed(err)
            }
        }
    }

    async fn next_fragment(&mut self) -> Result<Option<String>, StreamError> {
        let idle_timeout = self.idle_timeout;
        let stream = self.stream().await?;
        loop {
            let chunk = tokio::time::timeout(idle_timeout, stream.next_chunk())
                .await
                .map_err(|_| StreamError::Timeout)??;
            match chunk {
                Some(chunk) => match chunk.delta {
                    Some(text) if !text.is_empty() => return Ok(Some(text)),
                    _ => debug!("skipping empty delta"),
                },
                None => return Ok(None),
            }
        }
    }

    async fn stream(&mut self) -> Result<&mut Box<dyn CompletionStream>, StreamError> {
        let stream = match self.stream.take() {
            Some(stream) => stream,
            None => {
                let request = self
                    .request
                    .take()
                    .ok_or_else(|| StreamError::protocol("stream already consumed"))?;
                let stream = tokio::time::timeout(
                    self.idle_timeout,
                    request.client.open_stream(&request.model, request.messages),
                )
                .await
                .map_err(|_| StreamError::Timeout)??;
                debug!("completion stream opened");
                stream
            }
        };
        Ok(self.stream.insert(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::scripted::{ScriptedClient, Step};
    use crate::provider::{Chunk, WireRole};

    async fn drain(mut handle: StreamHandle) -> (Vec<String>, Pulled) {
        let mut fragments = Vec::new();
        loop {
            match handle.pull().await {
                Pulled::Fragment(text, next) => {
                    fragments.push(text);
                    handle = next;
                }
                terminal => return (fragments, terminal),
            }
        }
    }

    #[tokio::test]
    async fn fragments_arrive_in_order_then_complete() {
        let client = ScriptedClient::new().with_script(vec![
            Step::Chunk(Chunk::text("Hi")),
            Step::Chunk(Chunk::text(" there")),
        ]);
        let driver = StreamDriver::new(Arc::new(client), "test-model");

        let (fragments, terminal) = drain(driver.submit(&[ChatMessage::user("Hello")])).await;

        assert_eq!(fragments, vec!["Hi", " there"]);
        assert!(matches!(terminal, Pulled::Complete));
    }

    #[tokio::test]
    async fn empty_deltas_are_never_surfaced() {
        let client = ScriptedClient::new().with_script(vec![
            Step::Chunk(Chunk::empty()),
            Step::Chunk(Chunk::text("")),
            Step::Chunk(Chunk::text("a")),
            Step::Chunk(Chunk::empty()),
            Step::Chunk(Chunk::text("b")),
            Step::Chunk(Chunk::text("")),
        ]);
        let driver = StreamDriver::new(Arc::new(client), "m");

        let (fragments, terminal) = drain(driver.submit(&[ChatMessage::user("x")])).await;

        assert_eq!(fragments, vec!["a", "b"]);
        assert!(matches!(terminal, Pulled::Complete));
    }

    #[tokio::test]
    async fn transport_error_is_a_single_failure() {
        let client = ScriptedClient::new().with_script(vec![
            Step::Chunk(Chunk::text("Working")),
            Step::Fail(StreamError::Timeout),
            Step::Chunk(Chunk::text("never seen")),
        ]);
        let driver = StreamDriver::new(Arc::new(client), "m");

        let (fragments, terminal) = drain(driver.submit(&[ChatMessage::user("Test")])).await;

        assert_eq!(fragments, vec!["Working"]);
        match terminal {
            Pulled::Failed(err) => assert_eq!(err.to_string(), "timeout"),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn submit_forwards_history_and_model() {
        let client = ScriptedClient::new().with_script(vec![]);
        let requests = Arc::clone(&client.requests);
        let driver = StreamDriver::new(Arc::new(client), "gpt-4o-mini");

        let history = vec![
            ChatMessage::user("one"),
            ChatMessage::assistant("two"),
            ChatMessage::user("three"),
        ];
        let (_, terminal) = drain(driver.submit(&history)).await;
        assert!(matches!(terminal, Pulled::Complete));

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let (model, messages) = &requests[0];
        assert_eq!(model, "gpt-4o-mini");
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].role, WireRole::Assistant);
        assert_eq!(messages[1].content, "two");
    }

    #[tokio::test]
    async fn nothing_is_opened_until_the_first_pull() {
        let client = ScriptedClient::new();
        let requests = Arc::clone(&client.requests);
        let driver = StreamDriver::new(Arc::new(client), "m");

        let handle = driver.submit(&[ChatMessage::user("hi")]);
        assert!(requests.lock().unwrap().is_empty());

        let _ = handle.pull().await;
        assert_eq!(requests.lock().unwrap().len(), 1);
    }

    struct StalledStream;

    #[async_trait::async_trait]
    impl CompletionStream for StalledStream {
        async fn next_chunk(&mut self) -> Result<Option<Chunk>, StreamError> {
            std::future::pending().await
        }
    }

    struct StalledClient;

    #[async_trait::async_trait]
    impl CompletionClient for StalledClient {
        async fn open_stream(
            &self,
            _model: &str,
            _messages: Vec<WireMessage>,
        ) -> Result<Box<dyn CompletionStream>, StreamError> {
            Ok(Box::new(StalledStream))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_stream_times_out() {
        let driver = StreamDriver::new(Arc::new(StalledClient), "m")
            .with_idle_timeout(Duration::from_secs(5));

        let pulled = driver.submit(&[ChatMessage::user("hi")]).pull().await;

        assert!(matches!(pulled, Pulled::Failed(StreamError::Timeout)));
    }
}
