use std::collections::VecDeque;

use async_trait::async_trait;
use futures_util::stream::{BoxStream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StreamError;
use crate::provider::{Chunk, CompletionClient, CompletionStream, WireMessage};
use crate::sse::{SseFrame, SseParser};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    stream: bool,
}

#[derive(Deserialize)]
struct OpenAIChunk {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    #[serde(default)]
    delta: OpenAIDelta,
}

#[derive(Deserialize, Default)]
struct OpenAIDelta {
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIErrorEnvelope {
    error: OpenAIErrorBody,
}

#[derive(Deserialize)]
struct OpenAIErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct OpenAIClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAIClient {
    pub fn with_base_url(api_key: &str, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl CompletionClient for OpenAIClient {
    async fn open_stream(
        &self,
        model: &str,
        messages: Vec<WireMessage>,
    ) -> Result<Box<dyn CompletionStream>, StreamError> {
        let request = OpenAIRequest {
            model,
            messages,
            stream: true,
        };

        let response = self
            .client
            .post(self.completions_url())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Accept", "text/event-stream")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(StreamError::Api {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
            .boxed();
        Ok(Box::new(OpenAIStream::new(body)))
    }
}

/// Pull the human-readable message out of an API error body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<OpenAIErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

pub struct OpenAIStream {
    body: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    parser: SseParser,
    ready: VecDeque<Chunk>,
    done: bool,
}

impl OpenAIStream {
    fn new(body: BoxStream<'static, reqwest::Result<Vec<u8>>>) -> Self {
        Self {
            body,
            parser: SseParser::new(),
            ready: VecDeque::new(),
            done: false,
        }
    }

    fn accept(&mut self, frame: SseFrame) -> Result<(), StreamError> {
        match frame {
            SseFrame::Done => self.done = true,
            SseFrame::Data(payload) => {
                if !self.done {
                    self.ready.push_back(decode_chunk(&payload)?);
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CompletionStream for OpenAIStream {
    async fn next_chunk(&mut self) -> Result<Option<Chunk>, StreamError> {
        loop {
            if let Some(chunk) = self.ready.pop_front() {
                return Ok(Some(chunk));
            }
            if self.done {
                return Ok(None);
            }
            match self.body.next().await {
                Some(bytes) => {
                    for frame in self.parser.feed(&bytes?) {
                        self.accept(frame)?;
                    }
                }
                None => {
                    debug!("response body ended");
                    if let Some(frame) = self.parser.finish() {
                        self.accept(frame)?;
                    }
                    self.done = true;
                }
            }
        }
    }
}

/// Decode one `data:` payload into a chunk, surfacing in-band API errors.
fn decode_chunk(payload: &str) -> Result<Chunk, StreamError> {
    if let Ok(envelope) = serde_json::from_str::<OpenAIErrorEnvelope>(payload) {
        return Err(StreamError::protocol(envelope.error.message));
    }
    let chunk: OpenAIChunk = serde_json::from_str(payload)
        .map_err(|e| StreamError::protocol(format!("{}: {}", e, payload)))?;
    let delta = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content);
    Ok(Chunk { delta })
}
