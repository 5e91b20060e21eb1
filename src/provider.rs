//! The network capability the stream driver consumes.
//!
//! A provider accepts an ordered list of role/content pairs and hands back a
//! stream of chunks. Chunks may carry an empty or missing text delta; the
//! driver decides what to do with those.

use async_trait::async_trait;
use serde::Serialize;

use crate::conversation::{ChatMessage, ChatRole};
use crate::error::StreamError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WireRole {
    User,
    Assistant,
}

impl WireRole {
    /// Roles the completion API accepts from the transcript. Anything the
    /// transcript grows later that has no wire form maps to `None`.
    pub fn from_chat_role(role: ChatRole) -> Option<Self> {
        match role {
            ChatRole::User => Some(WireRole::User),
            ChatRole::Assistant => Some(WireRole::Assistant),
        }
    }
}

/// Provider-neutral message sent on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WireMessage {
    pub role: WireRole,
    pub content: String,
}

impl WireMessage {
    pub fn from_history(history: &[ChatMessage]) -> Vec<WireMessage> {
        history
            .iter()
            .filter_map(|msg| {
                WireRole::from_chat_role(msg.role).map(|role| WireMessage {
                    role,
                    content: msg.content.clone(),
                })
            })
            .collect()
    }
}

/// One decoded unit from the network stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chunk {
    pub delta: Option<String>,
}

impl Chunk {
    pub fn text(delta: impl Into<String>) -> Self {
        Self {
            delta: Some(delta.into()),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

#[async_trait]
pub trait CompletionStream: Send {
    /// Next chunk, `Ok(None)` once the stream is exhausted.
    async fn next_chunk(&mut self) -> Result<Option<Chunk>, StreamError>;
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn open_stream(
        &self,
        model: &str,
        messages: Vec<WireMessage>,
    ) -> Result<Box<dyn CompletionStream>, StreamError>;
}

#[cfg(test)]
pub(crate) mod scripted {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use super::*;

    /// What a scripted stream produces on each call to `next_chunk`.
    pub enum Step {
        Chunk(Chunk),
        Fail(StreamError),
    }

    /// Client that replays one script per opened stream and records requests.
    #[derive(Clone, Default)]
    pub struct ScriptedClient {
        scripts: Arc<Mutex<VecDeque<Vec<Step>>>>,
        pub requests: Arc<Mutex<Vec<(String, Vec<WireMessage>)>>>,
    }

    impl ScriptedClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_script(self, steps: Vec<Step>) -> Self {
            self.scripts.lock().unwrap().push_back(steps);
            self
        }
    }

    struct ScriptedStream {
        steps: VecDeque<Step>,
    }

    #[async_trait]
    impl CompletionStream for ScriptedStream {
        async fn next_chunk(&mut self) -> Result<Option<Chunk>, StreamError> {
            match self.steps.pop_front() {
                Some(Step::Chunk(chunk)) => Ok(Some(chunk)),
                Some(Step::Fail(err)) => Err(err),
                None => Ok(None),
            }
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        async fn open_stream(
            &self,
            model: &str,
            messages: Vec<WireMessage>,
        ) -> Result<Box<dyn CompletionStream>, StreamError> {
            self.requests
                .lock()
                .unwrap()
                .push((model.to_string(), messages));
            let steps = self.scripts.lock().unwrap().pop_front().unwrap_or_default();
            Ok(Box::new(ScriptedStream {
                steps: steps.into(),
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_maps_roles_in_order() {
        let history = vec![
            ChatMessage::user("Hello"),
            ChatMessage::assistant("Hi there"),
            ChatMessage::user("How are you?"),
        ];
        let wire = WireMessage::from_history(&history);

        let roles: Vec<WireRole> = wire.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![WireRole::User, WireRole::Assistant, WireRole::User]
        );
        assert_eq!(wire[2].content, "How are you?");
    }

    #[test]
    fn wire_role_serializes_lowercase() {
        let msg = WireMessage {
            role: WireRole::Assistant,
            content: "ok".to_string(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json, serde_json::json!({"role": "assistant", "content": "ok"}));
    }
}
