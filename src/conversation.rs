//! Conversation state shared by the event loop and the renderer
//!
//! The store is owned by the event loop and only ever mutated from there.
//! The renderer reads it through a shared reference; the stream driver never
//! sees it at all, it only produces events the loop applies here.

/// A finalized chat message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Conversation {
    history: Vec<ChatMessage>,
    pending: String,
    streaming: bool,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn pending(&self) -> &str {
        &self.pending
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// Record a user turn and open a new pending reply.
    ///
    /// Returns `false` without touching anything if a reply is already
    /// streaming or the text is blank.
    pub fn begin_exchange(&mut self, text: &str) -> bool {
        if self.streaming || text.trim().is_empty() {
            return false;
        }
        self.history.push(ChatMessage::user(text));
        self.pending.clear();
        self.streaming = true;
        true
    }

    pub fn push_fragment(&mut self, fragment: &str) {
        if self.streaming {
            self.pending.push_str(fragment);
        }
    }

    /// Finalize the pending reply. An empty reply leaves no message behind.
    pub fn complete(&mut self) {
        if !self.streaming {
            return;
        }
        if !self.pending.is_empty() {
            let content = std::mem::take(&mut self.pending);
            self.history.push(ChatMessage::assistant(content));
        }
        self.streaming = false;
    }

    /// Replace the pending reply with an error message.
    pub fn fail(&mut self, error: &str) {
        if !self.streaming {
            return;
        }
        self.pending.clear();
        self.history
            .push(ChatMessage::assistant(format!("Error: {}", error)));
        self.streaming = false;
    }
}
