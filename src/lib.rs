pub mod app;
pub mod config;
pub mod conversation;
pub mod driver;
pub mod error;
pub mod handler;
pub mod input;
pub mod layout;
pub mod logging;
pub mod openai;
pub mod provider;
pub mod sse;
pub mod tui;
pub mod ui;

// Re-export main types for convenience
pub use app::App;
pub use config::Config;
pub use conversation::{ChatMessage, ChatRole, Conversation};
pub use driver::{Pulled, StreamDriver, StreamHandle};
pub use error::StreamError;
pub use openai::OpenAIClient;
pub use provider::{Chunk, CompletionClient, CompletionStream, WireMessage, WireRole};
