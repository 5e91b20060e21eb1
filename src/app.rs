use ratatui::text::Line;

use crate::config::Config;
use crate::conversation::Conversation;
use crate::driver::StreamDriver;
use crate::input::TextInput;
use crate::layout::{self, Geometry};

pub struct App {
    pub should_quit: bool,

    pub conversation: Conversation,
    pub input: TextInput,
    pub geometry: Geometry,
    pub max_message_width: u16,

    // Manual scroll position, only used while auto-follow is off
    scroll: usize,
    follow: bool,

    driver: StreamDriver,
}

impl App {
    pub fn new(driver: StreamDriver, config: &Config, geometry: Geometry) -> Self {
        Self {
            should_quit: false,
            conversation: Conversation::new(),
            input: TextInput::new(config.input_char_limit),
            geometry,
            max_message_width: config.max_message_width,
            scroll: 0,
            follow: true,
            driver,
        }
    }

    pub fn driver(&self) -> &StreamDriver {
        &self.driver
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.geometry = Geometry::new(width, height);
    }

    pub fn transcript(&self) -> Vec<Line<'static>> {
        layout::transcript(&self.conversation, &self.geometry, self.max_message_width)
    }

    fn max_scroll(&self) -> usize {
        let viewport = self.geometry.viewport_height() as usize;
        self.transcript().len().saturating_sub(viewport)
    }

    /// First visible transcript line for a transcript of `total_lines`.
    pub fn scroll_offset(&self, total_lines: usize) -> usize {
        let max = total_lines.saturating_sub(self.geometry.viewport_height() as usize);
        if self.follow {
            max
        } else {
            self.scroll.min(max)
        }
    }

    pub fn is_following(&self) -> bool {
        self.follow
    }

    /// Jump back to the newest content; called after every state change.
    pub fn follow_bottom(&mut self) {
        self.follow = true;
    }

    pub fn scroll_up(&mut self, lines: usize) {
        let max = self.max_scroll();
        let current = if self.follow { max } else { self.scroll.min(max) };
        self.scroll = current.saturating_sub(lines);
        self.follow = false;
    }

    pub fn scroll_down(&mut self, lines: usize) {
        let max = self.max_scroll();
        let current = if self.follow { max } else { self.scroll.min(max) };
        self.scroll = (current + lines).min(max);
        self.follow = false;
    }

    pub fn scroll_to_top(&mut self) {
        self.scroll = 0;
        self.follow = false;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll = self.max_scroll();
        self.follow = false;
    }

    pub fn page_height(&self) -> usize {
        (self.geometry.viewport_height() as usize).max(1)
    }

    pub fn status_text(&self) -> &'static str {
        if self.conversation.is_streaming() {
            "Streaming response... Please wait"
        } else {
            "Press Enter to send, Ctrl+C to quit • Use ↑/↓ or Page Up/Down to scroll with mouse wheel"
        }
    }
}
