//! Transcript layout: conversation state in, styled lines out.
//!
//! Everything here is a pure function of its arguments. The same conversation
//! and geometry always produce the same lines.

use ratatui::{
    style::{Color, Style},
    text::{Line, Span},
};
use unicode_width::UnicodeWidthStr;

use crate::conversation::{ChatRole, Conversation};

/// Columns of padding on each side of the bubble text
const BUBBLE_PADDING: usize = 1;
/// Gap between a bubble and the edge of the content column it leans against
const BUBBLE_MARGIN: usize = 2;

pub const STREAM_CURSOR: &str = "▋";
pub const STREAM_PLACEHOLDER: &str = "...";

/// Rows used by everything except the transcript: title, gap, gap, input
/// box with borders, status line.
pub const CHROME_HEIGHT: u16 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: u16,
    pub height: u16,
    pub input_width: u16,
}

impl Geometry {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            input_width: width.saturating_sub(4).min(80),
        }
    }

    pub fn viewport_height(&self) -> u16 {
        self.height.saturating_sub(CHROME_HEIGHT)
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::new(80, 24)
    }
}

/// Lay out the whole transcript, including the in-progress reply while
/// streaming, for a terminal of `geometry.width` columns.
pub fn transcript(
    conversation: &Conversation,
    geometry: &Geometry,
    max_message_width: u16,
) -> Vec<Line<'static>> {
    let viewport_width = geometry.width as usize;
    let content_width = viewport_width.min(max_message_width as usize);
    let offset = (viewport_width - content_width) / 2;

    let mut lines = Vec::new();

    for msg in conversation.history() {
        lines.extend(bubble(&msg.content, msg.role, content_width, offset));
        lines.push(Line::default());
    }

    if conversation.is_streaming() {
        let pending = conversation.pending();
        let text = if pending.is_empty() {
            STREAM_PLACEHOLDER.to_string()
        } else {
            format!("{}{}", pending, STREAM_CURSOR)
        };
        lines.extend(bubble(&text, ChatRole::Assistant, content_width, offset));
        lines.push(Line::default());
    }

    lines
}

fn bubble_style(role: ChatRole) -> Style {
    match role {
        ChatRole::User => Style::default().bg(Color::Blue).fg(Color::White),
        ChatRole::Assistant => Style::default().bg(Color::DarkGray).fg(Color::White),
    }
}

/// One message as a padded block, right-aligned for the user and
/// left-aligned for the assistant, shifted right by `offset`.
fn bubble(text: &str, role: ChatRole, content_width: usize, offset: usize) -> Vec<Line<'static>> {
    let text = text.replace('\t', "    ");
    let max_text_width = content_width
        .saturating_sub(BUBBLE_MARGIN + 2 * BUBBLE_PADDING)
        .max(1);
    let rows = wrap_text_to_width(&text, max_text_width);
    let text_width = rows.iter().map(|row| row.width()).max().unwrap_or(0);
    let bubble_width = text_width + 2 * BUBBLE_PADDING;

    let indent = match role {
        ChatRole::User => offset + content_width.saturating_sub(bubble_width + BUBBLE_MARGIN),
        ChatRole::Assistant => offset + BUBBLE_MARGIN,
    };
    let pad = " ".repeat(BUBBLE_PADDING);
    let style = bubble_style(role);

    rows.into_iter()
        .map(|row| {
            let fill = " ".repeat(text_width - row.width());
            let body = match role {
                ChatRole::User => format!("{pad}{fill}{row}{pad}"),
                ChatRole::Assistant => format!("{pad}{row}{fill}{pad}"),
            };
            Line::from(vec![
                Span::raw(" ".repeat(indent)),
                Span::styled(body, style),
            ])
        })
        .collect()
}

/// Wrap text to fit within a given width, returning multiple lines.
/// Lines that already fit are kept verbatim; longer ones break at word
/// boundaries, and words wider than the line are split.
fn wrap_text_to_width(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();

    for raw in text.split('\n') {
        let raw = raw.trim_end_matches('\r');
        if raw.width() <= width {
            lines.push(raw.to_string());
            continue;
        }

        let start = lines.len();
        let mut current_line = String::new();
        let mut current_len = 0;

        for word in raw.split_whitespace() {
            let word_len = word.width();

            if word_len > width {
                if current_len > 0 {
                    lines.push(std::mem::take(&mut current_line));
                }
                let mut pieces = split_at_width(word, width);
                let last = pieces.pop().unwrap_or_default();
                lines.extend(pieces);
                current_len = last.width();
                current_line = last;
            } else if current_len == 0 {
                current_line = word.to_string();
                current_len = word_len;
            } else if current_len + 1 + word_len <= width {
                current_line.push(' ');
                current_line.push_str(word);
                current_len += 1 + word_len;
            } else {
                lines.push(std::mem::take(&mut current_line));
                current_line = word.to_string();
                current_len = word_len;
            }
        }

        if current_len > 0 || lines.len() == start {
            lines.push(current_line);
        }
    }

    lines
}

fn split_at_width(word: &str, width: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut piece = String::new();
    let mut piece_width = 0;

    for c in word.chars() {
        let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
        if piece_width + w > width && !piece.is_empty() {
            pieces.push(std::mem::take(&mut piece));
            piece_width = 0;
        }
        piece.push(c);
        piece_width += w;
    }
    if !piece.is_empty() {
        pieces.push(piece);
    }
    pieces
}
