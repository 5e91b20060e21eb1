use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{
        Block, BorderType, Borders, Padding, Paragraph, Scrollbar, ScrollbarOrientation,
        ScrollbarState,
    },
};
use crate::app::App;

const TITLE: &str = "LLM Chat TUI";
const PROMPT: &str = "> ";

pub fn render(app: &App, frame: &mut Frame) {
    let area = frame.area();

    if app.conversation.history().is_empty() && !app.conversation.is_streaming() {
        render_welcome(app, frame, area);
        return;
    }

    // Main layout: title, transcript, input box, status line
    let [title_area, _, transcript_area, _, input_area, status_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_title(frame, title_area);
    render_transcript(app, frame, transcript_area);
    render_input(app, frame, input_area);
    render_status(app, frame, status_area);
}

/// With nothing to show yet the input box sits in the middle of the screen.
fn render_welcome(app: &App, frame: &mut Frame, area: Rect) {
    let top_padding = area.height.saturating_sub(6) / 2;
    let [title_area, _, _, input_area, _, status_area, _] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(top_padding),
        Constraint::Length(3),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Min(0),
    ])
    .areas(area);

    render_title(frame, title_area);
    render_input(app, frame, input_area);
    render_status(app, frame, status_area);
}

fn render_title(frame: &mut Frame, area: Rect) {
    let title = Paragraph::new(Line::from(Span::styled(
        TITLE,
        Style::default().fg(Color::Cyan).bold(),
    )))
    .alignment(Alignment::Center);
    frame.render_widget(title, area);
}

fn render_transcript(app: &App, frame: &mut Frame, area: Rect) {
    let lines = app.transcript();
    let total = lines.len();
    let offset = app.scroll_offset(total);

    let visible = area.height as usize;

    // Slice instead of Paragraph::scroll, whose offset is a u16
    let window: Vec<Line> = lines.into_iter().skip(offset).take(visible).collect();
    frame.render_widget(Paragraph::new(window), area);

    if total > visible {
        let mut state = ScrollbarState::new(total - visible).position(offset);
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(None)
            .end_symbol(None)
            .style(Style::default().fg(Color::DarkGray));
        frame.render_stateful_widget(scrollbar, area, &mut state);
    }
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let box_width = app.geometry.input_width.min(area.width);
    let box_area = Rect {
        x: area.x + (area.width - box_width) / 2,
        width: box_width,
        ..area
    };

    let border_color = if app.input.is_focused() {
        Color::Yellow
    } else {
        Color::DarkGray
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border_color))
        .padding(Padding::horizontal(1));
    let inner = block.inner(box_area);

    let text_width = (inner.width as usize).saturating_sub(PROMPT.len());
    let (visible_text, cursor_col) = app.input.visible(text_width);

    let body = if app.input.value().is_empty() {
        Span::styled(
            app.input.placeholder.clone(),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )
    } else {
        Span::styled(visible_text, Style::default().fg(Color::Cyan))
    };
    let line = Line::from(vec![Span::styled(PROMPT, Style::default().fg(Color::Yellow)), body]);

    frame.render_widget(Paragraph::new(line).block(block), box_area);

    if app.input.is_focused() && inner.width > 0 && inner.height > 0 {
        let cursor_x = inner.x + (PROMPT.len() + cursor_col) as u16;
        frame.set_cursor_position((cursor_x.min(inner.right().saturating_sub(1)), inner.y));
    }
}

fn render_status(app: &App, frame: &mut Frame, area: Rect) {
    let style = if app.conversation.is_streaming() {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let status = Paragraph::new(Span::styled(app.status_text(), style)).alignment(Alignment::Center);
    frame.render_widget(status, area);
}
