use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{debug, info};

use crate::app::App;
use crate::driver::StreamHandle;
use crate::tui::{AppEvent, ScrollDirection};

/// Lines moved per mouse wheel notch
const MOUSE_WHEEL_DELTA: usize = 3;

/// Follow-up work the event loop has to schedule
#[derive(Debug)]
pub enum Command {
    Pull(StreamHandle),
    Quit,
}

pub fn handle_event(app: &mut App, event: AppEvent) -> Option<Command> {
    match event {
        AppEvent::Resize(width, height) => {
            app.resize(width, height);
            None
        }
        AppEvent::MouseScroll(direction) => {
            match direction {
                ScrollDirection::Up => app.scroll_up(MOUSE_WHEEL_DELTA),
                ScrollDirection::Down => app.scroll_down(MOUSE_WHEEL_DELTA),
            }
            None
        }
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Submit(text) => submit(app, &text),
        AppEvent::Fragment(text, handle) => {
            if !app.conversation.is_streaming() {
                debug!("dropping fragment for a finished exchange");
                return None;
            }
            app.conversation.push_fragment(&text);
            app.follow_bottom();
            Some(Command::Pull(handle))
        }
        AppEvent::Complete => {
            if app.conversation.is_streaming() {
                app.conversation.complete();
                finish_exchange(app);
            }
            None
        }
        AppEvent::Failed(err) => {
            if app.conversation.is_streaming() {
                app.conversation.fail(&err.to_string());
                finish_exchange(app);
            }
            None
        }
        AppEvent::Quit | AppEvent::InputLost(_) => {
            app.should_quit = true;
            Some(Command::Quit)
        }
    }
}

fn submit(app: &mut App, text: &str) -> Option<Command> {
    if !app.conversation.begin_exchange(text) {
        return None;
    }
    app.input.clear();
    app.input.blur();
    app.follow_bottom();

    let handle = app.driver().submit(app.conversation.history());
    Some(Command::Pull(handle))
}

fn finish_exchange(app: &mut App) {
    info!(messages = app.conversation.history().len(), "exchange finished");
    app.follow_bottom();
    app.input.focus();
}

fn handle_key(app: &mut App, key: KeyEvent) -> Option<Command> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    // Global keys that work in any state
    if ctrl && key.code == KeyCode::Char('c') {
        return handle_event(app, AppEvent::Quit);
    }

    match key.code {
        KeyCode::Enter => {
            let text = app.input.value().to_string();
            return submit(app, &text);
        }

        // Transcript scrolling
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::PageUp => app.scroll_up(app.page_height()),
        KeyCode::PageDown => app.scroll_down(app.page_height()),
        KeyCode::Home => app.scroll_to_top(),
        KeyCode::End => app.scroll_to_bottom(),
        KeyCode::Char('u') if ctrl => app.scroll_up(app.page_height() / 2),
        KeyCode::Char('d') if ctrl => app.scroll_down(app.page_height() / 2),

        // The input box is read-only while a reply streams in
        _ if app.conversation.is_streaming() => {}

        KeyCode::Char('a') if ctrl => app.input.move_home(),
        KeyCode::Char('e') if ctrl => app.input.move_end(),
        KeyCode::Char(c) if !ctrl && !key.modifiers.contains(KeyModifiers::ALT) => {
            app.input.insert(c)
        }
        KeyCode::Backspace => app.input.backspace(),
        KeyCode::Delete => app.input.delete(),
        KeyCode::Left => app.input.move_left(),
        KeyCode::Right => app.input.move_right(),
        _ => {}
    }
    None
}
