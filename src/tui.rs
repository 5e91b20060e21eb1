use std::io::{self, Stderr};
use anyhow::{bail, Result};
use crossterm::{
    event::{self, Event, KeyEvent, KeyEventKind, MouseEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::Backend, backend::CrosstermBackend, Terminal};
use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::app::App;
use crate::driver::{Pulled, StreamHandle};
use crate::error::StreamError;
use crate::handler::{self, Command};
use crate::ui;

pub type Tui = Terminal<CrosstermBackend<Stderr>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
}

/// Everything the event loop reacts to, from the terminal and from the
/// stream driver alike.
#[derive(Debug)]
pub enum AppEvent {
    Resize(u16, u16),
    MouseScroll(ScrollDirection),
    Key(KeyEvent),
    Submit(String),
    Fragment(String, StreamHandle),
    Complete,
    Failed(StreamError),
    Quit,
    /// The terminal input stream is gone; the loop cannot continue.
    InputLost(String),
}

impl From<Pulled> for AppEvent {
    fn from(pulled: Pulled) -> Self {
        match pulled {
            Pulled::Fragment(text, handle) => AppEvent::Fragment(text, handle),
            Pulled::Complete => AppEvent::Complete,
            Pulled::Failed(err) => AppEvent::Failed(err),
        }
    }
}

pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<AppEvent>,
    tx: mpsc::UnboundedSender<AppEvent>,
}

impl EventHandler {
    /// Channel fed by the terminal reader task.
    pub fn new() -> Self {
        let handler = Self::unattached();
        tokio::spawn(forward_terminal_events(
            event::EventStream::new(),
            handler.sender(),
        ));
        handler
    }

    /// Channel with no terminal attached; events only arrive through
    /// [`EventHandler::sender`].
    pub fn unattached() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { rx, tx }
    }

    pub fn sender(&self) -> mpsc::UnboundedSender<AppEvent> {
        self.tx.clone()
    }

    pub async fn next(&mut self) -> Option<AppEvent> {
        self.rx.recv().await
    }
}

/// Translate terminal events into loop events until the terminal stream
/// fails or ends, then report the loss so the loop can shut down.
pub async fn forward_terminal_events<S>(mut reader: S, tx: mpsc::UnboundedSender<AppEvent>)
where
    S: Stream<Item = io::Result<Event>> + Unpin,
{
    let reason = loop {
        let evt = match reader.next().await {
            Some(Ok(evt)) => evt,
            Some(Err(e)) => {
                warn!(error = %e, "terminal event stream failed");
                break e.to_string();
            }
            None => break "terminal event stream ended".to_string(),
        };
        let app_event = match evt {
            // Only handle key press events, not release
            Event::Key(key) if key.kind == KeyEventKind::Press => Some(AppEvent::Key(key)),
            Event::Mouse(mouse) => match mouse.kind {
                MouseEventKind::ScrollUp => Some(AppEvent::MouseScroll(ScrollDirection::Up)),
                MouseEventKind::ScrollDown => Some(AppEvent::MouseScroll(ScrollDirection::Down)),
                _ => None,
            },
            Event::Resize(w, h) => Some(AppEvent::Resize(w, h)),
            _ => None,
        };

        if let Some(event) = app_event {
            if tx.send(event).is_err() {
                return;
            }
        }
    };
    let _ = tx.send(AppEvent::InputLost(reason));
}

/// Run one pull as its own task and post the result back to the loop.
pub fn spawn_pull(handle: StreamHandle, tx: mpsc::UnboundedSender<AppEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let event = AppEvent::from(handle.pull().await);
        if tx.send(event).is_err() {
            debug!("event loop gone, dropping stream result");
        }
    })
}

/// Process events one at a time until quit, redrawing after each.
pub async fn run<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    events: &mut EventHandler,
) -> Result<()> {
    let mut in_flight: Option<JoinHandle<()>> = None;
    let result = drive(terminal, app, events, &mut in_flight).await;

    if let Some(task) = in_flight {
        task.abort();
    }
    result
}

async fn drive<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    events: &mut EventHandler,
    in_flight: &mut Option<JoinHandle<()>>,
) -> Result<()> {
    terminal.draw(|frame| ui::render(app, frame))?;

    while let Some(event) = events.next().await {
        if let AppEvent::InputLost(reason) = event {
            bail!("lost terminal input: {}", reason);
        }
        match handler::handle_event(app, event) {
            Some(Command::Pull(handle)) => {
                *in_flight = Some(spawn_pull(handle, events.sender()));
            }
            Some(Command::Quit) => break,
            None => {}
        }
        if app.should_quit {
            break;
        }
        terminal.draw(|frame| ui::render(app, frame))?;
    }
    Ok(())
}

pub fn init() -> Result<Tui> {
    enable_raw_mode()?;
    execute!(io::stderr(), EnterAlternateScreen)?;

    // Enable mouse capture
    execute!(io::stderr(), crossterm::event::EnableMouseCapture)?;

    let backend = CrosstermBackend::new(io::stderr());
    let terminal = Terminal::new(backend)?;

    Ok(terminal)
}

pub fn restore() -> Result<()> {
    execute!(io::stderr(), crossterm::event::DisableMouseCapture)?;
    execute!(io::stderr(), LeaveAlternateScreen)?;
    disable_raw_mode()?;
    Ok(())
}

/// Install panic hook to restore terminal on panic
pub fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = restore();
        original_hook(panic_info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use futures_util::stream;
    use ratatui::backend::TestBackend;

    use crate::config::Config;
    use crate::driver::StreamDriver;
    use crate::layout::Geometry;
    use crate::provider::scripted::{ScriptedClient, Step};
    use crate::provider::Chunk;

    #[tokio::test]
    async fn spawned_pull_posts_one_event() {
        let client = ScriptedClient::new().with_script(vec![Step::Chunk(Chunk::text("Hi"))]);
        let driver = StreamDriver::new(Arc::new(client), "m");
        let mut events = EventHandler::unattached();

        let handle = driver.submit(&[crate::conversation::ChatMessage::user("Hello")]);
        spawn_pull(handle, events.sender()).await.unwrap();

        match events.next().await {
            Some(AppEvent::Fragment(text, _)) => assert_eq!(text, "Hi"),
            other => panic!("expected fragment, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn reader_reports_a_failed_terminal_stream() {
        let mut events = EventHandler::unattached();
        let reader = stream::iter(vec![
            Ok(Event::Resize(100, 30)),
            Err(io::Error::new(io::ErrorKind::Other, "tty closed")),
            Ok(Event::Resize(1, 1)),
        ]);

        forward_terminal_events(reader, events.sender()).await;

        assert!(matches!(events.next().await, Some(AppEvent::Resize(100, 30))));
        match events.next().await {
            Some(AppEvent::InputLost(reason)) => assert_eq!(reason, "tty closed"),
            other => panic!("expected lost input, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn run_returns_when_the_terminal_reader_ends() {
        let driver = StreamDriver::new(Arc::new(ScriptedClient::new()), "m");
        let mut app = App::new(driver, &Config::default(), Geometry::new(40, 12));
        let mut terminal = Terminal::new(TestBackend::new(40, 12)).unwrap();
        let mut events = EventHandler::unattached();

        tokio::spawn(forward_terminal_events(stream::empty(), events.sender()));
        let result = run(&mut terminal, &mut app, &mut events).await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("terminal event stream ended"));
    }

    #[test]
    fn pulled_maps_onto_loop_events() {
        assert!(matches!(AppEvent::from(Pulled::Complete), AppEvent::Complete));
        assert!(matches!(
            AppEvent::from(Pulled::Failed(StreamError::Timeout)),
            AppEvent::Failed(StreamError::Timeout)
        ));
    }
}
