use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};

use llm_chat_tui::{
    config::{self, Config},
    layout::Geometry,
    logging,
    tui::{self, EventHandler},
    App, OpenAIClient, StreamDriver,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    // Fail before touching the terminal so the message stays readable
    let api_key = config::api_key_from(|name| std::env::var(name).ok())?;

    logging::init(config.log_file.as_deref(), config.log_level.as_deref())?;

    let client = OpenAIClient::with_base_url(&api_key, &config.base_url);
    let driver = StreamDriver::new(Arc::new(client), config.model.clone())
        .with_idle_timeout(config.stream_timeout());
    info!(model = driver.model(), base_url = %config.base_url, "starting");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let size = terminal.size()?;
    let mut app = App::new(driver, &config, Geometry::new(size.width, size.height));
    let mut events = EventHandler::new();

    let result = tui::run(&mut terminal, &mut app, &mut events).await;
    tui::restore()?;

    if let Err(e) = &result {
        error!(error = %e, "event loop exited with an error");
    }
    result
}
