//! CAMPER TUI entry point.

use camper_tui::api_client::RestClient;
use camper_tui::config::TuiConfig;
use camper_tui::error::TuiError;
use camper_tui::events::TuiEvent;
use camper_tui::state::{App, Command};
use camper_tui::telemetry;
use camper_tui::views::render_view;
use crossterm::{
    event::{self, Event as CrosstermEvent},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<(), TuiError> {
    let config = TuiConfig::load()?;
    telemetry::init(&config)?;
    let client = Arc::new(RestClient::new(&config)?);
    tracing::info!(base_url = client.base_url(), "starting camper");

    let mut app = App::new(config, client);

    let mut terminal = setup_terminal()?;
    let _guard = TerminalGuard {};

    let (event_tx, mut event_rx) = mpsc::channel::<TuiEvent>(256);

    spawn_input_reader(event_tx.clone());
    let commands = app.start();
    run_commands(commands, &event_tx);

    let tick_rate = Duration::from_millis(app.config.refresh_interval_ms);
    let mut ticker = tokio::time::interval(tick_rate);

    loop {
        app.sync();
        terminal.draw(|f| render_view(f, &app))?;

        tokio::select! {
            _ = ticker.tick() => {
                let commands = app.handle_event(TuiEvent::Tick);
                run_commands(commands, &event_tx);
            }
            Some(event) = event_rx.recv() => {
                let commands = app.handle_event(event);
                run_commands(commands, &event_tx);
            }
        }

        if app.should_quit {
            break;
        }
    }

    app.hub.shutdown();
    tracing::info!("camper stopped");
    Ok(())
}

/// Hand background work to the runtime; results come back as events.
fn run_commands(commands: Vec<Command>, sender: &mpsc::Sender<TuiEvent>) {
    for command in commands {
        let sender = sender.clone();
        match command {
            Command::Spawn(future) => {
                tokio::spawn(async move {
                    let event = future.await;
                    let _ = sender.send(event).await;
                });
            }
            Command::After(delay, event) => {
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = sender.send(event).await;
                });
            }
        }
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>, TuiError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Ok(Terminal::new(backend)?)
}

struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let mut stdout = io::stdout();
        let _ = execute!(stdout, LeaveAlternateScreen);
    }
}

fn spawn_input_reader(sender: mpsc::Sender<TuiEvent>) {
    std::thread::spawn(move || loop {
        if let Ok(true) = event::poll(Duration::from_millis(200)) {
            if let Ok(evt) = event::read() {
                let sent = match evt {
                    CrosstermEvent::Key(key) => sender.blocking_send(TuiEvent::Input(key)),
                    CrosstermEvent::Resize(width, height) => {
                        sender.blocking_send(TuiEvent::Resize { width, height })
                    }
                    _ => Ok(()),
                };
                if sent.is_err() {
                    break;
                }
            }
        }
    });
}
