//! streamchat Entry Point
//!
//! Launches the terminal chat client.
//!
//! # Usage
//!
//! ```bash
//! # Local backend on the default port
//! streamchat
//!
//! # Another server
//! streamchat --server https://chat.example.com
//!
//! # Custom config file and a smaller image ceiling
//! streamchat --config ./streamchat.toml --max-image-mb 2
//!
//! # Verbose logging (stderr)
//! RUST_LOG=debug streamchat 2>streamchat.log
//! ```

use std::io;
use std::panic;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use streamchat_core::{default_config_path, load_config_from_path, ChatConfig, ConfigOverrides};
use streamchat_tui::App;

/// streamchat - Terminal client for a streaming chat backend
#[derive(Parser, Debug)]
#[command(name = "streamchat")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Backend base URL (http, https, ws or wss)
    #[arg(short = 's', long, env = "STREAMCHAT_SERVER", value_name = "URL")]
    server: Option<String>,

    /// Configuration file path
    #[arg(short = 'c', long, env = "STREAMCHAT_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Largest image accepted for upload, in MB
    #[arg(long, value_name = "N")]
    max_image_mb: Option<usize>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::new();
        if let Some(ref server) = self.server {
            overrides = overrides.with_base_url(server.clone());
        }
        if let Some(mb) = self.max_image_mb {
            overrides = overrides.with_max_image_bytes(mb.saturating_mul(1024 * 1024));
        }
        overrides
    }
}

/// File, environment, then command line
fn resolve_config(args: &Args) -> Result<ChatConfig> {
    let path = args.config.clone().or_else(default_config_path);
    let mut config = load_config_from_path(path).context("Failed to load configuration")?;
    args.overrides()
        .apply(&mut config)
        .context("Invalid command line option")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging; stdout belongs to the TUI
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // File reads stay off the runtime's worker threads
    let config = tokio::task::spawn_blocking(move || resolve_config(&args))
        .await
        .context("Configuration task failed")??;
    tracing::info!(
        server = %config.base_url,
        source = ?config.source(),
        "Configuration loaded"
    );

    // Check if we have a TTY before attempting initialization
    use std::io::IsTerminal;

    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        eprintln!("Error: streamchat requires a terminal (TTY)");
        eprintln!();
        eprintln!("This usually means stdin or stdout is piped, or the");
        eprintln!("session is non-interactive (CI, ssh without -t).");
        std::process::exit(1);
    }

    // Set up panic hook to restore terminal
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        // Restore terminal before printing panic
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        original_hook(panic_info);
    }));

    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    // Run the app
    let mut app = App::new(&config);
    let result = app.run(&mut terminal).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    // Propagate any errors
    result
}
