use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use quote_race::{
    app::{App, Flow},
    app_dirs::AppDirs,
    config::{ConfigStore, FileConfigStore, Overrides},
    controller::{RaceController, RaceEffects, ThreadEffects},
    quote::{ApiNinjasProvider, QuoteProvider, StaticQuoteProvider},
    runtime::{CrosstermEventSource, EventSource, FixedTicker, Runner, Ticker},
    TICK_RATE_MS,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin},
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};
use tracing_subscriber::EnvFilter;

/// typing race against real quotations
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A terminal typing race: a quotation is fetched, a countdown runs, and you retype it word by word as fast as you can. Set API_NINJAS_KEY to fetch quotes, or pass --prompt to race against your own text."
)]
pub struct Cli {
    /// quote category to request (any category when empty)
    #[clap(short = 'c', long)]
    category: Option<String>,

    /// seconds to count down before the race starts
    #[clap(short = 's', long = "countdown")]
    countdown_secs: Option<u32>,

    /// quote API endpoint
    #[clap(long)]
    api_url: Option<String>,

    /// race against this text instead of fetching a quote
    #[clap(short = 'p', long)]
    prompt: Option<String>,

    /// store the effective category, countdown and endpoint as defaults
    #[clap(long)]
    save_config: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            category: self.category.clone(),
            countdown_secs: self.countdown_secs,
            api_url: self.api_url.clone(),
        }
    }
}

fn init_logging() {
    let Some(path) = AppDirs::log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(false)
        .with_writer(Mutex::new(file))
        .try_init();
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    init_logging();

    let store = FileConfigStore::new();
    let config = store.load().with_overrides(cli.overrides());
    if cli.save_config {
        store.save(&config)?;
        tracing::info!(path = %store.path().display(), "config saved");
    }

    let provider: Arc<dyn QuoteProvider> = match &cli.prompt {
        Some(text) => Arc::new(StaticQuoteProvider::new(text.clone())),
        None => Arc::new(ApiNinjasProvider::from_env(&config)?),
    };
    tracing::info!(category = %config.category, countdown = config.countdown_secs, "starting");

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let events = CrosstermEventSource::new();
    let effects = ThreadEffects::new(events.sender(), provider);
    let mut app = App::new(RaceController::new(
        config.countdown_secs,
        config.category.clone(),
        effects,
    ));
    let runner = Runner::new(events, FixedTicker::new(Duration::from_millis(TICK_RATE_MS)));

    let result = start_tui(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B, R, S, T>(
    terminal: &mut Terminal<B>,
    app: &mut App<R>,
    runner: &Runner<S, T>,
) -> Result<(), Box<dyn Error>>
where
    B: Backend,
    R: RaceEffects,
    S: EventSource,
    T: Ticker,
{
    loop {
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;

        if app.handle_event(runner.step(), Instant::now()) == Flow::Quit {
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["quote-race"]);

        assert_eq!(cli.category, None);
        assert_eq!(cli.countdown_secs, None);
        assert_eq!(cli.api_url, None);
        assert_eq!(cli.prompt, None);
        assert!(!cli.save_config);
    }

    #[test]
    fn test_cli_category() {
        let cli = Cli::parse_from(["quote-race", "-c", "happiness"]);
        assert_eq!(cli.category.as_deref(), Some("happiness"));

        let cli = Cli::parse_from(["quote-race", "--category", "success"]);
        assert_eq!(cli.category.as_deref(), Some("success"));
    }

    #[test]
    fn test_cli_countdown() {
        let cli = Cli::parse_from(["quote-race", "-s", "3"]);
        assert_eq!(cli.countdown_secs, Some(3));

        let cli = Cli::parse_from(["quote-race", "--countdown", "0"]);
        assert_eq!(cli.countdown_secs, Some(0));
    }

    #[test]
    fn test_cli_custom_prompt() {
        let cli = Cli::parse_from(["quote-race", "-p", "hello world"]);
        assert_eq!(cli.prompt.as_deref(), Some("hello world"));
    }

    #[test]
    fn test_overrides_follow_cli() {
        let cli = Cli::parse_from([
            "quote-race",
            "--category",
            "art",
            "--api-url",
            "http://localhost/q",
            "--save-config",
        ]);
        let overrides = cli.overrides();
        assert_eq!(overrides.category.as_deref(), Some("art"));
        assert_eq!(overrides.api_url.as_deref(), Some("http://localhost/q"));
        assert_eq!(overrides.countdown_secs, None);
        assert!(cli.save_config);
    }
}
