//! AIS watch utility

use ais_watch::{
    config::AppConfig,
    display,
    errors::AisWatchError,
    feed::FeedClient,
    notify::Notifier,
    novelty::NoveltyDetector,
    store::{KvStore, SeenStore},
    tracker::{FleetState, Tracker, TrackerHandle},
    view::{self, SortKey, ViewState},
};
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), AisWatchError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    config.validate()?;

    let feed = FeedClient::new(&config.feed)?;
    let notifier = Notifier::new(&config.feed, &config.notify)?;
    let store = SeenStore::new(KvStore::open(&config.store.path).await);
    let detector = NoveltyDetector::load(store).await;

    info!(
        "Watching {} (notifications {})",
        config.feed.api_base,
        if notifier.is_enabled() { "on" } else { "off" }
    );

    let handle = Tracker::new(feed, detector, notifier, config.feed.poll_interval_ms).start();

    tokio::select! {
        result = run_front_end(&handle) => {
            info!("Front end closed: {:?}", result);
        }
        _ = signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    handle.stop().await;

    Ok(())
}

/// Redraw on every state change and apply commands read from stdin
async fn run_front_end(handle: &TrackerHandle) -> Result<(), AisWatchError> {
    let mut state_rx = handle.subscribe();
    let mut lines = spawn_stdin_reader()?;
    let mut view_state = ViewState::default();

    print_help();
    loop {
        let line = tokio::select! {
            changed = state_rx.changed() => match changed {
                Ok(()) => None,
                Err(_) => break, // Tracker gone
            },
            line = lines.recv() => match line {
                Some(line) => Some(line),
                None => break, // stdin closed
            },
        };

        let state = state_rx.borrow_and_update().clone();
        if let Some(line) = line {
            match Command::parse(&line) {
                Some(Command::Quit) => break,
                Some(command) => command.apply(handle, &mut view_state, &state),
                None => {
                    print_help();
                    continue;
                }
            }
        }
        render(&state, &mut view_state);
    }

    Ok(())
}

// A blocking reader thread does not hold up runtime shutdown the way
// tokio's stdin does
fn spawn_stdin_reader() -> Result<mpsc::UnboundedReceiver<String>, AisWatchError> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })?;
    Ok(rx)
}

fn render(state: &FleetState, view_state: &mut ViewState) {
    let vessels = state.vessels();

    // Keep the page in range when the fleet shrinks between fetches
    let filtered = view::filter(vessels, &view_state.query).len();
    view_state.clamp_page(view::page_count(filtered));

    println!();
    println!("{}", display::status_line(state));
    if let Some(banner) = display::error_banner(state) {
        println!("{}", banner);
    }
    let view = view::build(vessels, view_state);
    println!(
        "{}",
        display::render_table(&view, view_state, &state.new_vessels)
    );
}

fn print_help() {
    println!("Commands: r = refresh, /text = search (/ clears), s <column> = sort, n/p = page, q = quit");
}

enum Command {
    Refresh,
    Search(String),
    Sort(SortKey),
    NextPage,
    PrevPage,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if let Some(query) = line.strip_prefix('/') {
            return Some(Self::Search(query.to_string()));
        }
        if let Some(column) = line.strip_prefix("s ") {
            return match column.parse() {
                Ok(key) => Some(Self::Sort(key)),
                Err(e) => {
                    warn!("{}", e);
                    None
                }
            };
        }
        match line {
            "r" | "" => Some(Self::Refresh),
            "n" => Some(Self::NextPage),
            "p" => Some(Self::PrevPage),
            "q" => Some(Self::Quit),
            _ => None,
        }
    }

    fn apply(self, handle: &TrackerHandle, view_state: &mut ViewState, state: &FleetState) {
        match self {
            Self::Refresh => {
                if !handle.refresh() {
                    info!("Refresh already pending");
                }
            }
            Self::Search(query) => view_state.set_query(query),
            Self::Sort(key) => view_state.toggle_sort(key),
            Self::NextPage => {
                let matching = view::filter(state.vessels(), &view_state.query).len();
                let pages = view::page_count(matching);
                view_state.next_page(pages);
            }
            Self::PrevPage => view_state.prev_page(),
            Self::Quit => {}
        }
    }
}
