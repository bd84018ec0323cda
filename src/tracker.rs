//! Periodic fetch cycle and the state it publishes

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    errors::FetchError,
    feed::FeedClient,
    models::{FleetSnapshot, VesselRecord},
    notify::Notifier,
    novelty::NoveltyDetector,
};

/// What the front end displays. Replaced as a whole after each cycle.
#[derive(Debug, Clone, Default)]
pub struct FleetState {
    /// Latest successful snapshot; kept when a later fetch fails
    pub snapshot: Option<Arc<FleetSnapshot>>,
    /// Vessels first seen in the latest successful fetch
    pub new_vessels: Arc<Vec<VesselRecord>>,
    /// Message of the last failed fetch, cleared when a fetch starts
    pub error: Option<String>,
    pub is_loading: bool,
}

impl FleetState {
    /// Vessels of the latest snapshot, empty before the first success
    pub fn vessels(&self) -> &[VesselRecord] {
        self.snapshot
            .as_deref()
            .map(|s| s.vessels.as_slice())
            .unwrap_or_default()
    }
}

/// Owns the fetch cycle and the seen set
pub struct Tracker {
    feed: FeedClient,
    detector: NoveltyDetector,
    notifier: Notifier,
    period: Duration,
    state_tx: watch::Sender<FleetState>,
}

impl Tracker {
    pub fn new(
        feed: FeedClient,
        detector: NoveltyDetector,
        notifier: Notifier,
        period: Duration,
    ) -> Self {
        let (state_tx, _) = watch::channel(FleetState::default());
        Self {
            feed,
            detector,
            notifier,
            period,
            state_tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<FleetState> {
        self.state_tx.subscribe()
    }

    pub fn detector(&self) -> &NoveltyDetector {
        &self.detector
    }

    /// Fetch, detect new vessels, publish, then hand new vessels to the
    /// notifier without waiting for it.
    pub async fn run_cycle(&mut self) -> Result<(), FetchError> {
        self.state_tx.send_modify(|state| {
            state.is_loading = true;
            state.error = None;
        });

        let snapshot = match self.feed.fetch().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!("Fetch failed: {}", e);
                self.state_tx.send_modify(|state| {
                    state.is_loading = false;
                    state.error = Some(e.to_string());
                });
                return Err(e);
            }
        };

        let new_vessels = self.detector.detect(&snapshot).await;
        info!(
            "Fetched {} vessels, {} new, {} seen in total",
            snapshot.len(),
            new_vessels.len(),
            self.detector.seen().len()
        );

        let new_vessels = Arc::new(new_vessels);
        self.state_tx.send_replace(FleetState {
            snapshot: Some(Arc::new(snapshot)),
            new_vessels: Arc::clone(&new_vessels),
            error: None,
            is_loading: false,
        });

        self.notifier.notify(&new_vessels);

        Ok(())
    }

    /// Spawn the polling loop: one cycle right away, then one per period
    /// and one per refresh request. Cycles never overlap; refresh requests
    /// made while a cycle runs collapse into a single follow-up cycle.
    pub fn start(mut self) -> TrackerHandle {
        let state_rx = self.subscribe();
        let (refresh_tx, mut refresh_rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        let shutdown = cancel.clone();

        let join = tokio::spawn(async move {
            info!("Tracker started, polling every {:?}", self.period);
            let mut interval = tokio::time::interval(self.period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => {}
                    Some(()) = refresh_rx.recv() => {}
                }

                // An in-flight cycle is abandoned on shutdown
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    // Errors are published to the state and logged already
                    _ = self.run_cycle() => {}
                }
            }

            // A cycle cut short by shutdown never cleared its loading flag
            self.state_tx.send_modify(|state| state.is_loading = false);
            info!("Tracker stopped");
        });

        TrackerHandle {
            refresh_tx,
            state_rx,
            cancel,
            join,
        }
    }
}

/// Control handle for a running [`Tracker`]
pub struct TrackerHandle {
    refresh_tx: mpsc::Sender<()>,
    state_rx: watch::Receiver<FleetState>,
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl TrackerHandle {
    /// Ask for a fetch outside the schedule.
    ///
    /// Returns false when a refresh is already pending, in which case this
    /// request is merged into it.
    pub fn refresh(&self) -> bool {
        self.refresh_tx.try_send(()).is_ok()
    }

    pub fn subscribe(&self) -> watch::Receiver<FleetState> {
        self.state_rx.clone()
    }

    /// Cancel the timer and wait for the loop to exit
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.join.await {
            error!("Tracker task failed: {}", e);
        }
    }
}
