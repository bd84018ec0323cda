//! Forwarding of newly seen vessels to the notification sink

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{
    config::{FeedConfig, NotifyConfig},
    errors::{AisWatchError, NotifyError},
    models::{Mmsi, VesselRecord},
};

#[derive(Debug, Serialize)]
struct NotifyPayload<'a> {
    ships: &'a [VesselRecord],
}

/// Best-effort notifier. Dispatch never blocks and never reports errors.
#[derive(Clone)]
pub struct Notifier {
    client: reqwest::Client,
    url: String,
    enabled: bool,
    ignored_mmsi: Vec<Mmsi>,
    ignored_names: Vec<String>,
}

impl Notifier {
    pub fn new(feed: &FeedConfig, config: &NotifyConfig) -> Result<Self, AisWatchError> {
        let client = reqwest::Client::builder()
            .timeout(feed.request_timeout)
            .build()?;
        let ignored_mmsi = config
            .ignored_mmsi
            .iter()
            .map(|v| Mmsi::try_from(*v))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::with_client(client, feed.notify_url()?, config.enabled)
            .ignoring(ignored_mmsi, config.ignored_names.clone()))
    }

    pub fn with_client(client: reqwest::Client, url: String, enabled: bool) -> Self {
        Self {
            client,
            url,
            enabled,
            ignored_mmsi: Vec::new(),
            ignored_names: Vec::new(),
        }
    }

    /// Leave these vessels out of notifications
    pub fn ignoring(mut self, mmsi: Vec<Mmsi>, names: Vec<String>) -> Self {
        self.ignored_mmsi = mmsi;
        self.ignored_names = names.into_iter().map(|n| n.trim().to_lowercase()).collect();
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn is_ignored(&self, vessel: &VesselRecord) -> bool {
        self.ignored_mmsi.contains(&vessel.mmsi)
            || vessel
                .name
                .as_ref()
                .is_some_and(|name| self.ignored_names.contains(&name.to_lowercase()))
    }

    /// Spawn a detached POST of `new_vessels` to the sink.
    ///
    /// Returns `None` when notifications are disabled or nothing is left
    /// to send after removing ignored vessels.
    pub fn notify(&self, new_vessels: &[VesselRecord]) -> Option<JoinHandle<()>> {
        if !self.enabled || new_vessels.is_empty() {
            return None;
        }

        let ships: Vec<VesselRecord> = new_vessels
            .iter()
            .filter(|v| !self.is_ignored(v))
            .cloned()
            .collect();
        if ships.is_empty() {
            debug!("All new vessels are ignored, nothing to notify");
            return None;
        }

        let notifier = self.clone();
        Some(tokio::spawn(async move {
            match notifier.send(&ships).await {
                Ok(()) => info!("Notified sink of {} new vessels", ships.len()),
                Err(e) => warn!("Notification failed: {}", e),
            }
        }))
    }

    async fn send(&self, ships: &[VesselRecord]) -> Result<(), NotifyError> {
        let resp = self
            .client
            .post(&self.url)
            .json(&NotifyPayload { ships })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(NotifyError::HttpStatus(status.as_u16()));
        }
        Ok(())
    }
}
