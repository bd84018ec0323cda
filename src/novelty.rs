//! Detection of vessels not seen before

use tracing::{debug, info};

use crate::{
    models::{FleetSnapshot, Mmsi, SeenSet, VesselRecord},
    store::SeenStore,
};

/// Vessels in `snapshot` missing from `seen`, in snapshot order, and the
/// seen set extended with them.
pub fn diff(snapshot: &FleetSnapshot, seen: &SeenSet) -> (Vec<VesselRecord>, SeenSet) {
    let novel: Vec<VesselRecord> = snapshot
        .vessels
        .iter()
        .filter(|v| !seen.contains(&v.mmsi))
        .cloned()
        .collect();

    let mut updated = seen.clone();
    for vessel in &novel {
        updated.insert(vessel.mmsi);
    }

    (novel, updated)
}

/// Owns the seen set for the lifetime of the tracker. It is the only writer.
pub struct NoveltyDetector {
    store: SeenStore,
    seen: SeenSet,
}

impl NoveltyDetector {
    /// Load the seen set from `store`
    pub async fn load(store: SeenStore) -> Self {
        let seen = store.load().await;
        if seen.is_empty() {
            info!("No previously seen vessels, every vessel in the first fetch counts as new");
        }
        Self { store, seen }
    }

    pub fn seen(&self) -> &SeenSet {
        &self.seen
    }

    /// Return the vessels of `snapshot` not seen before and record them.
    ///
    /// The seen set is persisted only when it grew.
    pub async fn detect(&mut self, snapshot: &FleetSnapshot) -> Vec<VesselRecord> {
        let (novel, updated) = diff(snapshot, &self.seen);

        if !novel.is_empty() {
            let ids: Vec<Mmsi> = novel.iter().map(|v| v.mmsi).collect();
            debug!("New vessels: {:?}", ids);
            self.seen = updated;
            self.store.persist(&self.seen).await;
        }

        novel
    }
}
