//! Durable, serialized marker collection.
//!
//! All mutations run inside one write-guard critical section covering
//! read, mutate, persist, and commit. Memory only changes after the
//! snapshot save succeeds, so a failed save leaves the store exactly as it
//! was last persisted. Once a save starts, its commit runs even if the
//! caller is cancelled (see [`save_then_commit`]).

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::{Marker, MarkerCandidate};
use crate::persist::{save_then_commit, SnapshotStore, StorageError};

/// The marker collection and its persisted snapshot.
pub struct MarkerStore {
    markers: Arc<RwLock<Vec<Marker>>>,
    snapshot: Arc<dyn SnapshotStore<Marker>>,
}

impl MarkerStore {
    /// Open the store, loading the last persisted snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the snapshot cannot be read or decoded.
    pub async fn open(snapshot: Arc<dyn SnapshotStore<Marker>>) -> Result<Self, StorageError> {
        let markers = snapshot.load().await?;
        debug!(markers = markers.len(), "marker store loaded");
        Ok(Self {
            markers: Arc::new(RwLock::new(markers)),
            snapshot,
        })
    }

    /// Snapshot of every present marker, in insertion order.
    pub async fn list(&self) -> Vec<Marker> {
        self.markers.read().await.clone()
    }

    /// Number of present markers.
    pub async fn len(&self) -> usize {
        self.markers.read().await.len()
    }

    /// Whether the store holds no markers.
    pub async fn is_empty(&self) -> bool {
        self.markers.read().await.is_empty()
    }

    /// Assign an id and timestamp, append, and persist.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the snapshot save fails; the store is
    /// left unchanged.
    pub async fn insert(&self, candidate: MarkerCandidate) -> Result<Marker, StorageError> {
        let markers = Arc::clone(&self.markers).write_owned().await;

        let marker = Marker {
            id: fresh_id(&markers),
            lat: candidate.lat,
            lng: candidate.lng,
            confidence: candidate.confidence,
            reported_by: candidate.reported_by,
            timestamp: Utc::now(),
        };

        let mut next = markers.clone();
        next.push(marker.clone());
        save_then_commit(markers, next, Arc::clone(&self.snapshot)).await?;

        info!(
            marker_id = %marker.id,
            reported_by = marker.reported_by.as_str(),
            "marker stored"
        );
        Ok(marker)
    }

    /// Remove the marker with `id`.
    ///
    /// Returns `false` without touching storage when no such marker exists.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the snapshot save fails; the marker stays
    /// present.
    pub async fn delete(&self, id: &str) -> Result<bool, StorageError> {
        let markers = Arc::clone(&self.markers).write_owned().await;

        let Some(index) = markers.iter().position(|m| m.id == id) else {
            debug!(marker_id = id, "delete of absent marker");
            return Ok(false);
        };

        let mut next = markers.clone();
        next.remove(index);
        save_then_commit(markers, next, Arc::clone(&self.snapshot)).await?;

        info!(marker_id = id, "marker deleted");
        Ok(true)
    }
}

/// Random v4 id not held by any present marker.
fn fresh_id(markers: &[Marker]) -> String {
    loop {
        let id = Uuid::new_v4().to_string();
        if markers.iter().all(|m| m.id != id) {
            return id;
        }
    }
}
