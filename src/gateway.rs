//! Ingestion gateway: the only path by which markers enter or leave the store.
//!
//! Two ingress protocols terminate in [`MarkerStore::insert`]:
//! - **authenticated**: [`access::can_mutate`] checked, then payload
//!   validated, provenance is the caller's identity. A viewer is denied
//!   whatever the payload holds.
//! - **automated detection**: payload validated, no privilege check,
//!   provenance is [`Provenance::AutomatedDetection`].
//!
//! Deletion exists only on the authenticated path. Rejected requests never
//! reach the store.

use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::access;
use crate::identity::Account;
use crate::markers::{Confidence, Marker, MarkerCandidate, MarkerStore, Provenance};
use crate::persist::StorageError;

/// Errors surfaced by the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Submission is malformed or missing required fields.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    /// Caller is authenticated but lacks operator privilege.
    #[error("permission denied for {identity}")]
    PermissionDenied {
        /// Identity that attempted the mutation.
        identity: String,
    },
    /// The store could not persist the mutation.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Marker submission body, as sent by operators and detectors.
///
/// Unknown fields (a detector's own timestamp, for instance) are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarkerSubmission {
    /// Latitude in degrees. Required.
    #[serde(default)]
    pub lat: Option<f64>,
    /// Longitude in degrees. Required.
    #[serde(default)]
    pub lng: Option<f64>,
    /// Optional confidence score. `null` is treated as absent.
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl MarkerSubmission {
    /// Submission with a position and optional confidence.
    pub fn new(lat: f64, lng: f64, confidence: Option<f64>) -> Self {
        Self {
            lat: Some(lat),
            lng: Some(lng),
            confidence,
        }
    }

    fn into_candidate(self, reported_by: Provenance) -> Result<MarkerCandidate, GatewayError> {
        let lat = require_coordinate("lat", self.lat)?;
        let lng = require_coordinate("lng", self.lng)?;
        if let Some(score) = self.confidence {
            if !score.is_finite() {
                return Err(GatewayError::InvalidPayload(
                    "confidence must be a finite number".to_owned(),
                ));
            }
        }

        Ok(MarkerCandidate {
            lat,
            lng,
            confidence: Confidence::from(self.confidence),
            reported_by,
        })
    }
}

fn require_coordinate(name: &str, value: Option<f64>) -> Result<f64, GatewayError> {
    match value {
        Some(v) if v.is_finite() => Ok(v),
        Some(_) => Err(GatewayError::InvalidPayload(format!(
            "{name} must be a finite number"
        ))),
        None => Err(GatewayError::InvalidPayload(format!("{name} is required"))),
    }
}

/// Validating, authorizing front of the [`MarkerStore`].
#[derive(Clone)]
pub struct IngestionGateway {
    store: Arc<MarkerStore>,
}

impl IngestionGateway {
    /// Gateway over a shared store handle.
    pub fn new(store: Arc<MarkerStore>) -> Self {
        Self { store }
    }

    /// All markers, in insertion order. Readable at any privilege.
    pub async fn list(&self) -> Vec<Marker> {
        self.store.list().await
    }

    /// Store a marker on behalf of a logged-in account.
    ///
    /// # Errors
    ///
    /// [`GatewayError::PermissionDenied`] for a viewer,
    /// [`GatewayError::InvalidPayload`] when the position is missing or not
    /// finite, and [`GatewayError::Storage`] if persistence fails.
    pub async fn submit_authenticated(
        &self,
        account: &Account,
        submission: MarkerSubmission,
    ) -> Result<Marker, GatewayError> {
        authorize(account, "create")?;
        let candidate = submission.into_candidate(Provenance::Account(account.identity.clone()))?;
        Ok(self.store.insert(candidate).await?)
    }

    /// Check that `account` may create markers, before its body is read.
    ///
    /// # Errors
    ///
    /// [`GatewayError::PermissionDenied`] for a viewer.
    pub fn authorize_create(&self, account: &Account) -> Result<(), GatewayError> {
        authorize(account, "create")
    }

    /// Store a marker from the unauthenticated automated-detection ingress.
    ///
    /// # Errors
    ///
    /// [`GatewayError::InvalidPayload`] or [`GatewayError::Storage`].
    pub async fn submit_automated(
        &self,
        submission: MarkerSubmission,
    ) -> Result<Marker, GatewayError> {
        let candidate = submission.into_candidate(Provenance::AutomatedDetection)?;
        Ok(self.store.insert(candidate).await?)
    }

    /// Delete a marker on behalf of a logged-in account.
    ///
    /// Returns whether a marker was removed; an absent id is not an error.
    ///
    /// # Errors
    ///
    /// [`GatewayError::PermissionDenied`] for a viewer, or
    /// [`GatewayError::Storage`] if persistence fails.
    pub async fn delete(&self, account: &Account, id: &str) -> Result<bool, GatewayError> {
        authorize(account, "delete")?;
        Ok(self.store.delete(id).await?)
    }
}

fn authorize(account: &Account, operation: &'static str) -> Result<(), GatewayError> {
    if access::can_mutate(account) {
        return Ok(());
    }
    warn!(
        identity = %account.identity,
        role = account.privilege.as_str(),
        operation,
        "marker mutation denied"
    );
    Err(GatewayError::PermissionDenied {
        identity: account.identity.clone(),
    })
}
