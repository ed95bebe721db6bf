//! Client for the automated-detection ingress.
//!
//! Used by detectors (and the `report` / `simulate` subcommands) to post
//! detections to a running service. Position comes from the caller; GPS
//! acquisition is the detector's concern.

use std::time::Duration;

use rand::Rng;
use serde::Serialize;
use tracing::{info, warn};

use crate::markers::Marker;

/// Largest jitter, in degrees, applied to simulated positions.
const SIMULATED_JITTER_DEG: f64 = 0.001;

/// Errors from the reporter client.
#[derive(Debug, thiserror::Error)]
pub enum ReporterError {
    /// The request could not be sent or the response not read.
    #[error("report request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The service answered with a non-success status.
    #[error("service rejected report with status {status}: {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body text.
        body: String,
    },
    /// The success body did not contain a marker.
    #[error("unexpected response body: {0}")]
    Malformed(String),
}

#[derive(Debug, Serialize)]
struct DetectionBody {
    lat: f64,
    lng: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    confidence: Option<f64>,
}

#[derive(serde::Deserialize)]
struct ReportResponse {
    marker: Marker,
}

/// Posts detections to `{api_url}/report`.
pub struct DetectionReporter {
    client: reqwest::Client,
    endpoint: String,
}

impl DetectionReporter {
    /// Reporter for the service rooted at `api_url` (e.g. `http://localhost:5000`).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(api_url: &str) -> Result<Self, ReporterError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/report", api_url.trim_end_matches('/')),
        })
    }

    /// Full URL detections are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Submit one detection and return the stored marker.
    ///
    /// # Errors
    ///
    /// Returns [`ReporterError::Rejected`] for non-2xx responses.
    pub async fn report(
        &self,
        lat: f64,
        lng: f64,
        confidence: Option<f64>,
    ) -> Result<Marker, ReporterError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&DetectionBody {
                lat,
                lng,
                confidence,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ReporterError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ReportResponse =
            serde_json::from_str(&body).map_err(|e| ReporterError::Malformed(e.to_string()))?;
        info!(marker_id = %parsed.marker.id, lat, lng, "detection reported");
        Ok(parsed.marker)
    }

    /// Submit `count` simulated detections around a base position, pausing
    /// `interval` between them. Failures are logged and counted, not fatal.
    ///
    /// Returns the number of detections the service accepted.
    pub async fn simulate(
        &self,
        base_lat: f64,
        base_lng: f64,
        count: u32,
        interval: Duration,
    ) -> u32 {
        let mut accepted: u32 = 0;
        for i in 0..count {
            let detection = simulated_detection(base_lat, base_lng, &mut rand::thread_rng());
            match self
                .report(detection.lat, detection.lng, detection.confidence)
                .await
            {
                Ok(_) => accepted = accepted.saturating_add(1),
                Err(e) => warn!(error = %e, attempt = i, "simulated report failed"),
            }
            if i.saturating_add(1) < count {
                tokio::time::sleep(interval).await;
            }
        }
        accepted
    }
}

/// Simulated detection: position jittered by at most
/// ±[`SIMULATED_JITTER_DEG`], confidence in `[75, 98]` to two decimals.
fn simulated_detection(base_lat: f64, base_lng: f64, rng: &mut impl Rng) -> DetectionBody {
    let lat = base_lat + rng.gen_range(-SIMULATED_JITTER_DEG..=SIMULATED_JITTER_DEG);
    let lng = base_lng + rng.gen_range(-SIMULATED_JITTER_DEG..=SIMULATED_JITTER_DEG);
    let confidence = (rng.gen_range(75.0..=98.0_f64) * 100.0).round() / 100.0;
    DetectionBody {
        lat,
        lng,
        confidence: Some(confidence),
    }
}
