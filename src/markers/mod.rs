//! Pothole marker model.
//!
//! A [`Marker`] is immutable once stored: the store assigns `id` and
//! `timestamp`, everything else comes from the accepted submission.

pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub use self::store::MarkerStore;

/// Provenance recorded for submissions through the unauthenticated ingress.
pub const AUTOMATED_DETECTION: &str = "automated-detection";

/// Wire value for a confidence the submitter did not supply.
pub const UNKNOWN_CONFIDENCE: &str = "unknown";

/// Detector confidence attached to a marker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Confidence {
    /// Numeric score as reported by the submitter.
    Score(f64),
    /// No score was supplied.
    Unknown,
}

impl From<Option<f64>> for Confidence {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Self::Unknown, Self::Score)
    }
}

impl Serialize for Confidence {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Score(score) => serializer.serialize_f64(*score),
            Self::Unknown => serializer.serialize_str(UNKNOWN_CONFIDENCE),
        }
    }
}

impl<'de> Deserialize<'de> for Confidence {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Score(f64),
            Label(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Score(score) => Ok(Self::Score(score)),
            Raw::Label(label) if label == UNKNOWN_CONFIDENCE => Ok(Self::Unknown),
            Raw::Label(label) => Err(serde::de::Error::custom(format!(
                "confidence must be a number or \"{UNKNOWN_CONFIDENCE}\", got \"{label}\""
            ))),
        }
    }
}

/// Who submitted a marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provenance {
    /// Identity of the authenticated submitter.
    Account(String),
    /// The open automated-detection ingress.
    AutomatedDetection,
}

impl Provenance {
    /// Wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Account(identity) => identity,
            Self::AutomatedDetection => AUTOMATED_DETECTION,
        }
    }
}

impl Serialize for Provenance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Provenance {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw == AUTOMATED_DETECTION {
            Ok(Self::AutomatedDetection)
        } else {
            Ok(Self::Account(raw))
        }
    }
}

/// A validated submission waiting for store-assigned fields.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerCandidate {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
    /// Submitted confidence, or unknown.
    pub confidence: Confidence,
    /// Submitter.
    pub reported_by: Provenance,
}

/// A stored pothole observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    /// Store-assigned unique id.
    pub id: String,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
    /// Detector confidence.
    pub confidence: Confidence,
    /// Submitter.
    pub reported_by: Provenance,
    /// Store-assigned insertion time.
    pub timestamp: DateTime<Utc>,
}
