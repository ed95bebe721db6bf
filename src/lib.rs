//! Geopothole: a durable store of geolocated pothole markers.
//!
//! Markers arrive from logged-in operators and from an open
//! automated-detection ingress, and are served to any logged-in account.
//! The [`gateway`] validates and authorizes submissions, the
//! [`markers::MarkerStore`] serializes every mutation and persists the
//! whole collection before acknowledging it.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod access;
pub mod config;
pub mod gateway;
pub mod identity;
pub mod logging;
pub mod markers;
pub mod persist;
pub mod reporter;
pub mod server;
pub mod session;
