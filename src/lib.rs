//! Star Theater Server Library
//!
//! A bouncing-star simulation driven at a fixed 60 Hz, manipulated over a
//! small JSON HTTP API.
//!
//! # Features
//!
//! - `metrics` - Prometheus endpoint on `METRICS_PORT` (enabled by default)

pub mod config;
pub mod metrics;
pub mod net;
pub mod sim;
pub mod util;
