//! Equipment-parameter dataset analytics.
//!
//! ```text
//! upload bytes ──► data (schema + parse) ──► summary ──► retention ──► store
//!                                                                        │
//!          ┌──────────────────────┬──────────────────────┬───────────────┤
//!          ▼                      ▼                      ▼               ▼
//!      analytics             dashboard                report          history
//! ```

pub mod analytics;
pub mod config;
pub mod dashboard;
pub mod data;
pub mod error;
pub mod logging;
pub mod model;
pub mod report;
pub mod retention;
pub mod service;
pub mod stats;
pub mod storage;
pub mod summary;
pub mod verify;

pub use error::{EngineError, ErrorKind, Result};
pub use service::AnalyticsEngine;
