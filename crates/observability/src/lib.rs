//! `meshmart-observability` — process-wide telemetry bootstrap.

pub mod tracing;

pub use tracing::init;
