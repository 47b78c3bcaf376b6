//! Observability for migration runs
//!
//! - Structured one-line JSON logs with typed lifecycle events
//! - Atomic run counters, returned and logged when a run completes
//!
//! Logging never fails the caller and never spawns background work.

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{render, Logger, Severity};
pub use metrics::{MetricsSnapshot, MigrationMetrics};

/// Log `event` at its severity with owned field values.
pub fn log_event(event: Event, fields: &[(&str, String)]) {
    if !Logger::enabled(event.severity()) {
        return;
    }
    let borrowed: Vec<(&str, &str)> = fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
    Logger::event(event, &borrowed);
}
