//! Observability for the archive engine
//!
//! - Structured JSON logging
//! - Typed lifecycle events
//! - Atomic counters
//!
//! Observability is read-only: it never changes what the engine decides,
//! and a failed log write is dropped rather than surfaced.

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

/// Log a lifecycle event
pub fn log_event(event: Event) {
    log_event_with_fields(event, &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_fatal() {
        Severity::Fatal
    } else {
        Severity::Info
    };
    Logger::log(severity, event.as_str(), fields);
}

/// Log a per-mutation event at TRACE
pub fn trace_event(event: Event, fields: &[(&str, &str)]) {
    Logger::log(Severity::Trace, event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event() {
        log_event(Event::EngineOpenStart);
        log_event_with_fields(Event::BucketCreated, &[("logical_name", "photos")]);
        trace_event(Event::VersionAppended, &[("key", "foo")]);
    }
}
