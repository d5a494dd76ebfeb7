use chrono::{DateTime, Utc};

/// A domain event.
///
/// Events are immutable facts, appended and never edited.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name (e.g. "auth.role.bundle_replaced").
    fn event_type(&self) -> &'static str;

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;
}
