//! Domain event contract.

use chrono::{DateTime, Utc};

/// A fact emitted by an aggregate's `handle` and folded back in by `apply`.
pub trait Event: Clone + core::fmt::Debug {
    /// Stable, dotted event type name (e.g. `inventory.stock.topped_up`).
    fn event_type(&self) -> &'static str;

    /// Schema version of the event payload.
    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc>;
}
