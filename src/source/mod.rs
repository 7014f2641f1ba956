//! Event source collaborators.
//!
//! The engine never performs I/O itself. Everything it aggregates comes
//! through an [`EventSource`], which returns the events of one owner inside
//! a half-open `[start, end)` interval in any order.

pub mod file;
pub mod memory;
pub mod types;

use crate::error::SourceError;
use chrono::NaiveDateTime;

// Re-export commonly used types
pub use file::load_events;
pub use memory::MemoryEventSource;
pub use types::{AxisSample, TremorEvent, MAX_SEVERITY, SEVERITY_LEVELS};

/// Supplies tremor events for an owner (user or device scope).
///
/// Implementations must not return events outside `[start, end)`. Failures
/// are surfaced as-is; the engine does not retry.
pub trait EventSource: Send + Sync {
    fn fetch_events(
        &self,
        owner: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<TremorEvent>, SourceError>;
}
