//! In-memory event source.

use super::{EventSource, TremorEvent};
use crate::error::SourceError;
use chrono::NaiveDateTime;
use std::collections::HashMap;

/// Holds already-collected events per owner and serves range queries.
#[derive(Debug, Clone, Default)]
pub struct MemoryEventSource {
    events: HashMap<String, Vec<TremorEvent>>,
}

impl MemoryEventSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a source holding the given events for a single owner.
    pub fn for_owner(owner: impl Into<String>, events: Vec<TremorEvent>) -> Self {
        let mut source = Self::new();
        source.insert(owner, events);
        source
    }

    /// Add events for an owner.
    pub fn insert(&mut self, owner: impl Into<String>, events: Vec<TremorEvent>) {
        self.events.entry(owner.into()).or_default().extend(events);
    }
}

impl EventSource for MemoryEventSource {
    fn fetch_events(
        &self,
        owner: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<TremorEvent>, SourceError> {
        let events = match self.events.get(owner) {
            Some(events) => events
                .iter()
                .filter(|e| e.timestamp >= start && e.timestamp < end)
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_fetch_is_half_open() {
        let source = MemoryEventSource::for_owner(
            "alice",
            vec![
                TremorEvent::quiet(ts(1, 0)),
                TremorEvent::quiet(ts(1, 12)),
                TremorEvent::quiet(ts(2, 0)),
            ],
        );

        let events = source.fetch_events("alice", ts(1, 0), ts(2, 0)).unwrap();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.timestamp < ts(2, 0)));
    }

    #[test]
    fn test_unknown_owner_is_empty() {
        let source = MemoryEventSource::for_owner("alice", vec![TremorEvent::quiet(ts(1, 3))]);
        let events = source.fetch_events("bob", ts(1, 0), ts(3, 0)).unwrap();
        assert!(events.is_empty());
    }
}
