//! Severity-level and hour-of-day histograms.

use crate::core::stats::{round_to, AVERAGE_DECIMALS};
use crate::source::{TremorEvent, MAX_SEVERITY, SEVERITY_LEVELS};
use serde::{Deserialize, Serialize};

/// Number of hour-of-day buckets.
pub const HOURS_PER_DAY: usize = 24;

/// Event counts per severity level.
///
/// Every event contributes to exactly one level whether or not it was
/// detected, so the five levels always sum to `total`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityDistribution {
    pub level_0: usize,
    pub level_1: usize,
    pub level_2: usize,
    pub level_3: usize,
    pub level_4: usize,
    pub total: usize,
}

impl SeverityDistribution {
    /// Tally events into the five severity levels.
    pub fn from_events(events: &[TremorEvent]) -> Self {
        let mut counts = [0usize; SEVERITY_LEVELS];
        for event in events {
            // Sources reject out-of-range levels; clamp keeps the sum invariant
            counts[usize::from(event.severity.min(MAX_SEVERITY))] += 1;
        }

        Self {
            level_0: counts[0],
            level_1: counts[1],
            level_2: counts[2],
            level_3: counts[3],
            level_4: counts[4],
            total: events.len(),
        }
    }

    /// Counts indexed by severity level.
    pub fn counts(&self) -> [usize; SEVERITY_LEVELS] {
        [
            self.level_0,
            self.level_1,
            self.level_2,
            self.level_3,
            self.level_4,
        ]
    }
}

/// Counts for one hour of the day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HourlyBucket {
    pub hour: u8,
    pub count: usize,
    pub detected_count: usize,
    /// Mean severity of detected events in this hour, 0 when none
    pub avg_severity: f64,
}

/// Events bucketed by hour of day, independent of calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HourlyDistribution {
    buckets: Vec<HourlyBucket>,
}

impl HourlyDistribution {
    /// Bucket events by the hour recorded on their timestamp.
    pub fn from_events(events: &[TremorEvent]) -> Self {
        let mut counts = [0usize; HOURS_PER_DAY];
        let mut detected = [0usize; HOURS_PER_DAY];
        let mut severity_sums = [0u64; HOURS_PER_DAY];

        for event in events {
            let hour = event.hour();
            counts[hour] += 1;
            if event.detected {
                detected[hour] += 1;
                severity_sums[hour] += u64::from(event.severity);
            }
        }

        let buckets = (0..HOURS_PER_DAY)
            .map(|hour| HourlyBucket {
                hour: hour as u8,
                count: counts[hour],
                detected_count: detected[hour],
                avg_severity: if detected[hour] == 0 {
                    0.0
                } else {
                    round_to(
                        severity_sums[hour] as f64 / detected[hour] as f64,
                        AVERAGE_DECIMALS,
                    )
                },
            })
            .collect();

        Self { buckets }
    }

    /// The 24 buckets in ascending hour order.
    pub fn buckets(&self) -> &[HourlyBucket] {
        &self.buckets
    }

    /// Total events across all hours.
    pub fn total_count(&self) -> usize {
        self.buckets.iter().map(|b| b.count).sum()
    }

    /// Hour with the most detected events, earliest hour on ties.
    pub fn peak_hour(&self) -> Option<u8> {
        self.buckets
            .iter()
            .filter(|b| b.detected_count > 0)
            .max_by(|a, b| {
                a.detected_count
                    .cmp(&b.detected_count)
                    .then_with(|| b.hour.cmp(&a.hour))
            })
            .map(|b| b.hour)
    }
}

impl Default for HourlyDistribution {
    fn default() -> Self {
        Self::from_events(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 2, day)
            .unwrap()
            .and_hms_opt(hour, 30, 0)
            .unwrap()
    }

    #[test]
    fn test_severity_distribution_counts_undetected_as_level_zero() {
        let events = vec![
            TremorEvent::quiet(at(1, 1)),
            TremorEvent::quiet(at(1, 2)),
            TremorEvent::detection(at(1, 3), 2),
            TremorEvent::detection(at(1, 4), 4),
            TremorEvent::detection(at(1, 5), 4),
        ];
        let dist = SeverityDistribution::from_events(&events);

        assert_eq!(dist.counts(), [2, 0, 1, 0, 2]);
        assert_eq!(dist.total, 5);
        assert_eq!(dist.counts().iter().sum::<usize>(), dist.total);
    }

    #[test]
    fn test_empty_distributions() {
        let dist = SeverityDistribution::from_events(&[]);
        assert_eq!(dist, SeverityDistribution::default());

        let hourly = HourlyDistribution::from_events(&[]);
        assert_eq!(hourly.buckets().len(), HOURS_PER_DAY);
        assert_eq!(hourly.total_count(), 0);
        assert!(hourly.buckets().iter().all(|b| b.avg_severity == 0.0));
        assert_eq!(hourly.peak_hour(), None);
    }

    #[test]
    fn test_hourly_ignores_calendar_date() {
        let events = vec![
            TremorEvent::detection(at(1, 8), 1),
            TremorEvent::detection(at(2, 8), 2),
            TremorEvent::quiet(at(3, 8)),
            TremorEvent::detection(at(3, 22), 4),
        ];
        let hourly = HourlyDistribution::from_events(&events);

        let eight = &hourly.buckets()[8];
        assert_eq!(eight.hour, 8);
        assert_eq!(eight.count, 3);
        assert_eq!(eight.detected_count, 2);
        assert_eq!(eight.avg_severity, 1.5);
        assert_eq!(hourly.buckets()[22].avg_severity, 4.0);
        assert_eq!(hourly.total_count(), events.len());
        assert_eq!(hourly.peak_hour(), Some(8));
    }

    #[test]
    fn test_hourly_serializes_as_array() {
        let json = serde_json::to_value(HourlyDistribution::default()).unwrap();
        assert_eq!(json.as_array().map(Vec::len), Some(24));
    }
}
