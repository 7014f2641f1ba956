//! Calendar-aligned bucketing.
//!
//! A date range is split into whole calendar days. Every day in the range
//! gets a [`DailyStats`] entry, including days without any events, and the
//! entries are ordered by date regardless of how the events arrived.

use crate::core::fanout::ordered_map;
use crate::core::stats::{percentage, AggregationWindow, WindowStats};
use crate::core::trend::SeverityTrend;
use crate::error::{SourceError, ValidationError};
use crate::source::{EventSource, TremorEvent};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Days in a calendar week.
pub const DAYS_PER_WEEK: i64 = 7;

/// Minimum days with detections before a within-week trend is derived.
pub const MIN_TREND_DAYS: usize = 4;

/// A half-open `[start, end)` interval of device-local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DateRange {
    /// Whole calendar days from `first` through `last`, both inclusive.
    pub fn from_days(first: NaiveDate, last: NaiveDate) -> Result<Self, ValidationError> {
        if first > last {
            return Err(ValidationError::InvertedRange {
                start: first,
                end: last,
            });
        }
        let after_last = last
            .succ_opt()
            .ok_or(ValidationError::UnrepresentableDate(last))?;

        Ok(Self {
            start: first.and_time(NaiveTime::MIN),
            end: after_last.and_time(NaiveTime::MIN),
        })
    }

    /// Check if a timestamp falls within this range.
    pub fn contains(&self, timestamp: NaiveDateTime) -> bool {
        timestamp >= self.start && timestamp < self.end
    }

    /// First calendar day touched by the range.
    pub fn first_day(&self) -> NaiveDate {
        self.start.date()
    }

    /// Last calendar day touched by the range.
    pub fn last_day(&self) -> NaiveDate {
        if self.end <= self.start {
            return self.start.date();
        }
        // `end` is exclusive, so step back to the last covered instant
        (self.end - Duration::nanoseconds(1)).date()
    }

    /// Every calendar day touched by the range, ascending.
    pub fn calendar_days(&self) -> Vec<NaiveDate> {
        if self.end <= self.start {
            return Vec::new();
        }
        self.first_day()
            .iter_days()
            .take_while(|day| *day <= self.last_day())
            .collect()
    }

    /// Number of calendar days touched by the range.
    pub fn day_count(&self) -> i64 {
        if self.end <= self.start {
            return 0;
        }
        (self.last_day() - self.first_day()).num_days() + 1
    }

    /// The range of equal length ending where this one starts.
    pub fn preceding(&self) -> Result<Self, ValidationError> {
        let length = self.end.signed_duration_since(self.start);
        let start = self
            .start
            .checked_sub_signed(length)
            .ok_or(ValidationError::UnrepresentableDate(self.first_day()))?;

        Ok(Self {
            start,
            end: self.start,
        })
    }
}

/// Statistics for a single calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub stats: WindowStats,
}

/// Statistics for a Monday-aligned week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyTrend {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub daily_stats: Vec<DailyStats>,
    /// Detected over total across the whole week, not the mean of daily rates
    pub overall_detection_rate_pct: f64,
    pub severity_trend: SeverityTrend,
}

/// Split events into per-day statistics covering every day of `range`.
///
/// Events outside the range are ignored. Days are aggregated in parallel
/// and returned in ascending date order.
pub fn bucket_by_day(range: &DateRange, events: &[TremorEvent]) -> Vec<DailyStats> {
    let days = range.calendar_days();
    let Some(first) = days.first().copied() else {
        return Vec::new();
    };

    let mut buckets: Vec<Vec<&TremorEvent>> = vec![Vec::new(); days.len()];
    for event in events.iter().filter(|e| range.contains(e.timestamp)) {
        let index = (event.timestamp.date() - first).num_days() as usize;
        if let Some(bucket) = buckets.get_mut(index) {
            bucket.push(event);
        }
    }

    let jobs: Vec<(NaiveDate, Vec<&TremorEvent>)> = days.into_iter().zip(buckets).collect();
    ordered_map(jobs, |(date, bucket)| {
        let start = date.and_time(NaiveTime::MIN);
        let window = AggregationWindow::new(
            start,
            start + Duration::days(1),
            bucket.into_iter().cloned().collect(),
        );
        DailyStats {
            date,
            stats: window.stats(),
        }
    })
}

/// Fetch a range from the source and bucket it by day.
pub fn daily_breakdown(
    source: &dyn EventSource,
    owner: &str,
    range: &DateRange,
) -> Result<Vec<DailyStats>, SourceError> {
    let events = source.fetch_events(owner, range.start, range.end)?;
    Ok(bucket_by_day(range, &events))
}

/// Monday of the week containing `date`.
pub fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// The Monday-aligned week containing `today`, shifted back `offset` weeks.
pub fn week_range(today: NaiveDate, offset: u32) -> Result<DateRange, ValidationError> {
    let week_start = monday_of(today) - Duration::days(i64::from(offset) * DAYS_PER_WEEK);
    DateRange::from_days(week_start, week_start + Duration::days(DAYS_PER_WEEK - 1))
}

/// Summarize one week of daily statistics.
pub fn summarize_week(week_start: NaiveDate, daily_stats: Vec<DailyStats>) -> WeeklyTrend {
    let total: usize = daily_stats.iter().map(|d| d.stats.total_count).sum();
    let detected: usize = daily_stats.iter().map(|d| d.stats.detected_count).sum();
    let severity_trend = within_week_trend(&daily_stats);

    WeeklyTrend {
        week_start,
        week_end: week_start + Duration::days(DAYS_PER_WEEK - 1),
        overall_detection_rate_pct: percentage(detected, total),
        severity_trend,
        daily_stats,
    }
}

/// Compare the first and second half of the days that had detections.
///
/// Days without detections are skipped. Fewer than four remaining days
/// is too little to call a direction. With an odd count the second half
/// takes the extra day.
pub fn within_week_trend(daily_stats: &[DailyStats]) -> SeverityTrend {
    let severities: Vec<f64> = daily_stats
        .iter()
        .filter_map(|d| d.stats.avg_severity)
        .collect();

    if severities.len() < MIN_TREND_DAYS {
        return SeverityTrend::Stable;
    }

    let (first_half, second_half) = severities.split_at(severities.len() / 2);
    SeverityTrend::classify(second_half.mean(), first_half.mean())
}
