//! Aggregation and trend-analysis engine.
//!
//! This module contains:
//! - Window statistics over arbitrary event sets
//! - Calendar bucketing into days and Monday-aligned weeks
//! - Severity and hour-of-day distributions
//! - Period comparison and rule-based clinical assessment
//!
//! Everything here is a pure function of its inputs.

pub mod calendar;
pub mod distribution;
pub mod fanout;
pub mod stats;
pub mod trend;

// Re-export commonly used types
pub use calendar::{
    bucket_by_day, daily_breakdown, summarize_week, week_range, within_week_trend, DailyStats,
    DateRange, WeeklyTrend,
};
pub use distribution::{HourlyBucket, HourlyDistribution, SeverityDistribution};
pub use stats::{compute_stats, AggregationWindow, WindowStats};
pub use trend::{
    assess, compare_periods, Assessment, Observation, PeriodComparison, Recommendation,
    SeverityTrend, VolumeTrend,
};
