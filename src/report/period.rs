//! Resolving report requests into concrete date ranges.
//!
//! Every request is validated before any events are fetched. Nothing is
//! silently defaulted: a custom period without both dates, an inverted
//! range, or an out-of-range offset is rejected.

use crate::core::calendar::{week_range, DateRange};
use crate::error::ValidationError;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Furthest a weekly report may look back, in weeks.
pub const MAX_WEEK_OFFSET: u32 = 52;

/// Longest custom range, in days.
pub const MAX_CUSTOM_DAYS: i64 = 366;

/// Calendar days covered by a monthly report.
pub const MONTHLY_DAYS: i64 = 30;

/// Kind of reporting period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodKind {
    Daily,
    #[default]
    Weekly,
    Monthly,
    Custom,
}

impl PeriodKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodKind::Daily => "daily",
            PeriodKind::Weekly => "weekly",
            PeriodKind::Monthly => "monthly",
            PeriodKind::Custom => "custom",
        }
    }
}

impl fmt::Display for PeriodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PeriodKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(PeriodKind::Daily),
            "weekly" => Ok(PeriodKind::Weekly),
            "monthly" => Ok(PeriodKind::Monthly),
            "custom" => Ok(PeriodKind::Custom),
            other => Err(format!(
                "unknown period kind '{other}' (expected daily, weekly, monthly or custom)"
            )),
        }
    }
}

/// A request for a report over some period.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRequest {
    #[serde(default)]
    pub period_kind: PeriodKind,
    /// First day of a custom period
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Last day (inclusive) of a custom period
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Weeks back from the current week, weekly periods only
    #[serde(default)]
    pub week_offset: Option<u32>,
}

impl ReportRequest {
    pub fn daily() -> Self {
        Self {
            period_kind: PeriodKind::Daily,
            ..Self::default()
        }
    }

    pub fn weekly(week_offset: u32) -> Self {
        Self {
            period_kind: PeriodKind::Weekly,
            week_offset: Some(week_offset),
            ..Self::default()
        }
    }

    pub fn monthly() -> Self {
        Self {
            period_kind: PeriodKind::Monthly,
            ..Self::default()
        }
    }

    pub fn custom(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            period_kind: PeriodKind::Custom,
            start_date: Some(start_date),
            end_date: Some(end_date),
            week_offset: None,
        }
    }

    /// Resolve the request into a `[start, end)` range relative to `today`.
    pub fn resolve(&self, today: NaiveDate) -> Result<DateRange, ValidationError> {
        let kind = self.period_kind.as_str();
        if self.period_kind != PeriodKind::Custom {
            if self.start_date.is_some() {
                return Err(ValidationError::UnexpectedField {
                    field: "start_date",
                    kind,
                });
            }
            if self.end_date.is_some() {
                return Err(ValidationError::UnexpectedField {
                    field: "end_date",
                    kind,
                });
            }
        }
        if self.period_kind != PeriodKind::Weekly && self.week_offset.is_some() {
            return Err(ValidationError::UnexpectedField {
                field: "week_offset",
                kind,
            });
        }

        match self.period_kind {
            PeriodKind::Daily => DateRange::from_days(today, today),
            PeriodKind::Weekly => {
                let offset = self.week_offset.unwrap_or(0);
                if offset > MAX_WEEK_OFFSET {
                    return Err(ValidationError::WeekOffsetOutOfRange(offset));
                }
                week_range(today, offset)
            }
            PeriodKind::Monthly => trailing_days(today, MONTHLY_DAYS),
            PeriodKind::Custom => {
                let (Some(start), Some(end)) = (self.start_date, self.end_date) else {
                    return Err(ValidationError::MissingCustomDates);
                };
                if start > end {
                    return Err(ValidationError::InvertedRange { start, end });
                }
                let days = (end - start).num_days() + 1;
                if days > MAX_CUSTOM_DAYS {
                    return Err(ValidationError::RangeTooLong {
                        days,
                        max: MAX_CUSTOM_DAYS,
                    });
                }
                DateRange::from_days(start, end)
            }
        }
    }
}

/// The `days` calendar days ending with `today`.
pub fn trailing_days(today: NaiveDate, days: i64) -> Result<DateRange, ValidationError> {
    DateRange::from_days(today - Duration::days(days.max(1) - 1), today)
}

/// Check that a day count lies within an endpoint's bounds.
pub fn check_days(value: i64, min: i64, max: i64) -> Result<i64, ValidationError> {
    if value < min || value > max {
        return Err(ValidationError::OutOfBounds {
            field: "days",
            value,
            min,
            max,
        });
    }
    Ok(value)
}
