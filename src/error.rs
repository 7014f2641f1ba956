//! Error types for the analytics engine.
//!
//! Empty event sets and zero divisors are never errors; they degrade to
//! zero-valued aggregates. What remains is bad requests, failing event
//! sources and serialization failures during export.

use chrono::NaiveDate;
use thiserror::Error;

/// A report or analysis request that cannot be resolved to a date range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("custom reports require both start_date and end_date")]
    MissingCustomDates,

    #[error("start date {start} is after end date {end}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },

    #[error("custom range of {days} days exceeds the maximum of {max} days")]
    RangeTooLong { days: i64, max: i64 },

    #[error("week_offset {0} is out of range (0-52)")]
    WeekOffsetOutOfRange(u32),

    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfBounds {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("{field} is not accepted for {kind} reports")]
    UnexpectedField {
        field: &'static str,
        kind: &'static str,
    },

    #[error("date {0} cannot be represented")]
    UnrepresentableDate(NaiveDate),
}

/// Failure of the event-source collaborator.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read events from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse events: {0}")]
    Parse(String),

    #[error("event at {timestamp} has severity {severity}, expected 0-4")]
    InvalidSeverity { timestamp: String, severity: u8 },

    #[error("event source unavailable: {0}")]
    Unavailable(String),
}

/// Failure while serializing an export payload.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON export failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to flush CSV buffer: {0}")]
    Buffer(String),
}

/// Any failure a report-producing operation can surface.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Result type for report-producing operations.
pub type ReportResult<T> = Result<T, ReportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages_are_descriptive() {
        let err = ValidationError::WeekOffsetOutOfRange(60);
        assert_eq!(err.to_string(), "week_offset 60 is out of range (0-52)");

        let err = ValidationError::OutOfBounds {
            field: "days",
            value: 0,
            min: 1,
            max: 90,
        };
        assert_eq!(err.to_string(), "days must be between 1 and 90, got 0");
    }

    #[test]
    fn test_report_error_is_transparent() {
        let err: ReportError = SourceError::Unavailable("timeout".to_string()).into();
        assert_eq!(err.to_string(), "event source unavailable: timeout");
        assert!(matches!(err, ReportError::Source(_)));
    }
}
