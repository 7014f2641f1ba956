//! Tremor Analytics - time-windowed aggregation and trend analysis of
//! tremor sensor events.
//!
//! This library turns a stream of timestamped tremor detections into
//! statistics, distributions, period-over-period comparisons and reports.
//!
//! # Guarantees
//!
//! - **Half-open windows**: every range is `[start, end)` in device-local time
//! - **No division errors**: empty windows degrade to zero or absent averages
//! - **Deterministic**: the same events always yield the same aggregates
//! - **Validated up front**: bad requests are rejected before any fetch
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Tremor Analytics                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │ EventSource │──▶│  Windowing  │──▶│    Stats    │       │
//! │  │ (file/mem)  │   │ (day/week)  │   │ (per window)│       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │                                             │              │
//! │                                             ▼              │
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │   Export    │◀──│   Report    │◀──│    Trend    │       │
//! │  │ (CSV/JSON)  │   │  Assembly   │   │ Comparison  │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tremor_analytics::{source, AnalyticsService, ReportRequest};
//!
//! let events = source::load_events("events.json".as_ref()).expect("Failed to load events");
//! let source = source::MemoryEventSource::for_owner("patient-1", events);
//! let service = AnalyticsService::new(Arc::new(source), chrono_tz::UTC);
//!
//! let report = service
//!     .generate_report("patient-1", &ReportRequest::weekly(0))
//!     .expect("Failed to generate report");
//! println!("{}", report.comparison.severity_trend);
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod report;
pub mod service;
pub mod source;

#[cfg(feature = "server")]
pub mod server;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError};
pub use core::{
    compare_periods, compute_stats, DailyStats, DateRange, HourlyDistribution, PeriodComparison,
    SeverityDistribution, SeverityTrend, VolumeTrend, WeeklyTrend, WindowStats,
};
pub use error::{ExportError, ReportError, ReportResult, SourceError, ValidationError};
pub use report::{
    AnalysisSummary, DoctorSummary, ExportFile, ExportFormat, PeriodKind, QuickStats, Report,
    ReportRequest,
};
pub use service::AnalyticsService;
pub use source::{EventSource, MemoryEventSource, TremorEvent};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
