//! Analytics service: the owning boundary around an event source.
//!
//! The service validates requests, fetches events for the resolved range
//! and hands them to the pure engine. It holds no mutable state, so one
//! instance can serve any number of concurrent requests.

use crate::config::{Config, ConfigError};
use crate::core::calendar::{
    bucket_by_day, daily_breakdown, summarize_week, week_range, DailyStats, DateRange,
};
use crate::core::distribution::{HourlyDistribution, SeverityDistribution};
use crate::core::stats::compute_stats;
use crate::core::WeeklyTrend;
use crate::error::{ReportResult, SourceError, ValidationError};
use crate::report::export::{build_export, prepare_rows, ExportFile, ExportFormat};
use crate::report::period::{check_days, trailing_days, ReportRequest, MAX_WEEK_OFFSET};
use crate::report::{
    build_doctor_summary, build_report, AnalysisSummary, DoctorSummary, PatientInfo,
    PeriodSnapshot, QuickStats, Report,
};
use crate::source::{EventSource, TremorEvent};
use chrono::{Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::{debug, info};

/// Bounds for the `days` parameter of distribution and summary queries.
pub const SUMMARY_DAYS: (i64, i64) = (1, 90);

/// Bounds for the `days` parameter of the daily trend series.
pub const TREND_DAYS: (i64, i64) = (7, 365);

/// Entry point for every analysis and report operation.
#[derive(Clone)]
pub struct AnalyticsService {
    source: Arc<dyn EventSource>,
    timezone: Tz,
    fixed_today: Option<NaiveDate>,
}

impl AnalyticsService {
    /// Create a service over an event source, resolving "today" in `timezone`.
    pub fn new(source: Arc<dyn EventSource>, timezone: Tz) -> Self {
        Self {
            source,
            timezone,
            fixed_today: None,
        }
    }

    /// Create a service using the timezone from configuration.
    pub fn from_config(source: Arc<dyn EventSource>, config: &Config) -> Result<Self, ConfigError> {
        Ok(Self::new(source, config.tz()?))
    }

    /// Pin "today" to a fixed date instead of the clock.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.fixed_today = Some(today);
        self
    }

    /// Current calendar date in the configured timezone.
    pub fn today(&self) -> NaiveDate {
        self.fixed_today
            .unwrap_or_else(|| Utc::now().with_timezone(&self.timezone).date_naive())
    }

    fn fetch(&self, owner: &str, range: &DateRange) -> Result<Vec<TremorEvent>, SourceError> {
        let events = self.source.fetch_events(owner, range.start, range.end)?;
        debug!(
            owner,
            start = %range.start,
            end = %range.end,
            count = events.len(),
            "Fetched events"
        );
        Ok(events)
    }

    /// Statistics for one calendar day, today by default.
    pub fn daily(&self, owner: &str, date: Option<NaiveDate>) -> ReportResult<DailyStats> {
        let date = date.unwrap_or_else(|| self.today());
        let range = DateRange::from_days(date, date)?;
        let events = self.fetch(owner, &range)?;

        Ok(DailyStats {
            date,
            stats: compute_stats(&events),
        })
    }

    /// Monday-aligned week, `week_offset` weeks back from the current one.
    pub fn weekly(&self, owner: &str, week_offset: u32) -> ReportResult<WeeklyTrend> {
        if week_offset > MAX_WEEK_OFFSET {
            return Err(ValidationError::WeekOffsetOutOfRange(week_offset).into());
        }
        let range = week_range(self.today(), week_offset)?;
        let events = self.fetch(owner, &range)?;

        Ok(summarize_week(range.first_day(), bucket_by_day(&range, &events)))
    }

    /// Severity distribution over the last `days` days.
    pub fn severity_distribution(
        &self,
        owner: &str,
        days: i64,
    ) -> ReportResult<SeverityDistribution> {
        let range = self.trailing(days, SUMMARY_DAYS)?;
        let events = self.fetch(owner, &range)?;
        Ok(SeverityDistribution::from_events(&events))
    }

    /// Hour-of-day distribution over the last `days` days.
    pub fn hourly_distribution(&self, owner: &str, days: i64) -> ReportResult<HourlyDistribution> {
        let range = self.trailing(days, SUMMARY_DAYS)?;
        let events = self.fetch(owner, &range)?;
        Ok(HourlyDistribution::from_events(&events))
    }

    /// Statistics and distributions over the last `days` days.
    pub fn summary(&self, owner: &str, days: i64) -> ReportResult<AnalysisSummary> {
        let range = self.trailing(days, SUMMARY_DAYS)?;
        let events = self.fetch(owner, &range)?;
        Ok(AnalysisSummary::from_events(&range, &events))
    }

    /// Zero-filled per-day series over the last `days` days.
    pub fn trend(&self, owner: &str, days: i64) -> ReportResult<Vec<DailyStats>> {
        let range = self.trailing(days, TREND_DAYS)?;
        Ok(daily_breakdown(self.source.as_ref(), owner, &range)?)
    }

    /// Generate a full report for the requested period.
    pub fn generate_report(&self, owner: &str, request: &ReportRequest) -> ReportResult<Report> {
        let range = request.resolve(self.today())?;
        let previous_range = range.preceding()?;
        let events = self.fetch(owner, &range)?;
        let previous = self.fetch(owner, &previous_range)?;

        let report = build_report(request.period_kind, &range, &events, &previous);
        info!(
            report_id = %report.report_id,
            kind = %request.period_kind,
            events = events.len(),
            "Generated report"
        );
        Ok(report)
    }

    /// Export raw events of the requested period.
    pub fn export(
        &self,
        owner: &str,
        request: &ReportRequest,
        device_id: Option<&str>,
        format: ExportFormat,
    ) -> ReportResult<ExportFile> {
        let range = request.resolve(self.today())?;
        let rows = prepare_rows(self.fetch(owner, &range)?, device_id);
        let export = build_export(&range, &rows, format)?;

        info!(
            filename = %export.filename,
            rows = rows.len(),
            "Exported events"
        );
        Ok(export)
    }

    /// Clinician summary of the last `days` days against the `days` before.
    pub fn doctor_summary(
        &self,
        owner: &str,
        patient: PatientInfo,
        days: i64,
    ) -> ReportResult<DoctorSummary> {
        let range = self.trailing(days, SUMMARY_DAYS)?;
        let previous_range = range.preceding()?;
        let events = self.fetch(owner, &range)?;
        let previous = self.fetch(owner, &previous_range)?;

        Ok(build_doctor_summary(patient, &range, &events, &previous))
    }

    /// Today, this week and this month at a glance.
    pub fn quick_stats(&self, owner: &str) -> ReportResult<QuickStats> {
        let today = self.today();
        let week = DateRange::from_days(week_range(today, 0)?.first_day(), today)?;
        let month = DateRange::from_days(today.with_day(1).unwrap_or(today), today)?;

        Ok(QuickStats {
            today: PeriodSnapshot::from_events(
                &self.fetch(owner, &DateRange::from_days(today, today)?)?,
            ),
            this_week: PeriodSnapshot::from_events(&self.fetch(owner, &week)?),
            this_month: PeriodSnapshot::from_events(&self.fetch(owner, &month)?),
        })
    }

    fn trailing(&self, days: i64, (min, max): (i64, i64)) -> Result<DateRange, ValidationError> {
        let days = check_days(days, min, max)?;
        trailing_days(self.today(), days)
    }
}
