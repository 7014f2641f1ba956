//! Report assembly.
//!
//! Reports are built on demand from already-fetched events and are never
//! mutated afterwards. Apart from the identifier and generation timestamp,
//! the same inputs always produce the same report.

pub mod export;
pub mod period;

use crate::core::calendar::{bucket_by_day, within_week_trend, DailyStats, DateRange};
use crate::core::distribution::{HourlyDistribution, SeverityDistribution};
use crate::core::stats::{compute_stats, round_to, WindowStats, AVERAGE_DECIMALS};
use crate::core::trend::{
    assess, compare_periods, Observation, PeriodComparison, Recommendation, SeverityTrend,
    VolumeTrend,
};
use crate::source::TremorEvent;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

pub use export::{build_export, export_csv, export_filename, export_json, ExportFile, ExportFormat};
pub use period::{PeriodKind, ReportRequest};

/// Overall statistics and distributions for one period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSummary {
    pub period_start: NaiveDateTime,
    pub period_end: NaiveDateTime,
    #[serde(flatten)]
    pub stats: WindowStats,
    pub severity_distribution: SeverityDistribution,
    pub hourly_distribution: HourlyDistribution,
    /// Hour of day with the most detections, absent when nothing was detected
    pub peak_hour: Option<u8>,
}

impl AnalysisSummary {
    /// Summarize the events of `range`.
    pub fn from_events(range: &DateRange, events: &[TremorEvent]) -> Self {
        let hourly_distribution = HourlyDistribution::from_events(events);
        Self {
            period_start: range.start,
            period_end: range.end,
            stats: compute_stats(events),
            severity_distribution: SeverityDistribution::from_events(events),
            peak_hour: hourly_distribution.peak_hour(),
            hourly_distribution,
        }
    }
}

/// A generated tremor report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub report_id: Uuid,
    pub period_kind: PeriodKind,
    pub generated_at: DateTime<Utc>,
    pub summary: AnalysisSummary,
    pub daily_breakdown: Vec<DailyStats>,
    /// Against the preceding period of the same length
    pub comparison: PeriodComparison,
    /// First half of the week against the second, weekly reports only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week_severity_trend: Option<SeverityTrend>,
}

/// Assemble a report from the events of a period and of the period before it.
pub fn build_report(
    period_kind: PeriodKind,
    range: &DateRange,
    events: &[TremorEvent],
    previous_events: &[TremorEvent],
) -> Report {
    let summary = AnalysisSummary::from_events(range, events);
    let daily_breakdown = bucket_by_day(range, events);
    let comparison = compare_periods(summary.stats.clone(), compute_stats(previous_events));
    let week_severity_trend =
        (period_kind == PeriodKind::Weekly).then(|| within_week_trend(&daily_breakdown));

    Report {
        report_id: Uuid::new_v4(),
        period_kind,
        generated_at: Utc::now(),
        summary,
        daily_breakdown,
        comparison,
        week_severity_trend,
    }
}

/// Who a doctor summary is about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PatientInfo {
    pub owner_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryPeriod {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub days: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoctorSummaryCounts {
    pub total_monitoring_records: usize,
    pub tremor_episodes: usize,
    pub avg_severity: f64,
    pub max_severity: u8,
    pub severe_episodes: usize,
    pub severity_trend: SeverityTrend,
    pub frequency_trend: VolumeTrend,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoctorComparison {
    pub prev_period_tremors: usize,
    pub prev_period_avg_severity: f64,
    pub tremor_change_pct: f64,
    pub severity_change_pct: f64,
}

/// Flattened summary for a clinician-facing presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoctorSummary {
    pub patient_info: PatientInfo,
    pub period: SummaryPeriod,
    pub summary: DoctorSummaryCounts,
    pub comparison: DoctorComparison,
    pub key_observations: Vec<Observation>,
    pub recommendations: Vec<Recommendation>,
}

/// Build a doctor summary comparing `range` with the period before it.
pub fn build_doctor_summary(
    patient: PatientInfo,
    range: &DateRange,
    events: &[TremorEvent],
    previous_events: &[TremorEvent],
) -> DoctorSummary {
    let days = range.day_count();
    let comparison = compare_periods(compute_stats(events), compute_stats(previous_events));
    let severe_episodes = events.iter().filter(|e| e.is_severe()).count();
    let assessment = assess(&comparison, severe_episodes, days);

    // Max over detected events only: this is the worst episode, not the worst reading
    let max_severity = events
        .iter()
        .filter(|e| e.detected)
        .map(|e| e.severity)
        .max()
        .unwrap_or(0);

    let PeriodComparison {
        current,
        previous,
        severity_trend,
        frequency_trend,
        detected_change_pct,
        severity_change_pct,
    } = comparison;

    DoctorSummary {
        patient_info: patient,
        period: SummaryPeriod {
            start: range.start,
            end: range.end,
            days,
        },
        summary: DoctorSummaryCounts {
            total_monitoring_records: current.total_count,
            tremor_episodes: current.detected_count,
            avg_severity: current.avg_severity.unwrap_or(0.0),
            max_severity,
            severe_episodes,
            severity_trend,
            frequency_trend,
        },
        comparison: DoctorComparison {
            prev_period_tremors: previous.detected_count,
            prev_period_avg_severity: previous.avg_severity.unwrap_or(0.0),
            tremor_change_pct: detected_change_pct,
            severity_change_pct,
        },
        key_observations: assessment.observations,
        recommendations: assessment.recommendations,
    }
}

/// Headline numbers for one period.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PeriodSnapshot {
    pub total_count: usize,
    pub detected_count: usize,
    /// 0 when nothing was detected
    pub avg_severity: f64,
}

impl PeriodSnapshot {
    pub fn from_events(events: &[TremorEvent]) -> Self {
        let stats = compute_stats(events);
        Self {
            total_count: stats.total_count,
            detected_count: stats.detected_count,
            avg_severity: round_to(stats.avg_severity.unwrap_or(0.0), AVERAGE_DECIMALS),
        }
    }
}

/// Today, this week and this month at a glance.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QuickStats {
    pub today: PeriodSnapshot,
    pub this_week: PeriodSnapshot,
    pub this_month: PeriodSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, d).unwrap()
    }

    fn at(d: u32, hour: u32) -> NaiveDateTime {
        day(d).and_hms_opt(hour, 0, 0).unwrap()
    }

    fn week() -> DateRange {
        // Monday 2024-10-07 through Sunday 2024-10-13
        DateRange::from_days(day(7), day(13)).unwrap()
    }

    #[test]
    fn test_empty_report_degrades_to_zeroes() {
        let report = build_report(PeriodKind::Weekly, &week(), &[], &[]);

        assert_eq!(report.summary.stats.total_count, 0);
        assert_eq!(report.summary.stats.avg_severity, None);
        assert_eq!(report.summary.severity_distribution.total, 0);
        assert_eq!(report.summary.hourly_distribution.total_count(), 0);
        assert_eq!(report.daily_breakdown.len(), 7);
        assert_eq!(report.comparison.severity_trend, SeverityTrend::Stable);
        assert_eq!(report.week_severity_trend, Some(SeverityTrend::Stable));
    }

    #[test]
    fn test_summary_reports_peak_hour() {
        let events = vec![
            TremorEvent::detection(at(7, 9), 2),
            TremorEvent::detection(at(8, 21), 3),
            TremorEvent::detection(at(9, 21), 1),
            TremorEvent::quiet(at(9, 9)),
            TremorEvent::quiet(at(10, 9)),
        ];
        let summary = AnalysisSummary::from_events(&week(), &events);
        assert_eq!(summary.peak_hour, Some(21));

        let quiet = AnalysisSummary::from_events(&week(), &[TremorEvent::quiet(at(7, 9))]);
        assert_eq!(quiet.peak_hour, None);
        assert!(serde_json::to_value(&quiet).unwrap()["peak_hour"].is_null());
    }

    #[test]
    fn test_report_is_deterministic_except_identity() {
        let events = vec![
            TremorEvent::detection(at(7, 9), 2),
            TremorEvent::quiet(at(8, 10)),
            TremorEvent::detection(at(12, 21), 4),
        ];
        let previous = vec![TremorEvent::detection(at(2, 9), 1)];

        let a = build_report(PeriodKind::Weekly, &week(), &events, &previous);
        let mut b = build_report(PeriodKind::Weekly, &week(), &events, &previous);
        assert_ne!(a.report_id, b.report_id);

        b.report_id = a.report_id;
        b.generated_at = a.generated_at;
        assert_eq!(a, b);
    }

    #[test]
    fn test_non_weekly_report_has_no_week_trend() {
        let range = DateRange::from_days(day(1), day(1)).unwrap();
        let report = build_report(PeriodKind::Daily, &range, &[], &[]);
        assert_eq!(report.week_severity_trend, None);
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("week_severity_trend").is_none());
        assert_eq!(json["period_kind"], "daily");
    }

    #[test]
    fn test_doctor_summary() {
        let range = week();
        let mut events: Vec<TremorEvent> = (0..4)
            .map(|i| TremorEvent::detection(at(8, 8) + Duration::minutes(i), 4))
            .collect();
        events.push(TremorEvent::quiet(at(9, 8)));

        let previous = vec![TremorEvent::detection(at(1, 8), 2); 2];

        let summary = build_doctor_summary(
            PatientInfo {
                owner_id: "p-17".to_string(),
                display_name: Some("R. Moreau".to_string()),
            },
            &range,
            &events,
            &previous,
        );

        assert_eq!(summary.period.days, 7);
        assert_eq!(summary.summary.total_monitoring_records, 5);
        assert_eq!(summary.summary.tremor_episodes, 4);
        assert_eq!(summary.summary.avg_severity, 4.0);
        assert_eq!(summary.summary.max_severity, 4);
        assert_eq!(summary.summary.severe_episodes, 4);
        assert_eq!(summary.summary.severity_trend, SeverityTrend::Worsening);
        assert_eq!(summary.summary.frequency_trend, VolumeTrend::Increasing);
        assert_eq!(summary.comparison.prev_period_tremors, 2);
        assert_eq!(summary.comparison.tremor_change_pct, 100.0);
        assert_eq!(summary.comparison.severity_change_pct, 100.0);
        assert_eq!(summary.key_observations.len(), 3);
        assert_eq!(
            summary.recommendations,
            vec![
                Recommendation::ConsultClinician,
                Recommendation::IncreaseMonitoring,
                Recommendation::ExtendWearTime,
            ]
        );
    }

    #[test]
    fn test_period_snapshot() {
        let snapshot = PeriodSnapshot::from_events(&[
            TremorEvent::detection(at(1, 1), 1),
            TremorEvent::detection(at(1, 2), 2),
            TremorEvent::quiet(at(1, 3)),
        ]);
        assert_eq!(snapshot.total_count, 3);
        assert_eq!(snapshot.detected_count, 2);
        assert_eq!(snapshot.avg_severity, 1.5);

        assert_eq!(PeriodSnapshot::from_events(&[]), PeriodSnapshot::default());
    }
}
