//! Period-over-period trend classification.
//!
//! Two aggregates are compared through hysteresis bands (±10% for
//! severity, ±20% for detection volume) so small fluctuations do not flip
//! the label. On top of the labels, fixed rules derive clinical
//! observations and recommendations.

use crate::core::stats::{round_to, WindowStats, RATE_DECIMALS};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Relative band for severity changes.
pub const SEVERITY_BAND: f64 = 0.1;

/// Relative band for detection-volume changes.
pub const VOLUME_BAND: f64 = 0.2;

/// More severe episodes than this triggers a clinician recommendation.
pub const SEVERE_EPISODE_THRESHOLD: usize = 5;

/// Average severity above this triggers a monitoring recommendation.
pub const HIGH_SEVERITY_THRESHOLD: f64 = 2.0;

/// Fewer events per day than this suggests the device is worn too little.
pub const MIN_EVENTS_PER_DAY: usize = 10;

/// Direction of tremor severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityTrend {
    Improving,
    Stable,
    Worsening,
}

impl SeverityTrend {
    /// Classify `current` against `baseline` with the severity band.
    pub fn classify(current: f64, baseline: f64) -> Self {
        if current > baseline * (1.0 + SEVERITY_BAND) {
            SeverityTrend::Worsening
        } else if current < baseline * (1.0 - SEVERITY_BAND) {
            SeverityTrend::Improving
        } else {
            SeverityTrend::Stable
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityTrend::Improving => "improving",
            SeverityTrend::Stable => "stable",
            SeverityTrend::Worsening => "worsening",
        }
    }
}

impl fmt::Display for SeverityTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of detection volume (how often tremors occur, not Hz).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeTrend {
    Increasing,
    Stable,
    Decreasing,
}

impl VolumeTrend {
    /// Classify detected counts. A previous count of zero gives no ratio
    /// to compare against and is reported as stable.
    pub fn classify(current: usize, previous: usize) -> Self {
        if previous == 0 {
            return VolumeTrend::Stable;
        }

        let current = current as f64;
        let previous = previous as f64;
        if current > previous * (1.0 + VOLUME_BAND) {
            VolumeTrend::Increasing
        } else if current < previous * (1.0 - VOLUME_BAND) {
            VolumeTrend::Decreasing
        } else {
            VolumeTrend::Stable
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VolumeTrend::Increasing => "increasing",
            VolumeTrend::Stable => "stable",
            VolumeTrend::Decreasing => "decreasing",
        }
    }
}

impl fmt::Display for VolumeTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison of two adjacent periods of comparable length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodComparison {
    pub current: WindowStats,
    pub previous: WindowStats,
    pub severity_trend: SeverityTrend,
    pub frequency_trend: VolumeTrend,
    /// Change in detected count, percent
    pub detected_change_pct: f64,
    /// Change in average severity, percent
    pub severity_change_pct: f64,
}

/// Compare the current period against the previous one.
pub fn compare_periods(current: WindowStats, previous: WindowStats) -> PeriodComparison {
    let current_severity = current.avg_severity.unwrap_or(0.0);
    let previous_severity = previous.avg_severity.unwrap_or(0.0);

    // Without a previous severity there is no meaningful ratio
    let severity_trend = if previous_severity > 0.0 {
        SeverityTrend::classify(current_severity, previous_severity)
    } else {
        SeverityTrend::Stable
    };
    let frequency_trend = VolumeTrend::classify(current.detected_count, previous.detected_count);

    PeriodComparison {
        detected_change_pct: percent_change(
            current.detected_count as f64,
            previous.detected_count as f64,
        ),
        severity_change_pct: percent_change(current_severity, previous_severity),
        severity_trend,
        frequency_trend,
        current,
        previous,
    }
}

/// `(current - previous) / previous * 100` rounded to one decimal, 0 when
/// `previous` is 0.
pub fn percent_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    round_to((current - previous) / previous * 100.0, RATE_DECIMALS)
}

/// A rule-derived clinical observation. At most one per rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    Severity(SeverityTrend),
    Frequency(VolumeTrend),
    SevereEpisodes { count: usize, days: i64 },
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Observation::Severity(SeverityTrend::Worsening) => {
                write!(f, "Tremor severity is trending upward; close attention is advised")
            }
            Observation::Severity(SeverityTrend::Improving) => {
                write!(f, "Tremor severity has improved")
            }
            Observation::Severity(SeverityTrend::Stable) => {
                write!(f, "Tremor severity is stable")
            }
            Observation::Frequency(VolumeTrend::Increasing) => {
                write!(f, "Tremor episodes are occurring more often")
            }
            Observation::Frequency(VolumeTrend::Decreasing) => {
                write!(f, "Tremor episodes are occurring less often")
            }
            Observation::Frequency(VolumeTrend::Stable) => {
                write!(f, "Tremor episode frequency is stable")
            }
            Observation::SevereEpisodes { count, days } => write!(
                f,
                "{count} severe tremor episodes (level 3-4) in the past {days} days"
            ),
        }
    }
}

impl Serialize for Observation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A rule-derived recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recommendation {
    ConsultClinician,
    IncreaseMonitoring,
    ExtendWearTime,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Recommendation::ConsultClinician => {
                "Discuss the medication plan with the attending clinician"
            }
            Recommendation::IncreaseMonitoring => "Increase monitoring frequency",
            Recommendation::ExtendWearTime => {
                "Wear the device longer each day for more accurate data"
            }
        })
    }
}

impl Serialize for Recommendation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Observations and recommendations for one comparison.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Assessment {
    pub observations: Vec<Observation>,
    pub recommendations: Vec<Recommendation>,
}

/// Evaluate the observation and recommendation rules.
///
/// Every rule is evaluated independently; any combination may fire.
/// `severe_episodes` counts detected events at severity 3 or above in the
/// current period.
pub fn assess(
    comparison: &PeriodComparison,
    severe_episodes: usize,
    period_days: i64,
) -> Assessment {
    let mut observations = Vec::new();
    if comparison.severity_trend != SeverityTrend::Stable {
        observations.push(Observation::Severity(comparison.severity_trend));
    }
    if comparison.frequency_trend != VolumeTrend::Stable {
        observations.push(Observation::Frequency(comparison.frequency_trend));
    }
    if severe_episodes > 0 {
        observations.push(Observation::SevereEpisodes {
            count: severe_episodes,
            days: period_days,
        });
    }

    let mut recommendations = Vec::new();
    if comparison.severity_trend == SeverityTrend::Worsening
        || severe_episodes > SEVERE_EPISODE_THRESHOLD
    {
        recommendations.push(Recommendation::ConsultClinician);
    }
    if comparison.current.avg_severity.unwrap_or(0.0) > HIGH_SEVERITY_THRESHOLD {
        recommendations.push(Recommendation::IncreaseMonitoring);
    }
    let expected_events = period_days.max(0) as usize * MIN_EVENTS_PER_DAY;
    if comparison.current.total_count < expected_events {
        recommendations.push(Recommendation::ExtendWearTime);
    }

    Assessment {
        observations,
        recommendations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(total: usize, detected: usize, avg_severity: Option<f64>) -> WindowStats {
        WindowStats {
            total_count: total,
            detected_count: detected,
            avg_severity,
            ..WindowStats::default()
        }
    }

    #[test]
    fn test_severity_worsening_above_band() {
        let comparison = compare_periods(stats(100, 10, Some(3.5)), stats(100, 10, Some(3.0)));
        assert_eq!(comparison.severity_trend, SeverityTrend::Worsening);
        assert_eq!(comparison.severity_change_pct, 16.7);
    }

    #[test]
    fn test_severity_within_band_is_stable() {
        let comparison = compare_periods(stats(100, 10, Some(3.2)), stats(100, 10, Some(3.0)));
        assert_eq!(comparison.severity_trend, SeverityTrend::Stable);

        let comparison = compare_periods(stats(100, 10, Some(2.0)), stats(100, 10, Some(3.0)));
        assert_eq!(comparison.severity_trend, SeverityTrend::Improving);
    }

    #[test]
    fn test_missing_previous_severity_is_stable() {
        let comparison = compare_periods(stats(50, 5, Some(3.0)), stats(50, 0, None));
        assert_eq!(comparison.severity_trend, SeverityTrend::Stable);
        assert_eq!(comparison.severity_change_pct, 0.0);
    }

    #[test]
    fn test_zero_previous_detections_guarded() {
        let comparison = compare_periods(stats(50, 5, Some(1.0)), stats(50, 0, None));
        assert_eq!(comparison.detected_change_pct, 0.0);
        assert_eq!(comparison.frequency_trend, VolumeTrend::Stable);
        assert!(comparison.detected_change_pct.is_finite());
    }

    #[test]
    fn test_volume_bands() {
        assert_eq!(VolumeTrend::classify(13, 10), VolumeTrend::Increasing);
        assert_eq!(VolumeTrend::classify(12, 10), VolumeTrend::Stable);
        assert_eq!(VolumeTrend::classify(7, 10), VolumeTrend::Decreasing);
        assert_eq!(VolumeTrend::classify(8, 10), VolumeTrend::Stable);
    }

    #[test]
    fn test_percent_change() {
        assert_eq!(percent_change(15.0, 10.0), 50.0);
        assert_eq!(percent_change(5.0, 0.0), 0.0);
        assert_eq!(percent_change(0.0, 4.0), -100.0);
    }

    #[test]
    fn test_assess_all_rules_fire() {
        let comparison = compare_periods(stats(20, 15, Some(3.5)), stats(200, 10, Some(2.0)));
        let assessment = assess(&comparison, 8, 7);

        assert_eq!(
            assessment.observations,
            vec![
                Observation::Severity(SeverityTrend::Worsening),
                Observation::Frequency(VolumeTrend::Increasing),
                Observation::SevereEpisodes { count: 8, days: 7 },
            ]
        );
        assert_eq!(
            assessment.recommendations,
            vec![
                Recommendation::ConsultClinician,
                Recommendation::IncreaseMonitoring,
                Recommendation::ExtendWearTime,
            ]
        );
    }

    #[test]
    fn test_assess_quiet_period() {
        let comparison = compare_periods(stats(100, 10, Some(1.0)), stats(100, 10, Some(1.0)));
        let assessment = assess(&comparison, 0, 7);
        assert!(assessment.observations.is_empty());
        assert!(assessment.recommendations.is_empty());
    }

    #[test]
    fn test_severe_episodes_alone_recommend_clinician() {
        let comparison = compare_periods(stats(100, 10, Some(1.5)), stats(100, 10, Some(1.5)));
        let assessment = assess(&comparison, 6, 7);
        assert_eq!(assessment.recommendations, vec![Recommendation::ConsultClinician]);

        let assessment = assess(&comparison, 5, 7);
        assert!(assessment.recommendations.is_empty());
        assert_eq!(assessment.observations.len(), 1);
    }

    #[test]
    fn test_observation_messages() {
        let obs = Observation::SevereEpisodes { count: 3, days: 7 };
        assert_eq!(
            obs.to_string(),
            "3 severe tremor episodes (level 3-4) in the past 7 days"
        );
        let json = serde_json::to_string(&vec![obs]).unwrap();
        assert!(json.contains("level 3-4"));
        assert_eq!(
            serde_json::to_string(&SeverityTrend::Worsening).unwrap(),
            "\"worsening\""
        );
    }
}
