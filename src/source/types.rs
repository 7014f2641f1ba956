//! Tremor event types supplied by the event source.
//!
//! Each event is one on-device analysis result. Frequency and amplitude
//! extraction happen on the wearable; these types only carry the outcome.

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Highest defined severity level (0 = none, 4 = severe).
pub const MAX_SEVERITY: u8 = 4;

/// Number of defined severity levels.
pub const SEVERITY_LEVELS: usize = MAX_SEVERITY as usize + 1;

/// A single raw accelerometer sample attached to an analysis result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// One sensor analysis result, detected or not.
///
/// Timestamps are device-local wall-clock time. Nothing in this crate
/// converts them between timezones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TremorEvent {
    /// When the analysis window closed on the device
    pub timestamp: NaiveDateTime,
    /// Identifier of the wearable that produced the event
    #[serde(default)]
    pub device_id: String,
    /// Whether a tremor was judged present
    pub detected: bool,
    /// Severity level 0-4, always 0 when not detected
    #[serde(default)]
    pub severity: u8,
    /// Dominant frequency in Hz (detected events only)
    #[serde(default)]
    pub frequency: Option<f64>,
    /// Peak amplitude in g
    #[serde(default, alias = "peak_amplitude")]
    pub amplitude: Option<f64>,
    /// RMS amplitude in g
    #[serde(default)]
    pub rms_amplitude: Option<f64>,
    /// Raw axis values at detection time
    #[serde(default)]
    pub accelerometer: Option<AxisSample>,
}

impl TremorEvent {
    /// Create a non-detection event.
    pub fn quiet(timestamp: NaiveDateTime) -> Self {
        Self {
            timestamp,
            device_id: String::new(),
            detected: false,
            severity: 0,
            frequency: None,
            amplitude: None,
            rms_amplitude: None,
            accelerometer: None,
        }
    }

    /// Create a detection event with the given severity.
    pub fn detection(timestamp: NaiveDateTime, severity: u8) -> Self {
        Self {
            detected: true,
            severity,
            ..Self::quiet(timestamp)
        }
    }

    /// Attach a device identifier.
    pub fn with_device(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = device_id.into();
        self
    }

    /// Attach frequency and amplitude measurements.
    pub fn with_measurements(mut self, frequency: f64, amplitude: f64, rms_amplitude: f64) -> Self {
        self.frequency = Some(frequency);
        self.amplitude = Some(amplitude);
        self.rms_amplitude = Some(rms_amplitude);
        self
    }

    /// Hour of day (0-23) as recorded on the timestamp.
    pub fn hour(&self) -> usize {
        self.timestamp.hour() as usize
    }

    /// Whether this is a detected event at severity 3 or 4.
    pub fn is_severe(&self) -> bool {
        self.detected && self.severity >= 3
    }

    /// Check that the severity is one of the five defined levels.
    pub fn has_valid_severity(&self) -> bool {
        self.severity <= MAX_SEVERITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(hour, 15, 0)
            .unwrap()
    }

    #[test]
    fn test_quiet_event_defaults() {
        let event = TremorEvent::quiet(at(9));
        assert!(!event.detected);
        assert_eq!(event.severity, 0);
        assert_eq!(event.frequency, None);
        assert_eq!(event.hour(), 9);
    }

    #[test]
    fn test_severe_requires_detection() {
        assert!(TremorEvent::detection(at(1), 3).is_severe());
        assert!(!TremorEvent::detection(at(1), 2).is_severe());

        let mut event = TremorEvent::quiet(at(1));
        event.severity = 4;
        assert!(!event.is_severe());
    }

    #[test]
    fn test_deserialize_minimal_event() {
        let json = r#"{"timestamp":"2024-03-04T10:00:00","detected":true,"severity":2}"#;
        let event: TremorEvent = serde_json::from_str(json).unwrap();
        assert!(event.detected);
        assert_eq!(event.severity, 2);
        assert!(event.device_id.is_empty());
        assert!(event.accelerometer.is_none());
    }

    #[test]
    fn test_severity_range_check() {
        let mut event = TremorEvent::detection(at(5), 4);
        assert!(event.has_valid_severity());
        event.severity = 5;
        assert!(!event.has_valid_severity());
    }
}
