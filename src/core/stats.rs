//! Scalar statistics over a set of tremor events.
//!
//! All averages are guarded: an empty input never divides by zero, it
//! produces `None` (or 0 for rates and maxima).

use crate::source::TremorEvent;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Decimal places kept for detection rates and percentage deltas.
pub const RATE_DECIMALS: i32 = 1;

/// Decimal places kept for severity and frequency averages.
pub const AVERAGE_DECIMALS: i32 = 2;

/// Decimal places kept for amplitude averages (values are in g).
pub const AMPLITUDE_DECIMALS: i32 = 4;

/// Aggregate statistics for one window of events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowStats {
    /// Number of analysis results in the window
    pub total_count: usize,
    /// Number of results classified as a tremor
    pub detected_count: usize,
    /// `detected_count / total_count * 100`, 0 when empty
    pub detection_rate_pct: f64,
    /// Mean frequency (Hz) over detected events
    pub avg_frequency: Option<f64>,
    /// Mean RMS amplitude (g) over all events carrying one
    pub avg_amplitude: Option<f64>,
    /// Mean severity over detected events
    pub avg_severity: Option<f64>,
    /// Highest severity over all events, 0 when empty
    pub max_severity: u8,
}

/// A half-open `[start, end)` interval with the events inside it.
///
/// Events are kept sorted by timestamp; anything outside the interval is
/// dropped at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationWindow {
    start: NaiveDateTime,
    end: NaiveDateTime,
    events: Vec<TremorEvent>,
}

impl AggregationWindow {
    /// Build a window from an unordered collection of events.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime, events: Vec<TremorEvent>) -> Self {
        let mut window = Self {
            start,
            end,
            events: Vec::with_capacity(events.len()),
        };
        let mut inside: Vec<TremorEvent> = events
            .into_iter()
            .filter(|e| window.contains(e.timestamp))
            .collect();
        inside.sort_by_key(|e| e.timestamp);
        window.events = inside;
        window
    }

    /// Check if a timestamp falls within this window.
    pub fn contains(&self, timestamp: NaiveDateTime) -> bool {
        timestamp >= self.start && timestamp < self.end
    }

    /// Compute statistics over the window's events.
    pub fn stats(&self) -> WindowStats {
        compute_stats(&self.events)
    }
}

/// Compute window statistics from events in any order.
///
/// Frequency is averaged over detected events only, since it is only
/// meaningful for a detected tremor. Amplitude is averaged over every
/// event that reports one.
pub fn compute_stats(events: &[TremorEvent]) -> WindowStats {
    let total_count = events.len();
    let detected: Vec<&TremorEvent> = events.iter().filter(|e| e.detected).collect();
    let detected_count = detected.len();

    let severities: Vec<f64> = detected.iter().map(|e| f64::from(e.severity)).collect();
    let frequencies: Vec<f64> = detected.iter().filter_map(|e| e.frequency).collect();
    let amplitudes: Vec<f64> = events.iter().filter_map(|e| e.rms_amplitude).collect();

    WindowStats {
        total_count,
        detected_count,
        detection_rate_pct: percentage(detected_count, total_count),
        avg_frequency: mean(&frequencies).map(|v| round_to(v, AVERAGE_DECIMALS)),
        avg_amplitude: mean(&amplitudes).map(|v| round_to(v, AMPLITUDE_DECIMALS)),
        avg_severity: mean(&severities).map(|v| round_to(v, AVERAGE_DECIMALS)),
        max_severity: events.iter().map(|e| e.severity).max().unwrap_or(0),
    }
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.mean())
    }
}

/// `part / whole * 100` rounded to one decimal, 0 when `whole` is 0.
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round_to(part as f64 / whole as f64 * 100.0, RATE_DECIMALS)
}

/// Round half away from zero to a fixed number of decimals.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
