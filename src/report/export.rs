//! CSV and JSON export of raw tremor events.
//!
//! Both formats carry the same fields in the same order. CSV is flat with
//! the accelerometer axes as three columns; JSON nests them under one key
//! and wraps the rows in an envelope with generation metadata.

use crate::core::calendar::DateRange;
use crate::error::ExportError;
use crate::source::{AxisSample, TremorEvent};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix of every export filename.
pub const EXPORT_PREFIX: &str = "tremor_data";

/// CSV column order. Written even when there are no rows.
pub const CSV_HEADER: [&str; 10] = [
    "timestamp",
    "device_id",
    "detected",
    "frequency",
    "rms_amplitude",
    "peak_amplitude",
    "severity",
    "accel_x",
    "accel_y",
    "accel_z",
];

/// Export file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Json => "application/json",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(format!("unknown export format '{other}' (expected csv or json)")),
        }
    }
}

/// A finished export ready to hand to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub filename: String,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl ExportFile {
    /// Value for a `Content-Disposition` header.
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename={}", self.filename)
    }
}

/// One flat CSV row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvRow {
    pub timestamp: NaiveDateTime,
    #[serde(default)]
    pub device_id: String,
    pub detected: bool,
    pub frequency: Option<f64>,
    pub rms_amplitude: Option<f64>,
    pub peak_amplitude: Option<f64>,
    #[serde(default)]
    pub severity: u8,
    pub accel_x: Option<f64>,
    pub accel_y: Option<f64>,
    pub accel_z: Option<f64>,
}

impl From<&TremorEvent> for CsvRow {
    fn from(event: &TremorEvent) -> Self {
        Self {
            timestamp: event.timestamp,
            device_id: event.device_id.clone(),
            detected: event.detected,
            frequency: event.frequency,
            rms_amplitude: event.rms_amplitude,
            peak_amplitude: event.amplitude,
            severity: event.severity,
            accel_x: event.accelerometer.map(|a| a.x),
            accel_y: event.accelerometer.map(|a| a.y),
            accel_z: event.accelerometer.map(|a| a.z),
        }
    }
}

impl From<CsvRow> for TremorEvent {
    fn from(row: CsvRow) -> Self {
        let accelerometer = match (row.accel_x, row.accel_y, row.accel_z) {
            (Some(x), Some(y), Some(z)) => Some(AxisSample { x, y, z }),
            _ => None,
        };

        Self {
            timestamp: row.timestamp,
            device_id: row.device_id,
            detected: row.detected,
            severity: row.severity,
            frequency: row.frequency,
            amplitude: row.peak_amplitude,
            rms_amplitude: row.rms_amplitude,
            accelerometer,
        }
    }
}

/// One event in a JSON export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub timestamp: NaiveDateTime,
    pub device_id: String,
    pub detected: bool,
    pub frequency: Option<f64>,
    pub rms_amplitude: Option<f64>,
    pub peak_amplitude: Option<f64>,
    pub severity: u8,
    pub accelerometer: Option<AxisSample>,
}

impl From<&TremorEvent> for ExportRecord {
    fn from(event: &TremorEvent) -> Self {
        Self {
            timestamp: event.timestamp,
            device_id: event.device_id.clone(),
            detected: event.detected,
            frequency: event.frequency,
            rms_amplitude: event.rms_amplitude,
            peak_amplitude: event.amplitude,
            severity: event.severity,
            accelerometer: event.accelerometer,
        }
    }
}

/// Generation metadata of a JSON export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportInfo {
    pub generated_at: DateTime<Utc>,
    pub period_start: NaiveDateTime,
    pub period_end: NaiveDateTime,
    pub total_records: usize,
}

/// The JSON export document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportEnvelope {
    pub export_info: ExportInfo,
    pub data: Vec<ExportRecord>,
}

/// Restrict events to one device (if given) and order them by time.
pub fn prepare_rows(mut events: Vec<TremorEvent>, device_id: Option<&str>) -> Vec<TremorEvent> {
    if let Some(device) = device_id {
        events.retain(|e| e.device_id == device);
    }
    events.sort_by_key(|e| e.timestamp);
    events
}

/// Serialize events as CSV: a header row plus one row per event.
pub fn export_csv(events: &[TremorEvent]) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADER)?;
    for event in events {
        writer.serialize(CsvRow::from(event))?;
    }

    writer
        .into_inner()
        .map_err(|e| ExportError::Buffer(e.to_string()))
}

/// Serialize events as a pretty-printed JSON export envelope.
pub fn export_json(
    range: &DateRange,
    events: &[TremorEvent],
    generated_at: DateTime<Utc>,
) -> Result<Vec<u8>, ExportError> {
    let envelope = ExportEnvelope {
        export_info: ExportInfo {
            generated_at,
            period_start: range.start,
            period_end: range.end,
            total_records: events.len(),
        },
        data: events.iter().map(ExportRecord::from).collect(),
    };

    Ok(serde_json::to_vec_pretty(&envelope)?)
}

/// Filename encoding the requested first and last day:
/// `<prefix>_<YYYYMMDD>_<YYYYMMDD>.<ext>`.
pub fn export_filename(
    prefix: &str,
    first_day: NaiveDate,
    last_day: NaiveDate,
    format: ExportFormat,
) -> String {
    format!(
        "{}_{}_{}.{}",
        prefix,
        first_day.format("%Y%m%d"),
        last_day.format("%Y%m%d"),
        format.extension()
    )
}

/// Build a complete export for the given range and events.
pub fn build_export(
    range: &DateRange,
    events: &[TremorEvent],
    format: ExportFormat,
) -> Result<ExportFile, ExportError> {
    let body = match format {
        ExportFormat::Csv => export_csv(events)?,
        ExportFormat::Json => export_json(range, events, Utc::now())?,
    };

    Ok(ExportFile {
        filename: export_filename(EXPORT_PREFIX, range.first_day(), range.last_day(), format),
        content_type: format.content_type(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 9, 2)
            .unwrap()
            .and_hms_opt(14, minute, 0)
            .unwrap()
    }

    fn sample_events() -> Vec<TremorEvent> {
        let mut with_axes = TremorEvent::detection(at(5), 3)
            .with_device("band-7")
            .with_measurements(5.5, 0.42, 0.31);
        with_axes.accelerometer = Some(AxisSample {
            x: 0.01,
            y: -0.02,
            z: 0.99,
        });

        vec![
            with_axes,
            TremorEvent::quiet(at(1)).with_device("band-7"),
            TremorEvent::quiet(at(3)).with_device("band-9"),
        ]
    }

    fn range() -> DateRange {
        let day = NaiveDate::from_ymd_opt(2024, 9, 2).unwrap();
        DateRange::from_days(day, day).unwrap()
    }

    #[test]
    fn test_csv_has_header_even_when_empty() {
        let body = String::from_utf8(export_csv(&[]).unwrap()).unwrap();
        assert_eq!(body.lines().count(), 1);
        assert_eq!(body.lines().next(), Some(CSV_HEADER.join(",").as_str()));
    }

    #[test]
    fn test_csv_row_per_event() {
        let events = prepare_rows(sample_events(), None);
        let body = String::from_utf8(export_csv(&events).unwrap()).unwrap();
        let lines: Vec<&str> = body.lines().collect();

        assert_eq!(lines.len(), events.len() + 1);
        assert!(lines[1].starts_with("2024-09-02T14:01:00,band-7,false"));
        assert_eq!(
            lines[3],
            "2024-09-02T14:05:00,band-7,true,5.5,0.31,0.42,3,0.01,-0.02,0.99"
        );
    }

    #[test]
    fn test_prepare_rows_filters_device_and_sorts() {
        let rows = prepare_rows(sample_events(), Some("band-7"));
        assert_eq!(rows.len(), 2);
        assert!(rows[0].timestamp < rows[1].timestamp);
    }

    #[test]
    fn test_json_envelope() {
        let events = prepare_rows(sample_events(), None);
        let body = export_json(&range(), &events, Utc::now()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(value["export_info"]["total_records"], 3);
        assert_eq!(value["export_info"]["period_start"], "2024-09-02T00:00:00");
        assert_eq!(value["export_info"]["period_end"], "2024-09-03T00:00:00");
        assert_eq!(value["data"].as_array().map(Vec::len), Some(3));
        assert_eq!(value["data"][2]["accelerometer"]["z"], 0.99);
        assert_eq!(value["data"][2]["peak_amplitude"], 0.42);
        assert!(value["data"][0]["accelerometer"].is_null());
    }

    #[test]
    fn test_filename_encodes_days() {
        let first = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let last = NaiveDate::from_ymd_opt(2024, 1, 11).unwrap();
        assert_eq!(
            export_filename(EXPORT_PREFIX, first, last, ExportFormat::Csv),
            "tremor_data_20240105_20240111.csv"
        );
    }

    #[test]
    fn test_build_export_sets_metadata() {
        let export = build_export(&range(), &[], ExportFormat::Json).unwrap();
        assert_eq!(export.filename, "tremor_data_20240902_20240902.json");
        assert_eq!(export.content_type, "application/json");
        assert_eq!(
            export.content_disposition(),
            "attachment; filename=tremor_data_20240902_20240902.json"
        );
    }

    #[test]
    fn test_csv_row_converts_back_to_event() {
        let original = &sample_events()[0];
        let event = TremorEvent::from(CsvRow::from(original));
        assert_eq!(&event, original);
    }
}
