//! Loading event sets from files.
//!
//! Accepts a JSON array of events, a JSON export envelope (as written by
//! [`crate::report::export::export_json`]) or a CSV file with the export
//! column layout.

use super::TremorEvent;
use crate::error::SourceError;
use crate::report::export::CsvRow;
use serde::Deserialize;
use std::path::Path;

#[derive(Deserialize)]
#[serde(untagged)]
enum EventFile {
    Events(Vec<TremorEvent>),
    Export { data: Vec<TremorEvent> },
}

/// Load all events from a JSON or CSV file.
///
/// Events with a severity outside 0-4 are rejected rather than clamped.
pub fn load_events(path: &Path) -> Result<Vec<TremorEvent>, SourceError> {
    let is_csv = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);

    let events = if is_csv {
        load_csv(path)?
    } else {
        load_json(path)?
    };

    if let Some(bad) = events.iter().find(|e| !e.has_valid_severity()) {
        return Err(SourceError::InvalidSeverity {
            timestamp: bad.timestamp.to_string(),
            severity: bad.severity,
        });
    }

    tracing::info!("Loaded {} events from {}", events.len(), path.display());
    Ok(events)
}

fn load_json(path: &Path) -> Result<Vec<TremorEvent>, SourceError> {
    let content = std::fs::read_to_string(path).map_err(|e| SourceError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_json(&content)
}

/// Parse events from JSON text.
pub fn parse_json(content: &str) -> Result<Vec<TremorEvent>, SourceError> {
    let file: EventFile =
        serde_json::from_str(content).map_err(|e| SourceError::Parse(e.to_string()))?;
    Ok(match file {
        EventFile::Events(events) => events,
        EventFile::Export { data } => data,
    })
}

fn load_csv(path: &Path) -> Result<Vec<TremorEvent>, SourceError> {
    let reader = csv::Reader::from_path(path).map_err(|e| match e.into_kind() {
        csv::ErrorKind::Io(io) => SourceError::Io {
            path: path.display().to_string(),
            source: io,
        },
        other => SourceError::Parse(format!("{other:?}")),
    })?;
    read_csv(reader)
}

/// Parse events from CSV text with a header row.
pub fn parse_csv(content: &str) -> Result<Vec<TremorEvent>, SourceError> {
    read_csv(csv::Reader::from_reader(content.as_bytes()))
}

fn read_csv<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Vec<TremorEvent>, SourceError> {
    let mut events = Vec::new();
    for row in reader.deserialize::<CsvRow>() {
        let row = row.map_err(|e| SourceError::Parse(e.to_string()))?;
        events.push(TremorEvent::from(row));
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_array() {
        let json = r#"[
            {"timestamp":"2024-03-04T10:00:00","detected":false},
            {"timestamp":"2024-03-04T10:00:05","detected":true,"severity":3,"frequency":5.2}
        ]"#;
        let events = parse_json(json).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].frequency, Some(5.2));
    }

    #[test]
    fn test_parse_json_export_envelope() {
        let json = r#"{
            "export_info": {"total_records": 1},
            "data": [{
                "timestamp": "2024-03-04T10:00:00",
                "device_id": "band-1",
                "detected": true,
                "frequency": 4.8,
                "rms_amplitude": 0.12,
                "peak_amplitude": 0.3,
                "severity": 2,
                "accelerometer": {"x": 0.1, "y": 0.2, "z": 0.98}
            }]
        }"#;
        let events = parse_json(json).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].amplitude, Some(0.3));
        assert_eq!(events[0].device_id, "band-1");
        assert!(events[0].accelerometer.is_some());
    }

    #[test]
    fn test_parse_csv_rows() {
        let csv = "timestamp,device_id,detected,frequency,rms_amplitude,peak_amplitude,severity,accel_x,accel_y,accel_z\n\
                   2024-03-04T10:00:00,band-1,true,5.1,0.1,0.2,2,0.1,0.2,0.9\n\
                   2024-03-04T10:00:10,band-1,false,,,,0,,,\n";
        let events = parse_csv(csv).unwrap();
        assert_eq!(events.len(), 2);
        assert!(events[0].detected);
        assert_eq!(events[0].severity, 2);
        assert!(events[1].frequency.is_none());
        assert!(events[1].accelerometer.is_none());
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = parse_json("{not json").unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
    }
}
