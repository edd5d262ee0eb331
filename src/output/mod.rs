mod csv;
mod json;
mod text;

use chrono::{DateTime, Utc};

pub use self::csv::CsvFormatter;
pub use self::json::JsonFormatter;
pub use self::text::TextFormatter;

use crate::error::LocationError;
use crate::heading::CompassReading;
use crate::location::LocationFix;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

/// Anything a listener can be told about
#[derive(Debug, Clone, PartialEq)]
pub enum FusionEvent {
    Location(LocationFix),
    Compass(CompassReading),
    Error(LocationError),
}

pub trait Formatter: Send {
    fn format(&self, event: &FusionEvent) -> String;

    fn header(&self) -> Option<&'static str> {
        None
    }
}

pub fn create_formatter(format: OutputFormat, verbose: bool) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter::new(verbose)),
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Csv => Box::new(CsvFormatter),
    }
}

pub fn iso8601_timestamp(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fix() -> LocationFix {
        let time = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        LocationFix::new(48.85, 2.35, 8.0, time).with_provider("gps")
    }

    fn compass() -> CompassReading {
        CompassReading {
            timestamp_ns: 1_000,
            magnetic_heading: std::f64::consts::FRAC_PI_2,
            true_heading: std::f64::consts::FRAC_PI_2 + 0.02,
            declination: 0.02,
        }
    }

    #[test]
    fn test_iso8601_timestamp() {
        let time = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        assert_eq!(iso8601_timestamp(time), "2024-05-01T10:00:00.000Z");
    }

    #[test]
    fn test_text_formatter() {
        let formatter = TextFormatter::new(false);
        let line = formatter.format(&FusionEvent::Location(fix()));
        assert!(line.starts_with("Location:"));
        assert!(line.contains("48.850000"));
        assert!(line.contains("gps"));

        let line = formatter.format(&FusionEvent::Compass(compass()));
        assert!(line.contains("90.0°"));

        let line = formatter.format(&FusionEvent::Error(LocationError::GpsOff));
        assert!(line.contains("gps off"));
    }

    #[test]
    fn test_json_formatter() {
        let formatter = JsonFormatter;
        let line = formatter.format(&FusionEvent::Location(fix()));
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["event"], "location");
        assert_eq!(value["provider"], "gps");
        assert_eq!(value["ts"], "2024-05-01T10:00:00.000Z");

        let line = formatter.format(&FusionEvent::Error(LocationError::Denied));
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["event"], "error");
        assert_eq!(value["code"], 2);
    }

    #[test]
    fn test_csv_columns_match_header() {
        let formatter = CsvFormatter;
        let columns = formatter.header().unwrap().split(',').count();
        for event in [
            FusionEvent::Location(fix()),
            FusionEvent::Compass(compass()),
            FusionEvent::Error(LocationError::NotSupported),
        ] {
            assert_eq!(formatter.format(&event).split(',').count(), columns);
        }
    }

    #[test]
    fn test_csv_quotes_provider_with_comma() {
        let fix = LocationFix {
            provider: Some("gps,wifi".to_string()),
            ..fix()
        };
        let line = CsvFormatter.format(&FusionEvent::Location(fix));
        assert!(line.contains(",\"gps,wifi\","));
        assert!(line.ends_with(",,,,"));
    }
}
