use serde_json::json;

use super::{FusionEvent, Formatter, iso8601_timestamp};

pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format(&self, event: &FusionEvent) -> String {
        let value = match event {
            FusionEvent::Location(fix) => json!({
                "event": "location",
                "ts": iso8601_timestamp(fix.time),
                "latitude": fix.latitude,
                "longitude": fix.longitude,
                "altitude": fix.altitude,
                "accuracy": fix.accuracy,
                "speed": fix.speed,
                "bearing": fix.bearing,
                "provider": fix.provider,
            }),
            FusionEvent::Compass(reading) => json!({
                "event": "compass",
                "timestamp_ns": reading.timestamp_ns,
                "magnetic_heading": reading.magnetic_heading.to_degrees(),
                "true_heading": reading.true_heading.to_degrees(),
                "declination": reading.declination.to_degrees(),
            }),
            FusionEvent::Error(error) => json!({
                "event": "error",
                "code": error.code(),
                "message": error.to_string(),
            }),
        };
        value.to_string()
    }
}
