use std::borrow::Cow;

use super::{FusionEvent, Formatter, iso8601_timestamp};

/// Quote a free-text field if it would break the row
fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

pub struct CsvFormatter;

impl Formatter for CsvFormatter {
    fn format(&self, event: &FusionEvent) -> String {
        match event {
            FusionEvent::Location(fix) => format!(
                "location,{},{:.6},{:.6},{:.1},{:.2},{},,,,",
                iso8601_timestamp(fix.time),
                fix.latitude,
                fix.longitude,
                fix.accuracy,
                fix.speed,
                escape_field(fix.provider.as_deref().unwrap_or(""))
            ),
            FusionEvent::Compass(reading) => format!(
                "compass,{},,,,,,{:.1},{:.1},{:.2},",
                reading.timestamp_ns,
                reading.magnetic_heading.to_degrees(),
                reading.true_heading.to_degrees(),
                reading.declination.to_degrees()
            ),
            FusionEvent::Error(error) => format!("error,,,,,,,,,,{}", error.code()),
        }
    }

    fn header(&self) -> Option<&'static str> {
        Some(
            "event,ts,latitude,longitude,accuracy,speed,provider,magnetic_deg,true_deg,declination_deg,error_code",
        )
    }
}
