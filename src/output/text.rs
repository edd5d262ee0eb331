use super::{FusionEvent, Formatter, iso8601_timestamp};

pub struct TextFormatter {
    verbose: bool,
}

impl TextFormatter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl Formatter for TextFormatter {
    fn format(&self, event: &FusionEvent) -> String {
        match event {
            FusionEvent::Location(fix) => {
                let provider = fix.provider.as_deref().unwrap_or("-");
                if self.verbose {
                    let bearing = fix.bearing.map_or("-".to_string(), |b| format!("{:.1}°", b));
                    format!(
                        "Location: {:>10.6}, {:>11.6} ±{:.1} m ({}) [{} alt: {:.1} m, speed: {:.1} m/s, bearing: {}]",
                        fix.latitude,
                        fix.longitude,
                        fix.accuracy,
                        provider,
                        iso8601_timestamp(fix.time),
                        fix.altitude,
                        fix.speed,
                        bearing
                    )
                } else {
                    format!(
                        "Location: {:>10.6}, {:>11.6} ±{:.1} m ({})",
                        fix.latitude, fix.longitude, fix.accuracy, provider
                    )
                }
            }
            FusionEvent::Compass(reading) => {
                if self.verbose {
                    format!(
                        "Compass: magnetic {:>5.1}° true {:>5.1}° [decl: {:+.2}°, t: {} ns]",
                        reading.magnetic_heading.to_degrees(),
                        reading.true_heading.to_degrees(),
                        reading.declination.to_degrees(),
                        reading.timestamp_ns
                    )
                } else {
                    format!(
                        "Compass: magnetic {:>5.1}° true {:>5.1}°",
                        reading.magnetic_heading.to_degrees(),
                        reading.true_heading.to_degrees()
                    )
                }
            }
            FusionEvent::Error(error) => format!("Error: {}", error),
        }
    }
}
