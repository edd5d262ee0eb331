//! Recorded input sessions.
//!
//! One JSON object per line, tagged by `type`:
//!
//! ```text
//! {"type":"fix","latitude":48.85,"longitude":2.35,"accuracy":8.0,"time":"2024-05-01T10:00:00Z","provider":"gps"}
//! {"type":"sample","channel":"magnetometer","values":[-3.1,21.0,-40.2],"timestamp_ns":1200000}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{FusionError, Result};
use crate::heading::SensorSample;
use crate::location::LocationFix;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SessionEvent {
    Fix {
        #[serde(flatten)]
        fix: LocationFix,
        /// Local reception time; defaults to the fix's own time
        #[serde(default, skip_serializing_if = "Option::is_none")]
        received_at: Option<DateTime<Utc>>,
    },
    Sample(SensorSample),
}

impl SessionEvent {
    pub fn fix(fix: LocationFix) -> Self {
        Self::Fix {
            fix,
            received_at: None,
        }
    }
}

/// Line-oriented reader over a session stream
pub struct SessionReader<R> {
    reader: R,
    line_number: usize,
    line: String,
}

impl SessionReader<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> SessionReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_number: 0,
            line: String::new(),
        }
    }

    /// Next event, or `None` at end of stream
    pub fn next_event(&mut self) -> Result<Option<SessionEvent>> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let trimmed = self.line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            return serde_json::from_str(trimmed)
                .map(Some)
                .map_err(|e| FusionError::Parse {
                    line: self.line_number,
                    message: e.to_string(),
                });
        }
    }
}

impl<R: BufRead> Iterator for SessionReader<R> {
    type Item = Result<SessionEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event().transpose()
    }
}

/// Append one event as a JSON line
pub fn write_event<W: Write>(writer: &mut W, event: &SessionEvent) -> Result<()> {
    let line =
        serde_json::to_string(event).map_err(|e| FusionError::Session(e.to_string()))?;
    writeln!(writer, "{}", line)?;
    Ok(())
}
