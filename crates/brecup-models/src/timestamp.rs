//! Clip timestamp parsing and validation.
//!
//! Record clip bounds are handed to ffmpeg verbatim (`-ss`/`-to`), so the
//! original strings are kept; parsing exists to reject bad ranges before any
//! device is ever claimed. Supported forms: `HH:MM:SS[.mmm]`, `MM:SS[.mmm]`
//! and `SS[.mmm]`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while parsing a clip bound.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimestampError {
    #[error("Timestamp cannot be empty")]
    Empty,

    #[error("Timestamp cannot be negative: {0}")]
    Negative(String),

    #[error("Invalid {component} value in '{value}'")]
    InvalidValue {
        component: &'static str,
        value: String,
    },

    #[error("Invalid timestamp format '{0}'. Use HH:MM:SS, MM:SS or SS (optionally with .mmm)")]
    InvalidFormat(String),

    #[error("Clip start '{start}' is not before clip end '{end}'")]
    StartNotBeforeEnd { start: String, end: String },
}

/// Parse a timestamp string to total seconds.
///
/// # Examples
/// ```
/// use brecup_models::timestamp::parse_timestamp;
/// assert_eq!(parse_timestamp("01:30:00").unwrap(), 5400.0);
/// assert_eq!(parse_timestamp("05:30").unwrap(), 330.0);
/// assert_eq!(parse_timestamp("90").unwrap(), 90.0);
/// ```
pub fn parse_timestamp(ts: &str) -> Result<f64, TimestampError> {
    let ts = ts.trim();
    if ts.is_empty() {
        return Err(TimestampError::Empty);
    }

    let parts: Vec<&str> = ts.split(':').collect();
    if parts.len() > 3 {
        return Err(TimestampError::InvalidFormat(ts.to_string()));
    }

    // Components are read right-to-left: seconds, minutes, hours.
    const COMPONENTS: [(&str, f64); 3] = [("seconds", 1.0), ("minutes", 60.0), ("hours", 3600.0)];

    let mut total = 0.0;
    for (part, (component, scale)) in parts.iter().rev().zip(COMPONENTS) {
        let value: f64 = part.parse().map_err(|_| TimestampError::InvalidValue {
            component,
            value: ts.to_string(),
        })?;
        if value < 0.0 {
            return Err(TimestampError::Negative(ts.to_string()));
        }
        // `f64::from_str` also takes `nan`, `inf` and exponents.
        if !value.is_finite() || !part.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
            return Err(TimestampError::InvalidValue {
                component,
                value: ts.to_string(),
            });
        }
        total += value * scale;
    }

    Ok(total)
}

/// Format seconds into `HH:MM:SS` or `HH:MM:SS.mmm`.
pub fn format_seconds(total_secs: f64) -> String {
    let hours = (total_secs / 3600.0).floor() as u32;
    let mins = ((total_secs % 3600.0) / 60.0).floor() as u32;
    let secs = total_secs % 60.0;

    if (secs - secs.floor()).abs() > 0.0001 {
        format!("{:02}:{:02}:{:06.3}", hours, mins, secs)
    } else {
        format!("{:02}:{:02}:{:02}", hours, mins, secs.floor() as u32)
    }
}

/// A validated `[start, end)` clip window of a source video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipRange {
    /// Start bound as written in the config (passed to `-ss`)
    pub start: String,
    /// End bound as written in the config (passed to `-to`)
    pub end: String,
    pub start_secs: f64,
    pub end_secs: f64,
}

impl ClipRange {
    /// Parse and validate a clip window. Start must be strictly before end.
    pub fn parse(start: &str, end: &str) -> Result<Self, TimestampError> {
        let start_secs = parse_timestamp(start)?;
        let end_secs = parse_timestamp(end)?;

        if start_secs >= end_secs {
            return Err(TimestampError::StartNotBeforeEnd {
                start: start.to_string(),
                end: end.to_string(),
            });
        }

        Ok(Self {
            start: start.trim().to_string(),
            end: end.trim().to_string(),
            start_secs,
            end_secs,
        })
    }

    /// Clip length in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.end_secs - self.start_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp_hh_mm_ss() {
        assert_eq!(parse_timestamp("00:00:00").unwrap(), 0.0);
        assert_eq!(parse_timestamp("01:00:00").unwrap(), 3600.0);
        assert_eq!(parse_timestamp("01:30:45").unwrap(), 5445.0);
    }

    #[test]
    fn test_parse_timestamp_short_forms() {
        assert_eq!(parse_timestamp("05:30").unwrap(), 330.0);
        assert_eq!(parse_timestamp("90").unwrap(), 90.0);
        assert!((parse_timestamp("00:00:30.500").unwrap() - 30.5).abs() < 0.001);
    }

    #[test]
    fn test_parse_timestamp_errors() {
        assert_eq!(parse_timestamp("  "), Err(TimestampError::Empty));
        assert!(matches!(parse_timestamp("abc"), Err(TimestampError::InvalidValue { .. })));
        assert!(matches!(parse_timestamp("1:2:3:4"), Err(TimestampError::InvalidFormat(_))));
        assert!(matches!(parse_timestamp("-5"), Err(TimestampError::Negative(_))));
    }

    #[test]
    fn test_parse_timestamp_rejects_non_numeric_floats() {
        for ts in ["nan", "NaN", "inf", "infinity", "1e3", "00:1e1", "+5"] {
            assert!(
                matches!(parse_timestamp(ts), Err(TimestampError::InvalidValue { .. })),
                "{ts} should be rejected"
            );
        }
        assert!(ClipRange::parse("nan", "10").is_err());
        assert!(ClipRange::parse("0", "inf").is_err());
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(0.0), "00:00:00");
        assert_eq!(format_seconds(3661.0), "01:01:01");
        assert_eq!(format_seconds(30.5), "00:00:30.500");
    }

    #[test]
    fn test_clip_range_keeps_original_bounds() {
        let clip = ClipRange::parse("1:00:00", " 01:20:00 ").unwrap();
        assert_eq!(clip.start, "1:00:00");
        assert_eq!(clip.end, "01:20:00");
        assert_eq!(clip.duration_secs(), 1200.0);
    }

    #[test]
    fn test_clip_range_rejects_inverted_window() {
        let result = ClipRange::parse("00:02:00", "00:01:00");
        assert!(matches!(result, Err(TimestampError::StartNotBeforeEnd { .. })));

        let empty = ClipRange::parse("00:01:00", "60");
        assert!(matches!(empty, Err(TimestampError::StartNotBeforeEnd { .. })));
    }
}
