//! Time strings and time segments.
//!
//! Segments travel between the converter, the router, and callers as
//! [`SegmentSpec`] values: `{"start": "HH:MM:SS", "end": "HH:MM:SS"}` records,
//! or two-element `["HH:MM:SS", "HH:MM:SS"]` arrays. This module parses and
//! renders those strings.
//!
//! # Example
//!
//! ```
//! use framesift::timecode::{SegmentSpec, normalize_segment, time_to_seconds};
//!
//! assert_eq!(time_to_seconds("00:01:30")?, 90);
//!
//! let segment = SegmentSpec::new("00:00:10", "00:00:25");
//! assert_eq!(normalize_segment(&segment)?, (10, 25));
//! # Ok::<(), framesift::SamplingError>(())
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SamplingError;

/// A time window in wire form, with `HH:MM:SS` bounds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "SegmentShape")]
pub struct SegmentSpec {
    /// Inclusive start, `HH:MM:SS`.
    pub start: String,
    /// Exclusive end, `HH:MM:SS`.
    pub end: String,
}

/// Both accepted JSON shapes of a segment.
#[derive(Deserialize)]
#[serde(untagged)]
enum SegmentShape {
    Pair(String, String),
    Record { start: String, end: String },
}

impl From<SegmentShape> for SegmentSpec {
    fn from(shape: SegmentShape) -> Self {
        match shape {
            SegmentShape::Pair(start, end) | SegmentShape::Record { start, end } => {
                SegmentSpec { start, end }
            }
        }
    }
}

impl SegmentSpec {
    /// Build a segment from two `HH:MM:SS` strings.
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Build a segment from whole-second bounds.
    pub fn from_seconds(start: u64, end: u64) -> Self {
        Self::new(
            format_seconds(start as f64),
            format_seconds(end as f64),
        )
    }
}

impl Display for SegmentSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// A time window produced by the index-to-segment converter.
///
/// `start` and `end` are whole seconds (floored) with `start < end`; a window
/// shorter than a second is widened to one. `duration_seconds` keeps the
/// unrounded length of the window, and `index` is the position of the
/// representative frame the window was built around.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSegment {
    /// Window start in whole seconds.
    pub start: u64,
    /// Window end in whole seconds.
    pub end: u64,
    /// Unrounded window length in seconds.
    pub duration_seconds: f64,
    /// Index of the representative frame this window belongs to.
    pub index: usize,
}

impl TimeSegment {
    /// Convert to the `HH:MM:SS` wire form.
    pub fn to_spec(&self) -> SegmentSpec {
        SegmentSpec::from_seconds(self.start, self.end)
    }
}

/// Parse an `HH:MM:SS` string into whole seconds.
///
/// Each field must be an unsigned integer; fields are not range-checked, so
/// `"1:2:3"` is 3723 seconds and `"0:90:00"` is 5400.
///
/// # Errors
///
/// Returns [`SamplingError::Format`] if the text does not have exactly three
/// colon-separated numeric fields.
pub fn time_to_seconds(text: &str) -> Result<u64, SamplingError> {
    let fields: Vec<&str> = text.trim().split(':').collect();
    if fields.len() != 3 {
        return Err(SamplingError::format(
            text,
            format!("expected HH:MM:SS, found {} field(s)", fields.len()),
        ));
    }

    let mut values = [0_u64; 3];
    for (slot, field) in values.iter_mut().zip(&fields) {
        *slot = field
            .trim()
            .parse::<u64>()
            .map_err(|error| SamplingError::format(text, format!("field {field:?}: {error}")))?;
    }

    let [hours, minutes, seconds] = values;
    Ok(hours * 3600 + minutes * 60 + seconds)
}

/// Render seconds as `HH:MM:SS`, flooring fractional seconds.
///
/// Negative and non-finite inputs render as `00:00:00`. Hours are not wrapped
/// at 24.
pub fn format_seconds(seconds: f64) -> String {
    let whole = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!(
        "{:02}:{:02}:{:02}",
        whole / 3600,
        (whole % 3600) / 60,
        whole % 60
    )
}

/// Normalise a segment to `(start_seconds, end_seconds)`.
///
/// # Errors
///
/// Returns [`SamplingError::Format`] if either bound is malformed.
pub fn normalize_segment(segment: &SegmentSpec) -> Result<(u64, u64), SamplingError> {
    Ok((time_to_seconds(&segment.start)?, time_to_seconds(&segment.end)?))
}

/// Normalise an untyped JSON segment, either `[start, end]` or
/// `{"start": .., "end": ..}`.
///
/// # Errors
///
/// Returns [`SamplingError::Format`] if the value has neither shape or a
/// bound is malformed.
pub fn normalize_segment_value(value: &Value) -> Result<(u64, u64), SamplingError> {
    let bounds = match value {
        Value::Array(items) if items.len() == 2 => items[0].as_str().zip(items[1].as_str()),
        Value::Object(map) => map
            .get("start")
            .and_then(Value::as_str)
            .zip(map.get("end").and_then(Value::as_str)),
        _ => None,
    };

    let (start, end) = bounds.ok_or_else(|| {
        SamplingError::format(
            value.to_string(),
            "expected a [start, end] pair or a {start, end} record",
        )
    })?;
    Ok((time_to_seconds(start)?, time_to_seconds(end)?))
}
