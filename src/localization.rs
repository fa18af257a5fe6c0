//! Index-to-segment conversion.
//!
//! An upstream localisation step looks at a handful of representative frames
//! and answers with the (1-based) numbers of the ones that matter, usually as
//! free text such as `"Images [2, 3, 7] show the recipe"`. This module turns
//! that answer back into time windows around the chosen frames, merging
//! neighbours and capping the total duration.
//!
//! # Example
//!
//! ```
//! use framesift::localization::{ConversionOptions, convert_indices_to_segments};
//!
//! let options = ConversionOptions::new().with_min_side_length(0.0);
//! let segments = convert_indices_to_segments("[1, 2]", &[0, 10, 20, 30], 1.0, &options);
//! assert_eq!(segments.len(), 1);
//! assert_eq!(segments[0].start, "00:00:00");
//! assert_eq!(segments[0].end, "00:00:15");
//! ```

use std::sync::LazyLock;

use regex::Regex;

use crate::timecode::{SegmentSpec, TimeSegment};

static BRACKETED_LIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(.*?)\]").expect("static regex"));
static DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\s*,\s*\d+)*").expect("static regex"));

/// Tuning for [`convert_indices_to_segments`].
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct ConversionOptions {
    /// Upper bound on the summed duration of the picked windows, in minutes.
    /// Default: 60.
    pub max_duration_minutes: f64,
    /// Minimum extent of a window on each side of its frame, in seconds.
    /// Default: 30.
    pub min_side_length_seconds: f64,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            max_duration_minutes: 60.0,
            min_side_length_seconds: 30.0,
        }
    }
}

impl ConversionOptions {
    /// Create options with the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the total duration cap in minutes.
    pub fn with_max_duration_minutes(mut self, minutes: f64) -> Self {
        self.max_duration_minutes = minutes;
        self
    }

    /// Set the minimum window extent on each side of a frame, in seconds.
    pub fn with_min_side_length(mut self, seconds: f64) -> Self {
        self.min_side_length_seconds = seconds.max(0.0);
        self
    }
}

/// A candidate window before it is rounded for output.
#[derive(Debug, Clone, Copy)]
struct Window {
    start: f64,
    end: f64,
    index: usize,
}

impl Window {
    fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Floor to whole seconds. A window shorter than a second would collapse
    /// to `start == end`, so it is widened to one second.
    fn to_time_segment(self) -> TimeSegment {
        let start = self.start.max(0.0).floor() as u64;
        let end = (self.end.max(0.0).floor() as u64).max(start + 1);
        TimeSegment {
            start,
            end,
            duration_seconds: self.duration(),
            index: self.index,
        }
    }
}

/// The segment returned when there are too few representative frames to
/// build windows from.
pub fn default_segment() -> SegmentSpec {
    SegmentSpec::new("00:00:00", "00:01:00")
}

/// Build the neighbourhood window of every representative frame.
///
/// Window `i` spans at least the midpoints to its neighbours and at least
/// `min_side_length_seconds` on each side of the frame, clipped to the first
/// and last boundary. Returns an empty list when fewer than two frames are
/// given or `fps` is not positive.
pub fn candidate_windows(
    frame_indices: &[u64],
    fps: f64,
    options: &ConversionOptions,
) -> Vec<TimeSegment> {
    build_windows(frame_indices, fps, options.min_side_length_seconds)
        .into_iter()
        .map(Window::to_time_segment)
        .collect()
}

fn build_windows(frame_indices: &[u64], fps: f64, min_side: f64) -> Vec<Window> {
    if frame_indices.len() < 2 || !(fps > 0.0) {
        return Vec::new();
    }

    let timestamps: Vec<f64> = frame_indices
        .iter()
        .map(|&index| index as f64 / fps)
        .collect();

    let midpoints: Vec<f64> = timestamps
        .windows(2)
        .map(|pair| (pair[0] + pair[1]) / 2.0)
        .collect();
    let last_timestamp = timestamps[timestamps.len() - 1];
    let last_midpoint = midpoints[midpoints.len() - 1];

    let mut boundaries = Vec::with_capacity(timestamps.len() + 1);
    boundaries.push(0.0);
    boundaries.extend_from_slice(&midpoints);
    boundaries.push(last_timestamp + (last_timestamp - last_midpoint));
    let outer_end = boundaries[boundaries.len() - 1];

    timestamps
        .iter()
        .enumerate()
        .map(|(index, &timestamp)| Window {
            start: boundaries[index].min(timestamp - min_side).max(0.0),
            end: (timestamp + min_side).max(boundaries[index + 1]).min(outer_end),
            index,
        })
        .collect()
}

/// Extract 0-based indices from upstream text.
///
/// Prefers the first bracketed list, otherwise the first comma-separated run
/// of digits. Returns `None` when nothing parseable is found. The result is
/// sorted and deduplicated. A `0` has no 0-based counterpart and maps to
/// `usize::MAX`, which the converter then drops as out of range.
pub fn parse_requested_indices(text: &str) -> Option<Vec<usize>> {
    let cleaned = text.replace("image", "").replace("Image", "");

    let numbers = match BRACKETED_LIST.captures(&cleaned) {
        Some(captures) => captures.get(1)?.as_str().to_string(),
        None => DIGIT_RUN.find(&cleaned)?.as_str().to_string(),
    };

    let mut indices = Vec::new();
    for token in numbers.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let one_based = token.parse::<usize>().ok()?;
        indices.push(one_based.checked_sub(1).unwrap_or(usize::MAX));
    }

    indices.sort_unstable();
    indices.dedup();
    Some(indices)
}

/// Convert an upstream index selection into merged time segments.
///
/// `frame_indices` are the representative frames shown to the upstream step
/// (in the reader's frame numbering) and `fps` their frame rate. See the
/// module docs for the overall flow; fallbacks are:
///
/// - fewer than two representative frames: [`default_segment`];
/// - unparseable text or no indices: the first window alone;
/// - nothing fits the duration cap: the first window alone.
///
/// Indices beyond the representative set are skipped without error. The
/// duration cap counts time covered, so overlapping windows are not charged
/// twice. The result is disjoint, ordered by start, and every segment spans
/// at least one second.
pub fn convert_indices_to_segments(
    phase1_result: &str,
    frame_indices: &[u64],
    fps: f64,
    options: &ConversionOptions,
) -> Vec<SegmentSpec> {
    log::debug!(
        "Converting indices to segments (frames={}, fps={}, max_minutes={}, min_side={})",
        frame_indices.len(),
        fps,
        options.max_duration_minutes,
        options.min_side_length_seconds
    );

    let windows = build_windows(frame_indices, fps, options.min_side_length_seconds);
    let Some(&first_window) = windows.first() else {
        log::warn!(
            "Fewer than two representative frames ({}), using the default segment",
            frame_indices.len()
        );
        return vec![default_segment()];
    };
    let fallback = || vec![first_window.to_time_segment().to_spec()];

    let requested = match parse_requested_indices(phase1_result) {
        Some(indices) if !indices.is_empty() => indices,
        _ => {
            log::warn!("No indices found in {phase1_result:?}, using the first window");
            return fallback();
        }
    };

    let cap_seconds = options.max_duration_minutes * 60.0;
    let mut picked: Vec<Window> = Vec::new();
    let mut accumulated = 0.0;
    let mut covered_until = 0.0_f64;
    for index in requested {
        let Some(window) = windows.get(index) else {
            log::trace!("Skipping out-of-range index {index}");
            continue;
        };
        // Windows come in ascending order, so only the part past the
        // previous end adds new time.
        let fresh = (window.end - window.start.max(covered_until)).max(0.0);
        if accumulated + fresh > cap_seconds {
            break;
        }
        accumulated += fresh;
        covered_until = covered_until.max(window.end);
        picked.push(*window);
    }

    if picked.is_empty() {
        log::warn!("No window fits within {cap_seconds}s, using the first window");
        return fallback();
    }

    whole_second_segments(&merge_windows(&picked))
        .iter()
        .map(TimeSegment::to_spec)
        .collect()
}

/// Merge windows of neighbouring representative frames, and any windows whose
/// time ranges overlap or touch. `picked` must be ordered by start.
fn merge_windows(picked: &[Window]) -> Vec<Window> {
    let mut merged = Vec::new();
    let mut active = picked[0];

    for next in &picked[1..] {
        if next.index.abs_diff(active.index) == 1 || next.start <= active.end {
            active.end = active.end.max(next.end);
            active.index = next.index;
        } else {
            merged.push(active);
            active = *next;
        }
    }
    merged.push(active);
    merged
}

/// Floor merged windows to whole seconds. Flooring and widening can make
/// neighbours overlap again; those are coalesced so the result stays
/// disjoint and ordered.
fn whole_second_segments(windows: &[Window]) -> Vec<TimeSegment> {
    let mut segments: Vec<TimeSegment> = Vec::with_capacity(windows.len());
    for segment in windows.iter().map(|window| window.to_time_segment()) {
        match segments.last_mut() {
            Some(last) if segment.start < last.end => {
                last.end = last.end.max(segment.end);
                last.duration_seconds = (last.end - last.start) as f64;
                last.index = segment.index;
            }
            _ => segments.push(segment),
        }
    }
    segments
}
