//! Internal conversion helpers.
//!
//! Pixel-data copying and timestamp arithmetic shared by the FFmpeg-backed
//! reader.

use ffmpeg_next::{Rational, frame::Video as VideoFrame};

/// Copy pixel data from an FFmpeg video frame into a tightly-packed buffer.
///
/// FFmpeg frames frequently carry per-row padding (stride > width × bpp).
/// `bytes_per_pixel` is 3 for RGB24, 4 for RGBA, 1 for GRAY8.
pub(crate) fn frame_to_buffer(
    video_frame: &VideoFrame,
    width: u32,
    height: u32,
    bytes_per_pixel: usize,
) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let expected_stride = (width as usize) * bytes_per_pixel;
    let data = video_frame.data(0);

    if stride == expected_stride {
        data[..expected_stride * (height as usize)].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(expected_stride * (height as usize));
        for row in 0..(height as usize) {
            let row_start = row * stride;
            buffer.extend_from_slice(&data[row_start..row_start + expected_stride]);
        }
        buffer
    }
}

/// Rescale a PTS value from stream time base to seconds.
pub(crate) fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64
}

/// Rescale a PTS value to a frame number. Negative timestamps clamp to 0.
pub(crate) fn pts_to_frame_number(pts: i64, time_base: Rational, frames_per_second: f64) -> u64 {
    let seconds = pts_to_seconds(pts, time_base).max(0.0);
    (seconds * frames_per_second).round() as u64
}

/// Convert a frame number to a container seek timestamp in AV_TIME_BASE
/// (microseconds), as expected by `Input::seek`.
pub(crate) fn frame_number_to_seek_timestamp(frame_number: u64, frames_per_second: f64) -> i64 {
    let seconds = frame_number as f64 / frames_per_second;
    (seconds * 1_000_000.0) as i64
}

/// Estimate a frame count from a duration and frame rate.
pub(crate) fn estimate_frame_count(duration_seconds: f64, frames_per_second: f64) -> u64 {
    if frames_per_second > 0.0 && duration_seconds > 0.0 {
        (duration_seconds * frames_per_second) as u64
    } else {
        0
    }
}
