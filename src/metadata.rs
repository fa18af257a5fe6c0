//! Media metadata types.
//!
//! Metadata is read once when a [`MediaFile`](crate::MediaFile) is opened and
//! cached for the lifetime of the reader.

use std::time::Duration;

/// Metadata for an opened media file.
///
/// # Example
///
/// ```no_run
/// use framesift::MediaFile;
///
/// let reader = MediaFile::open("input.mp4").unwrap();
/// let metadata = reader.metadata();
/// println!("Duration: {:?}", metadata.duration);
/// println!("Format: {}", metadata.format);
/// ```
#[derive(Debug, Clone)]
#[must_use]
pub struct MediaMetadata {
    /// The video stream frames are decoded from.
    pub video: VideoMetadata,
    /// Total duration of the media file.
    pub duration: Duration,
    /// Container format name (e.g. `"mp4"`, `"matroska"`, `"avi"`).
    pub format: String,
}

/// Metadata for a video stream.
#[derive(Debug, Clone)]
#[must_use]
pub struct VideoMetadata {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frames per second (may be approximate for variable-frame-rate content).
    pub frames_per_second: f64,
    /// Total number of frames; the container's count when it reports one,
    /// otherwise estimated from duration and frame rate.
    pub frame_count: u64,
    /// Codec name (e.g. `"h264"`, `"vp9"`, `"av1"`).
    pub codec: String,
    /// Index of the stream within the container.
    pub stream_index: usize,
}
