//! Error types for the `framesift` crate.
//!
//! This module defines [`SamplingError`], the unified error type returned by
//! all fallible operations in the crate. Variants carry the parameter values
//! that caused the failure so callers can diagnose problems without extra
//! logging.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use serde_json::Error as JsonError;
use thiserror::Error;

/// The unified error type for all `framesift` operations.
///
/// Every public method that can fail returns `Result<T, SamplingError>`.
/// Nothing in the crate retries: errors propagate straight to the caller.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SamplingError {
    /// A time string or segment record could not be parsed.
    #[error("Invalid time format {input:?}: {reason}")]
    Format {
        /// The offending input text.
        input: String,
        /// Why parsing failed.
        reason: String,
    },

    /// Sampling parameters are invalid or contradict each other.
    #[error("Invalid sampling configuration: {0}")]
    Config(String),

    /// The selection backtrace recovered fewer frames than requested.
    #[error("Insufficient frames selected: got {selected}, expected {requested}")]
    InsufficientSelection {
        /// Number of frames recovered by the backtrace.
        selected: usize,
        /// Number of frames the selection was asked for.
        requested: usize,
    },

    /// The requested capability is known to be missing.
    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),

    /// The feature encoder failed. No partial results are returned.
    #[error("Feature encoding failed at batch starting at image {batch_start}: {reason}")]
    Encoding {
        /// Offset of the first image in the failing batch.
        batch_start: usize,
        /// Underlying reason reported by the encoder.
        reason: String,
    },

    /// The media file could not be opened.
    #[error("Failed to open media file at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to [`crate::MediaFile::open`].
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The file does not contain a video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// A video frame could not be decoded.
    #[error("Failed to decode video frame: {0}")]
    VideoDecodeError(String),

    /// The requested frame number exceeds the total frame count.
    #[error("Frame {frame_number} is out of range (video has {total_frames} frames)")]
    FrameOutOfRange {
        /// The frame number that was requested.
        frame_number: u64,
        /// The total number of frames in the video.
        total_frames: u64,
    },

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate during frame conversion or saving.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),

    /// A configuration or segment document was not valid JSON.
    #[error("JSON error: {0}")]
    JsonError(#[from] JsonError),
}

impl From<FfmpegError> for SamplingError {
    fn from(error: FfmpegError) -> Self {
        SamplingError::FfmpegError(error.to_string())
    }
}

impl SamplingError {
    pub(crate) fn format(input: impl Into<String>, reason: impl Into<String>) -> Self {
        SamplingError::Format {
            input: input.into(),
            reason: reason.into(),
        }
    }
}
