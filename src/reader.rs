//! The frame reader seam.
//!
//! Samplers never decode video themselves; they ask a [`FrameReader`] for the
//! frame count, the native frame rate, and a batch of decoded frames by
//! index. [`MediaFile`](crate::MediaFile) implements it on top of FFmpeg and
//! [`ImageSequence`] wraps frames that are already in memory.

use image::DynamicImage;

use crate::error::SamplingError;

/// A source of decoded video frames addressed by 0-based frame index.
///
/// Readers are borrowed mutably for the whole of a sampling call, so a
/// single reader is never driven by two operations at once.
pub trait FrameReader {
    /// Total number of frames in the video.
    fn total_frames(&self) -> u64;

    /// Native frame rate in frames per second.
    fn native_fps(&self) -> f64;

    /// Decode the frames at `indices`.
    ///
    /// The result has one image per requested index, in request order;
    /// repeated indices yield repeated images.
    ///
    /// # Errors
    ///
    /// [`SamplingError::FrameOutOfRange`] for an index at or past
    /// [`total_frames`](FrameReader::total_frames), or any decoding error.
    fn frames(&mut self, indices: &[u64]) -> Result<Vec<DynamicImage>, SamplingError>;
}

impl<R: FrameReader + ?Sized> FrameReader for &mut R {
    fn total_frames(&self) -> u64 {
        (**self).total_frames()
    }

    fn native_fps(&self) -> f64 {
        (**self).native_fps()
    }

    fn frames(&mut self, indices: &[u64]) -> Result<Vec<DynamicImage>, SamplingError> {
        (**self).frames(indices)
    }
}

/// An in-memory frame reader over already-decoded images.
///
/// # Example
///
/// ```
/// use framesift::{FrameReader, ImageSequence};
/// use image::DynamicImage;
///
/// let frames = vec![DynamicImage::new_rgb8(4, 4); 10];
/// let mut reader = ImageSequence::new(frames, 25.0);
/// assert_eq!(reader.total_frames(), 10);
/// assert_eq!(reader.frames(&[0, 9])?.len(), 2);
/// # Ok::<(), framesift::SamplingError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ImageSequence {
    frames: Vec<DynamicImage>,
    frames_per_second: f64,
}

impl ImageSequence {
    /// Wrap `frames`, played back at `frames_per_second`.
    pub fn new(frames: Vec<DynamicImage>, frames_per_second: f64) -> Self {
        Self {
            frames,
            frames_per_second,
        }
    }

    /// The wrapped frames.
    pub fn images(&self) -> &[DynamicImage] {
        &self.frames
    }
}

impl FrameReader for ImageSequence {
    fn total_frames(&self) -> u64 {
        self.frames.len() as u64
    }

    fn native_fps(&self) -> f64 {
        self.frames_per_second
    }

    fn frames(&mut self, indices: &[u64]) -> Result<Vec<DynamicImage>, SamplingError> {
        indices
            .iter()
            .map(|&index| {
                usize::try_from(index)
                    .ok()
                    .and_then(|i| self.frames.get(i))
                    .cloned()
                    .ok_or(SamplingError::FrameOutOfRange {
                        frame_number: index,
                        total_frames: self.frames.len() as u64,
                    })
            })
            .collect()
    }
}
