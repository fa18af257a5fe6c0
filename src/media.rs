//! FFmpeg-backed [`FrameReader`].
//!
//! [`MediaFile`] owns one demuxer context and the options it decodes with.
//! Nothing is shared between readers: two files opened with different thread
//! counts or output formats decode independently.

use std::{
    collections::HashMap,
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    time::Duration,
};

use ffmpeg_next::{codec::context::Context as CodecContext, format::context::Input, media::Type};
use image::DynamicImage;

use crate::{
    configuration::ReaderOptions,
    conversion::estimate_frame_count,
    error::SamplingError,
    iterator::FrameIterator,
    metadata::{MediaMetadata, VideoMetadata},
    reader::FrameReader,
};

/// A video file opened for frame reading.
///
/// # Example
///
/// ```no_run
/// use framesift::{FrameReader, MediaFile, SamplingError};
///
/// let mut reader = MediaFile::open("input.mp4")?;
/// println!("{} frames at {} fps", reader.total_frames(), reader.native_fps());
/// let frames = reader.frames(&[0, 100, 200])?;
/// frames[0].save("first.png")?;
/// # Ok::<(), SamplingError>(())
/// ```
pub struct MediaFile {
    /// The opened FFmpeg input (demuxer) context.
    pub(crate) input_context: Input,
    /// Cached metadata extracted at open time.
    pub(crate) metadata: MediaMetadata,
    /// Decoding settings for this reader.
    pub(crate) options: ReaderOptions,
    file_path: PathBuf,
}

impl Debug for MediaFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("MediaFile")
            .field("metadata", &self.metadata)
            .field("options", &self.options)
            .field("file_path", &self.file_path)
            .finish_non_exhaustive()
    }
}

impl MediaFile {
    /// Open a media file with default [`ReaderOptions`].
    ///
    /// # Errors
    ///
    /// [`SamplingError::FileOpen`] if the file cannot be opened, or
    /// [`SamplingError::NoVideoStream`] if it has no video stream.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SamplingError> {
        Self::open_with_options(path, ReaderOptions::default())
    }

    /// Open a media file, decoding with `options`.
    ///
    /// Initializes FFmpeg (idempotent), opens the file, locates the best
    /// video stream and caches its metadata.
    ///
    /// # Errors
    ///
    /// As for [`open`](MediaFile::open).
    pub fn open_with_options<P: AsRef<Path>>(
        path: P,
        options: ReaderOptions,
    ) -> Result<Self, SamplingError> {
        let file_path = path.as_ref().to_path_buf();
        log::debug!("Opening media file: {}", file_path.display());

        ffmpeg_next::init().map_err(|error| SamplingError::FileOpen {
            path: file_path.clone(),
            reason: format!("FFmpeg initialisation failed: {error}"),
        })?;

        let input_context =
            ffmpeg_next::format::input(&file_path).map_err(|error| SamplingError::FileOpen {
                path: file_path.clone(),
                reason: error.to_string(),
            })?;

        let metadata = read_metadata(&input_context, &file_path)?;
        log::debug!(
            "Video stream {}: {}x{} {} at {:.3} fps, {} frames",
            metadata.video.stream_index,
            metadata.video.width,
            metadata.video.height,
            metadata.video.codec,
            metadata.video.frames_per_second,
            metadata.video.frame_count
        );

        Ok(Self {
            input_context,
            metadata,
            options,
            file_path,
        })
    }

    /// Metadata cached at open time.
    pub fn metadata(&self) -> &MediaMetadata {
        &self.metadata
    }

    /// The options this reader decodes with.
    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    /// Lazily decode `frame_numbers` in ascending order.
    ///
    /// Duplicates are removed and the list is sorted first.
    ///
    /// # Errors
    ///
    /// [`SamplingError::FrameOutOfRange`] for a frame at or past the frame
    /// count, or any error setting up the decoder.
    pub fn frame_iter(&mut self, frame_numbers: &[u64]) -> Result<FrameIterator<'_>, SamplingError> {
        let mut targets = frame_numbers.to_vec();
        targets.sort_unstable();
        targets.dedup();

        let total_frames = self.metadata.video.frame_count;
        if let Some(&last) = targets.last() {
            if last >= total_frames {
                return Err(SamplingError::FrameOutOfRange {
                    frame_number: last,
                    total_frames,
                });
            }
        }

        FrameIterator::new(self, targets)
    }
}

impl FrameReader for MediaFile {
    fn total_frames(&self) -> u64 {
        self.metadata.video.frame_count
    }

    fn native_fps(&self) -> f64 {
        self.metadata.video.frames_per_second
    }

    fn frames(&mut self, indices: &[u64]) -> Result<Vec<DynamicImage>, SamplingError> {
        log::debug!("Decoding {} frames from {}", indices.len(), self.file_path.display());

        let mut decoded: HashMap<u64, DynamicImage> = HashMap::with_capacity(indices.len());
        for item in self.frame_iter(indices)? {
            let (frame_number, image) = item?;
            decoded.insert(frame_number, image);
        }

        indices
            .iter()
            .map(|index| {
                decoded.get(index).cloned().ok_or_else(|| {
                    SamplingError::VideoDecodeError(format!(
                        "Frame {index} could not be decoded before end of stream"
                    ))
                })
            })
            .collect()
    }
}

fn read_metadata(input_context: &Input, file_path: &Path) -> Result<MediaMetadata, SamplingError> {
    let stream = input_context
        .streams()
        .best(Type::Video)
        .ok_or(SamplingError::NoVideoStream)?;
    let stream_index = stream.index();

    let duration_microseconds = input_context.duration();
    let duration = if duration_microseconds > 0 {
        Duration::from_micros(duration_microseconds as u64)
    } else {
        Duration::ZERO
    };

    let decoder = CodecContext::from_parameters(stream.parameters())
        .and_then(|context| context.decoder().video())
        .map_err(|error| SamplingError::FileOpen {
            path: file_path.to_path_buf(),
            reason: format!("Failed to create video decoder for stream {stream_index}: {error}"),
        })?;

    let frame_rate = stream.avg_frame_rate();
    let frames_per_second = if frame_rate.denominator() != 0 && frame_rate.numerator() > 0 {
        frame_rate.numerator() as f64 / frame_rate.denominator() as f64
    } else {
        let rate = stream.rate();
        if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        }
    };

    let frame_count = match stream.frames() {
        count if count > 0 => count as u64,
        _ => estimate_frame_count(duration.as_secs_f64(), frames_per_second),
    };

    let codec = decoder
        .codec()
        .map(|codec| codec.name().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    Ok(MediaMetadata {
        video: VideoMetadata {
            width: decoder.width(),
            height: decoder.height(),
            frames_per_second,
            frame_count,
            codec,
            stream_index,
        },
        duration,
        format: input_context.format().name().to_string(),
    })
}
