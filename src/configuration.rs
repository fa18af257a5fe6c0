//! Reader and sampler options.
//!
//! [`ReaderOptions`] configures how a [`MediaFile`](crate::MediaFile) decodes
//! frames; [`SamplerOptions`] threads progress reporting and encoder batching
//! through a [`FrameSampler`](crate::FrameSampler) without widening every
//! function signature. Both are plain values owned by the object they
//! configure: there is no process-wide decoder state.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use framesift::{
//!     FrameSampler, LumaGridEncoder, PixelFormat, ProgressCallback, ProgressInfo,
//!     ReaderOptions, SamplerOptions,
//! };
//!
//! struct LogProgress;
//! impl ProgressCallback for LogProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("{:?}: {} done", info.operation, info.current);
//!     }
//! }
//!
//! let reader_options = ReaderOptions::new()
//!     .with_threads(4)
//!     .with_pixel_format(PixelFormat::Rgb8)
//!     .with_resolution(Some(224), None);
//!
//! let sampler = FrameSampler::with_options(
//!     LumaGridEncoder::default(),
//!     SamplerOptions::new()
//!         .with_progress(Arc::new(LogProgress))
//!         .with_encode_batch_size(32),
//! );
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use ffmpeg_next::format::Pixel;

use crate::progress::{NoOpProgress, ProgressCallback};

/// Output pixel format for decoded frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelFormat {
    /// 8-bit RGB (24 bpp). This is the default.
    #[default]
    Rgb8,
    /// 8-bit RGBA with alpha pre-set to 255 (32 bpp).
    Rgba8,
    /// 8-bit grayscale (8 bpp).
    Gray8,
}

impl PixelFormat {
    /// Map to the corresponding FFmpeg pixel format constant.
    pub(crate) fn to_ffmpeg_pixel(self) -> Pixel {
        match self {
            PixelFormat::Rgb8 => Pixel::RGB24,
            PixelFormat::Rgba8 => Pixel::RGBA,
            PixelFormat::Gray8 => Pixel::GRAY8,
        }
    }

    pub(crate) fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
            PixelFormat::Gray8 => 1,
        }
    }
}

/// Pixel format and resolution of decoded frames.
///
/// When no dimensions are set the source resolution is used. Setting one
/// dimension together with
/// [`maintain_aspect_ratio`](FrameOutputOptions::maintain_aspect_ratio)
/// computes the other automatically. Feature encoders rarely need full
/// resolution, so shrinking here saves decode-side memory for large pools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameOutputOptions {
    /// Output pixel format.
    pub pixel_format: PixelFormat,
    /// Target width. `None` keeps the source width.
    pub width: Option<u32>,
    /// Target height. `None` keeps the source height.
    pub height: Option<u32>,
    /// When `true` and only one dimension is specified, the other is
    /// computed to preserve the source aspect ratio.
    pub maintain_aspect_ratio: bool,
}

impl Default for FrameOutputOptions {
    fn default() -> Self {
        Self {
            pixel_format: PixelFormat::Rgb8,
            width: None,
            height: None,
            maintain_aspect_ratio: true,
        }
    }
}

impl FrameOutputOptions {
    /// Resolve the final output dimensions given the source size.
    ///
    /// Returns `(width, height)`.
    pub fn resolve_dimensions(&self, source_width: u32, source_height: u32) -> (u32, u32) {
        match (self.width, self.height) {
            (Some(w), Some(h)) => (w, h),
            (Some(w), None) if self.maintain_aspect_ratio && source_width > 0 => {
                let ratio = w as f64 / source_width as f64;
                let h = (source_height as f64 * ratio).round() as u32;
                (w, h.max(1))
            }
            (Some(w), None) => (w, source_height),
            (None, Some(h)) if self.maintain_aspect_ratio && source_height > 0 => {
                let ratio = h as f64 / source_height as f64;
                let w = (source_width as f64 * ratio).round() as u32;
                (w.max(1), h)
            }
            (None, Some(h)) => (source_width, h),
            (None, None) => (source_width, source_height),
        }
    }
}

/// Decoding settings for a [`MediaFile`](crate::MediaFile).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use]
pub struct ReaderOptions {
    /// Decoder thread count. `None` lets FFmpeg decide.
    pub threads: Option<usize>,
    /// Frame output settings (pixel format, resolution).
    pub frame_output: FrameOutputOptions,
}

impl ReaderOptions {
    /// Create options with FFmpeg's default threading and source-sized RGB
    /// output.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the decoder thread count. Zero restores the FFmpeg default.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = (threads > 0).then_some(threads);
        self
    }

    /// Set the output pixel format for decoded frames.
    pub fn with_pixel_format(mut self, format: PixelFormat) -> Self {
        self.frame_output.pixel_format = format;
        self
    }

    /// Set a custom output resolution for decoded frames.
    ///
    /// Pass `None` for either dimension to keep the source value.
    pub fn with_resolution(mut self, width: Option<u32>, height: Option<u32>) -> Self {
        self.frame_output.width = width;
        self.frame_output.height = height;
        self
    }

    /// Set the complete frame output configuration.
    pub fn with_frame_output(mut self, output: FrameOutputOptions) -> Self {
        self.frame_output = output;
        self
    }
}

/// Default number of images per encoder call.
pub const DEFAULT_ENCODE_BATCH_SIZE: usize = 64;

/// Operational settings for a [`FrameSampler`](crate::FrameSampler).
///
/// All fields have defaults; a default-constructed value reports no progress
/// and encodes in batches of [`DEFAULT_ENCODE_BATCH_SIZE`].
#[derive(Clone)]
#[must_use]
pub struct SamplerOptions {
    /// Progress callback. Defaults to a no-op.
    pub(crate) progress: Arc<dyn ProgressCallback>,
    /// Whether `progress` was set by the caller.
    has_progress: bool,
    /// How often to fire the progress callback (every N items).
    pub(crate) batch_size: u64,
    /// Maximum number of images handed to the encoder at once.
    pub(crate) encode_batch_size: usize,
}

impl Debug for SamplerOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("SamplerOptions")
            .field("has_progress", &self.has_progress)
            .field("batch_size", &self.batch_size)
            .field("encode_batch_size", &self.encode_batch_size)
            .finish()
    }
}

impl Default for SamplerOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl SamplerOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            progress: Arc::new(NoOpProgress),
            has_progress: false,
            batch_size: 1,
            encode_batch_size: DEFAULT_ENCODE_BATCH_SIZE,
        }
    }

    /// Attach a progress callback.
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self.has_progress = true;
        self
    }

    /// Set how often the progress callback fires. Clamped to a minimum of 1.
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Set the maximum encoder batch size. Clamped to a minimum of 1.
    pub fn with_encode_batch_size(mut self, size: usize) -> Self {
        self.encode_batch_size = size.max(1);
        self
    }

    /// The configured encoder batch size.
    pub fn encode_batch_size(&self) -> usize {
        self.encode_batch_size
    }
}
