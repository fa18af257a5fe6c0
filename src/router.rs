//! Segment-aware sampling.
//!
//! [`SegmentRouter`] chains the index-to-segment converter with a
//! [`FrameSampler`]: an upstream answer naming some representative frames
//! becomes a set of time windows, and sampling is confined to them.
//!
//! # Example
//!
//! ```
//! use framesift::{FixedOptions, ImageSequence, LumaGridEncoder, SamplingConfig, SegmentRouter};
//! use framesift::localization::ConversionOptions;
//! use image::DynamicImage;
//!
//! // 40 seconds at 1 fps, representative frames every 10 seconds.
//! let mut reader = ImageSequence::new(vec![DynamicImage::new_rgb8(4, 4); 40], 1.0);
//! let mut router = SegmentRouter::new(LumaGridEncoder::default())
//!     .with_conversion(ConversionOptions::new().with_min_side_length(0.0));
//!
//! let config = SamplingConfig::Fixed(FixedOptions::new(3));
//! let routed = router.route(&mut reader, "Image [3]", &[0, 10, 20, 30], 1.0, &config)?;
//! assert_eq!(routed.segments.len(), 1);
//! assert_eq!(routed.frames, vec![15, 20, 24]);
//! # Ok::<(), framesift::SamplingError>(())
//! ```

use serde::Serialize;

use crate::configuration::SamplerOptions;
use crate::encoder::FeatureEncoder;
use crate::error::SamplingError;
use crate::localization::{ConversionOptions, convert_indices_to_segments};
use crate::reader::FrameReader;
use crate::sampling::{FrameSampler, SamplingConfig};
use crate::timecode::SegmentSpec;

/// Frames chosen by a [`SegmentRouter`], with the segments they came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutedSelection {
    /// The segments sampling was restricted to. Empty for whole-video
    /// sampling.
    pub segments: Vec<SegmentSpec>,
    /// Chosen frame indices, ascending.
    pub frames: Vec<u64>,
}

/// Routes upstream selections through segment conversion into sampling.
#[derive(Debug)]
pub struct SegmentRouter<E> {
    sampler: FrameSampler<E>,
    conversion: ConversionOptions,
}

impl<E: FeatureEncoder> SegmentRouter<E> {
    /// Create a router with default sampler and conversion options.
    pub fn new(encoder: E) -> Self {
        Self::from_sampler(FrameSampler::new(encoder))
    }

    /// Create a router with explicit sampler options.
    pub fn with_options(encoder: E, options: SamplerOptions) -> Self {
        Self::from_sampler(FrameSampler::with_options(encoder, options))
    }

    /// Wrap an existing sampler.
    pub fn from_sampler(sampler: FrameSampler<E>) -> Self {
        Self {
            sampler,
            conversion: ConversionOptions::default(),
        }
    }

    /// Set the segment conversion options.
    #[must_use]
    pub fn with_conversion(mut self, conversion: ConversionOptions) -> Self {
        self.conversion = conversion;
        self
    }

    /// The segment conversion options.
    pub fn conversion(&self) -> &ConversionOptions {
        &self.conversion
    }

    /// The wrapped sampler.
    pub fn sampler(&self) -> &FrameSampler<E> {
        &self.sampler
    }

    /// Convert `phase1_result` into segments and sample inside them.
    ///
    /// `frame_indices` are the representative frames the upstream answer
    /// refers to (1-based), numbered at `fps` frames per second. Pass
    /// [`FrameReader::native_fps`] when they are `reader`'s own frames.
    ///
    /// # Errors
    ///
    /// As [`FrameSampler::sample`]. Segmented SFS always fails with
    /// [`SamplingError::NotImplemented`].
    pub fn route<R: FrameReader + ?Sized>(
        &mut self,
        reader: &mut R,
        phase1_result: &str,
        frame_indices: &[u64],
        fps: f64,
        config: &SamplingConfig,
    ) -> Result<RoutedSelection, SamplingError> {
        let segments =
            convert_indices_to_segments(phase1_result, frame_indices, fps, &self.conversion);
        log::debug!(
            "Routing {} strategy through {} segments",
            config.strategy_name(),
            segments.len()
        );
        self.sample(reader, config, segments)
    }

    /// Sample inside explicit `segments`. An empty list samples the whole
    /// video.
    ///
    /// # Errors
    ///
    /// As [`FrameSampler::sample`].
    pub fn sample<R: FrameReader + ?Sized>(
        &mut self,
        reader: &mut R,
        config: &SamplingConfig,
        segments: Vec<SegmentSpec>,
    ) -> Result<RoutedSelection, SamplingError> {
        let frames = self.sampler.sample(reader, config, &segments)?;
        Ok(RoutedSelection { segments, frames })
    }
}
