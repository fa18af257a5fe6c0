//! The frame sampling engine.
//!
//! [`FrameSampler`] turns a [`SamplingConfig`] into a list of frame indices
//! for a [`FrameReader`]. Three strategies are available:
//!
//! - **fps**: every `native / target`-th frame;
//! - **fixed**: a fixed number of evenly spaced frames;
//! - **sfs**: a diverse subset chosen by [`crate::sfs`].
//!
//! With a non-empty segment list, fps and fixed sampling draw from the
//! frames inside the segments instead of the whole video. SFS has no
//! segment-restricted form and refuses segments outright.
//!
//! # Example
//!
//! ```
//! use framesift::{FrameSampler, ImageSequence, LumaGridEncoder, SamplingConfig};
//! use image::DynamicImage;
//!
//! let mut reader = ImageSequence::new(vec![DynamicImage::new_rgb8(8, 8); 100], 25.0);
//! let config = SamplingConfig::from_json_str(r#"{"strategy": "fixed", "fixed_config": {"num_frames": 5}}"#)?;
//!
//! let mut sampler = FrameSampler::new(LumaGridEncoder::default());
//! let indices = sampler.sample(&mut reader, &config, &[])?;
//! assert_eq!(indices, vec![0, 25, 50, 74, 99]);
//! # Ok::<(), framesift::SamplingError>(())
//! ```

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::configuration::SamplerOptions;
use crate::encoder::{BatchedEncoder, FeatureEncoder};
use crate::error::SamplingError;
use crate::reader::FrameReader;
use crate::sfs::{SfsOptions, sample_sfs};
use crate::timecode::{SegmentSpec, normalize_segment};

/// Parameters of the fps strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[must_use]
pub struct FpsOptions {
    /// Target rate in frames per second. Default: 1.
    pub fps: f64,
}

impl Default for FpsOptions {
    fn default() -> Self {
        Self { fps: 1.0 }
    }
}

impl FpsOptions {
    /// Sample at `fps` frames per second.
    pub fn new(fps: f64) -> Self {
        Self { fps }
    }
}

/// Parameters of the fixed strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[must_use]
pub struct FixedOptions {
    /// Number of frames to return. Default: 8.
    pub num_frames: usize,
}

impl Default for FixedOptions {
    fn default() -> Self {
        Self { num_frames: 8 }
    }
}

impl FixedOptions {
    /// Sample `num_frames` frames.
    pub fn new(num_frames: usize) -> Self {
        Self { num_frames }
    }
}

/// A sampling strategy together with its parameters.
///
/// The JSON form carries a `strategy` tag (also accepted as
/// `sampling_strategy`, default `"fixed"`) next to one object per strategy:
///
/// ```json
/// {
///   "strategy": "sfs",
///   "fps_config": {"fps": 1.0},
///   "fixed_config": {"num_frames": 8},
///   "sfs_config": {"num_frames": 16, "initial_frames": 128, "length_penalty": 0.5}
/// }
/// ```
///
/// Only the object matching the tag is read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSamplingConfig", into = "RawSamplingConfig")]
pub enum SamplingConfig {
    /// Fixed frame rate.
    Fps(FpsOptions),
    /// Fixed frame count.
    Fixed(FixedOptions),
    /// Similarity-guided selection.
    Sfs(SfsOptions),
}

impl Default for SamplingConfig {
    fn default() -> Self {
        SamplingConfig::Fixed(FixedOptions::default())
    }
}

impl SamplingConfig {
    /// Parse the JSON form.
    ///
    /// # Errors
    ///
    /// [`SamplingError::JsonError`] for malformed JSON,
    /// [`SamplingError::Config`] for an unknown strategy or invalid SFS
    /// parameters.
    pub fn from_json_str(text: &str) -> Result<Self, SamplingError> {
        let raw: RawSamplingConfig = serde_json::from_str(text)?;
        Self::try_from(raw)
    }

    /// Read and parse a JSON configuration file.
    ///
    /// # Errors
    ///
    /// As [`from_json_str`](SamplingConfig::from_json_str), plus
    /// [`SamplingError::IoError`] if the file cannot be read.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, SamplingError> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// The strategy tag, as written in JSON.
    pub fn strategy_name(&self) -> &'static str {
        match self {
            SamplingConfig::Fps(_) => "fps",
            SamplingConfig::Fixed(_) => "fixed",
            SamplingConfig::Sfs(_) => "sfs",
        }
    }
}

/// Wire form of [`SamplingConfig`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct RawSamplingConfig {
    #[serde(alias = "sampling_strategy", skip_serializing_if = "Option::is_none")]
    strategy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fps_config: Option<FpsOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fixed_config: Option<FixedOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sfs_config: Option<SfsOptions>,
}

impl TryFrom<RawSamplingConfig> for SamplingConfig {
    type Error = SamplingError;

    fn try_from(raw: RawSamplingConfig) -> Result<Self, Self::Error> {
        let strategy = raw.strategy.as_deref().unwrap_or("fixed");
        match strategy {
            "fps" => Ok(SamplingConfig::Fps(raw.fps_config.unwrap_or_default())),
            "fixed" => Ok(SamplingConfig::Fixed(raw.fixed_config.unwrap_or_default())),
            "sfs" => {
                let options = raw.sfs_config.unwrap_or_default();
                options.validate()?;
                Ok(SamplingConfig::Sfs(options))
            }
            other => Err(SamplingError::Config(format!(
                "unknown sampling strategy {other:?} (expected fps, fixed or sfs)"
            ))),
        }
    }
}

impl From<SamplingConfig> for RawSamplingConfig {
    fn from(config: SamplingConfig) -> Self {
        let mut raw = RawSamplingConfig {
            strategy: Some(config.strategy_name().to_string()),
            ..RawSamplingConfig::default()
        };
        match config {
            SamplingConfig::Fps(options) => raw.fps_config = Some(options),
            SamplingConfig::Fixed(options) => raw.fixed_config = Some(options),
            SamplingConfig::Sfs(options) => raw.sfs_config = Some(options),
        }
        raw
    }
}

/// `count` positions spread evenly over `0..len`, both ends included and
/// rounded to the nearest position.
pub(crate) fn evenly_spaced(len: u64, count: u64) -> Vec<u64> {
    match (len, count) {
        (0, _) | (_, 0) => Vec::new(),
        (_, 1) => vec![0],
        _ => {
            let last = (len - 1) as f64;
            let intervals = (count - 1) as f64;
            (0..count)
                .map(|k| (k as f64 * last / intervals).round() as u64)
                .collect()
        }
    }
}

fn fps_step(native_fps: f64, target_fps: f64) -> Result<usize, SamplingError> {
    if !(target_fps.is_finite() && target_fps > 0.0) {
        return Err(SamplingError::Config(format!(
            "target fps must be positive, got {target_fps}"
        )));
    }
    let step = (native_fps / target_fps).floor();
    if step.is_nan() || step < 1.0 {
        return Err(SamplingError::Config(format!(
            "target fps {target_fps} exceeds the native rate {native_fps}"
        )));
    }
    Ok(step as usize)
}

/// Every `floor(native_fps / target_fps)`-th frame of the video, from 0.
///
/// # Errors
///
/// [`SamplingError::Config`] if `target_fps` is not positive or exceeds
/// `native_fps`.
pub fn fps_indices(
    total_frames: u64,
    native_fps: f64,
    target_fps: f64,
) -> Result<Vec<u64>, SamplingError> {
    let step = fps_step(native_fps, target_fps)?;
    Ok((0..total_frames).step_by(step).collect())
}

/// Every `floor(native_fps / target_fps)`-th element of `pool`.
///
/// # Errors
///
/// As [`fps_indices`].
pub fn fps_indices_in_pool(
    pool: &[u64],
    native_fps: f64,
    target_fps: f64,
) -> Result<Vec<u64>, SamplingError> {
    let step = fps_step(native_fps, target_fps)?;
    Ok(pool.iter().step_by(step).copied().collect())
}

/// `count` evenly spaced frames over the whole video, including the first
/// and last frame when `count >= 2`.
///
/// # Errors
///
/// [`SamplingError::Config`] if `count > total_frames`.
pub fn fixed_indices(total_frames: u64, count: usize) -> Result<Vec<u64>, SamplingError> {
    if count as u64 > total_frames {
        return Err(SamplingError::Config(format!(
            "cannot sample {count} frames from a video of {total_frames}"
        )));
    }
    Ok(evenly_spaced(total_frames, count as u64))
}

/// `count` evenly spaced elements of `pool`. A pool smaller than `count` is
/// returned whole.
pub fn fixed_indices_in_pool(pool: &[u64], count: usize) -> Vec<u64> {
    if pool.len() < count {
        log::warn!(
            "Segments cover {} frames, fewer than the {count} requested; returning all of them",
            pool.len()
        );
        return pool.to_vec();
    }
    evenly_spaced(pool.len() as u64, count as u64)
        .into_iter()
        .map(|position| pool[position as usize])
        .collect()
}

/// The frames covered by `segments`: the sorted, deduplicated union of
/// `floor(start · fps) .. floor(end · fps)`, clipped to the video.
///
/// # Errors
///
/// [`SamplingError::Format`] for a segment with malformed bounds.
pub fn segment_frame_pool(
    segments: &[SegmentSpec],
    native_fps: f64,
    total_frames: u64,
) -> Result<Vec<u64>, SamplingError> {
    let mut pool = Vec::new();
    for segment in segments {
        let (start, end) = normalize_segment(segment)?;
        let first = ((start as f64 * native_fps).floor() as u64).min(total_frames);
        let last = ((end as f64 * native_fps).floor() as u64).min(total_frames);
        log::trace!("Segment {segment} covers frames {first}..{last}");
        pool.extend(first..last);
    }
    pool.sort_unstable();
    pool.dedup();
    Ok(pool)
}

/// Samples frame indices from a [`FrameReader`].
///
/// The sampler owns the feature encoder used by SFS; fps and fixed sampling
/// never touch it. A sampler can be reused across readers.
#[derive(Debug)]
pub struct FrameSampler<E> {
    encoder: BatchedEncoder<E>,
    options: SamplerOptions,
}

impl<E: FeatureEncoder> FrameSampler<E> {
    /// Create a sampler with default [`SamplerOptions`].
    pub fn new(encoder: E) -> Self {
        Self::with_options(encoder, SamplerOptions::default())
    }

    /// Create a sampler with explicit options.
    pub fn with_options(encoder: E, options: SamplerOptions) -> Self {
        Self {
            encoder: BatchedEncoder::with_batch_size(encoder, options.encode_batch_size()),
            options,
        }
    }

    /// The sampler's options.
    pub fn options(&self) -> &SamplerOptions {
        &self.options
    }

    /// Unwrap the feature encoder.
    pub fn into_encoder(self) -> E {
        self.encoder.into_inner()
    }

    /// Choose frame indices from `reader` according to `config`.
    ///
    /// An empty `segments` slice samples the whole video. The result is
    /// sorted ascending and free of duplicates.
    ///
    /// # Errors
    ///
    /// - [`SamplingError::Config`] for invalid parameters.
    /// - [`SamplingError::Format`] for malformed segments.
    /// - [`SamplingError::NotImplemented`] for SFS with segments.
    /// - Any reader or encoder error raised by SFS.
    pub fn sample<R: FrameReader + ?Sized>(
        &mut self,
        reader: &mut R,
        config: &SamplingConfig,
        segments: &[SegmentSpec],
    ) -> Result<Vec<u64>, SamplingError> {
        let total_frames = reader.total_frames();
        let native_fps = reader.native_fps();
        log::debug!(
            "Sampling with {} strategy ({total_frames} frames at {native_fps} fps, {} segments)",
            config.strategy_name(),
            segments.len()
        );

        let indices = match config {
            SamplingConfig::Sfs(_) if !segments.is_empty() => {
                return Err(SamplingError::NotImplemented(
                    "SFS sampling restricted to segments",
                ));
            }
            SamplingConfig::Sfs(options) => {
                sample_sfs(reader, &mut self.encoder, options, &self.options)?
            }
            SamplingConfig::Fps(options) if segments.is_empty() => {
                fps_indices(total_frames, native_fps, options.fps)?
            }
            SamplingConfig::Fps(options) => {
                let pool = segment_frame_pool(segments, native_fps, total_frames)?;
                fps_indices_in_pool(&pool, native_fps, options.fps)?
            }
            SamplingConfig::Fixed(options) if segments.is_empty() => {
                fixed_indices(total_frames, options.num_frames)?
            }
            SamplingConfig::Fixed(options) => {
                let pool = segment_frame_pool(segments, native_fps, total_frames)?;
                fixed_indices_in_pool(&pool, options.num_frames)
            }
        };

        log::debug!("Sampled {} frames", indices.len());
        Ok(indices)
    }
}
