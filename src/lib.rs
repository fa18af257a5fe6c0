//! # framesift
//!
//! Pick a small, information-dense set of frames from a long video.
//!
//! Downstream multimodal models pay per frame, so `framesift` decides which
//! frames are worth sending. It offers three sampling strategies behind one
//! [`SamplingConfig`]:
//!
//! - **fps**: a fixed frame rate;
//! - **fixed**: a fixed number of evenly spaced frames;
//! - **sfs**: similarity-guided selection, an exact dynamic program that picks
//!   the `K` candidates whose consecutive pairs are least alike.
//!
//! Sampling can be confined to time segments, and [`SegmentRouter`] derives
//! those segments from the answer of an upstream localisation step.
//!
//! ## Quick Start
//!
//! ### Sample a Video File
//!
//! ```no_run
//! use framesift::{FrameReader, FrameSampler, LumaGridEncoder, MediaFile, SamplingConfig};
//!
//! let mut reader = MediaFile::open("input.mp4")?;
//! let config = SamplingConfig::from_json_file("sampling.json")?;
//!
//! let mut sampler = FrameSampler::new(LumaGridEncoder::default());
//! let indices = sampler.sample(&mut reader, &config, &[])?;
//! for (index, frame) in indices.iter().zip(reader.frames(&indices)?) {
//!     frame.save(format!("frame_{index:06}.png"))?;
//! }
//! # Ok::<(), framesift::SamplingError>(())
//! ```
//!
//! ### Sample Around Localised Frames
//!
//! ```no_run
//! use framesift::{MediaFile, SamplingConfig, SegmentRouter, LumaGridEncoder, FpsOptions};
//!
//! let mut reader = MediaFile::open("lecture.mp4")?;
//! let mut router = SegmentRouter::new(LumaGridEncoder::default());
//!
//! // The upstream model saw frames 0, 900, 1800, 2700 and picked the 2nd and 3rd.
//! let routed = router.route(
//!     &mut reader,
//!     "The answer is in images [2, 3]",
//!     &[0, 900, 1800, 2700],
//!     30.0,
//!     &SamplingConfig::Fps(FpsOptions::new(1.0)),
//! )?;
//! println!("{:?} -> {} frames", routed.segments, routed.frames.len());
//! # Ok::<(), framesift::SamplingError>(())
//! ```
//!
//! ### Bring Your Own Encoder
//!
//! SFS compares frames by embedding. Any model can supply them through
//! [`FeatureEncoder`]:
//!
//! ```
//! use framesift::{BoxError, FeatureEncoder};
//! use image::DynamicImage;
//!
//! struct MeanColour;
//!
//! impl FeatureEncoder for MeanColour {
//!     fn encode(&mut self, images: &[DynamicImage]) -> Result<Vec<Vec<f32>>, BoxError> {
//!         Ok(images
//!             .iter()
//!             .map(|image| {
//!                 let rgb = image.to_rgb8();
//!                 let mut sum = [0.0f32; 3];
//!                 for pixel in rgb.pixels() {
//!                     for (channel, value) in sum.iter_mut().zip(pixel.0) {
//!                         *channel += f32::from(value);
//!                     }
//!                 }
//!                 sum.to_vec()
//!             })
//!             .collect())
//!     }
//! }
//! ```
//!
//! ### Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `rayon` | Similarity matrix rows are computed on the rayon thread pool |
//! | `full` | Enables all of the above |
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed to build the
//! [`MediaFile`] reader.

pub mod configuration;
mod conversion;
pub mod encoder;
pub mod error;
pub mod iterator;
pub mod localization;
pub mod media;
pub mod metadata;
pub mod progress;
pub mod reader;
pub mod router;
pub mod sampling;
pub mod sfs;
pub mod similarity;
pub mod timecode;

pub use configuration::{
    DEFAULT_ENCODE_BATCH_SIZE, FrameOutputOptions, PixelFormat, ReaderOptions, SamplerOptions,
};
pub use encoder::{BatchedEncoder, BoxError, FeatureEncoder, LumaGridEncoder};
pub use error::SamplingError;
pub use iterator::FrameIterator;
pub use localization::{ConversionOptions, convert_indices_to_segments};
pub use media::MediaFile;
pub use metadata::{MediaMetadata, VideoMetadata};
pub use progress::{OperationType, ProgressCallback, ProgressInfo};
pub use reader::{FrameReader, ImageSequence};
pub use router::{RoutedSelection, SegmentRouter};
pub use sampling::{FixedOptions, FpsOptions, FrameSampler, SamplingConfig};
pub use sfs::{DiverseSelection, SfsOptions, select_diverse};
pub use similarity::SquareMatrix;
pub use timecode::{SegmentSpec, TimeSegment, format_seconds, normalize_segment, time_to_seconds};
