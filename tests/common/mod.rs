//! Shared test doubles: a synthetic frame reader and deterministic encoders.
//!
//! Each synthetic frame is a 2×1 grayscale image whose two pixels hold the
//! low and high byte of its frame index, so encoders can recover which frame
//! they were handed without any real video.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use framesift::{BoxError, FeatureEncoder, FrameReader, ProgressCallback, ProgressInfo, SamplingError};
use image::{DynamicImage, GrayImage, Luma};

pub fn frame_image(index: u64) -> DynamicImage {
    let mut image = GrayImage::new(2, 1);
    image.put_pixel(0, 0, Luma([(index & 0xff) as u8]));
    image.put_pixel(1, 0, Luma([((index >> 8) & 0xff) as u8]));
    DynamicImage::ImageLuma8(image)
}

pub fn frame_index(image: &DynamicImage) -> u64 {
    let luma = image.to_luma8();
    u64::from(luma.get_pixel(0, 0).0[0]) | (u64::from(luma.get_pixel(1, 0).0[0]) << 8)
}

/// A reader that synthesises frames on demand and records every request.
pub struct SyntheticReader {
    total_frames: u64,
    fps: f64,
    pub requests: Vec<Vec<u64>>,
}

impl SyntheticReader {
    pub fn new(total_frames: u64, fps: f64) -> Self {
        Self {
            total_frames,
            fps,
            requests: Vec::new(),
        }
    }
}

impl FrameReader for SyntheticReader {
    fn total_frames(&self) -> u64 {
        self.total_frames
    }

    fn native_fps(&self) -> f64 {
        self.fps
    }

    fn frames(&mut self, indices: &[u64]) -> Result<Vec<DynamicImage>, SamplingError> {
        self.requests.push(indices.to_vec());
        indices
            .iter()
            .map(|&index| {
                if index < self.total_frames {
                    Ok(frame_image(index))
                } else {
                    Err(SamplingError::FrameOutOfRange {
                        frame_number: index,
                        total_frames: self.total_frames,
                    })
                }
            })
            .collect()
    }
}

/// Embeds each frame with a caller-supplied function of its index.
pub struct IndexEncoder<F> {
    embed: F,
    pub batch_sizes: Vec<usize>,
}

impl<F: FnMut(u64) -> Vec<f32>> IndexEncoder<F> {
    pub fn new(embed: F) -> Self {
        Self {
            embed,
            batch_sizes: Vec::new(),
        }
    }
}

impl<F: FnMut(u64) -> Vec<f32>> FeatureEncoder for IndexEncoder<F> {
    fn encode(&mut self, images: &[DynamicImage]) -> Result<Vec<Vec<f32>>, BoxError> {
        self.batch_sizes.push(images.len());
        Ok(images
            .iter()
            .map(|image| (self.embed)(frame_index(image)))
            .collect())
    }
}

/// An embedding that repeats with period `period`: frames a multiple of
/// `period` apart are identical, frames half a period apart are orthogonal.
pub fn periodic_embedding(period: u64) -> impl FnMut(u64) -> Vec<f32> {
    move |index| {
        let angle = std::f32::consts::TAU * (index % period) as f32 / period as f32;
        vec![angle.cos(), angle.sin()]
    }
}

/// Fails once it has been called `fail_on_call` times.
pub struct FailingEncoder {
    pub calls: usize,
    pub fail_on_call: usize,
}

impl FeatureEncoder for FailingEncoder {
    fn encode(&mut self, images: &[DynamicImage]) -> Result<Vec<Vec<f32>>, BoxError> {
        self.calls += 1;
        if self.calls == self.fail_on_call {
            return Err("model crashed".into());
        }
        Ok(images.iter().map(|_| vec![1.0, 0.0]).collect())
    }
}

/// Must never be called.
pub struct UnusedEncoder;

impl FeatureEncoder for UnusedEncoder {
    fn encode(&mut self, _images: &[DynamicImage]) -> Result<Vec<Vec<f32>>, BoxError> {
        panic!("encoder should not be called");
    }
}

/// Records every progress snapshot.
#[derive(Default)]
pub struct RecordingProgress {
    pub events: Mutex<Vec<ProgressInfo>>,
}

impl RecordingProgress {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl ProgressCallback for RecordingProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.events.lock().unwrap().push(info.clone());
    }
}
