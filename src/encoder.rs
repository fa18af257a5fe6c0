//! Feature encoding.
//!
//! SFS compares frames by embedding, not by pixels. The embedding model is an
//! external collaborator behind [`FeatureEncoder`]; [`BatchedEncoder`] feeds
//! it bounded batches and checks what comes back. [`LumaGridEncoder`] is a
//! small built-in encoder (a downscaled grayscale thumbnail) that is good
//! enough to separate visually distinct shots without a neural network.

use std::error::Error as StdError;

use image::{DynamicImage, imageops::FilterType};

use crate::configuration::DEFAULT_ENCODE_BATCH_SIZE;
use crate::error::SamplingError;

/// Error type returned by encoder implementations.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Maps a batch of images to fixed-width embedding vectors.
///
/// Implementations must return exactly one vector per input image, in input
/// order, all of the same length.
pub trait FeatureEncoder {
    /// Encode `images`.
    fn encode(&mut self, images: &[DynamicImage]) -> Result<Vec<Vec<f32>>, BoxError>;
}

impl<E: FeatureEncoder + ?Sized> FeatureEncoder for Box<E> {
    fn encode(&mut self, images: &[DynamicImage]) -> Result<Vec<Vec<f32>>, BoxError> {
        (**self).encode(images)
    }
}

/// Splits encoder input into bounded batches.
///
/// Results from all batches are concatenated in order. A failing batch, a
/// batch with the wrong number of vectors, or a width mismatch between
/// vectors aborts the whole call with [`SamplingError::Encoding`].
#[derive(Debug)]
pub struct BatchedEncoder<E> {
    inner: E,
    max_batch_size: usize,
}

impl<E: FeatureEncoder> BatchedEncoder<E> {
    /// Wrap `inner` with the default batch size.
    pub fn new(inner: E) -> Self {
        Self::with_batch_size(inner, DEFAULT_ENCODE_BATCH_SIZE)
    }

    /// Wrap `inner`, handing it at most `max_batch_size` images per call.
    /// Clamped to a minimum of 1.
    pub fn with_batch_size(inner: E, max_batch_size: usize) -> Self {
        Self {
            inner,
            max_batch_size: max_batch_size.max(1),
        }
    }

    /// Maximum images per encoder call.
    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    /// Unwrap the inner encoder.
    pub fn into_inner(self) -> E {
        self.inner
    }

    /// Encode every image, batch by batch.
    ///
    /// # Errors
    ///
    /// [`SamplingError::Encoding`] on any encoder failure or malformed
    /// output.
    pub fn encode(&mut self, images: &[DynamicImage]) -> Result<Vec<Vec<f32>>, SamplingError> {
        self.encode_with(images, |_| {})
    }

    /// Like [`encode`](BatchedEncoder::encode), calling `on_batch` with the
    /// size of each completed batch.
    pub(crate) fn encode_with(
        &mut self,
        images: &[DynamicImage],
        mut on_batch: impl FnMut(usize),
    ) -> Result<Vec<Vec<f32>>, SamplingError> {
        let mut embeddings: Vec<Vec<f32>> = Vec::with_capacity(images.len());
        let mut width: Option<usize> = None;

        for (batch_number, batch) in images.chunks(self.max_batch_size).enumerate() {
            let batch_start = batch_number * self.max_batch_size;
            log::trace!("Encoding batch of {} at offset {}", batch.len(), batch_start);

            let vectors = self
                .inner
                .encode(batch)
                .map_err(|error| SamplingError::Encoding {
                    batch_start,
                    reason: error.to_string(),
                })?;

            if vectors.len() != batch.len() {
                return Err(SamplingError::Encoding {
                    batch_start,
                    reason: format!(
                        "encoder returned {} embeddings for {} images",
                        vectors.len(),
                        batch.len()
                    ),
                });
            }

            for vector in &vectors {
                let expected = *width.get_or_insert(vector.len());
                if vector.len() != expected || expected == 0 {
                    return Err(SamplingError::Encoding {
                        batch_start,
                        reason: format!(
                            "embedding width {} differs from expected {}",
                            vector.len(),
                            expected
                        ),
                    });
                }
            }

            embeddings.extend(vectors);
            on_batch(batch.len());
        }

        Ok(embeddings)
    }
}

/// Embeds an image as its `grid × grid` grayscale thumbnail, mean-centred.
///
/// Centring makes the cosine similarity of two thumbnails track structure
/// rather than overall brightness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LumaGridEncoder {
    grid: u32,
}

impl Default for LumaGridEncoder {
    fn default() -> Self {
        Self { grid: 16 }
    }
}

impl LumaGridEncoder {
    /// Create an encoder with a `grid × grid` thumbnail (minimum 1).
    pub fn new(grid: u32) -> Self {
        Self { grid: grid.max(1) }
    }

    /// Embedding width, `grid²`.
    pub fn dimensions(&self) -> usize {
        (self.grid * self.grid) as usize
    }

    fn embed(&self, image: &DynamicImage) -> Vec<f32> {
        let thumbnail = image
            .resize_exact(self.grid, self.grid, FilterType::Triangle)
            .to_luma8();
        let pixels = thumbnail.as_raw();
        let mean = pixels.iter().map(|&p| p as f32).sum::<f32>() / pixels.len() as f32;
        pixels.iter().map(|&p| (p as f32 - mean) / 255.0).collect()
    }
}

impl FeatureEncoder for LumaGridEncoder {
    fn encode(&mut self, images: &[DynamicImage]) -> Result<Vec<Vec<f32>>, BoxError> {
        Ok(images.iter().map(|image| self.embed(image)).collect())
    }
}
