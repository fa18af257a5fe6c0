//! Similarity-guided frame selection (SFS).
//!
//! SFS decodes a dense candidate pool, embeds every candidate, and picks the
//! `K` frames whose consecutive pairs are least alike. The pick is exact: a
//! dynamic program over pool positions minimises the summed cost
//! `S[a][b] + P[a][b]` of every consecutive pair `(a, b)` in the selection,
//! where `S` is cosine similarity and `P` the temporal term from
//! [`penalty_matrix`](crate::similarity::penalty_matrix).
//!
//! The table `dp[i][j]` holds the cheapest way to pick `j` frames among the
//! first `i` candidates with candidate `i − 1` picked last. Row 0 stands for
//! "nothing picked yet", so the first pick is free. The selection is read
//! back from `dp[n][K]`, which means the final candidate always closes it.
//!
//! # Example
//!
//! ```
//! use framesift::sfs::select_diverse;
//! use framesift::similarity::{SquareMatrix, penalty_matrix};
//!
//! // Frames 0 and 1 are near-duplicates, 2 and 3 differ from both.
//! let similarity = SquareMatrix::from_row_major(4, vec![
//!     1.0, 0.9, 0.1, 0.2,
//!     0.9, 1.0, 0.2, 0.1,
//!     0.1, 0.2, 1.0, 0.3,
//!     0.2, 0.1, 0.3, 1.0,
//! ])?;
//! let selection = select_diverse(&similarity, &penalty_matrix(4, 0.0), 3)?;
//! assert_eq!(selection.positions, vec![0, 2, 3]);
//! # Ok::<(), framesift::SamplingError>(())
//! ```

use serde::{Deserialize, Serialize};

use crate::configuration::SamplerOptions;
use crate::encoder::{BatchedEncoder, FeatureEncoder};
use crate::error::SamplingError;
use crate::progress::{OperationType, ProgressTracker};
use crate::reader::FrameReader;
use crate::sampling::evenly_spaced;
use crate::similarity::{SquareMatrix, cosine_similarity_matrix, penalty_matrix};

/// SFS parameters.
///
/// Exactly one of `num_frames` and `keep_ratio` must be set. At most one of
/// `initial_frames` and `initial_fps` may be set; with neither, the pool
/// holds twice the requested count (or half the video for a ratio).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[must_use]
pub struct SfsOptions {
    /// Number of frames to keep.
    pub num_frames: Option<usize>,
    /// Fraction of the candidate pool to keep, in `(0, 1]`.
    pub keep_ratio: Option<f64>,
    /// Candidate pool size, evenly spaced over the video.
    pub initial_frames: Option<usize>,
    /// Candidate pool rate in frames per second.
    pub initial_fps: Option<f64>,
    /// Weight of the temporal term. Default: 0.
    pub length_penalty: f64,
    /// Accepted for compatibility with existing configurations; it does not
    /// change the temporal term. Default: 1.
    pub length_penalty_exponent: f64,
}

impl Default for SfsOptions {
    fn default() -> Self {
        Self {
            num_frames: None,
            keep_ratio: None,
            initial_frames: None,
            initial_fps: None,
            length_penalty: 0.0,
            length_penalty_exponent: 1.0,
        }
    }
}

impl SfsOptions {
    /// Create empty options. Set a count or a ratio before sampling.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep `count` frames.
    pub fn with_num_frames(mut self, count: usize) -> Self {
        self.num_frames = Some(count);
        self
    }

    /// Keep `ratio` of the candidate pool.
    pub fn with_keep_ratio(mut self, ratio: f64) -> Self {
        self.keep_ratio = Some(ratio);
        self
    }

    /// Use `count` evenly spaced candidates.
    pub fn with_initial_frames(mut self, count: usize) -> Self {
        self.initial_frames = Some(count);
        self
    }

    /// Take candidates at `fps` frames per second.
    pub fn with_initial_fps(mut self, fps: f64) -> Self {
        self.initial_fps = Some(fps);
        self
    }

    /// Set the temporal term weight.
    pub fn with_length_penalty(mut self, weight: f64) -> Self {
        self.length_penalty = weight;
        self
    }

    /// Set the (inert) temporal term exponent.
    pub fn with_length_penalty_exponent(mut self, exponent: f64) -> Self {
        self.length_penalty_exponent = exponent;
        self
    }

    /// Check the options for contradictions.
    ///
    /// # Errors
    ///
    /// [`SamplingError::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<(), SamplingError> {
        self.target()?;
        if self.initial_frames.is_some() && self.initial_fps.is_some() {
            return Err(SamplingError::Config(
                "initial_frames and initial_fps are mutually exclusive".to_string(),
            ));
        }
        if let Some(fps) = self.initial_fps {
            if !(fps.is_finite() && fps > 0.0) {
                return Err(SamplingError::Config(format!(
                    "initial_fps must be positive, got {fps}"
                )));
            }
        }
        if !(self.length_penalty.is_finite() && self.length_penalty >= 0.0) {
            return Err(SamplingError::Config(format!(
                "length_penalty must be non-negative, got {}",
                self.length_penalty
            )));
        }
        Ok(())
    }

    fn target(&self) -> Result<SelectionTarget, SamplingError> {
        match (self.num_frames, self.keep_ratio) {
            (Some(_), Some(_)) => Err(SamplingError::Config(
                "num_frames and keep_ratio are mutually exclusive".to_string(),
            )),
            (None, None) => Err(SamplingError::Config(
                "SFS needs num_frames or keep_ratio".to_string(),
            )),
            (Some(0), None) => Err(SamplingError::Config(
                "num_frames must be at least 1".to_string(),
            )),
            (Some(count), None) => Ok(SelectionTarget::Count(count)),
            (None, Some(ratio)) if ratio > 0.0 && ratio <= 1.0 => Ok(SelectionTarget::Ratio(ratio)),
            (None, Some(ratio)) => Err(SamplingError::Config(format!(
                "keep_ratio must be in (0, 1], got {ratio}"
            ))),
        }
    }
}

/// How many frames to keep.
#[derive(Debug, Clone, Copy)]
enum SelectionTarget {
    Count(usize),
    Ratio(f64),
}

impl SelectionTarget {
    fn default_pool_size(self, total_frames: u64) -> u64 {
        match self {
            SelectionTarget::Count(count) => total_frames.min((count as u64).saturating_mul(2)),
            SelectionTarget::Ratio(_) => total_frames / 2,
        }
    }

    fn resolve(self, pool_size: usize) -> usize {
        match self {
            SelectionTarget::Count(count) => count.min(pool_size),
            SelectionTarget::Ratio(ratio) => ((pool_size as f64 * ratio).round() as usize).max(1),
        }
    }
}

/// The outcome of [`select_diverse`].
#[derive(Debug, Clone, PartialEq)]
pub struct DiverseSelection {
    /// Selected pool positions, strictly increasing.
    pub positions: Vec<usize>,
    /// Summed pair cost of the selection.
    pub cost: f64,
}

/// Pick `count` pool positions minimising the summed cost of consecutive
/// picks, where moving from position `a` to `b` costs
/// `similarity[a][b] + penalty[a][b]`.
///
/// The last position is always part of the selection. Ties resolve to the
/// earliest predecessor, so the result is deterministic.
///
/// # Errors
///
/// - [`SamplingError::Config`] if the matrices differ in size, or `count` is
///   0 or larger than the pool.
/// - [`SamplingError::InsufficientSelection`] if the backtrace comes up short.
pub fn select_diverse(
    similarity: &SquareMatrix,
    penalty: &SquareMatrix,
    count: usize,
) -> Result<DiverseSelection, SamplingError> {
    let pool_size = similarity.size();
    if penalty.size() != pool_size {
        return Err(SamplingError::Config(format!(
            "similarity ({pool_size}) and penalty ({}) matrices differ in size",
            penalty.size()
        )));
    }
    if count == 0 || count > pool_size {
        return Err(SamplingError::Config(format!(
            "cannot select {count} frames from a pool of {pool_size}"
        )));
    }

    let columns = count + 1;
    let mut dp = vec![f64::INFINITY; (pool_size + 1) * columns];
    let mut trace: Vec<Option<usize>> = vec![None; (pool_size + 1) * columns];
    dp[0] = 0.0;

    let step_cost = |previous_row: usize, row: usize| -> f64 {
        if previous_row == 0 {
            0.0
        } else {
            similarity[(previous_row - 1, row - 1)] + penalty[(previous_row - 1, row - 1)]
        }
    };

    for picked in 1..=count {
        for row in picked..=pool_size {
            let mut best: Option<(usize, f64)> = None;
            for previous_row in (picked - 1)..row {
                let total = dp[previous_row * columns + picked - 1] + step_cost(previous_row, row);
                if best.is_none_or(|(_, value)| total < value) {
                    best = Some((previous_row, total));
                }
            }
            if let Some((previous_row, value)) = best {
                dp[row * columns + picked] = value;
                trace[row * columns + picked] = Some(previous_row);
            }
        }
    }

    let mut positions = Vec::with_capacity(count);
    let mut row = pool_size;
    let mut column = count;
    while row > 0 && positions.len() < count {
        positions.push(row - 1);
        match trace[row * columns + column] {
            Some(previous_row) => row = previous_row,
            None => break,
        }
        column -= 1;
    }

    if positions.len() < count {
        return Err(SamplingError::InsufficientSelection {
            selected: positions.len(),
            requested: count,
        });
    }
    positions.reverse();

    Ok(DiverseSelection {
        positions,
        cost: dp[pool_size * columns + count],
    })
}

/// Frame indices SFS decodes and chooses from.
fn candidate_pool(
    total_frames: u64,
    native_fps: f64,
    options: &SfsOptions,
    target: SelectionTarget,
) -> Result<Vec<u64>, SamplingError> {
    let pool = if let Some(initial_fps) = options.initial_fps {
        let step = (native_fps / initial_fps).round();
        if step.is_nan() || step < 1.0 {
            return Err(SamplingError::Config(format!(
                "initial_fps {initial_fps} exceeds the native rate {native_fps}"
            )));
        }
        (0..total_frames).step_by(step as usize).collect()
    } else {
        let requested = options
            .initial_frames
            .map_or_else(|| target.default_pool_size(total_frames), |count| count as u64);
        if requested > total_frames {
            log::warn!("initial_frames {requested} exceeds {total_frames} frames, clamping");
        }
        evenly_spaced(total_frames, requested.min(total_frames))
    };

    if pool.is_empty() {
        return Err(SamplingError::Config(format!(
            "SFS candidate pool is empty ({total_frames} frames in video)"
        )));
    }
    Ok(pool)
}

/// Run SFS over the whole video.
pub(crate) fn sample_sfs<R, E>(
    reader: &mut R,
    encoder: &mut BatchedEncoder<E>,
    options: &SfsOptions,
    sampler: &SamplerOptions,
) -> Result<Vec<u64>, SamplingError>
where
    R: FrameReader + ?Sized,
    E: FeatureEncoder,
{
    options.validate()?;
    let target = options.target()?;
    if options.length_penalty_exponent != 1.0 {
        log::debug!(
            "length_penalty_exponent {} has no effect",
            options.length_penalty_exponent
        );
    }

    let total_frames = reader.total_frames();
    let native_fps = reader.native_fps();
    let pool = candidate_pool(total_frames, native_fps, options, target)?;
    let count = target.resolve(pool.len());
    log::debug!(
        "SFS: selecting {count} of {} candidates ({total_frames} frames, length_penalty={})",
        pool.len(),
        options.length_penalty
    );

    let mut decoding = ProgressTracker::new(
        sampler.progress.clone(),
        OperationType::FrameDecoding,
        Some(pool.len() as u64),
        sampler.batch_size,
    );
    let images = reader.frames(&pool)?;
    decoding.advance_by(images.len() as u64);
    decoding.finish();

    let mut encoding = ProgressTracker::new(
        sampler.progress.clone(),
        OperationType::FeatureEncoding,
        Some(images.len() as u64),
        sampler.batch_size,
    );
    let embeddings = encoder.encode_with(&images, |done| encoding.advance_by(done as u64))?;
    encoding.finish();
    drop(images);

    let similarity = cosine_similarity_matrix(&embeddings)?;
    let penalty = penalty_matrix(pool.len(), options.length_penalty);

    let mut selecting = ProgressTracker::new(
        sampler.progress.clone(),
        OperationType::FrameSelection,
        Some(count as u64),
        sampler.batch_size,
    );
    let selection = select_diverse(&similarity, &penalty, count)?;
    selecting.advance_by(count as u64);
    selecting.finish();
    log::trace!("SFS selection cost {}", selection.cost);

    Ok(selection
        .positions
        .into_iter()
        .map(|position| pool[position])
        .collect())
}
