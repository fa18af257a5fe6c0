//! Similarity-guided selection tests: the dynamic program against a brute
//! force oracle, the temporal term, and the full sampling pipeline.

mod common;

use common::{IndexEncoder, RecordingProgress, SyntheticReader, UnusedEncoder, periodic_embedding};
use framesift::similarity::{length_penalty, penalty_matrix};
use framesift::{
    FrameSampler, OperationType, SamplerOptions, SamplingConfig, SamplingError, SegmentSpec,
    SfsOptions, SquareMatrix, select_diverse,
};

/// Deterministic pseudo-random values in `[-1, 1)`.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        ((self.0 >> 11) as f64 / (1u64 << 53) as f64) * 2.0 - 1.0
    }
}

fn random_similarity(size: usize, seed: u64) -> SquareMatrix {
    let mut rng = Lcg(seed);
    let mut values = vec![0.0; size * size];
    for row in 0..size {
        values[row * size + row] = 1.0;
        for column in row + 1..size {
            let value = rng.next();
            values[row * size + column] = value;
            values[column * size + row] = value;
        }
    }
    SquareMatrix::from_row_major(size, values).unwrap()
}

fn path_cost(positions: &[usize], similarity: &SquareMatrix, penalty: &SquareMatrix) -> f64 {
    positions
        .windows(2)
        .map(|pair| similarity[(pair[0], pair[1])] + penalty[(pair[0], pair[1])])
        .sum()
}

/// Minimum cost over every ascending `count`-subset that ends at the last
/// candidate, the set the dynamic program chooses from.
fn brute_force_minimum(similarity: &SquareMatrix, penalty: &SquareMatrix, count: usize) -> f64 {
    let size = similarity.size();
    let mut best = f64::INFINITY;
    for mask in 0u32..(1 << size) {
        if mask.count_ones() as usize != count || mask & (1 << (size - 1)) == 0 {
            continue;
        }
        let positions: Vec<usize> = (0..size).filter(|bit| mask & (1 << bit) != 0).collect();
        best = best.min(path_cost(&positions, similarity, penalty));
    }
    best
}

fn sfs(options: SfsOptions) -> SamplingConfig {
    SamplingConfig::Sfs(options)
}

// ── Dynamic program ──────────────────────────────────────────────

#[test]
fn matches_brute_force_for_six_choose_two() {
    let penalty = penalty_matrix(6, 0.0);
    for seed in 0..50 {
        let similarity = random_similarity(6, seed);
        let selection = select_diverse(&similarity, &penalty, 2).unwrap();
        let expected = brute_force_minimum(&similarity, &penalty, 2);
        assert!(
            (selection.cost - expected).abs() < 1e-9,
            "seed {seed}: dp {} vs brute force {expected}",
            selection.cost
        );
    }
}

#[test]
fn matches_brute_force_across_sizes_with_penalty() {
    for size in 1..=7 {
        for weight in [0.0, 0.5, 2.0] {
            let penalty = penalty_matrix(size, weight);
            let similarity = random_similarity(size, size as u64 * 31 + 7);
            for count in 1..=size {
                let selection = select_diverse(&similarity, &penalty, count).unwrap();
                let expected = brute_force_minimum(&similarity, &penalty, count);
                assert!(
                    (selection.cost - expected).abs() < 1e-9,
                    "size {size} count {count} weight {weight}"
                );
                assert!(
                    (path_cost(&selection.positions, &similarity, &penalty) - selection.cost).abs()
                        < 1e-9
                );
            }
        }
    }
}

#[test]
fn selection_is_strictly_increasing_and_ends_at_last_candidate() {
    let similarity = random_similarity(12, 99);
    let penalty = penalty_matrix(12, 1.0);
    for count in 1..=12 {
        let selection = select_diverse(&similarity, &penalty, count).unwrap();
        assert_eq!(selection.positions.len(), count);
        assert!(selection.positions.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(selection.positions.last(), Some(&11));
    }
}

#[test]
fn ties_resolve_to_earliest_predecessor() {
    let similarity = SquareMatrix::from_fn(5, |_, _| 1.0);
    let selection = select_diverse(&similarity, &SquareMatrix::zeros(5), 3).unwrap();
    assert_eq!(selection.positions, vec![0, 1, 4]);
}

#[test]
fn penalty_favours_spreading_out() {
    let similarity = SquareMatrix::from_row_major(4, vec![
        1.0, 0.0, 0.0, 0.50,
        0.0, 1.0, 0.0, 0.45,
        0.0, 0.0, 1.0, 0.90,
        0.50, 0.45, 0.90, 1.0,
    ])
    .unwrap();

    let without = select_diverse(&similarity, &penalty_matrix(4, 0.0), 2).unwrap();
    assert_eq!(without.positions, vec![1, 3]);

    let with = select_diverse(&similarity, &penalty_matrix(4, 1.0), 2).unwrap();
    assert_eq!(with.positions, vec![0, 3]);
}

// ── Temporal term ────────────────────────────────────────────────

#[test]
fn penalty_values_are_pinned() {
    let expected = [0.0, -0.276_768, -0.414_214, -0.480_217, -0.5];
    for (distance, value) in expected.iter().enumerate() {
        let actual = length_penalty(distance, 4, 1.0);
        assert!(
            (actual - value).abs() < 1e-6,
            "distance {distance}: {actual} vs {value}"
        );
    }
    assert!((length_penalty(2, 4, 2.0) - -0.828_427).abs() < 1e-6);
}

#[test]
fn penalty_matrix_is_symmetric_and_non_positive() {
    let matrix = penalty_matrix(6, 1.5);
    for row in 0..6 {
        assert_eq!(matrix[(row, row)], 0.0);
        for column in 0..6 {
            assert_eq!(matrix[(row, column)], matrix[(column, row)]);
            assert!(matrix[(row, column)] <= 0.0);
        }
    }
    assert!(matrix[(0, 5)] < matrix[(0, 1)]);
}

// ── Pipeline ─────────────────────────────────────────────────────

#[test]
fn returns_requested_count_from_pool() {
    let mut reader = SyntheticReader::new(500, 25.0);
    let mut sampler = FrameSampler::new(IndexEncoder::new(periodic_embedding(7)));
    let config = sfs(SfsOptions::new().with_num_frames(6).with_initial_frames(30));

    let indices = sampler.sample(&mut reader, &config, &[]).unwrap();
    let pool = &reader.requests[0];

    assert_eq!(pool.len(), 30);
    assert_eq!(indices.len(), 6);
    assert!(indices.windows(2).all(|pair| pair[0] < pair[1]));
    assert!(indices.iter().all(|index| pool.contains(index)));
    assert_eq!(indices.last(), Some(&499));
}

#[test]
fn is_deterministic() {
    let config = sfs(
        SfsOptions::new()
            .with_num_frames(5)
            .with_initial_frames(40)
            .with_length_penalty(0.7),
    );
    let run = || {
        let mut reader = SyntheticReader::new(400, 30.0);
        let mut sampler = FrameSampler::new(IndexEncoder::new(periodic_embedding(11)));
        sampler.sample(&mut reader, &config, &[]).unwrap()
    };
    assert_eq!(run(), run());
}

#[test]
fn skips_near_duplicates() {
    let mut reader = SyntheticReader::new(6, 1.0);
    let mut sampler = FrameSampler::new(IndexEncoder::new(|index| {
        if index < 3 { vec![1.0, 0.0] } else { vec![0.0, 1.0] }
    }));
    let config = sfs(SfsOptions::new().with_num_frames(2).with_initial_frames(6));

    assert_eq!(sampler.sample(&mut reader, &config, &[]).unwrap(), vec![0, 5]);
}

#[test]
fn keep_ratio_sizes_pool_and_selection() {
    let mut reader = SyntheticReader::new(40, 25.0);
    let mut sampler = FrameSampler::new(IndexEncoder::new(periodic_embedding(5)));
    let config = sfs(SfsOptions::new().with_keep_ratio(0.25));

    let indices = sampler.sample(&mut reader, &config, &[]).unwrap();
    assert_eq!(reader.requests[0].len(), 20);
    assert_eq!(indices.len(), 5);
    assert_eq!(indices.last(), Some(&39));
}

#[test]
fn initial_fps_controls_pool_density() {
    let mut reader = SyntheticReader::new(100, 25.0);
    let mut sampler = FrameSampler::new(IndexEncoder::new(periodic_embedding(3)));
    let config = sfs(SfsOptions::new().with_num_frames(3).with_initial_fps(5.0));

    let indices = sampler.sample(&mut reader, &config, &[]).unwrap();
    let expected_pool: Vec<u64> = (0..100).step_by(5).collect();
    assert_eq!(reader.requests[0], expected_pool);
    assert_eq!(indices.len(), 3);
    assert_eq!(indices.last(), Some(&95));
}

#[test]
fn count_is_capped_by_pool() {
    let mut reader = SyntheticReader::new(4, 25.0);
    let mut sampler = FrameSampler::new(IndexEncoder::new(periodic_embedding(4)));
    let config = sfs(SfsOptions::new().with_num_frames(10));

    assert_eq!(sampler.sample(&mut reader, &config, &[]).unwrap(), vec![0, 1, 2, 3]);
}

#[test]
fn segmented_sfs_is_not_implemented() {
    let mut reader = SyntheticReader::new(100, 25.0);
    let mut sampler = FrameSampler::new(UnusedEncoder);
    let config = sfs(SfsOptions::new().with_num_frames(2));
    let segments = [SegmentSpec::new("00:00:00", "00:00:02")];

    let result = sampler.sample(&mut reader, &config, &segments);
    assert!(matches!(result, Err(SamplingError::NotImplemented(_))));
    assert!(reader.requests.is_empty());
}

#[test]
fn empty_video_is_a_config_error() {
    let mut reader = SyntheticReader::new(0, 25.0);
    let mut sampler = FrameSampler::new(UnusedEncoder);
    let config = sfs(SfsOptions::new().with_num_frames(2));
    assert!(matches!(
        sampler.sample(&mut reader, &config, &[]),
        Err(SamplingError::Config(_))
    ));
}

#[test]
fn initial_fps_above_native_is_a_config_error() {
    let mut reader = SyntheticReader::new(100, 10.0);
    let mut sampler = FrameSampler::new(UnusedEncoder);
    let config = sfs(SfsOptions::new().with_num_frames(2).with_initial_fps(25.0));
    assert!(matches!(
        sampler.sample(&mut reader, &config, &[]),
        Err(SamplingError::Config(_))
    ));
}

#[test]
fn reports_every_stage() {
    let progress = RecordingProgress::shared();
    let options = SamplerOptions::new()
        .with_progress(progress.clone())
        .with_encode_batch_size(4);
    let mut reader = SyntheticReader::new(10, 25.0);
    let mut sampler =
        FrameSampler::with_options(IndexEncoder::new(periodic_embedding(10)), options);
    let config = sfs(SfsOptions::new().with_num_frames(3).with_initial_frames(10));

    sampler.sample(&mut reader, &config, &[]).unwrap();

    let events = progress.events.lock().unwrap();
    let encoding: Vec<u64> = events
        .iter()
        .filter(|info| info.operation == OperationType::FeatureEncoding)
        .map(|info| info.current)
        .collect();
    assert_eq!(encoding.first(), Some(&4));
    assert_eq!(encoding.last(), Some(&10));
    assert!(events.iter().any(|info| info.operation == OperationType::FrameDecoding));
    let last = events.last().unwrap();
    assert_eq!(last.operation, OperationType::FrameSelection);
    assert_eq!(last.total, Some(3));
    drop(events);

    assert_eq!(sampler.into_encoder().batch_sizes, vec![4, 4, 2]);
}
