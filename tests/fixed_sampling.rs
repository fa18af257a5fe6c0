//! Fixed-count sampling tests, whole-video and segment-restricted.

mod common;

use common::{SyntheticReader, UnusedEncoder};
use framesift::sampling::{fixed_indices, fixed_indices_in_pool, segment_frame_pool};
use framesift::{FixedOptions, FrameSampler, SamplingConfig, SamplingError, SegmentSpec};

fn fixed(num_frames: usize) -> SamplingConfig {
    SamplingConfig::Fixed(FixedOptions::new(num_frames))
}

// ── Whole video ──────────────────────────────────────────────────

#[test]
fn every_valid_request_spans_the_video() {
    for total in 1..=40_u64 {
        for requested in 1..=total as usize {
            let indices = fixed_indices(total, requested).unwrap();
            assert_eq!(indices.len(), requested, "total={total} requested={requested}");
            assert!(indices.windows(2).all(|pair| pair[0] < pair[1]));
            assert!(indices.iter().all(|&index| index < total));
            assert_eq!(indices[0], 0);
            if requested >= 2 {
                assert_eq!(*indices.last().unwrap(), total - 1);
            }
        }
    }
}

#[test]
fn spacing_rounds_to_nearest_frame() {
    assert_eq!(fixed_indices(10, 4).unwrap(), vec![0, 3, 6, 9]);
    assert_eq!(fixed_indices(100, 3).unwrap(), vec![0, 50, 99]);
}

#[test]
fn zero_frames_requested_is_empty() {
    assert!(fixed_indices(10, 0).unwrap().is_empty());
}

#[test]
fn request_above_total_is_a_config_error() {
    let mut reader = SyntheticReader::new(5, 25.0);
    let mut sampler = FrameSampler::new(UnusedEncoder);
    let result = sampler.sample(&mut reader, &fixed(6), &[]);
    assert!(matches!(result, Err(SamplingError::Config(_))));
}

#[test]
fn sampler_never_decodes_for_fixed() {
    let mut reader = SyntheticReader::new(1000, 25.0);
    let mut sampler = FrameSampler::new(UnusedEncoder);
    let indices = sampler.sample(&mut reader, &fixed(8), &[]).unwrap();
    assert_eq!(indices.len(), 8);
    assert!(reader.requests.is_empty());
}

// ── Segments ─────────────────────────────────────────────────────

#[test]
fn segment_pool_is_sorted_union() {
    let segments = [
        SegmentSpec::new("00:00:02", "00:00:03"),
        SegmentSpec::new("00:00:00", "00:00:01"),
        SegmentSpec::new("00:00:02", "00:00:04"),
    ];
    let pool = segment_frame_pool(&segments, 2.0, 100).unwrap();
    assert_eq!(pool, vec![0, 1, 4, 5, 6, 7]);
}

#[test]
fn segment_pool_is_clipped_to_video() {
    let segments = [SegmentSpec::new("00:00:08", "00:01:00")];
    let pool = segment_frame_pool(&segments, 1.0, 10).unwrap();
    assert_eq!(pool, vec![8, 9]);
}

#[test]
fn segment_pool_rejects_bad_times() {
    let segments = [SegmentSpec::new("00:00", "00:00:05")];
    assert!(matches!(
        segment_frame_pool(&segments, 1.0, 10),
        Err(SamplingError::Format { .. })
    ));
}

#[test]
fn small_pool_is_returned_whole() {
    let mut reader = SyntheticReader::new(1000, 1.0);
    let mut sampler = FrameSampler::new(UnusedEncoder);
    let segments = [SegmentSpec::new("00:00:10", "00:00:13")];

    let indices = sampler.sample(&mut reader, &fixed(8), &segments).unwrap();
    assert_eq!(indices, vec![10, 11, 12]);
}

#[test]
fn whole_video_and_segmented_diverge_on_oversized_requests() {
    let mut reader = SyntheticReader::new(3, 1.0);
    let mut sampler = FrameSampler::new(UnusedEncoder);
    let config = fixed(8);

    assert!(sampler.sample(&mut reader, &config, &[]).is_err());

    let segments = [SegmentSpec::new("00:00:00", "00:00:03")];
    assert_eq!(
        sampler.sample(&mut reader, &config, &segments).unwrap(),
        vec![0, 1, 2]
    );
}

#[test]
fn large_pool_is_evenly_subsampled() {
    let pool: Vec<u64> = (100..110).chain(200..210).collect();
    assert_eq!(fixed_indices_in_pool(&pool, 3), vec![100, 200, 209]);
}

#[test]
fn segmented_sampling_through_sampler() {
    let mut reader = SyntheticReader::new(10_000, 10.0);
    let mut sampler = FrameSampler::new(UnusedEncoder);
    let segments = [
        SegmentSpec::new("00:00:10", "00:00:11"),
        SegmentSpec::new("00:01:00", "00:01:01"),
    ];

    let indices = sampler.sample(&mut reader, &fixed(4), &segments).unwrap();
    assert_eq!(indices, vec![100, 106, 603, 609]);
}
