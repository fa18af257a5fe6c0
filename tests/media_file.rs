//! FFmpeg-backed reader tests.
//!
//! Tests require `tests/fixtures/sample_video.mp4` and return early when it is
//! missing. Any short clip works, for example:
//!
//! ```text
//! ffmpeg -f lavfi -i testsrc=duration=5:size=320x240:rate=30 tests/fixtures/sample_video.mp4
//! ```

use std::path::Path;

use framesift::{
    FixedOptions, FrameReader, FrameSampler, LumaGridEncoder, MediaFile, PixelFormat,
    ReaderOptions, SamplingConfig, SfsOptions,
};

fn sample_video_path() -> &'static str {
    "tests/fixtures/sample_video.mp4"
}

#[test]
fn metadata_is_cached_at_open() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let reader = MediaFile::open(path).expect("Failed to open test video");
    let metadata = reader.metadata();
    assert!(metadata.video.width > 0);
    assert!(metadata.video.height > 0);
    assert!(metadata.video.frames_per_second > 0.0);
    assert!(metadata.video.frame_count > 0);
    assert_eq!(reader.total_frames(), metadata.video.frame_count);
    assert_eq!(reader.native_fps(), metadata.video.frames_per_second);
}

#[test]
fn frames_come_back_in_request_order() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let mut reader = MediaFile::open(path).expect("Failed to open test video");
    let last = reader.total_frames() - 1;
    let frames = reader.frames(&[last, 0, last]).expect("Failed to decode");
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0].to_rgb8().as_raw(), frames[2].to_rgb8().as_raw());
}

#[test]
fn iterator_yields_sorted_unique_frames() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let mut reader = MediaFile::open(path).expect("Failed to open test video");
    let numbers: Vec<u64> = reader
        .frame_iter(&[20, 5, 20, 10])
        .expect("Failed to create iterator")
        .map(|item| item.expect("Failed to decode").0)
        .collect();
    assert_eq!(numbers, vec![5, 10, 20]);
}

#[test]
fn output_options_shape_frames() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let options = ReaderOptions::new()
        .with_pixel_format(PixelFormat::Gray8)
        .with_resolution(Some(64), None);
    let mut reader = MediaFile::open_with_options(path, options).expect("Failed to open");
    let source = reader.metadata().video.clone();

    let frame = reader.frames(&[0]).expect("Failed to decode").remove(0);
    assert_eq!(frame.width(), 64);
    let expected_height = (source.height as f64 * 64.0 / source.width as f64).round() as u32;
    assert_eq!(frame.height(), expected_height);
    assert!(frame.as_luma8().is_some());
}

#[test]
fn sampling_a_real_video() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let mut reader = MediaFile::open_with_options(
        path,
        ReaderOptions::new().with_resolution(Some(64), None),
    )
    .expect("Failed to open");
    let total = reader.total_frames();
    let mut sampler = FrameSampler::new(LumaGridEncoder::default());

    let fixed = sampler
        .sample(&mut reader, &SamplingConfig::Fixed(FixedOptions::new(4)), &[])
        .unwrap();
    assert_eq!(fixed.first(), Some(&0));
    assert_eq!(fixed.last(), Some(&(total - 1)));

    let sfs = sampler
        .sample(
            &mut reader,
            &SamplingConfig::Sfs(SfsOptions::new().with_num_frames(4)),
            &[],
        )
        .unwrap();
    assert_eq!(sfs.len(), 4);
    assert!(sfs.windows(2).all(|pair| pair[0] < pair[1]));
}
