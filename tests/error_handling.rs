//! Error handling integration tests.
//!
//! These tests check that failures surface as the right `SamplingError`
//! variant with a message that names the offending value.

use std::path::Path;

use framesift::{
    FrameReader, FrameSampler, ImageSequence, LumaGridEncoder, MediaFile, SamplingConfig,
    SamplingError, SegmentSpec, SfsOptions, time_to_seconds,
};
use image::DynamicImage;

#[test]
fn open_nonexistent_file() {
    let result = MediaFile::open("this_file_does_not_exist.mp4");
    assert!(result.is_err());

    let error_message = result.unwrap_err().to_string();
    assert!(
        error_message.contains("Failed to open media file"),
        "Error message should mention file open failure: {error_message}",
    );
}

#[test]
fn open_invalid_file() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let invalid_file_path = temporary_directory.path().join("invalid.mp4");
    std::fs::write(&invalid_file_path, b"this is not a media file")
        .expect("Failed to write invalid file");

    let result = MediaFile::open(&invalid_file_path);
    assert!(result.is_err(), "Expected error for invalid media file");
}

#[test]
fn media_frame_out_of_range() {
    let path = "tests/fixtures/sample_video.mp4";
    if !Path::new(path).exists() {
        return;
    }

    let mut reader = MediaFile::open(path).expect("Failed to open test video");
    let result = reader.frames(&[0, 999_999]);
    assert!(matches!(
        result,
        Err(SamplingError::FrameOutOfRange {
            frame_number: 999_999,
            ..
        })
    ));
}

#[test]
fn sequence_frame_out_of_range() {
    let mut reader = ImageSequence::new(vec![DynamicImage::new_rgb8(2, 2); 3], 1.0);
    let error_message = reader.frames(&[1, 3]).unwrap_err().to_string();
    assert!(
        error_message.contains("out of range"),
        "Error message should mention out of range: {error_message}",
    );
}

#[test]
fn format_error_names_input() {
    let error_message = time_to_seconds("1:2:3:4").unwrap_err().to_string();
    assert!(error_message.contains("1:2:3:4"), "{error_message}");
}

#[test]
fn bad_segment_surfaces_through_sampler() {
    let mut reader = ImageSequence::new(vec![DynamicImage::new_rgb8(2, 2); 10], 1.0);
    let mut sampler = FrameSampler::new(LumaGridEncoder::default());
    let segments = [SegmentSpec::new("00:00:01", "later")];

    let result = sampler.sample(&mut reader, &SamplingConfig::default(), &segments);
    assert!(matches!(result, Err(SamplingError::Format { .. })));
}

#[test]
fn invalid_sfs_options_fail_before_decoding() {
    // Built in code, so parse-time validation never ran.
    let config = SamplingConfig::Sfs(SfsOptions::new().with_num_frames(2).with_keep_ratio(0.5));
    let mut reader = ImageSequence::new(vec![DynamicImage::new_rgb8(2, 2); 10], 1.0);
    let mut sampler = FrameSampler::new(LumaGridEncoder::default());

    let result = sampler.sample(&mut reader, &config, &[]);
    assert!(matches!(result, Err(SamplingError::Config(_))));
}

#[test]
fn error_messages_carry_parameters() {
    let error = SamplingError::InsufficientSelection {
        selected: 2,
        requested: 5,
    };
    assert_eq!(
        error.to_string(),
        "Insufficient frames selected: got 2, expected 5"
    );

    let error = SamplingError::Encoding {
        batch_start: 64,
        reason: "out of memory".to_string(),
    };
    assert!(error.to_string().contains("64"));
    assert!(error.to_string().contains("out of memory"));

    let error = SamplingError::NotImplemented("SFS sampling restricted to segments");
    assert_eq!(
        error.to_string(),
        "Not implemented: SFS sampling restricted to segments"
    );
}

#[test]
fn io_errors_convert() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
    let error: SamplingError = io_error.into();
    assert!(matches!(error, SamplingError::IoError(_)));
}
