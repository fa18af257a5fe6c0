//! Lazy, pull-based frame decoding.
//!
//! [`FrameIterator`] decodes just enough packets to produce the next
//! requested frame. [`MediaFile`](crate::MediaFile) drives it to answer
//! [`FrameReader::frames`](crate::FrameReader::frames) requests.

use ffmpeg_next::{
    Error as FfmpegError, Packet, Rational,
    codec::{context::Context as CodecContext, threading::Config as ThreadingConfig},
    decoder::Video as VideoDecoder,
    frame::Video as VideoFrame,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};

use crate::configuration::{FrameOutputOptions, PixelFormat};
use crate::error::SamplingError;
use crate::media::MediaFile;

/// A lazy iterator over decoded video frames.
///
/// Yields `(requested_frame_number, image)` pairs in ascending order. When
/// the decoder steps over a requested number (imprecise timestamps), the
/// next decoded frame stands in for it. The iterator borrows the reader
/// mutably, so no other decoding can happen while it is alive.
pub struct FrameIterator<'a> {
    reader: &'a mut MediaFile,
    decoder: VideoDecoder,
    scaler: ScalingContext,
    video_stream_index: usize,
    /// Sorted, deduplicated frame numbers to yield.
    target_frames: Vec<u64>,
    /// Index into `target_frames` pointing to the next frame to yield.
    target_index: usize,
    time_base: Rational,
    fps: f64,
    output: FrameOutputOptions,
    target_width: u32,
    target_height: u32,
    decoded_frame: VideoFrame,
    scaled_frame: VideoFrame,
    /// Last converted frame, reused for targets it already covers.
    last_image: Option<(u64, DynamicImage)>,
    eof_sent: bool,
    done: bool,
}

impl<'a> FrameIterator<'a> {
    /// Create a new iterator over `frame_numbers`, which must be sorted and
    /// deduplicated. Seeks to the first requested frame and decodes forward.
    pub(crate) fn new(
        reader: &'a mut MediaFile,
        frame_numbers: Vec<u64>,
    ) -> Result<Self, SamplingError> {
        let video_stream_index = reader.metadata.video.stream_index;
        let fps = reader.metadata.video.frames_per_second;
        let output = reader.options.frame_output.clone();
        let (target_width, target_height) = output
            .resolve_dimensions(reader.metadata.video.width, reader.metadata.video.height);

        let stream = reader
            .input_context
            .stream(video_stream_index)
            .ok_or(SamplingError::NoVideoStream)?;
        let time_base = stream.time_base();
        let mut decoder_context = CodecContext::from_parameters(stream.parameters())?;
        if let Some(threads) = reader.options.threads {
            decoder_context.set_threading(ThreadingConfig::count(threads));
        }
        let decoder = decoder_context.decoder().video()?;

        let scaler = ScalingContext::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            output.pixel_format.to_ffmpeg_pixel(),
            target_width,
            target_height,
            ScalingFlags::BILINEAR,
        )?;

        if let Some(&first) = frame_numbers.first() {
            let seek_timestamp = crate::conversion::frame_number_to_seek_timestamp(first, fps);
            if let Err(error) = reader.input_context.seek(seek_timestamp, ..seek_timestamp) {
                log::warn!("Seek to frame {first} failed ({error}), decoding from current position");
            }
        }

        Ok(Self {
            reader,
            decoder,
            scaler,
            video_stream_index,
            target_frames: frame_numbers,
            target_index: 0,
            time_base,
            fps,
            output,
            target_width,
            target_height,
            decoded_frame: VideoFrame::empty(),
            scaled_frame: VideoFrame::empty(),
            last_image: None,
            eof_sent: false,
            done: false,
        })
    }

    /// Scale and convert the current `decoded_frame` to a `DynamicImage`.
    fn convert_current_frame(&mut self) -> Result<DynamicImage, SamplingError> {
        self.scaler.run(&self.decoded_frame, &mut self.scaled_frame)?;

        let width = self.target_width;
        let height = self.target_height;
        let format = self.output.pixel_format;
        let buffer = crate::conversion::frame_to_buffer(
            &self.scaled_frame,
            width,
            height,
            format.bytes_per_pixel(),
        );

        let image = match format {
            PixelFormat::Rgb8 => RgbImage::from_raw(width, height, buffer).map(DynamicImage::ImageRgb8),
            PixelFormat::Rgba8 => {
                RgbaImage::from_raw(width, height, buffer).map(DynamicImage::ImageRgba8)
            }
            PixelFormat::Gray8 => {
                GrayImage::from_raw(width, height, buffer).map(DynamicImage::ImageLuma8)
            }
        };
        image.ok_or_else(|| {
            SamplingError::VideoDecodeError(format!(
                "Failed to construct {format:?} image from decoded frame data"
            ))
        })
    }

    fn take_target(&mut self) -> u64 {
        let target = self.target_frames[self.target_index];
        self.target_index += 1;
        target
    }
}

impl Iterator for FrameIterator<'_> {
    type Item = Result<(u64, DynamicImage), SamplingError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.target_index >= self.target_frames.len() {
            return None;
        }

        // A frame decoded past several targets covers all of them.
        if let Some((frame_number, image)) = &self.last_image {
            if self.target_frames[self.target_index] <= *frame_number {
                let image = image.clone();
                return Some(Ok((self.take_target(), image)));
            }
            self.last_image = None;
        }

        loop {
            if self.decoder.receive_frame(&mut self.decoded_frame).is_ok() {
                let pts = self.decoded_frame.pts().unwrap_or(0);
                let current_frame =
                    crate::conversion::pts_to_frame_number(pts, self.time_base, self.fps);

                if current_frame < self.target_frames[self.target_index] {
                    continue;
                }

                return match self.convert_current_frame() {
                    Ok(image) => {
                        self.last_image = Some((current_frame, image.clone()));
                        Some(Ok((self.take_target(), image)))
                    }
                    Err(error) => {
                        self.done = true;
                        Some(Err(error))
                    }
                };
            }

            if self.eof_sent {
                self.done = true;
                return None;
            }

            let mut packet = Packet::empty();
            match packet.read(&mut self.reader.input_context) {
                Ok(()) => {
                    if packet.stream() == self.video_stream_index {
                        if let Err(error) = self.decoder.send_packet(&packet) {
                            self.done = true;
                            return Some(Err(SamplingError::from(error)));
                        }
                    }
                }
                Err(FfmpegError::Eof) => {
                    if let Err(error) = self.decoder.send_eof() {
                        self.done = true;
                        return Some(Err(SamplingError::from(error)));
                    }
                    self.eof_sent = true;
                }
                Err(error) => {
                    log::trace!("Skipping unreadable packet: {error}");
                }
            }
        }
    }
}
