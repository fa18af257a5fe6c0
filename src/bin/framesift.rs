use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use framesift::{
    ConversionOptions, FrameReader, LumaGridEncoder, MediaFile, OperationType, PixelFormat,
    ProgressCallback, ProgressInfo, ReaderOptions, RoutedSelection, SamplerOptions,
    SamplingConfig, SegmentRouter, SegmentSpec, convert_indices_to_segments,
};
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  framesift info input.mp4 --json\n  framesift sample input.mp4 --config sfs.json --out frames --progress\n  framesift route input.mp4 --result \"[2, 3]\" --frames 0,900,1800,2700 --config fps.json\n  framesift segments --result \"[1,2]\" --frames 0,10,20,30 --fps 1\n  framesift completions zsh > _framesift";

#[derive(Debug, Parser)]
#[command(
    name = "framesift",
    version,
    about = "Pick a small, information-dense set of frames from a video",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show debug logging output.
    #[arg(long, global = true)]
    verbose: bool,

    /// Show a progress bar while decoding, encoding, and selecting.
    #[arg(long, global = true)]
    progress: bool,

    /// Allow writing into existing output directories.
    #[arg(long, global = true)]
    overwrite: bool,

    /// Decoder thread count (0 lets FFmpeg decide).
    #[arg(long, global = true)]
    threads: Option<usize>,

    /// Pixel format of decoded frames (rgb8, rgba8, gray8).
    #[arg(long, global = true)]
    pixel_format: Option<String>,

    /// Side of the grayscale grid used as the SFS frame embedding.
    #[arg(long, global = true, default_value_t = 16)]
    grid: u32,

    /// Maximum number of frames handed to the encoder at once.
    #[arg(long, global = true)]
    encode_batch_size: Option<usize>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print reader metadata for a video.
    #[command(
        about = "Print video metadata",
        after_help = "Examples:\n  framesift info input.mp4\n  framesift info input.mp4 --json"
    )]
    Info {
        /// Input video path.
        input: PathBuf,

        /// Output metadata as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Sample frame indices from a video.
    #[command(
        about = "Sample frames with a configured strategy",
        after_help = "Examples:\n  framesift sample input.mp4 --config fixed.json\n  framesift sample input.mp4 --config fps.json --segments segments.json --out frames"
    )]
    Sample {
        /// Input video path.
        input: PathBuf,
        /// Sampling configuration (JSON).
        #[arg(long)]
        config: PathBuf,
        /// Segment list (JSON array of {start, end} or [start, end]).
        #[arg(long)]
        segments: Option<PathBuf>,
        /// Save the chosen frames into this directory.
        #[arg(long)]
        out: Option<PathBuf>,
        /// Output image extension (png, jpg, jpeg, bmp, tiff).
        #[arg(long, default_value = "png")]
        ext: String,
        /// Output the selection as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Convert an upstream selection into segments and sample inside them.
    #[command(
        about = "Sample around frames chosen by an upstream step",
        after_help = "Examples:\n  framesift route input.mp4 --result \"Images [2, 3]\" --frames 0,900,1800,2700 --config fixed.json"
    )]
    Route {
        /// Input video path.
        input: PathBuf,
        /// Upstream answer naming 1-based representative frames.
        #[arg(long)]
        result: String,
        /// Comma-separated representative frame indices.
        #[arg(long)]
        frames: String,
        /// Frame rate of the representative indices (defaults to the video's).
        #[arg(long)]
        fps: Option<f64>,
        /// Cap on the total segment duration, in minutes.
        #[arg(long, default_value_t = 60.0)]
        max_minutes: f64,
        /// Minimum window extent on each side of a frame, in seconds.
        #[arg(long, default_value_t = 30.0)]
        min_side: f64,
        /// Sampling configuration (JSON).
        #[arg(long)]
        config: PathBuf,
        /// Save the chosen frames into this directory.
        #[arg(long)]
        out: Option<PathBuf>,
        /// Output image extension (png, jpg, jpeg, bmp, tiff).
        #[arg(long, default_value = "png")]
        ext: String,
        /// Output the selection as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Convert an upstream selection into segments and print them as JSON.
    #[command(about = "Convert chosen indices to time segments")]
    Segments {
        /// Upstream answer naming 1-based representative frames.
        #[arg(long)]
        result: String,
        /// Comma-separated representative frame indices.
        #[arg(long)]
        frames: String,
        /// Frame rate of the representative indices.
        #[arg(long)]
        fps: f64,
        /// Cap on the total segment duration, in minutes.
        #[arg(long, default_value_t = 60.0)]
        max_minutes: f64,
        /// Minimum window extent on each side of a frame, in seconds.
        #[arg(long, default_value_t = 30.0)]
        min_side: f64,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_pixel_format(value: &str) -> Option<PixelFormat> {
    match value.to_ascii_lowercase().as_str() {
        "rgb8" | "rgb" => Some(PixelFormat::Rgb8),
        "rgba8" | "rgba" => Some(PixelFormat::Rgba8),
        "gray8" | "gray" | "greyscale" | "grayscale" => Some(PixelFormat::Gray8),
        _ => None,
    }
}

fn parse_frame_list(value: &str) -> Result<Vec<u64>, Box<dyn std::error::Error>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| -> Result<u64, Box<dyn std::error::Error>> {
            Ok(part
                .parse::<u64>()
                .map_err(|error| format!("invalid frame index {part:?}: {error}"))?)
        })
        .collect()
}

fn read_segments(path: &Path) -> Result<Vec<SegmentSpec>, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn init_logging(global: &GlobalOptions) {
    let level = if global.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
}

fn reader_options(global: &GlobalOptions) -> Result<ReaderOptions, Box<dyn std::error::Error>> {
    let mut options = ReaderOptions::new();

    if let Some(pixel_str) = &global.pixel_format {
        let pixel = parse_pixel_format(pixel_str)
            .ok_or(format!("unsupported --pixel-format: {pixel_str}"))?;
        options = options.with_pixel_format(pixel);
    }
    if let Some(threads) = global.threads {
        options = options.with_threads(threads);
    }

    Ok(options)
}

fn sampler_options(global: &GlobalOptions) -> SamplerOptions {
    let mut options = SamplerOptions::new();
    if global.progress {
        options = options.with_progress(Arc::new(TerminalProgress::new()));
    }
    if let Some(size) = global.encode_batch_size {
        options = options.with_encode_batch_size(size);
    }
    options
}

fn open_input(
    input: &Path,
    global: &GlobalOptions,
) -> Result<MediaFile, Box<dyn std::error::Error>> {
    Ok(MediaFile::open_with_options(input, reader_options(global)?)?)
}

fn prepare_output_directory(out: &Path, overwrite: bool) -> Result<(), Box<dyn std::error::Error>> {
    if out.exists() {
        if !overwrite {
            return Err(format!(
                "output directory already exists: {} (use --overwrite)",
                out.display()
            )
            .into());
        }
        eprintln!(
            "{} {}",
            "warning:".yellow().bold(),
            format!("writing into existing directory {}", out.display()).yellow()
        );
    }
    fs::create_dir_all(out)?;
    Ok(())
}

fn save_frames(
    reader: &mut MediaFile,
    frames: &[u64],
    out: &Path,
    ext: &str,
    global: &GlobalOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    prepare_output_directory(out, global.overwrite)?;
    let ext_clean = ext.trim_start_matches('.').to_ascii_lowercase();

    let images = reader.frames(frames)?;
    for (frame_number, image) in frames.iter().zip(images) {
        let output_path = out.join(format!("frame_{frame_number:06}.{ext_clean}"));
        image.save(&output_path)?;
        log::debug!("saved {}", output_path.display());
    }

    println!(
        "{} {} frames to {}",
        "saved".green().bold(),
        frames.len(),
        out.display()
    );
    Ok(())
}

fn print_selection(selection: &RoutedSelection, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(selection)?);
        return Ok(());
    }

    for segment in &selection.segments {
        println!("{} {segment}", "segment".cyan().bold());
    }
    let frames: Vec<String> = selection.frames.iter().map(u64::to_string).collect();
    println!(
        "{} {} frames: {}",
        "selected".green().bold(),
        selection.frames.len(),
        frames.join(", ")
    );
    Ok(())
}

/// Draws one progress bar per operation on stderr.
struct TerminalProgress {
    active: Mutex<Option<(OperationType, ProgressBar)>>,
}

impl TerminalProgress {
    fn new() -> Self {
        Self {
            active: Mutex::new(None),
        }
    }

    fn start_bar(operation: OperationType, total: Option<u64>) -> ProgressBar {
        let bar = ProgressBar::new(total.unwrap_or(0));
        if let Ok(style) =
            ProgressStyle::with_template("{spinner:.green} {msg:>10} {bar:40.cyan/blue} {pos}/{len}")
        {
            bar.set_style(style.progress_chars("##-"));
        }
        bar.set_message(match operation {
            OperationType::FrameDecoding => "decoding",
            OperationType::FeatureEncoding => "encoding",
            OperationType::FrameSelection => "selecting",
            _ => "working",
        });
        bar
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        let Ok(mut active) = self.active.lock() else {
            return;
        };
        if active.as_ref().is_none_or(|(operation, _)| *operation != info.operation) {
            if let Some((_, previous)) = active.take() {
                previous.finish_and_clear();
            }
            *active = Some((info.operation, Self::start_bar(info.operation, info.total)));
        }
        let finished = info.total.is_some_and(|total| info.current >= total);
        if let Some((_, bar)) = active.as_ref() {
            bar.set_position(info.current);
            if finished {
                bar.finish_and_clear();
            }
        }
        if finished {
            *active = None;
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli.global);

    match cli.command {
        Commands::Info { input, json } => {
            let reader = open_input(&input, &cli.global)?;
            let metadata = reader.metadata();
            let video = &metadata.video;
            if json {
                let payload = json!({
                    "format": metadata.format,
                    "duration_seconds": metadata.duration.as_secs_f64(),
                    "video": {
                        "width": video.width,
                        "height": video.height,
                        "fps": video.frames_per_second,
                        "frame_count": video.frame_count,
                        "codec": video.codec,
                        "stream_index": video.stream_index,
                    },
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("Format: {}", metadata.format);
                println!("Duration: {:?}", metadata.duration);
                println!(
                    "Video: {}x{}, {:.3} fps, {} frames, codec={}",
                    video.width,
                    video.height,
                    video.frames_per_second,
                    video.frame_count,
                    video.codec
                );
            }
        }
        Commands::Sample {
            input,
            config,
            segments,
            out,
            ext,
            json,
        } => {
            let config = SamplingConfig::from_json_file(&config)?;
            let segments = match segments {
                Some(path) => read_segments(&path)?,
                None => Vec::new(),
            };

            let mut reader = open_input(&input, &cli.global)?;
            let mut router = SegmentRouter::with_options(
                LumaGridEncoder::new(cli.global.grid),
                sampler_options(&cli.global),
            );
            let selection = router.sample(&mut reader, &config, segments)?;
            print_selection(&selection, json)?;

            if let Some(out) = out {
                save_frames(&mut reader, &selection.frames, &out, &ext, &cli.global)?;
            }
        }
        Commands::Route {
            input,
            result,
            frames,
            fps,
            max_minutes,
            min_side,
            config,
            out,
            ext,
            json,
        } => {
            let config = SamplingConfig::from_json_file(&config)?;
            let frame_indices = parse_frame_list(&frames)?;

            let mut reader = open_input(&input, &cli.global)?;
            let fps = fps.unwrap_or_else(|| reader.native_fps());
            let mut router = SegmentRouter::with_options(
                LumaGridEncoder::new(cli.global.grid),
                sampler_options(&cli.global),
            )
            .with_conversion(
                ConversionOptions::new()
                    .with_max_duration_minutes(max_minutes)
                    .with_min_side_length(min_side),
            );
            let selection = router.route(&mut reader, &result, &frame_indices, fps, &config)?;
            print_selection(&selection, json)?;

            if let Some(out) = out {
                save_frames(&mut reader, &selection.frames, &out, &ext, &cli.global)?;
            }
        }
        Commands::Segments {
            result,
            frames,
            fps,
            max_minutes,
            min_side,
        } => {
            let frame_indices = parse_frame_list(&frames)?;
            let options = ConversionOptions::new()
                .with_max_duration_minutes(max_minutes)
                .with_min_side_length(min_side);
            let segments = convert_indices_to_segments(&result, &frame_indices, fps, &options);
            println!("{}", serde_json::to_string_pretty(&segments)?);
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "framesift", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, parse_frame_list, parse_pixel_format};
    use clap::CommandFactory;

    #[test]
    fn parse_pixel_format_aliases() {
        assert!(parse_pixel_format("rgb").is_some());
        assert!(parse_pixel_format("RGBA8").is_some());
        assert!(parse_pixel_format("grayscale").is_some());
        assert!(parse_pixel_format("yuv420p").is_none());
    }

    #[test]
    fn parse_frame_list_accepts_spaces() {
        assert_eq!(parse_frame_list("0, 900 ,1800,").unwrap(), vec![0, 900, 1800]);
        assert!(parse_frame_list("0,ten").is_err());
    }

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
