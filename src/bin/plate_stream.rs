//! Offline licence plate recognition over a directory of frames, or with the
//! `opencv-backend` feature over a video file or capture device.
//!
//! Detector outputs are replayed from JSON-lines recordings, one line per
//! inference call.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use plate_stream::tracker::TemplateTracker;
use plate_stream::{
    FrameSource, ImageSequenceSource, LprPipeline, PipelineConfig, ReplayInference,
    SingleObjectTracker,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TrackerKind {
    /// Kalman-predicted template matching
    Template,
    /// OpenCV KCF correlation filter
    #[cfg(feature = "opencv-backend")]
    Kcf,
}

#[derive(Debug, Parser)]
#[command(name = "plate-stream", version, about = "Licence plate recognition over frame sequences")]
#[cfg_attr(
    not(feature = "opencv-backend"),
    command(group(ArgGroup::new("input").required(true).args(["frames"])))
)]
#[cfg_attr(
    feature = "opencv-backend",
    command(group(ArgGroup::new("input").required(true).args(["frames", "video", "device"])))
)]
struct Args {
    /// Directory of frames (png/jpg), processed in natural file name order
    #[arg(long, value_name = "DIR")]
    frames: Option<PathBuf>,

    /// Video file to decode
    #[cfg(feature = "opencv-backend")]
    #[arg(long, value_name = "PATH")]
    video: Option<PathBuf>,

    /// Capture device index
    #[cfg(feature = "opencv-backend")]
    #[arg(long, value_name = "INDEX")]
    device: Option<i32>,

    /// Plate tracker used between detections
    #[arg(long, value_enum, default_value_t = TrackerKind::Template)]
    tracker: TrackerKind,

    /// Recorded plate detector outputs (JSON lines)
    #[arg(long)]
    plate_replay: PathBuf,

    /// Recorded character detector outputs (JSON lines)
    #[arg(long)]
    char_replay: PathBuf,

    /// Pipeline configuration (JSON); defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Plate detector objectness threshold
    #[arg(long)]
    plate_thres: Option<f32>,

    /// Plate detector NMS IoU threshold
    #[arg(long)]
    plate_nms: Option<f32>,

    /// Character detector objectness threshold
    #[arg(long)]
    char_thres: Option<f32>,

    /// Character detector NMS IoU threshold
    #[arg(long)]
    char_nms: Option<f32>,

    /// Stop after this many frames (0 = all)
    #[arg(long, default_value_t = 0)]
    max_frames: usize,
}

impl Args {
    fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_path(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => PipelineConfig::default(),
        };
        if let Some(v) = self.plate_thres {
            config.plate.conf_threshold = v;
        }
        if let Some(v) = self.plate_nms {
            config.plate.nms_threshold = v;
        }
        if let Some(v) = self.char_thres {
            config.character.conf_threshold = v;
        }
        if let Some(v) = self.char_nms {
            config.character.nms_threshold = v;
        }
        Ok(config)
    }

    fn open_source(&self) -> Result<Box<dyn FrameSource>> {
        if let Some(dir) = &self.frames {
            let source = ImageSequenceSource::open(dir)
                .with_context(|| format!("opening frames {}", dir.display()))?;
            info!(frames = source.remaining(), dir = %dir.display(), "frame directory opened");
            return Ok(Box::new(source));
        }

        #[cfg(feature = "opencv-backend")]
        {
            if let Some(path) = &self.video {
                let source = plate_stream::VideoSource::open(path)
                    .with_context(|| format!("opening video {}", path.display()))?;
                return Ok(Box::new(source));
            }
            if let Some(index) = self.device {
                let source = plate_stream::VideoSource::open_device(index)
                    .with_context(|| format!("opening capture device {index}"))?;
                return Ok(Box::new(source));
            }
        }

        anyhow::bail!("no frame input given")
    }
}

fn new_tracker(kind: TrackerKind) -> Box<dyn SingleObjectTracker> {
    match kind {
        TrackerKind::Template => Box::new(TemplateTracker::default()),
        #[cfg(feature = "opencv-backend")]
        TrackerKind::Kcf => Box::new(plate_stream::tracker::KcfTracker::new()),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "plate_stream=info".into()),
        )
        .init();

    let args = Args::parse();
    let config = args.pipeline_config()?;

    let plates = ReplayInference::from_path(&args.plate_replay)
        .with_context(|| format!("loading plate replay {}", args.plate_replay.display()))?;
    let chars = ReplayInference::from_path(&args.char_replay)
        .with_context(|| format!("loading character replay {}", args.char_replay.display()))?;
    let source = args.open_source()?;
    info!(
        tracker = ?args.tracker,
        plate_calls = plates.remaining(),
        char_calls = chars.remaining(),
        "inputs loaded"
    );

    let kind = args.tracker;
    let mut pipeline = LprPipeline::new(plates, chars, move || new_tracker(kind), config)
        .context("invalid pipeline configuration")?;

    let limit = if args.max_frames == 0 {
        usize::MAX
    } else {
        args.max_frames
    };
    let summary = pipeline.run(source.take(limit), |frame, confirmed| {
        for plate in confirmed {
            println!(
                "frame {:>6}  slot {}  {}  ({}/{})",
                frame.index(),
                plate.slot,
                plate.text,
                plate.votes,
                plate.total
            );
        }
    });

    println!(
        "frames: {}  plate detection: {:.2} ms  character recognition: {:.2} ms  fps: {:.1}",
        summary.frames,
        summary.mean_plate_ms.unwrap_or_default(),
        summary.mean_char_ms.unwrap_or_default(),
        summary.mean_fps.unwrap_or_default()
    );
    Ok(())
}
