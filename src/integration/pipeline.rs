//! LprPipeline: fusion, temporal voting and metrics behind one frame loop.

use std::time::Instant;

use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::consensus::{ConfirmedPlate, ConsensusWindow};
use crate::error::LprError;
use crate::frame::Frame;
use crate::metrics::{MetricsSummary, PipelineMetrics};
use crate::source::FrameSource;
use crate::tracker::{TrackerFactory, TrackerRegistry};

use super::detector::Inference;
use super::fusion::{FrameFusion, FrameResult, FusionMode};

/// Everything one frame produced.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutcome {
    pub mode: FusionMode,
    pub results: FrameResult,
    /// Set on the frame that completed a voting window.
    pub consensus: Option<Vec<ConfirmedPlate>>,
    /// The stale-window rule discarded the buffered votes on this frame.
    pub stale_reset: bool,
}

/// End-to-end licence plate recognition over a frame stream.
///
/// Combines two [`Inference`] backends (plates and characters) with a tracker
/// factory. Frames are processed strictly in order.
///
/// # Example
///
/// ```ignore
/// use plate_stream::{LprPipeline, PipelineConfig, ImageSequenceSource, TemplateTracker};
///
/// let mut pipeline = LprPipeline::new(plate_model, char_model, TemplateTracker::default, PipelineConfig::default())?;
/// let summary = pipeline.run(ImageSequenceSource::open("frames")?, |frame, plates| {
///     for plate in plates {
///         println!("{} {}", frame.index(), plate.text);
///     }
/// });
/// ```
pub struct LprPipeline<P, C, F: TrackerFactory> {
    fusion: FrameFusion<P, C, F>,
    window: ConsensusWindow,
    metrics: PipelineMetrics,
}

impl<P, C, F> LprPipeline<P, C, F>
where
    P: Inference,
    C: Inference,
    F: TrackerFactory,
{
    /// Build a pipeline. Fails only if `config` is invalid.
    pub fn new(plate: P, character: C, trackers: F, config: PipelineConfig) -> Result<Self, LprError> {
        config.validate()?;
        Ok(Self {
            fusion: FrameFusion::new(plate, character, trackers, &config),
            window: ConsensusWindow::from_config(&config),
            metrics: PipelineMetrics::new(),
        })
    }

    /// Build a pipeline with default thresholds and window sizes.
    pub fn with_default_config(plate: P, character: C, trackers: F) -> Self {
        let config = PipelineConfig::default();
        Self {
            fusion: FrameFusion::new(plate, character, trackers, &config),
            window: ConsensusWindow::from_config(&config),
            metrics: PipelineMetrics::new(),
        }
    }

    /// Process a single frame.
    ///
    /// The frame's readings go into the voting window first; the stale-window
    /// rule is then applied using the registry state this frame left behind.
    pub fn process_frame(&mut self, frame: &Frame) -> FrameOutcome {
        let start = Instant::now();
        let (mode, results) = self.fusion.fuse(frame, &mut self.metrics);
        let consensus = self.window.push(&results);
        let stale_reset = self.window.observe_registry(self.fusion.registry().is_empty());
        self.metrics.record_frame(start.elapsed());

        FrameOutcome {
            mode,
            results,
            consensus,
            stale_reset,
        }
    }

    /// Drive `source` until it ends or fails to produce a frame.
    ///
    /// `on_confirmed` is called with every completed vote. Metrics are reset
    /// when the run starts and the returned summary covers this run only.
    pub fn run<S, H>(&mut self, source: S, mut on_confirmed: H) -> MetricsSummary
    where
        S: FrameSource,
        H: FnMut(&Frame, &[ConfirmedPlate]),
    {
        self.metrics.reset();

        for next in source {
            let frame = match next {
                Ok(frame) => frame,
                Err(err) => {
                    warn!(error = %err, "frame source failed, stopping");
                    break;
                }
            };

            let outcome = self.process_frame(&frame);
            if let Some(confirmed) = outcome.consensus {
                let summary = self.metrics.summary();
                for plate in &confirmed {
                    info!(
                        frame = frame.index(),
                        slot = plate.slot,
                        text = %plate.text,
                        votes = plate.votes,
                        total = plate.total,
                        plate_ms = summary.mean_plate_ms.unwrap_or_default(),
                        char_ms = summary.mean_char_ms.unwrap_or_default(),
                        "plate confirmed"
                    );
                }
                on_confirmed(&frame, &confirmed);
            }
        }

        let summary = self.metrics.flush();
        info!(
            frames = summary.frames,
            mean_plate_ms = summary.mean_plate_ms.unwrap_or_default(),
            mean_char_ms = summary.mean_char_ms.unwrap_or_default(),
            mean_fps = summary.mean_fps.unwrap_or_default(),
            "run finished"
        );
        summary
    }

    pub fn registry(&self) -> &TrackerRegistry<F> {
        self.fusion.registry()
    }

    pub fn window(&self) -> &ConsensusWindow {
        &self.window
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }
}
