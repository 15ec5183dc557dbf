//! # Anchor transform engine
//!
//! Owns the per-session tracking state and turns per-frame strategy estimates into the pose that
//! is handed to the renderer. Frames that fail to produce an estimate never abort the render
//! loop: the last good pose is held instead.

use crate::camera::{CoordinateMapper, StandardCamera};
use crate::config::EngineSettings;
use crate::error::TrackingError;
use crate::estimator::{EstimationStrategy, Estimator};
use crate::observation::FaceObservation;
use crate::pose::AnchorPose;
use crate::prelude::v1::{anyhow, Result};
use crate::strategies::finite;
use log::*;
use nalgebra as na;

/// Lifecycle of a tracking session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// No session running, updates are ignored.
    Idle,
    /// Camera stream is active and updates are flowing.
    Tracking,
}

/// Result of a single engine tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FrameOutcome {
    /// The strategy produced a fresh pose.
    Estimated(AnchorPose),
    /// No estimate this frame, the last good pose is held.
    Held(AnchorPose, TrackingError),
    /// No estimate this frame and no pose was ever produced. The asset must not be drawn.
    Empty(TrackingError),
    /// The engine is idle.
    Inactive,
}

impl FrameOutcome {
    /// Pose to hand over to the renderer.
    pub fn pose(&self) -> Option<AnchorPose> {
        match self {
            Self::Estimated(pose) | Self::Held(pose, _) => Some(*pose),
            Self::Empty(_) | Self::Inactive => None,
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            Self::Estimated(_) => "estimated",
            Self::Held(_, _) => "held",
            Self::Empty(_) | Self::Inactive => "none",
        }
    }

    pub fn error(&self) -> Option<TrackingError> {
        match self {
            Self::Held(_, e) | Self::Empty(e) => Some(*e),
            _ => None,
        }
    }
}

/// Per-session frame counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub struct TrackingStats {
    pub frames: usize,
    pub estimated: usize,
    pub held: usize,
    pub empty: usize,
    pub no_face: usize,
    pub missing_input: usize,
    pub degenerate: usize,
}

impl TrackingStats {
    fn record(&mut self, outcome: &FrameOutcome) {
        match outcome {
            FrameOutcome::Inactive => return,
            FrameOutcome::Estimated(_) => self.estimated += 1,
            FrameOutcome::Held(_, _) => self.held += 1,
            FrameOutcome::Empty(_) => self.empty += 1,
        }

        self.frames += 1;

        match outcome.error() {
            Some(TrackingError::NoFaceThisFrame) => self.no_face += 1,
            Some(TrackingError::DegenerateGeometry) => self.degenerate += 1,
            Some(_) => self.missing_input += 1,
            None => {}
        }
    }

    /// Fraction of frames that produced a fresh estimate.
    pub fn estimate_ratio(&self) -> f32 {
        if self.frames == 0 {
            0.0
        } else {
            self.estimated as f32 / self.frames as f32
        }
    }
}

/// Exponential moving average between consecutive good poses.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PoseSmoother {
    factor: f32,
}

impl PoseSmoother {
    /// Create a new smoother.
    ///
    /// # Arguments
    ///
    /// * `factor` - weight of the newest estimate, clamped to `(0; 1]`. `1` disables smoothing,
    /// and so does a non-finite factor.
    pub fn new(factor: f32) -> Self {
        let factor = if factor.is_finite() {
            factor.clamp(f32::EPSILON, 1.0)
        } else {
            1.0
        };

        Self { factor }
    }

    pub fn factor(&self) -> f32 {
        self.factor
    }

    /// Blend a fresh estimate with the previous good pose.
    pub fn apply(&self, previous: Option<&AnchorPose>, raw: AnchorPose) -> AnchorPose {
        match previous {
            Some(prev) => prev.interpolate(&raw, self.factor),
            None => raw,
        }
    }
}

/// Stateful facial anchor tracker.
///
/// The host calls [`update`](Self::update) once per display tick with the latest observation and
/// applies the returned pose to the tracked asset. The engine never blocks and never fails a tick.
pub struct AnchorEngine {
    strategy: EstimationStrategy,
    mapper: CoordinateMapper,
    smoother: Option<PoseSmoother>,
    last_good: Option<AnchorPose>,
    state: SessionState,
    stats: TrackingStats,
    reported_mismatch: bool,
}

impl AnchorEngine {
    /// Create an idle engine from session settings.
    ///
    /// Fails if the settings do not describe a usable camera or smoothing factor.
    pub fn new(settings: &EngineSettings) -> Result<Self> {
        settings.validate()?;
        let mut engine = Self::with_strategy(settings.strategy, settings.mapper());
        engine.smoother = settings.smoothing.map(PoseSmoother::new);
        Ok(engine)
    }

    /// Create an idle engine with an explicit strategy and mapper.
    pub fn with_strategy(strategy: EstimationStrategy, mapper: CoordinateMapper) -> Self {
        Self {
            strategy,
            mapper,
            smoother: None,
            last_good: None,
            state: SessionState::Idle,
            stats: Default::default(),
            reported_mismatch: false,
        }
    }

    pub fn with_smoother(mut self, smoother: PoseSmoother) -> Self {
        self.smoother = Some(smoother);
        self
    }

    /// Start (or restart) a tracking session.
    ///
    /// Any previously tracked pose is forgotten.
    pub fn start(&mut self) {
        info!("starting {} tracking session", self.strategy.name());
        self.last_good = None;
        self.stats = Default::default();
        self.reported_mismatch = false;
        self.state = SessionState::Tracking;
    }

    /// Stop the tracking session.
    pub fn stop(&mut self) {
        if self.state == SessionState::Tracking {
            info!(
                "stopping {} tracking session after {} frames",
                self.strategy.name(),
                self.stats.frames
            );
        }
        self.state = SessionState::Idle;
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_tracking(&self) -> bool {
        self.state == SessionState::Tracking
    }

    pub fn strategy(&self) -> &EstimationStrategy {
        &self.strategy
    }

    /// Replace the estimation strategy.
    ///
    /// Strategies are never mixed within a session, so this is only allowed while idle.
    pub fn set_strategy(&mut self, strategy: EstimationStrategy) -> Result<()> {
        if self.is_tracking() {
            return Err(anyhow!("cannot switch strategy while tracking"));
        }
        self.strategy = strategy;
        Ok(())
    }

    pub fn mapper(&self) -> &CoordinateMapper {
        &self.mapper
    }

    /// Update the renderer's camera, typically after a resize.
    pub fn set_camera(&mut self, camera: StandardCamera, view: na::Matrix4<f32>) {
        self.mapper = CoordinateMapper::new(camera, view, self.mapper.mirrored());
    }

    pub fn last_good_pose(&self) -> Option<&AnchorPose> {
        self.last_good.as_ref()
    }

    pub fn stats(&self) -> &TrackingStats {
        &self.stats
    }

    /// Process a single frame and get the pose to render.
    ///
    /// Returns `None` when the asset should not be drawn this frame.
    pub fn update(&mut self, observation: Option<&FaceObservation>) -> Option<AnchorPose> {
        self.step(observation).pose()
    }

    /// Process a single frame containing any number of faces.
    ///
    /// Only the first face is tracked, the rest are ignored.
    pub fn update_frame(&mut self, faces: &[FaceObservation]) -> Option<AnchorPose> {
        self.update(faces.first())
    }

    /// Process a single frame and get a detailed outcome.
    pub fn step(&mut self, observation: Option<&FaceObservation>) -> FrameOutcome {
        if !self.is_tracking() {
            debug!("update called while idle");
            return FrameOutcome::Inactive;
        }

        let estimate = observation
            .ok_or(TrackingError::NoFaceThisFrame)
            .and_then(|obs| {
                self.strategy
                    .estimate(obs, &self.mapper, self.last_good.as_ref())
            });

        let estimate = estimate.and_then(|raw| match &self.smoother {
            Some(smoother) => finite(smoother.apply(self.last_good.as_ref(), raw)),
            None => Ok(raw),
        });

        let outcome = match estimate {
            Ok(pose) => {
                self.last_good = Some(pose);
                FrameOutcome::Estimated(pose)
            }
            Err(err) => {
                self.report(err);
                match self.last_good {
                    Some(pose) => FrameOutcome::Held(pose, err),
                    None => FrameOutcome::Empty(err),
                }
            }
        };

        self.stats.record(&outcome);

        outcome
    }

    fn report(&mut self, err: TrackingError) {
        if err.is_contract_mismatch() {
            if !self.reported_mismatch {
                warn!(
                    "{} strategy cannot use the detector output: {err}",
                    self.strategy.name()
                );
                self.reported_mismatch = true;
            }
        } else {
            debug!("frame {} ({}): {err}", self.stats.frames, err.kind());
        }
    }
}
