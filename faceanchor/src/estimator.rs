//! # Anchor pose estimation

use crate::camera::CoordinateMapper;
use crate::error::TrackingError;
use crate::observation::FaceObservation;
use crate::pose::AnchorPose;
use crate::properties::{Properties, PropertyMut};
use crate::strategies::{ear_yaw::EarYaw, eye_roll::EyeRoll, pose_matrix::PoseMatrixDecompose};

/// Generic anchor pose estimator
pub trait Estimator {
    /// Estimate the anchor pose from a single frame.
    ///
    /// Estimators are pure: calling this twice with the same arguments yields the same pose.
    ///
    /// # Arguments
    ///
    /// * `observation` - landmarks of the tracked face.
    /// * `mapper` - converts landmarks into world space.
    /// * `previous` - last good pose, used to recover from degenerate orientation.
    fn estimate(
        &self,
        observation: &FaceObservation,
        mapper: &CoordinateMapper,
        previous: Option<&AnchorPose>,
    ) -> Result<AnchorPose, TrackingError>;

    /// Human readable name of the estimator.
    fn name(&self) -> &'static str;
}

/// Closed set of supported estimation strategies.
///
/// The strategy is chosen once per tracking session and never mixed between frames.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum EstimationStrategy {
    EyeVectorRoll(EyeRoll),
    EarYawForeheadLift(EarYaw),
    PoseMatrixDecompose(PoseMatrixDecompose),
}

impl Default for EstimationStrategy {
    fn default() -> Self {
        Self::EyeVectorRoll(Default::default())
    }
}

impl EstimationStrategy {
    /// Parse a strategy name, using default settings for it.
    ///
    /// Accepts `eye-roll`, `ear-yaw` and `pose-matrix`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "eye-roll" | "eye_vector_roll" => Some(Self::EyeVectorRoll(Default::default())),
            "ear-yaw" | "ear_yaw_forehead_lift" => {
                Some(Self::EarYawForeheadLift(Default::default()))
            }
            "pose-matrix" | "pose_matrix_decompose" => {
                Some(Self::PoseMatrixDecompose(Default::default()))
            }
            _ => None,
        }
    }

    /// Default settings of every strategy.
    pub fn all() -> [Self; 3] {
        [
            Self::EyeVectorRoll(Default::default()),
            Self::EarYawForeheadLift(Default::default()),
            Self::PoseMatrixDecompose(Default::default()),
        ]
    }

    fn inner(&self) -> &dyn Estimator {
        match self {
            Self::EyeVectorRoll(s) => s,
            Self::EarYawForeheadLift(s) => s,
            Self::PoseMatrixDecompose(s) => s,
        }
    }
}

impl Estimator for EstimationStrategy {
    fn estimate(
        &self,
        observation: &FaceObservation,
        mapper: &CoordinateMapper,
        previous: Option<&AnchorPose>,
    ) -> Result<AnchorPose, TrackingError> {
        self.inner().estimate(observation, mapper, previous)
    }

    fn name(&self) -> &'static str {
        self.inner().name()
    }
}

impl Properties for EstimationStrategy {
    fn props_mut(&mut self) -> Vec<(&str, PropertyMut)> {
        match self {
            Self::EyeVectorRoll(s) => s.props_mut(),
            Self::EarYawForeheadLift(s) => s.props_mut(),
            Self::PoseMatrixDecompose(s) => s.props_mut(),
        }
    }
}
