//! # Eye vector roll
//!
//! Places the asset between the outer eye corners, or on the nose bridge, and rotates it about the
//! view axis to follow head roll. Pitch and yaw of the head are not modelled, so the asset looks flat when the head
//! turns.

use super::{finite, recover_orientation, DEGENERATE_EPS};
use crate::camera::{CoordinateMapper, MappingMode};
use crate::error::TrackingError;
use crate::estimator::Estimator;
use crate::observation::{landmarks, FaceObservation, LandmarkPoint};
use crate::pose::AnchorPose;
use crate::properties::{Properties, PropertyMut};
use nalgebra as na;

/// Roll-only estimator built on the vector between the outer eye corners.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EyeRoll {
    /// Multiplier applied to the mapped inter-eye distance.
    pub scale_gain: f32,
    pub mapping: MappingMode,
    /// Anchor on the nose bridge landmark instead of the midpoint between the eyes.
    pub nose_bridge_anchor: bool,
}

impl Default for EyeRoll {
    fn default() -> Self {
        Self {
            scale_gain: 1.0,
            mapping: MappingMode::Direct,
            nose_bridge_anchor: false,
        }
    }
}

impl Properties for EyeRoll {
    fn props_mut(&mut self) -> Vec<(&str, PropertyMut)> {
        vec![
            ("Scale gain", PropertyMut::float(&mut self.scale_gain, 0.0, 100.0)),
            ("Nose bridge anchor", PropertyMut::bool(&mut self.nose_bridge_anchor)),
        ]
    }
}

impl EyeRoll {
    /// Compute the head roll angle in radians.
    ///
    /// This is `atan2(dy, dx)` of the eye-to-eye vector in image space, going from the eye on the
    /// left of the displayed image to the one on its right. Positive values mean the right side of
    /// the face sits lower in the image.
    pub fn roll(
        &self,
        observation: &FaceObservation,
        mapper: &CoordinateMapper,
    ) -> Result<f32, TrackingError> {
        let (left, right) = self.eye_points(observation, mapper)?;

        let l = mapper.clip_coords(left);
        let r = mapper.clip_coords(right);

        // Clip space y grows upwards, image space y grows downwards.
        Ok((l.y - r.y).atan2(r.x - l.x))
    }

    fn eye_points(
        &self,
        observation: &FaceObservation,
        mapper: &CoordinateMapper,
    ) -> Result<(LandmarkPoint, LandmarkPoint), TrackingError> {
        let left = observation.landmark(landmarks::LEFT_EYE_OUTER)?;
        let right = observation.landmark(landmarks::RIGHT_EYE_OUTER)?;

        // Mirroring swaps which eye is displayed on the left.
        if mapper.mirrored() {
            Ok((right, left))
        } else {
            Ok((left, right))
        }
    }
}

impl Estimator for EyeRoll {
    fn estimate(
        &self,
        observation: &FaceObservation,
        mapper: &CoordinateMapper,
        previous: Option<&AnchorPose>,
    ) -> Result<AnchorPose, TrackingError> {
        let (left, right) = self.eye_points(observation, mapper)?;

        let l = mapper.map(left, self.mapping);
        let r = mapper.map(right, self.mapping);

        let eye_distance = (r - l).norm();

        let orientation = if eye_distance > DEGENERATE_EPS {
            // Image roll is clockwise on screen, which is a rotation about -Z in world space.
            let roll = self.roll(observation, mapper)?;
            na::UnitQuaternion::from_axis_angle(&na::Vector3::z_axis(), -roll)
        } else {
            recover_orientation(previous)?
        };

        let position = if self.nose_bridge_anchor {
            mapper.map(observation.landmark(landmarks::NOSE_BRIDGE)?, self.mapping)
        } else {
            na::center(&l, &r)
        };

        finite(AnchorPose::uniform(
            position,
            orientation,
            eye_distance * self.scale_gain,
        ))
    }

    fn name(&self) -> &'static str {
        "eye-roll"
    }
}
