//! # Ear yaw with forehead lift
//!
//! Rests the asset on top of the head. Position follows the forehead landmark lifted by a
//! fraction of the head width, orientation only follows yaw.

use super::{finite, recover_orientation, DEGENERATE_EPS};
use crate::camera::{CoordinateMapper, MappingMode};
use crate::error::TrackingError;
use crate::estimator::Estimator;
use crate::observation::{landmarks, FaceObservation};
use crate::pose::AnchorPose;
use crate::properties::{Properties, PropertyMut};
use nalgebra as na;

/// Yaw-only estimator built on the ear-to-ear vector.
///
/// Pitch and roll are intentionally ignored. When both ear points line up with the view axis,
/// their vertical component would otherwise flip the asset around.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EarYaw {
    /// Upwards offset from the forehead, as a fraction of the ear-to-ear distance.
    pub lift_fraction: f32,
    /// Multiplier applied to the mapped ear-to-ear distance.
    pub scale_gain: f32,
    pub mapping: MappingMode,
}

impl Default for EarYaw {
    fn default() -> Self {
        Self {
            lift_fraction: 0.5,
            scale_gain: 1.0,
            mapping: MappingMode::Unproject,
        }
    }
}

impl Properties for EarYaw {
    fn props_mut(&mut self) -> Vec<(&str, PropertyMut)> {
        vec![
            ("Lift fraction", PropertyMut::float(&mut self.lift_fraction, 0.0, 5.0)),
            ("Scale gain", PropertyMut::float(&mut self.scale_gain, 0.0, 100.0)),
        ]
    }
}

impl EarYaw {
    /// Build a yaw-only rotation taking the +X axis onto the flattened ear-to-ear vector.
    ///
    /// Returns `None` if the flattened vector has no length.
    pub fn yaw_rotation(across: na::Vector3<f32>) -> Option<na::UnitQuaternion<f32>> {
        let flat = na::Vector3::new(across.x, 0.0, across.z).try_normalize(DEGENERATE_EPS)?;

        // Antiparallel vectors have no unique rotation between them, but about Y is the only one
        // that keeps this yaw-only.
        Some(
            na::UnitQuaternion::rotation_between(&na::Vector3::x(), &flat).unwrap_or_else(|| {
                na::UnitQuaternion::from_axis_angle(&na::Vector3::y_axis(), std::f32::consts::PI)
            }),
        )
    }
}

impl Estimator for EarYaw {
    fn estimate(
        &self,
        observation: &FaceObservation,
        mapper: &CoordinateMapper,
        previous: Option<&AnchorPose>,
    ) -> Result<AnchorPose, TrackingError> {
        let forehead = observation.landmark(landmarks::FOREHEAD)?;
        let left = observation.landmark(landmarks::LEFT_EAR)?;
        let right = observation.landmark(landmarks::RIGHT_EAR)?;

        // Mirroring swaps which ear is displayed on the left.
        let (left, right) = if mapper.mirrored() {
            (right, left)
        } else {
            (left, right)
        };

        let forehead = mapper.map(forehead, self.mapping);
        let across = mapper.map(right, self.mapping) - mapper.map(left, self.mapping);
        let head_width = across.norm();

        let position = forehead + na::Vector3::y() * (head_width * self.lift_fraction);

        let orientation = match Self::yaw_rotation(across) {
            Some(rot) => rot,
            None => recover_orientation(previous)?,
        };

        finite(AnchorPose::uniform(
            position,
            orientation,
            head_width * self.scale_gain,
        ))
    }

    fn name(&self) -> &'static str {
        "ear-yaw"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::fixtures::face;
    use assert_approx_eq::assert_approx_eq;
    use landmarks::{FOREHEAD, LEFT_EAR, RIGHT_EAR};

    fn head(forehead: [f32; 3], left: [f32; 3], right: [f32; 3]) -> FaceObservation {
        face(&[(FOREHEAD, forehead), (LEFT_EAR, left), (RIGHT_EAR, right)])
    }

    fn direct() -> EarYaw {
        EarYaw {
            mapping: MappingMode::Direct,
            ..Default::default()
        }
    }

    #[test]
    fn frontal_head() {
        let mapper = CoordinateMapper::default();
        let obs = head([0.5, 0.3, 0.0], [0.3, 0.5, 0.0], [0.7, 0.5, 0.0]);

        let pose = direct().estimate(&obs, &mapper, None).unwrap();

        // Ears are 0.8 units apart, lifted by half of that above the forehead at y = 0.4.
        assert_approx_eq!(pose.position.x, 0.0, 1e-6);
        assert_approx_eq!(pose.position.y, 0.8, 1e-6);
        assert_approx_eq!(pose.scale.x, 0.8, 1e-6);
        assert_approx_eq!(pose.orientation.angle(), 0.0, 1e-6);
    }

    #[test]
    fn turned_head_is_yaw_only() {
        let mapper = CoordinateMapper::default();
        // Right ear is further away and higher up in the image.
        let obs = head([0.5, 0.3, 0.0], [0.35, 0.5, -0.1], [0.65, 0.45, 0.1]);

        let pose = direct().estimate(&obs, &mapper, None).unwrap();

        assert_approx_eq!(pose.orientation.norm(), 1.0, 1e-5);

        // Up axis is never tilted.
        let up = pose.orientation * na::Vector3::y();
        assert_approx_eq!(up.y, 1.0, 1e-5);

        // X axis follows the flattened ear vector.
        let x = pose.orientation * na::Vector3::x();
        let expected = na::Vector3::new(0.6, 0.0, -0.2).normalize();
        assert_approx_eq!(x.x, expected.x, 1e-5);
        assert_approx_eq!(x.z, expected.z, 1e-5);
    }

    #[test]
    fn antiparallel_ears() {
        let rot = EarYaw::yaw_rotation(na::Vector3::new(-1.0, 0.3, 0.0)).unwrap();
        let x = rot * na::Vector3::x();
        assert_approx_eq!(x.x, -1.0, 1e-5);
        assert_approx_eq!((rot * na::Vector3::y()).y, 1.0, 1e-5);
    }

    #[test]
    fn vertical_ears_are_degenerate() {
        let mapper = CoordinateMapper::default();
        let obs = head([0.5, 0.3, 0.0], [0.5, 0.4, 0.0], [0.5, 0.6, 0.0]);
        let est = direct();

        assert_eq!(
            est.estimate(&obs, &mapper, None),
            Err(TrackingError::DegenerateGeometry)
        );

        let previous = AnchorPose::uniform(
            na::Point3::origin(),
            na::UnitQuaternion::from_axis_angle(&na::Vector3::y_axis(), 0.7),
            1.0,
        );

        let pose = est.estimate(&obs, &mapper, Some(&previous)).unwrap();
        assert_eq!(pose.orientation, previous.orientation);
        assert!(pose.is_finite());
    }

    #[test]
    fn mirrored_frontal_head_faces_forward() {
        let view = crate::camera::StandardCamera::look_at_origin(2.0);
        let mapper = CoordinateMapper::new(Default::default(), view, true);
        let obs = head([0.5, 0.3, 0.0], [0.3, 0.5, 0.0], [0.7, 0.5, 0.0]);

        let pose = EarYaw::default().estimate(&obs, &mapper, None).unwrap();
        assert_approx_eq!(pose.orientation.angle(), 0.0, 1e-5);
    }

    #[test]
    fn unprojected_lift_is_above_forehead() {
        let mapper = CoordinateMapper::default();
        let obs = head([0.5, 0.3, 0.0], [0.3, 0.5, 0.0], [0.7, 0.5, 0.0]);

        let pose = EarYaw::default().estimate(&obs, &mapper, None).unwrap();
        let forehead = mapper.map(obs.landmarks[FOREHEAD], MappingMode::Unproject);

        assert!(pose.position.y > forehead.y);
        assert_approx_eq!(
            pose.position.y - forehead.y,
            pose.scale.x * 0.5,
            1e-5
        );
    }
}
