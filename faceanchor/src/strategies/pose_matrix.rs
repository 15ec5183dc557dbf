//! # Head pose matrix decomposition
//!
//! Used when the detector supplies a 4x4 head pose matrix in camera space directly. Landmarks are
//! not needed.

use super::{finite, recover_orientation, DEGENERATE_EPS};
use crate::camera::CoordinateMapper;
use crate::error::TrackingError;
use crate::estimator::Estimator;
use crate::observation::{FaceObservation, PoseMatrix};
use crate::pose::AnchorPose;
use crate::properties::{Properties, PropertyMut};
use nalgebra as na;

/// Estimator decomposing the detector's head pose matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PoseMatrixDecompose {
    /// Translation from the pose origin to the attachment point, in head-local metres.
    pub offset: [f32; 3],
    /// Multiplier converting the decomposed (metric) scale into asset units.
    pub scale_gain: f32,
}

impl Default for PoseMatrixDecompose {
    fn default() -> Self {
        Self {
            // Crown of the head sits roughly 15cm above the pose origin.
            offset: [0.0, 0.15, 0.0],
            scale_gain: 1.0,
        }
    }
}

impl Properties for PoseMatrixDecompose {
    fn props_mut(&mut self) -> Vec<(&str, PropertyMut)> {
        let [x, y, z] = &mut self.offset;

        vec![
            ("Offset x", PropertyMut::float(x, -1.0, 1.0)),
            ("Offset y", PropertyMut::float(y, -1.0, 1.0)),
            ("Offset z", PropertyMut::float(z, -1.0, 1.0)),
            ("Scale gain", PropertyMut::float(&mut self.scale_gain, 0.0, 100.0)),
        ]
    }
}

/// Translation, rotation and scale extracted from an affine matrix.
#[derive(Clone, Copy, Debug)]
pub struct Decomposed {
    pub translation: na::Vector3<f32>,
    /// `None` when the linear part has a zero length axis or is a reflection.
    pub rotation: Option<na::UnitQuaternion<f32>>,
    pub scale: na::Vector3<f32>,
}

/// Decompose an affine matrix into translation, rotation and non-uniform scale.
///
/// Translation is the last column. Scale factors are the lengths of the columns of the 3x3 linear
/// block, and rotation is that block with its columns normalised.
pub fn decompose(m: &na::Matrix4<f32>) -> Decomposed {
    let translation = m.fixed_slice::<3, 1>(0, 3).into_owned();
    let linear = m.fixed_slice::<3, 3>(0, 0).into_owned();

    let scale = na::Vector3::from_iterator(linear.column_iter().map(|c| c.norm()));

    let rotation = if scale.min() > DEGENERATE_EPS && linear.determinant() > 0.0 {
        let rot = na::Matrix3::from_columns(&[
            linear.column(0) / scale.x,
            linear.column(1) / scale.y,
            linear.column(2) / scale.z,
        ]);
        Some(na::UnitQuaternion::from_matrix(&rot))
    } else {
        None
    };

    Decomposed {
        translation,
        rotation,
        scale,
    }
}

impl PoseMatrixDecompose {
    /// Apply mirroring and the attachment offset to a camera space pose matrix.
    pub fn anchor_matrix(&self, pose: &PoseMatrix, mirrored: bool) -> na::Matrix4<f32> {
        let pose = if mirrored {
            // Reflect on both sides so the result stays a proper rotation.
            let flip = na::Matrix4::from_diagonal(&na::Vector4::new(-1.0, 1.0, 1.0, 1.0));
            flip * pose * flip
        } else {
            *pose
        };

        pose * na::Matrix4::new_translation(&na::Vector3::from(self.offset))
    }
}

impl Estimator for PoseMatrixDecompose {
    fn estimate(
        &self,
        observation: &FaceObservation,
        mapper: &CoordinateMapper,
        previous: Option<&AnchorPose>,
    ) -> Result<AnchorPose, TrackingError> {
        let pose = observation
            .pose
            .as_ref()
            .ok_or(TrackingError::MissingPoseMatrix)?;

        if pose.iter().any(|v| !v.is_finite()) {
            return Err(TrackingError::DegenerateGeometry);
        }

        let Decomposed {
            translation,
            rotation,
            scale,
        } = decompose(&self.anchor_matrix(pose, mapper.mirrored()));

        let orientation = match rotation {
            Some(rot) => rot,
            None => recover_orientation(previous)?,
        };

        finite(AnchorPose::new(
            translation.into(),
            orientation,
            scale * self.scale_gain,
        ))
    }

    fn name(&self) -> &'static str {
        "pose-matrix"
    }
}
