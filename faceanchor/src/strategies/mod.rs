//! # Anchor pose estimation strategies

use crate::error::TrackingError;
use crate::pose::AnchorPose;
use nalgebra as na;

pub mod ear_yaw;
pub mod eye_roll;
pub mod pose_matrix;

/// Axes shorter than this are considered degenerate.
pub(crate) const DEGENERATE_EPS: f32 = 1.0e-6;

/// Reuse the last good orientation when the current one cannot be built.
pub(crate) fn recover_orientation(
    previous: Option<&AnchorPose>,
) -> Result<na::UnitQuaternion<f32>, TrackingError> {
    previous
        .map(|p| p.orientation)
        .ok_or(TrackingError::DegenerateGeometry)
}

/// Reject poses that would propagate NaN or infinity into the renderer.
pub(crate) fn finite(pose: AnchorPose) -> Result<AnchorPose, TrackingError> {
    if pose.is_finite() {
        Ok(pose)
    } else {
        Err(TrackingError::DegenerateGeometry)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::observation::{landmarks::FACE_MESH_LEN, FaceObservation, LandmarkPoint};

    /// Build a full face mesh with all points at the image centre, except the given ones.
    pub fn face(points: &[(usize, [f32; 3])]) -> FaceObservation {
        let mut landmarks = vec![LandmarkPoint::new(0.5, 0.5, 0.0); FACE_MESH_LEN];

        for &(idx, p) in points {
            landmarks[idx] = p.into();
        }

        FaceObservation::new(landmarks)
    }
}
