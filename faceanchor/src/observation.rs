//! # Face observations
//!
//! Raw per-frame detector output, as consumed by the estimation strategies.

use crate::error::TrackingError;
use crate::prelude::v1::Result;
use nalgebra as na;

/// Semantic indices of the face mesh landmarks used by the strategies.
pub mod landmarks {
    /// Top of the forehead.
    pub const FOREHEAD: usize = 10;
    /// Outer corner of the eye on the image's left side.
    pub const LEFT_EYE_OUTER: usize = 33;
    /// Ear anchor on the image's left side.
    pub const LEFT_EAR: usize = 127;
    /// Bridge of the nose, between the eyes.
    pub const NOSE_BRIDGE: usize = 168;
    /// Outer corner of the eye on the image's right side.
    pub const RIGHT_EYE_OUTER: usize = 263;
    /// Ear anchor on the image's right side.
    pub const RIGHT_EAR: usize = 356;
    /// Number of points in a full face mesh (without irises).
    pub const FACE_MESH_LEN: usize = 468;
}

/// Single normalised landmark.
///
/// `x` and `y` are roughly within `[0; 1]` image space, with `y` growing downwards. `z` is
/// relative depth, more negative values are closer to the camera.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub struct LandmarkPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl LandmarkPoint {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<[f32; 3]> for LandmarkPoint {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self { x, y, z }
    }
}

/// Head pose (rotation and translation, metres) in camera space.
pub type PoseMatrix = na::Matrix4<f32>;

/// All landmarks of a single face in a single frame.
///
/// Landmark indices are meaningful, see [`landmarks`]. Observations carry no identity between
/// frames, any temporal continuity is imposed by the engine.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FaceObservation {
    pub landmarks: Vec<LandmarkPoint>,
    pub pose: Option<PoseMatrix>,
}

impl FaceObservation {
    /// Create an observation without a pose matrix.
    pub fn new(landmarks: Vec<LandmarkPoint>) -> Self {
        Self {
            landmarks,
            pose: None,
        }
    }

    /// Attach a detector supplied head pose matrix.
    pub fn with_pose(mut self, pose: PoseMatrix) -> Self {
        self.pose = Some(pose);
        self
    }

    /// Get a landmark required by a strategy.
    ///
    /// Returns `MissingLandmark` if the index is out of range, and `DegenerateGeometry` if the
    /// point is not finite.
    pub fn landmark(&self, idx: usize) -> Result<LandmarkPoint, TrackingError> {
        let point = self
            .landmarks
            .get(idx)
            .copied()
            .ok_or(TrackingError::MissingLandmark(idx))?;

        if point.is_finite() {
            Ok(point)
        } else {
            Err(TrackingError::DegenerateGeometry)
        }
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }
}

/// Vector of `FaceObservation` elements, one per detected face.
pub type FaceObservations = Vec<FaceObservation>;

/// Source of per-frame face observations.
pub trait ObservationSource {
    /// Fetch the next frame.
    ///
    /// This function will push every face detected in the next frame into `faces`. If a frame was
    /// read, `Ok(true)` is returned (`faces` may stay empty when no face was found). If the stream
    /// has ended, `Ok(false)` is returned, and if there is an error while reading, `Err` is
    /// returned.
    fn next_frame(&mut self, faces: &mut FaceObservations) -> Result<bool>;

    /// Get the frame rate of the stream, if known.
    fn get_framerate(&self) -> Option<f64> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_landmark_is_reported() {
        let obs = FaceObservation::new(vec![LandmarkPoint::default(); 10]);
        assert_eq!(
            obs.landmark(landmarks::NOSE_BRIDGE),
            Err(TrackingError::MissingLandmark(landmarks::NOSE_BRIDGE))
        );
        assert!(obs.landmark(9).is_ok());
    }

    #[test]
    fn non_finite_landmark_is_degenerate() {
        let mut points = vec![LandmarkPoint::default(); 4];
        points[2].y = f32::NAN;
        let obs = FaceObservation::new(points);
        assert_eq!(obs.landmark(2), Err(TrackingError::DegenerateGeometry));
    }
}
