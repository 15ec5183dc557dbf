//! # Per-frame tracking errors

use thiserror::Error;

/// Reasons a single frame could not produce an anchor pose.
///
/// None of these ever cross the engine's tick boundary, the stabilisation policy in
/// [`AnchorEngine`](crate::engine::AnchorEngine) absorbs them and either holds the last good pose
/// or reports no pose at all.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackingError {
    /// The observation does not contain a landmark the strategy needs.
    ///
    /// This means the detector contract does not match the strategy, it is not going to fix
    /// itself on the next frame.
    #[error("observation is missing required landmark {0}")]
    MissingLandmark(usize),
    /// The strategy decomposes a head pose matrix, but the detector did not supply one.
    #[error("observation has no head pose matrix")]
    MissingPoseMatrix,
    /// The detector did not find a face this frame.
    #[error("no face detected this frame")]
    NoFaceThisFrame,
    /// The landmarks produce a pose that cannot be constructed (zero length axes, NaN).
    #[error("degenerate face geometry")]
    DegenerateGeometry,
}

impl TrackingError {
    /// Short, stable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingLandmark(_) => "missing_landmark",
            Self::MissingPoseMatrix => "missing_pose_matrix",
            Self::NoFaceThisFrame => "no_face",
            Self::DegenerateGeometry => "degenerate_geometry",
        }
    }

    /// Whether the error means the detector output does not match what the strategy needs.
    ///
    /// Such errors repeat on every frame and are only worth reporting once per session.
    pub fn is_contract_mismatch(&self) -> bool {
        matches!(self, Self::MissingLandmark(_) | Self::MissingPoseMatrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(TrackingError::MissingLandmark(33).kind(), "missing_landmark");
        assert_eq!(TrackingError::NoFaceThisFrame.kind(), "no_face");
        assert!(TrackingError::MissingPoseMatrix.is_contract_mismatch());
        assert!(!TrackingError::DegenerateGeometry.is_contract_mismatch());
    }
}
