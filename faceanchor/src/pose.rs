//! # Anchor pose

use nalgebra as na;

/// Transform applied to the tracked asset.
///
/// This is the only thing handed over to the renderer. `orientation` is always a unit quaternion
/// and every component of `scale` is non-negative.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub struct AnchorPose {
    pub position: na::Point3<f32>,
    pub orientation: na::UnitQuaternion<f32>,
    pub scale: na::Vector3<f32>,
}

impl Default for AnchorPose {
    fn default() -> Self {
        Self {
            position: na::Point3::origin(),
            orientation: na::UnitQuaternion::identity(),
            scale: na::Vector3::repeat(1.0),
        }
    }
}

impl AnchorPose {
    /// Create a new pose, clamping negative scale components to zero.
    pub fn new(
        position: na::Point3<f32>,
        orientation: na::UnitQuaternion<f32>,
        scale: na::Vector3<f32>,
    ) -> Self {
        Self {
            position,
            orientation,
            scale: scale.map(|v| v.max(0.0)),
        }
    }

    /// Create a pose with the same scale on every axis.
    pub fn uniform(
        position: na::Point3<f32>,
        orientation: na::UnitQuaternion<f32>,
        scale: f32,
    ) -> Self {
        Self::new(position, orientation, na::Vector3::repeat(scale))
    }

    /// Check that no component of the pose is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|v| v.is_finite())
            && self.orientation.coords.iter().all(|v| v.is_finite())
            && self.scale.iter().all(|v| v.is_finite())
    }

    /// Compose the pose into a `translation * rotation * scale` matrix.
    pub fn to_matrix(&self) -> na::Matrix4<f32> {
        na::Matrix4::new_translation(&self.position.coords)
            * self.orientation.to_homogeneous()
            * na::Matrix4::new_nonuniform_scaling(&self.scale)
    }

    /// Interpolate towards `other` by factor `t` in `[0; 1]`.
    ///
    /// Position and scale are linearly interpolated, orientation is slerped along the shortest
    /// arc.
    pub fn interpolate(&self, other: &Self, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);

        let orientation = self
            .orientation
            .try_slerp(&other.orientation, t, 1.0e-6)
            .unwrap_or(other.orientation);

        Self::new(
            self.position.coords.lerp(&other.position.coords, t).into(),
            orientation,
            self.scale.lerp(&other.scale, t),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn negative_scale_clamped() {
        let pose = AnchorPose::new(
            na::Point3::origin(),
            na::UnitQuaternion::identity(),
            na::Vector3::new(-1.0, 2.0, 0.0),
        );
        assert_eq!(pose.scale, na::Vector3::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn matrix_composition() {
        let pose = AnchorPose::uniform(
            na::Point3::new(1.0, 2.0, 3.0),
            na::UnitQuaternion::from_axis_angle(&na::Vector3::z_axis(), std::f32::consts::FRAC_PI_2),
            2.0,
        );

        let p = pose.to_matrix().transform_point(&na::Point3::new(1.0, 0.0, 0.0));

        assert_approx_eq!(p.x, 1.0, 1e-5);
        assert_approx_eq!(p.y, 4.0, 1e-5);
        assert_approx_eq!(p.z, 3.0, 1e-5);
    }

    #[test]
    fn interpolate_halfway() {
        let a = AnchorPose::default();
        let b = AnchorPose::uniform(
            na::Point3::new(2.0, 0.0, 0.0),
            na::UnitQuaternion::from_axis_angle(&na::Vector3::y_axis(), 1.0),
            3.0,
        );

        let mid = a.interpolate(&b, 0.5);

        assert_approx_eq!(mid.position.x, 1.0, 1e-6);
        assert_approx_eq!(mid.scale.y, 2.0, 1e-6);
        assert_approx_eq!(mid.orientation.angle(), 0.5, 1e-5);
        assert_approx_eq!(mid.orientation.norm(), 1.0, 1e-5);
    }
}
