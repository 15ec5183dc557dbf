//! # Camera abstraction and landmark mapping

use crate::observation::LandmarkPoint;
use nalgebra as na;

/// Perspective projection parameters of the renderer's camera.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ProjectionParams {
    /// Screen aspect ratio (width / height).
    pub aspect: f32,
    /// Vertical field-of-view in degrees.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for ProjectionParams {
    fn default() -> Self {
        Self {
            aspect: 4.0 / 3.0,
            fov_y: 75.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

/// Standard pinhole camera
///
/// This camera is defined by aspect ratio and vertical field-of-view and contains a simple
/// perspective projection matrix.
///
/// The principal point is defined at `(0.5; 0.5)` coordinates.
#[derive(Clone, Copy, Debug)]
pub struct StandardCamera {
    params: ProjectionParams,
    proj: na::Perspective3<f32>,
    inv_proj: na::Matrix4<f32>,
}

impl Default for StandardCamera {
    fn default() -> Self {
        Self::from_params(ProjectionParams::default())
    }
}

impl StandardCamera {
    /// Create a new camera
    ///
    /// # Arguments
    ///
    /// * `aspect` - screen aspect ratio.
    /// * `fov_y` - vertical field-of-view (in degrees).
    pub fn new(aspect: f32, fov_y: f32) -> Self {
        Self::from_params(ProjectionParams {
            aspect,
            fov_y,
            ..Default::default()
        })
    }

    /// Create a new camera from full projection parameters.
    pub fn from_params(params: ProjectionParams) -> Self {
        let proj = na::Perspective3::new(
            params.aspect,
            params.fov_y.to_radians(),
            params.near,
            params.far,
        );

        Self {
            params,
            inv_proj: proj.inverse(),
            proj,
        }
    }

    /// Build a view matrix of a camera placed on the +Z axis, looking at the world origin.
    ///
    /// # Arguments
    ///
    /// * `distance` - distance from the origin.
    pub fn look_at_origin(distance: f32) -> na::Matrix4<f32> {
        na::Matrix4::look_at_rh(
            &na::Point3::new(0.0, 0.0, distance),
            &na::Point3::origin(),
            &na::Vector3::y(),
        )
    }

    /// Get the projection parameters the camera was built with.
    pub fn params(&self) -> &ProjectionParams {
        &self.params
    }

    /// Get the underlying projection matrix
    pub fn as_matrix(&self) -> &na::Matrix4<f32> {
        self.proj.as_matrix()
    }

    /// Get the inverse of the projection matrix.
    pub fn inverse_matrix(&self) -> &na::Matrix4<f32> {
        &self.inv_proj
    }

    /// Project a 3D point into normalised device coordinates.
    ///
    /// # Arguments
    ///
    /// * `world` - point to project.
    /// * `view` - camera view matrix.
    pub fn project(&self, world: na::Point3<f32>, view: &na::Matrix4<f32>) -> na::Point3<f32> {
        self.proj.project_point(&view.transform_point(&world))
    }

    /// Convert a point in normalised device coordinates back to 3D.
    ///
    /// # Arguments
    ///
    /// * `ndc` - point in `[-1; 1]` clip space, including depth.
    /// * `inv_view` - inverse of camera view matrix in 3D space.
    pub fn unproject(&self, ndc: na::Point3<f32>, inv_view: &na::Matrix4<f32>) -> na::Point3<f32> {
        (inv_view * self.inv_proj).transform_point(&ndc)
    }

    /// Get the camera's field of view.
    ///
    /// Returns horizontal and vertical field of view in degrees as a tuple.
    pub fn fov(&self) -> (f32, f32) {
        let ty = (self.params.fov_y.to_radians() / 2.0).tan();
        let tx = self.params.aspect * ty;
        (tx.atan().to_degrees() * 2.0, self.params.fov_y)
    }

    /// Get the camera's aspect ratio.
    pub fn aspect_ratio(&self) -> f32 {
        self.params.aspect
    }
}

/// How normalised landmarks are turned into world space points.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MappingMode {
    /// Remapped clip coordinates are used as world units directly.
    ///
    /// Cheap, but only valid close to the camera's principal axis.
    Direct,
    /// Landmarks are unprojected through the camera, respecting its field of view and distance.
    ///
    /// The landmark's `z` is not an NDC depth. It moves the point along the view ray, by `-z`
    /// world units towards the camera from the plane through the world origin.
    Unproject,
}

/// Converts normalised, possibly mirrored, image space landmarks into world space.
///
/// # Examples
///
/// ```
/// # use assert_approx_eq::assert_approx_eq;
/// use faceanchor::camera::{CoordinateMapper, MappingMode, StandardCamera};
/// use faceanchor::observation::LandmarkPoint;
///
/// let view = StandardCamera::look_at_origin(2.0);
/// let mirrored = CoordinateMapper::new(StandardCamera::default(), view, true);
/// let plain = CoordinateMapper::new(StandardCamera::default(), view, false);
///
/// let a = mirrored.map(LandmarkPoint::new(0.2, 0.3, 0.0), MappingMode::Unproject);
/// let b = plain.map(LandmarkPoint::new(0.8, 0.3, 0.0), MappingMode::Unproject);
///
/// assert_approx_eq!(a.x, b.x, 1e-5);
/// assert_approx_eq!(a.y, b.y, 1e-5);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct CoordinateMapper {
    camera: StandardCamera,
    view: na::Matrix4<f32>,
    inv_view: na::Matrix4<f32>,
    mirrored: bool,
}

impl Default for CoordinateMapper {
    fn default() -> Self {
        Self::new(
            StandardCamera::default(),
            StandardCamera::look_at_origin(2.0),
            false,
        )
    }
}

impl CoordinateMapper {
    /// Create a new mapper.
    ///
    /// # Arguments
    ///
    /// * `camera` - the renderer's active camera.
    /// * `view` - camera view matrix.
    /// * `mirrored` - whether the displayed image is flipped horizontally.
    pub fn new(camera: StandardCamera, view: na::Matrix4<f32>, mirrored: bool) -> Self {
        Self {
            camera,
            view,
            // View matrices are rigid transforms, they are always invertible.
            inv_view: view.try_inverse().unwrap_or_else(na::Matrix4::identity),
            mirrored,
        }
    }

    pub fn camera(&self) -> &StandardCamera {
        &self.camera
    }

    pub fn view(&self) -> &na::Matrix4<f32> {
        &self.view
    }

    pub fn mirrored(&self) -> bool {
        self.mirrored
    }

    /// Convert a landmark to `[-1; 1]` clip coordinates.
    ///
    /// Applies mirroring, and flips the y axis so that it grows upwards. `z` is passed through
    /// untouched.
    pub fn clip_coords(&self, point: LandmarkPoint) -> na::Point3<f32> {
        let x = if self.mirrored { 1.0 - point.x } else { point.x };
        na::Point3::new((x - 0.5) * 2.0, -(point.y - 0.5) * 2.0, point.z)
    }

    /// Map a landmark into world space.
    ///
    /// # Arguments
    ///
    /// * `point` - normalised landmark.
    /// * `mode` - mapping mode required by the caller.
    pub fn map(&self, point: LandmarkPoint, mode: MappingMode) -> na::Point3<f32> {
        let clip = self.clip_coords(point);

        match mode {
            // Detector depth is negative towards the camera, world z is positive towards it.
            MappingMode::Direct => na::Point3::new(clip.x, clip.y, -clip.z),
            MappingMode::Unproject => self.unproject(clip),
        }
    }

    /// Unproject clip coordinates onto the depth plane selected by `clip.z`.
    ///
    /// The view ray through `(clip.x, clip.y)` is intersected with the plane perpendicular to the
    /// view direction that passes through the world origin, shifted towards the camera by
    /// `-clip.z` world units.
    fn unproject(&self, clip: na::Point3<f32>) -> na::Point3<f32> {
        let eye = self.inv_view.transform_point(&na::Point3::origin());
        let near = self
            .camera
            .unproject(na::Point3::new(clip.x, clip.y, -1.0), &self.inv_view);

        // Unit vector pointing from the scene back towards the camera.
        let towards_camera = self
            .inv_view
            .transform_vector(&na::Vector3::z())
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(na::Vector3::z);

        let plane_point = na::Point3::origin() + towards_camera * -clip.z;

        let dir = near - eye;
        let denom = towards_camera.dot(&dir);

        if denom.abs() <= f32::EPSILON {
            return plane_point;
        }

        let t = towards_camera.dot(&(plane_point - eye)) / denom;

        eye + dir * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn mapper(mirrored: bool) -> CoordinateMapper {
        CoordinateMapper::new(
            StandardCamera::default(),
            StandardCamera::look_at_origin(2.0),
            mirrored,
        )
    }

    #[test]
    fn direct_mapping() {
        let p = mapper(false).map(LandmarkPoint::new(0.75, 0.25, -0.1), MappingMode::Direct);
        assert_approx_eq!(p.x, 0.5, 1e-6);
        assert_approx_eq!(p.y, 0.5, 1e-6);
        assert_approx_eq!(p.z, 0.1, 1e-6);
    }

    #[test]
    fn mirroring_equivalence() {
        for mode in [MappingMode::Direct, MappingMode::Unproject] {
            let a = mapper(true).map(LandmarkPoint::new(0.2, 0.3, 0.05), mode);
            let b = mapper(false).map(LandmarkPoint::new(0.8, 0.3, 0.05), mode);
            assert_approx_eq!(a.x, b.x, 1e-5);
            assert_approx_eq!(a.y, b.y, 1e-5);
            assert_approx_eq!(a.z, b.z, 1e-5);
        }
    }

    #[test]
    fn unproject_centre_hits_origin() {
        let p = mapper(false).map(LandmarkPoint::new(0.5, 0.5, 0.0), MappingMode::Unproject);
        assert_approx_eq!(p.x, 0.0, 1e-5);
        assert_approx_eq!(p.y, 0.0, 1e-5);
        assert_approx_eq!(p.z, 0.0, 1e-5);
    }

    #[test]
    fn unproject_respects_fov() {
        let mapper = mapper(false);
        // Top edge of the screen at distance 2 spans tan(fov_y / 2) * 2 units.
        let p = mapper.map(LandmarkPoint::new(0.5, 0.0, 0.0), MappingMode::Unproject);
        let expected = (75f32.to_radians() / 2.0).tan() * 2.0;
        assert_approx_eq!(p.y, expected, 1e-3);
        assert_approx_eq!(p.z, 0.0, 1e-5);

        // Closer landmarks land on a plane nearer to the camera.
        let p = mapper.map(LandmarkPoint::new(0.5, 0.5, -0.5), MappingMode::Unproject);
        assert_approx_eq!(p.z, 0.5, 1e-3);
    }

    #[test]
    fn project_roundtrip() {
        let camera = StandardCamera::default();
        let view = StandardCamera::look_at_origin(2.0);
        let inv_view = view.try_inverse().unwrap();

        let world = na::Point3::new(0.3, -0.2, 0.1);
        let ndc = camera.project(world, &view);
        let back = camera.unproject(ndc, &inv_view);

        assert_approx_eq!(back.x, world.x, 1e-3);
        assert_approx_eq!(back.y, world.y, 1e-3);
        assert_approx_eq!(back.z, world.z, 1e-3);
    }

    #[test]
    fn fov_horizontal() {
        let camera = StandardCamera::new(1.0, 90.0);
        let (x, y) = camera.fov();
        assert_approx_eq!(x, 90.0, 1e-3);
        assert_approx_eq!(y, 90.0, 1e-3);
    }
}
