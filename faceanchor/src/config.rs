//! # Engine configuration

use crate::camera::{CoordinateMapper, ProjectionParams, StandardCamera};
use crate::estimator::EstimationStrategy;
use crate::prelude::v1::{anyhow, Result};
use crate::properties::{Properties, PropertyMut};
use nalgebra as na;

/// Static configuration of a tracking session.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineSettings {
    pub strategy: EstimationStrategy,
    /// Whether the displayed video is flipped horizontally (selfie view).
    pub mirrored: bool,
    pub projection: ProjectionParams,
    /// Distance of the renderer's camera from the world origin, along +Z.
    pub camera_distance: f32,
    /// Optional exponential smoothing factor in `(0; 1]`. `1` means no smoothing.
    pub smoothing: Option<f32>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            strategy: Default::default(),
            mirrored: false,
            projection: Default::default(),
            camera_distance: 2.0,
            smoothing: None,
        }
    }
}

impl EngineSettings {
    pub fn camera(&self) -> StandardCamera {
        StandardCamera::from_params(self.projection)
    }

    pub fn view(&self) -> na::Matrix4<f32> {
        StandardCamera::look_at_origin(self.camera_distance)
    }

    pub fn mapper(&self) -> CoordinateMapper {
        CoordinateMapper::new(self.camera(), self.view(), self.mirrored)
    }

    /// Check that the settings describe a usable camera and smoothing factor.
    pub fn validate(&self) -> Result<()> {
        let p = &self.projection;

        if !(p.aspect > 0.0) {
            return Err(anyhow!("aspect ratio must be positive, got {}", p.aspect));
        }

        if !(p.fov_y > 0.0 && p.fov_y < 180.0) {
            return Err(anyhow!("vertical fov must be within (0; 180), got {}", p.fov_y));
        }

        if !(p.near > 0.0 && p.far > p.near) {
            return Err(anyhow!(
                "clip planes must satisfy 0 < near < far, got {} and {}",
                p.near,
                p.far
            ));
        }

        if !(self.camera_distance > p.near) {
            return Err(anyhow!(
                "camera distance {} puts the origin in front of the near plane",
                self.camera_distance
            ));
        }

        if let Some(s) = self.smoothing {
            if !(s > 0.0 && s <= 1.0) {
                return Err(anyhow!("smoothing factor must be within (0; 1], got {s}"));
            }
        }

        Ok(())
    }
}

impl Properties for EngineSettings {
    fn props_mut(&mut self) -> Vec<(&str, PropertyMut)> {
        let mut props = vec![("Mirrored", PropertyMut::bool(&mut self.mirrored))];
        props.extend(self.strategy.props_mut());
        props
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::ear_yaw::EarYaw;

    #[test]
    fn defaults_are_valid() {
        EngineSettings::default().validate().unwrap();
    }

    #[test]
    fn rejects_bad_values() {
        let mut settings = EngineSettings::default();
        settings.smoothing = Some(0.0);
        assert!(settings.validate().is_err());

        let mut settings = EngineSettings::default();
        settings.projection.far = 0.01;
        assert!(settings.validate().is_err());

        let mut settings = EngineSettings::default();
        settings.projection.fov_y = f32::NAN;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn strategy_props_are_exposed() {
        let mut settings = EngineSettings {
            strategy: EstimationStrategy::EarYawForeheadLift(EarYaw::default()),
            ..Default::default()
        };

        settings.set_prop("lift fraction", "0.25").unwrap();
        settings.set_prop("mirrored", "true").unwrap();

        assert!(settings.mirrored);
        match settings.strategy {
            EstimationStrategy::EarYawForeheadLift(s) => assert_eq!(s.lift_fraction, 0.25),
            _ => unreachable!(),
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn partial_json() {
        let settings: EngineSettings = serde_json::from_str(
            r#"{
                "strategy": { "kind": "ear_yaw_forehead_lift", "lift_fraction": 0.4 },
                "mirrored": true,
                "smoothing": 0.6
            }"#,
        )
        .unwrap();

        assert!(settings.mirrored);
        assert_eq!(settings.smoothing, Some(0.6));
        assert_eq!(settings.camera_distance, 2.0);
        assert_eq!(
            settings.strategy,
            EstimationStrategy::EarYawForeheadLift(EarYaw {
                lift_fraction: 0.4,
                ..Default::default()
            })
        );
    }
}
