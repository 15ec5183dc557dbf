//! # Facial Anchor Transform Library
//!
//! This library converts per-frame facial landmark observations (or a detector supplied head
//! pose matrix) into a stable position, rotation and scale for a rigid 3D asset, such as a pair
//! of glasses or a hat, that should stay attached to a tracked face.
//!
//! The easiest way to use the library is to import its prelude:
//!
//! ```
//! use faceanchor::prelude::v1::*;
//! ```
//!
//! You may need [`nalgebra`](https://crates.io/crates/nalgebra) to make use of the functionality.

pub mod camera;
pub mod config;
pub mod engine;
pub mod error;
pub mod estimator;
pub mod observation;
pub mod pose;
pub mod properties;
pub mod strategies;
pub mod utils;

pub mod prelude {
    pub mod v1 {
        pub use crate::{
            camera::*,
            config::EngineSettings,
            engine::{AnchorEngine, FrameOutcome, PoseSmoother, SessionState, TrackingStats},
            error::TrackingError,
            estimator::{EstimationStrategy, Estimator},
            observation::{landmarks, FaceObservation, LandmarkPoint, ObservationSource, PoseMatrix},
            pose::AnchorPose,
            properties::{Properties, Property, PropertyMut},
            strategies::{ear_yaw::EarYaw, eye_roll::EyeRoll, pose_matrix::PoseMatrixDecompose},
        };
        pub use anyhow::{anyhow, Error, Result};
    }
}
