//! Engine replay over recorded frames.

use faceanchor::prelude::v1::{Result, *};
use log::*;
use serde::Serialize;

/// Command line adjustments on top of the loaded settings.
#[derive(Clone, Debug, Default)]
pub struct ReplayOptions {
    /// Strategy name, or `all`.
    pub strategy: Option<String>,
    pub mirrored: bool,
    pub smoothing: Option<f32>,
    /// `name=value` property overrides.
    pub overrides: Vec<String>,
}

/// Single CSV output row.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Row {
    pub frame: usize,
    pub strategy: &'static str,
    pub status: &'static str,
    pub px: Option<f32>,
    pub py: Option<f32>,
    pub pz: Option<f32>,
    pub qw: Option<f32>,
    pub qi: Option<f32>,
    pub qj: Option<f32>,
    pub qk: Option<f32>,
    pub sx: Option<f32>,
    pub sy: Option<f32>,
    pub sz: Option<f32>,
}

impl Row {
    fn new(frame: usize, strategy: &'static str, outcome: &FrameOutcome) -> Self {
        let pose = outcome.pose();
        let q = pose.map(|p| p.orientation.into_inner());

        Self {
            frame,
            strategy,
            status: outcome.status(),
            px: pose.map(|p| p.position.x),
            py: pose.map(|p| p.position.y),
            pz: pose.map(|p| p.position.z),
            qw: q.map(|q| q.w),
            qi: q.map(|q| q.i),
            qj: q.map(|q| q.j),
            qk: q.map(|q| q.k),
            sx: pose.map(|p| p.scale.x),
            sy: pose.map(|p| p.scale.y),
            sz: pose.map(|p| p.scale.z),
        }
    }
}

/// Build the list of engine settings to replay with.
pub fn resolve_settings(base: EngineSettings, options: &ReplayOptions) -> Result<Vec<EngineSettings>> {
    let strategies = match options.strategy.as_deref() {
        None => vec![base.strategy],
        Some("all") => EstimationStrategy::all()
            .into_iter()
            .map(|s| keep_configured(base.strategy, s))
            .collect(),
        Some(name) => {
            let s = EstimationStrategy::from_name(name)
                .ok_or_else(|| anyhow!("unknown strategy \"{name}\""))?;
            vec![keep_configured(base.strategy, s)]
        }
    };

    let mut settings = strategies
        .into_iter()
        .map(|strategy| EngineSettings {
            strategy,
            mirrored: base.mirrored || options.mirrored,
            smoothing: options.smoothing.or(base.smoothing),
            ..base
        })
        .collect::<Vec<_>>();

    for ovr in &options.overrides {
        let (name, value) = ovr
            .split_once('=')
            .ok_or_else(|| anyhow!("override \"{ovr}\" is not in name=value form"))?;

        // A property only needs to exist on one of the replayed strategies.
        let applied = settings
            .iter_mut()
            .map(|s| s.set_prop(name.trim(), value).is_ok())
            .filter(|&ok| ok)
            .count();

        if applied == 0 {
            return Err(anyhow!("no strategy accepts \"{ovr}\""));
        }
    }

    for s in &settings {
        s.validate()?;
    }

    Ok(settings)
}

/// Reuse the configured gains if the requested strategy is the configured one.
fn keep_configured(configured: EstimationStrategy, requested: EstimationStrategy) -> EstimationStrategy {
    if configured.name() == requested.name() {
        configured
    } else {
        requested
    }
}

/// Run a single tracking session over all frames.
pub fn replay(
    settings: &EngineSettings,
    frames: &[Vec<FaceObservation>],
) -> Result<(Vec<Row>, TrackingStats)> {
    let mut engine = AnchorEngine::new(settings)?;
    let name = engine.strategy().name();

    engine.start();

    let rows = frames
        .iter()
        .enumerate()
        .map(|(i, faces)| {
            if faces.len() > 1 {
                debug!("frame {i}: ignoring {} extra faces", faces.len() - 1);
            }
            Row::new(i, name, &engine.step(faces.first()))
        })
        .collect();

    engine.stop();

    Ok((rows, *engine.stats()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use faceanchor::observation::landmarks::{FACE_MESH_LEN, LEFT_EYE_OUTER, RIGHT_EYE_OUTER};

    fn eyes() -> FaceObservation {
        let mut landmarks = vec![LandmarkPoint::new(0.5, 0.5, 0.0); FACE_MESH_LEN];
        landmarks[LEFT_EYE_OUTER] = LandmarkPoint::new(0.4, 0.5, 0.0);
        landmarks[RIGHT_EYE_OUTER] = LandmarkPoint::new(0.6, 0.55, 0.0);
        FaceObservation::new(landmarks)
    }

    #[test]
    fn all_strategies() {
        let settings = resolve_settings(
            Default::default(),
            &ReplayOptions {
                strategy: Some("all".into()),
                mirrored: true,
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(settings.len(), 3);
        assert!(settings.iter().all(|s| s.mirrored));
    }

    #[test]
    fn override_applies_to_matching_strategy() {
        let settings = resolve_settings(
            Default::default(),
            &ReplayOptions {
                strategy: Some("all".into()),
                overrides: vec!["Lift fraction=0.75".into()],
                ..Default::default()
            },
        )
        .unwrap();

        let lifted = settings
            .iter()
            .filter_map(|s| match s.strategy {
                EstimationStrategy::EarYawForeheadLift(e) => Some(e.lift_fraction),
                _ => None,
            })
            .collect::<Vec<_>>();

        assert_eq!(lifted, vec![0.75]);
    }

    #[test]
    fn bad_options() {
        let opts = |strategy: &str, ovr: &str| ReplayOptions {
            strategy: Some(strategy.into()),
            overrides: vec![ovr.into()],
            ..Default::default()
        };

        assert!(resolve_settings(Default::default(), &opts("warp", "Scale gain=1")).is_err());
        assert!(resolve_settings(Default::default(), &opts("eye-roll", "Lift fraction=1")).is_err());
        assert!(resolve_settings(Default::default(), &opts("eye-roll", "Scale gain")).is_err());
    }

    #[test]
    fn configured_gains_survive() {
        let mut base = EngineSettings::default();
        base.set_prop("Scale gain", "0.25").unwrap();

        let settings = resolve_settings(
            base,
            &ReplayOptions {
                strategy: Some("eye-roll".into()),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(settings[0].strategy, base.strategy);
    }

    #[test]
    fn replay_rows() {
        let frames = vec![vec![], vec![eyes()], vec![], vec![eyes(), eyes()]];

        let (rows, stats) = replay(&EngineSettings::default(), &frames).unwrap();

        let status = rows.iter().map(|r| r.status).collect::<Vec<_>>();
        assert_eq!(status, ["none", "estimated", "held", "estimated"]);

        assert_eq!(rows[0].px, None);
        assert_eq!(rows[1].px, rows[2].px);
        assert_eq!(rows[1].qw, rows[2].qw);
        assert!(rows.iter().all(|r| r.strategy == "eye-roll"));

        assert_eq!(stats.frames, 4);
        assert_eq!(stats.estimated, 2);
        assert_eq!(stats.held, 1);
        assert_eq!(stats.empty, 1);
    }
}
