//! Optimistic robot animation reconciled against telemetry.
//!
//! A dispatched command starts a linear interpolation from the rendered
//! position to the target. Telemetry is ground truth: a reported location
//! replaces the rendered position immediately and drops the animation.

use courier_proto::Coordinate;
use serde::Deserialize;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Deserialize)]
pub struct AnimationCfg {
    #[serde(default = "default_steps")]
    pub steps: u32,
    #[serde(default = "default_duration_ms")]
    pub duration_ms: u64,
}

fn default_steps() -> u32 {
    100
}

fn default_duration_ms() -> u64 {
    2000
}

impl Default for AnimationCfg {
    fn default() -> Self {
        Self { steps: default_steps(), duration_ms: default_duration_ms() }
    }
}

impl AnimationCfg {
    pub fn step_interval(&self) -> Duration {
        Duration::from_millis(self.duration_ms) / self.steps.max(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReconcilerOutput {
    /// Interpolated point to render.
    Moved(Coordinate),
    /// Animation finished at its target.
    TargetReached(Coordinate),
}

#[derive(Debug, Clone)]
struct Trajectory {
    start: Coordinate,
    target: Coordinate,
    started_at: Instant,
    step: u32,
}

#[derive(Debug)]
pub struct PositionReconciler {
    cfg: AnimationCfg,
    position: Coordinate,
    trajectory: Option<Trajectory>,
}

impl PositionReconciler {
    pub fn new(cfg: AnimationCfg, origin: Coordinate) -> Self {
        Self { cfg, position: origin, trajectory: None }
    }

    pub fn position(&self) -> Coordinate {
        self.position
    }

    pub fn target(&self) -> Option<Coordinate> {
        self.trajectory.as_ref().map(|t| t.target)
    }

    pub fn is_animating(&self) -> bool {
        self.trajectory.is_some()
    }

    /// Starts animating toward `target`, superseding any animation in flight.
    pub fn begin(&mut self, target: Coordinate, now: Instant) {
        self.trajectory = Some(Trajectory {
            start: self.position,
            target,
            started_at: now,
            step: 0,
        });
    }

    /// When the next step is due, if animating.
    pub fn next_step_at(&self) -> Option<Instant> {
        let t = self.trajectory.as_ref()?;
        Some(t.started_at + self.cfg.step_interval() * t.step)
    }

    /// Advances one step. Returns `None` once the animation is gone, whether
    /// it completed or was cancelled.
    pub fn step(&mut self) -> Option<ReconcilerOutput> {
        let steps = self.cfg.steps.max(1);
        let t = self.trajectory.as_mut()?;

        if t.step < steps {
            let progress = f64::from(t.step) / f64::from(steps);
            self.position = t.start.lerp(t.target, progress);
            t.step += 1;
            return Some(ReconcilerOutput::Moved(self.position));
        }

        let target = t.target;
        self.position = target;
        self.trajectory = None;
        Some(ReconcilerOutput::TargetReached(target))
    }

    /// Snaps to a reported location. Returns true if an animation was dropped.
    pub fn apply_telemetry(&mut self, location: Coordinate) -> bool {
        self.position = location;
        self.trajectory.take().is_some()
    }

    pub fn cancel(&mut self) -> bool {
        self.trajectory.take().is_some()
    }
}
