//! Reference trajectory generator.
//!
//! Two profiles, both evaluated once per tick from state stored on the joint:
//!
//! - **Sweep**: constant joint velocity `magnitude / period`, blended in with
//!   a half-cosine over [`SWEEP_RAMP_S`] (or the period, if shorter) so the
//!   joint does not start with a velocity step. The sweep runs until
//!   something halts it (the hard stop).
//! - **Point-to-point**: half-cosine position blend from the desired position
//!   at start to the target, reaching it with zero velocity after `duration`.

use core::f64::consts::PI;

use raven_common::homing::NO_SWEEP;

use crate::collab::TrajectoryGenerator;
use crate::device::Joint;

/// Longest sweep blend-in [s].
pub const SWEEP_RAMP_S: f64 = 0.5;

/// Active profile on a joint.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TrajectoryMode {
    #[default]
    Idle,
    Sweep {
        velocity: f64,
        ramp: f64,
    },
    PointToPoint {
        start: f64,
        target: f64,
        duration: f64,
    },
}

/// Per-joint trajectory progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrajectoryState {
    pub mode: TrajectoryMode,
    /// Time since the profile started [s].
    pub elapsed: f64,
}

impl TrajectoryState {
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[inline]
    pub fn is_idle(&self) -> bool {
        self.mode == TrajectoryMode::Idle
    }
}

/// Half-cosine blend factor in `[0, 1]` for `t` in `[0, span]`.
#[inline]
fn cosine_blend(t: f64, span: f64) -> f64 {
    if span <= 0.0 || t >= span {
        return 1.0;
    }
    0.5 * (1.0 - (PI * t / span).cos())
}

/// Trajectory generator stepping at a fixed period.
#[derive(Debug, Clone, Copy)]
pub struct ProfileTrajectory {
    dt: f64,
}

impl ProfileTrajectory {
    /// `dt` is the tick period [s].
    pub fn new(dt: f64) -> Self {
        Self { dt }
    }

    #[inline]
    pub fn dt(&self) -> f64 {
        self.dt
    }
}

impl TrajectoryGenerator for ProfileTrajectory {
    fn start_sinusoid(&mut self, joint: &mut Joint, magnitude: f64, period: f64) {
        joint.trajectory.elapsed = 0.0;
        // Sentinel axes hold position instead of sweeping.
        if period >= NO_SWEEP || period <= 0.0 {
            joint.trajectory.mode = TrajectoryMode::Idle;
            joint.jvel_d = 0.0;
            return;
        }
        joint.trajectory.mode = TrajectoryMode::Sweep {
            velocity: magnitude / period,
            ramp: period.min(SWEEP_RAMP_S),
        };
    }

    fn start_point_to_point(&mut self, joint: &mut Joint, target: f64, duration: f64) {
        joint.trajectory.elapsed = 0.0;
        joint.trajectory.mode = TrajectoryMode::PointToPoint {
            start: joint.jpos_d,
            target,
            duration,
        };
    }

    fn advance_sinusoid(&mut self, joint: &mut Joint) {
        let TrajectoryMode::Sweep { velocity, ramp } = joint.trajectory.mode else {
            joint.jvel_d = 0.0;
            return;
        };
        joint.trajectory.elapsed += self.dt;
        let v = velocity * cosine_blend(joint.trajectory.elapsed, ramp);
        joint.jvel_d = v;
        joint.jpos_d += v * self.dt;
    }

    fn advance_point_to_point(&mut self, joint: &mut Joint) -> bool {
        let TrajectoryMode::PointToPoint {
            start,
            target,
            duration,
        } = joint.trajectory.mode
        else {
            return true;
        };

        joint.trajectory.elapsed += self.dt;
        let t = joint.trajectory.elapsed;
        if t >= duration {
            joint.jpos_d = target;
            joint.jvel_d = 0.0;
            joint.trajectory.mode = TrajectoryMode::Idle;
            return true;
        }

        let delta = target - start;
        joint.jpos_d = start + delta * cosine_blend(t, duration);
        joint.jvel_d = delta * 0.5 * PI / duration * (PI * t / duration).sin();
        false
    }

    fn stop(&mut self, joint: &mut Joint) {
        joint.trajectory.mode = TrajectoryMode::Idle;
        joint.jvel_d = 0.0;
    }
}
