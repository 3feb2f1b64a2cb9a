//! Collaborator seams consumed by the homing core.
//!
//! The homing core owns sequencing only. Trajectory math, cable coupling,
//! torque control, DAC conversion and state estimation sit behind these
//! traits; the reference implementations live in [`crate::trajectory`],
//! [`crate::coupling`] and [`crate::control`].

use raven_common::run_level::RunLevel;

use crate::device::{Device, Joint, Mechanism};

/// Which variant of the inverse coupling transform to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CouplingMode {
    /// Full transform including inter-joint cable coupling.
    #[default]
    Full,
    /// Reduced transform used while searching for hard stops.
    StopDetection,
}

/// Desired joint trajectory generation.
///
/// Implementations keep their per-joint progress in [`Joint::trajectory`].
pub trait TrajectoryGenerator {
    /// Start a constant-rate sweep of `magnitude` over `period` seconds.
    fn start_sinusoid(&mut self, joint: &mut Joint, magnitude: f64, period: f64);

    /// Start a bounded move from the current desired position to `target`.
    fn start_point_to_point(&mut self, joint: &mut Joint, target: f64, duration: f64);

    /// Advance the running sweep, updating `jpos_d` and `jvel_d`.
    fn advance_sinusoid(&mut self, joint: &mut Joint);

    /// Advance the running move. Returns `true` once the target is reached.
    fn advance_point_to_point(&mut self, joint: &mut Joint) -> bool;

    /// Halt the joint where it is.
    fn stop(&mut self, joint: &mut Joint);
}

/// Joint space ↔ motor space transforms.
pub trait CableCoupling {
    /// Desired joint state → desired motor state for the whole device.
    fn inverse_device(&mut self, device: &mut Device, run_level: RunLevel);

    /// Desired joint state → desired motor state for one mechanism.
    fn inverse_mechanism(&mut self, mech: &mut Mechanism, mode: CouplingMode);

    /// Measured motor state → measured joint state for one mechanism.
    fn forward_mechanism(&mut self, mech: &mut Mechanism);
}

/// Per-joint torque control.
pub trait JointController {
    /// Compute `tau_d` from the desired and measured motor state.
    fn pd_control(&mut self, joint: &mut Joint);

    /// Clear the integral term of the position-hold loop.
    fn reset_integral(&mut self, joint: &mut Joint);
}

/// Desired torque → amplifier command.
pub trait DacConverter {
    fn torque_to_dac(&mut self, device: &mut Device);
}

/// Measured-state estimation.
pub trait StateEstimator {
    fn reset(&mut self, joint: &mut Joint);

    /// Recompute the measured motor state from the raw encoder reading.
    fn update(&mut self, joint: &mut Joint, sign: f64, counts_per_radian: f64);
}

/// Bundle of collaborators handed to each orchestrator step.
pub struct Collaborators<'a> {
    pub trajectory: &'a mut dyn TrajectoryGenerator,
    pub coupling: &'a mut dyn CableCoupling,
    pub controller: &'a mut dyn JointController,
    pub dac: &'a mut dyn DacConverter,
    pub estimator: &'a mut dyn StateEstimator,
}
