//! Per-joint homing state machine.
//!
//! ```text
//! NotReady ──start sweep──► PosUnknown ──limit trip──► HardStop
//!                                                         │ calibration
//!                                                         ▼
//!              Ready ◄──move done── Homing2 ◄──same tick── Homing1
//! ```
//!
//! The `PosUnknown → HardStop` edge is taken by the orchestrator when the
//! limit detector trips, and `HardStop → Homing1` by calibration. `Wait`
//! is passive and never advanced here.

use raven_common::homing::{HomingConfig, homing_sweep};
use raven_common::joint::JointState;
use tracing::info;

use crate::collab::TrajectoryGenerator;
use crate::device::Joint;
use crate::error::HomingError;

/// Advance one joint by one tick. Returns the state after the step.
pub fn step_joint(
    joint: &mut Joint,
    config: &HomingConfig,
    trajectory: &mut dyn TrajectoryGenerator,
) -> Result<JointState, HomingError> {
    match joint.state() {
        JointState::NotReady => {
            let sweep = homing_sweep(joint.kind());
            trajectory.start_sinusoid(joint, sweep.magnitude, sweep.period);
            joint.set_state(JointState::PosUnknown);
        }
        JointState::PosUnknown => trajectory.advance_sinusoid(joint),
        JointState::Homing1 => {
            start_return_home(joint, config, trajectory)?;
            advance_return_home(joint, trajectory);
        }
        JointState::Homing2 => advance_return_home(joint, trajectory),
        JointState::Wait | JointState::HardStop | JointState::Ready => {}
    }
    Ok(joint.state())
}

/// `Homing1` entry: start the move to the home position and continue as
/// `Homing2` within the same evaluation, so the move advances on the tick
/// it was armed.
fn start_return_home(
    joint: &mut Joint,
    config: &HomingConfig,
    trajectory: &mut dyn TrajectoryGenerator,
) -> Result<(), HomingError> {
    let dof = joint.dof_type();
    let home = config
        .dof_type(dof)
        .ok_or(HomingError::InvalidDofType { index: dof.index() })?
        .home_position;
    trajectory.start_point_to_point(joint, home, config.homing_duration_s);
    joint.set_state(JointState::Homing2);
    Ok(())
}

fn advance_return_home(joint: &mut Joint, trajectory: &mut dyn TrajectoryGenerator) {
    if trajectory.advance_point_to_point(joint) {
        joint.set_state(JointState::Ready);
        info!(
            dof = joint.dof_type().index(),
            joint = ?joint.kind(),
            jpos_d = joint.jpos_d,
            "joint ready"
        );
    }
}
