//! One-shot mechanism calibration.
//!
//! Runs once per completion group after its joints settled against their
//! hard stops. The stopped joints are known to sit at their maximum
//! position, so the raw encoder readings taken now fix the encoder offsets.
//!
//! Procedure, all within one tick:
//!
//! 1. Desired joint positions by role (see [`CalibrationRole`]).
//! 2. Full inverse coupling for the mechanism.
//! 3. Per joint: measured motor position ← desired, estimator reset, new
//!    offset so the current raw reading decodes to the desired motor
//!    position, estimator update.
//! 4. Forward coupling for the mechanism.

use raven_common::consts::MAX_DOF_PER_MECH;
use raven_common::hardware::HardwareProfile;
use raven_common::homing::HomingConfig;
use raven_common::joint::{CompletionGroup, JointKind, JointState};
use tracing::{debug, info};

use crate::collab::{CableCoupling, CouplingMode, StateEstimator};
use crate::control::filters::encoder_offset_for;
use crate::device::Mechanism;
use crate::error::HomingError;

/// What calibration does with a joint's desired position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationRole {
    /// Not homed yet; held at its home position.
    PinHome,
    /// Already homed; held where it is.
    PinMeasured,
    /// Calibrated now: set to its maximum position and re-armed into `Homing1`.
    Rearm,
}

impl CalibrationRole {
    pub const fn of(group: CompletionGroup, kind: JointKind) -> Self {
        match (group, kind.is_tool()) {
            (CompletionGroup::Tool, false) => Self::PinHome,
            (CompletionGroup::Positioning, true) => Self::PinMeasured,
            _ => Self::Rearm,
        }
    }
}

/// Calibrate `mech` for the group that just completed its stop search.
///
/// Nothing is modified if a joint type is outside the DOF type table.
pub fn calibrate_mechanism(
    mech: &mut Mechanism,
    group: CompletionGroup,
    config: &HomingConfig,
    profile: &HardwareProfile,
    coupling: &mut dyn CableCoupling,
    estimator: &mut dyn StateEstimator,
) -> Result<(), HomingError> {
    let mut targets = [(CalibrationRole::PinMeasured, 0.0); MAX_DOF_PER_MECH];
    for (target, joint) in targets.iter_mut().zip(mech.joints()) {
        let dof = joint.dof_type();
        let constants = config
            .dof_type(dof)
            .ok_or(HomingError::InvalidDofType { index: dof.index() })?;
        let role = CalibrationRole::of(group, joint.kind());
        let jpos_d = match role {
            CalibrationRole::PinHome => constants.home_position,
            CalibrationRole::PinMeasured => joint.jpos,
            CalibrationRole::Rearm => constants.max_position,
        };
        *target = (role, jpos_d);
    }

    // 1. desired joint positions
    for (joint, &(role, jpos_d)) in mech.joints_mut().iter_mut().zip(&targets) {
        joint.jpos_d = jpos_d;
        if role == CalibrationRole::Rearm {
            joint.set_state(JointState::Homing1);
        }
    }

    // 2. joint → motor
    coupling.inverse_mechanism(mech, CouplingMode::Full);

    // 3. offsets
    let arm = mech.arm();
    let counts_per_radian = config.counts_per_radian();
    for joint in mech.joints_mut() {
        let sign = profile.encoder_sign(arm, joint.kind());
        joint.mpos = joint.mpos_d;
        estimator.reset(joint);
        let offset = encoder_offset_for(joint.enc_val, sign, joint.mpos_d, counts_per_radian);
        joint.set_enc_offset(offset);
        estimator.update(joint, sign, counts_per_radian);
        debug!(
            dof = joint.dof_type().index(),
            joint = ?joint.kind(),
            enc_val = joint.enc_val,
            enc_offset = offset,
            "encoder offset set"
        );
    }

    // 4. motor → joint
    coupling.forward_mechanism(mech);

    info!(
        mechanism = mech.index(),
        arm = ?arm,
        group = ?group,
        "calibration complete"
    );
    Ok(())
}
