//! Device model: device → mechanisms → joints.
//!
//! All storage is fixed-size. A `Device` holds up to `MAX_MECH` mechanisms
//! in a `heapless::Vec`; every mechanism owns exactly `MAX_DOF_PER_MECH`
//! joints in slot order.

use heapless::Vec;
use raven_common::consts::{MAX_DOF_PER_MECH, MAX_MECH};
use raven_common::joint::{ArmId, CompletionGroup, DofType, JointKind, JointState};

use crate::control::filters::EstimateState;
use crate::control::pid::PidState;
use crate::error::HomingError;
use crate::trajectory::TrajectoryState;

// ─── Joint ──────────────────────────────────────────────────────────

/// One actuated degree of freedom.
///
/// Positions are in rad (m for insertion). `j*` fields are joint space,
/// `m*` fields motor space. Homing state and encoder offset are written by
/// the homing core; everything else is shared with the collaborators.
#[derive(Debug, Clone)]
pub struct Joint {
    dof_type: DofType,
    state: JointState,

    /// Measured joint position.
    pub jpos: f64,
    /// Measured joint velocity.
    pub jvel: f64,
    /// Desired joint position.
    pub jpos_d: f64,
    /// Desired joint velocity.
    pub jvel_d: f64,

    /// Measured motor position.
    pub mpos: f64,
    /// Measured motor velocity.
    pub mvel: f64,
    /// Desired motor position.
    pub mpos_d: f64,
    /// Desired motor velocity.
    pub mvel_d: f64,

    /// Desired motor torque [Nm].
    pub tau_d: f64,
    /// Commanded actuation sent to the amplifier [raw DAC counts].
    pub current_cmd: i32,

    /// Raw encoder reading [counts].
    pub enc_val: i32,
    enc_offset: f64,

    pub trajectory: TrajectoryState,
    pub pid: PidState,
    pub estimate: EstimateState,
}

impl Joint {
    pub fn new(dof_type: DofType) -> Self {
        Self {
            dof_type,
            state: JointState::NotReady,
            jpos: 0.0,
            jvel: 0.0,
            jpos_d: 0.0,
            jvel_d: 0.0,
            mpos: 0.0,
            mvel: 0.0,
            mpos_d: 0.0,
            mvel_d: 0.0,
            tau_d: 0.0,
            current_cmd: 0,
            enc_val: 0,
            enc_offset: 0.0,
            trajectory: TrajectoryState::default(),
            pid: PidState::default(),
            estimate: EstimateState::default(),
        }
    }

    #[inline]
    pub fn dof_type(&self) -> DofType {
        self.dof_type
    }

    #[inline]
    pub fn kind(&self) -> JointKind {
        self.dof_type.kind()
    }

    #[inline]
    pub fn is_tool(&self) -> bool {
        self.kind().is_tool()
    }

    #[inline]
    pub fn state(&self) -> JointState {
        self.state
    }

    #[inline]
    pub(crate) fn set_state(&mut self, state: JointState) {
        self.state = state;
    }

    /// Encoder offset [counts] derived by the last calibration.
    #[inline]
    pub fn enc_offset(&self) -> f64 {
        self.enc_offset
    }

    #[inline]
    pub(crate) fn set_enc_offset(&mut self, offset: f64) {
        self.enc_offset = offset;
    }
}

// ─── Mechanism ──────────────────────────────────────────────────────

/// One arm and its joints in slot order.
#[derive(Debug, Clone)]
pub struct Mechanism {
    arm: ArmId,
    index: usize,
    joints: [Joint; MAX_DOF_PER_MECH],
}

impl Mechanism {
    /// Mechanism `index` on the device, with the standard slot layout.
    pub fn new(index: usize, arm: ArmId) -> Self {
        Self {
            arm,
            index,
            joints: core::array::from_fn(|slot| {
                Joint::new(DofType::new(index, JointKind::ALL[slot]))
            }),
        }
    }

    /// Build from explicit joints. The layout is checked on every homing tick.
    pub fn from_joints(index: usize, arm: ArmId, joints: [Joint; MAX_DOF_PER_MECH]) -> Self {
        Self { arm, index, joints }
    }

    #[inline]
    pub fn arm(&self) -> ArmId {
        self.arm
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn joints(&self) -> &[Joint; MAX_DOF_PER_MECH] {
        &self.joints
    }

    #[inline]
    pub fn joints_mut(&mut self) -> &mut [Joint; MAX_DOF_PER_MECH] {
        &mut self.joints
    }

    #[inline]
    pub fn joint(&self, kind: JointKind) -> &Joint {
        &self.joints[kind.slot()]
    }

    #[inline]
    pub fn joint_mut(&mut self, kind: JointKind) -> &mut Joint {
        &mut self.joints[kind.slot()]
    }

    /// True when every member of `group` is in `state`.
    pub fn group_in_state(&self, group: CompletionGroup, state: JointState) -> bool {
        group
            .members()
            .iter()
            .all(|&kind| self.joint(kind).state() == state)
    }

    /// Tool group finished homing; positioning joints may start.
    #[inline]
    pub fn tools_ready(&self) -> bool {
        self.group_in_state(CompletionGroup::Tool, JointState::Ready)
    }

    /// The group whose hard-stop search just completed, if any.
    ///
    /// Tools are considered first; positioning joints only once tools are
    /// ready.
    pub fn completed_group(&self) -> Option<CompletionGroup> {
        let group = if self.tools_ready() {
            CompletionGroup::Positioning
        } else {
            CompletionGroup::Tool
        };
        self.group_in_state(group, JointState::HardStop)
            .then_some(group)
    }

    /// Every slot must hold the joint type `index * MAX_DOF_PER_MECH + slot`,
    /// so shared per-slot tables can be keyed by `type % MAX_DOF_PER_MECH`.
    pub fn check_layout(&self) -> Result<(), HomingError> {
        for (slot, joint) in self.joints.iter().enumerate() {
            let t = joint.dof_type();
            if !t.is_valid() {
                return Err(HomingError::InvalidDofType { index: t.index() });
            }
            if t.slot() != slot || t.mechanism() != self.index {
                return Err(HomingError::MechanismLayout {
                    mechanism: self.index,
                    slot,
                    index: t.index(),
                });
            }
        }
        Ok(())
    }
}

// ─── Device ─────────────────────────────────────────────────────────

/// Top-level aggregate.
#[derive(Debug, Clone, Default)]
pub struct Device {
    mechanisms: Vec<Mechanism, MAX_MECH>,
}

impl Device {
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard two-arm device: Gold is mechanism 0, Green mechanism 1.
    pub fn two_arm() -> Self {
        Self {
            mechanisms: Vec::from_array([
                Mechanism::new(0, ArmId::Gold),
                Mechanism::new(1, ArmId::Green),
            ]),
        }
    }

    pub fn push(&mut self, mech: Mechanism) -> Result<(), HomingError> {
        self.mechanisms
            .push(mech)
            .map_err(|_| HomingError::TooManyMechanisms)
    }

    #[inline]
    pub fn mechanisms(&self) -> &[Mechanism] {
        &self.mechanisms
    }

    #[inline]
    pub fn mechanisms_mut(&mut self) -> &mut [Mechanism] {
        &mut self.mechanisms
    }

    pub fn joints(&self) -> impl Iterator<Item = &Joint> {
        self.mechanisms.iter().flat_map(|m| m.joints.iter())
    }

    pub fn joints_mut(&mut self) -> impl Iterator<Item = &mut Joint> {
        self.mechanisms.iter_mut().flat_map(|m| m.joints.iter_mut())
    }

    /// Homing finished on every joint that takes part in it.
    pub fn all_ready(&self) -> bool {
        self.joints()
            .filter(|j| j.kind() != JointKind::Unused)
            .all(|j| j.state() == JointState::Ready)
    }
}
