//! Reference cable coupling.
//!
//! Each joint is driven through a fixed transmission ratio. Tool cables run
//! along the insertion axis, so in full mode every tool motor also picks up
//! a term proportional to the insertion position:
//!
//! ```text
//! m_i = ratio_i · j_i + k_i · j_insertion
//! ```
//!
//! Stop-detection mode drops the insertion term.

use raven_common::consts::MAX_DOF_PER_MECH;
use raven_common::joint::JointKind;
use raven_common::run_level::RunLevel;

use crate::collab::{CableCoupling, CouplingMode};
use crate::device::{Device, Mechanism};

/// Motor rad per joint unit, indexed by joint slot.
pub const DEFAULT_RATIOS: [f64; MAX_DOF_PER_MECH] = [
    7.7,   // shoulder
    7.7,   // elbow
    100.0, // insertion [rad/m]
    1.0,   // unused
    3.5,   // tool rotation
    2.0,   // wrist
    2.0,   // grasp 1
    2.0,   // grasp 2
];

/// Tool motor rad per metre of insertion, indexed by joint slot.
pub const DEFAULT_INSERTION_COUPLING: [f64; MAX_DOF_PER_MECH] =
    [0.0, 0.0, 0.0, 0.0, 30.0, 30.0, 30.0, 30.0];

#[derive(Debug, Clone)]
pub struct LinearCoupling {
    ratios: [f64; MAX_DOF_PER_MECH],
    insertion_coupling: [f64; MAX_DOF_PER_MECH],
}

impl LinearCoupling {
    pub fn new() -> Self {
        Self::with_tables(DEFAULT_RATIOS, DEFAULT_INSERTION_COUPLING)
    }

    pub fn with_tables(
        ratios: [f64; MAX_DOF_PER_MECH],
        insertion_coupling: [f64; MAX_DOF_PER_MECH],
    ) -> Self {
        Self {
            ratios,
            insertion_coupling,
        }
    }

    #[inline]
    pub fn ratio(&self, kind: JointKind) -> f64 {
        self.ratios[kind.slot()]
    }

    #[inline]
    pub fn insertion_coupling(&self, kind: JointKind) -> f64 {
        self.insertion_coupling[kind.slot()]
    }

    fn coupling_term(&self, slot: usize, mode: CouplingMode) -> f64 {
        match mode {
            CouplingMode::Full => self.insertion_coupling[slot],
            CouplingMode::StopDetection => 0.0,
        }
    }

    fn inverse(&self, mech: &mut Mechanism, mode: CouplingMode) {
        let ins = mech.joint(JointKind::Insertion);
        let (ins_pos, ins_vel) = (ins.jpos_d, ins.jvel_d);
        for (slot, joint) in mech.joints_mut().iter_mut().enumerate() {
            let k = self.coupling_term(slot, mode);
            joint.mpos_d = self.ratios[slot] * joint.jpos_d + k * ins_pos;
            joint.mvel_d = self.ratios[slot] * joint.jvel_d + k * ins_vel;
        }
    }

    /// Desired motor state follows the measured one; nothing moves.
    fn hold(mech: &mut Mechanism) {
        for joint in mech.joints_mut() {
            joint.mpos_d = joint.mpos;
            joint.mvel_d = 0.0;
        }
    }
}

impl Default for LinearCoupling {
    fn default() -> Self {
        Self::new()
    }
}

impl CableCoupling for LinearCoupling {
    fn inverse_device(&mut self, device: &mut Device, run_level: RunLevel) {
        for mech in device.mechanisms_mut() {
            match run_level {
                RunLevel::EStop => Self::hold(mech),
                _ => self.inverse(mech, CouplingMode::Full),
            }
        }
    }

    fn inverse_mechanism(&mut self, mech: &mut Mechanism, mode: CouplingMode) {
        self.inverse(mech, mode);
    }

    fn forward_mechanism(&mut self, mech: &mut Mechanism) {
        // Insertion has no coupling term; solve it first.
        let ins_slot = JointKind::Insertion.slot();
        let ins = mech.joint(JointKind::Insertion);
        let ins_pos = ins.mpos / self.ratios[ins_slot];
        let ins_vel = ins.mvel / self.ratios[ins_slot];

        for (slot, joint) in mech.joints_mut().iter_mut().enumerate() {
            let k = self.insertion_coupling[slot];
            joint.jpos = (joint.mpos - k * ins_pos) / self.ratios[slot];
            joint.jvel = (joint.mvel - k * ins_vel) / self.ratios[slot];
        }
    }
}
