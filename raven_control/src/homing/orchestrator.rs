//! Per-tick homing driver.
//!
//! Called once per control tick by the surrounding controller. Everything
//! that must survive between ticks lives in [`OrchestratorState`], which
//! the caller owns; the orchestrator itself holds only configuration.
//!
//! ## Tick sequence
//!
//! ```text
//! gate (INIT / AUTO_INIT) ─no─► reset, Gated
//!   │
//! warm-up elapsed? ─no─► WarmingUp
//!   │
//! joint layout check (every mechanism, every tick)
//!   │
//! (re)initialize once per episode; fixed tools → Ready
//!   │
//! 1. joint FSMs (tools, or every joint once tools are ready)
//! 2. inverse coupling (device)
//! 3. PD control (every joint)
//! 4. torque → DAC (device)
//! 5. limit detection (every joint)
//! 6. per mechanism: completion + settle → calibration
//! ```

use bitflags::bitflags;
use raven_common::config::ConfigError;
use raven_common::consts::MAX_MECH;
use raven_common::hardware::HardwareProfile;
use raven_common::homing::HomingConfig;
use raven_common::joint::JointState;
use raven_common::run_level::RunLevel;
use static_assertions::const_assert_eq;
use tracing::{debug, error, info};

use super::calibration::calibrate_mechanism;
use super::fsm::step_joint;
use super::limit::hard_stop_reached;
use crate::collab::Collaborators;
use crate::device::Device;
use crate::error::HomingError;

// ─── Orchestrator State ─────────────────────────────────────────────

/// Homing progress retained between ticks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorState {
    homing_inited: bool,
    /// Tick at which the gate last opened.
    warmup_start: u64,
    /// Tick at which each mechanism's active group first completed.
    settle_start: [Option<u64>; MAX_MECH],
    /// An error was already reported for the current episode.
    faulted: bool,
}

impl OrchestratorState {
    pub const fn new() -> Self {
        Self {
            homing_inited: false,
            warmup_start: 0,
            settle_start: [None; MAX_MECH],
            faulted: false,
        }
    }

    #[inline]
    pub fn homing_inited(&self) -> bool {
        self.homing_inited
    }

    #[inline]
    pub fn warmup_start(&self) -> u64 {
        self.warmup_start
    }

    /// Settle timer of the mechanism at position `mech` in the device.
    #[inline]
    pub fn settle_start(&self, mech: usize) -> Option<u64> {
        self.settle_start.get(mech).copied().flatten()
    }

    #[inline]
    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    /// Gate closed: forget the episode and restart warm-up at `tick`.
    fn close_gate(&mut self, tick: u64) {
        self.homing_inited = false;
        self.warmup_start = tick;
        self.settle_start = [None; MAX_MECH];
        self.faulted = false;
    }

    /// Drop the current episode but keep the warm-up reference.
    fn abort(&mut self) {
        self.homing_inited = false;
        self.settle_start = [None; MAX_MECH];
    }
}

impl Default for OrchestratorState {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tick Input / Status ────────────────────────────────────────────

/// Controller inputs for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickInput {
    pub run_level: RunLevel,
    pub sub_level: u8,
    /// Restart homing from scratch on this tick.
    pub begin_homing: bool,
    /// Monotonic tick counter.
    pub tick: u64,
}

impl TickInput {
    /// INIT / AUTO_INIT at `tick`, no restart request.
    pub const fn auto_init(tick: u64) -> Self {
        Self {
            run_level: RunLevel::Init,
            sub_level: raven_common::run_level::SUB_LEVEL_AUTO_INIT,
            begin_homing: false,
            tick,
        }
    }
}

bitflags! {
    /// Notable things that happened during one running tick.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct HomingEvents: u8 {
        /// Joints were reset to `NotReady` on this tick.
        const REINITIALIZED = 0x01;
        /// At least one joint hit its hard stop.
        const LIMIT_FOUND   = 0x02;
        /// A mechanism was calibrated.
        const CALIBRATED    = 0x04;
        /// At least one joint reached `Ready`.
        const JOINT_READY   = 0x08;
        /// Every participating joint is `Ready`.
        const COMPLETE      = 0x10;
    }
}

const_assert_eq!(core::mem::size_of::<HomingEvents>(), 1);

/// Outcome of a successful tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomingStatus {
    /// Run level does not permit homing; state was reset.
    Gated,
    /// Waiting for the amplifiers after the gate opened.
    WarmingUp,
    /// Pipeline ran.
    Running(HomingEvents),
}

// ─── Orchestrator ───────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct HomingOrchestrator {
    config: HomingConfig,
    profile: HardwareProfile,
}

impl HomingOrchestrator {
    pub fn new(config: HomingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let profile = config.profile();
        Ok(Self { config, profile })
    }

    #[inline]
    pub fn config(&self) -> &HomingConfig {
        &self.config
    }

    #[inline]
    pub fn profile(&self) -> &HardwareProfile {
        &self.profile
    }

    /// Run one tick.
    ///
    /// Errors abort the episode: the next admitted tick re-initializes
    /// every joint. The diagnostic is logged once per episode.
    pub fn step(
        &self,
        state: &mut OrchestratorState,
        device: &mut Device,
        collab: &mut Collaborators<'_>,
        input: TickInput,
    ) -> Result<HomingStatus, HomingError> {
        if !input.run_level.is_auto_init(input.sub_level) {
            if state.homing_inited {
                debug!(tick = input.tick, run_level = ?input.run_level, "homing gate closed");
            }
            state.close_gate(input.tick);
            return Ok(HomingStatus::Gated);
        }

        if input.tick.saturating_sub(state.warmup_start) < self.config.warmup_ticks {
            return Ok(HomingStatus::WarmingUp);
        }

        if input.begin_homing {
            state.faulted = false;
        }
        if !(state.homing_inited || state.faulted) {
            debug!(tick = input.tick, warmup_start = state.warmup_start, "warm-up complete");
        }

        match self.run_pipeline(state, device, collab, input) {
            Ok(events) => Ok(HomingStatus::Running(events)),
            Err(e) => {
                if !state.faulted {
                    error!(tick = input.tick, error = %e, "homing aborted");
                    state.faulted = true;
                }
                state.abort();
                Err(e)
            }
        }
    }

    fn run_pipeline(
        &self,
        state: &mut OrchestratorState,
        device: &mut Device,
        collab: &mut Collaborators<'_>,
        input: TickInput,
    ) -> Result<HomingEvents, HomingError> {
        let mut events = HomingEvents::empty();

        for mech in device.mechanisms() {
            mech.check_layout()?;
        }

        if input.begin_homing || !state.homing_inited {
            Self::reinitialize(device, collab);
            state.homing_inited = true;
            state.settle_start = [None; MAX_MECH];
            events |= HomingEvents::REINITIALIZED;
            info!(tick = input.tick, begin_homing = input.begin_homing, "homing initialized");
        }

        if self.config.fixed_tools {
            for joint in device.joints_mut().filter(|j| j.is_tool()) {
                joint.set_state(JointState::Ready);
            }
        }

        // 1. joint state machines
        for mech in device.mechanisms_mut() {
            let tools_ready = mech.tools_ready();
            for joint in mech.joints_mut() {
                if !(joint.is_tool() || tools_ready) {
                    continue;
                }
                let before = joint.state();
                let after = step_joint(joint, &self.config, &mut *collab.trajectory)?;
                if after == JointState::Ready && before != JointState::Ready {
                    events |= HomingEvents::JOINT_READY;
                }
            }
        }

        // 2. joint → motor
        collab.coupling.inverse_device(device, input.run_level);

        // 3. torque
        for joint in device.joints_mut() {
            collab.controller.pd_control(joint);
        }

        // 4. torque → command
        collab.dac.torque_to_dac(device);

        // 5. limits, 6. completion
        for (slot, mech) in device.mechanisms_mut().iter_mut().enumerate() {
            for joint in mech.joints_mut() {
                if !hard_stop_reached(joint, &self.profile) {
                    continue;
                }
                info!(
                    mechanism = slot,
                    dof = joint.dof_type().index(),
                    joint = ?joint.kind(),
                    cmd = joint.current_cmd,
                    threshold = self.profile.threshold(joint.kind()),
                    "found limit"
                );
                joint.set_state(JointState::HardStop);
                joint.current_cmd = 0;
                collab.trajectory.stop(joint);
                events |= HomingEvents::LIMIT_FOUND;
            }

            let Some(group) = mech.completed_group() else {
                continue;
            };
            let start = *state.settle_start[slot].get_or_insert(input.tick);
            if input.tick.saturating_sub(start) > self.config.settle_ticks {
                calibrate_mechanism(
                    mech,
                    group,
                    &self.config,
                    &self.profile,
                    &mut *collab.coupling,
                    &mut *collab.estimator,
                )?;
                state.settle_start[slot] = None;
                events |= HomingEvents::CALIBRATED;
            }
        }

        if device.all_ready() {
            events |= HomingEvents::COMPLETE;
        }
        Ok(events)
    }

    /// Fresh episode: hold every joint where it is and restart its FSM.
    fn reinitialize(device: &mut Device, collab: &mut Collaborators<'_>) {
        for joint in device.joints_mut() {
            joint.tau_d = 0.0;
            joint.mpos_d = joint.mpos;
            joint.jpos_d = joint.jpos;
            joint.jvel_d = 0.0;
            joint.mvel_d = 0.0;
            joint.set_state(JointState::NotReady);
            if joint.is_tool() {
                collab.controller.reset_integral(joint);
            }
        }
    }
}
