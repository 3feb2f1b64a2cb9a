//! Shared bench for the integration tests.
//!
//! Every collaborator is the reference implementation except the DAC,
//! which writes a scripted command per joint instead of converting the
//! controller torque. Tests pick the commands to make joints hit (or miss)
//! their trip thresholds on chosen ticks.

mod gate;
mod homing_sequence;

use raven_common::consts::{MAX_DOF_PER_MECH, MAX_MECH};
use raven_common::homing::HomingConfig;
use raven_common::joint::JointKind;
use raven_control::collab::{Collaborators, DacConverter};
use raven_control::control::filters::LowPassEstimator;
use raven_control::control::pid::PdController;
use raven_control::coupling::LinearCoupling;
use raven_control::device::Device;
use raven_control::error::HomingError;
use raven_control::homing::{
    HomingEvents, HomingOrchestrator, HomingStatus, OrchestratorState, TickInput,
};
use raven_control::trajectory::ProfileTrajectory;

/// DAC stand-in: the command of every joint is whatever the test loaded.
#[derive(Debug, Default)]
pub struct ScriptedDac {
    pub loads: [[i32; MAX_DOF_PER_MECH]; MAX_MECH],
}

impl DacConverter for ScriptedDac {
    fn torque_to_dac(&mut self, device: &mut Device) {
        for (mech, loads) in device.mechanisms_mut().iter_mut().zip(&self.loads) {
            for (joint, &load) in mech.joints_mut().iter_mut().zip(loads) {
                joint.current_cmd = load;
            }
        }
    }
}

pub struct Bench {
    pub orch: HomingOrchestrator,
    pub state: OrchestratorState,
    pub device: Device,
    pub trajectory: ProfileTrajectory,
    pub coupling: LinearCoupling,
    pub controller: PdController,
    pub dac: ScriptedDac,
    pub estimator: LowPassEstimator,
}

impl Bench {
    pub fn new(config: HomingConfig) -> Self {
        let dt = config.tick_period_s();
        Self {
            orch: HomingOrchestrator::new(config).unwrap(),
            state: OrchestratorState::new(),
            device: Device::two_arm(),
            trajectory: ProfileTrajectory::new(dt),
            coupling: LinearCoupling::new(),
            controller: PdController::new(dt),
            dac: ScriptedDac::default(),
            estimator: LowPassEstimator::new(dt),
        }
    }

    /// Defaults with the amplifier warm-up disabled.
    pub fn without_warmup() -> Self {
        Self::new(HomingConfig {
            warmup_ticks: 0,
            ..HomingConfig::default()
        })
    }

    /// No warm-up, tools without hard stops.
    pub fn fixed_tools() -> Self {
        Self::new(HomingConfig {
            warmup_ticks: 0,
            fixed_tools: true,
            ..HomingConfig::default()
        })
    }

    pub fn step(&mut self, input: TickInput) -> Result<HomingStatus, HomingError> {
        let mut collab = Collaborators {
            trajectory: &mut self.trajectory,
            coupling: &mut self.coupling,
            controller: &mut self.controller,
            dac: &mut self.dac,
            estimator: &mut self.estimator,
        };
        self.orch
            .step(&mut self.state, &mut self.device, &mut collab, input)
    }

    /// One INIT / AUTO_INIT tick that must run the pipeline.
    pub fn tick(&mut self, tick: u64) -> HomingEvents {
        match self.step(TickInput::auto_init(tick)) {
            Ok(HomingStatus::Running(events)) => events,
            other => panic!("tick {tick}: expected running, got {other:?}"),
        }
    }

    /// Command `cmd` on `kind` of mechanism `mech` from now on.
    pub fn load(&mut self, mech: usize, kind: JointKind, cmd: i32) {
        self.dac.loads[mech][kind.slot()] = cmd;
    }
}
