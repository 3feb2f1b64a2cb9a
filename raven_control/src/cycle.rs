//! Homing bench cycle: read → process → write.
//!
//! Drives the homing orchestrator against simulated arms at the configured
//! tick period, holding the run level at INIT / AUTO_INIT.
//!
//! ## RT Setup Sequence
//! 1. Pre-allocate all runtime state (no heap in the loop).
//! 2. `mlockall(MCL_CURRENT | MCL_FUTURE)`.
//! 3. Prefault stack pages.
//! 4. `sched_setaffinity` to the requested core.
//! 5. `sched_setscheduler(SCHED_FIFO, prio)`.
//!
//! With the `rt` feature the loop sleeps on `CLOCK_MONOTONIC` absolute
//! time; otherwise it paces with `std::thread::sleep`, or runs flat out
//! when pacing is off.
//!
//! ## Cycle Body
//! Read encoders and estimate state → orchestrator step → apply commands
//! to the plant.

use std::sync::atomic::{AtomicBool, Ordering};

use heapless::Vec;
use raven_common::config::ConfigError;
use raven_common::consts::MAX_MECH;
use raven_common::homing::HomingConfig;
use thiserror::Error;
use tracing::{debug, info};

use crate::collab::{CableCoupling, Collaborators, StateEstimator};
use crate::control::dac::TorqueDac;
use crate::control::filters::LowPassEstimator;
use crate::control::pid::PdController;
use crate::coupling::LinearCoupling;
use crate::device::Device;
use crate::error::HomingError;
use crate::homing::{HomingEvents, HomingOrchestrator, HomingStatus, OrchestratorState, TickInput};
use crate::sim::SimulatedArm;
use crate::trajectory::ProfileTrajectory;

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-cycle timing statistics.
#[derive(Debug, Clone)]
pub struct CycleStats {
    /// Total cycles executed.
    pub cycle_count: u64,
    /// Last cycle duration [ns].
    pub last_cycle_ns: i64,
    /// Minimum cycle duration [ns].
    pub min_cycle_ns: i64,
    /// Maximum cycle duration [ns].
    pub max_cycle_ns: i64,
    sum_cycle_ns: i64,
    /// Cycles that took longer than the tick period.
    pub overruns: u64,
}

impl CycleStats {
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_ns: 0,
            min_cycle_ns: i64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            overruns: 0,
        }
    }

    /// Record a cycle duration. O(1), no allocation.
    #[inline]
    pub fn record(&mut self, duration_ns: i64, budget_ns: i64) {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        self.min_cycle_ns = self.min_cycle_ns.min(duration_ns);
        self.max_cycle_ns = self.max_cycle_ns.max(duration_ns);
        self.sum_cycle_ns += duration_ns;
        if duration_ns > budget_ns {
            self.overruns += 1;
        }
    }

    /// Average cycle time [ns] (0 if no cycles).
    #[inline]
    pub fn avg_cycle_ns(&self) -> i64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_ns / self.cycle_count as i64
        }
    }
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum CycleError {
    /// RT system call failed.
    #[error("RT setup error: {0}")]
    RtSetup(String),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("homing error: {0}")]
    Homing(#[from] HomingError),
}

// ─── RT Setup ───────────────────────────────────────────────────────

#[cfg(feature = "rt")]
fn rt_mlockall() -> Result<(), CycleError> {
    use nix::sys::mman::{MlockallFlags, mlockall};
    mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
        .map_err(|e| CycleError::RtSetup(format!("mlockall failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_mlockall() -> Result<(), CycleError> {
    Ok(())
}

/// Touch 256 KiB of stack so the loop does not fault it in.
fn prefault_stack() {
    let mut buf = [0u8; 256 * 1024];
    for byte in buf.iter_mut() {
        // SAFETY: `byte` is a valid, exclusive reference into `buf`.
        unsafe { core::ptr::write_volatile(byte, 0xFF) };
    }
    core::hint::black_box(&buf);
}

#[cfg(feature = "rt")]
fn rt_set_affinity(cpu: usize) -> Result<(), CycleError> {
    use nix::sched::{CpuSet, sched_setaffinity};
    use nix::unistd::Pid;

    let mut cpuset = CpuSet::new();
    cpuset
        .set(cpu)
        .map_err(|e| CycleError::RtSetup(format!("CpuSet::set({cpu}) failed: {e}")))?;
    sched_setaffinity(Pid::from_raw(0), &cpuset)
        .map_err(|e| CycleError::RtSetup(format!("sched_setaffinity failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_set_affinity(_cpu: usize) -> Result<(), CycleError> {
    Ok(())
}

#[cfg(feature = "rt")]
fn rt_set_scheduler(priority: i32) -> Result<(), CycleError> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    // SAFETY: `param` outlives the call; pid 0 is the calling thread.
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(CycleError::RtSetup(format!(
            "sched_setscheduler(SCHED_FIFO, {priority}) failed: {err}"
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_scheduler(_priority: i32) -> Result<(), CycleError> {
    Ok(())
}

/// Full RT setup. Every step is a no-op without the `rt` feature.
pub fn rt_setup(cpu_core: usize, rt_priority: i32) -> Result<(), CycleError> {
    rt_mlockall()?;
    prefault_stack();
    rt_set_affinity(cpu_core)?;
    rt_set_scheduler(rt_priority)?;
    Ok(())
}

// ─── Pacing ─────────────────────────────────────────────────────────

#[cfg(feature = "rt")]
struct Pacer {
    next_wake: nix::sys::time::TimeSpec,
    period_ns: i64,
}

#[cfg(feature = "rt")]
impl Pacer {
    fn start(period_ns: i64) -> Result<Self, CycleError> {
        use nix::time::{ClockId, clock_gettime};
        let next_wake = clock_gettime(ClockId::CLOCK_MONOTONIC)
            .map_err(|e| CycleError::RtSetup(format!("clock_gettime: {e}")))?;
        Ok(Self {
            next_wake,
            period_ns,
        })
    }

    fn wait(&mut self) {
        use nix::time::{ClockId, ClockNanosleepFlags, clock_nanosleep};
        self.next_wake = timespec_add_ns(self.next_wake, self.period_ns);
        let _ = clock_nanosleep(
            ClockId::CLOCK_MONOTONIC,
            ClockNanosleepFlags::TIMER_ABSTIME,
            &self.next_wake,
        );
    }
}

#[cfg(feature = "rt")]
fn timespec_add_ns(ts: nix::sys::time::TimeSpec, ns: i64) -> nix::sys::time::TimeSpec {
    use nix::sys::time::TimeSpec;
    let mut secs = ts.tv_sec();
    let mut nanos = ts.tv_nsec() + ns;
    while nanos >= 1_000_000_000 {
        secs += 1;
        nanos -= 1_000_000_000;
    }
    TimeSpec::new(secs, nanos)
}

#[cfg(not(feature = "rt"))]
struct Pacer {
    next_wake: std::time::Instant,
    period: std::time::Duration,
}

#[cfg(not(feature = "rt"))]
impl Pacer {
    fn start(period_ns: i64) -> Result<Self, CycleError> {
        Ok(Self {
            next_wake: std::time::Instant::now(),
            period: std::time::Duration::from_nanos(period_ns.max(0) as u64),
        })
    }

    fn wait(&mut self) {
        self.next_wake += self.period;
        if let Some(remaining) = self
            .next_wake
            .checked_duration_since(std::time::Instant::now())
        {
            std::thread::sleep(remaining);
        }
    }
}

// ─── Bench Runner ───────────────────────────────────────────────────

/// How a bench run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub ticks: u64,
    /// Every participating joint reached `Ready`.
    pub completed: bool,
    pub limits_found: u32,
    pub calibrations: u32,
}

/// Owns the device, the plant and every collaborator.
pub struct BenchRunner {
    orchestrator: HomingOrchestrator,
    state: OrchestratorState,
    device: Device,
    plants: Vec<SimulatedArm, MAX_MECH>,
    trajectory: ProfileTrajectory,
    coupling: LinearCoupling,
    controller: PdController,
    dac: TorqueDac,
    estimator: LowPassEstimator,
    tick: u64,
    dt: f64,
    tick_period_ns: i64,
    pub stats: CycleStats,
}

impl BenchRunner {
    /// Two-arm device on simulated plants.
    pub fn new(config: HomingConfig) -> Result<Self, CycleError> {
        let orchestrator = HomingOrchestrator::new(config)?;
        let config = orchestrator.config();
        let dt = config.tick_period_s();
        let tick_period_ns = config.tick_period_us as i64 * 1_000;
        let device = Device::two_arm();

        let mut plants = Vec::new();
        for mech in device.mechanisms() {
            let plant = SimulatedArm::new(mech, config, orchestrator.profile());
            plants
                .push(plant)
                .map_err(|_| HomingError::TooManyMechanisms)?;
        }

        Ok(Self {
            state: OrchestratorState::new(),
            device,
            plants,
            trajectory: ProfileTrajectory::new(dt),
            coupling: LinearCoupling::new(),
            controller: PdController::new(dt),
            dac: TorqueDac::new(),
            estimator: LowPassEstimator::new(dt),
            tick: 0,
            dt,
            tick_period_ns,
            stats: CycleStats::new(),
            orchestrator,
        })
    }

    #[inline]
    pub fn device(&self) -> &Device {
        &self.device
    }

    #[inline]
    pub fn state(&self) -> &OrchestratorState {
        &self.state
    }

    #[inline]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn plant(&self, mech: usize) -> Option<&SimulatedArm> {
        self.plants.get(mech)
    }

    /// Three-phase cycle body: read → process → write.
    pub fn cycle_body(&mut self) -> Result<HomingStatus, CycleError> {
        let profile = *self.orchestrator.profile();
        let counts_per_radian = self.orchestrator.config().counts_per_radian();

        // ═══ READ PHASE ═══
        for (mech, plant) in self.device.mechanisms_mut().iter_mut().zip(&self.plants) {
            plant.read(mech);
            let arm = mech.arm();
            for joint in mech.joints_mut() {
                let sign = profile.encoder_sign(arm, joint.kind());
                self.estimator.update(joint, sign, counts_per_radian);
            }
            self.coupling.forward_mechanism(mech);
        }

        // ═══ PROCESS PHASE ═══
        let mut collab = Collaborators {
            trajectory: &mut self.trajectory,
            coupling: &mut self.coupling,
            controller: &mut self.controller,
            dac: &mut self.dac,
            estimator: &mut self.estimator,
        };
        let status = self.orchestrator.step(
            &mut self.state,
            &mut self.device,
            &mut collab,
            TickInput::auto_init(self.tick),
        )?;

        // ═══ WRITE PHASE ═══
        for (mech, plant) in self.device.mechanisms().iter().zip(self.plants.iter_mut()) {
            plant.write(mech, self.dt);
        }

        self.tick += 1;
        Ok(status)
    }

    /// Run until homing completes, `max_ticks` elapse, or `running` clears.
    pub fn run(
        &mut self,
        max_ticks: u64,
        realtime: bool,
        running: &AtomicBool,
    ) -> Result<RunSummary, CycleError> {
        let mut summary = RunSummary::default();
        let mut pacer = Pacer::start(self.tick_period_ns)?;

        while summary.ticks < max_ticks && running.load(Ordering::Relaxed) {
            let cycle_start = std::time::Instant::now();
            let status = self.cycle_body()?;
            let duration_ns = cycle_start.elapsed().as_nanos() as i64;
            self.stats.record(duration_ns, self.tick_period_ns);
            summary.ticks += 1;

            if let HomingStatus::Running(events) = status {
                if events.contains(HomingEvents::LIMIT_FOUND) {
                    summary.limits_found += 1;
                }
                if events.contains(HomingEvents::CALIBRATED) {
                    summary.calibrations += 1;
                    debug!(tick = self.tick, "calibration pass done");
                }
                if events.contains(HomingEvents::COMPLETE) {
                    summary.completed = true;
                    info!(tick = self.tick, "all joints ready");
                    break;
                }
            }

            if realtime {
                pacer.wait();
            }
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raven_common::hardware::HardwareVariant;
    use raven_common::joint::{JointKind, JointState};

    #[test]
    fn cycle_stats_basic() {
        let mut stats = CycleStats::new();
        assert_eq!(stats.avg_cycle_ns(), 0);

        stats.record(500_000, 1_000_000);
        stats.record(600_000, 1_000_000);
        assert_eq!(stats.cycle_count, 2);
        assert_eq!(stats.min_cycle_ns, 500_000);
        assert_eq!(stats.max_cycle_ns, 600_000);
        assert_eq!(stats.avg_cycle_ns(), 550_000);
        assert_eq!(stats.overruns, 0);

        stats.record(1_500_000, 1_000_000);
        assert_eq!(stats.overruns, 1);
    }

    #[test]
    fn rt_setup_no_rt_feature_is_noop() {
        #[cfg(not(feature = "rt"))]
        assert!(rt_setup(0, 80).is_ok());
    }

    #[test]
    fn cycle_error_display() {
        let err = CycleError::from(HomingError::InvalidDofType { index: 17 });
        assert!(err.to_string().contains("17"));
    }

    #[test]
    fn warm_up_holds_joints() {
        let mut runner = BenchRunner::new(HomingConfig::default()).unwrap();
        for _ in 0..500 {
            assert_eq!(runner.cycle_body().unwrap(), HomingStatus::WarmingUp);
        }
        assert!(runner
            .device()
            .joints()
            .all(|j| j.state() == JointState::NotReady));
    }

    fn homes_fully(variant: HardwareVariant) {
        let config = HomingConfig {
            hardware: variant,
            ..HomingConfig::default()
        };
        let mut runner = BenchRunner::new(config).unwrap();
        let running = AtomicBool::new(true);
        let summary = runner.run(30_000, false, &running).unwrap();

        assert!(summary.completed, "{variant:?}: {summary:?}");
        // tools then positioning, on both arms
        assert_eq!(summary.calibrations, 4);
        assert!(runner.device().all_ready());

        for (index, mech) in runner.device().mechanisms().iter().enumerate() {
            let Some(plant) = runner.plant(index) else {
                panic!("missing plant {index}");
            };
            for kind in [JointKind::Shoulder, JointKind::Elbow, JointKind::Insertion] {
                let joint = mech.joint(kind);
                let truth = plant.joint_position(kind);
                // measured position agrees with the plant after calibration
                assert!(
                    (joint.jpos - truth).abs() < 0.01,
                    "{variant:?} mech {index} {kind:?}: {} vs {truth}",
                    joint.jpos
                );
            }
        }
    }

    #[test]
    fn homes_standard_hardware() {
        homes_fully(HardwareVariant::Standard);
    }

    #[test]
    fn homes_square_hardware() {
        homes_fully(HardwareVariant::Square);
    }

    #[test]
    fn cleared_flag_stops_run() {
        let mut runner = BenchRunner::new(HomingConfig::default()).unwrap();
        let running = AtomicBool::new(false);
        let summary = runner.run(1_000, false, &running).unwrap();
        assert_eq!(summary.ticks, 0);
        assert!(!summary.completed);
    }
}
