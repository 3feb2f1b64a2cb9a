//! Homing sequence: stop search, settle, calibration and return to home.

use raven_common::homing::HomingConfig;
use raven_common::joint::{ArmId, DofType, JointKind, JointState};
use raven_control::control::filters::decode_encoder;
use raven_control::coupling::DEFAULT_RATIOS;
use raven_control::homing::HomingEvents;

use super::Bench;

const TOOLS: [JointKind; 4] = [
    JointKind::ToolRotation,
    JointKind::Wrist,
    JointKind::Grasp1,
    JointKind::Grasp2,
];

const POSITIONING: [JointKind; 3] = [JointKind::Shoulder, JointKind::Elbow, JointKind::Insertion];

/// Bench with fixed tools, initialized on tick 0.
fn tools_homed() -> Bench {
    let mut bench = Bench::fixed_tools();
    let events = bench.tick(0);
    assert!(events.contains(HomingEvents::REINITIALIZED));
    for mech in bench.device.mechanisms() {
        for kind in TOOLS {
            assert_eq!(mech.joint(kind).state(), JointState::Ready, "{kind:?}");
        }
    }
    bench
}

fn state(bench: &Bench, mech: usize, kind: JointKind) -> JointState {
    bench.device.mechanisms()[mech].joint(kind).state()
}

#[test]
fn positioning_joints_trip_settle_and_calibrate() {
    let mut bench = tools_homed();

    let mech = &mut bench.device.mechanisms_mut()[0];
    mech.joint_mut(JointKind::Wrist).jpos = 0.2;
    for (slot, joint) in mech.joints_mut().iter_mut().enumerate() {
        joint.enc_val = 1_000 * slot as i32 - 3_217;
    }

    // positioning sweeps started with the episode
    let events = bench.tick(1);
    assert!(!events.contains(HomingEvents::LIMIT_FOUND));
    for kind in POSITIONING {
        assert_eq!(state(&bench, 0, kind), JointState::PosUnknown);
    }

    bench.load(0, JointKind::Shoulder, 2_500);
    bench.load(0, JointKind::Elbow, -2_500);
    bench.load(0, JointKind::Insertion, 1_900);
    let events = bench.tick(2);
    assert!(events.contains(HomingEvents::LIMIT_FOUND));
    for kind in POSITIONING {
        let joint = bench.device.mechanisms()[0].joint(kind);
        assert_eq!(joint.state(), JointState::HardStop, "{kind:?}");
        assert_eq!(joint.current_cmd, 0, "{kind:?}");
    }
    // the other arm keeps searching
    assert_eq!(state(&bench, 1, JointKind::Shoulder), JointState::PosUnknown);
    assert_eq!(bench.state.settle_start(0), Some(2));

    for tick in 3..=202 {
        assert!(
            !bench.tick(tick).contains(HomingEvents::CALIBRATED),
            "calibrated early on tick {tick}"
        );
    }
    let events = bench.tick(203);
    assert!(events.contains(HomingEvents::CALIBRATED));
    assert_eq!(bench.state.settle_start(0), None);

    let config = bench.orch.config().clone();
    let profile = *bench.orch.profile();
    let cpr = config.counts_per_radian();
    let mech = &bench.device.mechanisms()[0];
    for kind in POSITIONING {
        let joint = mech.joint(kind);
        let max = config.dof_types[DofType::new(0, kind).index() as usize].max_position;
        assert_eq!(joint.state(), JointState::Homing1, "{kind:?}");
        assert!((joint.jpos - max).abs() < 1e-9, "{kind:?}: {}", joint.jpos);

        let sign = profile.encoder_sign(ArmId::Gold, kind);
        let decoded = decode_encoder(joint.enc_val, sign, joint.enc_offset(), cpr);
        assert!((decoded - DEFAULT_RATIOS[kind.slot()] * max).abs() < 1e-9);
    }
    // tools keep their measured pose through the positioning pass
    let wrist = mech.joint(JointKind::Wrist);
    assert_eq!(wrist.state(), JointState::Ready);
    assert_eq!(wrist.jpos_d, 0.2);
    assert!((wrist.jpos - 0.2).abs() < 1e-9);
    assert_eq!(mech.joint(JointKind::Unused).state(), JointState::Homing1);

    // phase 2: move home over the configured duration
    bench.dac.loads = Default::default();
    let mut readied = false;
    for tick in 204..2_710 {
        readied |= bench.tick(tick).contains(HomingEvents::JOINT_READY);
    }
    assert!(readied);
    let mech = &bench.device.mechanisms()[0];
    for kind in POSITIONING {
        let joint = mech.joint(kind);
        let home = config.dof_types[DofType::new(0, kind).index() as usize].home_position;
        assert_eq!(joint.state(), JointState::Ready, "{kind:?}");
        assert_eq!(joint.jpos_d, home);
    }
    // mechanism 1 never found its stops
    assert!(!bench.device.all_ready());
}

#[test]
fn command_below_threshold_keeps_searching() {
    let mut bench = tools_homed();
    bench.tick(1);

    bench.load(1, JointKind::Shoulder, 2_499);
    bench.load(1, JointKind::Elbow, -2_499);
    bench.load(1, JointKind::Insertion, 1_899);
    for tick in 2..50 {
        assert!(!bench.tick(tick).contains(HomingEvents::LIMIT_FOUND));
    }
    for kind in POSITIONING {
        assert_eq!(state(&bench, 1, kind), JointState::PosUnknown);
    }
}

#[test]
fn positioning_waits_for_tools() {
    let mut bench = Bench::without_warmup();
    bench.load(0, JointKind::Shoulder, 5_000);
    bench.load(0, JointKind::Insertion, 5_000);

    for tick in 0..20 {
        assert!(!bench.tick(tick).contains(HomingEvents::LIMIT_FOUND));
    }
    for kind in POSITIONING {
        assert_eq!(state(&bench, 0, kind), JointState::NotReady);
    }
    for kind in TOOLS {
        assert_eq!(state(&bench, 0, kind), JointState::PosUnknown);
    }
}

#[test]
fn tool_group_calibrates_only_when_complete() {
    let mut bench = Bench::without_warmup();
    bench.tick(0);

    // two of the three tool joints reach their stops
    bench.load(0, JointKind::ToolRotation, -1_400);
    bench.load(0, JointKind::Wrist, 1_900);
    for tick in 1..1_000 {
        assert!(!bench.tick(tick).contains(HomingEvents::CALIBRATED));
    }
    assert_eq!(state(&bench, 0, JointKind::ToolRotation), JointState::HardStop);
    assert_eq!(state(&bench, 0, JointKind::Wrist), JointState::HardStop);
    assert_eq!(state(&bench, 0, JointKind::Grasp1), JointState::PosUnknown);
    assert_eq!(bench.state.settle_start(0), None);

    bench.load(0, JointKind::Grasp1, 1_900);
    assert!(bench.tick(1_000).contains(HomingEvents::LIMIT_FOUND));
    let settle = bench.orch.config().settle_ticks;
    for tick in 1_001..=1_000 + settle {
        assert!(!bench.tick(tick).contains(HomingEvents::CALIBRATED));
    }
    assert!(bench.tick(1_001 + settle).contains(HomingEvents::CALIBRATED));

    let config = HomingConfig::default();
    let mech = &bench.device.mechanisms()[0];
    // Grasp2 is outside the barrier but is re-armed with the group
    for kind in TOOLS {
        assert_eq!(mech.joint(kind).state(), JointState::Homing1, "{kind:?}");
    }
    for kind in POSITIONING {
        let joint = mech.joint(kind);
        let home = config.dof_types[DofType::new(0, kind).index() as usize].home_position;
        assert_eq!(joint.state(), JointState::NotReady);
        assert_eq!(joint.jpos_d, home);
    }
    // the other arm was never loaded
    assert_eq!(state(&bench, 1, JointKind::Wrist), JointState::PosUnknown);
}
