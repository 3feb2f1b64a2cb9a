//! Run-level gate, amplifier warm-up and episode restarts.

use std::io::Write;

use raven_common::config::load_homing_config;
use raven_common::hardware::HardwareVariant;
use raven_common::homing::HomingConfig;
use raven_common::joint::{CompletionGroup, JointKind, JointState};
use raven_common::run_level::RunLevel;
use raven_control::homing::{HomingEvents, HomingStatus, TickInput};
use tempfile::NamedTempFile;

use super::Bench;

fn pedal_up(tick: u64) -> TickInput {
    TickInput {
        run_level: RunLevel::PedalUp,
        ..TickInput::auto_init(tick)
    }
}

#[test]
fn closed_gate_is_idempotent() {
    let mut bench = Bench::without_warmup();
    bench.load(0, JointKind::Wrist, 5_000);

    for tick in 0..50 {
        assert_eq!(bench.step(pedal_up(tick)).unwrap(), HomingStatus::Gated);
    }
    assert!(!bench.state.homing_inited());
    assert_eq!(bench.state.warmup_start(), 49);
    for joint in bench.device.joints() {
        assert_eq!(joint.state(), JointState::NotReady);
        assert_eq!(joint.current_cmd, 0);
    }
}

#[test]
fn gate_closing_mid_episode_freezes_joints() {
    let mut bench = Bench::new(HomingConfig {
        warmup_ticks: 0,
        settle_ticks: 5,
        fixed_tools: true,
        ..HomingConfig::default()
    });
    bench.tick(0);
    bench.load(0, JointKind::Shoulder, 2_500);
    bench.load(0, JointKind::Elbow, -2_500);
    bench.load(0, JointKind::Insertion, 1_900);
    for tick in 1..=8 {
        bench.tick(tick);
    }
    bench.load(1, JointKind::Shoulder, 2_500);
    assert!(bench.tick(9).contains(HomingEvents::LIMIT_FOUND));

    let gold = &bench.device.mechanisms()[0];
    let green = &bench.device.mechanisms()[1];
    for kind in CompletionGroup::Positioning.members() {
        assert_eq!(gold.joint(kind).state(), JointState::Homing2, "{kind:?}");
    }
    assert_eq!(gold.joint(JointKind::Wrist).state(), JointState::Ready);
    assert_eq!(green.joint(JointKind::Shoulder).state(), JointState::HardStop);
    assert_eq!(green.joint(JointKind::Elbow).state(), JointState::PosUnknown);

    let snapshot = |bench: &Bench| -> Vec<_> {
        bench
            .device
            .joints()
            .map(|j| {
                (
                    j.state(),
                    j.jpos_d,
                    j.mpos_d,
                    j.tau_d,
                    j.current_cmd,
                    j.enc_offset(),
                )
            })
            .collect()
    };
    let before = snapshot(&bench);

    for tick in 10..510 {
        assert_eq!(bench.step(pedal_up(tick)).unwrap(), HomingStatus::Gated);
    }
    assert_eq!(snapshot(&bench), before);
    assert!(!bench.state.homing_inited());
    assert_eq!(bench.state.settle_start(0), None);
    assert_eq!(bench.state.warmup_start(), 509);
}

#[test]
fn warm_up_counts_from_last_closed_tick() {
    let mut bench = Bench::new(HomingConfig::default());
    assert_eq!(bench.step(pedal_up(500)).unwrap(), HomingStatus::Gated);

    for tick in 501..1_500 {
        assert_eq!(
            bench.step(TickInput::auto_init(tick)).unwrap(),
            HomingStatus::WarmingUp,
            "tick {tick}"
        );
    }
    assert!(bench.device.joints().all(|j| j.state() == JointState::NotReady));

    let events = bench.tick(1_500);
    assert!(events.contains(HomingEvents::REINITIALIZED));
    assert_eq!(
        bench.device.mechanisms()[0].joint(JointKind::Wrist).state(),
        JointState::PosUnknown
    );
}

#[test]
fn reopened_gate_restarts_episode() {
    let mut bench = Bench::without_warmup();
    assert!(bench.tick(0).contains(HomingEvents::REINITIALIZED));
    assert!(!bench.tick(1).contains(HomingEvents::REINITIALIZED));

    bench.load(0, JointKind::Wrist, 1_900);
    assert!(bench.tick(2).contains(HomingEvents::LIMIT_FOUND));
    let wrist = bench.device.mechanisms()[0].joint(JointKind::Wrist);
    assert_eq!(wrist.state(), JointState::HardStop);

    assert_eq!(bench.step(pedal_up(3)).unwrap(), HomingStatus::Gated);
    assert!(!bench.state.homing_inited());

    // a fresh episode: the wrist searches again and trips again
    let events = bench.tick(4);
    assert!(events.contains(HomingEvents::REINITIALIZED));
    assert!(events.contains(HomingEvents::LIMIT_FOUND));
}

#[test]
fn begin_homing_restarts_running_episode() {
    let mut bench = Bench::without_warmup();
    bench.tick(0);
    bench.load(1, JointKind::ToolRotation, -2_000);
    assert!(bench.tick(1).contains(HomingEvents::LIMIT_FOUND));
    assert_eq!(
        bench.device.mechanisms()[1]
            .joint(JointKind::ToolRotation)
            .state(),
        JointState::HardStop
    );

    bench.load(1, JointKind::ToolRotation, 0);
    let input = TickInput {
        begin_homing: true,
        ..TickInput::auto_init(2)
    };
    let HomingStatus::Running(events) = bench.step(input).unwrap() else {
        panic!("expected running");
    };
    assert!(events.contains(HomingEvents::REINITIALIZED));
    assert_eq!(
        bench.device.mechanisms()[1]
            .joint(JointKind::ToolRotation)
            .state(),
        JointState::PosUnknown
    );
}

#[test]
fn config_file_selects_square_thresholds() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "hardware = \"square\"").unwrap();
    writeln!(file, "warmup_ticks = 0").unwrap();
    writeln!(file, "settle_ticks = 20").unwrap();
    let config = load_homing_config(file.path()).unwrap();
    assert_eq!(config.hardware, HardwareVariant::Square);

    let mut bench = Bench::new(config);
    bench.tick(0);

    // trips standard hardware, not square
    bench.load(0, JointKind::Wrist, 2_000);
    assert!(!bench.tick(1).contains(HomingEvents::LIMIT_FOUND));
    bench.load(0, JointKind::Wrist, 2_200);
    assert!(bench.tick(2).contains(HomingEvents::LIMIT_FOUND));
}
