//! Joint homing.
//!
//! Discovers each joint's absolute position by driving it into its
//! mechanical hard stop, calibrates the encoder offsets there, then moves
//! the arm to its ready pose. Tool joints are homed first; positioning
//! joints follow once the tools are ready.
//!
//! - [`limit`] - hard-stop detection
//! - [`fsm`] - per-joint state machine
//! - [`calibration`] - one-shot mechanism calibration
//! - [`orchestrator`] - per-tick driver

pub mod calibration;
pub mod fsm;
pub mod limit;
pub mod orchestrator;

pub use orchestrator::{HomingEvents, HomingOrchestrator, HomingStatus, OrchestratorState, TickInput};
