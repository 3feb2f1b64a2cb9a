//! Raven Common Library
//!
//! Shared constants, joint identity types, hardware profiles and homing
//! configuration for the Raven arm controller workspace.
//!
//! # Module Structure
//!
//! - [`consts`] - Mechanism layout, tick timing and homing defaults
//! - [`joint`] - Arm, joint slot, completion group and homing state enums
//! - [`run_level`] - Controller run levels
//! - [`hardware`] - Per-family trip thresholds and encoder sign tables
//! - [`homing`] - Homing configuration and per-type constant tables
//! - [`config`] - TOML loading and configuration errors
//! - [`prelude`] - Common re-exports

pub mod config;
pub mod consts;
pub mod hardware;
pub mod homing;
pub mod joint;
pub mod prelude;
pub mod run_level;
