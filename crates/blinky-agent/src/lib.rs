//! Blinky device agent — library crate for the LED/telemetry demo agent.
//!
//! Re-exports all modules so external crates (e.g. `blinky-e2e-tests`) can
//! drive the agent's handlers against mock GPIO and a mock channel.

pub mod bootstrap;
pub mod commands;
pub mod composer;
pub mod config;
pub mod context;
pub mod gpio;
pub mod indicator;
pub mod mqtt_loop;
pub mod sender;
