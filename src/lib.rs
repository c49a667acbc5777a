//! Leica Disto to keyboard bridge.
//!
//! Reads measurements and navigation keys from a Disto's Bluetooth serial
//! port and replays them as keystrokes in the focused application.

pub mod domain;
pub mod infrastructure;
