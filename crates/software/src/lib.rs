//! This crate contains architecture-agnostic logic for Eightfold, an eight-step hardware sequencer which reads a
//! panel of switches and a potentiometer and drives an external synthesizer voice (e.g., a
//! [KORG NTS-1](https://www.korg.com/us/products/dj/nts_1/)) with timed [MIDI](https://midi.org/midi-1-0) note events.
//!
//! The device is built around two periodic tasks which share one [`SharedState`](shared_state::SharedState):
//! - the [`Scanner`](scanner::Scanner) debounces the panel and turns settled changes into edits of the sequence
//!   (gates, notes, tempo) and transport requests (play/stop);
//! - the [`Engine`](engine::Engine) advances a tick counter derived from the tempo and emits note and LED
//!   [`Command`](command::Command)s at step and half-step boundaries.
//!
//! Nothing in this crate knows about pins, timers or USB; the firmware crate injects those.

#![deny(missing_docs)]
#![no_std]

#[macro_use]
mod fmt;

/// Outputs produced by the scanner and engine, and their encoding for the MIDI transport.
pub mod command;
pub mod configuration;
/// Generic debounce filter shared by the switch lines and the potentiometer.
pub mod debounce;
pub mod engine;
pub mod scanner;
pub mod shared_state;
pub mod tempo;

#[cfg(test)]
mod testing;
