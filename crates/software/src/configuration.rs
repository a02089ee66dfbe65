//! This module contains the fixed dimensions and defaults of the sequencer, along with the table which maps panel
//! controls to the raw input lines the firmware samples.

mod input_layout;
pub use input_layout::*;

use crate::{command::Parameter, tempo::Tempo};
use wmidi::{Note, U7, Velocity};

/// Number of steps in the sequence; one step switch and one LED per step.
pub const STEP_COUNT: usize = 8;

/// Number of digital input lines: one per step, plus play and shift.
pub const LINE_COUNT: usize = STEP_COUNT + 2;

/// Sub-step resolution of the engine. Together with the factor of 4 steps per quarter note this gives
/// 400 ticks per beat.
pub const TICKS_PER_STEP: u16 = 100;

/// The tick at which a sounding note is released, giving every gated step a 50% duty cycle.
pub const HALF_STEP: u16 = TICKS_PER_STEP / 2;

/// A switch's accepted level flips once more than this many consecutive samples disagree with it.
///
/// At a scan rate of 200 Hz or more this settles within roughly 30 ms.
pub const SWITCH_DEBOUNCE_THRESHOLD: u8 = 6;

/// The potentiometer's accepted value changes once more than this many consecutive readings disagree with it.
pub const POT_DEBOUNCE_THRESHOLD: u8 = 4;

/// Minimum distance (in raw 10-bit counts) the potentiometer must travel from the last applied value before a new
/// tempo or parameter value is applied. Keeps analog noise from jittering the tempo.
pub const POT_HYSTERESIS: u16 = 8;

/// Largest raw potentiometer reading (10-bit ADC).
pub const POT_MAX: u16 = 0x3FF;

/// All steps gated.
pub const DEFAULT_GATES: u8 = 0xFF;

/// Note assigned to every step at power-on.
pub const DEFAULT_NOTE: Note = Note::C4;

/// 120.0 BPM.
pub const DEFAULT_TEMPO: Tempo = Tempo::from_tenths(1200);

/// Every note-on is sent at full velocity.
pub const NOTE_VELOCITY: Velocity = U7::from_u8_lossy(127);

/// The synth parameter the potentiometer controls when neither a step nor shift is held.
pub const TIMBRE_PARAMETER: Parameter = Parameter::FilterCutoff;

// the gate bitset is a u8
const _: () = assert!(STEP_COUNT <= 8);
// raw line levels are packed into a u16
const _: () = assert!(LINE_COUNT <= 16);
