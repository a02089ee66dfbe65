//! The tick-driven sequencer.
//!
//! The [`Engine`] is invoked by the firmware at a rate well above the tick rate (on the order of 10 kHz). Each
//! invocation consumes at most one tick, whose length is derived from the [`Tempo`](crate::tempo::Tempo). Every
//! [`TICKS_PER_STEP`] ticks the sequence advances one step and a gated step's note starts; [`HALF_STEP`] ticks later
//! the note is released, so every note lasts half a step regardless of tempo.
//!
//! The playhead is shown by darkening the current step's LED against the lit gate pattern until the half step.
//!
//! Ticks are measured from a reference instant which advances by exactly one tick length each time a tick is
//! consumed, rather than being snapped to the time of the invocation. Late invocations therefore carry their
//! surplus over to the next tick and the sequence does not drift.

use crate::{
    command::{Command, Sink},
    configuration::{HALF_STEP, NOTE_VELOCITY, STEP_COUNT, TICKS_PER_STEP},
    shared_state::SharedState,
};
use embassy_time::Instant;
use wmidi::Note;

/// The engine's state as observed from outside.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// The transport is stopped.
    Idle,
    /// A reset is pending, or the engine has been reset and is waiting for its first step.
    Resetting,
    /// First half of a step; a gated step's note is sounding.
    Attack,
    /// Second half of a step; nothing is sounding.
    Release,
}

/// Where the engine is within the sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Position {
    /// Current step, below [`STEP_COUNT`].
    pub step: usize,
    /// Ticks elapsed since the step began, below [`TICKS_PER_STEP`].
    pub tick: u16,
}

/// See the [module documentation](self).
///
/// The engine owns everything only it writes: the current step, the sounding note and the tick bookkeeping. The
/// sequence itself and the transport are read from the [`SharedState`] on every invocation.
#[derive(Debug, Default)]
pub struct Engine {
    step: Option<usize>,
    /// Set only while a note-on has been sent without its note-off.
    active_note: Option<Note>,
    /// `None` after a reset; the next tick counts as tick 0 of a lead-in before the first step.
    ticks_in_step: Option<u16>,
    /// The instant the last tick was due; `None` until the first reset.
    last_tick: Option<Instant>,
}

impl Engine {
    /// Constructs an [`Engine`] which has not yet played anything.
    pub const fn new() -> Self {
        Self {
            step: None,
            active_note: None,
            ticks_in_step: None,
            last_tick: None,
        }
    }

    /// Returns the current step and tick, or `None` if no step has started since the last reset.
    pub fn position(&self) -> Option<Position> {
        Some(Position {
            step: self.step?,
            tick: self.ticks_in_step?,
        })
    }

    /// Returns the note currently sounding, if any.
    pub fn active_note(&self) -> Option<Note> {
        self.active_note
    }

    /// Reports the engine's [`Phase`] given the shared transport state.
    pub fn phase(&self, state: &SharedState) -> Phase {
        if state.reset_pending() {
            return Phase::Resetting;
        }
        if !state.is_playing() {
            return Phase::Idle;
        }
        match self.position() {
            None => Phase::Resetting,
            Some(Position { tick, .. }) if tick < HALF_STEP => Phase::Attack,
            Some(_) => Phase::Release,
        }
    }

    /// Runs one invocation of the engine at `now`. Returns `true` if a tick was consumed.
    ///
    /// A pending reset is always handled first, whether or not the transport is running. After that, nothing
    /// happens while stopped or while less than one tick has elapsed since the last one was due.
    pub fn tick(&mut self, now: Instant, state: &SharedState, sink: &mut impl Sink) -> bool {
        if state.take_reset_request() {
            self.reset(now, state, sink);
        }

        if !state.is_playing() {
            return false;
        }

        let Some(last_tick) = self.last_tick else {
            // playing without ever having been reset; start counting from here
            self.last_tick = Some(now);
            return false;
        };

        let tick_duration = state.tempo().tick_duration();
        match now.checked_duration_since(last_tick) {
            Some(elapsed) if elapsed >= tick_duration => {}
            _ => return false,
        }
        self.last_tick = Some(last_tick + tick_duration);

        let ticks = self.ticks_in_step.map_or(0, |ticks| ticks + 1);
        if ticks >= TICKS_PER_STEP {
            self.advance(state, sink);
        } else {
            self.ticks_in_step = Some(ticks);
            if ticks == HALF_STEP {
                self.release(state, sink);
            }
        }
        true
    }

    /// Silences any sounding note and rewinds to before the first step.
    fn reset(&mut self, now: Instant, state: &SharedState, sink: &mut impl Sink) {
        self.release(state, sink);
        self.step = None;
        self.ticks_in_step = None;
        self.last_tick = Some(now);
        debug!("Sequencer reset");
    }

    /// Moves to the next step and starts its note if it's gated. Either way the step's LED goes dark.
    fn advance(&mut self, state: &SharedState, sink: &mut impl Sink) {
        let step = self.step.map_or(0, |step| (step + 1) % STEP_COUNT);
        self.step = Some(step);
        self.ticks_in_step = Some(0);

        if state.is_gated(step) {
            let note = state.note(step);
            sink.send(Command::NoteOn {
                note,
                velocity: NOTE_VELOCITY,
            });
            self.active_note = Some(note);
            debug!("Step {}: note on {}", step, u8::from(note));
        } else {
            debug!("Step {}: rest", step);
        }
        sink.send(Command::StepLed { step, lit: false });
    }

    /// Ends the sounding note, if any, and returns its step LED to the gate pattern.
    fn release(&mut self, state: &SharedState, sink: &mut impl Sink) {
        let Some(note) = self.active_note.take() else {
            return;
        };
        sink.send(Command::NoteOff { note });
        if let Some(step) = self.step {
            sink.send(Command::StepLed {
                step,
                lit: state.is_gated(step),
            });
        }
    }
}
