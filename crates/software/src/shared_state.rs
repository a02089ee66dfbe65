//! The sequence and transport state shared between the scanner and engine tasks.
//!
//! The two tasks are scheduled independently and may preempt one another, so every field is an atomic of its natural
//! width and no operation spans more than one field. Instead of locking, each field has exactly one writer:
//!
//! | field | written by |
//! |-------|------------|
//! | gates, notes, tempo | scanner |
//! | playing | scanner (toggle on play press) |
//! | reset requested | set by scanner, cleared by engine |
//!
//! Everything the engine alone writes (current step, sounding note, tick position) lives in the
//! [`Engine`](crate::engine::Engine) itself.

use crate::{
    configuration::{DEFAULT_GATES, DEFAULT_NOTE, DEFAULT_TEMPO, STEP_COUNT, StepMask},
    tempo::Tempo,
};
use core::sync::atomic::{AtomicBool, AtomicU8, AtomicU16, Ordering};
use wmidi::{Note, U7};

/// See the [module documentation](self).
pub struct SharedState {
    gates: AtomicU8,
    notes: [AtomicU8; STEP_COUNT],
    tempo: AtomicU16,
    playing: AtomicBool,
    reset_requested: AtomicBool,
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedState {
    /// Power-on state: every step gated at [`DEFAULT_NOTE`], [`DEFAULT_TEMPO`], stopped.
    ///
    /// `const` so that the firmware can place the state in a `static`.
    pub const fn new() -> Self {
        Self {
            gates: AtomicU8::new(DEFAULT_GATES),
            notes: [const { AtomicU8::new(DEFAULT_NOTE as u8) }; STEP_COUNT],
            tempo: AtomicU16::new(DEFAULT_TEMPO.tenths()),
            playing: AtomicBool::new(false),
            reset_requested: AtomicBool::new(false),
        }
    }

    /// Returns the gate bitset; bit `i` set means step `i` sounds.
    pub fn gates(&self) -> StepMask {
        self.gates.load(Ordering::Relaxed)
    }

    /// Returns whether `step` is gated. Steps outside the sequence never are.
    pub fn is_gated(&self, step: usize) -> bool {
        step < STEP_COUNT && self.gates() & (1 << step) != 0
    }

    /// Replaces the gate bitset.
    pub fn set_gates(&self, gates: StepMask) {
        self.gates.store(gates, Ordering::Relaxed);
    }

    /// Flips the gates selected by `mask` and returns the new bitset.
    pub fn toggle_gates(&self, mask: StepMask) -> StepMask {
        self.gates.fetch_xor(mask, Ordering::Relaxed) ^ mask
    }

    /// Returns the note assigned to `step`.
    ///
    /// # Panics
    ///
    /// If `step` is not below [`STEP_COUNT`].
    pub fn note(&self, step: usize) -> Note {
        Note::from(U7::from_u8_lossy(self.notes[step].load(Ordering::Relaxed)))
    }

    /// Assigns a note to `step`; steps outside the sequence are ignored.
    pub fn set_note(&self, step: usize, note: Note) {
        if let Some(slot) = self.notes.get(step) {
            slot.store(u8::from(note), Ordering::Relaxed);
        }
    }

    /// Returns the current tempo.
    pub fn tempo(&self) -> Tempo {
        Tempo::from_tenths(self.tempo.load(Ordering::Relaxed))
    }

    /// Replaces the tempo.
    pub fn set_tempo(&self, tempo: Tempo) {
        self.tempo.store(tempo.tenths(), Ordering::Relaxed);
    }

    /// Returns the transport state.
    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    /// Starts or stops the transport and returns the new state.
    pub fn toggle_playing(&self) -> bool {
        !self.playing.fetch_xor(true, Ordering::AcqRel)
    }

    /// Asks the engine to silence any sounding note and rewind before its next tick.
    pub fn request_reset(&self) {
        self.reset_requested.store(true, Ordering::Release);
    }

    /// Returns whether a reset is waiting to be consumed.
    pub fn reset_pending(&self) -> bool {
        self.reset_requested.load(Ordering::Acquire)
    }

    /// Consumes a pending reset request, returning whether there was one.
    pub fn take_reset_request(&self) -> bool {
        self.reset_requested.swap(false, Ordering::AcqRel)
    }
}
