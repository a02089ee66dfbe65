//! Test helpers shared across modules.

extern crate std;

use crate::{
    command::{Command, Sink},
    configuration::STEP_COUNT,
};
use std::vec::Vec;
use wmidi::Note;

/// A [`Sink`] which remembers everything sent to it.
#[derive(Debug, Default)]
pub struct Recorder {
    commands: Vec<Command>,
    leds: [bool; STEP_COUNT],
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Drops recorded commands; LED levels are kept.
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// The level each step LED was last driven to.
    pub fn step_leds(&self) -> [bool; STEP_COUNT] {
        self.leds
    }

    /// Only the note-on and note-off commands, in order.
    pub fn notes(&self) -> Vec<Command> {
        self.commands
            .iter()
            .copied()
            .filter(|c| matches!(c, Command::NoteOn { .. } | Command::NoteOff { .. }))
            .collect()
    }

    pub fn note_ons(&self) -> Vec<Note> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Command::NoteOn { note, .. } => Some(*note),
                _ => None,
            })
            .collect()
    }

    pub fn note_offs(&self) -> Vec<Note> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Command::NoteOff { note } => Some(*note),
                _ => None,
            })
            .collect()
    }
}

impl Sink for Recorder {
    fn send(&mut self, command: Command) {
        if let Command::StepLed { step, lit } = command {
            self.leds[step] = lit;
        }
        self.commands.push(command);
    }
}
