use wmidi::{Channel, ControlFunction, MidiMessage, Note, U7, Velocity};

/// An instruction for the outside world, emitted by the [`Scanner`](crate::scanner::Scanner) and the
/// [`Engine`](crate::engine::Engine).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    /// Start sounding a note on the attached synth.
    NoteOn {
        /// The note to sound.
        note: Note,
        /// Always [`NOTE_VELOCITY`](crate::configuration::NOTE_VELOCITY) for sequenced notes.
        velocity: Velocity,
    },
    /// Release a note previously started with [`Command::NoteOn`].
    NoteOff {
        /// The note to release.
        note: Note,
    },
    /// Set a synth parameter from the potentiometer.
    ParameterChange {
        /// Which parameter to change.
        parameter: Parameter,
        /// Secondary identifier for parameters which have one; `None` for everything the panel controls.
        sub_parameter: Option<u8>,
        /// Raw 10-bit potentiometer value.
        value: u16,
    },
    /// Drive one step LED.
    StepLed {
        /// Step index, always below [`STEP_COUNT`](crate::configuration::STEP_COUNT).
        step: usize,
        /// `true` lights the LED.
        lit: bool,
    },
}

#[cfg(feature = "defmt")]
impl defmt::Format for Command {
    fn format(&self, fmt: defmt::Formatter) {
        match *self {
            Command::NoteOn { note, velocity } => defmt::write!(
                fmt,
                "NoteOn {{ note: {} ({}), velocity: {} }}",
                note.to_str(),
                u8::from(note),
                u8::from(velocity)
            ),
            Command::NoteOff { note } => {
                defmt::write!(fmt, "NoteOff {{ note: {} ({}) }}", note.to_str(), u8::from(note))
            }
            Command::ParameterChange {
                parameter,
                sub_parameter,
                value,
            } => defmt::write!(
                fmt,
                "ParameterChange {{ parameter: {}, sub_parameter: {}, value: {} }}",
                parameter,
                sub_parameter,
                value
            ),
            Command::StepLed { step, lit } => {
                defmt::write!(fmt, "StepLed {{ step: {}, lit: {} }}", step, lit)
            }
        }
    }
}

/// Synth parameters reachable from the panel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parameter {
    /// Filter cutoff, the panel's general-purpose "timbre" control.
    FilterCutoff,
}

impl Parameter {
    /// The MIDI Control Change number the NTS-1 listens to for this parameter.
    pub fn control_function(self) -> ControlFunction {
        match self {
            Parameter::FilterCutoff => ControlFunction(U7::from_u8_lossy(43)),
        }
    }
}

/// Receives [`Command`]s.
///
/// Implementations must not block: both the scanner and the engine call `send` from inside their periodic
/// invocation.
pub trait Sink {
    /// Accept a single command.
    fn send(&mut self, command: Command);
}

impl Command {
    /// Expresses the command as a MIDI message on `channel`. LED commands have no MIDI equivalent.
    ///
    /// Parameter values are reduced from the potentiometer's 10 bits to MIDI's 7.
    pub fn to_midi(&self, channel: Channel) -> Option<MidiMessage<'static>> {
        match *self {
            Command::NoteOn { note, velocity } => Some(MidiMessage::NoteOn(channel, note, velocity)),
            Command::NoteOff { note } => Some(MidiMessage::NoteOff(channel, note, U7::MIN)),
            Command::ParameterChange {
                parameter, value, ..
            } => Some(MidiMessage::ControlChange(
                channel,
                parameter.control_function(),
                U7::from_u8_lossy((value >> 3) as u8),
            )),
            Command::StepLed { .. } => None,
        }
    }
}

/// Frames a MIDI message as a 32-bit USB-MIDI Event Packet on cable 0.
///
/// The first byte carries the cable number and the Code Index Number, which for channel voice messages equals the
/// high nibble of the status byte. Returns `None` for system messages, which the sequencer never sends.
pub fn usb_midi_packet(msg: &MidiMessage) -> Option<[u8; 4]> {
    let mut packet = [0_u8; 4];
    msg.copy_to_slice(&mut packet[1..]).ok()?;

    let status = packet[1];
    if !(0x80..0xF0).contains(&status) {
        return None;
    }
    packet[0] = status >> 4;
    Some(packet)
}
