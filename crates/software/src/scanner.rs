//! Turns raw panel samples into edits of the [`SharedState`].
//!
//! The [`Scanner`] is driven at a fixed rate (200 Hz or faster) by the firmware. Each call to
//! [`Scanner::scan_switches()`] debounces every switch line, compares the settled levels against those of the previous
//! call, and decodes the resulting edges; [`Scanner::scan_pot()`] does the same for the potentiometer and routes its
//! value to whichever parameter the held switches select.

use crate::{
    command::{Command, Sink},
    configuration::{
        InputLayout, LINE_COUNT, LineLevels, POT_HYSTERESIS, POT_MAX, STEP_COUNT, StepMask,
        TIMBRE_PARAMETER,
    },
    debounce::{PotDebounce, SwitchDebounce},
    shared_state::SharedState,
    tempo::Tempo,
};
use bitmask_enum::bitmask;
use wmidi::{Note, U7};

/// Operations that may be performed during a scan.
#[bitmask(u8)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Operation {
    /// The play switch was pressed: the transport was toggled and a reset requested.
    PlayToggle,
    /// The shift switch was pressed or released.
    ShiftChange,
    /// The set of held step switches changed.
    HeldChange,
    /// One or more gates were toggled.
    GateChange,
    /// One or more step notes were rewritten from the potentiometer.
    NoteChange,
    /// The tempo was set from the potentiometer.
    TempoChange,
    /// A synth parameter change was sent from the potentiometer.
    ParameterChange,
}

/// Panel state that only matters to the scanner itself: what the performer is currently holding down.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UiState {
    /// Step switches currently held.
    pub held: StepMask,
    /// Whether the shift switch is currently held.
    pub shift_held: bool,
}

/// Debounces the panel and applies what it reads to the [`SharedState`].
pub struct Scanner {
    layout: InputLayout,
    play_mask: LineLevels,
    shift_mask: LineLevels,
    switches: [SwitchDebounce; LINE_COUNT],
    settled: LineLevels,
    /// Seeded with the first reading so that power-on doesn't look like a sweep from zero.
    pot: Option<PotDebounce>,
    ui: UiState,
    applied_tempo: Option<u16>,
    applied_parameter: Option<u16>,
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new(InputLayout::default())
    }
}

impl Scanner {
    /// Constructs a [`Scanner`] which reads the panel according to `layout`. Every switch starts out released.
    pub fn new(layout: InputLayout) -> Self {
        Self {
            layout,
            play_mask: layout.play_mask(),
            shift_mask: layout.shift_mask(),
            switches: [SwitchDebounce::new(true); LINE_COUNT],
            settled: LineLevels::MAX,
            pot: None,
            ui: UiState::default(),
            applied_tempo: None,
            applied_parameter: None,
        }
    }

    /// Returns what the performer is currently holding.
    pub fn ui(&self) -> UiState {
        self.ui
    }

    /// Samples every switch line once and applies any settled changes. Returns the [`Operation`]s performed.
    ///
    /// Edges are decoded in a fixed order (play, then shift, then steps) so that a shift press and a step press
    /// which settle in the same call still toggle the step's gate.
    pub fn scan_switches(
        &mut self,
        raw: LineLevels,
        state: &SharedState,
        sink: &mut impl Sink,
    ) -> Operation {
        let mut levels = self.settled;
        for (line, switch) in self.switches.iter_mut().enumerate() {
            let mask: LineLevels = 1 << line;
            if switch.update(raw & mask != 0) {
                levels |= mask;
            } else {
                levels &= !mask;
            }
        }

        let edges = levels ^ self.settled;
        self.settled = levels;
        if edges == 0 {
            return Operation::none();
        }

        // switches are active-low
        let pressed = !levels;
        let mut operation = Operation::none();

        if edges & self.play_mask != 0 && pressed & self.play_mask != 0 {
            state.request_reset();
            let playing = state.toggle_playing();
            info!("Transport {}", if playing { "started" } else { "stopped" });
            operation |= Operation::PlayToggle;
        }

        if edges & self.shift_mask != 0 {
            self.ui.shift_held = pressed & self.shift_mask != 0;
            operation |= Operation::ShiftChange;
        }

        let step_edges = self.layout.steps_of(edges);
        if step_edges != 0 {
            let newly_pressed = self.layout.steps_of(pressed) & step_edges;
            let newly_released = step_edges & !newly_pressed;
            self.ui.held = (self.ui.held | newly_pressed) & !newly_released;
            operation |= Operation::HeldChange;

            if self.ui.shift_held && newly_pressed != 0 {
                let gates = state.toggle_gates(newly_pressed);
                debug!("Gates toggled to {=u8:b}", gates);
                self.refresh_step_leds(state, sink);
                operation |= Operation::GateChange;
            }
        }

        operation
    }

    /// Samples the potentiometer once and routes its debounced value. Returns the [`Operation`] performed, if any.
    ///
    /// In priority order the value:
    /// 1. sets the note of every held step (scaled to 0-127);
    /// 2. sets the tempo while shift is held;
    /// 3. otherwise changes the [`TIMBRE_PARAMETER`].
    ///
    /// Tempo and parameter changes are only applied once the value has moved more than [`POT_HYSTERESIS`] from the
    /// last value applied to that destination.
    pub fn scan_pot(&mut self, raw: u16, state: &SharedState, sink: &mut impl Sink) -> Operation {
        let raw = raw.min(POT_MAX);
        let value = match self.pot.as_mut() {
            Some(pot) => pot.update(raw),
            None => {
                self.pot = Some(PotDebounce::new(raw));
                raw
            }
        };

        if self.ui.held != 0 {
            let note = Note::from(U7::from_u8_lossy((value >> 3) as u8));
            let mut operation = Operation::none();
            for step in steps_in(self.ui.held) {
                if state.note(step) != note {
                    state.set_note(step, note);
                    operation = Operation::NoteChange;
                }
            }
            return operation;
        }

        if self.ui.shift_held {
            if !moved_beyond_hysteresis(self.applied_tempo, value) {
                return Operation::none();
            }
            self.applied_tempo = Some(value);
            let tempo = Tempo::from_pot(value);
            state.set_tempo(tempo);
            debug!("Tempo set to {} tenths of a BPM", tempo.tenths());
            return Operation::TempoChange;
        }

        if !moved_beyond_hysteresis(self.applied_parameter, value) {
            return Operation::none();
        }
        self.applied_parameter = Some(value);
        sink.send(Command::ParameterChange {
            parameter: TIMBRE_PARAMETER,
            sub_parameter: None,
            value,
        });
        Operation::ParameterChange
    }

    /// Drives every step LED to reflect the current gate pattern.
    pub fn refresh_step_leds(&self, state: &SharedState, sink: &mut impl Sink) {
        for step in 0..STEP_COUNT {
            sink.send(Command::StepLed {
                step,
                lit: state.is_gated(step),
            });
        }
    }
}

fn steps_in(mask: StepMask) -> impl Iterator<Item = usize> {
    (0..STEP_COUNT).filter(move |&step| mask & (1 << step) != 0)
}

fn moved_beyond_hysteresis(last_applied: Option<u16>, value: u16) -> bool {
    last_applied.is_none_or(|last| last.abs_diff(value) > POT_HYSTERESIS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Recorder;

    const ALL_RELEASED: LineLevels = 0b11_1111_1111;
    const PLAY: LineLevels = 1 << 8;
    const SHIFT: LineLevels = 1 << 9;

    fn step(i: u8) -> LineLevels {
        1 << i
    }

    /// Holds `pressed` down long enough to settle, returning everything that happened along the way.
    fn hold(
        scanner: &mut Scanner,
        pressed: LineLevels,
        state: &SharedState,
        sink: &mut Recorder,
    ) -> Operation {
        let mut operation = Operation::none();
        for _ in 0..=SWITCH_SETTLE {
            operation |= scanner.scan_switches(ALL_RELEASED & !pressed, state, sink);
        }
        operation
    }

    const SWITCH_SETTLE: usize = crate::configuration::SWITCH_DEBOUNCE_THRESHOLD as usize;

    #[test]
    fn play_press_toggles_transport_and_requests_reset() {
        let (mut scanner, state, mut sink) = (Scanner::default(), SharedState::new(), Recorder::new());

        let operation = hold(&mut scanner, PLAY, &state, &mut sink);
        assert_eq!(Operation::PlayToggle, operation, "Expected left but got right");
        assert!(state.is_playing(), "Should be playing");
        assert!(state.reset_pending(), "Should request a reset");

        let operation = hold(&mut scanner, 0, &state, &mut sink);
        assert!(operation.is_none(), "Release should do nothing");
        assert!(state.is_playing(), "Should still be playing");

        hold(&mut scanner, PLAY, &state, &mut sink);
        assert!(!state.is_playing(), "Second press should stop");
        assert!(sink.is_empty(), "Transport changes emit no commands");
    }

    #[test]
    fn bouncing_play_is_ignored() {
        let (mut scanner, state, mut sink) = (Scanner::default(), SharedState::new(), Recorder::new());
        for _ in 0..20 {
            for _ in 0..3 {
                scanner.scan_switches(ALL_RELEASED & !PLAY, &state, &mut sink);
            }
            scanner.scan_switches(ALL_RELEASED, &state, &mut sink);
        }
        assert!(!state.is_playing(), "Bounce should not toggle the transport");
        assert!(!state.reset_pending(), "Bounce should not request a reset");
    }

    #[test]
    fn step_press_without_shift_only_tracks_held() {
        let (mut scanner, state, mut sink) = (Scanner::default(), SharedState::new(), Recorder::new());

        let operation = hold(&mut scanner, step(2) | step(5), &state, &mut sink);
        assert_eq!(Operation::HeldChange, operation, "Expected left but got right");
        assert_eq!(0b0010_0100, scanner.ui().held, "Expected left but got right");
        assert_eq!(0xFF, state.gates(), "Gates should be untouched");

        hold(&mut scanner, step(5), &state, &mut sink);
        assert_eq!(0b0010_0000, scanner.ui().held, "Expected left but got right");
        assert!(sink.is_empty(), "Holding steps emits no commands");
    }

    #[test]
    fn shift_step_toggles_gate_and_refreshes_leds() {
        let (mut scanner, state, mut sink) = (Scanner::default(), SharedState::new(), Recorder::new());

        hold(&mut scanner, SHIFT, &state, &mut sink);
        assert!(scanner.ui().shift_held, "Shift should be held");

        let operation = hold(&mut scanner, SHIFT | step(3), &state, &mut sink);
        assert_eq!(
            Operation::HeldChange | Operation::GateChange,
            operation,
            "Expected left but got right"
        );
        assert_eq!(0b1111_0111, state.gates(), "Expected left but got right");

        let leds = sink.step_leds();
        assert_eq!(
            [true, true, true, false, true, true, true, true],
            leds,
            "Expected left but got right"
        );
        assert_eq!(STEP_COUNT, sink.len(), "Expected one LED command per step");
    }

    #[test]
    fn shift_step_twice_restores_gates() {
        let (mut scanner, state, mut sink) = (Scanner::default(), SharedState::new(), Recorder::new());
        state.set_gates(0b1010_0110);

        hold(&mut scanner, SHIFT, &state, &mut sink);
        for _ in 0..2 {
            hold(&mut scanner, SHIFT | step(1) | step(4), &state, &mut sink);
            hold(&mut scanner, SHIFT, &state, &mut sink);
        }
        assert_eq!(0b1010_0110, state.gates(), "Expected left but got right");
    }

    #[test]
    fn release_does_not_toggle_gate() {
        let (mut scanner, state, mut sink) = (Scanner::default(), SharedState::new(), Recorder::new());
        hold(&mut scanner, SHIFT | step(0), &state, &mut sink);
        let gates = state.gates();
        let operation = hold(&mut scanner, SHIFT, &state, &mut sink);
        assert_eq!(Operation::HeldChange, operation, "Expected left but got right");
        assert_eq!(gates, state.gates(), "Expected left but got right");
    }

    #[test]
    fn simultaneous_edges_are_all_processed() {
        let (mut scanner, state, mut sink) = (Scanner::default(), SharedState::new(), Recorder::new());
        let operation = hold(&mut scanner, PLAY | SHIFT | step(6), &state, &mut sink);
        assert_eq!(
            Operation::PlayToggle
                | Operation::ShiftChange
                | Operation::HeldChange
                | Operation::GateChange,
            operation,
            "Expected left but got right"
        );
        assert!(state.is_playing(), "Should be playing");
        assert_eq!(0b1011_1111, state.gates(), "Expected left but got right");
    }

    #[test]
    fn custom_layout_is_respected() {
        let layout = InputLayout {
            steps: [9, 8, 7, 6, 5, 4, 3, 2],
            play: 0,
            shift: 1,
        };
        let (mut scanner, state, mut sink) = (Scanner::new(layout), SharedState::new(), Recorder::new());
        hold(&mut scanner, 1 << 0, &state, &mut sink);
        assert!(state.is_playing(), "Line 0 should be play");
        hold(&mut scanner, 1 << 9, &state, &mut sink);
        assert_eq!(0b0000_0001, scanner.ui().held, "Line 9 should be step 0");
    }

    mod pot {
        use super::*;

        #[test]
        fn held_steps_take_the_note() {
            let (mut scanner, state, mut sink) =
                (Scanner::default(), SharedState::new(), Recorder::new());
            hold(&mut scanner, step(1) | step(6), &state, &mut sink);

            let operation = scanner.scan_pot(0x42 << 3, &state, &mut sink);
            assert_eq!(Operation::NoteChange, operation, "Expected left but got right");
            let expected = Note::from(U7::from_u8_lossy(0x42));
            assert_eq!(expected, state.note(1), "Expected left but got right");
            assert_eq!(expected, state.note(6), "Expected left but got right");
            assert_eq!(Note::C4, state.note(0), "Unheld step should keep its note");
            assert!(sink.is_empty(), "Note edits emit no commands");
        }

        #[test]
        fn held_step_wins_over_shift() {
            let (mut scanner, state, mut sink) =
                (Scanner::default(), SharedState::new(), Recorder::new());
            hold(&mut scanner, SHIFT | step(0), &state, &mut sink);
            let tempo = state.tempo();

            scanner.scan_pot(1023, &state, &mut sink);
            assert_eq!(tempo, state.tempo(), "Tempo should be untouched");
            assert_eq!(
                Note::from(U7::from_u8_lossy(127)),
                state.note(0),
                "Expected left but got right"
            );
        }

        #[test]
        fn shift_sets_tempo_with_hysteresis() {
            let (mut scanner, state, mut sink) =
                (Scanner::default(), SharedState::new(), Recorder::new());
            hold(&mut scanner, SHIFT, &state, &mut sink);

            assert_eq!(
                Operation::TempoChange,
                scanner.scan_pot(463, &state, &mut sink),
                "Expected left but got right"
            );
            assert_eq!(Tempo::from_tenths(1200), state.tempo(), "Expected left but got right");

            // within hysteresis: the debounced value moves, the tempo doesn't
            for _ in 0..5 {
                scanner.scan_pot(463 + POT_HYSTERESIS, &state, &mut sink);
            }
            assert_eq!(Tempo::from_tenths(1200), state.tempo(), "Expected left but got right");

            let mut operation = Operation::none();
            for _ in 0..5 {
                operation |= scanner.scan_pot(463 + POT_HYSTERESIS + 1, &state, &mut sink);
            }
            assert_eq!(Operation::TempoChange, operation, "Expected left but got right");
            assert_eq!(
                Tempo::from_pot(463 + POT_HYSTERESIS + 1),
                state.tempo(),
                "Expected left but got right"
            );
        }

        #[test]
        fn otherwise_forwards_timbre_parameter() {
            let (mut scanner, state, mut sink) =
                (Scanner::default(), SharedState::new(), Recorder::new());

            assert_eq!(
                Operation::ParameterChange,
                scanner.scan_pot(700, &state, &mut sink),
                "Expected left but got right"
            );
            // same reading again is inside the hysteresis band
            assert!(
                scanner.scan_pot(700, &state, &mut sink).is_none(),
                "Should not resend"
            );
            assert_eq!(
                &[Command::ParameterChange {
                    parameter: TIMBRE_PARAMETER,
                    sub_parameter: None,
                    value: 700,
                }],
                sink.commands(),
                "Expected left but got right"
            );
        }

        #[test]
        fn noise_is_debounced_before_dispatch() {
            let (mut scanner, state, mut sink) =
                (Scanner::default(), SharedState::new(), Recorder::new());
            scanner.scan_pot(100, &state, &mut sink);
            for reading in [900, 100, 900, 900, 100] {
                scanner.scan_pot(reading, &state, &mut sink);
            }
            assert_eq!(1, sink.len(), "Spikes shorter than the window should be ignored");
        }
    }
}
