use super::{LINE_COUNT, STEP_COUNT};

/// A bit vector with one bit per raw input line, indexed by line number. A set bit means the line reads high.
///
/// Panel switches are wired active-low against pull-ups, so a set bit means "released."
pub type LineLevels = u16;

/// A bit vector with one bit per step, indexed by step number.
pub type StepMask = u8;

/// Maps each panel control to the raw input line it is wired to.
///
/// The firmware samples its switch pins in a fixed order and packs them into [`LineLevels`]; this table says which
/// bit of that vector belongs to which control. It is resolved into masks once, when the
/// [`Scanner`](crate::scanner::Scanner) is constructed.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InputLayout {
    /// Line number of each step switch, indexed by step.
    pub steps: [u8; STEP_COUNT],
    /// Line number of the play/stop switch.
    pub play: u8,
    /// Line number of the shift switch.
    pub shift: u8,
}

impl Default for InputLayout {
    /// Step switches on lines 0 through 7, play on line 8 and shift on line 9.
    fn default() -> Self {
        Self {
            steps: [0, 1, 2, 3, 4, 5, 6, 7],
            play: 8,
            shift: 9,
        }
    }
}

impl InputLayout {
    /// Returns the bit for the play switch.
    pub fn play_mask(&self) -> LineLevels {
        line_mask(self.play)
    }

    /// Returns the bit for the shift switch.
    pub fn shift_mask(&self) -> LineLevels {
        line_mask(self.shift)
    }

    /// Returns the bit for each step switch, indexed by step.
    pub fn step_masks(&self) -> [LineLevels; STEP_COUNT] {
        self.steps.map(line_mask)
    }

    /// Collapses the step lines of `levels` into a [`StepMask`].
    pub fn steps_of(&self, levels: LineLevels) -> StepMask {
        self.step_masks()
            .iter()
            .enumerate()
            .filter(|&(_, &mask)| levels & mask != 0)
            .fold(0, |acc, (step, _)| acc | (1 << step))
    }
}

fn line_mask(line: u8) -> LineLevels {
    if usize::from(line) < LINE_COUNT {
        1 << line
    } else {
        // a misconfigured line is simply never read
        0
    }
}
