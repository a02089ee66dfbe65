use crate::configuration::{POT_DEBOUNCE_THRESHOLD, SWITCH_DEBOUNCE_THRESHOLD};

/// Filters chatter out of a sampled signal.
///
/// Each sample that disagrees with the accepted value increments a mismatch counter; a sample that agrees resets it.
/// Once the counter exceeds `THRESHOLD` the latest sample becomes the accepted value and the counter starts over. A
/// signal therefore has to disagree for `THRESHOLD + 1` consecutive samples before the accepted value moves, and it
/// moves at most once per such window no matter how the raw signal bounces.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Debounce<T, const THRESHOLD: u8> {
    accepted: T,
    mismatches: u8,
}

/// Debounce filter for a digital switch line.
pub type SwitchDebounce = Debounce<bool, SWITCH_DEBOUNCE_THRESHOLD>;

/// Debounce filter for a raw 10-bit potentiometer reading.
pub type PotDebounce = Debounce<u16, POT_DEBOUNCE_THRESHOLD>;

impl<T: Copy + PartialEq, const THRESHOLD: u8> Debounce<T, THRESHOLD> {
    /// Constructs a filter which starts out having accepted `initial`.
    pub const fn new(initial: T) -> Self {
        Self {
            accepted: initial,
            mismatches: 0,
        }
    }

    /// Feeds one raw sample through the filter and returns the accepted value.
    pub fn update(&mut self, raw: T) -> T {
        if raw == self.accepted {
            self.mismatches = 0;
        } else {
            self.mismatches += 1;
            if self.mismatches > THRESHOLD {
                self.accepted = raw;
                self.mismatches = 0;
            }
        }
        self.accepted
    }

    /// Returns the accepted value without sampling.
    pub fn accepted(&self) -> T {
        self.accepted
    }
}
