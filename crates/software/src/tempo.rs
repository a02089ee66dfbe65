//! Fixed-point tempo and its conversion to engine tick durations.

use crate::configuration::{POT_MAX, TICKS_PER_STEP};
use embassy_time::Duration;

/// Tempo in tenths of a BPM (beats per minute), e.g., `1200` is 120.0 BPM.
///
/// Values are clamped to [`Tempo::MIN`]..=[`Tempo::MAX`], the range reachable from the potentiometer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Tempo(u16);

impl Tempo {
    /// 4.0 BPM.
    pub const MIN: Tempo = Tempo(40);
    /// 260.0 BPM.
    pub const MAX: Tempo = Tempo(2600);

    /// Constructs a [`Tempo`] from tenths of a BPM, clamping to the supported range.
    pub const fn from_tenths(tenths: u16) -> Self {
        if tenths < Self::MIN.0 {
            Self::MIN
        } else if tenths > Self::MAX.0 {
            Self::MAX
        } else {
            Self(tenths)
        }
    }

    /// Maps a raw 10-bit potentiometer reading onto the tempo range in 0.5 BPM increments.
    pub const fn from_pot(raw: u16) -> Self {
        let raw = if raw > POT_MAX { POT_MAX } else { raw };
        Self::from_tenths(40 + (raw >> 1) * 5 + (raw & 1) * 5)
    }

    /// Tenths of a BPM.
    pub const fn tenths(self) -> u16 {
        self.0
    }

    /// Length of one engine tick in microseconds, truncated.
    ///
    /// A step is a 16th note, so a beat is `4 * TICKS_PER_STEP` ticks; the factor of 10 in the numerator accounts for
    /// the tenths.
    pub const fn micros_per_tick(self) -> u32 {
        600_000_000 / (4 * self.0 as u32 * TICKS_PER_STEP as u32)
    }

    /// [`Self::micros_per_tick()`] in a format compatible with Embassy's timekeeping API.
    pub fn tick_duration(self) -> Duration {
        Duration::from_micros(u64::from(self.micros_per_tick()))
    }
}

impl Default for Tempo {
    fn default() -> Self {
        crate::configuration::DEFAULT_TEMPO
    }
}
