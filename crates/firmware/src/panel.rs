//! Reads the front panel.

use crate::output::Router;
use defmt::debug;
use eightfold_lib::{
    configuration::{InputLayout, LINE_COUNT, LineLevels},
    scanner::Scanner,
    shared_state::SharedState,
};
use embassy_stm32::{
    adc::{Adc, AnyAdcChannel},
    gpio::Input,
    peripherals::ADC1,
};
use embassy_time::{Duration, Ticker};

/// 250 Hz; the six-sample debounce window settles in about 28 ms.
pub const SCAN_PERIOD: Duration = Duration::from_millis(4);

/// Task responsible for sampling the switches and potentiometer and applying them to the sequence.
///
/// Lights the step LEDs with the power-on gate pattern before the first scan.
#[embassy_executor::task]
pub async fn panel(
    switches: [Input<'static>; LINE_COUNT],
    mut adc: Adc<'static, ADC1>,
    mut pot: AnyAdcChannel<ADC1>,
    state: &'static SharedState,
) -> ! {
    let mut scanner = Scanner::new(InputLayout::default());
    let mut router = Router;
    scanner.refresh_step_leds(state, &mut router);

    let mut ticker = Ticker::every(SCAN_PERIOD);
    loop {
        ticker.next().await;

        let mut operation = scanner.scan_switches(read_lines(&switches), state, &mut router);
        operation |= scanner.scan_pot(adc.blocking_read(&mut pot), state, &mut router);

        if !operation.is_none() {
            debug!("Panel: {}, holding {}", operation, scanner.ui());
        }
    }
}

/// Packs the raw level of every switch into a [`LineLevels`], line `i` in bit `i`.
fn read_lines(switches: &[Input<'static>; LINE_COUNT]) -> LineLevels {
    switches
        .iter()
        .enumerate()
        .filter(|(_, input)| input.is_high())
        .fold(0, |levels, (line, _)| levels | (1 << line))
}
