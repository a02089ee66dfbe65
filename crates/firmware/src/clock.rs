//! Drives the sequencer engine.

use crate::output::Router;
use defmt::trace;
use eightfold_lib::{engine::Engine, shared_state::SharedState};
use embassy_time::{Duration, Instant, Ticker};

/// 10 kHz, comfortably finer than the shortest tick (576 µs at 260 BPM).
pub const ENGINE_PERIOD: Duration = Duration::from_micros(100);

/// Task responsible for advancing the sequence and sending its notes.
#[embassy_executor::task]
pub async fn clock(state: &'static SharedState) -> ! {
    let mut engine = Engine::new();
    let mut router = Router;
    let mut phase = engine.phase(state);

    let mut ticker = Ticker::every(ENGINE_PERIOD);
    loop {
        ticker.next().await;
        engine.tick(Instant::now(), state, &mut router);

        let current = engine.phase(state);
        if current != phase {
            trace!("Engine {} -> {} at {}", phase, current, engine.position());
            phase = current;
        }
    }
}
