//! Tasks and types which carry scanner and engine commands to the hardware.
//!
//! The scanner and engine must never wait on an output, so the [`Router`] only queues: LED levels go to
//! [`step_leds`], notes and parameter changes go to [`midi_out`] already framed as USB-MIDI event packets. MIDI is
//! only queued while a host is connected. When a queue is full the command is dropped.

use crate::UsbDriver;
use core::sync::atomic::{AtomicBool, Ordering};
use defmt::{debug, info, panic, warn};
use eightfold_lib::{
    command::{Command, Sink, usb_midi_packet},
    configuration::STEP_COUNT,
};
use embassy_stm32::{gpio::Output, usb};
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel};
use embassy_usb::{class::midi::MidiClass, driver::EndpointError};
use wmidi::Channel as MidiChannel;

/// All sequencer traffic goes out on one channel.
const MIDI_CHANNEL: MidiChannel = MidiChannel::Ch1;

/// Room for a full gate refresh from the scanner plus the engine's playhead updates.
const LED_QUEUE_DEPTH: usize = 2 * STEP_COUNT;
const MIDI_QUEUE_DEPTH: usize = 32;

static LED_QUEUE: Channel<CriticalSectionRawMutex, (usize, bool), LED_QUEUE_DEPTH> =
    Channel::new();
static MIDI_QUEUE: Channel<CriticalSectionRawMutex, [u8; 4], MIDI_QUEUE_DEPTH> = Channel::new();
/// Written only by [`midi_out`].
static HOST_CONNECTED: AtomicBool = AtomicBool::new(false);

/// A [`Sink`] which routes each [`Command`] to the task owning the matching hardware.
pub struct Router;

impl Sink for Router {
    fn send(&mut self, command: Command) {
        if let Command::StepLed { step, lit } = command {
            if LED_QUEUE.try_send((step, lit)).is_err() {
                warn!("LED queue full, dropping update for step {}", step);
            }
            return;
        }

        if !HOST_CONNECTED.load(Ordering::Relaxed) {
            return;
        }
        let Some(packet) = command
            .to_midi(MIDI_CHANNEL)
            .and_then(|msg| usb_midi_packet(&msg))
        else {
            return;
        };
        if MIDI_QUEUE.try_send(packet).is_err() {
            debug!("MIDI queue full, dropping packet {:x}", packet);
        }
    }
}

/// Task responsible for driving the step LEDs.
#[embassy_executor::task]
pub async fn step_leds(mut leds: [Output<'static>; STEP_COUNT]) -> ! {
    loop {
        let (step, lit) = LED_QUEUE.receive().await;
        if let Some(led) = leds.get_mut(step) {
            led.set_level(lit.into());
        }
    }
}

/// Task responsible for sending queued MIDI to the USB host.
#[embassy_executor::task]
pub async fn midi_out(mut class: MidiClass<'static, UsbDriver>) -> ! {
    loop {
        class.wait_connection().await;
        info!("USB connected");
        MIDI_QUEUE.clear();
        HOST_CONNECTED.store(true, Ordering::Relaxed);
        let _ = forward_midi(&mut class).await;
        HOST_CONNECTED.store(false, Ordering::Relaxed);
        info!("USB disconnected");
    }
}

#[doc(hidden)]
struct Disconnected {}

impl From<EndpointError> for Disconnected {
    fn from(val: EndpointError) -> Self {
        match val {
            EndpointError::BufferOverflow => panic!("Buffer overflow"),
            EndpointError::Disabled => Disconnected {},
        }
    }
}

/// Helper function which writes queued packets to the host until the connection drops.
async fn forward_midi<'d, T: usb::Instance + 'd>(
    class: &mut MidiClass<'d, usb::Driver<'d, T>>,
) -> Result<(), Disconnected> {
    loop {
        let packet = MIDI_QUEUE.receive().await;
        class.write_packet(&packet).await?;
    }
}
