//! Eightfold is [Embassy](https://embassy.dev)-based firmware for an eight-step hardware sequencer. The firmware runs on
//! the [Nucleo-F767ZI development board](https://www.st.com/en/evaluation-tools/nucleo-f767zi.html), reads a panel of
//! ten switches (eight steps, play and shift) and one potentiometer, lights one LED per step, and plays the sequence
//! on an external synthesizer voice as USB-MIDI.
//!
//! Two periodic tasks share one [`SharedState`]:
//! - [`panel`][panel::panel] debounces the switches and potentiometer every [`panel::SCAN_PERIOD`] and edits the
//!   sequence;
//! - [`clock`][clock::clock] runs the sequencer engine every [`clock::ENGINE_PERIOD`].
//!
//! Both emit commands through an [`output::Router`], which hands them to the tasks that own the LEDs and the USB-MIDI
//! class.

#![no_std]
#![no_main]

mod clock;
mod output;
mod panel;

use defmt::*;
use eightfold_lib::{configuration::STEP_COUNT, shared_state::SharedState};
use embassy_executor::Spawner;
use embassy_stm32::{
    Config,
    adc::{Adc, AdcChannel, Resolution},
    bind_interrupts,
    gpio::{Input, Level, Output, Pull, Speed},
    peripherals,
    time::Hertz,
    usb,
};
use embassy_usb::{Builder, UsbDevice, class::midi::MidiClass};
use static_cell::StaticCell;

#[cfg(feature = "defmt-rtt")]
use defmt_rtt as _;
#[cfg(not(feature = "panic-probe"))]
use panic_halt as _;
#[cfg(feature = "panic-probe")]
use panic_probe as _;

bind_interrupts!(
    #[doc(hidden)]
    struct Irqs {
        OTG_FS => usb::InterruptHandler<peripherals::USB_OTG_FS>;
    }
);

type UsbDriver = usb::Driver<'static, peripherals::USB_OTG_FS>;

/// The sequence and transport, shared by the panel and clock tasks.
static SEQUENCER: SharedState = SharedState::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Initializing Eightfold");

    let mut config = Config::default();
    {
        use embassy_stm32::rcc::*;
        // hse: high-speed external clock, supplied by the ST-LINK's 8 MHz MCO
        config.rcc.hse = Some(Hse {
            freq: Hertz(8_000_000),
            mode: HseMode::Bypass,
        });

        config.rcc.pll_src = PllSource::HSE;
        config.rcc.pll = Some(Pll {
            prediv: PllPreDiv::DIV4,
            mul: PllMul::MUL216,
            divp: Some(PllPDiv::DIV2), // 8mhz / 4 * 216 / 2 = 216Mhz
            // USB OTG FS needs its own 48MHz clock, derived from the PLLQ output
            divq: Some(PllQDiv::DIV9), // 8mhz / 4 * 216 / 9 = 48Mhz
            divr: None,
        });
        config.rcc.ahb_pre = AHBPrescaler::DIV1;
        config.rcc.apb1_pre = APBPrescaler::DIV4;
        config.rcc.apb2_pre = APBPrescaler::DIV2;
        config.rcc.sys = Sysclk::PLL1_P;
        config.rcc.mux.clk48sel = mux::Clk48sel::PLL1_Q;
    }
    let p = embassy_stm32::init(config);

    // Panel wiring. Switches pull their line to ground when pressed; the order here must match the
    // `InputLayout` the scanner is built with (steps 0-7, play, shift).
    let switches = [
        Input::new(p.PC8, Pull::Up),
        Input::new(p.PC6, Pull::Up),
        Input::new(p.PC5, Pull::Up),
        Input::new(p.PD14, Pull::Up),
        Input::new(p.PD15, Pull::Up),
        Input::new(p.PB11, Pull::Up),
        Input::new(p.PB2, Pull::Up),
        Input::new(p.PB1, Pull::Up),
        Input::new(p.PC4, Pull::Up),
        Input::new(p.PF5, Pull::Up),
    ];

    // PB7 doubles as the Nucleo's blue user LED, which makes step 5 easy to spot on a bare board
    let leds: [Output<'static>; STEP_COUNT] = [
        Output::new(p.PC10, Level::Low, Speed::Low),
        Output::new(p.PC12, Level::Low, Speed::Low),
        Output::new(p.PF6, Level::Low, Speed::Low),
        Output::new(p.PF7, Level::Low, Speed::Low),
        Output::new(p.PA15, Level::Low, Speed::Low),
        Output::new(p.PB7, Level::Low, Speed::Low),
        Output::new(p.PE2, Level::Low, Speed::Low),
        Output::new(p.PE4, Level::Low, Speed::Low),
    ];
    unwrap!(spawner.spawn(output::step_leds(leds)));

    // the potentiometer wiper sits on A0 of the Arduino header (PA3, ADC123_IN3)
    let mut adc = Adc::new(p.ADC1);
    adc.set_resolution(Resolution::BITS10);
    let pot = p.PA3.degrade_adc();

    unwrap!(spawner.spawn(panel::panel(switches, adc, pot, &SEQUENCER)));
    unwrap!(spawner.spawn(clock::clock(&SEQUENCER)));

    // Create the driver, from the HAL.
    static ENDPOINT_OUT_BUFFER: StaticCell<[u8; 256]> = StaticCell::new();
    let mut config = embassy_stm32::usb::Config::default();

    // USB devices which are self-powered (i.e., that can stay powered on if unplugged from the host)
    // need to enable vbus_detection to comply with the USB spec. Per section 6.10 of the Nucleo board
    // manual (UM1974), CN13 (the USB port) cannot power the board; external power is necessary.
    config.vbus_detection = true;

    let driver = usb::Driver::new_fs(
        p.USB_OTG_FS,
        Irqs,
        p.PA12,
        p.PA11,
        ENDPOINT_OUT_BUFFER.init([0; 256]),
        config,
    );

    // pid.codes vendor ID; product ID 0x0001 is reserved by pid.codes for testing
    let mut config = embassy_usb::Config::new(0x1209, 0x0001);
    config.manufacturer = Some("Eightfold");
    config.product = Some("Eightfold Step Sequencer");
    config.self_powered = true;
    config.max_power = 0;

    static CONFIG_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
    static BOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
    static CONTROL_BUFFER: StaticCell<[u8; 64]> = StaticCell::new();

    let mut builder = Builder::new(
        driver,
        config,
        CONFIG_DESCRIPTOR.init([0; 256]),
        BOS_DESCRIPTOR.init([0; 256]),
        &mut [], // no msos descriptors
        CONTROL_BUFFER.init([0; 64]),
    );

    // one jack in each direction; incoming MIDI is ignored
    let class = MidiClass::new(&mut builder, 1, 1, 64);
    let usb = builder.build();

    unwrap!(spawner.spawn(usb_task(usb)));
    unwrap!(spawner.spawn(output::midi_out(class)));
}

#[embassy_executor::task]
async fn usb_task(mut usb: UsbDevice<'static, UsbDriver>) -> ! {
    usb.run().await
}
