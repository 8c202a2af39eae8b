#![no_std]
#![no_main]

#[macro_use]
mod pinout;

mod radio;
mod serial;

use defmt::info;
use embassy_executor::Spawner;
use embassy_nrf::config::{Config, HfclkSource};
use embassy_nrf::{peripherals, uarte};
use embassy_sync::channel::Channel;
use {defmt_rtt as _, panic_probe as _};

use crate::radio::Sniffer;
use crate::serial::EventChannel;

embassy_nrf::bind_interrupts!(struct Irqs {
    RADIO => radio::InterruptHandler;
    UARTE0_UART0 => uarte::InterruptHandler<peripherals::UARTE0>;
});

static EVENTS: EventChannel = Channel::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let mut config = Config::default();
    // The radio cannot receive on the internal RC oscillator; start the
    // crystal before anything else.
    config.hfclk_source = HfclkSource::ExternalXtal;
    let p = embassy_nrf::init(config);

    let mut uart_config = uarte::Config::default();
    uart_config.parity = uarte::Parity::EXCLUDED;
    uart_config.baudrate = uarte::Baudrate::BAUD115200;
    let uart = uarte::Uarte::new(
        p.UARTE0,
        Irqs,
        pinout!(p.uart_rx),
        pinout!(p.uart_tx),
        uart_config,
    );
    let (tx, rx) = uart.split();

    let sniffer = Sniffer::new(p.RADIO, Irqs);

    info!("sniffer up");
    spawner.must_spawn(serial::link_tx(tx, &EVENTS));
    spawner.must_spawn(serial::command_loop(spawner, rx, sniffer, &EVENTS));
}
