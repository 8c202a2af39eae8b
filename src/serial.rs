//! Host link: command dispatch and event delivery over UARTE.
//!
//! Three tasks share the link. `command_loop` owns the RX half and the
//! radio; `link_tx` owns the TX half and drains the event channel;
//! `deliver_captures` turns captured PDUs into NEW_ADV events. Everything
//! outbound goes through the channel, so frames never interleave on the
//! wire.

use cortex_m::peripheral::SCB;
use defmt::{info, warn};
use embassy_executor::Spawner;
use embassy_nrf::peripherals::UARTE0;
use embassy_nrf::uarte::{UarteRx, UarteTx};
use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{with_timeout, Duration, Timer};
use sniffer_common::ble;
use sniffer_common::capture::CaptureSlot;
use sniffer_common::wire::{self, Command, CommandHeader, Event};

use crate::radio::Sniffer;

/// Outbound events waiting for the TX half of the link.
pub type EventChannel = Channel<ThreadModeRawMutex, Event, 4>;

/// RX is drained until it has been quiet this long.
const DRAIN_IDLE: Duration = Duration::from_millis(10);

/// Writes every queued event to the host, one frame at a time.
#[embassy_executor::task]
pub async fn link_tx(mut tx: UarteTx<'static, UARTE0>, events: &'static EventChannel) -> ! {
    let mut frame = [0u8; wire::MAX_EVENT_FRAME];
    loop {
        let event = events.receive().await;
        let n = event.encode(&mut frame);
        if tx.write(&frame[..n]).await.is_err() {
            warn!("link tx failed, event dropped");
        }
    }
}

/// Reads command frames from the host and dispatches them.
#[embassy_executor::task]
pub async fn command_loop(
    spawner: Spawner,
    mut rx: UarteRx<'static, UARTE0>,
    mut sniffer: Sniffer,
    events: &'static EventChannel,
) -> ! {
    events
        .send(Event::debug(format_args!("entered command loop")))
        .await;
    events.send(Event::ready()).await;
    info!("command loop ready");

    loop {
        let mut raw = [0u8; wire::HEADER_LEN];
        if rx.read(&mut raw).await.is_err() {
            fault(&mut rx, events, "command header read failed").await;
            continue;
        }
        let header = CommandHeader::parse(raw);

        let len = usize::from(header.length);
        let mut payload = [0u8; wire::MAX_CMD_PAYLOAD];
        if len > payload.len() {
            fault(&mut rx, events, "command payload too long").await;
            continue;
        }
        if len > 0 && rx.read(&mut payload[..len]).await.is_err() {
            fault(&mut rx, events, "command payload read failed").await;
            continue;
        }

        match Command::parse(header.opcode, &payload[..len]) {
            Ok(Command::Reset) => reset(events).await,
            Ok(Command::SniffAdv { channel }) => {
                info!("sniff advertising channel {}", channel);
                // One delivery task for the lifetime of the device;
                // retuning reuses it.
                let _ = spawner.spawn(deliver_captures(sniffer.captures(), events, channel));
                events
                    .send(Event::debug(format_args!(
                        "sniffing advertising channel: {}",
                        channel
                    )))
                    .await;
                sniffer.sniff_advertising(channel);
            }
            Err(e) => {
                warn!("rejected command: {}", e);
                events.send(Event::error("unknown or malformed command")).await;
            }
        }
    }
}

/// Forwards each captured PDU to the host as a NEW_ADV event.
#[embassy_executor::task]
async fn deliver_captures(
    captures: &'static CaptureSlot,
    events: &'static EventChannel,
    channel: u8,
) -> ! {
    info!("delivery task started, channel {}", channel);
    events
        .send(Event::debug(format_args!(
            "entered delivery task, channel: {}",
            channel
        )))
        .await;

    let mut pdu = [0u8; ble::MAX_PDU_LEN];
    loop {
        let n = captures.receive(&mut pdu).await;
        events.send(Event::new_adv(&pdu[..n])).await;
    }
}

async fn reset(events: &'static EventChannel) -> ! {
    info!("host requested reset");
    events.send(Event::debug(format_args!("resetting"))).await;
    // Give the TX task a moment to put the notice on the wire.
    Timer::after_millis(5).await;
    SCB::sys_reset();
}

/// Reports a link-level problem, then resynchronizes by draining RX until
/// the line goes idle.
async fn fault(rx: &mut UarteRx<'static, UARTE0>, events: &'static EventChannel, msg: &'static str) {
    warn!("{}", msg);
    events.send(Event::error(msg)).await;

    let mut scratch = [0u8; 1];
    loop {
        match with_timeout(DRAIN_IDLE, rx.read(&mut scratch)).await {
            Ok(Ok(())) => continue,
            _ => break,
        }
    }
}
