//! RADIO peripheral driver for passive advertising-channel capture.
//!
//! The radio is configured for the advertising physical channel: fixed
//! access address, CRC-24 over the PDU with the advertising init value,
//! hardware dewhitening seeded from the channel index. Every CRC-valid
//! frame is offered to the capture slot from the END interrupt; reception
//! is re-armed immediately, so capture continues while a frame waits for
//! delivery.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU8, Ordering};

use embassy_nrf::interrupt::typelevel::{Binding, Handler, RADIO};
use embassy_nrf::interrupt::{self, InterruptExt, Priority};
use embassy_nrf::{pac, peripherals};
use sniffer_common::ble;
use sniffer_common::capture::CaptureSlot;

const MODE_IDLE: u8 = 0;
const MODE_SNIFF_ADV: u8 = 1;

struct State {
    mode: AtomicU8,
    rxbuf: UnsafeCell<[u8; ble::MAX_PDU_LEN]>,
    captures: CaptureSlot,
}

// rxbuf is written by the radio DMA and read in the interrupt; task-side
// code touches it only while the radio is disabled and the interrupt off.
unsafe impl Sync for State {}

static STATE: State = State {
    mode: AtomicU8::new(MODE_IDLE),
    rxbuf: UnsafeCell::new([0; ble::MAX_PDU_LEN]),
    captures: CaptureSlot::new(),
};

pub struct InterruptHandler {
    _private: (),
}

impl Handler<RADIO> for InterruptHandler {
    unsafe fn on_interrupt() {
        let r = &*pac::RADIO::ptr();
        if r.events_end.read().bits() != 0 {
            r.events_end.reset();
            if STATE.mode.load(Ordering::Relaxed) == MODE_SNIFF_ADV
                && r.crcstatus.read().crcstatus().is_crcok()
            {
                let buf = &*STATE.rxbuf.get();
                let len = ble::PDU_HEADER_LEN + usize::from(buf[1]);
                // A full slot drops the frame; no bookkeeping either way.
                STATE.captures.try_publish(&buf[..len]);
            }
            // Keep receiving whether the frame was kept or not.
            r.tasks_start.write(|w| w.bits(1));
        }
    }
}

/// Owns the RADIO peripheral. Constructing one requires the interrupt
/// binding, so a `Sniffer` is the only path to the registers below.
pub struct Sniffer {
    _radio: peripherals::RADIO,
}

impl Sniffer {
    pub fn new(radio: peripherals::RADIO, _irq: impl Binding<RADIO, InterruptHandler>) -> Self {
        interrupt::RADIO.set_priority(Priority::P2);
        Self { _radio: radio }
    }

    /// The mailbox CRC-valid frames are published into.
    pub fn captures(&self) -> &'static CaptureSlot {
        &STATE.captures
    }

    fn regs() -> &'static pac::radio::RegisterBlock {
        unsafe { &*pac::RADIO::ptr() }
    }

    /// Parks the radio in the disabled state. Safe from any state.
    pub fn disable(&mut self) {
        STATE.mode.store(MODE_IDLE, Ordering::Relaxed);
        let r = Self::regs();
        if !r.state.read().state().is_disabled() {
            interrupt::RADIO.disable();
            r.events_disabled.reset();
            r.tasks_disable.write(|w| unsafe { w.bits(1) });
            while r.events_disabled.read().bits() == 0 {}
        }
    }

    /// Tunes to an advertising channel and starts capturing. Reconfigures
    /// from scratch each time, so retuning is just calling it again.
    pub fn sniff_advertising(&mut self, channel: u8) {
        self.disable();
        STATE.mode.store(MODE_SNIFF_ADV, Ordering::Relaxed);
        defmt::trace!("radio: sniff advertising, channel {}", channel);

        // Radio disabled and interrupt off, nothing else touches the
        // buffer here.
        let buf = unsafe { &mut *STATE.rxbuf.get() };
        buf.fill(0);

        let r = Self::regs();
        r.packetptr.write(|w| unsafe { w.bits(buf.as_mut_ptr() as u32) });
        r.frequency
            .write(|w| unsafe { w.frequency().bits(ble::channel_frequency_offset(channel)) });

        // Access address split: one prefix byte, three base bytes (BALEN 3)
        // left-aligned in BASE0.
        r.prefix0
            .write(|w| unsafe { w.ap0().bits((ble::ADV_ACCESS_ADDRESS >> 24) as u8) });
        r.base0.write(|w| unsafe { w.bits(ble::ADV_ACCESS_ADDRESS << 8) });
        r.rxaddresses.write(|w| w.addr0().enabled());

        r.mode.write(|w| w.mode().ble_1mbit());
        // On-air layout: S0 = 1 byte, LENGTH = 8 bits, no S1. The DMA frame
        // is then [S0][LEN][payload], matching the wire header.
        r.pcnf0
            .write(|w| unsafe { w.s0len().bit(true).lflen().bits(8).s1len().bits(0) });
        r.pcnf1.write(|w| unsafe {
            w.maxlen()
                .bits(ble::MAX_PAYLOAD_LEN as u8)
                .statlen()
                .bits(0)
                .balen()
                .bits(3)
                .endian()
                .little()
                .whiteen()
                .enabled()
        });
        r.datawhiteiv
            .write(|w| unsafe { w.datawhiteiv().bits(channel) });

        // CRC over the PDU only, not the access address.
        r.crccnf.write(|w| w.len().three().skipaddr().skip());
        r.crcinit.write(|w| unsafe { w.crcinit().bits(ble::ADV_CRC_INIT) });
        r.crcpoly.write(|w| unsafe { w.crcpoly().bits(ble::CRC_POLY) });

        r.events_end.reset();
        r.intenclr.write(|w| unsafe { w.bits(u32::MAX) });
        r.intenset.write(|w| w.end().set());
        // Ramp-up chains straight into reception.
        r.shorts.write(|w| w.ready_start().enabled());

        interrupt::RADIO.unpend();
        unsafe { interrupt::RADIO.enable() };

        r.tasks_rxen.write(|w| unsafe { w.bits(1) });
    }
}
