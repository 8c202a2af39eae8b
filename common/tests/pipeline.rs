//! The capture pipeline minus the radio: a CRC-valid PDU entering the
//! slot comes back out as exactly one NEW_ADV frame on the wire.

use sniffer_common::ble::{self, MAX_PDU_LEN};
use sniffer_common::capture::CaptureSlot;
use sniffer_common::wire::{self, event, Event};

#[test]
fn empty_pdu_reaches_host_exactly_once() {
    let pdu = [0x01, 0x00];
    // The interrupt only publishes frames the hardware CRC accepted.
    assert_eq!(ble::crc24(ble::ADV_CRC_INIT, &pdu), 0x9527f1);

    let slot = CaptureSlot::new();
    assert!(slot.try_publish(&pdu));

    let mut buf = [0u8; MAX_PDU_LEN];
    let n = slot.try_receive(&mut buf).unwrap();
    let ev = Event::new_adv(&buf[..n]);

    let mut frame = [0u8; wire::MAX_EVENT_FRAME];
    let len = ev.encode(&mut frame);
    let (opcode, payload) = wire::decode(&frame[..len]).unwrap();
    assert_eq!(opcode, event::NEW_ADV);
    assert_eq!(payload, &pdu);

    // Nothing further pending, and the slot takes the next capture.
    assert_eq!(slot.try_receive(&mut buf), None);
    assert!(slot.try_publish(&[0x40, 0x01, 0xaa]));
}

#[test]
fn dewhitened_advertisement_round_trips() {
    // An ADV_NONCONN_IND as the radio would hand it over after hardware
    // dewhitening: type 0x02, 6-byte AdvA, 3 bytes of AD.
    let pdu = [0x02, 0x09, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x02, 0x01, 0x06];
    let crc = ble::crc24(ble::ADV_CRC_INIT, &pdu);

    // What actually went over the air on channel 38.
    let mut air = [0u8; 11];
    air.copy_from_slice(&pdu);
    ble::dewhiten(&mut air, 38);
    assert_ne!(air, pdu);

    // Receiver side: dewhiten and re-check the CRC before handing off.
    ble::dewhiten(&mut air, 38);
    assert_eq!(air, pdu);
    assert_eq!(ble::crc24(ble::ADV_CRC_INIT, &air), crc);

    let slot = CaptureSlot::new();
    assert!(slot.try_publish(&air));
    let mut buf = [0u8; MAX_PDU_LEN];
    let n = slot.try_receive(&mut buf).unwrap();

    let mut frame = [0u8; wire::MAX_EVENT_FRAME];
    let len = Event::new_adv(&buf[..n]).encode(&mut frame);
    let (opcode, payload) = wire::decode(&frame[..len]).unwrap();
    assert_eq!(opcode, event::NEW_ADV);
    assert_eq!(payload, &pdu);
}
