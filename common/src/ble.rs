//! BLE Link Layer bit-level helpers: whitening, CRC-24 and the channel map.
//!
//! Everything here is pure and operates on in-RAM byte order, i.e. the
//! layout the radio DMAs packets in (each byte LSB-first on air).

/// Access address all advertising-channel traffic is received on.
pub const ADV_ACCESS_ADDRESS: u32 = 0x8e89_bed6;

/// CRC initial value on the advertising channels.
pub const ADV_CRC_INIT: u32 = 0x0055_5555;

/// CRC polynomial in register form, the x^24 term implicit.
pub const CRC_POLY: u32 = 0x0000_065b;

/// On-air PDU header: one flags/type byte plus one length byte.
pub const PDU_HEADER_LEN: usize = 2;

/// The length field is 8 bits, so payloads run up to 255 bytes.
pub const MAX_PAYLOAD_LEN: usize = 255;

/// Largest complete PDU (header plus maximal payload).
pub const MAX_PDU_LEN: usize = PDU_HEADER_LEN + MAX_PAYLOAD_LEN;

/// Removes the air-interface whitening from `data` in place.
///
/// The whitening LFSR is x^7 + x^4 + 1, seeded from the bit-reversed
/// channel index with the second position forced on. Whitening is a plain
/// XOR stream, so the same transform whitens and dewhitens.
pub fn dewhiten(data: &mut [u8], channel: u8) {
    let mut lfsr = channel.reverse_bits() | 0x02;
    for byte in data.iter_mut() {
        let mut c = byte.reverse_bits();
        for j in (0..8).rev() {
            if lfsr & 0x80 != 0 {
                lfsr ^= 0x11;
                c ^= 1 << j;
            }
            lfsr <<= 1;
        }
        *byte = c.reverse_bits();
    }
}

/// Runs the CRC-24 LFSR forward over `data`, starting from `init`.
///
/// Bits are consumed LSB-first per byte, bytes in order, matching the
/// transmission order the radio hardware applies the checksum in. With an
/// empty `data` the result is `init` itself.
pub fn crc24(init: u32, data: &[u8]) -> u32 {
    // The register is kept shifted up by one so the feedback bit can be
    // staged in bit 0 before the shift.
    let mut lfsr = (init << 1) & 0x01ff_fffe;
    for &byte in data {
        let mut c = byte;
        for _ in 0..8 {
            if (lfsr >> 24) & 1 != u32::from(c & 0x01) {
                lfsr ^= 0x065a;
                lfsr |= 0x01;
            }
            c >>= 1;
            lfsr <<= 1;
        }
    }
    (lfsr & 0x01ff_fffe) >> 1
}

/// Runs the CRC-24 LFSR backward over `data` to recover an earlier state,
/// typically the CRC initial value of a frame whose final CRC is known.
///
/// `crc` and the working state use the bit-reflected register convention;
/// the recovered state is reflected back to register order on return, so
/// `reverse_crc24(reflect(crc24(init, data)), data) == init`. Not used on
/// the advertising path (the init value there is fixed), but the building
/// block for recovering data-channel CRC seeds.
pub fn reverse_crc24(crc: u32, data: &[u8]) -> u32 {
    let mut state = crc & 0x00ff_ffff;
    for &byte in data.iter().rev() {
        for j in 0..8 {
            let top = (state >> 23) & 1;
            state = (state << 1) & 0x00ff_ffff;
            state |= top ^ (u32::from(byte >> (7 - j)) & 1);
            if top != 0 {
                state ^= 0x00b4_c000;
            }
        }
    }
    reflect24(state)
}

fn reflect24(value: u32) -> u32 {
    let mut out = 0;
    for i in 0..24 {
        out |= ((value >> i) & 1) << (23 - i);
    }
    out
}

/// True for the canonical empty data PDU: LLID 0b01, MD and the RFU bits
/// clear, zero length. NESN and SN are don't-care.
pub fn is_empty_pdu(header: &[u8]) -> bool {
    header.len() == PDU_HEADER_LEN && header[0] & 0xf3 == 0x01 && header[1] == 0
}

/// Maps a channel index to the FREQUENCY register value, the offset in MHz
/// from 2400. The three advertising channels sit at 2402/2426/2480; data
/// channels fill the gaps in between.
pub fn channel_frequency_offset(channel: u8) -> u8 {
    match channel {
        37 => 2,
        38 => 26,
        39 => 80,
        0..=10 => 2 * (channel + 2),
        _ => (2 * (u16::from(channel) + 3)) as u8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill_pseudorandom(buf: &mut [u8], mut seed: u32) {
        for b in buf.iter_mut() {
            seed = seed.wrapping_mul(1664525).wrapping_add(1013904223);
            *b = (seed >> 24) as u8;
        }
    }

    // Whitening sequences from the Core spec sample data: dewhitening
    // zeroes exposes the raw stream.
    #[test]
    fn whitening_stream_channel_3() {
        let mut buf = [0u8; 2];
        dewhiten(&mut buf, 3);
        assert_eq!(buf, [0x1b, 0xa5]);
    }

    #[test]
    fn whitening_stream_channel_24() {
        let mut buf = [0u8; 2];
        dewhiten(&mut buf, 24);
        assert_eq!(buf, [0x98, 0x08]);
    }

    #[test]
    fn whitening_stream_channel_37() {
        let mut buf = [0u8; 1];
        dewhiten(&mut buf, 37);
        assert_eq!(buf, [0x8d]);
    }

    #[test]
    fn whitening_self_inverse_on_every_channel() {
        let mut reference = [0u8; 64];
        fill_pseudorandom(&mut reference, 0xdecafbad);
        for channel in 0..=39 {
            let mut buf = reference;
            dewhiten(&mut buf, channel);
            assert_ne!(buf, reference, "channel {channel} stream was empty");
            dewhiten(&mut buf, channel);
            assert_eq!(buf, reference, "channel {channel} did not round-trip");
        }
    }

    #[test]
    fn crc_of_empty_data_pdu() {
        assert_eq!(crc24(ADV_CRC_INIT, &[0x01, 0x00]), 0x9527f1);
    }

    #[test]
    fn crc_identity_on_empty_input() {
        assert_eq!(crc24(ADV_CRC_INIT, &[]), ADV_CRC_INIT);
        assert_eq!(crc24(0x00abcdef, &[]), 0x00abcdef);
    }

    #[test]
    fn reverse_crc_recovers_advertising_init() {
        let pdu = [0x01, 0x00];
        let fin = crc24(ADV_CRC_INIT, &pdu);
        assert_eq!(reverse_crc24(reflect24(fin), &pdu), ADV_CRC_INIT);
    }

    #[test]
    fn reverse_crc_recovers_arbitrary_init() {
        let mut pdu = [0u8; 39];
        fill_pseudorandom(&mut pdu, 0x0badf00d);
        let init = 0x0012_db1e;
        let fin = crc24(init, &pdu);
        assert_eq!(reverse_crc24(reflect24(fin), &pdu), init);
    }

    #[test]
    fn reverse_crc_identity_on_empty_input() {
        assert_eq!(reverse_crc24(reflect24(0x123456), &[]), 0x123456);
    }

    #[test]
    fn empty_pdu_pattern() {
        assert!(is_empty_pdu(&[0x01, 0x00]));
        // NESN and SN are ignored.
        assert!(is_empty_pdu(&[0x05, 0x00]));
        assert!(is_empty_pdu(&[0x0d, 0x00]));
        // Wrong LLID, MD set, nonzero length, wrong header size.
        assert!(!is_empty_pdu(&[0x02, 0x00]));
        assert!(!is_empty_pdu(&[0x11, 0x00]));
        assert!(!is_empty_pdu(&[0x01, 0x05]));
        assert!(!is_empty_pdu(&[0x01]));
        assert!(!is_empty_pdu(&[0x01, 0x00, 0x00]));
    }

    #[test]
    fn channel_map() {
        assert_eq!(channel_frequency_offset(37), 2);
        assert_eq!(channel_frequency_offset(38), 26);
        assert_eq!(channel_frequency_offset(39), 80);
        assert_eq!(channel_frequency_offset(0), 4);
        assert_eq!(channel_frequency_offset(10), 24);
        assert_eq!(channel_frequency_offset(11), 28);
        assert_eq!(channel_frequency_offset(36), 78);
    }
}
