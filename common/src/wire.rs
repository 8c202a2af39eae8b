//! The serial protocol spoken with the host.
//!
//! Commands (host to device) and events (device to host) share one frame
//! layout: a 1-byte opcode, a 2-byte big-endian payload length, then the
//! payload.

use core::fmt::{self, Write};

use heapless::{String, Vec};

use crate::ble::MAX_PDU_LEN;

/// Opcode plus big-endian length.
pub const HEADER_LEN: usize = 3;

/// Longest command payload the device accepts. Anything larger is treated
/// as line garbage.
pub const MAX_CMD_PAYLOAD: usize = 100;

/// ERROR and DEBUG text is cut off here.
pub const MAX_TEXT_LEN: usize = 100;

/// Largest event payload (a maximal captured PDU).
pub const MAX_EVENT_PAYLOAD: usize = MAX_PDU_LEN;

/// Largest encoded event frame.
pub const MAX_EVENT_FRAME: usize = HEADER_LEN + MAX_EVENT_PAYLOAD;

/// Host to device opcodes.
pub mod cmd {
    pub const RESET: u8 = 0x00;
    pub const SNIFF_ADV: u8 = 0x0b;
}

/// Device to host opcodes.
pub mod event {
    pub const READY: u8 = 0x00;
    pub const ERROR: u8 = 0x01;
    pub const NEW_ADV: u8 = 0x0b;
    pub const DEBUG: u8 = 0xff;
}

/// A parsed command frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CommandHeader {
    pub opcode: u8,
    pub length: u16,
}

impl CommandHeader {
    pub fn parse(raw: [u8; HEADER_LEN]) -> Self {
        Self {
            opcode: raw[0],
            length: u16::from_be_bytes([raw[1], raw[2]]),
        }
    }
}

/// A fully parsed host command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    Reset,
    SniffAdv { channel: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    UnknownOpcode(u8),
    ShortPayload,
}

impl Command {
    pub fn parse(opcode: u8, payload: &[u8]) -> Result<Self, CommandError> {
        match opcode {
            cmd::RESET => Ok(Command::Reset),
            cmd::SNIFF_ADV => match payload.first() {
                Some(&channel) => Ok(Command::SniffAdv { channel }),
                None => Err(CommandError::ShortPayload),
            },
            other => Err(CommandError::UnknownOpcode(other)),
        }
    }
}

/// An event queued for the host, payload carried inline.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    Ready,
    Error(String<MAX_TEXT_LEN>),
    Debug(String<MAX_TEXT_LEN>),
    NewAdv(Vec<u8, MAX_EVENT_PAYLOAD>),
}

impl Event {
    pub fn ready() -> Self {
        Event::Ready
    }

    /// An ERROR event; `text` is cut off at [`MAX_TEXT_LEN`].
    pub fn error(text: &str) -> Self {
        let mut s = String::new();
        let _ = TruncatingWrite(&mut s).write_str(text);
        Event::Error(s)
    }

    /// A DEBUG event with formatted text, cut off at [`MAX_TEXT_LEN`].
    pub fn debug(args: fmt::Arguments<'_>) -> Self {
        let mut s = String::new();
        let _ = fmt::write(&mut TruncatingWrite(&mut s), args);
        Event::Debug(s)
    }

    /// A NEW_ADV event carrying a captured PDU (header plus payload).
    pub fn new_adv(pdu: &[u8]) -> Self {
        let n = pdu.len().min(MAX_EVENT_PAYLOAD);
        let mut buf = Vec::new();
        // n is clamped to the capacity, the copy cannot fail
        let _ = buf.extend_from_slice(&pdu[..n]);
        Event::NewAdv(buf)
    }

    pub fn opcode(&self) -> u8 {
        match self {
            Event::Ready => event::READY,
            Event::Error(_) => event::ERROR,
            Event::Debug(_) => event::DEBUG,
            Event::NewAdv(_) => event::NEW_ADV,
        }
    }

    pub fn payload(&self) -> &[u8] {
        match self {
            Event::Ready => &[],
            Event::Error(s) | Event::Debug(s) => s.as_bytes(),
            Event::NewAdv(v) => v.as_slice(),
        }
    }

    /// Encodes the frame into `out`, which must hold at least
    /// [`HEADER_LEN`] plus the payload length. Returns the frame length.
    pub fn encode(&self, out: &mut [u8]) -> usize {
        let payload = self.payload();
        let n = HEADER_LEN + payload.len();
        out[0] = self.opcode();
        out[1..3].copy_from_slice(&(payload.len() as u16).to_be_bytes());
        out[3..n].copy_from_slice(payload);
        n
    }
}

/// Splits an encoded frame into opcode and payload. `None` if the frame is
/// shorter than its header claims.
pub fn decode(frame: &[u8]) -> Option<(u8, &[u8])> {
    if frame.len() < HEADER_LEN {
        return None;
    }
    let len = usize::from(u16::from_be_bytes([frame[1], frame[2]]));
    if frame.len() < HEADER_LEN + len {
        return None;
    }
    Some((frame[0], &frame[HEADER_LEN..HEADER_LEN + len]))
}

/// `fmt::Write` sink that drops everything past the capacity instead of
/// failing the formatter.
struct TruncatingWrite<'a, const N: usize>(&'a mut String<N>);

impl<const N: usize> fmt::Write for TruncatingWrite<'_, N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for ch in s.chars() {
            if self.0.push(ch).is_err() {
                break;
            }
        }
        Ok(())
    }
}
