//! Common library for the sniffer firmware.
//!
//! This crate holds everything that does not touch the chip:
//! - BLE Link Layer bit twiddling (whitening, CRC-24, channel map)
//! - the serial wire protocol spoken with the host
//! - the capture mailbox handed from the radio interrupt to tasks
//!
//! It is `no_std` on the target and builds on the host, so the codec and
//! protocol logic are unit tested there.

#![cfg_attr(not(test), no_std)]

pub mod ble;
pub mod capture;
pub mod wire;
