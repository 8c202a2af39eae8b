//! Single-slot handoff of captured PDUs from the radio interrupt to the
//! delivery task.
//!
//! One frame is in flight at a time. The producer never overwrites a frame
//! the consumer has not taken yet; it drops the new one instead. The ready
//! flag is the only synchronization: it is stored with release ordering
//! after the frame bytes are written and read with acquire ordering before
//! they are touched, so the handoff is safe across the interrupt boundary.

use core::cell::UnsafeCell;
use core::future::poll_fn;
use core::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use core::task::Poll;

use embassy_sync::waitqueue::AtomicWaker;

use crate::ble::MAX_PDU_LEN;

pub struct CaptureSlot {
    ready: AtomicBool,
    len: AtomicU16,
    buf: UnsafeCell<[u8; MAX_PDU_LEN]>,
    waker: AtomicWaker,
}

// Single producer (the radio interrupt) and single consumer; the ready
// flag hands `buf` back and forth between them.
unsafe impl Sync for CaptureSlot {}

impl CaptureSlot {
    pub const fn new() -> Self {
        Self {
            ready: AtomicBool::new(false),
            len: AtomicU16::new(0),
            buf: UnsafeCell::new([0; MAX_PDU_LEN]),
            waker: AtomicWaker::new(),
        }
    }

    /// Offers a frame to the slot. Interrupt context, never blocks.
    ///
    /// Returns false when the previous frame has not been drained yet; the
    /// new frame is dropped in that case.
    pub fn try_publish(&self, frame: &[u8]) -> bool {
        if self.ready.load(Ordering::Acquire) {
            return false;
        }
        // ready is false: the consumer stays away from buf until the
        // release store below, and the producer is a single interrupt.
        let buf = unsafe { &mut *self.buf.get() };
        let n = frame.len().min(buf.len());
        buf[..n].copy_from_slice(&frame[..n]);
        self.len.store(n as u16, Ordering::Relaxed);
        self.ready.store(true, Ordering::Release);
        self.waker.wake();
        true
    }

    /// Copies the pending frame into `out` and frees the slot. `None` when
    /// nothing is pending.
    pub fn try_receive(&self, out: &mut [u8; MAX_PDU_LEN]) -> Option<usize> {
        if !self.ready.load(Ordering::Acquire) {
            return None;
        }
        let buf = unsafe { &*self.buf.get() };
        let n = usize::from(self.len.load(Ordering::Relaxed));
        out[..n].copy_from_slice(&buf[..n]);
        self.ready.store(false, Ordering::Release);
        Some(n)
    }

    /// Resolves once a frame is pending, then drains it like
    /// [`try_receive`](Self::try_receive).
    pub async fn receive(&self, out: &mut [u8; MAX_PDU_LEN]) -> usize {
        poll_fn(|cx| {
            self.waker.register(cx.waker());
            match self.try_receive(out) {
                Some(n) => Poll::Ready(n),
                None => Poll::Pending,
            }
        })
        .await
    }
}

impl Default for CaptureSlot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_then_receive() {
        let slot = CaptureSlot::new();
        assert!(slot.try_publish(&[0x40, 0x03, 0xaa, 0xbb, 0xcc]));

        let mut out = [0u8; MAX_PDU_LEN];
        let n = slot.try_receive(&mut out).unwrap();
        assert_eq!(&out[..n], &[0x40, 0x03, 0xaa, 0xbb, 0xcc]);
    }

    #[test]
    fn empty_slot_has_nothing_to_receive() {
        let slot = CaptureSlot::new();
        let mut out = [0u8; MAX_PDU_LEN];
        assert_eq!(slot.try_receive(&mut out), None);
    }

    #[test]
    fn full_slot_drops_new_frames_without_corruption() {
        let slot = CaptureSlot::new();
        assert!(slot.try_publish(&[0x01, 0x00]));
        assert!(!slot.try_publish(&[0x02, 0x01, 0xff]));

        let mut out = [0u8; MAX_PDU_LEN];
        let n = slot.try_receive(&mut out).unwrap();
        assert_eq!(&out[..n], &[0x01, 0x00]);
    }

    #[test]
    fn slot_is_reusable_after_drain() {
        let slot = CaptureSlot::new();
        let mut out = [0u8; MAX_PDU_LEN];
        for round in 0u8..4 {
            assert!(slot.try_publish(&[round, 0x01, round]));
            let n = slot.try_receive(&mut out).unwrap();
            assert_eq!(&out[..n], &[round, 0x01, round]);
        }
    }

    #[test]
    fn oversized_frames_are_clamped() {
        let slot = CaptureSlot::new();
        let big = [0x5au8; MAX_PDU_LEN + 16];
        assert!(slot.try_publish(&big));

        let mut out = [0u8; MAX_PDU_LEN];
        assert_eq!(slot.try_receive(&mut out), Some(MAX_PDU_LEN));
        assert_eq!(out, [0x5a; MAX_PDU_LEN]);
    }
}
