//! Last button state shared between the interrupt pipeline and readers

use std::sync::atomic::{AtomicU8, Ordering};

/// One byte latch holding the raw button mask of the most recent report
///
/// The interrupt pipeline overwrites the latch on every report. Readers take
/// the value destructively, so each mask is observed at most once. A single
/// atomic byte, relaxed ordering is enough.
#[derive(Debug, Default)]
pub struct ButtonLatch(AtomicU8);

impl ButtonLatch {
    pub const fn new() -> Self {
        Self(AtomicU8::new(0))
    }

    pub fn store(&self, mask: u8) {
        self.0.store(mask, Ordering::Relaxed);
    }

    /// Read and clear
    pub fn take(&self) -> u8 {
        self.0.swap(0, Ordering::Relaxed)
    }

    /// Read without clearing
    pub fn peek(&self) -> u8 {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn take_is_destructive() {
        let latch = ButtonLatch::new();
        latch.store(0x03);
        assert_eq!(latch.take(), 0x03);
        assert_eq!(latch.take(), 0);
    }

    #[test]
    fn store_overwrites() {
        let latch = ButtonLatch::new();
        latch.store(0x01);
        latch.store(0x04);
        assert_eq!(latch.peek(), 0x04);
        assert_eq!(latch.take(), 0x04);
    }

    #[test]
    fn starts_cleared() {
        assert_eq!(ButtonLatch::new().peek(), 0);
    }
}
