//! Byte-stream transport abstraction.

/// Non-blocking byte transport to the ventilation unit.
///
/// Writes are fire-and-forget: the transport queues outgoing bytes.
/// Reads are only ever issued for byte counts already reported available,
/// so implementations never block.
pub trait SerialPort {
    /// Queue bytes for transmission.
    fn write_bytes(&mut self, data: &[u8]);

    /// Queue a single byte for transmission.
    fn write_byte(&mut self, byte: u8) {
        self.write_bytes(&[byte]);
    }

    /// Number of received bytes ready to be read.
    fn bytes_available(&self) -> usize;

    /// Read exactly `buf.len()` bytes into `buf`.
    ///
    /// Called only once [`Self::bytes_available`] reports at least that
    /// many; returns false if the transport failed to deliver them.
    fn read_bytes(&mut self, buf: &mut [u8]) -> bool;
}
