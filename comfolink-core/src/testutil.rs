//! Shared test fixtures.

use alloc::collections::VecDeque;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use comfolink_protocol::frame::{response_command, Request, ACK_SEQUENCE};

use crate::traits::SerialPort;

#[derive(Default)]
struct PortState {
    tx: Vec<u8>,
    rx: VecDeque<u8>,
    fail_reads: bool,
}

/// Scripted in-memory serial port.
///
/// Cloning shares the underlying buffers, so a test can keep a handle
/// while the driver owns the port.
#[derive(Clone, Default)]
pub(crate) struct MockPort(Rc<RefCell<PortState>>);

impl MockPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage incoming bytes.
    pub fn feed(&self, bytes: &[u8]) {
        self.0.borrow_mut().rx.extend(bytes.iter().copied());
    }

    /// Stage an acknowledgement from the unit.
    pub fn feed_ack(&self) {
        self.feed(&ACK_SEQUENCE);
    }

    /// Stage a well-formed response frame answering `command`.
    pub fn feed_response(&self, command: u16, payload: &[u8]) {
        let wire = Request::new(response_command(command), payload)
            .unwrap()
            .encode_to_vec()
            .unwrap();
        self.feed(&wire);
    }

    /// Everything the driver wrote so far.
    pub fn sent(&self) -> Vec<u8> {
        self.0.borrow().tx.clone()
    }

    /// Make subsequent reads report failure despite available bytes.
    pub fn fail_reads(&self) {
        self.0.borrow_mut().fail_reads = true;
    }
}

impl SerialPort for MockPort {
    fn write_bytes(&mut self, data: &[u8]) {
        self.0.borrow_mut().tx.extend_from_slice(data);
    }

    fn bytes_available(&self) -> usize {
        self.0.borrow().rx.len()
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> bool {
        let mut state = self.0.borrow_mut();
        if state.fail_reads || state.rx.len() < buf.len() {
            return false;
        }
        for slot in buf.iter_mut() {
            *slot = state.rx.pop_front().unwrap();
        }
        true
    }
}
