//! Framed exchange procedures.
//!
//! Every operation returns an explicit result; a failure aborts the
//! current exchange and is never retried at this layer (the next periodic
//! refresh naturally retries reads). The only true suspension point is
//! the byte-availability wait in [`Engine::read_exact`]; every other
//! await resolves within the same scheduler tick.

use core::cell::RefCell;

use comfolink_protocol::frame::{
    FrameError, Request, Response, ResponseDecoder, ACK, ACK_SEQUENCE, ESCAPE,
};

use crate::scheduler::yield_now;
use crate::traits::SerialPort;

/// Errors terminating a single exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ExchangeError {
    /// Framing or semantic protocol violation
    Frame(FrameError),
    /// The transport failed to deliver bytes it reported available
    Transport,
    /// A response carried a different payload size than the query expects
    UnexpectedLength { expected: usize, received: usize },
}

impl From<FrameError> for ExchangeError {
    fn from(err: FrameError) -> Self {
        Self::Frame(err)
    }
}

/// Protocol engine: owns the transport and speaks the framed protocol.
///
/// Exchange procedures are suspendable and run as (parts of) tasks on the
/// scheduler, which guarantees the transport a single owner at any
/// instant.
pub struct Engine<P> {
    port: RefCell<P>,
}

impl<P: SerialPort> Engine<P> {
    pub fn new(port: P) -> Self {
        Self {
            port: RefCell::new(port),
        }
    }

    /// Wait until `buf.len()` bytes are available, then read them.
    ///
    /// Yields one scheduler tick per iteration while the transport
    /// starves. This is the driver's only true suspension point; there is
    /// no deadline, a stalled transport parks the task until bytes arrive.
    pub async fn read_exact(&self, buf: &mut [u8]) -> Result<(), ExchangeError> {
        while self.port.borrow().bytes_available() < buf.len() {
            yield_now().await;
        }

        if self.port.borrow_mut().read_bytes(buf) {
            Ok(())
        } else {
            Err(ExchangeError::Transport)
        }
    }

    /// Read a single byte.
    pub async fn read_byte(&self) -> Result<u8, ExchangeError> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf).await?;
        Ok(buf[0])
    }

    /// Transmit a framed command and await the unit's acknowledgement.
    ///
    /// Oversized payloads are rejected before anything touches the wire.
    pub async fn send_command(&self, command: u16, data: &[u8]) -> Result<(), ExchangeError> {
        let request = Request::new(command, data)?;
        let encoded = request.encode_to_vec()?;
        self.port.borrow_mut().write_bytes(&encoded);
        self.read_ack().await
    }

    /// Receive and verify the response to `command`.
    ///
    /// Accepts at most `capacity` data bytes. The frame must start
    /// immediately: markers are matched exactly, stray bytes are a
    /// framing error here. On success the response is acknowledged and
    /// returned.
    pub async fn read_response(
        &self,
        command: u16,
        capacity: usize,
    ) -> Result<Response, ExchangeError> {
        let mut decoder = ResponseDecoder::new(command, capacity);
        loop {
            let byte = self.read_byte().await?;
            if let Some(response) = decoder.feed(byte)? {
                self.send_ack();
                return Ok(response);
            }
        }
    }

    /// Send a zero-payload query and require an exact-size response.
    ///
    /// Any deviation, read failure or size mismatch, fails the query as a
    /// whole; no partial data reaches the caller.
    pub async fn query_data(
        &self,
        command: u16,
        expected_len: usize,
    ) -> Result<Response, ExchangeError> {
        self.send_command(command, &[]).await?;

        let response = self.read_response(command, expected_len).await?;
        if response.data.len() != expected_len {
            return Err(ExchangeError::UnexpectedLength {
                expected: expected_len,
                received: response.data.len(),
            });
        }

        Ok(response)
    }

    /// Transmit the acknowledgement sequence.
    pub fn send_ack(&self) {
        self.port.borrow_mut().write_bytes(&ACK_SEQUENCE);
    }

    /// Await the unit's acknowledgement.
    ///
    /// Tolerant of stray bytes: skips until the escape byte, then requires
    /// the ack code; anything else restarts the hunt.
    pub async fn read_ack(&self) -> Result<(), ExchangeError> {
        loop {
            let mut byte = self.read_byte().await?;
            while byte != ESCAPE {
                byte = self.read_byte().await?;
            }
            if self.read_byte().await? == ACK {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::TaskQueue;
    use crate::testutil::MockPort;
    use alloc::rc::Rc;
    use alloc::vec;
    use core::cell::Cell;

    use comfolink_protocol::commands::{CMD_GET_TEMPERATURES, TEMPERATURES_LEN};

    type Outcome<T> = Rc<Cell<Option<T>>>;

    fn outcome<T>() -> Outcome<T> {
        Rc::new(Cell::new(None))
    }

    #[test]
    fn test_send_command_writes_frame_then_awaits_ack() {
        let port = MockPort::new();
        let engine = Rc::new(Engine::new(port.clone()));
        let queue = TaskQueue::new();
        let result: Outcome<bool> = outcome();

        let (engine2, result2) = (engine.clone(), result.clone());
        queue.enqueue(async move {
            result2.set(Some(engine2.send_command(0x0099, &[0x05]).await.is_ok()));
        });

        // The frame left synchronously; the task is parked on the ack
        assert_eq!(
            port.sent(),
            vec![0x07, 0xF0, 0x00, 0x99, 0x01, 0x05, 0x4C, 0x07, 0x0F]
        );
        assert_eq!(result.get(), None);

        queue.poll();
        assert_eq!(result.get(), None);

        port.feed_ack();
        queue.poll();
        assert_eq!(result.get(), Some(true));
    }

    #[test]
    fn test_send_command_rejects_oversized_payload_before_writing() {
        let port = MockPort::new();
        let engine = Rc::new(Engine::new(port.clone()));
        let queue = TaskQueue::new();
        let result: Outcome<Result<(), ExchangeError>> = outcome();

        let (engine2, result2) = (engine.clone(), result.clone());
        queue.enqueue(async move {
            result2.set(Some(engine2.send_command(0x0099, &[0u8; 33]).await));
        });

        assert_eq!(
            result.get(),
            Some(Err(ExchangeError::Frame(FrameError::PayloadTooLarge)))
        );
        assert!(port.sent().is_empty());
    }

    #[test]
    fn test_read_ack_skips_stray_bytes() {
        let port = MockPort::new();
        let engine = Rc::new(Engine::new(port.clone()));
        let queue = TaskQueue::new();
        let result: Outcome<bool> = outcome();

        port.feed(&[0x12, 0x34, 0x07, 0xF3]);

        let (engine2, result2) = (engine.clone(), result.clone());
        queue.enqueue(async move {
            result2.set(Some(engine2.read_ack().await.is_ok()));
        });

        assert_eq!(result.get(), Some(true));
    }

    #[test]
    fn test_read_response_acknowledges_and_returns_payload() {
        let port = MockPort::new();
        let engine = Rc::new(Engine::new(port.clone()));
        let queue = TaskQueue::new();
        let result: Outcome<Result<usize, ExchangeError>> = outcome();

        port.feed_response(CMD_GET_TEMPERATURES, &[1, 2, 3, 4, 5, 6, 7, 8, 9]);

        let (engine2, result2) = (engine.clone(), result.clone());
        queue.enqueue(async move {
            let len = engine2
                .read_response(CMD_GET_TEMPERATURES, TEMPERATURES_LEN)
                .await
                .map(|response| response.data.len());
            result2.set(Some(len));
        });

        assert_eq!(result.get(), Some(Ok(9)));
        assert_eq!(port.sent(), vec![0x07, 0xF3]);
    }

    #[test]
    fn test_read_response_rejects_stray_bytes_before_frame() {
        let port = MockPort::new();
        let engine = Rc::new(Engine::new(port.clone()));
        let queue = TaskQueue::new();
        let result: Outcome<Result<(), ExchangeError>> = outcome();

        port.feed(&[0x00]);
        port.feed_response(CMD_GET_TEMPERATURES, &[0; 9]);

        let (engine2, result2) = (engine.clone(), result.clone());
        queue.enqueue(async move {
            let outcome = engine2
                .read_response(CMD_GET_TEMPERATURES, TEMPERATURES_LEN)
                .await
                .map(|_| ());
            result2.set(Some(outcome));
        });

        assert_eq!(
            result.get(),
            Some(Err(ExchangeError::Frame(FrameError::InvalidMarker)))
        );
    }

    #[test]
    fn test_query_data_requires_exact_response_size() {
        let port = MockPort::new();
        let engine = Rc::new(Engine::new(port.clone()));
        let queue = TaskQueue::new();
        let result: Outcome<Result<(), ExchangeError>> = outcome();

        // Acknowledge the query, then answer with 8 bytes instead of 9
        port.feed_ack();
        port.feed_response(CMD_GET_TEMPERATURES, &[0; 8]);

        let (engine2, result2) = (engine.clone(), result.clone());
        queue.enqueue(async move {
            let outcome = engine2
                .query_data(CMD_GET_TEMPERATURES, TEMPERATURES_LEN)
                .await
                .map(|_| ());
            result2.set(Some(outcome));
        });

        assert_eq!(
            result.get(),
            Some(Err(ExchangeError::UnexpectedLength {
                expected: 9,
                received: 8,
            }))
        );
    }

    #[test]
    fn test_query_data_rejects_overlong_response() {
        let port = MockPort::new();
        let engine = Rc::new(Engine::new(port.clone()));
        let queue = TaskQueue::new();
        let result: Outcome<Result<(), ExchangeError>> = outcome();

        port.feed_ack();
        port.feed_response(CMD_GET_TEMPERATURES, &[0; 10]);

        let (engine2, result2) = (engine.clone(), result.clone());
        queue.enqueue(async move {
            let outcome = engine2
                .query_data(CMD_GET_TEMPERATURES, TEMPERATURES_LEN)
                .await
                .map(|_| ());
            result2.set(Some(outcome));
        });

        assert_eq!(
            result.get(),
            Some(Err(ExchangeError::Frame(FrameError::LengthOutOfRange)))
        );
    }

    #[test]
    fn test_read_exact_resumes_as_bytes_arrive() {
        let port = MockPort::new();
        let engine = Rc::new(Engine::new(port.clone()));
        let queue = TaskQueue::new();
        let result: Outcome<[u8; 3]> = outcome();

        let (engine2, result2) = (engine.clone(), result.clone());
        queue.enqueue(async move {
            let mut buf = [0u8; 3];
            if engine2.read_exact(&mut buf).await.is_ok() {
                result2.set(Some(buf));
            }
        });

        queue.poll();
        assert_eq!(result.get(), None);

        port.feed(&[1, 2]);
        queue.poll();
        assert_eq!(result.get(), None);

        port.feed(&[3]);
        queue.poll();
        assert_eq!(result.get(), Some([1, 2, 3]));
    }

    #[test]
    fn test_read_exact_surfaces_transport_failure() {
        let port = MockPort::new();
        let engine = Rc::new(Engine::new(port.clone()));
        let queue = TaskQueue::new();
        let result: Outcome<Result<(), ExchangeError>> = outcome();

        port.feed(&[1, 2, 3]);
        port.fail_reads();

        let (engine2, result2) = (engine.clone(), result.clone());
        queue.enqueue(async move {
            let mut buf = [0u8; 3];
            result2.set(Some(engine2.read_exact(&mut buf).await));
        });

        assert_eq!(result.get(), Some(Err(ExchangeError::Transport)));
    }
}
