//! Frame encoding and decoding for the ComfoAir serial protocol.
//!
//! Frame format:
//! - ESC + START (2 bytes): frame opening sequence
//! - COMMAND (2 bytes): big-endian command code
//! - LENGTH (1 byte): raw data length (0-32)
//! - DATA (0-32 raw bytes): each literal ESC doubled on the wire
//! - CHECKSUM (1 byte): seed + command + length + raw data, mod 256
//! - ESC + END (2 bytes): frame closing sequence
//!
//! The checksum is computed over unescaped logical bytes and is itself
//! neither escaped nor part of its own sum.

use heapless::Vec;

/// Escape byte prefixing every frame marker
pub const ESCAPE: u8 = 0x07;

/// Start-of-frame marker, preceded by [`ESCAPE`]
pub const START: u8 = 0xF0;

/// End-of-frame marker, preceded by [`ESCAPE`]
pub const END: u8 = 0x0F;

/// Acknowledgement marker, preceded by [`ESCAPE`]
pub const ACK: u8 = 0xF3;

/// Checksum seed
pub const CHECKSUM_SEED: u8 = 173;

/// Maximum raw (unescaped) data bytes per frame
pub const MAX_DATA_LEN: usize = 32;

/// Maximum wire size of a frame: opening sequence + command + length +
/// fully escaped data + checksum + closing sequence
pub const MAX_WIRE_LEN: usize = 2 + 2 + 1 + MAX_DATA_LEN * 2 + 1 + 2;

/// The two-byte acknowledgement sequence
pub const ACK_SEQUENCE: [u8; 2] = [ESCAPE, ACK];

/// Command code a response to `request` must carry
pub const fn response_command(request: u16) -> u16 {
    request.wrapping_add(1)
}

/// Errors that can occur during frame encoding or decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Payload exceeds the maximum data size
    PayloadTooLarge,
    /// Buffer too small for encoding
    BufferTooSmall,
    /// Wrong byte where a marker sequence was required
    InvalidMarker,
    /// Escape byte inside data not followed by a second escape byte
    InvalidEscape,
    /// Response command code does not match request + 1
    CommandMismatch,
    /// Declared data length exceeds the receive capacity
    LengthOutOfRange,
    /// Checksum mismatch
    ChecksumMismatch,
    /// Frame or payload has an invalid structure
    InvalidFrame,
}

/// Running checksum over the unescaped logical bytes of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checksum(u8);

impl Checksum {
    /// Start a new sum at the protocol seed
    pub const fn new() -> Self {
        Self(CHECKSUM_SEED)
    }

    /// Accumulate one logical byte
    pub fn update(&mut self, byte: u8) {
        self.0 = self.0.wrapping_add(byte);
    }

    /// Current sum
    pub const fn value(&self) -> u8 {
        self.0
    }
}

impl Default for Checksum {
    fn default() -> Self {
        Self::new()
    }
}

/// A command frame ready for transmission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Command code
    pub command: u16,
    /// Raw (unescaped) data payload
    pub data: Vec<u8, MAX_DATA_LEN>,
}

impl Request {
    /// Create a request with the given command code and payload
    pub fn new(command: u16, data: &[u8]) -> Result<Self, FrameError> {
        if data.len() > MAX_DATA_LEN {
            return Err(FrameError::PayloadTooLarge);
        }

        let mut payload = Vec::new();
        payload
            .extend_from_slice(data)
            .map_err(|_| FrameError::PayloadTooLarge)?;

        Ok(Self {
            command,
            data: payload,
        })
    }

    /// Create a request with no payload
    pub fn empty(command: u16) -> Self {
        Self {
            command,
            data: Vec::new(),
        }
    }

    /// Number of bytes this request occupies on the wire
    pub fn wire_len(&self) -> usize {
        let doubled = self.data.iter().filter(|&&b| b == ESCAPE).count();
        2 + 2 + 1 + self.data.len() + doubled + 1 + 2
    }

    /// Encode this request into a byte buffer
    ///
    /// Returns the number of bytes written.
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        if buffer.len() < self.wire_len() {
            return Err(FrameError::BufferTooSmall);
        }

        let mut cksum = Checksum::new();
        let mut pos = 0;

        buffer[pos] = ESCAPE;
        buffer[pos + 1] = START;
        pos += 2;

        for byte in self.command.to_be_bytes() {
            buffer[pos] = byte;
            pos += 1;
            cksum.update(byte);
        }

        let len = self.data.len() as u8;
        buffer[pos] = len;
        pos += 1;
        cksum.update(len);

        for &byte in &self.data {
            buffer[pos] = byte;
            pos += 1;
            // Doubled on the wire, counted once in the checksum
            if byte == ESCAPE {
                buffer[pos] = ESCAPE;
                pos += 1;
            }
            cksum.update(byte);
        }

        buffer[pos] = cksum.value();
        buffer[pos + 1] = ESCAPE;
        buffer[pos + 2] = END;
        pos += 3;

        Ok(pos)
    }

    /// Encode this request into a heapless Vec
    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_WIRE_LEN>, FrameError> {
        let mut buffer = [0u8; MAX_WIRE_LEN];
        let len = self.encode(&mut buffer)?;
        let mut vec = Vec::new();
        vec.extend_from_slice(&buffer[..len])
            .map_err(|_| FrameError::BufferTooSmall)?;
        Ok(vec)
    }
}

/// A fully decoded and verified response frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Command code carried by the response (request code + 1)
    pub command: u16,
    /// Raw (unescaped) data payload
    pub data: Vec<u8, MAX_DATA_LEN>,
}

/// State machine decoding one response frame byte by byte
///
/// The decoder is primed with the request command it answers and the
/// number of data bytes the caller can accept. Marker sequences must match
/// exactly; a decode error is terminal and aborts the surrounding
/// exchange, there is no resynchronization on garbage.
#[derive(Debug, Clone)]
pub struct ResponseDecoder {
    state: DecodeState,
    expected_command: u16,
    capacity: usize,
    command: u16,
    declared_len: u8,
    data: Vec<u8, MAX_DATA_LEN>,
    cksum: Checksum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    /// Waiting for the opening ESC
    StartEscape,
    /// Waiting for the START marker
    StartMarker,
    /// Waiting for the command high byte
    CommandHigh,
    /// Waiting for the command low byte
    CommandLow,
    /// Waiting for the data length
    Length,
    /// Reading data bytes
    Data,
    /// Got an ESC inside data, a second ESC must follow
    DataEscape,
    /// Waiting for the checksum
    Checksum,
    /// Waiting for the closing ESC
    EndEscape,
    /// Waiting for the END marker
    EndMarker,
    /// Frame complete
    Done,
}

impl ResponseDecoder {
    /// Create a decoder for the response to `request_command` accepting at
    /// most `capacity` data bytes
    pub fn new(request_command: u16, capacity: usize) -> Self {
        Self {
            state: DecodeState::StartEscape,
            expected_command: response_command(request_command),
            capacity: capacity.min(MAX_DATA_LEN),
            command: 0,
            declared_len: 0,
            data: Vec::new(),
            cksum: Checksum::new(),
        }
    }

    /// Feed a single wire byte to the decoder
    ///
    /// Returns `Ok(Some(response))` once the closing marker has been
    /// verified, `Ok(None)` while more bytes are needed, or `Err` on the
    /// first protocol violation.
    pub fn feed(&mut self, byte: u8) -> Result<Option<Response>, FrameError> {
        match self.state {
            DecodeState::StartEscape => {
                if byte != ESCAPE {
                    return Err(FrameError::InvalidMarker);
                }
                self.state = DecodeState::StartMarker;
                Ok(None)
            }
            DecodeState::StartMarker => {
                if byte != START {
                    return Err(FrameError::InvalidMarker);
                }
                self.state = DecodeState::CommandHigh;
                Ok(None)
            }
            DecodeState::CommandHigh => {
                self.command = (byte as u16) << 8;
                self.cksum.update(byte);
                self.state = DecodeState::CommandLow;
                Ok(None)
            }
            DecodeState::CommandLow => {
                self.command |= byte as u16;
                self.cksum.update(byte);
                if self.command != self.expected_command {
                    return Err(FrameError::CommandMismatch);
                }
                self.state = DecodeState::Length;
                Ok(None)
            }
            DecodeState::Length => {
                if byte as usize > self.capacity {
                    return Err(FrameError::LengthOutOfRange);
                }
                self.declared_len = byte;
                self.cksum.update(byte);
                self.state = if byte == 0 {
                    DecodeState::Checksum
                } else {
                    DecodeState::Data
                };
                Ok(None)
            }
            DecodeState::Data => {
                if byte == ESCAPE {
                    self.state = DecodeState::DataEscape;
                    Ok(None)
                } else {
                    self.push_data(byte);
                    Ok(None)
                }
            }
            DecodeState::DataEscape => {
                if byte != ESCAPE {
                    return Err(FrameError::InvalidEscape);
                }
                // Doubled escape collapses to one literal byte
                self.push_data(byte);
                Ok(None)
            }
            DecodeState::Checksum => {
                if byte != self.cksum.value() {
                    return Err(FrameError::ChecksumMismatch);
                }
                self.state = DecodeState::EndEscape;
                Ok(None)
            }
            DecodeState::EndEscape => {
                if byte != ESCAPE {
                    return Err(FrameError::InvalidMarker);
                }
                self.state = DecodeState::EndMarker;
                Ok(None)
            }
            DecodeState::EndMarker => {
                if byte != END {
                    return Err(FrameError::InvalidMarker);
                }
                self.state = DecodeState::Done;
                Ok(Some(Response {
                    command: self.command,
                    data: self.data.clone(),
                }))
            }
            DecodeState::Done => Err(FrameError::InvalidFrame),
        }
    }

    fn push_data(&mut self, byte: u8) {
        // Cannot overflow, the declared length was checked against capacity
        let _ = self.data.push(byte);
        self.cksum.update(byte);
        self.state = if self.data.len() == self.declared_len as usize {
            DecodeState::Checksum
        } else {
            DecodeState::Data
        };
    }
}
