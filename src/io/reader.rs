//! Serial RFID reader transport
//!
//! Protocol:
//! - Command: the 5-byte UID query `FF CA 00 00 00`
//! - Response: `[len][uid bytes x len][SW1][SW2]`
//! - `SW1 SW2 == 90 00` with a non-empty UID means card present; any other
//!   status means no card
//!
//! Responses can arrive chunked, so a persistent read buffer accumulates
//! bytes across reads and resynchronizes on an implausible length byte.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::info;

pub const DEFAULT_READER_DEVICE: &str = "/dev/ttyUSB0";
pub const DEFAULT_READER_BAUD: u32 = 115_200;

const UID_QUERY: [u8; 5] = [0xFF, 0xCA, 0x00, 0x00, 0x00];
const SW1_OK: u8 = 0x90;
const SW2_OK: u8 = 0x00;
/// ISO 14443 UIDs are 4, 7 or 10 bytes; anything longer is line noise
const MAX_UID_LEN: usize = 10;

const READ_CHUNK_TIMEOUT: Duration = Duration::from_millis(50);
/// Maximum read attempts per query before giving up (prevents infinite loop)
const MAX_READ_ATTEMPTS: usize = 50;

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("no rfid reader available: {0}")]
    Unavailable(String),
    #[error("reader transmit failed: {0}")]
    Transmit(String),
    #[error("reader response timeout")]
    Timeout,
}

/// Result of one UID query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Card present, UID as uppercase hex
    Tag(String),
    NoCard,
}

/// Low-level reader transport the scan loop drives. Acquisition failures
/// and transmit faults are distinct: the first is retried slowly, the
/// second resets tag state and drops the connection.
#[async_trait]
pub trait ReaderPort: Send {
    async fn acquire(&mut self) -> Result<(), ReaderError>;
    fn is_acquired(&self) -> bool;
    async fn read_uid(&mut self) -> Result<ScanOutcome, ReaderError>;
    fn release(&mut self);
}

enum FrameParse {
    Incomplete,
    /// Discard this many leading bytes and re-parse
    Resync(usize),
    Complete(ScanOutcome, usize),
}

fn parse_response(buf: &[u8]) -> FrameParse {
    let Some(&len_byte) = buf.first() else {
        return FrameParse::Incomplete;
    };
    let len = len_byte as usize;
    if len > MAX_UID_LEN {
        return FrameParse::Resync(1);
    }
    let total = 1 + len + 2;
    if buf.len() < total {
        return FrameParse::Incomplete;
    }

    let sw1 = buf[1 + len];
    let sw2 = buf[2 + len];
    let outcome = if sw1 == SW1_OK && sw2 == SW2_OK && len > 0 {
        ScanOutcome::Tag(hex::encode_upper(&buf[1..1 + len]))
    } else {
        ScanOutcome::NoCard
    };
    FrameParse::Complete(outcome, total)
}

pub struct SerialReader {
    device: String,
    baud: u32,
    port: Option<SerialStream>,
    read_buffer: Vec<u8>,
}

impl SerialReader {
    pub fn new(device: impl Into<String>, baud: u32) -> Self {
        Self {
            device: device.into(),
            baud,
            port: None,
            read_buffer: Vec::with_capacity(64),
        }
    }
}

#[async_trait]
impl ReaderPort for SerialReader {
    async fn acquire(&mut self) -> Result<(), ReaderError> {
        let port = tokio_serial::new(&self.device, self.baud)
            .timeout(Duration::from_millis(100))
            .open_native_async()
            .map_err(|e| ReaderError::Unavailable(e.to_string()))?;
        info!(device = %self.device, baud = %self.baud, "reader_acquired");
        self.port = Some(port);
        self.read_buffer.clear();
        Ok(())
    }

    fn is_acquired(&self) -> bool {
        self.port.is_some()
    }

    async fn read_uid(&mut self) -> Result<ScanOutcome, ReaderError> {
        let port = self
            .port
            .as_mut()
            .ok_or_else(|| ReaderError::Unavailable("port not open".to_string()))?;

        port.write_all(&UID_QUERY)
            .await
            .map_err(|e| ReaderError::Transmit(e.to_string()))?;

        let mut chunk = [0u8; 64];
        let mut attempts = 0;
        loop {
            loop {
                match parse_response(&self.read_buffer) {
                    FrameParse::Complete(outcome, consumed) => {
                        self.read_buffer.drain(..consumed);
                        return Ok(outcome);
                    }
                    FrameParse::Resync(skip) => {
                        self.read_buffer.drain(..skip);
                    }
                    FrameParse::Incomplete => break,
                }
            }

            attempts += 1;
            if attempts > MAX_READ_ATTEMPTS {
                return Err(ReaderError::Timeout);
            }

            match tokio::time::timeout(READ_CHUNK_TIMEOUT, port.read(&mut chunk)).await {
                Ok(Ok(0)) => {
                    return Err(ReaderError::Transmit("reader closed connection".to_string()))
                }
                Ok(Ok(n)) => self.read_buffer.extend_from_slice(&chunk[..n]),
                Ok(Err(e)) if e.kind() == ErrorKind::TimedOut => {}
                Ok(Err(e)) => return Err(ReaderError::Transmit(e.to_string())),
                Err(_) => {} // chunk timeout, keep accumulating
            }
        }
    }

    fn release(&mut self) {
        self.port = None;
        self.read_buffer.clear();
    }
}
