//! Acquisition reader for the DLO-138 serial waveform dump.
//!
//! The firmware dumps one capture as plain text over the serial link with no
//! length prefix and no terminator sequence, so the end of a transmission
//! cannot be recognized from the bytes themselves. This module infers it
//! from traffic quiescence: bytes are accumulated poll cycle by poll cycle,
//! and the transmission is complete once a full cycle observes no new bytes
//! while the buffer is non-empty.
//!
//! # Timing
//!
//! - Completion is detected one poll cycle *after* the device stops sending.
//!   That latency is deliberate: it makes the detector robust against line
//!   jitter inside a transmission.
//! - Before the first byte arrives the reader idles. By default it idles
//!   forever (a silent device blocks the cycle); an optional startup timeout
//!   bounds that wait.
//! - The per-read serial timeout only prevents busy-blocking; it is never
//!   the completion signal.

use std::io::Read;
use std::thread;
use std::time::Duration;

use log::{debug, info};
use serialport::{ClearBuffer, SerialPort};

use crate::errors::AcquireError;

// ============================================================================
// Constants
// ============================================================================

/// Serial baud rate of the DLO-138 firmware dump.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Bounded per-read timeout on the serial port.
const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Gap between two polls of the receive buffer.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Line terminator used by the firmware.
const LINE_TERMINATOR: &str = "\r\n";

// ============================================================================
// Transport and clock abstractions
// ============================================================================

/// Byte channel the reader polls, typically an open serial port.
///
/// Reading itself goes through [`std::io::Read`]; `available` mirrors the
/// receive-queue query used to decide how much to read per poll cycle.
pub trait Transport: Read {
    /// Number of bytes ready to read without blocking.
    fn available(&mut self) -> Result<usize, AcquireError>;
}

impl Transport for Box<dyn SerialPort> {
    fn available(&mut self) -> Result<usize, AcquireError> {
        Ok(self.bytes_to_read()? as usize)
    }
}

/// Source of inter-poll delays, injectable so tests run without wall-clock
/// waits.
pub trait Clock {
    fn sleep(&mut self, interval: Duration);
}

/// Clock that actually sleeps the calling thread.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&mut self, interval: Duration) {
        thread::sleep(interval);
    }
}

/// Open and configure the device's serial port.
///
/// Pending input is discarded so a capture started mid-transmission does not
/// decode a torn frame.
pub fn open_port(path: &str, baud: u32) -> Result<Box<dyn SerialPort>, AcquireError> {
    let port = serialport::new(path, baud).timeout(READ_TIMEOUT).open()?;
    port.clear(ClearBuffer::Input)?;
    debug!("opened {path} at {baud} baud");
    Ok(port)
}

// ============================================================================
// Quiescence state machine
// ============================================================================

/// Phases of one acquisition cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireState {
    /// No bytes received yet.
    Idle,
    /// At least one byte received; the device is still sending.
    Accumulating,
    /// A full poll cycle passed with no new bytes; the buffer is the whole
    /// transmission. Terminal.
    Complete,
    /// The cycle was aborted by a transport or encoding error. Terminal.
    Failed,
}

/// Tracks the accumulation buffer length across poll cycles and decides when
/// the transmission is over.
#[derive(Debug)]
pub struct QuiescenceDetector {
    state: AcquireState,
    last_len: usize,
}

impl QuiescenceDetector {
    pub fn new() -> Self {
        Self {
            state: AcquireState::Idle,
            last_len: 0,
        }
    }

    /// Feed the buffer length observed by one poll cycle and advance the
    /// state machine.
    pub fn observe(&mut self, buffered: usize) -> AcquireState {
        self.state = match self.state {
            AcquireState::Complete | AcquireState::Failed => self.state,
            AcquireState::Idle if buffered == 0 => AcquireState::Idle,
            _ if buffered == self.last_len => AcquireState::Complete,
            _ => AcquireState::Accumulating,
        };
        self.last_len = buffered;
        self.state
    }

    /// Mark the cycle as aborted.
    pub fn fail(&mut self) {
        self.state = AcquireState::Failed;
    }

    pub fn state(&self) -> AcquireState {
        self.state
    }
}

impl Default for QuiescenceDetector {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Raw transmission
// ============================================================================

/// One complete transmission, split into text lines.
///
/// Produced by [`AcquisitionReader::acquire`] and consumed exactly once by
/// the frame decoder.
#[derive(Debug, Clone)]
pub struct RawTransmission {
    lines: Vec<String>,
}

impl RawTransmission {
    /// Decode a raw byte buffer into lines.
    ///
    /// The firmware emits strict 7-bit ASCII; any byte outside that range
    /// means the transmission is corrupt and is reported, never patched.
    /// Splitting keeps trailing empty segments, exactly as a byte-level
    /// split on the terminator would.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, AcquireError> {
        if let Some(offset) = raw.iter().position(|b| !b.is_ascii()) {
            return Err(AcquireError::Encoding {
                offset,
                byte: raw[offset],
            });
        }
        let text = String::from_utf8_lossy(raw);
        let lines = text.split(LINE_TERMINATOR).map(str::to_owned).collect();
        Ok(Self { lines })
    }

    /// Build a transmission from already-split lines (replays, tests).
    pub fn from_lines(lines: Vec<String>) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

// ============================================================================
// Acquisition reader
// ============================================================================

/// Owns the byte channel for one acquisition cycle and turns the unframed
/// stream into a [`RawTransmission`].
///
/// `acquire` consumes the reader, so the transport is dropped (and the OS
/// handle released) on every exit path, including decode failures.
pub struct AcquisitionReader<T: Transport, C: Clock> {
    transport: T,
    clock: C,
    poll_interval: Duration,
    startup_timeout: Option<Duration>,
}

impl<T: Transport> AcquisitionReader<T, SystemClock> {
    pub fn new(transport: T) -> Self {
        Self::with_clock(transport, SystemClock)
    }
}

impl<T: Transport, C: Clock> AcquisitionReader<T, C> {
    pub fn with_clock(transport: T, clock: C) -> Self {
        Self {
            transport,
            clock,
            poll_interval: DEFAULT_POLL_INTERVAL,
            startup_timeout: None,
        }
    }

    /// Override the gap between receive-buffer polls.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Bound the time spent idling before the first byte. `None` waits
    /// forever, which is the device's historical contract.
    pub fn startup_timeout(mut self, limit: Option<Duration>) -> Self {
        self.startup_timeout = limit;
        self
    }

    /// Run one acquisition cycle to completion.
    pub fn acquire(mut self) -> Result<RawTransmission, AcquireError> {
        let mut detector = QuiescenceDetector::new();
        let result = self
            .accumulate(&mut detector)
            .and_then(|buffer| RawTransmission::from_bytes(&buffer));
        if result.is_err() {
            detector.fail();
        }
        debug!("acquisition cycle ended in state {:?}", detector.state());
        result
    }

    fn accumulate(&mut self, detector: &mut QuiescenceDetector) -> Result<Vec<u8>, AcquireError> {
        info!("waiting for data");
        let mut buffer: Vec<u8> = Vec::new();
        let mut idle_polls: u32 = 0;
        loop {
            let available = self.transport.available()?;
            if available > 0 {
                let mut chunk = vec![0u8; available];
                let n = self.transport.read(&mut chunk)?;
                buffer.extend_from_slice(&chunk[..n]);
            }
            let before = detector.state();
            match detector.observe(buffer.len()) {
                AcquireState::Idle => {
                    idle_polls += 1;
                    if let Some(limit) = self.startup_timeout {
                        if self.poll_interval * idle_polls >= limit {
                            return Err(AcquireError::StartupTimeout(limit));
                        }
                    }
                }
                AcquireState::Accumulating => {
                    if before == AcquireState::Idle {
                        info!("receiving data");
                    }
                    debug!("buffered {} bytes", buffer.len());
                }
                AcquireState::Complete => break,
                AcquireState::Failed => break,
            }
            self.clock.sleep(self.poll_interval);
        }
        info!("transmission complete: {} bytes", buffer.len());
        Ok(buffer)
    }
}
