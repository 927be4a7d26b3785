//! Serial capture, decode and plotting for the DSO-138 oscilloscope running
//! the DLO-138 firmware.
//!
//! The firmware dumps each capture as a fixed-layout text transmission over
//! the serial link, with no framing: no length prefix and no terminator.
//! This crate provides the two core pieces:
//!
//! 1. an acquisition reader that infers end-of-transmission from traffic
//!    quiescence on the unframed byte stream, and
//! 2. a frame decoder that maps the fixed-position text layout to a
//!    validated [`CaptureRecord`] (exactly 2048 samples, normalized units),
//!
//! plus the thin presentation collaborators around them: a console
//! statistics reporter, an FFT magnitude spectrum, and PNG plot renderers
//! for the signal and spectrum views.
//!
//! # Typical cycle
//!
//! ```ignore
//! let port = acquisition::open_port("/dev/ttyUSB0", acquisition::DEFAULT_BAUD_RATE)?;
//! let transmission = AcquisitionReader::new(port).acquire()?;
//! let record = decoder::decode(&transmission)?;
//! report::write_summary(&mut std::io::stdout(), &record)?;
//! let png = plot::render_signal_png(&record, true, &PlotStyle::default())?;
//! ```

pub mod acquisition;
pub mod decoder;
pub mod errors;
pub mod logging;
pub mod plot;
pub mod record;
pub mod report;
pub mod spectrum;

pub use acquisition::{
    open_port, AcquireState, AcquisitionReader, Clock, QuiescenceDetector, RawTransmission,
    SystemClock, Transport, DEFAULT_BAUD_RATE,
};
pub use decoder::decode;
pub use errors::{AcquireError, CaptureError, DecodeError, RenderError, Result};
pub use plot::{render_signal_png, render_spectrum_png, PlotStyle};
pub use record::{CaptureRecord, TimeUnit, VoltageUnit, SAMPLES_PER_FRAME};
pub use report::write_summary;
pub use spectrum::{magnitude_spectrum, Spectrum};
