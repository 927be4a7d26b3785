use std::io;
use std::time::Duration;
use thiserror::Error;

/// Failures while acquiring one raw transmission from the device.
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("serial error: {0}")]
    Serial(#[from] serialport::Error),
    #[error("non-ASCII byte 0x{byte:02X} at offset {offset}; transmission is corrupt")]
    Encoding { offset: usize, byte: u8 },
    #[error("no data received within {0:?}")]
    StartupTimeout(Duration),
}

/// Failures while decoding a raw transmission into a capture record.
///
/// Every variant names the structural expectation that failed; the decoder
/// never exposes a partially decoded record.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("transmission has {actual} lines, expected at least {expected}")]
    TooShort { expected: usize, actual: usize },
    #[error("line {line} has no token {token} (expected {field} there)")]
    MissingToken {
        line: usize,
        token: usize,
        field: &'static str,
    },
    #[error("unrecognized time unit {found:?} on line {line} (expected mS, uS or S)")]
    UnknownTimeUnit { line: usize, found: String },
    #[error("{field} is not a number: {value:?}")]
    NonNumeric { field: &'static str, value: String },
    #[error("voltage scale label {label:?} is too short to carry a unit marker")]
    ScaleLabelTooShort { label: String },
    #[error("{block} entry {entry:?} is missing a ':' separator")]
    MissingSeparator { block: &'static str, entry: String },
    #[error("sample line {line} is malformed: {content:?}")]
    MalformedSample { line: usize, content: String },
    #[error("decoded {actual} samples, expected exactly {expected}")]
    SampleCount { expected: usize, actual: usize },
}

/// Any failure of one acquire/decode cycle.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("acquisition failed: {0}")]
    Acquire(#[from] AcquireError),
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),
}

/// Failures while rendering a plot.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to render plot: {0}")]
    Plot(String),
}

impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for RenderError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        RenderError::Plot(format!("{value:?}"))
    }
}

impl From<image::ImageError> for RenderError {
    fn from(value: image::ImageError) -> Self {
        RenderError::Plot(value.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CaptureError>;
