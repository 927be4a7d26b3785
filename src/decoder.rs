//! Frame decoder for the DLO-138 text dump.
//!
//! The dump has no self-describing schema: every field lives at a fixed line
//! and token position, and the decoder reproduces the device's layout
//! contract verbatim. Each field is extracted by its own function so a
//! firmware layout change breaks one extractor, with a named error, rather
//! than the whole decoder. The only structural safety net against truncated
//! transmissions is the exact 2048-sample count check, which therefore must
//! never be weakened.
//!
//! Layout (0-indexed lines):
//!
//! ```text
//! 0..=1   header, ignored
//! 2       time-scale unit, whitespace token 2, first two chars significant
//! 3       time-scale value, last whitespace token
//! 4       coupling (token 2, commas stripped) and voltage scale (token 4)
//! 5..=7   separators, ignored
//! 8       voltage statistics, ", "-separated key:value entries
//! 9       signal statistics, same shape
//! 10..=11 separators, ignored
//! 12..    exactly 2048 `index<TAB>value` sample lines
//! last 2  trailer, ignored
//! ```

use log::debug;

use crate::acquisition::RawTransmission;
use crate::errors::DecodeError;
use crate::record::{CaptureRecord, TimeUnit, VoltageUnit, SAMPLES_PER_FRAME};

// ============================================================================
// Layout constants
// ============================================================================

const TIME_UNIT_LINE: usize = 2;
const TIME_UNIT_TOKEN: usize = 2;
const TIME_SCALE_LINE: usize = 3;
const CHANNEL_LINE: usize = 4;
const COUPLING_TOKEN: usize = 2;
const VOLTAGE_SCALE_TOKEN: usize = 4;
const VOLTAGE_STATS_LINE: usize = 8;
const SIGNAL_STATS_LINE: usize = 9;
const SAMPLES_FIRST_LINE: usize = 12;
const TRAILER_LINES: usize = 2;

/// The voltage unit marker sits this many characters from the end of the
/// scale label (`200mV/div` → `m`). A character offset, not a substring
/// match; the device text layout guarantees the position.
const UNIT_MARKER_BACK_OFFSET: usize = 6;

const MIN_LINES: usize = SAMPLES_FIRST_LINE + TRAILER_LINES;

// ============================================================================
// Field extractors
// ============================================================================

fn line(transmission: &RawTransmission, index: usize) -> Result<&str, DecodeError> {
    transmission
        .lines()
        .get(index)
        .map(String::as_str)
        .ok_or(DecodeError::TooShort {
            expected: index + 1,
            actual: transmission.len(),
        })
}

fn token<'a>(
    transmission: &'a RawTransmission,
    line_no: usize,
    index: usize,
    field: &'static str,
) -> Result<&'a str, DecodeError> {
    line(transmission, line_no)?
        .split_whitespace()
        .nth(index)
        .ok_or(DecodeError::MissingToken {
            line: line_no,
            token: index,
            field,
        })
}

/// Time-base unit from line 2: the first two characters of token 2.
pub fn time_unit(transmission: &RawTransmission) -> Result<TimeUnit, DecodeError> {
    let tag: String = token(transmission, TIME_UNIT_LINE, TIME_UNIT_TOKEN, "time unit")?
        .chars()
        .take(2)
        .collect();
    match tag.as_str() {
        "mS" => Ok(TimeUnit::Milli),
        "uS" => Ok(TimeUnit::Micro),
        t if t.starts_with('S') => Ok(TimeUnit::Seconds),
        _ => Err(DecodeError::UnknownTimeUnit {
            line: TIME_UNIT_LINE,
            found: tag,
        }),
    }
}

/// Time-base value from line 3: the last whitespace token.
///
/// Normalization policy: `mS` values are divided by 1000 (seconds); `uS` and
/// `S` values are kept as transmitted, paired with the unit. This mirrors
/// the firmware tooling's historical behavior.
pub fn time_scale(transmission: &RawTransmission, unit: TimeUnit) -> Result<f64, DecodeError> {
    let raw = line(transmission, TIME_SCALE_LINE)?
        .split_whitespace()
        .last()
        .ok_or(DecodeError::MissingToken {
            line: TIME_SCALE_LINE,
            token: 0,
            field: "time scale value",
        })?;
    let value: f64 = raw.parse().map_err(|_| DecodeError::NonNumeric {
        field: "time scale",
        value: raw.to_owned(),
    })?;
    Ok(match unit {
        TimeUnit::Milli => value / 1000.0,
        TimeUnit::Micro | TimeUnit::Seconds => value,
    })
}

/// Coupling mode from line 4, token 2, commas stripped.
pub fn coupling(transmission: &RawTransmission) -> Result<String, DecodeError> {
    Ok(token(transmission, CHANNEL_LINE, COUPLING_TOKEN, "coupling")?.replace(',', ""))
}

/// Voltage scale label from line 4, token 4, and the unit inferred from the
/// character at the fixed back offset: `m` means millivolts, anything else
/// volts.
pub fn voltage_scale(
    transmission: &RawTransmission,
) -> Result<(String, VoltageUnit), DecodeError> {
    let label = token(
        transmission,
        CHANNEL_LINE,
        VOLTAGE_SCALE_TOKEN,
        "voltage scale",
    )?;
    if label.len() < UNIT_MARKER_BACK_OFFSET {
        return Err(DecodeError::ScaleLabelTooShort {
            label: label.to_owned(),
        });
    }
    let marker = label.as_bytes()[label.len() - UNIT_MARKER_BACK_OFFSET];
    let unit = if marker == b'm' {
        VoltageUnit::MilliVolts
    } else {
        VoltageUnit::Volts
    };
    Ok((label.to_owned(), unit))
}

/// One statistics block: the trimmed line split on `", "`, each entry split
/// at its first `:`. Order mirrors the transmission and is
/// display-significant.
pub fn stats_block(
    transmission: &RawTransmission,
    line_no: usize,
    block: &'static str,
) -> Result<Vec<(String, String)>, DecodeError> {
    line(transmission, line_no)?
        .trim()
        .split(", ")
        .map(|entry| {
            entry
                .split_once(':')
                .map(|(key, value)| (key.to_owned(), value.to_owned()))
                .ok_or(DecodeError::MissingSeparator {
                    block,
                    entry: entry.to_owned(),
                })
        })
        .collect()
}

/// The sample block: every line from 12 up to the trailer, split on a tab,
/// second field parsed as a decimal value. Any malformed line is fatal, and
/// the decoded count must equal [`SAMPLES_PER_FRAME`] exactly.
pub fn samples(transmission: &RawTransmission) -> Result<Vec<f64>, DecodeError> {
    let lines = transmission.lines();
    if lines.len() < MIN_LINES {
        return Err(DecodeError::TooShort {
            expected: MIN_LINES,
            actual: lines.len(),
        });
    }
    let region = &lines[SAMPLES_FIRST_LINE..lines.len() - TRAILER_LINES];
    let mut values = Vec::with_capacity(region.len());
    for (offset, line) in region.iter().enumerate() {
        let line_no = SAMPLES_FIRST_LINE + offset;
        let field = line
            .split('\t')
            .nth(1)
            .ok_or_else(|| DecodeError::MalformedSample {
                line: line_no,
                content: line.clone(),
            })?;
        let value: f64 = field.parse().map_err(|_| DecodeError::MalformedSample {
            line: line_no,
            content: line.clone(),
        })?;
        values.push(value);
    }
    if values.len() != SAMPLES_PER_FRAME {
        return Err(DecodeError::SampleCount {
            expected: SAMPLES_PER_FRAME,
            actual: values.len(),
        });
    }
    Ok(values)
}

// ============================================================================
// Decode
// ============================================================================

/// Decode one raw transmission into a validated [`CaptureRecord`].
///
/// Fails fast: the first structural mismatch aborts the decode and no
/// partial record is ever exposed.
pub fn decode(transmission: &RawTransmission) -> Result<CaptureRecord, DecodeError> {
    if transmission.len() < MIN_LINES {
        return Err(DecodeError::TooShort {
            expected: MIN_LINES,
            actual: transmission.len(),
        });
    }
    let time_unit = time_unit(transmission)?;
    let time_scale = time_scale(transmission, time_unit)?;
    let coupling = coupling(transmission)?;
    let (voltage_scale, voltage_unit) = voltage_scale(transmission)?;
    let voltage_stats = stats_block(transmission, VOLTAGE_STATS_LINE, "voltage statistics")?;
    let signal_stats = stats_block(transmission, SIGNAL_STATS_LINE, "signal statistics")?;
    let samples = samples(transmission)?;
    debug!(
        "decoded capture: {} samples, {time_scale} {time_unit}/div, {voltage_scale}, {coupling}",
        samples.len()
    );
    Ok(CaptureRecord {
        time_scale,
        time_unit,
        voltage_scale,
        voltage_unit,
        coupling,
        voltage_stats,
        signal_stats,
        samples,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Synthetic transmission following the device layout.
    pub(crate) fn frame_lines(
        unit: &str,
        scale: &str,
        coupling: &str,
        vscale: &str,
        vstats: &str,
        sstats: &str,
        n_samples: usize,
    ) -> Vec<String> {
        let mut lines = vec![
            "DLO-138 waveform dump".to_string(),
            "https://github.com/ardyesp/DLO-138".to_string(),
            format!("Timebase unit: {unit}/div"),
            format!("Timebase value: {scale}"),
            format!("Ch1 coupling {coupling} scale {vscale} probe x1"),
            String::new(),
            String::new(),
            String::new(),
            format!(" {vstats}"),
            format!(" {sstats}"),
            String::new(),
            String::new(),
        ];
        for i in 0..n_samples {
            lines.push(format!("{i}\t{:.4}", (i as f64 * 0.1).sin()));
        }
        lines.push(String::new());
        lines.push(String::new());
        lines
    }

    pub(crate) fn default_frame(n_samples: usize) -> RawTransmission {
        RawTransmission::from_lines(frame_lines(
            "uS",
            "100",
            "DC,",
            "20mV/div",
            "Vmax:1.0V, Vmin:-1.0V",
            "Freq:1000Hz, Duty:50%",
            n_samples,
        ))
    }

    #[test]
    fn full_frame_decodes() {
        let record = decode(&default_frame(SAMPLES_PER_FRAME)).unwrap();
        assert_eq!(record.samples.len(), SAMPLES_PER_FRAME);
        assert_eq!(record.samples[0], 0.0);
        assert!((record.samples[1] - 0.0998).abs() < 1e-9);
    }

    #[test]
    fn wrong_sample_counts_are_rejected() {
        for count in [0usize, 2047, 2049] {
            match decode(&default_frame(count)) {
                Err(DecodeError::SampleCount { expected, actual }) => {
                    assert_eq!(expected, SAMPLES_PER_FRAME);
                    assert_eq!(actual, count);
                }
                other => panic!("count {count}: expected SampleCount, got {other:?}"),
            }
        }
    }

    #[test]
    fn milliseconds_are_normalized_to_seconds() {
        let tx = RawTransmission::from_lines(frame_lines(
            "mS",
            "2.5",
            "DC,",
            "200mV/div",
            "Vmax:1.0V",
            "Freq:50Hz",
            SAMPLES_PER_FRAME,
        ));
        let record = decode(&tx).unwrap();
        assert_eq!(record.time_unit, TimeUnit::Milli);
        assert!((record.time_scale - 0.0025).abs() < 1e-12);
    }

    #[test]
    fn microseconds_are_kept_raw() {
        let record = decode(&default_frame(SAMPLES_PER_FRAME)).unwrap();
        assert_eq!(record.time_unit, TimeUnit::Micro);
        assert_eq!(record.time_scale, 100.0);
    }

    #[test]
    fn plain_seconds_are_kept_raw() {
        let tx = RawTransmission::from_lines(frame_lines(
            "S",
            "1",
            "AC,",
            "0.5V/div",
            "Vmax:1.0V",
            "Freq:1Hz",
            SAMPLES_PER_FRAME,
        ));
        let record = decode(&tx).unwrap();
        assert_eq!(record.time_unit, TimeUnit::Seconds);
        assert_eq!(record.time_scale, 1.0);
    }

    #[test]
    fn voltage_unit_comes_from_the_marker_character() {
        let mv = decode(&default_frame(SAMPLES_PER_FRAME)).unwrap();
        assert_eq!(mv.voltage_unit, VoltageUnit::MilliVolts);
        assert_eq!(mv.voltage_scale, "20mV/div");

        let volts = RawTransmission::from_lines(frame_lines(
            "uS",
            "100",
            "DC,",
            "0.5V/div",
            "Vmax:1.0V",
            "Freq:50Hz",
            SAMPLES_PER_FRAME,
        ));
        assert_eq!(decode(&volts).unwrap().voltage_unit, VoltageUnit::Volts);
    }

    #[test]
    fn short_scale_label_is_rejected() {
        let tx = RawTransmission::from_lines(frame_lines(
            "uS",
            "100",
            "DC,",
            "V/d",
            "Vmax:1.0V",
            "Freq:50Hz",
            SAMPLES_PER_FRAME,
        ));
        assert!(matches!(
            decode(&tx),
            Err(DecodeError::ScaleLabelTooShort { .. })
        ));
    }

    #[test]
    fn stats_preserve_transmission_order() {
        let tx = RawTransmission::from_lines(frame_lines(
            "uS",
            "100",
            "DC,",
            "200mV/div",
            "Vmax:1.2V, Vmin:-1.2V",
            "Freq:50Hz",
            SAMPLES_PER_FRAME,
        ));
        let record = decode(&tx).unwrap();
        assert_eq!(
            record.voltage_stats,
            vec![
                ("Vmax".to_string(), "1.2V".to_string()),
                ("Vmin".to_string(), "-1.2V".to_string()),
            ]
        );
    }

    #[test]
    fn missing_colon_in_stats_is_fatal() {
        let tx = RawTransmission::from_lines(frame_lines(
            "uS",
            "100",
            "DC,",
            "200mV/div",
            "Vmax 1.2V, Vmin:-1.2V",
            "Freq:50Hz",
            SAMPLES_PER_FRAME,
        ));
        match decode(&tx) {
            Err(DecodeError::MissingSeparator { block, entry }) => {
                assert_eq!(block, "voltage statistics");
                assert_eq!(entry, "Vmax 1.2V");
            }
            other => panic!("expected MissingSeparator, got {other:?}"),
        }
    }

    #[test]
    fn non_numeric_time_scale_is_fatal() {
        let tx = RawTransmission::from_lines(frame_lines(
            "uS",
            "fast",
            "DC,",
            "200mV/div",
            "Vmax:1.0V",
            "Freq:50Hz",
            SAMPLES_PER_FRAME,
        ));
        assert!(matches!(
            decode(&tx),
            Err(DecodeError::NonNumeric { field: "time scale", .. })
        ));
    }

    #[test]
    fn malformed_sample_line_is_fatal_with_its_position() {
        let mut lines = frame_lines(
            "uS",
            "100",
            "DC,",
            "200mV/div",
            "Vmax:1.0V",
            "Freq:50Hz",
            SAMPLES_PER_FRAME,
        );
        lines[SAMPLES_FIRST_LINE + 7] = "7 no-tab-here".to_string();
        match decode(&RawTransmission::from_lines(lines)) {
            Err(DecodeError::MalformedSample { line, content }) => {
                assert_eq!(line, SAMPLES_FIRST_LINE + 7);
                assert_eq!(content, "7 no-tab-here");
            }
            other => panic!("expected MalformedSample, got {other:?}"),
        }
    }

    #[test]
    fn unknown_time_unit_is_fatal() {
        let tx = RawTransmission::from_lines(frame_lines(
            "nS",
            "100",
            "DC,",
            "200mV/div",
            "Vmax:1.0V",
            "Freq:50Hz",
            SAMPLES_PER_FRAME,
        ));
        assert!(matches!(
            decode(&tx),
            Err(DecodeError::UnknownTimeUnit { line: 2, .. })
        ));
    }

    #[test]
    fn truncated_header_is_too_short() {
        let tx = RawTransmission::from_lines(vec!["DLO-138".to_string(); 5]);
        assert!(matches!(
            decode(&tx),
            Err(DecodeError::TooShort {
                expected: 14,
                actual: 5
            })
        ));
    }

    #[test]
    fn end_to_end_literal_frame() {
        // The canonical synthetic frame: time unit uS, value 100, label
        // 20mV/div, coupling "DC,", the two stats blocks below.
        let record = decode(&default_frame(SAMPLES_PER_FRAME)).unwrap();
        assert_eq!(record.voltage_unit, VoltageUnit::MilliVolts);
        assert_eq!(record.coupling, "DC");
        assert_eq!(record.time_scale, 100.0);
        assert_eq!(
            record.voltage_stats,
            vec![
                ("Vmax".to_string(), "1.0V".to_string()),
                ("Vmin".to_string(), "-1.0V".to_string()),
            ]
        );
        assert_eq!(
            record.signal_stats,
            vec![
                ("Freq".to_string(), "1000Hz".to_string()),
                ("Duty".to_string(), "50%".to_string()),
            ]
        );
    }
}
