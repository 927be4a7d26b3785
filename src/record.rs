//! Decoded representation of one oscilloscope transmission.

use std::fmt;

/// Number of samples the firmware dumps per transmission, single channel.
pub const SAMPLES_PER_FRAME: usize = 2048;

/// Horizontal resolution of the DSO-138: 25 samples per time division.
pub const SAMPLES_PER_DIVISION: f64 = 25.0;

/// Time-base unit as labelled by the device.
///
/// The variant spelling follows the firmware (`uS`, `mS`, `S`); `Display`
/// reproduces it so axis labels and the console report match the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Micro,
    Milli,
    Seconds,
}

impl TimeUnit {
    /// Factor converting one unit of the *raw* device value to seconds.
    ///
    /// `Milli` maps to 1.0 because the decoder already divides `mS` scale
    /// values by 1000 (see the decoder's normalization policy).
    pub fn decoded_to_seconds(self) -> f64 {
        match self {
            TimeUnit::Micro => 1e-6,
            TimeUnit::Milli => 1.0,
            TimeUnit::Seconds => 1.0,
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TimeUnit::Micro => "uS",
            TimeUnit::Milli => "mS",
            TimeUnit::Seconds => "S",
        };
        f.write_str(label)
    }
}

/// Vertical unit inferred from the voltage scale label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoltageUnit {
    MilliVolts,
    Volts,
}

impl fmt::Display for VoltageUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            VoltageUnit::MilliVolts => "mV",
            VoltageUnit::Volts => "V",
        };
        f.write_str(label)
    }
}

/// One fully decoded, validated oscilloscope transmission.
///
/// Created fresh by the decoder each acquisition cycle and handed to
/// read-only consumers (the console reporter and the plot renderers). Not
/// mutated after construction and not shared across cycles.
#[derive(Debug, Clone)]
pub struct CaptureRecord {
    /// Time per division. `mS` values arrive divided by 1000 (seconds);
    /// `uS` and `S` values are stored exactly as transmitted, paired with
    /// `time_unit`.
    pub time_scale: f64,
    /// Unit label as transmitted, kept for display.
    pub time_unit: TimeUnit,
    /// Raw voltage scale label, e.g. `200mV/div`.
    pub voltage_scale: String,
    /// Unit inferred from the scale label's fixed marker character.
    pub voltage_unit: VoltageUnit,
    /// Coupling mode with commas stripped, e.g. `DC`.
    pub coupling: String,
    /// Voltage statistics (Vmax, Vmin, Vavr, Vpp, Vrms) in transmission
    /// order. Values are the device's decimal strings; the unit is implied
    /// by `voltage_unit`.
    pub voltage_stats: Vec<(String, String)>,
    /// Signal statistics (Freq, Cycle, PW, Duty) in transmission order.
    pub signal_stats: Vec<(String, String)>,
    /// Exactly [`SAMPLES_PER_FRAME`] voltage readings of the one monitored
    /// channel; the decoder rejects any other count.
    pub samples: Vec<f64>,
}

impl CaptureRecord {
    /// Time axis in the record's display unit, one point per sample.
    pub fn time_axis(&self) -> Vec<f64> {
        (0..self.samples.len())
            .map(|i| i as f64 * self.time_scale / SAMPLES_PER_DIVISION)
            .collect()
    }

    /// True seconds between consecutive samples.
    ///
    /// Unlike the original tool, each unit is converted to seconds exactly
    /// once here (the original divided `mS` values by 1000 a second time in
    /// its FFT path).
    pub fn sample_period(&self) -> f64 {
        self.time_scale * self.time_unit.decoded_to_seconds() / SAMPLES_PER_DIVISION
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(unit: TimeUnit, scale: f64) -> CaptureRecord {
        CaptureRecord {
            time_scale: scale,
            time_unit: unit,
            voltage_scale: "200mV/div".into(),
            voltage_unit: VoltageUnit::MilliVolts,
            coupling: "DC".into(),
            voltage_stats: Vec::new(),
            signal_stats: Vec::new(),
            samples: vec![0.0; SAMPLES_PER_FRAME],
        }
    }

    #[test]
    fn time_axis_spans_divisions() {
        let rec = record(TimeUnit::Micro, 100.0);
        let axis = rec.time_axis();
        assert_eq!(axis.len(), SAMPLES_PER_FRAME);
        assert_eq!(axis[0], 0.0);
        assert_eq!(axis[25], 100.0);
    }

    #[test]
    fn sample_period_converts_each_unit_once() {
        // 100 uS/div -> 4 us per sample.
        assert!((record(TimeUnit::Micro, 100.0).sample_period() - 4e-6).abs() < 1e-12);
        // 2.5 mS/div arrives as 0.0025 s/div -> 100 us per sample.
        assert!((record(TimeUnit::Milli, 0.0025).sample_period() - 1e-4).abs() < 1e-12);
        // 1 S/div -> 40 ms per sample.
        assert!((record(TimeUnit::Seconds, 1.0).sample_period() - 0.04).abs() < 1e-12);
    }

    #[test]
    fn unit_labels_match_device_spelling() {
        assert_eq!(TimeUnit::Micro.to_string(), "uS");
        assert_eq!(TimeUnit::Milli.to_string(), "mS");
        assert_eq!(TimeUnit::Seconds.to_string(), "S");
        assert_eq!(VoltageUnit::MilliVolts.to_string(), "mV");
        assert_eq!(VoltageUnit::Volts.to_string(), "V");
    }
}
