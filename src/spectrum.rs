//! Magnitude spectrum of a capture.

use rustfft::{num_complex::Complex, FftPlanner};

use crate::record::CaptureRecord;

/// Single-sided magnitude spectrum of the captured channel.
///
/// Bin 0 (DC) is excluded, matching the signal view's companion plot; the
/// remaining `N/2 - 1` bins carry `2/N`-normalized magnitudes in the
/// record's voltage unit.
#[derive(Debug, Clone)]
pub struct Spectrum {
    pub frequencies_hz: Vec<f64>,
    pub magnitudes: Vec<f64>,
}

/// Forward FFT of the capture's sample block.
///
/// The frequency axis comes from the record's true sample period, so it is
/// correct for every time-base unit.
pub fn magnitude_spectrum(record: &CaptureRecord) -> Spectrum {
    let n = record.samples.len();
    let period = record.sample_period();

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n);
    let mut buffer: Vec<Complex<f64>> = record
        .samples
        .iter()
        .map(|&v| Complex::new(v, 0.0))
        .collect();
    fft.process(&mut buffer);

    let bin_width = 1.0 / (n as f64 * period);
    let frequencies_hz = (1..n / 2).map(|k| k as f64 * bin_width).collect();
    let magnitudes = buffer[1..n / 2]
        .iter()
        .map(|c| 2.0 / n as f64 * c.norm())
        .collect();

    Spectrum {
        frequencies_hz,
        magnitudes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{TimeUnit, VoltageUnit, SAMPLES_PER_FRAME};
    use std::f64::consts::TAU;

    fn sine_record(cycles: usize) -> CaptureRecord {
        // 100 uS/div -> 4 us sample period -> 8.192 ms of signal.
        let samples = (0..SAMPLES_PER_FRAME)
            .map(|i| (TAU * cycles as f64 * i as f64 / SAMPLES_PER_FRAME as f64).sin())
            .collect();
        CaptureRecord {
            time_scale: 100.0,
            time_unit: TimeUnit::Micro,
            voltage_scale: "20mV/div".into(),
            voltage_unit: VoltageUnit::MilliVolts,
            coupling: "DC".into(),
            voltage_stats: Vec::new(),
            signal_stats: Vec::new(),
            samples,
        }
    }

    #[test]
    fn spectrum_excludes_dc_and_covers_half_the_bins() {
        let spectrum = magnitude_spectrum(&sine_record(16));
        assert_eq!(spectrum.frequencies_hz.len(), SAMPLES_PER_FRAME / 2 - 1);
        assert_eq!(spectrum.magnitudes.len(), SAMPLES_PER_FRAME / 2 - 1);
        // First bin is 1 / (N * T), not 0 Hz.
        let bin_width = 1.0 / (SAMPLES_PER_FRAME as f64 * 4e-6);
        assert!((spectrum.frequencies_hz[0] - bin_width).abs() < 1e-6);
    }

    #[test]
    fn pure_sine_peaks_at_its_own_frequency() {
        let cycles = 16;
        let spectrum = magnitude_spectrum(&sine_record(cycles));
        let (peak_idx, peak_mag) = spectrum
            .magnitudes
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .unwrap();
        // Bin k holds k+1 cycles over the window; expect the peak at k = cycles - 1.
        assert_eq!(peak_idx, cycles - 1);
        // 2/N normalization recovers the unit amplitude of the sine.
        assert!((peak_mag - 1.0).abs() < 1e-6);
        let expected_hz = cycles as f64 / (SAMPLES_PER_FRAME as f64 * 4e-6);
        assert!((spectrum.frequencies_hz[peak_idx] - expected_hz).abs() < 1e-6);
    }
}
