//! Console report of the device settings and statistics blocks.

use std::io::{self, Write};

use crate::record::CaptureRecord;

const DELIMITER_WIDTH: usize = 60;

/// Write the settings line and both statistics blocks.
///
/// The shape mirrors the device tooling's console output: a dashed
/// delimiter, one settings line, then the voltage statistics with the
/// display unit appended and the signal statistics with `Hz` appended to
/// `Freq`. Takes any writer so tests can capture the output.
pub fn write_summary<W: Write>(out: &mut W, record: &CaptureRecord) -> io::Result<()> {
    writeln!(out, "{}", "-".repeat(DELIMITER_WIDTH))?;
    writeln!(
        out,
        "Settings: {} coupling, \tresolution: {}, \tunits: {}, {}",
        record.coupling, record.voltage_scale, record.voltage_unit, record.time_unit
    )?;
    for (key, value) in &record.voltage_stats {
        writeln!(out, "{key}:\t\t{value} {}", record.voltage_unit)?;
    }
    for (key, value) in &record.signal_stats {
        if key == "Freq" {
            writeln!(out, "{key}:\t\t{value} Hz")?;
        } else {
            writeln!(out, "{key}:\t\t{value}")?;
        }
    }
    writeln!(out, "{}", "-".repeat(DELIMITER_WIDTH))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{TimeUnit, VoltageUnit, SAMPLES_PER_FRAME};

    #[test]
    fn summary_lists_settings_and_stats() {
        let record = CaptureRecord {
            time_scale: 100.0,
            time_unit: TimeUnit::Micro,
            voltage_scale: "20mV/div".into(),
            voltage_unit: VoltageUnit::MilliVolts,
            coupling: "DC".into(),
            voltage_stats: vec![
                ("Vmax".into(), "1.0".into()),
                ("Vmin".into(), "-1.0".into()),
            ],
            signal_stats: vec![
                ("Freq".into(), "1000".into()),
                ("Duty".into(), "50%".into()),
            ],
            samples: vec![0.0; SAMPLES_PER_FRAME],
        };
        let mut out = Vec::new();
        write_summary(&mut out, &record).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("Settings: DC coupling, \tresolution: 20mV/div, \tunits: mV, uS"));
        assert!(text.contains("Vmax:\t\t1.0 mV"));
        assert!(text.contains("Vmin:\t\t-1.0 mV"));
        assert!(text.contains("Freq:\t\t1000 Hz"));
        assert!(text.contains("Duty:\t\t50%\n"));
        assert_eq!(text.matches(&"-".repeat(60)).count(), 2);
    }
}
