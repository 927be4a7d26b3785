//! PNG renderers for the signal and spectrum views.
//!
//! Presentation only: both renderers take the decoded record read-only and
//! return encoded PNG bytes; callers decide where the files go. Styling
//! follows the classic scope look: near-black background, yellow trace,
//! grey grid.

use std::io::Cursor;

use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::errors::RenderError;
use crate::record::CaptureRecord;
use crate::spectrum::Spectrum;

/// Plot dimensions and palette.
#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub background: RGBColor,
    pub trace: RGBColor,
    pub grid: RGBColor,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 700,
            background: RGBColor(10, 10, 10),
            trace: RGBColor(255, 255, 0),
            grid: RGBColor(64, 64, 64),
        }
    }
}

/// Render the signal-vs-time view.
///
/// `show_stats` overlays the two statistics blocks at the top corners, the
/// voltage block right-aligned; the y range gains 30% headroom so the text
/// does not sit on the trace.
pub fn render_signal_png(
    record: &CaptureRecord,
    show_stats: bool,
    style: &PlotStyle,
) -> Result<Vec<u8>, RenderError> {
    let time = record.time_axis();
    let x_max = time.last().copied().unwrap_or(1.0);
    let (mut y_min, mut y_max) = sample_bounds(&record.samples);
    if show_stats {
        y_max += (y_max - y_min) * 0.3;
    }

    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        if (y_max - y_min).abs() < f64::EPSILON {
            y_min -= 1.0;
            y_max += 1.0;
        }
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption("Signal", ("sans-serif", 24).into_font().color(&WHITE))
            .set_label_area_size(LabelAreaPosition::Left, 55)
            .set_label_area_size(LabelAreaPosition::Bottom, 45)
            .build_cartesian_2d(0f64..x_max, y_min..y_max)?;
        chart
            .configure_mesh()
            .light_line_style(style.grid.mix(0.5))
            .bold_line_style(style.grid)
            .axis_style(WHITE.mix(0.6))
            .label_style(("sans-serif", 14).into_font().color(&WHITE))
            .x_desc(format!("time [{}]", record.time_unit))
            .y_desc(format!("voltage [{}]", record.voltage_unit))
            .draw()?;
        chart.draw_series(LineSeries::new(
            time.iter().copied().zip(record.samples.iter().copied()),
            &style.trace,
        ))?;

        if show_stats {
            draw_stats_block(
                &root,
                &record.signal_stats,
                (style.width as i32) / 20,
                HPos::Left,
            )?;
            draw_stats_block(
                &root,
                &record.voltage_stats,
                (style.width as i32) * 19 / 20,
                HPos::Right,
            )?;
        }
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}

/// Render the spectrum view with a log-magnitude axis, clamped to
/// `max_frequency_hz` on the frequency axis.
pub fn render_spectrum_png(
    spectrum: &Spectrum,
    record: &CaptureRecord,
    max_frequency_hz: f64,
    style: &PlotStyle,
) -> Result<Vec<u8>, RenderError> {
    let y_max = spectrum
        .magnitudes
        .iter()
        .copied()
        .fold(0.0f64, f64::max)
        .max(1e-3);
    let y_min = y_max / 1e6;

    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption("FFT", ("sans-serif", 24).into_font().color(&WHITE))
            .set_label_area_size(LabelAreaPosition::Left, 55)
            .set_label_area_size(LabelAreaPosition::Bottom, 45)
            .build_cartesian_2d(0f64..max_frequency_hz, (y_min..y_max).log_scale())?;
        chart
            .configure_mesh()
            .light_line_style(style.grid.mix(0.5))
            .bold_line_style(style.grid)
            .axis_style(WHITE.mix(0.6))
            .label_style(("sans-serif", 14).into_font().color(&WHITE))
            .x_desc("frequency [Hz]")
            .y_desc(format!("amplitude [{}]", record.voltage_unit))
            .draw()?;
        let points = spectrum
            .frequencies_hz
            .iter()
            .zip(spectrum.magnitudes.iter())
            .filter(|(&f, _)| f <= max_frequency_hz)
            .map(|(&f, &m)| (f, m.max(y_min)));
        chart.draw_series(LineSeries::new(points, &style.trace))?;
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}

fn sample_bounds(samples: &[f64]) -> (f64, f64) {
    let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
    let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min.is_finite() && max.is_finite() {
        (min, max)
    } else {
        (-1.0, 1.0)
    }
}

fn draw_stats_block<DB: DrawingBackend>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    stats: &[(String, String)],
    x: i32,
    align: HPos,
) -> Result<(), RenderError>
where
    DB::ErrorType: 'static,
{
    let text_style = ("sans-serif", 15)
        .into_font()
        .color(&WHITE)
        .pos(Pos::new(align, VPos::Top));
    for (i, (key, value)) in stats.iter().enumerate() {
        root.draw(&Text::new(
            format!("{key}:{value}"),
            (x, 45 + i as i32 * 18),
            text_style.clone(),
        ))?;
    }
    Ok(())
}

fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, RenderError> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| RenderError::Plot("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    DynamicImage::ImageRgb8(image).write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}
