use std::fs;
use std::io;
use std::process::exit;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use dlo138_rs::{acquisition, decoder, logging, plot, report, spectrum, PlotStyle};

#[derive(Parser, Debug)]
#[command(
    name = "dlo138",
    about = "Capture, decode and plot serial waveform dumps of a DSO-138 with DLO-138 firmware"
)]
struct Args {
    /// Serial port with the USB-TTL converter (e.g., /dev/ttyUSB0, COM5)
    port: String,
    /// Also compute and render the FFT of the captured signal
    #[arg(short, long)]
    fft: bool,
    /// Suppress the statistics text on the signal plot
    #[arg(short = 'n', long)]
    no_stats: bool,
    /// Upper bound of the FFT frequency axis, in Hz
    #[arg(long, default_value_t = 4000.0)]
    xmax: f64,
    /// Serial baud rate
    #[arg(long, default_value_t = acquisition::DEFAULT_BAUD_RATE)]
    baud: u32,
    /// Give up when the device stays silent for this many seconds
    /// (default: wait forever, like the device tooling always has)
    #[arg(long, value_name = "SECONDS")]
    startup_timeout: Option<u64>,
    /// Run a single acquire/decode/plot cycle and exit
    #[arg(long)]
    once: bool,
    /// File prefix for the rendered PNGs
    #[arg(short, long, default_value = "capture")]
    output: String,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        exit(1);
    }
}

fn run() -> Result<()> {
    logging::init();
    let args = Args::parse();
    let startup_timeout = args.startup_timeout.map(Duration::from_secs);

    // One record per cycle: acquire, decode, report, render, repeat. A
    // failed cycle is logged and the loop restarts with a freshly opened
    // port; only a port that cannot be opened at all is fatal.
    loop {
        let port = acquisition::open_port(&args.port, args.baud)
            .with_context(|| format!("failed to open serial port at {}", args.port))?;
        match cycle(port, &args, startup_timeout) {
            Ok(()) => {}
            Err(e) if args.once => return Err(e),
            Err(e) => error!("capture cycle failed: {e:#}"),
        }
        if args.once {
            break;
        }
    }
    Ok(())
}

fn cycle(
    port: Box<dyn serialport::SerialPort>,
    args: &Args,
    startup_timeout: Option<Duration>,
) -> Result<()> {
    let reader = acquisition::AcquisitionReader::new(port).startup_timeout(startup_timeout);
    let transmission = reader.acquire()?;
    let record = decoder::decode(&transmission)?;

    report::write_summary(&mut io::stdout(), &record)?;

    let style = PlotStyle::default();
    let signal_png = plot::render_signal_png(&record, !args.no_stats, &style)?;
    let signal_path = format!("{}_signal.png", args.output);
    fs::write(&signal_path, &signal_png)
        .with_context(|| format!("failed to write {signal_path}"))?;
    info!("wrote {signal_path}");

    if args.fft {
        let spectrum = spectrum::magnitude_spectrum(&record);
        let spectrum_png = plot::render_spectrum_png(&spectrum, &record, args.xmax, &style)?;
        let spectrum_path = format!("{}_fft.png", args.output);
        fs::write(&spectrum_path, &spectrum_png)
            .with_context(|| format!("failed to write {spectrum_path}"))?;
        info!("wrote {spectrum_path}");
    }
    Ok(())
}
