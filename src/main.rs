use std::process::ExitCode;

use clap::Parser;
use dada_bandpass::{
    decode::{combine_time, read_samples},
    header::UTC_START_FORMAT,
    plot, BandpassError, Baseline, DadaHeader, Spectrometer, FFT_WINDOW,
};
use tracing::{error, info, warn};

mod args;

use args::{convert_filter, Args};

fn run(args: &Args) -> Result<(), BandpassError> {
    let header = DadaHeader::from_file(&args.file)?;
    info!(
        "{}: NANT={} NCHAN={} NPOL={} INNER_T={} ORDER={}",
        args.file.display(),
        header.nant,
        header.nchan,
        header.npol,
        header.inner_t,
        header.order
    );
    info!(
        "Lowest frequency {} MHz, band covers {:.3} - {:.3} MHz",
        header.lowest_freq_mhz(),
        header.channel_freq_mhz(0),
        header.channel_freq_mhz(header.nchan)
    );
    if let Some(source) = &header.source {
        info!("Source {}", source);
    }
    if let Some(start) = &header.utc_start {
        info!("Observation started {}", start.format(UTC_START_FORMAT));
    }

    // Catch a bad selection before reading the whole file
    let baseline = Baseline::new(
        args.antennas[0],
        args.antennas[1],
        args.polarization as usize,
    );
    baseline.validate(header.nant, header.npol)?;

    let samples = read_samples(&args.file, &header)?;
    let series = combine_time(&samples)?;
    drop(samples);

    let spectrometer = Spectrometer::new(FFT_WINDOW)?;
    let bandpass = spectrometer.bandpass(&series, &baseline)?;
    info!(
        "Averaged {} windows of {} samples per channel",
        bandpass.num_chunks, FFT_WINDOW
    );
    if bandpass.discarded > 0 {
        warn!(
            "Dropped the last {} samples of each channel, they don't fill a window",
            bandpass.discarded
        );
    }

    let path = plot::output_path(&args.file, &baseline);
    plot::render(&bandpass, &path)?;
    info!("Wrote {}", path.display());
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(convert_filter(args.verbose.log_level_filter()))
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if e.is_usage() {
                error!("Usage error: {}", e);
                ExitCode::from(2)
            } else {
                error!("{}", e);
                ExitCode::FAILURE
            }
        }
    }
}
