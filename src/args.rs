//! Argument parsing for running from the command line

use std::path::PathBuf;

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};

#[derive(Parser, Debug)]
#[clap(author, version, about = "Plot the bandpass for a given baseline and polarization", long_about = None)]
pub struct Args {
    /// Path to the input DADA file
    #[clap(short, long)]
    pub file: PathBuf,
    /// Polarization index (0 or 1)
    #[clap(short, long)]
    #[clap(value_parser = clap::value_parser!(u8).range(0..=1))]
    pub polarization: u8,
    /// Two antenna indices for the baseline
    #[clap(short, long, required = true, number_of_values = 2, value_names = &["ANT1", "ANT2"])]
    #[clap(multiple_occurrences(false))]
    pub antennas: Vec<usize>,
    #[clap(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

/// Match verbosity filter with tracing subscriber log levels
pub fn convert_filter(filter: log::LevelFilter) -> tracing_subscriber::filter::LevelFilter {
    match filter {
        log::LevelFilter::Off => tracing_subscriber::filter::LevelFilter::OFF,
        log::LevelFilter::Error => tracing_subscriber::filter::LevelFilter::ERROR,
        log::LevelFilter::Warn => tracing_subscriber::filter::LevelFilter::WARN,
        log::LevelFilter::Info => tracing_subscriber::filter::LevelFilter::INFO,
        log::LevelFilter::Debug => tracing_subscriber::filter::LevelFilter::DEBUG,
        log::LevelFilter::Trace => tracing_subscriber::filter::LevelFilter::TRACE,
    }
}
