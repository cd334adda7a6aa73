//! Bandpass inspection for DADA voltage dumps.
//!
//! A DADA file is a 4096-byte ASCII header followed by 8-bit complex voltages
//! in TAFTP order. We decode those, cross-correlate two antennas channel by
//! channel and plot the averaged cross-power across the whole band.

pub mod complex;
pub mod decode;
pub mod error;
pub mod header;
pub mod plot;
pub mod spectrum;

pub use decode::{decode, read_samples, Samples, TimeSeries};
pub use error::BandpassError;
pub use header::DadaHeader;
pub use spectrum::{Bandpass, Baseline, Spectrometer};

/// Size of the region the ASCII header lives in (bytes)
pub const HEADER_SIZE: usize = 4096;
/// Number of samples per FFT window
pub const FFT_WINDOW: usize = 1024;
/// Width of a single coarse channel (MHz)
pub const CHANNEL_BANDWIDTH_MHZ: f64 = 0.208984375;
/// Bottom of the band that CHAN0_IDX counts up from (MHz)
pub const BAND_START_MHZ: f64 = 856.0;
/// The only sample ordering we know how to unpack
pub const SUPPORTED_ORDER: &str = "TAFTP";
