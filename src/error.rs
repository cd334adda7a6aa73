//! Error type for everything that can stop a bandpass from being drawn.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BandpassError {
    #[error("{0}")]
    Header(#[from] crate::header::HeaderError),

    #[error("{0}")]
    Decode(#[from] crate::decode::DecodeError),

    #[error("Invalid selection: {0}")]
    Selection(#[from] crate::spectrum::SelectionError),

    #[error("{0}")]
    Spectrum(#[from] crate::spectrum::SpectrumError),

    #[error("{0}")]
    Plot(#[from] crate::plot::PlotError),
}

impl BandpassError {
    /// Whether the operator asked for something the file can't provide
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            BandpassError::Selection(_)
                | BandpassError::Spectrum(crate::spectrum::SpectrumError::Selection(_))
        )
    }
}
