//! Windowed FFT cross-power spectra between two antennas

// For each channel we have a long time series per antenna. To estimate the
// bandpass we
// * split the series into non-overlapping windows (dropping the remainder)
// * FFT each window and move DC to the middle
// * take |X1 * conj(X2)|^2 per bin
// * average over windows

use std::sync::Arc;

use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use rustfft::{Fft, FftPlanner};
use thiserror::Error;
use tracing::debug;

use crate::{complex::Complex32, decode::TimeSeries};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Antenna {ant} is out of range, the file has {nant} antennas")]
    AntennaOutOfRange { ant: usize, nant: usize },

    #[error("Polarization {pol} is out of range, the file has {npol} polarizations")]
    PolarizationOutOfRange { pol: usize, npol: usize },

    #[error("A baseline needs two different antennas, got {0} twice")]
    SameAntenna(usize),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SpectrumError {
    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error("FFT window must be at least one sample")]
    ZeroWindow,

    #[error("Only {available} samples per channel, need at least {window} for one FFT window")]
    TooFewSamples { available: usize, window: usize },

    #[error("Antenna series have different shapes: {0:?} and {1:?}")]
    ShapeMismatch((usize, usize), (usize, usize)),
}

/// The pair of antennas and the polarization to correlate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Baseline {
    pub ant1: usize,
    pub ant2: usize,
    pub pol: usize,
}

impl Baseline {
    pub fn new(ant1: usize, ant2: usize, pol: usize) -> Self {
        Self { ant1, ant2, pol }
    }

    /// Check this baseline makes sense for a file with `nant` antennas and `npol` polarizations
    pub fn validate(&self, nant: usize, npol: usize) -> Result<(), SelectionError> {
        for ant in [self.ant1, self.ant2] {
            if ant >= nant {
                return Err(SelectionError::AntennaOutOfRange { ant, nant });
            }
        }
        if self.ant1 == self.ant2 {
            return Err(SelectionError::SameAntenna(self.ant1));
        }
        if self.pol >= npol {
            return Err(SelectionError::PolarizationOutOfRange {
                pol: self.pol,
                npol,
            });
        }
        Ok(())
    }
}

/// Averaged cross-power of one baseline and polarization, for every channel
#[derive(Debug, Clone)]
pub struct Bandpass {
    pub baseline: Baseline,
    /// Axes (channel, frequency bin), DC in the middle of each channel
    pub power: Array2<f64>,
    /// Windows averaged per channel
    pub num_chunks: usize,
    /// Trailing samples per channel that didn't fill a window
    pub discarded: usize,
}

impl Bandpass {
    pub fn nchan(&self) -> usize {
        self.power.len_of(Axis(0))
    }

    pub fn window(&self) -> usize {
        self.power.len_of(Axis(1))
    }

    pub fn channel(&self, chan: usize) -> ArrayView1<f64> {
        self.power.row(chan)
    }

    /// Position of a bin on the axis that concatenates all channels
    pub fn frequency_index(&self, chan: usize, bin: usize) -> usize {
        chan * self.window() + bin
    }

    /// Largest power anywhere in the band
    pub fn peak(&self) -> f64 {
        self.power.iter().cloned().fold(0.0, f64::max)
    }
}

pub struct Spectrometer {
    window: usize,
    fft: Arc<dyn Fft<f32>>,
}

impl std::fmt::Debug for Spectrometer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Spectrometer")
            .field("window", &self.window)
            .finish()
    }
}

impl Spectrometer {
    pub fn new(window: usize) -> Result<Self, SpectrumError> {
        if window == 0 {
            return Err(SpectrumError::ZeroWindow);
        }
        let mut planner = FftPlanner::new();
        Ok(Self {
            window,
            fft: planner.plan_fft_forward(window),
        })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// FFT `chunk` into `buf` and rotate so the zero-frequency bin sits at `window / 2`
    fn shifted_spectrum(
        &self,
        chunk: ArrayView1<Complex32>,
        buf: &mut [Complex32],
        scratch: &mut [Complex32],
    ) {
        for (dst, src) in buf.iter_mut().zip(chunk.iter()) {
            *dst = *src;
        }
        self.fft.process_with_scratch(buf, scratch);
        buf.rotate_right(self.window / 2);
    }

    /// Average |X1 * conj(X2)|^2 over every whole window of two (time, polarization) series.
    /// Returns the (bin, polarization) power and how many windows went into it.
    pub fn cross_power(
        &self,
        a: ArrayView2<Complex32>,
        b: ArrayView2<Complex32>,
    ) -> Result<(Array2<f64>, usize), SpectrumError> {
        if a.dim() != b.dim() {
            return Err(SpectrumError::ShapeMismatch(a.dim(), b.dim()));
        }
        let npol = a.len_of(Axis(1));
        let mut power = Array2::<f64>::zeros((self.window, npol));
        let num_chunks = self.num_chunks(a.len_of(Axis(0)))?;
        for pol in 0..npol {
            let (pol_power, _) = self.cross_power_pol(a.column(pol), b.column(pol))?;
            power.column_mut(pol).assign(&pol_power);
        }
        Ok((power, num_chunks))
    }

    /// Same as [`Spectrometer::cross_power`] for a single polarization's time series
    pub fn cross_power_pol(
        &self,
        a: ArrayView1<Complex32>,
        b: ArrayView1<Complex32>,
    ) -> Result<(Array1<f64>, usize), SpectrumError> {
        if a.len() != b.len() {
            return Err(SpectrumError::ShapeMismatch((a.len(), 1), (b.len(), 1)));
        }
        let num_chunks = self.num_chunks(a.len())?;

        let zero = Complex32::new(0.0, 0.0);
        let mut spec_a = vec![zero; self.window];
        let mut spec_b = vec![zero; self.window];
        let mut scratch = vec![zero; self.fft.get_inplace_scratch_len()];
        let mut power = Array1::<f64>::zeros(self.window);

        for chunk in 0..num_chunks {
            let span = s![chunk * self.window..(chunk + 1) * self.window];
            self.shifted_spectrum(a.slice(span), &mut spec_a, &mut scratch);
            self.shifted_spectrum(b.slice(span), &mut spec_b, &mut scratch);
            for (p, (x1, x2)) in power.iter_mut().zip(spec_a.iter().zip(spec_b.iter())) {
                let cross = x1 * x2.conj();
                let (re, im) = (cross.re as f64, cross.im as f64);
                *p += re * re + im * im;
            }
        }
        power /= num_chunks as f64;
        Ok((power, num_chunks))
    }

    /// Whole windows in `nsamp` samples, at least one
    fn num_chunks(&self, nsamp: usize) -> Result<usize, SpectrumError> {
        match nsamp / self.window {
            0 => Err(SpectrumError::TooFewSamples {
                available: nsamp,
                window: self.window,
            }),
            n => Ok(n),
        }
    }

    /// Cross-power bandpass of `baseline` across every channel of `series`
    pub fn bandpass(
        &self,
        series: &TimeSeries,
        baseline: &Baseline,
    ) -> Result<Bandpass, SpectrumError> {
        let (nsamp, nant, nchan, npol) = series.dim();
        baseline.validate(nant, npol)?;

        let mut power = Array2::<f64>::zeros((nchan, self.window));
        let mut num_chunks = 0;
        for chan in 0..nchan {
            let a = series.slice(s![.., baseline.ant1, chan, baseline.pol]);
            let b = series.slice(s![.., baseline.ant2, chan, baseline.pol]);
            let (cross, chunks) = self.cross_power_pol(a, b)?;
            debug!(
                "Channel {}: averaged {} windows, peak {:e}",
                chan,
                chunks,
                cross.iter().cloned().fold(0.0, f64::max)
            );
            power.row_mut(chan).assign(&cross);
            num_chunks = chunks;
        }

        Ok(Bandpass {
            baseline: *baseline,
            power,
            num_chunks,
            discarded: nsamp % self.window,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array4;
    use std::f32::consts::PI;

    fn tone(nsamp: usize, npol: usize, bin: usize, window: usize, amp: f32) -> Array2<Complex32> {
        Array2::from_shape_fn((nsamp, npol), |(t, p)| {
            if p == 0 {
                let phase = 2.0 * PI * (bin * t) as f32 / window as f32;
                Complex32::new(amp * phase.cos(), amp * phase.sin())
            } else {
                Complex32::new(0.0, 0.0)
            }
        })
    }

    #[test]
    fn test_zero_window() {
        assert_eq!(Spectrometer::new(0).unwrap_err(), SpectrumError::ZeroWindow);
    }

    #[test]
    fn test_auto_power_is_non_negative() {
        let spec = Spectrometer::new(64).unwrap();
        let data = Array2::from_shape_fn((256, 2), |(t, p)| {
            Complex32::new(((t * 7 + p) % 13) as f32 - 6.0, ((t * 3) % 5) as f32 - 2.0)
        });
        let (power, chunks) = spec.cross_power(data.view(), data.view()).unwrap();
        assert_eq!(chunks, 4);
        assert_eq!(power.dim(), (64, 2));
        assert!(power.iter().all(|&p| p >= 0.0));
        assert!(power.iter().any(|&p| p > 0.0));
    }

    #[test]
    fn test_tone_lands_in_shifted_bin() {
        let window = 32;
        let spec = Spectrometer::new(window).unwrap();
        let data = tone(window * 3, 2, 5, window, 1.0);
        let (power, _) = spec.cross_power(data.view(), data.view()).unwrap();
        let peak_bin = power
            .column(0)
            .iter()
            .enumerate()
            .fold((0, 0.0), |best, (i, &p)| if p > best.1 { (i, p) } else { best })
            .0;
        assert_eq!(peak_bin, 5 + window / 2);
        // |X|^4 with |X| = window for a unit tone
        let expected = (window as f64).powi(4);
        assert!((power[[peak_bin, 0]] - expected).abs() / expected < 1e-3);
        assert!(power.column(1).iter().all(|&p| p == 0.0));
    }

    #[test]
    fn test_remainder_is_dropped() {
        let spec = Spectrometer::new(16).unwrap();
        let mut data = tone(16 * 2 + 5, 1, 3, 16, 1.0);
        // Garbage in the tail must not leak into the average
        for t in 32..37 {
            data[[t, 0]] = Complex32::new(100.0, -100.0);
        }
        let clean = tone(16 * 2, 1, 3, 16, 1.0);
        let (with_tail, chunks) = spec.cross_power(data.view(), data.view()).unwrap();
        let (without_tail, _) = spec.cross_power(clean.view(), clean.view()).unwrap();
        assert_eq!(chunks, 2);
        assert_eq!(with_tail.len_of(Axis(0)), 16);
        assert_eq!(with_tail, without_tail);
    }

    #[test]
    fn test_single_polarization_matches_full() {
        let spec = Spectrometer::new(16).unwrap();
        let a = tone(16 * 3, 2, 4, 16, 1.0);
        let b = Array2::from_shape_fn((16 * 3, 2), |(t, p)| {
            Complex32::new((t % 5) as f32, p as f32 - (t % 3) as f32)
        });
        let (full, chunks) = spec.cross_power(a.view(), b.view()).unwrap();
        for pol in 0..2 {
            let (single, single_chunks) = spec
                .cross_power_pol(a.column(pol), b.column(pol))
                .unwrap();
            assert_eq!(single_chunks, chunks);
            assert_eq!(single, full.column(pol));
        }
    }

    #[test]
    fn test_too_few_samples() {
        let spec = Spectrometer::new(64).unwrap();
        let data = Array2::<Complex32>::zeros((63, 1));
        assert_eq!(
            spec.cross_power(data.view(), data.view()).unwrap_err(),
            SpectrumError::TooFewSamples {
                available: 63,
                window: 64
            }
        );
    }

    #[test]
    fn test_shape_mismatch() {
        let spec = Spectrometer::new(4).unwrap();
        let a = Array2::<Complex32>::zeros((8, 1));
        let b = Array2::<Complex32>::zeros((8, 2));
        assert!(matches!(
            spec.cross_power(a.view(), b.view()),
            Err(SpectrumError::ShapeMismatch(..))
        ));
    }

    #[test]
    fn test_baseline_validation() {
        assert_eq!(Baseline::new(0, 1, 1).validate(2, 2), Ok(()));
        assert_eq!(
            Baseline::new(0, 2, 0).validate(2, 2),
            Err(SelectionError::AntennaOutOfRange { ant: 2, nant: 2 })
        );
        assert_eq!(
            Baseline::new(1, 1, 0).validate(2, 2),
            Err(SelectionError::SameAntenna(1))
        );
        assert_eq!(
            Baseline::new(0, 1, 1).validate(2, 1),
            Err(SelectionError::PolarizationOutOfRange { pol: 1, npol: 1 })
        );
    }

    #[test]
    fn test_bandpass_layout() {
        let window = 8;
        let spec = Spectrometer::new(window).unwrap();
        // Channel 1 of antennas 0 and 1 carries the same tone, everything else is silent
        let series = Array4::from_shape_fn((window * 2 + 3, 2, 3, 2), |(t, a, f, p)| {
            if f == 1 && p == 1 && a < 2 {
                let phase = 2.0 * PI * (2 * t) as f32 / window as f32;
                Complex32::new(phase.cos(), phase.sin())
            } else {
                Complex32::new(0.0, 0.0)
            }
        });
        let bandpass = spec.bandpass(&series, &Baseline::new(0, 1, 1)).unwrap();
        assert_eq!(bandpass.nchan(), 3);
        assert_eq!(bandpass.window(), window);
        assert_eq!(bandpass.num_chunks, 2);
        assert_eq!(bandpass.discarded, 3);
        assert_eq!(bandpass.frequency_index(1, 6), 14);
        assert!(bandpass.channel(0).iter().all(|&p| p == 0.0));
        assert!(bandpass.channel(2).iter().all(|&p| p == 0.0));
        assert!(bandpass.channel(1)[2 + window / 2] > 0.0);
        assert_eq!(bandpass.peak(), bandpass.channel(1)[2 + window / 2]);

        let other_pol = spec.bandpass(&series, &Baseline::new(0, 1, 0)).unwrap();
        assert_eq!(other_pol.peak(), 0.0);
    }

    #[test]
    fn test_bandpass_rejects_bad_baseline() {
        let spec = Spectrometer::new(4).unwrap();
        let series = Array4::<Complex32>::zeros((8, 2, 1, 2));
        assert_eq!(
            spec.bandpass(&series, &Baseline::new(0, 5, 0)).unwrap_err(),
            SpectrumError::Selection(SelectionError::AntennaOutOfRange { ant: 5, nant: 2 })
        );
    }
}
