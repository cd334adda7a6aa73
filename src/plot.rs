//! Drawing the bandpass.
//!
//! Plotting is an optional feature, as the font dependencies of plotters
//! can't always be satisfied. Without it, [`render`] returns an error.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::spectrum::{Bandpass, Baseline};

/// The number of X pixels on the plot
pub const X_PIXELS: u32 = 1400;
/// The number of Y pixels on the plot
pub const Y_PIXELS: u32 = 600;
/// Beyond this many channels the tick labels skip channels
pub const MAX_CHANNEL_LABELS: usize = 64;

#[derive(Error, Debug)]
pub enum PlotError {
    #[cfg(not(feature = "plotting"))]
    #[error("dada_bandpass was not compiled with the \"plotting\" feature, rebuild with it enabled to draw bandpasses")]
    NoPlottingFeature,

    #[error("Nothing to plot, the bandpass has no channels")]
    Empty,

    #[error("Error from the plotters library: {0}")]
    Plotters(String),
}

pub fn title(baseline: &Baseline) -> String {
    format!(
        "Combined bandpass across all channels for baseline {}-{} (polarization {})",
        baseline.ant1, baseline.ant2, baseline.pol
    )
}

/// Tick label for position `x` (in channels); the right edge isn't a channel
pub fn channel_label(x: f64, nchan: usize) -> String {
    if x < 0.0 || x >= nchan as f64 {
        String::new()
    } else {
        format!("Ch {:.0}", x)
    }
}

/// Where the plot of `baseline` for `input` ends up: the current directory,
/// named after the input file
pub fn output_path(input: &Path, baseline: &Baseline) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dada".to_owned());
    PathBuf::from(format!(
        "{}_bandpass_{}-{}_pol{}.png",
        stem, baseline.ant1, baseline.ant2, baseline.pol
    ))
}

#[cfg(not(feature = "plotting"))]
pub fn render(_bandpass: &Bandpass, _path: &Path) -> Result<(), PlotError> {
    Err(PlotError::NoPlottingFeature)
}

#[cfg(feature = "plotting")]
pub fn render(bandpass: &Bandpass, path: &Path) -> Result<(), PlotError> {
    use plotters::{prelude::*, style::FontTransform};

    fn draw_err<E: std::error::Error>(e: E) -> PlotError {
        PlotError::Plotters(e.to_string())
    }

    let nchan = bandpass.nchan();
    if nchan == 0 || bandpass.window() == 0 {
        return Err(PlotError::Empty);
    }
    let window = bandpass.window() as f64;
    let y_max = match bandpass.peak() {
        p if p.is_finite() && p > 0.0 => p * 1.05,
        _ => 1.0,
    };

    let root = BitMapBackend::new(path, (X_PIXELS, Y_PIXELS)).into_drawing_area();
    root.fill(&WHITE).map_err(draw_err)?;

    // x is measured in channels, so the tick marks land on channel boundaries
    let mut chart = ChartBuilder::on(&root)
        .caption(title(&bandpass.baseline), ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(70)
        .y_label_area_size(90)
        .build_cartesian_2d(0f64..nchan as f64, 0f64..y_max)
        .map_err(draw_err)?;

    chart
        .configure_mesh()
        .x_labels((nchan + 1).min(MAX_CHANNEL_LABELS))
        .x_label_formatter(&|x| channel_label(*x, nchan))
        .x_label_style(
            ("sans-serif", 14)
                .into_font()
                .transform(FontTransform::Rotate90),
        )
        .y_label_formatter(&|y| format!("{:.1e}", y))
        .x_desc("Frequency index (across all channels)")
        .y_desc("Cross-power spectrum (arbitrary units)")
        .draw()
        .map_err(draw_err)?;

    // One series per channel so neighbouring channels aren't joined up
    for chan in 0..nchan {
        chart
            .draw_series(LineSeries::new(
                bandpass
                    .channel(chan)
                    .iter()
                    .enumerate()
                    .map(|(bin, &p)| (chan as f64 + bin as f64 / window, p)),
                &BLACK,
            ))
            .map_err(draw_err)?;
    }

    root.present().map_err(draw_err)?;
    Ok(())
}
