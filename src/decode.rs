//! Unpacking the raw voltage payload that follows the header

use std::{
    fs::File,
    io::{Read, Seek, SeekFrom},
    path::{Path, PathBuf},
};

use byte_slice_cast::AsSliceOf;
use ndarray::{Array4, Array5, ShapeError};
use thiserror::Error;
use tracing::debug;

use crate::{
    complex::{interleaved, widen, Complex32},
    header::DadaHeader,
};

/// Voltages with axes (time block, antenna, channel, inner time, polarization)
pub type Samples = Array5<Complex32>;

/// Voltages with axes (time, antenna, channel, polarization)
pub type TimeSeries = Array4<Complex32>;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Data order {0} is not supported, only TAFTP can be decoded")]
    UnsupportedOrder(String),

    #[error("Only 8-bit complex samples are supported, header says NBIT={nbit} NDIM={ndim}")]
    UnsupportedSampleFormat { nbit: usize, ndim: usize },

    #[error("Payload of {len} values is not a whole number of {block_len}-value time blocks")]
    SizeMismatch { len: usize, block_len: usize },

    #[error("Header dimensions NANT={nant} NCHAN={nchan} INNER_T={inner_t} NPOL={npol} NDIM={ndim} are too large")]
    DimensionOverflow {
        nant: usize,
        nchan: usize,
        inner_t: usize,
        npol: usize,
        ndim: usize,
    },

    #[error("File contains no samples after the header")]
    NoSamples,

    #[error("Couldn't reinterpret payload bytes: {0}")]
    Cast(#[from] byte_slice_cast::Error),

    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error("Couldn't read the payload of {path}: {source}")]
    IO {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Read every byte after HDR_SIZE
pub fn read_payload<P: AsRef<Path>>(path: P, header: &DadaHeader) -> Result<Vec<u8>, DecodeError> {
    let path = path.as_ref();
    let io_err = |source| DecodeError::IO {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::open(path).map_err(io_err)?;
    file.seek(SeekFrom::Start(header.hdr_size as u64))
        .map_err(io_err)?;
    let mut payload = vec![];
    file.read_to_end(&mut payload).map_err(io_err)?;
    debug!("Read {} payload bytes from {}", payload.len(), path.display());
    Ok(payload)
}

/// Read and decode the voltages of a DADA file
pub fn read_samples<P: AsRef<Path>>(path: P, header: &DadaHeader) -> Result<Samples, DecodeError> {
    // Don't read what we can't decode
    check_format(header)?;
    let payload = read_payload(path, header)?;
    decode(payload.as_slice_of::<i8>()?, header)
}

/// Make sure the header describes a layout we can decode.
/// Returns the number of values in one time block.
pub fn check_format(header: &DadaHeader) -> Result<usize, DecodeError> {
    if !header.is_supported_order() {
        return Err(DecodeError::UnsupportedOrder(header.order.clone()));
    }
    if header.nbit != 8 || header.ndim != 2 {
        return Err(DecodeError::UnsupportedSampleFormat {
            nbit: header.nbit,
            ndim: header.ndim,
        });
    }
    header
        .block_len()
        .ok_or(DecodeError::DimensionOverflow {
            nant: header.nant,
            nchan: header.nchan,
            inner_t: header.inner_t,
            npol: header.npol,
            ndim: header.ndim,
        })
}

/// Shape a flat TAFTP payload into complex voltages
pub fn decode(raw: &[i8], header: &DadaHeader) -> Result<Samples, DecodeError> {
    let block_len = check_format(header)?;
    if raw.is_empty() || block_len == 0 {
        return Err(DecodeError::NoSamples);
    }
    if raw.len() % block_len != 0 {
        return Err(DecodeError::SizeMismatch {
            len: raw.len(),
            block_len,
        });
    }
    let blocks = raw.len() / block_len;
    debug!("Decoding {} time blocks", blocks);
    // Row-major layout of TAFTP is exactly the payload layout
    let voltages: Vec<Complex32> = interleaved(raw).map(widen).collect();
    Ok(Array5::from_shape_vec(
        (
            blocks,
            header.nant,
            header.nchan,
            header.inner_t,
            header.npol,
        ),
        voltages,
    )?)
}

/// Fold the inner time axis into the block axis, giving one continuous
/// series per antenna, channel and polarization
pub fn combine_time(samples: &Samples) -> Result<TimeSeries, DecodeError> {
    let (blocks, nant, nchan, inner_t, npol) = samples.dim();
    // (T, A, F, t, P) -> (T, t, A, F, P)
    let reordered = samples
        .view()
        .permuted_axes([0, 3, 1, 2, 4])
        .as_standard_layout()
        .into_owned();
    Ok(reordered.into_shape_with_order((blocks * inner_t, nant, nchan, npol))?)
}
