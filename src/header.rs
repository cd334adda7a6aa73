//! Parsing of the ASCII DADA header

use std::{
    collections::HashMap,
    fs::File,
    io::Read,
    num::ParseIntError,
    path::{Path, PathBuf},
    str::FromStr,
};

use chrono::NaiveDateTime;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{BAND_START_MHZ, CHANNEL_BANDWIDTH_MHZ, HEADER_SIZE, SUPPORTED_ORDER};

/// Timestamp layout heimdall and the capture pipeline write into UTC_START
pub const UTC_START_FORMAT: &str = "%Y-%m-%d-%H:%M:%S";

#[derive(Error, Debug)]
pub enum HeaderError {
    #[error("Header is missing the required key {0}")]
    MissingKey(&'static str),

    #[error("Header key {key} has value '{value}', which isn't a valid number: {source}")]
    Parse {
        key: &'static str,
        value: String,
        source: ParseIntError,
    },

    #[error("Couldn't read the header of {path}: {source}")]
    IO {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// The fields of a DADA header this tool needs, plus everything else verbatim
#[derive(Debug, Clone, PartialEq)]
pub struct DadaHeader {
    pub nbit: usize,
    pub ndim: usize,
    pub npol: usize,
    pub nchan: usize,
    pub nant: usize,
    pub order: String,
    pub inner_t: usize,
    pub hdr_size: usize,
    pub chan0_idx: usize,
    pub utc_start: Option<NaiveDateTime>,
    pub source: Option<String>,
    pub telescope: Option<String>,
    raw: HashMap<String, String>,
}

/// Split the header text into key/value pairs.
/// Comments, blank lines and lines without a space are skipped; later keys win.
fn key_values(text: &str) -> HashMap<String, String> {
    let mut pairs = HashMap::new();
    for line in text.lines() {
        if line.is_empty() || line.starts_with('#') || !line.contains(' ') {
            continue;
        }
        let line = line.trim_start();
        let mut split = line.splitn(2, char::is_whitespace);
        let key = match split.next() {
            Some(k) if !k.is_empty() => k,
            _ => continue,
        };
        let value = split.next().unwrap_or_default().trim();
        pairs.insert(key.to_owned(), value.to_owned());
    }
    pairs
}

fn required<'a>(
    pairs: &'a HashMap<String, String>,
    key: &'static str,
) -> Result<&'a str, HeaderError> {
    pairs
        .get(key)
        .map(String::as_str)
        .ok_or(HeaderError::MissingKey(key))
}

fn required_num<T>(pairs: &HashMap<String, String>, key: &'static str) -> Result<T, HeaderError>
where
    T: FromStr<Err = ParseIntError>,
{
    let value = required(pairs, key)?;
    value.parse().map_err(|source| HeaderError::Parse {
        key,
        value: value.to_owned(),
        source,
    })
}

impl DadaHeader {
    /// Parse the text of a header block
    pub fn parse(text: &str) -> Result<Self, HeaderError> {
        let pairs = key_values(text);

        let utc_start = match pairs.get("UTC_START") {
            Some(s) => match NaiveDateTime::parse_from_str(s, UTC_START_FORMAT) {
                Ok(t) => Some(t),
                Err(e) => {
                    warn!("Ignoring UTC_START '{}': {}", s, e);
                    None
                }
            },
            None => None,
        };

        Ok(Self {
            nbit: required_num(&pairs, "NBIT")?,
            ndim: required_num(&pairs, "NDIM")?,
            npol: required_num(&pairs, "NPOL")?,
            nchan: required_num(&pairs, "NCHAN")?,
            nant: required_num(&pairs, "NANT")?,
            order: required(&pairs, "ORDER")?.to_owned(),
            inner_t: required_num(&pairs, "INNER_T")?,
            hdr_size: required_num(&pairs, "HDR_SIZE")?,
            chan0_idx: required_num(&pairs, "CHAN0_IDX")?,
            utc_start,
            source: pairs.get("SOURCE").cloned(),
            telescope: pairs.get("TELESCOPE").cloned(),
            raw: pairs,
        })
    }

    /// Read and parse the header block at the start of a DADA file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, HeaderError> {
        let path = path.as_ref();
        let io_err = |source| HeaderError::IO {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(io_err)?;
        let mut block = Vec::with_capacity(HEADER_SIZE);
        file.take(HEADER_SIZE as u64)
            .read_to_end(&mut block)
            .map_err(io_err)?;
        // The header is NUL padded out to its full size
        if let Some(end) = block.iter().position(|&b| b == 0) {
            block.truncate(end);
        }
        debug!("Read {} header bytes from {}", block.len(), path.display());
        Self::parse(&String::from_utf8_lossy(&block))
    }

    /// Raw value of any header key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.raw.get(key).map(String::as_str)
    }

    /// Frequency of the lowest channel in the file (MHz)
    pub fn lowest_freq_mhz(&self) -> f64 {
        self.chan0_idx as f64 * CHANNEL_BANDWIDTH_MHZ + BAND_START_MHZ
    }

    /// Lower edge of channel `chan` in this file (MHz)
    pub fn channel_freq_mhz(&self, chan: usize) -> f64 {
        self.lowest_freq_mhz() + chan as f64 * CHANNEL_BANDWIDTH_MHZ
    }

    pub fn is_supported_order(&self) -> bool {
        self.order == SUPPORTED_ORDER
    }

    /// Number of `i8` values in one TAFTP time block, `None` if the
    /// dimensions overflow
    pub fn block_len(&self) -> Option<usize> {
        [self.nchan, self.inner_t, self.npol, self.ndim]
            .iter()
            .try_fold(self.nant, |acc, &dim| acc.checked_mul(dim))
    }

    /// How many whole time blocks a payload of `payload_len` values holds
    pub fn num_blocks(&self, payload_len: usize) -> Option<usize> {
        match self.block_len()? {
            0 => Some(0),
            n => Some(payload_len / n),
        }
    }
}
