//! Helpers for writing synthetic DADA files.

#![allow(dead_code)]

use std::{f64::consts::PI, fs::File, io::Write, path::PathBuf};

use tempfile::TempDir;

pub const HDR_SIZE: usize = 4096;

/// Dimensions of a synthetic TAFTP observation
#[derive(Clone, Copy, Debug)]
pub struct Dims {
    pub blocks: usize,
    pub nant: usize,
    pub nchan: usize,
    pub inner_t: usize,
    pub npol: usize,
}

impl Dims {
    pub fn header(&self, order: &str) -> String {
        self.header_sized(order, HDR_SIZE)
    }

    /// Header text declaring a payload offset of `hdr_size` bytes
    pub fn header_sized(&self, order: &str, hdr_size: usize) -> String {
        format!(
            "HDR_VERSION 1.0\nHDR_SIZE {hdr_size}\nTELESCOPE MeerKAT\nSOURCE synthetic\n\
             UTC_START 2024-01-02-03:04:05\nNBIT 8\nNDIM 2\nNPOL {}\nNCHAN {}\nNANT {}\n\
             ORDER {order}\nINNER_T {}\nCHAN0_IDX 2048\n",
            self.npol, self.nchan, self.nant, self.inner_t
        )
    }

    /// Build a TAFTP payload, asking `sample(time, ant, chan, pol)` for each value
    pub fn payload<F>(&self, sample: F) -> Vec<u8>
    where
        F: Fn(usize, usize, usize, usize) -> (i8, i8),
    {
        let mut raw = vec![];
        for block in 0..self.blocks {
            for ant in 0..self.nant {
                for chan in 0..self.nchan {
                    for it in 0..self.inner_t {
                        for pol in 0..self.npol {
                            let (re, im) = sample(block * self.inner_t + it, ant, chan, pol);
                            raw.push(re as u8);
                            raw.push(im as u8);
                        }
                    }
                }
            }
        }
        raw
    }
}

/// A quantised complex tone at FFT bin `bin` of a `window`-point transform
pub fn tone(time: usize, bin: usize, window: usize, amp: f64) -> (i8, i8) {
    let phase = 2.0 * PI * (bin * time) as f64 / window as f64;
    (
        (amp * phase.cos()).round() as i8,
        (amp * phase.sin()).round() as i8,
    )
}

/// Write `header` (NUL padded to HDR_SIZE) and `payload` into a file in `dir`
pub fn write_dada(dir: &TempDir, name: &str, header: &str, payload: &[u8]) -> PathBuf {
    write_dada_sized(dir, name, header, HDR_SIZE, payload)
}

/// Write `header` NUL padded to `hdr_size` bytes, then `payload` straight after
pub fn write_dada_sized(
    dir: &TempDir,
    name: &str,
    header: &str,
    hdr_size: usize,
    payload: &[u8],
) -> PathBuf {
    let path = dir.path().join(name);
    let mut block = header.as_bytes().to_vec();
    assert!(block.len() < hdr_size, "header too big for the test");
    block.resize(hdr_size, 0);
    let mut f = File::create(&path).expect("couldn't make file");
    f.write_all(&block).unwrap();
    f.write_all(payload).unwrap();
    path
}
