//! This module contains the pure, stateless kernels for Zstandard compression and
//! decompression into caller-owned slices.
//!
//! This module is a safe, panic-free wrapper around the `zstd` crate's bulk API.
//! A single frame is written per call; the decoded size is known to the caller
//! from the container header, so no length prefix is stored.

use crate::error::PipelineError;

pub const DEFAULT_LEVEL: i32 = 1;

/// Worst-case frame size for `len` input bytes.
pub fn max_compressed_size(len: usize) -> usize {
    zstd::zstd_safe::compress_bound(len)
}

/// Compresses `input` into `output`, returning the frame length.
pub fn compress(input: &[u8], output: &mut [u8], level: i32) -> Result<usize, PipelineError> {
    let mut compressor =
        zstd::bulk::Compressor::new(level).map_err(|e| PipelineError::ZstdError(e.to_string()))?;
    compressor
        .compress_to_buffer(input, output)
        .map_err(|e| PipelineError::ZstdError(e.to_string()))
}

/// Decompresses a single frame into `output`, returning the decoded length.
pub fn decompress(input: &[u8], output: &mut [u8]) -> Result<usize, PipelineError> {
    zstd::bulk::decompress_to_buffer(input, output)
        .map_err(|e| PipelineError::ZstdError(e.to_string()))
}
