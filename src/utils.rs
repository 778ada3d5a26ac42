//! This module provides a set of shared, low-level utility functions used
//! throughout the voxpipe core.
//!
//! Its primary responsibilities include:
//! 1.  Converting between raw byte slices and typed word vectors. Pipeline buffers
//!     are plain `[u8]` regions with no alignment promise, so reads go through
//!     `bytemuck::pod_collect_to_vec` instead of a zero-copy cast.
//! 2.  Owning the aligned scratch buffers the chains and pipeline ping-pong through.
//! 3.  Shape and thread-count arithmetic shared by every layer.

use crate::error::PipelineError;
use bytemuck::Pod;

//==================================================================================
// 1. Byte <-> Word Conversion
//==================================================================================

/// Copies a byte slice into a freshly allocated, properly aligned `Vec<T>`.
///
/// # Errors
/// Returns `PipelineError::BufferMismatch` if the byte count is not a multiple
/// of `size_of::<T>()`.
pub fn bytes_to_words<T: Pod>(bytes: &[u8]) -> Result<Vec<T>, PipelineError> {
    let width = std::mem::size_of::<T>();
    if bytes.len() % width != 0 {
        return Err(PipelineError::BufferMismatch(width, bytes.len()));
    }
    Ok(bytemuck::pod_collect_to_vec(bytes))
}

/// Writes a typed slice into the front of `out`, returning the bytes written.
pub fn write_words<T: Pod>(words: &[T], out: &mut [u8]) -> Result<usize, PipelineError> {
    let bytes: &[u8] = bytemuck::cast_slice(words);
    if out.len() < bytes.len() {
        return Err(PipelineError::OutputTooSmall {
            needed: bytes.len(),
            available: out.len(),
        });
    }
    out[..bytes.len()].copy_from_slice(bytes);
    Ok(bytes.len())
}

//==================================================================================
// 2. Scratch Buffers
//==================================================================================

/// A zero-initialised byte buffer backed by `u64` storage, so its start is
/// always 8-byte aligned.
#[derive(Debug, Default)]
pub struct ScratchBuffer {
    storage: Vec<u64>,
    len: usize,
}

impl ScratchBuffer {
    pub fn zeroed(len: usize) -> Self {
        Self {
            storage: vec![0u64; len.div_ceil(8)],
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        &bytemuck::cast_slice(&self.storage)[..self.len]
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut bytemuck::cast_slice_mut(&mut self.storage)[..self.len]
    }
}

//==================================================================================
// 3. Shape & Thread Helpers
//==================================================================================

/// Total number of elements described by `shape`. An empty shape holds nothing.
pub fn element_count(shape: &[usize]) -> usize {
    if shape.is_empty() {
        return 0;
    }
    shape.iter().product()
}

/// Clamps a requested thread count into `1..=available_parallelism`.
pub fn clean_number_of_threads(requested: usize) -> usize {
    let available = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    requested.clamp(1, available)
}
