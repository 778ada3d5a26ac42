//! This module contains the pure, stateless kernels for delta encoding and decoding.
//!
//! The core algorithms are implemented **in-place**; the byte API wraps them to fit
//! the stage contract of reading one buffer and writing another.

use crate::error::PipelineError;
use crate::traits::Word;
use crate::utils::{bytes_to_words, write_words};

//==================================================================================
// 1. Generic Core Logic (In-Place)
//==================================================================================

/// Computes `data[i] = data[i] - data[i - order]` with wrapping arithmetic.
pub fn encode_slice_inplace<W: Word>(data: &mut [W], order: usize) {
    if order == 0 || data.len() <= order {
        return;
    }
    // Iterate backwards to use original values for calculation
    for i in (order..data.len()).rev() {
        data[i] = data[i].wrapping_sub(&data[i - order]);
    }
}

/// Reconstructs the original values with a running sum over `order` lanes.
pub fn decode_slice_inplace<W: Word>(data: &mut [W], order: usize) {
    if order == 0 || data.len() <= order {
        return;
    }
    // Iterate forwards to use the newly-decoded values for subsequent sums
    for i in order..data.len() {
        data[i] = data[i].wrapping_add(&data[i - order]);
    }
}

//==================================================================================
// 2. Public API
//==================================================================================

pub fn encode<W: Word>(input: &[u8], output: &mut [u8], order: usize) -> Result<usize, PipelineError> {
    let mut words = bytes_to_words::<W>(input)?;
    encode_slice_inplace(&mut words, order);
    write_words(&words, output)
}

pub fn decode<W: Word>(input: &[u8], output: &mut [u8], order: usize) -> Result<usize, PipelineError> {
    let mut words = bytes_to_words::<W>(input)?;
    decode_slice_inplace(&mut words, order);
    write_words(&words, output)
}
