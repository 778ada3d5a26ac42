//! This module contains the pure, stateless kernels for bit-plane swapping.
//!
//! Every word of `W::BITS` bits is cut into planes of `plane_bits` bits, most
//! significant plane first. The output stream holds plane 0 of every word, then
//! plane 1 of every word, and so on, packed MSB-first into words of the same width.
//! Slowly varying data ends up with long runs of zero planes at the front, which a
//! following general-purpose compressor removes cheaply.
//!
//! The transform is a permutation of bits: element count and byte size are preserved.

use crate::error::PipelineError;
use crate::traits::Word;
use crate::utils::{bytes_to_words, write_words};

//==================================================================================
// 1. Core Logic
//==================================================================================

fn check_plane_bits<W: Word>(plane_bits: u32) -> Result<(), PipelineError> {
    if plane_bits == 0 || plane_bits > W::BITS || W::BITS % plane_bits != 0 {
        return Err(PipelineError::InternalError(format!(
            "bit plane width {} does not divide a {}-bit word",
            plane_bits,
            W::BITS
        )));
    }
    Ok(())
}

fn plane_mask(plane_bits: u32) -> u64 {
    if plane_bits >= 64 {
        u64::MAX
    } else {
        (1u64 << plane_bits) - 1
    }
}

/// Scatters the planes of `input` into plane-major order.
pub fn encode_words<W: Word>(input: &[W], plane_bits: u32) -> Result<Vec<W>, PipelineError> {
    check_plane_bits::<W>(plane_bits)?;
    let planes = W::BITS / plane_bits;
    let mask = plane_mask(plane_bits);
    let word_bits = W::BITS as usize;

    let mut out = vec![W::zero(); input.len()];
    let mut pos = 0usize;
    for p in 0..planes {
        let shift = W::BITS - plane_bits * (p + 1);
        for &word in input {
            let chunk = (word.widen() >> shift) & mask;
            let idx = pos / word_bits;
            let place = W::BITS - (pos % word_bits) as u32 - plane_bits;
            out[idx] = out[idx] | W::narrow(chunk << place);
            pos += plane_bits as usize;
        }
    }
    Ok(out)
}

/// Gathers plane-major words back into their original layout.
pub fn decode_words<W: Word>(input: &[W], plane_bits: u32) -> Result<Vec<W>, PipelineError> {
    check_plane_bits::<W>(plane_bits)?;
    let planes = W::BITS / plane_bits;
    let mask = plane_mask(plane_bits);
    let word_bits = W::BITS as usize;

    let mut out = vec![W::zero(); input.len()];
    let mut pos = 0usize;
    for p in 0..planes {
        let shift = W::BITS - plane_bits * (p + 1);
        for slot in out.iter_mut() {
            let idx = pos / word_bits;
            let place = W::BITS - (pos % word_bits) as u32 - plane_bits;
            let chunk = (input[idx].widen() >> place) & mask;
            *slot = *slot | W::narrow(chunk << shift);
            pos += plane_bits as usize;
        }
    }
    Ok(out)
}

//==================================================================================
// 2. Public API (byte buffers in, bytes written out)
//==================================================================================

pub fn encode<W: Word>(input: &[u8], output: &mut [u8], plane_bits: u32) -> Result<usize, PipelineError> {
    let words = bytes_to_words::<W>(input)?;
    write_words(&encode_words(&words, plane_bits)?, output)
}

pub fn decode<W: Word>(input: &[u8], output: &mut [u8], plane_bits: u32) -> Result<usize, PipelineError> {
    let words = bytes_to_words::<W>(input)?;
    write_words(&decode_words(&words, plane_bits)?, output)
}

//==================================================================================
// 3. Unit Tests
//==================================================================================
