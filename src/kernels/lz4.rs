//! This module contains the LZ4 kernels, a safe wrapper around `lz4_flex`'s block API.
//!
//! The input is cut into independent blocks of `block_size` bytes. Each block is
//! stored as a little-endian `u32` compressed length followed by the LZ4 block.
//! Independent blocks are what allow the thread hint to matter: with more than one
//! thread, blocks are compressed on scoped threads and stitched back in order.

use crate::error::PipelineError;

pub const DEFAULT_BLOCK_SIZE: usize = 256 * 1024;
const BLOCK_PREFIX: usize = 4;

/// Worst-case encoded size for `len` input bytes.
pub fn max_compressed_size(len: usize, block_size: usize) -> usize {
    let block_size = block_size.max(1);
    let full = len / block_size;
    let rem = len % block_size;
    let mut bound = full * (BLOCK_PREFIX + lz4_flex::block::get_maximum_output_size(block_size));
    if rem > 0 {
        bound += BLOCK_PREFIX + lz4_flex::block::get_maximum_output_size(rem);
    }
    bound
}

fn put_block(output: &mut [u8], pos: usize, block: &[u8]) -> Result<usize, PipelineError> {
    let end = pos + BLOCK_PREFIX + block.len();
    if end > output.len() {
        return Err(PipelineError::Lz4Error(format!(
            "output of {} bytes cannot hold block ending at {}",
            output.len(),
            end
        )));
    }
    output[pos..pos + BLOCK_PREFIX].copy_from_slice(&(block.len() as u32).to_le_bytes());
    output[pos + BLOCK_PREFIX..end].copy_from_slice(block);
    Ok(end)
}

/// Compresses `input` into `output`, returning the number of bytes written.
pub fn compress(
    input: &[u8],
    output: &mut [u8],
    block_size: usize,
    n_threads: usize,
) -> Result<usize, PipelineError> {
    let block_size = block_size.max(1);
    let n_blocks = input.len().div_ceil(block_size);

    if n_threads <= 1 || n_blocks <= 1 {
        let mut pos = 0;
        for block in input.chunks(block_size) {
            if pos + BLOCK_PREFIX > output.len() {
                return Err(PipelineError::Lz4Error("output exhausted".into()));
            }
            let written = lz4_flex::block::compress_into(block, &mut output[pos + BLOCK_PREFIX..])
                .map_err(|e| PipelineError::Lz4Error(e.to_string()))?;
            output[pos..pos + BLOCK_PREFIX].copy_from_slice(&(written as u32).to_le_bytes());
            pos += BLOCK_PREFIX + written;
        }
        return Ok(pos);
    }

    let blocks: Vec<&[u8]> = input.chunks(block_size).collect();
    let per_thread = n_blocks.div_ceil(n_threads);
    let compressed: Vec<Vec<Vec<u8>>> = std::thread::scope(|s| {
        let handles: Vec<_> = blocks
            .chunks(per_thread)
            .map(|group| {
                s.spawn(move || {
                    group
                        .iter()
                        .map(|block| lz4_flex::block::compress(block))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join())
            .collect::<Result<Vec<_>, _>>()
    })
    .map_err(|_| PipelineError::InternalError("lz4 worker thread panicked".into()))?;

    let mut pos = 0;
    for block in compressed.iter().flatten() {
        pos = put_block(output, pos, block)?;
    }
    Ok(pos)
}

/// Decompresses a block stream into `output`, which must be exactly the expected
/// decoded size. Returns the number of bytes produced.
pub fn decompress(input: &[u8], output: &mut [u8], block_size: usize) -> Result<usize, PipelineError> {
    let block_size = block_size.max(1);
    let mut pos = 0;
    let mut produced = 0;

    while produced < output.len() {
        if pos + BLOCK_PREFIX > input.len() {
            return Err(PipelineError::Lz4Error(format!(
                "stream truncated after {} of {} bytes",
                produced,
                output.len()
            )));
        }
        let mut len_buf = [0u8; BLOCK_PREFIX];
        len_buf.copy_from_slice(&input[pos..pos + BLOCK_PREFIX]);
        let block_len = u32::from_le_bytes(len_buf) as usize;
        pos += BLOCK_PREFIX;

        if pos + block_len > input.len() {
            return Err(PipelineError::Lz4Error("block length exceeds stream".into()));
        }
        let expected = block_size.min(output.len() - produced);
        let n = lz4_flex::block::decompress_into(
            &input[pos..pos + block_len],
            &mut output[produced..produced + expected],
        )
        .map_err(|e| PipelineError::Lz4Error(e.to_string()))?;
        if n != expected {
            return Err(PipelineError::Lz4Error(format!(
                "block decoded to {} bytes, expected {}",
                n, expected
            )));
        }
        pos += block_len;
        produced += n;
    }

    if pos != input.len() {
        return Err(PipelineError::Lz4Error(format!(
            "{} trailing bytes after last block",
            input.len() - pos
        )));
    }
    Ok(produced)
}
