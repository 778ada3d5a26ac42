//! This module contains the pure, stateless kernels for XOR delta encoding and
//! decoding.
//!
//! Particularly effective on float payloads viewed as integers, where slowly
//! changing values differ in only a few low bits.

use crate::error::PipelineError;
use crate::traits::Word;
use crate::utils::{bytes_to_words, write_words};

/// Performs XOR delta encoding **in-place** on a mutable slice.
pub fn xor_delta_slice_inplace<W: Word>(data: &mut [W]) {
    if data.len() <= 1 {
        return;
    }
    // Iterate backwards for encoding to use original values for calculation.
    for i in (1..data.len()).rev() {
        data[i] = data[i] ^ data[i - 1];
    }
}

/// Reconstructs the original data from an XOR delta stream **in-place**.
pub fn xor_undelta_slice_inplace<W: Word>(data: &mut [W]) {
    if data.len() <= 1 {
        return;
    }
    // Iterate forwards to use the newly-decoded values for subsequent XORs.
    for i in 1..data.len() {
        data[i] = data[i] ^ data[i - 1];
    }
}

pub fn encode<W: Word>(input: &[u8], output: &mut [u8]) -> Result<usize, PipelineError> {
    let mut words = bytes_to_words::<W>(input)?;
    xor_delta_slice_inplace(&mut words);
    write_words(&words, output)
}

pub fn decode<W: Word>(input: &[u8], output: &mut [u8]) -> Result<usize, PipelineError> {
    let mut words = bytes_to_words::<W>(input)?;
    xor_undelta_slice_inplace(&mut words);
    write_words(&words, output)
}

//==================================================================================
// Unit Tests
//==================================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xor_delta_roundtrip_u32() {
        let original: Vec<u32> = vec![0b1100, 0b1101, 0b1001, 0b1011];
        let expected_encoded: Vec<u32> = vec![0b1100, 0b0001, 0b0100, 0b0010];

        let bytes: Vec<u8> = bytemuck::cast_slice(&original).to_vec();
        let mut encoded = vec![0u8; bytes.len()];
        assert_eq!(encode::<u32>(&bytes, &mut encoded).unwrap(), 16);

        let encoded_words: Vec<u32> = bytemuck::pod_collect_to_vec(&encoded);
        assert_eq!(encoded_words, expected_encoded);

        let mut decoded = vec![0u8; bytes.len()];
        decode::<u32>(&encoded, &mut decoded).unwrap();
        assert_eq!(decoded, bytes);
    }

    #[test]
    fn test_xor_delta_float_payload() {
        let original: Vec<f64> = vec![1.0, 1.0000001, 1.0000002, -3.5];
        let bytes: Vec<u8> = bytemuck::cast_slice(&original).to_vec();
        let mut encoded = vec![0u8; bytes.len()];
        encode::<u64>(&bytes, &mut encoded).unwrap();

        let mut decoded = vec![0u8; bytes.len()];
        decode::<u64>(&encoded, &mut decoded).unwrap();
        let back: Vec<f64> = bytemuck::pod_collect_to_vec(&decoded);
        assert_eq!(back, original);
    }

    #[test]
    fn test_xor_delta_single_element_slice() {
        let mut data = vec![42u64];
        xor_delta_slice_inplace(&mut data);
        assert_eq!(data, vec![42]);
        xor_undelta_slice_inplace(&mut data);
        assert_eq!(data, vec![42]);
    }

    #[test]
    fn test_decode_invalid_length_error() {
        let invalid_bytes = vec![1, 2, 3, 4, 5, 6, 7];
        let mut out = vec![0u8; 8];
        let result = decode::<u32>(&invalid_bytes, &mut out);
        assert!(matches!(result, Err(PipelineError::BufferMismatch(4, 7))));
    }
}
