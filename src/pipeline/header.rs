//! Defines the self-describing container header that prefixes every encoded buffer.
//! This module is the single source of truth for its serialization, deserialization,
//! and cheap peeking.
//!
//! Layout (little-endian):
//!
//! ```text
//! magic "VOXP" | version u16 | header_len u32 | element tag u8 | rank u8
//! | rank x u64 extents (slowest to fastest) | name_len u16 | name bytes
//! | raw_size u64 | compressed_size u64
//! ```
//!
//! `header_len` is the total length of the header itself, so a reader never needs
//! to know it in advance.

use std::io::{Cursor, Read};

use crate::bridge::format::{CONTAINER_FORMAT_VERSION, CONTAINER_MAGIC, MAX_RANK};
use crate::error::PipelineError;
use crate::types::ElementType;
use crate::utils::element_count;

//==================================================================================
// Format Constants
//==================================================================================
/// magic(4) + version(2) + header_len(4) + tag(1) + rank(1)
const FIXED_PREFIX: usize = 12;
/// name_len(2) + raw_size(8) + compressed_size(8)
const FIXED_SUFFIX: usize = 18;
/// The smallest header that can exist: rank 1, empty name.
pub const MIN_HEADER_SIZE: usize = FIXED_PREFIX + 8 + FIXED_SUFFIX;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    element_type: ElementType,
    shape: Vec<usize>,
    pipeline: String,
    raw_size: u64,
    compressed_size: u64,
}

fn format_err(msg: impl Into<String>) -> PipelineError {
    PipelineError::HeaderFormat(msg.into())
}

impl Header {
    pub fn new(element_type: ElementType, shape: &[usize], pipeline: &str) -> Result<Self, PipelineError> {
        if shape.is_empty() || shape.len() > MAX_RANK {
            return Err(PipelineError::InvalidShape(format!(
                "rank {} is outside 1..={}",
                shape.len(),
                MAX_RANK
            )));
        }
        if pipeline.len() > u16::MAX as usize {
            return Err(format_err("pipeline name too long"));
        }
        let raw_size = (element_count(shape) * element_type.width()) as u64;
        Ok(Self {
            element_type,
            shape: shape.to_vec(),
            pipeline: pipeline.to_string(),
            raw_size,
            compressed_size: 0,
        })
    }

    /// Serialized length of a header with `rank` extents and a `name_len` byte name.
    pub fn encoded_len(rank: usize, name_len: usize) -> usize {
        FIXED_PREFIX + 8 * rank + FIXED_SUFFIX + name_len
    }

    /// Upper bound on the header length for any shape and a `name_len` byte name.
    pub fn max_len(name_len: usize) -> usize {
        Self::encoded_len(MAX_RANK, name_len)
    }

    pub fn len(&self) -> usize {
        Self::encoded_len(self.shape.len(), self.pipeline.len())
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn pipeline(&self) -> &str {
        &self.pipeline
    }

    pub fn raw_size(&self) -> usize {
        self.raw_size as usize
    }

    pub fn compressed_size(&self) -> usize {
        self.compressed_size as usize
    }

    pub fn set_compressed_size(&mut self, size: usize) {
        self.compressed_size = size as u64;
    }

    /// True if both headers describe the same data and pipeline.
    pub fn matches(&self, other: &Header) -> bool {
        self.element_type == other.element_type
            && self.shape == other.shape
            && self.pipeline == other.pipeline
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.len());
        buf.extend_from_slice(CONTAINER_MAGIC);
        buf.extend_from_slice(&CONTAINER_FORMAT_VERSION.to_le_bytes());
        buf.extend_from_slice(&(self.len() as u32).to_le_bytes());
        buf.extend_from_slice(&[self.element_type.tag(), self.shape.len() as u8]);
        for &extent in &self.shape {
            buf.extend_from_slice(&(extent as u64).to_le_bytes());
        }
        buf.extend_from_slice(&(self.pipeline.len() as u16).to_le_bytes());
        buf.extend_from_slice(self.pipeline.as_bytes());
        buf.extend_from_slice(&self.raw_size.to_le_bytes());
        buf.extend_from_slice(&self.compressed_size.to_le_bytes());
        buf
    }

    /// Reads just the declared header length from the front of `bytes`.
    pub fn peek_len(bytes: &[u8]) -> Result<usize, PipelineError> {
        if bytes.len() < FIXED_PREFIX {
            return Err(format_err(format!(
                "buffer of {} bytes is too small for a header",
                bytes.len()
            )));
        }
        if &bytes[..4] != CONTAINER_MAGIC {
            return Err(format_err("invalid container magic number"));
        }
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != CONTAINER_FORMAT_VERSION {
            return Err(format_err(format!(
                "unsupported header version: expected {}, got {}",
                CONTAINER_FORMAT_VERSION, version
            )));
        }
        Ok(u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]) as usize)
    }

    /// True if `bytes` starts with a complete, valid header.
    pub fn contained(bytes: &[u8]) -> bool {
        Self::from_bytes(bytes).is_ok()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PipelineError> {
        let declared = Self::peek_len(bytes)?;
        // SECURITY: Validate that the declared header length doesn't exceed the buffer size.
        if declared < MIN_HEADER_SIZE || declared > bytes.len() {
            return Err(format_err(format!(
                "declared header length {} is invalid for a {} byte buffer",
                declared,
                bytes.len()
            )));
        }

        let mut cursor = Cursor::new(&bytes[..declared]);
        cursor.set_position(10);
        let map_err = |e: std::io::Error| format_err(e.to_string());

        let mut u8_buf = [0u8; 2];
        cursor.read_exact(&mut u8_buf).map_err(map_err)?;
        let element_type = ElementType::from_tag(u8_buf[0])?;
        let rank = u8_buf[1] as usize;
        if rank == 0 || rank > MAX_RANK {
            return Err(format_err(format!("rank {} is outside 1..={}", rank, MAX_RANK)));
        }

        let mut u64_buf = [0u8; 8];
        let mut shape = Vec::with_capacity(rank);
        for _ in 0..rank {
            cursor.read_exact(&mut u64_buf).map_err(map_err)?;
            shape.push(u64::from_le_bytes(u64_buf) as usize);
        }

        let mut u16_buf = [0u8; 2];
        cursor.read_exact(&mut u16_buf).map_err(map_err)?;
        let name_len = u16::from_le_bytes(u16_buf) as usize;
        let mut name_buf = vec![0u8; name_len];
        cursor.read_exact(&mut name_buf).map_err(map_err)?;
        let pipeline = String::from_utf8(name_buf).map_err(|e| format_err(e.to_string()))?;

        cursor.read_exact(&mut u64_buf).map_err(map_err)?;
        let raw_size = u64::from_le_bytes(u64_buf);
        cursor.read_exact(&mut u64_buf).map_err(map_err)?;
        let compressed_size = u64::from_le_bytes(u64_buf);

        if cursor.position() as usize != declared {
            return Err(format_err("header length does not match its contents"));
        }
        let expected_raw = shape
            .iter()
            .try_fold(element_type.width(), |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| format_err("shape overflows"))?;
        if raw_size as usize != expected_raw {
            return Err(format_err(format!(
                "raw size {} does not match shape {:?} of {}",
                raw_size, shape, element_type
            )));
        }

        Ok(Self {
            element_type,
            shape,
            pipeline,
            raw_size,
            compressed_size,
        })
    }

    /// The compressed payload that follows the header in `bytes`.
    pub fn payload<'a>(&self, bytes: &'a [u8]) -> Result<&'a [u8], PipelineError> {
        let start = self.len();
        let end = start.saturating_add(self.compressed_size());
        // SECURITY: Final check that the sum of parts does not exceed the total buffer size.
        if end > bytes.len() {
            return Err(format_err(format!(
                "header announces {} payload bytes, only {} available",
                self.compressed_size(),
                bytes.len().saturating_sub(start)
            )));
        }
        Ok(&bytes[start..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Header {
        let mut h = Header::new(ElementType::UInt16, &[8, 8, 8], "bitswap1->lz4").unwrap();
        h.set_compressed_size(77);
        h
    }

    #[test]
    fn test_header_serialization_roundtrip() {
        let header = sample();
        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), header.len());
        assert_eq!(Header::peek_len(&bytes).unwrap(), bytes.len());

        let back = Header::from_bytes(&bytes).unwrap();
        assert_eq!(back, header);
        assert_eq!(back.raw_size(), 1024);
        assert_eq!(back.shape(), &[8, 8, 8]);
    }

    #[test]
    fn test_header_byte_layout() {
        let header = Header::new(ElementType::UInt8, &[3], "lz4").unwrap();
        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), MIN_HEADER_SIZE + 3);
        assert_eq!(&bytes[..4], CONTAINER_MAGIC);
        assert_eq!(&bytes[6..10], &(bytes.len() as u32).to_le_bytes());
        assert_eq!(bytes[11], 1);
        assert_eq!(&bytes[12..20], &3u64.to_le_bytes());
        assert_eq!(&bytes[20..22], &3u16.to_le_bytes());
        assert_eq!(&bytes[22..25], b"lz4");
        assert_eq!(&bytes[25..33], &3u64.to_le_bytes());
        assert_eq!(&bytes[33..], &0u64.to_le_bytes());
    }

    #[test]
    fn test_header_is_self_terminating() {
        let header = sample();
        let mut bytes = header.to_bytes();
        bytes.extend_from_slice(&[0xAB; 77]);
        let back = Header::from_bytes(&bytes).unwrap();
        assert_eq!(back.payload(&bytes).unwrap(), &[0xAB; 77][..]);
        assert!(Header::contained(&bytes));
    }

    #[test]
    fn test_max_len_bounds_every_rank() {
        for rank in 1..=MAX_RANK {
            let shape = vec![2; rank];
            let h = Header::new(ElementType::Float64, &shape, "zstd(level=3)").unwrap();
            assert!(h.len() <= Header::max_len("zstd(level=3)".len()));
        }
    }

    #[test]
    fn test_corrupt_headers_are_rejected() {
        let bytes = sample().to_bytes();

        let mut bad_magic = bytes.clone();
        bad_magic[0] = b'X';
        assert!(Header::from_bytes(&bad_magic).is_err());

        let mut bad_version = bytes.clone();
        bad_version[4] = 9;
        assert!(Header::from_bytes(&bad_version).is_err());

        assert!(Header::from_bytes(&bytes[..bytes.len() - 1]).is_err());

        let mut bad_tag = bytes.clone();
        bad_tag[10] = 0;
        assert!(Header::from_bytes(&bad_tag).is_err());

        let mut bad_rank = bytes.clone();
        bad_rank[11] = 0;
        assert!(Header::from_bytes(&bad_rank).is_err());

        let mut bad_raw = bytes.clone();
        let raw_at = bytes.len() - 16;
        bad_raw[raw_at] ^= 1;
        assert!(Header::from_bytes(&bad_raw).is_err());

        assert!(!Header::contained(b"VOXP"));
    }

    #[test]
    fn test_payload_must_fit() {
        let header = sample();
        let bytes = header.to_bytes();
        assert!(header.payload(&bytes).is_err());
    }

    #[test]
    fn test_new_validates_rank() {
        assert!(Header::new(ElementType::UInt8, &[], "").is_err());
        assert!(Header::new(ElementType::UInt8, &[1; MAX_RANK + 1], "").is_err());
    }
}
