// In: src/bridge/format.rs

//! Defines the on-disk constants of the voxpipe container and the public
//! analysis struct returned by the bridge.

use crate::types::ElementType;

//==================================================================================
// I. Container Header Contract
//==================================================================================

/// The magic number that opens every encoded buffer.
pub const CONTAINER_MAGIC: &[u8; 4] = b"VOXP";
/// The current version of the container header layout.
pub const CONTAINER_FORMAT_VERSION: u16 = 1;
/// The largest number of dimensions a header can describe.
pub const MAX_RANK: usize = 8;

//==================================================================================
// II. Analysis
//==================================================================================

/// Returned by `analyze`: everything the header says, without decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionStats {
    pub header_size: usize,
    pub data_size: usize,
    pub total_size: usize,
    pub raw_size: usize,
    pub pipeline: String,
    pub element_type: ElementType,
    pub shape: Vec<usize>,
}

impl CompressionStats {
    /// Raw bytes per stored byte, header included.
    pub fn ratio(&self) -> f64 {
        if self.total_size == 0 {
            return 0.0;
        }
        self.raw_size as f64 / self.total_size as f64
    }
}
