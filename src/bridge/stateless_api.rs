// In: src/bridge/stateless_api.rs

use std::sync::Arc;

use ndarray::{ArrayD, ArrayView, Dimension, IxDyn};

use crate::bridge::format::CompressionStats;
use crate::config::{BuildMode, VoxpipeConfig};
use crate::error::PipelineError;
use crate::pipeline::{Header, Pipeline};
use crate::types::{ElementType, NativeElement};
use crate::utils::bytes_to_words;

/// Builds the pipeline for `description` according to `mode`.
fn build(description: &str, element_type: ElementType, mode: BuildMode) -> Result<Pipeline, PipelineError> {
    match mode {
        BuildMode::Strict => Pipeline::parse(description, element_type),
        BuildMode::Lenient => {
            let build = Pipeline::from_string(description, element_type)?;
            if !build.is_complete() {
                log::warn!(
                    "lenient build of '{}' dropped {:?}",
                    description,
                    build.skipped
                );
            }
            Ok(build.into_pipeline())
        }
    }
}

/// Compresses raw bytes of `element_type`, laid out as `shape`, with a strictly
/// built pipeline.
pub fn compress(
    description: &str,
    element_type: ElementType,
    bytes: &[u8],
    shape: &[usize],
) -> Result<Vec<u8>, PipelineError> {
    let mut pipeline = build(description, element_type, BuildMode::Strict)?;
    pipeline.encode_to_vec(bytes, shape)
}

/// Compresses a typed slice. The element type comes from `T`.
pub fn compress_typed<T: NativeElement>(
    description: &str,
    data: &[T],
    shape: &[usize],
) -> Result<Vec<u8>, PipelineError> {
    compress(description, T::ELEMENT_TYPE, bytemuck::cast_slice(data), shape)
}

/// Compresses an n-dimensional array. Non-contiguous views are copied into
/// standard layout first.
pub fn compress_array<T, D>(description: &str, array: ArrayView<'_, T, D>) -> Result<Vec<u8>, PipelineError>
where
    T: NativeElement,
    D: Dimension,
{
    let shape = array.shape().to_vec();
    let contiguous = array.as_standard_layout();
    let data = contiguous
        .as_slice()
        .ok_or_else(|| PipelineError::InternalError("standard layout array is not contiguous".into()))?;
    compress_typed(description, data, &shape)
}

/// Compresses with the description, build mode and thread hint of `config`.
pub fn compress_with_config(
    config: Arc<VoxpipeConfig>,
    element_type: ElementType,
    bytes: &[u8],
    shape: &[usize],
) -> Result<Vec<u8>, PipelineError> {
    let mut pipeline = build(&config.pipeline, element_type, config.build_mode)?;
    pipeline.set_n_threads(config.n_threads);
    pipeline.encode_to_vec(bytes, shape)
}

/// The result of `decompress`: everything needed to interpret the bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct Decompressed {
    pub data: Vec<u8>,
    pub shape: Vec<usize>,
    pub element_type: ElementType,
}

impl Decompressed {
    /// The data as a flat vector of `T`.
    ///
    /// # Errors
    /// Fails with `UnsupportedType` if `T` is not the stored element type.
    pub fn to_vec<T: NativeElement>(&self) -> Result<Vec<T>, PipelineError> {
        if T::ELEMENT_TYPE != self.element_type {
            return Err(PipelineError::UnsupportedType(format!(
                "buffer holds {}, requested {}",
                self.element_type,
                T::ELEMENT_TYPE
            )));
        }
        bytes_to_words::<T>(&self.data)
    }

    /// The data as an n-dimensional array with the stored shape.
    pub fn into_array<T: NativeElement>(self) -> Result<ArrayD<T>, PipelineError> {
        let values = self.to_vec::<T>()?;
        ArrayD::from_shape_vec(IxDyn(&self.shape), values)
            .map_err(|e| PipelineError::InvalidShape(e.to_string()))
    }
}

/// Decompresses a buffer produced by any of the `compress*` functions.
pub fn decompress(bytes: &[u8]) -> Result<Decompressed, PipelineError> {
    let header = Header::from_bytes(bytes)?;
    let pipeline = Pipeline::bootstrap(bytes)?;
    let data = pipeline.decode_to_vec(bytes)?;
    Ok(Decompressed {
        data,
        shape: header.shape().to_vec(),
        element_type: header.element_type(),
    })
}

/// Reads the header of a compressed buffer without decoding its payload.
pub fn analyze(bytes: &[u8]) -> Result<CompressionStats, PipelineError> {
    let header = Header::from_bytes(bytes)?;
    // Validates that the announced payload is actually present.
    header.payload(bytes)?;

    let stats = CompressionStats {
        header_size: header.len(),
        data_size: header.compressed_size(),
        total_size: bytes.len(),
        raw_size: header.raw_size(),
        pipeline: header.pipeline().to_string(),
        element_type: header.element_type(),
        shape: header.shape().to_vec(),
    };
    log_metric!(
        "event" = "analyze",
        "pipeline" = &stats.pipeline,
        "total_size" = stats.total_size,
        "ratio" = format!("{:.3}", stats.ratio())
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_after_compression() {
        // 1. Arrange: a small, smooth series.
        let data: Vec<i32> = (0..1000).map(|i| i / 10).collect();
        let compressed = compress_typed("delta->bitswap1->lz4", &data, &[10, 100]).unwrap();

        // 2. Act
        let stats = analyze(&compressed).unwrap();

        // 3. Assert
        assert_eq!(stats.header_size + stats.data_size, stats.total_size);
        assert_eq!(stats.total_size, compressed.len());
        assert_eq!(stats.raw_size, 4000);
        assert_eq!(stats.pipeline, "delta->bitswap1->lz4");
        assert_eq!(stats.element_type, ElementType::Int32);
        assert_eq!(stats.shape, vec![10, 100]);
        assert!(stats.ratio() > 1.0);
    }

    #[test]
    fn test_analyze_rejects_truncated_buffer() {
        let data: Vec<u8> = (0..100).collect();
        let compressed = compress_typed("zstd", &data, &[100]).unwrap();
        assert!(analyze(&compressed[..compressed.len() - 1]).is_err());
    }
}
