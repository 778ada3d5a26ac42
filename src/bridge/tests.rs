use super::*;
use crate::config::{BuildMode, VoxpipeConfig};
use crate::error::PipelineError;
use crate::pipeline::Header;
use crate::types::ElementType;
use ndarray::{Array, ArrayD, IxDyn};
use std::sync::Arc;

/// A 3-D volume with a smooth gradient plus a little structure, like a
/// microscopy stack.
fn create_test_volume() -> ArrayD<u16> {
    Array::from_shape_fn(IxDyn(&[4, 16, 32]), |idx| {
        let (z, y, x) = (idx[0], idx[1], idx[2]);
        (100 + 3 * z + y + (x / 4)) as u16
    })
}

#[test]
fn test_array_roundtrip_preserves_shape_and_values() {
    let volume = create_test_volume();
    let compressed = compress_array("delta->bitswap1->zstd(level=3)", volume.view()).unwrap();
    assert!(compressed.len() < volume.len() * 2);

    let restored = decompress(&compressed).unwrap();
    assert_eq!(restored.shape, vec![4, 16, 32]);
    assert_eq!(restored.element_type, ElementType::UInt16);
    assert_eq!(restored.into_array::<u16>().unwrap(), volume);
}

#[test]
fn test_non_contiguous_view_is_compressed_in_logical_order() {
    let volume = create_test_volume();
    let transposed = volume.t();
    let compressed = compress_array("lz4", transposed.view()).unwrap();

    let restored = decompress(&compressed).unwrap().into_array::<u16>().unwrap();
    assert_eq!(restored.shape(), &[32, 16, 4]);
    assert_eq!(restored, transposed);
}

#[test]
fn test_typed_compress_and_wrong_type_request() {
    let data: Vec<f32> = (0..500).map(|i| (i as f32).sin()).collect();
    let compressed = compress_typed("bitswap4->lz4->xor_delta", &data, &[500]).unwrap();
    let restored = decompress(&compressed).unwrap();
    assert_eq!(restored.to_vec::<f32>().unwrap(), data);
    assert!(matches!(
        restored.to_vec::<u32>(),
        Err(PipelineError::UnsupportedType(_))
    ));
}

#[test]
fn test_compress_is_strict() {
    let data = vec![0u8; 64];
    assert!(matches!(
        compress("bitswap1->lz(accel=8)", ElementType::UInt8, &data, &[64]),
        Err(PipelineError::UnknownStages(_))
    ));
}

#[test]
fn test_config_controls_build_mode_and_threads() {
    let data: Vec<u8> = (0..4096u32).flat_map(|v| v.to_le_bytes()).collect();

    let strict = Arc::new(VoxpipeConfig {
        pipeline: "bitswap1->lz(accel=8)".into(),
        ..VoxpipeConfig::default()
    });
    assert!(compress_with_config(strict, ElementType::UInt32, &data, &[4096]).is_err());

    let lenient = Arc::new(VoxpipeConfig {
        pipeline: "bitswap1->lz(accel=8)".into(),
        n_threads: 2,
        build_mode: BuildMode::Lenient,
    });
    let compressed = compress_with_config(lenient.clone(), ElementType::UInt32, &data, &[4096]).unwrap();
    assert_eq!(analyze(&compressed).unwrap().pipeline, "bitswap1");
    assert_eq!(decompress(&compressed).unwrap().data, data);

    let default = Arc::new(VoxpipeConfig::default());
    let compressed = compress_with_config(default, ElementType::UInt32, &data, &[64, 64]).unwrap();
    let stats = analyze(&compressed).unwrap();
    assert_eq!(stats.pipeline, "bitswap1->lz4");
    assert_eq!(stats.shape, vec![64, 64]);
}

#[test]
fn test_decompress_rejects_garbage() {
    assert!(matches!(
        decompress(b"definitely not voxpipe"),
        Err(PipelineError::HeaderFormat(_))
    ));
    assert!(decompress(&[]).is_err());
}

#[test]
fn test_decompress_rejects_oversized_header() {
    let bytes = Header::new(ElementType::UInt8, &[1 << 62], "lz4").unwrap().to_bytes();
    assert!(matches!(
        decompress(&bytes),
        Err(PipelineError::HeaderFormat(_))
    ));
}
