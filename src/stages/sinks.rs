//! Built-in sinks. Each consumes the raw element type and emits bytes.

use crate::error::PipelineError;
use crate::kernels::{lz4, zstd};
use crate::parser::parse_options;
use crate::stages::{
    decode_outcome, encode_outcome, join_config, parse_option, warn_unknown_options, Sink, Stage,
    STAGE_FAILURE,
};
use crate::types::ElementType;
use crate::utils::{clean_number_of_threads, element_count};

/// Decoded byte count a sink must produce for `out_shape`.
fn expected_bytes(dtype: ElementType, out_shape: &[usize]) -> usize {
    element_count(out_shape) * dtype.width()
}

/// The `output` prefix a sink decodes into, or the failure status if it is short.
fn decode_target<'a>(
    stage: &str,
    output: &'a mut [u8],
    expected: usize,
) -> Result<&'a mut [u8], i32> {
    if output.len() < expected {
        log::error!(
            "stage '{}' needs {} output bytes, got {}",
            stage,
            expected,
            output.len()
        );
        return Err(STAGE_FAILURE);
    }
    Ok(&mut output[..expected])
}

//==================================================================================
// LZ4
//==================================================================================

#[derive(Debug, Clone)]
pub struct Lz4Sink {
    accel: Option<u32>,
    blocksize_kb: Option<usize>,
    dtype: ElementType,
    n_threads: usize,
}

impl Lz4Sink {
    pub const NAME: &'static str = "lz4";

    pub fn new(dtype: ElementType) -> Self {
        Self {
            accel: None,
            blocksize_kb: None,
            dtype,
            n_threads: 1,
        }
    }

    pub fn from_options(options: &str, dtype: ElementType) -> Result<Self, PipelineError> {
        let opts = parse_options(options);
        warn_unknown_options(Self::NAME, &opts, &["accel", "blocksize_kb"]);
        Ok(Self {
            // lz4_flex has a single speed mode; accel is kept so the name round-trips.
            accel: parse_option(Self::NAME, &opts, "accel", 1..=65537)?,
            blocksize_kb: parse_option(Self::NAME, &opts, "blocksize_kb", 1..=1 << 20)?,
            ..Self::new(dtype)
        })
    }

    pub fn block_size(&self) -> usize {
        self.blocksize_kb
            .map(|kb| kb * 1024)
            .unwrap_or(lz4::DEFAULT_BLOCK_SIZE)
    }
}

impl Stage for Lz4Sink {
    fn name(&self) -> &str {
        Self::NAME
    }
    fn config(&self) -> String {
        join_config(&[
            ("accel", self.accel.map(|v| v.to_string())),
            ("blocksize_kb", self.blocksize_kb.map(|v| v.to_string())),
        ])
    }
    fn input_type(&self) -> ElementType {
        self.dtype
    }
    fn output_type(&self) -> ElementType {
        ElementType::UInt8
    }
    fn is_compressor(&self) -> bool {
        true
    }
    fn max_encoded_size(&self, bytes_in: usize) -> usize {
        lz4::max_compressed_size(bytes_in, self.block_size())
    }
    fn n_threads(&self) -> usize {
        self.n_threads
    }
    fn set_n_threads(&mut self, n_threads: usize) {
        self.n_threads = clean_number_of_threads(n_threads);
    }
}

impl Sink for Lz4Sink {
    fn encode(&mut self, input: &[u8], output: &mut [u8], _shape: &[usize]) -> Option<usize> {
        let result = lz4::compress(input, output, self.block_size(), self.n_threads);
        encode_outcome(Self::NAME, result)
    }

    fn decode(&self, input: &[u8], output: &mut [u8], _in: &[usize], out_shape: &[usize]) -> Result<(), i32> {
        let expected = expected_bytes(self.dtype, out_shape);
        let target = decode_target(Self::NAME, output, expected)?;
        decode_outcome(Self::NAME, lz4::decompress(input, target, self.block_size()), expected)
    }
}

//==================================================================================
// Zstandard
//==================================================================================

#[derive(Debug, Clone)]
pub struct ZstdSink {
    level: Option<i32>,
    dtype: ElementType,
    n_threads: usize,
}

impl ZstdSink {
    pub const NAME: &'static str = "zstd";

    pub fn new(dtype: ElementType) -> Self {
        Self {
            level: None,
            dtype,
            n_threads: 1,
        }
    }

    pub fn from_options(options: &str, dtype: ElementType) -> Result<Self, PipelineError> {
        let opts = parse_options(options);
        warn_unknown_options(Self::NAME, &opts, &["level"]);
        Ok(Self {
            level: parse_option(Self::NAME, &opts, "level", 1..=22)?,
            ..Self::new(dtype)
        })
    }
}

impl Stage for ZstdSink {
    fn name(&self) -> &str {
        Self::NAME
    }
    fn config(&self) -> String {
        join_config(&[("level", self.level.map(|v| v.to_string()))])
    }
    fn input_type(&self) -> ElementType {
        self.dtype
    }
    fn output_type(&self) -> ElementType {
        ElementType::UInt8
    }
    fn is_compressor(&self) -> bool {
        true
    }
    fn max_encoded_size(&self, bytes_in: usize) -> usize {
        zstd::max_compressed_size(bytes_in)
    }
    fn n_threads(&self) -> usize {
        self.n_threads
    }
    fn set_n_threads(&mut self, n_threads: usize) {
        self.n_threads = clean_number_of_threads(n_threads);
    }
}

impl Sink for ZstdSink {
    fn encode(&mut self, input: &[u8], output: &mut [u8], _shape: &[usize]) -> Option<usize> {
        let level = self.level.unwrap_or(zstd::DEFAULT_LEVEL);
        encode_outcome(Self::NAME, zstd::compress(input, output, level))
    }

    fn decode(&self, input: &[u8], output: &mut [u8], _in: &[usize], out_shape: &[usize]) -> Result<(), i32> {
        let expected = expected_bytes(self.dtype, out_shape);
        let target = decode_target(Self::NAME, output, expected)?;
        decode_outcome(Self::NAME, zstd::decompress(input, target), expected)
    }
}

//==================================================================================
// Pass-through
//==================================================================================

/// Copies its input unchanged. Useful to run filters without compressing.
#[derive(Debug, Clone)]
pub struct PassThroughSink {
    dtype: ElementType,
    n_threads: usize,
}

impl PassThroughSink {
    pub const NAME: &'static str = "pass_through";

    pub fn new(dtype: ElementType) -> Self {
        Self { dtype, n_threads: 1 }
    }

    pub fn from_options(options: &str, dtype: ElementType) -> Result<Self, PipelineError> {
        warn_unknown_options(Self::NAME, &parse_options(options), &[]);
        Ok(Self::new(dtype))
    }
}

impl Stage for PassThroughSink {
    fn name(&self) -> &str {
        Self::NAME
    }
    fn config(&self) -> String {
        String::new()
    }
    fn input_type(&self) -> ElementType {
        self.dtype
    }
    fn output_type(&self) -> ElementType {
        ElementType::UInt8
    }
    fn is_compressor(&self) -> bool {
        true
    }
    fn max_encoded_size(&self, bytes_in: usize) -> usize {
        bytes_in
    }
    fn n_threads(&self) -> usize {
        self.n_threads
    }
    fn set_n_threads(&mut self, n_threads: usize) {
        self.n_threads = clean_number_of_threads(n_threads);
    }
}

impl Sink for PassThroughSink {
    fn encode(&mut self, input: &[u8], output: &mut [u8], _shape: &[usize]) -> Option<usize> {
        if output.len() < input.len() {
            log::error!("stage '{}' output too small", Self::NAME);
            return None;
        }
        output[..input.len()].copy_from_slice(input);
        Some(input.len())
    }

    fn max_decoded_size(&self, bytes_in: usize) -> usize {
        bytes_in
    }

    fn decode(&self, input: &[u8], output: &mut [u8], _in: &[usize], out_shape: &[usize]) -> Result<(), i32> {
        let expected = expected_bytes(self.dtype, out_shape);
        if input.len() != expected {
            return Err(STAGE_FAILURE);
        }
        let target = decode_target(Self::NAME, output, expected)?;
        target.copy_from_slice(input);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_u16(n: usize) -> Vec<u8> {
        let values: Vec<u16> = (0..n).map(|i| (i / 4) as u16).collect();
        bytemuck::cast_slice(&values).to_vec()
    }

    fn roundtrip<S: Sink>(sink: &mut S, input: &[u8], shape: &[usize]) {
        let mut compressed = vec![0u8; sink.max_encoded_size(input.len())];
        let n = sink.encode(input, &mut compressed, shape).unwrap();
        assert!(n <= compressed.len());

        let mut decoded = vec![0u8; input.len()];
        sink.decode(&compressed[..n], &mut decoded, &[n], shape).unwrap();
        assert_eq!(decoded, input);
    }

    #[test]
    fn test_lz4_sink_roundtrip_and_config() {
        let mut sink = Lz4Sink::from_options("accel=8", ElementType::UInt16).unwrap();
        assert_eq!(sink.descriptor(), "lz4(accel=8)");
        assert!(sink.is_compressor());
        assert_eq!(sink.output_type(), ElementType::UInt8);
        roundtrip(&mut sink, &ramp_u16(4096), &[16, 16, 16]);
    }

    #[test]
    fn test_lz4_sink_small_blocks_with_threads() {
        let mut sink = Lz4Sink::from_options("blocksize_kb=1", ElementType::UInt16).unwrap();
        sink.set_n_threads(4);
        roundtrip(&mut sink, &ramp_u16(3000), &[3000]);
    }

    #[test]
    fn test_lz4_sink_rejects_bad_options() {
        assert!(Lz4Sink::from_options("accel=0", ElementType::UInt8).is_err());
        assert!(Lz4Sink::from_options("blocksize_kb=-4", ElementType::UInt8).is_err());
        // Unknown keys are tolerated.
        assert!(Lz4Sink::from_options("colour=blue", ElementType::UInt8).is_ok());
    }

    #[test]
    fn test_zstd_sink_roundtrip() {
        let mut sink = ZstdSink::from_options("level=7", ElementType::UInt16).unwrap();
        assert_eq!(sink.config(), "level=7");
        roundtrip(&mut sink, &ramp_u16(2048), &[32, 64]);
    }

    #[test]
    fn test_sink_decode_failure_codes() {
        let sink = ZstdSink::new(ElementType::UInt8);
        let mut out = vec![0u8; 16];
        assert_eq!(sink.decode(&[0, 1, 2], &mut out, &[3], &[16]), Err(STAGE_FAILURE));
        // Output shorter than the decoded shape.
        assert_eq!(sink.decode(&[0, 1, 2], &mut out, &[3], &[32]), Err(STAGE_FAILURE));
    }

    #[test]
    fn test_pass_through_sink() {
        let mut sink = PassThroughSink::new(ElementType::UInt16);
        assert_eq!(sink.max_encoded_size(100), 100);
        assert_eq!(sink.max_decoded_size(100), 100);
        assert!(ZstdSink::new(ElementType::UInt16).max_decoded_size(100) > 100);
        roundtrip(&mut sink, &ramp_u16(50), &[50]);
    }
}
