//! The stage contract every transform and compressor implements, plus the
//! compiled-in stages and the registries that select them by name.
//!
//! Buffers cross the contract as raw bytes. A stage's element type is a runtime
//! [`ElementType`] tag, compared for equality when chains are validated.
//!
//! Failure signalling follows two tracks:
//! - `encode` returns `None` for an ordinary failure (the codec refused the input)
//!   and `decode` returns a nonzero code;
//! - construction from a malformed option string is an error at build time.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::ops::RangeInclusive;
use std::str::FromStr;

use crate::error::PipelineError;
use crate::types::ElementType;

pub mod filters;
pub mod registry;
pub mod sinks;

pub use filters::{BitSwap, Delta, XorDelta};
pub use registry::{FilterKind, FilterRegistry, SinkKind, SinkRegistry};
pub use sinks::{Lz4Sink, PassThroughSink, ZstdSink};

/// Decode status a built-in stage reports for any failure.
pub const STAGE_FAILURE: i32 = 1;

/// Highest decoded-to-encoded ratio a compressing sink can reach. A zstd RLE
/// block stores up to 128 KiB in 4 bytes.
pub const MAX_EXPANSION: usize = 32 * 1024;

//==================================================================================
// 1. The Stage Contract
//==================================================================================

pub trait Stage: Send {
    fn name(&self) -> &str;

    /// Canonical serialization of the options this stage was built with.
    fn config(&self) -> String;

    fn input_type(&self) -> ElementType;
    fn output_type(&self) -> ElementType;

    fn is_compressor(&self) -> bool {
        false
    }

    /// Upper bound on the bytes `encode` may write for `bytes_in` input bytes.
    fn max_encoded_size(&self, bytes_in: usize) -> usize;

    fn n_threads(&self) -> usize;
    fn set_n_threads(&mut self, n_threads: usize);

    /// `name` or `name(config)`, the form a stage takes in a description.
    fn descriptor(&self) -> String {
        let config = self.config();
        if config.is_empty() {
            self.name().to_string()
        } else {
            format!("{}({})", self.name(), config)
        }
    }
}

/// A stage that keeps the element count and type of its input.
pub trait Filter: Stage {
    /// Writes the encoded form of `input` to the front of `output` and returns the
    /// byte count, or `None` on failure. `shape` is in elements.
    fn encode(&mut self, input: &[u8], output: &mut [u8], shape: &[usize]) -> Option<usize>;

    fn decode(
        &self,
        input: &[u8],
        output: &mut [u8],
        in_shape: &[usize],
        out_shape: &[usize],
    ) -> Result<(), i32>;

    /// Encodes `data` onto itself.
    fn encode_in_place(&mut self, data: &mut [u8], shape: &[usize]) -> Option<usize> {
        let input = data.to_vec();
        self.encode(&input, data, shape)
    }
}

/// The one stage in a pipeline that may shrink data and change its element type.
pub trait Sink: Stage {
    fn encode(&mut self, input: &[u8], output: &mut [u8], shape: &[usize]) -> Option<usize>;

    /// Largest decoded byte count `bytes_in` encoded bytes can stand for. Decoders
    /// check header sizes against it before allocating.
    fn max_decoded_size(&self, bytes_in: usize) -> usize {
        bytes_in.saturating_mul(MAX_EXPANSION)
    }

    /// `in_shape` is the compressed byte count, `out_shape` the decoded shape.
    fn decode(
        &self,
        input: &[u8],
        output: &mut [u8],
        in_shape: &[usize],
        out_shape: &[usize],
    ) -> Result<(), i32>;
}

impl<S: Stage + ?Sized> Stage for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }
    fn config(&self) -> String {
        (**self).config()
    }
    fn input_type(&self) -> ElementType {
        (**self).input_type()
    }
    fn output_type(&self) -> ElementType {
        (**self).output_type()
    }
    fn is_compressor(&self) -> bool {
        (**self).is_compressor()
    }
    fn max_encoded_size(&self, bytes_in: usize) -> usize {
        (**self).max_encoded_size(bytes_in)
    }
    fn n_threads(&self) -> usize {
        (**self).n_threads()
    }
    fn set_n_threads(&mut self, n_threads: usize) {
        (**self).set_n_threads(n_threads)
    }
}

impl<F: Filter + ?Sized> Filter for Box<F> {
    fn encode(&mut self, input: &[u8], output: &mut [u8], shape: &[usize]) -> Option<usize> {
        (**self).encode(input, output, shape)
    }

    fn decode(
        &self,
        input: &[u8],
        output: &mut [u8],
        in_shape: &[usize],
        out_shape: &[usize],
    ) -> Result<(), i32> {
        (**self).decode(input, output, in_shape, out_shape)
    }
}

//==================================================================================
// 2. Helpers shared by the built-in stages
//==================================================================================

/// Turns a kernel result into the encode failure marker, logging the cause.
pub(crate) fn encode_outcome(stage: &str, result: Result<usize, PipelineError>) -> Option<usize> {
    match result {
        Ok(written) => Some(written),
        Err(e) => {
            log::error!("stage '{}' failed to encode: {}", stage, e);
            None
        }
    }
}

/// Turns a kernel result into a decode status, requiring `expected` bytes.
pub(crate) fn decode_outcome(
    stage: &str,
    result: Result<usize, PipelineError>,
    expected: usize,
) -> Result<(), i32> {
    match result {
        Ok(n) if n == expected => Ok(()),
        Ok(n) => {
            log::error!("stage '{}' decoded {} bytes, expected {}", stage, n, expected);
            Err(STAGE_FAILURE)
        }
        Err(e) => {
            log::error!("stage '{}' failed to decode: {}", stage, e);
            Err(STAGE_FAILURE)
        }
    }
}

/// Reads an optional, range-checked option value.
pub(crate) fn parse_option<T>(
    stage: &str,
    options: &BTreeMap<String, String>,
    key: &str,
    range: RangeInclusive<T>,
) -> Result<Option<T>, PipelineError>
where
    T: FromStr + PartialOrd + Display,
{
    let Some(raw) = options.get(key) else {
        return Ok(None);
    };
    let invalid = |reason: String| PipelineError::InvalidOption {
        stage: stage.to_string(),
        option: key.to_string(),
        reason,
    };
    let value: T = raw
        .parse()
        .map_err(|_| invalid(format!("cannot parse '{}'", raw)))?;
    if !range.contains(&value) {
        return Err(invalid(format!(
            "{} is outside {}..={}",
            value,
            range.start(),
            range.end()
        )));
    }
    Ok(Some(value))
}

/// Logs options a stage does not understand. They are ignored.
pub(crate) fn warn_unknown_options(stage: &str, options: &BTreeMap<String, String>, known: &[&str]) {
    for key in options.keys().filter(|k| !known.contains(&k.as_str())) {
        log::warn!("stage '{}' ignores unknown option '{}'", stage, key);
    }
}

/// Serializes the options that were explicitly set, in the given order.
pub(crate) fn join_config(pairs: &[(&str, Option<String>)]) -> String {
    pairs
        .iter()
        .filter_map(|(k, v)| v.as_ref().map(|v| format!("{}={}", k, v)))
        .collect::<Vec<_>>()
        .join(",")
}
