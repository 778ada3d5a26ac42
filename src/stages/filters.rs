//! Built-in filters. Each works for every element type: over the raw type as a
//! head filter, over `UInt8` as a tail filter after the sink.

use crate::error::PipelineError;
use crate::kernels::{bitswap, delta, with_word, xor_delta};
use crate::parser::parse_options;
use crate::stages::{
    decode_outcome, encode_outcome, join_config, parse_option, warn_unknown_options, Filter, Stage,
};
use crate::types::ElementType;
use crate::utils::clean_number_of_threads;

//==================================================================================
// Bit-plane swap
//==================================================================================

#[derive(Debug, Clone)]
pub struct BitSwap {
    name: &'static str,
    plane_bits: u32,
    dtype: ElementType,
    n_threads: usize,
}

impl BitSwap {
    pub const NAMES: [&'static str; 4] = ["bitswap1", "bitswap2", "bitswap4", "bitswap8"];

    pub fn new(plane_bits: u32, dtype: ElementType) -> Result<Self, PipelineError> {
        let name = match plane_bits {
            1 => Self::NAMES[0],
            2 => Self::NAMES[1],
            4 => Self::NAMES[2],
            8 => Self::NAMES[3],
            other => {
                return Err(PipelineError::InvalidOption {
                    stage: "bitswap".into(),
                    option: "plane_bits".into(),
                    reason: format!("{} is not one of 1, 2, 4, 8", other),
                })
            }
        };
        Ok(Self {
            name,
            plane_bits,
            dtype,
            n_threads: 1,
        })
    }

    pub fn from_options(plane_bits: u32, options: &str, dtype: ElementType) -> Result<Self, PipelineError> {
        let stage = Self::new(plane_bits, dtype)?;
        warn_unknown_options(stage.name, &parse_options(options), &[]);
        Ok(stage)
    }
}

impl Stage for BitSwap {
    fn name(&self) -> &str {
        self.name
    }
    fn config(&self) -> String {
        String::new()
    }
    fn input_type(&self) -> ElementType {
        self.dtype
    }
    fn output_type(&self) -> ElementType {
        self.dtype
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

impl Filter for BitSwap {
    fn encode(&mut self, input: &[u8], output: &mut [u8], _shape: &[usize]) -> Option<usize> {
        let result = with_word!(self.dtype, W => bitswap::encode::<W>(input, output, self.plane_bits));
        encode_outcome(self.name, result)
    }

    fn decode(&self, input: &[u8], output: &mut [u8], _in: &[usize], _out: &[usize]) -> Result<(), i32> {
        let result = with_word!(self.dtype, W => bitswap::decode::<W>(input, output, self.plane_bits));
        decode_outcome(self.name, result, input.len())
    }
}

//==================================================================================
// Delta
//==================================================================================

#[derive(Debug, Clone)]
pub struct Delta {
    order: Option<usize>,
    dtype: ElementType,
    n_threads: usize,
}

impl Delta {
    pub const NAME: &'static str = "delta";
    pub const DEFAULT_ORDER: usize = 1;

    pub fn new(dtype: ElementType) -> Self {
        Self {
            order: None,
            dtype,
            n_threads: 1,
        }
    }

    pub fn from_options(options: &str, dtype: ElementType) -> Result<Self, PipelineError> {
        let opts = parse_options(options);
        warn_unknown_options(Self::NAME, &opts, &["order"]);
        Ok(Self {
            order: parse_option(Self::NAME, &opts, "order", 1..=64)?,
            ..Self::new(dtype)
        })
    }

    pub fn order(&self) -> usize {
        self.order.unwrap_or(Self::DEFAULT_ORDER)
    }
}

impl Stage for Delta {
    fn name(&self) -> &str {
        Self::NAME
    }
    fn config(&self) -> String {
        join_config(&[("order", self.order.map(|o| o.to_string()))])
    }
    fn input_type(&self) -> ElementType {
        self.dtype
    }
    fn output_type(&self) -> ElementType {
        self.dtype
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

impl Filter for Delta {
    fn encode(&mut self, input: &[u8], output: &mut [u8], _shape: &[usize]) -> Option<usize> {
        let order = self.order();
        let result = with_word!(self.dtype, W => delta::encode::<W>(input, output, order));
        encode_outcome(Self::NAME, result)
    }

    fn decode(&self, input: &[u8], output: &mut [u8], _in: &[usize], _out: &[usize]) -> Result<(), i32> {
        let order = self.order();
        let result = with_word!(self.dtype, W => delta::decode::<W>(input, output, order));
        decode_outcome(Self::NAME, result, input.len())
    }
}

//==================================================================================
// XOR delta
//==================================================================================

#[derive(Debug, Clone)]
pub struct XorDelta {
    dtype: ElementType,
    n_threads: usize,
}

impl XorDelta {
    pub const NAME: &'static str = "xor_delta";

    pub fn new(dtype: ElementType) -> Self {
        Self { dtype, n_threads: 1 }
    }

    pub fn from_options(options: &str, dtype: ElementType) -> Result<Self, PipelineError> {
        warn_unknown_options(Self::NAME, &parse_options(options), &[]);
        Ok(Self::new(dtype))
    }
}

impl Stage for XorDelta {
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
        self.dtype
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

impl Filter for XorDelta {
    fn encode(&mut self, input: &[u8], output: &mut [u8], _shape: &[usize]) -> Option<usize> {
        let result = with_word!(self.dtype, W => xor_delta::encode::<W>(input, output));
        encode_outcome(Self::NAME, result)
    }

    fn decode(&self, input: &[u8], output: &mut [u8], _in: &[usize], _out: &[usize]) -> Result<(), i32> {
        let result = with_word!(self.dtype, W => xor_delta::decode::<W>(input, output));
        decode_outcome(Self::NAME, result, input.len())
    }
}
