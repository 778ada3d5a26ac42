//! The closed set of compiled-in stages and the name-indexed tables that build them.
//!
//! A description string only *selects* among these variants; nothing is loaded at
//! run time. `FilterKind` and `SinkKind` are the sum types a pipeline stores, and
//! each registry is a static table of `{ name, constructor }` entries.

use crate::error::PipelineError;
use crate::stages::filters::{BitSwap, Delta, XorDelta};
use crate::stages::sinks::{Lz4Sink, PassThroughSink, ZstdSink};
use crate::stages::{Filter, Sink, Stage};
use crate::types::ElementType;

//==================================================================================
// 1. Sum types over the compiled-in stages
//==================================================================================

#[derive(Debug, Clone)]
pub enum FilterKind {
    BitSwap(BitSwap),
    Delta(Delta),
    XorDelta(XorDelta),
}

#[derive(Debug, Clone)]
pub enum SinkKind {
    Lz4(Lz4Sink),
    Zstd(ZstdSink),
    PassThrough(PassThroughSink),
}

macro_rules! dispatch_filter {
    ($self:expr, $s:ident => $body:expr) => {
        match $self {
            FilterKind::BitSwap($s) => $body,
            FilterKind::Delta($s) => $body,
            FilterKind::XorDelta($s) => $body,
        }
    };
}

macro_rules! dispatch_sink {
    ($self:expr, $s:ident => $body:expr) => {
        match $self {
            SinkKind::Lz4($s) => $body,
            SinkKind::Zstd($s) => $body,
            SinkKind::PassThrough($s) => $body,
        }
    };
}

/// Forwards the `Stage` methods of a sum type to its active variant.
macro_rules! impl_stage_for_kind {
    ($kind:ty, $dispatch:ident) => {
        impl Stage for $kind {
            fn name(&self) -> &str {
                $dispatch!(self, s => s.name())
            }
            fn config(&self) -> String {
                $dispatch!(self, s => s.config())
            }
            fn input_type(&self) -> ElementType {
                $dispatch!(self, s => s.input_type())
            }
            fn output_type(&self) -> ElementType {
                $dispatch!(self, s => s.output_type())
            }
            fn is_compressor(&self) -> bool {
                $dispatch!(self, s => s.is_compressor())
            }
            fn max_encoded_size(&self, bytes_in: usize) -> usize {
                $dispatch!(self, s => s.max_encoded_size(bytes_in))
            }
            fn n_threads(&self) -> usize {
                $dispatch!(self, s => s.n_threads())
            }
            fn set_n_threads(&mut self, n_threads: usize) {
                $dispatch!(self, s => s.set_n_threads(n_threads))
            }
        }
    };
}

impl_stage_for_kind!(FilterKind, dispatch_filter);
impl_stage_for_kind!(SinkKind, dispatch_sink);

impl Filter for FilterKind {
    fn encode(&mut self, input: &[u8], output: &mut [u8], shape: &[usize]) -> Option<usize> {
        dispatch_filter!(self, s => s.encode(input, output, shape))
    }

    fn decode(
        &self,
        input: &[u8],
        output: &mut [u8],
        in_shape: &[usize],
        out_shape: &[usize],
    ) -> Result<(), i32> {
        dispatch_filter!(self, s => s.decode(input, output, in_shape, out_shape))
    }
}

impl Sink for SinkKind {
    fn encode(&mut self, input: &[u8], output: &mut [u8], shape: &[usize]) -> Option<usize> {
        dispatch_sink!(self, s => s.encode(input, output, shape))
    }

    fn max_decoded_size(&self, bytes_in: usize) -> usize {
        dispatch_sink!(self, s => s.max_decoded_size(bytes_in))
    }

    fn decode(
        &self,
        input: &[u8],
        output: &mut [u8],
        in_shape: &[usize],
        out_shape: &[usize],
    ) -> Result<(), i32> {
        dispatch_sink!(self, s => s.decode(input, output, in_shape, out_shape))
    }
}

//==================================================================================
// 2. Registries
//==================================================================================

type Constructor<K> = fn(&str, ElementType) -> Result<K, PipelineError>;

struct Entry<K: 'static> {
    name: &'static str,
    build: Constructor<K>,
}

fn bitswap1(o: &str, t: ElementType) -> Result<FilterKind, PipelineError> {
    BitSwap::from_options(1, o, t).map(FilterKind::BitSwap)
}
fn bitswap2(o: &str, t: ElementType) -> Result<FilterKind, PipelineError> {
    BitSwap::from_options(2, o, t).map(FilterKind::BitSwap)
}
fn bitswap4(o: &str, t: ElementType) -> Result<FilterKind, PipelineError> {
    BitSwap::from_options(4, o, t).map(FilterKind::BitSwap)
}
fn bitswap8(o: &str, t: ElementType) -> Result<FilterKind, PipelineError> {
    BitSwap::from_options(8, o, t).map(FilterKind::BitSwap)
}
fn delta(o: &str, t: ElementType) -> Result<FilterKind, PipelineError> {
    Delta::from_options(o, t).map(FilterKind::Delta)
}
fn xor_delta(o: &str, t: ElementType) -> Result<FilterKind, PipelineError> {
    XorDelta::from_options(o, t).map(FilterKind::XorDelta)
}

fn lz4(o: &str, t: ElementType) -> Result<SinkKind, PipelineError> {
    Lz4Sink::from_options(o, t).map(SinkKind::Lz4)
}
fn zstd(o: &str, t: ElementType) -> Result<SinkKind, PipelineError> {
    ZstdSink::from_options(o, t).map(SinkKind::Zstd)
}
fn pass_through(o: &str, t: ElementType) -> Result<SinkKind, PipelineError> {
    PassThroughSink::from_options(o, t).map(SinkKind::PassThrough)
}

const FILTERS: &[Entry<FilterKind>] = &[
    Entry { name: "bitswap1", build: bitswap1 },
    Entry { name: "bitswap2", build: bitswap2 },
    Entry { name: "bitswap4", build: bitswap4 },
    Entry { name: "bitswap8", build: bitswap8 },
    Entry { name: Delta::NAME, build: delta },
    Entry { name: XorDelta::NAME, build: xor_delta },
];

const SINKS: &[Entry<SinkKind>] = &[
    Entry { name: Lz4Sink::NAME, build: lz4 },
    Entry { name: ZstdSink::NAME, build: zstd },
    Entry { name: PassThroughSink::NAME, build: pass_through },
];

fn lookup<K>(table: &'static [Entry<K>], name: &str) -> Option<&'static Entry<K>> {
    table.iter().find(|e| e.name == name)
}

fn create_from<K: Stage>(
    table: &'static [Entry<K>],
    name: &str,
    options: &str,
    element_type: ElementType,
) -> Result<Option<K>, PipelineError> {
    match lookup(table, name) {
        Some(entry) => (entry.build)(options, element_type).map(Some),
        None => Ok(None),
    }
}

/// Filters, usable in the head chain over the raw type and in the tail chain
/// over `UInt8`.
pub struct FilterRegistry;

impl FilterRegistry {
    pub fn has(name: &str) -> bool {
        lookup(FILTERS, name).is_some()
    }

    pub fn names() -> impl Iterator<Item = &'static str> {
        FILTERS.iter().map(|e| e.name)
    }

    /// Builds the filter called `name`, or `Ok(None)` if no filter has that name.
    pub fn create(
        name: &str,
        options: &str,
        element_type: ElementType,
    ) -> Result<Option<FilterKind>, PipelineError> {
        create_from(FILTERS, name, options, element_type)
    }
}

pub struct SinkRegistry;

impl SinkRegistry {
    pub fn has(name: &str) -> bool {
        lookup(SINKS, name).is_some()
    }

    pub fn names() -> impl Iterator<Item = &'static str> {
        SINKS.iter().map(|e| e.name)
    }

    pub fn create(
        name: &str,
        options: &str,
        element_type: ElementType,
    ) -> Result<Option<SinkKind>, PipelineError> {
        create_from(SINKS, name, options, element_type)
    }
}
