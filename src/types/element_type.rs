//! This module defines the canonical, type-safe representation of the element
//! types a pipeline can carry.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The canonical, internal representation of an element type in the pipeline.
///
/// Stages compare these tags to validate chain adjacency, and the container header
/// stores one so a decoder can recover element width, signedness and float-ness
/// without out-of-band metadata.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ElementType {
    UInt8,
    Int8,
    UInt16,
    Int16,
    UInt32,
    Int32,
    UInt64,
    Int64,
    Float32,
    Float64,
}

impl ElementType {
    pub const ALL: [ElementType; 10] = [
        Self::UInt8,
        Self::Int8,
        Self::UInt16,
        Self::Int16,
        Self::UInt32,
        Self::Int32,
        Self::UInt64,
        Self::Int64,
        Self::Float32,
        Self::Float64,
    ];

    /// Size of one element in bytes.
    pub fn width(&self) -> usize {
        match self {
            Self::UInt8 | Self::Int8 => 1,
            Self::UInt16 | Self::Int16 => 2,
            Self::UInt32 | Self::Int32 | Self::Float32 => 4,
            Self::UInt64 | Self::Int64 | Self::Float64 => 8,
        }
    }

    /// Returns `true` if the data type is a signed integer.
    pub fn is_signed_int(&self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64)
    }

    /// Returns `true` if the data type is a floating-point number.
    pub fn is_float(&self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    /// The stable one-byte tag written into the container header.
    pub fn tag(&self) -> u8 {
        match self {
            Self::UInt8 => 1,
            Self::Int8 => 2,
            Self::UInt16 => 3,
            Self::Int16 => 4,
            Self::UInt32 => 5,
            Self::Int32 => 6,
            Self::UInt64 => 7,
            Self::Int64 => 8,
            Self::Float32 => 9,
            Self::Float64 => 10,
        }
    }

    pub fn from_tag(tag: u8) -> Result<Self, PipelineError> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.tag() == tag)
            .ok_or_else(|| PipelineError::UnsupportedType(format!("unknown element tag {}", tag)))
    }
}

/// Provides the canonical string representation for an `ElementType`.
impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A Rust primitive that can be fed to a pipeline directly.
pub trait NativeElement: bytemuck::Pod {
    const ELEMENT_TYPE: ElementType;
}

macro_rules! impl_native_element {
    ($($t:ty => $variant:ident),+ $(,)?) => {
        $(
            impl NativeElement for $t {
                const ELEMENT_TYPE: ElementType = ElementType::$variant;
            }
        )+
    };
}

impl_native_element!(
    u8 => UInt8,
    i8 => Int8,
    u16 => UInt16,
    i16 => Int16,
    u32 => UInt32,
    i32 => Int32,
    u64 => UInt64,
    i64 => Int64,
    f32 => Float32,
    f64 => Float64,
);
