//! This module serves as the public API for the collection of all pure, stateless
//! transform and compression kernels.
//!
//! Kernels know nothing about pipelines. Filters work on unsigned machine words and
//! sinks on raw bytes; the stage layer picks the word type for a runtime
//! `ElementType` through `with_word!`.

//==================================================================================
// 1. Type Dispatch
//==================================================================================

/// Binds `$W` to the unsigned word matching the width of `$dtype` and evaluates
/// `$body` with it.
macro_rules! with_word {
    ($dtype:expr, $W:ident => $body:expr) => {
        match $dtype.width() {
            1 => {
                type $W = u8;
                $body
            }
            2 => {
                type $W = u16;
                $body
            }
            4 => {
                type $W = u32;
                $body
            }
            _ => {
                type $W = u64;
                $body
            }
        }
    };
}
pub(crate) use with_word;

//==================================================================================
// 2. Module Declarations
//==================================================================================

/// Bit-plane reordering
pub mod bitswap;

/// Value reduction
pub mod delta;
pub mod xor_delta;

/// Final stage: general-purpose compressors
pub mod lz4;
pub mod zstd;
