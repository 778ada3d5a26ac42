//! This file is the root of the `voxpipe` Rust crate.
//!
//! Its responsibilities are strictly limited to:
//! 1.  Declaring all the top-level modules of our library (`pipeline`, `stages`,
//!     `kernels`, etc.) so the Rust compiler knows they exist.
//! 2.  Re-exporting the handful of types most callers need, so
//!     `use voxpipe::{Pipeline, ElementType}` is enough to get started.

//==================================================================================
// 0. Constants
//==================================================================================
/// The crate version, automatically set from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
//==================================================================================
// 1. Module Declarations
//==================================================================================
#[macro_use]
pub mod observability; // Make macros available throughout the crate

pub mod bridge;
pub mod config;
pub mod error;
pub mod kernels;
pub mod parser;
pub mod pipeline;
pub mod stages;
pub mod traits;
pub mod types;
pub mod utils;

#[doc(hidden)]
pub use log as __log;

//==================================================================================
// 2. Public Re-exports
//==================================================================================
pub use bridge::{analyze, compress, compress_typed, compress_with_config, decompress, Decompressed};
pub use config::{BuildMode, VoxpipeConfig};
pub use error::{DecodeStatus, PipelineError, Segment, StageFailure};
pub use observability::init_logging;
pub use pipeline::{Header, LenientBuild, Pipeline, StageChain};
pub use stages::{Filter, FilterRegistry, Sink, SinkRegistry, Stage};
pub use types::{ElementType, NativeElement};
