//! This module defines the core, strongly-typed data representations used
//! throughout the voxpipe pipeline.
//!
//! It currently includes the canonical `ElementType` enum, the runtime identity tag
//! every stage reports for its input and output, and the `NativeElement` bridge from
//! Rust primitives to that tag.

pub mod element_type;

// Re-export the main type(s) for easier access.
pub use element_type::{ElementType, NativeElement};
