// In: src/bridge/mod.rs

// ====================================================================================
// ARCHITECTURAL OVERVIEW: The Bridge Layer
// ====================================================================================
//
// The `bridge` is the public-facing, stateless API of the voxpipe library. It wraps
// the `pipeline` engine so that a caller only ever deals with a description, an
// element type, a shape and bytes.
//
// Data Flow (Compression):
//
//   1. [Stateless API (compress / compress_typed / compress_array)]
//         |
//         `-> a. Builds a `Pipeline` from the description (strict or lenient)
//         |
//         `-> b. Encodes into a buffer sized by `max_encoded_size`
//
//   2. [Pipeline Engine] -> Returns a self-describing `Vec<u8>` (header + payload)
//
//
// Data Flow (Decompression):
//
//   1. [Stateless API (decompress)] -> Receives `&[u8]`
//         |
//         `-> a. `Pipeline::bootstrap` rebuilds the stages from the header
//         |
//         `-> b. Decodes into a buffer sized by the header's raw size
//
//   2. [Decompressed] -> bytes + shape + element type, optionally as an `ArrayD<T>`
//
// `filter_plugin` adapts the same operations to the callback shape a host storage
// library expects from a dynamically loaded compression filter.
// ====================================================================================
pub mod filter_plugin;
pub mod format;
pub mod stateless_api;

// --- Low-Level Stateless API ---
pub use stateless_api::{
    analyze, compress, compress_array, compress_typed, compress_with_config, decompress,
    Decompressed,
};

// --- Format Constants and Structs ---
pub use format::CompressionStats;

#[cfg(test)]
mod tests;
