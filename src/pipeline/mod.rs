// ====================================================================================
// ARCHITECTURAL OVERVIEW: The Pipeline Engine
// ====================================================================================
//
// A pipeline is a head chain of filters over the raw element type, an optional
// sink (the one stage allowed to shrink and retype the data) and a tail chain of
// byte filters. It is built from a description such as
// `delta->bitswap1->lz4(accel=8)->xor_delta`.
//
// Data Flow (Encode):
//
//   raw bytes -> [head chain] -> scratch -> [sink] -> payload -> [tail chain] -> payload
//                                                                        |
//   output = [container header (type, shape, name, sizes)] [payload] <--'
//
// Data Flow (Decode):
//
//   header -> payload -> [tail chain]^-1 -> [sink]^-1 -> [head chain]^-1 -> raw bytes
//
// The header makes every buffer self-describing: `Pipeline::bootstrap` rebuilds
// the exact stage sequence from it.
// ====================================================================================

mod builder;
pub mod chain;
mod core;
pub mod header;

pub use builder::LenientBuild;
pub use chain::StageChain;
pub use core::Pipeline;
pub use header::Header;
