//! This module defines shared traits used across different kernels.

use num_traits::{PrimInt, Unsigned, WrappingAdd, WrappingSub};

/// The unsigned machine word a kernel operates on.
///
/// Every element type is processed through the word of its width (`f32` as `u32`,
/// `i16` as `u16`, ...). Bit-level kernels are exact for any payload that way, and
/// wrapping arithmetic on the unsigned word is bit-identical to the signed one.
pub trait Word: PrimInt + Unsigned + WrappingAdd + WrappingSub + bytemuck::Pod {
    const BITS: u32;

    /// Zero-extends to 64 bits.
    fn widen(self) -> u64;
    /// Keeps the low `BITS` bits of `v`.
    fn narrow(v: u64) -> Self;
}

// Implement the trait for all unsigned primitive widths.
macro_rules! impl_word {
    ($($U:ty),+) => {
        $(
            impl Word for $U {
                const BITS: u32 = <$U>::BITS;

                #[inline]
                fn widen(self) -> u64 {
                    self as u64
                }

                #[inline]
                fn narrow(v: u64) -> Self {
                    v as $U
                }
            }
        )+
    };
}

impl_word!(u8, u16, u32, u64);
