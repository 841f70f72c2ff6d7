//! Saturating accumulation of sample counts.
//!
//! Counters never wrap: once a value reaches the maximum of its width it
//! stays there. The rule is expressed per width rather than as a fixed
//! 32-bit overflow test, so widening `Value` keeps the semantic.

pub trait Accumulate: Copy {
    fn accumulate(self, other: Self) -> Self;
}

macro_rules! impl_accumulate {
    ($($t:ty),* $(,)?) => {
        $(
            impl Accumulate for $t {
                #[inline]
                fn accumulate(self, other: Self) -> Self {
                    self.saturating_add(other)
                }
            }
        )*
    };
}

impl_accumulate!(u8, u16, u32, u64, u128, usize);
