//! # Internal Macros
//!
//! ## zerocopy_accessors!
//!
//! Generates getter and setter methods for zerocopy struct fields stored as
//! little-endian `U32`. Every on-disk field in sampledb is 32 bits wide.
//!
//! ```ignore
//! impl Descriptor {
//!     zerocopy_accessors! {
//!         page_capacity,
//!         used_pages,
//!     }
//! }
//!
//! // Generates:
//! // pub fn page_capacity(&self) -> u32 { self.page_capacity.get() }
//! // pub fn set_page_capacity(&mut self, val: u32) { self.page_capacity = U32::new(val); }
//! ```

/// Generates getter and setter methods for zerocopy little-endian `U32` fields.
#[macro_export]
macro_rules! zerocopy_accessors {
    (@impl $field:ident) => {
        ::paste::paste! {
            #[inline]
            pub fn $field(&self) -> u32 {
                self.$field.get()
            }

            #[inline]
            pub fn [<set_ $field>](&mut self, val: u32) {
                self.$field = ::zerocopy::little_endian::U32::new(val);
            }
        }
    };
    ($($field:ident),* $(,)?) => {
        $(
            $crate::zerocopy_accessors!(@impl $field);
        )*
    };
}
