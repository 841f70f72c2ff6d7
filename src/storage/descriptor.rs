//! # Store Descriptor
//!
//! The descriptor sits right after the caller header and records how much of
//! the page array exists and is in use:
//!
//! ```text
//! Offset  Size  Field          Description
//! ------  ----  -------------  ------------------------------------
//! 0       4     page_capacity  Pages the file currently has room for
//! 4       4     used_pages     Pages handed out by add_page
//! 8       4     root_page      Index of the root page
//! 12      4     reserved       Zero
//! ```
//!
//! `page_capacity` is only ever raised after the file has been extended and
//! the new pages initialised, so a reader never sees capacity that is not
//! backed by valid pages.

use eyre::Result;
use zerocopy::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::config::DESCRIPTOR_SIZE;

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct Descriptor {
    page_capacity: U32,
    used_pages: U32,
    root_page: U32,
    reserved: U32,
}

const _: () = assert!(std::mem::size_of::<Descriptor>() == DESCRIPTOR_SIZE);

impl Descriptor {
    pub fn new(page_capacity: u32, used_pages: u32, root_page: u32) -> Self {
        Self {
            page_capacity: U32::new(page_capacity),
            used_pages: U32::new(used_pages),
            root_page: U32::new(root_page),
            reserved: U32::new(0),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        Self::ref_from_bytes(bytes)
            .map_err(|e| eyre::eyre!("failed to read Descriptor: {:?}", e))
    }

    pub fn from_bytes_mut(bytes: &mut [u8]) -> Result<&mut Self> {
        Self::mut_from_bytes(bytes)
            .map_err(|e| eyre::eyre!("failed to read Descriptor: {:?}", e))
    }

    zerocopy_accessors! {
        page_capacity,
        used_pages,
        root_page,
    }

    /// Describes why this descriptor cannot belong to a valid store, if it can't.
    pub fn validate(&self) -> Option<String> {
        let capacity = self.page_capacity();
        let used = self.used_pages();
        let root = self.root_page();

        if capacity == 0 {
            return Some("page capacity is zero".to_string());
        }
        if used == 0 || used > capacity {
            return Some(format!(
                "used page count {} outside 1..={}",
                used, capacity
            ));
        }
        if root >= used {
            return Some(format!("root page {} not below used page count {}", root, used));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bytes() {
        let desc = Descriptor::new(32, 5, 4);
        let bytes = desc.as_bytes().to_vec();

        let read = Descriptor::from_bytes(&bytes).unwrap();

        assert_eq!(read.page_capacity(), 32);
        assert_eq!(read.used_pages(), 5);
        assert_eq!(read.root_page(), 4);
    }

    #[test]
    fn from_bytes_rejects_wrong_length() {
        assert!(Descriptor::from_bytes(&[0u8; 12]).is_err());
    }

    #[test]
    fn validate_accepts_fresh_store() {
        assert_eq!(Descriptor::new(26, 1, 0).validate(), None);
    }

    #[test]
    fn validate_rejects_inconsistent_counts() {
        assert!(Descriptor::new(0, 0, 0).validate().is_some());
        assert!(Descriptor::new(4, 0, 0).validate().is_some());
        assert!(Descriptor::new(4, 5, 0).validate().is_some());
        assert!(Descriptor::new(4, 2, 2).validate().is_some());
    }
}
