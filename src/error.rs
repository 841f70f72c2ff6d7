//! # Store Error Kinds
//!
//! Fallible functions in sampledb return `eyre::Result` like the rest of the
//! crate. The failures a caller may want to branch on are raised as a
//! [`StoreError`] inside the report and can be recovered with
//! `report.downcast_ref::<StoreError>()`:
//!
//! ```ignore
//! match SampleDb::open(path) {
//!     Err(e) if matches!(
//!         e.downcast_ref::<StoreError>(),
//!         Some(StoreError::StorageUnavailable { .. })
//!     ) => retry_later(),
//!     other => other?,
//! }
//! ```
//!
//! Structural corruption found by the checker is not an error; it is reported
//! as a list of [`crate::btree::Violation`]s. Accumulator overflow saturates.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// Open, resize, map or flush failed at the OS level.
    #[error("storage unavailable: failed to {op} '{}': {source}", path.display())]
    StorageUnavailable {
        path: PathBuf,
        op: &'static str,
        #[source]
        source: io::Error,
    },

    /// The descriptor of an existing file does not describe a valid store.
    #[error("invalid descriptor in '{}': {reason}", path.display())]
    InvalidDescriptor { path: PathBuf, reason: String },

    #[error("store '{}' is opened read-only", path.display())]
    ReadOnly { path: PathBuf },

    /// Doubling the capacity would reach the nil page index.
    #[error("page capacity exhausted at {capacity} pages")]
    CapacityExhausted { capacity: u32 },

    #[error("page {page} out of bounds (page_capacity={capacity})")]
    PageOutOfBounds { page: u32, capacity: u32 },
}

impl StoreError {
    pub(crate) fn unavailable(path: impl Into<PathBuf>, op: &'static str, source: io::Error) -> Self {
        Self::StorageUnavailable {
            path: path.into(),
            op,
            source,
        }
    }

    pub(crate) fn invalid(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidDescriptor {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_unavailable_message_names_path_and_os_error() {
        let err = StoreError::unavailable(
            "/tmp/samples.db",
            "resize",
            io::Error::new(io::ErrorKind::Other, "disk full"),
        );

        let msg = err.to_string();
        assert!(msg.contains("/tmp/samples.db"));
        assert!(msg.contains("resize"));
        assert!(msg.contains("disk full"));
    }

    #[test]
    fn store_error_survives_eyre_wrapping() {
        let report: eyre::Report = StoreError::ReadOnly {
            path: PathBuf::from("a.db"),
        }
        .into();

        assert!(matches!(
            report.downcast_ref::<StoreError>(),
            Some(StoreError::ReadOnly { .. })
        ));
    }
}
