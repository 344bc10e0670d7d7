//! `If-Match` preconditions for replace, patch and delete.
//!
//! A write carrying an expected version only proceeds when that version is
//! still the stored one. Versions are content-derived, so a client that read
//! the resource, and a client that happens to hold identical content, both
//! pass.

use crate::error::ScimResult;
use crate::resource::version::{RawVersion, VersionCalculator};
use crate::resource::Resource;
use log::debug;

/// Fail with `PreconditionFailed` when `expected` no longer matches `stored`.
///
/// `None` means the request was unconditional.
pub fn check_precondition(stored: &Resource, expected: Option<&RawVersion>) -> ScimResult<()> {
    VersionCalculator::check(stored, expected).map_err(|conflict| {
        debug!(
            "Precondition failed for {} '{}': expected {}, current {}",
            stored.resource_type,
            stored.id().unwrap_or("<unassigned>"),
            conflict.expected,
            conflict.current
        );
        conflict.into()
    })
}
