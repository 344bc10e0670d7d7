//! SCIM resource model.
//!
//! # Key Components
//!
//! * [`Resource`] - typed envelope (`id`, `schemas`, `meta`) around JSON attributes
//! * [`Meta`] - server-managed timestamps, location and version
//! * [`version`] - content-derived versions and ETag conversion
//! * [`Projection`] - `attributes` / `excludedAttributes` handling
//! * [`RequestContext`] / [`ListQuery`] - per-request data passed to providers

pub mod attributes;
pub mod context;
pub mod meta;
pub mod projection;
pub mod resource;
pub mod version;

pub use context::{ListQuery, RequestContext, SortOrder};
pub use meta::Meta;
pub use projection::Projection;
pub use resource::Resource;
pub use version::{HttpVersion, RawVersion, VersionCalculator, VersionConflict, VersionError};

pub(crate) use resource::value_kind;
