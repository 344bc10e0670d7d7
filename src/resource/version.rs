//! Content-derived resource versions and ETag handling.
//!
//! Every create and every successful mutation stamps the resource with a
//! version computed by [`VersionCalculator`] from the resource's tracked
//! content: `schemas`, `externalId`, core attributes and extension blocks.
//! Server-managed fields (`id`, `meta`) never contribute, so equal content
//! always yields an equal tag regardless of when it was written.
//!
//! Versions come in two formats distinguished at compile time:
//!
//! * [`RawVersion`] - the opaque tag as stored (`"3q2+7w=="`)
//! * [`HttpVersion`] - the weak ETag form used on the wire (`W/"3q2+7w=="`)
//!
//! ```rust
//! use scim_engine::resource::version::{HttpVersion, RawVersion};
//!
//! let raw = RawVersion::from_content(br#"{"userName":"bjensen"}"#);
//! let etag = HttpVersion::from(raw.clone()).to_string();
//! assert!(etag.starts_with("W/\""));
//!
//! let parsed: HttpVersion = etag.parse().unwrap();
//! assert_eq!(raw, parsed);
//! ```

use super::Resource;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::{fmt, marker::PhantomData, str::FromStr};
use thiserror::Error;

/// Format marker for the wire (weak ETag) form.
#[derive(Debug, Clone, Copy)]
pub struct Http;

/// Format marker for the stored form.
#[derive(Debug, Clone, Copy)]
pub struct Raw;

/// Opaque version tag, parameterized by its textual format.
///
/// Comparison ignores the format: a [`RawVersion`] equals the [`HttpVersion`]
/// wrapping the same tag.
#[derive(Debug, Clone, Eq, Hash)]
pub struct ScimVersion<Format> {
    opaque: String,
    _format: PhantomData<Format>,
}

pub type HttpVersion = ScimVersion<Http>;
pub type RawVersion = ScimVersion<Raw>;

impl<Format> ScimVersion<Format> {
    /// Fingerprint arbitrary bytes: first 8 bytes of SHA-256, base64 encoded.
    pub fn from_content(content: &[u8]) -> RawVersion {
        let hash = Sha256::digest(content);
        ScimVersion {
            opaque: BASE64.encode(&hash[..8]),
            _format: PhantomData,
        }
    }

    /// Wrap a tag computed elsewhere, e.g. by a durable store.
    pub fn from_hash(hash_string: impl AsRef<str>) -> RawVersion {
        ScimVersion {
            opaque: hash_string.as_ref().to_string(),
            _format: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.opaque
    }
}

impl fmt::Display for ScimVersion<Raw> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.opaque)
    }
}

impl fmt::Display for ScimVersion<Http> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "W/\"{}\"", self.opaque)
    }
}

impl FromStr for ScimVersion<Raw> {
    type Err = VersionError;

    fn from_str(version_str: &str) -> Result<Self, Self::Err> {
        let trimmed = version_str.trim();
        if trimmed.is_empty() {
            return Err(VersionError::ParseError(
                "Version string cannot be empty".to_string(),
            ));
        }
        Ok(ScimVersion {
            opaque: trimmed.to_string(),
            _format: PhantomData,
        })
    }
}

impl FromStr for ScimVersion<Http> {
    type Err = VersionError;

    /// Accepts both weak (`W/"x"`) and strong (`"x"`) ETags.
    fn from_str(etag_header: &str) -> Result<Self, Self::Err> {
        let trimmed = etag_header.trim();
        let quoted = trimmed.strip_prefix("W/").unwrap_or(trimmed);
        let opaque = quoted
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
            .filter(|inner| !inner.is_empty())
            .ok_or_else(|| VersionError::InvalidEtagFormat(etag_header.to_string()))?;

        Ok(ScimVersion {
            opaque: opaque.to_string(),
            _format: PhantomData,
        })
    }
}

impl From<ScimVersion<Raw>> for ScimVersion<Http> {
    fn from(raw: ScimVersion<Raw>) -> Self {
        ScimVersion {
            opaque: raw.opaque,
            _format: PhantomData,
        }
    }
}

impl From<ScimVersion<Http>> for ScimVersion<Raw> {
    fn from(http: ScimVersion<Http>) -> Self {
        ScimVersion {
            opaque: http.opaque,
            _format: PhantomData,
        }
    }
}

impl<F1, F2> PartialEq<ScimVersion<F2>> for ScimVersion<F1> {
    fn eq(&self, other: &ScimVersion<F2>) -> bool {
        self.opaque == other.opaque
    }
}

impl<Format> Serialize for ScimVersion<Format> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.opaque.serialize(serializer)
    }
}

impl<'de, Format> Deserialize<'de> for ScimVersion<Format> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opaque = String::deserialize(deserializer)?;
        Ok(ScimVersion {
            opaque,
            _format: PhantomData,
        })
    }
}

/// Computes the version tag of a resource.
pub struct VersionCalculator;

impl VersionCalculator {
    /// Deterministic fingerprint of the resource's tracked content.
    ///
    /// JSON object keys serialize in sorted order, so attribute insertion order
    /// does not affect the tag.
    pub fn compute(resource: &Resource) -> RawVersion {
        let content = resource.tracked_content();
        let bytes = serde_json::to_vec(&content).unwrap_or_default();
        RawVersion::from_content(&bytes)
    }

    /// Whether `expected` still matches the resource's stored version.
    ///
    /// A resource that was never stamped matches nothing.
    pub fn matches(resource: &Resource, expected: &RawVersion) -> bool {
        resource
            .meta
            .as_ref()
            .and_then(|meta| meta.raw_version())
            .is_some_and(|current| current == *expected)
    }

    /// `Ok` when `expected` is absent or still matches the stored version.
    pub fn check(resource: &Resource, expected: Option<&RawVersion>) -> Result<(), VersionConflict> {
        match expected {
            Some(expected) if !Self::matches(resource, expected) => {
                let current = resource.version().unwrap_or_else(|| Self::compute(resource));
                Err(VersionConflict::standard_message(expected.clone(), current))
            }
            _ => Ok(()),
        }
    }
}

/// An `If-Match` version that no longer matches the stored resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("expected version '{expected}', found '{current}'. {message}")]
pub struct VersionConflict {
    /// Version the client sent
    pub expected: RawVersion,
    /// Version currently stored
    pub current: RawVersion,
    pub message: String,
}

impl VersionConflict {
    pub fn new<E, C>(expected: E, current: C, message: impl Into<String>) -> Self
    where
        E: Into<RawVersion>,
        C: Into<RawVersion>,
    {
        Self {
            expected: expected.into(),
            current: current.into(),
            message: message.into(),
        }
    }

    pub fn standard_message<E, C>(expected: E, current: C) -> Self
    where
        E: Into<RawVersion>,
        C: Into<RawVersion>,
    {
        Self::new(
            expected,
            current,
            "Resource was modified by another client",
        )
    }
}

/// Errors raised while parsing version strings.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum VersionError {
    #[error("Invalid ETag format: {0}")]
    InvalidEtagFormat(String),

    #[error("Failed to parse version: {0}")]
    ParseError(String),
}
