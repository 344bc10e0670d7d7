//! The `meta` block stamped on every stored resource.

use super::version::{HttpVersion, RawVersion};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-managed resource metadata (RFC 7643 §3.1).
///
/// `created` is set once by the create workflow and never touched again;
/// `last_modified` and `version` are refreshed on every successful mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub resource_type: String,
    pub created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Weak ETag form, e.g. `W/"3q2+7w=="`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Meta {
    /// Meta for a resource created at `now`: `created == lastModified`.
    pub fn new_for_creation(resource_type: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            resource_type: resource_type.into(),
            created: now,
            last_modified: now,
            location: None,
            version: None,
        }
    }

    /// Copy with `last_modified` moved to `now`, never before `created`.
    pub fn touched(&self, now: DateTime<Utc>) -> Self {
        Self {
            last_modified: now.max(self.created),
            ..self.clone()
        }
    }

    pub fn with_location(mut self, location: Option<String>) -> Self {
        self.location = location;
        self
    }

    pub fn with_version(mut self, version: &RawVersion) -> Self {
        self.version = Some(HttpVersion::from(version.clone()).to_string());
        self
    }

    /// The stored version, if it parses as an ETag.
    pub fn raw_version(&self) -> Option<RawVersion> {
        let http: HttpVersion = self.version.as_deref()?.parse().ok()?;
        Some(http.into())
    }

    /// `{base_url}/{version}{endpoint}/{id}`, e.g. `https://host/v2/Users/42`.
    pub fn generate_location(
        base_url: &str,
        scim_version: &str,
        endpoint: &str,
        resource_id: &str,
    ) -> String {
        let base = base_url.trim_end_matches('/');
        let endpoint = endpoint.trim_matches('/');
        if scim_version.is_empty() {
            format!("{}/{}/{}", base, endpoint, resource_id)
        } else {
            format!(
                "{}/{}/{}/{}",
                base,
                scim_version.trim_matches('/'),
                endpoint,
                resource_id
            )
        }
    }
}
