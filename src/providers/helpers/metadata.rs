//! Response-time metadata: `meta.location` and the User `groups` back-reference.
//!
//! Neither is stored. Both are derived when a resource leaves the provider,
//! so they never feed into the content version.

use crate::resource::{Meta, Resource};
use crate::resource::attributes::get_ci;
use serde_json::{Value, json};

/// Where resources are addressed from, e.g. `https://host` + `v2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationBase {
    pub base_url: String,
    pub scim_version: String,
}

impl LocationBase {
    pub fn new(base_url: impl Into<String>, scim_version: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            scim_version: scim_version.into(),
        }
    }

    pub fn location(&self, endpoint: &str, id: &str) -> String {
        Meta::generate_location(&self.base_url, &self.scim_version, endpoint, id)
    }

    /// Set `meta.location` when the resource has an id and a meta block.
    pub fn stamp(&self, resource: &mut Resource, endpoint: &str) {
        let Some(id) = resource.id.clone() else {
            return;
        };
        if let Some(meta) = resource.meta.take() {
            resource.meta = Some(meta.with_location(Some(self.location(endpoint, &id))));
        }
    }
}

/// `groups` entries for `user_id`: one per group listing it in `members`.
pub fn group_references(
    user_id: &str,
    groups: &[Resource],
    base: &LocationBase,
    group_endpoint: &str,
) -> Vec<Value> {
    groups
        .iter()
        .filter(|group| lists_member(group, user_id))
        .filter_map(|group| {
            let id = group.id()?;
            let mut entry = json!({
                "value": id,
                "$ref": base.location(group_endpoint, id),
                "type": "direct",
            });
            if let Some(display) = group.get_str("displayName") {
                entry["display"] = Value::String(display.to_string());
            }
            Some(entry)
        })
        .collect()
}

fn lists_member(group: &Resource, user_id: &str) -> bool {
    group
        .get("members")
        .and_then(Value::as_array)
        .is_some_and(|members| {
            members.iter().any(|member| {
                member
                    .as_object()
                    .and_then(|obj| get_ci(obj, "value"))
                    .and_then(Value::as_str)
                    == Some(user_id)
            })
        })
}
