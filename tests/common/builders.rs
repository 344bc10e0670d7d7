//! Test data builders for request bodies.
//!
//! Builders start from a minimal valid representation; each `with_*`/`without_*`
//! step changes one thing so a test states exactly what it varies.

use serde_json::{Value, json};

pub const USER_SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:User";
pub const GROUP_SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:Group";
pub const ENTERPRISE_SCHEMA: &str = "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User";
pub const PATCH_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:PatchOp";

/// Builder for User request bodies
#[derive(Debug, Clone)]
pub struct UserBuilder {
    data: Value,
}

impl UserBuilder {
    /// Minimal valid User
    pub fn new(user_name: &str) -> Self {
        Self {
            data: json!({
                "schemas": [USER_SCHEMA],
                "userName": user_name
            }),
        }
    }

    /// RFC 7643 §8.2 style full User, without server-assigned fields
    pub fn new_full(user_name: &str) -> Self {
        Self {
            data: json!({
                "schemas": [USER_SCHEMA],
                "externalId": "701984",
                "userName": user_name,
                "name": {
                    "formatted": "Ms. Barbara J Jensen, III",
                    "familyName": "Jensen",
                    "givenName": "Barbara",
                    "middleName": "Jane",
                    "honorificPrefix": "Ms.",
                    "honorificSuffix": "III"
                },
                "displayName": "Babs Jensen",
                "emails": [
                    {"value": "bjensen@example.com", "type": "work", "primary": true},
                    {"value": "babs@jensen.org", "type": "home"}
                ],
                "phoneNumbers": [
                    {"value": "555-555-5555", "type": "work"},
                    {"value": "555-555-4444", "type": "mobile"}
                ],
                "active": true
            }),
        }
    }

    pub fn without_schemas(mut self) -> Self {
        if let Some(obj) = self.data.as_object_mut() {
            obj.remove("schemas");
        }
        self
    }

    pub fn with_schemas(mut self, schemas: &[&str]) -> Self {
        self.data["schemas"] = json!(schemas);
        self
    }

    pub fn without_username(mut self) -> Self {
        if let Some(obj) = self.data.as_object_mut() {
            obj.remove("userName");
        }
        self
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.data["id"] = json!(id);
        self
    }

    pub fn with_display_name(mut self, display_name: &str) -> Self {
        self.data["displayName"] = json!(display_name);
        self
    }

    pub fn with_family_name(mut self, family_name: &str) -> Self {
        self.data["name"] = json!({"familyName": family_name});
        self
    }

    pub fn with_email(mut self, email: &str, email_type: &str, primary: bool) -> Self {
        let mut emails = self.data["emails"].as_array().cloned().unwrap_or_default();
        emails.push(json!({"value": email, "type": email_type, "primary": primary}));
        self.data["emails"] = json!(emails);
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.data["active"] = json!(active);
        self
    }

    /// Set any core attribute
    pub fn with(mut self, attribute: &str, value: Value) -> Self {
        self.data[attribute] = value;
        self
    }

    /// Add the enterprise extension with the given attributes
    pub fn with_enterprise(mut self, block: Value) -> Self {
        self.data[ENTERPRISE_SCHEMA] = block;
        let mut schemas = self.data["schemas"].as_array().cloned().unwrap_or_default();
        if !schemas.iter().any(|s| s == ENTERPRISE_SCHEMA) {
            schemas.push(json!(ENTERPRISE_SCHEMA));
        }
        self.data["schemas"] = json!(schemas);
        self
    }

    pub fn build(self) -> Value {
        self.data
    }
}

/// Builder for Group request bodies
#[derive(Debug, Clone)]
pub struct GroupBuilder {
    data: Value,
}

impl GroupBuilder {
    pub fn new(display_name: &str) -> Self {
        Self {
            data: json!({
                "schemas": [GROUP_SCHEMA],
                "displayName": display_name
            }),
        }
    }

    pub fn with_member(mut self, user_id: &str) -> Self {
        let mut members = self.data["members"].as_array().cloned().unwrap_or_default();
        members.push(json!({"value": user_id, "type": "User"}));
        self.data["members"] = json!(members);
        self
    }

    pub fn build(self) -> Value {
        self.data
    }
}

/// A PATCH body from `(op, path, value)` triples.
pub fn patch_body(operations: &[(&str, Option<&str>, Option<Value>)]) -> Value {
    let operations: Vec<Value> = operations
        .iter()
        .map(|(op, path, value)| {
            let mut operation = json!({"op": op});
            if let Some(path) = path {
                operation["path"] = json!(path);
            }
            if let Some(value) = value {
                operation["value"] = value.clone();
            }
            operation
        })
        .collect();
    json!({"schemas": [PATCH_SCHEMA], "Operations": operations})
}
