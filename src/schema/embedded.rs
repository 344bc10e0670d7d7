//! Embedded core SCIM schemas.
//!
//! The built-in resource types (User, Group) and the enterprise User extension
//! ship as static JSON so the registry never touches the filesystem. Attribute
//! characteristics that match the defaults in [`AttributeDefinition`] are left
//! out of the JSON.
//!
//! [`AttributeDefinition`]: super::AttributeDefinition

pub const USER_SCHEMA_ID: &str = "urn:ietf:params:scim:schemas:core:2.0:User";
pub const GROUP_SCHEMA_ID: &str = "urn:ietf:params:scim:schemas:core:2.0:Group";
pub const ENTERPRISE_USER_SCHEMA_ID: &str =
    "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User";

/// Returns the core User schema as a JSON string.
///
/// RFC 7643 §4.1 plus the common `id`, `externalId` and `meta` attributes.
pub fn core_user_schema() -> &'static str {
    r#"{
  "id": "urn:ietf:params:scim:schemas:core:2.0:User",
  "name": "User",
  "description": "User Account",
  "attributes": [
    {"name": "id", "caseExact": true, "mutability": "readOnly", "returned": "always", "uniqueness": "server"},
    {"name": "externalId", "caseExact": true},
    {"name": "userName", "required": true, "uniqueness": "server"},
    {"name": "name", "type": "complex", "subAttributes": [
      {"name": "formatted"},
      {"name": "familyName"},
      {"name": "givenName"},
      {"name": "middleName"},
      {"name": "honorificPrefix"},
      {"name": "honorificSuffix"}
    ]},
    {"name": "displayName"},
    {"name": "nickName"},
    {"name": "profileUrl", "type": "reference"},
    {"name": "title"},
    {"name": "userType"},
    {"name": "preferredLanguage"},
    {"name": "locale"},
    {"name": "timezone"},
    {"name": "active", "type": "boolean"},
    {"name": "password", "mutability": "writeOnly", "returned": "never"},
    {"name": "emails", "type": "complex", "multiValued": true, "subAttributes": [
      {"name": "value", "required": true},
      {"name": "display"},
      {"name": "type", "canonicalValues": ["work", "home", "other"]},
      {"name": "primary", "type": "boolean"}
    ]},
    {"name": "phoneNumbers", "type": "complex", "multiValued": true, "subAttributes": [
      {"name": "value", "required": true},
      {"name": "display"},
      {"name": "type", "canonicalValues": ["work", "home", "mobile", "fax", "pager", "other"]},
      {"name": "primary", "type": "boolean"}
    ]},
    {"name": "ims", "type": "complex", "multiValued": true, "subAttributes": [
      {"name": "value", "required": true},
      {"name": "display"},
      {"name": "type", "canonicalValues": ["aim", "gtalk", "icq", "xmpp", "msn", "skype", "qq", "yahoo"]},
      {"name": "primary", "type": "boolean"}
    ]},
    {"name": "photos", "type": "complex", "multiValued": true, "subAttributes": [
      {"name": "value", "type": "reference", "required": true},
      {"name": "display"},
      {"name": "type", "canonicalValues": ["photo", "thumbnail"]},
      {"name": "primary", "type": "boolean"}
    ]},
    {"name": "addresses", "type": "complex", "multiValued": true, "subAttributes": [
      {"name": "formatted"},
      {"name": "streetAddress"},
      {"name": "locality"},
      {"name": "region"},
      {"name": "postalCode"},
      {"name": "country"},
      {"name": "type", "canonicalValues": ["work", "home", "other"]},
      {"name": "primary", "type": "boolean"}
    ]},
    {"name": "groups", "type": "complex", "multiValued": true, "mutability": "readOnly", "subAttributes": [
      {"name": "value", "mutability": "readOnly"},
      {"name": "$ref", "type": "reference", "mutability": "readOnly"},
      {"name": "display", "mutability": "readOnly"},
      {"name": "type", "mutability": "readOnly", "canonicalValues": ["direct", "indirect"]}
    ]},
    {"name": "entitlements", "type": "complex", "multiValued": true, "subAttributes": [
      {"name": "value"},
      {"name": "display"},
      {"name": "type"},
      {"name": "primary", "type": "boolean"}
    ]},
    {"name": "roles", "type": "complex", "multiValued": true, "subAttributes": [
      {"name": "value"},
      {"name": "display"},
      {"name": "type"},
      {"name": "primary", "type": "boolean"}
    ]},
    {"name": "x509Certificates", "type": "complex", "multiValued": true, "subAttributes": [
      {"name": "value", "type": "binary"},
      {"name": "display"},
      {"name": "type"},
      {"name": "primary", "type": "boolean"}
    ]},
    {"name": "meta", "type": "complex", "mutability": "readOnly", "subAttributes": [
      {"name": "resourceType", "caseExact": true, "mutability": "readOnly"},
      {"name": "created", "type": "dateTime", "mutability": "readOnly"},
      {"name": "lastModified", "type": "dateTime", "mutability": "readOnly"},
      {"name": "location", "type": "reference", "caseExact": true, "mutability": "readOnly"},
      {"name": "version", "caseExact": true, "mutability": "readOnly"}
    ]}
  ]
}"#
}

/// Returns the core Group schema as a JSON string.
pub fn core_group_schema() -> &'static str {
    r#"{
  "id": "urn:ietf:params:scim:schemas:core:2.0:Group",
  "name": "Group",
  "description": "Group",
  "attributes": [
    {"name": "id", "caseExact": true, "mutability": "readOnly", "returned": "always", "uniqueness": "server"},
    {"name": "externalId", "caseExact": true},
    {"name": "displayName", "required": true, "uniqueness": "server"},
    {"name": "members", "type": "complex", "multiValued": true, "subAttributes": [
      {"name": "value", "caseExact": true, "mutability": "immutable"},
      {"name": "$ref", "type": "reference", "caseExact": true, "mutability": "immutable"},
      {"name": "type", "mutability": "immutable", "canonicalValues": ["User", "Group"]},
      {"name": "display", "mutability": "readOnly"}
    ]},
    {"name": "meta", "type": "complex", "mutability": "readOnly", "subAttributes": [
      {"name": "resourceType", "caseExact": true, "mutability": "readOnly"},
      {"name": "created", "type": "dateTime", "mutability": "readOnly"},
      {"name": "lastModified", "type": "dateTime", "mutability": "readOnly"},
      {"name": "location", "type": "reference", "caseExact": true, "mutability": "readOnly"},
      {"name": "version", "caseExact": true, "mutability": "readOnly"}
    ]}
  ]
}"#
}

/// Returns the enterprise User extension schema as a JSON string.
pub fn enterprise_user_schema() -> &'static str {
    r#"{
  "id": "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User",
  "name": "EnterpriseUser",
  "description": "Enterprise User",
  "attributes": [
    {"name": "employeeNumber"},
    {"name": "costCenter"},
    {"name": "organization"},
    {"name": "division"},
    {"name": "department"},
    {"name": "manager", "type": "complex", "subAttributes": [
      {"name": "value"},
      {"name": "$ref", "type": "reference"},
      {"name": "displayName", "mutability": "readOnly"}
    ]}
  ]
}"#
}
