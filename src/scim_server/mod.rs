//! SCIM server: startup, configuration and request dispatch.
//!
//! # Module Organization
//!
//! * [`config`] - [`ScimServerConfig`] and the settings derived from it
//! * [`builder`] - [`ScimServerBuilder`], where the type-definition registry is resolved
//! * [`core`] - the [`ScimServer`] struct
//! * [`operations`] - [`ScimRequest`] and [`ScimServer::handle`]
//! * [`schema_management`] - `/Schemas` and `/ResourceTypes` documents

pub mod builder;
pub mod config;
pub mod core;
pub mod operations;
pub mod schema_management;


pub use builder::ScimServerBuilder;
pub use config::ScimServerConfig;
pub use core::ScimServer;
pub use operations::ScimRequest;
