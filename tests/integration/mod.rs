//! Integration tests over the public API.

pub mod conditional_operations;
pub mod end_to_end;
pub mod filter_table;
pub mod pagination;
pub mod patch_operations;
pub mod registry;
pub mod versioning;
