//! Validation tests: every rule is exercised through create or replace so the
//! error seen is the one a client would see.

pub mod characteristics;
pub mod schema_structure;
