//! Building blocks shared by resource providers.
//!
//! * [`conditional`] - `If-Match` precondition checks
//! * [`metadata`] - `meta.location` and the User `groups` back-reference
//! * [`mutability`] - readOnly/immutable handling for create and replace

pub mod conditional;
pub mod metadata;
pub mod mutability;

pub use conditional::check_precondition;
pub use metadata::{LocationBase, group_references};
pub use mutability::{carry_over, strip_read_only};
