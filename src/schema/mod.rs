//! Schema module defines the merge schema of resource documents.
//!
//! A schema tells the patch calculation which lists are merged by key, which
//! are sets and which are replaced as a whole.

mod builtin;
mod elements;

pub use builtin::{builtin_schema, BUILTIN_SCHEMA_YAML};
pub use elements::*;
