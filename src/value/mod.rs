//! Value module - In-memory representation of resource documents.
//!
//! Every stage of the matcher (pruning, ignore rules, patch calculation)
//! works on this tree instead of typed structures.

mod value;

pub use value::*;
