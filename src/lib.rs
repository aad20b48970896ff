//! # Kubernetes Object Matcher
//!
//! Semantic drift detection and three-way patch calculation for Kubernetes
//! resource objects.
//!
//! A live object read back from the API server carries defaults, generated
//! identifiers and admission-time mutations that the desired configuration
//! never mentions. This library decides whether the live object already
//! matches the desired one and, when it does not, computes the patch that
//! would reconcile them.
//!
//! ## Modules
//!
//! - [`value`] - In-memory representation of JSON/YAML documents
//! - [`schema`] - Type schema naming the merge keys of associative lists
//! - [`codec`] - Canonical JSON encoding of resource objects
//! - [`prune`] - Removal of unset fields before comparison
//! - [`annotation`] - Last applied configuration stored on the object
//! - [`strategic`] - Strategic merge and JSON merge patches
//! - [`patch`] - Three-way patch calculation with ignore rules
//! - [`objectmatch`] - Per-kind matchers deciding whether objects match
//! - [`defaults`] - Server defaults applied to desired objects
//! - [`config`] - Configuration file

pub mod annotation;
pub mod codec;
pub mod config;
pub mod defaults;
pub mod error;
pub mod object;
pub mod objectmatch;
pub mod patch;
pub mod prune;
pub mod schema;
pub mod strategic;
pub mod value;

pub use annotation::{Annotator, LAST_APPLIED_CONFIG};
pub use config::Config;
pub use error::{Error, Result};
pub use object::{Kind, ResourceObject};
pub use objectmatch::{KindMatcher, ObjectMatcher};
pub use patch::{CalculateOption, PatchMaker, PatchResult};
pub use schema::Schema;
pub use value::Value;
