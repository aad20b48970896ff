//! Patch calculation.
//!
//! [`PatchMaker::calculate`] serializes both objects, runs the ignore rules,
//! prunes unset fields and computes a three-way patch against the last
//! applied configuration. An empty patch (`{}`) means the live object
//! already matches the desired one.

mod maker;
mod options;
mod result;


pub use maker::PatchMaker;
pub use options::{
    ignore_field, ignore_pdb_selector, ignore_status_fields,
    ignore_volume_claim_template_type_meta_and_status, CalculateOption, FnOption, IgnoreField,
    IgnorePdbSelector, IgnoreStatusFields, IgnoreVolumeClaimTemplateTypeMetaAndStatus,
};
pub use result::{PatchResult, EMPTY_PATCH};
