use std::fmt;

/// The empty patch.
pub const EMPTY_PATCH: &[u8] = b"{}";

/// PatchResult is the outcome of a patch calculation.
///
/// `current` and `modified` are the documents the patch was computed from,
/// after the ignore rules and pruning ran. `original` is the last applied
/// configuration, if the live object carried one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchResult {
    pub patch: Vec<u8>,
    pub current: Vec<u8>,
    pub modified: Vec<u8>,
    pub original: Option<Vec<u8>>,
}

impl PatchResult {
    /// Returns true when the live object already matches the desired one.
    pub fn is_empty(&self) -> bool {
        self.patch == EMPTY_PATCH
    }

    pub fn patch_str(&self) -> String {
        String::from_utf8_lossy(&self.patch).into_owned()
    }
}

impl fmt::Display for PatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "Patch: {}", String::from_utf8_lossy(&self.patch))?;
        writeln!(f, "Current: {}", String::from_utf8_lossy(&self.current))?;
        writeln!(f, "Modified: {}", String::from_utf8_lossy(&self.modified))?;
        writeln!(
            f,
            "Original: {}",
            String::from_utf8_lossy(self.original.as_deref().unwrap_or_default())
        )
    }
}
