//! Kind dispatch for resource objects.

use std::fmt;

/// Kind selects the normalizer used when matching two objects.
///
/// Only the kinds that carry server-side artifacts worth stripping have their
/// own variant. Every other kind, including documents without type meta,
/// is `Other` and goes through the generic path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Pod,
    Service,
    PersistentVolumeClaim,
    Other,
}

impl Kind {
    /// Classifies an object by its `apiVersion` and `kind`.
    ///
    /// The dedicated kinds all live in the core API group, so a `Pod` from
    /// another group is `Other`.
    pub fn from_type_meta(api_version: &str, kind: &str) -> Kind {
        if !api_group(api_version).is_empty() {
            return Kind::Other;
        }
        match kind {
            "Pod" => Kind::Pod,
            "Service" => Kind::Service,
            "PersistentVolumeClaim" => Kind::PersistentVolumeClaim,
            _ => Kind::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Pod => "Pod",
            Kind::Service => "Service",
            Kind::PersistentVolumeClaim => "PersistentVolumeClaim",
            Kind::Other => "Other",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Returns the API group of an `apiVersion`; the core group is empty.
pub fn api_group(api_version: &str) -> &str {
    match api_version.split_once('/') {
        Some((group, _)) => group,
        None => "",
    }
}
