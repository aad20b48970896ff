//! Error types shared by every stage of the matcher.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Error is returned by every fallible operation of the crate.
///
/// Nothing is retried internally: errors are wrapped with the stage and the
/// object they belong to and handed back to the caller.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{context}: {source}")]
    Encoding {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{context}: {source}")]
    Yaml {
        context: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("metadata accessor: {message}")]
    Annotation { message: String },

    #[error("option {stage} failed for object {object}: {source}")]
    Option {
        stage: String,
        object: String,
        #[source]
        source: Box<Error>,
    },

    #[error("merge: {message}")]
    Merge { message: String },

    #[error("unsupported kind {kind}, expected {expected}")]
    UnsupportedKind { kind: String, expected: String },

    #[error("{context} (object {object}): {source}")]
    Context {
        context: String,
        object: String,
        #[source]
        source: Box<Error>,
    },

    #[error("config: {source}")]
    Config {
        #[source]
        source: serde_yaml::Error,
    },

    #[error("config: cannot read {path}: {source}")]
    ConfigIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Creates an encoding error.
    pub fn encoding(context: impl Into<String>, source: serde_json::Error) -> Self {
        Error::Encoding {
            context: context.into(),
            source,
        }
    }

    /// Creates a YAML decoding error.
    pub fn yaml(context: impl Into<String>, source: serde_yaml::Error) -> Self {
        Error::Yaml {
            context: context.into(),
            source,
        }
    }

    /// Creates a metadata accessor error.
    pub fn annotation(message: impl Into<String>) -> Self {
        Error::Annotation {
            message: message.into(),
        }
    }

    /// Creates a merge error.
    pub fn merge(message: impl Into<String>) -> Self {
        Error::Merge {
            message: message.into(),
        }
    }

    /// Creates an unsupported kind error.
    pub fn unsupported_kind(kind: impl Into<String>, expected: impl Into<String>) -> Self {
        Error::UnsupportedKind {
            kind: kind.into(),
            expected: expected.into(),
        }
    }

    /// Wraps the error with the failing stage and the object name.
    pub fn context(self, context: impl Into<String>, object: impl Into<String>) -> Self {
        Error::Context {
            context: context.into(),
            object: object.into(),
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, skipping every context layer.
    pub fn root(&self) -> &Error {
        match self {
            Error::Context { source, .. } | Error::Option { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Extension for attaching stage and object context to results.
pub trait ResultExt<T> {
    fn context(self, context: &str, object: &str) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: &str, object: &str) -> Result<T> {
        self.map_err(|e| e.context(context, object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_display() {
        let err = Error::merge("missing merge key name").context("failed to generate strategic merge patch", "web");
        let display = format!("{}", err);
        assert!(display.contains("web"));
        assert!(display.contains("missing merge key name"));
    }

    #[test]
    fn test_root_skips_layers() {
        let err = Error::annotation("no metadata")
            .context("failed to get original configuration", "web")
            .context("calculate", "web");
        assert!(matches!(err.root(), Error::Annotation { .. }));
    }
}
