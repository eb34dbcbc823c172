use thiserror::Error;

/// Reasons a line of a patch section is not a patch.
///
/// These never escape the tree store: a line that fails to parse is skipped
/// and the batch carries on. The variants exist so callers that want to
/// inspect a single line (tooling, logs) can see why it was rejected.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PatchError {
    /// The line is not a JSON object of the expected shape. Truncated lines
    /// from a stream that is still arriving end up here too.
    #[error("malformed patch line: {source}")]
    Malformed {
        #[source]
        source: serde_json::Error,
    },

    /// The operation is well formed but not one this codec applies.
    #[error("unsupported patch op '{op}'")]
    UnsupportedOp { op: String },

    /// The path is neither `/root` nor `/elements/<key>`.
    #[error("unrecognized patch path '{path}'")]
    UnrecognizedPath { path: String },

    /// The key segment of an element path contains an invalid `~` escape or is empty.
    #[error("cannot decode path segment '{segment}'")]
    UndecodablePath { segment: String },

    /// The value cannot be adopted at the given path.
    #[error("invalid value for '{path}': {reason}")]
    InvalidValue { path: String, reason: String },
}

impl From<serde_json::Error> for PatchError {
    fn from(source: serde_json::Error) -> Self {
        Self::Malformed { source }
    }
}

pub type PatchResult<T> = std::result::Result<T, PatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = PatchError::UnsupportedOp { op: "delete".into() };
        assert_eq!(err.to_string(), "unsupported patch op 'delete'");

        let err = PatchError::UnrecognizedPath {
            path: "/state/x".into(),
        };
        assert_eq!(err.to_string(), "unrecognized patch path '/state/x'");
    }

    #[test]
    fn malformed_from_serde() {
        let source = serde_json::from_str::<serde_json::Value>("{\"op\":").unwrap_err();
        let err: PatchError = source.into();
        assert!(matches!(err, PatchError::Malformed { .. }));
        assert!(std::error::Error::source(&err).is_some());
    }
}
