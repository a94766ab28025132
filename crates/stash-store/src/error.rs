use thiserror::Error;

/// Errors surfaced by store operations and path handling.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No entry exists under the requested key.
    #[error("no entry for key '{key}'")]
    KeyNotFound { key: String },

    /// A path segment addressed a member or index that does not exist.
    #[error("path '{path}' not found: {reason}")]
    PathNotFound { path: String, reason: String },

    /// A path segment was applied to a value of the wrong kind.
    #[error("type mismatch at '{path}': {expected} expected, found {found}")]
    PathTypeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    /// The path text did not match the segment grammar.
    #[error("invalid path syntax at '{fragment}': {reason}")]
    PathSyntax { fragment: String, reason: String },

    /// `range` was applied to a scalar value.
    #[error("value at '{path}' is not iterable")]
    RangeNotIterable { path: String },
}

impl StoreError {
    pub(crate) fn key_not_found(key: impl Into<String>) -> Self {
        Self::KeyNotFound { key: key.into() }
    }

    pub(crate) fn path_not_found(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PathNotFound {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn type_mismatch(
        path: impl Into<String>,
        expected: &'static str,
        found: &'static str,
    ) -> Self {
        Self::PathTypeMismatch {
            path: path.into(),
            expected,
            found,
        }
    }

    pub(crate) fn syntax(fragment: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PathSyntax {
            fragment: fragment.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn not_iterable(path: impl Into<String>) -> Self {
        Self::RangeNotIterable { path: path.into() }
    }
}
