//! Splitting of `KEY.path` address arguments.
//!
//! Commands address a whole document by its opaque key, or a location
//! inside it by appending a path expression: `Ab3xYz01Qr9K.users[0].name`.
//! The key runs up to the first `.` or `[`; everything after belongs to the
//! path and is forwarded to the daemon verbatim, where the path grammar is
//! enforced.

use crate::errors::AppError;

/// A parsed command address: the target key and an optional path within it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Address {
    key: String,
    path: Option<String>,
}

impl Address {
    /// Splits an address argument into key and path.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidAddress`] when the key portion is empty
    /// or contains characters outside the generated-key alphabet.
    pub(crate) fn parse(text: &str) -> Result<Self, AppError> {
        let split = text
            .char_indices()
            .find(|(_, ch)| *ch == '.' || *ch == '[')
            .map(|(index, ch)| (index, ch));

        let (key, path) = match split {
            Some((index, ch)) => {
                // A dot separator is consumed; a bracket stays with the path.
                let path_start = if ch == '.' { index + 1 } else { index };
                (&text[..index], Some(&text[path_start..]))
            }
            None => (text, None),
        };

        if key.is_empty() {
            return Err(AppError::InvalidAddress {
                address: text.to_owned(),
                reason: "key is empty".to_owned(),
            });
        }
        if !key.bytes().all(|byte| byte.is_ascii_alphanumeric()) {
            return Err(AppError::InvalidAddress {
                address: text.to_owned(),
                reason: "key must be alphanumeric".to_owned(),
            });
        }
        if let Some(path) = path
            && path.is_empty()
        {
            return Err(AppError::InvalidAddress {
                address: text.to_owned(),
                reason: "path after '.' is empty".to_owned(),
            });
        }

        Ok(Self {
            key: key.to_owned(),
            path: path.map(str::to_owned),
        })
    }

    pub(crate) fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }
}
