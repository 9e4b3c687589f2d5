//! User-scoped file paths.
//!
//! Every file in the namespace lives under its owner: the first segment of
//! the path is the owning user's id, the rest is the file's location within
//! that user's tree. `/alice/docs/notes.txt` is owned by `alice` and is
//! stored under the key `alice/docs/notes.txt` in both stores.

use std::fmt;

use crate::error::FsError;

const SEPARATOR: char = '/';

/// A normalized, owner-qualified file path.
///
/// Always has at least two segments: the owner and one path component.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathIdentity {
    user_id: String,
    normalized_path: String,
}

impl PathIdentity {
    /// Parse an absolute path such as `/alice/docs/notes.txt`.
    ///
    /// The path is lexically cleaned first (`.` and `..` resolved, repeated
    /// separators collapsed) so `/alice//docs/../notes.txt` identifies the
    /// same file as `/alice/notes.txt`.
    pub fn from_absolute(raw: &str) -> Result<Self, FsError> {
        if !raw.starts_with(SEPARATOR) {
            return Err(FsError::argument(format!(
                "Invalid path \"{}\", should be absolute",
                raw
            )));
        }

        let cleaned = clean(raw);
        let parts = cleaned
            .split(SEPARATOR)
            .skip(1)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>();
        Self::from_parts(&parts)
    }

    /// Parse a path that is already in normalized form, e.g. a key read back
    /// from one of the stores (`alice/docs/notes.txt`).
    ///
    /// The input is not cleaned, so empty segments (`alice/`, `/alice/x`)
    /// are rejected.
    pub fn from_normalized(raw: &str) -> Result<Self, FsError> {
        if raw.is_empty() {
            return Err(missing_parts());
        }
        let parts = raw.split(SEPARATOR).collect::<Vec<_>>();
        Self::from_parts(&parts)
    }

    fn from_parts(parts: &[&str]) -> Result<Self, FsError> {
        if parts.len() < 2 || parts.iter().any(|part| part.is_empty()) {
            return Err(missing_parts());
        }
        Ok(Self {
            user_id: parts[0].to_string(),
            normalized_path: parts.join("/"),
        })
    }

    /// The owning user, i.e. the first path segment.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The store key: the cleaned path without the leading separator.
    pub fn normalized_path(&self) -> &str {
        &self.normalized_path
    }

    pub fn absolute_path(&self) -> String {
        format!("{}{}", SEPARATOR, self.normalized_path)
    }

    pub fn basename(&self) -> &str {
        self.normalized_path
            .rsplit(SEPARATOR)
            .next()
            .unwrap_or(&self.normalized_path)
    }

    /// Check that `requester` owns this path.
    pub fn authorize(&self, requester: &str) -> Result<(), FsError> {
        if self.user_id != requester {
            return Err(FsError::forbidden(
                "Trying to manipulate data of another user",
            ));
        }
        Ok(())
    }
}

impl fmt::Display for PathIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", SEPARATOR, self.normalized_path)
    }
}

fn missing_parts() -> FsError {
    FsError::argument("Invalid path, missing parts of the path")
}

/// Lexically clean an absolute path.
///
/// `..` above the root stays at the root and the result never ends with a
/// separator unless it is the root itself.
pub fn clean(raw: &str) -> String {
    let mut stack: Vec<&str> = Vec::new();
    for part in raw.split(SEPARATOR) {
        match part {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            part => stack.push(part),
        }
    }
    format!("{}{}", SEPARATOR, stack.join("/"))
}
