//! Path canonicalization and backend key construction.
//!
//! This is the only module that builds [`BackendKey`]s. Everything else in
//! the crate receives keys that are already validated, slash-normalized and
//! scoped below a user's root prefix `user-<id>-files/`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{FsError, FsResult};

/// Characters rejected anywhere in a user supplied path.
pub const FORBIDDEN_CHARS: [char; 7] = [':', '*', '?', '"', '<', '>', '|'];

/// Opaque numeric account identifier handed over by the authentication
/// boundary. Never derived from path input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for UserId {
    fn from(id: u64) -> Self {
        UserId(id)
    }
}

/// A key in the store's flat namespace, always below a user root.
///
/// A trailing `/` marks a directory marker; anything else is a file object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BackendKey(String);

impl BackendKey {
    /// Wraps a key reported by the store itself (listing results).
    pub(crate) fn from_store(key: impl Into<String>) -> Self {
        BackendKey(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_dir(&self) -> bool {
        self.0.ends_with('/')
    }

    /// True for the `user-<id>-files/` marker itself.
    pub fn is_user_root(&self) -> bool {
        self.0.find('/').map(|idx| idx + 1) == Some(self.0.len())
    }

    /// The key without its user root prefix.
    pub fn relative(&self) -> &str {
        strip_user_root(&self.0)
    }

    /// Last path segment, keeping the trailing `/` of directories.
    pub fn name(&self) -> &str {
        split_name_and_parent(&self.0).1
    }

    /// Directory form of this key.
    pub fn as_dir(&self) -> BackendKey {
        if self.is_dir() {
            self.clone()
        } else {
            BackendKey(format!("{}/", self.0))
        }
    }

    /// File form of a directory key: the same path without the trailing `/`.
    pub fn as_file(&self) -> BackendKey {
        BackendKey(self.0.strip_suffix('/').unwrap_or(&self.0).to_string())
    }

    /// Same parent directory, different last segment.
    pub fn with_name(&self, name: &str) -> BackendKey {
        let (parent, _) = split_name_and_parent(&self.0);
        BackendKey(format!("{parent}{name}"))
    }

    /// Directory prefixes strictly between the user root and this key,
    /// ordered from the root downward.
    pub fn ancestors(&self) -> Vec<BackendKey> {
        let body = self.0.strip_suffix('/').unwrap_or(&self.0);
        body.match_indices('/')
            .skip(1)
            .map(|(idx, _)| BackendKey(self.0[..=idx].to_string()))
            .collect()
    }

    /// Replaces the `from` prefix of this key with `to`.
    pub fn rebase(&self, from: &BackendKey, to: &BackendKey) -> Option<BackendKey> {
        self.0
            .strip_prefix(from.as_str())
            .map(|rest| BackendKey(format!("{}{}", to.0, rest)))
    }

    /// True if both keys are directories and `self` lies strictly inside `other`.
    pub fn is_strict_descendant_of(&self, other: &BackendKey) -> bool {
        self.is_dir()
            && other.is_dir()
            && self.0.len() > other.0.len()
            && self.0.starts_with(other.as_str())
    }
}

impl fmt::Display for BackendKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BackendKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Validates and normalizes a user supplied relative path.
///
/// Backslashes count as separators, every segment is trimmed, blank and `.`
/// segments are dropped and leading slashes disappear with them. A trailing
/// slash survives if the result is not empty. Empty input is the root.
pub fn normalize(raw: &str) -> FsResult<String> {
    if raw.contains(FORBIDDEN_CHARS) {
        return Err(FsError::bad_path(
            "path cannot contain ':  *  ?  \"  <  >  |'",
        ));
    }

    let unified = raw.trim().replace('\\', "/");
    let trailing_slash = unified.ends_with('/');

    let mut segments = Vec::new();
    for segment in unified.split('/') {
        match segment.trim() {
            "" | "." => continue,
            ".." => return Err(FsError::bad_path("path cannot contain '..' segments")),
            segment => segments.push(segment),
        }
    }

    let mut canonical = segments.join("/");
    if trailing_slash && !canonical.is_empty() {
        canonical.push('/');
    }
    Ok(canonical)
}

/// The root marker key owned by `user`.
pub fn user_root(user: UserId) -> BackendKey {
    BackendKey(format!("user-{user}-files/"))
}

/// Prefixes an already canonical path with the user's root.
pub fn scope_to_user(canonical: &str, user: UserId) -> BackendKey {
    BackendKey(format!("user-{user}-files/{canonical}"))
}

/// Normalizes `raw` and scopes it below `user`'s root.
pub fn format_path_for_backend(raw: &str, user: UserId) -> FsResult<BackendKey> {
    let canonical = normalize(raw)?;
    Ok(scope_to_user(&canonical, user))
}

/// Appends a (normalized) file name to a directory key.
pub fn append_name(parent: &BackendKey, name: &str) -> FsResult<BackendKey> {
    let name = normalize(name)?;
    if name.is_empty() {
        return Err(FsError::bad_path("file name can't be blank"));
    }
    if !parent.is_dir() {
        return Err(FsError::bad_path(
            "parent path must be a directory (end with /)",
        ));
    }
    Ok(BackendKey(format!("{}{}", parent.0, name)))
}

/// Splits a key into its parent prefix (with trailing `/`) and last segment.
///
/// For directory keys the trailing `/` stays with the name. A key without
/// an interior `/` has an empty parent.
pub fn split_name_and_parent(key: &str) -> (&str, &str) {
    let body = key.strip_suffix('/').unwrap_or(key);
    match body.rfind('/') {
        Some(idx) => key.split_at(idx + 1),
        None => ("", key),
    }
}

/// Removes exactly the first path segment.
pub fn strip_user_root(key: &str) -> &str {
    match key.find('/') {
        Some(idx) => &key[idx + 1..],
        None => "",
    }
}

/// Extension of a file name, ignoring dot-files such as `.env`.
pub fn extension(name: &str) -> Option<&str> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.contains('/') {
        None
    } else {
        Some(ext)
    }
}
