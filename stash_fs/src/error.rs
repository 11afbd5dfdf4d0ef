//! Failure taxonomy of the virtual filesystem.

use stash_core::StoreError;

/// Crate-wide result alias.
pub type FsResult<T> = std::result::Result<T, FsError>;

#[derive(thiserror::Error, Debug)]
pub enum FsError {
    /// Illegal characters, `..` traversal, or a file where a folder is required.
    #[error("bad path format: {0}")]
    BadPathFormat(String),

    /// The target key, or a key under it, is already present.
    #[error("file or folder already exists: {0}")]
    FolderAlreadyExists(String),

    /// An ancestor folder, or the source of the operation, does not exist.
    #[error("folder does not exist: {0}")]
    NoParentFolder(String),

    #[error("resource not found: {0}")]
    NotFound(String),

    /// A store write failed part-way through an upload batch.
    #[error("upload of {key} failed")]
    UploadError {
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("storage operation failed: {context}")]
    StorageOperation {
        context: String,
        #[source]
        source: StoreError,
    },

    /// Writing to a download sink failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Fieldless discriminant of [`FsError`], for callers that map failures
/// onto their own responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadPathFormat,
    FolderAlreadyExists,
    NoParentFolder,
    NotFound,
    UploadError,
    StorageOperation,
    Io,
}

impl ErrorKind {
    /// HTTP status an API layer reports for this kind.
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::BadPathFormat => 400,
            ErrorKind::FolderAlreadyExists => 409,
            ErrorKind::NoParentFolder | ErrorKind::NotFound => 404,
            ErrorKind::UploadError | ErrorKind::StorageOperation | ErrorKind::Io => 500,
        }
    }
}

impl FsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FsError::BadPathFormat(_) => ErrorKind::BadPathFormat,
            FsError::FolderAlreadyExists(_) => ErrorKind::FolderAlreadyExists,
            FsError::NoParentFolder(_) => ErrorKind::NoParentFolder,
            FsError::NotFound(_) => ErrorKind::NotFound,
            FsError::UploadError { .. } => ErrorKind::UploadError,
            FsError::StorageOperation { .. } => ErrorKind::StorageOperation,
            FsError::Io(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn bad_path(msg: impl Into<String>) -> Self {
        FsError::BadPathFormat(msg.into())
    }

    pub(crate) fn storage(context: impl Into<String>, source: StoreError) -> Self {
        FsError::StorageOperation {
            context: context.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_statuses() {
        assert_eq!(FsError::bad_path("x").kind().status_code(), 400);
        assert_eq!(
            FsError::FolderAlreadyExists("a/".into()).kind().status_code(),
            409
        );
        assert_eq!(FsError::NoParentFolder("a/".into()).kind().status_code(), 404);
        assert_eq!(FsError::NotFound("a".into()).kind().status_code(), 404);
        assert_eq!(
            FsError::storage("list", StoreError::NotFound).kind(),
            ErrorKind::StorageOperation
        );
    }

    #[test]
    fn messages_are_human_readable() {
        let err = FsError::NoParentFolder("user-1-files/a/".into());
        assert_eq!(err.to_string(), "folder does not exist: user-1-files/a/");
        let err = FsError::storage("object listing error: user-1-files/", StoreError::NotFound);
        assert_eq!(
            err.to_string(),
            "storage operation failed: object listing error: user-1-files/"
        );
    }
}
