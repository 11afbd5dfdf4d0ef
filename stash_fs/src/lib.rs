//! # Stash file-system
//!
//! Per-user folder trees on top of a flat key/value object store.
//! The store knows nothing about folders; they are emulated with zero-byte
//! *directory markers* (keys ending in `/`) and prefix probes.
//!
//! ## Layers
//! 1. `path`     – the only place backend keys are built.
//! 2. `store`    – keyed facade over a [`stash_core::Store`].
//! 3. `emulator` – folder existence and parent-chain checks.
//! 4. `service`  – the operations callers use ([`ResourceService`]).
//! 5. `archive`  – file streams and zip archives for downloads.
//!
//! Every user's keys live below `user-<id>-files/`. Multi-key operations
//! are not atomic: folder moves copy everything before deleting anything,
//! and batch uploads keep what was stored before a failure.

mod archive;
mod emulator;
mod error;
pub mod path;
mod resource;
mod service;
mod store;

pub use archive::{ArchiveDownload, Download, FileDownload};
pub use emulator::DirectoryEmulator;
pub use error::{ErrorKind, FsError, FsResult};
pub use path::{BackendKey, UserId};
pub use resource::{Resource, ResourceKind};
pub use service::{DEFAULT_CONTENT_TYPE, ROOT_ARCHIVE_NAME, ResourceService, UploadFile};
pub use store::{MARKER_CONTENT_TYPE, ObjectStore, Traversal};
