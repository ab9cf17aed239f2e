//! Store-object capability
//!
//! The uploader only needs one operation from the remote side: put a local
//! file under an object key. [`crate::client::StorageClient`] implements it
//! for S3-compatible endpoints.

use crate::acl::PredefinedAcl;
use crate::error::Result;
use crate::headers::ObjectMetadata;
use async_trait::async_trait;
use std::path::Path;

/// Per-object options handed to [`ObjectStore::store_object`].
///
/// Each call owns its own value; implementations are free to fill in
/// defaults (content type, encoding) without affecting other uploads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectOptions {
    /// Object key
    pub destination: String,
    pub gzip: bool,
    pub resumable: bool,
    pub predefined_acl: Option<PredefinedAcl>,
    pub metadata: ObjectMetadata,
}

/// Object written by a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Object key
    pub name: String,
    /// Bytes sent, after compression
    pub size: u64,
    /// Metadata as applied to the object
    pub metadata: ObjectMetadata,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload `source` under `options.destination`.
    async fn store_object(&self, source: &Path, options: ObjectOptions) -> Result<StoredObject>;
}
