//! Upload orchestration
//!
//! [`Uploader`] fans a list of [`ObjectUpload`]s out to an [`ObjectStore`]
//! through the bounded executor and reports the uploaded object names in input
//! order.

use crate::acl::PredefinedAcl;
use crate::error::{Error, Result};
use crate::executor::{run_all, DEFAULT_CONCURRENCY};
use crate::headers::ObjectMetadata;
use crate::store::{ObjectOptions, ObjectStore};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// One file to upload and the key it is stored under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectUpload {
    pub source: PathBuf,
    pub destination: String,
}

/// Hook invoked right before each object is handed to the store
pub trait UploadObserver: Send + Sync {
    /// An error fails the upload of that object.
    fn on_upload_object(&self, source: &Path, destination: &str, options: &ObjectOptions) -> Result<()>;
}

/// Observer that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl UploadObserver for NoopObserver {
    fn on_upload_object(&self, _source: &Path, _destination: &str, _options: &ObjectOptions) -> Result<()> {
        Ok(())
    }
}

/// Settings shared by every object of one run
#[derive(Clone)]
pub struct UploadOptions {
    /// Maximum number of in-flight store calls
    pub concurrency: usize,
    pub gzip: bool,
    pub resumable: bool,
    pub predefined_acl: Option<PredefinedAcl>,
    pub metadata: ObjectMetadata,
    pub observer: Arc<dyn UploadObserver>,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            gzip: true,
            resumable: true,
            predefined_acl: None,
            metadata: ObjectMetadata::default(),
            observer: Arc::new(NoopObserver),
        }
    }
}

impl fmt::Debug for UploadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadOptions")
            .field("concurrency", &self.concurrency)
            .field("gzip", &self.gzip)
            .field("resumable", &self.resumable)
            .field("predefined_acl", &self.predefined_acl)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

impl UploadOptions {
    pub fn with_observer(mut self, observer: Arc<dyn UploadObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Fresh per-object options for `destination`
    pub fn object_options(&self, destination: &str) -> ObjectOptions {
        ObjectOptions {
            destination: destination.to_string(),
            gzip: self.gzip,
            resumable: self.resumable,
            predefined_acl: self.predefined_acl,
            metadata: self.metadata.clone(),
        }
    }
}

/// Failure of a single object, attributed to its source file
#[derive(Debug)]
struct ObjectFailure {
    source: PathBuf,
    error: Error,
}

impl fmt::Display for ObjectFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source.display(), self.error)
    }
}

/// Drives uploads of a file list against an object store
pub struct Uploader<S> {
    store: S,
}

impl<S: ObjectStore> Uploader<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Upload every file, at most `options.concurrency` at a time.
    ///
    /// Returns the object names in the order of `files`. If any upload fails,
    /// the others still run to completion and the error lists every failure.
    pub async fn upload(&self, files: &[ObjectUpload], options: &UploadOptions) -> Result<Vec<String>> {
        info!(
            objects = files.len(),
            concurrency = options.concurrency,
            gzip = options.gzip,
            resumable = options.resumable,
            "starting upload"
        );

        let tasks: Vec<_> = files.iter().map(|file| self.upload_one(file, options)).collect();
        let uploaded = run_all(tasks, options.concurrency).await?;

        info!(objects = uploaded.len(), "upload complete");
        Ok(uploaded)
    }

    async fn upload_one(
        &self,
        file: &ObjectUpload,
        options: &UploadOptions,
    ) -> std::result::Result<String, ObjectFailure> {
        let object_options = options.object_options(&file.destination);
        let fail = |error| ObjectFailure {
            source: file.source.clone(),
            error,
        };

        options
            .observer
            .on_upload_object(&file.source, &file.destination, &object_options)
            .map_err(fail)?;

        let stored = self
            .store
            .store_object(&file.source, object_options)
            .await
            .map_err(fail)?;

        debug!(source = %file.source.display(), object = %stored.name, bytes = stored.size, "stored object");
        Ok(stored.name)
    }
}
