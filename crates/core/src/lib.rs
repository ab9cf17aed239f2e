//! bucket-upload-core - Core library for the bucket-upload action
//!
//! This library resolves local paths and globs into a deterministic file set,
//! filters it through `.gcloudignore` rules, computes object keys, and uploads
//! the result to an S3-compatible bucket with bounded concurrency.

pub mod acl;
pub mod client;
pub mod config;
pub mod destination;
pub mod error;
pub mod executor;
pub mod expand;
pub mod headers;
pub mod ignore;
pub mod plan;
pub mod store;
pub mod upload;

// Re-export commonly used types
pub use acl::PredefinedAcl;
pub use client::StorageClient;
pub use config::{load_config, validate_config, ConfigFile, StorageConfig};
pub use destination::{compute_destination, parse_destination, Destination};
pub use error::{Error, Result};
pub use executor::{clamp_concurrency, run_all, DEFAULT_CONCURRENCY};
pub use expand::{expand, expand_roots, Expansion};
pub use headers::{parse_headers, ObjectMetadata};
pub use ignore::{filter, IgnoreFile, IgnoreSpec};
pub use plan::{plan_upload, IgnoreSettings, UploadPlan, UploadRequest};
pub use store::{ObjectOptions, ObjectStore, StoredObject};
pub use upload::{NoopObserver, ObjectUpload, UploadObserver, UploadOptions, Uploader};
