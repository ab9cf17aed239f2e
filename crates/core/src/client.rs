//! Storage client implementation using AWS S3 SDK

use crate::config::StorageConfig;
use crate::error::{Error, Result};
use crate::headers::ObjectMetadata;
use crate::store::{ObjectOptions, ObjectStore, StoredObject};
use async_trait::async_trait;
use aws_sdk_s3::{
    config::{Credentials, Region},
    operation::{
        create_multipart_upload::builders::CreateMultipartUploadFluentBuilder,
        put_object::builders::PutObjectFluentBuilder,
    },
    primitives::ByteStream,
    types::{CompletedMultipartUpload, CompletedPart, ObjectCannedAcl},
    Client,
};
use aws_smithy_types::byte_stream::Length;
use bytes::Bytes;
use flate2::{write::GzEncoder, Compression};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Bodies at least this large use multipart upload when resumable
pub const MULTIPART_THRESHOLD: u64 = 8 * 1024 * 1024;

/// Size of each multipart part
const PART_SIZE: u64 = 8 * 1024 * 1024;

/// User metadata key carrying the `custom-time` header
const CUSTOM_TIME_KEY: &str = "custom-time";

/// Where the bytes of an object come from
enum Body {
    /// Uncompressed file, streamed from disk
    File { path: PathBuf, len: u64 },
    /// Compressed bytes held in memory
    Memory(Bytes),
}

impl Body {
    fn len(&self) -> u64 {
        match self {
            Body::File { len, .. } => *len,
            Body::Memory(bytes) => bytes.len() as u64,
        }
    }

    async fn stream(&self) -> Result<ByteStream> {
        match self {
            Body::File { path, .. } => Ok(ByteStream::from_path(path).await?),
            Body::Memory(bytes) => Ok(ByteStream::from(bytes.clone())),
        }
    }

    /// Stream `len` bytes starting at `offset`, without copying in-memory bodies
    async fn part(&self, offset: u64, len: u64) -> Result<ByteStream> {
        match self {
            Body::File { path, .. } => Ok(ByteStream::read_from()
                .path(path)
                .offset(offset)
                .length(Length::Exact(len))
                .build()
                .await?),
            Body::Memory(bytes) => {
                let end = (offset + len) as usize;
                Ok(ByteStream::from(bytes.slice(offset as usize..end)))
            }
        }
    }
}

/// Client for an S3-compatible bucket
pub struct StorageClient {
    client: Client,
    bucket: String,
}

impl StorageClient {
    /// Create a new storage client
    pub async fn new(config: &StorageConfig, bucket: String) -> Result<Self> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        if let (Some(access_key_id), Some(secret_access_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            let credentials = Credentials::new(access_key_id, secret_access_key, None, None, "bucket-upload");
            loader = loader.credentials_provider(credentials);
        }

        let shared = loader.load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared).force_path_style(config.force_path_style);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(builder.build());

        Ok(Self { client, bucket })
    }

    /// Get the bucket name
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn put_request(&self, options: &ObjectOptions) -> PutObjectFluentBuilder {
        let metadata = &options.metadata;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&options.destination)
            .set_cache_control(metadata.cache_control.clone())
            .set_content_disposition(metadata.content_disposition.clone())
            .set_content_encoding(metadata.content_encoding.clone())
            .set_content_language(metadata.content_language.clone())
            .set_content_type(metadata.content_type.clone())
            .set_metadata(user_metadata(metadata))
            .set_acl(canned_acl(options))
    }

    fn create_multipart_request(&self, options: &ObjectOptions) -> CreateMultipartUploadFluentBuilder {
        let metadata = &options.metadata;
        self.client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(&options.destination)
            .set_cache_control(metadata.cache_control.clone())
            .set_content_disposition(metadata.content_disposition.clone())
            .set_content_encoding(metadata.content_encoding.clone())
            .set_content_language(metadata.content_language.clone())
            .set_content_type(metadata.content_type.clone())
            .set_metadata(user_metadata(metadata))
            .set_acl(canned_acl(options))
    }

    /// Upload a body with a single request
    async fn put(&self, body: &Body, options: &ObjectOptions) -> Result<()> {
        self.put_request(options).body(body.stream().await?).send().await?;

        Ok(())
    }

    /// Upload a body in parts, aborting the multipart upload on failure
    async fn put_multipart(&self, body: &Body, options: &ObjectOptions) -> Result<()> {
        let key = &options.destination;
        let created = self.create_multipart_request(options).send().await?;
        let upload_id = created
            .upload_id()
            .ok_or_else(|| Error::StoreObject(format!("No upload id returned for {}", key)))?
            .to_string();

        let parts = match self.upload_parts(key, &upload_id, body).await {
            Ok(parts) => parts,
            Err(e) => {
                if let Err(abort) = self
                    .client
                    .abort_multipart_upload()
                    .bucket(&self.bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .send()
                    .await
                {
                    warn!(key = %key, error = %abort, "failed to abort multipart upload");
                }
                return Err(e);
            }
        };

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(&upload_id)
            .multipart_upload(CompletedMultipartUpload::builder().set_parts(Some(parts)).build())
            .send()
            .await?;

        Ok(())
    }

    async fn upload_parts(&self, key: &str, upload_id: &str, body: &Body) -> Result<Vec<CompletedPart>> {
        let mut parts = Vec::new();

        for (index, (offset, len)) in part_ranges(body.len()).into_iter().enumerate() {
            let part_number = index as i32 + 1;
            let response = self
                .client
                .upload_part()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(body.part(offset, len).await?)
                .send()
                .await?;

            parts.push(
                CompletedPart::builder()
                    .set_e_tag(response.e_tag().map(str::to_string))
                    .part_number(part_number)
                    .build(),
            );
        }

        debug!(key = %key, parts = parts.len(), "uploaded parts");
        Ok(parts)
    }
}

#[async_trait]
impl ObjectStore for StorageClient {
    async fn store_object(&self, source: &Path, mut options: ObjectOptions) -> Result<StoredObject> {
        if options.metadata.content_type.is_none() {
            options.metadata.content_type = Some(
                mime_guess::from_path(source)
                    .first_or_octet_stream()
                    .to_string(),
            );
        }

        // A caller-chosen encoding means the file is sent as-is
        let body = if options.gzip && options.metadata.content_encoding.is_none() {
            options.metadata.content_encoding = Some("gzip".to_string());
            let raw = tokio::fs::read(source).await?;
            let compressed = tokio::task::spawn_blocking(move || gzip(&raw))
                .await
                .map_err(|e| Error::StoreObject(format!("Compression task failed: {}", e)))??;
            Body::Memory(Bytes::from(compressed))
        } else {
            let len = tokio::fs::metadata(source).await?.len();
            Body::File {
                path: source.to_path_buf(),
                len,
            }
        };

        let size = body.len();
        if options.resumable && size >= MULTIPART_THRESHOLD {
            self.put_multipart(&body, &options).await?;
        } else {
            self.put(&body, &options).await?;
        }

        debug!(bucket = %self.bucket, key = %options.destination, bytes = size, "put object");
        Ok(StoredObject {
            name: options.destination,
            size,
            metadata: options.metadata,
        })
    }
}

/// `(offset, length)` of every part of a body of `total` bytes
fn part_ranges(total: u64) -> Vec<(u64, u64)> {
    (0..total)
        .step_by(PART_SIZE as usize)
        .map(|offset| (offset, PART_SIZE.min(total - offset)))
        .collect()
}

fn gzip(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn canned_acl(options: &ObjectOptions) -> Option<ObjectCannedAcl> {
    options.predefined_acl.map(|acl| ObjectCannedAcl::from(acl.canned()))
}

fn user_metadata(metadata: &ObjectMetadata) -> Option<HashMap<String, String>> {
    let mut user: HashMap<String, String> = metadata
        .custom
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    if let Some(custom_time) = &metadata.custom_time {
        user.insert(CUSTOM_TIME_KEY.to_string(), custom_time.clone());
    }
    (!user.is_empty()).then_some(user)
}
