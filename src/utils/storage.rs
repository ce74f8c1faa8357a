//! Artifact stores: S3-compatible object storage and a local directory
//!
//! Both publish finished archives and expose the listing/deletion the
//! retention enforcer needs.

use crate::config::StorageConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::primitives::{ByteStream, Length};
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Extension of every published artifact
pub const ARTIFACT_EXTENSION: &str = ".zip";

/// Files at or above this size go through a multipart upload
pub const MULTIPART_THRESHOLD: u64 = 64 * 1024 * 1024;
const MIN_PART_SIZE: u64 = 64 * 1024 * 1024;
/// Most parts S3 accepts in one upload
const MAX_PARTS: u64 = 10_000;

/// An object held by a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub last_modified: DateTime<Utc>,
}

/// Destination for published artifacts
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Key prefix every artifact of this store lives under ("" for none)
    fn prefix(&self) -> &str;

    /// Human readable location of `key`, used in reports and history
    fn location(&self, key: &str) -> String;

    /// Publish the file at `path` under `key`; returns the bytes written
    async fn upload(&self, key: &str, path: &Path) -> Result<u64>;

    /// List every object whose key starts with `prefix`
    async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>>;

    async fn delete(&self, key: &str) -> Result<()>;
}

/// Object key for an artifact: `prefix/filename`, or the bare filename
pub fn object_key(prefix: &str, filename: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        filename.to_string()
    } else {
        format!("{}/{}", prefix, filename)
    }
}

/// One byte range of a multipart upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartRange {
    /// 1-based, as S3 numbers parts
    pub number: i32,
    pub offset: u64,
    pub length: u64,
}

/// Split `size` bytes into consecutive parts.
///
/// Parts are at least 64 MiB and grow so that no upload exceeds 10,000
/// parts. Only the last part may be shorter.
pub fn plan_parts(size: u64) -> Vec<PartRange> {
    let part_size = MIN_PART_SIZE.max(size.div_ceil(MAX_PARTS));
    (0..size.div_ceil(part_size))
        .map(|i| {
            let offset = i * part_size;
            PartRange {
                number: (i + 1) as i32,
                offset,
                length: part_size.min(size - offset),
            }
        })
        .collect()
}

/// Store backed by an S3-compatible bucket (Cloudflare R2, MinIO, AWS)
pub struct S3Store {
    client: Client,
    bucket: String,
    prefix: String,
}

impl S3Store {
    pub fn new(config: &StorageConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "backup-orchestrator",
        );

        let s3_config = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(&config.endpoint)
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
            prefix: config.path_prefix.trim_matches('/').to_string(),
        }
    }
}

impl S3Store {
    /// Multipart upload; the upload is aborted if any step fails
    async fn upload_multipart(&self, key: &str, path: &Path, size: u64) -> Result<()> {
        let created = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .content_type("application/zip")
            .send()
            .await
            .with_context(|| format!("Failed to start multipart upload of {}", key))?;
        let upload_id = created
            .upload_id()
            .context("multipart upload returned no upload id")?
            .to_string();

        let result = self.send_parts(key, path, size, &upload_id).await;
        if let Err(ref e) = result {
            warn!("Aborting multipart upload of {}: {:#}", key, e);
            if let Err(abort) = self
                .client
                .abort_multipart_upload()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(&upload_id)
                .send()
                .await
            {
                warn!("Failed to abort multipart upload {}: {}", upload_id, abort);
            }
        }
        result
    }

    async fn send_parts(&self, key: &str, path: &Path, size: u64, upload_id: &str) -> Result<()> {
        let plan = plan_parts(size);
        let total = plan.len();
        let mut completed = Vec::with_capacity(total);

        for part in plan {
            let body = ByteStream::read_from()
                .path(path)
                .offset(part.offset)
                .length(Length::Exact(part.length))
                .build()
                .await
                .with_context(|| format!("Failed to read part {} of {:?}", part.number, path))?;

            let response = self
                .client
                .upload_part()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part.number)
                .body(body)
                .send()
                .await
                .with_context(|| format!("Failed to upload part {} of {}", part.number, key))?;
            debug!("Uploaded part {}/{} of {}", part.number, total, key);

            completed.push(
                CompletedPart::builder()
                    .part_number(part.number)
                    .e_tag(response.e_tag().unwrap_or_default())
                    .build(),
            );
        }

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(completed))
                    .build(),
            )
            .send()
            .await
            .with_context(|| format!("Failed to complete multipart upload of {}", key))?;
        Ok(())
    }
}

#[async_trait]
impl ArtifactStore for S3Store {
    fn prefix(&self) -> &str {
        &self.prefix
    }

    fn location(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, key)
    }

    async fn upload(&self, key: &str, path: &Path) -> Result<u64> {
        let size = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("Failed to stat {:?}", path))?
            .len();

        info!("Uploading {:?} to s3://{}/{}", path, self.bucket, key);
        if size >= MULTIPART_THRESHOLD {
            self.upload_multipart(key, path, size).await?;
            return Ok(size);
        }

        let body = ByteStream::from_path(path)
            .await
            .with_context(|| format!("Failed to open {:?} for upload", path))?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type("application/zip")
            .body(body)
            .send()
            .await
            .with_context(|| format!("Failed to upload {}", key))?;

        Ok(size)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>> {
        let mut objects = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let response = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .with_context(|| format!("Failed to list objects under '{}'", prefix))?;

            for object in response.contents() {
                let (Some(key), Some(modified)) = (object.key(), object.last_modified()) else {
                    continue;
                };
                let Some(last_modified) =
                    DateTime::from_timestamp(modified.secs(), modified.subsec_nanos())
                else {
                    continue;
                };
                objects.push(StoredObject {
                    key: key.to_string(),
                    last_modified,
                });
            }

            match response.next_continuation_token() {
                Some(token) if response.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        debug!("Listed {} objects under '{}'", objects.len(), prefix);
        Ok(objects)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("Failed to delete {}", key))?;
        Ok(())
    }
}

/// Store backed by a local directory, used for `--only-dump` runs
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ArtifactStore for LocalStore {
    fn prefix(&self) -> &str {
        ""
    }

    fn location(&self, key: &str) -> String {
        self.root.join(key).display().to_string()
    }

    async fn upload(&self, key: &str, path: &Path) -> Result<u64> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("Failed to create local backup directory {:?}", self.root))?;

        let dest = self.root.join(key);
        info!("Copying {:?} to {:?}", path, dest);
        tokio::fs::copy(path, &dest)
            .await
            .with_context(|| format!("Failed to copy {:?} to {:?}", path, dest))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>> {
        let mut objects = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(objects),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {:?}", self.root))
            }
        };

        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let key = entry.file_name().to_string_lossy().to_string();
            if !key.starts_with(prefix) || !key.ends_with(ARTIFACT_EXTENSION) {
                continue;
            }
            objects.push(StoredObject {
                key,
                last_modified: DateTime::<Utc>::from(metadata.modified()?),
            });
        }

        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.root.join(key);
        tokio::fs::remove_file(&path)
            .await
            .with_context(|| format!("Failed to delete {:?}", path))
    }
}

/// In-memory store for testing
/// Available for use in external test crates
pub mod mock {
    use super::*;
    use std::collections::{BTreeMap, HashSet};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    pub struct MockStore {
        prefix: String,
        pub objects: Arc<Mutex<BTreeMap<String, DateTime<Utc>>>>,
        pub uploads: Arc<Mutex<Vec<String>>>,
        pub deletions: Arc<Mutex<Vec<String>>>,
        failing_uploads: Arc<Mutex<HashSet<String>>>,
        failing_deletes: Arc<Mutex<HashSet<String>>>,
        fail_list: Arc<Mutex<bool>>,
    }

    impl MockStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_prefix(mut self, prefix: &str) -> Self {
            self.prefix = prefix.to_string();
            self
        }

        /// Seed an existing object
        pub fn with_object(self, key: &str, last_modified: DateTime<Utc>) -> Self {
            self.objects
                .lock()
                .unwrap()
                .insert(key.to_string(), last_modified);
            self
        }

        /// Uploads whose key contains `fragment` fail
        pub fn failing_upload(self, fragment: &str) -> Self {
            self.failing_uploads
                .lock()
                .unwrap()
                .insert(fragment.to_string());
            self
        }

        pub fn failing_delete(self, key: &str) -> Self {
            self.failing_deletes.lock().unwrap().insert(key.to_string());
            self
        }

        pub fn with_failing_list(self) -> Self {
            *self.fail_list.lock().unwrap() = true;
            self
        }

        pub fn keys(&self) -> Vec<String> {
            self.objects.lock().unwrap().keys().cloned().collect()
        }

        pub fn get_uploads(&self) -> Vec<String> {
            self.uploads.lock().unwrap().clone()
        }

        pub fn get_deletions(&self) -> Vec<String> {
            self.deletions.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ArtifactStore for MockStore {
        fn prefix(&self) -> &str {
            &self.prefix
        }

        fn location(&self, key: &str) -> String {
            format!("mock://{}", key)
        }

        async fn upload(&self, key: &str, path: &Path) -> Result<u64> {
            let failing = self
                .failing_uploads
                .lock()
                .unwrap()
                .iter()
                .any(|f| key.contains(f.as_str()));
            if failing {
                anyhow::bail!("upload of {} rejected: 503 Service Unavailable", key);
            }
            let size = tokio::fs::metadata(path).await?.len();
            self.uploads.lock().unwrap().push(key.to_string());
            self.objects
                .lock()
                .unwrap()
                .insert(key.to_string(), Utc::now());
            Ok(size)
        }

        async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>> {
            if *self.fail_list.lock().unwrap() {
                anyhow::bail!("list rejected: 403 Forbidden");
            }
            Ok(self
                .objects
                .lock()
                .unwrap()
                .iter()
                .filter(|(k, _)| k.starts_with(prefix))
                .map(|(k, t)| StoredObject {
                    key: k.clone(),
                    last_modified: *t,
                })
                .collect())
        }

        async fn delete(&self, key: &str) -> Result<()> {
            if self.failing_deletes.lock().unwrap().contains(key) {
                anyhow::bail!("delete of {} rejected", key);
            }
            self.deletions.lock().unwrap().push(key.to_string());
            self.objects.lock().unwrap().remove(key);
            Ok(())
        }
    }
}
