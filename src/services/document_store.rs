//! Per-user document storage in a flat upload directory
//!
//! Uploads stream into a hidden `.part` file and are renamed into place only
//! after the last byte is flushed, so a reader never sees a partial document
//! under its final name.
//!
//! Renames are committed one at a time. The store remembers each user's most
//! recent commit and reports it as the latest document; after a restart the
//! latest document falls back to the newest modification time.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::domain::models::{
    file_extension, sanitize_filename, validate_user_id, StorageConfig, StoredDocument,
};
use crate::domain::{ServiceError, ServiceResult};

/// Removes an unfinished temp file when the upload is abandoned
struct TempFileGuard {
    path: Option<PathBuf>,
}

impl TempFileGuard {
    const fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    fn disarm(&mut self) {
        self.path = None;
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            if let Err(e) = std::fs::remove_file(&path) {
                if e.kind() != ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "Failed to remove partial upload");
                }
            }
        }
    }
}

/// Flat per-user document directory with streamed, atomic writes
pub struct DocumentStore {
    upload_dir: PathBuf,
    max_upload_bytes: u64,
    allowed_extensions: Vec<String>,
    /// Stored name of each user's last committed upload
    committed: Mutex<HashMap<String, String>>,
}

impl DocumentStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            upload_dir: config.upload_dir.clone(),
            max_upload_bytes: config.max_upload_bytes,
            allowed_extensions: config
                .allowed_extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
            committed: Mutex::new(HashMap::new()),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub const fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    pub async fn ensure_dir(&self) -> ServiceResult<()> {
        tokio::fs::create_dir_all(&self.upload_dir)
            .await
            .map_err(|e| storage_error("create upload dir", &self.upload_dir, &e))
    }

    /// On-disk name for `filename` uploaded by `user_id`
    pub fn stored_name(&self, user_id: &str, filename: &str) -> ServiceResult<String> {
        validate_user_id(user_id)?;

        let sanitized = sanitize_filename(filename)
            .ok_or_else(|| ServiceError::InvalidFilename(filename.to_string()))?;

        match file_extension(&sanitized) {
            Some(ext) if self.allowed_extensions.contains(&ext) => {
                Ok(StoredDocument::stored_name_for(user_id, &sanitized))
            }
            Some(ext) => Err(ServiceError::UnsupportedFileType(ext)),
            None => Err(ServiceError::UnsupportedFileType(sanitized)),
        }
    }

    /// Stream an upload to `{upload_dir}/{user_id}_{sanitized_filename}`.
    ///
    /// Any existing document with the same name is replaced atomically. If the
    /// stream fails, exceeds the size limit or this future is dropped, nothing
    /// is left behind.
    pub async fn persist<S, E>(
        &self,
        user_id: &str,
        filename: &str,
        stream: S,
    ) -> ServiceResult<StoredDocument>
    where
        S: Stream<Item = Result<Bytes, E>> + Send,
        E: std::fmt::Display,
    {
        let (document, ()) = self.persist_stamped(user_id, filename, stream, || ()).await?;
        Ok(document)
    }

    /// Like [`persist`](Self::persist), calling `stamp` inside the commit.
    ///
    /// `stamp` runs right after the rename while no other upload can commit,
    /// so values it hands out follow the order in which documents became the
    /// latest for their user.
    pub async fn persist_stamped<S, E, F, T>(
        &self,
        user_id: &str,
        filename: &str,
        stream: S,
        stamp: F,
    ) -> ServiceResult<(StoredDocument, T)>
    where
        S: Stream<Item = Result<Bytes, E>> + Send,
        E: std::fmt::Display,
        F: FnOnce() -> T + Send,
        T: Send,
    {
        let stored_name = self.stored_name(user_id, filename)?;
        self.ensure_dir().await?;

        let final_path = self.upload_dir.join(&stored_name);
        let temp_path = self
            .upload_dir
            .join(format!(".{}.{}.part", stored_name, Uuid::new_v4()));
        let mut guard = TempFileGuard::new(temp_path.clone());

        let mut file = File::create(&temp_path)
            .await
            .map_err(|e| storage_error("create temp file", &temp_path, &e))?;

        let mut stream = std::pin::pin!(stream);
        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| ServiceError::Upload(e.to_string()))?;
            written = written.saturating_add(chunk.len() as u64);
            if written > self.max_upload_bytes {
                return Err(ServiceError::UploadTooLarge {
                    limit_bytes: self.max_upload_bytes,
                });
            }
            file.write_all(&chunk)
                .await
                .map_err(|e| storage_error("write upload", &temp_path, &e))?;
        }

        file.flush()
            .await
            .map_err(|e| storage_error("flush upload", &temp_path, &e))?;
        file.sync_all()
            .await
            .map_err(|e| storage_error("sync upload", &temp_path, &e))?;
        drop(file);

        let stamped = {
            let mut committed = self.committed.lock().await;
            tokio::fs::rename(&temp_path, &final_path)
                .await
                .map_err(|e| storage_error("rename upload", &final_path, &e))?;
            guard.disarm();
            committed.insert(user_id.to_string(), stored_name.clone());
            stamp()
        };

        let metadata = tokio::fs::metadata(&final_path)
            .await
            .map_err(|e| storage_error("stat upload", &final_path, &e))?;

        debug!(
            user_id,
            path = %final_path.display(),
            size_bytes = written,
            "Document stored"
        );

        let document = StoredDocument {
            user_id: user_id.to_string(),
            stored_name,
            path: final_path,
            size_bytes: metadata.len(),
            modified_at: modified_at(&metadata),
        };
        Ok((document, stamped))
    }

    /// Every stored document of `user_id`, in no particular order
    pub async fn list_for_user(&self, user_id: &str) -> ServiceResult<Vec<StoredDocument>> {
        validate_user_id(user_id)?;
        let prefix = StoredDocument::user_prefix(user_id);

        let mut dir = match tokio::fs::read_dir(&self.upload_dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(storage_error("read upload dir", &self.upload_dir, &e)),
        };

        let mut documents = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| storage_error("read upload dir", &self.upload_dir, &e))?
        {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if !name.starts_with(&prefix) {
                continue;
            }

            // A concurrent rename may replace the file between listing and stat
            let metadata = match entry.metadata().await {
                Ok(metadata) if metadata.is_file() => metadata,
                Ok(_) => continue,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(storage_error("stat document", &entry.path(), &e)),
            };

            documents.push(StoredDocument {
                user_id: user_id.to_string(),
                stored_name: name,
                path: entry.path(),
                size_bytes: metadata.len(),
                modified_at: modified_at(&metadata),
            });
        }

        Ok(documents)
    }

    /// The user's last committed document.
    ///
    /// Without a commit since startup, or if that file is gone, this is the
    /// most recently modified document with ties broken by name.
    pub async fn latest_for_user(&self, user_id: &str) -> ServiceResult<Option<StoredDocument>> {
        validate_user_id(user_id)?;

        let committed = self.committed.lock().await.get(user_id).cloned();
        if let Some(stored_name) = committed {
            let path = self.upload_dir.join(&stored_name);
            match tokio::fs::metadata(&path).await {
                Ok(metadata) if metadata.is_file() => {
                    return Ok(Some(StoredDocument {
                        user_id: user_id.to_string(),
                        stored_name,
                        size_bytes: metadata.len(),
                        modified_at: modified_at(&metadata),
                        path,
                    }));
                }
                Ok(_) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(storage_error("stat document", &path, &e)),
            }
        }

        let documents = self.list_for_user(user_id).await?;
        Ok(documents.into_iter().max_by(|a, b| {
            a.modified_at
                .cmp(&b.modified_at)
                .then_with(|| a.stored_name.cmp(&b.stored_name))
        }))
    }
}

fn modified_at(metadata: &std::fs::Metadata) -> DateTime<Utc> {
    metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now())
}

fn storage_error(action: &str, path: &Path, err: &std::io::Error) -> ServiceError {
    error!(action, path = %path.display(), error = %err, "Storage failure");
    ServiceError::Storage(format!("{action} {}: {err}", path.display()))
}
