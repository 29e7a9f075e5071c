//! Persistence of uploaded files ahead of loading.
//!
//! Uploads are written under their original base name. When that name is already taken by a
//! different file, the new one gets a content-hash suffix; re-uploading identical bytes reuses
//! the stored file.

use sha2::{Digest, Sha256};
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::source::Upload;

const HASH_SUFFIX_LEN: usize = 12;
const FALLBACK_NAME: &str = "upload";

/// Writes uploads into a directory.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    /// Store uploads under `dir`, which is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory uploads are written to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist the upload and return the path it was written to.
    pub async fn store(&self, upload: &Upload) -> io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let name = base_name(&upload.name);
        let primary = self.dir.join(&name);
        if !write_or_match(&primary, &upload.bytes).await? {
            let digest = content_digest(&upload.bytes);
            let alternate = self.dir.join(suffixed_name(&name, &digest[..HASH_SUFFIX_LEN]));
            if !write_or_match(&alternate, &upload.bytes).await? {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{} holds different content", alternate.display()),
                ));
            }
            tracing::info!(
                requested = %primary.display(),
                stored = %alternate.display(),
                "Upload name already taken; stored under hashed name"
            );
            return Ok(alternate);
        }

        tracing::debug!(path = %primary.display(), bytes = upload.bytes.len(), "Stored upload");
        Ok(primary)
    }
}

/// Write `bytes` to `path` unless it already exists. Returns `false` when an existing file
/// holds different content.
///
/// The file is created with `create_new`, so two concurrent writers never share a path: the
/// loser sees `AlreadyExists` and compares instead.
async fn write_or_match(path: &Path, bytes: &[u8]) -> io::Result<bool> {
    let created = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await;
    match created {
        Ok(mut file) => {
            file.write_all(bytes).await?;
            file.flush().await?;
            Ok(true)
        }
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            Ok(tokio::fs::read(path).await? == bytes)
        }
        Err(err) => Err(err),
    }
}

/// Strip directory components so a client-supplied name cannot escape the upload directory.
fn base_name(name: &str) -> String {
    let candidate = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if candidate.is_empty() || candidate == "." || candidate == ".." {
        FALLBACK_NAME.to_string()
    } else {
        candidate.to_string()
    }
}

fn suffixed_name(name: &str, suffix: &str) -> String {
    let path = Path::new(name);
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(FALLBACK_NAME);
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(extension) => format!("{stem}-{suffix}.{extension}"),
        None => format!("{stem}-{suffix}"),
    }
}

fn content_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
