//
// storage.rs
// Dicom-Viewer-rs
//
// Content-addressed store for uploaded DICOM files: sanitised stem plus a SHA-256 prefix, reads confined to the root.
//
// Thales Matheus Mendonça Santos - November 2025

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};

/// Hex characters of the content hash kept in stored names.
const HASH_PREFIX_LEN: usize = 12;
const FALLBACK_STEM: &str = "dicom";

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

/// A file that was written to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    /// Name under which the file can be fetched back.
    pub filename: String,
    pub path: PathBuf,
}

impl FileStore {
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create upload directory {:?}", root))?;
        Ok(Self { root })
    }

    /// Identical bytes uploaded under the same name land on the same file.
    pub fn save(&self, original_name: Option<&str>, bytes: &[u8]) -> Result<StoredUpload> {
        let stem = original_name
            .and_then(|n| Path::new(n).file_stem().and_then(|s| s.to_str()))
            .map(sanitize_filename)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| FALLBACK_STEM.to_string());

        let hash = hex::encode(Sha256::digest(bytes));
        let filename = format!("{}-{}.dcm", stem, &hash[..HASH_PREFIX_LEN]);
        let path = self.root.join(&filename);
        fs::write(&path, bytes)
            .with_context(|| format!("Failed to persist uploaded file {:?}", path))?;
        Ok(StoredUpload { filename, path })
    }

    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        let canonical_root = self
            .root
            .canonicalize()
            .unwrap_or_else(|_| self.root.clone());
        let canonical = self
            .root
            .join(name)
            .canonicalize()
            .context("Requested file not found")?;
        if !canonical.starts_with(&canonical_root) {
            bail!("Attempt to access file outside storage root");
        }
        Ok(canonical)
    }

    /// Resolve `name` and read the stored bytes.
    pub async fn load(&self, name: &str) -> Result<(PathBuf, Vec<u8>)> {
        let path = self.resolve(name)?;
        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read stored file {:?}", path))?;
        Ok((path, bytes))
    }
}

/// ASCII letters, digits, `-` and `_` only.
fn sanitize_filename(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}
