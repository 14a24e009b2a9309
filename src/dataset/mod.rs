//! Canned dataset resolver
//!
//! Layout on disk: `<root>/<phone_number>/<tool_name>.json`.
//! The set of directory names under the root is the allowed identity set.
//! It is re-read on every call, so adding a directory at runtime allows that
//! number immediately.

use crate::error::GatewayError;
use crate::Result;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct DatasetResolver {
    root: PathBuf,
}

impl DatasetResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory names under the root, sorted.
    pub async fn allowed_identities(&self) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.root).await.map_err(|e| {
            GatewayError::Dataset(format!(
                "cannot list dataset root {}: {}",
                self.root.display(),
                e
            ))
        })?;

        let mut identities = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            identities.push(name);
        }

        identities.sort();
        Ok(identities)
    }

    pub async fn is_allowed(&self, phone_number: &str) -> Result<bool> {
        if !is_safe_segment(phone_number) {
            return Ok(false);
        }
        Ok(self
            .allowed_identities()
            .await?
            .iter()
            .any(|allowed| allowed == phone_number))
    }

    /// Bytes of `<root>/<phone_number>/<tool_name>.json`, `None` when absent.
    pub async fn get(&self, phone_number: &str, tool_name: &str) -> Result<Option<Vec<u8>>> {
        if !is_safe_segment(phone_number) || !is_safe_segment(tool_name) {
            return Ok(None);
        }

        let path = self
            .root
            .join(phone_number)
            .join(format!("{}.json", tool_name));
        debug!(path = %path.display(), "reading canned dataset");

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// A single path component that cannot climb out of the dataset root.
fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\', '\0'])
}
