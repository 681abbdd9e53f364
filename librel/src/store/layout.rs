//! OCI image layout store.
//!
//! Reads a directory laid out per the OCI Image Layout Specification:
//! an `oci-layout` marker, an `index.json` listing top-level manifests, and
//! content-addressed blobs under `blobs/<algorithm>/<encoded>`.

use super::Store;
use crate::digest::Digest;
use crate::error::{Result, RelError};
use crate::oci::{ANNOTATION_REF_NAME, Descriptor, ManifestSummary, new_descriptor};
use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::sync::OnceCell;
use tracing::{debug, trace};

/// One `subject -> referrer` edge found in the layout.
struct LayoutEdge {
    subject: String,
    referrer: Descriptor,
}

/// A store backed by an OCI image layout directory.
pub struct OciLayoutStore {
    root: PathBuf,
    locator: String,
    entries: Vec<Descriptor>,
    edges: OnceCell<Vec<LayoutEdge>>,
}

impl OciLayoutStore {
    /// Opens the layout rooted at `root`.
    ///
    /// Fails if the directory has no `oci-layout` marker or its `index.json`
    /// cannot be read.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let locator = root.display().to_string();

        let marker = root.join("oci-layout");
        match tokio::fs::metadata(&marker).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(RelError::storage(format!(
                    "{} is not an OCI image layout: missing oci-layout file",
                    locator
                )));
            }
            Err(e) => {
                return Err(RelError::storage_with_source(
                    format!("Failed to access OCI layout at {}", locator),
                    e,
                ));
            }
        }

        let index_path = root.join("index.json");
        let bytes = tokio::fs::read(&index_path).await.map_err(|e| {
            RelError::storage_with_source(format!("Failed to read {}", index_path.display()), e)
        })?;
        let index = ManifestSummary::from_bytes(&bytes)?;
        let entries = index.manifests.unwrap_or_default();
        debug!(layout = %locator, entries = entries.len(), "Opened OCI layout");

        Ok(Self {
            root,
            locator,
            entries,
            edges: OnceCell::new(),
        })
    }

    /// Returns the root directory of the layout.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, digest: &Digest) -> PathBuf {
        self.root
            .join("blobs")
            .join(digest.algorithm())
            .join(digest.encoded())
    }

    async fn read_blob(&self, digest: &Digest) -> Result<Vec<u8>> {
        let path = self.blob_path(digest);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                trace!(%digest, size = bytes.len(), "Read blob");
                Ok(bytes)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(RelError::not_found(
                "blob".to_string(),
                format!("{}@{}", self.locator, digest),
            )),
            Err(e) => Err(RelError::storage_with_source(
                format!("Failed to read blob {}", path.display()),
                e,
            )),
        }
    }

    fn find_tag(&self, tag: &str) -> Option<&Descriptor> {
        self.entries.iter().rev().find(|d| {
            d.annotations()
                .as_ref()
                .and_then(|a| a.get(ANNOTATION_REF_NAME))
                .is_some_and(|name| name == tag)
        })
    }

    /// Walks every manifest reachable from `index.json` and records each
    /// manifest that names a subject.
    async fn collect_edges(&self) -> Result<Vec<LayoutEdge>> {
        let mut edges = Vec::new();
        let mut seen = HashSet::new();
        let mut queue: VecDeque<Descriptor> = self.entries.iter().cloned().collect();

        while let Some(listing) = queue.pop_front() {
            let digest = Digest::from(listing.digest().clone());
            if !seen.insert(digest.to_string()) {
                continue;
            }

            let content = match self.read_blob(&digest).await {
                Ok(content) => content,
                Err(e) if e.is_not_found() => {
                    debug!(%digest, "Skipping manifest missing from layout");
                    continue;
                }
                Err(e) => return Err(e),
            };
            let summary = match ManifestSummary::from_bytes(&content) {
                Ok(summary) => summary,
                Err(_) => {
                    debug!(%digest, "Skipping non-JSON blob listed in layout");
                    continue;
                }
            };

            if let Some(subject) = summary.subject_digest() {
                let mut referrer = summary.referrer_descriptor(&digest, content.len() as u64);
                referrer.set_platform(listing.platform().clone());
                edges.push(LayoutEdge { subject, referrer });
            }
            if summary.is_index()
                && let Some(children) = summary.manifests
            {
                queue.extend(children);
            }
        }

        debug!(layout = %self.locator, edges = edges.len(), "Indexed layout referrers");
        Ok(edges)
    }
}

#[async_trait]
impl Store for OciLayoutStore {
    fn locator(&self) -> &str {
        &self.locator
    }

    async fn resolve(&self, identifier: &str) -> Result<Descriptor> {
        if let Ok(digest) = Digest::from_str(identifier) {
            let content = self.read_blob(&digest).await?;
            let summary = ManifestSummary::from_bytes(&content)?;
            return Ok(new_descriptor(
                &summary.effective_media_type(),
                &digest,
                content.len() as u64,
            ));
        }

        self.find_tag(identifier).cloned().ok_or_else(|| {
            RelError::not_found("tag".to_string(), format!("{}:{}", self.locator, identifier))
        })
    }

    async fn referrers(&self, subject: &Descriptor) -> Result<Vec<Descriptor>> {
        let edges = self.edges.get_or_try_init(|| self.collect_edges()).await?;
        let target = subject.digest().to_string();
        Ok(edges
            .iter()
            .filter(|edge| edge.subject == target)
            .map(|edge| edge.referrer.clone())
            .collect())
    }

    async fn fetch_manifest(&self, descriptor: &Descriptor) -> Result<Vec<u8>> {
        self.read_blob(&Digest::from(descriptor.digest().clone())).await
    }

    fn preserves_order(&self) -> bool {
        true
    }
}

#[cfg(test)]
#[path = "layout_tests.rs"]
mod tests;
