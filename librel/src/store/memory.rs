//! In-memory store.
//!
//! A self-contained store used to exercise discovery without a registry or a
//! layout on disk. It can present itself with or without the native
//! referrers capability, and can inject failures or stalls for specific
//! subjects.

use super::Store;
use crate::digest::Digest;
use crate::error::{Result, RelError};
use crate::oci::{
    Descriptor, MEDIA_TYPE_IMAGE_INDEX, MEDIA_TYPE_IMAGE_MANIFEST, ManifestSummary,
    Platform, new_descriptor,
};
use async_trait::async_trait;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};

const EMPTY_CONFIG_DIGEST: &str =
    "sha256:44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a";

struct StoredManifest {
    descriptor: Descriptor,
    content: Vec<u8>,
    platform: Option<Platform>,
}

/// A store that keeps manifests in memory.
///
/// # Examples
///
/// ```
/// use librel::store::MemoryStore;
///
/// let mut store = MemoryStore::new("localhost:5000/repo");
/// let subject = store.add_image("v1").unwrap();
/// store
///     .add_referrer(&subject, "application/vnd.example.sbom+json", &[])
///     .unwrap();
/// ```
pub struct MemoryStore {
    locator: String,
    manifests: Vec<StoredManifest>,
    tags: HashMap<String, String>,
    native_referrers: bool,
    failing_subjects: HashSet<String>,
    stalled_subjects: HashSet<String>,
    sequence: usize,
    referrers_calls: AtomicUsize,
}

impl MemoryStore {
    /// Creates an empty store that supports the native referrers capability.
    pub fn new(locator: &str) -> Self {
        Self {
            locator: locator.to_string(),
            manifests: Vec::new(),
            tags: HashMap::new(),
            native_referrers: true,
            failing_subjects: HashSet::new(),
            stalled_subjects: HashSet::new(),
            sequence: 0,
            referrers_calls: AtomicUsize::new(0),
        }
    }

    /// Makes the store report the native referrers capability as unsupported.
    pub fn without_referrers_api(mut self) -> Self {
        self.native_referrers = false;
        self
    }

    /// Stores raw manifest content, optionally tagging it.
    pub fn add_manifest(
        &mut self,
        content: Vec<u8>,
        tag: Option<&str>,
        platform: Option<Platform>,
    ) -> Result<Descriptor> {
        let media_type = match ManifestSummary::from_bytes(&content) {
            Ok(summary) => summary.effective_media_type(),
            Err(_) => raw_media_type(&content)?,
        };
        let digest = Digest::sha256_of(&content)?;
        let descriptor = new_descriptor(&media_type, &digest, content.len() as u64);

        if let Some(tag) = tag {
            self.tags.insert(tag.to_string(), digest.to_string());
        }
        if !self
            .manifests
            .iter()
            .any(|m| m.descriptor.digest() == descriptor.digest())
        {
            self.manifests.push(StoredManifest {
                descriptor: descriptor.clone(),
                content,
                platform,
            });
        }
        Ok(descriptor)
    }

    /// Adds a tagged image manifest and returns its descriptor.
    pub fn add_image(&mut self, tag: &str) -> Result<Descriptor> {
        let content = self.manifest_content(None, None, &[], Some(tag));
        self.add_generated(content, Some(tag), None)
    }

    /// Adds an artifact whose subject is `subject`.
    pub fn add_referrer(
        &mut self,
        subject: &Descriptor,
        artifact_type: &str,
        annotations: &[(&str, &str)],
    ) -> Result<Descriptor> {
        let content = self.manifest_content(Some(subject), Some(artifact_type), annotations, None);
        self.add_generated(content, None, None)
    }

    /// Adds an artifact whose subject is `subject` and whose listing carries `platform`.
    pub fn add_referrer_with_platform(
        &mut self,
        subject: &Descriptor,
        artifact_type: &str,
        platform: Platform,
    ) -> Result<Descriptor> {
        let content = self.manifest_content(Some(subject), Some(artifact_type), &[], None);
        self.add_generated(content, None, Some(platform))
    }

    /// Publishes the referrers of `subject` under its referrers tag, the way
    /// clients do for registries without the Referrers API.
    pub fn publish_referrers_tag(&mut self, subject: &Descriptor) -> Result<Descriptor> {
        let referrers = self.list_referrers(subject)?;
        let index = json!({
            "schemaVersion": 2,
            "mediaType": MEDIA_TYPE_IMAGE_INDEX,
            "manifests": referrers,
        });
        let content = serde_json::to_vec(&index)
            .map_err(|e| RelError::validation_with_source("Failed to encode referrers index", e))?;
        let tag = Digest::from(subject.digest().clone()).referrers_tag();
        self.add_manifest(content, Some(&tag), None)
    }

    /// Makes every referrers listing of `subject` fail with a network error.
    pub fn fail_referrers_of(&mut self, subject: &Descriptor) {
        self.failing_subjects.insert(subject.digest().to_string());
    }

    /// Makes every referrers listing of `subject` wait forever.
    pub fn stall_referrers_of(&mut self, subject: &Descriptor) {
        self.stalled_subjects.insert(subject.digest().to_string());
    }

    /// Returns how many times the native referrers capability was called.
    pub fn referrers_calls(&self) -> usize {
        self.referrers_calls.load(Ordering::SeqCst)
    }

    fn add_generated(
        &mut self,
        content: serde_json::Value,
        tag: Option<&str>,
        platform: Option<Platform>,
    ) -> Result<Descriptor> {
        self.add_manifest(content.to_string().into_bytes(), tag, platform)
    }

    fn manifest_content(
        &mut self,
        subject: Option<&Descriptor>,
        artifact_type: Option<&str>,
        annotations: &[(&str, &str)],
        title: Option<&str>,
    ) -> serde_json::Value {
        self.sequence += 1;
        let mut manifest = json!({
            "schemaVersion": 2,
            "mediaType": MEDIA_TYPE_IMAGE_MANIFEST,
            "config": {
                "mediaType": "application/vnd.oci.empty.v1+json",
                "digest": EMPTY_CONFIG_DIGEST,
                "size": 2
            },
            "layers": [{
                "mediaType": "application/octet-stream",
                "digest": EMPTY_CONFIG_DIGEST,
                "size": self.sequence
            }]
        });
        if let Some(artifact_type) = artifact_type {
            manifest["artifactType"] = json!(artifact_type);
        }
        if let Some(subject) = subject {
            manifest["subject"] = json!(subject);
        }
        if let Some(title) = title {
            manifest["annotations"] = json!({ "org.opencontainers.image.title": title });
        } else if !annotations.is_empty() {
            let map: HashMap<&str, &str> = annotations.iter().copied().collect();
            manifest["annotations"] = json!(map);
        }
        manifest
    }

    fn list_referrers(&self, subject: &Descriptor) -> Result<Vec<Descriptor>> {
        let target = subject.digest().to_string();
        let mut referrers = Vec::new();
        for stored in &self.manifests {
            let Ok(summary) = ManifestSummary::from_bytes(&stored.content) else {
                continue;
            };
            if summary.subject_digest().as_deref() == Some(target.as_str()) {
                let digest = Digest::from(stored.descriptor.digest().clone());
                let mut descriptor = summary.referrer_descriptor(&digest, stored.descriptor.size());
                descriptor.set_platform(stored.platform.clone());
                referrers.push(descriptor);
            }
        }
        Ok(referrers)
    }

    fn find(&self, digest: &str) -> Option<&StoredManifest> {
        self.manifests
            .iter()
            .find(|m| m.descriptor.digest().to_string() == digest)
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn locator(&self) -> &str {
        &self.locator
    }

    async fn resolve(&self, identifier: &str) -> Result<Descriptor> {
        let digest = if Digest::from_str(identifier).is_ok() {
            identifier.to_string()
        } else {
            self.tags
                .get(identifier)
                .cloned()
                .ok_or_else(|| RelError::not_found("tag", identifier))?
        };

        self.find(&digest)
            .map(|m| m.descriptor.clone())
            .ok_or_else(|| RelError::not_found("manifest".to_string(), digest))
    }

    async fn referrers(&self, subject: &Descriptor) -> Result<Vec<Descriptor>> {
        self.referrers_calls.fetch_add(1, Ordering::SeqCst);
        if self.stalled_subjects.contains(&subject.digest().to_string()) {
            std::future::pending::<()>().await;
        }
        if self.failing_subjects.contains(&subject.digest().to_string()) {
            return Err(RelError::network(format!(
                "connection reset while listing referrers of {}",
                subject.digest()
            )));
        }
        if !self.native_referrers {
            return Err(RelError::unsupported(self.locator.as_str()));
        }
        self.list_referrers(subject)
    }

    async fn fetch_manifest(&self, descriptor: &Descriptor) -> Result<Vec<u8>> {
        let digest = descriptor.digest().to_string();
        self.find(&digest)
            .map(|m| m.content.clone())
            .ok_or_else(|| RelError::not_found("manifest".to_string(), digest))
    }

    fn preserves_order(&self) -> bool {
        true
    }
}

/// Reads the media type of content that is JSON but not a well-formed manifest.
fn raw_media_type(content: &[u8]) -> Result<String> {
    let value: serde_json::Value = serde_json::from_slice(content)
        .map_err(|e| RelError::validation_with_source("Failed to parse manifest JSON", e))?;
    Ok(value["mediaType"]
        .as_str()
        .unwrap_or(MEDIA_TYPE_IMAGE_MANIFEST)
        .to_string())
}

/// Builds a platform from its parts.
///
/// # Examples
///
/// ```
/// use librel::store::memory::platform;
///
/// let p = platform("linux", "arm64", Some("v8")).unwrap();
/// assert_eq!(p.os().to_string(), "linux");
/// ```
pub fn platform(os: &str, architecture: &str, variant: Option<&str>) -> Result<Platform> {
    serde_json::from_value(json!({
        "os": os,
        "architecture": architecture,
        "variant": variant,
    }))
    .map_err(|e| RelError::validation_with_source("Invalid platform", e))
}
