//! Referrer fetching.
//!
//! A [`ReferrerFetcher`] lists the referrers of one descriptor at a time.
//! Which protocol it speaks is decided once, on the first fetch: the store's
//! native referrers capability is tried, and if the store reports it as
//! unsupported every later fetch goes through the referrers tag schema
//! instead.

use crate::error::{Result, RelError};
use crate::oci::{Descriptor, digest_of};
use crate::store::Store;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use tracing::{debug, trace};

#[cfg(test)]
mod tests;

/// How referrers are listed for a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferrersStrategy {
    /// The store's native referrers capability (the Referrers API).
    Native,
    /// An image index published under the subject's referrers tag.
    TagSchema,
}

impl FromStr for ReferrersStrategy {
    type Err = RelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "v1.1-referrers-api" => Ok(ReferrersStrategy::Native),
            "v1.1-referrers-tag" => Ok(ReferrersStrategy::TagSchema),
            other => Err(RelError::validation(format!(
                "Unknown distribution spec '{}': expected v1.1-referrers-api or v1.1-referrers-tag",
                other
            ))),
        }
    }
}

impl fmt::Display for ReferrersStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReferrersStrategy::Native => "v1.1-referrers-api",
            ReferrersStrategy::TagSchema => "v1.1-referrers-tag",
        })
    }
}

/// The `manifests` of a referrers tag index, before validation.
#[derive(Deserialize)]
struct TagSchemaIndex {
    #[serde(default)]
    manifests: Vec<serde_json::Value>,
}

/// Lists referrers of descriptors in one store.
pub struct ReferrerFetcher<'a> {
    store: &'a dyn Store,
    strategy: OnceLock<ReferrersStrategy>,
}

impl<'a> ReferrerFetcher<'a> {
    /// Creates a fetcher that has not checked the store yet.
    pub fn new(store: &'a dyn Store) -> Self {
        Self {
            store,
            strategy: OnceLock::new(),
        }
    }

    /// Creates a fetcher pinned to `strategy`, skipping the capability check.
    ///
    /// A fetcher pinned to [`ReferrersStrategy::Native`] never falls back:
    /// a store without the capability fails with `Unsupported`.
    pub fn with_strategy(store: &'a dyn Store, strategy: ReferrersStrategy) -> Self {
        let fetcher = Self::new(store);
        let _ = fetcher.strategy.set(strategy);
        fetcher
    }

    /// Returns the strategy chosen so far, if the store has been checked.
    pub fn strategy(&self) -> Option<ReferrersStrategy> {
        self.strategy.get().copied()
    }

    /// Returns the store this fetcher reads from.
    pub fn store(&self) -> &'a dyn Store {
        self.store
    }

    /// Lists the referrers of `subject`, deduplicated by digest.
    ///
    /// Order is the order the store reports them in; the first occurrence
    /// of a digest wins.
    pub async fn fetch(&self, subject: &Descriptor) -> Result<Vec<Descriptor>> {
        let referrers = match self.strategy() {
            Some(ReferrersStrategy::TagSchema) => self.fetch_by_tag_schema(subject).await?,
            Some(ReferrersStrategy::Native) => self.store.referrers(subject).await?,
            None => match self.store.referrers(subject).await {
                Ok(referrers) => {
                    self.choose(ReferrersStrategy::Native);
                    referrers
                }
                Err(e) if e.is_unsupported() => {
                    debug!(store = self.store.locator(), "Falling back to referrers tag schema");
                    self.choose(ReferrersStrategy::TagSchema);
                    self.fetch_by_tag_schema(subject).await?
                }
                Err(e) => return Err(e),
            },
        };

        let referrers = dedup_by_digest(referrers);
        debug!(
            subject = %subject.digest(),
            count = referrers.len(),
            "Fetched referrers"
        );
        Ok(referrers)
    }

    fn choose(&self, strategy: ReferrersStrategy) {
        if self.strategy.set(strategy).is_ok() {
            debug!(store = self.store.locator(), ?strategy, "Selected referrers strategy");
        }
    }

    /// Reads the index published under the subject's referrers tag.
    ///
    /// A missing tag means the subject has no referrers.
    async fn fetch_by_tag_schema(&self, subject: &Descriptor) -> Result<Vec<Descriptor>> {
        let tag = digest_of(subject).referrers_tag();
        let index = match self.store.resolve_tag(&tag).await {
            Ok(index) => index,
            Err(e) if e.is_not_found() => {
                trace!(%tag, "No referrers tag");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let content = self.store.fetch_manifest(&index).await?;
        let index: TagSchemaIndex = serde_json::from_slice(&content).map_err(|e| {
            RelError::validation_with_source(
                format!("Failed to parse referrers index at tag {}", tag),
                e,
            )
        })?;

        Ok(index
            .manifests
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<Descriptor>(value) {
                Ok(descriptor) => Some(descriptor),
                Err(e) => {
                    debug!(%tag, error = %e, "Skipping malformed descriptor in referrers index");
                    None
                }
            })
            .collect())
    }
}

/// Removes repeated digests, keeping the first occurrence.
pub fn dedup_by_digest(descriptors: Vec<Descriptor>) -> Vec<Descriptor> {
    let mut seen = HashSet::new();
    descriptors
        .into_iter()
        .filter(|d| seen.insert(d.digest().to_string()))
        .collect()
}

