//! OCI Content Digest validation and manipulation.
//!
//! This module provides a wrapper around the `oci_spec::image::Digest` type
//! to integrate with Rel's error handling, plus the referrers tag schema used
//! by registries without the Referrers API.

use crate::error::{Result, RelError};
use oci_spec::image::Digest as OciDigest;
use sha2::{Digest as Sha2Digest, Sha256};
use std::fmt;
use std::str::FromStr;


/// Maximum length of the algorithm part of a referrers tag.
const REFERRERS_TAG_ALGORITHM_MAX: usize = 32;

/// Maximum length of the encoded part of a referrers tag.
const REFERRERS_TAG_ENCODED_MAX: usize = 64;

/// Represents a content digest, wrapping the `oci_spec::image::Digest` type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest(OciDigest);

impl FromStr for Digest {
    type Err = RelError;

    fn from_str(s: &str) -> Result<Self> {
        let oci_digest = OciDigest::from_str(s).map_err(|e| RelError::Validation {
            message: format!("Invalid digest format '{}': {}", s, e),
            source: Some(Box::new(e)),
        })?;
        Ok(Digest(oci_digest))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<OciDigest> for Digest {
    fn from(digest: OciDigest) -> Self {
        Digest(digest)
    }
}

impl From<Digest> for OciDigest {
    fn from(digest: Digest) -> Self {
        digest.0
    }
}

impl Digest {
    /// Computes the sha256 digest of the given content.
    ///
    /// # Examples
    ///
    /// ```
    /// use librel::digest::Digest;
    ///
    /// let digest = Digest::sha256_of(b"{}").unwrap();
    /// assert_eq!(digest.algorithm(), "sha256");
    /// ```
    pub fn sha256_of(content: &[u8]) -> Result<Self> {
        let mut hasher = Sha256::new();
        hasher.update(content);
        Self::from_str(&format!("sha256:{:x}", hasher.finalize()))
    }

    /// Returns the algorithm part (e.g. `sha256`).
    pub fn algorithm(&self) -> String {
        let s = self.0.to_string();
        s.split_once(':')
            .map(|(alg, _)| alg.to_string())
            .unwrap_or_default()
    }

    /// Returns the encoded part (the hex string after the colon).
    pub fn encoded(&self) -> String {
        let s = self.0.to_string();
        s.split_once(':')
            .map(|(_, enc)| enc.to_string())
            .unwrap_or(s)
    }

    /// Returns the underlying `oci_spec` digest.
    pub fn as_oci(&self) -> &OciDigest {
        &self.0
    }

    /// Derives the referrers tag for this digest.
    ///
    /// Registries that do not implement the Referrers API keep an image index
    /// of referrers under a tag of the form `<alg>-<encoded>`, with the
    /// algorithm truncated to 32 characters and the encoded part to 64.
    ///
    /// # Examples
    ///
    /// ```
    /// use librel::digest::Digest;
    /// use std::str::FromStr;
    ///
    /// let digest = Digest::from_str(
    ///     "sha256:9834876dcfb05cb167a5c24953eba58c4ac89b1adf57f28f2f9d09af107ee8f0",
    /// ).unwrap();
    /// assert_eq!(
    ///     digest.referrers_tag(),
    ///     "sha256-9834876dcfb05cb167a5c24953eba58c4ac89b1adf57f28f2f9d09af107ee8f0"
    /// );
    /// ```
    pub fn referrers_tag(&self) -> String {
        let algorithm = self.algorithm();
        let encoded = self.encoded();
        let algorithm: String = algorithm.chars().take(REFERRERS_TAG_ALGORITHM_MAX).collect();
        let encoded: String = encoded.chars().take(REFERRERS_TAG_ENCODED_MAX).collect();
        format!("{}-{}", algorithm, encoded)
    }
}
