//! Subject reference parsing and resolution.
//!
//! A subject reference names a manifest in one of two stores: a remote
//! registry (`registry/repository:tag` or `registry/repository@digest`) or a
//! local OCI image layout directory (`path:tag` or `path@digest`). Remote
//! references are validated with `oci_spec::distribution::Reference`.

use crate::digest::Digest;
use crate::error::{Result, RelError};
use crate::oci::Descriptor;
use crate::store::Store;
use oci_spec::distribution::Reference as OciReference;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;


/// Maximum length of an OCI tag.
const MAX_TAG_LENGTH: usize = 128;

/// The part of a reference that selects a manifest inside a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    /// A mutable tag such as `v1.0`
    Tag(String),
    /// An immutable content digest
    Digest(Digest),
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Tag(tag) => f.write_str(tag),
            Identifier::Digest(digest) => digest.fmt(f),
        }
    }
}

/// Where the subject lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocator {
    /// A repository on a remote registry
    Registry {
        /// Registry host, with port if any (e.g. `localhost:5000`)
        registry: String,
        /// Repository path (e.g. `library/alpine`)
        repository: String,
    },
    /// An OCI image layout directory
    Layout {
        /// Root directory of the layout
        path: PathBuf,
    },
}

impl fmt::Display for StoreLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreLocator::Registry {
                registry,
                repository,
            } => write!(f, "{}/{}", registry, repository),
            StoreLocator::Layout { path } => write!(f, "{}", path.display()),
        }
    }
}

/// A parsed subject reference: a store locator plus a tag or digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectReference {
    locator: StoreLocator,
    identifier: Identifier,
}

impl SubjectReference {
    /// Parses a remote registry reference.
    ///
    /// The reference must carry an explicit tag or digest; a bare repository
    /// is rejected rather than defaulting to `latest`.
    ///
    /// # Examples
    ///
    /// ```
    /// use librel::reference::{Identifier, SubjectReference};
    ///
    /// let reference = SubjectReference::parse_remote("localhost:5000/foobar:v1").unwrap();
    /// assert_eq!(reference.identifier(), &Identifier::Tag("v1".to_string()));
    ///
    /// assert!(SubjectReference::parse_remote("localhost:5000/foobar").is_err());
    /// ```
    pub fn parse_remote(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(RelError::invalid_reference(s, "reference is empty"));
        }

        let last_segment = s.rsplit('/').next().unwrap_or(s);
        if !last_segment.contains('@') && !last_segment.contains(':') {
            return Err(RelError::invalid_reference(
                s,
                "invalid image reference: no tag or digest found",
            ));
        }

        let oci_reference = OciReference::from_str(s).map_err(|e| {
            RelError::invalid_reference(s, format!("invalid image reference: {}", e))
        })?;

        let identifier = match (oci_reference.digest(), oci_reference.tag()) {
            (Some(digest), _) => Identifier::Digest(
                Digest::from_str(digest)
                    .map_err(|e| RelError::invalid_reference(s, e.to_string()))?,
            ),
            (None, Some(tag)) => Identifier::Tag(tag.to_string()),
            (None, None) => {
                return Err(RelError::invalid_reference(
                    s,
                    "invalid image reference: no tag or digest found",
                ));
            }
        };

        Ok(Self {
            locator: StoreLocator::Registry {
                registry: oci_reference.registry().to_string(),
                repository: oci_reference.repository().to_string(),
            },
            identifier,
        })
    }

    /// Parses an OCI image layout reference of the form `path:tag` or `path@digest`.
    ///
    /// # Examples
    ///
    /// ```
    /// use librel::reference::{Identifier, SubjectReference};
    ///
    /// let reference = SubjectReference::parse_layout("./layout:v1").unwrap();
    /// assert_eq!(reference.identifier(), &Identifier::Tag("v1".to_string()));
    /// ```
    pub fn parse_layout(s: &str) -> Result<Self> {
        let s = s.trim();

        let (path, identifier) = if let Some((path, digest)) = s.rsplit_once('@') {
            let digest = Digest::from_str(digest)
                .map_err(|e| RelError::invalid_reference(s, e.to_string()))?;
            (path, Identifier::Digest(digest))
        } else if let Some((path, tag)) = s.rsplit_once(':')
            && !tag.contains('/')
            && !tag.contains('\\')
        {
            validate_tag(s, tag)?;
            (path, Identifier::Tag(tag.to_string()))
        } else {
            return Err(RelError::invalid_reference(
                s,
                "invalid image reference: no tag or digest found",
            ));
        };

        if path.is_empty() {
            return Err(RelError::invalid_reference(s, "layout path is empty"));
        }

        Ok(Self {
            locator: StoreLocator::Layout {
                path: PathBuf::from(path),
            },
            identifier,
        })
    }

    /// Returns the store locator.
    pub fn locator(&self) -> &StoreLocator {
        &self.locator
    }

    /// Returns the tag or digest.
    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// Returns the layout path if this is a layout reference.
    pub fn layout_path(&self) -> Option<&Path> {
        match &self.locator {
            StoreLocator::Layout { path } => Some(path),
            StoreLocator::Registry { .. } => None,
        }
    }

    /// Returns the canonical form of this reference pinned to `digest`.
    ///
    /// # Examples
    ///
    /// ```
    /// use librel::reference::SubjectReference;
    /// use librel::Digest;
    ///
    /// let reference = SubjectReference::parse_remote("localhost:5000/foobar:v1").unwrap();
    /// let digest: Digest = "sha256:9834876dcfb05cb167a5c24953eba58c4ac89b1adf57f28f2f9d09af107ee8f0"
    ///     .parse()
    ///     .unwrap();
    /// assert_eq!(
    ///     reference.canonical(&digest),
    ///     "localhost:5000/foobar@sha256:9834876dcfb05cb167a5c24953eba58c4ac89b1adf57f28f2f9d09af107ee8f0"
    /// );
    /// ```
    pub fn canonical(&self, digest: &Digest) -> String {
        format!("{}@{}", self.locator, digest)
    }

    /// Resolves this reference to a concrete manifest descriptor in `store`.
    ///
    /// A store-level not-found is reported against the full reference.
    pub async fn resolve(&self, store: &dyn Store) -> Result<Descriptor> {
        debug!(reference = %self, "Resolving subject");
        let identifier = self.identifier.to_string();
        match store.resolve(&identifier).await {
            Ok(descriptor) => {
                debug!(reference = %self, digest = %descriptor.digest(), "Resolved subject");
                Ok(descriptor)
            }
            Err(e) if e.is_not_found() => {
                Err(RelError::not_found("manifest".to_string(), self.to_string()))
            }
            Err(e) => Err(e),
        }
    }
}

impl fmt::Display for SubjectReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.identifier {
            Identifier::Tag(tag) => write!(f, "{}:{}", self.locator, tag),
            Identifier::Digest(digest) => write!(f, "{}@{}", self.locator, digest),
        }
    }
}

/// Checks a tag against the OCI tag grammar `[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}`.
fn validate_tag(reference: &str, tag: &str) -> Result<()> {
    let mut chars = tag.chars();
    let valid_first = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));

    if !valid_first || !valid_rest || tag.len() > MAX_TAG_LENGTH {
        return Err(RelError::invalid_reference(
            reference,
            format!("invalid tag '{}'", tag),
        ));
    }
    Ok(())
}
