//! Referrer selection by artifact type and platform.
//!
//! Filtering decides which discovered descriptors are emitted. It never
//! changes what is traversed.

use crate::error::{Result, RelError};
use crate::oci::{Descriptor, artifact_type_of};
use std::fmt;
use std::str::FromStr;

#[cfg(test)]
mod tests;

/// A platform selector of the form `os[/arch[/variant]]`.
///
/// Empty parts are wildcards, so `linux//v8` matches any architecture with
/// variant `v8`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformSelector {
    pub os: Option<String>,
    pub architecture: Option<String>,
    pub variant: Option<String>,
}

impl FromStr for PlatformSelector {
    type Err = RelError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split('/').collect();
        if parts.len() > 3 || parts.iter().all(|p| p.trim().is_empty()) {
            return Err(RelError::validation(format!(
                "Invalid platform '{}': expected os[/arch[/variant]]",
                s
            )));
        }

        let part = |i: usize| {
            parts
                .get(i)
                .map(|p| p.trim())
                .filter(|p| !p.is_empty())
                .map(str::to_string)
        };
        Ok(Self {
            os: part(0),
            architecture: part(1),
            variant: part(2),
        })
    }
}

impl fmt::Display for PlatformSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let os = self.os.as_deref().unwrap_or("");
        match (&self.architecture, &self.variant) {
            (_, Some(variant)) => write!(
                f,
                "{}/{}/{}",
                os,
                self.architecture.as_deref().unwrap_or(""),
                variant
            ),
            (Some(arch), None) => write!(f, "{}/{}", os, arch),
            (None, None) => f.write_str(os),
        }
    }
}

impl PlatformSelector {
    /// Returns true if `descriptor` carries a platform matching every set part.
    ///
    /// A descriptor without platform information never matches.
    pub fn matches(&self, descriptor: &Descriptor) -> bool {
        let Some(platform) = descriptor.platform().as_ref() else {
            return false;
        };

        let os_ok = self
            .os
            .as_ref()
            .is_none_or(|os| *os == platform.os().to_string());
        let arch_ok = self
            .architecture
            .as_ref()
            .is_none_or(|arch| *arch == platform.architecture().to_string());
        let variant_ok = self
            .variant
            .as_ref()
            .is_none_or(|variant| platform.variant().as_deref() == Some(variant.as_str()));

        os_ok && arch_ok && variant_ok
    }
}

/// What a referrer must look like to be emitted.
///
/// # Examples
///
/// ```
/// use librel::filter::FilterCriteria;
///
/// let criteria = FilterCriteria::new()
///     .with_artifact_type("application/vnd.example.sbom+json")
///     .with_platform("linux/amd64".parse().unwrap());
/// assert!(!criteria.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub artifact_type: Option<String>,
    pub platform: Option<PlatformSelector>,
}

impl FilterCriteria {
    /// Creates criteria that match everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires an exact artifact type. An empty string matches everything.
    pub fn with_artifact_type(mut self, artifact_type: impl Into<String>) -> Self {
        let artifact_type = artifact_type.into();
        self.artifact_type = (!artifact_type.is_empty()).then_some(artifact_type);
        self
    }

    /// Requires a matching platform.
    pub fn with_platform(mut self, platform: PlatformSelector) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Returns true if no criterion is set.
    pub fn is_empty(&self) -> bool {
        self.artifact_type.is_none() && self.platform.is_none()
    }

    /// Returns true if `descriptor` should be emitted.
    pub fn matches(&self, descriptor: &Descriptor) -> bool {
        if let Some(wanted) = &self.artifact_type
            && artifact_type_of(descriptor).as_deref() != Some(wanted.as_str())
        {
            return false;
        }
        self.platform
            .as_ref()
            .is_none_or(|platform| platform.matches(descriptor))
    }
}
