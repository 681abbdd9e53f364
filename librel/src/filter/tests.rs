use super::*;
use crate::digest::Digest;
use crate::oci::{MEDIA_TYPE_IMAGE_MANIFEST, Platform, new_descriptor};
use crate::store::memory::platform;

const SBOM: &str = "application/vnd.example.sbom+json";
const SIGNATURE: &str = "application/vnd.example.signature+json";

fn referrer(seed: &[u8], artifact_type: Option<&str>, platform: Option<Platform>) -> Descriptor {
    let digest = Digest::sha256_of(seed).unwrap();
    let mut descriptor = new_descriptor(MEDIA_TYPE_IMAGE_MANIFEST, &digest, 100);
    descriptor.set_artifact_type(artifact_type.map(Into::into));
    descriptor.set_platform(platform);
    descriptor
}

/// Returns a subject, an SBOM without platform, and linux/amd64 and
/// linux/arm64/v8 signatures.
fn descriptors() -> (Descriptor, Descriptor, Descriptor, Descriptor) {
    (
        referrer(b"subject", None, None),
        referrer(b"sbom", Some(SBOM), None),
        referrer(
            b"amd64",
            Some(SIGNATURE),
            Some(platform("linux", "amd64", None).unwrap()),
        ),
        referrer(
            b"arm64",
            Some(SIGNATURE),
            Some(platform("linux", "arm64", Some("v8")).unwrap()),
        ),
    )
}

#[test]
fn test_parse_full_selector() {
    let selector: PlatformSelector = "linux/arm64/v8".parse().unwrap();
    assert_eq!(selector.os.as_deref(), Some("linux"));
    assert_eq!(selector.architecture.as_deref(), Some("arm64"));
    assert_eq!(selector.variant.as_deref(), Some("v8"));
    assert_eq!(selector.to_string(), "linux/arm64/v8");
}

#[test]
fn test_parse_os_only() {
    let selector: PlatformSelector = "linux".parse().unwrap();
    assert_eq!(selector.os.as_deref(), Some("linux"));
    assert_eq!(selector.architecture, None);
    assert_eq!(selector.to_string(), "linux");
}

#[test]
fn test_parse_empty_parts_are_wildcards() {
    let selector: PlatformSelector = "/arm64".parse().unwrap();
    assert_eq!(selector.os, None);
    assert_eq!(selector.architecture.as_deref(), Some("arm64"));
}

#[test]
fn test_parse_invalid_selectors() {
    assert!(matches!(
        "".parse::<PlatformSelector>().unwrap_err(),
        RelError::Validation { .. }
    ));
    assert!("//".parse::<PlatformSelector>().is_err());
    assert!("linux/amd64/v1/extra".parse::<PlatformSelector>().is_err());
}

#[test]
fn test_empty_criteria_match_everything() {
    let (subject, sbom, amd64, _) = descriptors();
    let criteria = FilterCriteria::new();

    assert!(criteria.is_empty());
    assert!(criteria.matches(&subject));
    assert!(criteria.matches(&sbom));
    assert!(criteria.matches(&amd64));
}

#[test]
fn test_empty_artifact_type_is_unset() {
    let criteria = FilterCriteria::new().with_artifact_type("");
    assert!(criteria.is_empty());
}

#[test]
fn test_artifact_type_exact_match() {
    let (subject, sbom, amd64, _) = descriptors();
    let criteria = FilterCriteria::new().with_artifact_type(SBOM);

    assert!(criteria.matches(&sbom));
    assert!(!criteria.matches(&amd64));
    assert!(!criteria.matches(&subject));
    assert!(!FilterCriteria::new()
        .with_artifact_type("application/vnd.example")
        .matches(&sbom));
}

#[test]
fn test_platform_filter() {
    let (_, sbom, amd64, arm64) = descriptors();
    let criteria = FilterCriteria::new().with_platform("linux/amd64".parse().unwrap());

    assert!(criteria.matches(&amd64));
    assert!(!criteria.matches(&arm64));
    assert!(!criteria.matches(&sbom));
}

#[test]
fn test_platform_filter_wildcards() {
    let (_, sbom, amd64, arm64) = descriptors();
    let any_linux = FilterCriteria::new().with_platform("linux".parse().unwrap());
    let any_v8 = FilterCriteria::new().with_platform("linux//v8".parse().unwrap());

    assert!(any_linux.matches(&amd64));
    assert!(any_linux.matches(&arm64));
    assert!(!any_linux.matches(&sbom));
    assert!(any_v8.matches(&arm64));
    assert!(!any_v8.matches(&amd64));
}

#[test]
fn test_combined_criteria() {
    let (_, sbom, amd64, _) = descriptors();
    let criteria = FilterCriteria::new()
        .with_artifact_type(SIGNATURE)
        .with_platform("linux/amd64".parse().unwrap());

    assert!(criteria.matches(&amd64));
    assert!(!criteria.matches(&sbom));
}
