use super::*;
use std::str::FromStr;

const DIGEST: &str = "sha256:9834876dcfb05cb167a5c24953eba58c4ac89b1adf57f28f2f9d09af107ee8f0";

#[test]
fn test_summary_of_artifact_manifest() {
    let bytes = br#"{
        "schemaVersion": 2,
        "mediaType": "application/vnd.oci.image.manifest.v1+json",
        "artifactType": "application/vnd.example.sbom+json",
        "config": {
            "mediaType": "application/vnd.oci.empty.v1+json",
            "digest": "sha256:44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a",
            "size": 2
        },
        "layers": [],
        "subject": {
            "mediaType": "application/vnd.oci.image.manifest.v1+json",
            "digest": "sha256:9834876dcfb05cb167a5c24953eba58c4ac89b1adf57f28f2f9d09af107ee8f0",
            "size": 851
        },
        "annotations": {"org.opencontainers.image.created": "2023-01-29T02:32:18Z"}
    }"#;

    let summary = ManifestSummary::from_bytes(bytes).unwrap();

    assert!(!summary.is_index());
    assert_eq!(
        summary.effective_artifact_type().as_deref(),
        Some("application/vnd.example.sbom+json")
    );
    assert_eq!(summary.subject_digest().as_deref(), Some(DIGEST));
}

#[test]
fn test_artifact_type_falls_back_to_config_media_type() {
    let bytes = br#"{
        "schemaVersion": 2,
        "mediaType": "application/vnd.oci.image.manifest.v1+json",
        "config": {
            "mediaType": "application/vnd.example.signature.config+json",
            "digest": "sha256:44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a",
            "size": 2
        },
        "layers": []
    }"#;

    let summary = ManifestSummary::from_bytes(bytes).unwrap();
    assert_eq!(
        summary.effective_artifact_type().as_deref(),
        Some("application/vnd.example.signature.config+json")
    );
}

#[test]
fn test_empty_config_is_not_an_artifact_type() {
    let bytes = br#"{
        "schemaVersion": 2,
        "config": {
            "mediaType": "application/vnd.oci.empty.v1+json",
            "digest": "sha256:44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a",
            "size": 2
        },
        "layers": []
    }"#;

    let summary = ManifestSummary::from_bytes(bytes).unwrap();
    assert_eq!(summary.effective_artifact_type(), None);
    assert_eq!(summary.effective_media_type(), MEDIA_TYPE_IMAGE_MANIFEST);
}

#[test]
fn test_index_detected_without_media_type() {
    let bytes = br#"{"schemaVersion": 2, "manifests": []}"#;

    let summary = ManifestSummary::from_bytes(bytes).unwrap();
    assert!(summary.is_index());
    assert_eq!(summary.effective_media_type(), MEDIA_TYPE_IMAGE_INDEX);
}

#[test]
fn test_docker_manifest_list_is_index() {
    let bytes = br#"{
        "schemaVersion": 2,
        "mediaType": "application/vnd.docker.distribution.manifest.list.v2+json",
        "manifests": []
    }"#;

    assert!(ManifestSummary::from_bytes(bytes).unwrap().is_index());
}

#[test]
fn test_invalid_json_is_validation_error() {
    let result = ManifestSummary::from_bytes(b"not json");
    assert!(matches!(result.unwrap_err(), RelError::Validation { .. }));
}

#[test]
fn test_referrer_descriptor_keeps_annotations_and_artifact_type() {
    let bytes = br#"{
        "schemaVersion": 2,
        "mediaType": "application/vnd.oci.image.manifest.v1+json",
        "artifactType": "application/vnd.example.sbom+json",
        "layers": [],
        "annotations": {"foo": "bar"}
    }"#;
    let summary = ManifestSummary::from_bytes(bytes).unwrap();
    let digest = Digest::from_str(DIGEST).unwrap();

    let descriptor = summary.referrer_descriptor(&digest, 42);

    assert_eq!(descriptor.size(), 42);
    assert_eq!(descriptor.digest().to_string(), DIGEST);
    assert_eq!(
        artifact_type_of(&descriptor).as_deref(),
        Some("application/vnd.example.sbom+json")
    );
    let annotations = descriptor.annotations().as_ref().unwrap();
    assert_eq!(annotations.get("foo").map(String::as_str), Some("bar"));
}

#[test]
fn test_referrer_descriptor_drops_empty_annotations() {
    let bytes = br#"{"schemaVersion": 2, "layers": [], "annotations": {}}"#;
    let summary = ManifestSummary::from_bytes(bytes).unwrap();
    let digest = Digest::from_str(DIGEST).unwrap();

    let descriptor = summary.referrer_descriptor(&digest, 1);
    assert!(descriptor.annotations().is_none());
}

#[test]
fn test_digest_of_descriptor() {
    let digest = Digest::from_str(DIGEST).unwrap();
    let descriptor = new_descriptor(MEDIA_TYPE_IMAGE_MANIFEST, &digest, 10);
    assert_eq!(digest_of(&descriptor), digest);
}
