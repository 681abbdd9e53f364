use super::*;
use crate::oci::MEDIA_TYPE_IMAGE_INDEX;

const MANIFEST: &str = r#"{"schemaVersion":2,"mediaType":"application/vnd.oci.image.manifest.v1+json","config":{"mediaType":"application/vnd.oci.image.config.v1+json","digest":"sha256:44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a","size":2},"layers":[]}"#;

fn store(server: &mockito::ServerGuard) -> RemoteStore {
    let host = server.url().trim_start_matches("http://").to_string();
    RemoteStore::new(
        &host,
        "repo",
        Credentials::anonymous(),
        ClientConfig::default(),
        false,
    )
    .unwrap()
}

#[test]
fn test_registry_url_docker_hub() {
    assert_eq!(registry_url("docker.io", false), "https://registry-1.docker.io");
}

#[test]
fn test_registry_url_localhost_is_plain_http() {
    assert_eq!(registry_url("localhost", false), "http://localhost");
    assert_eq!(registry_url("127.0.0.1:5000", false), "http://127.0.0.1:5000");
    assert_eq!(registry_url("localhost.example.com", false), "https://localhost.example.com");
}

#[test]
fn test_registry_url_plain_http_override() {
    assert_eq!(registry_url("registry.lan:8080", true), "http://registry.lan:8080");
}

#[test]
fn test_locator_names_registry_and_repository() {
    let store = RemoteStore::new(
        "ghcr.io",
        "org/app",
        Credentials::anonymous(),
        ClientConfig::default(),
        false,
    )
    .unwrap();
    assert_eq!(store.locator(), "ghcr.io/org/app");
    assert_eq!(store.repository(), "org/app");
    assert!(!store.preserves_order());
}

#[tokio::test]
async fn test_resolve_uses_registry_digest() {
    let digest = "sha256:9834876dcfb05cb167a5c24953eba58c4ac89b1adf57f28f2f9d09af107ee8f0";
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v2/repo/manifests/v1")
        .with_status(200)
        .with_header("Content-Type", "application/vnd.oci.image.manifest.v1+json")
        .with_header("Docker-Content-Digest", digest)
        .with_body(MANIFEST)
        .create_async()
        .await;

    let descriptor = store(&server).resolve("v1").await.unwrap();

    assert_eq!(descriptor.digest().to_string(), digest);
    assert_eq!(descriptor.size(), MANIFEST.len() as u64);
}

#[tokio::test]
async fn test_resolve_computes_digest_when_header_missing() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v2/repo/manifests/v1")
        .with_status(200)
        .with_body(MANIFEST)
        .create_async()
        .await;

    let descriptor = store(&server).resolve("v1").await.unwrap();
    let expected = Digest::sha256_of(MANIFEST.as_bytes()).unwrap();

    assert_eq!(descriptor.digest().to_string(), expected.to_string());
    assert_eq!(
        descriptor.media_type().to_string(),
        "application/vnd.oci.image.manifest.v1+json"
    );
}

#[tokio::test]
async fn test_resolve_missing_tag_is_not_found() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v2/repo/manifests/missing")
        .with_status(404)
        .create_async()
        .await;

    let err = store(&server).resolve_tag("missing").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_referrers_without_api_is_unsupported() {
    let digest = Digest::sha256_of(MANIFEST.as_bytes()).unwrap();
    let mut server = mockito::Server::new_async().await;
    let path = format!("/v2/repo/referrers/{}", digest);
    server
        .mock("GET", path.as_str())
        .with_status(404)
        .create_async()
        .await;

    let subject = new_descriptor(
        "application/vnd.oci.image.manifest.v1+json",
        &digest,
        MANIFEST.len() as u64,
    );
    let err = store(&server).referrers(&subject).await.unwrap_err();

    assert!(err.is_unsupported());
}

#[tokio::test]
async fn test_referrers_returns_listing() {
    let digest = Digest::sha256_of(MANIFEST.as_bytes()).unwrap();
    let mut server = mockito::Server::new_async().await;
    let path = format!("/v2/repo/referrers/{}", digest);
    let body = serde_json::json!({
        "schemaVersion": 2,
        "mediaType": MEDIA_TYPE_IMAGE_INDEX,
        "manifests": [{
            "mediaType": "application/vnd.oci.image.manifest.v1+json",
            "digest": "sha256:9834876dcfb05cb167a5c24953eba58c4ac89b1adf57f28f2f9d09af107ee8f0",
            "size": 10,
            "artifactType": "application/vnd.example.sbom+json"
        }]
    });
    server
        .mock("GET", path.as_str())
        .with_status(200)
        .with_header("Content-Type", MEDIA_TYPE_IMAGE_INDEX)
        .with_body(body.to_string())
        .create_async()
        .await;

    let subject = new_descriptor(
        "application/vnd.oci.image.manifest.v1+json",
        &digest,
        MANIFEST.len() as u64,
    );
    let referrers = store(&server).referrers(&subject).await.unwrap();

    assert_eq!(referrers.len(), 1);
    assert_eq!(
        referrers[0].artifact_type().as_ref().map(|a| a.to_string()),
        Some("application/vnd.example.sbom+json".to_string())
    );
}

#[tokio::test]
async fn test_fetch_manifest_by_digest() {
    let digest = Digest::sha256_of(MANIFEST.as_bytes()).unwrap();
    let mut server = mockito::Server::new_async().await;
    let path = format!("/v2/repo/manifests/{}", digest);
    server
        .mock("GET", path.as_str())
        .with_status(200)
        .with_body(MANIFEST)
        .create_async()
        .await;

    let descriptor = new_descriptor(
        "application/vnd.oci.image.manifest.v1+json",
        &digest,
        MANIFEST.len() as u64,
    );
    let content = store(&server).fetch_manifest(&descriptor).await.unwrap();

    assert_eq!(content, MANIFEST.as_bytes());
}
