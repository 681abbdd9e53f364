//! End-to-end discovery against a mock registry and an on-disk OCI layout.

use librel::{
    Config, DiscoverOptions, Discoverer, Digest, FilterCriteria, OutputFormat, ReferrersStrategy,
};
use mockito::{Mock, Server, ServerGuard};
use serde_json::{Value, json};
use std::path::Path;

const INDEX: &str = "application/vnd.oci.image.index.v1+json";
const MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";
const SBOM: &str = "application/vnd.example.sbom+json";
const SIGNATURE: &str = "application/vnd.example.signature+json";
const EMPTY_DIGEST: &str = "sha256:44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a";

struct Blob {
    bytes: Vec<u8>,
    digest: String,
}

impl Blob {
    fn new(content: &Value) -> Self {
        let bytes = content.to_string().into_bytes();
        let digest = Digest::sha256_of(&bytes).unwrap().to_string();
        Self { bytes, digest }
    }

    fn descriptor(&self) -> Value {
        json!({ "mediaType": MANIFEST, "digest": self.digest, "size": self.bytes.len() })
    }
}

fn image() -> Blob {
    Blob::new(&json!({
        "schemaVersion": 2,
        "mediaType": MANIFEST,
        "config": {
            "mediaType": "application/vnd.oci.image.config.v1+json",
            "digest": EMPTY_DIGEST,
            "size": 2
        },
        "layers": []
    }))
}

fn artifact(subject: &Blob, artifact_type: &str) -> Blob {
    Blob::new(&json!({
        "schemaVersion": 2,
        "mediaType": MANIFEST,
        "artifactType": artifact_type,
        "config": { "mediaType": "application/vnd.oci.empty.v1+json", "digest": EMPTY_DIGEST, "size": 2 },
        "layers": [],
        "subject": subject.descriptor()
    }))
}

fn listing(blob: &Blob, artifact_type: &str) -> Value {
    let mut descriptor = blob.descriptor();
    descriptor["artifactType"] = json!(artifact_type);
    descriptor
}

fn index(manifests: Vec<Value>) -> Blob {
    Blob::new(&json!({ "schemaVersion": 2, "mediaType": INDEX, "manifests": manifests }))
}

async fn mock_manifest(
    server: &mut ServerGuard,
    reference: &str,
    blob: &Blob,
    media_type: &str,
) -> Mock {
    server
        .mock("GET", format!("/v2/repo/manifests/{}", reference).as_str())
        .with_status(200)
        .with_header("content-type", media_type)
        .with_header("docker-content-digest", &blob.digest)
        .with_body(blob.bytes.clone())
        .create_async()
        .await
}

async fn mock_referrers(server: &mut ServerGuard, subject: &str, referrers: &Blob) -> Mock {
    server
        .mock("GET", format!("/v2/repo/referrers/{}", subject).as_str())
        .with_status(200)
        .with_header("content-type", INDEX)
        .with_body(referrers.bytes.clone())
        .create_async()
        .await
}

/// A registry serving `repo:v1` with an SBOM and a signature referring to it.
struct Registry {
    server: ServerGuard,
    mocks: Vec<Mock>,
    subject: Blob,
    sbom: Blob,
    signature: Blob,
}

async fn registry(native: bool) -> Registry {
    let mut server = Server::new_async().await;
    let subject = image();
    let sbom = artifact(&subject, SBOM);
    let signature = artifact(&subject, SIGNATURE);
    let referrers = index(vec![listing(&sbom, SBOM), listing(&signature, SIGNATURE)]);

    let mut mocks = vec![mock_manifest(&mut server, "v1", &subject, MANIFEST).await];
    if native {
        mocks.push(mock_referrers(&mut server, &subject.digest, &referrers).await);
    } else {
        mocks.push(
            server
                .mock("GET", format!("/v2/repo/referrers/{}", subject.digest).as_str())
                .with_status(404)
                .create_async()
                .await,
        );
        let tag = subject.digest.replace(':', "-");
        mocks.push(mock_manifest(&mut server, &tag, &referrers, INDEX).await);
        mocks.push(mock_manifest(&mut server, &referrers.digest, &referrers, INDEX).await);
    }

    Registry {
        server,
        mocks,
        subject,
        sbom,
        signature,
    }
}

async fn discover_json(server: &ServerGuard, filter: FilterCriteria) -> (Value, ReferrersStrategy) {
    let subject = format!("{}/repo:v1", server.host_with_port());
    let reference = Discoverer::parse_reference(&subject, false).unwrap();
    let options = DiscoverOptions::new(OutputFormat::Json).with_filter(filter);

    let report = Discoverer::new(Config::default())
        .discover(&reference, &options)
        .await
        .unwrap();
    let rendered = serde_json::from_str(&report.render().unwrap()).unwrap();
    (rendered, report.strategy().unwrap())
}

fn digests(rendered: &Value) -> Vec<String> {
    let mut digests: Vec<String> = rendered["manifests"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["digest"].as_str().unwrap().to_string())
        .collect();
    digests.sort();
    digests
}

fn sorted(mut digests: Vec<String>) -> Vec<String> {
    digests.sort();
    digests
}

#[tokio::test]
async fn test_json_lists_every_referrer() {
    let registry = registry(true).await;

    let (rendered, strategy) = discover_json(&registry.server, FilterCriteria::new()).await;

    assert_eq!(rendered["mediaType"], INDEX);
    assert_eq!(
        digests(&rendered),
        sorted(vec![registry.sbom.digest, registry.signature.digest])
    );
    assert_eq!(strategy, ReferrersStrategy::Native);
}

#[tokio::test]
async fn test_artifact_type_filter_keeps_matching_referrer() {
    let registry = registry(true).await;

    let filter = FilterCriteria::new().with_artifact_type(SBOM);
    let (rendered, _) = discover_json(&registry.server, filter).await;

    assert_eq!(digests(&rendered), vec![registry.sbom.digest]);
    assert_eq!(rendered["manifests"][0]["artifactType"], SBOM);
}

#[tokio::test]
async fn test_tag_fallback_matches_native_listing() {
    let native = registry(true).await;
    let fallback = registry(false).await;

    let (native_rendered, _) = discover_json(&native.server, FilterCriteria::new()).await;
    let (fallback_rendered, strategy) =
        discover_json(&fallback.server, FilterCriteria::new()).await;

    assert_eq!(strategy, ReferrersStrategy::TagSchema);
    assert_eq!(digests(&fallback_rendered), digests(&native_rendered));
    for mock in &fallback.mocks {
        mock.assert_async().await;
    }
}

#[tokio::test]
async fn test_tree_over_registry() {
    let mut registry = registry(true).await;
    let empty = index(vec![]);
    for digest in [registry.sbom.digest.clone(), registry.signature.digest.clone()] {
        let mock = mock_referrers(&mut registry.server, &digest, &empty).await;
        registry.mocks.push(mock);
    }
    let host = registry.server.host_with_port();
    let reference = Discoverer::parse_reference(&format!("{}/repo:v1", host), false).unwrap();

    let report = Discoverer::new(Config::default())
        .discover(&reference, &DiscoverOptions::new(OutputFormat::Tree))
        .await
        .unwrap();
    let rendered = report.render().unwrap();

    let mut lines = rendered.lines();
    assert_eq!(
        lines.next().unwrap(),
        format!("{}/repo@{}", host, registry.subject.digest)
    );
    assert_eq!(report.graph().referrer_count(), 2);
    assert!(rendered.contains(SBOM));
    assert!(rendered.contains(&registry.sbom.digest));
    assert!(rendered.contains(&registry.signature.digest));
}

/// Writes blobs and an index.json into `root`.
fn write_layout(root: &Path, blobs: &[&Blob], entries: Vec<Value>) {
    std::fs::write(root.join("oci-layout"), r#"{"imageLayoutVersion":"1.0.0"}"#).unwrap();
    let dir = root.join("blobs").join("sha256");
    std::fs::create_dir_all(&dir).unwrap();
    for blob in blobs {
        let encoded = blob.digest.trim_start_matches("sha256:");
        std::fs::write(dir.join(encoded), &blob.bytes).unwrap();
    }
    let index = json!({ "schemaVersion": 2, "manifests": entries });
    std::fs::write(root.join("index.json"), index.to_string()).unwrap();
}

#[tokio::test]
async fn test_platform_filter_over_layout() {
    let dir = tempfile::TempDir::new().unwrap();
    let subject = image();
    let amd64 = artifact(&subject, SBOM);
    let arm64 = Blob::new(&json!({
        "schemaVersion": 2,
        "mediaType": MANIFEST,
        "artifactType": SBOM,
        "config": { "mediaType": "application/vnd.oci.empty.v1+json", "digest": EMPTY_DIGEST, "size": 2 },
        "layers": [],
        "subject": subject.descriptor(),
        "annotations": { "arch": "arm64" }
    }));
    let mut amd64_entry = amd64.descriptor();
    amd64_entry["platform"] = json!({ "os": "linux", "architecture": "amd64" });
    let mut arm64_entry = arm64.descriptor();
    arm64_entry["platform"] = json!({ "os": "linux", "architecture": "arm64" });
    let bundle = index(vec![amd64_entry, arm64_entry]);

    let mut subject_entry = subject.descriptor();
    subject_entry["annotations"] = json!({ "org.opencontainers.image.ref.name": "v1" });
    let mut bundle_entry = bundle.descriptor();
    bundle_entry["mediaType"] = json!(INDEX);
    write_layout(
        dir.path(),
        &[&subject, &amd64, &arm64, &bundle],
        vec![subject_entry, bundle_entry],
    );

    let reference =
        Discoverer::parse_reference(&format!("{}:v1", dir.path().display()), true).unwrap();
    let filter = FilterCriteria::new().with_platform("linux/amd64".parse().unwrap());
    let report = Discoverer::new(Config::default())
        .discover(&reference, &DiscoverOptions::new(OutputFormat::Json).with_filter(filter))
        .await
        .unwrap();

    assert_eq!(report.graph().referrer_count(), 2);
    let rendered: Value = serde_json::from_str(&report.render().unwrap()).unwrap();
    assert_eq!(digests(&rendered), vec![amd64.digest]);
    assert_eq!(rendered["manifests"][0]["platform"]["architecture"], "amd64");
}
