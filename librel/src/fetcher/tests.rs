use super::*;
use crate::error::RelError;
use crate::oci::MEDIA_TYPE_IMAGE_INDEX;
use crate::store::MemoryStore;
use serde_json::json;

const SBOM: &str = "application/vnd.example.sbom+json";
const SIGNATURE: &str = "application/vnd.example.signature+json";

fn digests(descriptors: &[Descriptor]) -> Vec<String> {
    descriptors.iter().map(|d| d.digest().to_string()).collect()
}

#[tokio::test]
async fn test_native_strategy_lists_referrers() {
    let mut store = MemoryStore::new("localhost:5000/repo");
    let subject = store.add_image("v1").unwrap();
    let sbom = store.add_referrer(&subject, SBOM, &[]).unwrap();
    let signature = store.add_referrer(&subject, SIGNATURE, &[]).unwrap();

    let fetcher = ReferrerFetcher::new(&store);
    assert_eq!(fetcher.strategy(), None);

    let referrers = fetcher.fetch(&subject).await.unwrap();

    assert_eq!(
        digests(&referrers),
        vec![sbom.digest().to_string(), signature.digest().to_string()]
    );
    assert_eq!(fetcher.strategy(), Some(ReferrersStrategy::Native));
}

#[tokio::test]
async fn test_fallback_matches_native_result() {
    let mut native = MemoryStore::new("localhost:5000/repo");
    let subject = native.add_image("v1").unwrap();
    native.add_referrer(&subject, SBOM, &[("k", "v")]).unwrap();
    native.add_referrer(&subject, SIGNATURE, &[]).unwrap();

    let mut legacy = MemoryStore::new("localhost:5000/repo").without_referrers_api();
    let legacy_subject = legacy.add_image("v1").unwrap();
    legacy.add_referrer(&legacy_subject, SBOM, &[("k", "v")]).unwrap();
    legacy.add_referrer(&legacy_subject, SIGNATURE, &[]).unwrap();
    legacy.publish_referrers_tag(&legacy_subject).unwrap();

    let from_native = ReferrerFetcher::new(&native).fetch(&subject).await.unwrap();
    let fetcher = ReferrerFetcher::new(&legacy);
    let from_tag = fetcher.fetch(&legacy_subject).await.unwrap();

    assert_eq!(from_native, from_tag);
    assert_eq!(fetcher.strategy(), Some(ReferrersStrategy::TagSchema));
}

#[tokio::test]
async fn test_fallback_without_tag_is_empty() {
    let mut store = MemoryStore::new("localhost:5000/repo").without_referrers_api();
    let subject = store.add_image("v1").unwrap();

    let referrers = ReferrerFetcher::new(&store).fetch(&subject).await.unwrap();

    assert!(referrers.is_empty());
}

#[tokio::test]
async fn test_capability_check_happens_once() {
    let mut store = MemoryStore::new("localhost:5000/repo").without_referrers_api();
    let subject = store.add_image("v1").unwrap();
    let other = store.add_image("v2").unwrap();

    let fetcher = ReferrerFetcher::new(&store);
    fetcher.fetch(&subject).await.unwrap();
    fetcher.fetch(&other).await.unwrap();

    assert_eq!(store.referrers_calls(), 1);
}

#[tokio::test]
async fn test_pinned_strategy_skips_capability_check() {
    let mut store = MemoryStore::new("localhost:5000/repo");
    let subject = store.add_image("v1").unwrap();

    let fetcher = ReferrerFetcher::with_strategy(&store, ReferrersStrategy::TagSchema);
    let referrers = fetcher.fetch(&subject).await.unwrap();

    assert!(referrers.is_empty());
    assert_eq!(store.referrers_calls(), 0);
}

#[tokio::test]
async fn test_pinned_native_strategy_does_not_fall_back() {
    let mut store = MemoryStore::new("localhost:5000/repo").without_referrers_api();
    let subject = store.add_image("v1").unwrap();
    store.add_referrer(&subject, SBOM, &[]).unwrap();
    store.publish_referrers_tag(&subject).unwrap();

    let fetcher = ReferrerFetcher::with_strategy(&store, ReferrersStrategy::Native);
    let err = fetcher.fetch(&subject).await.unwrap_err();

    assert!(err.is_unsupported());
    assert_eq!(fetcher.strategy(), Some(ReferrersStrategy::Native));
}

#[test]
fn test_strategy_from_distribution_spec_name() {
    assert_eq!(
        "v1.1-referrers-api".parse::<ReferrersStrategy>().unwrap(),
        ReferrersStrategy::Native
    );
    assert_eq!(
        "V1.1-Referrers-Tag".parse::<ReferrersStrategy>().unwrap(),
        ReferrersStrategy::TagSchema
    );
    assert!(matches!(
        "v1.0".parse::<ReferrersStrategy>(),
        Err(RelError::Validation { .. })
    ));
    assert_eq!(ReferrersStrategy::TagSchema.to_string(), "v1.1-referrers-tag");
}

#[tokio::test]
async fn test_transport_error_is_not_recovered() {
    let mut store = MemoryStore::new("localhost:5000/repo");
    let subject = store.add_image("v1").unwrap();
    store.fail_referrers_of(&subject);

    let fetcher = ReferrerFetcher::new(&store);
    let err = fetcher.fetch(&subject).await.unwrap_err();

    assert!(matches!(err, RelError::Network { .. }));
    assert_eq!(fetcher.strategy(), None);
}

#[tokio::test]
async fn test_malformed_tag_index_entries_are_skipped() {
    let mut store = MemoryStore::new("localhost:5000/repo").without_referrers_api();
    let subject = store.add_image("v1").unwrap();
    let sbom = store.add_referrer(&subject, SBOM, &[]).unwrap();

    let index = json!({
        "schemaVersion": 2,
        "mediaType": MEDIA_TYPE_IMAGE_INDEX,
        "manifests": [
            {"mediaType": "application/vnd.oci.image.manifest.v1+json", "digest": "not-a-digest", "size": 1},
            sbom,
            sbom
        ]
    });
    let tag = digest_of(&subject).referrers_tag();
    store
        .add_manifest(index.to_string().into_bytes(), Some(&tag), None)
        .unwrap();

    let referrers = ReferrerFetcher::new(&store).fetch(&subject).await.unwrap();

    assert_eq!(digests(&referrers), vec![sbom.digest().to_string()]);
}

#[test]
fn test_dedup_keeps_first_occurrence() {
    let mut store = MemoryStore::new("localhost:5000/repo");
    let a = store.add_image("a").unwrap();
    let b = store.add_image("b").unwrap();

    let deduped = dedup_by_digest(vec![a.clone(), b.clone(), a.clone()]);

    assert_eq!(
        digests(&deduped),
        vec![a.digest().to_string(), b.digest().to_string()]
    );
}
