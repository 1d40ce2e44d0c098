//! Scenario: compression writes one enriched row, archives the three
//! sources, and honors the category/importance rules.

use crate::prelude::*;
use medulla_adapters::{CortexRouter, FakeCortexAdapter};
use medulla_core::{cluster_fingerprint, Cluster, CompressionConfig, CortexConfig};
use medulla_memory::{ArchiveWriter, Distiller};
use medulla_storage::MemoryRepo;
use std::sync::Arc;

fn seed(repo: &MemoryRepo) {
    repo.insert(&memory(
        "m1",
        "whale wallets accumulate BNKR before the pump window opens again and again",
        &["trading", "signals"],
        1.0,
    ))
    .unwrap();
    repo.insert(&memory(
        "m2",
        "whale wallets keep accumulating BNKR ahead of every single pump we tracked",
        &["trading", "augur"],
        1.8,
    ))
    .unwrap();
    repo.insert(&memory(
        "m3",
        "BNKR pumps follow whale wallet accumulation with a short consistent lead",
        &["signals", "augur"],
        1.2,
    ))
    .unwrap();
}

fn cluster() -> Cluster {
    let ids = vec!["m1".to_string(), "m2".to_string(), "m3".to_string()];
    Cluster {
        cluster_id: "cl-1".into(),
        fingerprint: cluster_fingerprint(&ids),
        member_ids: ids,
        avg_similarity: 0.7,
        dominant_category: "trading".into(),
        total_tokens: 39,
        oldest_member_at: 1_000,
    }
}

#[tokio::test]
async fn compression_write_honors_category_and_importance_rules() {
    let store = store();
    let clock = clock();
    let repo = MemoryRepo::new(store);
    seed(&repo);

    let adapter = FakeCortexAdapter::new();
    adapter.push_text(
        r#"{"abstraction": "Whale wallets accumulate BNKR before pumps", "compression_ratio": 4.2, "is_causal": true}"#,
    );
    let distiller = Distiller::new(
        CortexRouter::new(Arc::new(adapter), CortexConfig::default(), clock.clone()),
        CompressionConfig::default(),
    );

    let members: Vec<_> = ["m1", "m2", "m3"]
        .iter()
        .map(|id| repo.get(id).unwrap().unwrap())
        .collect();
    let distillation = distiller
        .distill(&cluster(), &members)
        .await
        .unwrap()
        .unwrap();
    assert!(distillation.is_causal);
    assert!(distillation.compression_ratio >= 1.5);

    let writer = ArchiveWriter::new(repo.clone(), idgen("c"), clock);
    let write = writer
        .commit(&cluster(), &members, &distillation, "run-1")
        .unwrap();

    let compressed = repo.get(&write.compressed.id).unwrap().unwrap();
    // exactly "compressed" plus "trading" plus at most one of the others
    assert!(compressed.categories.contains(&"compressed".to_string()));
    assert!(compressed.categories.contains(&"trading".to_string()));
    assert!(
        compressed
            .categories
            .iter()
            .filter(|c| *c == "signals" || *c == "augur")
            .count()
            <= 1
    );
    assert_eq!(compressed.importance, 1.8);
    assert_eq!(
        compressed.compressed_from,
        Some(vec!["m1".to_string(), "m2".to_string(), "m3".to_string()])
    );

    // all three sources downgraded to the archive marker
    for id in ["m1", "m2", "m3"] {
        assert_eq!(repo.get(id).unwrap().unwrap().importance, 0.5);
    }
}
