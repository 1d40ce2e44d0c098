//! Scenario: a mid-archive failure restores the sources and deletes the
//! compressed row.

use crate::prelude::*;
use medulla_core::{cluster_fingerprint, Cluster};
use medulla_memory::{ArchiveWriter, Distillation};
use medulla_storage::MemoryRepo;

#[test]
fn archive_failure_rolls_back_sources_and_compressed_row() {
    let repo = MemoryRepo::new(store());
    repo.insert(&memory("m1", "alpha beta gamma delta", &["trading"], 1.0))
        .unwrap();
    repo.insert(&memory("m2", "alpha beta gamma epsilon", &["trading"], 1.8))
        .unwrap();
    repo.insert(&memory("m3", "alpha beta gamma zeta", &["trading"], 1.2))
        .unwrap();

    let ids = vec!["m1".to_string(), "m2".to_string(), "m3".to_string()];
    let cluster = Cluster {
        cluster_id: "cl-1".into(),
        fingerprint: cluster_fingerprint(&ids),
        member_ids: ids,
        avg_similarity: 0.7,
        dominant_category: "trading".into(),
        total_tokens: 12,
        oldest_member_at: 1_000,
    };
    let members: Vec<_> = ["m1", "m2", "m3"]
        .iter()
        .map(|id| repo.get(id).unwrap().unwrap())
        .collect();

    // the second member vanishes before the writer reaches it
    repo.delete("m2").unwrap();

    let writer = ArchiveWriter::new(repo.clone(), idgen("c"), clock());
    let result = writer.commit(
        &cluster,
        &members,
        &Distillation {
            abstraction: "greek letters cluster".into(),
            compression_ratio: 4.0,
            is_causal: false,
        },
        "run-1",
    );
    assert!(result.is_err());

    // m1 was downgraded first; its original importance is restored
    let m1 = repo.get("m1").unwrap().unwrap();
    assert_eq!(m1.importance, 1.0);
    assert!(m1.archived_by.is_none());

    // m3 untouched, compressed row gone
    assert_eq!(repo.get("m3").unwrap().unwrap().importance, 1.2);
    assert!(repo.get("mem-c-1").unwrap().is_none());
}
