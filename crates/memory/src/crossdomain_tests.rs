// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use medulla_core::FakeClock;
use medulla_storage::run_migrations;

#[test]
fn vectors_are_deterministic_and_bounded() {
    let text = "whale wallets accumulate BNKR before every pump, cascade risk rising sharply";
    let first = vector_from_text(text);
    let second = vector_from_text(text);
    assert_eq!(first, second);

    for (i, value) in first.as_array().into_iter().enumerate() {
        if i == 0 || i == 5 {
            assert!((-1.0..=1.0).contains(&value), "dim {i} out of range");
        } else {
            assert!((0.0..=1.0).contains(&value), "dim {i} out of range");
        }
    }
}

#[test]
fn keyword_heuristics_light_the_right_dimensions() {
    let vector = vector_from_text("a cascade of failures, each one tips the next like dominos");
    assert!(vector.cascade_potential > 0.0);
    assert_eq!(vector.dominant_dimension(), "cascade_potential");

    let vector = vector_from_text("usage near the watermark threshold ceiling");
    assert!(vector.threshold_proximity > 0.9);

    let vector = vector_from_text("price rising, volume rising, accumulation growing");
    assert!(vector.trend_direction > 0.0);

    let vector = vector_from_text("signal strength falling and falling, drop after drop");
    assert!(vector.trend_direction < 0.0);
}

#[test]
fn plain_text_is_a_zero_vector() {
    let vector = vector_from_text("nothing interesting here");
    assert_eq!(vector, medulla_core::StructuralVector::ZERO);
}

fn fingerprint(id: &str, domain: Domain, label: &str) -> PatternFingerprint {
    PatternFingerprint {
        fingerprint_id: id.into(),
        source_domain: domain,
        source_id: id.into(),
        source_type: PatternSource::Signal,
        label: label.into(),
        confidence: 0.8,
        structure: vector_from_text(label),
        created_at: 0,
        run_id: "run-1".into(),
    }
}

#[test]
fn matcher_pairs_across_domains_only() {
    let matcher = CrossDomainMatcher::new(vec![], 0.5, 5);
    let fingerprints = vec![
        fingerprint("t1", Domain::Trading, "cascade of liquidations, chain reaction spiral"),
        fingerprint("t2", Domain::Trading, "cascade of margin calls, domino chain"),
        fingerprint("r1", Domain::Radio, "repeater failures cascade down the chain"),
    ];
    let matches = matcher.match_fingerprints(&fingerprints);

    // trading-trading is never matched; both trading rows match the radio one
    assert_eq!(matches.len(), 2);
    for m in &matches {
        assert_ne!(m.a.source_domain, m.b.source_domain);
    }
}

#[test]
fn metaphor_uses_the_dominant_dimension_template() {
    let matcher = CrossDomainMatcher::new(vec![], 0.5, 5);
    let fingerprints = vec![
        fingerprint("t1", Domain::Trading, "cascade chain spiral of liquidations"),
        fingerprint("f1", Domain::Fleet, "node failures cascade like an avalanche"),
    ];
    let matches = matcher.match_fingerprints(&fingerprints);
    assert_eq!(matches.len(), 1);
    assert!(matches[0].metaphor.contains("propagates like"));
    assert!(matches[0].metaphor.contains("trading"));
    assert!(matches[0].metaphor.contains("fleet"));
}

#[test]
fn top_n_per_domain_pair_is_enforced() {
    let matcher = CrossDomainMatcher::new(vec![], 0.1, 1);
    let fingerprints = vec![
        fingerprint("t1", Domain::Trading, "cascade chain spiral"),
        fingerprint("t2", Domain::Trading, "cascade domino avalanche"),
        fingerprint("r1", Domain::Radio, "cascade chain contagion"),
    ];
    let matches = matcher.match_fingerprints(&fingerprints);
    assert_eq!(matches.len(), 1);
}

#[test]
fn generic_extractor_reads_atoms() {
    let store = medulla_storage::Store::open_in_memory().unwrap();
    run_migrations(&store).unwrap();
    let repo = MemoryRepo::new(store);
    repo.insert_atom(&medulla_core::Atom {
        id: "at-1".into(),
        subject: "trading".into(),
        action: "whale accumulation precedes every pump".into(),
        outcome: "".into(),
        consequences: "".into(),
        confidence: 0.7,
        source: "compression".into(),
        created_at: 1_000,
        categories: vec![],
    })
    .unwrap();

    let extractor = GenericExtractor::new(repo, FakeClock::new());
    let fingerprints = extractor.extract("run-9").unwrap();
    assert_eq!(fingerprints.len(), 1);
    assert_eq!(fingerprints[0].source_domain, Domain::Meta);
    assert_eq!(fingerprints[0].source_type, PatternSource::Atom);
    assert!(fingerprints[0].structure.lead_time_normalized > 0.0);
    assert_eq!(fingerprints[0].run_id, "run-9");
}

#[test]
fn external_extractor_validates_its_inputs() {
    let own = Path::new("/var/lib/medulla/medulla.db");

    // own store is refused
    assert!(ExternalDbExtractor::new(
        Domain::Trading,
        "/var/lib/medulla/medulla.db",
        own,
        "signals",
        "body",
        50
    )
    .is_err());

    // metacharacters in the path are refused
    assert!(ExternalDbExtractor::new(
        Domain::Trading,
        "/tmp/x.db; DROP TABLE signals",
        own,
        "signals",
        "body",
        50
    )
    .is_err());

    // unsafe identifiers are refused
    assert!(ExternalDbExtractor::new(
        Domain::Trading,
        "/var/lib/augur/trades.db",
        own,
        "signals; --",
        "body",
        50
    )
    .is_err());

    // clean inputs construct
    assert!(ExternalDbExtractor::new(
        Domain::Trading,
        "/var/lib/augur/trades.db",
        own,
        "signals",
        "body",
        50
    )
    .is_ok());
}

#[test]
fn external_extractor_reads_a_real_file() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("trades.db");
    {
        let store = medulla_storage::Store::open(&db_path).unwrap();
        store
            .run_batch(
                "CREATE TABLE signals (body TEXT);
                 INSERT INTO signals VALUES ('volume surge rising sharply before pump');",
            )
            .unwrap();
    }

    let extractor = ExternalDbExtractor::new(
        Domain::Trading,
        db_path.to_str().unwrap(),
        Path::new("/var/lib/medulla/medulla.db"),
        "signals",
        "body",
        // limits get clamped into range
        999_999,
    )
    .unwrap();

    let fingerprints = extractor.extract("run-1").unwrap();
    assert_eq!(fingerprints.len(), 1);
    assert_eq!(fingerprints[0].source_type, PatternSource::Signal);
    assert!(fingerprints[0].structure.trend_direction > 0.0);
}
