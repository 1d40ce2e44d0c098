// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-domain pattern matcher.
//!
//! Extractors convert domain records into 12-dimension structural
//! vectors via keyword heuristics; matching is pairwise cosine across
//! distinct domain partitions; metaphors come from a fixed template
//! table. Everything here is deterministic given the input text.

use crate::error::CompressError;
use medulla_core::sanitize::clamp_limit;
use medulla_core::{
    is_safe_token, validate_db_path, Clock, Domain, PatternFingerprint, PatternSource,
    StructuralVector,
};
use medulla_storage::{MemoryRepo, Store};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Hard cap on rows pulled from any external database.
const MAX_EXTRACT_ROWS: i64 = 500;

/// Converts one domain's records into pattern fingerprints.
pub trait Extractor: Send + Sync {
    fn domain(&self) -> Domain;
    fn version(&self) -> &str;
    fn extract(&self, run_id: &str) -> Result<Vec<PatternFingerprint>, CompressError>;
}

fn count_hits(text: &str, needles: &[&str]) -> usize {
    needles.iter().filter(|n| text.contains(*n)).count()
}

fn saturate(hits: usize) -> f64 {
    (hits as f64 * 0.34).min(1.0)
}

/// Keyword-heuristic structural vector. Pure and stable under re-runs.
pub fn vector_from_text(text: &str) -> StructuralVector {
    let text = text.to_lowercase();

    let up = count_hits(&text, &["rising", "increase", "accumulate", "growing", "pump", "up"]);
    let down = count_hits(&text, &["falling", "decrease", "dump", "shrinking", "drop", "down"]);
    let trend_hits = up + down;
    let trend_direction = if trend_hits == 0 {
        0.0
    } else {
        (up as f64 - down as f64) / trend_hits as f64
    };

    let pos = count_hits(&text, &["above", "positive", "ahead", "over"]);
    let neg = count_hits(&text, &["below", "negative", "behind", "under"]);
    let polarity_hits = pos + neg;
    let divergence_polarity = if polarity_hits == 0 {
        0.0
    } else {
        (pos as f64 - neg as f64) / polarity_hits as f64
    };

    StructuralVector {
        trend_direction,
        trend_strength: saturate(trend_hits),
        oscillation_frequency: saturate(count_hits(
            &text,
            &["oscillat", "cycle", "swing", "alternat", "period"],
        )),
        reversion_force: saturate(count_hits(
            &text,
            &["revert", "mean", "pullback", "correction", "rebound"],
        )),
        divergence_magnitude: saturate(count_hits(
            &text,
            &["diverge", "gap", "spread", "mismatch", "desync"],
        )),
        divergence_polarity,
        threshold_proximity: saturate(count_hits(
            &text,
            &["threshold", "limit", "watermark", "ceiling", "brink"],
        )),
        cascade_potential: saturate(count_hits(
            &text,
            &["cascade", "chain", "contagion", "spiral", "avalanche", "domino"],
        )),
        signal_decay_rate: saturate(count_hits(
            &text,
            &["decay", "fade", "cool", "dampen", "wane"],
        )),
        lead_time_normalized: saturate(count_hits(
            &text,
            &["before", "precede", "lead", "early", "ahead of"],
        )),
        effect_size: saturate(count_hits(
            &text,
            &["massive", "sharp", "spike", "surge", "plunge", "extreme"],
        )),
        frequency_of_occurrence: saturate(count_hits(
            &text,
            &["always", "often", "every", "recurr", "repeated", "again"],
        )),
    }
    .clamped()
}

/// Extractor over the system's own memories and atoms (the `meta`
/// partition).
pub struct GenericExtractor<C: Clock> {
    repo: MemoryRepo,
    clock: C,
}

impl<C: Clock> GenericExtractor<C> {
    pub fn new(repo: MemoryRepo, clock: C) -> Self {
        Self { repo, clock }
    }
}

impl<C: Clock> Extractor for GenericExtractor<C> {
    fn domain(&self) -> Domain {
        Domain::Meta
    }

    fn version(&self) -> &str {
        "1"
    }

    fn extract(&self, run_id: &str) -> Result<Vec<PatternFingerprint>, CompressError> {
        let now = self.clock.epoch_ms();
        let mut fingerprints = Vec::new();
        for atom in self.repo.atoms()? {
            fingerprints.push(PatternFingerprint {
                fingerprint_id: format!("fp-meta-{}", atom.id),
                source_domain: Domain::Meta,
                source_id: atom.id.clone(),
                source_type: PatternSource::Atom,
                label: atom.action.clone(),
                confidence: atom.confidence,
                structure: vector_from_text(&atom.action),
                created_at: now,
                run_id: run_id.to_string(),
            });
        }
        Ok(fingerprints)
    }
}

/// Extractor over one external domain database (trading signals, radio
/// events, fleet events), configured with a table and text column.
pub struct ExternalDbExtractor {
    domain: Domain,
    db_path: PathBuf,
    table: String,
    text_column: String,
    limit: i64,
}

impl ExternalDbExtractor {
    /// Validates the path and identifiers up front: no shell
    /// metacharacters, never the system's own store, clamped row limit.
    pub fn new(
        domain: Domain,
        db_path: &str,
        own_store: &Path,
        table: &str,
        text_column: &str,
        limit: i64,
    ) -> Result<Self, CompressError> {
        let db_path = validate_db_path(db_path, own_store)?;
        if !is_safe_token(table) || !is_safe_token(text_column) {
            return Err(CompressError::Path(
                medulla_core::SanitizeError::UnsafeToken(format!("{table}.{text_column}")),
            ));
        }
        Ok(Self {
            domain,
            db_path,
            table: table.to_string(),
            text_column: text_column.to_string(),
            limit: clamp_limit(limit, MAX_EXTRACT_ROWS),
        })
    }
}

impl Extractor for ExternalDbExtractor {
    fn domain(&self) -> Domain {
        self.domain
    }

    fn version(&self) -> &str {
        "1"
    }

    fn extract(&self, run_id: &str) -> Result<Vec<PatternFingerprint>, CompressError> {
        let store = Store::open(&self.db_path)?;
        // identifiers were validated at construction; only the limit is a
        // bound parameter
        let sql = format!(
            "SELECT rowid, {} FROM {} ORDER BY rowid DESC LIMIT ?1",
            self.text_column, self.table
        );
        let rows: Vec<(i64, String)> =
            store.all(&sql, &[&self.limit], |row| Ok((row.get(0)?, row.get(1)?)))?;

        Ok(rows
            .into_iter()
            .map(|(rowid, text)| PatternFingerprint {
                fingerprint_id: format!("fp-{}-{rowid}", self.domain),
                source_domain: self.domain,
                source_id: rowid.to_string(),
                source_type: match self.domain {
                    Domain::Trading => PatternSource::Signal,
                    _ => PatternSource::Event,
                },
                label: text.chars().take(120).collect(),
                confidence: 0.5,
                structure: vector_from_text(&text),
                created_at: 0,
                run_id: run_id.to_string(),
            })
            .collect())
    }
}

/// One cross-domain hit.
#[derive(Debug, Clone)]
pub struct PatternMatch {
    pub a: PatternFingerprint,
    pub b: PatternFingerprint,
    pub similarity: f64,
    pub metaphor: String,
}

/// Metaphor templates keyed on the dominant structural dimension.
fn metaphor_for(a: &PatternFingerprint, b: &PatternFingerprint, dominant: &str) -> String {
    match dominant {
        "cascade_potential" => format!(
            "\"{}\" ({}) propagates like \"{}\" ({}): one failure tips the next",
            a.label, a.source_domain, b.label, b.source_domain
        ),
        "threshold_proximity" => format!(
            "\"{}\" ({}) sits near the same cliff edge as \"{}\" ({})",
            a.label, a.source_domain, b.label, b.source_domain
        ),
        "signal_decay_rate" => format!(
            "\"{}\" ({}) fades on the same curve as \"{}\" ({})",
            a.label, a.source_domain, b.label, b.source_domain
        ),
        "divergence_magnitude" | "divergence_polarity" => format!(
            "\"{}\" ({}) drifts from its baseline the way \"{}\" ({}) does",
            a.label, a.source_domain, b.label, b.source_domain
        ),
        "oscillation_frequency" => format!(
            "\"{}\" ({}) swings on the same rhythm as \"{}\" ({})",
            a.label, a.source_domain, b.label, b.source_domain
        ),
        "lead_time_normalized" => format!(
            "\"{}\" ({}) gives the same early warning as \"{}\" ({})",
            a.label, a.source_domain, b.label, b.source_domain
        ),
        _ => format!(
            "\"{}\" ({}) moves like \"{}\" ({})",
            a.label, a.source_domain, b.label, b.source_domain
        ),
    }
}

/// Pairwise matcher across domain partitions.
pub struct CrossDomainMatcher {
    extractors: Vec<Arc<dyn Extractor>>,
    similarity_threshold: f64,
    top_n_per_pair: usize,
}

impl CrossDomainMatcher {
    pub fn new(
        extractors: Vec<Arc<dyn Extractor>>,
        similarity_threshold: f64,
        top_n_per_pair: usize,
    ) -> Self {
        Self {
            extractors,
            similarity_threshold,
            top_n_per_pair,
        }
    }

    /// Run every extractor, then match across distinct domains.
    pub fn run(&self, run_id: &str) -> Result<Vec<PatternMatch>, CompressError> {
        let mut all = Vec::new();
        for extractor in &self.extractors {
            match extractor.extract(run_id) {
                Ok(mut fingerprints) => all.append(&mut fingerprints),
                Err(e) => {
                    tracing::warn!(domain = %extractor.domain(), error = %e, "extractor failed");
                }
            }
        }
        Ok(self.match_fingerprints(&all))
    }

    /// Pure pairwise matching over an extracted set.
    pub fn match_fingerprints(&self, fingerprints: &[PatternFingerprint]) -> Vec<PatternMatch> {
        let mut matches = Vec::new();
        for (i, a) in fingerprints.iter().enumerate() {
            for b in fingerprints.iter().skip(i + 1) {
                if a.source_domain == b.source_domain {
                    continue;
                }
                let similarity = a.structure.cosine(&b.structure);
                if similarity < self.similarity_threshold {
                    continue;
                }
                let dominant = a.structure.dominant_dimension();
                matches.push(PatternMatch {
                    a: a.clone(),
                    b: b.clone(),
                    similarity,
                    metaphor: metaphor_for(a, b, dominant),
                });
            }
        }

        matches.sort_by(|x, y| {
            y.similarity
                .partial_cmp(&x.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        // keep the best N per domain pair
        let mut kept: Vec<PatternMatch> = Vec::new();
        for candidate in matches {
            let pair = (candidate.a.source_domain, candidate.b.source_domain);
            let count = kept
                .iter()
                .filter(|m| (m.a.source_domain, m.b.source_domain) == pair)
                .count();
            if count < self.top_n_per_pair {
                kept.push(candidate);
            }
        }
        kept
    }
}

#[cfg(test)]
#[path = "crossdomain_tests.rs"]
mod tests;
