// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Short-term memory rows, compression clusters, and causal atoms.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Importance marker a source memory is downgraded to once archived.
pub const ARCHIVED_IMPORTANCE: f64 = 0.5;

/// A short-term memory row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: String,
    pub content: String,
    /// Ordered small set of category tags.
    pub categories: Vec<String>,
    /// Importance in `[0, 3]`.
    pub importance: f64,
    /// Epoch milliseconds when the memory was written.
    pub timestamp: u64,
    /// Source member ids, present only on compressed rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compressed_from: Option<Vec<String>>,
    /// Compression run that archived this row, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_by: Option<String>,
}

/// Transient grouping of memories eligible for compression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    pub cluster_id: String,
    pub member_ids: Vec<String>,
    pub avg_similarity: f64,
    pub dominant_category: String,
    pub total_tokens: usize,
    /// Epoch milliseconds of the oldest member.
    pub oldest_member_at: u64,
    /// Deterministic re-run detection key.
    pub fingerprint: String,
}

/// Deterministic cluster fingerprint: truncated sha256 over the sorted
/// member id list. Invariant under input permutation.
pub fn cluster_fingerprint(member_ids: &[String]) -> String {
    let mut sorted: Vec<&str> = member_ids.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    let mut hasher = Sha256::new();
    for id in sorted {
        hasher.update(id.as_bytes());
        hasher.update(b"\n");
    }
    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    hex[..16].to_string()
}

/// Whitespace token count used for compression ratios.
pub fn token_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Append-only causal record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Atom {
    pub id: String,
    pub subject: String,
    pub action: String,
    pub outcome: String,
    pub consequences: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Component that wrote the atom ("learning", "compression", ...).
    pub source: String,
    pub created_at: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
}

#[cfg(test)]
#[path = "knowledge_tests.rs"]
mod tests;
