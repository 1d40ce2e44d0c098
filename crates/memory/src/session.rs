// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session preserver: end-of-session snapshots and start-of-session
//! preamble injection with decayed relevance scoring.

use crate::error::CompressError;
use medulla_core::{Clock, SessionConfig, SessionState};
use medulla_storage::SessionRepo;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

const HOURS_PER_WEEK: f64 = 168.0;
const MS_PER_HOUR: f64 = 3_600_000.0;

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "for", "with", "that", "this", "then", "from", "into",
    "onto", "over", "under", "about", "was", "were", "are", "is", "be", "been", "have", "has",
    "had", "will", "would", "should", "could", "can", "not", "you", "your", "our", "its", "it",
    "of", "to", "in", "on", "at", "by", "as", "we", "they", "them",
];

/// Jaccard overlap of two topic lists. Empty-vs-anything scores zero.
fn topic_jaccard(a: &[String], b: &[String]) -> f64 {
    let sa: HashSet<&str> = a.iter().map(String::as_str).collect();
    let sb: HashSet<&str> = b.iter().map(String::as_str).collect();
    if sa.is_empty() || sb.is_empty() {
        return 0.0;
    }
    let intersection = sa.intersection(&sb).count() as f64;
    let union = sa.union(&sb).count() as f64;
    intersection / union
}

/// Relevance of a prior session against reference topics, in `[0, 1]`.
///
/// `0.4·recency + 0.35·topic_jaccard + 0.25·min(1, pending·0.25)` with
/// `recency = max(0, 1 − hours/168)`.
pub fn relevance_score(candidate: &SessionState, reference_topics: &[String], now_ms: u64) -> f64 {
    let end = candidate.end_time.unwrap_or(candidate.start_time);
    let hours = now_ms.saturating_sub(end) as f64 / MS_PER_HOUR;
    let recency = (1.0 - hours / HOURS_PER_WEEK).max(0.0);
    let jaccard = topic_jaccard(&candidate.hot_topics, reference_topics);
    let tasks = (candidate.pending_tasks.len() as f64 * 0.25).min(1.0);
    0.4 * recency + 0.35 * jaccard + 0.25 * tasks
}

/// Read-time confidence decay. Never persisted.
pub fn decay_factor(hours: f64, floor: f64) -> f64 {
    (1.0 - (hours / HOURS_PER_WEEK) * 0.4).max(floor)
}

/// Frequency-ranked topical terms with stop-words removed.
pub fn hot_topics(texts: &[String], cap: usize) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    for text in texts {
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() > 2)
            .map(str::to_lowercase)
        {
            if STOP_WORDS.contains(&word.as_str()) {
                continue;
            }
            if !counts.contains_key(&word) {
                order.push(word.clone());
            }
            *counts.entry(word).or_insert(0) += 1;
        }
    }
    let mut ranked: Vec<(usize, String)> = order
        .into_iter()
        .enumerate()
        .map(|(position, word)| (position, word))
        .collect();
    ranked.sort_by(|a, b| {
        let ca = counts.get(&a.1).copied().unwrap_or(0);
        let cb = counts.get(&b.1).copied().unwrap_or(0);
        cb.cmp(&ca).then(a.0.cmp(&b.0))
    });
    ranked.into_iter().take(cap).map(|(_, w)| w).collect()
}

/// Active projects derived from working-directory patterns.
pub fn active_projects(cwds: &[String]) -> Vec<String> {
    let mut projects = Vec::new();
    for cwd in cwds {
        let candidate = cwd
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or("")
            .to_string();
        if !candidate.is_empty() && !projects.contains(&candidate) {
            projects.push(candidate);
        }
    }
    projects
}

/// The continuity block injected into a session's first turn.
#[derive(Debug, Clone)]
pub struct Preamble {
    pub text: String,
    pub inherited_pins: Vec<String>,
    pub source_sessions: Vec<String>,
}

/// Preserves session context across restarts.
pub struct SessionPreserver<C: Clock> {
    repo: SessionRepo,
    session_dir: PathBuf,
    config: SessionConfig,
    clock: C,
    /// Content hashes of pins already injected this process.
    pin_cache: Mutex<HashSet<String>>,
}

impl<C: Clock> SessionPreserver<C> {
    pub fn new(repo: SessionRepo, session_dir: PathBuf, config: SessionConfig, clock: C) -> Self {
        Self {
            repo,
            session_dir,
            config,
            clock,
            pin_cache: Mutex::new(HashSet::new()),
        }
    }

    /// Stable content hash used for pin dedup.
    pub fn content_hash(content: &str) -> String {
        let digest = Sha256::digest(content.as_bytes());
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Clear the pin cache so the next restore re-injects everything.
    pub fn reset(&self) {
        self.pin_cache.lock().clear();
    }

    /// End-of-session snapshot: derive topics and projects, stamp the end
    /// time, persist to the store and as a JSON document.
    pub fn finalize(
        &self,
        mut session: SessionState,
        transcript: &[String],
        cwds: &[String],
    ) -> Result<SessionState, CompressError> {
        let now = self.clock.epoch_ms();
        session.end_time = Some(now);
        session.hot_topics = hot_topics(transcript, 10);
        session.active_projects = active_projects(cwds);

        self.repo.save(&session)?;

        std::fs::create_dir_all(&self.session_dir)?;
        let path = self
            .session_dir
            .join(format!("{}.json", session.session_id));
        let json = serde_json::to_string_pretty(&session)
            .map_err(|e| CompressError::BadJson(e.to_string()))?;
        std::fs::write(path, json)?;

        tracing::info!(
            session = %session.session_id,
            topics = session.hot_topics.len(),
            pending = session.pending_tasks.len(),
            "session snapshot written"
        );
        Ok(session)
    }

    /// Start-of-session restore: score priors, build the preamble,
    /// inherit pins. Returns `None` when nothing clears the threshold.
    pub fn restore(
        &self,
        new_session_id: &str,
        reference_topics: &[String],
    ) -> Result<Option<Preamble>, CompressError> {
        let now = self.clock.epoch_ms();
        let lookback_ms = u64::from(self.config.lookback_days) * 86_400_000;
        let candidates = self.repo.ended_since(now.saturating_sub(lookback_ms))?;

        let mut scored: Vec<(f64, SessionState)> = candidates
            .into_iter()
            .map(|s| (relevance_score(&s, reference_topics, now), s))
            .filter(|(score, _)| *score >= self.config.relevance_threshold)
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(self.config.max_sessions_scored);

        if scored.is_empty() {
            return Ok(None);
        }

        let mut text = String::from("Continuity from previous sessions:\n");
        let mut inherited_pins = Vec::new();
        let mut source_sessions = Vec::new();

        for (score, mut session) in scored {
            let end = session.end_time.unwrap_or(session.start_time);
            let hours = now.saturating_sub(end) as f64 / MS_PER_HOUR;
            let decay = decay_factor(hours, self.config.decay_min_floor);

            text.push_str(&format!(
                "\n[{}] relevance {:.2}, confidence x{:.2}\n",
                session.session_id, score, decay
            ));
            if !session.hot_topics.is_empty() {
                text.push_str(&format!("  topics: {}\n", session.hot_topics.join(", ")));
            }

            for pin in session
                .pending_tasks
                .iter()
                .chain(session.recent_learnings.iter())
            {
                if inherited_pins.len() >= self.config.max_inherited_pins {
                    break;
                }
                let hash = Self::content_hash(pin);
                if !self.pin_cache.lock().insert(hash) {
                    continue;
                }
                inherited_pins.push(pin.clone());
                text.push_str(&format!("  pin: {pin}\n"));
            }

            session.continued_by = Some(new_session_id.to_string());
            self.repo.save(&session)?;
            source_sessions.push(session.session_id.clone());
        }

        Ok(Some(Preamble {
            text,
            inherited_pins,
            source_sessions,
        }))
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
