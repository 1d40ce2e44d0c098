// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structural vectors and pattern fingerprints for cross-domain matching.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Domain partitions the matcher compares across.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Trading,
    Radio,
    Fleet,
    Meta,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Trading => "trading",
            Domain::Radio => "radio",
            Domain::Fleet => "fleet",
            Domain::Meta => "meta",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "trading" => Some(Domain::Trading),
            "radio" => Some(Domain::Radio),
            "fleet" => Some(Domain::Fleet),
            "meta" => Some(Domain::Meta),
            _ => None,
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What kind of record a fingerprint was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternSource {
    Signal,
    Memory,
    Atom,
    Event,
}

impl PatternSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternSource::Signal => "signal",
            PatternSource::Memory => "memory",
            PatternSource::Atom => "atom",
            PatternSource::Event => "event",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "signal" => Some(PatternSource::Signal),
            "memory" => Some(PatternSource::Memory),
            "atom" => Some(PatternSource::Atom),
            "event" => Some(PatternSource::Event),
            _ => None,
        }
    }
}

/// Number of structural dimensions.
pub const STRUCTURAL_DIMS: usize = 12;

/// Names of the structural dimensions, in vector order.
pub const DIMENSION_NAMES: [&str; STRUCTURAL_DIMS] = [
    "trend_direction",
    "trend_strength",
    "oscillation_frequency",
    "reversion_force",
    "divergence_magnitude",
    "divergence_polarity",
    "threshold_proximity",
    "cascade_potential",
    "signal_decay_rate",
    "lead_time_normalized",
    "effect_size",
    "frequency_of_occurrence",
];

/// Fixed 12-dimensional structural representation of a pattern.
///
/// `trend_direction` and `divergence_polarity` are signed (`[-1, 1]`);
/// every other dimension is a magnitude in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StructuralVector {
    pub trend_direction: f64,
    pub trend_strength: f64,
    pub oscillation_frequency: f64,
    pub reversion_force: f64,
    pub divergence_magnitude: f64,
    pub divergence_polarity: f64,
    pub threshold_proximity: f64,
    pub cascade_potential: f64,
    pub signal_decay_rate: f64,
    pub lead_time_normalized: f64,
    pub effect_size: f64,
    pub frequency_of_occurrence: f64,
}

impl Default for StructuralVector {
    fn default() -> Self {
        Self::ZERO
    }
}

impl StructuralVector {
    pub const ZERO: StructuralVector = StructuralVector {
        trend_direction: 0.0,
        trend_strength: 0.0,
        oscillation_frequency: 0.0,
        reversion_force: 0.0,
        divergence_magnitude: 0.0,
        divergence_polarity: 0.0,
        threshold_proximity: 0.0,
        cascade_potential: 0.0,
        signal_decay_rate: 0.0,
        lead_time_normalized: 0.0,
        effect_size: 0.0,
        frequency_of_occurrence: 0.0,
    };

    /// Clamp every dimension into its documented bounds.
    pub fn clamped(mut self) -> Self {
        self.trend_direction = self.trend_direction.clamp(-1.0, 1.0);
        self.divergence_polarity = self.divergence_polarity.clamp(-1.0, 1.0);
        for (i, value) in self.as_array().into_iter().enumerate() {
            if i != 0 && i != 5 {
                self.set_dim(i, value.clamp(0.0, 1.0));
            }
        }
        self
    }

    /// The vector as a fixed array, in [`DIMENSION_NAMES`] order.
    pub fn as_array(&self) -> [f64; STRUCTURAL_DIMS] {
        [
            self.trend_direction,
            self.trend_strength,
            self.oscillation_frequency,
            self.reversion_force,
            self.divergence_magnitude,
            self.divergence_polarity,
            self.threshold_proximity,
            self.cascade_potential,
            self.signal_decay_rate,
            self.lead_time_normalized,
            self.effect_size,
            self.frequency_of_occurrence,
        ]
    }

    fn set_dim(&mut self, index: usize, value: f64) {
        match index {
            0 => self.trend_direction = value,
            1 => self.trend_strength = value,
            2 => self.oscillation_frequency = value,
            3 => self.reversion_force = value,
            4 => self.divergence_magnitude = value,
            5 => self.divergence_polarity = value,
            6 => self.threshold_proximity = value,
            7 => self.cascade_potential = value,
            8 => self.signal_decay_rate = value,
            9 => self.lead_time_normalized = value,
            10 => self.effect_size = value,
            11 => self.frequency_of_occurrence = value,
            _ => {}
        }
    }

    /// Cosine similarity with another vector. Zero vectors compare as 0.
    pub fn cosine(&self, other: &StructuralVector) -> f64 {
        let a = self.as_array();
        let b = other.as_array();
        let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let na: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
        let nb: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();
        if na == 0.0 || nb == 0.0 {
            0.0
        } else {
            dot / (na * nb)
        }
    }

    /// Name of the dimension with the largest magnitude.
    pub fn dominant_dimension(&self) -> &'static str {
        let array = self.as_array();
        let mut best = 0;
        for (i, value) in array.iter().enumerate() {
            if value.abs() > array[best].abs() {
                best = i;
            }
        }
        DIMENSION_NAMES[best]
    }
}

/// A structural vector plus domain and provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternFingerprint {
    pub fingerprint_id: String,
    pub source_domain: Domain,
    pub source_id: String,
    pub source_type: PatternSource,
    pub label: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    pub structure: StructuralVector,
    pub created_at: u64,
    pub run_id: String,
}

#[cfg(test)]
#[path = "pattern_tests.rs"]
mod tests;
