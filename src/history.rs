//! Loss and metric history bookkeeping for the solver.
//!
//! The solver keeps two append-only scalar sequences per metric, one for the
//! training phase and one for the validation phase. [`PhasePair`] is the typed
//! container for such a pair, and [`HistoryStatistics`] summarizes one
//! sequence for monitors, callbacks, and offline analysis.
//!
//! # Example
//!
//! ```ignore
//! use spherical_pinn_rs::history::{HistoryStatistics, PhasePair, TrainingPhase};
//!
//! let mut loss: PhasePair<Vec<f64>> = PhasePair::default();
//! loss.get_mut(TrainingPhase::Train).push(0.8);
//! loss.get_mut(TrainingPhase::Valid).push(0.9);
//!
//! let stats = HistoryStatistics::from_values(loss.get(TrainingPhase::Train));
//! println!("latest train loss: {:?}", stats.latest);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PinnResult;

/// Phase of an epoch: one optimizer-driven pass or one held-out evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrainingPhase {
    /// Gradient-producing phase; the optimizer steps at its end.
    Train,
    /// Held-out phase; best-snapshot tracking happens at its end.
    Valid,
}

impl fmt::Display for TrainingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Train => write!(f, "train"),
            Self::Valid => write!(f, "valid"),
        }
    }
}

/// A pair of values indexed by [`TrainingPhase`].
///
/// Typed replacement for ad-hoc `{"train": .., "valid": ..}` maps: histories,
/// batch counts, generators, and cached batches all come in train/valid pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhasePair<T> {
    /// Value for the training phase.
    pub train: T,
    /// Value for the validation phase.
    pub valid: T,
}

impl<T> PhasePair<T> {
    /// Create a pair from its two halves.
    pub const fn new(train: T, valid: T) -> Self {
        Self { train, valid }
    }

    /// Borrow the value for `phase`.
    pub const fn get(&self, phase: TrainingPhase) -> &T {
        match phase {
            TrainingPhase::Train => &self.train,
            TrainingPhase::Valid => &self.valid,
        }
    }

    /// Mutably borrow the value for `phase`.
    pub fn get_mut(&mut self, phase: TrainingPhase) -> &mut T {
        match phase {
            TrainingPhase::Train => &mut self.train,
            TrainingPhase::Valid => &mut self.valid,
        }
    }
}

/// Statistical summary of one metric history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryStatistics {
    /// Number of recorded epochs.
    pub count: usize,
    /// Most recent value, if any.
    pub latest: Option<f64>,
    /// Mean over all recorded values.
    pub mean: f64,
    /// Minimum recorded value.
    pub min: f64,
    /// Maximum recorded value.
    pub max: f64,
}

impl HistoryStatistics {
    /// Summarize a history slice. Empty input yields zeroed statistics.
    #[must_use]
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self {
                count: 0,
                latest: None,
                mean: 0.0,
                min: 0.0,
                max: 0.0,
            };
        }
        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Self {
            count,
            latest: values.last().copied(),
            mean,
            min,
            max,
        }
    }

    /// Serialize the summary to a JSON string.
    pub fn to_json(&self) -> PinnResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_display() {
        assert_eq!(TrainingPhase::Train.to_string(), "train");
        assert_eq!(TrainingPhase::Valid.to_string(), "valid");
    }

    #[test]
    fn test_phase_pair_accessors() {
        let mut pair = PhasePair::new(1usize, 4usize);
        assert_eq!(*pair.get(TrainingPhase::Train), 1);
        assert_eq!(*pair.get(TrainingPhase::Valid), 4);

        *pair.get_mut(TrainingPhase::Valid) = 8;
        assert_eq!(pair.valid, 8);
    }

    #[test]
    fn test_statistics_from_values() {
        let stats = HistoryStatistics::from_values(&[2.0, 4.0, 6.0]);
        assert_eq!(stats.count, 3);
        assert_eq!(stats.latest, Some(6.0));
        assert!((stats.mean - 4.0).abs() < 1e-12);
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 6.0);
    }

    #[test]
    fn test_statistics_empty() {
        let stats = HistoryStatistics::from_values(&[]);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.latest, None);
    }

    #[test]
    fn test_statistics_json_roundtrip() {
        let stats = HistoryStatistics::from_values(&[0.5, 0.25]);
        let json = stats.to_json().unwrap();
        let back: HistoryStatistics = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stats);
    }

    #[test]
    fn test_phase_pair_serde() {
        let pair = PhasePair::new(vec![1.0f64], vec![2.0f64]);
        let json = serde_json::to_string(&pair).unwrap();
        let back: PhasePair<Vec<f64>> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pair);
    }
}
