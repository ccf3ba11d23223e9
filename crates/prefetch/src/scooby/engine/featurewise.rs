//! Feature-wise Learning Engine.
//!
//! Instead of one dense table over a hashed state, this engine keeps a
//! small tile-coded Q-table per feature of the state vector and scores an
//! action as the weighted sum of its per-feature values. Each feature table
//! holds several tilings hashed with different offsets, which smooths the
//! generalization of nearby feature values.
//!
//! When an action is chosen, the engine records which features' own argmax
//! agreed with it — the *consensus vector*. Training then optionally
//! restricts the SARSA update to the features that agreed
//! (`selective_update`), so a feature is not punished for an action it
//! voted against.

use tracing::info;

use crate::common::bits::XorShift64;
use crate::config::ScoobyConfig;

use super::super::State;
use super::{ActionChoice, LearnAux, LearningEngine};

/// The state features a table can be keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum FeatureKind {
    /// The access PC.
    Pc,
    /// The block offset within the page.
    Offset,
    /// The last nonzero delta on the page.
    Delta,
    /// PC combined with the offset.
    PcOffset,
    /// PC combined with the last delta.
    PcDelta,
    /// The rolling delta signature of the page.
    DeltaSig,
}

impl FeatureKind {
    /// Projects the feature's raw value out of the state vector.
    fn value(self, state: &State) -> u64 {
        let delta = state.delta as u64 & 0x7F;
        match self {
            Self::Pc => state.pc,
            Self::Offset => state.offset as u64,
            Self::Delta => delta,
            Self::PcOffset => (state.pc << 6) ^ state.offset as u64,
            Self::PcDelta => (state.pc << 7) ^ delta,
            Self::DeltaSig => state.local_delta_sig as u64,
        }
    }
}

/// One feature's tile-coded Q-table.
struct FeatureTable {
    kind: FeatureKind,
    weight: f32,
    num_tiles: usize,
    // [tiling][tile][action]
    q: Vec<Vec<Vec<f32>>>,
}

impl FeatureTable {
    fn new(kind: FeatureKind, weight: f32, tilings: usize, tiles: usize, actions: usize, init: f32) -> Self {
        Self {
            kind,
            weight,
            num_tiles: tiles,
            q: vec![vec![vec![init; actions]; tiles]; tilings],
        }
    }

    /// Hashes the feature value into a tile, salted per tiling.
    fn tile_index(&self, state: &State, tiling: usize) -> usize {
        let mut x = self
            .kind
            .value(state)
            .wrapping_add(0x9E37_79B9_7F4A_7C15u64.wrapping_mul(tiling as u64 + 1));
        x ^= x >> 33;
        x = x.wrapping_mul(0xFF51_AFD7_ED55_8CCD);
        x ^= x >> 29;
        (x as usize) % self.num_tiles
    }

    fn q_value(&self, state: &State, action: usize) -> f32 {
        (0..self.q.len())
            .map(|t| self.q[t][self.tile_index(state, t)][action])
            .sum()
    }

    fn argmax(&self, state: &State, actions: usize) -> usize {
        let mut best = 0;
        let mut best_q = self.q_value(state, 0);
        for action in 1..actions {
            let q = self.q_value(state, action);
            if q > best_q {
                best = action;
                best_q = q;
            }
        }
        best
    }

    fn update(&mut self, state: &State, action: usize, scaled_error: f32) {
        for t in 0..self.q.len() {
            let tile = self.tile_index(state, t);
            self.q[t][tile][action] += scaled_error;
        }
    }
}

/// The feature-wise engine.
pub struct FeaturewiseEngine {
    features: Vec<FeatureTable>,
    alpha: f32,
    gamma: f32,
    epsilon: f32,
    num_actions: usize,
    selective_update: bool,
    rng: XorShift64,
    explorations: u64,
    exploitations: u64,
    updates: u64,
    consensus_all: u64,
}

impl FeaturewiseEngine {
    /// Creates the engine from the Scooby configuration.
    pub fn new(config: &ScoobyConfig) -> Self {
        let init = if config.zero_init {
            0.0
        } else {
            config.rewards.correct_timely as f32 / (1.0 - config.gamma)
        };
        let fw = &config.featurewise;
        let features = fw
            .active_features
            .iter()
            .zip(fw.feature_weights.iter())
            .map(|(&kind, &weight)| {
                FeatureTable::new(
                    kind,
                    weight,
                    fw.num_tilings,
                    fw.num_tiles,
                    config.actions.len(),
                    init,
                )
            })
            .collect();
        Self {
            features,
            alpha: config.alpha,
            gamma: config.gamma,
            epsilon: config.epsilon,
            num_actions: config.actions.len(),
            selective_update: fw.selective_update,
            rng: XorShift64::new(config.seed),
            explorations: 0,
            exploitations: 0,
            updates: 0,
            consensus_all: 0,
        }
    }

    fn combined_q(&self, state: &State, action: usize) -> f32 {
        self.features
            .iter()
            .map(|f| f.weight * f.q_value(state, action))
            .sum()
    }
}

impl LearningEngine for FeaturewiseEngine {
    fn choose_action(&mut self, state: &State) -> ActionChoice {
        let combined: Vec<f32> = (0..self.num_actions)
            .map(|a| self.combined_q(state, a))
            .collect();

        let mut best = 0;
        for (index, &q) in combined.iter().enumerate() {
            if q > combined[best] {
                best = index;
            }
        }

        let action_index = if self.rng.next_f32() < self.epsilon {
            self.explorations += 1;
            self.rng.next_below(self.num_actions)
        } else {
            self.exploitations += 1;
            best
        };

        let consensus: Vec<bool> = self
            .features
            .iter()
            .map(|f| f.argmax(state, self.num_actions) == action_index)
            .collect();
        if consensus.iter().all(|&agreed| agreed) {
            self.consensus_all += 1;
        }

        let max = combined.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let avg = combined.iter().sum::<f32>() / combined.len() as f32;
        let max_to_avg_q = if avg.abs() > f32::EPSILON {
            max / avg
        } else {
            1.0
        };

        ActionChoice {
            action_index,
            max_to_avg_q,
            consensus: Some(consensus),
        }
    }

    fn learn(
        &mut self,
        state: &State,
        action: usize,
        reward: i32,
        next_state: &State,
        next_action: usize,
        aux: &LearnAux<'_>,
    ) {
        self.updates += 1;
        for (index, feature) in self.features.iter_mut().enumerate() {
            if self.selective_update && !aux.consensus.get(index).copied().unwrap_or(true) {
                continue;
            }
            // Each feature trains on its own temporal-difference error.
            let q = feature.q_value(state, action);
            let q_next = feature.q_value(next_state, next_action);
            let error = reward as f32 + self.gamma * q_next - q;
            feature.update(state, action, self.alpha * error);
        }
    }

    fn dump_stats(&self) {
        info!(
            explorations = self.explorations,
            exploitations = self.exploitations,
            updates = self.updates,
            consensus_all = self.consensus_all,
            "featurewise engine stats"
        );
    }
}

impl std::fmt::Debug for FeaturewiseEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeaturewiseEngine")
            .field("features", &self.features.len())
            .field("num_actions", &self.num_actions)
            .finish_non_exhaustive()
    }
}
