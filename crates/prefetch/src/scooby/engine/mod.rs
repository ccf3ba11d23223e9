//! Learning Engines.
//!
//! Two concrete engines implement action selection and the SARSA update
//! behind one trait: a dense Q-table over a hashed 10-bit state (the basic
//! engine) and a sum of per-feature tile-coded Q-values (the featurewise
//! engine). The controller boxes whichever the configuration selects.

/// Dense-table engine.
pub mod basic;

/// Feature-wise tile-coded engine.
pub mod featurewise;

pub use basic::BasicEngine;
pub use featurewise::FeaturewiseEngine;

use super::State;
use super::tracker::RewardKind;

/// The outcome of an action selection.
#[derive(Debug, Clone)]
pub struct ActionChoice {
    /// Index of the chosen action.
    pub action_index: usize,
    /// Ratio of the best Q-value to the average, for degree selection.
    pub max_to_avg_q: f32,
    /// Which features' own argmax agreed with the chosen action
    /// (featurewise engine only).
    pub consensus: Option<Vec<bool>>,
}

/// Training context beyond the raw SARSA tuple.
#[derive(Debug, Clone, Copy)]
pub struct LearnAux<'a> {
    /// Consensus vector captured when the trained action was chosen.
    pub consensus: &'a [bool],
    /// Why the trained sample was rewarded.
    pub reward_kind: Option<RewardKind>,
}

/// A swappable state→action value learner.
pub trait LearningEngine {
    /// Chooses an action for `state` (ε-greedy over the Q-values).
    fn choose_action(&mut self, state: &State) -> ActionChoice;

    /// Applies one SARSA update from `(s, a, r)` and the follow-up `(s', a')`.
    fn learn(
        &mut self,
        state: &State,
        action: usize,
        reward: i32,
        next_state: &State,
        next_action: usize,
        aux: &LearnAux<'_>,
    );

    /// Reports engine statistics through the logging layer.
    fn dump_stats(&self);
}
