//! Basic Learning Engine.
//!
//! A dense Q-table indexed by the hashed state value and the action index.
//! Action selection is ε-greedy; the update is plain SARSA. Unless zero
//! initialization is requested, Q-values start at the steady-state value of
//! a perfectly timely prefetcher, `reward_correct_timely / (1 − γ)`, which
//! biases early exploration toward issuing prefetches.

use tracing::info;

use crate::common::bits::XorShift64;
use crate::config::ScoobyConfig;

use super::super::State;
use super::{ActionChoice, LearnAux, LearningEngine};

/// The dense-table engine.
pub struct BasicEngine {
    q: Vec<Vec<f32>>,
    alpha: f32,
    gamma: f32,
    epsilon: f32,
    num_actions: usize,
    max_states: usize,
    rng: XorShift64,
    explorations: u64,
    exploitations: u64,
    updates: u64,
}

impl BasicEngine {
    /// Creates the engine from the Scooby configuration.
    pub fn new(config: &ScoobyConfig) -> Self {
        let init = if config.zero_init {
            0.0
        } else {
            config.rewards.correct_timely as f32 / (1.0 - config.gamma)
        };
        Self {
            q: vec![vec![init; config.actions.len()]; config.max_states],
            alpha: config.alpha,
            gamma: config.gamma,
            epsilon: config.epsilon,
            num_actions: config.actions.len(),
            max_states: config.max_states,
            rng: XorShift64::new(config.seed),
            explorations: 0,
            exploitations: 0,
            updates: 0,
        }
    }

    fn argmax(&self, state_index: usize) -> usize {
        let row = &self.q[state_index];
        let mut best = 0;
        for (index, &value) in row.iter().enumerate() {
            if value > row[best] {
                best = index;
            }
        }
        best
    }
}

impl LearningEngine for BasicEngine {
    fn choose_action(&mut self, state: &State) -> ActionChoice {
        let state_index = state.index(self.max_states);
        let action_index = if self.rng.next_f32() < self.epsilon {
            self.explorations += 1;
            self.rng.next_below(self.num_actions)
        } else {
            self.exploitations += 1;
            self.argmax(state_index)
        };

        let row = &self.q[state_index];
        let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let avg = row.iter().sum::<f32>() / row.len() as f32;
        let max_to_avg_q = if avg.abs() > f32::EPSILON {
            max / avg
        } else {
            1.0
        };

        ActionChoice {
            action_index,
            max_to_avg_q,
            consensus: None,
        }
    }

    fn learn(
        &mut self,
        state: &State,
        action: usize,
        reward: i32,
        next_state: &State,
        next_action: usize,
        _aux: &LearnAux<'_>,
    ) {
        self.updates += 1;
        let s = state.index(self.max_states);
        let s2 = next_state.index(self.max_states);
        let q_next = self.q[s2][next_action];
        let q = self.q[s][action];
        self.q[s][action] = q + self.alpha * (reward as f32 + self.gamma * q_next - q);
    }

    fn dump_stats(&self) {
        info!(
            explorations = self.explorations,
            exploitations = self.exploitations,
            updates = self.updates,
            "basic engine stats"
        );
    }
}

impl std::fmt::Debug for BasicEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicEngine")
            .field("max_states", &self.max_states)
            .field("num_actions", &self.num_actions)
            .finish_non_exhaustive()
    }
}
