//! Configuration system for the prefetcher models.
//!
//! This module defines all configuration structures and enums used to
//! parameterize the three policies. It provides:
//! 1. **Defaults:** The reference parameters of each model, so
//!    `Config::default()` reproduces the published configurations.
//! 2. **Structures:** Hierarchical config per policy (tables, queues,
//!    learning knobs, reward values).
//! 3. **Validation:** `Config::validate()` enforces the structural
//!    invariants the models assume (power-of-two set counts, consistent
//!    degree tables, matching feature weights).
//!
//! Configuration is supplied as JSON by the embedding simulator or built in
//! code; use `Config::default()` for the reference setup.

use serde::Deserialize;
use thiserror::Error;

use crate::scooby::engine::featurewise::FeatureKind;
use crate::tables::RegionKind;

/// Default configuration constants for the three models.
mod defaults {
    /// Sets of the EPI entangled table.
    pub const EPI_TABLE_SETS: usize = 256;

    /// Ways of the EPI entangled table.
    pub const EPI_TABLE_WAYS: usize = 16;

    /// Sets of the MANA single-successor table.
    pub const MANA_SINGLE_SETS: usize = 4096;

    /// Ways of the MANA single-successor table.
    pub const MANA_SINGLE_WAYS: usize = 4;

    /// Successor-ring depth of the single table.
    pub const MANA_SINGLE_RING: usize = 1;

    /// Partial-tag width of the single table.
    pub const MANA_SINGLE_PTAG_BITS: u32 = 2;

    /// Sets of the MANA multiple-successor table.
    pub const MANA_MULTIPLE_SETS: usize = 1024;

    /// Ways of the MANA multiple-successor table.
    pub const MANA_MULTIPLE_WAYS: usize = 4;

    /// Successor-ring depth of the multiple table.
    pub const MANA_MULTIPLE_RING: usize = 4;

    /// Sets of the high-order bit-pattern table.
    pub const HOBPT_SETS: usize = 128;

    /// Ways of the high-order bit-pattern table.
    pub const HOBPT_WAYS: usize = 8;

    /// Spatial regions prefetched ahead of the stream.
    pub const MANA_LOOKAHEAD: usize = 3;

    /// Regions held per stream address buffer.
    pub const MANA_TRACKER_SIZE: usize = 5;

    /// Number of stream address buffers.
    pub const MANA_STREAM_COUNT: usize = 1;

    /// Depth of the spatial region queue.
    pub const MANA_SRQ_SIZE: usize = 8;

    /// Capacity of MANA's internal prefetch queue.
    pub const MANA_QUEUE_SIZE: usize = 64;

    /// SARSA learning rate.
    pub const SCOOBY_ALPHA: f32 = 0.006_508_803;

    /// SARSA discount factor.
    pub const SCOOBY_GAMMA: f32 = 0.556_300_96;

    /// ε-greedy exploration rate.
    pub const SCOOBY_EPSILON: f32 = 0.001_822_844_4;

    /// Exploration RNG seed.
    pub const SCOOBY_SEED: u64 = 200;

    /// States of the basic engine's dense Q-table.
    pub const SCOOBY_MAX_STATES: usize = 1024;

    /// Pages tracked by the signature table.
    pub const SCOOBY_ST_SIZE: usize = 64;

    /// Capacity of the prefetch tracker.
    pub const SCOOBY_PT_SIZE: usize = 256;

    /// Depth of the per-page PC/offset/delta histories.
    pub const SCOOBY_PAGE_HISTORY_DEPTH: usize = 5;

    /// Actions tracked per page for degree selection.
    pub const SCOOBY_ACTION_TRACKER_SIZE: usize = 2;

    /// Bandwidth level at which the high-bandwidth rewards apply.
    pub const SCOOBY_HIGH_BW_THRESHOLD: u8 = 4;

    /// Tilings per feature table.
    pub const FEATUREWISE_TILINGS: usize = 3;

    /// Tiles per tiling.
    pub const FEATUREWISE_TILES: usize = 128;
}

/// Errors reported by [`Config::validate`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A table's set count must be a power of two.
    #[error("{name} must be a power of two (got {value})")]
    NotPowerOfTwo {
        /// Which knob failed.
        name: &'static str,
        /// The offending value.
        value: usize,
    },
    /// The Scooby action list must not be empty.
    #[error("the action list must not be empty")]
    NoActions,
    /// A degree table must be one entry longer than its threshold table.
    #[error("{name}: the degree list must be one longer than its threshold list")]
    DegreeMismatch {
        /// Which degree table failed.
        name: &'static str,
    },
    /// Dynamic degree selection requires a base degree of one.
    #[error("dynamic degree selection requires a base prefetch degree of 1")]
    DynamicDegreeConflict,
    /// Each active feature needs exactly one weight.
    #[error("feature weight count ({weights}) must match the active feature count ({features})")]
    FeatureWeightMismatch {
        /// Configured weights.
        weights: usize,
        /// Configured features.
        features: usize,
    },
    /// The multiple table's index must not outgrow the single table's
    /// index plus partial tag.
    #[error("the multiple table has more index bits than the single table's index plus partial tag")]
    PartialTagUnderflow,
}

/// Selects which policy a CPU runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum PrefetcherKind {
    /// Entangling instruction prefetcher.
    #[default]
    Epi,
    /// Temporal-stream instruction prefetcher.
    Mana,
    /// Reinforcement-learning data prefetcher.
    Scooby,
}

/// Root configuration for one CPU's prefetcher.
///
/// # Examples
///
/// Deserializing from JSON (typical embedding-simulator usage):
///
/// ```
/// use prefsim_core::config::{Config, PrefetcherKind};
///
/// let json = r#"{
///     "kind": "Mana",
///     "mana": { "lookahead": 4, "queue_size": 32 }
/// }"#;
///
/// let config: Config = serde_json::from_str(json).unwrap();
/// assert_eq!(config.kind, PrefetcherKind::Mana);
/// assert_eq!(config.mana.lookahead, 4);
/// assert_eq!(config.mana.single_sets, 4096);
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Which policy to construct.
    #[serde(default)]
    pub kind: PrefetcherKind,

    /// EPI parameters.
    #[serde(default)]
    pub epi: EpiConfig,

    /// MANA parameters.
    #[serde(default)]
    pub mana: ManaConfig,

    /// Scooby parameters.
    #[serde(default)]
    pub scooby: ScoobyConfig,
}

impl Config {
    /// Checks the structural invariants of the selected configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.epi.validate()?;
        self.mana.validate()?;
        self.scooby.validate()
    }
}

/// EPI parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct EpiConfig {
    /// Sets of the entangled table.
    #[serde(default = "EpiConfig::default_table_sets")]
    pub table_sets: usize,

    /// Ways of the entangled table.
    #[serde(default = "EpiConfig::default_table_ways")]
    pub table_ways: usize,
}

impl EpiConfig {
    fn default_table_sets() -> usize {
        defaults::EPI_TABLE_SETS
    }

    fn default_table_ways() -> usize {
        defaults::EPI_TABLE_WAYS
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.table_sets.is_power_of_two() {
            return Err(ConfigError::NotPowerOfTwo {
                name: "epi.table_sets",
                value: self.table_sets,
            });
        }
        Ok(())
    }
}

impl Default for EpiConfig {
    fn default() -> Self {
        Self {
            table_sets: defaults::EPI_TABLE_SETS,
            table_ways: defaults::EPI_TABLE_WAYS,
        }
    }
}

/// MANA parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct ManaConfig {
    /// Sets of the single-successor table.
    #[serde(default = "ManaConfig::default_single_sets")]
    pub single_sets: usize,

    /// Ways of the single-successor table.
    #[serde(default = "ManaConfig::default_single_ways")]
    pub single_ways: usize,

    /// Successor-ring depth of the single table.
    #[serde(default = "ManaConfig::default_single_ring")]
    pub single_ring_size: usize,

    /// Partial-tag width of the single table.
    #[serde(default = "ManaConfig::default_single_ptag_bits")]
    pub single_ptag_bits: u32,

    /// Whether the multiple-successor table exists.
    #[serde(default = "ManaConfig::default_support_multiple")]
    pub support_multiple: bool,

    /// Sets of the multiple-successor table.
    #[serde(default = "ManaConfig::default_multiple_sets")]
    pub multiple_sets: usize,

    /// Ways of the multiple-successor table.
    #[serde(default = "ManaConfig::default_multiple_ways")]
    pub multiple_ways: usize,

    /// Successor-ring depth of the multiple table.
    #[serde(default = "ManaConfig::default_multiple_ring")]
    pub multiple_ring_size: usize,

    /// Sets of the high-order bit-pattern table.
    #[serde(default = "ManaConfig::default_hobpt_sets")]
    pub hobpt_sets: usize,

    /// Ways of the high-order bit-pattern table.
    #[serde(default = "ManaConfig::default_hobpt_ways")]
    pub hobpt_ways: usize,

    /// Whether the HOBPT replaces by LRU (FIFO otherwise).
    #[serde(default = "ManaConfig::default_hobpt_lru")]
    pub hobpt_lru: bool,

    /// Spatial-region encoding.
    #[serde(default)]
    pub region_kind: RegionKind,

    /// Regions prefetched ahead of the fetch stream.
    #[serde(default = "ManaConfig::default_lookahead")]
    pub lookahead: usize,

    /// Regions held per stream address buffer.
    #[serde(default = "ManaConfig::default_tracker_size")]
    pub tracker_size: usize,

    /// Number of stream address buffers.
    #[serde(default = "ManaConfig::default_stream_count")]
    pub stream_count: usize,

    /// Depth of the spatial region queue.
    #[serde(default = "ManaConfig::default_srq_size")]
    pub srq_size: usize,

    /// Capacity of the internal prefetch queue.
    #[serde(default = "ManaConfig::default_queue_size")]
    pub queue_size: usize,
}

impl ManaConfig {
    fn default_single_sets() -> usize {
        defaults::MANA_SINGLE_SETS
    }

    fn default_single_ways() -> usize {
        defaults::MANA_SINGLE_WAYS
    }

    fn default_single_ring() -> usize {
        defaults::MANA_SINGLE_RING
    }

    fn default_single_ptag_bits() -> u32 {
        defaults::MANA_SINGLE_PTAG_BITS
    }

    fn default_support_multiple() -> bool {
        true
    }

    fn default_multiple_sets() -> usize {
        defaults::MANA_MULTIPLE_SETS
    }

    fn default_multiple_ways() -> usize {
        defaults::MANA_MULTIPLE_WAYS
    }

    fn default_multiple_ring() -> usize {
        defaults::MANA_MULTIPLE_RING
    }

    fn default_hobpt_sets() -> usize {
        defaults::HOBPT_SETS
    }

    fn default_hobpt_ways() -> usize {
        defaults::HOBPT_WAYS
    }

    fn default_hobpt_lru() -> bool {
        true
    }

    fn default_lookahead() -> usize {
        defaults::MANA_LOOKAHEAD
    }

    fn default_tracker_size() -> usize {
        defaults::MANA_TRACKER_SIZE
    }

    fn default_stream_count() -> usize {
        defaults::MANA_STREAM_COUNT
    }

    fn default_srq_size() -> usize {
        defaults::MANA_SRQ_SIZE
    }

    fn default_queue_size() -> usize {
        defaults::MANA_QUEUE_SIZE
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("mana.single_sets", self.single_sets),
            ("mana.multiple_sets", self.multiple_sets),
            ("mana.hobpt_sets", self.hobpt_sets),
        ] {
            if !value.is_power_of_two() {
                return Err(ConfigError::NotPowerOfTwo { name, value });
            }
        }
        if self.support_multiple {
            let single_bits = self.single_sets.trailing_zeros() + self.single_ptag_bits;
            if self.multiple_sets.trailing_zeros() > single_bits {
                return Err(ConfigError::PartialTagUnderflow);
            }
        }
        Ok(())
    }
}

impl Default for ManaConfig {
    fn default() -> Self {
        Self {
            single_sets: defaults::MANA_SINGLE_SETS,
            single_ways: defaults::MANA_SINGLE_WAYS,
            single_ring_size: defaults::MANA_SINGLE_RING,
            single_ptag_bits: defaults::MANA_SINGLE_PTAG_BITS,
            support_multiple: true,
            multiple_sets: defaults::MANA_MULTIPLE_SETS,
            multiple_ways: defaults::MANA_MULTIPLE_WAYS,
            multiple_ring_size: defaults::MANA_MULTIPLE_RING,
            hobpt_sets: defaults::HOBPT_SETS,
            hobpt_ways: defaults::HOBPT_WAYS,
            hobpt_lru: true,
            region_kind: RegionKind::default(),
            lookahead: defaults::MANA_LOOKAHEAD,
            tracker_size: defaults::MANA_TRACKER_SIZE,
            stream_count: defaults::MANA_STREAM_COUNT,
            srq_size: defaults::MANA_SRQ_SIZE,
            queue_size: defaults::MANA_QUEUE_SIZE,
        }
    }
}

/// Selects the Scooby learning engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum EngineKind {
    /// Dense Q-table over a hashed state.
    Basic,
    /// Sum of per-feature tile-coded Q-values.
    #[default]
    Featurewise,
}

/// Selects how the dynamic prefetch degree is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum DegreeSelect {
    /// From the max-to-average Q-value ratio.
    MaxToAvgQ,
    /// From the page's per-action confidence tracker.
    #[default]
    ActionConfidence,
}

/// The reward assigned to each feedback event.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RewardValues {
    /// Correct and filled before the demand access.
    pub correct_timely: i32,
    /// Correct but still in flight at the demand access.
    pub correct_untimely: i32,
    /// Evicted without a demand access.
    pub incorrect: i32,
    /// The agent chose not to prefetch.
    pub no_prefetch: i32,
    /// Predicted offset left the page.
    pub out_of_page: i32,
    /// Predicted address was already in flight.
    pub tracker_hit: i32,
}

impl RewardValues {
    fn low_bandwidth() -> Self {
        Self {
            correct_timely: 20,
            correct_untimely: 12,
            incorrect: -8,
            no_prefetch: -4,
            out_of_page: -12,
            tracker_hit: -2,
        }
    }

    fn high_bandwidth() -> Self {
        Self {
            correct_timely: 20,
            correct_untimely: 12,
            incorrect: -14,
            no_prefetch: -2,
            out_of_page: -12,
            tracker_hit: -2,
        }
    }
}

/// Featurewise engine parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct FeaturewiseConfig {
    /// Which state features carry a Q-table.
    #[serde(default = "FeaturewiseConfig::default_active_features")]
    pub active_features: Vec<FeatureKind>,

    /// Per-feature weights in the combined score.
    #[serde(default = "FeaturewiseConfig::default_feature_weights")]
    pub feature_weights: Vec<f32>,

    /// Tilings per feature table.
    #[serde(default = "FeaturewiseConfig::default_num_tilings")]
    pub num_tilings: usize,

    /// Tiles per tiling.
    #[serde(default = "FeaturewiseConfig::default_num_tiles")]
    pub num_tiles: usize,

    /// Restrict updates to features that agreed with the trained action.
    #[serde(default)]
    pub selective_update: bool,
}

impl FeaturewiseConfig {
    fn default_active_features() -> Vec<FeatureKind> {
        vec![FeatureKind::Pc, FeatureKind::PcDelta]
    }

    fn default_feature_weights() -> Vec<f32> {
        vec![1.0, 1.0]
    }

    fn default_num_tilings() -> usize {
        defaults::FEATUREWISE_TILINGS
    }

    fn default_num_tiles() -> usize {
        defaults::FEATUREWISE_TILES
    }
}

impl Default for FeaturewiseConfig {
    fn default() -> Self {
        Self {
            active_features: Self::default_active_features(),
            feature_weights: Self::default_feature_weights(),
            num_tilings: defaults::FEATUREWISE_TILINGS,
            num_tiles: defaults::FEATUREWISE_TILES,
            selective_update: false,
        }
    }
}

/// Scooby parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoobyConfig {
    /// SARSA learning rate.
    #[serde(default = "ScoobyConfig::default_alpha")]
    pub alpha: f32,

    /// SARSA discount factor.
    #[serde(default = "ScoobyConfig::default_gamma")]
    pub gamma: f32,

    /// ε-greedy exploration rate.
    #[serde(default = "ScoobyConfig::default_epsilon")]
    pub epsilon: f32,

    /// Exploration RNG seed.
    #[serde(default = "ScoobyConfig::default_seed")]
    pub seed: u64,

    /// The ordered stride action set; `0` means "no prefetch".
    #[serde(default = "ScoobyConfig::default_actions")]
    pub actions: Vec<i32>,

    /// Which learning engine to use.
    #[serde(default)]
    pub engine: EngineKind,

    /// States of the basic engine's dense Q-table.
    #[serde(default = "ScoobyConfig::default_max_states")]
    pub max_states: usize,

    /// Start Q-values at zero instead of the timely-reward fixpoint.
    #[serde(default)]
    pub zero_init: bool,

    /// Pages tracked by the signature table.
    #[serde(default = "ScoobyConfig::default_st_size")]
    pub st_size: usize,

    /// Capacity of the prefetch tracker.
    #[serde(default = "ScoobyConfig::default_pt_size")]
    pub pt_size: usize,

    /// Depth of the per-page PC/offset/delta histories.
    #[serde(default = "ScoobyConfig::default_page_history_depth")]
    pub page_history_depth: usize,

    /// Actions tracked per page for degree selection.
    #[serde(default = "ScoobyConfig::default_action_tracker_size")]
    pub action_tracker_size: usize,

    /// Reward or ignore out-of-page predictions.
    #[serde(default = "ScoobyConfig::default_true")]
    pub enable_reward_out_of_page: bool,

    /// Reward or ignore duplicate predictions.
    #[serde(default)]
    pub enable_reward_tracker_hit: bool,

    /// Apply demand feedback to every matching tracker entry.
    #[serde(default)]
    pub reward_all: bool,

    /// Track duplicate addresses separately.
    #[serde(default)]
    pub track_multiple: bool,

    /// Base prefetch degree.
    #[serde(default = "ScoobyConfig::default_pref_degree")]
    pub pref_degree: u32,

    /// Derive the degree dynamically per prediction.
    #[serde(default = "ScoobyConfig::default_true")]
    pub enable_dyn_degree: bool,

    /// How the dynamic degree is selected.
    #[serde(default)]
    pub degree_select: DegreeSelect,

    /// Thresholds on the max-to-average Q ratio.
    #[serde(default = "ScoobyConfig::default_max_to_avg_q_thresholds")]
    pub max_to_avg_q_thresholds: Vec<f32>,

    /// Degrees selected by the Q-ratio thresholds.
    #[serde(default = "ScoobyConfig::default_dyn_degrees")]
    pub dyn_degrees: Vec<u32>,

    /// Thresholds on the page's action confidence.
    #[serde(default = "ScoobyConfig::default_conf_thresholds")]
    pub conf_thresholds: Vec<i32>,

    /// Degrees selected by the confidence thresholds.
    #[serde(default = "ScoobyConfig::default_conf_degrees")]
    pub conf_degrees: Vec<u32>,

    /// High-bandwidth variant of the confidence thresholds.
    #[serde(default = "ScoobyConfig::default_conf_thresholds")]
    pub conf_thresholds_hbw: Vec<i32>,

    /// High-bandwidth variant of the confidence degrees.
    #[serde(default = "ScoobyConfig::default_conf_degrees")]
    pub conf_degrees_hbw: Vec<u32>,

    /// Bandwidth level at which the high-bandwidth rewards apply.
    #[serde(default = "ScoobyConfig::default_high_bw_threshold")]
    pub high_bw_threshold: u8,

    /// Switch to the high-bandwidth reward values when above threshold.
    #[serde(default = "ScoobyConfig::default_true")]
    pub enable_hbw_rewards: bool,

    /// Reward values below the bandwidth threshold.
    #[serde(default = "RewardValues::low_bandwidth")]
    pub rewards: RewardValues,

    /// Reward values above the bandwidth threshold.
    #[serde(default = "RewardValues::high_bandwidth")]
    pub rewards_hbw: RewardValues,

    /// Featurewise engine parameters.
    #[serde(default)]
    pub featurewise: FeaturewiseConfig,
}

impl ScoobyConfig {
    fn default_alpha() -> f32 {
        defaults::SCOOBY_ALPHA
    }

    fn default_gamma() -> f32 {
        defaults::SCOOBY_GAMMA
    }

    fn default_epsilon() -> f32 {
        defaults::SCOOBY_EPSILON
    }

    fn default_seed() -> u64 {
        defaults::SCOOBY_SEED
    }

    fn default_actions() -> Vec<i32> {
        vec![1, 3, 4, 5, 10, 11, 12, 22, 23, 30, 32, -1, -3, -6, 0]
    }

    fn default_max_states() -> usize {
        defaults::SCOOBY_MAX_STATES
    }

    fn default_st_size() -> usize {
        defaults::SCOOBY_ST_SIZE
    }

    fn default_pt_size() -> usize {
        defaults::SCOOBY_PT_SIZE
    }

    fn default_page_history_depth() -> usize {
        defaults::SCOOBY_PAGE_HISTORY_DEPTH
    }

    fn default_action_tracker_size() -> usize {
        defaults::SCOOBY_ACTION_TRACKER_SIZE
    }

    fn default_pref_degree() -> u32 {
        1
    }

    fn default_high_bw_threshold() -> u8 {
        defaults::SCOOBY_HIGH_BW_THRESHOLD
    }

    fn default_true() -> bool {
        true
    }

    fn default_max_to_avg_q_thresholds() -> Vec<f32> {
        vec![0.5, 1.0, 2.0]
    }

    fn default_dyn_degrees() -> Vec<u32> {
        vec![1, 2, 4, 4]
    }

    fn default_conf_thresholds() -> Vec<i32> {
        vec![1, 3, 8]
    }

    fn default_conf_degrees() -> Vec<u32> {
        vec![1, 2, 4, 6]
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.actions.is_empty() {
            return Err(ConfigError::NoActions);
        }
        if !self.max_states.is_power_of_two() {
            return Err(ConfigError::NotPowerOfTwo {
                name: "scooby.max_states",
                value: self.max_states,
            });
        }
        if self.enable_dyn_degree && self.pref_degree != 1 {
            return Err(ConfigError::DynamicDegreeConflict);
        }
        if self.dyn_degrees.len() != self.max_to_avg_q_thresholds.len() + 1 {
            return Err(ConfigError::DegreeMismatch {
                name: "scooby.dyn_degrees",
            });
        }
        for (name, thresholds, degrees) in [
            (
                "scooby.conf_degrees",
                self.conf_thresholds.len(),
                self.conf_degrees.len(),
            ),
            (
                "scooby.conf_degrees_hbw",
                self.conf_thresholds_hbw.len(),
                self.conf_degrees_hbw.len(),
            ),
        ] {
            if degrees != thresholds + 1 {
                return Err(ConfigError::DegreeMismatch { name });
            }
        }
        if self.featurewise.feature_weights.len() != self.featurewise.active_features.len() {
            return Err(ConfigError::FeatureWeightMismatch {
                weights: self.featurewise.feature_weights.len(),
                features: self.featurewise.active_features.len(),
            });
        }
        Ok(())
    }
}

impl Default for ScoobyConfig {
    fn default() -> Self {
        Self {
            alpha: defaults::SCOOBY_ALPHA,
            gamma: defaults::SCOOBY_GAMMA,
            epsilon: defaults::SCOOBY_EPSILON,
            seed: defaults::SCOOBY_SEED,
            actions: Self::default_actions(),
            engine: EngineKind::default(),
            max_states: defaults::SCOOBY_MAX_STATES,
            zero_init: false,
            st_size: defaults::SCOOBY_ST_SIZE,
            pt_size: defaults::SCOOBY_PT_SIZE,
            page_history_depth: defaults::SCOOBY_PAGE_HISTORY_DEPTH,
            action_tracker_size: defaults::SCOOBY_ACTION_TRACKER_SIZE,
            enable_reward_out_of_page: true,
            enable_reward_tracker_hit: false,
            reward_all: false,
            track_multiple: false,
            pref_degree: 1,
            enable_dyn_degree: true,
            degree_select: DegreeSelect::default(),
            max_to_avg_q_thresholds: Self::default_max_to_avg_q_thresholds(),
            dyn_degrees: Self::default_dyn_degrees(),
            conf_thresholds: Self::default_conf_thresholds(),
            conf_degrees: Self::default_conf_degrees(),
            conf_thresholds_hbw: Self::default_conf_thresholds(),
            conf_degrees_hbw: Self::default_conf_degrees(),
            high_bw_threshold: defaults::SCOOBY_HIGH_BW_THRESHOLD,
            enable_hbw_rewards: true,
            rewards: RewardValues::low_bandwidth(),
            rewards_hbw: RewardValues::high_bandwidth(),
            featurewise: FeaturewiseConfig::default(),
        }
    }
}
