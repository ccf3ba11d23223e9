//! Scooby Reinforcement-Learning Data Prefetcher.
//!
//! Scooby treats prefetching as a sequential decision problem. Every demand
//! access is featurized into a state vector; a learning engine picks a
//! stride offset (the *action*) ε-greedily from its Q-values; the issued
//! prefetch is tracked until feedback arrives. Timeliness and accuracy
//! feedback become rewards, and tracker evictions pair consecutive samples
//! for the on-policy SARSA update.
//!
//! The controller wires four parts together: the per-page signature table
//! (state features and action confidence), the prefetch tracker (reward
//! lifecycle), the learning engine (selection + update), and the epoch
//! levels broadcast by the driver (bandwidth, IPC, cache accuracy).

/// Learning engines (dense table and feature-wise tile coding).
pub mod engine;

/// Per-page signature table.
pub mod signature;

/// In-flight prefetch tracker.
pub mod tracker;

use tracing::{debug, info};

use crate::common::addr::{BLOCK_SHIFT, BLOCKS_PER_PAGE, PAGE_SHIFT, block_align, page_block_offset, page_of};
use crate::config::{DegreeSelect, EngineKind, ScoobyConfig};
use crate::driver::{AccessEvent, CachePrefetcher, FillEvent, PrefetchQueue};
use engine::{BasicEngine, FeaturewiseEngine, LearnAux, LearningEngine};
use signature::SignatureTable;
use tracker::{DUMMY_ADDR, PrefetchTracker, PtEntry, RewardKind};

/// Number of bandwidth/IPC/accuracy epoch levels.
pub const EPOCH_LEVELS: u8 = 8;

/// The state vector captured per demand access.
#[derive(Debug, Clone, Default)]
pub struct State {
    /// PC of the access.
    pub pc: u64,
    /// Full byte address of the access.
    pub address: u64,
    /// Page number of the access.
    pub page: u64,
    /// Block offset within the page.
    pub offset: u32,
    /// Most recent nonzero delta observed on the page.
    pub delta: i32,
    /// Rolling delta signature of the page.
    pub local_delta_sig: u32,
    /// Second delta signature of the page.
    pub local_delta_sig2: u32,
    /// Rolling PC signature of the page.
    pub local_pc_sig: u32,
    /// Rolling offset signature of the page.
    pub local_offset_sig: u32,
    /// Current bandwidth epoch level.
    pub bw_level: u8,
    /// Whether the bandwidth level crosses the high-bandwidth threshold.
    pub is_high_bw: bool,
    /// Current cache-accuracy epoch level.
    pub acc_level: u8,
}

impl State {
    /// Folds the vector into a dense state index for the basic engine.
    pub fn index(&self, max_states: usize) -> usize {
        let mut x = self.pc
            ^ (self.page << 1)
            ^ (u64::from(self.offset) << 7)
            ^ ((self.delta as u64 & 0x7F) << 13);
        x ^= x >> 33;
        x = x.wrapping_mul(0xFF51_AFD7_ED55_8CCD);
        x ^= x >> 29;
        (x as usize) % max_states
    }
}

/// Aggregate counters reported by `final_stats`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoobyStats {
    /// Prediction passes run.
    pub predict_called: u64,
    /// Primary prefetches issued.
    pub issued: u64,
    /// Additional prefetches from dynamic degree.
    pub multi_deg: u64,
    /// Times the policy chose not to prefetch.
    pub no_prefetch: u64,
    /// Predicted offsets falling outside the page.
    pub out_of_page: u64,
    /// Predictions already tracked in flight.
    pub tracker_hits: u64,
    /// Demand-side reward passes.
    pub reward_demand_called: u64,
    /// Rewards assigned, by kind: timely, untimely, incorrect, none, out of
    /// page, tracker hit.
    pub rewards: [u64; 6],
    /// SARSA updates performed.
    pub train_called: u64,
    /// Prefetch fills registered.
    pub fills: u64,
    /// Prefetch hits registered.
    pub prefetch_hits: u64,
    /// Bandwidth epochs observed.
    pub bw_epochs: u64,
    /// IPC epochs observed.
    pub ipc_epochs: u64,
    /// Accuracy epochs observed.
    pub acc_epochs: u64,
}

fn reward_slot(kind: RewardKind) -> usize {
    match kind {
        RewardKind::CorrectTimely => 0,
        RewardKind::CorrectUntimely => 1,
        RewardKind::Incorrect => 2,
        RewardKind::NoPrefetch => 3,
        RewardKind::OutOfPage => 4,
        RewardKind::TrackerHit => 5,
    }
}

/// The per-CPU Scooby policy object.
pub struct ScoobyPrefetcher {
    cpu: u32,
    config: ScoobyConfig,
    st: SignatureTable,
    tracker: PrefetchTracker,
    engine: Box<dyn LearningEngine>,
    bw_level: u8,
    core_ipc: u8,
    acc_level: u8,
    stats: ScoobyStats,
}

impl ScoobyPrefetcher {
    /// Creates a Scooby policy from its configuration.
    pub fn new(config: &ScoobyConfig) -> Self {
        let engine: Box<dyn LearningEngine> = match config.engine {
            EngineKind::Basic => Box::new(BasicEngine::new(config)),
            EngineKind::Featurewise => Box::new(FeaturewiseEngine::new(config)),
        };
        Self {
            cpu: 0,
            st: SignatureTable::new(
                config.st_size,
                config.page_history_depth,
                config.action_tracker_size,
            ),
            tracker: PrefetchTracker::new(config.pt_size),
            engine,
            bw_level: 0,
            core_ipc: 0,
            acc_level: 0,
            stats: ScoobyStats::default(),
            config: config.clone(),
        }
    }

    /// Statistics snapshot.
    pub fn stats(&self) -> &ScoobyStats {
        &self.stats
    }

    fn is_high_bw(&self) -> bool {
        self.bw_level >= self.config.high_bw_threshold
    }

    fn reward_value(&self, kind: RewardKind) -> i32 {
        let rewards = if self.config.enable_hbw_rewards && self.is_high_bw() {
            &self.config.rewards_hbw
        } else {
            &self.config.rewards
        };
        match kind {
            RewardKind::CorrectTimely => rewards.correct_timely,
            RewardKind::CorrectUntimely => rewards.correct_untimely,
            RewardKind::Incorrect => rewards.incorrect,
            RewardKind::NoPrefetch => rewards.no_prefetch,
            RewardKind::OutOfPage => rewards.out_of_page,
            RewardKind::TrackerHit => rewards.tracker_hit,
        }
    }

    /// Assigns the reward earned by a demand access to `addr`, once.
    fn reward_demand(&mut self, addr: u64) {
        self.stats.reward_demand_called += 1;
        let timely = self.reward_value(RewardKind::CorrectTimely);
        let untimely = self.reward_value(RewardKind::CorrectUntimely);
        let mut assigned = [0u64; 6];
        let _ = self
            .tracker
            .for_each_matching(addr, self.config.reward_all, |entry| {
                if entry.has_reward {
                    // A prefetch seeing several demand reuses is rewarded
                    // only for the first.
                    return false;
                }
                let kind = if entry.is_filled {
                    RewardKind::CorrectTimely
                } else {
                    RewardKind::CorrectUntimely
                };
                entry.reward = if entry.is_filled { timely } else { untimely };
                entry.reward_kind = Some(kind);
                entry.has_reward = true;
                assigned[reward_slot(kind)] += 1;
                true
            });
        for (slot, count) in assigned.iter().enumerate() {
            self.stats.rewards[slot] += count;
        }
    }

    /// Rewards a record evicted without demand feedback.
    fn reward_on_evict(&mut self, entry: &mut PtEntry) {
        debug_assert!(!entry.has_reward);
        let kind = if entry.address == DUMMY_ADDR {
            RewardKind::NoPrefetch
        } else {
            RewardKind::Incorrect
        };
        self.assign_reward(entry, kind);
    }

    fn assign_reward(&mut self, entry: &mut PtEntry, kind: RewardKind) {
        debug_assert!(!entry.has_reward);
        entry.reward = self.reward_value(kind);
        entry.reward_kind = Some(kind);
        entry.has_reward = true;
        self.stats.rewards[reward_slot(kind)] += 1;
        debug!(address = entry.address, ?kind, reward = entry.reward, "reward");
    }

    /// Rewards the record pushed by the current prediction pass.
    fn reward_newest(&mut self, kind: RewardKind) {
        let value = self.reward_value(kind);
        if let Some(entry) = self.tracker.newest_mut() {
            debug_assert!(!entry.has_reward);
            entry.reward = value;
            entry.reward_kind = Some(kind);
            entry.has_reward = true;
        }
        self.stats.rewards[reward_slot(kind)] += 1;
    }

    /// Tracks an issued (or bookkeeping) address.
    ///
    /// Returns whether the address was not already in flight. A duplicate
    /// of a real address is not re-tracked unless `track_multiple` is set;
    /// the dummy address is always tracked.
    fn track(&mut self, addr: u64, state: &State, action_index: usize, consensus: &[bool]) -> bool {
        let is_new = !self.tracker.is_tracked(addr);
        if !is_new && addr != DUMMY_ADDR && !self.config.track_multiple {
            return false;
        }

        if self.tracker.is_full() {
            if let Some(evicted) = self.tracker.pop_oldest() {
                self.train_on_eviction(evicted);
            }
        }

        let mut entry = PtEntry::new(addr, state.clone(), action_index);
        entry.consensus = consensus.to_vec();
        self.tracker.push(entry);
        is_new
    }

    /// Forms the SARSA pair from consecutive evictions and trains on it.
    fn train_on_eviction(&mut self, evicted: PtEntry) {
        if let Some(mut last) = self.tracker.take_last_evicted() {
            if !last.has_reward {
                self.reward_on_evict(&mut last);
            }
            debug_assert!(last.has_reward);
            let aux = LearnAux {
                consensus: &last.consensus,
                reward_kind: last.reward_kind,
            };
            self.engine.learn(
                &last.state,
                last.action_index,
                last.reward,
                &evicted.state,
                evicted.action_index,
                &aux,
            );
            self.stats.train_called += 1;
        }
        self.tracker.set_last_evicted(evicted);
    }

    /// Selects the prefetch degree for a chosen action.
    fn dyn_degree(&self, max_to_avg_q: f32, page: u64, action: i32) -> u32 {
        match self.config.degree_select {
            DegreeSelect::MaxToAvgQ => {
                for (index, &threshold) in self.config.max_to_avg_q_thresholds.iter().enumerate() {
                    if max_to_avg_q <= threshold {
                        return self.config.dyn_degrees[index];
                    }
                }
                self.config.dyn_degrees.last().copied().unwrap_or(1)
            }
            DegreeSelect::ActionConfidence => {
                let Some(entry) = self.st.get(page) else {
                    return 1;
                };
                let Some(conf) = entry.action_confidence(action) else {
                    return 1;
                };
                let (thresholds, degrees) = if self.is_high_bw() {
                    (
                        &self.config.conf_thresholds_hbw,
                        &self.config.conf_degrees_hbw,
                    )
                } else {
                    (&self.config.conf_thresholds, &self.config.conf_degrees)
                };
                for (index, &threshold) in thresholds.iter().enumerate() {
                    if conf <= threshold {
                        return degrees[index];
                    }
                }
                degrees.last().copied().unwrap_or(1)
            }
        }
    }

    /// Emits the degree-extension prefetches `offset + k·action`, `k ≥ 2`,
    /// skipping any that leave the page. Extensions are not tracked.
    fn multi_degree(&mut self, page: u64, offset: u32, action: i32, degree: u32, out: &mut Vec<u64>) {
        for k in 2..=degree as i32 {
            let predicted = offset as i32 + k * action;
            if (0..BLOCKS_PER_PAGE as i32).contains(&predicted) {
                out.push((page << PAGE_SHIFT) + ((predicted as u64) << BLOCK_SHIFT));
                self.stats.multi_deg += 1;
            }
        }
    }

    /// Runs one prediction pass and returns the addresses to issue.
    fn predict(&mut self, page: u64, offset: u32, state: &State) -> Vec<u64> {
        self.stats.predict_called += 1;

        let choice = self.engine.choose_action(state);
        let is_featurewise = matches!(self.config.engine, EngineKind::Featurewise);
        let consensus = choice.consensus.unwrap_or_default();
        let mut degree = self.config.pref_degree;
        if is_featurewise && self.config.enable_dyn_degree {
            degree = self.dyn_degree(
                choice.max_to_avg_q,
                page,
                self.config.actions[choice.action_index],
            );
        }

        let action = self.config.actions[choice.action_index];
        let mut out = Vec::new();

        if action == 0 {
            // The agent chose not to prefetch; track it so the choice is
            // rewarded at eviction.
            let _ = self.track(DUMMY_ADDR, state, choice.action_index, &consensus);
            self.stats.no_prefetch += 1;
            return out;
        }

        let predicted = offset as i32 + action;
        if !(0..BLOCKS_PER_PAGE as i32).contains(&predicted) {
            self.stats.out_of_page += 1;
            if self.config.enable_reward_out_of_page {
                let _ = self.track(DUMMY_ADDR, state, choice.action_index, &consensus);
                self.reward_newest(RewardKind::OutOfPage);
            }
            return out;
        }

        let pf_addr = (page << PAGE_SHIFT) + ((predicted as u64) << BLOCK_SHIFT);
        if self.track(pf_addr, state, choice.action_index, &consensus) {
            out.push(pf_addr);
            self.st.track_prefetch(page, action);
            self.stats.issued += 1;
            if degree > 1 {
                self.multi_degree(page, offset, action, degree, &mut out);
            }
        } else {
            self.stats.tracker_hits += 1;
            if self.config.enable_reward_tracker_hit {
                let _ = self.track(DUMMY_ADDR, state, choice.action_index, &consensus);
                self.reward_newest(RewardKind::TrackerHit);
            }
        }
        out
    }
}

impl CachePrefetcher for ScoobyPrefetcher {
    fn initialize(&mut self, cpu: u32) {
        self.cpu = cpu;
        info!(cpu, "Scooby prefetcher");
    }

    fn cache_operate(
        &mut self,
        queue: &mut dyn PrefetchQueue,
        _cycle: u64,
        access: &AccessEvent,
    ) -> u32 {
        self.reward_demand(block_align(access.addr));

        let page = page_of(access.addr);
        let offset = page_block_offset(access.addr);
        let snapshot = self.st.update(page, access.ip, offset);

        let state = State {
            pc: access.ip,
            address: access.addr,
            page,
            offset,
            delta: snapshot.last_delta,
            local_delta_sig: snapshot.delta_sig,
            local_delta_sig2: snapshot.delta_sig2,
            local_pc_sig: snapshot.pc_sig,
            local_offset_sig: snapshot.offset_sig,
            bw_level: self.bw_level,
            is_high_bw: self.is_high_bw(),
            acc_level: self.acc_level,
        };

        for addr in self.predict(page, offset, &state) {
            if !queue.prefetch_line(addr, true, 0) {
                break;
            }
        }
        access.metadata
    }

    fn cache_fill(&mut self, _queue: &mut dyn PrefetchQueue, _cycle: u64, fill: &FillEvent) -> u32 {
        if fill.was_prefetch {
            self.stats.fills += 1;
            let _ = self
                .tracker
                .for_each_matching(block_align(fill.addr), self.config.reward_all, |entry| {
                    entry.is_filled = true;
                    true
                });
        }
        fill.metadata
    }

    fn cycle_operate(&mut self, _queue: &mut dyn PrefetchQueue, _cycle: u64) {}

    fn prefetch_hit(&mut self, _cycle: u64, addr: u64, _ip: u64, metadata: u32) -> u32 {
        self.stats.prefetch_hits += 1;
        let _ = self
            .tracker
            .for_each_matching(block_align(addr), self.config.reward_all, |entry| {
                entry.pf_cache_hit = true;
                true
            });
        metadata
    }

    fn broadcast_bw(&mut self, level: u8) {
        debug_assert!(level < EPOCH_LEVELS);
        self.bw_level = level;
        self.stats.bw_epochs += 1;
    }

    fn broadcast_ipc(&mut self, level: u8) {
        debug_assert!(level < EPOCH_LEVELS);
        self.core_ipc = level;
        self.stats.ipc_epochs += 1;
    }

    fn broadcast_acc(&mut self, level: u8) {
        debug_assert!(level < EPOCH_LEVELS);
        self.acc_level = level;
        self.stats.acc_epochs += 1;
    }

    fn final_stats(&self) {
        info!(
            cpu = self.cpu,
            predict_called = self.stats.predict_called,
            issued = self.stats.issued,
            multi_deg = self.stats.multi_deg,
            no_prefetch = self.stats.no_prefetch,
            out_of_page = self.stats.out_of_page,
            tracker_hits = self.stats.tracker_hits,
            rewards = ?self.stats.rewards,
            train_called = self.stats.train_called,
            st_lookups = self.st.lookups,
            st_hits = self.st.hits,
            st_evictions = self.st.evictions,
            "Scooby final stats"
        );
        self.engine.dump_stats();
    }
}

impl std::fmt::Debug for ScoobyPrefetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoobyPrefetcher")
            .field("cpu", &self.cpu)
            .field("tracked", &self.tracker.len())
            .finish_non_exhaustive()
    }
}
