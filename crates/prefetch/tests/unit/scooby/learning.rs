//! Learning Scenarios.
//!
//! Drives the controller over a regular access pattern and checks that the
//! SARSA loop steers the greedy policy: a no-prefetch habit is punished
//! away and the stride matching the stream takes over.

use prefsim_core::config::{EngineKind, ScoobyConfig};
use prefsim_core::driver::CachePrefetcher;
use prefsim_core::scooby::ScoobyPrefetcher;

use crate::common::{MockQueue, access_from};

/// A deterministic basic-engine setup with a fast-evicting tracker: the
/// action list is `[no-prefetch, +1]`, exploration is off, Q starts at
/// zero, and rewards flow after only a few accesses.
fn trainer_config() -> ScoobyConfig {
    ScoobyConfig {
        engine: EngineKind::Basic,
        actions: vec![0, 1],
        alpha: 0.1,
        gamma: 0.5,
        epsilon: 0.0,
        zero_init: true,
        pt_size: 4,
        ..ScoobyConfig::default()
    }
}

fn addr(page: u64, offset: u32) -> u64 {
    (page << 12) + (u64::from(offset) << 6)
}

// ══════════════════════════════════════════════════════════
// 1. Greedy policy converges on the streaming stride
// ══════════════════════════════════════════════════════════

/// Streaming offsets 0,1,2,… on one page: the untrained policy prefers
/// the first action (no prefetch), collects its negative rewards, and
/// settles on the `+1` stride, prefetching the next block of the stream.
#[test]
fn greedy_action_converges_to_stream_stride() {
    let mut p = ScoobyPrefetcher::new(&trainer_config());
    p.initialize(0);
    let mut q = MockQueue::new();
    let (page, pc) = (0x1u64, 0x400u64);

    for _ in 0..10 {
        for offset in 0..=40u32 {
            let _ = p.cache_operate(&mut q, 0, &access_from(addr(page, offset), pc, true));
        }
    }

    // A trained replay of the stream prefetches one block ahead.
    q.clear();
    for offset in 0..=5u32 {
        let _ = p.cache_operate(&mut q, 0, &access_from(addr(page, offset), pc, true));
    }
    assert_eq!(q.addrs().last(), Some(&addr(page, 6)));

    // Learning actually ran, and both correct and penalty rewards flowed.
    let stats = p.stats();
    assert!(stats.train_called > 0);
    assert!(stats.issued > 0);
    assert!(stats.rewards[1] > 0, "correct-untimely rewards were earned");
    assert!(stats.rewards[3] > 0, "no-prefetch choices were punished");
}

/// With zero-initialized Q-values and exploration off, the very first
/// choices take the first action and issue nothing.
#[test]
fn untrained_policy_stays_quiet() {
    let mut p = ScoobyPrefetcher::new(&trainer_config());
    p.initialize(0);
    let mut q = MockQueue::new();

    for offset in 0..4u32 {
        let _ = p.cache_operate(&mut q, 0, &access_from(addr(0x2, offset), 0x400, true));
    }
    assert!(q.issued.is_empty());
    assert_eq!(p.stats().no_prefetch, 4);
}
