//! Shared harness for driving prefetcher policies in tests.

use prefsim_core::driver::{AccessEvent, AccessKind, FillEvent, PrefetchQueue};

/// A recording stand-in for the cache's prefetch queue.
///
/// Captures every issued line; an optional capacity makes `prefetch_line`
/// refuse further issues, which exercises the abort-on-full paths.
#[derive(Debug, Default)]
pub struct MockQueue {
    /// Every accepted issue, as `(addr, fill_this_level, metadata)`.
    pub issued: Vec<(u64, bool, u32)>,
    /// When set, issues beyond this count are refused.
    pub capacity: Option<usize>,
}

impl MockQueue {
    /// An unbounded recording queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// A queue refusing issues beyond `capacity`.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            issued: Vec::new(),
            capacity: Some(capacity),
        }
    }

    /// The issued byte addresses, in order.
    pub fn addrs(&self) -> Vec<u64> {
        self.issued.iter().map(|&(addr, _, _)| addr).collect()
    }

    /// The issued block addresses, in order.
    pub fn blocks(&self) -> Vec<u64> {
        self.issued.iter().map(|&(addr, _, _)| addr >> 6).collect()
    }

    /// Forgets everything issued so far (the capacity stays).
    pub fn clear(&mut self) {
        self.issued.clear();
    }
}

impl PrefetchQueue for MockQueue {
    fn prefetch_line(&mut self, addr: u64, fill_this_level: bool, metadata: u32) -> bool {
        if let Some(capacity) = self.capacity {
            if self.issued.len() >= capacity {
                return false;
            }
        }
        self.issued.push((addr, fill_this_level, metadata));
        true
    }
}

/// A demand access with the given hit outcome.
pub fn access(addr: u64, cache_hit: bool) -> AccessEvent {
    AccessEvent {
        addr,
        ip: 0,
        cache_hit,
        prefetch_hit: false,
        kind: AccessKind::Load,
        metadata: 0,
    }
}

/// A demand access from a specific PC.
pub fn access_from(addr: u64, ip: u64, cache_hit: bool) -> AccessEvent {
    AccessEvent {
        ip,
        ..access(addr, cache_hit)
    }
}

/// A fill of `addr` evicting `evicted` (0 for an empty way).
pub fn fill(addr: u64, evicted: u64) -> FillEvent {
    FillEvent {
        addr,
        set: 0,
        way: 0,
        was_prefetch: false,
        evicted_addr: evicted,
        metadata: 0,
    }
}

/// A fill satisfying a prefetch request.
pub fn prefetch_fill(addr: u64, evicted: u64) -> FillEvent {
    FillEvent {
        was_prefetch: true,
        ..fill(addr, evicted)
    }
}

/// Installs a compact tracing subscriber so a test run can be inspected
/// with `RUST_LOG=debug`. Safe to call from several tests.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
