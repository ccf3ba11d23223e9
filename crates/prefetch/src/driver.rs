//! Cache-Driver Interface.
//!
//! The cache simulator owns the clock and the prefetch queue; the
//! prefetchers are passive policies it invokes per event. This module
//! defines that seam:
//! 1. **Issue path:** [`PrefetchQueue::prefetch_line`], the bounded queue a
//!    policy pushes block addresses into.
//! 2. **Events:** demand accesses, fills, branches.
//! 3. **Policy trait:** [`CachePrefetcher`], the entry points the driver
//!    calls in program order (accesses, then fills, then one cycle tick).
//!
//! All per-CPU state lives in the policy object; the driver constructs one
//! policy per CPU and passes the current cycle on every call.

/// The cache's bounded prefetch-issue primitive.
pub trait PrefetchQueue {
    /// Requests a prefetch of the block containing `addr`.
    ///
    /// `fill_this_level` selects whether the line fills this cache level or
    /// only a lower one. Returns `false` when the queue is full, which
    /// aborts the caller's current issue burst; the policy retries on a
    /// later event.
    fn prefetch_line(&mut self, addr: u64, fill_this_level: bool, metadata: u32) -> bool;
}

/// Access type of a demand request, as reported by the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    /// Demand load (or instruction fetch for an instruction cache).
    Load,
    /// Read-for-ownership (store miss).
    Rfo,
    /// A prefetch arriving from an upper level.
    Prefetch,
    /// Writeback traffic.
    Writeback,
    /// Address-translation traffic.
    Translation,
}

/// Branch type reported to `branch_operate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchKind {
    /// Conditional direct branch.
    Conditional,
    /// Unconditional direct branch.
    Direct,
    /// Indirect branch.
    Indirect,
    /// Call.
    Call,
    /// Return.
    Return,
}

/// A demand access observed by the cache.
#[derive(Debug, Clone, Copy)]
pub struct AccessEvent {
    /// Byte address of the access.
    pub addr: u64,
    /// Program counter of the access.
    pub ip: u64,
    /// Whether the access hit in the cache.
    pub cache_hit: bool,
    /// Whether the hit line was originally brought in by a prefetch.
    pub prefetch_hit: bool,
    /// Access type.
    pub kind: AccessKind,
    /// Opaque driver metadata, passed through.
    pub metadata: u32,
}

/// A line installed into the cache.
#[derive(Debug, Clone, Copy)]
pub struct FillEvent {
    /// Byte address of the installed line.
    pub addr: u64,
    /// Set the line was installed into.
    pub set: u32,
    /// Way the line was installed into.
    pub way: u32,
    /// Whether the fill satisfied a prefetch request.
    pub was_prefetch: bool,
    /// Byte address of the evicted line, or 0 when the way was empty.
    pub evicted_addr: u64,
    /// Opaque driver metadata, passed through.
    pub metadata: u32,
}

/// A swappable prefetch policy bound to one CPU's cache.
///
/// Within one cycle the driver invokes zero or more `cache_operate` calls,
/// then zero or more `cache_fill` calls, then exactly one `cycle_operate`.
/// The epoch broadcasts and `prefetch_hit` exist for the data-side RL policy
/// and default to no-ops elsewhere.
pub trait CachePrefetcher {
    /// Called once after construction with the owning CPU id.
    fn initialize(&mut self, cpu: u32);

    /// Observes a branch. Instruction prefetchers here ignore branches; the
    /// hook exists for policies trained on the branch stream.
    fn branch_operate(&mut self, _ip: u64, _kind: BranchKind, _target: u64) {}

    /// Observes a demand access and may issue prefetches.
    fn cache_operate(
        &mut self,
        queue: &mut dyn PrefetchQueue,
        cycle: u64,
        access: &AccessEvent,
    ) -> u32;

    /// Observes a line being installed (and another evicted).
    fn cache_fill(&mut self, queue: &mut dyn PrefetchQueue, cycle: u64, fill: &FillEvent) -> u32;

    /// Advances internal state by one cycle; queued work may issue here.
    fn cycle_operate(&mut self, queue: &mut dyn PrefetchQueue, cycle: u64);

    /// Observes a demand hit on a line that a prefetch brought in.
    fn prefetch_hit(&mut self, _cycle: u64, _addr: u64, _ip: u64, metadata: u32) -> u32 {
        metadata
    }

    /// Epoch update of the observed DRAM bandwidth level.
    fn broadcast_bw(&mut self, _level: u8) {}

    /// Epoch update of the core IPC level.
    fn broadcast_ipc(&mut self, _level: u8) {}

    /// Epoch update of the cache-accuracy level.
    fn broadcast_acc(&mut self, _level: u8) {}

    /// Reports end-of-run statistics through the logging layer.
    fn final_stats(&self) {}
}
