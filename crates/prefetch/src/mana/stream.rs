//! Stream Address Buffers and the Stream Tracker.
//!
//! A stream (SAB) is the replay window of one predicted fetch stream: the
//! last few spatial regions prefetched for it, plus a tail pointer at the
//! MANA row the next region will be chased from. The tracker owns all
//! streams in LRU order and answers, per observed block, whether any stream
//! already covers it and how many more regions must be chased to keep the
//! configured lookahead ahead of the fetch stream.

use std::collections::VecDeque;

use crate::tables::{RegionKind, RowPtr, SpatialRegion};

/// One stream address buffer.
#[derive(Debug, Clone)]
pub struct Stream {
    /// Pointer to the MANA row the tail region was read from.
    tail: Option<RowPtr>,
    /// The regions currently covering this stream, oldest first.
    entries: VecDeque<SpatialRegion>,
}

/// All streams, most recently used first.
pub struct StreamTracker {
    streams: Vec<Stream>,
    tracker_size: usize,
    lookahead: usize,
    region_kind: RegionKind,
}

/// Result of a tracker lookup or allocation: which stream matched and how
/// many regions to chase.
#[derive(Debug, Clone, Copy)]
pub struct Replay {
    /// Index of the stream (always 0 after MRU promotion).
    pub stream: usize,
    /// Number of regions to chase to restore the lookahead.
    pub length: usize,
}

impl StreamTracker {
    /// Creates `count` empty streams of `tracker_size` regions each.
    pub fn new(count: usize, tracker_size: usize, lookahead: usize, kind: RegionKind) -> Self {
        let dummy = Stream {
            tail: None,
            entries: VecDeque::new(),
        };
        Self {
            streams: vec![dummy; count],
            tracker_size,
            lookahead,
            region_kind: kind,
        }
    }

    /// Looks `addr` up in every stream's regions.
    ///
    /// The first region that covers `addr` with its footprint bit already
    /// observed promotes its stream to MRU; the replay length restores the
    /// lookahead relative to the match position. Covered-but-unobserved
    /// regions do not count as hits and the scan continues.
    pub fn lookup(&mut self, addr: u64) -> Option<Replay> {
        for s in 0..self.streams.len() {
            for (n, region) in self.streams[s].entries.iter().enumerate() {
                let Some(observed) = region.in_range(addr) else {
                    continue;
                };
                if !observed {
                    continue;
                }
                let stream = self.streams.remove(s);
                self.streams.insert(0, stream);
                let ahead = self.tracker_size - n;
                let length = self.lookahead.saturating_sub(ahead);
                return Some(Replay { stream: 0, length });
            }
        }
        None
    }

    /// Evicts the LRU stream and re-aims it at `tail`.
    ///
    /// The stream is filled with dummy regions that the replay loop replaces
    /// one by one; the replay length is the full lookahead.
    pub fn allocate(&mut self, tail: RowPtr) -> Replay {
        let mut stream = self.streams.pop().unwrap_or(Stream {
            tail: None,
            entries: VecDeque::new(),
        });
        stream.entries.clear();
        stream.tail = Some(tail);
        for _ in 0..self.tracker_size {
            stream
                .entries
                .push_back(SpatialRegion::with_bits(self.region_kind, 0, 0));
        }
        self.streams.insert(0, stream);
        Replay {
            stream: 0,
            length: self.lookahead,
        }
    }

    /// Pushes a freshly chased region into a stream, dropping its head.
    pub fn push_back(&mut self, stream: usize, region: SpatialRegion) {
        let entries = &mut self.streams[stream].entries;
        let _ = entries.pop_front();
        entries.push_back(region);
    }

    /// The tail row pointer of a stream.
    pub fn tail(&self, stream: usize) -> Option<RowPtr> {
        self.streams[stream].tail
    }

    /// Re-aims a stream's tail after a pointer chase.
    pub fn set_tail(&mut self, stream: usize, tail: Option<RowPtr>) {
        self.streams[stream].tail = tail;
    }
}

impl std::fmt::Debug for StreamTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamTracker")
            .field("streams", &self.streams.len())
            .field("lookahead", &self.lookahead)
            .finish_non_exhaustive()
    }
}
