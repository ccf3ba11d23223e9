//! Unit tests for the reinforcement-learning data prefetcher.

/// Prefetch-tracker FIFO and reward slots.
pub mod tracker;


/// Learning behavior of the engines through the controller.
pub mod learning;
