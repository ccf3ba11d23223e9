//! Shared primitives used by every prefetcher model.
//!
//! This module collects the concerns the three policies have in common:
//! 1. **Addresses:** Block/page geometry constants and conversion helpers.
//! 2. **Bit fields:** Masking into configured widths, wrapped cycle-stamp
//!    arithmetic, and saturating confidence counters.

/// Block and page geometry constants and address conversion helpers.
pub mod addr;

/// Bit-field masks, wrapped time differences, and saturating counters.
pub mod bits;
