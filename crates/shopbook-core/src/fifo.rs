//! # FIFO Cost Allocator
//!
//! Derives the unit cost of a sale by consuming historical stock-receipt
//! batches oldest-first.
//!
//! ## How Allocation Works
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Sell 15 lines, receipts oldest-first:                                  │
//! │                                                                         │
//! │    Batch A: 12 lines @ 1.00   ──►  use 12  (cost 12.00)                │
//! │    Batch B:  6 lines @ 1.50   ──►  use  3  (cost  4.50)                │
//! │                                                                         │
//! │    unit cost = (12.00 + 4.50) / 15 = 1.10 per line                     │
//! │                                                                         │
//! │  If the batches run out before the request is satisfied, the result    │
//! │  is Insufficient { shortfall } - never a silent zero cost.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Depletion Modes
//! The legacy system re-walked the FULL original batch quantities on every
//! sale: allocation was a read-only projection that never subtracted what
//! earlier sales had already consumed. That approximation is kept available
//! as [`DepletionMode::LegacySnapshot`] for number-for-number compatibility
//! with historical reports. The default, [`DepletionMode::Cumulative`],
//! skips the lines previous sales consumed before allocating, which is the
//! behavior the numbers should have had all along. The divergence between
//! the two is covered by tests, not hidden.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// Receipt Batch
// =============================================================================

/// An immutable snapshot of one `received` stock movement.
///
/// The caller (the movement repository) supplies batches ordered strictly
/// by `created_at` ascending, ties broken by insertion order. The allocator
/// never mutates them.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReceiptBatch {
    /// Lines received in this batch (positive).
    pub quantity: i64,
    /// Cost per line paid for this batch.
    pub unit_cost: f64,
}

impl ReceiptBatch {
    /// Convenience constructor.
    #[inline]
    pub const fn new(quantity: i64, unit_cost: f64) -> Self {
        ReceiptBatch {
            quantity,
            unit_cost,
        }
    }
}

// =============================================================================
// Allocation Outcome
// =============================================================================

/// The tagged outcome of a cost allocation.
///
/// The legacy system buried a magic zero cost in the data when receipt
/// history fell short. Here the shortfall is explicit and the caller
/// decides policy (reject the transaction, or knowingly cost at zero).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Allocation {
    /// Every requested line was covered by receipt history.
    Allocated {
        /// Weighted-average cost per line for this sale.
        unit_cost: f64,
    },
    /// Receipt history ran out with `shortfall` lines still uncosted.
    Insufficient { shortfall: i64 },
}

impl Allocation {
    /// Returns the allocated unit cost, if the allocation succeeded.
    #[inline]
    pub fn unit_cost(&self) -> Option<f64> {
        match self {
            Allocation::Allocated { unit_cost } => Some(*unit_cost),
            Allocation::Insufficient { .. } => None,
        }
    }
}

// =============================================================================
// Depletion Mode
// =============================================================================

/// Strategy for how much of each batch the allocator may consume.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DepletionMode {
    /// True per-batch depletion: lines consumed by earlier sales are
    /// skipped before this allocation starts. Default.
    #[default]
    Cumulative,
    /// Legacy-compatible: re-walk full original batch quantities every
    /// call, ignoring prior consumption. Matches historical report numbers.
    LegacySnapshot,
}

// =============================================================================
// Allocation
// =============================================================================

/// Computes the FIFO weighted-average unit cost for a sale of
/// `quantity_needed` lines.
///
/// ## Arguments
/// * `batches` - receipt batches ordered oldest-first (`created_at` asc,
///   ties by insertion order)
/// * `quantity_needed` - lines being sold; must be positive (validated at
///   the input boundary by `validate_quantity`)
/// * `consumed_before` - total lines consumed by earlier sales of this
///   product; only honored in `Cumulative` mode
/// * `mode` - see [`DepletionMode`]
///
/// ## Algorithm
/// Walk the batches oldest-first, take `min(batch remainder, still needed)`
/// from each at that batch's unit cost, and stop once the request is
/// satisfied. On success the unit cost is `total_cost / quantity_needed`,
/// real-valued.
pub fn allocate_cost(
    batches: &[ReceiptBatch],
    quantity_needed: i64,
    consumed_before: i64,
    mode: DepletionMode,
) -> Allocation {
    debug_assert!(quantity_needed > 0, "quantity must be validated upstream");

    let mut skip = match mode {
        DepletionMode::Cumulative => consumed_before.max(0),
        DepletionMode::LegacySnapshot => 0,
    };
    let mut remaining = quantity_needed;
    let mut total_cost = 0.0f64;

    for batch in batches {
        if batch.quantity <= 0 {
            continue;
        }

        // Burn prior sales' consumption off the oldest batches first.
        let mut available = batch.quantity;
        if skip > 0 {
            let burned = skip.min(available);
            available -= burned;
            skip -= burned;
        }
        if available == 0 {
            continue;
        }

        let used = available.min(remaining);
        total_cost += used as f64 * batch.unit_cost;
        remaining -= used;

        if remaining == 0 {
            return Allocation::Allocated {
                unit_cost: total_cost / quantity_needed as f64,
            };
        }
    }

    Allocation::Insufficient {
        shortfall: remaining,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn batches(spec: &[(i64, f64)]) -> Vec<ReceiptBatch> {
        spec.iter().map(|&(q, c)| ReceiptBatch::new(q, c)).collect()
    }

    #[test]
    fn test_allocates_across_batches() {
        // [(10 @ 2), (5 @ 3)], need 12 → (10*2 + 2*3)/12 = 26/12
        let b = batches(&[(10, 2.0), (5, 3.0)]);
        let result = allocate_cost(&b, 12, 0, DepletionMode::Cumulative);
        let unit_cost = result.unit_cost().expect("should allocate");
        assert!((unit_cost - 26.0 / 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_batch_exact() {
        let b = batches(&[(10, 2.5)]);
        let result = allocate_cost(&b, 10, 0, DepletionMode::Cumulative);
        assert_eq!(result, Allocation::Allocated { unit_cost: 2.5 });
    }

    #[test]
    fn test_stops_early_at_oldest_batches() {
        // Need 4 from a 10-line oldest batch: the newer batch's cost must
        // not leak into the average.
        let b = batches(&[(10, 1.0), (100, 9.0)]);
        let result = allocate_cost(&b, 4, 0, DepletionMode::Cumulative);
        assert_eq!(result, Allocation::Allocated { unit_cost: 1.0 });
    }

    #[test]
    fn test_insufficient_history_is_signaled_not_zeroed() {
        // The legacy system fell back to a zero unit cost here. We signal.
        let b = batches(&[(10, 2.0), (5, 3.0)]);
        let result = allocate_cost(&b, 20, 0, DepletionMode::Cumulative);
        assert_eq!(result, Allocation::Insufficient { shortfall: 5 });
    }

    #[test]
    fn test_no_batches_at_all() {
        let result = allocate_cost(&[], 3, 0, DepletionMode::Cumulative);
        assert_eq!(result, Allocation::Insufficient { shortfall: 3 });
    }

    #[test]
    fn test_non_positive_batches_are_skipped() {
        let b = batches(&[(0, 5.0), (-4, 5.0), (10, 2.0)]);
        let result = allocate_cost(&b, 10, 0, DepletionMode::Cumulative);
        assert_eq!(result, Allocation::Allocated { unit_cost: 2.0 });
    }

    #[test]
    fn test_cumulative_skips_prior_consumption() {
        // 12 lines @ 1.00 then 6 @ 1.50. An earlier sale took 12 lines,
        // so a new 3-line sale must be costed entirely from batch B.
        let b = batches(&[(12, 1.0), (6, 1.5)]);
        let result = allocate_cost(&b, 3, 12, DepletionMode::Cumulative);
        assert_eq!(result, Allocation::Allocated { unit_cost: 1.5 });
    }

    #[test]
    fn test_legacy_snapshot_ignores_prior_consumption() {
        // Same history, legacy mode: prior sales are invisible, so the
        // 3-line sale is costed from batch A again at 1.00.
        let b = batches(&[(12, 1.0), (6, 1.5)]);
        let result = allocate_cost(&b, 3, 12, DepletionMode::LegacySnapshot);
        assert_eq!(result, Allocation::Allocated { unit_cost: 1.0 });
    }

    #[test]
    fn test_modes_agree_on_first_sale() {
        let b = batches(&[(10, 2.0), (5, 3.0)]);
        let cumulative = allocate_cost(&b, 12, 0, DepletionMode::Cumulative);
        let legacy = allocate_cost(&b, 12, 0, DepletionMode::LegacySnapshot);
        assert_eq!(cumulative, legacy);
    }

    #[test]
    fn test_cumulative_insufficient_after_depletion() {
        let b = batches(&[(12, 1.0), (6, 1.5)]);
        // 15 already sold, only 3 lines of history left.
        let result = allocate_cost(&b, 5, 15, DepletionMode::Cumulative);
        assert_eq!(result, Allocation::Insufficient { shortfall: 2 });
    }

    #[test]
    fn test_allocation_json_is_tagged() {
        let json = serde_json::to_value(Allocation::Allocated { unit_cost: 1.1 }).unwrap();
        assert_eq!(json["outcome"], "allocated");
        assert_eq!(json["unit_cost"], 1.1);

        let json = serde_json::to_value(Allocation::Insufficient { shortfall: 3 }).unwrap();
        assert_eq!(json["outcome"], "insufficient");
        assert_eq!(json["shortfall"], 3);
    }

    /// End-to-end fixture shared with the db layer: lines_per_carton=6,
    /// receive 12 @ 1.00 then 6 @ 1.50, sell 15 lines.
    #[test]
    fn test_worked_example_unit_cost() {
        let b = batches(&[(12, 1.0), (6, 1.5)]);
        let result = allocate_cost(&b, 15, 0, DepletionMode::Cumulative);
        let unit_cost = result.unit_cost().expect("should allocate");
        // (12*1.00 + 3*1.50) / 15 = 16.5 / 15 = 1.10
        assert!((unit_cost - 1.10).abs() < 1e-9);
    }
}
