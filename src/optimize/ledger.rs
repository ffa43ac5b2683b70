use std::collections::BTreeSet;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Removal actions and history
// ---------------------------------------------------------------------------

/// What a round removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalAction {
    /// Detector-flagged outliers.
    OutlierRemoved,
    /// Lowest-thickness samples, the fallback once detection runs dry.
    MinRemoved,
}

/// Audit record of one completed removal. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub round: u32,
    pub action: RemovalAction,
    pub removed_indices: BTreeSet<usize>,
    pub resulting_uniformity: f64,
    pub timestamp: SystemTime,
}

// ---------------------------------------------------------------------------
// ReductionLedger – campaign bookkeeping
// ---------------------------------------------------------------------------

/// Round counters, retention floors, and removal history for one campaign.
///
/// Pure state: no I/O. Counters only ever increase; `total_removed` never
/// exceeds `original_count`. Serializable so a suspended campaign can be
/// persisted and resumed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReductionLedger {
    original_count: usize,
    current_round: u32,
    outlier_rounds: u32,
    min_removed_count: u32,
    total_removed: usize,
    min_data_points: usize,
    retention_threshold: f64,
    max_outlier_rounds: u32,
    history: Vec<HistoryRecord>,
}

impl ReductionLedger {
    pub fn new(
        original_count: usize,
        min_data_points: usize,
        retention_threshold: f64,
        max_outlier_rounds: u32,
    ) -> Self {
        ReductionLedger {
            original_count,
            current_round: 0,
            outlier_rounds: 0,
            min_removed_count: 0,
            total_removed: 0,
            min_data_points,
            retention_threshold,
            max_outlier_rounds,
            history: Vec::new(),
        }
    }

    /// Whether another round may start. False once the round budget is spent,
    /// the retention floor is crossed, or too few samples remain.
    pub fn can_continue(&self) -> bool {
        self.current_round < self.max_outlier_rounds
            && self.retention_ratio() >= self.retention_threshold
            && self.remaining_count() >= self.min_data_points
    }

    /// Whether removing `count` more samples would cross a floor. Checked
    /// before a removal is offered.
    pub fn removal_would_cross_floor(&self, count: usize) -> bool {
        let remaining = self.remaining_count().saturating_sub(count);
        remaining < self.min_data_points
            || (remaining as f64 / self.original_count as f64) < self.retention_threshold
    }

    /// Append a history record and bump the counters for `action`.
    pub fn record(
        &mut self,
        action: RemovalAction,
        removed_indices: BTreeSet<usize>,
        resulting_uniformity: f64,
    ) {
        self.total_removed = (self.total_removed + removed_indices.len()).min(self.original_count);
        match action {
            RemovalAction::OutlierRemoved => self.outlier_rounds += 1,
            RemovalAction::MinRemoved => {
                self.min_removed_count += removed_indices.len() as u32;
            }
        }
        self.current_round += 1;

        self.history.push(HistoryRecord {
            round: self.current_round,
            action,
            removed_indices,
            resulting_uniformity,
            timestamp: SystemTime::now(),
        });
    }

    /// Fraction of the original dataset still present, in [0, 1].
    pub fn retention_ratio(&self) -> f64 {
        (self.original_count - self.total_removed) as f64 / self.original_count as f64
    }

    pub fn remaining_count(&self) -> usize {
        self.original_count - self.total_removed
    }

    pub fn original_count(&self) -> usize {
        self.original_count
    }

    pub fn current_round(&self) -> u32 {
        self.current_round
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_outlier_rounds
    }

    /// Completed outlier-removal rounds.
    pub fn outlier_rounds(&self) -> u32 {
        self.outlier_rounds
    }

    /// Total samples removed by minimum-value rounds.
    pub fn min_removed_count(&self) -> u32 {
        self.min_removed_count
    }

    pub fn total_removed(&self) -> usize {
        self.total_removed
    }

    pub fn history(&self) -> &[HistoryRecord] {
        &self.history
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn indices(v: &[usize]) -> BTreeSet<usize> {
        v.iter().copied().collect()
    }

    fn ledger() -> ReductionLedger {
        ReductionLedger::new(100, 10, 0.3, 20)
    }

    #[test]
    fn fresh_ledger_can_continue() {
        let l = ledger();
        assert!(l.can_continue());
        assert_eq!(l.retention_ratio(), 1.0);
        assert_eq!(l.remaining_count(), 100);
    }

    #[test]
    fn record_bumps_counters_and_history() {
        let mut l = ledger();
        l.record(RemovalAction::OutlierRemoved, indices(&[3, 7, 11]), 12.5);

        assert_eq!(l.current_round(), 1);
        assert_eq!(l.outlier_rounds(), 1);
        assert_eq!(l.min_removed_count(), 0);
        assert_eq!(l.total_removed(), 3);
        assert_eq!(l.history().len(), 1);
        assert_eq!(l.history()[0].round, 1);
        assert_eq!(l.history()[0].resulting_uniformity, 12.5);
    }

    #[test]
    fn min_removal_counts_samples_not_rounds() {
        let mut l = ledger();
        l.record(RemovalAction::MinRemoved, indices(&[0, 1]), 9.0);
        l.record(RemovalAction::MinRemoved, indices(&[4]), 8.0);

        assert_eq!(l.min_removed_count(), 3);
        assert_eq!(l.current_round(), 2);
        assert_eq!(l.outlier_rounds(), 0);
    }

    #[test]
    fn round_budget_stops_continuation() {
        let mut l = ReductionLedger::new(100, 10, 0.3, 1);
        l.record(RemovalAction::OutlierRemoved, indices(&[0]), 11.0);
        assert!(!l.can_continue());
    }

    #[test]
    fn retention_floor_stops_continuation() {
        let mut l = ReductionLedger::new(10, 2, 0.8, 20);
        l.record(RemovalAction::OutlierRemoved, indices(&[0, 1, 2]), 11.0);
        // 7 of 10 left → 0.7 < 0.8
        assert!(!l.can_continue());
    }

    #[test]
    fn min_count_floor_stops_continuation() {
        let mut l = ReductionLedger::new(12, 10, 0.1, 20);
        l.record(RemovalAction::OutlierRemoved, indices(&[0, 1, 2]), 11.0);
        // 9 left < min_data_points = 10
        assert!(!l.can_continue());
    }

    #[test]
    fn projection_gate_detects_floor_crossing() {
        let l = ReductionLedger::new(10, 8, 0.1, 20);
        assert!(!l.removal_would_cross_floor(2));
        assert!(l.removal_would_cross_floor(3));
    }

    #[test]
    fn total_removed_is_monotone() {
        let mut l = ledger();
        let mut prev = 0;
        for i in 0..5 {
            l.record(RemovalAction::OutlierRemoved, indices(&[i]), 10.0);
            assert!(l.total_removed() >= prev);
            prev = l.total_removed();
        }
    }
}
