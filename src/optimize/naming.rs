use super::ledger::RemovalAction;

// ---------------------------------------------------------------------------
// Artifact naming
// ---------------------------------------------------------------------------

/// Derive the artifact identifier for a just-completed round.
///
/// `outlier_rounds` and `min_removed` are the ledger counters *after* the
/// round was recorded. The identifier is deterministic in its inputs; the
/// actual file write belongs to an [`ArtifactSink`](crate::data::writer::ArtifactSink).
///
/// * first outlier round          → `{base}_outlier_removed`
/// * outlier round n > 1          → `{base}_outlier_round_{n}`
/// * first min round, no outliers → `{base}_min_removed`
/// * later min rounds, no outliers→ `{base}_min_removed_{m}`
/// * min rounds after o outlier rounds
///                                → `{base}_error_deleted_{o}_time_min_removed_{m}`
pub fn artifact_name(
    base: &str,
    action: RemovalAction,
    outlier_rounds: u32,
    min_removed: u32,
) -> String {
    match action {
        RemovalAction::OutlierRemoved => {
            if outlier_rounds <= 1 {
                format!("{base}_outlier_removed")
            } else {
                format!("{base}_outlier_round_{outlier_rounds}")
            }
        }
        RemovalAction::MinRemoved => {
            if outlier_rounds > 0 {
                format!("{base}_error_deleted_{outlier_rounds}_time_min_removed_{min_removed}")
            } else if min_removed <= 1 {
                format!("{base}_min_removed")
            } else {
                format!("{base}_min_removed_{min_removed}")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
