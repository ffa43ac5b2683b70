use std::collections::BTreeSet;
use std::fmt;

use crate::config::OptimizerConfig;
use crate::data::model::WaferDataset;
use crate::data::validate::validate;
use crate::error::RefineError;
use crate::stats;

use super::detect;
use super::ledger::{ReductionLedger, RemovalAction};
use super::naming;

// ---------------------------------------------------------------------------
// Controller vocabulary
// ---------------------------------------------------------------------------

/// User (or policy) answer at the confirmation gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Continue,
    Stop,
}

/// Why a campaign exhausted instead of converging.
#[derive(Debug, Clone, PartialEq)]
pub enum ExhaustReason {
    /// A pre-flight check failed; the validator's error is retained.
    Validation(RefineError),
    /// The per-campaign round budget is spent.
    RoundBudgetSpent { rounds: u32 },
    /// Removing more samples would cross the retention or count floor.
    RetentionFloor { retained: usize, original: usize },
}

impl fmt::Display for ExhaustReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExhaustReason::Validation(e) => write!(f, "validation failed: {e}"),
            ExhaustReason::RoundBudgetSpent { rounds } => {
                write!(f, "round budget spent after {rounds} round(s)")
            }
            ExhaustReason::RetentionFloor { retained, original } => {
                write!(f, "retention floor reached ({retained}/{original} samples left)")
            }
        }
    }
}

/// Terminal campaign status. Reported as a value, never raised.
#[derive(Debug, Clone, PartialEq)]
pub enum Termination {
    /// Uniformity met the target.
    Converged { uniformity: f64 },
    /// Best-effort result; no further reduction allowed.
    Exhausted { reason: ExhaustReason },
    /// Operator declined a removal; the pre-removal dataset is final.
    UserStopped,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Converged { uniformity } => {
                write!(f, "converged at {uniformity:.2}% uniformity")
            }
            Termination::Exhausted { reason } => write!(f, "exhausted: {reason}"),
            Termination::UserStopped => write!(f, "stopped by user"),
        }
    }
}

/// A removal awaiting confirmation. Indices refer to the controller's
/// current dataset.
#[derive(Debug, Clone)]
pub struct PendingRemoval {
    pub action: RemovalAction,
    pub indices: BTreeSet<usize>,
    /// Inlier fences when the detection method defines them.
    pub bounds: Option<(f64, f64)>,
}

/// What the owner should do next after re-entering the controller.
#[derive(Debug)]
pub enum Advance {
    /// Persist the dataset under `artifact_id`, re-run the simulation, and
    /// call [`RoundController::submit_result`] with the fresh uniformity.
    Restart {
        artifact_id: String,
        dataset: WaferDataset,
    },
    /// Interactive mode: ask the operator, then call
    /// [`RoundController::confirm`].
    NeedsConfirmation(PendingRemoval),
    /// Campaign over; the final dataset stays readable on the controller.
    Finished(Termination),
}

/// Batch-mode progress hook: `(current_round, max_rounds, message)`.
pub type ProgressHook = Box<dyn FnMut(u32, u32, &str)>;

/// Resumable controller states. The confirmation gate is an explicit state,
/// not a blocking wait, so a GUI or batch driver can resume a campaign from
/// anywhere, including after process restart if the owner kept the ledger
/// and dataset.
pub enum ControllerState {
    AwaitingResult,
    AwaitingConfirmation(PendingRemoval),
    Finished(Termination),
}

// ---------------------------------------------------------------------------
// RoundController
// ---------------------------------------------------------------------------

/// The round-based reduction state machine.
///
/// One controller owns one campaign: the simulation owner re-enters it with
/// each fresh result via [`submit_result`](Self::submit_result), applies the
/// returned [`Advance`], and loops until `Finished`. The dataset is replaced
/// wholesale on every removal; the displaced round remains traceable through
/// the ledger history and the persisted artifacts.
pub struct RoundController {
    config: OptimizerConfig,
    ledger: ReductionLedger,
    dataset: WaferDataset,
    base_name: String,
    state: ControllerState,
    progress: Option<ProgressHook>,
}

impl RoundController {
    /// Start a campaign over `dataset`. Fails fast on invalid configuration.
    pub fn new(
        dataset: WaferDataset,
        base_name: impl Into<String>,
        config: OptimizerConfig,
    ) -> Result<Self, RefineError> {
        config.validate()?;
        let ledger = ReductionLedger::new(
            dataset.len(),
            config.min_data_points,
            config.data_retention_threshold,
            config.max_outlier_rounds,
        );
        Ok(RoundController {
            config,
            ledger,
            dataset,
            base_name: base_name.into(),
            state: ControllerState::AwaitingResult,
            progress: None,
        })
    }

    /// Install the batch-mode progress hook, invoked after every transition.
    pub fn with_progress(mut self, hook: ProgressHook) -> Self {
        self.progress = Some(hook);
        self
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn ledger(&self) -> &ReductionLedger {
        &self.ledger
    }

    /// The currently retained dataset (final output once finished).
    pub fn dataset(&self) -> &WaferDataset {
        &self.dataset
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Feed the latest simulation result into the machine.
    ///
    /// Re-entry while suspended or finished is graceful: the pending
    /// [`Advance`] is re-issued. Detector failures propagate as errors; the
    /// validator screens data-quality issues first, so a detector error
    /// means a programming or configuration fault and aborts the campaign.
    pub fn submit_result(&mut self, uniformity_pct: f64) -> Result<Advance, RefineError> {
        match &self.state {
            ControllerState::Finished(t) => return Ok(Advance::Finished(t.clone())),
            ControllerState::AwaitingConfirmation(p) => {
                return Ok(Advance::NeedsConfirmation(p.clone()))
            }
            ControllerState::AwaitingResult => {}
        }

        if uniformity_pct <= self.config.uniformity_threshold {
            log::info!(
                "{}: uniformity {uniformity_pct:.2}% meets target {:.2}%",
                self.base_name,
                self.config.uniformity_threshold
            );
            return Ok(self.finish(Termination::Converged {
                uniformity: uniformity_pct,
            }));
        }

        if let Err(e) = validate(
            &self.dataset,
            self.config.min_data_points,
            self.config.wafer_radius(),
        ) {
            log::warn!("{}: {e}", self.base_name);
            return Ok(self.finish(Termination::Exhausted {
                reason: ExhaustReason::Validation(e),
            }));
        }

        if !self.ledger.can_continue() {
            let reason = if self.ledger.current_round() >= self.ledger.max_rounds() {
                ExhaustReason::RoundBudgetSpent {
                    rounds: self.ledger.current_round(),
                }
            } else {
                ExhaustReason::RetentionFloor {
                    retained: self.ledger.remaining_count(),
                    original: self.ledger.original_count(),
                }
            };
            return Ok(self.finish(Termination::Exhausted { reason }));
        }

        let values = self.dataset.thickness_values();
        let detection = detect::detect(
            &values,
            self.config.method,
            self.config.z_threshold,
            self.config.modified_z_threshold,
        )?;

        let pending = if detection.is_empty() {
            log::info!(
                "{}: no {} outliers left, removing {} lowest sample(s)",
                self.base_name,
                detection.method,
                self.config.min_removal_count
            );
            PendingRemoval {
                action: RemovalAction::MinRemoved,
                indices: self.dataset.lowest_thickness_indices(self.config.min_removal_count),
                bounds: None,
            }
        } else {
            log::info!(
                "{}: {} flagged {} outlier(s)",
                self.base_name,
                detection.method,
                detection.indices.len()
            );
            PendingRemoval {
                action: RemovalAction::OutlierRemoved,
                indices: detection.indices,
                bounds: detection.bounds,
            }
        };

        self.emit_progress(&match pending.action {
            RemovalAction::OutlierRemoved => {
                format!("flagged {} outlier(s)", pending.indices.len())
            }
            RemovalAction::MinRemoved => {
                format!("no outliers left, lowest {} sample(s) next", pending.indices.len())
            }
        });

        if self.ledger.removal_would_cross_floor(pending.indices.len()) {
            log::warn!(
                "{}: removing {} sample(s) would cross the retention floor",
                self.base_name,
                pending.indices.len()
            );
            return Ok(self.finish(Termination::Exhausted {
                reason: ExhaustReason::RetentionFloor {
                    retained: self.ledger.remaining_count(),
                    original: self.ledger.original_count(),
                },
            }));
        }

        if self.config.batch_mode {
            Ok(self.apply_removal(pending))
        } else {
            self.state = ControllerState::AwaitingConfirmation(pending.clone());
            Ok(Advance::NeedsConfirmation(pending))
        }
    }

    /// Resolve the confirmation gate. Returns `None` when no removal was
    /// pending (and the campaign is not finished).
    pub fn confirm(&mut self, decision: Decision) -> Option<Advance> {
        let pending = match std::mem::replace(&mut self.state, ControllerState::AwaitingResult) {
            ControllerState::AwaitingConfirmation(p) => p,
            ControllerState::Finished(t) => {
                self.state = ControllerState::Finished(t.clone());
                return Some(Advance::Finished(t));
            }
            ControllerState::AwaitingResult => return None,
        };

        match decision {
            Decision::Stop => Some(self.finish(Termination::UserStopped)),
            Decision::Continue => Some(self.apply_removal(pending)),
        }
    }

    // -- internals --

    /// Execute a confirmed removal: replace the dataset, record the round,
    /// derive the artifact id, and hand control back to the owner.
    fn apply_removal(&mut self, pending: PendingRemoval) -> Advance {
        let reduced = self.dataset.without_indices(&pending.indices);
        let resulting_uniformity = stats::summarize(&reduced.thickness_values()).uniformity;

        self.ledger
            .record(pending.action, pending.indices.clone(), resulting_uniformity);

        let artifact_id = naming::artifact_name(
            &self.base_name,
            pending.action,
            self.ledger.outlier_rounds(),
            self.ledger.min_removed_count(),
        );

        log::info!(
            "{}: round {} removed {} sample(s), {} remain → {artifact_id}",
            self.base_name,
            self.ledger.current_round(),
            pending.indices.len(),
            reduced.len()
        );

        self.dataset = reduced.clone();
        self.state = ControllerState::AwaitingResult;
        self.emit_progress(&format!(
            "removed {} sample(s), {} remain",
            pending.indices.len(),
            reduced.len()
        ));

        Advance::Restart {
            artifact_id,
            dataset: reduced,
        }
    }

    fn finish(&mut self, termination: Termination) -> Advance {
        log::info!("{}: {termination}", self.base_name);
        self.emit_progress(&termination.to_string());
        self.state = ControllerState::Finished(termination.clone());
        Advance::Finished(termination)
    }

    fn emit_progress(&mut self, message: &str) {
        if !self.config.batch_mode {
            return;
        }
        if let Some(hook) = &mut self.progress {
            hook(self.ledger.current_round(), self.ledger.max_rounds(), message);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
