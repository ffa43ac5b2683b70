/// Reduction layer: outlier detection, campaign bookkeeping, and the
/// round state machine.
///
/// Architecture:
/// ```text
///   simulation result (uniformity)
///              │
///              ▼
///   ┌────────────────┐   thickness column   ┌──────────┐
///   │   controller    │ ───────────────────▶ │  detect   │
///   └────────────────┘                      └──────────┘
///       │        │
///       │        ▼
///       │   ┌──────────┐   counters, floors, history
///       │   │  ledger   │
///       │   └──────────┘
///       ▼
///   ┌──────────┐
///   │  naming   │  per-round artifact identifier
///   └──────────┘
/// ```
pub mod controller;
pub mod detect;
pub mod ledger;
pub mod naming;
