// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that touches the disk on behalf of other layers:
//
//   checkpoint.rs  — model + optimizer + config + epoch/loss
//                    in one checkpoint directory (burn records),
//                    restored on startup to resume training
//
//   stats_cache.rs — per-channel mean / std of the training
//                    split, computed once and cached as JSON
//
//   metrics.rs     — epoch-level training loss appended to CSV
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Checkpointing)

/// Checkpoint saving and loading
pub mod checkpoint;

/// Normalisation statistics cache
pub mod stats_cache;

/// Training metrics CSV logger
pub mod metrics;
