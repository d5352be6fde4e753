// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers, one use case per command.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No argument parsing here (that's Layer 1)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Fine-tuning with checkpoints, then evaluation
pub mod train_use_case;

// Evaluation of a saved model
pub mod evaluate_use_case;

// Normalisation statistics only
pub mod stats_use_case;
