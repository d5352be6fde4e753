// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All network, training and inference code.
//
//   backbone.rs  — ResNet feature extractor (18/34/50 layouts),
//                  optional pretrained weights
//
//   model.rs     — DeepfakeClassifier: backbone + new head,
//                  forward pass and cross-entropy loss
//
//   trainer.rs   — epoch/batch loop with Adam, periodic
//                  checkpoints and resume
//
//   evaluator.rs — inference over the validation split,
//                  accuracy and confusion matrix
//
//   device.rs    — backend / device selection made once at startup
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            He et al. (2016) Deep Residual Learning

/// ResNet backbone without its classification layer
pub mod backbone;

/// Backbone plus binary classification head
pub mod model;

/// Full training loop with checkpointing
pub mod trainer;

/// Validation accuracy and confusion matrix
pub mod evaluator;

/// Compute backend selection
pub mod device;
