// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// This layer handles everything from image files on disk
// all the way to device-ready tensor batches.
//
// The pipeline flows in this order:
//
//   data/train/<class>/*.jpg
//       │
//       ▼
//   ImageFolderLoader → lists (path, class index) samples
//       │
//       ▼
//   ImageDataset      → implements Burn's Dataset trait
//       │
//       ▼
//   DataLoader        → Burn loader: shuffle, batch, worker threads
//       │
//       ▼
//   ImageBatcher      → decodes in parallel, stacks tensors
//       │
//       ▼
//   ImageTransform    → resize, scale, normalise, CHW
//
// Each module is responsible for exactly one step.
//
// Reference: Burn Book §4 (Datasets and Dataloaders)
//            Rust Book §13 (Iterators and Closures)

/// Lists labelled images from a class-per-directory tree
pub mod loader;

/// Decode / augment / resize / normalise one image
pub mod transform;

/// Implements Burn's Dataset trait for image samples
pub mod dataset;

/// Stacks decoded images into tensor batches
pub mod batcher;

/// Burn DataLoader construction (shuffled or ordered)
pub mod dataloader;

#[cfg(test)]
pub(crate) mod fixtures;
