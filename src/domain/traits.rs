// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// Traits let the application layer program against behaviour
// instead of concrete types:
//   - ImageFolderLoader implements SampleSource
//   - NormalizationStats implements Persistable (JSON cache)
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use std::path::Path;

use crate::domain::sample::ImageSample;

// ─── SampleSource ─────────────────────────────────────────────────────────────
/// Any component that can enumerate labelled samples.
pub trait SampleSource {
    /// Class names in class-index order
    fn classes(&self) -> Result<Vec<String>>;

    /// Load every available sample from this source.
    fn load_all(&self) -> Result<Vec<ImageSample>>;
}

// ─── Persistable ──────────────────────────────────────────────────────────────
/// Any value whose state can be saved to and restored from disk.
pub trait Persistable: Sized {
    /// Save this value to the given path, replacing any existing file
    fn save(&self, path: &Path) -> Result<()>;

    /// Load a value from the given path.
    fn load(path: &Path) -> Result<Self>;
}
