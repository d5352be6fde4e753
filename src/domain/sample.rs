// ============================================================
// Layer 3 — Sample and Label Domain Types
// ============================================================
// A sample is an (image, label) pair. The image stays on disk
// as a path until a batch needs its pixels.
//
// Labels follow the image-folder convention: class directories
// are sorted by name and their position becomes the class index.
// With the directories `fake/` and `real/` this gives:
//
//   0 → Fake
//   1 → Real
//
// Reference: Rust Book §6 (Enums and Pattern Matching)

use std::path::PathBuf;

/// Binary class of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    Fake,
    Real,
}

impl Label {
    /// Number of classes the classifier head predicts.
    pub const COUNT: usize = 2;

    /// All labels in class-index order.
    pub const ALL: [Label; 2] = [Label::Fake, Label::Real];

    /// Map a class index to its label.
    /// Returns None for anything outside {0, 1}.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Class index used in label tensors
    pub fn index(self) -> usize {
        match self {
            Label::Fake => 0,
            Label::Real => 1,
        }
    }

    /// Human readable class name
    pub fn name(self) -> &'static str {
        match self {
            Label::Fake => "Fake",
            Label::Real => "Real",
        }
    }

    /// True if a class directory name refers to this label
    /// (case-insensitive, so `fake/`, `Fake/` and `FAKE/` all match).
    pub fn matches_dir(self, dir_name: &str) -> bool {
        dir_name.eq_ignore_ascii_case(self.name())
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One labelled image on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSample {
    /// Path to the encoded image file
    pub path: PathBuf,

    /// Class index, i.e. the position of the class
    /// directory in sorted order
    pub label: usize,
}

impl ImageSample {
    pub fn new(path: impl Into<PathBuf>, label: usize) -> Self {
        Self { path: path.into(), label }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_round_trip() {
        for label in Label::ALL {
            assert_eq!(Label::from_index(label.index()), Some(label));
        }
        assert_eq!(Label::from_index(2), None);
    }

    #[test]
    fn test_dir_matching_ignores_case() {
        assert!(Label::Fake.matches_dir("fake"));
        assert!(Label::Real.matches_dir("REAL"));
        assert!(!Label::Real.matches_dir("fake"));
    }
}
