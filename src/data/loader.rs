// ============================================================
// Layer 4 — Image Folder Loader
// ============================================================
// Scans a split directory laid out as one sub-directory per class:
//
//   data/train/
//     fake/  img_0001.jpg  img_0002.png ...
//     real/  img_0001.jpg  ...
//
// Class directories are sorted by name and their position is the
// class index. Image files are filtered by extension and sorted
// so the sample order is stable between runs.
//
// Nothing is decoded here: samples are (path, label) pairs and
// pixels are read when a batch is built.
//
// Failure policy: a missing or empty directory is fatal. A split
// without images cannot be trained or evaluated on.
//
// Reference: Rust Book §9 (Error Handling)
//            Rust Book §12 (I/O and File Handling)

use anyhow::{bail, Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::sample::{ImageSample, Label};
use crate::domain::traits::SampleSource;

/// File extensions the `image` crate is able to decode
const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "bmp", "gif", "tif", "tiff", "webp", "ppm", "pgm",
];

/// Loads labelled samples from a class-per-directory tree.
/// Implements the SampleSource trait from Layer 3.
pub struct ImageFolderLoader {
    /// Split root, e.g. `data/train`
    root: PathBuf,
}

impl ImageFolderLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ensure_root(&self) -> Result<()> {
        if !self.root.is_dir() {
            bail!("Dataset directory '{}' does not exist", self.root.display());
        }
        Ok(())
    }
}

impl SampleSource for ImageFolderLoader {
    fn classes(&self) -> Result<Vec<String>> {
        self.ensure_root()?;

        let mut classes: Vec<String> = fs::read_dir(&self.root)
            .with_context(|| format!("Cannot read directory '{}'", self.root.display()))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .filter_map(|p| p.file_name().and_then(|s| s.to_str()).map(str::to_string))
            .collect();
        classes.sort();

        if classes.is_empty() {
            bail!("No class directories found in '{}'", self.root.display());
        }
        Ok(classes)
    }

    fn load_all(&self) -> Result<Vec<ImageSample>> {
        let classes = self.classes()?;
        let mut samples = Vec::new();

        for (class_idx, class_name) in classes.iter().enumerate() {
            let class_dir = self.root.join(class_name);
            let files = list_images(&class_dir)?;

            if files.is_empty() {
                bail!(
                    "Class directory '{}' contains no image files",
                    class_dir.display()
                );
            }

            tracing::info!("  Class {}: {} ({} images)", class_idx, class_name, files.len());
            samples.extend(files.into_iter().map(|p| ImageSample::new(p, class_idx)));
        }

        tracing::info!(
            "Loaded {} samples from '{}'",
            samples.len(),
            self.root.display()
        );
        Ok(samples)
    }
}

/// Sorted list of image files directly inside `dir`.
fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Cannot read directory '{}'", dir.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && has_image_extension(p))
        .collect();
    files.sort();
    Ok(files)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.iter().any(|known| e.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}

/// Check that a split has exactly the two classes the head predicts.
///
/// A class directory whose name does not match the label expected at
/// its index (Fake at 0, Real at 1) is only warned about: the index
/// mapping is positional and training still works, but the printed
/// confusion counts would use the wrong names.
pub fn check_class_layout(classes: &[String]) -> Result<()> {
    if classes.len() != Label::COUNT {
        bail!(
            "Expected {} class directories (fake, real), found {}: {:?}",
            Label::COUNT,
            classes.len(),
            classes
        );
    }

    for (idx, name) in classes.iter().enumerate() {
        if let Some(label) = Label::from_index(idx) {
            if !label.matches_dir(name) {
                tracing::warn!(
                    "Class directory '{}' has index {} which is reported as '{}'",
                    name, idx, label
                );
            }
        }
    }
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::write_split;

    #[test]
    fn test_classes_sorted_and_labelled_by_position() {
        let dir = tempfile::tempdir().unwrap();
        write_split(dir.path(), &[("real", 2), ("fake", 3)], 8);

        let loader  = ImageFolderLoader::new(dir.path());
        let classes = loader.classes().unwrap();
        assert_eq!(classes, vec!["fake".to_string(), "real".to_string()]);

        let samples = loader.load_all().unwrap();
        assert_eq!(samples.len(), 5);
        assert_eq!(samples.iter().filter(|s| s.label == 0).count(), 3);
        assert_eq!(samples.iter().filter(|s| s.label == 1).count(), 2);
        assert!(samples[0].path.starts_with(dir.path().join("fake")));
    }

    #[test]
    fn test_non_image_files_ignored() {
        let dir = tempfile::tempdir().unwrap();
        write_split(dir.path(), &[("fake", 1), ("real", 1)], 8);
        fs::write(dir.path().join("fake").join("notes.txt"), "hello").unwrap();

        let samples = ImageFolderLoader::new(dir.path()).load_all().unwrap();
        assert_eq!(samples.len(), 2);
    }

    #[test]
    fn test_missing_directory_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ImageFolderLoader::new(dir.path().join("nope"));
        assert!(loader.load_all().is_err());
    }

    #[test]
    fn test_empty_directory_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ImageFolderLoader::new(dir.path()).load_all().is_err());

        fs::create_dir(dir.path().join("fake")).unwrap();
        assert!(ImageFolderLoader::new(dir.path()).load_all().is_err());
    }

    #[test]
    fn test_class_layout() {
        let ok = vec!["fake".to_string(), "real".to_string()];
        assert!(check_class_layout(&ok).is_ok());

        let three = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert!(check_class_layout(&three).is_err());
    }
}
