use burn::data::dataset::Dataset;

use crate::domain::sample::ImageSample;

/// An immutable, ordered split of labelled images.
/// Implements Burn's Dataset trait so samples are addressed by index.
pub struct ImageDataset {
    samples: Vec<ImageSample>,
    classes: Vec<String>,
}

impl ImageDataset {
    pub fn new(samples: Vec<ImageSample>, classes: Vec<String>) -> Self {
        Self { samples, classes }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Number of samples per class index
    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.classes.len()];
        for s in &self.samples {
            if let Some(c) = counts.get_mut(s.label) {
                *c += 1;
            }
        }
        counts
    }
}

impl Dataset<ImageSample> for ImageDataset {
    fn get(&self, index: usize) -> Option<ImageSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_indexing() {
        let ds = ImageDataset::new(
            vec![
                ImageSample::new("a.png", 0),
                ImageSample::new("b.png", 1),
                ImageSample::new("c.png", 1),
            ],
            vec!["fake".into(), "real".into()],
        );
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.class_counts(), vec![1, 2]);
        assert_eq!(ds.get(1).unwrap().path.to_str(), Some("b.png"));
        assert!(ds.get(3).is_none());
    }
}
