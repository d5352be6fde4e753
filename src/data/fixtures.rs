//! Small on-disk image datasets for tests.

use image::{Rgb, RgbImage};
use std::{fs, path::Path};

/// Write `count` PNG images of `size`x`size` pixels into
/// `root/<class>/` for every `(class, count)` pair.
///
/// Pixels follow a gradient that differs per class and per image,
/// so every image has non-zero variance in each channel.
pub fn write_split(root: &Path, classes: &[(&str, usize)], size: u32) {
    for (class_idx, (class, count)) in classes.iter().enumerate() {
        let dir = root.join(class);
        fs::create_dir_all(&dir).unwrap();

        for i in 0..*count {
            let img = RgbImage::from_fn(size, size, |x, y| {
                let base = (class_idx * 90 + i * 17) as u32;
                Rgb([
                    ((x * 255 / size.max(1) + base) % 256) as u8,
                    ((y * 255 / size.max(1) + base / 2) % 256) as u8,
                    (((x + y) * 127 / size.max(1) + base / 3) % 256) as u8,
                ])
            });
            img.save(dir.join(format!("img_{i:03}.png"))).unwrap();
        }
    }
}

/// Write a `train/` and `val/` pair of splits with the
/// classes `fake` and `real`.
pub fn write_dataset(root: &Path, train_per_class: usize, val_per_class: usize, size: u32) {
    write_split(
        &root.join("train"),
        &[("fake", train_per_class), ("real", train_per_class)],
        size,
    );
    write_split(
        &root.join("val"),
        &[("fake", val_per_class), ("real", val_per_class)],
        size,
    );
}

/// Ordered loader over a split written by `write_split`, with
/// identity normalisation.
pub fn split_loader<B: burn::prelude::Backend>(
    root:       &Path,
    image_size: usize,
    batch_size: usize,
    device:     &B::Device,
) -> crate::data::dataloader::ImageLoader<B> {
    use crate::data::{
        dataloader::{folder_loader, LoaderOptions},
        transform::ImageTransform,
    };
    use crate::domain::stats::NormalizationStats;

    let transform = ImageTransform::new(image_size, NormalizationStats::identity(), false).unwrap();
    folder_loader(root, transform, LoaderOptions::ordered(batch_size), device).unwrap()
}
