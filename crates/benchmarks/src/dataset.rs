// Copyright 2025 Fleet Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Synthetic, in-memory image classification dataset.
//!
//! Labels are materialized up front. Pixel data is regenerated from the seed
//! each time a sample is read, so memory stays flat at large image sizes.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Number of samples in the benchmark dataset.
pub const DATASET_SIZE: usize = 1000;

/// Number of classes labels are drawn from.
pub const NUM_CLASSES: usize = 1000;

/// Color channels per image.
pub const CHANNELS: usize = fleet_bench_core::config::IMAGE_CHANNELS;

/// Fixed-size synthetic dataset of `CHANNELS x image_size x image_size` images.
#[derive(Debug, Clone)]
pub struct SyntheticDataset {
    image_size: usize,
    seed: u64,
    labels: Vec<usize>,
}

impl SyntheticDataset {
    /// Create a dataset of `len` samples.
    pub fn new(len: usize, image_size: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let labels = (0..len).map(|_| rng.gen_range(0..NUM_CLASSES)).collect();
        Self {
            image_size,
            seed,
            labels,
        }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the dataset has no samples.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Side length of every image.
    pub fn image_size(&self) -> usize {
        self.image_size
    }

    /// Number of `f32` values in one image.
    pub fn sample_len(&self) -> usize {
        CHANNELS * self.image_size * self.image_size
    }

    /// Label of the sample at `index`.
    pub fn label(&self, index: usize) -> Option<usize> {
        self.labels.get(index).copied()
    }

    /// Append the pixels of sample `index` to `out`, channel-major.
    pub fn extend_image(&self, index: usize, out: &mut Vec<f32>) {
        let mut rng = StdRng::seed_from_u64(self.seed ^ (index as u64 + 1).rotate_left(32));
        out.extend((0..self.sample_len()).map(|_| rng.gen_range(-1.0f32..1.0)));
    }
}

/// A contiguous batch of images and their labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// Side length of every image in the batch.
    pub image_size: usize,
    /// Channel-major pixels, one image after another.
    pub images: Vec<f32>,
    /// One class index per image.
    pub labels: Vec<usize>,
}

impl Batch {
    /// Number of samples in the batch.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the batch has no samples.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Pixels of the image at `index`.
    pub fn image(&self, index: usize) -> &[f32] {
        let stride = CHANNELS * self.image_size * self.image_size;
        &self.images[index * stride..(index + 1) * stride]
    }
}

/// Iterates a dataset in batches, reshuffling at the start of every epoch
/// after the first.
#[derive(Debug)]
pub struct DataLoader<'a> {
    dataset: &'a SyntheticDataset,
    batch_size: usize,
    order: Vec<usize>,
    rng: StdRng,
    epochs_started: usize,
}

impl<'a> DataLoader<'a> {
    /// Create a loader. The first ordering is shuffled from `seed`.
    pub fn new(dataset: &'a SyntheticDataset, batch_size: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut order: Vec<usize> = (0..dataset.len()).collect();
        order.shuffle(&mut rng);
        Self {
            dataset,
            batch_size: batch_size.max(1),
            order,
            rng,
            epochs_started: 0,
        }
    }

    /// Batches per epoch, counting a short final batch.
    pub fn num_batches(&self) -> usize {
        self.dataset.len().div_ceil(self.batch_size)
    }

    /// First batch of the first ordering, or `None` for an empty dataset.
    pub fn first_batch(&self) -> Option<Batch> {
        let end = self.batch_size.min(self.order.len());
        (end > 0).then(|| build_batch(self.dataset, &self.order[..end]))
    }

    /// Start an epoch and iterate its batches.
    pub fn epoch(&mut self) -> Batches<'_> {
        if self.epochs_started > 0 {
            self.order.shuffle(&mut self.rng);
        }
        self.epochs_started += 1;
        Batches {
            dataset: self.dataset,
            chunks: self.order.chunks(self.batch_size),
        }
    }
}

/// Batches of a single epoch.
#[derive(Debug)]
pub struct Batches<'a> {
    dataset: &'a SyntheticDataset,
    chunks: std::slice::Chunks<'a, usize>,
}

impl Iterator for Batches<'_> {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        self.chunks
            .next()
            .map(|indices| build_batch(self.dataset, indices))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

fn build_batch(dataset: &SyntheticDataset, indices: &[usize]) -> Batch {
    let mut images = Vec::with_capacity(indices.len() * dataset.sample_len());
    let mut labels = Vec::with_capacity(indices.len());
    for &index in indices {
        dataset.extend_image(index, &mut images);
        labels.push(dataset.label(index).unwrap_or(0));
    }
    Batch {
        image_size: dataset.image_size(),
        images,
        labels,
    }
}
