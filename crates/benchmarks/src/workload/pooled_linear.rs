// Copyright 2025 Fleet Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Host reference workload: pooled features into a linear classifier.
//!
//! Each channel is average-pooled onto a `GRID x GRID` grid, the pooled
//! features feed a linear layer over `num_classes`, and the model trains with
//! softmax cross-entropy and SGD with momentum.

use fleet_bench_core::Device;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{Workload, WorkloadError, WorkloadLoader, WorkloadSpec};
use crate::dataset::{Batch, CHANNELS};

/// Name reported for this workload.
pub const NAME: &str = "pooled-linear";

/// Pooling grid side length.
pub const GRID: usize = 4;

/// Features per image after pooling.
pub const FEATURES: usize = CHANNELS * GRID * GRID;

/// SGD learning rate.
pub const LEARNING_RATE: f32 = 0.01;

/// SGD momentum.
pub const MOMENTUM: f32 = 0.9;

/// Loads [`PooledLinear`] on the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct PooledLinearLoader;

impl WorkloadLoader for PooledLinearLoader {
    fn name(&self) -> &str {
        NAME
    }

    fn supports(&self, device: Device) -> bool {
        device == Device::Host
    }

    fn load(&self, spec: &WorkloadSpec) -> Result<Box<dyn Workload>, WorkloadError> {
        if !self.supports(spec.device) {
            return Err(WorkloadError::UnsupportedDevice(spec.device));
        }
        Ok(Box::new(PooledLinear::new(
            spec.image_size,
            spec.num_classes,
            spec.seed,
        )))
    }
}

/// Average-pool plus linear classifier, trained in place.
#[derive(Debug, Clone)]
pub struct PooledLinear {
    image_size: usize,
    num_classes: usize,
    cell_sizes: Vec<f32>,
    weights: Vec<f32>,
    bias: Vec<f32>,
    weight_velocity: Vec<f32>,
    bias_velocity: Vec<f32>,
    weight_grad: Vec<f32>,
    bias_grad: Vec<f32>,
    features: Vec<f32>,
    probs: Vec<f32>,
}

impl PooledLinear {
    /// Build a model with uniformly initialized parameters.
    pub fn new(image_size: usize, num_classes: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let bound = 1.0 / (FEATURES as f32).sqrt();
        let mut init = |n: usize| -> Vec<f32> { (0..n).map(|_| rng.gen_range(-bound..bound)).collect() };
        let weights = init(num_classes * FEATURES);
        let bias = init(num_classes);

        let mut cell_sizes = vec![0.0; GRID * GRID];
        for y in 0..image_size {
            for x in 0..image_size {
                cell_sizes[cell_of(y, x, image_size)] += 1.0;
            }
        }

        Self {
            image_size,
            num_classes,
            cell_sizes,
            weight_velocity: vec![0.0; weights.len()],
            bias_velocity: vec![0.0; bias.len()],
            weight_grad: vec![0.0; weights.len()],
            bias_grad: vec![0.0; bias.len()],
            weights,
            bias,
            features: vec![0.0; FEATURES],
            probs: vec![0.0; num_classes],
        }
    }

    /// Average-pool one channel-major image into `out`.
    fn pool(&self, image: &[f32], out: &mut [f32]) {
        let plane = self.image_size * self.image_size;
        out.fill(0.0);
        for channel in 0..CHANNELS {
            let pixels = &image[channel * plane..(channel + 1) * plane];
            let cells = &mut out[channel * GRID * GRID..(channel + 1) * GRID * GRID];
            for (i, value) in pixels.iter().enumerate() {
                let (y, x) = (i / self.image_size, i % self.image_size);
                cells[cell_of(y, x, self.image_size)] += value;
            }
            for (cell, size) in cells.iter_mut().zip(&self.cell_sizes) {
                if *size > 0.0 {
                    *cell /= size;
                }
            }
        }
    }

    fn check_batch(&self, batch: &Batch) -> Result<(), WorkloadError> {
        if batch.is_empty() {
            return Err(WorkloadError::Shape {
                expected: "at least one sample".to_string(),
                actual: "empty batch".to_string(),
            });
        }
        if batch.image_size != self.image_size {
            return Err(WorkloadError::Shape {
                expected: format!("{}x{} images", self.image_size, self.image_size),
                actual: format!("{}x{} images", batch.image_size, batch.image_size),
            });
        }
        let expected_len = batch.len() * CHANNELS * self.image_size * self.image_size;
        if batch.images.len() != expected_len {
            return Err(WorkloadError::Shape {
                expected: format!("{} pixel values", expected_len),
                actual: format!("{} pixel values", batch.images.len()),
            });
        }
        if let Some(label) = batch.labels.iter().find(|&&l| l >= self.num_classes) {
            return Err(WorkloadError::Shape {
                expected: format!("labels below {}", self.num_classes),
                actual: format!("label {}", label),
            });
        }
        Ok(())
    }
}

impl Workload for PooledLinear {
    fn name(&self) -> &str {
        NAME
    }

    fn train_step(&mut self, batch: &Batch) -> Result<f32, WorkloadError> {
        self.check_batch(batch)?;

        self.weight_grad.fill(0.0);
        self.bias_grad.fill(0.0);
        let scale = 1.0 / batch.len() as f32;
        let mut features = std::mem::take(&mut self.features);
        let mut total_loss = 0.0f32;

        for (index, &label) in batch.labels.iter().enumerate() {
            self.pool(batch.image(index), &mut features);

            for (class, prob) in self.probs.iter_mut().enumerate() {
                let row = &self.weights[class * FEATURES..(class + 1) * FEATURES];
                *prob = self.bias[class] + row.iter().zip(&features).map(|(w, f)| w * f).sum::<f32>();
            }
            let max = self.probs.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            let mut norm = 0.0;
            for prob in self.probs.iter_mut() {
                *prob = (*prob - max).exp();
                norm += *prob;
            }
            for prob in self.probs.iter_mut() {
                *prob /= norm;
            }
            total_loss -= self.probs[label].max(f32::MIN_POSITIVE).ln();

            for (class, prob) in self.probs.iter().enumerate() {
                let target = if class == label { 1.0 } else { 0.0 };
                let grad = (prob - target) * scale;
                self.bias_grad[class] += grad;
                let row = &mut self.weight_grad[class * FEATURES..(class + 1) * FEATURES];
                for (g, f) in row.iter_mut().zip(&features) {
                    *g += grad * f;
                }
            }
        }
        self.features = features;

        sgd_momentum(&mut self.weights, &mut self.weight_velocity, &self.weight_grad);
        sgd_momentum(&mut self.bias, &mut self.bias_velocity, &self.bias_grad);

        let loss = total_loss * scale;
        if !loss.is_finite() {
            return Err(WorkloadError::NonFiniteLoss(loss));
        }
        Ok(loss)
    }
}

fn cell_of(y: usize, x: usize, image_size: usize) -> usize {
    (y * GRID / image_size) * GRID + x * GRID / image_size
}

fn sgd_momentum(params: &mut [f32], velocity: &mut [f32], grad: &[f32]) {
    for ((p, v), g) in params.iter_mut().zip(velocity.iter_mut()).zip(grad) {
        *v = MOMENTUM * *v + g;
        *p -= LEARNING_RATE * *v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{DataLoader, SyntheticDataset, NUM_CLASSES};

    fn spec(image_size: usize, device: Device) -> WorkloadSpec {
        WorkloadSpec {
            image_size,
            num_classes: NUM_CLASSES,
            device,
            seed: 0,
        }
    }

    fn batch(image_size: usize, samples: usize) -> Batch {
        let dataset = SyntheticDataset::new(samples, image_size, 11);
        DataLoader::new(&dataset, samples, 11).first_batch().unwrap()
    }

    #[test]
    fn test_pool_quadrants() {
        let model = PooledLinear::new(8, 10, 0);
        let mut image = vec![0.0f32; CHANNELS * 64];
        // Top-left 2x2 block of channel 0 maps to cell 0.
        for (y, x) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
            image[y * 8 + x] = 4.0;
        }
        // All of channel 2 set to 1.
        image[128..].fill(1.0);

        let mut out = vec![0.0; FEATURES];
        model.pool(&image, &mut out);

        assert_eq!(out[0], 4.0);
        assert!(out[1..16].iter().all(|&v| v == 0.0));
        assert!(out[32..].iter().all(|&v| (v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_pool_images_smaller_than_grid() {
        let model = PooledLinear::new(2, 10, 0);
        let image = vec![2.0f32; CHANNELS * 4];
        let mut out = vec![0.0; FEATURES];
        model.pool(&image, &mut out);

        assert!(out.iter().all(|v| *v == 0.0 || *v == 2.0));
        assert_eq!(out.iter().filter(|v| **v == 2.0).count(), CHANNELS * 4);
    }

    #[test]
    fn test_initial_loss_near_uniform() {
        let mut model = PooledLinear::new(8, NUM_CLASSES, 0);
        let loss = model.train_step(&batch(8, 16)).unwrap();
        let uniform = (NUM_CLASSES as f32).ln();
        assert!((loss - uniform).abs() < 0.5, "loss {} vs {}", loss, uniform);
    }

    #[test]
    fn test_loss_decreases_on_repeated_batch() {
        let mut model = PooledLinear::new(8, NUM_CLASSES, 0);
        let batch = batch(8, 8);

        let first = model.train_step(&batch).unwrap();
        let mut last = first;
        for _ in 0..50 {
            last = model.train_step(&batch).unwrap();
        }
        assert!(last < first, "loss did not decrease: {} -> {}", first, last);
    }

    #[test]
    fn test_rejects_wrong_image_size() {
        let mut model = PooledLinear::new(8, NUM_CLASSES, 0);
        let err = model.train_step(&batch(4, 2)).unwrap_err();
        assert!(matches!(err, WorkloadError::Shape { .. }));
    }

    #[test]
    fn test_rejects_out_of_range_label() {
        let mut model = PooledLinear::new(2, 10, 0);
        let batch = Batch {
            image_size: 2,
            images: vec![0.0; CHANNELS * 4],
            labels: vec![10],
        };
        let err = model.train_step(&batch).unwrap_err();
        assert!(err.to_string().contains("label 10"));
    }

    #[test]
    fn test_rejects_empty_batch() {
        let mut model = PooledLinear::new(2, 10, 0);
        let batch = Batch {
            image_size: 2,
            images: Vec::new(),
            labels: Vec::new(),
        };
        assert!(model.train_step(&batch).is_err());
    }

    #[test]
    fn test_loader_is_host_only() {
        let loader = PooledLinearLoader;
        assert_eq!(loader.name(), NAME);

        let workload = loader.load(&spec(8, Device::Host)).unwrap();
        assert_eq!(workload.name(), NAME);

        let err = loader.load(&spec(8, Device::Accelerator)).err().unwrap();
        assert!(matches!(err, WorkloadError::UnsupportedDevice(Device::Accelerator)));
    }
}
