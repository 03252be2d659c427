//! lineup-baseline: nearest-neighbour recognition engines.
//!
//! A reference [`RecognitionEngine`] for every variant. It keeps one feature
//! vector per training sample and predicts the label of the closest one.
//! Eigen and Fisher compare raw pixels and, like the real projections, only
//! accept samples of one size. LBPH compares spatial local binary pattern
//! histograms, accepts any size and can be updated in place.

pub mod lbp;

use image::GrayImage;
use lineup_core::engine::check_batch;
use lineup_core::{
    CanonicalSize, EngineError, EngineFactory, Prediction, RecognitionEngine, Variant,
};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Creates a [`NearestNeighborEngine`] for any variant.
#[derive(Debug, Clone, Copy, Default)]
pub struct BaselineFactory;

impl EngineFactory for BaselineFactory {
    fn create(&self, variant: Variant) -> Result<Box<dyn RecognitionEngine>, EngineError> {
        Ok(Box::new(NearestNeighborEngine::new(variant)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    label: i32,
    features: Vec<f32>,
}

/// Serialized model.
#[derive(Debug, Serialize, Deserialize)]
struct SavedModel {
    variant: Variant,
    sample_size: Option<CanonicalSize>,
    entries: Vec<Entry>,
}

pub struct NearestNeighborEngine {
    variant: Variant,
    /// Pixel variants only: the size every sample must have.
    sample_size: Option<CanonicalSize>,
    entries: Vec<Entry>,
}

impl NearestNeighborEngine {
    pub fn new(variant: Variant) -> Self {
        Self {
            variant,
            sample_size: None,
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn uses_pixels(&self) -> bool {
        !self.variant.supports_incremental_update()
    }

    fn features(&self, sample: &GrayImage) -> Result<Vec<f32>, EngineError> {
        if !self.uses_pixels() {
            return Ok(lbp::histogram(sample));
        }
        let actual = CanonicalSize::new(sample.width(), sample.height());
        if let Some(expected) = self.sample_size {
            if expected != actual {
                return Err(EngineError::SizeMismatch { expected, actual });
            }
        }
        Ok(sample.pixels().map(|p| p.0[0] as f32 / 255.0).collect())
    }

    fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        if self.uses_pixels() {
            a.iter()
                .zip(b.iter())
                .map(|(x, y)| (x - y).powi(2))
                .sum::<f32>()
                .sqrt()
        } else {
            lbp::chi_square(a, b)
        }
    }

    fn extract_all(&self, samples: &[GrayImage], labels: &[i32]) -> Result<Vec<Entry>, EngineError> {
        samples
            .iter()
            .zip(labels)
            .map(|(sample, &label)| {
                Ok(Entry {
                    label,
                    features: self.features(sample)?,
                })
            })
            .collect()
    }
}

impl RecognitionEngine for NearestNeighborEngine {
    fn variant(&self) -> Variant {
        self.variant
    }

    fn train(&mut self, samples: &[GrayImage], labels: &[i32]) -> Result<(), EngineError> {
        check_batch(samples, labels)?;
        let previous_size = self.sample_size;
        if self.uses_pixels() {
            let first = &samples[0];
            self.sample_size = Some(CanonicalSize::new(first.width(), first.height()));
        }
        match self.extract_all(samples, labels) {
            Ok(entries) => {
                self.entries = entries;
                tracing::debug!(variant = %self.variant, entries = self.entries.len(), "baseline model trained");
                Ok(())
            }
            Err(err) => {
                // Keep the previous model usable.
                self.sample_size = previous_size;
                Err(err)
            }
        }
    }

    fn update(&mut self, samples: &[GrayImage], labels: &[i32]) -> Result<(), EngineError> {
        if !self.variant.supports_incremental_update() {
            return Err(EngineError::UpdateUnsupported(self.variant));
        }
        check_batch(samples, labels)?;
        let entries = self.extract_all(samples, labels)?;
        self.entries.extend(entries);
        tracing::debug!(variant = %self.variant, entries = self.entries.len(), "baseline model updated");
        Ok(())
    }

    fn predict(&self, sample: &GrayImage) -> Result<Prediction, EngineError> {
        if self.entries.is_empty() {
            return Err(EngineError::Untrained("predict"));
        }
        let query = self.features(sample)?;

        let mut best = Prediction {
            label: Prediction::UNKNOWN_LABEL,
            confidence: f64::INFINITY,
        };
        for entry in &self.entries {
            let dist = self.distance(&query, &entry.features) as f64;
            if dist < best.confidence {
                best = Prediction {
                    label: entry.label,
                    confidence: dist,
                };
            }
        }
        Ok(best)
    }

    fn save(&self, path: &Path) -> Result<(), EngineError> {
        if self.entries.is_empty() {
            return Err(EngineError::Untrained("save"));
        }
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(
            &mut writer,
            &SavedModel {
                variant: self.variant,
                sample_size: self.sample_size,
                entries: self.entries.clone(),
            },
        )?;
        writer.flush()?;
        Ok(())
    }

    fn load(&mut self, path: &Path) -> Result<(), EngineError> {
        let saved: SavedModel = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        if saved.variant != self.variant {
            return Err(EngineError::VariantMismatch {
                expected: self.variant,
                found: saved.variant,
            });
        }
        self.sample_size = saved.sample_size;
        self.entries = saved.entries;
        tracing::debug!(variant = %self.variant, entries = self.entries.len(), "baseline model loaded");
        Ok(())
    }
}
