//! Test doubles shared by the lifecycle and worker tests.

use crate::engine::{check_batch, EngineError, EngineFactory, RecognitionEngine};
use crate::types::{Prediction, Variant};
use image::{GrayImage, Luma};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// One engine call, with the sample sizes it saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Train { sizes: Vec<(u32, u32)>, labels: Vec<i32> },
    Update { sizes: Vec<(u32, u32)>, labels: Vec<i32> },
    Predict { size: (u32, u32) },
    Save,
    Load,
}

/// Engine that records every call and predicts the first label it knows.
struct RecordingEngine {
    variant: Variant,
    calls: Arc<Mutex<Vec<Call>>>,
    fail_train: bool,
    fail_save: Arc<AtomicBool>,
    labels: Vec<i32>,
}

fn sizes(samples: &[GrayImage]) -> Vec<(u32, u32)> {
    samples.iter().map(|s| s.dimensions()).collect()
}

impl RecognitionEngine for RecordingEngine {
    fn variant(&self) -> Variant {
        self.variant
    }

    fn train(&mut self, samples: &[GrayImage], labels: &[i32]) -> Result<(), EngineError> {
        check_batch(samples, labels)?;
        self.calls.lock().push(Call::Train {
            sizes: sizes(samples),
            labels: labels.to_vec(),
        });
        if self.fail_train {
            return Err(EngineError::Backend("training diverged".into()));
        }
        self.labels = labels.to_vec();
        Ok(())
    }

    fn update(&mut self, samples: &[GrayImage], labels: &[i32]) -> Result<(), EngineError> {
        if !self.variant.supports_incremental_update() {
            return Err(EngineError::UpdateUnsupported(self.variant));
        }
        check_batch(samples, labels)?;
        self.calls.lock().push(Call::Update {
            sizes: sizes(samples),
            labels: labels.to_vec(),
        });
        self.labels.extend_from_slice(labels);
        Ok(())
    }

    fn predict(&self, sample: &GrayImage) -> Result<Prediction, EngineError> {
        self.calls.lock().push(Call::Predict {
            size: sample.dimensions(),
        });
        let label = *self.labels.first().ok_or(EngineError::Untrained("predict"))?;
        Ok(Prediction {
            label,
            confidence: 1.5,
        })
    }

    fn save(&self, path: &Path) -> Result<(), EngineError> {
        self.calls.lock().push(Call::Save);
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(EngineError::Backend("disk full".into()));
        }
        std::fs::write(path, serde_json::to_vec(&self.labels)?)?;
        Ok(())
    }

    fn load(&mut self, path: &Path) -> Result<(), EngineError> {
        self.calls.lock().push(Call::Load);
        self.labels = serde_json::from_slice(&std::fs::read(path)?)?;
        Ok(())
    }
}

/// Factory handing out recording engines that share one call log.
#[derive(Clone, Default)]
pub struct RecordingFactory {
    calls: Arc<Mutex<Vec<Call>>>,
    created: Arc<Mutex<Vec<Variant>>>,
    fail_train: bool,
    fail_save: Arc<AtomicBool>,
    /// When set, every engine reports this variant whatever was requested.
    bound_variant: Option<Variant>,
}

impl RecordingFactory {
    pub fn failing_train() -> Self {
        Self {
            fail_train: true,
            ..Self::default()
        }
    }

    /// Factory whose engines are always bound to `variant`.
    pub fn bound_to(variant: Variant) -> Self {
        Self {
            bound_variant: Some(variant),
            ..Self::default()
        }
    }

    /// Make every later `save` on this factory's engines fail.
    pub fn fail_saves(&self, fail: bool) {
        self.fail_save.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Variants of every engine created so far, in order.
    pub fn created(&self) -> Vec<Variant> {
        self.created.lock().clone()
    }
}

impl EngineFactory for RecordingFactory {
    fn create(&self, variant: Variant) -> Result<Box<dyn RecognitionEngine>, EngineError> {
        self.created.lock().push(variant);
        Ok(Box::new(RecordingEngine {
            variant: self.bound_variant.unwrap_or(variant),
            calls: self.calls.clone(),
            fail_train: self.fail_train,
            fail_save: self.fail_save.clone(),
            labels: Vec::new(),
        }))
    }
}

pub fn gray(w: u32, h: u32, v: u8) -> GrayImage {
    GrayImage::from_pixel(w, h, Luma([v]))
}

/// Write a solid grayscale PNG into `dir` and return its path.
pub fn write_png(dir: &TempDir, name: &str, w: u32, h: u32, v: u8) -> PathBuf {
    let path = dir.path().join(name);
    gray(w, h, v).save(&path).unwrap();
    path
}
