//! Recognition engine capability.
//!
//! The lifecycle manager never looks inside a model. It hands grayscale
//! samples and labels to an engine, asks it for predictions, and tells it
//! where to save and load its state.

use crate::types::{CanonicalSize, Prediction, Variant};
use image::GrayImage;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("model is not trained; cannot {0}")]
    Untrained(&'static str),
    #[error("{0} models cannot be updated incrementally")]
    UpdateUnsupported(Variant),
    #[error("sample is {actual}, model expects {expected}")]
    SizeMismatch {
        expected: CanonicalSize,
        actual: CanonicalSize,
    },
    #[error("got {samples} samples but {labels} labels")]
    LabelCount { samples: usize, labels: usize },
    #[error("no samples given")]
    NoSamples,
    #[error("model file belongs to {found}, engine is {expected}")]
    VariantMismatch { expected: Variant, found: Variant },
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("model serialization: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("{0}")]
    Backend(String),
}

/// A trainable face recognizer bound to one variant.
pub trait RecognitionEngine: Send + Sync {
    fn variant(&self) -> Variant;

    /// Replace the model with one trained on `samples`.
    fn train(&mut self, samples: &[GrayImage], labels: &[i32]) -> Result<(), EngineError>;

    /// Fold `samples` into the existing model.
    fn update(&mut self, samples: &[GrayImage], labels: &[i32]) -> Result<(), EngineError>;

    fn predict(&self, sample: &GrayImage) -> Result<Prediction, EngineError>;

    fn save(&self, path: &Path) -> Result<(), EngineError>;

    fn load(&mut self, path: &Path) -> Result<(), EngineError>;
}

/// Creates a fresh engine for a variant.
pub trait EngineFactory: Send + Sync {
    fn create(&self, variant: Variant) -> Result<Box<dyn RecognitionEngine>, EngineError>;
}

impl<F> EngineFactory for F
where
    F: Fn(Variant) -> Result<Box<dyn RecognitionEngine>, EngineError> + Send + Sync,
{
    fn create(&self, variant: Variant) -> Result<Box<dyn RecognitionEngine>, EngineError> {
        self(variant)
    }
}

/// Check the sample/label pairing every engine call relies on.
pub fn check_batch(samples: &[GrayImage], labels: &[i32]) -> Result<(), EngineError> {
    if samples.is_empty() {
        return Err(EngineError::NoSamples);
    }
    if samples.len() != labels.len() {
        return Err(EngineError::LabelCount {
            samples: samples.len(),
            labels: labels.len(),
        });
    }
    Ok(())
}
