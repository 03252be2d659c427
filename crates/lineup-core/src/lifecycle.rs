//! Model lifecycle manager.
//!
//! Owns the one recognition engine of the process together with its variant,
//! trained flag, on-disk model path and cached canonical size. Every mutation
//! takes the state write lock; predictions share the read lock.
//!
//! Each saved model gets a JSON manifest next to it recording the variant that
//! produced it. A model file is only ever loaded into an engine of the same
//! variant; anything else on disk is deleted.

use crate::dataset::{self, Dataset, PhotoError};
use crate::engine::{EngineError, EngineFactory, RecognitionEngine};
use crate::normalize;
use crate::types::{CanonicalSize, Prediction, ResizePolicy, Variant};
use crate::validate;
use image::GrayImage;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_MODEL_FILE_NAME: &str = "trained_model.json";
const MANIFEST_SUFFIX: &str = ".meta.json";

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("configuration: {0}")]
    Configuration(String),
    #[error("{0} recognizer cannot be trained incrementally; run a full training instead")]
    UnsupportedOperation(Variant),
    #[error("no canonical size cached for the {0} model; retrain before predicting")]
    CanonicalSizeUnavailable(Variant),
    #[error(transparent)]
    Photo(#[from] PhotoError),
    #[error("engine: {0}")]
    Engine(#[from] EngineError),
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Where the trained model lives.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Application storage directory. Created if missing.
    pub storage_root: PathBuf,
    /// File name of the model inside `storage_root`.
    pub model_file_name: String,
}

impl LifecycleConfig {
    pub fn new(storage_root: impl Into<PathBuf>) -> Self {
        Self {
            storage_root: storage_root.into(),
            model_file_name: DEFAULT_MODEL_FILE_NAME.to_string(),
        }
    }

    pub fn model_path(&self) -> PathBuf {
        self.storage_root.join(&self.model_file_name)
    }

    fn validate(&self) -> Result<(), LifecycleError> {
        if self.storage_root.as_os_str().is_empty() {
            return Err(LifecycleError::Configuration("storage root is not set".into()));
        }
        let name = Path::new(&self.model_file_name);
        if self.model_file_name.is_empty() || name.file_name() != Some(name.as_os_str()) {
            return Err(LifecycleError::Configuration(format!(
                "model file name {:?} must be a bare file name",
                self.model_file_name
            )));
        }
        std::fs::create_dir_all(&self.storage_root).map_err(|e| {
            LifecycleError::Configuration(format!(
                "storage root {} is unusable: {e}",
                self.storage_root.display()
            ))
        })
    }
}

/// Snapshot of the model state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelStatus {
    pub variant: Variant,
    pub trained: bool,
    pub model_path: PathBuf,
    /// Size fixed-size variants resize prediction inputs to. `None` until a
    /// full training run happens in this process.
    pub canonical_size: Option<CanonicalSize>,
}

/// What a full training call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainOutcome {
    Trained {
        samples: usize,
        canonical_size: Option<CanonicalSize>,
    },
    /// The dataset held no photos; the model was reset.
    Reset,
}

/// What an incremental training call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncrementalOutcome {
    /// No model existed; one was trained from the single sample.
    Bootstrapped,
    Updated,
    /// The image could not be decoded; nothing changed.
    Skipped,
}

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    variant: Variant,
}

struct ModelState {
    variant: Variant,
    trained: bool,
    engine: Box<dyn RecognitionEngine>,
    canonical_size: Option<CanonicalSize>,
}

/// The face model of the application.
///
/// Build one with [`ModelLifecycle::open`] at startup and share it (e.g. in an
/// `Arc`) with everything that trains or predicts.
pub struct ModelLifecycle {
    factory: Box<dyn EngineFactory>,
    model_path: PathBuf,
    manifest_path: PathBuf,
    state: RwLock<ModelState>,
}

impl ModelLifecycle {
    /// Create the lifecycle for `variant` and restore a saved model if one
    /// produced by the same variant exists.
    pub fn open(
        config: &LifecycleConfig,
        variant: Variant,
        factory: impl EngineFactory + 'static,
    ) -> Result<Self, LifecycleError> {
        config.validate()?;
        let model_path = config.model_path();
        let mut manifest_os = model_path.clone().into_os_string();
        manifest_os.push(MANIFEST_SUFFIX);

        let engine = create_engine(&factory, variant)?;
        let lifecycle = Self {
            factory: Box::new(factory),
            model_path,
            manifest_path: PathBuf::from(manifest_os),
            state: RwLock::new(ModelState {
                variant,
                trained: false,
                engine,
                canonical_size: None,
            }),
        };

        {
            let mut state = lifecycle.state.write();
            lifecycle.restore(&mut state)?;
        }
        tracing::info!(
            variant = %variant,
            path = %lifecycle.model_path.display(),
            trained = lifecycle.is_trained(),
            "model lifecycle opened"
        );
        Ok(lifecycle)
    }

    /// Make `variant` the active one and sync with the model on disk.
    ///
    /// A different variant discards the current model, on disk and in memory.
    /// Afterwards any saved model of the active variant is (re)loaded.
    pub fn acquire(&self, variant: Variant) -> Result<ModelStatus, LifecycleError> {
        let mut state = self.state.write();
        if state.variant != variant {
            tracing::info!(from = %state.variant, to = %variant, "variant changed on acquire");
            self.switch_locked(&mut state, variant)?;
        }
        self.restore(&mut state)?;
        Ok(self.status_locked(&state))
    }

    /// Bind a new engine for `variant` and reset the model. `None` is a no-op.
    ///
    /// The reset happens even when `variant` is already active.
    pub fn set_variant(&self, variant: Option<Variant>) -> Result<(), LifecycleError> {
        let Some(variant) = variant else {
            return Ok(());
        };
        let mut state = self.state.write();
        tracing::info!(from = %state.variant, to = %variant, "switching variant");
        self.switch_locked(&mut state, variant)
    }

    /// Delete the saved model and mark the model untrained.
    pub fn reset(&self) -> Result<(), LifecycleError> {
        let mut state = self.state.write();
        self.reset_locked(&mut state)
    }

    /// Train a fresh model on the whole dataset.
    ///
    /// A dataset without photos resets the model instead. Fixed-size variants
    /// resize every sample to the batch canonical size, which is cached for
    /// later predictions in this process.
    pub fn train_full(&self, dataset: &Dataset) -> Result<TrainOutcome, LifecycleError> {
        let mut state = self.state.write();

        if !validate::is_valid(dataset) {
            tracing::info!(people = dataset.len(), "dataset has no photos; resetting model");
            self.reset_locked(&mut state)?;
            return Ok(TrainOutcome::Reset);
        }

        let variant = state.variant;
        tracing::info!(variant = %variant, people = dataset.len(), "training");
        let mut samples = dataset.load_samples()?;

        let canonical_size = match variant.resize_policy() {
            ResizePolicy::Canonical => normalize::normalize_batch(&mut samples),
            ResizePolicy::Native => None,
        };

        let count = samples.len();
        let (images, labels): (Vec<GrayImage>, Vec<i32>) =
            samples.into_iter().map(|s| (s.image, s.label)).unzip();
        tracing::debug!(?labels, "training labels");

        state.engine.train(&images, &labels)?;
        self.persist(&state)?;
        state.canonical_size = canonical_size;
        state.trained = true;

        tracing::info!(
            variant = %variant,
            samples = count,
            canonical_size = ?canonical_size,
            "training done"
        );
        Ok(TrainOutcome::Trained {
            samples: count,
            canonical_size,
        })
    }

    /// Add one face to the model, training a new one if none exists.
    ///
    /// Only variants with incremental update support accept this. An image
    /// that cannot be decoded is skipped without touching the model.
    pub fn train_incremental(
        &self,
        sample_path: &Path,
        label: i32,
    ) -> Result<IncrementalOutcome, LifecycleError> {
        let mut state = self.state.write();
        let variant = state.variant;
        if !variant.supports_incremental_update() {
            return Err(LifecycleError::UnsupportedOperation(variant));
        }

        let image = match dataset::load_gray(sample_path) {
            Ok(image) if image.width() > 0 && image.height() > 0 => image,
            Ok(_) => {
                tracing::warn!(path = %sample_path.display(), "skipping empty face image");
                return Ok(IncrementalOutcome::Skipped);
            }
            Err(err) => {
                tracing::warn!(path = %sample_path.display(), error = %err, "skipping undecodable face image");
                return Ok(IncrementalOutcome::Skipped);
            }
        };

        let samples = [image];
        let labels = [label];
        let outcome = if state.trained {
            state.engine.update(&samples, &labels)?;
            IncrementalOutcome::Updated
        } else {
            state.engine.train(&samples, &labels)?;
            IncrementalOutcome::Bootstrapped
        };
        self.persist(&state)?;
        state.trained = true;

        tracing::info!(
            variant = %variant,
            label,
            path = %sample_path.display(),
            ?outcome,
            "incremental training done"
        );
        Ok(outcome)
    }

    /// Predict who `image` shows.
    ///
    /// Without a trained model the result is [`Prediction::unknown`].
    pub fn predict(&self, image: &GrayImage) -> Result<Prediction, LifecycleError> {
        let state = self.state.read();
        if !state.trained {
            tracing::debug!(variant = %state.variant, "no trained model; prediction unknown");
            return Ok(Prediction::unknown());
        }

        let prediction = match state.variant.resize_policy() {
            ResizePolicy::Native => state.engine.predict(image)?,
            ResizePolicy::Canonical => {
                let size = state
                    .canonical_size
                    .ok_or(LifecycleError::CanonicalSizeUnavailable(state.variant))?;
                state.engine.predict(&normalize::resize_to(image, size))?
            }
        };

        tracing::info!(
            variant = %state.variant,
            label = prediction.label,
            confidence = prediction.confidence,
            "prediction"
        );
        Ok(prediction)
    }

    pub fn status(&self) -> ModelStatus {
        self.status_locked(&self.state.read())
    }

    pub fn variant(&self) -> Variant {
        self.state.read().variant
    }

    pub fn is_trained(&self) -> bool {
        self.state.read().trained
    }

    pub fn canonical_size(&self) -> Option<CanonicalSize> {
        self.state.read().canonical_size
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    fn status_locked(&self, state: &ModelState) -> ModelStatus {
        ModelStatus {
            variant: state.variant,
            trained: state.trained,
            model_path: self.model_path.clone(),
            canonical_size: state.canonical_size,
        }
    }

    fn switch_locked(&self, state: &mut ModelState, variant: Variant) -> Result<(), LifecycleError> {
        state.engine = create_engine(self.factory.as_ref(), variant)?;
        state.variant = variant;
        self.reset_locked(state)
    }

    fn reset_locked(&self, state: &mut ModelState) -> Result<(), LifecycleError> {
        remove_if_exists(&self.model_path)?;
        remove_if_exists(&self.manifest_path)?;
        state.trained = false;
        state.canonical_size = None;
        tracing::info!(variant = %state.variant, path = %self.model_path.display(), "model reset");
        Ok(())
    }

    /// Load the saved model if it belongs to the active variant; delete it otherwise.
    fn restore(&self, state: &mut ModelState) -> Result<(), LifecycleError> {
        if !self.model_path.exists() {
            return Ok(());
        }
        match self.read_manifest() {
            Some(found) if found == state.variant => {
                state.engine.load(&self.model_path)?;
                state.trained = true;
                tracing::debug!(variant = %found, path = %self.model_path.display(), "model loaded");
                Ok(())
            }
            found => {
                tracing::warn!(
                    active = %state.variant,
                    found = ?found,
                    path = %self.model_path.display(),
                    "saved model was not produced by the active variant; discarding"
                );
                self.reset_locked(state)
            }
        }
    }

    fn persist(&self, state: &ModelState) -> Result<(), LifecycleError> {
        state.engine.save(&self.model_path)?;
        let manifest = serde_json::to_vec(&Manifest {
            variant: state.variant,
        })
        .map_err(|source| LifecycleError::Manifest {
            path: self.manifest_path.clone(),
            source,
        })?;
        std::fs::write(&self.manifest_path, manifest).map_err(|source| LifecycleError::Io {
            path: self.manifest_path.clone(),
            source,
        })
    }

    fn read_manifest(&self) -> Option<Variant> {
        let bytes = std::fs::read(&self.manifest_path).ok()?;
        match serde_json::from_slice::<Manifest>(&bytes) {
            Ok(manifest) => Some(manifest.variant),
            Err(err) => {
                tracing::warn!(path = %self.manifest_path.display(), error = %err, "unreadable model manifest");
                None
            }
        }
    }
}

/// Create an engine and check it is bound to the requested variant.
fn create_engine(
    factory: &dyn EngineFactory,
    variant: Variant,
) -> Result<Box<dyn RecognitionEngine>, LifecycleError> {
    let engine = factory.create(variant)?;
    if engine.variant() != variant {
        return Err(EngineError::VariantMismatch {
            expected: variant,
            found: engine.variant(),
        }
        .into());
    }
    Ok(engine)
}

fn remove_if_exists(path: &Path) -> Result<(), LifecycleError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(LifecycleError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
