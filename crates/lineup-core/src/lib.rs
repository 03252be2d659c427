//! lineup-core: face recognition model lifecycle.
//!
//! Selects an algorithm variant, validates and size-normalizes datasets,
//! trains or incrementally updates the model through a pluggable
//! [`RecognitionEngine`], and keeps the saved model consistent with the
//! active variant across restarts.

pub mod dataset;
pub mod engine;
pub mod lifecycle;
pub mod normalize;
pub mod types;
pub mod validate;
pub mod worker;

#[cfg(test)]
mod testing;

pub use dataset::{Dataset, LabeledSample, Person, Photo};
pub use engine::{EngineError, EngineFactory, RecognitionEngine};
pub use lifecycle::{
    IncrementalOutcome, LifecycleConfig, LifecycleError, ModelLifecycle, ModelStatus, TrainOutcome,
};
pub use types::{CanonicalSize, Prediction, ResizePolicy, Variant};
pub use worker::{spawn_worker, WorkerError, WorkerHandle};
