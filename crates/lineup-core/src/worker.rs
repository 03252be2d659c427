//! Dedicated thread for the model lifecycle.
//!
//! Training and prediction block on file I/O and on the engine. Async callers
//! send requests to a worker thread that owns a handle to the lifecycle and
//! await the reply, so the runtime is never blocked by a long training run.

use crate::dataset::Dataset;
use crate::lifecycle::{IncrementalOutcome, LifecycleError, ModelLifecycle, ModelStatus, TrainOutcome};
use crate::types::{Prediction, Variant};
use image::GrayImage;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

const REQUEST_QUEUE_DEPTH: usize = 4;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error("failed to spawn lifecycle thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("lifecycle thread exited")]
    ChannelClosed,
}

type Reply<T> = oneshot::Sender<Result<T, LifecycleError>>;

/// Messages sent from async callers to the worker thread.
enum WorkerRequest {
    Acquire {
        variant: Variant,
        reply: Reply<ModelStatus>,
    },
    SetVariant {
        variant: Option<Variant>,
        reply: Reply<ModelStatus>,
    },
    Reset {
        reply: Reply<()>,
    },
    TrainFull {
        dataset: Dataset,
        reply: Reply<TrainOutcome>,
    },
    TrainIncremental {
        path: PathBuf,
        label: i32,
        reply: Reply<IncrementalOutcome>,
    },
    Predict {
        image: GrayImage,
        reply: Reply<Prediction>,
    },
    Status {
        reply: Reply<ModelStatus>,
    },
}

/// Clone-safe handle to the worker thread.
#[derive(Clone)]
pub struct WorkerHandle {
    tx: mpsc::Sender<WorkerRequest>,
}

impl WorkerHandle {
    async fn call<T>(
        &self,
        request: impl FnOnce(Reply<T>) -> WorkerRequest,
    ) -> Result<T, WorkerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(request(reply_tx))
            .await
            .map_err(|_| WorkerError::ChannelClosed)?;
        Ok(reply_rx.await.map_err(|_| WorkerError::ChannelClosed)??)
    }

    pub async fn acquire(&self, variant: Variant) -> Result<ModelStatus, WorkerError> {
        self.call(|reply| WorkerRequest::Acquire { variant, reply }).await
    }

    pub async fn set_variant(&self, variant: Option<Variant>) -> Result<ModelStatus, WorkerError> {
        self.call(|reply| WorkerRequest::SetVariant { variant, reply }).await
    }

    pub async fn reset(&self) -> Result<(), WorkerError> {
        self.call(|reply| WorkerRequest::Reset { reply }).await
    }

    pub async fn train_full(&self, dataset: Dataset) -> Result<TrainOutcome, WorkerError> {
        self.call(|reply| WorkerRequest::TrainFull { dataset, reply }).await
    }

    pub async fn train_incremental(
        &self,
        path: PathBuf,
        label: i32,
    ) -> Result<IncrementalOutcome, WorkerError> {
        self.call(|reply| WorkerRequest::TrainIncremental { path, label, reply })
            .await
    }

    pub async fn predict(&self, image: GrayImage) -> Result<Prediction, WorkerError> {
        self.call(|reply| WorkerRequest::Predict { image, reply }).await
    }

    pub async fn status(&self) -> Result<ModelStatus, WorkerError> {
        self.call(|reply| WorkerRequest::Status { reply }).await
    }
}

/// Spawn the worker on a dedicated OS thread.
///
/// The thread exits once every handle has been dropped.
pub fn spawn_worker(lifecycle: Arc<ModelLifecycle>) -> Result<WorkerHandle, WorkerError> {
    let (tx, mut rx) = mpsc::channel::<WorkerRequest>(REQUEST_QUEUE_DEPTH);

    std::thread::Builder::new()
        .name("lineup-lifecycle".into())
        .spawn(move || {
            tracing::info!("lifecycle thread started");
            while let Some(req) = rx.blocking_recv() {
                handle_request(&lifecycle, req);
            }
            tracing::info!("lifecycle thread exiting");
        })
        .map_err(WorkerError::Spawn)?;

    Ok(WorkerHandle { tx })
}

fn handle_request(lifecycle: &ModelLifecycle, req: WorkerRequest) {
    // A dropped receiver means the caller gave up; nothing to report.
    match req {
        WorkerRequest::Acquire { variant, reply } => {
            let _ = reply.send(lifecycle.acquire(variant));
        }
        WorkerRequest::SetVariant { variant, reply } => {
            let result = lifecycle.set_variant(variant).map(|()| lifecycle.status());
            let _ = reply.send(result);
        }
        WorkerRequest::Reset { reply } => {
            let _ = reply.send(lifecycle.reset());
        }
        WorkerRequest::TrainFull { dataset, reply } => {
            let _ = reply.send(lifecycle.train_full(&dataset));
        }
        WorkerRequest::TrainIncremental { path, label, reply } => {
            let _ = reply.send(lifecycle.train_incremental(&path, label));
        }
        WorkerRequest::Predict { image, reply } => {
            let _ = reply.send(lifecycle.predict(&image));
        }
        WorkerRequest::Status { reply } => {
            let _ = reply.send(Ok(lifecycle.status()));
        }
    }
}
