//! Asynchronous texture load pipeline
//!
//! Orchestrates decode (worker pool) → native object creation (GPU-owning
//! thread) → callback invocation. Decode jobs carry copies of the handle's
//! identity fields and never touch registry state; all registry and backend
//! mutation happens in [`TextureLoader::pump`] and [`TextureLoader::load_sync`],
//! which the caller runs on the thread that owns the GPU context.
//!
//! Cancellation is cooperative: the pause flag is tested at submission and
//! again at completion, so a load that finishes while the engine is paused
//! never creates a GPU object even if its decode succeeded.

use std::sync::Arc;
use std::thread;

use crossbeam::channel::{unbounded, Receiver, Sender};
use thiserror::Error;

use crate::assets::{AssetError, ImageData, ResourceSource, ResourceType};
use crate::config::TextureCacheConfig;
use crate::foundation::run_state::RunState;
use crate::foundation::time::Clock;
use crate::render::backend::{BackendError, GpuBackend};
use crate::render::texture::handle::{
    LoadCallback, TextureFlags, TextureKey, TextureOptions, TextureState,
};
use crate::render::texture::native::NativeTexture;
use crate::render::texture::registry::TextureRegistry;

/// Texture load errors
#[derive(Debug, Error)]
pub enum TextureError {
    /// The key does not refer to a live handle
    #[error("Unknown texture key")]
    UnknownKey,

    /// The load was cancelled because the engine is paused
    ///
    /// Not a persistent failure: the caller may request the load again after
    /// the engine resumes.
    #[error("Load cancelled: engine is paused")]
    Cancelled,

    /// A synchronous load was requested while an async load is in flight
    #[error("A load is already in flight for this texture")]
    LoadInProgress,

    /// Resource lookup or decode failed
    #[error(transparent)]
    Asset(#[from] AssetError),

    /// The GPU backend rejected the image
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Decode work item; carries copies only, never registry references
struct DecodeJob {
    key: TextureKey,
    path: String,
    resource_type: ResourceType,
    options: TextureOptions,
}

/// Result of a decode job, marshaled back to the GPU-owning thread
struct DecodeOutcome {
    key: TextureKey,
    result: Result<ImageData, AssetError>,
}

struct Worker {
    id: usize,
    thread: thread::JoinHandle<()>,
}

impl Worker {
    fn new(
        id: usize,
        source: Arc<dyn ResourceSource>,
        job_rx: Receiver<DecodeJob>,
        outcome_tx: Sender<DecodeOutcome>,
    ) -> Self {
        let thread = thread::spawn(move || {
            log::debug!("Decode worker {} started", id);
            while let Ok(job) = job_rx.recv() {
                let key = job.key;
                let result = decode_job(source.as_ref(), &job);
                if outcome_tx.send(DecodeOutcome { key, result }).is_err() {
                    break;
                }
            }
            log::debug!("Decode worker {} stopped", id);
        });

        Worker { id, thread }
    }
}

/// Read and decode one resource; pure CPU work, safe on any thread
fn decode_job(source: &dyn ResourceSource, job: &DecodeJob) -> Result<ImageData, AssetError> {
    let bytes = source.read_resource(&job.path, job.resource_type)?;
    let mut pixels = ImageData::decode(&bytes, job.resource_type)?;
    if job.options.flags.contains(TextureFlags::PREMULTIPLY_ALPHA) {
        pixels.premultiply_alpha();
    }
    Ok(pixels)
}

/// Asynchronous texture loader with a decode worker pool
pub struct TextureLoader {
    job_tx: Sender<DecodeJob>,
    outcome_rx: Receiver<DecodeOutcome>,
    workers: Vec<Worker>,
    source: Arc<dyn ResourceSource>,
}

impl TextureLoader {
    /// Create a loader reading through `source` with the configured number of
    /// decode workers (always at least one).
    pub fn new(config: &TextureCacheConfig, source: Arc<dyn ResourceSource>) -> Self {
        let (job_tx, job_rx) = unbounded::<DecodeJob>();
        let (outcome_tx, outcome_rx) = unbounded::<DecodeOutcome>();

        let worker_count = config.decode_threads.max(1);
        let workers = (0..worker_count)
            .map(|id| Worker::new(id, Arc::clone(&source), job_rx.clone(), outcome_tx.clone()))
            .collect();

        log::info!("Texture loader started with {} decode workers", worker_count);
        Self {
            job_tx,
            outcome_rx,
            workers,
            source,
        }
    }

    /// Number of decode workers
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Request an asynchronous load of the handle at `key`.
    ///
    /// The callback fires exactly once, on the GPU-owning thread during
    /// [`pump`](Self::pump) (or immediately here for the short-circuit cases),
    /// with the success flag.
    ///
    /// - Paused engine: resolved as a failure without decode or GPU work.
    /// - Already loaded: resolved as an immediate success.
    /// - Already loading: coalesced, the callback joins the in-flight
    ///   request's waiters; no second decode is started.
    pub fn load_async(
        &self,
        registry: &mut TextureRegistry,
        key: TextureKey,
        run_state: &RunState,
        clock: &dyn Clock,
        callback: Option<LoadCallback>,
    ) -> Result<(), TextureError> {
        let now = clock.now();
        let entry = registry.entry_mut(key).ok_or(TextureError::UnknownKey)?;

        // Pause guard, checkpoint one (checkpoint two is in pump)
        if run_state.is_paused() {
            log::debug!("load_async('{}') rejected: paused", entry.path());
            if let Some(callback) = callback {
                callback(false);
            }
            return Ok(());
        }

        match &mut entry.state {
            TextureState::Loaded(_) => {
                entry.touch(now);
                if let Some(callback) = callback {
                    callback(true);
                }
                Ok(())
            }
            TextureState::Loading { waiters } => {
                // Coalesce onto the in-flight request
                if let Some(callback) = callback {
                    waiters.push(callback);
                }
                log::debug!("load_async('{}') coalesced onto in-flight load", entry.path());
                Ok(())
            }
            TextureState::Unloaded | TextureState::Failed => {
                let job = DecodeJob {
                    key,
                    path: entry.path().to_string(),
                    resource_type: entry.resource_type(),
                    options: entry.options(),
                };

                let waiters = callback.into_iter().collect();
                entry.state = TextureState::Loading { waiters };

                if self.job_tx.send(job).is_err() {
                    // Worker pool is gone; resolve as failure
                    log::error!("load_async('{}'): decode pool unavailable", entry.path());
                    if let TextureState::Loading { waiters } =
                        std::mem::replace(&mut entry.state, TextureState::Failed)
                    {
                        for waiter in waiters {
                            waiter(false);
                        }
                    }
                }
                Ok(())
            }
        }
    }

    /// Process completed decodes on the GPU-owning thread.
    ///
    /// For each completion the pause flag is re-tested; a load finishing while
    /// paused creates no GPU object and returns the handle to `Unloaded` so a
    /// later retry is possible. All coalesced callbacks fire here, each
    /// exactly once, with the shared outcome. Returns the number of
    /// completions processed.
    pub fn pump(
        &self,
        registry: &mut TextureRegistry,
        backend: &mut dyn GpuBackend,
        run_state: &RunState,
        clock: &dyn Clock,
    ) -> usize {
        let mut processed = 0;

        while let Ok(outcome) = self.outcome_rx.try_recv() {
            processed += 1;

            let Some(entry) = registry.entry_mut(outcome.key) else {
                // Handle was deleted while the decode was in flight
                log::debug!("pump: dropping completion for deleted handle {:?}", outcome.key);
                continue;
            };

            let waiters = match std::mem::replace(&mut entry.state, TextureState::Unloaded) {
                TextureState::Loading { waiters } => waiters,
                other => {
                    // Completion for a handle no longer loading; restore state
                    log::warn!(
                        "pump: unexpected completion for '{}' in state {}",
                        entry.path(),
                        other.name()
                    );
                    entry.state = other;
                    continue;
                }
            };

            // Pause guard, checkpoint two
            let loaded = if run_state.is_paused() {
                log::debug!("pump: load of '{}' cancelled by pause", entry.path());
                false
            } else {
                match outcome.result {
                    Ok(pixels) => {
                        match NativeTexture::create(backend, &pixels, &entry.options()) {
                            Ok(native) => {
                                entry.state = TextureState::Loaded(native);
                                entry.touch(clock.now());
                                true
                            }
                            Err(e) => {
                                log::warn!("pump: creation failed for '{}': {}", entry.path(), e);
                                entry.state = TextureState::Failed;
                                false
                            }
                        }
                    }
                    Err(e) => {
                        log::warn!("pump: decode failed for '{}': {}", entry.path(), e);
                        entry.state = TextureState::Failed;
                        false
                    }
                }
            };

            for waiter in waiters {
                waiter(loaded);
            }
        }

        processed
    }

    /// Load a texture synchronously on the calling thread.
    ///
    /// Same pause guard and single-invocation callback contract as the async
    /// path. Fails with [`TextureError::LoadInProgress`] if an async load is
    /// already in flight for the handle (a sync load cannot be coalesced).
    pub fn load_sync(
        &self,
        registry: &mut TextureRegistry,
        backend: &mut dyn GpuBackend,
        key: TextureKey,
        run_state: &RunState,
        clock: &dyn Clock,
        callback: Option<LoadCallback>,
    ) -> Result<(), TextureError> {
        let now = clock.now();
        let Some(entry) = registry.entry_mut(key) else {
            if let Some(callback) = callback {
                callback(false);
            }
            return Err(TextureError::UnknownKey);
        };

        if run_state.is_paused() {
            if let Some(callback) = callback {
                callback(false);
            }
            return Err(TextureError::Cancelled);
        }

        match &entry.state {
            TextureState::Loaded(_) => {
                entry.touch(now);
                if let Some(callback) = callback {
                    callback(true);
                }
                return Ok(());
            }
            TextureState::Loading { .. } => {
                if let Some(callback) = callback {
                    callback(false);
                }
                return Err(TextureError::LoadInProgress);
            }
            TextureState::Unloaded | TextureState::Failed => {}
        }

        let job = DecodeJob {
            key,
            path: entry.path().to_string(),
            resource_type: entry.resource_type(),
            options: entry.options(),
        };

        let result = decode_job(self.source.as_ref(), &job)
            .map_err(TextureError::from)
            .and_then(|pixels| {
                // Pause may have toggled during the decode
                if run_state.is_paused() {
                    return Err(TextureError::Cancelled);
                }
                NativeTexture::create(backend, &pixels, &job.options).map_err(TextureError::from)
            });

        match result {
            Ok(native) => {
                entry.state = TextureState::Loaded(native);
                entry.touch(clock.now());
                if let Some(callback) = callback {
                    callback(true);
                }
                Ok(())
            }
            Err(e) => {
                entry.state = match e {
                    // Cancellation is not a persistent failure
                    TextureError::Cancelled => TextureState::Unloaded,
                    _ => TextureState::Failed,
                };
                log::warn!("load_sync('{}') failed: {}", entry.path(), e);
                if let Some(callback) = callback {
                    callback(false);
                }
                Err(e)
            }
        }
    }

    /// Issue async reloads for every handle invalidated by context loss.
    ///
    /// Each recreation is a full re-decode from the original path and options;
    /// pixel data is not retained after upload. While the engine is paused the
    /// pending set is left intact, so a later pass can still restore every
    /// invalidated handle. Returns the number of reloads issued.
    pub fn recreate_invalidated(
        &self,
        registry: &mut TextureRegistry,
        run_state: &RunState,
        clock: &dyn Clock,
    ) -> usize {
        if run_state.is_paused() {
            log::debug!(
                "recreate: engine paused, keeping {} handles pending",
                registry.pending_recreate().len()
            );
            return 0;
        }

        let pending = registry.take_pending_recreate();
        let count = pending.len();

        log::info!("Recreating {} invalidated textures", count);
        for key in pending {
            if let Err(e) = self.load_async(registry, key, run_state, clock, None) {
                log::warn!("recreate: failed to reissue load for {:?}: {}", key, e);
            }
        }
        count
    }

    /// Stop the worker pool and wait for the workers to exit
    pub fn shutdown(self) {
        let Self {
            job_tx, workers, ..
        } = self;
        drop(job_tx);

        for worker in workers {
            let id = worker.id;
            if worker.thread.join().is_err() {
                log::warn!("Decode worker {} panicked during shutdown", id);
            }
        }
        log::info!("Texture loader shut down");
    }
}
