//! GPU backend abstraction
//!
//! The texture cache creates and destroys native image objects through the
//! [`GpuBackend`] trait. The real renderer supplies its own implementation;
//! [`HeadlessBackend`] provides a GPU-free implementation for tests and tools.
//!
//! All backend calls happen on the thread that owns the GPU context. Decode
//! workers never see a backend.

use std::collections::HashMap;

use thiserror::Error;

use crate::assets::ImageData;
use crate::render::texture::TextureOptions;

/// Opaque identifier of a native GPU image object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeImageId(pub u64);

/// GPU backend errors
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend rejected the image format or size
    #[error("Image creation failed: {0}")]
    CreationFailed(String),
}

/// Native image object creation and destruction
pub trait GpuBackend {
    /// Allocate a native image object from decoded pixel data
    fn create_image(
        &mut self,
        pixels: &ImageData,
        options: &TextureOptions,
    ) -> Result<NativeImageId, BackendError>;

    /// Release a native image object
    fn destroy_image(&mut self, id: NativeImageId);
}

/// GPU-free backend tracking allocations in memory
///
/// Used by unit tests and headless tooling. Tracks live image objects and
/// their byte footprints, and can be forced to reject creation to exercise
/// failure paths.
pub struct HeadlessBackend {
    next_id: u64,
    live: HashMap<NativeImageId, usize>,
    created: usize,
    destroyed: usize,
    fail_creation: bool,
}

impl HeadlessBackend {
    /// Create a new backend with no live images
    pub fn new() -> Self {
        Self {
            next_id: 1,
            live: HashMap::new(),
            created: 0,
            destroyed: 0,
            fail_creation: false,
        }
    }

    /// Force all subsequent `create_image` calls to fail
    pub fn set_fail_creation(&mut self, fail: bool) {
        self.fail_creation = fail;
    }

    /// Number of currently live image objects
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Total bytes of currently live image objects
    pub fn allocated_bytes(&self) -> usize {
        self.live.values().sum()
    }

    /// Total `create_image` calls that succeeded
    pub fn created(&self) -> usize {
        self.created
    }

    /// Total `destroy_image` calls
    pub fn destroyed(&self) -> usize {
        self.destroyed
    }

    /// Whether an image object is currently live
    pub fn is_live(&self, id: NativeImageId) -> bool {
        self.live.contains_key(&id)
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuBackend for HeadlessBackend {
    fn create_image(
        &mut self,
        pixels: &ImageData,
        _options: &TextureOptions,
    ) -> Result<NativeImageId, BackendError> {
        if self.fail_creation {
            return Err(BackendError::CreationFailed(
                "creation failure forced".to_string(),
            ));
        }
        if pixels.width == 0 || pixels.height == 0 {
            return Err(BackendError::CreationFailed(format!(
                "zero-sized image {}x{}",
                pixels.width, pixels.height
            )));
        }

        let id = NativeImageId(self.next_id);
        self.next_id += 1;
        self.live.insert(id, pixels.size_bytes());
        self.created += 1;

        log::debug!(
            "Created native image {:?} ({}x{}, {} bytes)",
            id,
            pixels.width,
            pixels.height,
            pixels.size_bytes()
        );
        Ok(id)
    }

    fn destroy_image(&mut self, id: NativeImageId) {
        if self.live.remove(&id).is_none() {
            log::warn!("Destroying unknown native image {:?}", id);
        }
        self.destroyed += 1;
        log::debug!("Destroyed native image {:?}", id);
    }
}
