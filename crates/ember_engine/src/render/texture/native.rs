//! Native GPU image resource lifecycle
//!
//! Wraps creation and destruction of a single GPU-backed image object. Has no
//! knowledge of caching; the registry owns each [`NativeTexture`] exclusively
//! through the `Loaded` state of its handle.

use crate::assets::ImageData;
use crate::render::backend::{BackendError, GpuBackend, NativeImageId};
use crate::render::texture::TextureOptions;

/// Capability trait for resources with a measurable byte footprint
pub trait SizedResource {
    /// Resident size of the resource in bytes
    fn size_bytes(&self) -> usize;
}

/// A realized GPU-side image object
///
/// Pixel data is not retained after upload; restoring a `NativeTexture` after
/// context loss requires a full re-decode from the original resource.
#[derive(Debug)]
pub struct NativeTexture {
    id: NativeImageId,
    raw_width: u32,
    raw_height: u32,
    padded_width: u32,
    padded_height: u32,
    size_bytes: usize,
}

impl NativeTexture {
    /// Allocate a native image object from decoded pixel data
    ///
    /// The GPU allocation is sized to power-of-two padded dimensions; the raw
    /// dimensions are kept for UV computation by the renderer.
    pub fn create(
        backend: &mut dyn GpuBackend,
        pixels: &ImageData,
        options: &TextureOptions,
    ) -> Result<Self, BackendError> {
        let padded = pixels.padded_to_pow2();
        let id = backend.create_image(&padded, options)?;

        log::debug!(
            "Native texture {:?}: raw {}x{}, allocated {}x{}",
            id,
            pixels.width,
            pixels.height,
            padded.width,
            padded.height
        );

        Ok(Self {
            id,
            raw_width: pixels.width,
            raw_height: pixels.height,
            padded_width: padded.width,
            padded_height: padded.height,
            size_bytes: padded.size_bytes(),
        })
    }

    /// Release the native image object
    ///
    /// Consumes the texture, so a resource can never be destroyed twice.
    pub fn release(self, backend: &mut dyn GpuBackend) {
        backend.destroy_image(self.id);
    }

    /// Opaque native image identifier
    pub fn id(&self) -> NativeImageId {
        self.id
    }

    /// Raw pixel dimensions before padding
    pub fn raw_dimensions(&self) -> (u32, u32) {
        (self.raw_width, self.raw_height)
    }

    /// Allocated (power-of-two padded) dimensions
    pub fn padded_dimensions(&self) -> (u32, u32) {
        (self.padded_width, self.padded_height)
    }
}

impl SizedResource for NativeTexture {
    fn size_bytes(&self) -> usize {
        self.size_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backend::HeadlessBackend;

    #[test]
    fn test_create_records_dimensions() {
        let mut backend = HeadlessBackend::new();
        let pixels = ImageData::solid_color(6, 3, [255; 4]);

        let native =
            NativeTexture::create(&mut backend, &pixels, &TextureOptions::default()).unwrap();
        assert_eq!(native.raw_dimensions(), (6, 3));
        assert_eq!(native.padded_dimensions(), (8, 4));
        assert_eq!(native.size_bytes(), 8 * 4 * 4);
        assert!(backend.is_live(native.id()));
    }

    #[test]
    fn test_release_destroys_native_object() {
        let mut backend = HeadlessBackend::new();
        let pixels = ImageData::solid_color(2, 2, [255; 4]);

        let native =
            NativeTexture::create(&mut backend, &pixels, &TextureOptions::default()).unwrap();
        let id = native.id();

        native.release(&mut backend);
        assert!(!backend.is_live(id));
        assert_eq!(backend.destroyed(), 1);
    }

    #[test]
    fn test_creation_failure_propagates() {
        let mut backend = HeadlessBackend::new();
        backend.set_fail_creation(true);

        let pixels = ImageData::solid_color(2, 2, [255; 4]);
        let result = NativeTexture::create(&mut backend, &pixels, &TextureOptions::default());
        assert!(result.is_err());
        assert_eq!(backend.live_count(), 0);
    }
}
