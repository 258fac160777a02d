//! Image decoding utilities for texture data
//!
//! Converts raw resource bytes into RGBA8 pixel data ready for GPU upload.
//! Decoding is pure CPU work and is safe to run on decode worker threads.

use crate::assets::{AssetError, ResourceType};

/// Decoded image data ready for GPU upload
#[derive(Debug, Clone)]
pub struct ImageData {
    /// Raw RGBA pixel data
    pub data: Vec<u8>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Number of color channels (always 4 for RGBA)
    pub channels: u8,
}

impl ImageData {
    /// Decode image bytes of a known format into RGBA8 pixel data
    pub fn decode(bytes: &[u8], resource_type: ResourceType) -> Result<Self, AssetError> {
        let img = image::load_from_memory_with_format(bytes, resource_type.image_format())
            .map_err(|e| AssetError::DecodeFailed(e.to_string()))?;

        // Convert to RGBA8 format (standard for GPU upload)
        let rgba_img = img.to_rgba8();
        let (width, height) = rgba_img.dimensions();

        log::debug!("Decoded {:?} image {}x{}", resource_type, width, height);

        Ok(Self {
            data: rgba_img.into_raw(),
            width,
            height,
            channels: 4,
        })
    }

    /// Create a solid color image (useful for testing and defaults)
    pub fn solid_color(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixel_count = (width * height) as usize;
        let mut data = Vec::with_capacity(pixel_count * 4);

        for _ in 0..pixel_count {
            data.extend_from_slice(&color);
        }

        Self {
            data,
            width,
            height,
            channels: 4,
        }
    }

    /// Get the size of the image data in bytes
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// Check if image dimensions are power of two
    pub fn is_power_of_two(&self) -> bool {
        self.width.is_power_of_two() && self.height.is_power_of_two()
    }

    /// Copy the image into a power-of-two padded buffer
    ///
    /// GPU allocation uses the padded dimensions; the original pixels occupy
    /// the top-left corner and the padding rows/columns are zeroed. Returns a
    /// clone of `self` when the dimensions are already powers of two.
    pub fn padded_to_pow2(&self) -> Self {
        if self.is_power_of_two() {
            return self.clone();
        }

        let padded_width = self.width.next_power_of_two();
        let padded_height = self.height.next_power_of_two();
        let mut data = vec![0u8; (padded_width * padded_height * 4) as usize];

        let src_row_bytes = (self.width * 4) as usize;
        let dst_row_bytes = (padded_width * 4) as usize;
        for row in 0..self.height as usize {
            let src_start = row * src_row_bytes;
            let dst_start = row * dst_row_bytes;
            data[dst_start..dst_start + src_row_bytes]
                .copy_from_slice(&self.data[src_start..src_start + src_row_bytes]);
        }

        Self {
            data,
            width: padded_width,
            height: padded_height,
            channels: 4,
        }
    }

    /// Premultiply each pixel's color channels by its alpha channel
    pub fn premultiply_alpha(&mut self) {
        for pixel in self.data.chunks_exact_mut(4) {
            let alpha = u32::from(pixel[3]);
            pixel[0] = ((u32::from(pixel[0]) * alpha) / 255) as u8;
            pixel[1] = ((u32::from(pixel[1]) * alpha) / 255) as u8;
            pixel[2] = ((u32::from(pixel[2]) * alpha) / 255) as u8;
        }
    }
}
