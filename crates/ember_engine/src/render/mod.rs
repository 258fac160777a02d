//! Rendering subsystems
//!
//! Contains the GPU backend abstraction, the texture cache (handle registry,
//! async load pipeline, native resource lifecycle), and the text mesh system.

pub mod backend;
pub mod text;
pub mod texture;

pub use backend::{BackendError, GpuBackend, HeadlessBackend, NativeImageId};
pub use texture::{
    FilterMode, LoadCallback, NativeTexture, SizedResource, TextureError, TextureFlags,
    TextureKey, TextureLoader, TextureOptions, TextureRegistry, TextureState, WrapMode,
};
pub use text::{CachedTextMesh, FontError, FontPage, Letter};
