//! Texture cache
//!
//! A handle-based registry of GPU-backed image resources with an asynchronous
//! load pipeline. Image decoding runs on a worker pool; native GPU objects are
//! created, attached, and destroyed only on the thread that owns the GPU
//! context. The registry bounds resident GPU memory via LRU trim and survives
//! GPU context loss through an invalidate/recreate pass.

pub mod handle;
pub mod loader;
pub mod native;
pub mod registry;

pub use handle::{
    FilterMode, LoadCallback, TextureEntry, TextureFlags, TextureIdentity, TextureKey,
    TextureOptions, TextureState, WrapMode,
};
pub use loader::{TextureError, TextureLoader};
pub use native::{NativeTexture, SizedResource};
pub use registry::TextureRegistry;
