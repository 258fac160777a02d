//! # Ember Engine
//!
//! Texture and text resource management for a 2D game engine.
//!
//! ## Features
//!
//! - **Handle-Based Textures**: Stable keys that survive load, eviction, and reload
//! - **Background Decoding**: Worker threads decode images off the render thread
//! - **Memory Budgeting**: Least-recently-used trimming against a byte budget
//! - **Context Recovery**: GPU resources are invalidated and rebuilt after context loss
//! - **Text Meshes**: Per-font glyph atlases with a bounded mesh cache
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ember_engine::prelude::*;
//! use std::sync::Arc;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     ember_engine::foundation::logging::init();
//!
//!     let config = TextureCacheConfig::default();
//!     let source = Arc::new(FileSource::new("assets"));
//!     let mut backend = HeadlessBackend::new();
//!     let mut registry = TextureRegistry::new();
//!     let mut loader = TextureLoader::new(&config, source);
//!     let clock = SystemClock::new();
//!
//!     let key = registry.key_for("sprites/ship", ResourceType::Png, TextureOptions::default());
//!     let run_state = RunState::new();
//!     loader.load_async(&mut registry, key, &run_state, &clock, None)?;
//!
//!     // Once per frame on the render thread:
//!     loader.pump(&mut registry, &mut backend, &run_state, &clock);
//!     registry.trim(config.memory_budget, &mut backend);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod assets;
pub mod config;
pub mod foundation;
pub mod render;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        assets::{AssetError, FileSource, MemorySource, ResourceSource, ResourceType},
        config::TextureCacheConfig,
        foundation::{
            run_state::RunState,
            time::{Clock, ManualClock, SystemClock, Timestamp},
        },
        render::{
            CachedTextMesh, FontPage, GpuBackend, HeadlessBackend, NativeTexture, TextureError,
            TextureFlags, TextureKey, TextureLoader, TextureOptions, TextureRegistry,
            TextureState,
        },
    };
}
