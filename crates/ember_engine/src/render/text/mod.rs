//! Text rendering support
//!
//! A [`FontPage`] holds glyph atlas metadata loaded from a font descriptor
//! plus a per-font cache of generated text meshes. Mesh building and the
//! cache are only ever used from the render thread.

pub mod font_page;
pub mod mesh_cache;

pub use font_page::{FontError, FontPage, Letter, GLYPH_SLOTS, MULTIBYTE_LEAD, TILE_GRID};
pub use mesh_cache::{CachedTextMesh, TextMeshCache, MAX_TEXT_LINES, TEXT_MESH_CACHE_CAPACITY};
