//! Text mesh cache
//!
//! Memoizes generated glyph-quad geometry per font page, keyed by the exact
//! `(text bytes, height, centeredX)` triple. The cache holds at most
//! [`TEXT_MESH_CACHE_CAPACITY`] meshes and evicts the least recently drawn
//! entry on overflow. Only ever touched from the render thread; moving to
//! multi-threaded rendering requires serializing access behind a mutex.

use std::collections::HashMap;

use crate::foundation::time::Timestamp;
use crate::render::text::font_page::{measure_lines, GlyphScanner, Letter, LineMetrics, Token};
use crate::render::texture::SizedResource;

/// Maximum number of meshes cached per font page
pub const TEXT_MESH_CACHE_CAPACITY: usize = 50;

/// Maximum number of lines in one text mesh
///
/// A hard contract limit: exceeding it is a caller bug and trips an
/// assertion rather than truncating silently.
pub const MAX_TEXT_LINES: usize = 8;

/// Exact-match cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MeshKey {
    text: Vec<u8>,
    /// Bit pattern of the requested height; no tolerance matching
    height_bits: u32,
    centered_x: bool,
}

/// Precomputed vertex/UV geometry for one rendered string
pub struct CachedTextMesh {
    positions: Vec<[f32; 2]>,
    uvs: Vec<[f32; 2]>,
    total_height: f32,
    pub(crate) last_draw: Timestamp,
    /// Insertion order, used as a deterministic eviction tie-breaker
    pub(crate) serial: u64,
}

impl CachedTextMesh {
    /// Vertex positions, six per glyph quad
    pub fn positions(&self) -> &[[f32; 2]] {
        &self.positions
    }

    /// UV coordinates, parallel to `positions`
    pub fn uvs(&self) -> &[[f32; 2]] {
        &self.uvs
    }

    /// Number of vertices in the mesh
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Total stacked height of all lines, for vertical centering by the caller
    pub fn total_height(&self) -> f32 {
        self.total_height
    }

    /// Tick of the most recent draw
    pub fn last_draw(&self) -> Timestamp {
        self.last_draw
    }

    /// Vertex positions as raw bytes for GPU upload
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    /// UV coordinates as raw bytes for GPU upload
    pub fn uv_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.uvs)
    }
}

impl SizedResource for CachedTextMesh {
    fn size_bytes(&self) -> usize {
        (self.positions.len() + self.uvs.len()) * std::mem::size_of::<[f32; 2]>()
    }
}

/// LRU cache of text meshes for one font page
#[derive(Default)]
pub struct TextMeshCache {
    entries: HashMap<MeshKey, CachedTextMesh>,
    next_serial: u64,
}

impl TextMeshCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached meshes
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the cached mesh for the key, building it on a miss
    ///
    /// Hits refresh `last_draw` and return the mesh unmodified. Misses evict
    /// the least recently drawn entry first when the cache is at capacity, so
    /// the cap is never exceeded.
    pub(crate) fn get_or_build(
        &mut self,
        letters: &[Letter],
        text: &[u8],
        height: f32,
        centered_x: bool,
        now: Timestamp,
    ) -> &CachedTextMesh {
        let key = MeshKey {
            text: text.to_vec(),
            height_bits: height.to_bits(),
            centered_x,
        };

        if !self.entries.contains_key(&key) && self.entries.len() >= TEXT_MESH_CACHE_CAPACITY {
            self.evict_least_recent();
        }

        let next_serial = &mut self.next_serial;
        match self.entries.entry(key) {
            std::collections::hash_map::Entry::Occupied(occupied) => {
                let mesh = occupied.into_mut();
                mesh.last_draw = now;
                mesh
            }
            std::collections::hash_map::Entry::Vacant(vacant) => {
                let serial = *next_serial;
                *next_serial += 1;
                log::debug!("Text mesh cache miss ({} bytes of text)", text.len());
                vacant.insert(build_mesh(letters, text, height, centered_x, now, serial))
            }
        }
    }

    fn evict_least_recent(&mut self) {
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, mesh)| (mesh.last_draw, mesh.serial))
            .map(|(key, _)| key.clone());

        if let Some(key) = victim {
            self.entries.remove(&key);
            log::debug!("Text mesh cache evicted least recently drawn entry");
        }
    }
}

/// Build glyph-quad geometry for one string
///
/// Two passes: `measure_lines` computes per-line width/height, then the quads
/// are laid out left to right, descending from y = 0 with each glyph dropping
/// by its own height and each line stacked below the previous one. Uses only
/// per-call state, so it is reentrant.
fn build_mesh(
    letters: &[Letter],
    text: &[u8],
    height: f32,
    centered_x: bool,
    now: Timestamp,
    serial: u64,
) -> CachedTextMesh {
    let lines = measure_lines(letters, text, height);
    assert!(
        lines.len() <= MAX_TEXT_LINES,
        "text mesh exceeds the {} line limit ({} lines)",
        MAX_TEXT_LINES,
        lines.len()
    );

    let line_start = |line: &LineMetrics| if centered_x { -line.width / 2.0 } else { 0.0 };

    let mut positions = Vec::new();
    let mut uvs = Vec::new();
    let mut line_index = 0;
    let mut x = line_start(&lines[0]);
    let mut y = 0.0f32;

    for token in GlyphScanner::new(text) {
        match token {
            Token::LineBreak => {
                y -= lines[line_index].height;
                line_index += 1;
                x = line_start(&lines[line_index]);
            }
            Token::Glyph(slot) => {
                let letter = &letters[slot as usize];
                let w = letter.width() * height;
                let h = letter.height() * height;
                let (s, e) = (letter.start, letter.end);

                // Two triangles per glyph quad, UVs straight from the atlas rect
                positions.extend_from_slice(&[
                    [x, y],
                    [x + w, y],
                    [x, y - h],
                    [x + w, y],
                    [x + w, y - h],
                    [x, y - h],
                ]);
                uvs.extend_from_slice(&[
                    [s.x, s.y],
                    [e.x, s.y],
                    [s.x, e.y],
                    [e.x, s.y],
                    [e.x, e.y],
                    [s.x, e.y],
                ]);

                x += w;
            }
        }
    }

    CachedTextMesh {
        positions,
        uvs,
        total_height: lines.iter().map(|line| line.height).sum(),
        last_draw: now,
        serial,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector2;

    /// 256 glyphs, each half a tile wide and one tile tall
    /// (0.5 x 1.0 units at height 1.0)
    fn uniform_letters() -> Vec<Letter> {
        (0..256)
            .map(|slot| {
                let col = (slot % 16) as f32;
                let row = (slot / 16) as f32;
                let start = Vector2::new(col / 16.0, row / 16.0);
                Letter {
                    start,
                    end: start + Vector2::new(0.5 / 16.0, 1.0 / 16.0),
                }
            })
            .collect()
    }

    #[test]
    fn test_single_glyph_quad() {
        let letters = uniform_letters();
        let mesh = build_mesh(&letters, b"A", 1.0, false, 0, 0);

        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.positions()[0], [0.0, 0.0]);
        assert_eq!(mesh.positions()[4], [0.5, -1.0]);
        assert_relative_eq!(mesh.total_height(), 1.0);

        // UVs come straight from the glyph's atlas rectangle
        let a = &letters[b'A' as usize];
        assert_eq!(mesh.uvs()[0], [a.start.x, a.start.y]);
        assert_eq!(mesh.uvs()[4], [a.end.x, a.end.y]);
    }

    #[test]
    fn test_cursor_advances_per_glyph() {
        let letters = uniform_letters();
        let mesh = build_mesh(&letters, b"AB", 1.0, false, 0, 0);

        assert_eq!(mesh.vertex_count(), 12);
        // Second quad starts where the first one's advance ended
        assert_eq!(mesh.positions()[6], [0.5, 0.0]);
        // Right edge of the line equals the summed advances
        assert_relative_eq!(mesh.positions()[10][0], 1.0);
    }

    #[test]
    fn test_horizontal_centering() {
        let letters = uniform_letters();
        let mesh = build_mesh(&letters, b"AA", 1.0, true, 0, 0);

        // Line starts at minus half the line width
        assert_relative_eq!(mesh.positions()[0][0], -0.5);
    }

    #[test]
    fn test_line_stacking() {
        let letters = uniform_letters();
        let mesh = build_mesh(&letters, b"A\nAA", 1.0, false, 0, 0);

        // Second line starts one line height below the first
        assert_eq!(mesh.positions()[6], [0.0, -1.0]);
        assert_relative_eq!(mesh.total_height(), 2.0);
    }

    #[test]
    fn test_mesh_width_matches_measured_width() {
        let letters = uniform_letters();
        let text = b"ABCD";
        let height = 2.0;

        let mesh = build_mesh(&letters, text, height, false, 0, 0);
        let measured: f32 = text
            .iter()
            .map(|&b| letters[b as usize].width() * height)
            .sum();

        // The last quad's right edge equals the sum of advances
        let right_edge = mesh.positions()[mesh.vertex_count() - 2][0];
        assert_relative_eq!(right_edge, measured);
    }

    #[test]
    #[should_panic(expected = "line limit")]
    fn test_too_many_lines_asserts() {
        let letters = uniform_letters();
        // Nine lines; the documented limit is eight
        build_mesh(&letters, b"A\nA\nA\nA\nA\nA\nA\nA\nA", 1.0, false, 0, 0);
    }

    #[test]
    fn test_cache_hit_refreshes_draw_time() {
        let letters = uniform_letters();
        let mut cache = TextMeshCache::new();

        let first_serial = cache.get_or_build(&letters, b"hello", 1.0, false, 10).serial;
        let mesh = cache.get_or_build(&letters, b"hello", 1.0, false, 20);

        assert_eq!(mesh.serial, first_serial);
        assert_eq!(mesh.last_draw(), 20);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_exact_key_matching() {
        let letters = uniform_letters();
        let mut cache = TextMeshCache::new();

        cache.get_or_build(&letters, b"hello", 1.0, false, 0);
        cache.get_or_build(&letters, b"hello", 1.5, false, 0);
        cache.get_or_build(&letters, b"hello", 1.0, true, 0);
        cache.get_or_build(&letters, b"hell", 1.0, false, 0);

        // Height, alignment, and text length all distinguish entries
        assert_eq!(cache.len(), 4);
    }

    #[test]
    fn test_capacity_bound_and_lru_eviction() {
        let letters = uniform_letters();
        let mut cache = TextMeshCache::new();

        // Fill to capacity with ascending draw times
        for i in 0..TEXT_MESH_CACHE_CAPACITY {
            cache.get_or_build(&letters, format!("t{}", i).as_bytes(), 1.0, false, i as u64);
        }
        assert_eq!(cache.len(), TEXT_MESH_CACHE_CAPACITY);

        // Refresh the oldest entry so "t1" becomes the least recently drawn
        cache.get_or_build(&letters, b"t0", 1.0, false, 100);

        // One more distinct key: still at capacity, "t1" evicted
        cache.get_or_build(&letters, b"overflow", 1.0, false, 101);
        assert_eq!(cache.len(), TEXT_MESH_CACHE_CAPACITY);

        let t1_key = MeshKey {
            text: b"t1".to_vec(),
            height_bits: 1.0f32.to_bits(),
            centered_x: false,
        };
        let t0_key = MeshKey {
            text: b"t0".to_vec(),
            height_bits: 1.0f32.to_bits(),
            centered_x: false,
        };
        assert!(!cache.entries.contains_key(&t1_key));
        assert!(cache.entries.contains_key(&t0_key));
    }

    #[test]
    fn test_eviction_tie_break_is_deterministic() {
        let letters = uniform_letters();
        let mut cache = TextMeshCache::new();

        // All entries share one draw time; insertion order breaks the tie
        for i in 0..TEXT_MESH_CACHE_CAPACITY {
            cache.get_or_build(&letters, format!("t{}", i).as_bytes(), 1.0, false, 7);
        }
        cache.get_or_build(&letters, b"overflow", 1.0, false, 7);

        let t0_key = MeshKey {
            text: b"t0".to_vec(),
            height_bits: 1.0f32.to_bits(),
            centered_x: false,
        };
        assert!(!cache.entries.contains_key(&t0_key));
        assert_eq!(cache.len(), TEXT_MESH_CACHE_CAPACITY);
    }

    #[test]
    fn test_byte_buffers_for_upload() {
        let letters = uniform_letters();
        let mesh = build_mesh(&letters, b"AB", 1.0, false, 0, 0);

        assert_eq!(mesh.position_bytes().len(), mesh.vertex_count() * 8);
        assert_eq!(mesh.uv_bytes().len(), mesh.vertex_count() * 8);
        assert_eq!(mesh.size_bytes(), mesh.vertex_count() * 16);
    }
}
