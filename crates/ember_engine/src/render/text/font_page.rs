//! Font page: glyph atlas metadata and text metrics
//!
//! A font page is loaded once from a line-oriented descriptor (one line per
//! glyph slot 0..=255, four comma-separated normalized atlas coordinates per
//! line) and is immutable afterwards. Glyph pixel size derives from the atlas
//! rectangle via the tile grid size.
//!
//! Measurement (`width`, `height`) and mesh building share one glyph scanner
//! and one advance rule, so the two code paths always agree.

use nalgebra::Vector2;
use thiserror::Error;

use crate::foundation::time::Timestamp;
use crate::render::text::mesh_cache::{CachedTextMesh, TextMeshCache};

/// Number of glyph slots in a font page
pub const GLYPH_SLOTS: usize = 256;

/// Tile grid size used to derive glyph dimensions from atlas coordinates
pub const TILE_GRID: f32 = 16.0;

/// Reserved lead byte for two-byte glyph references
///
/// The sequence `0xFF b` addresses glyph slot `b` directly, which lets text
/// reach slots whose byte values would otherwise be interpreted as control
/// characters (for example `\n`). Slot `0xFF` itself never renders.
pub const MULTIBYTE_LEAD: u8 = 0xFF;

/// Font descriptor errors
#[derive(Debug, Error)]
pub enum FontError {
    /// A descriptor line did not contain four comma-separated values
    #[error("Font descriptor line {line}: expected 4 comma-separated values")]
    MalformedLine {
        /// 1-based line number
        line: usize,
    },

    /// A descriptor value failed to parse as a float
    #[error("Font descriptor line {line}: invalid number '{value}'")]
    InvalidNumber {
        /// 1-based line number
        line: usize,
        /// Offending token
        value: String,
    },

    /// The descriptor did not contain one line per glyph slot
    #[error("Font descriptor: expected {expected} glyph lines, found {found}")]
    MissingGlyphs {
        /// Required line count
        expected: usize,
        /// Lines actually present
        found: usize,
    },
}

/// Atlas sub-rectangle of one glyph
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letter {
    /// Top-left atlas corner (normalized)
    pub start: Vector2<f32>,
    /// Bottom-right atlas corner (normalized)
    pub end: Vector2<f32>,
}

impl Letter {
    /// Glyph width in units at text height 1.0
    pub fn width(&self) -> f32 {
        (self.end.x - self.start.x) * TILE_GRID
    }

    /// Glyph height in units at text height 1.0
    pub fn height(&self) -> f32 {
        (self.end.y - self.start.y) * TILE_GRID
    }

    /// Glyph size in grid cells
    pub fn size_in_cells(&self) -> Vector2<f32> {
        (self.end - self.start) * TILE_GRID
    }
}

/// One token of a text byte stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Token {
    /// Start a new line
    LineBreak,
    /// Render the glyph in this slot
    Glyph(u8),
}

/// Iterator over text bytes yielding glyph slots and line breaks
///
/// Handles the `0xFF` two-byte escape; a trailing lead byte is ignored.
pub(crate) struct GlyphScanner<'a> {
    text: &'a [u8],
    pos: usize,
}

impl<'a> GlyphScanner<'a> {
    pub(crate) fn new(text: &'a [u8]) -> Self {
        Self { text, pos: 0 }
    }
}

impl Iterator for GlyphScanner<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            let byte = *self.text.get(self.pos)?;
            self.pos += 1;

            match byte {
                b'\n' => return Some(Token::LineBreak),
                b'\r' => continue,
                MULTIBYTE_LEAD => {
                    let slot = *self.text.get(self.pos)?;
                    self.pos += 1;
                    return Some(Token::Glyph(slot));
                }
                _ => return Some(Token::Glyph(byte)),
            }
        }
    }
}

/// Width and height of one laid-out text line
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct LineMetrics {
    /// Sum of glyph advances on the line
    pub width: f32,
    /// Maximum glyph height on the line
    pub height: f32,
}

/// Per-line metrics for `text` at the given height
///
/// This is the single measurement pass shared by the metric queries and the
/// mesh builder.
pub(crate) fn measure_lines(letters: &[Letter], text: &[u8], height: f32) -> Vec<LineMetrics> {
    let mut lines = Vec::new();
    let mut current = LineMetrics::default();

    for token in GlyphScanner::new(text) {
        match token {
            Token::LineBreak => {
                lines.push(current);
                current = LineMetrics::default();
            }
            Token::Glyph(slot) => {
                let letter = &letters[slot as usize];
                current.width += letter.width() * height;
                current.height = current.height.max(letter.height() * height);
            }
        }
    }

    lines.push(current);
    lines
}

/// Glyph atlas metadata plus its text mesh cache
pub struct FontPage {
    letters: Vec<Letter>,
    cache: TextMeshCache,
}

impl FontPage {
    /// Parse a font descriptor: 256 lines of `x1,y1,x2,y2` normalized atlas
    /// coordinates, one line per glyph slot.
    pub fn from_descriptor(descriptor: &str) -> Result<Self, FontError> {
        let mut letters = Vec::with_capacity(GLYPH_SLOTS);

        for (index, line) in descriptor.lines().take(GLYPH_SLOTS).enumerate() {
            let line_no = index + 1;
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            if fields.len() != 4 {
                return Err(FontError::MalformedLine { line: line_no });
            }

            let mut values = [0.0f32; 4];
            for (value, field) in values.iter_mut().zip(&fields) {
                *value = field.parse().map_err(|_| FontError::InvalidNumber {
                    line: line_no,
                    value: (*field).to_string(),
                })?;
            }

            letters.push(Letter {
                start: Vector2::new(values[0], values[1]),
                end: Vector2::new(values[2], values[3]),
            });
        }

        if letters.len() != GLYPH_SLOTS {
            return Err(FontError::MissingGlyphs {
                expected: GLYPH_SLOTS,
                found: letters.len(),
            });
        }

        log::info!("Loaded font page with {} glyph slots", letters.len());
        Ok(Self {
            letters,
            cache: TextMeshCache::new(),
        })
    }

    /// Atlas rectangle for a glyph slot
    pub fn letter(&self, slot: u8) -> &Letter {
        &self.letters[slot as usize]
    }

    /// Advance of a single glyph at the given text height
    pub fn char_width(&self, slot: u8, height: f32) -> f32 {
        self.letters[slot as usize].width() * height
    }

    /// Width of the first line of `text` at the given height
    ///
    /// Measurement stops at the first line break; the result equals the sum
    /// of advances the mesh builder uses for that line.
    pub fn width(&self, text: &[u8], height: f32) -> f32 {
        let mut width = 0.0;
        for token in GlyphScanner::new(text) {
            match token {
                Token::LineBreak => break,
                Token::Glyph(slot) => width += self.char_width(slot, height),
            }
        }
        width
    }

    /// Total stacked height of all lines of `text` at the given height
    pub fn height(&self, text: &[u8], height: f32) -> f32 {
        measure_lines(&self.letters, text, height)
            .iter()
            .map(|line| line.height)
            .sum()
    }

    /// Cached or freshly built mesh for `text`
    ///
    /// On a hit the cached mesh is returned unmodified with its draw time
    /// refreshed; on a miss the mesh is built and inserted, evicting the
    /// least recently drawn entry if the cache is full. Only call from the
    /// render thread.
    pub fn mesh(
        &mut self,
        text: &[u8],
        height: f32,
        centered_x: bool,
        now: Timestamp,
    ) -> &CachedTextMesh {
        let Self { letters, cache } = self;
        cache.get_or_build(letters, text, height, centered_x, now)
    }

    /// Number of meshes currently cached
    pub fn cached_mesh_count(&self) -> usize {
        self.cache.len()
    }
}
