//! Texture handles and their state machine
//!
//! A handle is identified by `(path, resource type, options)` and owns at most
//! one [`NativeTexture`], which lives inside the `Loaded` state so that
//! "native resource present iff loaded" holds by construction.

use bitflags::bitflags;

use crate::assets::ResourceType;
use crate::foundation::time::Timestamp;
use crate::render::texture::native::{NativeTexture, SizedResource};

slotmap::new_key_type! {
    /// Stable index of a texture handle in the registry.
    ///
    /// Keys stay valid for the lifetime of the handle and are never reused
    /// after deletion (slot versioning).
    pub struct TextureKey;
}

bitflags! {
    /// Load option flags that are part of a texture's identity
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureFlags: u32 {
        /// Exempt from trim eviction
        const ALWAYS_RESIDENT = 1 << 0;
        /// Premultiply color channels by alpha during decode
        const PREMULTIPLY_ALPHA = 1 << 1;
    }
}

/// Texture filtering modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterMode {
    /// Nearest neighbor filtering
    Nearest,
    /// Linear filtering
    Linear,
}

/// Texture wrapping modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WrapMode {
    /// Repeat the texture
    Repeat,
    /// Mirror the texture
    MirroredRepeat,
    /// Clamp to edge
    ClampToEdge,
}

/// Texture load options
///
/// Part of the handle identity: the same path loaded with different options
/// produces distinct handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureOptions {
    /// Texture filtering mode
    pub filter_mode: FilterMode,
    /// Texture wrapping mode
    pub wrap_mode: WrapMode,
    /// Additional load flags
    pub flags: TextureFlags,
}

impl TextureOptions {
    /// Options for a texture that is never evicted by trim
    pub fn always_resident() -> Self {
        Self {
            flags: TextureFlags::ALWAYS_RESIDENT,
            ..Self::default()
        }
    }
}

impl Default for TextureOptions {
    fn default() -> Self {
        Self {
            filter_mode: FilterMode::Linear,
            wrap_mode: WrapMode::ClampToEdge,
            flags: TextureFlags::empty(),
        }
    }
}

/// Deduplication identity of a texture handle
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureIdentity {
    /// Resource path
    pub path: String,
    /// Resource format
    pub resource_type: ResourceType,
    /// Load options
    pub options: TextureOptions,
}

/// One-shot load completion callback, invoked with the success flag
///
/// `FnOnce` makes double invocation unrepresentable; the box is consumed when
/// the callback fires.
pub type LoadCallback = Box<dyn FnOnce(bool) + Send>;

/// Load state of a texture handle
///
/// `Loading → Loading` is forbidden: a second load request on a loading
/// handle is coalesced into the in-flight request by queueing its callback.
pub enum TextureState {
    /// No load attempted, or the native resource was dropped
    Unloaded,
    /// A decode is in flight; waiters fire when it completes
    Loading {
        /// Callbacks coalesced onto the in-flight request
        waiters: Vec<LoadCallback>,
    },
    /// Native resource is resident
    Loaded(NativeTexture),
    /// The last load failed; a new load may be requested
    Failed,
}

impl TextureState {
    /// State name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unloaded => "Unloaded",
            Self::Loading { .. } => "Loading",
            Self::Loaded(_) => "Loaded",
            Self::Failed => "Failed",
        }
    }
}

/// A registry entry: identity, state machine, and recency metadata
pub struct TextureEntry {
    pub(crate) identity: TextureIdentity,
    pub(crate) state: TextureState,
    pub(crate) last_used: Timestamp,
    /// Creation order, used as a deterministic tie-breaker during trim
    pub(crate) serial: u64,
}

impl TextureEntry {
    pub(crate) fn new(identity: TextureIdentity, serial: u64) -> Self {
        Self {
            identity,
            state: TextureState::Unloaded,
            last_used: 0,
            serial,
        }
    }

    /// Resource path
    pub fn path(&self) -> &str {
        &self.identity.path
    }

    /// Resource format
    pub fn resource_type(&self) -> ResourceType {
        self.identity.resource_type
    }

    /// Load options
    pub fn options(&self) -> TextureOptions {
        self.identity.options
    }

    /// Current load state
    pub fn state(&self) -> &TextureState {
        &self.state
    }

    /// Whether the native resource is resident
    pub fn is_loaded(&self) -> bool {
        matches!(self.state, TextureState::Loaded(_))
    }

    /// Whether a load is currently in flight
    pub fn is_loading(&self) -> bool {
        matches!(self.state, TextureState::Loading { .. })
    }

    /// Whether this handle is exempt from trim eviction
    pub fn is_pinned(&self) -> bool {
        self.identity
            .options
            .flags
            .contains(TextureFlags::ALWAYS_RESIDENT)
    }

    /// The resident native resource, if loaded
    pub fn native(&self) -> Option<&NativeTexture> {
        match &self.state {
            TextureState::Loaded(native) => Some(native),
            _ => None,
        }
    }

    /// Raw pixel dimensions, if loaded
    pub fn raw_dimensions(&self) -> Option<(u32, u32)> {
        self.native().map(NativeTexture::raw_dimensions)
    }

    /// Resident byte footprint (zero unless loaded)
    pub fn size_bytes(&self) -> usize {
        self.native().map_or(0, SizedResource::size_bytes)
    }

    /// Tick of the most recent use
    pub fn last_used(&self) -> Timestamp {
        self.last_used
    }

    /// Record a use at `now` for trim ordering
    pub fn touch(&mut self, now: Timestamp) {
        self.last_used = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(path: &str) -> TextureIdentity {
        TextureIdentity {
            path: path.to_string(),
            resource_type: ResourceType::Png,
            options: TextureOptions::default(),
        }
    }

    #[test]
    fn test_new_entry_is_unloaded() {
        let entry = TextureEntry::new(identity("ui/icon"), 0);
        assert!(!entry.is_loaded());
        assert!(!entry.is_loading());
        assert!(entry.native().is_none());
        assert_eq!(entry.size_bytes(), 0);
        assert_eq!(entry.state().name(), "Unloaded");
    }

    #[test]
    fn test_identity_equality_includes_options() {
        let a = identity("ui/icon");
        let mut b = identity("ui/icon");
        assert_eq!(a, b);

        b.options.flags = TextureFlags::ALWAYS_RESIDENT;
        assert_ne!(a, b);
    }

    #[test]
    fn test_pinned_flag() {
        let mut id = identity("ui/icon");
        id.options = TextureOptions::always_resident();
        let entry = TextureEntry::new(id, 0);
        assert!(entry.is_pinned());
    }

    #[test]
    fn test_touch_updates_last_used() {
        let mut entry = TextureEntry::new(identity("ui/icon"), 0);
        entry.touch(42);
        assert_eq!(entry.last_used(), 42);
    }
}
