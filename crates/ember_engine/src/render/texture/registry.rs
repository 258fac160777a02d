//! Texture handle registry
//!
//! Owns all texture handles, deduplicated by `(path, resource type, options)`.
//! All mutation happens on the GPU-owning thread; `trim` and `invalidate_all`
//! run as single atomic passes that never interleave with load completions.

use std::collections::HashMap;

use slotmap::SlotMap;

use crate::assets::ResourceType;
use crate::foundation::time::Timestamp;
use crate::render::backend::GpuBackend;
use crate::render::texture::handle::{
    TextureEntry, TextureIdentity, TextureKey, TextureOptions, TextureState,
};

/// Registry of texture handles
///
/// Keys are stable while the handle is alive and never reused after deletion
/// (slotmap versioning).
#[derive(Default)]
pub struct TextureRegistry {
    entries: SlotMap<TextureKey, TextureEntry>,
    by_identity: HashMap<TextureIdentity, TextureKey>,
    /// Handles invalidated after context loss, awaiting recreation
    pending_recreate: Vec<TextureKey>,
    next_serial: u64,
}

impl TextureRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the key for the handle with this identity, creating an
    /// `Unloaded` handle if none exists.
    ///
    /// Repeated calls with identical arguments always return the same key.
    pub fn key_for(
        &mut self,
        path: &str,
        resource_type: ResourceType,
        options: TextureOptions,
    ) -> TextureKey {
        let identity = TextureIdentity {
            path: path.to_string(),
            resource_type,
            options,
        };

        if let Some(&key) = self.by_identity.get(&identity) {
            return key;
        }

        let serial = self.next_serial;
        self.next_serial += 1;

        let key = self.entries.insert(TextureEntry::new(identity.clone(), serial));
        self.by_identity.insert(identity, key);

        log::debug!("Registered texture handle {:?} for '{}'", key, path);
        key
    }

    /// Look up the handle with this identity, creating an `Unloaded` handle
    /// if none exists.
    ///
    /// Single-call form of [`key_for`](Self::key_for) followed by
    /// [`entry`](Self::entry).
    pub fn entry_for(
        &mut self,
        path: &str,
        resource_type: ResourceType,
        options: TextureOptions,
    ) -> &TextureEntry {
        let key = self.key_for(path, resource_type, options);
        &self.entries[key]
    }

    /// Look up a handle by key
    pub fn entry(&self, key: TextureKey) -> Option<&TextureEntry> {
        self.entries.get(key)
    }

    /// Look up a handle mutably by key
    pub fn entry_mut(&mut self, key: TextureKey) -> Option<&mut TextureEntry> {
        self.entries.get_mut(key)
    }

    /// Whether a handle is alive for this key
    pub fn contains(&self, key: TextureKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of live handles
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry holds no handles
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a use of the handle at `now` for trim ordering
    pub fn touch(&mut self, key: TextureKey, now: Timestamp) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.touch(now);
        }
    }

    /// Delete every handle registered under `path`
    ///
    /// Releases native resources and fires any coalesced load callbacks with
    /// `false`. Idempotent: unknown paths are ignored.
    pub fn delete(&mut self, path: &str, backend: &mut dyn GpuBackend) {
        let keys = self.keys_for_path(path);
        if keys.is_empty() {
            log::debug!("delete: no handles for '{}'", path);
            return;
        }

        for key in keys {
            if let Some(entry) = self.entries.remove(key) {
                self.by_identity.remove(&entry.identity);
                self.pending_recreate.retain(|&k| k != key);

                match entry.state {
                    TextureState::Loaded(native) => native.release(backend),
                    TextureState::Loading { waiters } => {
                        log::debug!("delete: aborting in-flight load for '{}'", path);
                        for waiter in waiters {
                            waiter(false);
                        }
                    }
                    TextureState::Unloaded | TextureState::Failed => {}
                }
            }
        }
        log::debug!("Deleted texture handles for '{}'", path);
    }

    /// Drop the native resources of every handle under `path`, keeping the
    /// handles and queueing them for recreation.
    ///
    /// Used after a transient failure where the record should persist.
    pub fn invalidate(&mut self, path: &str, backend: &mut dyn GpuBackend) {
        for key in self.keys_for_path(path) {
            self.invalidate_entry(key, backend);
        }
    }

    /// Drop every resident native resource after GPU context loss
    ///
    /// Handles keep their metadata and move to the pending-recreate set; they
    /// render as absent until the recreate pass completes.
    pub fn invalidate_all(&mut self, backend: &mut dyn GpuBackend) {
        let keys: Vec<TextureKey> = self
            .entries
            .iter()
            .filter(|(_, e)| e.is_loaded())
            .map(|(k, _)| k)
            .collect();

        log::info!("Invalidating {} resident textures (context loss)", keys.len());
        for key in keys {
            self.invalidate_entry(key, backend);
        }
    }

    /// Keys awaiting recreation after invalidation
    pub fn pending_recreate(&self) -> &[TextureKey] {
        &self.pending_recreate
    }

    /// Drain the pending-recreate set for the recreation pass
    pub fn take_pending_recreate(&mut self) -> Vec<TextureKey> {
        std::mem::take(&mut self.pending_recreate)
    }

    /// Total resident bytes across all loaded handles (pinned included)
    pub fn resident_bytes(&self) -> usize {
        self.entries.values().map(TextureEntry::size_bytes).sum()
    }

    /// Evict least-recently-used, non-pinned handles until resident bytes fit
    /// the budget or nothing evictable remains.
    ///
    /// Evicted handles move to `Unloaded` (not pending-recreate); pinned
    /// handles are never evicted but still count toward the resident total.
    pub fn trim(&mut self, budget_bytes: usize, backend: &mut dyn GpuBackend) {
        let mut resident = self.resident_bytes();
        if resident <= budget_bytes {
            return;
        }

        // Ascending last_used; entry serial breaks ties deterministically.
        let mut candidates: Vec<(Timestamp, u64, TextureKey, usize)> = self
            .entries
            .iter()
            .filter(|(_, e)| e.is_loaded() && !e.is_pinned())
            .map(|(k, e)| (e.last_used(), e.serial, k, e.size_bytes()))
            .collect();
        candidates.sort_unstable_by_key(|&(last_used, serial, _, _)| (last_used, serial));

        let mut evicted = 0usize;
        for (_, _, key, size) in candidates {
            if resident <= budget_bytes {
                break;
            }
            if let Some(entry) = self.entries.get_mut(key) {
                if let TextureState::Loaded(native) =
                    std::mem::replace(&mut entry.state, TextureState::Unloaded)
                {
                    log::debug!("trim: evicting '{}' ({} bytes)", entry.identity.path, size);
                    native.release(backend);
                    resident -= size;
                    evicted += 1;
                }
            }
        }

        log::info!(
            "trim: evicted {} textures, {} bytes resident (budget {})",
            evicted,
            resident,
            budget_bytes
        );
    }

    fn keys_for_path(&self, path: &str) -> Vec<TextureKey> {
        self.entries
            .iter()
            .filter(|(_, e)| e.identity.path == path)
            .map(|(k, _)| k)
            .collect()
    }

    fn invalidate_entry(&mut self, key: TextureKey, backend: &mut dyn GpuBackend) {
        if let Some(entry) = self.entries.get_mut(key) {
            if let TextureState::Loaded(native) =
                std::mem::replace(&mut entry.state, TextureState::Unloaded)
            {
                native.release(backend);
                self.pending_recreate.push(key);
                log::debug!("Invalidated '{}', queued for recreation", entry.identity.path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::ImageData;
    use crate::render::backend::HeadlessBackend;
    use crate::render::texture::native::NativeTexture;

    /// Register a handle and force it into the Loaded state
    fn load_entry(
        registry: &mut TextureRegistry,
        backend: &mut HeadlessBackend,
        path: &str,
        options: TextureOptions,
        size: u32,
        last_used: Timestamp,
    ) -> TextureKey {
        let key = registry.key_for(path, ResourceType::Png, options);
        let pixels = ImageData::solid_color(size, size, [255; 4]);
        let native = NativeTexture::create(backend, &pixels, &options).unwrap();

        let entry = registry.entry_mut(key).unwrap();
        entry.state = TextureState::Loaded(native);
        entry.touch(last_used);
        key
    }

    #[test]
    fn test_idempotent_identity() {
        let mut registry = TextureRegistry::new();
        let options = TextureOptions::default();

        let a = registry.key_for("ui/icon", ResourceType::Png, options);
        let b = registry.key_for("ui/icon", ResourceType::Png, options);
        assert_eq!(a, b);
        assert_eq!(registry.len(), 1);

        // Different options produce a distinct handle
        let c = registry.key_for("ui/icon", ResourceType::Png, TextureOptions::always_resident());
        assert_ne!(a, c);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_entry_for_creates_then_returns_existing() {
        let mut registry = TextureRegistry::new();
        let options = TextureOptions::default();

        let entry = registry.entry_for("ui/icon", ResourceType::Png, options);
        assert_eq!(entry.path(), "ui/icon");
        assert!(!entry.is_loaded());
        assert_eq!(registry.len(), 1);

        // Second call returns the existing handle, not a new one
        registry.entry_for("ui/icon", ResourceType::Png, options);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_keys_not_reused_after_delete() {
        let mut registry = TextureRegistry::new();
        let mut backend = HeadlessBackend::new();
        let options = TextureOptions::default();

        let a = registry.key_for("ui/icon", ResourceType::Png, options);
        registry.delete("ui/icon", &mut backend);
        assert!(!registry.contains(a));

        let b = registry.key_for("ui/icon", ResourceType::Png, options);
        assert_ne!(a, b);
        assert!(!registry.contains(a));
    }

    #[test]
    fn test_delete_releases_native_and_is_idempotent() {
        let mut registry = TextureRegistry::new();
        let mut backend = HeadlessBackend::new();

        load_entry(&mut registry, &mut backend, "ui/icon", TextureOptions::default(), 4, 1);
        assert_eq!(backend.live_count(), 1);

        registry.delete("ui/icon", &mut backend);
        assert_eq!(backend.live_count(), 0);
        assert!(registry.is_empty());

        // Second delete is a no-op
        registry.delete("ui/icon", &mut backend);
        assert_eq!(backend.destroyed(), 1);
    }

    #[test]
    fn test_delete_fires_pending_waiters() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let mut registry = TextureRegistry::new();
        let mut backend = HeadlessBackend::new();
        let key = registry.key_for("ui/icon", ResourceType::Png, TextureOptions::default());

        let failures = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&failures);
        registry.entry_mut(key).unwrap().state = TextureState::Loading {
            waiters: vec![Box::new(move |loaded| {
                assert!(!loaded);
                counter.fetch_add(1, Ordering::SeqCst);
            })],
        };

        registry.delete("ui/icon", &mut backend);
        assert_eq!(failures.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_invalidate_all_queues_recreation() {
        let mut registry = TextureRegistry::new();
        let mut backend = HeadlessBackend::new();

        let a = load_entry(&mut registry, &mut backend, "a", TextureOptions::default(), 4, 1);
        let b = load_entry(&mut registry, &mut backend, "b", TextureOptions::default(), 4, 2);
        let unloaded = registry.key_for("c", ResourceType::Png, TextureOptions::default());

        registry.invalidate_all(&mut backend);

        assert_eq!(backend.live_count(), 0);
        assert!(!registry.entry(a).unwrap().is_loaded());
        assert!(!registry.entry(b).unwrap().is_loaded());

        let pending = registry.take_pending_recreate();
        assert_eq!(pending.len(), 2);
        assert!(pending.contains(&a));
        assert!(pending.contains(&b));
        assert!(!pending.contains(&unloaded));
        assert!(registry.pending_recreate().is_empty());
    }

    #[test]
    fn test_trim_monotonicity() {
        let mut registry = TextureRegistry::new();
        let mut backend = HeadlessBackend::new();

        // Three 4x4 RGBA textures, 64 bytes each, oldest first
        let old = load_entry(&mut registry, &mut backend, "old", TextureOptions::default(), 4, 10);
        let mid = load_entry(&mut registry, &mut backend, "mid", TextureOptions::default(), 4, 20);
        let new = load_entry(&mut registry, &mut backend, "new", TextureOptions::default(), 4, 30);
        assert_eq!(registry.resident_bytes(), 3 * 64);

        registry.trim(128, &mut backend);

        assert!(registry.resident_bytes() <= 128);
        assert!(!registry.entry(old).unwrap().is_loaded());
        assert!(registry.entry(mid).unwrap().is_loaded());
        assert!(registry.entry(new).unwrap().is_loaded());
    }

    #[test]
    fn test_trim_never_evicts_pinned() {
        let mut registry = TextureRegistry::new();
        let mut backend = HeadlessBackend::new();

        let pinned = load_entry(
            &mut registry,
            &mut backend,
            "pinned",
            TextureOptions::always_resident(),
            4,
            1, // least recently used
        );
        let plain = load_entry(&mut registry, &mut backend, "plain", TextureOptions::default(), 4, 99);

        // Budget of zero: everything evictable goes, pinned stays
        registry.trim(0, &mut backend);

        assert!(registry.entry(pinned).unwrap().is_loaded());
        assert!(!registry.entry(plain).unwrap().is_loaded());
        assert_eq!(registry.resident_bytes(), 64);
    }

    #[test]
    fn test_trim_under_budget_is_noop() {
        let mut registry = TextureRegistry::new();
        let mut backend = HeadlessBackend::new();

        load_entry(&mut registry, &mut backend, "a", TextureOptions::default(), 4, 1);
        registry.trim(1024, &mut backend);

        assert_eq!(registry.resident_bytes(), 64);
        assert_eq!(backend.destroyed(), 0);
    }

    #[test]
    fn test_trim_tie_break_by_serial() {
        let mut registry = TextureRegistry::new();
        let mut backend = HeadlessBackend::new();

        // Same last_used tick: the earlier-created entry is evicted first
        let first = load_entry(&mut registry, &mut backend, "first", TextureOptions::default(), 4, 5);
        let second = load_entry(&mut registry, &mut backend, "second", TextureOptions::default(), 4, 5);

        registry.trim(64, &mut backend);

        assert!(!registry.entry(first).unwrap().is_loaded());
        assert!(registry.entry(second).unwrap().is_loaded());
    }

    #[test]
    fn test_invalidate_single_path() {
        let mut registry = TextureRegistry::new();
        let mut backend = HeadlessBackend::new();

        let a = load_entry(&mut registry, &mut backend, "a", TextureOptions::default(), 4, 1);
        let b = load_entry(&mut registry, &mut backend, "b", TextureOptions::default(), 4, 2);

        registry.invalidate("a", &mut backend);

        assert!(!registry.entry(a).unwrap().is_loaded());
        assert!(registry.entry(b).unwrap().is_loaded());
        assert_eq!(registry.pending_recreate(), &[a]);
    }
}
