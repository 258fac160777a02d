//! Resource lookup collaborators
//!
//! The texture cache never touches the filesystem directly; it asks a
//! [`ResourceSource`] to locate and read raw resource bytes. This keeps
//! package/archive lookup out of the cache and makes the load pipeline
//! testable with in-memory data.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::assets::AssetError;

/// Supported resource formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    /// PNG image
    Png,
    /// JPEG image
    Jpeg,
    /// TGA image
    Tga,
}

impl ResourceType {
    /// File extension for this resource type
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Tga => "tga",
        }
    }

    /// All resource types, in lookup-priority order
    pub fn all() -> [Self; 3] {
        [Self::Png, Self::Jpeg, Self::Tga]
    }

    /// Corresponding `image` crate format
    pub fn image_format(self) -> image::ImageFormat {
        match self {
            Self::Png => image::ImageFormat::Png,
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::Tga => image::ImageFormat::Tga,
        }
    }
}

/// Abstract resource lookup
///
/// Implementations must be shareable with decode worker threads.
pub trait ResourceSource: Send + Sync {
    /// Determine which resource type (if any) exists for `path`
    fn find_resource(&self, path: &str) -> Option<ResourceType>;

    /// Read the raw bytes of the resource at `path`
    fn read_resource(&self, path: &str, resource_type: ResourceType) -> Result<Vec<u8>, AssetError>;
}

/// Filesystem-backed resource source
///
/// Paths are resolved relative to a root directory; the resource type is
/// discovered by probing known extensions in priority order.
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    /// Create a source rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str, resource_type: ResourceType) -> PathBuf {
        self.root
            .join(format!("{}.{}", path, resource_type.extension()))
    }
}

impl ResourceSource for FileSource {
    fn find_resource(&self, path: &str) -> Option<ResourceType> {
        ResourceType::all()
            .into_iter()
            .find(|ty| self.resolve(path, *ty).exists())
    }

    fn read_resource(&self, path: &str, resource_type: ResourceType) -> Result<Vec<u8>, AssetError> {
        let full_path = self.resolve(path, resource_type);
        if !full_path.exists() {
            return Err(AssetError::ResourceNotFound(path.to_string()));
        }

        log::debug!("Reading resource {:?}", full_path);
        std::fs::read(&full_path).map_err(|e| AssetError::ReadFailed {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }
}

/// In-memory resource source
///
/// Used by tests and for embedded resources shipped inside the binary.
#[derive(Default)]
pub struct MemorySource {
    entries: HashMap<String, (ResourceType, Vec<u8>)>,
}

impl MemorySource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Register resource bytes under `path`
    pub fn insert(&mut self, path: impl Into<String>, resource_type: ResourceType, bytes: Vec<u8>) {
        self.entries.insert(path.into(), (resource_type, bytes));
    }

    /// Number of registered resources
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the source holds no resources
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ResourceSource for MemorySource {
    fn find_resource(&self, path: &str) -> Option<ResourceType> {
        self.entries.get(path).map(|(ty, _)| *ty)
    }

    fn read_resource(&self, path: &str, resource_type: ResourceType) -> Result<Vec<u8>, AssetError> {
        match self.entries.get(path) {
            Some((ty, bytes)) if *ty == resource_type => Ok(bytes.clone()),
            _ => Err(AssetError::ResourceNotFound(path.to_string())),
        }
    }
}
