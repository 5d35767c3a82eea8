//! Image-source abstraction for the `imageClip`/`imageWrap` built-ins.
//!
//! The core never decodes image files. When a parse reaches an image
//! function, the filename literal is handed to an [`ImageSource`] supplied
//! by the host, which returns the decoded [`Raster`] (or `None`, surfaced
//! as a `ResourceError`). Different hosts provide different sources:
//! the CLI decodes files from disk, tests and filesystem-less hosts use
//! [`MemoryImageSource`].

use std::collections::HashMap;
use std::sync::Arc;

use prism_graphics::raster::Raster;

/// Resolves the filename inside an image function to a decoded raster.
pub trait ImageSource {
    /// Load an image by the name written in the expression.
    ///
    /// Returns `None` if the name cannot be resolved.
    fn load(&self, name: &str) -> Option<Arc<Raster>>;
}

/// An image source that never finds any images.
///
/// The default when no source is configured; every image function fails
/// to parse with a resource error.
pub struct NullImageSource;

impl ImageSource for NullImageSource {
    fn load(&self, _name: &str) -> Option<Arc<Raster>> {
        None
    }
}

/// An in-memory image source backed by a name → raster map.
#[derive(Default)]
pub struct MemoryImageSource {
    rasters: HashMap<String, Arc<Raster>>,
}

impl MemoryImageSource {
    /// Create an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a raster under the given name, replacing any previous one.
    pub fn insert(&mut self, name: impl Into<String>, raster: Raster) {
        self.rasters.insert(name.into(), Arc::new(raster));
    }
}

impl ImageSource for MemoryImageSource {
    fn load(&self, name: &str) -> Option<Arc<Raster>> {
        self.rasters.get(name).cloned()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
