//! Metadata providers.
//!
//! Decoding ObjC metadata out of a Mach-O and loading images out of a dyld
//! shared cache are handled by collaborators behind two traits:
//!
//! - [`ObjcMetadata`] - one binary's typed descriptors and load-command facts
//! - [`ImageProvider`] - resolves an image name to an [`ObjcMetadata`]
//!
//! [`MachODump`] and [`CacheDump`] implement both from JSON documents.

mod dump;

pub use dump::*;

use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::objc::{CategoryDescriptor, ClassDescriptor, ObjcRef, ProtocolDescriptor, RefKind};

/// Typed ObjC metadata of a single binary.
///
/// The `classes`, `protocols` and `categories` accessors return
/// [`Error::ObjcSectionNotFound`] when the binary has no such section; any
/// other error is a genuine parse failure.
pub trait ObjcMetadata: Send + Sync {
    /// Path of the binary, used for logging and as a fallback module name.
    fn path(&self) -> &str;

    /// Returns true if the binary carries any ObjC metadata.
    fn has_objc(&self) -> bool;

    /// Classes from `__objc_classlist`.
    fn classes(&self) -> Result<Vec<ClassDescriptor>>;

    /// Protocols from `__objc_protolist`.
    fn protocols(&self) -> Result<Vec<ProtocolDescriptor>>;

    /// Categories from `__objc_catlist`.
    fn categories(&self) -> Result<Vec<CategoryDescriptor>>;

    /// Reference slots of one kind, e.g. `__objc_selrefs`.
    fn references(&self, kind: RefKind) -> Result<Vec<ObjcRef>>;

    /// Install name from `LC_ID_DYLIB`.
    fn dylib_id(&self) -> Option<&str>;

    /// Rendered `LC_BUILD_VERSION` commands.
    fn build_versions(&self) -> Vec<String>;

    /// Rendered `LC_SOURCE_VERSION`, if present.
    fn source_version(&self) -> Option<String>;

    /// Install names of every imported library.
    fn imported_libraries(&self) -> Vec<String>;
}

/// Resolves image names (full install names or basenames) to binaries.
pub trait ImageProvider: Send + Sync {
    /// Loads the named image.
    fn image(&self, name: &str) -> Result<Arc<dyn ObjcMetadata>>;
}

/// Which imported libraries to follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DependencyMode {
    /// Only the primary binary.
    #[default]
    None,
    /// Imported libraries under `PrivateFrameworks`.
    Private,
    /// Every imported library.
    All,
}

impl DependencyMode {
    /// Returns true if `install_name` should be followed.
    pub fn follows(&self, install_name: &str) -> bool {
        match self {
            DependencyMode::None => false,
            DependencyMode::Private => install_name.contains("PrivateFrameworks"),
            DependencyMode::All => true,
        }
    }
}

/// Collects the primary binary followed by the dependencies selected by
/// `mode`.
///
/// Following dependencies requires an image provider; a dependency that
/// fails to load aborts the whole collection.
pub fn collect_binaries(
    primary: Arc<dyn ObjcMetadata>,
    images: Option<&dyn ImageProvider>,
    mode: DependencyMode,
) -> Result<Vec<Arc<dyn ObjcMetadata>>> {
    let mut binaries = vec![Arc::clone(&primary)];
    if mode == DependencyMode::None {
        return Ok(binaries);
    }

    let images = images.ok_or(Error::CacheRequired {
        feature: "follow imported libraries",
    })?;

    for name in primary.imported_libraries() {
        if !mode.follows(&name) {
            continue;
        }
        debug!("Loading dependency {}", name);
        binaries.push(images.image(&name)?);
    }

    Ok(binaries)
}
