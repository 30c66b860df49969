//! objcdump - Objective-C header reconstruction from runtime metadata.
//!
//! This library rebuilds class-dump style headers for the classes, protocols
//! and categories of a binary whose only surviving description is its ObjC
//! runtime metadata. Each entity gets its own header with a minimal set of
//! `#include`s and forward declarations, and each module gets an umbrella
//! header.
//!
//! # Features
//!
//! - Type-encoding classification into local includes and forward declarations
//! - Foundation/CoreFoundation suppression
//! - Protocol deduplication by identity
//! - Synthesized accessor stripping
//! - Regex-filtered class/protocol/category dumps
//! - Address-to-function lookup
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use objcdump::{CacheDump, HeaderOptions, MachODump};
//!
//! fn main() -> objcdump::Result<()> {
//!     let cache = Arc::new(CacheDump::open("/path/to/cache.json")?);
//!     let binary = Arc::new(MachODump::open("/path/to/App.json")?);
//!
//!     let options = HeaderOptions::default().with_output("headers");
//!     objcdump::generate_headers(binary, Some(cache), options)?;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod a2f;
pub mod dump;
pub mod error;
pub mod headers;
pub mod objc;
pub mod provider;
pub mod util;

// Re-export main types
pub use dump::Dumper;
pub use error::{Error, Result};
pub use headers::{FoundationIndex, HeaderGenerator, HeaderOptions, ModuleReport};
pub use provider::{CacheDump, DependencyMode, ImageProvider, MachODump, ObjcMetadata};

use std::sync::Arc;

/// Generates headers for `binary` and, per `options`, its dependencies.
///
/// # Arguments
///
/// * `binary` - The primary binary
/// * `images` - Image provider used for Foundation suppression and dependencies
/// * `options` - Output root, module name and dependency mode
///
/// # Returns
///
/// One report per binary that carried ObjC metadata.
pub fn generate_headers(
    binary: Arc<dyn ObjcMetadata>,
    images: Option<Arc<dyn ImageProvider>>,
    options: HeaderOptions,
) -> Result<Vec<ModuleReport>> {
    HeaderGenerator::new(options, images)?.generate(binary)
}
