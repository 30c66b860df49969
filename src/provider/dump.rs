//! JSON-backed metadata providers.
//!
//! A [`MachODump`] is the decoded metadata of one binary; a [`CacheDump`] is
//! a set of them standing in for a dyld shared cache. Both are read through a
//! memory map and deserialized with `serde_json`.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use memmap2::Mmap;
use serde::{Deserialize, Serialize};

use super::{ImageProvider, ObjcMetadata};
use crate::a2f::{Function, FunctionSource};
use crate::error::{Error, Result};
use crate::objc::{CategoryDescriptor, ClassDescriptor, ObjcRef, ProtocolDescriptor, RefKind};
use crate::util::basename;

// =============================================================================
// File Loading
// =============================================================================

/// Memory-maps `path` and deserializes it as JSON.
fn load_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| Error::FileOpen {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Error::MemoryMap {
        path: path.to_path_buf(),
        source: e,
    })?;

    serde_json::from_slice(&mmap).map_err(|e| Error::InvalidDump {
        path: path.to_path_buf(),
        source: e,
    })
}

// =============================================================================
// MachO Dump
// =============================================================================

/// ObjC sections of a dumped binary. `None` means the section is absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjcSections {
    /// `__objc_classlist`
    pub classes: Option<Vec<ClassDescriptor>>,
    /// `__objc_protolist`
    pub protocols: Option<Vec<ProtocolDescriptor>>,
    /// `__objc_catlist`
    pub categories: Option<Vec<CategoryDescriptor>>,
}

/// ObjC reference sections of a dumped binary. `None` means absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjcReferences {
    /// `__objc_protorefs`
    pub protocols: Option<Vec<ObjcRef>>,
    /// `__objc_classrefs`
    pub classes: Option<Vec<ObjcRef>>,
    /// `__objc_superrefs`
    pub supers: Option<Vec<ObjcRef>>,
    /// `__objc_selrefs`
    pub selectors: Option<Vec<ObjcRef>>,
}

impl ObjcReferences {
    fn get(&self, kind: RefKind) -> Option<&Vec<ObjcRef>> {
        match kind {
            RefKind::Protocol => self.protocols.as_ref(),
            RefKind::Class => self.classes.as_ref(),
            RefKind::Super => self.supers.as_ref(),
            RefKind::Selector => self.selectors.as_ref(),
        }
    }
}

/// A function range inside an image.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FunctionEntry {
    /// First address of the function.
    pub start: u64,
    /// One past the last address.
    pub end: u64,
    /// Symbol name, when known.
    pub name: Option<String>,
}

/// Decoded metadata of one binary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MachODump {
    /// Path of the binary (install name for cache images).
    pub path: String,
    /// `LC_ID_DYLIB` install name.
    pub dylib_id: Option<String>,
    /// Rendered `LC_BUILD_VERSION` commands.
    pub build_versions: Vec<String>,
    /// Rendered `LC_SOURCE_VERSION`.
    pub source_version: Option<String>,
    /// Imported library install names.
    pub imported_libraries: Vec<String>,
    /// ObjC metadata, `None` when the binary has none.
    pub objc: Option<ObjcSections>,
    /// ObjC reference sections.
    pub refs: ObjcReferences,
    /// Unslid load address.
    pub address: u64,
    /// Size of the mapped image.
    pub size: u64,
    /// Function ranges, sorted by start address once loaded.
    pub functions: Vec<FunctionEntry>,
}

impl MachODump {
    /// Opens a dump file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut dump: MachODump = load_json(path)?;
        if dump.path.is_empty() {
            dump.path = path.display().to_string();
        }
        dump.prepare();
        Ok(dump)
    }

    fn prepare(&mut self) {
        self.functions.sort_by_key(|f| f.start);
    }

    /// Returns the basename of the path.
    pub fn basename(&self) -> &str {
        basename(&self.path)
    }

    /// Returns true if the path or basename contains `filter`.
    pub fn matches_filter(&self, filter: &str) -> bool {
        self.path.contains(filter) || self.basename().contains(filter)
    }

    /// Returns true if `addr` falls inside this image.
    #[inline]
    pub fn contains_addr(&self, addr: u64) -> bool {
        addr >= self.address && addr < self.address.saturating_add(self.size)
    }

    /// Finds the function containing `addr`.
    pub fn function_containing(&self, addr: u64) -> Option<&FunctionEntry> {
        let idx = self.functions.partition_point(|f| f.start <= addr);
        let func = self.functions.get(idx.checked_sub(1)?)?;
        (addr < func.end).then_some(func)
    }

    fn section<T: Clone>(
        &self,
        name: &'static str,
        pick: impl FnOnce(&ObjcSections) -> Option<&Vec<T>>,
    ) -> Result<Vec<T>> {
        self.objc
            .as_ref()
            .and_then(pick)
            .cloned()
            .ok_or(Error::not_present(name))
    }
}

impl ObjcMetadata for MachODump {
    fn path(&self) -> &str {
        &self.path
    }

    fn has_objc(&self) -> bool {
        self.objc.is_some()
    }

    fn classes(&self) -> Result<Vec<ClassDescriptor>> {
        self.section("classlist", |s| s.classes.as_ref())
    }

    fn protocols(&self) -> Result<Vec<ProtocolDescriptor>> {
        self.section("protolist", |s| s.protocols.as_ref())
    }

    fn categories(&self) -> Result<Vec<CategoryDescriptor>> {
        self.section("catlist", |s| s.categories.as_ref())
    }

    fn references(&self, kind: RefKind) -> Result<Vec<ObjcRef>> {
        self.refs
            .get(kind)
            .cloned()
            .ok_or(Error::not_present(kind.section()))
    }

    fn dylib_id(&self) -> Option<&str> {
        self.dylib_id.as_deref()
    }

    fn build_versions(&self) -> Vec<String> {
        self.build_versions.clone()
    }

    fn source_version(&self) -> Option<String> {
        self.source_version.clone()
    }

    fn imported_libraries(&self) -> Vec<String> {
        self.imported_libraries.clone()
    }
}

// =============================================================================
// Cache Dump
// =============================================================================

#[derive(Deserialize)]
struct CacheDocument {
    #[serde(default)]
    images: Vec<MachODump>,
    #[serde(default)]
    symbols: Vec<SymbolEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct SymbolEntry {
    address: u64,
    name: String,
}

/// A set of dumped images standing in for a dyld shared cache.
#[derive(Debug, Default)]
pub struct CacheDump {
    /// Path to the cache dump (empty when built in memory).
    pub path: PathBuf,
    images: Vec<Arc<MachODump>>,
    /// Address-to-symbol map, sorted by address.
    symbols: Vec<(u64, String)>,
}

impl CacheDump {
    /// Opens a cache dump file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let doc: CacheDocument = load_json(path)?;
        let mut cache = Self::from_images(doc.images);
        cache.path = path.to_path_buf();
        cache.symbols = doc.symbols.into_iter().map(|s| (s.address, s.name)).collect();
        cache.symbols.sort_by_key(|(addr, _)| *addr);
        Ok(cache)
    }

    /// Builds a cache from in-memory images.
    pub fn from_images(images: Vec<MachODump>) -> Self {
        let images = images
            .into_iter()
            .map(|mut img| {
                img.prepare();
                Arc::new(img)
            })
            .collect();
        Self {
            path: PathBuf::new(),
            images,
            symbols: Vec::new(),
        }
    }

    /// Adds an address-to-symbol entry.
    pub fn with_symbol(mut self, address: u64, name: impl Into<String>) -> Self {
        let pos = self.symbols.partition_point(|(a, _)| *a < address);
        self.symbols.insert(pos, (address, name.into()));
        self
    }

    /// Returns an iterator over all images.
    pub fn iter_images(&self) -> impl Iterator<Item = &Arc<MachODump>> {
        self.images.iter()
    }

    /// Returns the number of images.
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Finds an image by install name, then basename, then substring.
    pub fn find_image(&self, name: &str) -> Option<&Arc<MachODump>> {
        self.images
            .iter()
            .find(|img| img.path == name)
            .or_else(|| self.images.iter().find(|img| img.basename() == name))
            .or_else(|| self.images.iter().find(|img| img.matches_filter(name)))
    }
}

impl ImageProvider for CacheDump {
    fn image(&self, name: &str) -> Result<Arc<dyn ObjcMetadata>> {
        let img = self.find_image(name).ok_or_else(|| Error::image_not_found(name))?;
        Ok(Arc::clone(img) as Arc<dyn ObjcMetadata>)
    }
}

impl FunctionSource for CacheDump {
    fn image_containing(&self, addr: u64) -> Option<String> {
        self.images
            .iter()
            .find(|img| img.contains_addr(addr))
            .map(|img| img.path.clone())
    }

    fn function_containing(&self, image: &str, addr: u64) -> Option<Function> {
        let img = self.images.iter().find(|img| img.path == image)?;
        img.function_containing(addr).map(|f| Function {
            start: f.start,
            end: f.end,
            name: f.name.clone(),
        })
    }

    fn symbol_at(&self, addr: u64) -> Option<String> {
        self.symbols
            .binary_search_by_key(&addr, |(a, _)| *a)
            .ok()
            .map(|idx| self.symbols[idx].1.clone())
    }
}
