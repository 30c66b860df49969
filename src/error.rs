//! Error types for header reconstruction.
//!
//! Every fallible operation in the crate returns [`Error`]. The only
//! non-fatal variant is [`Error::ObjcSectionNotFound`], which providers use to
//! signal that a binary simply has no metadata of the requested kind.

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for metadata loading and header generation.
#[derive(Error, Debug)]
pub enum Error {
    // ==================== I/O Errors ====================
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to open file '{path}': {source}")]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to memory map file '{path}': {source}")]
    MemoryMap {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write header {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ==================== Configuration Errors ====================
    #[error("dyld shared cache is required to {feature}")]
    CacheRequired { feature: &'static str },

    #[error("failed to compile regex '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    // ==================== Metadata Errors ====================
    #[error("macho does not contain objc {section} section")]
    ObjcSectionNotFound { section: &'static str },

    #[error("invalid metadata dump '{path}': {source}")]
    InvalidDump {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("image not found: {name}")]
    ImageNotFound { name: String },

    // ==================== Address Lookup Errors ====================
    #[error("invalid address '{input}'")]
    InvalidAddress { input: String },

    #[error("address {addr:#x} is below the slide {slide:#x}")]
    AddressBelowSlide { addr: u64, slide: u64 },

    #[error("address {addr:#x} not in any image")]
    AddressNotInImage { addr: u64 },
}

/// A specialized Result type for header reconstruction.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns true if this error only signals a missing ObjC section.
    ///
    /// Callers treat this as an empty entity list rather than a failure.
    #[inline]
    pub fn is_not_present(&self) -> bool {
        matches!(self, Error::ObjcSectionNotFound { .. })
    }

    /// Creates a section-not-found signal.
    #[inline]
    pub fn not_present(section: &'static str) -> Self {
        Error::ObjcSectionNotFound { section }
    }

    /// Creates an image-not-found error.
    #[inline]
    pub fn image_not_found(name: impl Into<String>) -> Self {
        Error::ImageNotFound { name: name.into() }
    }
}

/// Maps the section-not-present signal to an empty list.
///
/// Any other error is passed through unchanged.
pub fn or_empty<T>(result: Result<Vec<T>>) -> Result<Vec<T>> {
    match result {
        Err(e) if e.is_not_present() => Ok(Vec::new()),
        other => other,
    }
}
