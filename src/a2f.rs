//! Address-to-function lookup.
//!
//! Maps a virtual address to the image and function containing it, either
//! one address at a time (human-readable) or in batch from a
//! newline-delimited address list (JSON records).

use std::fmt;
use std::io::BufRead;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::util::basename;

/// A function's address range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    /// First address.
    pub start: u64,
    /// One past the last address.
    pub end: u64,
    /// Name from the image's own symbol table, when known.
    pub name: Option<String>,
}

/// Source of image ranges, function bounds and symbols.
pub trait FunctionSource {
    /// Path of the image whose range contains `addr`.
    fn image_containing(&self, addr: u64) -> Option<String>;

    /// The function in `image` containing `addr`.
    fn function_containing(&self, image: &str, addr: u64) -> Option<Function>;

    /// Cache-wide symbol whose address is exactly `addr`.
    fn symbol_at(&self, addr: u64) -> Option<String>;
}

/// Result of looking up one address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionLookup {
    /// Unslid address that was looked up.
    #[serde(skip_serializing_if = "is_zero")]
    pub addr: u64,
    /// Function start.
    #[serde(skip_serializing_if = "is_zero")]
    pub start: u64,
    /// Function end.
    #[serde(skip_serializing_if = "is_zero")]
    pub end: u64,
    /// Function size.
    #[serde(skip_serializing_if = "is_zero")]
    pub size: u64,
    /// Symbol name, empty when unknown.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Basename of the containing image.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub image: String,
}

fn is_zero(v: &u64) -> bool {
    *v == 0
}

impl FunctionLookup {
    /// Offset of the looked-up address from the function start.
    pub fn offset(&self) -> u64 {
        self.addr - self.start
    }

    /// Formats the lookup for display, labelling it with the address as the
    /// user supplied it (before slide removal).
    pub fn describe(&self, query: u64) -> String {
        let name = if self.name.is_empty() {
            format!("func_{query:x}")
        } else if self.offset() == 0 {
            self.name.clone()
        } else {
            format!("{} + {}", self.name, self.offset())
        };
        format!(
            "{query:#x}: {name} (start: {:#x}, end: {:#x})",
            self.start, self.end
        )
    }
}

impl fmt::Display for FunctionLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe(self.addr))
    }
}

/// Parses a `0x`-prefixed hex or decimal address.
pub fn parse_address(input: &str) -> Result<u64> {
    let s = input.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|_| Error::InvalidAddress {
        input: input.to_string(),
    })
}

/// Removes the slide from a runtime address.
pub fn unslide(addr: u64, slide: u64) -> Result<u64> {
    addr.checked_sub(slide)
        .ok_or(Error::AddressBelowSlide { addr, slide })
}

/// Address lookups against a [`FunctionSource`] with a fixed slide.
pub struct AddressLookup<'a, S: FunctionSource + ?Sized> {
    source: &'a S,
    slide: u64,
}

impl<'a, S: FunctionSource + ?Sized> AddressLookup<'a, S> {
    /// Creates a lookup with no slide.
    pub fn new(source: &'a S) -> Self {
        Self { source, slide: 0 }
    }

    /// Sets the slide subtracted from every address.
    pub fn with_slide(mut self, slide: u64) -> Self {
        self.slide = slide;
        self
    }

    /// Looks up one address.
    ///
    /// Fails when the address is in no image; returns `None` when it is in an
    /// image but outside every known function.
    pub fn lookup(&self, addr: u64) -> Result<Option<FunctionLookup>> {
        let unslid = unslide(addr, self.slide)?;
        let image = self
            .source
            .image_containing(unslid)
            .ok_or(Error::AddressNotInImage { addr: unslid })?;

        let Some(func) = self.source.function_containing(&image, unslid) else {
            debug!("{:#x} is not in any known function", unslid);
            return Ok(None);
        };

        let name = self
            .source
            .symbol_at(func.start)
            .or(func.name)
            .unwrap_or_default();

        Ok(Some(FunctionLookup {
            addr: unslid,
            start: func.start,
            end: func.end,
            size: func.end - func.start,
            name,
            image: basename(&image).to_string(),
        }))
    }

    /// Looks up every address in a newline-delimited list.
    ///
    /// Blank lines are skipped; addresses outside any function are dropped.
    pub fn lookup_batch<R: BufRead>(&self, reader: R) -> Result<Vec<FunctionLookup>> {
        let mut out = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            if let Some(found) = self.lookup(parse_address(&line)?)? {
                out.push(found);
            }
        }
        info!("Resolved {} addresses", out.len());
        Ok(out)
    }
}
