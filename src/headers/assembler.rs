//! Header text layout and file writing.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::imports::Imports;
use super::resolver::FOUNDATION_MODULE;
use crate::error::{Error, Result};

/// Everything needed to render one header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderInfo {
    /// Target file.
    pub path: PathBuf,
    /// Version of the generating tool.
    pub tool_version: String,
    /// Rendered `LC_BUILD_VERSION` commands.
    pub build_versions: Vec<String>,
    /// Rendered `LC_SOURCE_VERSION`, empty when absent.
    pub source_version: String,
    /// Umbrella headers skip the implicit framework imports.
    pub is_umbrella: bool,
    /// Include guard name (without the `_h` suffix).
    pub name: String,
    /// Normalized imports.
    pub imports: Imports,
    /// Declaration body.
    pub body: String,
}

impl HeaderInfo {
    /// Renders the full header text.
    pub fn render(&self) -> String {
        let mut out = String::new();

        out.push_str("//\n");
        let _ = writeln!(out, "//   Generated by objcdump ({})", self.tool_version);
        out.push_str("//\n");
        for bv in &self.build_versions {
            let _ = writeln!(out, "//    - LC_BUILD_VERSION:  {bv}");
        }
        let _ = writeln!(out, "//    - LC_SOURCE_VERSION: {}", self.source_version);
        out.push_str("//\n");
        let _ = writeln!(out, "#ifndef {}_h", self.name);
        let _ = writeln!(out, "#define {}_h", self.name);

        if !self.is_umbrella {
            let _ = writeln!(out, "@import {FOUNDATION_MODULE};");
            for hint in self.imports.imports.iter().filter(|h| *h != FOUNDATION_MODULE) {
                let _ = writeln!(out, "@import {hint};");
            }
        }
        out.push('\n');

        if !self.imports.locals.is_empty() {
            for local in &self.imports.locals {
                let _ = writeln!(out, "#include \"{local}\"");
            }
            out.push('\n');
        }
        if !self.imports.classes.is_empty() {
            let _ = writeln!(out, "@class {};", self.imports.classes.join(", "));
        }
        if !self.imports.protos.is_empty() {
            let _ = writeln!(out, "@protocol {};", self.imports.protos.join(", "));
        }
        if self.imports.has_forward_decls() {
            out.push('\n');
        }

        let _ = writeln!(out, "{}", self.body);
        let _ = writeln!(out, "#endif /* {}_h */", self.name);
        out
    }

    /// Renders and writes the header, creating parent directories.
    pub fn write(&self) -> Result<()> {
        write_file(&self.path, &self.render())
    }
}

/// Writes `contents` to `path`, creating parent directories.
pub fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::CreateDir {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    info!("Creating {}", path.display());
    fs::write(path, contents).map_err(|e| Error::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })?;
    debug!("Wrote {} bytes", contents.len());
    Ok(())
}

/// Include guard name for an umbrella header.
pub fn umbrella_guard(umbrella: &str) -> String {
    umbrella.replace('-', "_")
}

/// Umbrella body: one `#import` per header, in emission order.
pub fn umbrella_body<S: AsRef<str>>(headers: &[S]) -> String {
    let mut body = String::new();
    for header in headers {
        let _ = writeln!(body, "#import \"{}\"", header.as_ref());
    }
    body
}

/// Recovers the include guard name from rendered header text.
pub fn parse_include_guard(text: &str) -> Option<&str> {
    text.lines()
        .find_map(|line| line.strip_prefix("#ifndef "))
        .and_then(|guard| guard.trim().strip_suffix("_h"))
}
