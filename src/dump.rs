//! Regex-filtered listing of ObjC entities.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::Arc;

use regex::Regex;
use tracing::debug;

use crate::error::{or_empty, Error, Result};
use crate::objc::render::{render_category, render_class, render_protocol};
use crate::objc::RefKind;
use crate::provider::ObjcMetadata;

/// Compiles a name filter.
pub fn compile_pattern(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::InvalidPattern {
        pattern: pattern.to_string(),
        source: e,
    })
}

/// Dumps classes, protocols and categories whose names match a pattern.
///
/// Binaries are visited in order; within each binary entities are sorted by
/// name. A binary without the requested section contributes nothing.
pub struct Dumper {
    binaries: Vec<Arc<dyn ObjcMetadata>>,
}

impl Dumper {
    /// Creates a dumper over `binaries`.
    pub fn new(binaries: Vec<Arc<dyn ObjcMetadata>>) -> Self {
        Self { binaries }
    }

    /// Rendered `@interface` blocks of matching classes.
    pub fn classes(&self, pattern: &str) -> Result<Vec<String>> {
        let re = compile_pattern(pattern)?;
        let mut out = Vec::new();
        for binary in &self.binaries {
            let mut classes = or_empty(binary.classes())?;
            classes.sort_by(|a, b| a.name.cmp(&b.name));
            out.extend(
                classes
                    .iter()
                    .filter(|c| re.is_match(&c.name))
                    .map(render_class),
            );
        }
        debug!("{} classes match '{}'", out.len(), pattern);
        Ok(out)
    }

    /// Rendered `@protocol` blocks of matching protocols, one per identity.
    pub fn protocols(&self, pattern: &str) -> Result<Vec<String>> {
        let re = compile_pattern(pattern)?;
        let mut out = Vec::new();
        for binary in &self.binaries {
            let mut protocols = or_empty(binary.protocols())?;
            protocols.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
            let mut seen = HashSet::new();
            out.extend(
                protocols
                    .iter()
                    .filter(|p| re.is_match(&p.name) && seen.insert(p.id))
                    .map(render_protocol),
            );
        }
        debug!("{} protocols match '{}'", out.len(), pattern);
        Ok(out)
    }

    /// Rendered category blocks of matching categories.
    pub fn categories(&self, pattern: &str) -> Result<Vec<String>> {
        let re = compile_pattern(pattern)?;
        let mut out = Vec::new();
        for binary in &self.binaries {
            let mut categories = or_empty(binary.categories())?;
            categories.sort_by(|a, b| a.name.cmp(&b.name));
            out.extend(
                categories
                    .iter()
                    .filter(|c| re.is_match(&c.name))
                    .map(render_category),
            );
        }
        debug!("{} categories match '{}'", out.len(), pattern);
        Ok(out)
    }

    /// Reference listings, one block per present reference section, slots
    /// sorted by address.
    pub fn references(&self) -> Result<Vec<String>> {
        let mut out = Vec::new();
        for binary in &self.binaries {
            for kind in RefKind::ALL {
                let mut refs = match binary.references(kind) {
                    Err(e) if e.is_not_present() => continue,
                    other => other?,
                };
                refs.sort_by_key(|r| r.offset);

                let mut block = format!("{}\n", kind.title());
                for r in &refs {
                    let _ = writeln!(
                        block,
                        "0x{:011x} => 0x{:011x}: {}",
                        r.offset, r.target, r.name
                    );
                }
                out.push(block);
            }
        }
        Ok(out)
    }
}
