//! Per-entity import sets.

use super::classify::{class_header, protocol_header, Reference};
use super::foundation::FoundationIndex;

/// Strips a `-Protocol.h` or `.h` suffix from a local header name.
pub fn strip_header_suffix(header: &str) -> &str {
    header
        .strip_suffix("-Protocol.h")
        .or_else(|| header.strip_suffix(".h"))
        .unwrap_or(header)
}

/// The four import sets of one header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Imports {
    /// Framework hints (`Foundation`), rendered as `@import`.
    pub imports: Vec<String>,
    /// Same-binary header file names, rendered as `#include`.
    pub locals: Vec<String>,
    /// Forward class declarations.
    pub classes: Vec<String>,
    /// Forward protocol declarations.
    pub protos: Vec<String>,
}

impl Imports {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a framework hint.
    pub fn add_hint(&mut self, framework: impl Into<String>) {
        self.imports.push(framework.into());
    }

    /// Adds a classified reference to the matching set.
    pub fn add(&mut self, reference: Reference) {
        match reference {
            Reference::LocalClass(name) => self.locals.push(class_header(&name)),
            Reference::LocalProtocol(name) => self.locals.push(protocol_header(&name)),
            Reference::ForwardClass(name) => self.classes.push(name),
            Reference::ForwardProtocol(name) => self.protos.push(name),
        }
    }

    /// Returns true if there are no forward declarations.
    pub fn has_forward_decls(&self) -> bool {
        !self.classes.is_empty() || !self.protos.is_empty()
    }

    /// Sorts and dedups every set, then removes names the Foundation index
    /// already provides and forward declarations shadowed by a local include.
    ///
    /// Framework hints are never filtered. Applying this twice is a no-op.
    pub fn normalize(&mut self, foundation: &FoundationIndex) {
        for set in [
            &mut self.imports,
            &mut self.locals,
            &mut self.classes,
            &mut self.protos,
        ] {
            set.sort_unstable();
            set.dedup();
        }

        self.locals.retain(|local| {
            let name = strip_header_suffix(local);
            !foundation.contains_class(name) && !foundation.contains_protocol(name)
        });
        self.classes.retain(|c| !foundation.contains_class(c));
        self.protos.retain(|p| !foundation.contains_protocol(p));

        let locals = &self.locals;
        let is_local = |header: String| locals.binary_search(&header).is_ok();
        self.classes.retain(|c| !is_local(class_header(c)));
        self.protos.retain(|p| !is_local(protocol_header(p)));
    }

    /// Returns a normalized copy.
    pub fn normalized(mut self, foundation: &FoundationIndex) -> Self {
        self.normalize(foundation);
        self
    }
}

impl Extend<Reference> for Imports {
    fn extend<T: IntoIterator<Item = Reference>>(&mut self, iter: T) {
        for reference in iter {
            self.add(reference);
        }
    }
}
