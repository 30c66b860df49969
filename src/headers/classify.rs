//! Type-encoding classification.
//!
//! Turns one ivar, property or method-argument type string into the
//! declarations it references. Parsing is split into named productions:
//!
//! | production                 | shape                 | yields                 |
//! |----------------------------|-----------------------|------------------------|
//! | `QualifiedObjectPointer`   | `NSObject<A, B>`      | first protocol (`A`)   |
//! | `ProtocolList`             | `...<A><B>` / `<A, B>` | every protocol        |
//! | `ObjectPointer`            | `@"Name"`             | class                  |
//! | `DeclaredPointer`          | `Name *`              | class                  |
//!
//! A protocol-qualified string is evaluated by both of the first two
//! productions, so `NSObject<A>` yields `A` twice; [`Imports::normalize`]
//! removes the duplicate.
//!
//! [`Imports::normalize`]: super::Imports::normalize

use crate::objc::{ClassDescriptor, ProtocolDescriptor};
use crate::util::{contains_either, memchr_find, memrchr_find, starts_uppercase};

/// Root class whose protocol qualifiers mark protocol references.
const QUALIFIED_ROOT: &str = "NSObject<";

/// How a type string was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingStyle {
    /// Raw runtime encoding (`@"NSString"`), used for ivars.
    Runtime,
    /// Declaration text (`NSString *`), used for properties and method
    /// arguments.
    Declaration,
}

/// A recognized shape of a type string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Production<'a> {
    /// `@"Name"`
    ObjectPointer(&'a str),
    /// `NSObject<A, ...>`, keeping only the first protocol.
    QualifiedObjectPointer(&'a str),
    /// `<A><B>` or `<A, B>` anywhere in the string.
    ProtocolList(Vec<&'a str>),
    /// `Name *` in declaration style.
    DeclaredPointer(&'a str),
}

/// A referenced name before local lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Candidate<'a> {
    /// A class name.
    Class(&'a str),
    /// A protocol name.
    Protocol(&'a str),
}

impl<'a> Production<'a> {
    /// The references this production contributes.
    pub fn candidates(&self) -> Vec<Candidate<'a>> {
        match self {
            Production::ObjectPointer(name) | Production::DeclaredPointer(name) => {
                vec![Candidate::Class(*name)]
            }
            Production::QualifiedObjectPointer(name) => vec![Candidate::Protocol(*name)],
            Production::ProtocolList(names) => {
                names.iter().copied().map(Candidate::Protocol).collect()
            }
        }
    }
}

// =============================================================================
// Productions
// =============================================================================

/// Splits a protocol list body (`A><B` or `A, B`) into names.
fn split_protocols(list: &str) -> Vec<&str> {
    list.split(|c| matches!(c, '<' | '>' | ','))
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// `@"Name"`
fn object_pointer(s: &str) -> Option<&str> {
    let name = s.strip_prefix("@\"")?.strip_suffix('"')?;
    (!name.is_empty()).then_some(name)
}

/// `NSObject<A, ...>`
fn qualified_object_pointer(s: &str) -> Option<&str> {
    let rest = s.strip_prefix(QUALIFIED_ROOT)?;
    split_protocols(rest).into_iter().next()
}

/// The `<...>` part of `s`, from the first `<` to the last `>`.
fn protocol_list(s: &str) -> Vec<&str> {
    let bytes = s.as_bytes();
    let start = memchr_find(b'<', bytes).map_or(0, |p| p + 1);
    let end = memrchr_find(b'>', bytes).filter(|&e| e >= start).unwrap_or(s.len());
    split_protocols(&s[start..end])
}

/// `Name *`: uppercase ASCII start and a trailing `*`.
fn declared_pointer(s: &str) -> Option<&str> {
    let s = s.trim_matches(' ');
    if !starts_uppercase(s) || !s.ends_with('*') {
        return None;
    }
    let name = s.trim_matches(|c| c == '*' || c == ' ');
    (!name.is_empty()).then_some(name)
}

/// Parses `encoding` into the productions it matches, in evaluation order.
pub fn parse(encoding: &str, style: EncodingStyle) -> Vec<Production<'_>> {
    let mut out = Vec::new();

    if contains_either(encoding, b'<', b'>') {
        let stripped = encoding.trim_matches(|c| matches!(c, '@' | '"' | '*' | ' '));
        if let Some(first) = qualified_object_pointer(stripped) {
            out.push(Production::QualifiedObjectPointer(first));
        }
        let list = protocol_list(stripped);
        if !list.is_empty() {
            out.push(Production::ProtocolList(list));
        }
        return out;
    }

    if let Some(name) = object_pointer(encoding) {
        out.push(Production::ObjectPointer(name));
    } else if style == EncodingStyle::Declaration {
        if let Some(name) = declared_pointer(encoding) {
            out.push(Production::DeclaredPointer(name));
        }
    }
    out
}

// =============================================================================
// Local Lookup
// =============================================================================

/// Class and protocol names defined in the binary being processed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalNames {
    classes: Vec<String>,
    protocols: Vec<String>,
}

impl LocalNames {
    /// Builds the sorted name sets.
    pub fn new<C, P>(classes: C, protocols: P) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        let mut classes: Vec<String> = classes.into_iter().map(Into::into).collect();
        let mut protocols: Vec<String> = protocols.into_iter().map(Into::into).collect();
        classes.sort_unstable();
        classes.dedup();
        protocols.sort_unstable();
        protocols.dedup();
        Self { classes, protocols }
    }

    /// Collects the names of a binary's classes and protocols.
    pub fn from_descriptors(classes: &[ClassDescriptor], protocols: &[ProtocolDescriptor]) -> Self {
        Self::new(
            classes.iter().map(|c| c.name.as_str()),
            protocols.iter().map(|p| p.name.as_str()),
        )
    }

    /// Returns true if `name` is a class defined in this binary.
    pub fn has_class(&self, name: &str) -> bool {
        self.classes.binary_search_by(|c| c.as_str().cmp(name)).is_ok()
    }

    /// Returns true if `name` is a protocol defined in this binary.
    pub fn has_protocol(&self, name: &str) -> bool {
        self.protocols.binary_search_by(|p| p.as_str().cmp(name)).is_ok()
    }
}

/// A classified reference.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Reference {
    /// Class defined in this binary: `#include "Name.h"`.
    LocalClass(String),
    /// Protocol defined in this binary: `#include "Name-Protocol.h"`.
    LocalProtocol(String),
    /// Foreign class: `@class Name;`.
    ForwardClass(String),
    /// Foreign protocol: `@protocol Name;`.
    ForwardProtocol(String),
}

impl Reference {
    /// Resolves a candidate against the binary's own names.
    pub fn resolve(candidate: Candidate<'_>, locals: &LocalNames) -> Self {
        match candidate {
            Candidate::Class(name) if locals.has_class(name) => Reference::LocalClass(name.into()),
            Candidate::Class(name) => Reference::ForwardClass(name.into()),
            Candidate::Protocol(name) if locals.has_protocol(name) => {
                Reference::LocalProtocol(name.into())
            }
            Candidate::Protocol(name) => Reference::ForwardProtocol(name.into()),
        }
    }

    /// Header file name for local references.
    pub fn local_header(&self) -> Option<String> {
        match self {
            Reference::LocalClass(name) => Some(class_header(name)),
            Reference::LocalProtocol(name) => Some(protocol_header(name)),
            _ => None,
        }
    }
}

/// `Name.h`
pub fn class_header(name: &str) -> String {
    format!("{name}.h")
}

/// `Name-Protocol.h`
pub fn protocol_header(name: &str) -> String {
    format!("{name}-Protocol.h")
}

/// Classifies a type string into resolved references.
pub fn classify(encoding: &str, style: EncodingStyle, locals: &LocalNames) -> Vec<Reference> {
    parse(encoding, style)
        .iter()
        .flat_map(Production::candidates)
        .map(|c| Reference::resolve(c, locals))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use EncodingStyle::*;

    #[test]
    fn test_object_pointer() {
        assert_eq!(parse("@\"Gadget\"", Runtime), vec![Production::ObjectPointer("Gadget")]);
        assert!(parse("@\"\"", Runtime).is_empty());
        assert!(parse("@", Runtime).is_empty());
        assert!(parse("i", Runtime).is_empty());
    }

    #[test]
    fn test_qualified_object_pointer_evaluates_both_productions() {
        let prods = parse("@\"NSObject<Foo>\"", Runtime);
        assert_eq!(
            prods,
            vec![
                Production::QualifiedObjectPointer("Foo"),
                Production::ProtocolList(vec!["Foo"]),
            ]
        );
        let refs = classify("@\"NSObject<Foo>\"", Runtime, &LocalNames::default());
        assert_eq!(
            refs,
            vec![
                Reference::ForwardProtocol("Foo".into()),
                Reference::ForwardProtocol("Foo".into()),
            ]
        );
    }

    #[test]
    fn test_qualified_takes_first_protocol() {
        let prods = parse("NSObject<Foo, Bar> *", Declaration);
        assert_eq!(prods[0], Production::QualifiedObjectPointer("Foo"));
        assert_eq!(prods[1], Production::ProtocolList(vec!["Foo", "Bar"]));
    }

    #[test]
    fn test_protocol_list() {
        assert_eq!(parse("@\"<A><B>\"", Runtime), vec![Production::ProtocolList(vec!["A", "B"])]);
        assert_eq!(
            parse("id<Delegate>", Declaration),
            vec![Production::ProtocolList(vec!["Delegate"])]
        );
        assert_eq!(
            parse("UIView<Animating> *", Declaration),
            vec![Production::ProtocolList(vec!["Animating"])]
        );
        assert!(parse("NSObject<>", Declaration).is_empty());
    }

    #[test]
    fn test_declared_pointer_only_in_declaration_style() {
        assert_eq!(parse("NSString *", Declaration), vec![Production::DeclaredPointer("NSString")]);
        assert_eq!(
            parse(" NSError ** ", Declaration),
            vec![Production::DeclaredPointer("NSError")]
        );
        assert!(parse("NSString *", Runtime).is_empty());
        assert!(parse("id", Declaration).is_empty());
        assert!(parse("char *", Declaration).is_empty());
        assert!(parse("NSInteger", Declaration).is_empty());
    }

    #[test]
    fn test_resolve_against_locals() {
        let locals = LocalNames::new(["Gadget"], ["Copying"]);
        assert_eq!(
            classify("@\"Gadget\"", Runtime, &locals),
            vec![Reference::LocalClass("Gadget".into())]
        );
        assert_eq!(
            classify("@\"Other\"", Runtime, &locals),
            vec![Reference::ForwardClass("Other".into())]
        );
        assert_eq!(
            classify("id<Copying>", Declaration, &locals),
            vec![Reference::LocalProtocol("Copying".into())]
        );
    }

    #[test]
    fn test_local_header_names() {
        assert_eq!(Reference::LocalClass("A".into()).local_header().as_deref(), Some("A.h"));
        assert_eq!(
            Reference::LocalProtocol("P".into()).local_header().as_deref(),
            Some("P-Protocol.h")
        );
        assert!(Reference::ForwardClass("A".into()).local_header().is_none());
    }

    #[test]
    fn test_local_names_sorted_membership() {
        let locals = LocalNames::new(["b", "a", "b"], Vec::<String>::new());
        assert!(locals.has_class("a"));
        assert!(locals.has_class("b"));
        assert!(!locals.has_class("c"));
        assert!(!locals.has_protocol("a"));
    }
}
