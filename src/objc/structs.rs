//! Typed ObjC runtime descriptors.
//!
//! These are the records a metadata provider hands back after decoding a
//! binary's `__objc_classlist`, `__objc_protolist` and `__objc_catlist`
//! sections. They keep raw type encodings; decoding happens on demand.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::encoding::{decode_declaration, MethodSignature};
use super::property::PropertyAttributes;
use crate::util::upper_first;

// =============================================================================
// Protocol Identity
// =============================================================================

/// Opaque identity of a protocol definition (its address in the binary).
///
/// A binary may carry several protocol records with the same name; two
/// records describe the same protocol only when their identities match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProtocolId(pub u64);

impl fmt::Display for ProtocolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

// =============================================================================
// References
// =============================================================================

/// Sections holding pointers to ObjC runtime objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    /// `__objc_protorefs`
    Protocol,
    /// `__objc_classrefs`
    Class,
    /// `__objc_superrefs`
    Super,
    /// `__objc_selrefs`
    Selector,
}

impl RefKind {
    /// Every kind, in listing order.
    pub const ALL: [RefKind; 4] = [
        RefKind::Protocol,
        RefKind::Class,
        RefKind::Super,
        RefKind::Selector,
    ];

    /// Section name.
    pub fn section(self) -> &'static str {
        match self {
            RefKind::Protocol => "protorefs",
            RefKind::Class => "classrefs",
            RefKind::Super => "superrefs",
            RefKind::Selector => "selrefs",
        }
    }

    /// Listing heading.
    pub fn title(self) -> &'static str {
        match self {
            RefKind::Protocol => "@protocol refs",
            RefKind::Class => "@class refs",
            RefKind::Super => "@super refs",
            RefKind::Selector => "@selectors refs",
        }
    }
}

/// One reference slot: where it lives and what it points at.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjcRef {
    /// Address of the slot.
    pub offset: u64,
    /// Address it points to.
    pub target: u64,
    /// Name of the referenced class, protocol or selector.
    pub name: String,
}

// =============================================================================
// Members
// =============================================================================

/// An instance variable.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Ivar {
    /// Ivar name (usually `_name`).
    pub name: String,
    /// Raw runtime encoding (`@"NSString"`, `i`, `{CGRect=...}`).
    #[serde(rename = "type")]
    pub type_encoding: String,
    /// Offset within the instance.
    pub offset: u64,
}

/// A declared property.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Property {
    /// Property name.
    pub name: String,
    /// Raw runtime attribute string (`T@"NSString",C,N,V_title`).
    pub attributes: String,
}

impl Property {
    /// Parses the attribute string.
    pub fn parsed(&self) -> PropertyAttributes {
        PropertyAttributes::parse(&self.attributes)
    }

    /// The raw type encoding from the `T` attribute.
    pub fn type_encoding(&self) -> String {
        self.parsed().type_encoding
    }

    /// The property type in declaration style (`NSString *`).
    pub fn declared_type(&self) -> String {
        decode_declaration(&self.type_encoding())
    }

    /// Getter selector: the custom `getter=` or the property name.
    pub fn getter(&self) -> String {
        self.parsed().getter.unwrap_or_else(|| self.name.clone())
    }

    /// Setter selector: the custom `setter=` or `setName:`.
    pub fn setter(&self) -> String {
        self.parsed()
            .setter
            .unwrap_or_else(|| format!("set{}:", upper_first(&self.name)))
    }
}

/// A method.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Method {
    /// Selector name.
    pub name: String,
    /// Raw method type encoding (`v24@0:8@16`).
    pub types: String,
}

impl Method {
    /// Decodes the method type encoding.
    pub fn signature(&self) -> Option<MethodSignature> {
        MethodSignature::parse(&self.types)
    }
}

// =============================================================================
// Entities
// =============================================================================

/// An ObjC class.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassDescriptor {
    /// Class name.
    pub name: String,
    /// Superclass name, empty for root classes.
    pub superclass: String,
    /// Adopted protocol names, in declaration order.
    pub protocols: Vec<String>,
    /// Instance variables.
    pub ivars: Vec<Ivar>,
    /// Declared properties.
    pub properties: Vec<Property>,
    /// Instance methods.
    pub instance_methods: Vec<Method>,
    /// Class methods.
    pub class_methods: Vec<Method>,
}

impl ClassDescriptor {
    /// Creates a class with the given name and superclass.
    pub fn new(name: impl Into<String>, superclass: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            superclass: superclass.into(),
            ..Default::default()
        }
    }
}

/// An ObjC protocol.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolDescriptor {
    /// Protocol name.
    pub name: String,
    /// Identity of this definition.
    pub id: ProtocolId,
    /// Adopted protocol names.
    pub protocols: Vec<String>,
    /// Required instance methods.
    pub instance_methods: Vec<Method>,
    /// Required class methods.
    pub class_methods: Vec<Method>,
    /// Optional instance methods.
    pub optional_instance_methods: Vec<Method>,
    /// Optional class methods.
    pub optional_class_methods: Vec<Method>,
    /// Declared properties.
    pub properties: Vec<Property>,
}

impl ProtocolDescriptor {
    /// Creates a protocol with the given name and identity.
    pub fn new(name: impl Into<String>, id: u64) -> Self {
        Self {
            name: name.into(),
            id: ProtocolId(id),
            ..Default::default()
        }
    }
}

/// An ObjC category.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryDescriptor {
    /// Category name.
    pub name: String,
    /// Name of the extended class, when it could be resolved.
    pub class: Option<String>,
    /// Adopted protocol names.
    pub protocols: Vec<String>,
    /// Instance methods.
    pub instance_methods: Vec<Method>,
    /// Class methods.
    pub class_methods: Vec<Method>,
    /// Declared properties.
    pub properties: Vec<Property>,
}

impl CategoryDescriptor {
    /// Creates a category, optionally attached to a class.
    pub fn new(name: impl Into<String>, class: Option<&str>) -> Self {
        Self {
            name: name.into(),
            class: class.map(str::to_string),
            ..Default::default()
        }
    }

    /// The extended class name, ignoring empty names.
    pub fn class_name(&self) -> Option<&str> {
        self.class.as_deref().filter(|c| !c.is_empty())
    }
}
