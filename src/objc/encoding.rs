//! Objective-C runtime type-encoding decoder.
//!
//! Ivar types, property `T` attributes and method signatures are stored in
//! the binary as compact encodings (`i`, `@"NSString"`, `{CGRect={CGPoint=dd}{CGSize=dd}}`,
//! `v24@0:8@16`). This module decodes them into [`ObjcType`] values and renders
//! those as C declaration text.

use std::fmt::Write;

// =============================================================================
// Decoded Types
// =============================================================================

/// A decoded runtime type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjcType {
    /// A scalar C type (`int`, `unsigned long long`, `BOOL`, `void`, ...).
    Primitive(&'static str),
    /// `char *` (`*`).
    CString,
    /// An object pointer, optionally typed and protocol-qualified.
    Object {
        /// Class name from `@"Name"`, `None` for plain `id`.
        class: Option<String>,
        /// Protocols from `@"<A><B>"` or `@"Name<A>"`.
        protocols: Vec<String>,
    },
    /// A block (`@?`).
    Block,
    /// `Class` (`#`).
    Class,
    /// `SEL` (`:`).
    Selector,
    /// Pointer to another type (`^T`).
    Pointer(Box<ObjcType>),
    /// Function pointer (`^?`).
    FunctionPointer,
    /// Fixed-size C array (`[16c]`).
    Array {
        /// Element count.
        len: u64,
        /// Element type.
        elem: Box<ObjcType>,
    },
    /// Struct (`{Name=...}`).
    Struct(Aggregate),
    /// Union (`(Name=...)`).
    Union(Aggregate),
    /// Bitfield of the given width (`b3`).
    Bitfield(u64),
    /// Type qualifier applied to an inner type (`r*` is `const char *`).
    Qualified {
        /// C spelling of the qualifier.
        qualifier: &'static str,
        /// Qualified type.
        inner: Box<ObjcType>,
    },
    /// Unknown type (`?`).
    Unknown,
}

/// Struct or union layout.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Aggregate {
    /// Tag name, `None` when anonymous (`?`).
    pub name: Option<String>,
    /// Fields, empty when the encoding only names the type.
    pub fields: Vec<Field>,
}

/// A struct or union member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Member name when the encoding carries one.
    pub name: Option<String>,
    /// Member type.
    pub ty: ObjcType,
}

impl ObjcType {
    /// Renders the type as it would appear in a declaration, without a name.
    pub fn declaration(&self) -> String {
        match self {
            ObjcType::Primitive(p) => (*p).to_string(),
            ObjcType::CString => "char *".to_string(),
            ObjcType::Object { class, protocols } => {
                let quals = if protocols.is_empty() {
                    String::new()
                } else {
                    format!("<{}>", protocols.join(", "))
                };
                match class {
                    Some(name) => format!("{name}{quals} *"),
                    None => format!("id{quals}"),
                }
            }
            ObjcType::Block => "id /* block */".to_string(),
            ObjcType::Class => "Class".to_string(),
            ObjcType::Selector => "SEL".to_string(),
            ObjcType::Pointer(inner) => {
                let inner = inner.declaration();
                if inner.ends_with('*') {
                    format!("{inner}*")
                } else {
                    format!("{inner} *")
                }
            }
            ObjcType::FunctionPointer => "void *".to_string(),
            ObjcType::Array { len, elem } => format!("{}[{len}]", elem.declaration()),
            ObjcType::Struct(agg) => agg.declaration("struct"),
            ObjcType::Union(agg) => agg.declaration("union"),
            ObjcType::Bitfield(_) => "unsigned int".to_string(),
            ObjcType::Qualified { qualifier, inner } => {
                format!("{qualifier} {}", inner.declaration())
            }
            ObjcType::Unknown => "void".to_string(),
        }
    }

    /// Renders a declaration of `name` with this type (`char _buf[16]`,
    /// `unsigned int _flag:1`, `NSString *_title`).
    pub fn declare(&self, name: &str) -> String {
        match self {
            ObjcType::Array { len, elem } => {
                format!("{}[{len}]", join_declarator(&elem.declaration(), name))
            }
            ObjcType::Bitfield(width) => format!("unsigned int {name}:{width}"),
            _ => join_declarator(&self.declaration(), name),
        }
    }
}

impl Aggregate {
    fn declaration(&self, keyword: &str) -> String {
        match &self.name {
            Some(name) => format!("{keyword} {name}"),
            None if self.fields.is_empty() => format!("{keyword} {{}}"),
            None => {
                let mut out = format!("{keyword} {{ ");
                for (i, field) in self.fields.iter().enumerate() {
                    let name = field
                        .name
                        .clone()
                        .unwrap_or_else(|| format!("field{}", i + 1));
                    let _ = write!(out, "{}; ", field.ty.declare(&name));
                }
                out.push('}');
                out
            }
        }
    }
}

/// Joins a type and a declarator, omitting the space after a trailing `*`.
fn join_declarator(ty: &str, name: &str) -> String {
    if ty.ends_with('*') {
        format!("{ty}{name}")
    } else {
        format!("{ty} {name}")
    }
}

// =============================================================================
// Parser
// =============================================================================

/// Nesting limit for pointers, arrays, aggregates and qualifiers.
const MAX_DEPTH: usize = 256;

struct Parser<'a> {
    s: &'a [u8],
    pos: usize,
    /// Current type nesting.
    depth: usize,
    /// Depth of aggregates whose members carry quoted names.
    named_depth: usize,
}

impl<'a> Parser<'a> {
    fn new(s: &'a str) -> Self {
        Self {
            s: s.as_bytes(),
            pos: 0,
            depth: 0,
            named_depth: 0,
        }
    }

    #[inline]
    fn peek(&self) -> Option<u8> {
        self.s.get(self.pos).copied()
    }

    #[inline]
    fn bump(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.s.len()
    }

    fn text(&self, start: usize, end: usize) -> &'a str {
        // Boundaries are always ASCII delimiters, so the slice stays valid UTF-8.
        std::str::from_utf8(&self.s[start..end]).unwrap_or_default()
    }

    fn number(&mut self) -> Option<u64> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        self.text(start, self.pos).parse().ok()
    }

    /// Skips a stack offset in a method signature (`24`, `-8`).
    fn skip_offset(&mut self) {
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
    }

    /// Reads a `"quoted"` string, returning its contents.
    fn quoted(&mut self) -> Option<&'a str> {
        if self.peek() != Some(b'"') {
            return None;
        }
        let start = self.pos + 1;
        let len = crate::util::memchr_find(b'"', &self.s[start..])?;
        self.pos = start + len + 1;
        Some(self.text(start, start + len))
    }

    fn parse(&mut self) -> Option<ObjcType> {
        if self.depth >= MAX_DEPTH {
            return None;
        }
        self.depth += 1;
        let ty = self.parse_type();
        self.depth -= 1;
        ty
    }

    fn parse_type(&mut self) -> Option<ObjcType> {
        let ty = match self.bump()? {
            b'c' => ObjcType::Primitive("char"),
            b'i' => ObjcType::Primitive("int"),
            b's' => ObjcType::Primitive("short"),
            b'l' => ObjcType::Primitive("long"),
            b'q' => ObjcType::Primitive("long long"),
            b'C' => ObjcType::Primitive("unsigned char"),
            b'I' => ObjcType::Primitive("unsigned int"),
            b'S' => ObjcType::Primitive("unsigned short"),
            b'L' => ObjcType::Primitive("unsigned long"),
            b'Q' => ObjcType::Primitive("unsigned long long"),
            b'f' => ObjcType::Primitive("float"),
            b'd' => ObjcType::Primitive("double"),
            b'D' => ObjcType::Primitive("long double"),
            b'B' => ObjcType::Primitive("BOOL"),
            b'v' => ObjcType::Primitive("void"),
            b't' => ObjcType::Primitive("__int128"),
            b'T' => ObjcType::Primitive("unsigned __int128"),
            b'*' => ObjcType::CString,
            b'#' => ObjcType::Class,
            b':' => ObjcType::Selector,
            b'?' => ObjcType::Unknown,
            b'@' => self.parse_object(),
            b'^' => {
                if self.peek() == Some(b'?') {
                    self.pos += 1;
                    ObjcType::FunctionPointer
                } else {
                    ObjcType::Pointer(Box::new(self.parse()?))
                }
            }
            b'[' => {
                let len = self.number().unwrap_or(0);
                let elem = Box::new(self.parse()?);
                if self.bump()? != b']' {
                    return None;
                }
                ObjcType::Array { len, elem }
            }
            b'{' => ObjcType::Struct(self.parse_aggregate(b'}')?),
            b'(' => ObjcType::Union(self.parse_aggregate(b')')?),
            b'b' => ObjcType::Bitfield(self.number()?),
            c => {
                let qualifier = match c {
                    b'r' => "const",
                    b'n' => "in",
                    b'N' => "inout",
                    b'o' => "out",
                    b'O' => "bycopy",
                    b'R' => "byref",
                    b'V' => "oneway",
                    b'A' => "_Atomic",
                    b'j' => "_Complex",
                    _ => return None,
                };
                ObjcType::Qualified {
                    qualifier,
                    inner: Box::new(self.parse()?),
                }
            }
        };
        Some(ty)
    }

    fn parse_object(&mut self) -> ObjcType {
        match self.peek() {
            Some(b'?') => {
                self.pos += 1;
                // Extended block signatures: @?<v@?@>
                if self.peek() == Some(b'<') {
                    if let Some(len) = crate::util::memchr_find(b'>', &self.s[self.pos..]) {
                        self.pos += len + 1;
                    }
                }
                ObjcType::Block
            }
            Some(b'"') => {
                let save = self.pos;
                let Some(name) = self.quoted() else {
                    return plain_id();
                };
                // Inside a named aggregate a quote may instead open the next
                // member name: `"a"@"b"i` is `id a; int b;`.
                if self.named_depth > 0
                    && !matches!(self.peek(), None | Some(b'"') | Some(b'}') | Some(b')'))
                {
                    self.pos = save;
                    return plain_id();
                }
                object_from_name(name)
            }
            _ => plain_id(),
        }
    }

    fn parse_aggregate(&mut self, close: u8) -> Option<Aggregate> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == b'=' || c == close {
                break;
            }
            self.pos += 1;
        }
        let tag = self.text(start, self.pos);
        let name = match tag {
            "" | "?" => None,
            tag => Some(tag.to_string()),
        };

        let mut fields = Vec::new();
        if self.peek() == Some(b'=') {
            self.pos += 1;
            let named = self.peek() == Some(b'"');
            if named {
                self.named_depth += 1;
            }
            while self.peek().is_some_and(|c| c != close) {
                let field_name = self.quoted().map(str::to_string);
                let ty = self.parse()?;
                fields.push(Field {
                    name: field_name,
                    ty,
                });
            }
            if named {
                self.named_depth -= 1;
            }
        }
        if self.bump()? != close {
            return None;
        }
        Some(Aggregate { name, fields })
    }
}

fn plain_id() -> ObjcType {
    ObjcType::Object {
        class: None,
        protocols: Vec::new(),
    }
}

/// Splits `Name<A><B>` / `<A, B>` into a class and its protocols.
fn object_from_name(name: &str) -> ObjcType {
    let (class, quals) = match crate::util::memchr_find(b'<', name.as_bytes()) {
        Some(pos) => (&name[..pos], &name[pos..]),
        None => (name, ""),
    };
    let protocols = quals
        .split(|c| matches!(c, '<' | '>' | ','))
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();
    ObjcType::Object {
        class: (!class.is_empty()).then(|| class.to_string()),
        protocols,
    }
}

// =============================================================================
// Public Entry Points
// =============================================================================

/// Decodes the first type in `encoding`.
pub fn decode(encoding: &str) -> Option<ObjcType> {
    Parser::new(encoding).parse()
}

/// Decodes `encoding` to declaration text, falling back to the raw encoding
/// when it cannot be parsed.
pub fn decode_declaration(encoding: &str) -> String {
    decode(encoding)
        .map(|ty| ty.declaration())
        .unwrap_or_else(|| encoding.to_string())
}

/// A decoded method signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    /// Return type.
    pub return_type: ObjcType,
    /// All arguments, including the receiver (index 0) and selector (index 1).
    pub arguments: Vec<ObjcType>,
}

impl MethodSignature {
    /// Parses a method type encoding such as `v24@0:8@16`.
    ///
    /// Stack offsets are skipped. Returns `None` for malformed encodings.
    pub fn parse(types: &str) -> Option<Self> {
        let mut parser = Parser::new(types);
        let return_type = parser.parse()?;
        parser.skip_offset();

        let mut arguments = Vec::new();
        while !parser.at_end() {
            arguments.push(parser.parse()?);
            parser.skip_offset();
        }

        Some(Self {
            return_type,
            arguments,
        })
    }

    /// Number of arguments, including the two implicit ones.
    pub fn num_arguments(&self) -> usize {
        self.arguments.len()
    }

    /// Declaration text of the argument at `index`.
    pub fn argument_type(&self, index: usize) -> Option<String> {
        self.arguments.get(index).map(ObjcType::declaration)
    }

    /// The explicit arguments, skipping the receiver and selector.
    pub fn explicit_arguments(&self) -> &[ObjcType] {
        self.arguments.get(2..).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decl(enc: &str) -> String {
        decode(enc).expect("decodes").declaration()
    }

    #[test]
    fn test_primitives() {
        assert_eq!(decl("i"), "int");
        assert_eq!(decl("Q"), "unsigned long long");
        assert_eq!(decl("B"), "BOOL");
        assert_eq!(decl("*"), "char *");
        assert_eq!(decl("r*"), "const char *");
        assert_eq!(decl(":"), "SEL");
        assert_eq!(decl("#"), "Class");
    }

    #[test]
    fn test_objects() {
        assert_eq!(decl("@"), "id");
        assert_eq!(decl("@\"NSString\""), "NSString *");
        assert_eq!(decl("@\"<NSCopying>\""), "id<NSCopying>");
        assert_eq!(decl("@\"<A><B>\""), "id<A, B>");
        assert_eq!(decl("@\"NSObject<Foo>\""), "NSObject<Foo> *");
        assert_eq!(decl("@?"), "id /* block */");
    }

    #[test]
    fn test_pointers_and_arrays() {
        assert_eq!(decl("^v"), "void *");
        assert_eq!(decl("^^i"), "int **");
        assert_eq!(decl("^@\"NSError\""), "NSError **");
        assert_eq!(decl("^?"), "void *");
        assert_eq!(decode("[16c]").unwrap().declare("_buf"), "char _buf[16]");
        assert_eq!(decode("b3").unwrap().declare("_flags"), "unsigned int _flags:3");
    }

    #[test]
    fn test_structs() {
        assert_eq!(decl("{CGRect={CGPoint=dd}{CGSize=dd}}"), "struct CGRect");
        assert_eq!(decl("{?=\"x\"d\"y\"d}"), "struct { double x; double y; }");
        assert_eq!(decl("(?=iq)"), "union { int field1; long long field2; }");
        assert_eq!(decl("^{__CFString=}"), "struct __CFString *");
    }

    #[test]
    fn test_named_struct_member_object() {
        let ty = decode("{?=\"obj\"@\"NSString\"\"count\"i}").unwrap();
        assert_eq!(ty.declaration(), "struct { NSString *obj; int count; }");

        let ty = decode("{?=\"obj\"@\"count\"i}").unwrap();
        assert_eq!(ty.declaration(), "struct { id obj; int count; }");
    }

    #[test]
    fn test_declare_object() {
        let ty = decode("@\"NSString\"").unwrap();
        assert_eq!(ty.declare("_title"), "NSString *_title");
        assert_eq!(decode("i").unwrap().declare("_count"), "int _count");
    }

    #[test]
    fn test_method_signature() {
        let sig = MethodSignature::parse("v24@0:8@16").unwrap();
        assert_eq!(sig.return_type, ObjcType::Primitive("void"));
        assert_eq!(sig.num_arguments(), 3);
        assert_eq!(sig.argument_type(0).as_deref(), Some("id"));
        assert_eq!(sig.argument_type(1).as_deref(), Some("SEL"));
        assert_eq!(sig.explicit_arguments().len(), 1);
    }

    #[test]
    fn test_extended_method_signature() {
        let sig = MethodSignature::parse("@32@0:8@\"NSString\"16q24").unwrap();
        assert_eq!(sig.argument_type(2).as_deref(), Some("NSString *"));
        assert_eq!(sig.argument_type(3).as_deref(), Some("long long"));
    }

    #[test]
    fn test_malformed() {
        assert!(decode("").is_none());
        assert!(decode("{Unclosed=i").is_none());
        assert!(MethodSignature::parse("v24@0:8%").is_none());
        assert_eq!(decode_declaration("%"), "%");
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}i", "^".repeat(1_000_000));
        assert!(decode(&deep).is_none());
        assert_eq!(decode_declaration(&deep), deep);
        assert!(MethodSignature::parse(&format!("v16@0:8{deep}")).is_none());

        let bounded = format!("{}i", "^".repeat(MAX_DEPTH - 1));
        assert!(decode(&bounded).is_some());
    }
}
