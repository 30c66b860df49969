//! Property attribute string parsing.
//!
//! The runtime stores each property as a name plus a comma-separated
//! attribute string, e.g. `T@"NSString",C,N,V_title`. The `T` entry carries
//! the type encoding; the remaining single-letter entries are flags or
//! carry a value (`G` getter, `S` setter, `V` backing ivar).

use bitflags::bitflags;

bitflags! {
    /// Single-letter property attributes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PropertyFlags: u16 {
        /// `R` - readonly
        const READONLY = 1 << 0;
        /// `C` - copy
        const COPY = 1 << 1;
        /// `&` - retain / strong
        const RETAIN = 1 << 2;
        /// `N` - nonatomic
        const NONATOMIC = 1 << 3;
        /// `D` - @dynamic
        const DYNAMIC = 1 << 4;
        /// `W` - weak
        const WEAK = 1 << 5;
        /// `P` - eligible for garbage collection
        const GARBAGE_COLLECTED = 1 << 6;
    }
}

/// Parsed property attributes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PropertyAttributes {
    /// Raw type encoding from the `T` attribute.
    pub type_encoding: String,
    /// Flag attributes.
    pub flags: PropertyFlags,
    /// Custom getter selector (`G`).
    pub getter: Option<String>,
    /// Custom setter selector (`S`).
    pub setter: Option<String>,
    /// Backing ivar name (`V`).
    pub ivar: Option<String>,
}

impl PropertyAttributes {
    /// Parses a runtime attribute string. Unknown entries are ignored.
    pub fn parse(attributes: &str) -> Self {
        let mut out = Self::default();
        for entry in attributes.split(',') {
            let mut chars = entry.chars();
            let Some(kind) = chars.next() else {
                continue;
            };
            let value = chars.as_str();
            match kind {
                'T' => out.type_encoding = value.to_string(),
                'R' => out.flags |= PropertyFlags::READONLY,
                'C' => out.flags |= PropertyFlags::COPY,
                '&' => out.flags |= PropertyFlags::RETAIN,
                'N' => out.flags |= PropertyFlags::NONATOMIC,
                'D' => out.flags |= PropertyFlags::DYNAMIC,
                'W' => out.flags |= PropertyFlags::WEAK,
                'P' => out.flags |= PropertyFlags::GARBAGE_COLLECTED,
                'G' if !value.is_empty() => out.getter = Some(value.to_string()),
                'S' if !value.is_empty() => out.setter = Some(value.to_string()),
                'V' if !value.is_empty() => out.ivar = Some(value.to_string()),
                _ => {}
            }
        }
        out
    }

    /// Attribute keywords in declaration order (`nonatomic, readonly, copy`).
    pub fn keywords(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.flags.contains(PropertyFlags::NONATOMIC) {
            out.push("nonatomic".to_string());
        }
        if self.flags.contains(PropertyFlags::READONLY) {
            out.push("readonly".to_string());
        }
        if self.flags.contains(PropertyFlags::COPY) {
            out.push("copy".to_string());
        } else if self.flags.contains(PropertyFlags::RETAIN) {
            out.push("retain".to_string());
        } else if self.flags.contains(PropertyFlags::WEAK) {
            out.push("weak".to_string());
        }
        if let Some(getter) = &self.getter {
            out.push(format!("getter={getter}"));
        }
        if let Some(setter) = &self.setter {
            out.push(format!("setter={setter}"));
        }
        out
    }
}
