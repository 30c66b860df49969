//! ObjC runtime metadata model.
//!
//! This module provides the typed descriptors handed back by a metadata
//! provider, together with the pieces needed to turn them back into source:
//!
//! - [`encoding`] decodes runtime type encodings into C declarations
//! - [`property`] parses property attribute strings
//! - [`render`] prints class-dump style `@interface` / `@protocol` blocks

pub mod encoding;
pub mod property;
pub mod render;
mod structs;

pub use encoding::{MethodSignature, ObjcType};
pub use property::{PropertyAttributes, PropertyFlags};
pub use structs::*;
