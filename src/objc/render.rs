//! Class-dump style rendering of descriptors.
//!
//! The text produced here becomes the body of each generated header.

use std::fmt::Write;

use super::encoding::{decode, ObjcType};
use super::structs::{CategoryDescriptor, ClassDescriptor, Method, Property, ProtocolDescriptor};

/// Renders a class as an `@interface` block.
pub fn render_class(class: &ClassDescriptor) -> String {
    let mut out = format!("@interface {}", class.name);
    if !class.superclass.is_empty() {
        let _ = write!(out, " : {}", class.superclass);
    }
    push_protocols(&mut out, &class.protocols);

    if !class.ivars.is_empty() {
        out.push_str(" {\n    /* instance variables */\n");
        for ivar in &class.ivars {
            let decl = match decode(&ivar.type_encoding) {
                Some(ty) => ty.declare(&ivar.name),
                None => format!("/* {} */ {}", ivar.type_encoding, ivar.name),
            };
            let _ = writeln!(out, "    {decl};");
        }
        out.push('}');
    }
    out.push('\n');

    push_properties(&mut out, &class.properties);
    push_methods(&mut out, "/* class methods */", '+', &class.class_methods);
    push_methods(&mut out, "/* instance methods */", '-', &class.instance_methods);

    out.push_str("\n@end\n");
    out
}

/// Renders a protocol as a `@protocol` block.
pub fn render_protocol(proto: &ProtocolDescriptor) -> String {
    let mut out = format!("@protocol {}", proto.name);
    push_protocols(&mut out, &proto.protocols);
    out.push('\n');

    push_properties(&mut out, &proto.properties);
    push_methods(&mut out, "/* required class methods */", '+', &proto.class_methods);
    push_methods(&mut out, "/* required instance methods */", '-', &proto.instance_methods);

    if !proto.optional_class_methods.is_empty() || !proto.optional_instance_methods.is_empty() {
        out.push_str("\n@optional\n");
        push_methods(&mut out, "/* optional class methods */", '+', &proto.optional_class_methods);
        push_methods(
            &mut out,
            "/* optional instance methods */",
            '-',
            &proto.optional_instance_methods,
        );
    }

    out.push_str("\n@end\n");
    out
}

/// Renders a category as an `@interface Class (Name)` block.
pub fn render_category(cat: &CategoryDescriptor) -> String {
    let mut out = format!("@interface {} ({})", cat.class_name().unwrap_or("?"), cat.name);
    push_protocols(&mut out, &cat.protocols);
    out.push('\n');

    push_properties(&mut out, &cat.properties);
    push_methods(&mut out, "/* class methods */", '+', &cat.class_methods);
    push_methods(&mut out, "/* instance methods */", '-', &cat.instance_methods);

    out.push_str("\n@end\n");
    out
}

/// Renders one property declaration.
pub fn render_property(prop: &Property) -> String {
    let attrs = prop.parsed();
    let keywords = attrs.keywords();
    let ty = decode(&attrs.type_encoding).unwrap_or(ObjcType::Unknown);
    let mut out = String::from("@property ");
    if !keywords.is_empty() {
        let _ = write!(out, "({}) ", keywords.join(", "));
    }
    let _ = write!(out, "{};", ty.declare(&prop.name));
    out
}

/// Renders one method declaration (`- (void)setTitle:(NSString *)arg1;`).
pub fn render_method(prefix: char, method: &Method) -> String {
    let sig = method.signature();
    let ret = sig
        .as_ref()
        .map_or_else(|| "id".to_string(), |s| s.return_type.declaration());
    let args = sig.as_ref().map(|s| s.explicit_arguments()).unwrap_or_default();

    let mut out = format!("{prefix} ({ret})");
    if !method.name.contains(':') {
        let _ = write!(out, "{};", method.name);
        return out;
    }

    let pieces = method.name.split(':').take(method.name.matches(':').count());
    for (i, piece) in pieces.enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let ty = args.get(i).map_or_else(|| "id".to_string(), |a| a.declaration());
        let _ = write!(out, "{piece}:({ty})arg{}", i + 1);
    }
    out.push(';');
    out
}

fn push_protocols(out: &mut String, protocols: &[String]) {
    if !protocols.is_empty() {
        let _ = write!(out, " <{}>", protocols.join(", "));
    }
}

fn push_properties(out: &mut String, properties: &[Property]) {
    if properties.is_empty() {
        return;
    }
    out.push('\n');
    for prop in properties {
        let _ = writeln!(out, "{}", render_property(prop));
    }
}

fn push_methods(out: &mut String, title: &str, prefix: char, methods: &[Method]) {
    if methods.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n{title}");
    for method in methods {
        let _ = writeln!(out, "{}", render_method(prefix, method));
    }
}
