//! Per-entity dependency resolution.
//!
//! Walks a class, protocol or category and collects every declaration it
//! references, classified through [`classify`](super::classify).

use super::classify::{classify, EncodingStyle, LocalNames, Reference};
use super::foundation::FoundationIndex;
use super::imports::Imports;
use crate::objc::{CategoryDescriptor, ClassDescriptor, Method, ProtocolDescriptor};

/// Root class whose subclasses get the Foundation hint.
pub const ROOT_CLASS: &str = "NSObject";

/// Framework hint added for subclasses of [`ROOT_CLASS`].
pub const FOUNDATION_MODULE: &str = "Foundation";

/// Argument indices that are classified: the receiver, then every explicit
/// argument. Index 1 (the selector) is never visited.
fn argument_indices(count: usize) -> impl Iterator<Item = usize> {
    (0..count.min(1)).chain(2..count)
}

/// Resolves entity references against one binary's names.
#[derive(Debug, Clone, Copy)]
pub struct DependencyResolver<'a> {
    locals: &'a LocalNames,
    foundation: &'a FoundationIndex,
}

impl<'a> DependencyResolver<'a> {
    /// Creates a resolver for one binary.
    pub fn new(locals: &'a LocalNames, foundation: &'a FoundationIndex) -> Self {
        Self { locals, foundation }
    }

    fn protocol_ref(&self, name: &str) -> Reference {
        if self.locals.has_protocol(name) {
            Reference::LocalProtocol(name.to_string())
        } else {
            Reference::ForwardProtocol(name.to_string())
        }
    }

    fn class_ref(&self, name: &str) -> Reference {
        if self.locals.has_class(name) {
            Reference::LocalClass(name.to_string())
        } else {
            Reference::ForwardClass(name.to_string())
        }
    }

    fn add_methods(&self, imports: &mut Imports, methods: &[Method]) {
        for method in methods {
            let Some(sig) = method.signature() else {
                continue;
            };
            for idx in argument_indices(sig.num_arguments()) {
                if let Some(ty) = sig.argument_type(idx) {
                    imports.extend(classify(&ty, EncodingStyle::Declaration, self.locals));
                }
            }
        }
    }

    /// Collects a class's references without normalizing.
    pub fn raw_class_imports(&self, class: &ClassDescriptor) -> Imports {
        let mut imports = Imports::new();

        if class.superclass == ROOT_CLASS {
            imports.add_hint(FOUNDATION_MODULE);
        }

        for proto in &class.protocols {
            imports.add(self.protocol_ref(proto));
        }

        for ivar in &class.ivars {
            imports.extend(classify(&ivar.type_encoding, EncodingStyle::Runtime, self.locals));
        }

        for prop in &class.properties {
            imports.extend(classify(
                &prop.declared_type(),
                EncodingStyle::Declaration,
                self.locals,
            ));
        }

        self.add_methods(&mut imports, &class.instance_methods);
        self.add_methods(&mut imports, &class.class_methods);

        imports
    }

    /// Normalized imports for a class.
    pub fn class_imports(&self, class: &ClassDescriptor) -> Imports {
        self.raw_class_imports(class).normalized(self.foundation)
    }

    /// Normalized imports for a protocol: its adopted protocols.
    pub fn protocol_imports(&self, proto: &ProtocolDescriptor) -> Imports {
        let mut imports = Imports::new();
        for adopted in proto.protocols.iter().filter(|p| **p != proto.name) {
            imports.add(self.protocol_ref(adopted));
        }
        imports.normalized(self.foundation)
    }

    /// Normalized imports for a category: its extended class.
    pub fn category_imports(&self, cat: &CategoryDescriptor) -> Imports {
        let mut imports = Imports::new();
        if let Some(class) = cat.class_name() {
            imports.add(self.class_ref(class));
        }
        imports.normalized(self.foundation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objc::{Ivar, Property};

    fn ivar(name: &str, ty: &str) -> Ivar {
        Ivar {
            name: name.into(),
            type_encoding: ty.into(),
            offset: 8,
        }
    }

    fn method(name: &str, types: &str) -> Method {
        Method {
            name: name.into(),
            types: types.into(),
        }
    }

    fn widget() -> ClassDescriptor {
        let mut class = ClassDescriptor::new("Widget", "NSObject");
        class.protocols = vec!["Copying".into()];
        class.ivars = vec![ivar("_gadget", "@\"Gadget\"")];
        class
    }

    #[test]
    fn test_argument_indices_skip_selector() {
        assert_eq!(argument_indices(0).collect::<Vec<_>>(), Vec::<usize>::new());
        assert_eq!(argument_indices(1).collect::<Vec<_>>(), vec![0]);
        assert_eq!(argument_indices(2).collect::<Vec<_>>(), vec![0]);
        assert_eq!(argument_indices(4).collect::<Vec<_>>(), vec![0, 2, 3]);
    }

    #[test]
    fn test_widget_with_local_gadget() {
        let locals = LocalNames::new(["Widget", "Gadget"], ["Copying"]);
        let foundation = FoundationIndex::empty();
        let imports = DependencyResolver::new(&locals, &foundation).class_imports(&widget());

        assert_eq!(imports.imports, vec!["Foundation"]);
        assert_eq!(imports.locals, vec!["Copying-Protocol.h", "Gadget.h"]);
        assert!(imports.classes.is_empty());
        assert!(imports.protos.is_empty());
    }

    #[test]
    fn test_widget_with_foreign_gadget() {
        let locals = LocalNames::new(["Widget"], ["Copying"]);
        let foundation = FoundationIndex::empty();
        let imports = DependencyResolver::new(&locals, &foundation).class_imports(&widget());

        assert_eq!(imports.locals, vec!["Copying-Protocol.h"]);
        assert_eq!(imports.classes, vec!["Gadget"]);
    }

    #[test]
    fn test_foundation_property_is_suppressed() {
        let mut class = ClassDescriptor::new("Label", "UIView");
        class.properties = vec![Property {
            name: "text".into(),
            attributes: "T@\"NSString\",C,N,V_text".into(),
        }];
        let locals = LocalNames::new(["Label"], Vec::<String>::new());

        let empty = FoundationIndex::empty();
        let imports = DependencyResolver::new(&locals, &empty).class_imports(&class);
        assert_eq!(imports.classes, vec!["NSString"]);
        assert!(imports.imports.is_empty());

        let foundation = FoundationIndex::from_names(["NSString"], Vec::<String>::new());
        let imports = DependencyResolver::new(&locals, &foundation).class_imports(&class);
        assert!(imports.classes.is_empty());
        assert!(imports.locals.is_empty());
    }

    #[test]
    fn test_method_arguments_and_protocol_qualified_ivar() {
        let mut class = ClassDescriptor::new("Controller", "Base");
        class.ivars = vec![ivar("_delegate", "@\"NSObject<Delegate>\"")];
        class.instance_methods = vec![
            method("setView:animated:", "v28@0:8@\"View\"16B24"),
            method("sizeWith:", "{CGSize=dd}24@0:8^{CGRect={CGPoint=dd}{CGSize=dd}}16"),
        ];
        class.class_methods = vec![method("shared", "@16@0:8")];
        let locals = LocalNames::new(["Controller"], Vec::<String>::new());
        let foundation = FoundationIndex::empty();

        let raw = DependencyResolver::new(&locals, &foundation).raw_class_imports(&class);
        assert_eq!(raw.protos, vec!["Delegate", "Delegate"]);
        assert_eq!(raw.classes, vec!["View"]);

        let imports = raw.normalized(&foundation);
        assert_eq!(imports.protos, vec!["Delegate"]);
    }

    #[test]
    fn test_class_imports_non_root_superclass() {
        let locals = LocalNames::new(["Widget", "B"], ["Copying"]);
        let foundation = FoundationIndex::empty();
        let resolver = DependencyResolver::new(&locals, &foundation);
        let imports = resolver.class_imports(&ClassDescriptor::new("B", "Widget"));
        assert!(imports.imports.is_empty());
        assert!(!imports.has_forward_decls());
    }

    #[test]
    fn test_protocol_imports_ignore_self() {
        let mut proto = ProtocolDescriptor::new("Copying", 0x10);
        proto.protocols = vec!["NSObject".into(), "Copying".into(), "Hashable".into()];
        let locals = LocalNames::new(Vec::<String>::new(), ["Copying", "Hashable"]);
        let foundation = FoundationIndex::from_names(["NSObject"], ["NSObject"]);

        let imports = DependencyResolver::new(&locals, &foundation).protocol_imports(&proto);
        assert_eq!(imports.locals, vec!["Hashable-Protocol.h"]);
        assert!(imports.protos.is_empty());
    }

    #[test]
    fn test_category_imports_extended_class_only() {
        let locals = LocalNames::new(["Widget"], Vec::<String>::new());
        let foundation = FoundationIndex::empty();
        let resolver = DependencyResolver::new(&locals, &foundation);

        let imports = resolver.category_imports(&CategoryDescriptor::new("Extras", Some("Widget")));
        assert_eq!(imports.locals, vec!["Widget.h"]);

        let imports = resolver.category_imports(&CategoryDescriptor::new("Extras", Some("UIView")));
        assert_eq!(imports.classes, vec!["UIView"]);

        let imports = resolver.category_imports(&CategoryDescriptor::new("Orphan", None));
        assert_eq!(imports, Imports::default());
    }
}
