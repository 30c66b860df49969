//! Per-binary header generation.
//!
//! For each binary the generator plans one header per class, protocol and
//! category plus an umbrella header, then writes them under
//! `<output>/<Module>/`. Planning is sequential and fully deterministic;
//! writing the entity headers may run on the rayon pool.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::assembler::{umbrella_body, umbrella_guard, HeaderInfo};
use super::classify::{class_header, protocol_header, LocalNames};
use super::foundation::FoundationIndex;
use super::resolver::DependencyResolver;
use crate::error::{or_empty, Result};
use crate::objc::render::{render_category, render_class, render_protocol};
use crate::objc::{CategoryDescriptor, ClassDescriptor, ProtocolDescriptor, ProtocolId};
use crate::provider::{collect_binaries, DependencyMode, ImageProvider, ObjcMetadata};
use crate::util::{basename, lower_first};

/// Header generation options.
#[derive(Debug, Clone)]
pub struct HeaderOptions {
    /// Output root; each module gets a subdirectory.
    pub output: PathBuf,
    /// Module name for binaries without an install name.
    pub name: String,
    /// Version string recorded in every header.
    pub tool_version: String,
    /// Which imported libraries to generate headers for.
    pub dependencies: DependencyMode,
    /// Write entity headers in parallel.
    pub parallel: bool,
}

impl Default for HeaderOptions {
    fn default() -> Self {
        Self {
            output: PathBuf::from("headers"),
            name: String::new(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            dependencies: DependencyMode::None,
            parallel: false,
        }
    }
}

impl HeaderOptions {
    /// Sets the output root.
    pub fn with_output<P: Into<PathBuf>>(mut self, output: P) -> Self {
        self.output = output.into();
        self
    }

    /// Sets the fallback module name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the dependency mode.
    pub fn with_dependencies(mut self, mode: DependencyMode) -> Self {
        self.dependencies = mode;
        self
    }

    /// Enables parallel writes.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// Headers planned for one binary, in emission order.
#[derive(Debug, Clone)]
pub struct ModulePlan {
    /// Module name.
    pub name: String,
    /// Entity headers: classes, then protocols, then categories.
    pub headers: Vec<HeaderInfo>,
    /// Umbrella header, absent when the binary produced no headers.
    pub umbrella: Option<HeaderInfo>,
}

impl ModulePlan {
    /// File names of the entity headers, in emission order.
    pub fn file_names(&self) -> Vec<String> {
        self.headers.iter().map(|h| file_name(&h.path)).collect()
    }
}

/// What was written for one binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleReport {
    /// Module name.
    pub name: String,
    /// Entity headers, in emission order.
    pub headers: Vec<PathBuf>,
    /// Umbrella header.
    pub umbrella: Option<PathBuf>,
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

// =============================================================================
// Accessor Stripping
// =============================================================================

/// Maps a setter selector to its property name (`setFoo:` to `foo`).
pub fn transform_setter(selector: &str) -> Option<String> {
    let name = selector.strip_prefix("set")?.strip_suffix(':')?;
    (!name.is_empty()).then(|| lower_first(name))
}

/// Removes ivars and instance methods that only back declared properties.
pub fn strip_accessors(class: &mut ClassDescriptor) {
    if class.properties.is_empty() {
        return;
    }

    let mut names: Vec<String> = class.properties.iter().map(|p| p.name.clone()).collect();
    names.sort_unstable();
    let is_property = |name: &str| names.binary_search_by(|n| n.as_str().cmp(name)).is_ok();

    let mut accessors: Vec<String> = class
        .properties
        .iter()
        .flat_map(|p| [p.getter(), p.setter()])
        .collect();
    accessors.sort_unstable();
    let is_accessor = |sel: &str| accessors.binary_search_by(|a| a.as_str().cmp(sel)).is_ok();

    class.ivars.retain(|ivar| {
        let bare = ivar.name.strip_prefix('_').unwrap_or(&ivar.name);
        !is_property(ivar.name.as_str()) && !is_property(bare)
    });

    class.instance_methods.retain(|m| {
        !is_property(m.name.as_str())
            && !is_accessor(m.name.as_str())
            && !transform_setter(&m.name).is_some_and(|n| is_property(n.as_str()))
    });
}

// =============================================================================
// Generator
// =============================================================================

/// Drives header generation for a primary binary and its dependencies.
pub struct HeaderGenerator {
    options: HeaderOptions,
    images: Option<Arc<dyn ImageProvider>>,
    foundation: FoundationIndex,
}

impl HeaderGenerator {
    /// Creates a generator, building the Foundation index from `images`.
    pub fn new(options: HeaderOptions, images: Option<Arc<dyn ImageProvider>>) -> Result<Self> {
        let foundation = FoundationIndex::build(images.as_deref())?;
        Ok(Self::with_foundation(options, images, foundation))
    }

    /// Creates a generator with a prebuilt Foundation index.
    pub fn with_foundation(
        options: HeaderOptions,
        images: Option<Arc<dyn ImageProvider>>,
        foundation: FoundationIndex,
    ) -> Self {
        Self {
            options,
            images,
            foundation,
        }
    }

    /// Returns the Foundation index.
    pub fn foundation(&self) -> &FoundationIndex {
        &self.foundation
    }

    /// The binaries to process: selected dependencies in import order, then
    /// `primary` last.
    pub fn binaries(&self, primary: Arc<dyn ObjcMetadata>) -> Result<Vec<Arc<dyn ObjcMetadata>>> {
        let mut binaries =
            collect_binaries(primary, self.images.as_deref(), self.options.dependencies)?;
        binaries.rotate_left(1);
        Ok(binaries)
    }

    /// Generates headers for `primary` and its selected dependencies.
    pub fn generate(&self, primary: Arc<dyn ObjcMetadata>) -> Result<Vec<ModuleReport>> {
        let mut reports = Vec::new();
        for binary in self.binaries(primary)? {
            if let Some(report) = self.generate_binary(binary.as_ref())? {
                reports.push(report);
            }
        }
        Ok(reports)
    }

    /// Generates headers for one binary. Returns `None` when it has no ObjC
    /// metadata.
    pub fn generate_binary(&self, binary: &dyn ObjcMetadata) -> Result<Option<ModuleReport>> {
        match self.plan_binary(binary)? {
            Some(plan) => self.write_plan(&plan).map(Some),
            None => Ok(None),
        }
    }

    /// Module name: basename of the install name, else the configured name.
    fn module_name(&self, binary: &dyn ObjcMetadata) -> String {
        match binary.dylib_id() {
            Some(id) if !id.is_empty() => basename(id).to_string(),
            _ if !self.options.name.is_empty() => self.options.name.clone(),
            _ => basename(binary.path()).to_string(),
        }
    }

    /// Plans every header for one binary without touching the filesystem.
    pub fn plan_binary(&self, binary: &dyn ObjcMetadata) -> Result<Option<ModulePlan>> {
        if !binary.has_objc() {
            warn!("{} has no ObjC metadata, skipping", binary.path());
            return Ok(None);
        }

        let name = self.module_name(binary);
        let dir = self.options.output.join(&name);
        let template = HeaderInfo {
            tool_version: self.options.tool_version.clone(),
            build_versions: binary.build_versions(),
            source_version: binary.source_version().unwrap_or_default(),
            ..Default::default()
        };

        let mut classes = or_empty(binary.classes())?;
        let mut protocols = or_empty(binary.protocols())?;
        let mut categories = or_empty(binary.categories())?;
        classes.sort_by(|a, b| a.name.cmp(&b.name));
        protocols.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        categories.sort_by(|a, b| a.name.cmp(&b.name));

        let locals = LocalNames::from_descriptors(&classes, &protocols);
        let resolver = DependencyResolver::new(&locals, &self.foundation);

        let mut headers = Vec::new();
        self.plan_classes(&resolver, &template, &dir, classes, &mut headers);
        self.plan_protocols(&resolver, &template, &dir, &protocols, &mut headers);
        self.plan_categories(&resolver, &template, &dir, &categories, &mut headers);

        let umbrella = (!headers.is_empty()).then(|| {
            let files: Vec<String> = headers.iter().map(|h| file_name(&h.path)).collect();
            let stem = if files.contains(&class_header(&name)) {
                format!("{name}-Umbrella")
            } else {
                name.clone()
            };
            HeaderInfo {
                path: dir.join(format!("{stem}.h")),
                is_umbrella: true,
                name: umbrella_guard(&stem),
                body: umbrella_body(&files),
                ..template.clone()
            }
        });

        info!("Planned {} headers for {}", headers.len(), name);
        Ok(Some(ModulePlan {
            name,
            headers,
            umbrella,
        }))
    }

    fn plan_classes(
        &self,
        resolver: &DependencyResolver<'_>,
        template: &HeaderInfo,
        dir: &Path,
        classes: Vec<ClassDescriptor>,
        out: &mut Vec<HeaderInfo>,
    ) {
        for mut class in classes {
            let imports = resolver.class_imports(&class);
            strip_accessors(&mut class);
            out.push(HeaderInfo {
                path: dir.join(class_header(&class.name)),
                imports,
                body: render_class(&class),
                name: class.name,
                ..template.clone()
            });
        }
    }

    fn plan_protocols(
        &self,
        resolver: &DependencyResolver<'_>,
        template: &HeaderInfo,
        dir: &Path,
        protocols: &[ProtocolDescriptor],
        out: &mut Vec<HeaderInfo>,
    ) {
        let mut seen: HashSet<ProtocolId> = HashSet::new();
        let mut emitted: HashMap<&str, usize> = HashMap::new();

        for proto in protocols {
            if self.foundation.contains_protocol(&proto.name) {
                debug!("Skipping Foundation protocol {}", proto.name);
                continue;
            }
            if !seen.insert(proto.id) {
                continue;
            }

            let count = emitted.entry(proto.name.as_str()).or_insert(0);
            *count += 1;
            let (file, guard) = if *count == 1 {
                (protocol_header(&proto.name), proto.name.clone())
            } else {
                debug!("Protocol {} has another definition at {}", proto.name, proto.id);
                (
                    format!("{}-Protocol-{}.h", proto.name, count),
                    format!("{}_{}", proto.name, count),
                )
            };

            out.push(HeaderInfo {
                path: dir.join(file),
                name: guard,
                imports: resolver.protocol_imports(proto),
                body: render_protocol(proto),
                ..template.clone()
            });
        }
    }

    fn plan_categories(
        &self,
        resolver: &DependencyResolver<'_>,
        template: &HeaderInfo,
        dir: &Path,
        categories: &[CategoryDescriptor],
        out: &mut Vec<HeaderInfo>,
    ) {
        for cat in categories {
            let file = match cat.class_name() {
                Some(class) => format!("{class}+{}.h", cat.name),
                None => format!("{}.h", cat.name),
            };
            out.push(HeaderInfo {
                path: dir.join(file),
                name: cat.name.clone(),
                imports: resolver.category_imports(cat),
                body: render_category(cat),
                ..template.clone()
            });
        }
    }

    /// Writes a plan: entity headers first, the umbrella last.
    ///
    /// When several headers share a path only the last one in plan order is
    /// written.
    pub fn write_plan(&self, plan: &ModulePlan) -> Result<ModuleReport> {
        let mut last: HashMap<&Path, usize> = HashMap::new();
        for (idx, header) in plan.headers.iter().enumerate() {
            last.insert(header.path.as_path(), idx);
        }
        let pending: Vec<&HeaderInfo> = plan
            .headers
            .iter()
            .enumerate()
            .filter(|(idx, h)| last.get(h.path.as_path()) == Some(idx))
            .map(|(_, h)| h)
            .collect();
        if pending.len() < plan.headers.len() {
            debug!(
                "{}: {} headers share a path with a later one",
                plan.name,
                plan.headers.len() - pending.len()
            );
        }

        if self.options.parallel {
            pending.par_iter().try_for_each(|h| h.write())?;
        } else {
            pending.iter().try_for_each(|h| h.write())?;
        }

        if let Some(umbrella) = &plan.umbrella {
            umbrella.write()?;
        }

        Ok(ModuleReport {
            name: plan.name.clone(),
            headers: plan.headers.iter().map(|h| h.path.clone()).collect(),
            umbrella: plan.umbrella.as_ref().map(|u| u.path.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objc::{Ivar, Method, Property};
    use crate::provider::{MachODump, ObjcSections};

    fn prop(name: &str, attrs: &str) -> Property {
        Property {
            name: name.into(),
            attributes: attrs.into(),
        }
    }

    fn method(name: &str) -> Method {
        Method {
            name: name.into(),
            types: "v16@0:8".into(),
        }
    }

    fn binary(objc: ObjcSections) -> MachODump {
        MachODump {
            path: "/tmp/App".into(),
            dylib_id: Some("/System/Library/PrivateFrameworks/App.framework/App".into()),
            objc: Some(objc),
            ..Default::default()
        }
    }

    #[test]
    fn test_transform_setter() {
        assert_eq!(transform_setter("setTitle:").as_deref(), Some("title"));
        assert_eq!(transform_setter("setURL:").as_deref(), Some("uRL"));
        assert_eq!(transform_setter("set:"), None);
        assert_eq!(transform_setter("setup"), None);
        assert_eq!(transform_setter("title"), None);
    }

    #[test]
    fn test_strip_accessors() {
        let mut class = ClassDescriptor::new("Widget", "NSObject");
        class.properties = vec![
            prop("title", "T@\"NSString\",C,N,V_title"),
            prop("enabled", "TB,N,GisEnabled,SmakeEnabled:"),
            prop("count", "Tq,N"),
        ];
        class.ivars = vec![
            Ivar {
                name: "_title".into(),
                type_encoding: "@\"NSString\"".into(),
                offset: 8,
            },
            Ivar {
                name: "count".into(),
                type_encoding: "q".into(),
                offset: 16,
            },
            Ivar {
                name: "_cache".into(),
                type_encoding: "@\"NSCache\"".into(),
                offset: 24,
            },
        ];
        class.instance_methods = vec![
            method("title"),
            method("setTitle:"),
            method("isEnabled"),
            method("makeEnabled:"),
            method("setCount:"),
            method("reload"),
        ];
        class.class_methods = vec![method("title")];

        strip_accessors(&mut class);
        let ivars: Vec<&str> = class.ivars.iter().map(|i| i.name.as_str()).collect();
        let methods: Vec<&str> = class.instance_methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(ivars, vec!["_cache"]);
        assert_eq!(methods, vec!["reload"]);
        assert_eq!(class.class_methods.len(), 1);
    }

    #[test]
    fn test_plan_skips_binary_without_objc() {
        let generator = HeaderGenerator::with_foundation(
            HeaderOptions::default(),
            None,
            FoundationIndex::empty(),
        );
        let dump = MachODump {
            path: "/tmp/plain".into(),
            ..Default::default()
        };
        assert!(generator.plan_binary(&dump).unwrap().is_none());
    }

    #[test]
    fn test_plan_order_and_names() {
        let mut cat = CategoryDescriptor::new("Extras", Some("Widget"));
        cat.instance_methods = vec![method("shine")];
        let dump = binary(ObjcSections {
            classes: Some(vec![
                ClassDescriptor::new("Widget", "NSObject"),
                ClassDescriptor::new("App", "NSObject"),
            ]),
            protocols: Some(vec![ProtocolDescriptor::new("Copying", 0x100)]),
            categories: Some(vec![cat, CategoryDescriptor::new("Loose", None)]),
        });
        let generator = HeaderGenerator::with_foundation(
            HeaderOptions::default().with_output("out"),
            None,
            FoundationIndex::empty(),
        );

        let plan = generator.plan_binary(&dump).unwrap().unwrap();
        assert_eq!(plan.name, "App");
        assert_eq!(
            plan.file_names(),
            vec!["App.h", "Widget.h", "Copying-Protocol.h", "Widget+Extras.h", "Loose.h"]
        );

        let umbrella = plan.umbrella.unwrap();
        assert_eq!(umbrella.path, PathBuf::from("out/App/App-Umbrella.h"));
        assert_eq!(umbrella.name, "App_Umbrella");
        assert!(umbrella.body.starts_with("#import \"App.h\"\n#import \"Widget.h\"\n"));
        assert_eq!(plan.headers[3].imports.locals, vec!["Widget.h"]);
    }

    #[test]
    fn test_module_name_falls_back_to_option() {
        let mut dump = binary(ObjcSections {
            classes: Some(vec![ClassDescriptor::new("Widget", "NSObject")]),
            ..Default::default()
        });
        dump.dylib_id = None;
        let generator = HeaderGenerator::with_foundation(
            HeaderOptions::default().with_name("Tool"),
            None,
            FoundationIndex::empty(),
        );
        let plan = generator.plan_binary(&dump).unwrap().unwrap();
        assert_eq!(plan.name, "Tool");
        assert_eq!(plan.umbrella.unwrap().name, "Tool");
    }

    #[test]
    fn test_protocol_identity_dedup() {
        let dump = binary(ObjcSections {
            protocols: Some(vec![
                ProtocolDescriptor::new("Delegate", 0x10),
                ProtocolDescriptor::new("Delegate", 0x10),
                ProtocolDescriptor::new("Delegate", 0x20),
                ProtocolDescriptor::new("NSCopying", 0x30),
            ]),
            ..Default::default()
        });
        let foundation = FoundationIndex::from_names(Vec::<String>::new(), ["NSCopying"]);
        let generator =
            HeaderGenerator::with_foundation(HeaderOptions::default(), None, foundation);

        let plan = generator.plan_binary(&dump).unwrap().unwrap();
        assert_eq!(plan.file_names(), vec!["Delegate-Protocol.h", "Delegate-Protocol-2.h"]);
        assert_eq!(plan.headers[1].name, "Delegate_2");
    }

    #[test]
    fn test_same_name_protocols_ordered_by_identity() {
        let delegate = |id: u64, method_name: &str| {
            let mut proto = ProtocolDescriptor::new("Delegate", id);
            proto.instance_methods = vec![method(method_name)];
            proto
        };
        let generator = HeaderGenerator::with_foundation(
            HeaderOptions::default(),
            None,
            FoundationIndex::empty(),
        );
        let plan = |protocols: Vec<ProtocolDescriptor>| {
            let dump = binary(ObjcSections {
                protocols: Some(protocols),
                ..Default::default()
            });
            generator.plan_binary(&dump).unwrap().unwrap()
        };

        let forward = plan(vec![delegate(0x10, "alpha"), delegate(0x20, "beta")]);
        let reversed = plan(vec![delegate(0x20, "beta"), delegate(0x10, "alpha")]);
        assert_eq!(forward.headers, reversed.headers);
        assert!(forward.headers[0].body.contains("alpha"));
        assert!(forward.headers[1].body.contains("beta"));
    }

    #[test]
    fn test_same_name_classes_keep_their_imports() {
        let mut dup = ClassDescriptor::new("Dup", "NSObject");
        dup.ivars = vec![Ivar {
            name: "_g".into(),
            type_encoding: "@\"Gadget\"".into(),
            offset: 8,
        }];
        let dump = binary(ObjcSections {
            classes: Some(vec![dup.clone(), dup]),
            ..Default::default()
        });
        let dir = tempfile::tempdir().unwrap();
        let generator = HeaderGenerator::with_foundation(
            HeaderOptions::default()
                .with_output(dir.path())
                .with_parallel(true),
            None,
            FoundationIndex::empty(),
        );

        let plan = generator.plan_binary(&dump).unwrap().unwrap();
        assert_eq!(plan.file_names(), vec!["Dup.h", "Dup.h"]);
        for header in &plan.headers {
            assert_eq!(header.imports.classes, vec!["Gadget"]);
        }

        generator.write_plan(&plan).unwrap();
        let text = std::fs::read_to_string(dir.path().join("App/Dup.h")).unwrap();
        assert!(text.contains("@class Gadget;"));
        assert!(text.contains("Gadget *_g;"));
    }

    #[test]
    fn test_generate_without_cache_rejects_dependencies() {
        let generator = HeaderGenerator::with_foundation(
            HeaderOptions::default().with_dependencies(DependencyMode::Private),
            None,
            FoundationIndex::empty(),
        );
        let primary: Arc<dyn ObjcMetadata> = Arc::new(binary(ObjcSections::default()));
        assert!(generator.generate(primary).is_err());
    }
}
