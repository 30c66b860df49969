//! Names provided by the base system frameworks.
//!
//! Anything declared by `Foundation` or `CoreFoundation` is assumed to be
//! available to every generated header, so the index is used to suppress
//! imports and forward declarations of those names.

use tracing::{debug, info};

use crate::error::{or_empty, Result};
use crate::provider::ImageProvider;

/// Images whose classes and protocols are always available.
pub const REFERENCE_IMAGES: [&str; 2] = ["Foundation", "CoreFoundation"];

/// Sorted, deduplicated class and protocol names of the reference images.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FoundationIndex {
    classes: Vec<String>,
    protocols: Vec<String>,
}

impl FoundationIndex {
    /// An index that suppresses nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds an index from explicit name lists.
    pub fn from_names<C, P>(classes: C, protocols: P) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        let mut index = Self {
            classes: classes.into_iter().map(Into::into).collect(),
            protocols: protocols.into_iter().map(Into::into).collect(),
        };
        index.finish();
        index
    }

    /// Builds the index from the reference images.
    ///
    /// Without an image provider the index is empty. Failing to load either
    /// reference image is an error; a missing metadata section is not.
    pub fn build(images: Option<&dyn ImageProvider>) -> Result<Self> {
        let Some(images) = images else {
            debug!("No image provider, Foundation suppression disabled");
            return Ok(Self::empty());
        };

        let mut index = Self::empty();
        for name in REFERENCE_IMAGES {
            let image = images.image(name)?;
            index
                .classes
                .extend(or_empty(image.classes())?.into_iter().map(|c| c.name));
            index
                .protocols
                .extend(or_empty(image.protocols())?.into_iter().map(|p| p.name));
        }
        index.finish();

        info!(
            "Foundation index: {} classes, {} protocols",
            index.classes.len(),
            index.protocols.len()
        );
        Ok(index)
    }

    fn finish(&mut self) {
        self.classes.sort_unstable();
        self.classes.dedup();
        self.protocols.sort_unstable();
        self.protocols.dedup();
    }

    /// Returns true if `name` is a Foundation class.
    pub fn contains_class(&self, name: &str) -> bool {
        self.classes.binary_search_by(|c| c.as_str().cmp(name)).is_ok()
    }

    /// Returns true if `name` is a Foundation protocol.
    pub fn contains_protocol(&self, name: &str) -> bool {
        self.protocols.binary_search_by(|p| p.as_str().cmp(name)).is_ok()
    }

    /// Returns true if the index suppresses nothing.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.protocols.is_empty()
    }

    /// Sorted class names.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Sorted protocol names.
    pub fn protocols(&self) -> &[String] {
        &self.protocols
    }
}
