//! Header reconstruction.
//!
//! Rebuilds one Objective-C header per class, protocol and category of a
//! binary, plus an umbrella header per module. The pipeline, leaf first:
//!
//! 1. [`classify`] - type encodings to referenced names
//! 2. [`FoundationIndex`] - names that never need importing
//! 3. [`DependencyResolver`] - per-entity reference collection
//! 4. [`Imports`] - sorting, dedup and suppression
//! 5. [`HeaderInfo`] - text layout and file writing
//! 6. [`HeaderGenerator`] - drives the above per binary

pub mod classify;
mod assembler;
mod foundation;
mod generator;
mod imports;
mod resolver;

pub use assembler::*;
pub use classify::{classify, EncodingStyle, LocalNames, Reference};
pub use foundation::*;
pub use generator::*;
pub use imports::*;
pub use resolver::*;
