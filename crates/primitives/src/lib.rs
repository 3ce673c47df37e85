//! Document and transformation primitives for the vellum editor.
//!
//! The document is a [`ropey::Rope`] measured in characters. Edits are
//! expressed as [`ReplaceStep`]s, which know how to apply themselves,
//! invert themselves against the pre-edit document, and rebase themselves
//! through the position maps of other edits. [`Transform`] accumulates a
//! sequence of steps together with the pre-step documents and the
//! composed [`Mapping`], which is what undo/redo and collaborative
//! rebasing consume.

/// Position maps and mirror-aware mappings.
pub mod map;
/// Coordinate types and selection ranges.
pub mod range;
/// Selections and restorable selection bookmarks.
pub mod selection;
/// Replace steps over rope documents.
pub mod step;
/// Step-accumulating document transforms.
pub mod transform;

pub use map::{MapRange, MapResult, Mappable, Mapping, MappingSlice, StepMap};
pub use range::{Bias, CharIdx, CharLen, Range};
pub use ropey::{Rope, RopeSlice};
pub use selection::{Selection, SelectionBookmark};
pub use step::{ReplaceStep, StepError, Tendril};
pub use transform::Transform;
