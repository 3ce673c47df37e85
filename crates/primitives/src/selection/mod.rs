//! Selections and restorable selection bookmarks.

use ropey::Rope;
use smallvec::{SmallVec, smallvec};

use crate::map::Mappable;
use crate::range::{Bias, CharIdx, Range};

#[cfg(test)]
mod tests;

/// A set of selection ranges with a designated primary.
///
/// A selection always contains at least one range. The primary range is
/// the one cursor-centric operations act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
	/// The collection of selection ranges (always non-empty).
	ranges: SmallVec<[Range; 1]>,
	/// Index of the primary range within `ranges`.
	primary_index: usize,
}

impl Selection {
	/// Creates a single-range selection.
	pub fn single(anchor: CharIdx, head: CharIdx) -> Self {
		Self {
			ranges: smallvec![Range::new(anchor, head)],
			primary_index: 0,
		}
	}

	/// Creates an empty-cursor selection at the given position.
	pub fn point(pos: CharIdx) -> Self {
		Self::single(pos, pos)
	}

	/// Creates a selection from a vector of ranges.
	///
	/// # Panics
	///
	/// Panics if `ranges` is empty or `primary_index` is out of bounds.
	pub fn from_ranges(ranges: Vec<Range>, primary_index: usize) -> Self {
		assert!(!ranges.is_empty(), "Selection cannot be empty");
		assert!(
			primary_index < ranges.len(),
			"primary_index ({primary_index}) out of bounds for {} ranges",
			ranges.len()
		);
		Self {
			ranges: ranges.into_iter().collect(),
			primary_index,
		}
	}

	/// Returns the primary range.
	pub fn primary(&self) -> Range {
		self.ranges[self.primary_index]
	}

	/// Returns all ranges as a slice.
	pub fn ranges(&self) -> &[Range] {
		&self.ranges
	}

	/// Iterates over all ranges.
	pub fn iter(&self) -> impl Iterator<Item = &Range> {
		self.ranges.iter()
	}

	/// Maps every range through document changes.
	pub fn map(&self, mapping: &impl Mappable) -> Selection {
		Selection {
			ranges: self
				.ranges
				.iter()
				.map(|r| {
					Range::new(
						mapping.map_pos(r.anchor, Bias::Right),
						mapping.map_pos(r.head, Bias::Right),
					)
				})
				.collect(),
			primary_index: self.primary_index,
		}
	}

	/// Returns a position-only bookmark for this selection.
	///
	/// Bookmarks survive document changes via [`SelectionBookmark::map`]
	/// and are turned back into selections with
	/// [`SelectionBookmark::resolve`].
	pub fn bookmark(&self) -> SelectionBookmark {
		SelectionBookmark {
			ranges: self.ranges.clone(),
			primary_index: self.primary_index,
		}
	}
}

/// A lightweight, mappable record of a selection.
///
/// Unlike a [`Selection`], a bookmark is not tied to any document: it can
/// be carried through an arbitrary chain of position maps and resolved
/// against whatever document exists at the other end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionBookmark {
	ranges: SmallVec<[Range; 1]>,
	primary_index: usize,
}

impl SelectionBookmark {
	/// Maps the bookmark's positions through document changes.
	pub fn map(&self, mapping: &impl Mappable) -> SelectionBookmark {
		SelectionBookmark {
			ranges: self
				.ranges
				.iter()
				.map(|r| {
					Range::new(
						mapping.map_pos(r.anchor, Bias::Right),
						mapping.map_pos(r.head, Bias::Right),
					)
				})
				.collect(),
			primary_index: self.primary_index,
		}
	}

	/// Resolves the bookmark against a document, clamping positions to
	/// the document's length.
	pub fn resolve(&self, doc: &Rope) -> Selection {
		let len = doc.len_chars();
		Selection {
			ranges: self
				.ranges
				.iter()
				.map(|r| Range::new(r.anchor.min(len), r.head.min(len)))
				.collect(),
			primary_index: self.primary_index,
		}
	}
}
