//! Replace steps over rope documents.

use ropey::Rope;
use thiserror::Error;

use crate::map::{Mappable, StepMap};
use crate::range::{Bias, CharIdx, CharLen};

/// A tendril is the string type used for step replacement text.
///
/// Currently aliased to [`String`] for simplicity.
pub type Tendril = String;

/// Errors that can occur when applying a step to a document.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StepError {
	/// The step's range extends past the end of the document.
	#[error("step range {from}..{to} exceeds document length {len}")]
	OutOfBounds {
		/// Start of the step's range.
		from: CharIdx,
		/// End of the step's range.
		to: CharIdx,
		/// Length of the document the step was applied to.
		len: CharLen,
	},

	/// The step's range ends before it starts.
	#[error("step range {from}..{to} is inverted")]
	InvertedRange {
		/// Start of the step's range.
		from: CharIdx,
		/// End of the step's range.
		to: CharIdx,
	},
}

/// A single document edit: replace the characters in `[from, to)` with
/// `text`.
///
/// Steps can be applied, inverted against the pre-edit document, rebased
/// through the position maps of other edits, and fused with an adjacent
/// step. Insertion is a replace with an empty range, deletion a replace
/// with empty text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceStep {
	from: CharIdx,
	to: CharIdx,
	text: Tendril,
	/// Cached character length of `text`.
	text_len: CharLen,
}

impl ReplaceStep {
	/// Creates a step replacing `[from, to)` with `text`.
	pub fn new(from: CharIdx, to: CharIdx, text: impl Into<Tendril>) -> Self {
		let text = text.into();
		let text_len = text.chars().count();
		Self { from, to, text, text_len }
	}

	/// Creates a step inserting `text` at `at`.
	pub fn insert(at: CharIdx, text: impl Into<Tendril>) -> Self {
		Self::new(at, at, text)
	}

	/// Creates a step deleting `[from, to)`.
	pub fn delete(from: CharIdx, to: CharIdx) -> Self {
		Self::new(from, to, "")
	}

	/// Returns the start of the replaced range.
	pub fn from(&self) -> CharIdx {
		self.from
	}

	/// Returns the end of the replaced range (exclusive).
	pub fn to(&self) -> CharIdx {
		self.to
	}

	/// Returns the replacement text.
	pub fn text(&self) -> &str {
		&self.text
	}

	/// Returns the character length of the replacement text.
	pub fn text_len(&self) -> CharLen {
		self.text_len
	}

	/// Applies this step to a document, producing the edited document.
	///
	/// The input rope is unchanged; ropey's structural sharing makes the
	/// copy cheap.
	pub fn apply(&self, doc: &Rope) -> Result<Rope, StepError> {
		if self.from > self.to {
			return Err(StepError::InvertedRange { from: self.from, to: self.to });
		}
		if self.to > doc.len_chars() {
			return Err(StepError::OutOfBounds {
				from: self.from,
				to: self.to,
				len: doc.len_chars(),
			});
		}
		let mut next = doc.clone();
		next.remove(self.from..self.to);
		next.insert(self.from, &self.text);
		Ok(next)
	}

	/// Returns the position map describing this step's effect.
	pub fn get_map(&self) -> StepMap {
		StepMap::single(self.from, self.to - self.from, self.text_len)
	}

	/// Creates a step that undoes this one.
	///
	/// `doc` must be the document this step was applied to; the deleted
	/// text is read back out of it.
	pub fn invert(&self, doc: &Rope) -> ReplaceStep {
		let deleted: String = doc.slice(self.from..self.to).chars().collect();
		ReplaceStep::new(self.from, self.from + self.text_len, deleted)
	}

	/// Rebases this step through a mapping.
	///
	/// Returns `None` when the replaced range was itself deleted by the
	/// changes the mapping describes.
	pub fn map(&self, mapping: &impl Mappable) -> Option<ReplaceStep> {
		let from = mapping.map_result(self.from, Bias::Right);
		let to = if self.to == self.from {
			from
		} else {
			mapping.map_result(self.to, Bias::Left)
		};
		if from.deleted_across() && to.deleted_across() {
			return None;
		}
		Some(ReplaceStep::new(from.pos, to.pos.max(from.pos), self.text.clone()))
	}

	/// Fuses this step with one that directly follows it.
	///
	/// Succeeds when `other`'s range starts exactly where this step's
	/// inserted text ends (continued typing) or ends exactly where this
	/// step's range starts (continued backward deletion).
	pub fn merge(&self, other: &ReplaceStep) -> Option<ReplaceStep> {
		if self.from + self.text_len == other.from {
			let mut text = self.text.clone();
			text.push_str(&other.text);
			Some(ReplaceStep::new(self.from, self.to + (other.to - other.from), text))
		} else if other.to == self.from {
			let mut text = other.text.clone();
			text.push_str(&self.text);
			Some(ReplaceStep::new(other.from, self.to, text))
		} else {
			None
		}
	}
}

#[cfg(test)]
mod tests {
	use ropey::Rope;

	use super::ReplaceStep;
	use crate::map::Mappable;
	use crate::range::Bias;

	#[test]
	fn apply_replaces_range() {
		let doc = Rope::from("hello world");
		let step = ReplaceStep::new(0, 5, "goodbye");
		let next = step.apply(&doc).unwrap();
		assert_eq!(next.to_string(), "goodbye world");
	}

	#[test]
	fn apply_out_of_bounds_fails() {
		let doc = Rope::from("abc");
		assert!(ReplaceStep::delete(2, 5).apply(&doc).is_err());
	}

	#[test]
	fn invert_round_trips() {
		let doc = Rope::from("hello world");
		let step = ReplaceStep::new(5, 11, "!");
		let applied = step.apply(&doc).unwrap();
		let inverted = step.invert(&doc);
		let restored = inverted.apply(&applied).unwrap();
		assert_eq!(restored.to_string(), doc.to_string());
	}

	#[test]
	fn map_through_earlier_insertion() {
		let insert = ReplaceStep::insert(0, "xy");
		let step = ReplaceStep::new(3, 4, "q");
		let mapped = step.map(&insert.get_map()).unwrap();
		assert_eq!((mapped.from(), mapped.to()), (5, 6));
	}

	#[test]
	fn map_inside_deletion_is_dropped() {
		let delete = ReplaceStep::delete(1, 6);
		let step = ReplaceStep::new(3, 4, "q");
		assert!(step.map(&delete.get_map()).is_none());
	}

	#[test]
	fn merge_adjacent_insertions() {
		let a = ReplaceStep::insert(5, "h");
		let b = ReplaceStep::insert(6, "i");
		let merged = a.merge(&b).unwrap();
		assert_eq!((merged.from(), merged.to(), merged.text()), (5, 5, "hi"));
	}

	#[test]
	fn merge_adjacent_backward_deletions() {
		let a = ReplaceStep::delete(4, 5);
		let b = ReplaceStep::delete(3, 4);
		let merged = a.merge(&b).unwrap();
		assert_eq!((merged.from(), merged.to(), merged.text()), (3, 5, ""));
	}

	#[test]
	fn merge_disjoint_fails() {
		let a = ReplaceStep::insert(5, "h");
		let b = ReplaceStep::insert(9, "i");
		assert!(a.merge(&b).is_none());
	}

	#[test]
	fn map_pos_bias_at_insertion_point() {
		let map = ReplaceStep::insert(3, "ab").get_map();
		assert_eq!(map.map_pos(3, Bias::Left), 3);
		assert_eq!(map.map_pos(3, Bias::Right), 5);
	}
}
