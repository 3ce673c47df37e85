//! Step-accumulating document transforms.

use std::sync::Arc;

use ropey::Rope;

use crate::map::Mapping;
use crate::range::CharIdx;
use crate::step::{ReplaceStep, StepError, Tendril};


/// A document transformation built from a sequence of steps.
///
/// Alongside the current document, a transform keeps every applied step,
/// the document as it was *before* each step, and the composed
/// [`Mapping`] of all step maps. The pre-step documents are what step
/// inversion reads deleted text from; the mapping is what later changes
/// and selections are rebased through. Rope structural sharing keeps the
/// per-step documents cheap.
#[derive(Debug, Clone)]
pub struct Transform {
	doc: Rope,
	steps: Vec<ReplaceStep>,
	docs: Vec<Rope>,
	mapping: Mapping,
}

impl Transform {
	/// Creates an empty transform over the given document.
	pub fn new(doc: Rope) -> Self {
		Self {
			doc,
			steps: Vec::new(),
			docs: Vec::new(),
			mapping: Mapping::new(),
		}
	}

	/// Returns the current document, with all steps applied.
	pub fn doc(&self) -> &Rope {
		&self.doc
	}

	/// Returns the document as it was before any step was applied.
	pub fn before(&self) -> &Rope {
		self.docs.first().unwrap_or(&self.doc)
	}

	/// Returns the applied steps in order.
	pub fn steps(&self) -> &[ReplaceStep] {
		&self.steps
	}

	/// Returns the pre-step document for each step, in step order.
	pub fn docs(&self) -> &[Rope] {
		&self.docs
	}

	/// Returns the composed mapping of all applied steps.
	pub fn mapping(&self) -> &Mapping {
		&self.mapping
	}

	/// Returns the mapping for mutation.
	///
	/// Collaborative rebasing uses this to wire mirror relationships
	/// between inverted steps and their re-applied counterparts.
	pub fn mapping_mut(&mut self) -> &mut Mapping {
		&mut self.mapping
	}

	/// Returns true if any step has been applied.
	pub fn doc_changed(&self) -> bool {
		!self.steps.is_empty()
	}

	/// Tries to apply a step, recording it on success.
	///
	/// Failure leaves the transform unchanged; callers that treat a
	/// failed step as non-fatal simply ignore the error.
	pub fn maybe_step(&mut self, step: ReplaceStep) -> Result<(), StepError> {
		let next = step.apply(&self.doc)?;
		self.mapping.append_map(Arc::new(step.get_map()), None);
		self.docs.push(std::mem::replace(&mut self.doc, next));
		self.steps.push(step);
		Ok(())
	}

	/// Replaces `[from, to)` with `text`.
	pub fn replace(
		&mut self,
		from: CharIdx,
		to: CharIdx,
		text: impl Into<Tendril>,
	) -> Result<(), StepError> {
		self.maybe_step(ReplaceStep::new(from, to, text))
	}

	/// Inserts `text` at `at`.
	pub fn insert_text(&mut self, at: CharIdx, text: impl Into<Tendril>) -> Result<(), StepError> {
		self.maybe_step(ReplaceStep::insert(at, text))
	}

	/// Deletes the characters in `[from, to)`.
	pub fn delete_range(&mut self, from: CharIdx, to: CharIdx) -> Result<(), StepError> {
		self.maybe_step(ReplaceStep::delete(from, to))
	}
}
