//! Transactions: transforms plus host metadata.

use std::any::Any;
use std::fmt;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use rustc_hash::FxHashMap;
use vellum_primitives::{CharIdx, Mapping, ReplaceStep, Rope, Selection, StepError, Tendril, Transform};

/// Metadata key under which the state machinery records, on a
/// plugin-appended transaction, the root transaction that triggered it.
pub const APPENDED_TRANSACTION: &str = "appendedTransaction";

/// A document transform together with the host-facing bookkeeping that
/// routing and history need: a creation timestamp, an optional explicit
/// selection, a scroll request, and typed metadata.
///
/// Metadata values are stored behind [`Rc`] so transactions stay cheap to
/// clone; keys are well-known strings, values are downcast on access.
#[derive(Clone)]
pub struct Transaction {
	transform: Transform,
	time: u64,
	selection: Option<Selection>,
	scrolled_into_view: bool,
	meta: FxHashMap<&'static str, Rc<dyn Any>>,
}

impl Transaction {
	/// Creates an empty transaction over the given document, stamped with
	/// the current wall-clock time.
	pub fn new(doc: Rope) -> Self {
		Self {
			transform: Transform::new(doc),
			time: now_ms(),
			selection: None,
			scrolled_into_view: false,
			meta: FxHashMap::default(),
		}
	}

	/// Returns the current document, with all steps applied.
	pub fn doc(&self) -> &Rope {
		self.transform.doc()
	}

	/// Returns the document this transaction started from.
	pub fn before(&self) -> &Rope {
		self.transform.before()
	}

	/// Returns the underlying transform.
	pub fn transform(&self) -> &Transform {
		&self.transform
	}

	/// Returns the applied steps in order.
	pub fn steps(&self) -> &[ReplaceStep] {
		self.transform.steps()
	}

	/// Returns the pre-step document for each step.
	pub fn docs(&self) -> &[Rope] {
		self.transform.docs()
	}

	/// Returns the composed mapping of all applied steps.
	pub fn mapping(&self) -> &Mapping {
		self.transform.mapping()
	}

	/// Returns the mapping for mutation (collaborative rebasing wires
	/// mirror relationships through this).
	pub fn mapping_mut(&mut self) -> &mut Mapping {
		self.transform.mapping_mut()
	}

	/// Returns true if any step has been applied.
	pub fn doc_changed(&self) -> bool {
		self.transform.doc_changed()
	}

	/// Tries to apply a step, recording it on success.
	pub fn maybe_step(&mut self, step: ReplaceStep) -> Result<(), StepError> {
		self.transform.maybe_step(step)
	}

	/// Replaces `[from, to)` with `text`.
	pub fn replace(
		&mut self,
		from: CharIdx,
		to: CharIdx,
		text: impl Into<Tendril>,
	) -> Result<(), StepError> {
		self.transform.replace(from, to, text)
	}

	/// Inserts `text` at `at`.
	pub fn insert_text(&mut self, at: CharIdx, text: impl Into<Tendril>) -> Result<(), StepError> {
		self.transform.insert_text(at, text)
	}

	/// Deletes the characters in `[from, to)`.
	pub fn delete_range(&mut self, from: CharIdx, to: CharIdx) -> Result<(), StepError> {
		self.transform.delete_range(from, to)
	}

	/// Returns the transaction's timestamp in milliseconds.
	pub fn time(&self) -> u64 {
		self.time
	}

	/// Overrides the transaction's timestamp.
	///
	/// Hosts replaying or testing grouping behavior set this explicitly.
	pub fn set_time(&mut self, time: u64) {
		self.time = time;
	}

	/// Returns the explicitly set selection, if any.
	pub fn selection(&self) -> Option<&Selection> {
		self.selection.as_ref()
	}

	/// Sets the selection the resulting state should adopt.
	pub fn set_selection(&mut self, selection: Selection) {
		self.selection = Some(selection);
	}

	/// Requests that the host scroll the selection into view after
	/// applying this transaction.
	pub fn scroll_into_view(&mut self) {
		self.scrolled_into_view = true;
	}

	/// Returns true if a scroll into view was requested.
	pub fn scrolled_into_view(&self) -> bool {
		self.scrolled_into_view
	}

	/// Attaches a metadata value under the given key.
	pub fn set_meta<T: 'static>(&mut self, key: &'static str, value: T) {
		self.meta.insert(key, Rc::new(value));
	}

	/// Reads back a metadata value of the expected type.
	///
	/// Returns `None` when the key is absent or holds a different type.
	pub fn get_meta<T: 'static>(&self, key: &str) -> Option<&T> {
		self.meta.get(key)?.downcast_ref::<T>()
	}
}

impl fmt::Debug for Transaction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Transaction")
			.field("steps", &self.transform.steps().len())
			.field("time", &self.time)
			.field("selection", &self.selection)
			.field("meta", &self.meta.keys().collect::<Vec<_>>())
			.finish()
	}
}

fn now_ms() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_millis() as u64)
		.unwrap_or(0)
}
