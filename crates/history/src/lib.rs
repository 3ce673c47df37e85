//! Selective undo/redo history for vellum editors.
//!
//! Instead of snapshot rollback, the history records the *inverse* of
//! every edit together with the position map of everything that has
//! happened since. Undoing an earlier edit while later (possibly
//! remote) changes stay in place is then a matter of rebasing the
//! stored inverse through those maps. Collaborative editing needs this
//! property, since peers keep inserting changes between the local
//! user's edits.
//!
//! The engine is installed as a [`Plugin`]:
//!
//! ```
//! use vellum_history::{HistoryConfig, history, undo, undo_depth};
//! use vellum_primitives::Rope;
//! use vellum_state::EditorState;
//!
//! let state = EditorState::new(Rope::from(""), vec![history(HistoryConfig::default())]);
//! let mut tr = state.tr();
//! tr.insert_text(0, "hello").unwrap();
//! let state = state.apply(tr);
//! assert_eq!(undo_depth(&state), 1);
//!
//! let mut undone = None;
//! undo(&state, |tr| undone = Some(tr));
//! let state = state.apply(undone.unwrap());
//! assert_eq!(state.doc().to_string(), "");
//! ```

use std::any::Any;
use std::cell::Cell;
use std::rc::Rc;

use tracing::trace;
use vellum_primitives::{Bias, CharIdx, Mappable, Mapping, StepMap};
use vellum_state::{APPENDED_TRANSACTION, EditorState, Plugin, PluginSpec, Transaction};

/// History branches and their algorithms.
pub mod branch;
/// Undo/redo commands and queries.
pub mod commands;
/// History items.
pub mod item;

pub use branch::{Branch, PoppedEvent};
pub use commands::{
	close_history, redo, redo_depth, redo_no_scroll, undo, undo_depth, undo_no_scroll,
};
pub use item::Item;

/// Metadata key carrying a [`HistoryMeta`] on transactions dispatched by
/// the undo/redo commands; also the key the history plugin's state is
/// stored under.
pub const HISTORY_META: &str = "history";

/// Metadata key (value `true`) forcing the next recorded change to open
/// a new undo event.
pub const CLOSE_HISTORY_META: &str = "closeHistory";

/// Metadata key (value `false`) marking a transaction that must not be
/// recorded as undoable.
pub const ADD_TO_HISTORY_META: &str = "addToHistory";

/// Metadata key (a `usize`) set by the collaboration layer: the number
/// of trailing history items the transaction rebased.
pub const REBASED_META: &str = "rebased";

/// Configuration for the history plugin.
#[derive(Debug, Clone)]
pub struct HistoryConfig {
	/// Maximum number of undo events retained.
	pub depth: usize,
	/// Time span, in milliseconds, within which consecutive adjacent
	/// edits group into one undo event.
	pub new_group_delay: u64,
}

impl Default for HistoryConfig {
	fn default() -> Self {
		Self { depth: 100, new_group_delay: 500 }
	}
}

/// The state tracked by the history plugin: the undo and redo branches
/// plus recency metadata used for event grouping.
#[derive(Debug, Clone, Default)]
pub struct HistoryState {
	/// Undoable events.
	pub done: Branch,
	/// Redoable events.
	pub undone: Branch,
	/// Ranges touched by the most recent recorded edit, in
	/// current-document coordinates. `None` when there is no recent
	/// edit to group against.
	pub prev_ranges: Option<Vec<(CharIdx, CharIdx)>>,
	/// Timestamp of the most recent recorded edit, or 0.
	pub prev_time: u64,
}

/// Metadata the undo/redo commands attach to the transactions they
/// dispatch, letting the plugin adopt the precomputed state instead of
/// re-deriving it.
#[derive(Debug, Clone)]
pub struct HistoryMeta {
	/// True when the transaction came from `redo`, false for `undo`.
	pub redo: bool,
	/// The history state after the command.
	pub state: HistoryState,
}

/// Creates the history plugin.
pub fn history(config: HistoryConfig) -> Plugin {
	Plugin::new(HistoryPlugin {
		config,
		preserve_items: Cell::new(None),
	})
}

/// The transaction classifier behind [`history`].
pub struct HistoryPlugin {
	config: HistoryConfig,
	/// Memo of "is a collaboration-aware plugin installed", keyed by the
	/// pointer identity of the state's plugin list.
	preserve_items: Cell<Option<(usize, bool)>>,
}

impl HistoryPlugin {
	/// Returns the plugin's configuration.
	pub fn config(&self) -> &HistoryConfig {
		&self.config
	}

	/// Finds the installed history plugin on a state.
	pub(crate) fn find(state: &EditorState) -> Option<&HistoryPlugin> {
		state
			.plugins()
			.iter()
			.find_map(|plugin| plugin.spec().as_any().downcast_ref::<HistoryPlugin>())
	}

	/// True when recorded items must stay intact because some installed
	/// plugin may later rebase them.
	pub(crate) fn must_preserve_items(&self, state: &EditorState) -> bool {
		let key = Rc::as_ptr(state.plugins_handle()) as usize;
		if let Some((cached_key, value)) = self.preserve_items.get() {
			if cached_key == key {
				return value;
			}
		}
		let value = state
			.plugins()
			.iter()
			.any(|plugin| plugin.spec().preserve_history_items());
		self.preserve_items.set(Some((key, value)));
		value
	}

	/// Routes one incoming transaction to the right branch operation and
	/// produces the next history state.
	fn apply_transaction(
		&self,
		history: &HistoryState,
		state: &EditorState,
		tr: &Transaction,
	) -> HistoryState {
		if let Some(meta) = tr.get_meta::<HistoryMeta>(HISTORY_META) {
			trace!(redo = meta.redo, "adopting history state from command metadata");
			return meta.state.clone();
		}

		let mut history = history.clone();
		if tr.get_meta::<bool>(CLOSE_HISTORY_META) == Some(&true) {
			history.prev_ranges = None;
			history.prev_time = 0;
		}

		let appended = tr.get_meta::<Transaction>(APPENDED_TRANSACTION);

		if tr.steps().is_empty() {
			return history;
		}

		if let Some(meta) = appended.and_then(|a| a.get_meta::<HistoryMeta>(HISTORY_META)) {
			// A host hook appended follow-up steps to an undo or redo:
			// they belong to the same branch the command targeted, and
			// never open an event of their own.
			let preserve = self.must_preserve_items(state);
			if meta.redo {
				return HistoryState {
					done: history.done.add_transform(tr.transform(), None, &self.config, preserve),
					undone: history.undone,
					prev_ranges: tr.mapping().last_map().map(|map| ranges_for(map)),
					prev_time: history.prev_time,
				};
			}
			return HistoryState {
				done: history.done,
				undone: history.undone.add_transform(tr.transform(), None, &self.config, preserve),
				prev_ranges: None,
				prev_time: history.prev_time,
			};
		}

		let recorded = tr.get_meta::<bool>(ADD_TO_HISTORY_META) != Some(&false)
			&& appended
				.map_or(true, |a| a.get_meta::<bool>(ADD_TO_HISTORY_META) != Some(&false));

		if recorded {
			// Group changes that occur in quick succession, at adjacent
			// positions, into one event.
			let new_group = history.prev_time == 0
				|| (appended.is_none()
					&& (history.prev_time < tr.time().saturating_sub(self.config.new_group_delay)
						|| !history
							.prev_ranges
							.as_deref()
							.is_some_and(|ranges| is_adjacent_to(tr, ranges))));
			let prev_ranges = if appended.is_some() {
				history
					.prev_ranges
					.as_deref()
					.map(|ranges| map_ranges(ranges, tr.mapping()))
			} else {
				tr.mapping().last_map().map(|map| ranges_for(map))
			};
			let selection = new_group.then(|| state.selection().bookmark());
			trace!(new_group, steps = tr.steps().len(), "recording edit");
			return HistoryState {
				done: history.done.add_transform(
					tr.transform(),
					selection,
					&self.config,
					self.must_preserve_items(state),
				),
				undone: Branch::empty(),
				prev_ranges,
				prev_time: tr.time(),
			};
		}

		if let Some(&rebased_count) = tr.get_meta::<usize>(REBASED_META) {
			// The collaboration layer rebased trailing items over remote
			// changes.
			trace!(count = rebased_count, "rebasing history over remote changes");
			return HistoryState {
				done: history.done.rebased(tr.transform(), rebased_count),
				undone: history.undone.rebased(tr.transform(), rebased_count),
				prev_ranges: history
					.prev_ranges
					.as_deref()
					.map(|ranges| map_ranges(ranges, tr.mapping())),
				prev_time: history.prev_time,
			};
		}

		// Not recorded, but it still moved positions: track the maps so
		// future undos keep translating correctly.
		HistoryState {
			done: history.done.add_maps(tr.mapping().maps()),
			undone: history.undone.add_maps(tr.mapping().maps()),
			prev_ranges: history
				.prev_ranges
				.as_deref()
				.map(|ranges| map_ranges(ranges, tr.mapping())),
			prev_time: history.prev_time,
		}
	}
}

impl PluginSpec for HistoryPlugin {
	fn key(&self) -> &'static str {
		HISTORY_META
	}

	fn init(&self, _state: &EditorState) -> Rc<dyn Any> {
		Rc::new(HistoryState::default())
	}

	fn apply(
		&self,
		tr: &Transaction,
		value: Rc<dyn Any>,
		old_state: &EditorState,
		_new_state: &EditorState,
	) -> Rc<dyn Any> {
		let history = value
			.downcast_ref::<HistoryState>()
			.cloned()
			.unwrap_or_default();
		Rc::new(self.apply_transaction(&history, old_state, tr))
	}

	fn as_any(&self) -> &dyn Any {
		self
	}
}

/// The ranges a map touched, in new-document coordinates.
fn ranges_for(map: &StepMap) -> Vec<(CharIdx, CharIdx)> {
	let mut result = Vec::new();
	map.for_each(|_old_from, _old_to, new_from, new_to| result.push((new_from, new_to)));
	result
}

/// Maps touched ranges through later changes, dropping ranges that
/// collapse away entirely.
fn map_ranges(ranges: &[(CharIdx, CharIdx)], mapping: &Mapping) -> Vec<(CharIdx, CharIdx)> {
	let mut result = Vec::new();
	for &(from, to) in ranges {
		let from = mapping.map_pos(from, Bias::Right);
		let to = mapping.map_pos(to, Bias::Left);
		if from <= to {
			result.push((from, to));
		}
	}
	result
}

/// True when the transaction's first change touches a range adjacent to
/// (or overlapping) one of `prev_ranges`.
fn is_adjacent_to(tr: &Transaction, prev_ranges: &[(CharIdx, CharIdx)]) -> bool {
	let Some(first) = tr.mapping().maps().first() else {
		return false;
	};
	let mut adjacent = false;
	first.for_each(|start, end, _new_start, _new_end| {
		for &(from, to) in prev_ranges {
			if start <= to && end >= from {
				adjacent = true;
			}
		}
	});
	adjacent
}
