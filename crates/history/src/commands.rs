//! Undo/redo commands and queries.

use vellum_state::{EditorState, Transaction};

use crate::{CLOSE_HISTORY_META, HISTORY_META, HistoryMeta, HistoryPlugin, HistoryState};

/// Builds the transaction reverting the most recent event on the source
/// branch, records its inverse (with the current selection's bookmark)
/// on the destination branch, and attaches the resulting history state
/// as metadata so the plugin adopts it instead of re-deriving it.
fn hist_transaction(
	plugin: &HistoryPlugin,
	history: &HistoryState,
	state: &EditorState,
	redo: bool,
) -> Option<Transaction> {
	let preserve_items = plugin.must_preserve_items(state);
	let source = if redo { &history.undone } else { &history.done };
	let pop = source.pop_event(state, preserve_items)?;

	let selection = pop.selection.resolve(pop.transform.doc());
	let destination = if redo { &history.done } else { &history.undone };
	let added = destination.add_transform(
		pop.transform.transform(),
		Some(state.selection().bookmark()),
		plugin.config(),
		preserve_items,
	);

	let new_state = if redo {
		HistoryState {
			done: added,
			undone: pop.remaining,
			prev_ranges: None,
			prev_time: history.prev_time,
		}
	} else {
		HistoryState {
			done: pop.remaining,
			undone: added,
			prev_ranges: None,
			prev_time: history.prev_time,
		}
	};

	let mut tr = pop.transform;
	tr.set_selection(selection);
	tr.set_meta(HISTORY_META, HistoryMeta { redo, state: new_state });
	Some(tr)
}

fn build_command(
	state: &EditorState,
	mut dispatch: impl FnMut(Transaction),
	redo: bool,
	scroll: bool,
) -> bool {
	let Some(plugin) = HistoryPlugin::find(state) else {
		return false;
	};
	let Some(history) = state.plugin_state::<HistoryState>(HISTORY_META) else {
		return false;
	};
	let source = if redo { &history.undone } else { &history.done };
	if source.event_count() == 0 {
		return false;
	}
	if let Some(mut tr) = hist_transaction(plugin, history, state, redo) {
		if scroll {
			tr.scroll_into_view();
		}
		dispatch(tr);
	}
	true
}

/// Undoes the most recent undo event, dispatching the reverting
/// transaction. Returns false when there is nothing to undo.
pub fn undo(state: &EditorState, dispatch: impl FnMut(Transaction)) -> bool {
	build_command(state, dispatch, false, true)
}

/// Redoes the most recently undone event. Returns false when there is
/// nothing to redo.
pub fn redo(state: &EditorState, dispatch: impl FnMut(Transaction)) -> bool {
	build_command(state, dispatch, true, true)
}

/// Like [`undo`], without requesting that the selection be scrolled
/// into view.
pub fn undo_no_scroll(state: &EditorState, dispatch: impl FnMut(Transaction)) -> bool {
	build_command(state, dispatch, false, false)
}

/// Like [`redo`], without requesting that the selection be scrolled
/// into view.
pub fn redo_no_scroll(state: &EditorState, dispatch: impl FnMut(Transaction)) -> bool {
	build_command(state, dispatch, true, false)
}

/// Returns the number of undoable events.
pub fn undo_depth(state: &EditorState) -> usize {
	state
		.plugin_state::<HistoryState>(HISTORY_META)
		.map_or(0, |history| history.done.event_count())
}

/// Returns the number of redoable events.
pub fn redo_depth(state: &EditorState) -> usize {
	state
		.plugin_state::<HistoryState>(HISTORY_META)
		.map_or(0, |history| history.undone.event_count())
}

/// Marks a transaction so that the next recorded change opens a new
/// undo event, even when grouping heuristics would merge it.
pub fn close_history(tr: &mut Transaction) {
	tr.set_meta(CLOSE_HISTORY_META, true);
}
