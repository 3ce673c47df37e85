//! Editor state and the transaction-application machinery.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::trace;
use vellum_primitives::{Rope, Selection};

use crate::plugin::Plugin;
use crate::transaction::{APPENDED_TRANSACTION, Transaction};

/// The persistent state of an editor: document, selection, installed
/// plugins, and per-plugin state.
///
/// States are immutable; [`apply`](Self::apply) produces a new state and
/// leaves the old one intact. The plugin list is shared between
/// successive states by reference, which also gives plugins a cheap
/// identity to key caches on.
#[derive(Clone)]
pub struct EditorState {
	doc: Rope,
	selection: Selection,
	plugins: Rc<Vec<Plugin>>,
	plugin_states: FxHashMap<&'static str, Rc<dyn Any>>,
}

impl EditorState {
	/// Creates a state over `doc` with the cursor at the start.
	pub fn new(doc: Rope, plugins: Vec<Plugin>) -> Self {
		Self::with_selection(doc, Selection::point(0), plugins)
	}

	/// Creates a state over `doc` with an explicit selection.
	pub fn with_selection(doc: Rope, selection: Selection, plugins: Vec<Plugin>) -> Self {
		let mut state = EditorState {
			doc,
			selection,
			plugins: Rc::new(plugins),
			plugin_states: FxHashMap::default(),
		};
		for plugin in state.plugins.clone().iter() {
			let value = plugin.spec().init(&state);
			state.plugin_states.insert(plugin.key(), value);
		}
		state
	}

	/// Returns the document.
	pub fn doc(&self) -> &Rope {
		&self.doc
	}

	/// Returns the selection.
	pub fn selection(&self) -> &Selection {
		&self.selection
	}

	/// Returns the installed plugins.
	pub fn plugins(&self) -> &[Plugin] {
		&self.plugins
	}

	/// Returns the shared plugin list handle.
	///
	/// The pointer identity of this handle changes exactly when the
	/// plugin set changes, which makes it a valid cache key for
	/// plugin-set-derived predicates.
	pub fn plugins_handle(&self) -> &Rc<Vec<Plugin>> {
		&self.plugins
	}

	/// Reads a plugin's state, downcast to its concrete type.
	pub fn plugin_state<T: 'static>(&self, key: &str) -> Option<&T> {
		self.plugin_states.get(key)?.downcast_ref::<T>()
	}

	/// Starts a new transaction over the current document.
	pub fn tr(&self) -> Transaction {
		Transaction::new(self.doc.clone())
	}

	/// Applies a transaction, returning the new state.
	pub fn apply(&self, tr: Transaction) -> EditorState {
		self.apply_transaction(tr).0
	}

	/// Applies a transaction and any transactions plugins append to it.
	///
	/// Every appended transaction is stamped with
	/// [`APPENDED_TRANSACTION`] metadata holding the root transaction, so
	/// downstream plugins can see what triggered it. Returns the new
	/// state plus all applied transactions in application order.
	pub fn apply_transaction(&self, root: Transaction) -> (EditorState, Vec<Rc<Transaction>>) {
		let root = Rc::new(root);
		let mut new_state = self.apply_inner(&root);
		let mut transactions = vec![root.clone()];
		loop {
			let mut have_new = false;
			for plugin in self.plugins.iter() {
				let appended =
					plugin
						.spec()
						.append_transaction(&transactions, self, &new_state);
				let Some(mut appended) = appended else { continue };
				trace!(plugin = plugin.key(), "plugin appended a transaction");
				appended.set_meta(APPENDED_TRANSACTION, (*root).clone());
				let appended = Rc::new(appended);
				new_state = new_state.apply_inner(&appended);
				transactions.push(appended);
				have_new = true;
			}
			if !have_new {
				break;
			}
		}
		(new_state, transactions)
	}

	fn apply_inner(&self, tr: &Transaction) -> EditorState {
		assert!(
			tr.before() == &self.doc,
			"applying a transaction to a mismatched document"
		);
		let selection = match tr.selection() {
			Some(selection) => selection.clone(),
			None => self.selection.map(tr.mapping()),
		};
		let mut next = EditorState {
			doc: tr.doc().clone(),
			selection,
			plugins: self.plugins.clone(),
			plugin_states: FxHashMap::default(),
		};
		for plugin in self.plugins.iter() {
			if let Some(value) = self.plugin_states.get(plugin.key()).cloned() {
				let value = plugin.spec().apply(tr, value, self, &next);
				next.plugin_states.insert(plugin.key(), value);
			}
		}
		next
	}
}

impl fmt::Debug for EditorState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EditorState")
			.field("doc_len", &self.doc.len_chars())
			.field("selection", &self.selection)
			.field("plugins", &self.plugins.iter().map(Plugin::key).collect::<Vec<_>>())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use std::any::Any;
	use std::rc::Rc;

	use vellum_primitives::{Rope, Selection};

	use super::EditorState;
	use crate::plugin::{Plugin, PluginSpec};
	use crate::transaction::{APPENDED_TRANSACTION, Transaction};

	/// Counts applied steps across all transactions.
	struct StepCounter;

	impl PluginSpec for StepCounter {
		fn key(&self) -> &'static str {
			"stepCounter"
		}

		fn init(&self, _state: &EditorState) -> Rc<dyn Any> {
			Rc::new(0usize)
		}

		fn apply(
			&self,
			tr: &Transaction,
			value: Rc<dyn Any>,
			_old_state: &EditorState,
			_new_state: &EditorState,
		) -> Rc<dyn Any> {
			let count = value.downcast_ref::<usize>().copied().unwrap_or(0);
			Rc::new(count + tr.steps().len())
		}

		fn as_any(&self) -> &dyn Any {
			self
		}
	}

	/// Appends a marker insertion once per root transaction that carries
	/// the "wantsFollowUp" metadata.
	struct FollowUp;

	impl PluginSpec for FollowUp {
		fn key(&self) -> &'static str {
			"followUp"
		}

		fn init(&self, _state: &EditorState) -> Rc<dyn Any> {
			Rc::new(())
		}

		fn apply(
			&self,
			_tr: &Transaction,
			value: Rc<dyn Any>,
			_old_state: &EditorState,
			_new_state: &EditorState,
		) -> Rc<dyn Any> {
			value
		}

		fn append_transaction(
			&self,
			transactions: &[Rc<Transaction>],
			_old_state: &EditorState,
			new_state: &EditorState,
		) -> Option<Transaction> {
			let last = transactions.last()?;
			if last.get_meta::<bool>("wantsFollowUp") != Some(&true) {
				return None;
			}
			let mut tr = new_state.tr();
			tr.insert_text(0, "*").ok()?;
			Some(tr)
		}

		fn as_any(&self) -> &dyn Any {
			self
		}
	}

	#[test]
	fn apply_updates_doc_and_plugin_state() {
		let state = EditorState::new(Rope::from("ab"), vec![Plugin::new(StepCounter)]);
		let mut tr = state.tr();
		tr.insert_text(2, "c").unwrap();
		tr.insert_text(3, "d").unwrap();
		let state = state.apply(tr);
		assert_eq!(state.doc().to_string(), "abcd");
		assert_eq!(state.plugin_state::<usize>("stepCounter"), Some(&2));
	}

	#[test]
	fn selection_is_mapped_through_changes() {
		let state = EditorState::with_selection(
			Rope::from("hello"),
			Selection::point(3),
			vec![],
		);
		let mut tr = state.tr();
		tr.insert_text(0, "__").unwrap();
		let state = state.apply(tr);
		assert_eq!(state.selection().primary().head, 5);
	}

	#[test]
	fn explicit_selection_wins() {
		let state = EditorState::new(Rope::from("hello"), vec![]);
		let mut tr = state.tr();
		tr.insert_text(0, "__").unwrap();
		tr.set_selection(Selection::point(1));
		let state = state.apply(tr);
		assert_eq!(state.selection().primary().head, 1);
	}

	#[test]
	fn appended_transactions_carry_the_root() {
		let state = EditorState::new(
			Rope::from("x"),
			vec![Plugin::new(StepCounter), Plugin::new(FollowUp)],
		);
		let mut tr = state.tr();
		tr.insert_text(1, "y").unwrap();
		tr.set_meta("wantsFollowUp", true);
		let (state, transactions) = state.apply_transaction(tr);
		assert_eq!(state.doc().to_string(), "*xy");
		assert_eq!(transactions.len(), 2);
		let appended = &transactions[1];
		let root = appended.get_meta::<Transaction>(APPENDED_TRANSACTION).unwrap();
		assert_eq!(root.get_meta::<bool>("wantsFollowUp"), Some(&true));
		// Both the root's steps and the appended step were counted.
		assert_eq!(state.plugin_state::<usize>("stepCounter"), Some(&2));
	}
}
