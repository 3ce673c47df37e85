//! Plugin trait and handle.

use std::any::Any;
use std::rc::Rc;

use crate::state::EditorState;
use crate::transaction::Transaction;

/// Behavior a plugin contributes to an editor state.
///
/// A plugin owns a piece of state, keyed by [`key`](Self::key), that is
/// initialized when the editor state is created and recomputed for every
/// applied transaction. Plugin state is an [`Rc<dyn Any>`]: the plugin
/// that owns a key is the only code that downcasts it.
pub trait PluginSpec {
	/// The key this plugin's state is stored under. Must be unique among
	/// the installed plugins.
	fn key(&self) -> &'static str;

	/// Produces the initial plugin state.
	fn init(&self, state: &EditorState) -> Rc<dyn Any>;

	/// Produces the plugin state after `tr` is applied.
	///
	/// `old_state` is the state the transaction was applied to;
	/// `new_state` already has the new document and selection but may
	/// still hold earlier plugins' freshly computed state only.
	fn apply(
		&self,
		tr: &Transaction,
		value: Rc<dyn Any>,
		old_state: &EditorState,
		new_state: &EditorState,
	) -> Rc<dyn Any>;

	/// Offers the plugin a chance to append a follow-up transaction after
	/// `transactions` were applied.
	///
	/// The machinery stamps the result with
	/// [`APPENDED_TRANSACTION`](crate::APPENDED_TRANSACTION) metadata
	/// pointing back at the root transaction.
	fn append_transaction(
		&self,
		transactions: &[Rc<Transaction>],
		old_state: &EditorState,
		new_state: &EditorState,
	) -> Option<Transaction> {
		let _ = (transactions, old_state, new_state);
		None
	}

	/// True if this plugin may later rebase recorded edits, which forbids
	/// destructive merging of history items.
	fn preserve_history_items(&self) -> bool {
		false
	}

	/// Access to the concrete plugin type, for code that needs to find a
	/// specific plugin among the installed ones.
	fn as_any(&self) -> &dyn Any;
}

/// A cheaply cloneable handle to an installed plugin.
#[derive(Clone)]
pub struct Plugin {
	spec: Rc<dyn PluginSpec>,
}

impl Plugin {
	/// Wraps a plugin spec into a handle.
	pub fn new(spec: impl PluginSpec + 'static) -> Self {
		Self { spec: Rc::new(spec) }
	}

	/// Returns the plugin's state key.
	pub fn key(&self) -> &'static str {
		self.spec.key()
	}

	/// Returns the plugin's behavior.
	pub fn spec(&self) -> &dyn PluginSpec {
		&*self.spec
	}
}

impl std::fmt::Debug for Plugin {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Plugin").field("key", &self.key()).finish()
	}
}
