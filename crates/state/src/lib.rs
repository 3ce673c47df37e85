//! Editor state, transactions, and the plugin seam.
//!
//! A [`Transaction`] wraps a document transform with the host-facing
//! extras: a timestamp for grouping heuristics, an optional explicit
//! selection, and a typed metadata table that plugins use to tag and
//! recognize transactions. [`EditorState`] owns the document, the
//! selection, the installed [`Plugin`]s, and each plugin's state;
//! applying a transaction produces a new state and gives every plugin a
//! chance to update its state and to append follow-up transactions.

/// Plugin trait and handle.
pub mod plugin;
/// Editor state and the transaction-application machinery.
pub mod state;
/// Transactions: transforms plus host metadata.
pub mod transaction;

pub use plugin::{Plugin, PluginSpec};
pub use state::EditorState;
pub use transaction::{APPENDED_TRANSACTION, Transaction};
