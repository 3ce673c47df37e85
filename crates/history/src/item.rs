//! History items: one inverted step plus its forward position map.

use std::sync::Arc;

use vellum_primitives::{ReplaceStep, SelectionBookmark, StepMap};

/// One entry in a history branch.
///
/// Every item carries the forward position map of the change it stands
/// for. Items that record an undoable edit also carry the *inverted*
/// step (applying it to the post-edit document restores the pre-edit
/// document); items without a step are placeholders for changes the
/// history only needs to map positions through, such as a remote
/// collaborator's edits.
///
/// An item whose step opens a new undo event additionally carries the
/// selection that was active before the event, as a bookmark.
#[derive(Debug, Clone)]
pub struct Item {
	pub(crate) map: Arc<StepMap>,
	pub(crate) step: Option<ReplaceStep>,
	pub(crate) selection: Option<SelectionBookmark>,
	/// When set, this item's map is the inverse of the map
	/// `mirror_offset` positions earlier in the same branch.
	pub(crate) mirror_offset: Option<usize>,
}

impl Item {
	/// Creates an item recording an edit.
	pub fn new(
		map: Arc<StepMap>,
		step: Option<ReplaceStep>,
		selection: Option<SelectionBookmark>,
	) -> Self {
		Self { map, step, selection, mirror_offset: None }
	}

	/// Creates a map-only item.
	pub fn map_only(map: Arc<StepMap>) -> Self {
		Self { map, step: None, selection: None, mirror_offset: None }
	}

	/// Creates a map-only item mirroring an earlier item's map.
	pub(crate) fn mirror(map: Arc<StepMap>, mirror_offset: usize) -> Self {
		Self {
			map,
			step: None,
			selection: None,
			mirror_offset: Some(mirror_offset),
		}
	}

	/// Returns the forward position map.
	pub fn map(&self) -> &Arc<StepMap> {
		&self.map
	}

	/// Returns the inverted step, when this item records an edit.
	pub fn step(&self) -> Option<&ReplaceStep> {
		self.step.as_ref()
	}

	/// Returns the event-start selection, when this item opens an event.
	pub fn selection(&self) -> Option<&SelectionBookmark> {
		self.selection.as_ref()
	}

	/// Returns the mirror offset, when this item's map inverts an
	/// earlier one.
	pub fn mirror_offset(&self) -> Option<usize> {
		self.mirror_offset
	}

	/// Tries to fuse this item with the one that follows it.
	///
	/// Both items must record an edit and `other` must not open an
	/// event. On success the fused item keeps this item's event
	/// boundary, its step is the fusion of the two inverted steps in
	/// undo order, and its map is the fused step's inverse map.
	pub fn merge(&self, other: &Item) -> Option<Item> {
		let (Some(own), Some(next)) = (&self.step, &other.step) else {
			return None;
		};
		if other.selection.is_some() {
			return None;
		}
		let step = next.merge(own)?;
		let map = step.get_map();
		Some(Item::new(Arc::new(map.invert()), Some(step), self.selection.clone()))
	}
}
