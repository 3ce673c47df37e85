//! History branches: ordered item sequences forming undo or redo history.

use std::sync::Arc;

use im::Vector;
use tracing::trace;
use vellum_primitives::{Mapping, SelectionBookmark, StepMap, Transform};
use vellum_state::{EditorState, Transaction};

use crate::HistoryConfig;
use crate::item::Item;


/// How far past the configured depth a branch may grow before the
/// oldest events are trimmed. Trimming in batches amortizes the cost of
/// slicing the item sequence.
pub(crate) const DEPTH_OVERFLOW: usize = 20;

/// When a rebase leaves more than this many map-only items on a branch,
/// the branch is compressed.
pub(crate) const MAX_EMPTY_ITEMS: usize = 500;

/// An ordered sequence of [`Item`]s, oldest first, forming one side of
/// the history (undoable or redoable events).
///
/// Branches are immutable values: every operation returns a new branch
/// sharing structure with the old one through the persistent item
/// vector.
#[derive(Debug, Clone, Default)]
pub struct Branch {
	pub(crate) items: Vector<Item>,
	pub(crate) event_count: usize,
}

/// The result of popping the most recent event off a branch.
#[derive(Debug)]
pub struct PoppedEvent {
	/// The branch with the popped event removed.
	pub remaining: Branch,
	/// A transaction that, applied to the current document, reverts the
	/// event.
	pub transform: Transaction,
	/// The selection to restore, already mapped into the transform's
	/// output coordinates.
	pub selection: SelectionBookmark,
}

impl Branch {
	/// Returns an empty branch.
	pub fn empty() -> Branch {
		Branch::default()
	}

	/// Returns the number of undoable (or redoable) events.
	pub fn event_count(&self) -> usize {
		self.event_count
	}

	/// Returns the number of items, including map-only placeholders.
	pub fn len(&self) -> usize {
		self.items.len()
	}

	/// Returns true if the branch holds no items at all.
	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	/// Returns the number of map-only items.
	pub fn empty_item_count(&self) -> usize {
		self.items.iter().filter(|item| item.step.is_none()).count()
	}

	/// Records the inverse of every step in `transform` onto this
	/// branch.
	///
	/// `selection` opens a new event when present; it is attached to the
	/// first recorded item. Unless `preserve_items` is set (required
	/// while a collaboration layer may still rebase the recorded items),
	/// each new item is fused into the previous one when the step
	/// algebra allows it, so continued typing stays a single item. When
	/// the branch outgrows `config.depth` by more than
	/// [`DEPTH_OVERFLOW`], the oldest events are dropped.
	pub fn add_transform(
		&self,
		transform: &Transform,
		selection: Option<SelectionBookmark>,
		config: &HistoryConfig,
		preserve_items: bool,
	) -> Branch {
		let mut selection = selection;
		let mut new_items: Vec<Item> = Vec::new();
		let mut event_count = self.event_count;
		let mut old_items = self.items.clone();
		let mut last_item = if preserve_items {
			None
		} else {
			old_items.back().cloned()
		};

		for (i, step) in transform.steps().iter().enumerate() {
			let inverted = step.invert(&transform.docs()[i]);
			let mut item = Item::new(
				transform.mapping().maps()[i].clone(),
				Some(inverted),
				selection.clone(),
			);
			if let Some(merged) = last_item.as_ref().and_then(|last| last.merge(&item)) {
				item = merged;
				if i > 0 {
					new_items.pop();
				} else {
					old_items = old_items.take(old_items.len() - 1);
				}
			}
			new_items.push(item.clone());
			if selection.take().is_some() {
				event_count += 1;
			}
			if !preserve_items {
				last_item = Some(item);
			}
		}

		if event_count > config.depth + DEPTH_OVERFLOW {
			let overflow = event_count - config.depth;
			old_items = cut_off_events(&old_items, overflow);
			event_count -= overflow;
			trace!(dropped = overflow, remaining = event_count, "trimmed oldest history events");
		}

		let mut items = old_items;
		for item in new_items {
			items.push_back(item);
		}
		Branch { items, event_count }
	}

	/// Pops the most recent event, producing a transaction that reverts
	/// it against the current document in `state`.
	///
	/// Items newer than the event (map-only placeholders, or every item
	/// when `preserve_items` is set) stay on the remaining
	/// branch; the event's inverted steps are rebased through their maps
	/// before being applied. Each successfully applied step contributes
	/// a mirrored map-only item to the remaining branch so that later
	/// remapping can cancel the pair exactly.
	///
	/// Returns `None` when the branch holds no events.
	pub fn pop_event(&self, state: &EditorState, preserve_items: bool) -> Option<PoppedEvent> {
		if self.event_count == 0 {
			return None;
		}
		let end = (0..self.items.len()).rev().find(|&i| self.items[i].selection.is_some())?;

		let mut remap: Option<Mapping> = None;
		let mut map_from = 0usize;
		if preserve_items {
			let mapping = self.remapping(end, self.items.len());
			map_from = mapping.len();
			remap = Some(mapping);
		}

		let mut transform = state.tr();
		let mut selection: Option<SelectionBookmark> = None;
		let mut remaining: Option<Branch> = None;
		let mut add_after: Vec<Item> = Vec::new();
		let mut add_before: Vec<Item> = Vec::new();

		for i in (0..self.items.len()).rev() {
			let item = &self.items[i];
			let Some(step) = &item.step else {
				// A map-only item forces remapping of everything older.
				if remap.is_none() {
					let mapping = self.remapping(end, i + 1);
					map_from = mapping.len();
					remap = Some(mapping);
				}
				map_from -= 1;
				add_before.push(item.clone());
				continue;
			};

			if let Some(remap) = remap.as_mut() {
				add_before.push(Item::map_only(item.map.clone()));
				let mut produced: Option<Arc<StepMap>> = None;
				if let Some(mapped) = step.map(&remap.slice_from(map_from)) {
					if transform.maybe_step(mapped).is_ok() {
						if let Some(map) = transform.mapping().last_map() {
							let map = map.clone();
							add_after.push(Item::mirror(
								map.clone(),
								add_after.len() + add_before.len(),
							));
							produced = Some(map);
						}
					}
				}
				map_from -= 1;
				if let Some(map) = produced {
					remap.append_map(map, Some(map_from));
				}
			} else {
				let _ = transform.maybe_step(step.clone());
			}

			if let Some(event_selection) = &item.selection {
				selection = Some(match &remap {
					Some(remap) => event_selection.map(&remap.slice_from(map_from)),
					None => event_selection.clone(),
				});
				let mut items = self.items.take(end);
				add_before.reverse();
				for entry in add_before.drain(..) {
					items.push_back(entry);
				}
				for entry in add_after.drain(..) {
					items.push_back(entry);
				}
				remaining = Some(Branch {
					items,
					event_count: self.event_count - 1,
				});
				break;
			}
		}

		Some(PoppedEvent {
			remaining: remaining?,
			transform,
			selection: selection?,
		})
	}

	/// Builds a mapping from the forward maps of `items[from..to]`,
	/// wiring mirror relationships whenever both partners fall inside
	/// the window.
	pub fn remapping(&self, from: usize, to: usize) -> Mapping {
		let mut mapping = Mapping::new();
		for i in from..to {
			let item = &self.items[i];
			let mirror = item
				.mirror_offset
				.and_then(|offset| (i >= from + offset).then(|| mapping.len() - offset));
			mapping.append_map(item.map.clone(), mirror);
		}
		mapping
	}

	/// Appends each map as a map-only item.
	///
	/// Used for transactions that are not recorded but still move
	/// positions. Does nothing while the branch holds no events, since
	/// there is nothing to keep aligned.
	pub fn add_maps(&self, maps: &[Arc<StepMap>]) -> Branch {
		if self.event_count == 0 {
			return self.clone();
		}
		let mut items = self.items.clone();
		for map in maps {
			items.push_back(Item::map_only(map.clone()));
		}
		Branch { items, event_count: self.event_count }
	}

	/// Rewrites the last `rebased_count` items after the collaboration
	/// layer rebased them over remote changes.
	///
	/// `transform` is the rebase transaction: the inverses of the local
	/// steps (newest first), then the remote steps, then the re-applied
	/// local steps, with its mapping mirroring each inverse to its
	/// re-application. Items whose mirror is missing were absorbed by a
	/// remote change and are dropped. Map-only items are collected for
	/// the remote changes so later edits keep mapping correctly.
	pub fn rebased(&self, transform: &Transform, rebased_count: usize) -> Branch {
		if self.event_count == 0 {
			return self.clone();
		}

		let start = self.items.len().saturating_sub(rebased_count);
		let mapping = transform.mapping();
		let mut new_until = transform.steps().len();
		let mut event_count = self.event_count;
		for i in start..self.items.len() {
			if self.items[i].selection.is_some() {
				event_count -= 1;
			}
		}

		let mut rebased_items: Vec<Item> = Vec::new();
		let mut i_rebased = rebased_count;
		for idx in start..self.items.len() {
			let item = &self.items[idx];
			i_rebased -= 1;
			let Some(pos) = mapping.get_mirror(i_rebased) else {
				continue;
			};
			new_until = new_until.min(pos);
			let map = mapping.maps()[pos].clone();
			if item.step.is_some() {
				let step = transform.steps()[pos].invert(&transform.docs()[pos]);
				let selection = item
					.selection
					.as_ref()
					.map(|s| s.map(&mapping.slice(i_rebased + 1, pos)));
				if selection.is_some() {
					event_count += 1;
				}
				rebased_items.push(Item::new(map, Some(step), selection));
			} else {
				rebased_items.push(Item::map_only(map));
			}
		}

		let mut items = self.items.take(start);
		for i in rebased_count..new_until {
			items.push_back(Item::map_only(mapping.maps()[i].clone()));
		}
		let rebased_len = rebased_items.len();
		for item in rebased_items {
			items.push_back(item);
		}

		let branch = Branch { items, event_count };
		if branch.empty_item_count() > MAX_EMPTY_ITEMS {
			// Everything below the rebased items is fair game for
			// folding; the rebased tail itself must stay pointwise
			// identifiable.
			let upto = branch.items.len() - rebased_len;
			branch.compress(Some(upto))
		} else {
			branch
		}
	}

	/// Folds map-only items below `upto` into the surrounding step
	/// items, preserving the composition of forward maps.
	///
	/// Items at or above `upto` pass through untouched; the rebase
	/// protocol depends on being able to identify them pointwise.
	/// `upto` defaults to the whole branch.
	pub fn compress(&self, upto: Option<usize>) -> Branch {
		let upto = upto.unwrap_or(self.items.len());
		let mut remap = self.remapping(0, upto);
		let mut map_from = remap.len();
		let mut items: Vec<Item> = Vec::new();
		let mut event_count = 0usize;

		for i in (0..self.items.len()).rev() {
			let item = &self.items[i];
			if i >= upto {
				items.push(item.clone());
				if item.selection.is_some() {
					event_count += 1;
				}
			} else if let Some(step) = &item.step {
				let mapped = step.map(&remap.slice_from(map_from));
				let forward = mapped.as_ref().map(|s| Arc::new(s.get_map()));
				map_from -= 1;
				if let Some(map) = &forward {
					remap.append_map(map.clone(), Some(map_from));
				}
				if let (Some(step), Some(map)) = (mapped, forward) {
					let selection = item
						.selection
						.as_ref()
						.map(|s| s.map(&remap.slice_from(map_from)));
					if selection.is_some() {
						event_count += 1;
					}
					let new_item = Item::new(Arc::new(map.invert()), Some(step), selection);
					// The buffer is built newest-first, so the previously
					// emitted item is the one that follows `new_item`
					// chronologically.
					if let Some(last) = items.last_mut() {
						if let Some(merged) = new_item.merge(last) {
							*last = merged;
							continue;
						}
					}
					items.push(new_item);
				}
			} else {
				map_from -= 1;
			}
		}

		trace!(
			before = self.items.len(),
			after = items.len(),
			"compressed history branch"
		);
		items.reverse();
		Branch {
			items: items.into_iter().collect(),
			event_count,
		}
	}
}

/// Drops the first `n` events, cutting at the item that opens the
/// `(n + 1)`-th event.
fn cut_off_events(items: &Vector<Item>, mut n: usize) -> Vector<Item> {
	let mut cut = None;
	for (i, item) in items.iter().enumerate() {
		if item.selection.is_some() {
			if n == 0 {
				cut = Some(i);
				break;
			}
			n -= 1;
		}
	}
	match cut {
		Some(i) => items.skip(i),
		None => items.clone(),
	}
}
