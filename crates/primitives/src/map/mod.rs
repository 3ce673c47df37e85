//! Position maps and mirror-aware mappings.
//!
//! A [`StepMap`] records how a single step moves document positions: a
//! list of replaced regions, each with an old and a new size. A
//! [`Mapping`] strings step maps together and additionally tracks
//! *mirror* pairs, where one map is the exact inverse of another. When a
//! position is mapped through a mirrored pair, the mapping recovers its
//! original offset instead of collapsing it to the edge of the replaced
//! region. Undo history relies on this to carry selections and steps
//! across a change and its inverse without drift.

use std::sync::Arc;

use smallvec::{SmallVec, smallvec};

use crate::range::{Bias, CharIdx};

#[cfg(test)]
mod tests;

/// Position was deleted; content before it was removed.
const DEL_BEFORE: u8 = 1;
/// Position was deleted; content after it was removed.
const DEL_AFTER: u8 = 2;
/// Content on both sides of the position was removed.
const DEL_ACROSS: u8 = 4;
/// Content on the side the bias points to was removed.
const DEL_SIDE: u8 = 8;

/// One replaced region in a [`StepMap`].
///
/// The region `[start, start + old_size)` in the old document becomes a
/// region of `new_size` characters in the new document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapRange {
	/// Start of the replaced region, in old-document coordinates.
	pub start: CharIdx,
	/// Size of the region before the change.
	pub old_size: usize,
	/// Size of the region after the change.
	pub new_size: usize,
}

/// An offset into a replaced region, remembered so that mapping through
/// the region's mirror can restore the exact position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recover {
	index: usize,
	offset: usize,
}

/// The result of mapping a position through a map.
#[derive(Debug, Clone, Copy)]
pub struct MapResult {
	/// The mapped position.
	pub pos: CharIdx,
	del_info: u8,
	/// Present when the position fell inside a replaced region and can be
	/// recovered through that region's mirror.
	pub recover: Option<Recover>,
}

impl MapResult {
	fn simple(pos: CharIdx) -> Self {
		Self { pos, del_info: 0, recover: None }
	}

	/// True if content on the side of the position that the mapping bias
	/// points to was deleted.
	pub fn deleted(&self) -> bool {
		self.del_info & DEL_SIDE > 0
	}

	/// True if content directly before the position was deleted.
	pub fn deleted_before(&self) -> bool {
		self.del_info & (DEL_BEFORE | DEL_ACROSS) > 0
	}

	/// True if content directly after the position was deleted.
	pub fn deleted_after(&self) -> bool {
		self.del_info & (DEL_AFTER | DEL_ACROSS) > 0
	}

	/// True if the position was inside deleted content on both sides.
	pub fn deleted_across(&self) -> bool {
		self.del_info & DEL_ACROSS > 0
	}
}

/// Anything document positions can be mapped through.
pub trait Mappable {
	/// Maps a position, reporting deletion and recovery details.
	fn map_result(&self, pos: CharIdx, bias: Bias) -> MapResult;

	/// Maps a position, returning only the new position.
	fn map_pos(&self, pos: CharIdx, bias: Bias) -> CharIdx {
		self.map_result(pos, bias).pos
	}
}

/// The position map produced by a single step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepMap {
	ranges: SmallVec<[MapRange; 1]>,
	inverted: bool,
}

impl StepMap {
	/// Creates a map from a list of replaced regions.
	///
	/// Regions must be sorted by start position and non-overlapping.
	pub fn new(ranges: impl IntoIterator<Item = MapRange>) -> Self {
		Self {
			ranges: ranges.into_iter().collect(),
			inverted: false,
		}
	}

	/// Creates a map with a single replaced region.
	pub fn single(start: CharIdx, old_size: usize, new_size: usize) -> Self {
		Self {
			ranges: smallvec![MapRange { start, old_size, new_size }],
			inverted: false,
		}
	}

	/// Returns a map that reverses this one.
	pub fn invert(&self) -> StepMap {
		Self {
			ranges: self.ranges.clone(),
			inverted: !self.inverted,
		}
	}

	/// Restores the position remembered by `recover` in this map's
	/// output coordinates.
	pub fn recover(&self, recover: Recover) -> CharIdx {
		let mut diff: isize = 0;
		if !self.inverted {
			for range in &self.ranges[..recover.index] {
				diff += range.new_size as isize - range.old_size as isize;
			}
		}
		(self.ranges[recover.index].start as isize + diff) as usize + recover.offset
	}

	/// Calls `f` with `(old_start, old_end, new_start, new_end)` for each
	/// replaced region, in order.
	pub fn for_each(&self, mut f: impl FnMut(CharIdx, CharIdx, CharIdx, CharIdx)) {
		let mut diff: isize = 0;
		for range in &self.ranges {
			let (old_size, new_size) = self.oriented(range);
			let old_start = if self.inverted {
				(range.start as isize - diff) as usize
			} else {
				range.start
			};
			let new_start = if self.inverted {
				range.start
			} else {
				(range.start as isize + diff) as usize
			};
			f(old_start, old_start + old_size, new_start, new_start + new_size);
			diff += new_size as isize - old_size as isize;
		}
	}

	/// Old and new sizes of a range, respecting the inverted flag.
	fn oriented(&self, range: &MapRange) -> (usize, usize) {
		if self.inverted {
			(range.new_size, range.old_size)
		} else {
			(range.old_size, range.new_size)
		}
	}

	fn map_inner(&self, pos: CharIdx, bias: Bias, simple: bool) -> MapResult {
		let toward_end = bias == Bias::Right;
		let mut diff: isize = 0;
		for (index, range) in self.ranges.iter().enumerate() {
			let start = if self.inverted {
				(range.start as isize - diff) as usize
			} else {
				range.start
			};
			if start > pos {
				break;
			}
			let (old_size, new_size) = self.oriented(range);
			let end = start + old_size;
			if pos <= end {
				// Positions at the region edges stay at their edge; interior
				// positions collapse to the side the bias points to.
				let side = if old_size == 0 {
					toward_end
				} else if pos == start {
					false
				} else if pos == end {
					true
				} else {
					toward_end
				};
				let mapped =
					(start as isize + diff + if side { new_size as isize } else { 0 }) as usize;
				if simple {
					return MapResult::simple(mapped);
				}
				let recover_edge = if toward_end { end } else { start };
				let recover = (pos != recover_edge).then_some(Recover {
					index,
					offset: pos - start,
				});
				let mut del = if pos == start {
					DEL_AFTER
				} else if pos == end {
					DEL_BEFORE
				} else {
					DEL_ACROSS
				};
				let biased_edge = if toward_end { end } else { start };
				if pos != biased_edge {
					del |= DEL_SIDE;
				}
				return MapResult { pos: mapped, del_info: del, recover };
			}
			diff += new_size as isize - old_size as isize;
		}
		MapResult::simple((pos as isize + diff) as usize)
	}
}

impl Mappable for StepMap {
	fn map_result(&self, pos: CharIdx, bias: Bias) -> MapResult {
		self.map_inner(pos, bias, false)
	}

	fn map_pos(&self, pos: CharIdx, bias: Bias) -> CharIdx {
		self.map_inner(pos, bias, true).pos
	}
}

/// An ordered collection of step maps, with mirror tracking.
///
/// Maps are shared via [`Arc`] so that a mapping, the transform it came
/// from, and the history items referencing the same maps never copy them.
#[derive(Debug, Clone, Default)]
pub struct Mapping {
	maps: Vec<Arc<StepMap>>,
	mirror: Vec<(usize, usize)>,
}

impl Mapping {
	/// Creates an empty mapping.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a mapping from a list of maps, with no mirrors.
	pub fn from_maps(maps: Vec<Arc<StepMap>>) -> Self {
		Self { maps, mirror: Vec::new() }
	}

	/// Returns the number of maps in this mapping.
	pub fn len(&self) -> usize {
		self.maps.len()
	}

	/// Returns true if this mapping contains no maps.
	pub fn is_empty(&self) -> bool {
		self.maps.is_empty()
	}

	/// Returns the maps in order.
	pub fn maps(&self) -> &[Arc<StepMap>] {
		&self.maps
	}

	/// Returns the most recently appended map.
	pub fn last_map(&self) -> Option<&Arc<StepMap>> {
		self.maps.last()
	}

	/// Appends a map. When `mirror` is given, the new map is recorded as
	/// the inverse of the map at that index.
	pub fn append_map(&mut self, map: Arc<StepMap>, mirror: Option<usize>) {
		self.maps.push(map);
		if let Some(mirror) = mirror {
			self.set_mirror(self.maps.len() - 1, mirror);
		}
	}

	/// Records that the maps at indices `a` and `b` are inverses of each
	/// other.
	///
	/// Public so that collaborative rebasing can wire the relationship
	/// between an inverted step and its re-applied counterpart.
	pub fn set_mirror(&mut self, a: usize, b: usize) {
		self.mirror.push((a, b));
	}

	/// Looks up the mirror partner of the map at index `n`.
	pub fn get_mirror(&self, n: usize) -> Option<usize> {
		self.mirror.iter().find_map(|&(a, b)| {
			if a == n {
				Some(b)
			} else if b == n {
				Some(a)
			} else {
				None
			}
		})
	}

	/// Returns a view of the maps in `[from, to)`.
	///
	/// Mirror pairs are preserved; mirror indices stay relative to the
	/// full mapping.
	pub fn slice(&self, from: usize, to: usize) -> MappingSlice<'_> {
		MappingSlice { maps: &self.maps, mirror: &self.mirror, from, to }
	}

	/// Returns a view of the maps from `from` to the end.
	pub fn slice_from(&self, from: usize) -> MappingSlice<'_> {
		self.slice(from, self.maps.len())
	}
}

impl Mappable for Mapping {
	fn map_result(&self, pos: CharIdx, bias: Bias) -> MapResult {
		map_over(&self.maps, &self.mirror, 0, self.maps.len(), pos, bias)
	}
}

/// A borrowed window into a [`Mapping`].
#[derive(Debug, Clone, Copy)]
pub struct MappingSlice<'a> {
	maps: &'a [Arc<StepMap>],
	mirror: &'a [(usize, usize)],
	from: usize,
	to: usize,
}

impl Mappable for MappingSlice<'_> {
	fn map_result(&self, pos: CharIdx, bias: Bias) -> MapResult {
		map_over(self.maps, self.mirror, self.from, self.to, pos, bias)
	}
}

/// Maps a position through `maps[from..to]`, skipping over mirrored pairs
/// by recovering the remembered offset from the partner map.
fn map_over(
	maps: &[Arc<StepMap>],
	mirror: &[(usize, usize)],
	from: usize,
	to: usize,
	pos: CharIdx,
	bias: Bias,
) -> MapResult {
	let mut del_info = 0u8;
	let mut pos = pos;
	let mut i = from;
	while i < to {
		let result = maps[i].map_result(pos, bias);
		if let Some(recover) = result.recover {
			let corr = mirror.iter().find_map(|&(a, b)| {
				if a == i {
					Some(b)
				} else if b == i {
					Some(a)
				} else {
					None
				}
			});
			if let Some(corr) = corr {
				if corr > i && corr < to {
					pos = maps[corr].recover(recover);
					i = corr + 1;
					continue;
				}
			}
		}
		del_info |= result.del_info;
		pos = result.pos;
		i += 1;
	}
	MapResult { pos, del_info, recover: None }
}
