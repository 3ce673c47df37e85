use std::sync::Arc;

use super::{MapRange, Mappable, Mapping, StepMap};
use crate::range::Bias;

fn insert(at: usize, len: usize) -> StepMap {
	StepMap::single(at, 0, len)
}

fn delete(at: usize, len: usize) -> StepMap {
	StepMap::single(at, len, 0)
}

#[test]
fn positions_before_a_change_are_unmoved() {
	let map = insert(5, 3);
	assert_eq!(map.map_pos(0, Bias::Right), 0);
	assert_eq!(map.map_pos(4, Bias::Right), 4);
}

#[test]
fn positions_after_a_change_shift_by_size_delta() {
	let map = insert(5, 3);
	assert_eq!(map.map_pos(6, Bias::Right), 9);
	let map = delete(2, 4);
	assert_eq!(map.map_pos(8, Bias::Right), 4);
}

#[test]
fn deleted_positions_collapse_to_region_start() {
	let map = delete(2, 4);
	assert_eq!(map.map_pos(4, Bias::Right), 2);
	assert_eq!(map.map_pos(4, Bias::Left), 2);
	assert!(map.map_result(4, Bias::Right).deleted_across());
	assert!(!map.map_result(2, Bias::Right).deleted_across());
}

#[test]
fn replacement_reports_deletion_sides() {
	let map = StepMap::single(3, 2, 5);
	let start = map.map_result(3, Bias::Right);
	assert!(start.deleted_after());
	assert!(!start.deleted_before());
	let end = map.map_result(5, Bias::Left);
	assert!(end.deleted_before());
	assert!(!end.deleted_after());
}

#[test]
fn inverted_map_reverses_mapping() {
	let map = StepMap::single(3, 2, 5);
	let inv = map.invert();
	assert_eq!(inv.map_pos(10, Bias::Right), 7);
	assert_eq!(inv.map_pos(2, Bias::Right), 2);
	// Round trip through the pair lands back where it started.
	assert_eq!(inv.map_pos(map.map_pos(9, Bias::Right), Bias::Right), 9);
}

#[test]
fn for_each_reports_old_and_new_coordinates() {
	let map = StepMap::new([
		MapRange { start: 2, old_size: 1, new_size: 3 },
		MapRange { start: 6, old_size: 2, new_size: 0 },
	]);
	let mut seen = Vec::new();
	map.for_each(|os, oe, ns, ne| seen.push((os, oe, ns, ne)));
	assert_eq!(seen, vec![(2, 3, 2, 5), (6, 8, 8, 8)]);
}

#[test]
fn for_each_on_inverted_map_swaps_sides() {
	let map = StepMap::single(2, 1, 3);
	let mut seen = Vec::new();
	map.invert().for_each(|os, oe, ns, ne| seen.push((os, oe, ns, ne)));
	assert_eq!(seen, vec![(2, 5, 2, 3)]);
}

#[test]
fn mapping_composes_maps_in_order() {
	let mut mapping = Mapping::new();
	mapping.append_map(Arc::new(insert(0, 2)), None);
	mapping.append_map(Arc::new(delete(5, 1)), None);
	assert_eq!(mapping.map_pos(4, Bias::Right), 5);
	assert_eq!(mapping.map_pos(6, Bias::Right), 7);
}

#[test]
fn mirror_pair_recovers_interior_positions() {
	// A deletion followed by its mirrored re-insertion: positions inside
	// the deleted region survive the round trip instead of collapsing.
	let del = Arc::new(delete(2, 4));
	let ins = Arc::new(del.invert());
	let mut mapping = Mapping::new();
	mapping.append_map(del, None);
	mapping.append_map(ins, Some(0));
	assert_eq!(mapping.get_mirror(0), Some(1));
	assert_eq!(mapping.get_mirror(1), Some(0));
	for pos in 2..=6 {
		assert_eq!(mapping.map_pos(pos, Bias::Right), pos);
	}
}

#[test]
fn mirror_outside_slice_window_is_ignored() {
	let del = Arc::new(delete(2, 4));
	let ins = Arc::new(del.invert());
	let mut mapping = Mapping::new();
	mapping.append_map(del, None);
	mapping.append_map(ins, Some(0));
	// Slicing off the mirror partner collapses interior positions again.
	let head = mapping.slice(0, 1);
	assert_eq!(head.map_pos(4, Bias::Right), 2);
}

#[test]
fn maps_between_mirror_pair_are_skipped() {
	// delete, unrelated insert inside the gap, mirrored re-insert. The
	// recovery jump must land past the middle map without applying it.
	let del = Arc::new(delete(2, 4));
	let mid = Arc::new(insert(0, 10));
	let ins = Arc::new(del.invert());
	let mut mapping = Mapping::new();
	mapping.append_map(del, None);
	mapping.append_map(mid, None);
	mapping.append_map(ins, Some(0));
	assert_eq!(mapping.map_pos(4, Bias::Right), 4);
}

#[test]
fn slice_window_limits_mapping() {
	let mut mapping = Mapping::new();
	mapping.append_map(Arc::new(insert(0, 1)), None);
	mapping.append_map(Arc::new(insert(0, 1)), None);
	mapping.append_map(Arc::new(insert(0, 1)), None);
	assert_eq!(mapping.map_pos(0, Bias::Left), 0);
	assert_eq!(mapping.map_pos(5, Bias::Right), 8);
	assert_eq!(mapping.slice(1, 3).map_pos(5, Bias::Right), 7);
	assert_eq!(mapping.slice_from(2).map_pos(5, Bias::Right), 6);
}
