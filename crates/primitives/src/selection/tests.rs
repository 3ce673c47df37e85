use ropey::Rope;

use super::Selection;
use crate::range::Range;
use crate::step::ReplaceStep;

#[test]
fn bookmark_survives_unrelated_edit() {
	let sel = Selection::single(3, 7);
	let bookmark = sel.bookmark();
	let map = ReplaceStep::insert(0, "ab").get_map();
	let mapped = bookmark.map(&map);
	let resolved = mapped.resolve(&Rope::from("ab0123456789"));
	assert_eq!(resolved.primary().anchor, 5);
	assert_eq!(resolved.primary().head, 9);
}

#[test]
fn resolve_clamps_to_document_length() {
	let bookmark = Selection::single(4, 20).bookmark();
	let resolved = bookmark.resolve(&Rope::from("short"));
	assert_eq!(resolved.primary().anchor, 4);
	assert_eq!(resolved.primary().head, 5);
}

#[test]
fn map_keeps_all_ranges_and_primary() {
	let sel = Selection::from_ranges(vec![Range::new(1, 2), Range::new(8, 8)], 1);
	let map = ReplaceStep::delete(0, 1).get_map();
	let mapped = sel.map(&map);
	assert_eq!(mapped.ranges().len(), 2);
	assert_eq!(mapped.primary().anchor, 7);
	assert_eq!(mapped.ranges()[0].anchor, 0);
}
