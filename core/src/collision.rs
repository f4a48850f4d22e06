//! Axis-aligned overlap tests shared by navigation and combat.
//!
//! There is no spatial partitioning here. Callers narrow candidates through
//! grid cell lookups before reaching for the linear scans below.

use crate::Bounds;

/// Reports whether two rectangles overlap.
///
/// Edges are half-open: rectangles that merely touch do not overlap.
#[must_use]
pub fn overlaps(a: &Bounds, b: &Bounds) -> bool {
    let a_max = a.max();
    let b_max = b.max();
    a.origin().x < b_max.x
        && a_max.x > b.origin().x
        && a.origin().y < b_max.y
        && a_max.y > b.origin().y
}

/// Reports whether `inner` lies entirely within `outer`; shared edges count as inside.
#[must_use]
pub fn contains(outer: &Bounds, inner: &Bounds) -> bool {
    let outer_max = outer.max();
    let inner_max = inner.max();
    inner.origin().x >= outer.origin().x
        && inner.origin().y >= outer.origin().y
        && inner_max.x <= outer_max.x
        && inner_max.y <= outer_max.y
}

/// Reports whether any rectangle in `boxes` overlaps any rectangle in `others`.
#[must_use]
pub fn overlaps_any(boxes: &[Bounds], others: &[Bounds]) -> bool {
    boxes
        .iter()
        .any(|candidate| others.iter().any(|other| overlaps(candidate, other)))
}

/// Returns the first rectangle in `others` that overlaps `probe`.
#[must_use]
pub fn first_overlap<'a>(probe: &Bounds, others: &'a [Bounds]) -> Option<&'a Bounds> {
    others.iter().find(|other| overlaps(probe, other))
}

/// Enumerates the indices of every rectangle in `others` that overlaps `probe`.
pub fn overlapping_indices<'a>(
    probe: &'a Bounds,
    others: &'a [Bounds],
) -> impl Iterator<Item = usize> + 'a {
    others
        .iter()
        .enumerate()
        .filter(move |&(_, other)| overlaps(probe, other))
        .map(|(index, _)| index)
}
