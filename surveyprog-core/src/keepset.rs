//! Keep-Set Resolver
//!
//! Given classified rows plus the explicitly requested survivors,
//! computes the final set of row indices the filtered table keeps.
//! Group labels earn their place: a sub-header survives only when some
//! real row in its group survives, and a major section header is
//! dropped when its whole section filtered away.

use crate::types::{KeepSet, Row, RowKind};

/// End of the span a header row governs: the `raw_index` of the next
/// row whose kind is in `terminators`, or the end of the table.
fn span_end(rows: &[Row], after: usize, terminators: &[RowKind]) -> usize {
    rows.iter()
        .filter(|r| r.raw_index > after && terminators.contains(&r.kind))
        .map(|r| r.raw_index)
        .min()
        .unwrap_or(usize::MAX)
}

/// Resolve the surviving row indices.
///
/// 1. Seed with `always_keep ∪ explicit_keep`. Seeded rows are never
///    evicted — the seed is a contract, not a hint.
/// 2. A SubHeader joins when a kept non-header row falls strictly
///    inside its span (up to the next SubHeader or MajorHeader).
/// 3. A MajorHeader joins while its span (up to the next MajorHeader)
///    contains any kept row; an unseeded label over an empty section
///    is dropped.
///
/// Re-running on the output with the same explicit set yields the same
/// set — resolution is idempotent.
pub fn resolve(rows: &[Row], explicit_keep: &KeepSet, always_keep: &KeepSet) -> KeepSet {
    let seeded: KeepSet = always_keep.union(explicit_keep).copied().collect();
    let mut keep = seeded.clone();

    let is_header_row = |idx: usize| {
        rows.iter()
            .find(|r| r.raw_index == idx)
            .map(|r| r.kind.is_header())
            .unwrap_or(false)
    };

    for header in rows.iter().filter(|r| r.kind == RowKind::SubHeader) {
        let end = span_end(
            rows,
            header.raw_index,
            &[RowKind::SubHeader, RowKind::MajorHeader],
        );
        let has_kept_content = keep
            .iter()
            .any(|&idx| idx > header.raw_index && idx < end && !is_header_row(idx));
        if has_kept_content {
            keep.insert(header.raw_index);
        }
    }

    for header in rows.iter().filter(|r| r.kind == RowKind::MajorHeader) {
        let end = span_end(rows, header.raw_index, &[RowKind::MajorHeader]);
        let section_alive = keep.iter().any(|&idx| idx > header.raw_index && idx < end);
        if section_alive {
            keep.insert(header.raw_index);
        } else if !seeded.contains(&header.raw_index) {
            keep.remove(&header.raw_index);
        }
    }

    keep
}

/// Rows surviving resolution, in original order.
pub fn surviving<'a>(rows: &'a [Row], keep: &KeepSet) -> Vec<&'a Row> {
    rows.iter().filter(|r| keep.contains(&r.raw_index)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Row, RowKind, Span};
    use std::collections::BTreeSet;

    fn row(raw_index: usize, kind: RowKind, title: &str) -> Row {
        Row {
            title: title.to_string(),
            unit: if kind == RowKind::SubHeader || kind == RowKind::MajorHeader {
                String::new()
            } else {
                "pcs".to_string()
            },
            quantity_para_id: None,
            raw_index,
            kind,
            span: Span::new(raw_index * 10, raw_index * 10 + 10),
        }
    }

    fn keep(indices: &[usize]) -> KeepSet {
        indices.iter().copied().collect()
    }

    #[test]
    fn test_major_header_follows_kept_work_item() {
        let rows = vec![
            row(0, RowKind::MajorHeader, "Field work"),
            row(1, RowKind::WorkItem, "A"),
            row(2, RowKind::WorkItem, "B"),
        ];
        let result = resolve(&rows, &keep(&[2]), &keep(&[]));
        assert_eq!(result, keep(&[0, 2]));
    }

    #[test]
    fn test_empty_major_section_is_dropped() {
        let rows = vec![
            row(0, RowKind::MajorHeader, "Field work"),
            row(1, RowKind::WorkItem, "A"),
            row(2, RowKind::MajorHeader, "Laboratory work"),
            row(3, RowKind::WorkItem, "B"),
        ];
        // Only the field-work item survives; the lab header must go.
        let result = resolve(&rows, &keep(&[1]), &keep(&[]));
        assert_eq!(result, keep(&[0, 1]));
    }

    #[test]
    fn test_subheader_needs_non_header_content() {
        let rows = vec![
            row(0, RowKind::MajorHeader, "Field work"),
            row(1, RowKind::SubHeader, "Soil group"),
            row(2, RowKind::WorkItem, "Soil sampling"),
            row(3, RowKind::SubHeader, "Water group"),
            row(4, RowKind::WorkItem, "Water sampling"),
        ];
        let result = resolve(&rows, &keep(&[2]), &keep(&[]));
        // Soil group header pulled in by its kept item; water group gone.
        assert_eq!(result, keep(&[0, 1, 2]));
    }

    #[test]
    fn test_subheader_span_ends_at_next_subheader() {
        let rows = vec![
            row(0, RowKind::SubHeader, "Group one"),
            row(1, RowKind::SubHeader, "Group two"),
            row(2, RowKind::WorkItem, "Item in group two"),
        ];
        let result = resolve(&rows, &keep(&[2]), &keep(&[]));
        // The kept item is outside group one's span.
        assert_eq!(result, keep(&[1, 2]));
    }

    #[test]
    fn test_always_keep_survives_and_feeds_headers() {
        let rows = vec![
            row(0, RowKind::MajorHeader, "Office work"),
            row(1, RowKind::AlwaysKeep, "Technical report preparation"),
        ];
        let result = resolve(&rows, &keep(&[]), &keep(&[1]));
        assert_eq!(result, keep(&[0, 1]));
    }

    #[test]
    fn test_explicit_and_always_sets_are_retained() {
        let rows = vec![
            row(0, RowKind::WorkItem, "A"),
            row(1, RowKind::WorkItem, "B"),
            row(2, RowKind::WorkItem, "C"),
        ];
        let result = resolve(&rows, &keep(&[0]), &keep(&[2]));
        assert!(result.contains(&0));
        assert!(result.contains(&2));
        assert!(!result.contains(&1));
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let rows = vec![
            row(0, RowKind::MajorHeader, "Field work"),
            row(1, RowKind::SubHeader, "Group"),
            row(2, RowKind::WorkItem, "A"),
            row(3, RowKind::WorkItem, "B"),
            row(4, RowKind::MajorHeader, "Laboratory work"),
            row(5, RowKind::WorkItem, "C"),
        ];
        let explicit = keep(&[2]);
        let first = resolve(&rows, &explicit, &keep(&[]));
        let surviving_rows: Vec<Row> = rows
            .iter()
            .filter(|r| first.contains(&r.raw_index))
            .cloned()
            .collect();
        let second = resolve(&surviving_rows, &explicit, &keep(&[]));
        assert_eq!(first, second);
    }

    #[test]
    fn test_gapped_raw_indices() {
        // Skipped rows leave index gaps; spans rely on ordering only.
        let rows = vec![
            row(0, RowKind::MajorHeader, "Field work"),
            row(3, RowKind::WorkItem, "A"),
            row(7, RowKind::WorkItem, "B"),
        ];
        let result = resolve(&rows, &keep(&[7]), &keep(&[]));
        assert_eq!(result, keep(&[0, 7]));
    }

    #[test]
    fn test_structural_header_alone_does_not_hold_subheader() {
        let rows = vec![
            row(0, RowKind::SubHeader, "Caption"),
            row(1, RowKind::StructuralHeader, "1"),
            row(2, RowKind::WorkItem, "A"),
        ];
        // Structural header is in the always set, but it is a header:
        // it cannot justify keeping the caption sub-header by itself.
        let result = resolve(&rows, &keep(&[]), &keep(&[1]));
        assert_eq!(result, keep(&[1]));
    }
}
