//! Table Decomposer
//!
//! Splits a located table span into a style/grid preamble, an ordered
//! list of classified row records, and a suffix. Rows and cells are
//! scanned at nesting depth 1 only — a table nested inside a cell
//! contributes no rows to its host.

use crate::config::WorksheetConfig;
use crate::error::AssemblyIssue;
use crate::locator::{
    CELL_CLOSE, CELL_OPEN, PARA_ID_REGEX, ROW_CLOSE, ROW_OPEN, TABLE_CLOSE, TABLE_OPEN,
};
use crate::types::{Row, RowKind, Span, TableParts};
use quick_xml::escape::unescape;
use regex::Regex;
use std::sync::LazyLock;

static TEXT_RUN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<w:t[^>]*>([^<]*)</w:t>").unwrap());

/// The four tokens that matter while walking table internals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableToken {
    TableOpen,
    TableClose,
    ElemOpen,
    ElemClose,
}

/// Nearest of `<w:tbl`, `</w:tbl>`, `<elem_open>`, `<elem_close>` at or
/// after `from`, within `until`.
fn next_table_token(
    doc: &str,
    from: usize,
    until: usize,
    elem_open: &str,
    elem_close: &str,
) -> Option<(usize, TableToken, usize)> {
    let window = &doc[from..until];
    let mut best: Option<(usize, TableToken, usize)> = None;
    for (needle, token, check_boundary) in [
        (TABLE_OPEN, TableToken::TableOpen, true),
        (TABLE_CLOSE, TableToken::TableClose, false),
        (elem_open, TableToken::ElemOpen, true),
        (elem_close, TableToken::ElemClose, false),
    ] {
        let mut cursor = 0usize;
        while let Some(rel) = window[cursor..].find(needle) {
            let at = from + cursor + rel;
            let boundary_ok = !check_boundary
                || matches!(doc.as_bytes().get(at + needle.len()), Some(b' ') | Some(b'>') | Some(b'/'));
            if boundary_ok {
                if best.map_or(true, |(b, _, _)| at < b) {
                    best = Some((at, token, needle.len()));
                }
                break;
            }
            cursor = cursor + rel + needle.len();
        }
    }
    best
}

/// Spans of direct child elements (`elem`) of the region, skipping
/// anything inside nested tables.
fn direct_child_spans(doc: &str, region: Span, elem_open: &str, elem_close: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut tbl_depth = 0i32;
    let mut elem_start: Option<usize> = None;
    let mut cursor = region.start;

    while let Some((at, token, len)) = next_table_token(doc, cursor, region.end, elem_open, elem_close) {
        match token {
            TableToken::TableOpen => tbl_depth += 1,
            TableToken::TableClose => tbl_depth -= 1,
            TableToken::ElemOpen => {
                if tbl_depth == 0 && elem_start.is_none() {
                    elem_start = Some(at);
                }
            }
            TableToken::ElemClose => {
                if tbl_depth == 0 {
                    if let Some(start) = elem_start.take() {
                        spans.push(Span::new(start, at + len));
                    }
                }
            }
        }
        cursor = at + len;
    }
    spans
}

/// Remove nested `<w:tbl>…</w:tbl>` chunks from a cell slice so inner
/// tables don't leak text into the host cell's title.
fn strip_nested_tables(cell: &str) -> String {
    let mut out = String::with_capacity(cell.len());
    let mut depth = 0i32;
    let mut cursor = 0usize;
    while let Some((at, token, len)) = next_table_token(cell, cursor, cell.len(), "<w:tr", ROW_CLOSE)
    {
        match token {
            TableToken::TableOpen => {
                if depth == 0 {
                    out.push_str(&cell[cursor..at]);
                }
                depth += 1;
            }
            TableToken::TableClose => {
                depth -= 1;
            }
            // Row markers only occur inside the nested table being
            // dropped; outside one they are copied through untouched.
            TableToken::ElemOpen | TableToken::ElemClose => {
                if depth == 0 {
                    out.push_str(&cell[cursor..at + len]);
                }
            }
        }
        cursor = at + len;
    }
    if depth == 0 {
        out.push_str(&cell[cursor..]);
    }
    out
}

/// Visible text of one cell: concatenated `<w:t>` contents, unescaped.
fn cell_text(cell: &str) -> String {
    let flattened = if cell.contains(TABLE_OPEN) {
        strip_nested_tables(cell)
    } else {
        cell.to_string()
    };
    let mut text = String::new();
    for caps in TEXT_RUN_REGEX.captures_iter(&flattened) {
        let raw = caps.get(1).unwrap().as_str();
        match unescape(raw) {
            Ok(cow) => text.push_str(&cow),
            Err(_) => text.push_str(raw),
        }
    }
    text.trim().to_string()
}

fn label_matches(title: &str, labels: &[String]) -> bool {
    let lower = title.to_lowercase();
    labels.iter().any(|label| lower.contains(label.as_str()))
}

/// Classify one row from its cell texts. Rule order matters: the
/// structural "1/2/3/4" row looks like a work row to every other test.
fn classify_row(cell_texts: &[String], unit: &str, title: &str, config: &WorksheetConfig) -> RowKind {
    let non_blank: Vec<&str> = cell_texts
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();
    if non_blank == ["1", "2", "3", "4"] {
        return RowKind::StructuralHeader;
    }
    if label_matches(title, &config.major_section_labels) {
        return RowKind::MajorHeader;
    }
    if unit.is_empty() {
        return RowKind::SubHeader;
    }
    if label_matches(title, &config.always_keep_labels) {
        return RowKind::AlwaysKeep;
    }
    RowKind::WorkItem
}

/// Decompose a table span into prefix, classified rows and suffix.
///
/// Rows with zero non-blank cells are dropped without trace; rows whose
/// column shape can't carry a work item are skipped with a
/// `TableStructureMismatch` issue. `raw_index` is the ordinal in the
/// table's original row order, so skipped rows leave gaps — only the
/// ordering matters downstream.
pub fn decompose(doc: &str, table: Span, config: &WorksheetConfig) -> TableParts {
    // Skip the table's own open marker so depth counting starts inside it.
    let interior = Span::new(table.start + TABLE_OPEN.len(), table.end);
    let row_spans = direct_child_spans(doc, interior, ROW_OPEN, ROW_CLOSE);

    let (prefix, suffix) = match (row_spans.first(), row_spans.last()) {
        (Some(first), Some(last)) => (
            Span::new(table.start, first.start),
            Span::new(last.end, table.end),
        ),
        _ => (table, Span::new(table.end, table.end)),
    };

    let mut rows = Vec::new();
    let mut issues = Vec::new();

    for (raw_index, row_span) in row_spans.iter().enumerate() {
        let cell_interior = Span::new(row_span.start + ROW_OPEN.len(), row_span.end);
        let cell_spans = direct_child_spans(doc, cell_interior, CELL_OPEN, CELL_CLOSE);
        let cell_texts: Vec<String> = cell_spans
            .iter()
            .map(|span| cell_text(span.slice(doc)))
            .collect();

        if cell_texts.iter().all(|t| t.is_empty()) {
            continue;
        }

        let title = cell_texts
            .iter()
            .filter(|t| !t.is_empty())
            .max_by_key(|t| t.chars().count())
            .cloned()
            .unwrap_or_default();
        let unit = if cell_texts.len() >= 2 {
            cell_texts[cell_texts.len() - 2].clone()
        } else {
            String::new()
        };
        let quantity_para_id = cell_spans.last().and_then(|span| {
            PARA_ID_REGEX
                .captures(span.slice(doc))
                .map(|caps| caps.get(1).unwrap().as_str().to_string())
        });

        let kind = classify_row(&cell_texts, &unit, &title, config);

        // Work items need the full four-column shape; label rows are
        // allowed merged cells.
        if kind == RowKind::WorkItem && cell_spans.len() < 4 {
            issues.push(AssemblyIssue::TableStructureMismatch {
                row_index: raw_index,
                detail: format!("expected 4 cells, found {}", cell_spans.len()),
            });
            continue;
        }

        rows.push(Row {
            title,
            unit,
            quantity_para_id,
            raw_index,
            kind,
            span: *row_span,
        });
    }

    TableParts {
        span: table,
        prefix,
        rows,
        suffix,
        issues,
    }
}
