//! Region Locator
//!
//! Finds addressable units inside the raw WordprocessingML string and
//! returns their byte spans. Paragraphs are addressed by the stable
//! `w14:paraId` attribute; tables are addressed by an anchor substring
//! that occurs somewhere inside them.
//!
//! The locator never builds a DOM. It scans the markup directly, the
//! same way the blob was authored: tag tokens with depth counting.
//! Missing regions return `None` — callers treat that as a no-op.

use crate::types::Span;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

pub const PARA_OPEN: &str = "<w:p";
pub const PARA_CLOSE: &str = "</w:p>";
pub const TABLE_OPEN: &str = "<w:tbl";
pub const TABLE_CLOSE: &str = "</w:tbl>";
pub const ROW_OPEN: &str = "<w:tr";
pub const ROW_CLOSE: &str = "</w:tr>";
pub const CELL_OPEN: &str = "<w:tc";
pub const CELL_CLOSE: &str = "</w:tc>";

// Pre-compiled patterns shared across the crate
pub static PARA_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"w14:paraId="([0-9A-Fa-f]{8})""#).unwrap());

/// An open-tag match is only real when the tag name ends here:
/// `<w:tbl>` and `<w:tbl ` are tables, `<w:tblPr>` is not.
fn at_tag_boundary(doc: &str, pos: usize) -> bool {
    matches!(doc.as_bytes().get(pos), Some(b' ') | Some(b'>') | Some(b'/'))
}

/// Last boundary-checked occurrence of an open marker in `doc[..end]`.
fn rfind_open(doc: &str, end: usize, open: &str) -> Option<usize> {
    let mut limit = end;
    while let Some(at) = doc[..limit].rfind(open) {
        if at_tag_boundary(doc, at + open.len()) {
            return Some(at);
        }
        limit = at;
    }
    None
}

/// First boundary-checked occurrence of an open marker at or after `from`.
fn find_open(doc: &str, from: usize, open: &str) -> Option<usize> {
    let mut cursor = from;
    while let Some(rel) = doc[cursor..].find(open) {
        let at = cursor + rel;
        if at_tag_boundary(doc, at + open.len()) {
            return Some(at);
        }
        cursor = at + open.len();
    }
    None
}

/// Nearest marker (open or close) strictly before `before`.
/// Returns `(position, is_open)`.
fn prev_marker(doc: &str, before: usize, open: &str, close: &str) -> Option<(usize, bool)> {
    let o = rfind_open(doc, before, open);
    let c = doc[..before].rfind(close);
    match (o, c) {
        (Some(o), Some(c)) if c > o => Some((c, false)),
        (Some(o), _) => Some((o, true)),
        (None, Some(c)) => Some((c, false)),
        (None, None) => None,
    }
}

/// Nearest marker (open or close) at or after `from`.
fn next_marker(doc: &str, from: usize, open: &str, close: &str) -> Option<(usize, bool)> {
    let o = find_open(doc, from, open);
    let c = doc[from..].find(close).map(|rel| from + rel);
    match (o, c) {
        (Some(o), Some(c)) if o < c => Some((o, true)),
        (_, Some(c)) => Some((c, false)),
        (Some(o), None) => Some((o, true)),
        (None, None) => None,
    }
}

/// Span of the innermost `open…close` element enclosing `pos`.
///
/// A naive "last open before pos" is wrong for elements that nest
/// (tables in cells): walking backward, every close marker we pass
/// means one whole inner element lies between us and our own open
/// marker, so the matching open is found by depth counting in both
/// directions.
pub fn enclosing_element(doc: &str, pos: usize, open: &str, close: &str) -> Option<Span> {
    let mut depth = 0usize;
    let mut cursor = pos;
    let open_at = loop {
        let (at, is_open) = prev_marker(doc, cursor, open, close)?;
        if is_open {
            if depth == 0 {
                break at;
            }
            depth -= 1;
        } else {
            depth += 1;
        }
        cursor = at;
    };

    let mut depth = 1usize;
    let mut cursor = open_at + open.len();
    loop {
        let (at, is_open) = next_marker(doc, cursor, open, close)?;
        if is_open {
            depth += 1;
            cursor = at + open.len();
        } else {
            depth -= 1;
            if depth == 0 {
                return Some(Span::new(open_at, at + close.len()));
            }
            cursor = at + close.len();
        }
    }
}

/// Find a paragraph by its stable `w14:paraId`.
///
/// Paragraphs do not nest, so no depth counting is needed here: the
/// nearest `<w:p` open marker before the attribute is the paragraph's
/// own open tag.
pub fn find_paragraph(doc: &str, para_id: &str) -> Option<Span> {
    let needle = format!("w14:paraId=\"{para_id}\"");
    let attr_at = doc.find(&needle)?;
    paragraph_span_at(doc, attr_at)
}

/// Expand an attribute position inside a `<w:p>` open tag to the span
/// of the whole paragraph. Handles the self-closing `<w:p …/>` form.
fn paragraph_span_at(doc: &str, attr_at: usize) -> Option<Span> {
    let open_at = rfind_open(doc, attr_at, PARA_OPEN)?;
    let tag_end = open_at + doc[open_at..].find('>')?;
    if doc.as_bytes().get(tag_end.wrapping_sub(1)) == Some(&b'/') {
        return Some(Span::new(open_at, tag_end + 1));
    }
    let close_rel = doc[attr_at..].find(PARA_CLOSE)?;
    Some(Span::new(open_at, attr_at + close_rel + PARA_CLOSE.len()))
}

/// Find a table by an anchor substring that occurs inside it.
///
/// Starts from the first occurrence of the anchor and walks outward
/// with depth counting, so an anchor inside a nested table resolves to
/// the *inner* table — and an anchor in the outer table is not fooled
/// by inner close markers sitting between it and the outer open tag.
pub fn find_table(doc: &str, anchor: &str) -> Option<Span> {
    let anchor_at = doc.find(anchor)?;
    enclosing_element(doc, anchor_at, TABLE_OPEN, TABLE_CLOSE)
}

/// One-pass paraId → span index.
///
/// The region audit checks every mapped id before any rule runs; one
/// O(n) build here answers all those lookups in O(1) instead of one
/// full scan per mapped region.
#[derive(Debug, Clone)]
pub struct RegionIndex {
    paragraphs: HashMap<String, Span>,
}

impl RegionIndex {
    pub fn build(doc: &str) -> Self {
        let mut paragraphs = HashMap::new();
        for caps in PARA_ID_REGEX.captures_iter(doc) {
            let id = caps.get(1).unwrap();
            if let Some(span) = paragraph_span_at(doc, caps.get(0).unwrap().start()) {
                paragraphs.insert(id.as_str().to_string(), span);
            }
        }
        Self { paragraphs }
    }

    pub fn paragraph(&self, para_id: &str) -> Option<Span> {
        self.paragraphs.get(para_id).copied()
    }

    pub fn contains(&self, para_id: &str) -> bool {
        self.paragraphs.contains_key(para_id)
    }

    pub fn len(&self) -> usize {
        self.paragraphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }
}
