//! Transformation Primitives
//!
//! Atomic markup→markup edits. Every primitive locates its target by
//! stable id and splices the byte range once — the document is never
//! regex-rewritten wholesale here. A missing target returns `None`,
//! which callers must treat as a no-op, not an error.

use crate::locator::{enclosing_element, find_paragraph, ROW_CLOSE, ROW_OPEN};
use crate::types::Span;
use quick_xml::escape::escape;
use regex::Regex;
use std::sync::LazyLock;

static HIGHLIGHT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<w:highlight\b[^>]*/>").unwrap());
static SHADING_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<w:shd\b[^>]*/>").unwrap());
static COLOR_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<w:color\b[^>]*/>").unwrap());

const BLACK: &str = "<w:color w:val=\"000000\"/>";

/// Replace `span` with `replacement` in one pass.
pub fn splice(doc: &str, span: Span, replacement: &str) -> String {
    let mut out = String::with_capacity(doc.len() - span.len() + replacement.len());
    out.push_str(&doc[..span.start]);
    out.push_str(replacement);
    out.push_str(&doc[span.end..]);
    out
}

/// Delete the paragraph with this id. `None` when the id is absent.
pub fn remove_paragraph(doc: &str, para_id: &str) -> Option<String> {
    let span = find_paragraph(doc, para_id)?;
    Some(splice(doc, span, ""))
}

/// Delete the whole `<w:tr>` containing the paragraph with this id.
/// `None` when the id is absent or the paragraph sits outside a row.
pub fn remove_row(doc: &str, para_id: &str) -> Option<String> {
    let para = find_paragraph(doc, para_id)?;
    let row = enclosing_element(doc, para.start, ROW_OPEN, ROW_CLOSE)?;
    Some(splice(doc, row, ""))
}

/// Strip highlight and cell/run shading markers from a property block.
fn strip_shading(props: &str) -> String {
    let pass = HIGHLIGHT_REGEX.replace_all(props, "");
    SHADING_REGEX.replace_all(&pass, "").into_owned()
}

/// Force the explicit text color of a run-property block to black,
/// inserting one when none is present.
fn force_black(props: &str) -> String {
    if COLOR_REGEX.is_match(props) {
        return COLOR_REGEX.replace_all(props, BLACK).into_owned();
    }
    if let Some(stripped) = props.strip_suffix("/>") {
        // <w:rPr/> — expand the empty element
        let name_end = stripped.find(|c: char| c == ' ').unwrap_or(stripped.len());
        let name = &stripped[1..name_end];
        return format!("{stripped}>{BLACK}</{name}>");
    }
    match props.rfind("</") {
        Some(close_at) => format!("{}{}{}", &props[..close_at], BLACK, &props[close_at..]),
        None => props.to_string(),
    }
}

/// First `<w:rPr>` element inside a paragraph's markup, if any.
fn first_run_properties(paragraph: &str) -> Option<&str> {
    let start = paragraph.find("<w:rPr")?;
    let rest = &paragraph[start..];
    let tag_end = rest.find('>')?;
    if rest.as_bytes()[tag_end - 1] == b'/' {
        return Some(&rest[..tag_end + 1]);
    }
    let close = rest.find("</w:rPr>")?;
    Some(&rest[..close + "</w:rPr>".len()])
}

/// `<w:pPr>` block directly after the paragraph open tag, if any.
fn paragraph_properties(after_open: &str) -> Option<&str> {
    if !after_open.starts_with("<w:pPr") {
        return None;
    }
    let tag_end = after_open.find('>')?;
    if after_open.as_bytes()[tag_end - 1] == b'/' {
        return Some(&after_open[..tag_end + 1]);
    }
    let close = after_open.find("</w:pPr>")?;
    Some(&after_open[..close + "</w:pPr>".len()])
}

/// Replace a paragraph's visible text while keeping its formatting.
///
/// Paragraph-level properties always survive. The runs collapse into a
/// single one whose properties are either the first original run's
/// (stripped of highlight/shading, color forced to black) or, when
/// `preserve_run_formatting` is false, a minimal forced-black block.
/// `None` when the id is absent.
pub fn replace_paragraph_text(
    doc: &str,
    para_id: &str,
    new_text: &str,
    preserve_run_formatting: bool,
) -> Option<String> {
    let span = find_paragraph(doc, para_id)?;
    let paragraph = span.slice(doc);

    let tag_end = paragraph.find('>')?;
    let self_closing = paragraph.as_bytes()[tag_end - 1] == b'/';
    let open_tag = if self_closing {
        format!("{}>", paragraph[..tag_end].trim_end_matches('/'))
    } else {
        paragraph[..tag_end + 1].to_string()
    };

    let p_props = if self_closing {
        ""
    } else {
        paragraph_properties(&paragraph[tag_end + 1..]).unwrap_or("")
    };

    // Search for run properties after the pPr block — <w:pPr> may
    // carry its own <w:rPr> for the paragraph mark.
    let body_start = (tag_end + 1 + p_props.len()).min(paragraph.len());
    let run_props = if preserve_run_formatting {
        first_run_properties(&paragraph[body_start..])
            .map(|props| force_black(&strip_shading(props)))
            .unwrap_or_else(|| format!("<w:rPr>{BLACK}</w:rPr>"))
    } else {
        format!("<w:rPr>{BLACK}</w:rPr>")
    };

    let replacement = format!(
        "{open_tag}{p_props}<w:r>{run_props}<w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>",
        escape(new_text)
    );
    Some(splice(doc, span, &replacement))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = concat!(
        "<w:body>",
        "<w:p w14:paraId=\"00000A01\"><w:pPr><w:jc w:val=\"both\"/></w:pPr>",
        "<w:r><w:rPr><w:i/><w:sz w:val=\"24\"/><w:color w:val=\"FF0000\"/><w:highlight w:val=\"yellow\"/></w:rPr>",
        "<w:t>original text</w:t></w:r>",
        "<w:r><w:rPr><w:b/></w:rPr><w:t> tail</w:t></w:r></w:p>",
        "<w:tbl><w:tr><w:tc><w:p w14:paraId=\"00000A02\"><w:r><w:t>cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl>",
        "</w:body>"
    );

    #[test]
    fn test_remove_paragraph() {
        let out = remove_paragraph(DOC, "00000A01").unwrap();
        assert!(!out.contains("original text"));
        assert!(out.contains("cell"));
    }

    #[test]
    fn test_remove_paragraph_missing_is_none() {
        assert!(remove_paragraph(DOC, "DEADBEEF").is_none());
    }

    #[test]
    fn test_remove_row_deletes_enclosing_row() {
        let out = remove_row(DOC, "00000A02").unwrap();
        assert!(!out.contains("<w:tr>"));
        assert!(!out.contains("cell"));
        // The table shell survives; only the row went.
        assert!(out.contains("<w:tbl>"));
        assert!(out.contains("original text"));
    }

    #[test]
    fn test_remove_row_outside_table_is_none() {
        assert!(remove_row(DOC, "00000A01").is_none());
    }

    #[test]
    fn test_replace_preserving_run_formatting() {
        let out = replace_paragraph_text(DOC, "00000A01", "new text", true).unwrap();
        // Paragraph-level justification kept.
        assert!(out.contains("<w:jc w:val=\"both\"/>"));
        // First run's italic and size kept, color forced, highlight gone.
        assert!(out.contains("<w:i/>"));
        assert!(out.contains("<w:sz w:val=\"24\"/>"));
        assert!(out.contains("<w:color w:val=\"000000\"/>"));
        assert!(!out.contains("FF0000"));
        assert!(!out.contains("w:highlight"));
        // Second run is gone entirely.
        assert!(!out.contains("<w:b/>"));
        assert!(out.contains(">new text<"));
        assert!(!out.contains("original text"));
    }

    #[test]
    fn test_replace_with_minimal_formatting() {
        let out = replace_paragraph_text(DOC, "00000A01", "plain", false).unwrap();
        assert!(out.contains("<w:rPr><w:color w:val=\"000000\"/></w:rPr>"));
        assert!(!out.contains("<w:i/>"));
        assert!(out.contains("<w:jc w:val=\"both\"/>"));
    }

    #[test]
    fn test_replace_missing_is_none() {
        assert!(replace_paragraph_text(DOC, "DEADBEEF", "x", true).is_none());
    }

    #[test]
    fn test_replacement_text_is_escaped() {
        let out = replace_paragraph_text(DOC, "00000A01", "5 < 7 & \"ok\"", false).unwrap();
        assert!(out.contains("5 &lt; 7 &amp;"));
        assert!(!out.contains("5 < 7"));
    }

    #[test]
    fn test_replace_self_closing_paragraph_gains_run() {
        let doc = "<w:body><w:p w14:paraId=\"00000B01\"/></w:body>";
        let out = replace_paragraph_text(doc, "00000B01", "filled", true).unwrap();
        assert!(out.contains("<w:p w14:paraId=\"00000B01\">"));
        assert!(out.contains(">filled<"));
        assert!(out.ends_with("</w:p></w:body>"));
    }

    #[test]
    fn test_run_without_properties_gets_black() {
        let doc = "<w:p w14:paraId=\"00000C01\"><w:r><w:t>x</w:t></w:r></w:p>";
        let out = replace_paragraph_text(doc, "00000C01", "y", true).unwrap();
        assert!(out.contains(BLACK));
    }

    #[test]
    fn test_force_black_on_empty_rpr() {
        assert_eq!(force_black("<w:rPr/>"), "<w:rPr><w:color w:val=\"000000\"/></w:rPr>");
    }
}
