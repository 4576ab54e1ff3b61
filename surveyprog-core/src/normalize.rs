//! Style Normalizer
//!
//! The final whole-document pass. Template authors mark conditional
//! regions with highlighting and colored text while drafting; whatever
//! survives assembly must leave the building looking like finished
//! prose. Removes every highlight/shading marker and rewrites every
//! explicit non-black text color to black. `w:val="auto"` already
//! renders black and is left alone.

use regex::Regex;
use std::sync::LazyLock;

static HIGHLIGHT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<w:highlight\b[^>]*/>").unwrap());
static COLOR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<w:color w:val="([0-9A-Fa-f]{6})"[^>]*/>"#).unwrap());

/// Normalize styles across the whole document. Always applied last.
pub fn normalize_styles(doc: &str) -> String {
    let pass = HIGHLIGHT_REGEX.replace_all(doc, "");
    let pass = strip_shading_in_blocks(&pass, "<w:rPr", "</w:rPr>");
    let pass = strip_shading_in_blocks(&pass, "<w:pPr", "</w:pPr>");
    COLOR_REGEX
        .replace_all(&pass, |caps: &regex::Captures| {
            if caps[1].eq_ignore_ascii_case("000000") {
                caps[0].to_string()
            } else {
                "<w:color w:val=\"000000\"/>".to_string()
            }
        })
        .into_owned()
}

static SHD_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<w:shd\b[^>]*/>").unwrap());

/// Remove `<w:shd>` markers that sit inside run or paragraph property
/// blocks. Cell and table shading (`<w:tcPr>`, `<w:tblPr>`) is layout,
/// not draft markup, so this walks property blocks instead of sweeping
/// the whole document.
fn strip_shading_in_blocks(doc: &str, open: &str, close: &str) -> String {
    let mut out = String::with_capacity(doc.len());
    let mut cursor = 0usize;
    while let Some(rel) = doc[cursor..].find(open) {
        let start = cursor + rel;
        out.push_str(&doc[cursor..start]);
        let rest = &doc[start..];
        let tag = rest.find('>').map(|i| i + 1).unwrap_or(rest.len());
        if tag >= 2 && rest.as_bytes()[tag - 2] == b'/' {
            // Self-closing block carries no shading; copy it through so
            // the close-tag search cannot run into a later block.
            out.push_str(&rest[..tag]);
            cursor = start + tag;
            continue;
        }
        let block_end = match rest.find(close) {
            Some(at) => at + close.len(),
            None => {
                out.push_str(&rest[..tag]);
                cursor = start + tag;
                continue;
            }
        };
        let block = &rest[..block_end];
        out.push_str(&SHD_REGEX.replace_all(block, ""));
        cursor = start + block_end;
    }
    out.push_str(&doc[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_removed_everywhere() {
        let doc = "<w:rPr><w:highlight w:val=\"yellow\"/></w:rPr><w:rPr><w:highlight w:val=\"green\"/></w:rPr>";
        let out = normalize_styles(doc);
        assert!(!out.contains("w:highlight"));
    }

    #[test]
    fn test_non_black_color_forced() {
        let doc = "<w:rPr><w:color w:val=\"FF0000\"/></w:rPr>";
        assert_eq!(normalize_styles(doc), "<w:rPr><w:color w:val=\"000000\"/></w:rPr>");
    }

    #[test]
    fn test_black_and_auto_colors_untouched() {
        let doc = "<w:rPr><w:color w:val=\"000000\"/></w:rPr><w:rPr><w:color w:val=\"auto\"/></w:rPr>";
        assert_eq!(normalize_styles(doc), doc);
    }

    #[test]
    fn test_color_with_theme_attributes_collapses() {
        let doc = "<w:rPr><w:color w:val=\"4472C4\" w:themeColor=\"accent1\"/></w:rPr>";
        assert_eq!(normalize_styles(doc), "<w:rPr><w:color w:val=\"000000\"/></w:rPr>");
    }

    #[test]
    fn test_run_shading_removed_cell_shading_kept() {
        let doc = concat!(
            "<w:tcPr><w:shd w:val=\"clear\" w:fill=\"D9D9D9\"/></w:tcPr>",
            "<w:rPr><w:shd w:val=\"clear\" w:fill=\"FFFF00\"/></w:rPr>"
        );
        let out = normalize_styles(doc);
        assert!(out.contains("<w:tcPr><w:shd"));
        assert!(!out.contains("<w:rPr><w:shd"));
        assert!(out.contains("<w:rPr></w:rPr>"));
    }

    #[test]
    fn test_paragraph_shading_removed() {
        let doc = "<w:pPr><w:shd w:val=\"clear\" w:fill=\"FFFF00\"/><w:jc w:val=\"both\"/></w:pPr>";
        assert_eq!(
            normalize_styles(doc),
            "<w:pPr><w:jc w:val=\"both\"/></w:pPr>"
        );
    }

    #[test]
    fn test_self_closing_block_does_not_swallow_neighbors() {
        // An empty <w:rPr/> must not pair with a later run's close tag
        // and strip the cell shading sitting between them.
        let doc = concat!(
            "<w:rPr/>",
            "<w:tcPr><w:shd w:val=\"clear\" w:fill=\"D9D9D9\"/></w:tcPr>",
            "<w:rPr><w:b/></w:rPr>"
        );
        assert_eq!(normalize_styles(doc), doc);
    }

    #[test]
    fn test_untouched_document_is_identity() {
        let doc = "<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>plain</w:t></w:r></w:p>";
        assert_eq!(normalize_styles(doc), doc);
    }
}
