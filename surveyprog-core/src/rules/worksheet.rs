//! Scope-of-work table executor.
//!
//! The one genuinely algorithmic section: locate the table by anchor,
//! decompose and classify its rows, derive the explicit keep set from
//! the merged facts, resolve group headers, rebuild the table from the
//! surviving rows and fill their quantity cells.

use super::engine::{AssemblyContext, SectionOutcome, SectionRule};
use super::sections;
use crate::decompose::decompose;
use crate::error::AssemblyIssue;
use crate::keepset;
use crate::locator::find_table;
use crate::transform;
use crate::types::{KeepSet, Row, RowKind};
use anyhow::Result;

pub struct WorksheetRule;

impl Default for WorksheetRule {
    fn default() -> Self {
        Self::new()
    }
}

impl WorksheetRule {
    pub fn new() -> Self {
        Self
    }
}

/// Work items whose paired fact holds (or that every survey carries)
/// form the explicit keep set.
fn explicit_keep(rows: &[Row], ctx: &AssemblyContext) -> KeepSet {
    let vocab = sections::work_item_vocabulary();
    rows.iter()
        .filter(|row| row.kind == RowKind::WorkItem)
        .filter(|row| {
            let title = row.title.to_lowercase();
            vocab.iter().any(|(key, words)| {
                let fact_holds = key.map_or(true, |k| k.eval(&ctx.data.facts));
                fact_holds && words.iter().any(|w| title.contains(w))
            })
        })
        .map(|row| row.raw_index)
        .collect()
}

/// Rows that survive regardless: the always-keep vocabulary, the
/// structural column-number row, and the caption row carrying the
/// anchor text (losing it would orphan the table on a re-run).
fn always_keep(rows: &[Row], anchor: &str) -> KeepSet {
    let anchor_lower = anchor.to_lowercase();
    rows.iter()
        .filter(|row| {
            matches!(row.kind, RowKind::AlwaysKeep | RowKind::StructuralHeader)
                || row.title.to_lowercase().contains(&anchor_lower)
        })
        .map(|row| row.raw_index)
        .collect()
}

/// Quantity to write into a kept row's last cell, by title vocabulary.
fn quantity_for(title: &str, ctx: &AssemblyContext) -> Option<String> {
    let lower = title.to_lowercase();
    if lower.contains("reconnaissance") || lower.contains("route") || lower.contains("traverse") {
        return ctx.vars.get("route_length_km").cloned();
    }
    if lower.contains("observation") {
        return ctx.vars.get("observation_points").cloned();
    }
    if lower.contains("soil") {
        return ctx.vars.get("soil_sample_count").cloned();
    }
    None
}

impl SectionRule for WorksheetRule {
    fn apply(&self, doc: String, ctx: &AssemblyContext) -> Result<SectionOutcome> {
        let mut outcome = SectionOutcome::untouched(String::new());

        let Some(anchor) = ctx.config.regions.anchor(&ctx.config.worksheet.anchor_meaning) else {
            outcome.skipped = 1;
            outcome.issues.push(AssemblyIssue::RegionNotFound {
                meaning: ctx.config.worksheet.anchor_meaning.clone(),
                locator: "<unmapped>".to_string(),
            });
            outcome.doc = doc;
            return Ok(outcome);
        };

        let Some(table_span) = find_table(&doc, anchor) else {
            // The whole section's rule set is skipped; the rest of the
            // pipeline is unaffected.
            outcome.skipped = 1;
            outcome.issues.push(AssemblyIssue::RegionNotFound {
                meaning: ctx.config.worksheet.anchor_meaning.clone(),
                locator: format!("anchor {anchor:?}"),
            });
            outcome.doc = doc;
            return Ok(outcome);
        };

        let parts = decompose(&doc, table_span, &ctx.config.worksheet);
        outcome.issues.extend(parts.issues.iter().cloned());

        let explicit = explicit_keep(&parts.rows, ctx);
        let always = always_keep(&parts.rows, anchor);
        let keep = keepset::resolve(&parts.rows, &explicit, &always);
        let kept = keepset::surviving(&parts.rows, &keep);

        println!(
            "   📋 Worksheet: {} rows decomposed, {} kept",
            parts.rows.len(),
            kept.len()
        );

        // Rebuild the table from surviving rows in one splice.
        let mut new_table =
            String::with_capacity(parts.prefix.len() + parts.suffix.len() + table_span.len());
        new_table.push_str(parts.prefix.slice(&doc));
        for row in &kept {
            new_table.push_str(row.span.slice(&doc));
        }
        new_table.push_str(parts.suffix.slice(&doc));

        outcome.edits += parts.rows.len() - kept.len();

        // Collect fills first: the splice below invalidates row spans,
        // but quantity cells are re-located by paraId afterwards.
        let fills: Vec<(String, String)> = kept
            .iter()
            .filter(|row| matches!(row.kind, RowKind::WorkItem | RowKind::AlwaysKeep))
            .filter_map(|row| {
                let id = row.quantity_para_id.clone()?;
                let value = quantity_for(&row.title, ctx)?;
                Some((id, value))
            })
            .collect();

        let mut new_doc = transform::splice(&doc, table_span, &new_table);
        for (para_id, value) in fills {
            match transform::replace_paragraph_text(&new_doc, &para_id, &value, true) {
                Some(updated) => {
                    new_doc = updated;
                    outcome.edits += 1;
                }
                None => outcome.skipped += 1,
            }
        }

        outcome.doc = new_doc;
        Ok(outcome)
    }

    fn name(&self) -> &str {
        "Worksheet"
    }
}
