//! Derived-quantity paragraph fills.
//!
//! Rewrites the template sentences that quote numbers: traverse
//! length, observation-point count, soil investigation horizons. The
//! numbers come from the estimators when the order text did not state
//! them; composition happens here, so the declarative tables only ever
//! see ready variables.

use super::engine::{AssemblyContext, SectionOutcome, SectionRule};
use crate::error::AssemblyIssue;
use crate::merge;
use crate::transform;
use crate::types::SoilLayer;
use anyhow::Result;

pub struct QuantitiesRule;

impl Default for QuantitiesRule {
    fn default() -> Self {
        Self::new()
    }
}

impl QuantitiesRule {
    pub fn new() -> Self {
        Self
    }
}

fn compose_soil_sentence(layers: &[SoilLayer]) -> String {
    let horizons: Vec<String> = layers
        .iter()
        .map(|l| {
            format!(
                "{:.1}–{:.1} m ({} samples)",
                l.depth_from, l.depth_to, l.sample_count
            )
        })
        .collect();
    format!(
        "Soil samples are taken from the following horizons: {}; total investigation depth {:.1} m.",
        horizons.join(", "),
        merge::max_depth(layers)
    )
}

/// Replace one mapped paragraph's text, recording the outcome.
fn replace_region(outcome: &mut SectionOutcome, ctx: &AssemblyContext, meaning: &str, text: &str) {
    let Some(para_id) = ctx.config.regions.paragraph_id(meaning) else {
        outcome.skipped += 1;
        outcome.issues.push(AssemblyIssue::RegionNotFound {
            meaning: meaning.to_string(),
            locator: "<unmapped>".to_string(),
        });
        return;
    };
    match transform::replace_paragraph_text(&outcome.doc, para_id, text, true) {
        Some(updated) => {
            outcome.doc = updated;
            outcome.edits += 1;
        }
        None => {
            outcome.skipped += 1;
            outcome.issues.push(AssemblyIssue::RegionNotFound {
                meaning: meaning.to_string(),
                locator: format!("paraId {para_id}"),
            });
        }
    }
}

impl SectionRule for QuantitiesRule {
    fn apply(&self, doc: String, ctx: &AssemblyContext) -> Result<SectionOutcome> {
        let mut outcome = SectionOutcome::untouched(doc);

        if let Some(route_km) = ctx.vars.get("route_length_km") {
            let sentence =
                format!("The total length of the survey traverses is {route_km} km.");
            replace_region(&mut outcome, ctx, "route_length", &sentence);
        }

        if let Some(points) = ctx.vars.get("observation_points") {
            let sentence =
                format!("Ecological observations are carried out at {points} observation point(s).");
            replace_region(&mut outcome, ctx, "observation_points", &sentence);
        }

        if ctx.data.soil_layers.is_empty() {
            // No horizons stated anywhere — the template's default
            // wording stands.
            outcome.skipped += 1;
        } else {
            let sentence = compose_soil_sentence(&ctx.data.soil_layers);
            replace_region(&mut outcome, ctx, "soil_layers", &sentence);
        }

        Ok(outcome)
    }

    fn name(&self) -> &str {
        "Quantities"
    }
}
