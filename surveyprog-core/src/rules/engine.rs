use crate::config::AssemblyConfig;
use crate::error::AssemblyIssue;
use crate::estimate;
use crate::merge;
use crate::transform;
use crate::types::{AssemblyReport, ExtractedData, FactSet, SectionStats};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

use super::quantities::QuantitiesRule;
use super::sections;
use super::worksheet::WorksheetRule;

/// Named handle on one boolean of the merged fact set. Rule tables are
/// data; this is the vocabulary they reference facts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FactKey {
    SurfaceWater,
    GroundWater,
    WaterSampling,
    SedimentSampling,
    AirSampling,
    PhysicalImpacts,
    BuildingSurvey,
    LinearObject,
    RadonFlux,
    GasGeochemistry,
}

impl FactKey {
    pub fn eval(&self, facts: &FactSet) -> bool {
        match self {
            FactKey::SurfaceWater => facts.has_surface_water,
            FactKey::GroundWater => facts.has_ground_water,
            FactKey::WaterSampling => facts.has_water_sampling(),
            FactKey::SedimentSampling => facts.has_sediment_sampling,
            FactKey::AirSampling => facts.has_air_sampling,
            FactKey::PhysicalImpacts => facts.has_physical_impacts,
            FactKey::BuildingSurvey => facts.has_building_survey,
            FactKey::LinearObject => facts.is_linear_object,
            FactKey::RadonFlux => facts.has_radon_flux,
            FactKey::GasGeochemistry => facts.has_gas_geochemistry,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Condition {
    Always,
    If(FactKey),
    Unless(FactKey),
    AnyOf(Vec<FactKey>),
    AllOf(Vec<FactKey>),
}

impl Condition {
    pub fn holds(&self, facts: &FactSet) -> bool {
        match self {
            Condition::Always => true,
            Condition::If(key) => key.eval(facts),
            Condition::Unless(key) => !key.eval(facts),
            Condition::AnyOf(keys) => keys.iter().any(|k| k.eval(facts)),
            Condition::AllOf(keys) => keys.iter().all(|k| k.eval(facts)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RuleAction {
    RemoveParagraph,
    RemoveRow,
    /// Replace the paragraph's visible text. `{placeholders}` resolve
    /// against the context variables; an unresolved placeholder skips
    /// the rule and leaves the template's original text standing.
    ReplaceText {
        template: String,
        preserve_formatting: bool,
    },
}

/// One declarative rule: when the condition holds, apply the action to
/// the region known by this business meaning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSpec {
    pub when: Condition,
    pub region: String,
    pub action: RuleAction,
}

impl RuleSpec {
    pub fn remove_unless(region: &str, key: FactKey) -> Self {
        Self {
            when: Condition::Unless(key),
            region: region.to_string(),
            action: RuleAction::RemoveParagraph,
        }
    }

    /// Delete the whole table row containing the mapped paragraph.
    pub fn remove_row_unless(region: &str, key: FactKey) -> Self {
        Self {
            when: Condition::Unless(key),
            region: region.to_string(),
            action: RuleAction::RemoveRow,
        }
    }

    pub fn replace_always(region: &str, template: &str) -> Self {
        Self {
            when: Condition::Always,
            region: region.to_string(),
            action: RuleAction::ReplaceText {
                template: template.to_string(),
                preserve_formatting: true,
            },
        }
    }
}

/// An ordered rule table for one document section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionRules {
    pub name: String,
    pub rules: Vec<RuleSpec>,
}

/// Everything a section executor may read: the merged extraction, the
/// configuration, and the pre-composed template variables.
pub struct AssemblyContext<'a> {
    pub data: &'a ExtractedData,
    pub config: &'a AssemblyConfig,
    pub vars: BTreeMap<String, String>,
}

impl<'a> AssemblyContext<'a> {
    pub fn new(data: &'a ExtractedData, config: &'a AssemblyConfig) -> Self {
        Self {
            vars: build_vars(data),
            data,
            config,
        }
    }
}

/// What one section did to the document.
pub struct SectionOutcome {
    pub doc: String,
    pub edits: usize,
    pub skipped: usize,
    pub issues: Vec<AssemblyIssue>,
}

impl SectionOutcome {
    pub fn untouched(doc: String) -> Self {
        Self {
            doc,
            edits: 0,
            skipped: 0,
            issues: Vec::new(),
        }
    }
}

/// A section executor: markup in, markup out, re-runnable against a
/// document whose targets are already gone.
pub trait SectionRule {
    fn apply(&self, doc: String, ctx: &AssemblyContext) -> Result<SectionOutcome>;
    fn name(&self) -> &str;
}

/// Fill `{placeholder}` slots from the context variables.
/// `Err` carries the first unresolved key.
pub fn fill_template(template: &str, vars: &BTreeMap<String, String>) -> Result<String, String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let Some(close) = rest[open..].find('}') else {
            out.push_str(&rest[open..]);
            return Ok(out);
        };
        let key = &rest[open + 1..open + close];
        match vars.get(key) {
            Some(value) => out.push_str(value),
            None => return Err(key.to_string()),
        }
        rest = &rest[open + close + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Compose the template variables every section can interpolate.
pub fn build_vars(data: &ExtractedData) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();
    let facts = &data.facts;

    if let Some(name) = &data.object_name {
        vars.insert("object_name".to_string(), name.clone());
    }
    if let Some(location) = &data.object_location {
        vars.insert("object_location".to_string(), location.clone());
    }

    let area_ha = estimate::resolve_area_ha(data.area_m2);
    let area_m2 = area_ha * 10_000.0;
    vars.insert("area_ha".to_string(), format!("{area_ha:.2}"));

    let route_km =
        estimate::route_length_km(area_m2, facts.is_linear_object, data.route_length_km);
    vars.insert("route_length_km".to_string(), format!("{route_km:.1}"));

    let points = data
        .observation_points
        .unwrap_or_else(|| estimate::observation_point_count(area_ha));
    vars.insert("observation_points".to_string(), points.to_string());

    let depth = merge::max_depth(&data.soil_layers);
    if depth > 0.0 {
        vars.insert("max_depth_m".to_string(), format!("{depth:.1}"));
    }
    let total_samples: u32 = data.soil_layers.iter().map(|l| l.sample_count).sum();
    if total_samples > 0 {
        vars.insert("soil_sample_count".to_string(), total_samples.to_string());
    }

    vars.insert(
        "sampling_summary".to_string(),
        compose_sampling_summary(facts),
    );
    vars
}

/// One templated sentence describing the sampling scope, built from
/// the facts. Referenced by the Sampling rule table.
fn compose_sampling_summary(facts: &FactSet) -> String {
    let mut kinds = Vec::new();
    if facts.has_surface_water {
        kinds.push("surface water");
    }
    if facts.has_ground_water {
        kinds.push("groundwater");
    }
    if facts.has_sediment_sampling {
        kinds.push("bottom sediment");
    }
    if facts.has_air_sampling {
        kinds.push("atmospheric air");
    }
    let mut sentence = if kinds.is_empty() {
        "Environmental sampling beyond soil investigation is not planned.".to_string()
    } else {
        format!("The program provides for sampling of {}.", kinds.join(", "))
    };
    if facts.has_physical_impacts {
        sentence.push_str(" Physical impact levels (noise, vibration, EMF) will be measured.");
    }
    sentence
}

/// Runs the configured sections in order. Declarative sections go
/// through the interpreter; the worksheet and quantities sections
/// dispatch to their executors.
pub struct RuleEngine {
    tables: Vec<SectionRules>,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleEngine {
    pub fn new() -> Self {
        Self {
            tables: sections::declarative_tables(),
        }
    }

    pub fn apply_sections(
        &self,
        mut doc: String,
        ctx: &AssemblyContext,
        report: &mut AssemblyReport,
    ) -> Result<String> {
        for section in &ctx.config.pipeline.sections {
            if !section.enabled {
                println!("   ⏭️  Skipping disabled section: {}", section.name);
                continue;
            }
            println!("🔧 Applying section: {}", section.name);
            let started = Instant::now();
            let outcome = self.apply_section_by_name(&section.name, doc, ctx)?;
            doc = outcome.doc;
            println!(
                "   ✅ {} edits, {} skipped regions after {}",
                outcome.edits,
                outcome.skipped,
                section.name
            );
            report.sections.push(SectionStats {
                name: section.name.clone(),
                edits: outcome.edits,
                skipped: outcome.skipped,
                duration_ms: started.elapsed().as_millis() as u64,
            });
            report.issues.extend(outcome.issues);
        }
        Ok(doc)
    }

    fn apply_section_by_name(
        &self,
        name: &str,
        doc: String,
        ctx: &AssemblyContext,
    ) -> Result<SectionOutcome> {
        match name {
            "Worksheet" => WorksheetRule::new().apply(doc, ctx),
            "Quantities" => QuantitiesRule::new().apply(doc, ctx),
            _ => match self.tables.iter().find(|t| t.name == name) {
                Some(table) => Ok(interpret_section(doc, table, ctx)),
                None => {
                    println!("⚠️  Unknown section: {name}. Skipping...");
                    Ok(SectionOutcome::untouched(doc))
                }
            },
        }
    }
}

/// The generic interpreter: walk the table, evaluate each condition,
/// resolve the region through the map, apply the primitive. Every miss
/// degrades to a recorded no-op.
pub fn interpret_section(
    mut doc: String,
    section: &SectionRules,
    ctx: &AssemblyContext,
) -> SectionOutcome {
    let mut edits = 0usize;
    let mut skipped = 0usize;
    let mut issues = Vec::new();

    for rule in &section.rules {
        if !rule.when.holds(&ctx.data.facts) {
            continue;
        }
        let Some(para_id) = ctx.config.regions.paragraph_id(&rule.region) else {
            skipped += 1;
            issues.push(AssemblyIssue::RegionNotFound {
                meaning: rule.region.clone(),
                locator: "<unmapped>".to_string(),
            });
            continue;
        };

        let applied = match &rule.action {
            RuleAction::RemoveParagraph => transform::remove_paragraph(&doc, para_id),
            RuleAction::RemoveRow => transform::remove_row(&doc, para_id),
            RuleAction::ReplaceText {
                template,
                preserve_formatting,
            } => match fill_template(template, &ctx.vars) {
                Ok(text) => {
                    transform::replace_paragraph_text(&doc, para_id, &text, *preserve_formatting)
                }
                Err(_missing) => {
                    // No value for the placeholder — the template's
                    // original wording stands.
                    skipped += 1;
                    continue;
                }
            },
        };

        match applied {
            Some(new_doc) => {
                doc = new_doc;
                edits += 1;
            }
            None => {
                skipped += 1;
                issues.push(AssemblyIssue::RegionNotFound {
                    meaning: rule.region.clone(),
                    locator: format!("paraId {para_id}"),
                });
            }
        }
    }

    SectionOutcome {
        doc,
        edits,
        skipped,
        issues,
    }
}
