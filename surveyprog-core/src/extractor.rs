//! Fact extractor boundary
//!
//! The engine does not read order documents itself — an external
//! collaborator does (usually AI-backed) and may time out or return
//! garbage. This module defines the boundary trait, the deterministic
//! keyword heuristic the engine falls back to, and the raw-payload
//! parser that degrades field by field instead of aborting.

use crate::error::AssemblyIssue;
use crate::types::{ExtractedData, FactSet, SoilLayer};
use anyhow::Result;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

/// Converts one source document's free text into structured facts.
///
/// Implementations may call out to a model or a service; the engine
/// only requires that a failed call is recoverable — callers fall back
/// to [`HeuristicExtractor`] per fact rather than aborting the run.
pub trait FactExtractor {
    /// `context` describes the source's role in the run ("primary
    /// order", "supplementary order") for backends that condition on
    /// it; the heuristic ignores it.
    fn extract(&self, source_text: &str, context: Option<&str>) -> Result<ExtractedData>;

    /// Extractor name for logging.
    fn name(&self) -> &str;
}

// Pre-compiled numeric patterns
static AREA_HA_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*(?:ha\b|hectares?)").unwrap());
static AREA_M2_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*(?:m2|m²|sq\.?\s*m)").unwrap());
static ROUTE_KM_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:length|route|traverse)[^0-9]{0,30}(\d+(?:[.,]\d+)?)\s*km").unwrap()
});
static OBS_POINTS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*observation\s+points?").unwrap());
static SOIL_LAYER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*(?:–|—|-|to)\s*(\d+(?:[.,]\d+)?)\s*m\b[^0-9.]{0,40}?(\d+)\s*samples?")
        .unwrap()
});

/// Parse a numeric token, tolerating a decimal comma.
fn parse_number(token: &str) -> Option<f64> {
    token.trim().replace(',', ".").parse::<f64>().ok()
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Deterministic keyword/pattern extractor.
///
/// This is both the fallback behind a failed AI call and a usable
/// extractor in its own right: every fact has a fixed vocabulary, every
/// quantity a fixed pattern, so the same order text always produces the
/// same facts.
pub struct HeuristicExtractor;

impl Default for HeuristicExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl HeuristicExtractor {
    pub fn new() -> Self {
        Self
    }

    fn extract_facts(&self, text: &str) -> FactSet {
        let lower = text.to_lowercase();
        FactSet {
            has_surface_water: contains_any(
                &lower,
                &["surface water", "river", "stream", "pond", "lake"],
            ),
            has_ground_water: contains_any(
                &lower,
                &["groundwater", "ground water", "aquifer", "water table"],
            ),
            has_sediment_sampling: contains_any(&lower, &["sediment", "silt sampl"]),
            has_air_sampling: contains_any(
                &lower,
                &["air sampl", "air quality", "atmospheric air"],
            ),
            has_physical_impacts: contains_any(
                &lower,
                &["noise", "vibration", "electromagnetic", "physical impact"],
            ),
            has_building_survey: contains_any(
                &lower,
                &["building survey", "building inspection", "existing buildings", "demolition"],
            ),
            is_linear_object: contains_any(
                &lower,
                &["pipeline", "linear object", "power line", "cable line", "highway", "railway"],
            ),
            has_radon_flux: lower.contains("radon"),
            has_gas_geochemistry: contains_any(
                &lower,
                &["gas geochem", "soil gas", "methane survey"],
            ),
        }
    }

    fn extract_area_m2(&self, text: &str) -> Option<f64> {
        if let Some(caps) = AREA_HA_REGEX.captures(text) {
            return parse_number(&caps[1]).map(|ha| ha * 10_000.0);
        }
        AREA_M2_REGEX
            .captures(text)
            .and_then(|caps| parse_number(&caps[1]))
    }

    fn extract_soil_layers(&self, text: &str) -> Vec<SoilLayer> {
        let mut layers = Vec::new();
        for caps in SOIL_LAYER_REGEX.captures_iter(text) {
            let (Some(from), Some(to)) = (parse_number(&caps[1]), parse_number(&caps[2])) else {
                continue;
            };
            let count = caps[3].parse::<u32>().unwrap_or(0);
            if to > from {
                layers.push(SoilLayer::new(from, to, count));
            }
        }
        layers
    }
}

impl FactExtractor for HeuristicExtractor {
    fn extract(&self, source_text: &str, _context: Option<&str>) -> Result<ExtractedData> {
        Ok(ExtractedData {
            facts: self.extract_facts(source_text),
            soil_layers: self.extract_soil_layers(source_text),
            area_m2: self.extract_area_m2(source_text),
            route_length_km: ROUTE_KM_REGEX
                .captures(source_text)
                .and_then(|caps| parse_number(&caps[1])),
            observation_points: OBS_POINTS_REGEX
                .captures(source_text)
                .and_then(|caps| caps[1].parse().ok()),
            object_name: None,
            object_location: None,
        })
    }

    fn name(&self) -> &str {
        "heuristic"
    }
}

// ===== RAW PAYLOAD PARSING =====

/// The loosely-typed payload an AI extractor returns. Numbers arrive as
/// JSON numbers or strings depending on the model's mood, so they stay
/// `Value` until checked.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawFacts {
    pub surface_water: Option<bool>,
    pub ground_water: Option<bool>,
    pub sediment_sampling: Option<bool>,
    pub air_sampling: Option<bool>,
    pub physical_impacts: Option<bool>,
    pub building_survey: Option<bool>,
    pub linear_object: Option<bool>,
    pub radon_flux: Option<bool>,
    pub gas_geochemistry: Option<bool>,
    pub area_m2: Option<serde_json::Value>,
    pub route_length_km: Option<serde_json::Value>,
    pub observation_points: Option<serde_json::Value>,
    pub object_name: Option<String>,
    pub object_location: Option<String>,
    pub soil_layers: Option<Vec<RawSoilLayer>>,
}

#[derive(Debug, Deserialize)]
pub struct RawSoilLayer {
    pub depth_from: serde_json::Value,
    pub depth_to: serde_json::Value,
    #[serde(default)]
    pub sample_count: u32,
    #[serde(default)]
    pub platform_numbers: Vec<u32>,
}

fn value_to_f64(
    value: &serde_json::Value,
    field: &str,
    issues: &mut Vec<AssemblyIssue>,
) -> Option<f64> {
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => parse_number(s),
        _ => None,
    };
    if parsed.is_none() {
        issues.push(AssemblyIssue::AmbiguousQuantity {
            field: field.to_string(),
            token: value.to_string(),
        });
    }
    parsed
}

/// Turn an extractor payload into `ExtractedData`, degrading per fact.
///
/// An unparsable payload falls back to the heuristic wholesale; a
/// parsable payload with a bad field falls back for that field only.
/// Every degradation is recorded as an issue, never an error.
pub fn parse_raw_facts(
    payload: &str,
    source_text: &str,
    issues: &mut Vec<AssemblyIssue>,
) -> ExtractedData {
    let heuristic = HeuristicExtractor::new()
        .extract(source_text, None)
        .unwrap_or_default();

    let raw: RawFacts = match serde_json::from_str(payload) {
        Ok(raw) => raw,
        Err(e) => {
            issues.push(AssemblyIssue::MalformedExtractorOutput {
                detail: e.to_string(),
            });
            return heuristic;
        }
    };

    let facts = FactSet {
        has_surface_water: raw.surface_water.unwrap_or(heuristic.facts.has_surface_water),
        has_ground_water: raw.ground_water.unwrap_or(heuristic.facts.has_ground_water),
        has_sediment_sampling: raw
            .sediment_sampling
            .unwrap_or(heuristic.facts.has_sediment_sampling),
        has_air_sampling: raw.air_sampling.unwrap_or(heuristic.facts.has_air_sampling),
        has_physical_impacts: raw
            .physical_impacts
            .unwrap_or(heuristic.facts.has_physical_impacts),
        has_building_survey: raw
            .building_survey
            .unwrap_or(heuristic.facts.has_building_survey),
        is_linear_object: raw.linear_object.unwrap_or(heuristic.facts.is_linear_object),
        has_radon_flux: raw.radon_flux.unwrap_or(heuristic.facts.has_radon_flux),
        has_gas_geochemistry: raw
            .gas_geochemistry
            .unwrap_or(heuristic.facts.has_gas_geochemistry),
    };

    let area_m2 = raw
        .area_m2
        .as_ref()
        .and_then(|v| value_to_f64(v, "area_m2", issues))
        .or(heuristic.area_m2);
    let route_length_km = raw
        .route_length_km
        .as_ref()
        .and_then(|v| value_to_f64(v, "route_length_km", issues))
        .or(heuristic.route_length_km);
    let observation_points = raw
        .observation_points
        .as_ref()
        .and_then(|v| value_to_f64(v, "observation_points", issues))
        .map(|n| n.round() as u32)
        .or(heuristic.observation_points);

    let soil_layers = match raw.soil_layers {
        Some(raw_layers) => {
            let mut layers = Vec::new();
            for (i, layer) in raw_layers.iter().enumerate() {
                let from = value_to_f64(&layer.depth_from, &format!("soil_layers[{i}].depth_from"), issues);
                let to = value_to_f64(&layer.depth_to, &format!("soil_layers[{i}].depth_to"), issues);
                if let (Some(depth_from), Some(depth_to)) = (from, to) {
                    layers.push(SoilLayer {
                        depth_from,
                        depth_to,
                        sample_count: layer.sample_count,
                        platform_numbers: layer.platform_numbers.clone(),
                    });
                }
            }
            layers
        }
        None => heuristic.soil_layers,
    };

    ExtractedData {
        facts,
        soil_layers,
        area_m2,
        route_length_km,
        observation_points,
        object_name: raw.object_name.or(heuristic.object_name),
        object_location: raw.object_location.or(heuristic.object_location),
    }
}
