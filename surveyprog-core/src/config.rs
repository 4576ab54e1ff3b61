use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;

// Default value functions for serde
fn default_true() -> bool {
    true
}

/// Top-level assembly configuration.
///
/// The region map is core configuration, not something derived at run
/// time: the shipped template and this mapping are versioned together,
/// and the compiled-in defaults below describe the template as
/// authored. A YAML file can override any part of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyConfig {
    /// Pipeline configuration - which sections run and in what order
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Business meaning → stable region identifier mapping
    #[serde(default)]
    pub regions: RegionMap,
    /// Scope-of-work table configuration
    #[serde(default)]
    pub worksheet: WorksheetConfig,
    /// Run the final whole-document style normalizer
    #[serde(default = "default_true")]
    pub normalize_styles: bool,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            regions: RegionMap::default(),
            worksheet: WorksheetConfig::default(),
            normalize_styles: true,
        }
    }
}

impl AssemblyConfig {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("reading config file {path}"))?;
        let config: AssemblyConfig =
            serde_yaml::from_str(&contents).with_context(|| format!("parsing config {path}"))?;
        Ok(config)
    }

    /// Load from a path when given, fall back to defaults otherwise.
    pub fn load_with_fallback(path: Option<&str>) -> Self {
        match path {
            Some(p) => Self::load_from_file(p).unwrap_or_else(|e| {
                println!("⚠️  Failed to load config from {p}: {e}. Using defaults.");
                Self::default()
            }),
            None => Self::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Sections to run, in order
    pub sections: Vec<SectionConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionConfig {
    /// Name of the section rule set
    pub name: String,
    /// Whether this section is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl SectionConfig {
    fn enabled(name: &str) -> Self {
        Self {
            name: name.to_string(),
            enabled: true,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sections: vec![
                SectionConfig::enabled("GeneralInfo"),
                SectionConfig::enabled("Sampling"),
                SectionConfig::enabled("PhysicalImpacts"),
                SectionConfig::enabled("BuildingSurvey"),
                SectionConfig::enabled("RadonAndGas"),
                SectionConfig::enabled("Worksheet"),
                SectionConfig::enabled("Quantities"),
            ],
        }
    }
}

/// Business meaning → stable region identifier.
///
/// Paragraph values are `w14:paraId` hex strings; anchor values are
/// literal text fragments used where no stable identifier exists
/// (tables). Rule tables refer to regions by meaning only, so a
/// re-authored template needs edits here and nowhere else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionMap {
    pub paragraphs: BTreeMap<String, String>,
    pub anchors: BTreeMap<String, String>,
}

impl RegionMap {
    pub fn paragraph_id(&self, meaning: &str) -> Option<&str> {
        self.paragraphs.get(meaning).map(String::as_str)
    }

    pub fn anchor(&self, meaning: &str) -> Option<&str> {
        self.anchors.get(meaning).map(String::as_str)
    }
}

impl Default for RegionMap {
    fn default() -> Self {
        let paragraphs: BTreeMap<String, String> = [
            ("object_name", "12E07A41"),
            ("object_location", "58D3B9C2"),
            ("surface_water_sampling", "6F1482AD"),
            ("ground_water_sampling", "7B29C3E5"),
            ("sediment_sampling", "0A66D14F"),
            ("air_sampling_intro", "2D9E5B70"),
            ("air_sampling_method", "31C8F6A2"),
            ("sampling_summary", "2F70B841"),
            ("physical_impacts_intro", "44B07D19"),
            ("physical_impacts_method", "5E92A3C7"),
            ("building_survey", "688F10DE"),
            ("radon_flux", "71A4E9B3"),
            ("radon_schedule_row", "7E55AB10"),
            ("gas_geochemistry", "7C3D52F8"),
            ("route_length", "05B8E64A"),
            ("observation_points", "19F2C07D"),
            ("soil_layers", "23A6D95E"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let anchors: BTreeMap<String, String> = [("worksheet", "Types and volumes of work")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        Self { paragraphs, anchors }
    }
}

// Default vocabularies for row classification

fn default_major_section_labels() -> Vec<String> {
    vec![
        "field work".to_string(),
        "laboratory work".to_string(),
        "office work".to_string(),
    ]
}

fn default_always_keep_labels() -> Vec<String> {
    vec![
        "technical report preparation".to_string(),
        "program preparation".to_string(),
    ]
}

/// Configuration of the scope-of-work table section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorksheetConfig {
    /// Region-map anchor meaning that locates the table
    #[serde(default = "default_worksheet_anchor_meaning")]
    pub anchor_meaning: String,
    /// Row titles recognized as major section labels (lowercase)
    #[serde(default = "default_major_section_labels")]
    pub major_section_labels: Vec<String>,
    /// Row titles that must survive filtering regardless (lowercase)
    #[serde(default = "default_always_keep_labels")]
    pub always_keep_labels: Vec<String>,
}

fn default_worksheet_anchor_meaning() -> String {
    "worksheet".to_string()
}

impl Default for WorksheetConfig {
    fn default() -> Self {
        Self {
            anchor_meaning: default_worksheet_anchor_meaning(),
            major_section_labels: default_major_section_labels(),
            always_keep_labels: default_always_keep_labels(),
        }
    }
}
