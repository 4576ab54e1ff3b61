use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::error::AssemblyIssue;

// ===== MARKUP ADDRESSING TYPES =====
// The engine never builds a DOM. Every addressable region is a byte
// range into the raw WordprocessingML string, located once and spliced.

/// Half-open byte range `[start, end)` into the markup blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Slice the document to this span.
    pub fn slice<'a>(&self, doc: &'a str) -> &'a str {
        &doc[self.start..self.end]
    }
}

// ===== TABLE ROW MODEL =====

/// Classification of one table row, decided in rule order by the
/// decomposer (see `decompose::classify_row`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowKind {
    /// The literal "1 / 2 / 3 / 4" column-number row.
    StructuralHeader,
    /// A recognized section label ("Field work", "Laboratory work", ...).
    MajorHeader,
    /// An internal group label with no unit column.
    SubHeader,
    /// Rows that survive filtering regardless ("Technical report preparation").
    AlwaysKeep,
    /// A billable/countable survey activity.
    WorkItem,
}

impl RowKind {
    /// Header rows never count as "content" when deciding whether a
    /// group label earned its place in the output.
    pub fn is_header(&self) -> bool {
        matches!(
            self,
            RowKind::StructuralHeader | RowKind::MajorHeader | RowKind::SubHeader
        )
    }
}

/// One decomposed table row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Row {
    /// Text of the longest non-blank cell.
    pub title: String,
    /// Text of the second-to-last cell.
    pub unit: String,
    /// paraId of the paragraph inside the last cell, when present.
    /// Used to rewrite the quantity and to delete the row by id.
    pub quantity_para_id: Option<String>,
    /// Position in the table's original row order.
    pub raw_index: usize,
    pub kind: RowKind,
    /// Absolute byte span of the whole `<w:tr>` element.
    pub span: Span,
}

/// Decomposition of a located table: everything before the first row,
/// the ordered rows, and everything after the last row (normally just
/// the table close tag).
#[derive(Debug, Clone)]
pub struct TableParts {
    /// Span of the whole `<w:tbl>` element.
    pub span: Span,
    pub prefix: Span,
    pub rows: Vec<Row>,
    pub suffix: Span,
    /// Rows skipped during decomposition (broken column shape).
    pub issues: Vec<AssemblyIssue>,
}

// ===== EXTRACTED FACTS =====

/// The fixed record of boolean facts that drives conditional inclusion
/// of document regions. Produced by a `FactExtractor`, merged across
/// sources with logical OR, read-only to the rule executors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactSet {
    pub has_surface_water: bool,
    pub has_ground_water: bool,
    pub has_sediment_sampling: bool,
    pub has_air_sampling: bool,
    pub has_physical_impacts: bool,
    pub has_building_survey: bool,
    pub is_linear_object: bool,
    pub has_radon_flux: bool,
    pub has_gas_geochemistry: bool,
}

impl FactSet {
    /// Water sampling is planned when either water kind is present.
    pub fn has_water_sampling(&self) -> bool {
        self.has_surface_water || self.has_ground_water
    }

    /// Logical OR with another fact set. Commutative, associative and
    /// idempotent, so merging the same source twice changes nothing.
    pub fn or(&self, other: &FactSet) -> FactSet {
        FactSet {
            has_surface_water: self.has_surface_water || other.has_surface_water,
            has_ground_water: self.has_ground_water || other.has_ground_water,
            has_sediment_sampling: self.has_sediment_sampling || other.has_sediment_sampling,
            has_air_sampling: self.has_air_sampling || other.has_air_sampling,
            has_physical_impacts: self.has_physical_impacts || other.has_physical_impacts,
            has_building_survey: self.has_building_survey || other.has_building_survey,
            is_linear_object: self.is_linear_object || other.is_linear_object,
            has_radon_flux: self.has_radon_flux || other.has_radon_flux,
            has_gas_geochemistry: self.has_gas_geochemistry || other.has_gas_geochemistry,
        }
    }
}

/// One soil layer described in an order document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilLayer {
    /// Top of the layer, metres below surface.
    pub depth_from: f64,
    /// Bottom of the layer, metres below surface.
    pub depth_to: f64,
    pub sample_count: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub platform_numbers: Vec<u32>,
}

impl SoilLayer {
    pub fn new(depth_from: f64, depth_to: f64, sample_count: u32) -> Self {
        Self {
            depth_from,
            depth_to,
            sample_count,
            platform_numbers: Vec::new(),
        }
    }
}

/// Everything one extractor run produced from one source document.
/// Multiple sources (a primary order plus supplements) are merged into
/// one before any rule executor runs — see `merge::merge_extracted`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractedData {
    pub facts: FactSet,
    pub soil_layers: Vec<SoilLayer>,
    /// Site area in square metres, when the source states one.
    pub area_m2: Option<f64>,
    /// Explicitly stated route length in kilometres.
    pub route_length_km: Option<f64>,
    /// Explicitly stated observation-point count.
    pub observation_points: Option<u32>,
    pub object_name: Option<String>,
    pub object_location: Option<String>,
}

impl ExtractedData {
    /// Site area in hectares, when known.
    pub fn area_ha(&self) -> Option<f64> {
        self.area_m2.map(|m2| m2 / 10_000.0)
    }
}

// ===== ASSEMBLY REPORT =====

/// Per-section outcome counters for the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionStats {
    pub name: String,
    /// Paragraphs or rows actually removed or rewritten.
    pub edits: usize,
    /// Regions that were targeted but missing (no-ops).
    pub skipped: usize,
    pub duration_ms: u64,
}

/// The run log that travels with every assembled document: which
/// regions were skipped and why, how long each section took, and a
/// fingerprint of the template the run saw. This is the user-visible
/// failure surface — the engine degrades, it does not abort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyReport {
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    /// sha256 of the template bytes. A template whose authoring tool
    /// regenerated its paraIds shows up here as a fingerprint change
    /// plus a burst of audit misses.
    pub template_fingerprint: String,
    pub issues: Vec<AssemblyIssue>,
    pub sections: Vec<SectionStats>,
    pub duration_ms: u64,
}

impl AssemblyReport {
    pub fn new(template_fingerprint: String) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            created_at: Utc::now(),
            template_fingerprint,
            issues: Vec::new(),
            sections: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn push_issue(&mut self, issue: AssemblyIssue) {
        self.issues.push(issue);
    }

    /// Regions reported missing, for quick inspection in tests and logs.
    pub fn missing_regions(&self) -> Vec<&str> {
        self.issues
            .iter()
            .filter_map(|issue| match issue {
                AssemblyIssue::RegionNotFound { meaning, .. } => Some(meaning.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Ordered set of surviving row indices — the resolver's output.
pub type KeepSet = BTreeSet<usize>;
