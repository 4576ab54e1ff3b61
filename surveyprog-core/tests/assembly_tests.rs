//! End-to-end assembly tests over an inline template fixture.
//!
//! The fixture mirrors the shipped template's shape: one paragraph per
//! mapped region (ids from the default region map), draft-marked with
//! highlights and colored text, plus the scope-of-work table with its
//! anchor caption row. Tests assert the boundaries: conditional
//! removal, table filtering, quantity fills, style normalization, and
//! degraded-but-valid output when regions are missing.

use surveyprog_core::config::AssemblyConfig;
use surveyprog_core::types::{ExtractedData, FactSet, SoilLayer};
use surveyprog_core::{AssemblyIssue, ProgramAssembler};

// ============================================================================
// Fixture helpers
// ============================================================================

fn para(id: &str, text: &str) -> String {
    format!(
        "<w:p w14:paraId=\"{id}\"><w:pPr><w:jc w:val=\"both\"/></w:pPr>\
         <w:r><w:rPr><w:sz w:val=\"24\"/><w:color w:val=\"FF0000\"/>\
         <w:highlight w:val=\"yellow\"/></w:rPr><w:t>{text}</w:t></w:r></w:p>"
    )
}

fn plain_para(text: &str) -> String {
    format!("<w:p><w:r><w:t>{text}</w:t></w:r></w:p>")
}

fn cell(text: &str, para_id: u32) -> String {
    format!(
        "<w:tc><w:p w14:paraId=\"{para_id:08X}\"><w:r><w:t>{text}</w:t></w:r></w:p></w:tc>"
    )
}

fn work_row(title: &str, unit: &str, qty: &str, id_base: u32) -> String {
    format!(
        "<w:tr>{}{}{}{}</w:tr>",
        cell(title, id_base),
        cell("", id_base + 1),
        cell(unit, id_base + 2),
        cell(qty, id_base + 3),
    )
}

fn label_row(title: &str, id_base: u32) -> String {
    format!(
        "<w:tr>{}<w:tc><w:p/></w:tc><w:tc><w:p/></w:tc><w:tc><w:p/></w:tc></w:tr>",
        cell(title, id_base)
    )
}

fn worksheet_table() -> String {
    let mut t = String::from("<w:tbl><w:tblPr><w:tblStyle w:val=\"Grid\"/></w:tblPr><w:tblGrid/>");
    t.push_str(&label_row("Types and volumes of work", 0x10));
    t.push_str("<w:tr>");
    for (i, n) in ["1", "2", "3", "4"].iter().enumerate() {
        t.push_str(&cell(n, 0x20 + i as u32));
    }
    t.push_str("</w:tr>");
    t.push_str(&label_row("Field work", 0x30));
    t.push_str(&work_row("Reconnaissance survey along the route", "km", "—", 0x100));
    t.push_str(&work_row("Soil sampling for chemical analysis", "sample", "—", 0x200));
    t.push_str(&work_row("Surface water sampling", "sample", "—", 0x300));
    t.push_str(&work_row("Bottom sediment sampling", "sample", "—", 0x400));
    t.push_str(&work_row("Atmospheric air sampling", "sample", "—", 0x500));
    t.push_str(&work_row("Radon flux density measurement", "point", "—", 0x600));
    t.push_str(&label_row("Laboratory work", 0x40));
    t.push_str(&work_row("Surface water analysis", "sample", "—", 0x700));
    t.push_str(&label_row("Office work", 0x50));
    t.push_str(&work_row("Technical report preparation", "pcs", "1", 0x800));
    t.push_str("</w:tbl>");
    t
}

/// Small deliverables table holding the row-mapped radon region.
fn schedule_table(radon_row_id: &str) -> String {
    format!(
        "<w:tbl><w:tblPr/>\
         <w:tr><w:tc><w:p><w:r><w:t>Deliverables schedule</w:t></w:r></w:p></w:tc></w:tr>\
         <w:tr><w:tc><w:p w14:paraId=\"{radon_row_id}\"><w:r><w:t>Radon flux report annex</w:t></w:r></w:p></w:tc></w:tr>\
         <w:tr><w:tc><w:p><w:r><w:t>Main report volume</w:t></w:r></w:p></w:tc></w:tr>\
         </w:tbl>"
    )
}

/// Template with one paragraph per mapped region plus both tables.
fn template() -> String {
    let config = AssemblyConfig::default();
    let region_text = |meaning: &str| format!("Template wording for {meaning}.");

    let mut doc = String::from("<w:document><w:body>");
    doc.push_str(&plain_para("Engineering survey program"));
    for (meaning, id) in &config.regions.paragraphs {
        if meaning == "radon_schedule_row" {
            continue; // lives inside the schedule table below
        }
        doc.push_str(&para(id, &region_text(meaning)));
    }
    doc.push_str(&worksheet_table());
    doc.push_str(&schedule_table(
        config.regions.paragraph_id("radon_schedule_row").unwrap(),
    ));
    doc.push_str(&plain_para("Appendix A is attached unchanged."));
    doc.push_str("</w:body></w:document>");
    doc
}

fn facts_with_water_and_radon() -> ExtractedData {
    ExtractedData {
        facts: FactSet {
            has_surface_water: true,
            has_sediment_sampling: true,
            has_radon_flux: true,
            ..FactSet::default()
        },
        area_m2: Some(7700.0),
        soil_layers: vec![SoilLayer::new(0.2, 1.0, 5), SoilLayer::new(1.0, 2.0, 2)],
        object_name: Some("Substation 110/10 kV".to_string()),
        object_location: Some("Northern industrial zone".to_string()),
        ..ExtractedData::default()
    }
}

fn region_id(meaning: &str) -> String {
    AssemblyConfig::default()
        .regions
        .paragraph_id(meaning)
        .unwrap()
        .to_string()
}

// ============================================================================
// Conditional section rules
// ============================================================================

mod conditional_sections {
    use super::*;

    #[test]
    fn absent_facts_remove_their_paragraphs() {
        let output = ProgramAssembler::new()
            .assemble(&template(), &[facts_with_water_and_radon()])
            .unwrap();

        for gone in [
            "ground_water_sampling",
            "air_sampling_intro",
            "air_sampling_method",
            "physical_impacts_intro",
            "physical_impacts_method",
            "building_survey",
            "gas_geochemistry",
        ] {
            assert!(
                !output.document.contains(&region_id(gone)),
                "paragraph '{gone}' should have been removed"
            );
        }
    }

    #[test]
    fn schedule_row_follows_its_fact() {
        // With radon planned the deliverables row stays...
        let with_radon = ProgramAssembler::new()
            .assemble(&template(), &[facts_with_water_and_radon()])
            .unwrap();
        assert!(with_radon.document.contains("Radon flux report annex"));

        // ...without it the whole <w:tr> disappears, neighbors intact.
        let mut data = facts_with_water_and_radon();
        data.facts.has_radon_flux = false;
        let without = ProgramAssembler::new().assemble(&template(), &[data]).unwrap();
        assert!(!without.document.contains("Radon flux report annex"));
        assert!(without.document.contains("Deliverables schedule"));
        assert!(without.document.contains("Main report volume"));
    }

    #[test]
    fn present_facts_keep_their_paragraphs() {
        let output = ProgramAssembler::new()
            .assemble(&template(), &[facts_with_water_and_radon()])
            .unwrap();

        for kept in ["surface_water_sampling", "sediment_sampling", "radon_flux"] {
            assert!(
                output.document.contains(&region_id(kept)),
                "paragraph '{kept}' should have survived"
            );
        }
    }

    #[test]
    fn general_info_is_rewritten_from_extraction() {
        let output = ProgramAssembler::new()
            .assemble(&template(), &[facts_with_water_and_radon()])
            .unwrap();
        assert!(output.document.contains("Substation 110/10 kV"));
        assert!(output.document.contains("Northern industrial zone"));
    }

    #[test]
    fn missing_object_name_leaves_template_wording() {
        let data = ExtractedData {
            area_m2: Some(7700.0),
            ..ExtractedData::default()
        };
        let output = ProgramAssembler::new().assemble(&template(), &[data]).unwrap();
        assert!(output
            .document
            .contains("Template wording for object_name."));
    }

    #[test]
    fn sampling_summary_sentence_reflects_facts() {
        let output = ProgramAssembler::new()
            .assemble(&template(), &[facts_with_water_and_radon()])
            .unwrap();
        assert!(output.document.contains("surface water, bottom sediment"));
    }
}

// ============================================================================
// Worksheet table filtering
// ============================================================================

mod worksheet_filtering {
    use super::*;

    #[test]
    fn unjustified_work_rows_are_removed() {
        let output = ProgramAssembler::new()
            .assemble(&template(), &[facts_with_water_and_radon()])
            .unwrap();
        assert!(!output.document.contains("Atmospheric air sampling"));
        assert!(output.document.contains("Surface water sampling"));
        assert!(output.document.contains("Bottom sediment sampling"));
        assert!(output.document.contains("Radon flux density measurement"));
    }

    #[test]
    fn section_header_with_surviving_rows_is_kept_in_order() {
        let output = ProgramAssembler::new()
            .assemble(&template(), &[facts_with_water_and_radon()])
            .unwrap();
        let doc = &output.document;
        let field = doc.find("Field work").expect("field section kept");
        let recon = doc.find("Reconnaissance").expect("baseline row kept");
        let lab = doc.find("Laboratory work").expect("lab section kept");
        let office = doc.find("Technical report preparation").expect("report row kept");
        assert!(field < recon && recon < lab && lab < office, "original row order preserved");
    }

    #[test]
    fn empty_section_disappears_entirely() {
        // No water facts at all: the laboratory section has no
        // surviving rows and its header must go with them.
        let data = ExtractedData {
            area_m2: Some(7700.0),
            ..ExtractedData::default()
        };
        let output = ProgramAssembler::new().assemble(&template(), &[data]).unwrap();
        assert!(!output.document.contains("Laboratory work"));
        assert!(!output.document.contains("Surface water analysis"));
        assert!(output.document.contains("Field work"));
    }

    #[test]
    fn quantity_cells_are_filled() {
        let output = ProgramAssembler::new()
            .assemble(&template(), &[facts_with_water_and_radon()])
            .unwrap();
        // Areal site of 0.77 ha → 0.3 km traverse; 7 soil samples.
        assert!(output.document.contains(">0.3<"));
        assert!(output.document.contains(">7<"));
    }
}

// ============================================================================
// Derived quantities
// ============================================================================

mod quantity_fills {
    use super::*;

    #[test]
    fn route_and_observation_sentences_use_estimates() {
        let output = ProgramAssembler::new()
            .assemble(&template(), &[facts_with_water_and_radon()])
            .unwrap();
        assert!(output.document.contains("0.3 km"));
        assert!(output.document.contains("2 observation point(s)"));
    }

    #[test]
    fn linear_object_prefers_stated_length() {
        let mut data = facts_with_water_and_radon();
        data.facts.is_linear_object = true;
        data.route_length_km = Some(2.65);
        let output = ProgramAssembler::new().assemble(&template(), &[data]).unwrap();
        assert!(output.document.contains("2.7 km"));
    }

    #[test]
    fn soil_horizons_are_listed() {
        let output = ProgramAssembler::new()
            .assemble(&template(), &[facts_with_water_and_radon()])
            .unwrap();
        assert!(output
            .document
            .contains("0.2–1.0 m (5 samples), 1.0–2.0 m (2 samples)"));
        assert!(output.document.contains("total investigation depth 2.0 m"));
    }
}

// ============================================================================
// Style normalization
// ============================================================================

mod style_normalization {
    use super::*;

    #[test]
    fn no_draft_markup_survives_assembly() {
        let output = ProgramAssembler::new()
            .assemble(&template(), &[facts_with_water_and_radon()])
            .unwrap();
        assert!(!output.document.contains("w:highlight"));
        assert!(!output.document.contains("FF0000"));
    }

    #[test]
    fn untargeted_regions_are_byte_identical() {
        let output = ProgramAssembler::new()
            .assemble(&template(), &[facts_with_water_and_radon()])
            .unwrap();
        // Plain paragraphs carry no draft markup and are untargeted:
        // they must come through byte-for-byte.
        assert!(output
            .document
            .contains(&plain_para("Engineering survey program")));
        assert!(output
            .document
            .contains(&plain_para("Appendix A is attached unchanged.")));
    }
}

// ============================================================================
// Degradation and the report
// ============================================================================

mod degradation {
    use super::*;

    #[test]
    fn clean_template_audits_clean() {
        let output = ProgramAssembler::new()
            .assemble(&template(), &[facts_with_water_and_radon()])
            .unwrap();
        assert!(output.report.missing_regions().is_empty());
        assert!(!output.report.template_fingerprint.is_empty());
        assert_eq!(output.report.sections.len(), 7);
    }

    #[test]
    fn drifted_template_degrades_but_completes() {
        // A template whose authoring tool regenerated every paraId:
        // no paragraph is addressable any more, yet assembly must still
        // produce a valid document and a report that says why.
        let mut drifted = template();
        for id in AssemblyConfig::default().regions.paragraphs.values() {
            // Rotate each id into a different, still-valid 8-hex id.
            drifted = drifted.replace(id, &format!("{}F", &id[1..]));
        }
        let output = ProgramAssembler::new()
            .assemble(&drifted, &[facts_with_water_and_radon()])
            .unwrap();
        assert!(!output.report.missing_regions().is_empty());
        // The table anchor text still resolves, so the worksheet ran;
        // every paragraph rule degraded to a no-op.
        assert!(output.document.contains("Types and volumes of work"));
        assert!(output.document.contains("Template wording for building_survey."));
    }

    #[test]
    fn missing_table_skips_worksheet_section_only() {
        let config = AssemblyConfig::default();
        let mut doc = String::from("<w:document><w:body>");
        for (meaning, id) in &config.regions.paragraphs {
            doc.push_str(&para(id, &format!("Template wording for {meaning}.")));
        }
        doc.push_str("</w:body></w:document>");

        let output = ProgramAssembler::new()
            .assemble(&doc, &[facts_with_water_and_radon()])
            .unwrap();
        // Worksheet reported missing, but paragraph sections still ran.
        assert!(output
            .report
            .issues
            .iter()
            .any(|i| matches!(i, AssemblyIssue::RegionNotFound { meaning, .. } if meaning == "worksheet")));
        assert!(output.document.contains("Substation 110/10 kV"));
        assert!(!output.document.contains(&region_id("building_survey")));
    }

    #[test]
    fn rerun_on_own_output_is_stable() {
        let assembler = ProgramAssembler::new();
        let sources = [facts_with_water_and_radon()];
        let first = assembler.assemble(&template(), &sources).unwrap();
        let second = assembler.assemble(&first.document, &sources).unwrap();
        assert_eq!(first.document, second.document);
    }

    #[test]
    fn fingerprint_tracks_template_revisions() {
        let a = ProgramAssembler::new()
            .assemble(&template(), &[ExtractedData::default()])
            .unwrap();
        let changed = template().replace("Appendix A", "Appendix B");
        let b = ProgramAssembler::new()
            .assemble(&changed, &[ExtractedData::default()])
            .unwrap();
        assert_ne!(a.report.template_fingerprint, b.report.template_fingerprint);
    }

    #[test]
    fn report_serializes_to_json() {
        let output = ProgramAssembler::new()
            .assemble(&template(), &[facts_with_water_and_radon()])
            .unwrap();
        let json = serde_json::to_string_pretty(&output.report).unwrap();
        assert!(json.contains("template_fingerprint"));
        assert!(json.contains("sections"));
    }
}
