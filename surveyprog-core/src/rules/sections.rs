//! Declarative rule tables, one per document section.
//!
//! Business rules live here as data: when a fact is absent, the
//! region that describes the corresponding work is deleted; summary
//! paragraphs are rewritten from composed variables. The interpreter
//! in `engine.rs` is the only code that executes these.

use super::engine::{FactKey, RuleSpec, SectionRules};

pub fn declarative_tables() -> Vec<SectionRules> {
    vec![
        general_info(),
        sampling(),
        physical_impacts(),
        building_survey(),
        radon_and_gas(),
    ]
}

fn general_info() -> SectionRules {
    SectionRules {
        name: "GeneralInfo".to_string(),
        rules: vec![
            RuleSpec::replace_always("object_name", "{object_name}"),
            RuleSpec::replace_always("object_location", "{object_location}"),
        ],
    }
}

fn sampling() -> SectionRules {
    SectionRules {
        name: "Sampling".to_string(),
        rules: vec![
            RuleSpec::remove_unless("surface_water_sampling", FactKey::SurfaceWater),
            RuleSpec::remove_unless("ground_water_sampling", FactKey::GroundWater),
            RuleSpec::remove_unless("sediment_sampling", FactKey::SedimentSampling),
            RuleSpec::remove_unless("air_sampling_intro", FactKey::AirSampling),
            RuleSpec::remove_unless("air_sampling_method", FactKey::AirSampling),
            RuleSpec::replace_always("sampling_summary", "{sampling_summary}"),
        ],
    }
}

fn physical_impacts() -> SectionRules {
    SectionRules {
        name: "PhysicalImpacts".to_string(),
        rules: vec![
            RuleSpec::remove_unless("physical_impacts_intro", FactKey::PhysicalImpacts),
            RuleSpec::remove_unless("physical_impacts_method", FactKey::PhysicalImpacts),
        ],
    }
}

fn building_survey() -> SectionRules {
    SectionRules {
        name: "BuildingSurvey".to_string(),
        rules: vec![RuleSpec::remove_unless(
            "building_survey",
            FactKey::BuildingSurvey,
        )],
    }
}

fn radon_and_gas() -> SectionRules {
    SectionRules {
        name: "RadonAndGas".to_string(),
        rules: vec![
            RuleSpec::remove_unless("radon_flux", FactKey::RadonFlux),
            RuleSpec::remove_row_unless("radon_schedule_row", FactKey::RadonFlux),
            RuleSpec::remove_unless("gas_geochemistry", FactKey::GasGeochemistry),
        ],
    }
}

/// Work-item vocabulary for the scope-of-work table: a row whose title
/// contains one of these fragments survives when the paired fact holds.
/// `None` marks baseline activities every survey carries.
pub fn work_item_vocabulary() -> Vec<(Option<FactKey>, Vec<&'static str>)> {
    vec![
        (None, vec!["reconnaissance", "soil"]),
        (Some(FactKey::SurfaceWater), vec!["surface water"]),
        (Some(FactKey::GroundWater), vec!["groundwater", "ground water"]),
        (Some(FactKey::SedimentSampling), vec!["sediment"]),
        (Some(FactKey::AirSampling), vec!["air"]),
        (
            Some(FactKey::PhysicalImpacts),
            vec!["noise", "vibration", "electromagnetic", "physical impact"],
        ),
        (Some(FactKey::BuildingSurvey), vec!["building"]),
        (Some(FactKey::RadonFlux), vec!["radon"]),
        (Some(FactKey::GasGeochemistry), vec!["gas", "methane"]),
        (Some(FactKey::WaterSampling), vec!["water analysis"]),
    ]
}
