//! Flag/Data Merger
//!
//! A generation run may draw on several source documents — a primary
//! order plus supplementary orders. Their extractions are combined into
//! one consistent fact set before any rule executor runs: booleans by
//! logical OR, soil layers keyed by depth interval, scalars first-wins
//! in source order (the primary order leads the list).

use crate::types::{ExtractedData, FactSet, SoilLayer};
use std::collections::BTreeMap;

/// OR-fold of fact sets. Order-independent and idempotent.
pub fn merge_fact_sets(sources: &[FactSet]) -> FactSet {
    sources
        .iter()
        .fold(FactSet::default(), |acc, facts| acc.or(facts))
}

/// Depth intervals compare by centimetre so 1.0 and 1.000001 from two
/// parsers of the same order line land in one bucket.
fn depth_key(layer: &SoilLayer) -> (i64, i64) {
    (
        (layer.depth_from * 100.0).round() as i64,
        (layer.depth_to * 100.0).round() as i64,
    )
}

/// Merge soil-layer lists by `(depth_from, depth_to)`: collisions sum
/// sample counts and union platform numbers. Output sorted by
/// `depth_from`.
pub fn merge_soil_layers(lists: &[Vec<SoilLayer>]) -> Vec<SoilLayer> {
    let mut by_depth: BTreeMap<(i64, i64), SoilLayer> = BTreeMap::new();
    for layer in lists.iter().flatten() {
        by_depth
            .entry(depth_key(layer))
            .and_modify(|existing| {
                existing.sample_count += layer.sample_count;
                for &p in &layer.platform_numbers {
                    if !existing.platform_numbers.contains(&p) {
                        existing.platform_numbers.push(p);
                    }
                }
            })
            .or_insert_with(|| layer.clone());
    }
    let mut merged: Vec<SoilLayer> = by_depth.into_values().collect();
    for layer in &mut merged {
        layer.platform_numbers.sort_unstable();
    }
    merged
}

/// Deepest investigated horizon across the merged layers, metres.
pub fn max_depth(layers: &[SoilLayer]) -> f64 {
    layers.iter().map(|l| l.depth_to).fold(0.0, f64::max)
}

/// Merge full extractions from multiple sources into the one record
/// the rule executors read.
pub fn merge_extracted(sources: &[ExtractedData]) -> ExtractedData {
    let facts =
        merge_fact_sets(&sources.iter().map(|s| s.facts).collect::<Vec<_>>());
    let soil_layers = merge_soil_layers(
        &sources
            .iter()
            .map(|s| s.soil_layers.clone())
            .collect::<Vec<_>>(),
    );

    let first = |pick: fn(&ExtractedData) -> Option<f64>| sources.iter().find_map(pick);
    ExtractedData {
        facts,
        soil_layers,
        area_m2: first(|s| s.area_m2),
        route_length_km: first(|s| s.route_length_km),
        observation_points: sources.iter().find_map(|s| s.observation_points),
        object_name: sources.iter().find_map(|s| s.object_name.clone()),
        object_location: sources.iter().find_map(|s| s.object_location.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fact_merge_is_or() {
        let a = FactSet {
            has_air_sampling: true,
            ..FactSet::default()
        };
        let b = FactSet {
            has_building_survey: true,
            ..FactSet::default()
        };
        let merged = merge_fact_sets(&[a, b]);
        assert!(merged.has_air_sampling);
        assert!(merged.has_building_survey);
        assert!(!merged.has_radon_flux);
    }

    #[test]
    fn test_fact_merge_commutative_and_idempotent() {
        let a = FactSet {
            has_surface_water: true,
            is_linear_object: true,
            ..FactSet::default()
        };
        let b = FactSet {
            has_sediment_sampling: true,
            ..FactSet::default()
        };
        assert_eq!(merge_fact_sets(&[a, b]), merge_fact_sets(&[b, a]));
        assert_eq!(merge_fact_sets(&[a, a, b]), merge_fact_sets(&[a, b]));
        // Associativity: fold grouping does not matter.
        let ab_then = merge_fact_sets(&[merge_fact_sets(&[a, b]), b]);
        let then_bb = merge_fact_sets(&[a, merge_fact_sets(&[b, b])]);
        assert_eq!(ab_then, then_bb);
    }

    #[test]
    fn test_soil_layer_merge_sums_collisions() {
        let a = vec![SoilLayer::new(0.2, 1.0, 5)];
        let b = vec![SoilLayer::new(0.2, 1.0, 3), SoilLayer::new(1.0, 2.0, 2)];
        let merged = merge_soil_layers(&[a, b]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].depth_from, 0.2);
        assert_eq!(merged[0].sample_count, 8);
        assert_eq!(merged[1].depth_from, 1.0);
        assert_eq!(merged[1].sample_count, 2);
    }

    #[test]
    fn test_soil_layer_merge_unions_platforms() {
        let mut a = SoilLayer::new(0.0, 0.2, 1);
        a.platform_numbers = vec![3, 1];
        let mut b = SoilLayer::new(0.0, 0.2, 1);
        b.platform_numbers = vec![2, 3];
        let merged = merge_soil_layers(&[vec![a], vec![b]]);
        assert_eq!(merged[0].platform_numbers, vec![1, 2, 3]);
        assert_eq!(merged[0].sample_count, 2);
    }

    #[test]
    fn test_max_depth() {
        let layers = vec![SoilLayer::new(0.2, 1.0, 5), SoilLayer::new(1.0, 2.0, 2)];
        assert_eq!(max_depth(&layers), 2.0);
        assert_eq!(max_depth(&[]), 0.0);
    }

    #[test]
    fn test_merge_extracted_scalars_first_wins() {
        let primary = ExtractedData {
            area_m2: Some(7700.0),
            object_name: Some("Substation site".to_string()),
            ..ExtractedData::default()
        };
        let supplement = ExtractedData {
            area_m2: Some(9999.0),
            route_length_km: Some(1.2),
            ..ExtractedData::default()
        };
        let merged = merge_extracted(&[primary, supplement]);
        assert_eq!(merged.area_m2, Some(7700.0));
        assert_eq!(merged.route_length_km, Some(1.2));
        assert_eq!(merged.object_name.as_deref(), Some("Substation site"));
    }
}
