//! Population-level ANC indicators.
//!
//! Each indicator with a measure is a ratio over the total number of visits,
//! classified against the definition's target. Definitions without a measure
//! (quality visits, birth preparedness, danger-sign education, postpartum
//! planning) are descriptive only.

use crate::{
    Catalog, IndicatorDefinition, IndicatorResult, IndicatorStatus, Measure, VisitRecord,
};

/// Compute every indicator in the catalog that has a measure, in id order
pub fn compute_indicators(catalog: &Catalog, visits: &[VisitRecord]) -> Vec<IndicatorResult> {
    let results: Vec<IndicatorResult> = catalog
        .indicators
        .values()
        .filter_map(|def| {
            let measure = def.measure.as_ref()?;
            let numerator = visits
                .iter()
                .filter(|visit| satisfies(measure, visit))
                .count();
            Some(classify(def, numerator, visits.len()))
        })
        .collect();

    tracing::info!(
        "Computed {} indicators over {} visits ({} met)",
        results.len(),
        visits.len(),
        results
            .iter()
            .filter(|r| r.status == IndicatorStatus::Met)
            .count()
    );

    results
}

/// Build the result for one indicator from its counts
pub fn classify(def: &IndicatorDefinition, numerator: usize, denominator: usize) -> IndicatorResult {
    let (percentage, status) = if denominator == 0 {
        (0.0, IndicatorStatus::NoData)
    } else {
        let percentage = numerator as f64 / denominator as f64 * 100.0;
        let status = if percentage >= def.target {
            IndicatorStatus::Met
        } else {
            IndicatorStatus::NotMet
        };
        (percentage, status)
    };

    tracing::debug!(
        "{}: {}/{} = {:.2}% (target {}) -> {}",
        def.id,
        numerator,
        denominator,
        percentage,
        def.target,
        status
    );

    IndicatorResult {
        id: def.id.clone(),
        name: def.name.clone(),
        numerator,
        denominator,
        percentage,
        target: def.target,
        status,
    }
}

fn screening_resolved(done: Option<bool>, result: Option<&str>) -> bool {
    done == Some(true) && result.is_some_and(|r| !r.is_empty() && r != "pending")
}

fn satisfies(measure: &Measure, visit: &VisitRecord) -> bool {
    match measure {
        Measure::EarlyInitiation { before_week } => visit
            .gestation_weeks
            .is_some_and(|w| w > 0 && w < *before_week),
        Measure::FourPlusVisits { min_visit_number } => visit
            .visit_number
            .is_some_and(|n| n >= *min_visit_number),
        Measure::HivTested => screening_resolved(visit.hiv_test_done, visit.hiv_test_result.as_deref()),
        Measure::SyphilisScreened => screening_resolved(
            visit.syphilis_test_done,
            visit.syphilis_test_result.as_deref(),
        ),
        Measure::IronSupplemented => visit.iron_supplement_given == Some(true),
        Measure::TetanusImmunized { min_doses } => {
            visit.tetanus_toxoid_given == Some(true)
                && visit.tetanus_toxoid_dose.is_some_and(|d| d >= *min_doses)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_default_catalog;

    fn result<'a>(results: &'a [IndicatorResult], id: &str) -> &'a IndicatorResult {
        results
            .iter()
            .find(|r| r.id == id)
            .unwrap_or_else(|| panic!("missing indicator {}", id))
    }

    fn hiv_visit(resolved: bool) -> VisitRecord {
        VisitRecord {
            hiv_test_done: Some(true),
            hiv_test_result: Some(if resolved { "negative" } else { "pending" }.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_all_measured_indicators_reported_in_order() {
        let catalog = build_default_catalog();
        let results = compute_indicators(&catalog, &[VisitRecord::default()]);
        let ids: Vec<_> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "ANC.IND.01",
                "ANC.IND.02",
                "ANC.IND.04",
                "ANC.IND.05",
                "ANC.IND.06",
                "ANC.IND.07",
            ]
        );
    }

    #[test]
    fn test_no_visits_means_no_data() {
        let catalog = build_default_catalog();
        let results = compute_indicators(&catalog, &[]);

        assert!(!results.is_empty());
        for r in &results {
            assert_eq!(r.status, IndicatorStatus::NoData, "{}", r.id);
            assert_eq!(r.percentage, 0.0);
            assert_eq!(r.denominator, 0);
        }
    }

    #[test]
    fn test_hiv_coverage_below_target() {
        let catalog = build_default_catalog();
        let mut visits: Vec<_> = (0..9).map(|_| hiv_visit(true)).collect();
        visits.push(hiv_visit(false));

        let results = compute_indicators(&catalog, &visits);
        let hiv = result(&results, "ANC.IND.04");

        assert_eq!(hiv.numerator, 9);
        assert_eq!(hiv.denominator, 10);
        assert!((hiv.percentage - 90.0).abs() < f64::EPSILON);
        assert_eq!(hiv.target, 95.0);
        assert_eq!(hiv.status, IndicatorStatus::NotMet);
    }

    #[test]
    fn test_target_comparison_is_inclusive() {
        let catalog = build_default_catalog();
        let def = catalog.indicator("ANC.IND.06").unwrap();

        assert_eq!(classify(def, 9, 10).status, IndicatorStatus::Met);
        assert_eq!(classify(def, 8, 10).status, IndicatorStatus::NotMet);
    }

    #[test]
    fn test_percentage_is_unrounded() {
        let catalog = build_default_catalog();
        let def = catalog.indicator("ANC.IND.01").unwrap();
        let r = classify(def, 1, 3);
        assert!((r.percentage - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_visit_level_predicates() {
        let catalog = build_default_catalog();
        let visits = vec![
            VisitRecord {
                visit_number: Some(1),
                gestation_weeks: Some(10),
                iron_supplement_given: Some(true),
                tetanus_toxoid_given: Some(true),
                tetanus_toxoid_dose: Some(2),
                syphilis_test_done: Some(true),
                syphilis_test_result: Some("negative".into()),
                ..Default::default()
            },
            VisitRecord {
                visit_number: Some(4),
                gestation_weeks: Some(12),
                tetanus_toxoid_given: Some(true),
                tetanus_toxoid_dose: Some(1),
                syphilis_test_done: Some(true),
                ..Default::default()
            },
            VisitRecord {
                visit_number: Some(5),
                gestation_weeks: None,
                ..Default::default()
            },
        ];

        let results = compute_indicators(&catalog, &visits);
        let numerator = |id: &str| result(&results, id).numerator;

        assert_eq!(numerator("ANC.IND.01"), 1);
        assert_eq!(numerator("ANC.IND.02"), 2);
        assert_eq!(numerator("ANC.IND.05"), 1);
        assert_eq!(numerator("ANC.IND.06"), 1);
        assert_eq!(numerator("ANC.IND.07"), 1);
        assert!(results.iter().all(|r| r.denominator == 3));
    }

    #[test]
    fn test_descriptive_indicators_not_computed() {
        let catalog = build_default_catalog();
        let visits = vec![VisitRecord {
            visit_number: Some(1),
            plan_of_care: Some("Birth at facility; postpartum visit day 3".into()),
            provider_notes: Some("Reviewed danger signs".into()),
            ..Default::default()
        }];

        let results = compute_indicators(&catalog, &visits);
        for id in ["ANC.IND.03", "ANC.IND.08", "ANC.IND.09", "ANC.IND.10"] {
            assert!(catalog.indicator(id).is_some(), "{} missing from catalog", id);
            assert!(results.iter().all(|r| r.id != id), "{} was computed", id);
        }
    }

    #[test]
    fn test_indicators_without_measure_are_skipped() {
        let mut catalog = build_default_catalog();
        catalog.indicators.get_mut("ANC.IND.06").unwrap().measure = None;

        let results = compute_indicators(&catalog, &[]);
        assert_eq!(results.len(), 5);
        assert!(results.iter().all(|r| r.id != "ANC.IND.06"));
    }

    #[test]
    fn test_compute_is_idempotent() {
        let catalog = build_default_catalog();
        let visits: Vec<_> = (0..4).map(|i| hiv_visit(i % 2 == 0)).collect();

        let first = compute_indicators(&catalog, &visits);
        let second = compute_indicators(&catalog, &visits);
        assert_eq!(first, second);
    }
}
