//! Decision support engine facade.
//!
//! Binds a guideline catalog to the three evaluations:
//! - Alerts per visit (decision points ANC.DT.*)
//! - Next contact recommendation (schedule ANC.S.*)
//! - Population indicators (ANC.IND.*)
//!
//! The engine holds only a shared reference to an immutable catalog, so one
//! instance can serve any number of threads.

use crate::catalog::get_default_catalog;
use crate::{
    alerts, indicators, schedule, Alert, Catalog, Evaluation, IndicatorResult, PregnancyRecord,
    VisitRecommendation, VisitRecord,
};

/// Guideline-bound evaluator
#[derive(Clone, Copy, Debug)]
pub struct Engine<'c> {
    catalog: &'c Catalog,
}

impl Default for Engine<'static> {
    fn default() -> Self {
        Engine::new(get_default_catalog())
    }
}

impl<'c> Engine<'c> {
    pub fn new(catalog: &'c Catalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &'c Catalog {
        self.catalog
    }

    /// Alerts for every visit, in visit order then decision-point order
    pub fn generate_alerts(&self, pregnancy: &PregnancyRecord, visits: &[VisitRecord]) -> Vec<Alert> {
        alerts::generate_alerts(self.catalog, pregnancy, visits)
    }

    pub fn recommend_next_visit(
        &self,
        pregnancy: &PregnancyRecord,
        visits: &[VisitRecord],
    ) -> VisitRecommendation {
        schedule::recommend_next_visit(self.catalog, pregnancy, visits)
    }

    pub fn compute_indicators(&self, visits: &[VisitRecord]) -> Vec<IndicatorResult> {
        indicators::compute_indicators(self.catalog, visits)
    }

    /// Run all three evaluations for one pregnancy
    pub fn evaluate(&self, pregnancy: &PregnancyRecord, visits: &[VisitRecord]) -> Evaluation {
        tracing::debug!(
            "Evaluating {} visits against catalog {}",
            visits.len(),
            self.catalog.version
        );

        Evaluation {
            alerts: self.generate_alerts(pregnancy, visits),
            recommendation: self.recommend_next_visit(pregnancy, visits),
            indicators: self.compute_indicators(visits),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{build_default_catalog, DangerSignsField, IndicatorStatus, RecordId};
    use chrono::NaiveDate;

    fn create_test_case() -> (PregnancyRecord, Vec<VisitRecord>) {
        let pregnancy = PregnancyRecord {
            pregnancy_id: Some(RecordId::Text("preg-7".into())),
            lmp_date: NaiveDate::from_ymd_opt(2025, 2, 3),
            ..Default::default()
        };
        let visits = vec![
            VisitRecord {
                anc_visit_id: Some(RecordId::Number(1)),
                visit_number: Some(1),
                gestation_weeks: Some(10),
                blood_pressure_systolic: Some(120),
                blood_pressure_diastolic: Some(80),
                hemoglobin_gdl: Some(10.2),
                hiv_test_done: Some(true),
                hiv_test_result: Some("negative".into()),
                ..Default::default()
            },
            VisitRecord {
                anc_visit_id: Some(RecordId::Number(2)),
                visit_number: Some(2),
                gestation_weeks: Some(21),
                blood_pressure_systolic: Some(142),
                blood_pressure_diastolic: Some(92),
                danger_signs_present: Some(true),
                danger_signs_list: Some(DangerSignsField::Text(r#"["Severe headache"]"#.into())),
                iron_supplement_given: Some(true),
                ..Default::default()
            },
        ];
        (pregnancy, visits)
    }

    #[test]
    fn test_evaluate_combines_all_outputs() {
        crate::logging::init_test();
        let (pregnancy, visits) = create_test_case();
        let evaluation = Engine::default().evaluate(&pregnancy, &visits);

        assert_eq!(evaluation.alerts[0].code, "DAK.ANC.DT.04.ANEMIA");
        assert!(evaluation
            .alerts
            .iter()
            .any(|a| a.code == "DAK.ANC.DT.01.SEVERE_HEADACHE"));
        assert_eq!(evaluation.recommendation.visit_number, 3);
        assert_eq!(evaluation.recommendation.recommended_gestational_age, Some(26));
        assert_eq!(
            evaluation.recommendation.recommended_date,
            NaiveDate::from_ymd_opt(2025, 8, 4)
        );
        assert_eq!(evaluation.recommendation.current_gestational_age, 21);
        assert_eq!(evaluation.indicators.len(), 6);
    }

    #[test]
    fn test_alerts_for_earlier_visit_come_first() {
        let (pregnancy, visits) = create_test_case();
        let alerts = Engine::default().generate_alerts(&pregnancy, &visits);

        let first_of_second = alerts
            .iter()
            .position(|a| a.visit_number == Some(2))
            .unwrap();
        assert!(first_of_second > 0);
        assert!(alerts[..first_of_second]
            .iter()
            .all(|a| a.visit_number == Some(1)));
        assert!(alerts[first_of_second..]
            .iter()
            .all(|a| a.visit_number == Some(2)));
    }

    #[test]
    fn test_repeated_evaluation_is_identical() {
        let (pregnancy, visits) = create_test_case();
        let engine = Engine::default();

        let first = serde_json::to_string(&engine.evaluate(&pregnancy, &visits)).unwrap();
        let second = serde_json::to_string(&engine.evaluate(&pregnancy, &visits)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_custom_catalog_is_injected() {
        let mut catalog = build_default_catalog();
        catalog.contacts.truncate(2);
        catalog
            .indicators
            .get_mut("ANC.IND.06")
            .unwrap()
            .target = 50.0;

        let engine = Engine::new(&catalog);
        let (pregnancy, visits) = create_test_case();

        let rec = engine.recommend_next_visit(&pregnancy, &visits);
        assert!(rec.schedule.is_none());

        let iron = engine
            .compute_indicators(&visits)
            .into_iter()
            .find(|r| r.id == "ANC.IND.06")
            .unwrap();
        assert_eq!(iron.status, IndicatorStatus::Met);
    }

    #[test]
    fn test_engine_is_shareable_across_threads() {
        let (pregnancy, visits) = create_test_case();
        let engine = Engine::default();
        let expected = engine.generate_alerts(&pregnancy, &visits);

        std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| engine.generate_alerts(&pregnancy, &visits)))
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), expected);
            }
        });
    }
}
