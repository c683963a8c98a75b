//! Next-visit scheduling from the guideline's contact schedule.
//!
//! The next contact is the one whose sequence follows the number of visits
//! already recorded; its target gestational age is the start of the
//! contact's window.

use crate::{Catalog, Priority, PregnancyRecord, VisitRecommendation, VisitRecord};
use chrono::{Days, NaiveDate};

/// Recommend the next ANC contact for a pregnancy
pub fn recommend_next_visit(
    catalog: &Catalog,
    pregnancy: &PregnancyRecord,
    visits: &[VisitRecord],
) -> VisitRecommendation {
    let visit_count = visits.len() as u32;
    let next_sequence = visit_count + 1;
    let current_weeks = current_gestational_age(pregnancy, visits);

    let Some(contact) = catalog.contact_for_sequence(next_sequence) else {
        tracing::info!(
            "{} visits recorded, no further scheduled contact",
            visit_count
        );
        return VisitRecommendation {
            visit_number: next_sequence,
            recommended_gestational_age: None,
            recommended_date: None,
            schedule: None,
            required_assessments: Vec::new(),
            priority: Priority::Low,
            current_gestational_age: current_weeks,
            overdue: false,
        };
    };

    let target_weeks = contact.window.min;
    let recommended_date = pregnancy
        .lmp_date
        .and_then(|lmp| date_at_gestation(lmp, target_weeks));
    let overdue = current_weeks > contact.window.max;

    tracing::info!(
        "Next contact {} (visit {}) at {} weeks, current {} weeks{}",
        contact.id,
        next_sequence,
        target_weeks,
        current_weeks,
        if overdue { ", overdue" } else { "" }
    );

    VisitRecommendation {
        visit_number: next_sequence,
        recommended_gestational_age: Some(target_weeks),
        recommended_date,
        schedule: Some(contact.clone()),
        required_assessments: contact.required.clone(),
        priority: contact.priority,
        current_gestational_age: current_weeks,
        overdue,
    }
}

/// Gestational age in weeks: the pregnancy's own value when set, otherwise
/// the most recent visit's, otherwise 0
pub fn current_gestational_age(pregnancy: &PregnancyRecord, visits: &[VisitRecord]) -> u32 {
    pregnancy
        .current_gestation_weeks
        .filter(|w| *w > 0)
        .or_else(|| visits.last().and_then(|v| v.gestation_weeks))
        .unwrap_or(0)
}

/// Calendar date reached `weeks` after the last menstrual period
pub fn date_at_gestation(lmp: NaiveDate, weeks: u32) -> Option<NaiveDate> {
    lmp.checked_add_days(Days::new(u64::from(weeks) * 7))
}
