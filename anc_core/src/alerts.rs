//! Alert generation against the guideline's decision points.
//!
//! Every visit is checked independently against each decision point in the
//! catalog, in catalog order (ANC.DT.01 → ANC.DT.14). Missing optional
//! fields never raise: for the documentation-style checks an absent field is
//! itself the finding.

use crate::{Alert, Catalog, Criterion, DangerSignsField, DecisionPoint, PregnancyRecord, VisitRecord};
use serde_json::Value;
use std::collections::HashSet;

/// A single reported danger sign with its alert discriminator
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DangerSign {
    pub label: String,
    pub code: String,
}

/// Canonical, de-duplicated danger-sign list in reporting order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DangerSigns(Vec<DangerSign>);

impl DangerSigns {
    /// Normalize the stored field into a list of distinct signs.
    ///
    /// Text is read as JSON first and falls back to a comma split when it is
    /// not JSON. JSON arrays keep their string items, a JSON string is split
    /// like plain text, and any other JSON value resolves to an empty list.
    pub fn resolve(field: Option<&DangerSignsField>) -> Self {
        match field {
            None => Self::default(),
            Some(DangerSignsField::List(items)) => Self::from_labels(items.iter().map(String::as_str)),
            Some(DangerSignsField::Text(text)) => match serde_json::from_str::<Value>(text) {
                Ok(Value::Array(items)) => Self::from_labels(items.iter().filter_map(Value::as_str)),
                Ok(Value::String(inner)) => Self::from_labels(inner.split(',')),
                Ok(_) => Self::default(),
                Err(_) => Self::from_labels(text.split(',')),
            },
        }
    }

    fn from_labels<'a>(labels: impl Iterator<Item = &'a str>) -> Self {
        let mut seen = HashSet::new();
        let mut signs = Vec::new();

        for label in labels.map(str::trim).filter(|l| !l.is_empty()) {
            let code = sign_code(label);
            if seen.insert(code.clone()) {
                signs.push(DangerSign {
                    label: label.to_string(),
                    code,
                });
            }
        }

        DangerSigns(signs)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DangerSign> {
        self.0.iter()
    }
}

/// Alert discriminator for a free-text sign: upper-cased, whitespace runs
/// collapsed to `_`
pub fn sign_code(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_uppercase()
}

/// Whether a free-text field documents the given topic.
///
/// Absent text counts as undocumented. Matching is a case-insensitive
/// substring search.
pub fn is_documented(field: Option<&str>, keyword: &str) -> bool {
    field.is_some_and(|text| text.to_lowercase().contains(&keyword.to_lowercase()))
}

/// Generate alerts for every visit, preserving visit order
pub fn generate_alerts(
    catalog: &Catalog,
    pregnancy: &PregnancyRecord,
    visits: &[VisitRecord],
) -> Vec<Alert> {
    let alerts: Vec<Alert> = visits
        .iter()
        .flat_map(|visit| evaluate_visit(catalog, visit))
        .collect();

    tracing::info!(
        "Generated {} alerts across {} visits (pregnancy {})",
        alerts.len(),
        visits.len(),
        pregnancy
            .pregnancy_id
            .as_ref()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "unknown".into())
    );

    alerts
}

/// Evaluate one visit against all decision points in catalog order
pub fn evaluate_visit(catalog: &Catalog, visit: &VisitRecord) -> Vec<Alert> {
    let mut alerts = Vec::new();

    for point in catalog.decision_points.values() {
        for finding in check(point, visit) {
            tracing::debug!(
                "Visit {:?}: {} fired ({})",
                visit.visit_number,
                point.id,
                finding.discriminator
            );
            alerts.push(Alert {
                code: format!("DAK.{}.{}", point.id, finding.discriminator),
                message: finding.message,
                priority: point.priority,
                action: point.action.clone(),
                decision_point: point.id.clone(),
                visit_id: visit.anc_visit_id.clone(),
                visit_number: visit.visit_number,
            });
        }
    }

    alerts
}

struct Finding {
    discriminator: String,
    message: String,
}

fn fired(point: &DecisionPoint, value: Option<String>) -> Vec<Finding> {
    let message = match value {
        Some(value) => render(&point.alert.message, &value),
        None => point.alert.message.clone(),
    };
    vec![Finding {
        discriminator: point.alert.discriminator.clone(),
        message,
    }]
}

fn render(template: &str, value: &str) -> String {
    template.replace("{value}", value)
}

fn flag(value: Option<bool>) -> bool {
    value.unwrap_or(false)
}

/// Zero readings are data-entry gaps, not measurements
fn reading(value: Option<u32>) -> Option<u32> {
    value.filter(|v| *v > 0)
}

fn screening_outstanding(done: Option<bool>, result: Option<&str>) -> bool {
    !flag(done) || result == Some("pending")
}

fn check(point: &DecisionPoint, visit: &VisitRecord) -> Vec<Finding> {
    match &point.criterion {
        Criterion::DangerSigns { sign_message } => {
            if visit.danger_signs_present != Some(true) {
                return Vec::new();
            }
            let signs = DangerSigns::resolve(visit.danger_signs_list.as_ref());
            if signs.is_empty() {
                return fired(point, None);
            }
            signs
                .iter()
                .map(|sign| Finding {
                    discriminator: sign.code.clone(),
                    message: render(sign_message, &sign.label),
                })
                .collect()
        }

        Criterion::BloodPressure {
            systolic,
            diastolic,
        } => match (
            reading(visit.blood_pressure_systolic),
            reading(visit.blood_pressure_diastolic),
        ) {
            (Some(sys), Some(dia)) if sys >= *systolic || dia >= *diastolic => {
                fired(point, Some(format!("{}/{}", sys, dia)))
            }
            _ => Vec::new(),
        },

        Criterion::Proteinuria { positive_results } => match visit.urine_protein.as_deref() {
            Some(result) if positive_results.iter().any(|p| p == result) => fired(point, None),
            _ => Vec::new(),
        },

        Criterion::Anemia { hemoglobin_below } => match visit.hemoglobin_gdl {
            Some(hb) if hb > 0.0 && hb < *hemoglobin_below => fired(point, Some(hb.to_string())),
            _ => Vec::new(),
        },

        Criterion::HivTest => {
            if screening_outstanding(visit.hiv_test_done, visit.hiv_test_result.as_deref()) {
                fired(point, None)
            } else {
                Vec::new()
            }
        }

        Criterion::SyphilisTest => {
            if screening_outstanding(visit.syphilis_test_done, visit.syphilis_test_result.as_deref()) {
                fired(point, None)
            } else {
                Vec::new()
            }
        }

        Criterion::MalariaPrevention { from_week } => {
            let weeks = visit.gestation_weeks.unwrap_or(0);
            if weeks >= *from_week && !flag(visit.malaria_prophylaxis_given) {
                fired(point, None)
            } else {
                Vec::new()
            }
        }

        Criterion::Tetanus { min_doses } => {
            let incomplete = !flag(visit.tetanus_toxoid_given)
                || reading(visit.tetanus_toxoid_dose).map_or(true, |dose| dose < *min_doses);
            if incomplete {
                fired(point, None)
            } else {
                Vec::new()
            }
        }

        Criterion::IronSupplement => {
            if !flag(visit.iron_supplement_given) {
                fired(point, None)
            } else {
                Vec::new()
            }
        }

        Criterion::CarePlan { keyword } => {
            if is_documented(visit.plan_of_care.as_deref(), keyword) {
                Vec::new()
            } else {
                fired(point, None)
            }
        }

        Criterion::ProviderNotes { keyword } => {
            if is_documented(visit.provider_notes.as_deref(), keyword) {
                Vec::new()
            } else {
                fired(point, None)
            }
        }
    }
}
