//! Default guideline catalog (WHO DAK, ANC module).
//!
//! This module provides the built-in decision points, contact schedule and
//! indicator definitions, plus loading and exporting of external catalogs.

use crate::types::*;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Version of the guideline encoded by the built-in catalog
pub const DEFAULT_GUIDELINE_VERSION: &str = "WHO-DAK-ANC-2023";

/// Cached default catalog - built once and shared by every engine
static DEFAULT_CATALOG: Lazy<Catalog> = Lazy::new(build_default_catalog);

/// Get a reference to the cached default catalog
pub fn get_default_catalog() -> &'static Catalog {
    &DEFAULT_CATALOG
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Builds the default catalog
///
/// **Note**: prefer `get_default_catalog()` for engine use. This function is
/// retained for tests and for deriving custom catalogs.
pub fn build_default_catalog() -> Catalog {
    let mut decision_points = BTreeMap::new();
    let mut indicators = BTreeMap::new();

    // ========================================================================
    // Decision Points (ANC.DT.01-14)
    // ========================================================================

    let points = vec![
        DecisionPoint {
            id: "ANC.DT.01".into(),
            name: "Danger Signs Assessment".into(),
            description: "Assess for danger signs requiring immediate referral".into(),
            inputs: strings(&["danger_signs_present", "danger_signs_list"]),
            criterion: Criterion::DangerSigns {
                sign_message: "Danger sign detected: {value} - Immediate referral required".into(),
            },
            action: "immediate_referral".into(),
            priority: Priority::High,
            alert: AlertTemplate {
                discriminator: "DANGER_SIGNS".into(),
                message: "Danger signs detected - Immediate referral required".into(),
            },
        },
        DecisionPoint {
            id: "ANC.DT.02".into(),
            name: "Blood Pressure Assessment".into(),
            description: "Assess blood pressure for pre-eclampsia risk".into(),
            inputs: strings(&["blood_pressure_systolic", "blood_pressure_diastolic"]),
            criterion: Criterion::BloodPressure {
                systolic: 140,
                diastolic: 90,
            },
            action: "referral_if_high".into(),
            priority: Priority::High,
            alert: AlertTemplate {
                discriminator: "HYPERTENSION".into(),
                message: "High blood pressure detected ({value}) - Pre-eclampsia risk".into(),
            },
        },
        DecisionPoint {
            id: "ANC.DT.03".into(),
            name: "Proteinuria Testing".into(),
            description: "Test for protein in urine".into(),
            inputs: strings(&["urine_protein"]),
            criterion: Criterion::Proteinuria {
                positive_results: strings(&["positive", "+"]),
            },
            action: "referral_if_positive".into(),
            priority: Priority::High,
            alert: AlertTemplate {
                discriminator: "PROTEINURIA".into(),
                message: "Proteinuria detected - Pre-eclampsia risk".into(),
            },
        },
        DecisionPoint {
            id: "ANC.DT.04".into(),
            name: "Anemia Screening".into(),
            description: "Screen for anemia using hemoglobin levels".into(),
            inputs: strings(&["hemoglobin_gdl"]),
            criterion: Criterion::Anemia {
                hemoglobin_below: 11.0,
            },
            action: "iron_supplementation".into(),
            priority: Priority::Medium,
            alert: AlertTemplate {
                discriminator: "ANEMIA".into(),
                message: "Anemia detected (Hb: {value}g/dL) - Iron supplementation needed".into(),
            },
        },
        DecisionPoint {
            id: "ANC.DT.05".into(),
            name: "HIV Testing and Counseling".into(),
            description: "Offer HIV testing and counseling".into(),
            inputs: strings(&["hiv_test_done", "hiv_test_result"]),
            criterion: Criterion::HivTest,
            action: "counseling_and_testing".into(),
            priority: Priority::High,
            alert: AlertTemplate {
                discriminator: "HIV_NOT_TESTED".into(),
                message: "HIV testing not completed - Offer testing and counseling".into(),
            },
        },
        DecisionPoint {
            id: "ANC.DT.06".into(),
            name: "Syphilis Screening".into(),
            description: "Screen for syphilis infection".into(),
            inputs: strings(&["syphilis_test_done", "syphilis_test_result"]),
            criterion: Criterion::SyphilisTest,
            action: "treatment_if_positive".into(),
            priority: Priority::High,
            alert: AlertTemplate {
                discriminator: "SYPHILIS_NOT_TESTED".into(),
                message: "Syphilis screening not completed - Offer screening".into(),
            },
        },
        DecisionPoint {
            id: "ANC.DT.07".into(),
            name: "Malaria Prevention".into(),
            description: "Provide malaria prevention measures".into(),
            inputs: strings(&["gestation_weeks", "malaria_prophylaxis_given"]),
            criterion: Criterion::MalariaPrevention { from_week: 13 },
            action: "iptp_prophylaxis".into(),
            priority: Priority::Medium,
            alert: AlertTemplate {
                discriminator: "MALARIA_PREVENTION".into(),
                message: "Malaria prevention incomplete - Provide IPTp prophylaxis".into(),
            },
        },
        DecisionPoint {
            id: "ANC.DT.08".into(),
            name: "Tetanus Immunization".into(),
            description: "Provide tetanus toxoid vaccination".into(),
            inputs: strings(&["tetanus_toxoid_given", "tetanus_toxoid_dose"]),
            criterion: Criterion::Tetanus { min_doses: 2 },
            action: "vaccination".into(),
            priority: Priority::Medium,
            alert: AlertTemplate {
                discriminator: "TETANUS_INCOMPLETE".into(),
                message: "Tetanus immunization incomplete - Provide vaccination".into(),
            },
        },
        DecisionPoint {
            id: "ANC.DT.09".into(),
            name: "Iron Supplementation".into(),
            description: "Provide iron and folic acid supplementation".into(),
            inputs: strings(&["iron_supplement_given"]),
            criterion: Criterion::IronSupplement,
            action: "supplementation".into(),
            priority: Priority::Medium,
            alert: AlertTemplate {
                discriminator: "IRON_SUPPLEMENTATION".into(),
                message: "Iron supplementation not provided - Provide iron and folic acid".into(),
            },
        },
        DecisionPoint {
            id: "ANC.DT.10".into(),
            name: "Birth Preparedness".into(),
            description: "Counsel on birth preparedness and complication readiness".into(),
            inputs: strings(&["plan_of_care"]),
            criterion: Criterion::CarePlan {
                keyword: "birth".into(),
            },
            action: "counseling".into(),
            priority: Priority::Medium,
            alert: AlertTemplate {
                discriminator: "BIRTH_PREPAREDNESS".into(),
                message: "Birth preparedness planning not completed - Provide counseling".into(),
            },
        },
        DecisionPoint {
            id: "ANC.DT.11".into(),
            name: "Emergency Planning".into(),
            description: "Develop emergency plan for complications".into(),
            inputs: strings(&["plan_of_care"]),
            criterion: Criterion::CarePlan {
                keyword: "emergency".into(),
            },
            action: "planning".into(),
            priority: Priority::Medium,
            alert: AlertTemplate {
                discriminator: "EMERGENCY_PLANNING".into(),
                message: "Emergency plan not developed - Develop emergency plan".into(),
            },
        },
        DecisionPoint {
            id: "ANC.DT.12".into(),
            name: "Postpartum Care Planning".into(),
            description: "Plan for postpartum care and family planning".into(),
            inputs: strings(&["plan_of_care"]),
            criterion: Criterion::CarePlan {
                keyword: "postpartum".into(),
            },
            action: "planning".into(),
            priority: Priority::Low,
            alert: AlertTemplate {
                discriminator: "POSTPARTUM_PLANNING".into(),
                message: "Postpartum care planning not completed - Plan for postpartum care".into(),
            },
        },
        DecisionPoint {
            id: "ANC.DT.13".into(),
            name: "Family Planning Counseling".into(),
            description: "Provide family planning counseling".into(),
            inputs: strings(&["provider_notes"]),
            criterion: Criterion::ProviderNotes {
                keyword: "family planning".into(),
            },
            action: "counseling".into(),
            priority: Priority::Low,
            alert: AlertTemplate {
                discriminator: "FAMILY_PLANNING".into(),
                message: "Family planning counseling not provided - Provide counseling".into(),
            },
        },
        DecisionPoint {
            id: "ANC.DT.14".into(),
            name: "Danger Sign Recognition".into(),
            description: "Educate on danger sign recognition".into(),
            inputs: strings(&["provider_notes"]),
            criterion: Criterion::ProviderNotes {
                keyword: "danger sign".into(),
            },
            action: "education".into(),
            priority: Priority::Medium,
            alert: AlertTemplate {
                discriminator: "DANGER_SIGN_EDUCATION".into(),
                message: "Danger sign recognition education not provided - Provide education"
                    .into(),
            },
        },
    ];

    for point in points {
        decision_points.insert(point.id.clone(), point);
    }

    // ========================================================================
    // Contact Schedule (ANC.S.01-05)
    // ========================================================================

    let contacts = vec![
        ScheduledContact {
            id: "ANC.S.01".into(),
            name: "First ANC Visit".into(),
            sequence: 1,
            window: GestationWindow { min: 8, max: 12 },
            priority: Priority::High,
            required: strings(&["ANC.DT.01", "ANC.DT.02", "ANC.DT.04", "ANC.DT.05", "ANC.DT.06"]),
        },
        ScheduledContact {
            id: "ANC.S.02".into(),
            name: "Second ANC Visit".into(),
            sequence: 2,
            window: GestationWindow { min: 20, max: 24 },
            priority: Priority::High,
            required: strings(&[
                "ANC.DT.01",
                "ANC.DT.02",
                "ANC.DT.03",
                "ANC.DT.04",
                "ANC.DT.07",
                "ANC.DT.08",
            ]),
        },
        ScheduledContact {
            id: "ANC.S.03".into(),
            name: "Third ANC Visit".into(),
            sequence: 3,
            window: GestationWindow { min: 26, max: 30 },
            priority: Priority::High,
            required: strings(&["ANC.DT.01", "ANC.DT.02", "ANC.DT.03", "ANC.DT.04", "ANC.DT.07"]),
        },
        ScheduledContact {
            id: "ANC.S.04".into(),
            name: "Fourth ANC Visit".into(),
            sequence: 4,
            window: GestationWindow { min: 32, max: 36 },
            priority: Priority::High,
            required: strings(&[
                "ANC.DT.01",
                "ANC.DT.02",
                "ANC.DT.03",
                "ANC.DT.04",
                "ANC.DT.10",
                "ANC.DT.11",
            ]),
        },
        ScheduledContact {
            id: "ANC.S.05".into(),
            name: "Fifth ANC Visit".into(),
            sequence: 5,
            window: GestationWindow { min: 38, max: 40 },
            priority: Priority::Medium,
            required: strings(&["ANC.DT.01", "ANC.DT.02", "ANC.DT.03", "ANC.DT.12", "ANC.DT.13"]),
        },
    ];

    // ========================================================================
    // Indicators (ANC.IND.01-10, computed: 01, 02, 04-07)
    // ========================================================================

    let definitions = vec![
        indicator(
            "ANC.IND.01",
            "Early ANC Initiation",
            "Percentage of women who initiated ANC before 12 weeks",
            "Women with first ANC visit before 12 weeks",
            80.0,
            Measure::EarlyInitiation { before_week: 12 },
        ),
        indicator(
            "ANC.IND.02",
            "Four or More ANC Visits",
            "Percentage of women with 4 or more ANC visits",
            "Women with ≥4 ANC visits",
            90.0,
            Measure::FourPlusVisits { min_visit_number: 4 },
        ),
        IndicatorDefinition {
            denominator: "Total ANC visits".into(),
            ..described(
                "ANC.IND.03",
                "Quality ANC Visits",
                "Percentage of ANC visits with comprehensive care",
                "ANC visits with all required assessments",
                85.0,
            )
        },
        indicator(
            "ANC.IND.04",
            "HIV Testing Coverage",
            "Percentage of women tested for HIV during ANC",
            "Women tested for HIV",
            95.0,
            Measure::HivTested,
        ),
        indicator(
            "ANC.IND.05",
            "Syphilis Screening Coverage",
            "Percentage of women screened for syphilis",
            "Women screened for syphilis",
            90.0,
            Measure::SyphilisScreened,
        ),
        indicator(
            "ANC.IND.06",
            "Iron Supplementation Coverage",
            "Percentage of women receiving iron supplementation",
            "Women receiving iron supplementation",
            90.0,
            Measure::IronSupplemented,
        ),
        indicator(
            "ANC.IND.07",
            "Tetanus Immunization Coverage",
            "Percentage of women receiving tetanus immunization",
            "Women receiving tetanus immunization",
            90.0,
            Measure::TetanusImmunized { min_doses: 2 },
        ),
        described(
            "ANC.IND.08",
            "Birth Preparedness Planning",
            "Percentage of women with birth preparedness plan",
            "Women with birth preparedness plan",
            80.0,
        ),
        described(
            "ANC.IND.09",
            "Danger Sign Recognition",
            "Percentage of women educated on danger signs",
            "Women educated on danger signs",
            85.0,
        ),
        described(
            "ANC.IND.10",
            "Postpartum Care Planning",
            "Percentage of women with postpartum care plan",
            "Women with postpartum care plan",
            75.0,
        ),
    ];

    for def in definitions {
        indicators.insert(def.id.clone(), def);
    }

    Catalog {
        version: DEFAULT_GUIDELINE_VERSION.into(),
        decision_points,
        contacts,
        indicators,
    }
}

fn indicator(
    id: &str,
    name: &str,
    description: &str,
    numerator: &str,
    target: f64,
    measure: Measure,
) -> IndicatorDefinition {
    IndicatorDefinition {
        id: id.into(),
        name: name.into(),
        description: description.into(),
        numerator: numerator.into(),
        denominator: "Total women with ANC visits".into(),
        target,
        measure: Some(measure),
    }
}

/// Guideline indicator with no visit-level measure; listed but not computed
fn described(
    id: &str,
    name: &str,
    description: &str,
    numerator: &str,
    target: f64,
) -> IndicatorDefinition {
    IndicatorDefinition {
        id: id.into(),
        name: name.into(),
        description: description.into(),
        numerator: numerator.into(),
        denominator: "Total women with ANC visits".into(),
        target,
        measure: None,
    }
}

impl Catalog {
    pub fn decision_point(&self, id: &str) -> Option<&DecisionPoint> {
        self.decision_points.get(id)
    }

    pub fn indicator(&self, id: &str) -> Option<&IndicatorDefinition> {
        self.indicators.get(id)
    }

    /// Scheduled contact for the given 1-based visit sequence, if any
    pub fn contact_for_sequence(&self, sequence: u32) -> Option<&ScheduledContact> {
        self.contacts.iter().find(|c| c.sequence == sequence)
    }

    /// Parse and validate a catalog from TOML text
    ///
    /// Any parse failure or validation problem is reported as
    /// [`Error::Config`] so a bad guideline file stops startup.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let catalog: Catalog = toml::from_str(contents)
            .map_err(|e| Error::Config(format!("Malformed catalog: {}", e)))?;

        let errors = catalog.validate();
        if !errors.is_empty() {
            return Err(Error::Config(format!(
                "Invalid catalog '{}': {}",
                catalog.version,
                errors.join("; ")
            )));
        }

        tracing::debug!(
            "Parsed catalog {} ({} decision points, {} contacts, {} indicators)",
            catalog.version,
            catalog.decision_points.len(),
            catalog.contacts.len(),
            catalog.indicators.len()
        );
        Ok(catalog)
    }

    /// Load a catalog from a TOML file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let catalog = Self::from_toml_str(&contents)?;
        tracing::info!("Loaded catalog {} from {:?}", catalog.version, path);
        Ok(catalog)
    }

    /// Serialize the catalog as TOML, loadable by [`Catalog::load_from`]
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize catalog: {}", e)))
    }

    /// Validate the catalog for consistency and completeness
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.version.trim().is_empty() {
            errors.push("Catalog has empty version".to_string());
        }

        for (id, point) in &self.decision_points {
            if id.is_empty() || point.id.is_empty() {
                errors.push("Decision point has empty ID".to_string());
            }
            if id != &point.id {
                errors.push(format!(
                    "Decision point key '{}' doesn't match id '{}'",
                    id, point.id
                ));
            }
            if point.name.is_empty() {
                errors.push(format!("Decision point '{}' has empty name", id));
            }
            if point.action.is_empty() {
                errors.push(format!("Decision point '{}' has empty action", id));
            }
            if point.alert.discriminator.is_empty() {
                errors.push(format!("Decision point '{}' has empty alert discriminator", id));
            }

            match &point.criterion {
                Criterion::Anemia { hemoglobin_below } if *hemoglobin_below <= 0.0 => {
                    errors.push(format!(
                        "Decision point '{}': hemoglobin threshold {} must be positive",
                        id, hemoglobin_below
                    ));
                }
                Criterion::Proteinuria { positive_results } if positive_results.is_empty() => {
                    errors.push(format!(
                        "Decision point '{}': proteinuria has no positive results",
                        id
                    ));
                }
                Criterion::CarePlan { keyword } | Criterion::ProviderNotes { keyword }
                    if keyword.trim().is_empty() =>
                {
                    errors.push(format!("Decision point '{}' has empty keyword", id));
                }
                _ => {}
            }
        }

        let mut seen_contacts = HashSet::new();
        for (idx, contact) in self.contacts.iter().enumerate() {
            if contact.id.is_empty() {
                errors.push("Scheduled contact has empty ID".to_string());
            }
            if !seen_contacts.insert(contact.id.as_str()) {
                errors.push(format!("Duplicate scheduled contact '{}'", contact.id));
            }
            if contact.name.is_empty() {
                errors.push(format!("Scheduled contact '{}' has empty name", contact.id));
            }
            let expected = idx as u32 + 1;
            if contact.sequence != expected {
                errors.push(format!(
                    "Scheduled contact '{}': sequence {} out of order (expected {})",
                    contact.id, contact.sequence, expected
                ));
            }
            if contact.window.min > contact.window.max {
                errors.push(format!(
                    "Scheduled contact '{}': window min {} > max {}",
                    contact.id, contact.window.min, contact.window.max
                ));
            }
            for required in &contact.required {
                if !self.decision_points.contains_key(required) {
                    errors.push(format!(
                        "Scheduled contact '{}' references non-existent decision point '{}'",
                        contact.id, required
                    ));
                }
            }
        }

        for (id, def) in &self.indicators {
            if id != &def.id {
                errors.push(format!(
                    "Indicator key '{}' doesn't match id '{}'",
                    id, def.id
                ));
            }
            if def.name.is_empty() {
                errors.push(format!("Indicator '{}' has empty name", id));
            }
            if !(0.0..=100.0).contains(&def.target) {
                errors.push(format!(
                    "Indicator '{}': target {} outside 0-100",
                    id, def.target
                ));
            }
        }

        errors
    }
}
