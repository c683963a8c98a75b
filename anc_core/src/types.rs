//! Core domain types for the ANC decision support engine.
//!
//! This module defines the fundamental types used throughout the system:
//! - Guideline catalog entries (decision points, contacts, indicators)
//! - Input records (pregnancy and visit) as supplied by persistence
//! - Engine outputs (alerts, next-visit recommendation, indicator results)

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Shared Enums
// ============================================================================

/// Clinical priority attached to decision points, contacts and alerts
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        };
        f.pad(s)
    }
}

/// Gestational-age window in completed weeks, inclusive on both ends
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GestationWindow {
    pub min: u32,
    pub max: u32,
}

// ============================================================================
// Decision Points
// ============================================================================

/// Triggering condition of a decision point, with its thresholds
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Criterion {
    /// Danger-sign flag set; one alert per reported sign
    DangerSigns { sign_message: String },
    /// Either reading at or above its threshold (mmHg)
    BloodPressure { systolic: u32, diastolic: u32 },
    /// Urine protein result equal to one of the listed values
    Proteinuria { positive_results: Vec<String> },
    /// Hemoglobin strictly below the threshold (g/dL)
    Anemia { hemoglobin_below: f64 },
    HivTest,
    SyphilisTest,
    /// Prophylaxis missing from this gestational week onwards
    MalariaPrevention { from_week: u32 },
    Tetanus { min_doses: u32 },
    IronSupplement,
    /// Keyword missing from the visit's plan of care
    CarePlan { keyword: String },
    /// Keyword missing from the provider's notes
    ProviderNotes { keyword: String },
}

/// Alert text produced when a decision point fires.
///
/// `message` may contain a `{value}` placeholder that is replaced with the
/// clinical reading that triggered the alert.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AlertTemplate {
    pub discriminator: String,
    pub message: String,
}

/// One discrete clinical check in the guideline
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DecisionPoint {
    pub id: String,
    pub name: String,
    pub description: String,
    pub inputs: Vec<String>,
    pub criterion: Criterion,
    pub action: String,
    pub priority: Priority,
    pub alert: AlertTemplate,
}

// ============================================================================
// Scheduled Contacts and Indicators
// ============================================================================

/// A scheduled ANC contact (ANC.S.01..05)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ScheduledContact {
    pub id: String,
    pub name: String,
    /// 1-based position in the contact schedule
    pub sequence: u32,
    pub window: GestationWindow,
    pub priority: Priority,
    pub required: Vec<String>,
}

/// Per-visit predicate counted in an indicator's numerator
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Measure {
    /// Gestational age recorded and below the given week
    EarlyInitiation { before_week: u32 },
    FourPlusVisits { min_visit_number: u32 },
    HivTested,
    SyphilisScreened,
    IronSupplemented,
    TetanusImmunized { min_doses: u32 },
}

/// A population-level coverage/quality indicator
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct IndicatorDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub numerator: String,
    pub denominator: String,
    /// Target percentage, 0..=100
    pub target: f64,
    /// Indicators without a measure are listed but not computed
    #[serde(default)]
    pub measure: Option<Measure>,
}

// ============================================================================
// Catalog Type
// ============================================================================

/// The complete, versioned guideline catalog
///
/// Maps are ordered by id so iteration follows the guideline's numbering
/// (ANC.DT.01 before ANC.DT.02, ...).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Catalog {
    pub version: String,
    pub decision_points: BTreeMap<String, DecisionPoint>,
    pub contacts: Vec<ScheduledContact>,
    pub indicators: BTreeMap<String, IndicatorDefinition>,
}

// ============================================================================
// Input Records
// ============================================================================

/// Row identifier as stored by the persistence layer (serial or text key)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum RecordId {
    Number(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Number(n) => write!(f, "{}", n),
            RecordId::Text(s) => f.write_str(s),
        }
    }
}

/// Danger-sign list as it arrives from storage: either a native list, or a
/// string holding a JSON array or comma-separated signs
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum DangerSignsField {
    List(Vec<String>),
    Text(String),
}

/// One ANC encounter
///
/// Every field is optional and read leniently: numeric strings are accepted
/// and a value of the wrong shape is treated as not recorded.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VisitRecord {
    #[serde(deserialize_with = "lenient_id")]
    pub anc_visit_id: Option<RecordId>,
    #[serde(deserialize_with = "lenient_id")]
    pub patient_id: Option<RecordId>,
    #[serde(deserialize_with = "lenient_u32")]
    pub visit_number: Option<u32>,
    #[serde(deserialize_with = "lenient_date")]
    pub visit_date: Option<NaiveDate>,
    #[serde(deserialize_with = "lenient_u32")]
    pub gestation_weeks: Option<u32>,

    #[serde(alias = "systolic_bp", deserialize_with = "lenient_u32")]
    pub blood_pressure_systolic: Option<u32>,
    #[serde(alias = "diastolic_bp", deserialize_with = "lenient_u32")]
    pub blood_pressure_diastolic: Option<u32>,

    #[serde(deserialize_with = "lenient_string")]
    pub urine_protein: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub hemoglobin_gdl: Option<f64>,
    #[serde(deserialize_with = "lenient_bool")]
    pub hiv_test_done: Option<bool>,
    #[serde(deserialize_with = "lenient_string")]
    pub hiv_test_result: Option<String>,
    #[serde(deserialize_with = "lenient_bool")]
    pub syphilis_test_done: Option<bool>,
    #[serde(deserialize_with = "lenient_string")]
    pub syphilis_test_result: Option<String>,

    #[serde(deserialize_with = "lenient_bool")]
    pub malaria_prophylaxis_given: Option<bool>,
    #[serde(deserialize_with = "lenient_bool")]
    pub tetanus_toxoid_given: Option<bool>,
    #[serde(deserialize_with = "lenient_u32")]
    pub tetanus_toxoid_dose: Option<u32>,
    #[serde(deserialize_with = "lenient_bool")]
    pub iron_supplement_given: Option<bool>,

    #[serde(deserialize_with = "lenient_bool")]
    pub danger_signs_present: Option<bool>,
    #[serde(deserialize_with = "lenient_danger_signs")]
    pub danger_signs_list: Option<DangerSignsField>,

    #[serde(deserialize_with = "lenient_string")]
    pub plan_of_care: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub provider_notes: Option<String>,
}

/// The pregnancy the visits belong to
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PregnancyRecord {
    #[serde(deserialize_with = "lenient_id")]
    pub pregnancy_id: Option<RecordId>,
    #[serde(deserialize_with = "lenient_id")]
    pub patient_id: Option<RecordId>,
    #[serde(deserialize_with = "lenient_date")]
    pub lmp_date: Option<NaiveDate>,
    #[serde(deserialize_with = "lenient_u32")]
    pub current_gestation_weeks: Option<u32>,
}

/// A pregnancy with its visits, in chronological order
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct PatientCase {
    #[serde(default)]
    pub pregnancy: PregnancyRecord,
    pub visits: Vec<VisitRecord>,
}

// ============================================================================
// Lenient Field Parsing
// ============================================================================

fn raw_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Value>::deserialize(deserializer)
}

/// Finite number from a JSON number or a numeric string
fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(raw_value(deserializer)?.as_ref().and_then(number_of))
}

/// Whole weeks, doses and readings; fractions are truncated
fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(raw_value(deserializer)?
        .as_ref()
        .and_then(number_of)
        .filter(|n| *n >= 0.0 && *n <= f64::from(u32::MAX))
        .map(|n| n.trunc() as u32))
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match raw_value(deserializer)? {
        Some(Value::Bool(b)) => Some(b),
        Some(Value::Number(n)) => n.as_f64().map(|n| n != 0.0),
        Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match raw_value(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<RecordId>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match raw_value(deserializer)? {
        Some(Value::Number(n)) => n.as_i64().map(RecordId::Number),
        Some(Value::String(s)) if !s.trim().is_empty() => Some(RecordId::Text(s)),
        _ => None,
    })
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp, keeping only the date
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(Value::String(raw)) = raw_value(deserializer)? else {
        return Ok(None);
    };
    let raw = raw.trim();

    Ok(NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive())))
}

/// Non-string list items are dropped; any other shape is not recorded
fn lenient_danger_signs<'de, D>(deserializer: D) -> Result<Option<DangerSignsField>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match raw_value(deserializer)? {
        Some(Value::String(s)) => Some(DangerSignsField::Text(s)),
        Some(Value::Array(items)) => Some(DangerSignsField::List(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
        )),
        _ => None,
    })
}

// ============================================================================
// Engine Outputs
// ============================================================================

/// A decision-support alert raised for one visit
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    /// `DAK.<decision point id>.<DISCRIMINATOR>`
    pub code: String,
    pub message: String,
    pub priority: Priority,
    pub action: String,
    pub decision_point: String,
    pub visit_id: Option<RecordId>,
    pub visit_number: Option<u32>,
}

/// Recommendation for the next ANC contact
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct VisitRecommendation {
    pub visit_number: u32,
    pub recommended_gestational_age: Option<u32>,
    pub recommended_date: Option<NaiveDate>,
    pub schedule: Option<ScheduledContact>,
    pub required_assessments: Vec<String>,
    pub priority: Priority,
    pub current_gestational_age: u32,
    /// Current gestational age is already past the matched contact's window
    pub overdue: bool,
}

/// Classification of an indicator against its target
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorStatus {
    Met,
    NotMet,
    NoData,
}

impl fmt::Display for IndicatorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IndicatorStatus::Met => "met",
            IndicatorStatus::NotMet => "not_met",
            IndicatorStatus::NoData => "no_data",
        };
        f.pad(s)
    }
}

/// Computed value of one indicator over a visit collection
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct IndicatorResult {
    pub id: String,
    pub name: String,
    pub numerator: usize,
    pub denominator: usize,
    pub percentage: f64,
    pub target: f64,
    pub status: IndicatorStatus,
}

/// Everything the engine derives for one patient case
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Evaluation {
    pub alerts: Vec<Alert>,
    pub recommendation: VisitRecommendation,
    pub indicators: Vec<IndicatorResult>,
}
