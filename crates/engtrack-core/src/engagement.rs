use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::business_days::count_business_days;
use crate::error::{EngtrackError, EngtrackResult};

/// Storage format for `startDate` / `endDate`.
pub const RECORD_DATE_FORMAT: &str = "%m/%d/%y";
/// Storage format for the creation `date`.
pub const CREATED_DATE_FORMAT: &str = "%Y-%m-%d";

pub const MAX_RATING: f64 = 5.0;

pub const ENGAGEMENT_TYPE_PRESETS: [&str; 8] = [
    "Internal",
    "External",
    "Web Application",
    "Wireless",
    "Social Engineering",
    "Physical",
    "Cloud",
    "Mobile Application",
];

pub const FEEDBACK_QUESTIONS: [&str; 5] = [
    "How satisfied were you with the overall engagement?",
    "How clear was our communication during the engagement?",
    "How actionable were the findings and recommendations?",
    "How well did the team minimize disruption to your operations?",
    "How likely are you to work with us again?",
];

// ---------------------------------------------------------------------------
// Engagement
// ---------------------------------------------------------------------------

/// One client assessment. Field names on disk are camelCase.
///
/// Every field has a default so that hand-edited or legacy records with
/// missing keys still load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Engagement {
    #[serde(deserialize_with = "null_as_default")]
    pub client_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub engagement_type: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub date: String,
    #[serde(deserialize_with = "deserialize_normalized_bool")]
    pub domain_admin_obtained: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub number_of_users: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub number_of_live_hosts: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub compromised_users_count: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub sensitive_data_obtained: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub client_feedback_questions: Vec<FeedbackAnswer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projected_hours: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hours_spent: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hours_difference: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub business_days_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackAnswer {
    pub question: String,
    pub answer: String,
}

impl FeedbackAnswer {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

impl Engagement {
    pub fn new(client_name: impl Into<String>, created: NaiveDate) -> Self {
        Self {
            client_name: client_name.into(),
            date: created.format(CREATED_DATE_FORMAT).to_string(),
            ..Self::default()
        }
    }

    pub fn set_hours(&mut self, projected: i64, spent: i64) {
        self.projected_hours = Some(projected);
        self.hours_spent = Some(spent);
        self.recompute_hours();
    }

    pub fn set_projected_hours(&mut self, projected: i64) {
        self.projected_hours = Some(projected);
        self.recompute_hours();
    }

    pub fn set_hours_spent(&mut self, spent: i64) {
        self.hours_spent = Some(spent);
        self.recompute_hours();
    }

    pub fn set_dates(&mut self, start: NaiveDate, end: NaiveDate) {
        self.start_date = Some(start.format(RECORD_DATE_FORMAT).to_string());
        self.end_date = Some(end.format(RECORD_DATE_FORMAT).to_string());
        self.business_days_count = count_business_days(start, end);
    }

    pub fn set_start_date(&mut self, start: NaiveDate) {
        self.start_date = Some(start.format(RECORD_DATE_FORMAT).to_string());
        self.recompute_business_days();
    }

    pub fn set_end_date(&mut self, end: NaiveDate) {
        self.end_date = Some(end.format(RECORD_DATE_FORMAT).to_string());
        self.recompute_business_days();
    }

    pub fn start(&self) -> Option<NaiveDate> {
        self.start_date.as_deref().and_then(parse_record_date)
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.end_date.as_deref().and_then(parse_record_date)
    }

    /// Recompute `hoursDifference` and `businessDaysCount` from their inputs.
    pub fn recompute_derived(&mut self) {
        self.recompute_hours();
        self.recompute_business_days();
    }

    fn recompute_hours(&mut self) {
        self.hours_difference = match (self.projected_hours, self.hours_spent) {
            (Some(projected), Some(spent)) => Some(spent - projected),
            _ => None,
        };
    }

    fn recompute_business_days(&mut self) {
        if let (Some(start), Some(end)) = (self.start(), self.end()) {
            self.business_days_count = count_business_days(start, end);
        }
    }

    /// True if any engagement type tag is `internal` (trimmed, any case).
    pub fn is_internal(&self) -> bool {
        self.engagement_type
            .iter()
            .any(|t| t.trim().eq_ignore_ascii_case("internal"))
    }

    /// Compromised users as a percentage of all users, if there are any users.
    pub fn compromised_pct(&self) -> Option<f64> {
        if self.number_of_users == 0 {
            return None;
        }
        Some(f64::from(self.compromised_users_count) / f64::from(self.number_of_users) * 100.0)
    }
}

// ---------------------------------------------------------------------------
// Field normalization
// ---------------------------------------------------------------------------

/// Coerce a loosely-typed JSON value to a boolean.
///
/// Booleans pass through; strings compare case-insensitively against
/// `"true"`; everything else (numbers, null, absent) is `false`.
pub fn normalize_boolean(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

fn deserialize_normalized_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(normalize_boolean(value.as_ref()))
}

/// `null` reads the same as a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parse a client rating.
///
/// Input with more than one digit after the decimal point is rounded to one
/// decimal place, half away from zero (`4.85` -> `4.9`). Anything else keeps
/// the parsed value as entered (`4.5` -> `4.5`, `4` -> `4.0`).
pub fn parse_rating(input: &str) -> EngtrackResult<f64> {
    let trimmed = input.trim();
    let value: f64 = trimmed
        .parse()
        .map_err(|_| EngtrackError::InvalidInput(format!("rating is not a number: {trimmed:?}")))?;
    if !value.is_finite() {
        return Err(EngtrackError::InvalidInput(format!(
            "rating is not a number: {trimmed:?}"
        )));
    }

    let decimals = trimmed
        .split_once('.')
        .map(|(_, frac)| frac.chars().take_while(char::is_ascii_digit).count())
        .unwrap_or(0);
    let value = if decimals > 1 {
        (value * 10.0).round() / 10.0
    } else {
        value
    };
    // -0.0 + 0.0 is +0.0
    Ok(value + 0.0)
}

pub fn rating_in_range(rating: f64) -> bool {
    (0.0..=MAX_RATING).contains(&rating)
}

/// Parse a user-entered date: `MM/DD/YYYY`, `MM/DD/YY` or `YYYY-MM-DD`.
/// Full years must have exactly four digits.
pub fn parse_date_input(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    if input.contains('-') {
        let year = input.split('-').next()?;
        if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        return NaiveDate::parse_from_str(input, CREATED_DATE_FORMAT).ok();
    }
    let year = input.rsplit('/').next()?;
    if !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let fmt = match year.len() {
        2 => "%m/%d/%y",
        4 => "%m/%d/%Y",
        _ => return None,
    };
    NaiveDate::parse_from_str(input, fmt).ok()
}

/// Parse a stored `startDate` / `endDate`; older files may carry other formats.
pub fn parse_record_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), RECORD_DATE_FORMAT)
        .ok()
        .or_else(|| parse_date_input(s))
}
