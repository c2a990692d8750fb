use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const DEFAULT_SUBJECT: &str = "Toán";
pub const SUBJECT_OPTIONS: [&str; 3] = ["Toán", "Văn", "Anh"];

/// Calendar date format used on the wire and in the store.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    #[default]
    Study,
    Exam,
}

impl SessionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::Study => "study",
            SessionType::Exam => "exam",
        }
    }
}

impl FromStr for SessionType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "study" => Ok(SessionType::Study),
            "exam" => Ok(SessionType::Exam),
            other => Err(AppError::Validation(format!("unknown session type: {}", other))),
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numbered slot within a day, 1 through 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Period(u8);

impl Period {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: i64) -> Result<Self, AppError> {
        if (Self::MIN as i64..=Self::MAX as i64).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(AppError::Validation(format!(
                "period must be between {} and {}, got {}",
                Self::MIN,
                Self::MAX,
                value
            )))
        }
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    pub fn all() -> impl Iterator<Item = Period> {
        (Self::MIN..=Self::MAX).map(Period)
    }
}

impl Default for Period {
    fn default() -> Self {
        Self(Self::MIN)
    }
}

impl TryFrom<i64> for Period {
    type Error = AppError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Period::new(value)
    }
}

impl From<Period> for i64 {
    fn from(period: Period) -> Self {
        period.0 as i64
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A `yyyy-MM` month used to narrow schedule listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScheduleMonth(String);

impl ScheduleMonth {
    pub fn of(date: NaiveDate) -> Self {
        Self(date.format("%Y-%m").to_string())
    }

    pub fn current() -> Self {
        Self::of(chrono::Local::now().date_naive())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        format_date(date).starts_with(&self.0)
    }
}

impl FromStr for ScheduleMonth {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let probe = format!("{}-01", s);
        if s.len() != 7 || NaiveDate::parse_from_str(&probe, DATE_FORMAT).is_err() {
            return Err(AppError::Validation(format!(
                "month must look like yyyy-MM, got {:?}",
                s
            )));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for ScheduleMonth {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ScheduleMonth> for String {
    fn from(month: ScheduleMonth) -> Self {
        month.0
    }
}

impl fmt::Display for ScheduleMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    /// Assigned by the store; `None` until the entry has been persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub date: NaiveDate,
    pub class_id: String,
    pub subject: String,
    pub period: Period,
    #[serde(rename = "type")]
    pub session_type: SessionType,
}

impl ScheduleEntry {
    pub fn new(
        date: NaiveDate,
        class_id: impl Into<String>,
        subject: impl Into<String>,
        period: Period,
        session_type: SessionType,
    ) -> Self {
        Self {
            id: None,
            date,
            class_id: class_id.into(),
            subject: subject.into(),
            period,
            session_type,
        }
    }

    pub fn slot(&self) -> ScheduleSlot {
        ScheduleSlot {
            date: self.date,
            class_id: self.class_id.clone(),
            period: self.period,
        }
    }
}

/// The `(date, classId, period)` triple that identifies at most one entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSlot {
    pub date: NaiveDate,
    pub class_id: String,
    pub period: Period,
}

impl fmt::Display for ScheduleSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "class {} period {} on {}",
            self.class_id,
            self.period,
            format_date(self.date)
        )
    }
}

/// Client-side filter applied after a full collection fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleFilter {
    #[serde(default)]
    pub class_id: Option<String>,
    #[serde(default)]
    pub month: Option<ScheduleMonth>,
}

impl ScheduleFilter {
    pub fn matches(&self, entry: &ScheduleEntry) -> bool {
        if let Some(class_id) = &self.class_id {
            if &entry.class_id != class_id {
                return false;
            }
        }
        if let Some(month) = &self.month {
            if !month.contains(entry.date) {
                return false;
            }
        }
        true
    }

    pub fn apply(&self, entries: Vec<ScheduleEntry>) -> Vec<ScheduleEntry> {
        entries.into_iter().filter(|e| self.matches(e)).collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertScheduleRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub date: NaiveDate,
    pub class_id: String,
    #[serde(default = "default_subject")]
    pub subject: String,
    #[serde(default)]
    pub period: Period,
    #[serde(rename = "type", default)]
    pub session_type: SessionType,
}

impl UpsertScheduleRequest {
    pub fn into_parts(self) -> (ScheduleEntry, Option<String>) {
        let id = self.id;
        let entry = ScheduleEntry::new(
            self.date,
            self.class_id,
            self.subject,
            self.period,
            self.session_type,
        );
        (entry, id)
    }
}

pub fn default_subject() -> String {
    DEFAULT_SUBJECT.to_string()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|_| AppError::Validation(format!("date must look like yyyy-MM-dd, got {:?}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(date: &str, class_id: &str, period: i64, session_type: SessionType) -> ScheduleEntry {
        ScheduleEntry::new(
            parse_date(date).unwrap(),
            class_id,
            "Toán",
            Period::new(period).unwrap(),
            session_type,
        )
    }

    #[test]
    fn period_rejects_out_of_range() {
        assert!(Period::new(0).is_err());
        assert!(Period::new(6).is_err());
        assert_eq!(Period::new(5).unwrap().get(), 5);
        assert_eq!(Period::default().get(), 1);
        assert_eq!(Period::all().count(), 5);
    }

    #[test]
    fn month_parsing() {
        assert!("2025-09".parse::<ScheduleMonth>().is_ok());
        assert!("2025-9".parse::<ScheduleMonth>().is_err());
        assert!("2025-13".parse::<ScheduleMonth>().is_err());
        assert!("2025-09-30".parse::<ScheduleMonth>().is_err());
    }

    #[test]
    fn entry_uses_wire_field_names() {
        let e = entry("2025-09-30", "A1", 2, SessionType::Exam);
        let value = serde_json::to_value(&e).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "date": "2025-09-30",
                "classId": "A1",
                "subject": "Toán",
                "period": 2,
                "type": "exam"
            })
        );
    }

    #[test]
    fn entry_rejects_bad_period_on_deserialize() {
        let raw = r#"{"date":"2025-09-30","classId":"A1","subject":"Văn","period":9,"type":"study"}"#;
        assert!(serde_json::from_str::<ScheduleEntry>(raw).is_err());
    }

    #[test]
    fn filter_by_class_and_month() {
        let entries = vec![
            entry("2025-09-30", "A1", 1, SessionType::Study),
            entry("2025-09-30", "A1", 2, SessionType::Exam),
            entry("2025-10-01", "A1", 1, SessionType::Study),
            entry("2025-09-30", "B2", 1, SessionType::Study),
        ];

        let september = ScheduleFilter {
            class_id: Some("A1".to_string()),
            month: Some("2025-09".parse().unwrap()),
        };
        assert_eq!(september.apply(entries.clone()).len(), 2);

        let october = ScheduleFilter {
            class_id: Some("A1".to_string()),
            month: Some("2025-10".parse().unwrap()),
        };
        assert_eq!(october.apply(entries.clone()).len(), 1);

        assert_eq!(ScheduleFilter::default().apply(entries).len(), 4);
    }

    #[test]
    fn upsert_request_fills_defaults() {
        let raw = r#"{"date":"2025-09-30","classId":"A1"}"#;
        let req: UpsertScheduleRequest = serde_json::from_str(raw).unwrap();
        let (entry, id) = req.into_parts();
        assert!(id.is_none());
        assert_eq!(entry.subject, DEFAULT_SUBJECT);
        assert_eq!(entry.period, Period::default());
        assert_eq!(entry.session_type, SessionType::Study);
    }
}
