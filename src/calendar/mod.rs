//! Turns flat schedule lists into per-date calendar annotations.
//!
//! Everything here is pure: inputs are borrowed, never mutated, and the
//! same inputs always produce the same map.

use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::{ScheduleEntry, SessionType, format_date};

pub const STUDY_COLOR: &str = "blue";
pub const EXAM_COLOR: &str = "orange";
pub const SELECTED_COLOR: &str = "#00adf5";

pub type MarkedDates = BTreeMap<NaiveDate, Annotation>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarkingStyle {
    /// One dot per entry.
    #[default]
    MultiDot,
    /// One marker per date, exam-colored if that day has any exam.
    SingleDot,
}

impl FromStr for MarkingStyle {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "multi" | "multi-dot" => Ok(MarkingStyle::MultiDot),
            "single" | "single-dot" => Ok(MarkingStyle::SingleDot),
            other => Err(AppError::Validation(format!("unknown marking style: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dot {
    pub key: String,
    pub color: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub dots: Vec<Dot>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub marked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dot_color: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub selected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_color: Option<String>,
}

impl Annotation {
    fn select(&mut self) {
        self.selected = true;
        self.selected_color = Some(SELECTED_COLOR.to_string());
    }
}

pub fn color_for(session_type: SessionType) -> &'static str {
    match session_type {
        SessionType::Study => STUDY_COLOR,
        SessionType::Exam => EXAM_COLOR,
    }
}

/// Multi-dot marks with `selected` merged in.
pub fn mark(entries: &[ScheduleEntry], selected: Option<NaiveDate>) -> MarkedDates {
    mark_with_style(entries, selected, MarkingStyle::MultiDot)
}

pub fn mark_with_style(
    entries: &[ScheduleEntry],
    selected: Option<NaiveDate>,
    style: MarkingStyle,
) -> MarkedDates {
    let mut marks = match style {
        MarkingStyle::MultiDot => multi_dot(entries),
        MarkingStyle::SingleDot => single_dot(entries),
    };

    // Merge, never replace: existing dots on the selected day survive.
    if let Some(date) = selected {
        marks.entry(date).or_default().select();
    }

    marks
}

fn multi_dot(entries: &[ScheduleEntry]) -> MarkedDates {
    let mut marks = MarkedDates::new();
    let mut used_keys: HashSet<(NaiveDate, String)> = HashSet::new();

    for entry in entries {
        let base = format!(
            "{}-{}",
            entry.id.clone().unwrap_or_else(|| format_date(entry.date)),
            entry.session_type
        );

        // Id-less entries of the same type on one day would share a key.
        let mut key = base.clone();
        let mut n = 2;
        while !used_keys.insert((entry.date, key.clone())) {
            key = format!("{}-{}", base, n);
            n += 1;
        }

        marks.entry(entry.date).or_default().dots.push(Dot {
            key,
            color: color_for(entry.session_type).to_string(),
        });
    }

    marks
}

fn single_dot(entries: &[ScheduleEntry]) -> MarkedDates {
    let mut marks = MarkedDates::new();

    for entry in entries {
        let annotation = marks.entry(entry.date).or_default();
        let has_exam = annotation.dot_color.as_deref() == Some(EXAM_COLOR)
            || entry.session_type == SessionType::Exam;
        annotation.marked = true;
        annotation.dot_color = Some(if has_exam { EXAM_COLOR } else { STUDY_COLOR }.to_string());
    }

    marks
}

/// Entries on `date`, ordered by period.
pub fn events_of_day(entries: &[ScheduleEntry], date: NaiveDate) -> Vec<ScheduleEntry> {
    let mut day: Vec<ScheduleEntry> = entries.iter().filter(|e| e.date == date).cloned().collect();
    day.sort_by_key(|e| e.period);
    day
}
