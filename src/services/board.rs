use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::warn;

use crate::calendar::{self, MarkedDates, MarkingStyle};
use crate::error::AppError;
use crate::models::{ClassItem, ScheduleEntry, ScheduleFilter, ScheduleMonth};
use crate::store::ScheduleStore;

/// State behind the calendar overview: one class, one month, one selected day.
pub struct ScheduleBoard {
    store: Arc<dyn ScheduleStore>,
    classes: Vec<ClassItem>,
    selected_class: Option<String>,
    month: ScheduleMonth,
    schedules: Vec<ScheduleEntry>,
    selected_date: Option<NaiveDate>,
    style: MarkingStyle,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardView {
    pub class_id: Option<String>,
    pub month: ScheduleMonth,
    pub selected_date: Option<NaiveDate>,
    pub marked_dates: MarkedDates,
    pub events: Vec<ScheduleEntry>,
}

impl ScheduleBoard {
    pub fn new(store: Arc<dyn ScheduleStore>, month: ScheduleMonth) -> Self {
        Self {
            store,
            classes: Vec::new(),
            selected_class: None,
            month,
            schedules: Vec::new(),
            selected_date: None,
            style: MarkingStyle::default(),
        }
    }

    pub fn with_style(mut self, style: MarkingStyle) -> Self {
        self.style = style;
        self
    }

    /// Loads the class list and, if no class is chosen yet, selects the
    /// first one and loads its schedules.
    pub async fn load_classes(&mut self) -> Result<(), AppError> {
        self.classes = self.store.list_classes().await?;
        if self.selected_class.is_none() {
            if let Some(first) = self.classes.first().map(|c| c.id.clone()) {
                self.select_class(first).await?;
            }
        }
        Ok(())
    }

    /// Switches class. On failure the previous class and its schedules stay.
    pub async fn select_class(&mut self, class_id: impl Into<String>) -> Result<(), AppError> {
        let class_id = class_id.into();
        self.schedules = self.fetch(&class_id, &self.month).await?;
        self.selected_class = Some(class_id);
        Ok(())
    }

    /// Switches month. On failure the previous month and its schedules stay.
    pub async fn set_month(&mut self, month: ScheduleMonth) -> Result<(), AppError> {
        if let Some(class_id) = &self.selected_class {
            self.schedules = self.fetch(class_id, &month).await?;
        }
        self.month = month;
        Ok(())
    }

    /// Refetches the selected class's month. Keeps the previous list if the
    /// store call fails.
    pub async fn reload(&mut self) -> Result<(), AppError> {
        if let Some(class_id) = &self.selected_class {
            self.schedules = self.fetch(class_id, &self.month).await?;
        }
        Ok(())
    }

    async fn fetch(
        &self,
        class_id: &str,
        month: &ScheduleMonth,
    ) -> Result<Vec<ScheduleEntry>, AppError> {
        let filter = ScheduleFilter {
            class_id: Some(class_id.to_string()),
            month: Some(month.clone()),
        };

        self.store.list_schedules(&filter).await.map_err(|e| {
            warn!("Failed to load schedules for {:?}: {}", filter, e);
            e
        })
    }

    pub fn select_date(&mut self, date: Option<NaiveDate>) {
        self.selected_date = date;
    }

    pub fn classes(&self) -> &[ClassItem] {
        &self.classes
    }

    pub fn selected_class(&self) -> Option<&str> {
        self.selected_class.as_deref()
    }

    pub fn month(&self) -> &ScheduleMonth {
        &self.month
    }

    pub fn schedules(&self) -> &[ScheduleEntry] {
        &self.schedules
    }

    pub fn marked_dates(&self) -> MarkedDates {
        calendar::mark_with_style(&self.schedules, self.selected_date, self.style)
    }

    /// Empty until a date is selected.
    pub fn events_of_day(&self) -> Vec<ScheduleEntry> {
        match self.selected_date {
            Some(date) => calendar::events_of_day(&self.schedules, date),
            None => Vec::new(),
        }
    }

    pub fn view(&self) -> BoardView {
        BoardView {
            class_id: self.selected_class.clone(),
            month: self.month.clone(),
            selected_date: self.selected_date,
            marked_dates: self.marked_dates(),
            events: self.events_of_day(),
        }
    }
}
