use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::models::{
    ClassItem, DEFAULT_SUBJECT, Period, ScheduleEntry, ScheduleSlot, SessionType,
};
use crate::store::ScheduleStore;

/// Where the form is in its save flow.
///
/// `Checking`, `Inserting` and `Updating` are only observable while the
/// corresponding store call is in flight; every call settles back in
/// `Editing` or, on a detected conflict, in `ConfirmingOverwrite`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPhase {
    Editing,
    Checking,
    ConfirmingOverwrite(PendingOverwrite),
    Inserting,
    Updating,
}

/// The entry captured at submit time and the id it would overwrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOverwrite {
    pub id: String,
    pub entry: ScheduleEntry,
}

impl PendingOverwrite {
    pub fn slot(&self) -> ScheduleSlot {
        self.entry.slot()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Inserted { id: String },
    AwaitingConfirmation { id: String, slot: ScheduleSlot },
}

pub struct ScheduleForm {
    store: Arc<dyn ScheduleStore>,
    classes: Vec<ClassItem>,
    date: Option<NaiveDate>,
    class_id: Option<String>,
    subject: String,
    period: Period,
    session_type: SessionType,
    phase: FormPhase,
}

impl ScheduleForm {
    pub fn new(store: Arc<dyn ScheduleStore>) -> Self {
        Self {
            store,
            classes: Vec::new(),
            date: None,
            class_id: None,
            subject: DEFAULT_SUBJECT.to_string(),
            period: Period::default(),
            session_type: SessionType::default(),
            phase: FormPhase::Editing,
        }
    }

    /// Fetches the class choices and pre-selects the first one when nothing
    /// is selected yet. On failure the choices stay empty.
    pub async fn load_classes(&mut self) -> Result<&[ClassItem], AppError> {
        match self.store.list_classes().await {
            Ok(classes) => {
                if self.class_id.is_none() {
                    self.class_id = classes.first().map(|c| c.id.clone());
                }
                self.classes = classes;
                Ok(&self.classes)
            }
            Err(e) => {
                warn!("Failed to load classes: {}", e);
                self.classes.clear();
                Err(e)
            }
        }
    }

    pub fn classes(&self) -> &[ClassItem] {
        &self.classes
    }

    pub fn phase(&self) -> &FormPhase {
        &self.phase
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn class_id(&self) -> Option<&str> {
        self.class_id.as_deref()
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn session_type(&self) -> SessionType {
        self.session_type
    }

    pub fn set_date(&mut self, date: NaiveDate) {
        self.date = Some(date);
        self.touch();
    }

    pub fn set_class(&mut self, class_id: impl Into<String>) {
        let class_id = class_id.into();
        self.class_id = if class_id.is_empty() { None } else { Some(class_id) };
        self.touch();
    }

    pub fn set_subject(&mut self, subject: impl Into<String>) {
        self.subject = subject.into();
        self.touch();
    }

    pub fn set_period(&mut self, period: Period) {
        self.period = period;
        self.touch();
    }

    pub fn set_session_type(&mut self, session_type: SessionType) {
        self.session_type = session_type;
        self.touch();
    }

    /// Back to defaults. Loaded classes are kept.
    pub fn reset(&mut self) {
        self.date = None;
        self.class_id = self.classes.first().map(|c| c.id.clone());
        self.subject = DEFAULT_SUBJECT.to_string();
        self.period = Period::default();
        self.session_type = SessionType::default();
        self.transition(FormPhase::Editing);
    }

    /// The entry the current fields describe, or the first missing field.
    pub fn draft(&self) -> Result<ScheduleEntry, AppError> {
        let date = self
            .date
            .ok_or_else(|| AppError::Validation("Please choose a date.".to_string()))?;
        let class_id = self
            .class_id
            .as_deref()
            .ok_or_else(|| AppError::Validation("Please choose a class.".to_string()))?;

        Ok(ScheduleEntry::new(
            date,
            class_id,
            self.subject.clone(),
            self.period,
            self.session_type,
        ))
    }

    /// Validates, checks the slot, and inserts when it is free. An occupied
    /// slot parks the form in `ConfirmingOverwrite` without writing.
    pub async fn submit(&mut self) -> Result<SubmitOutcome, AppError> {
        self.transition(FormPhase::Editing);
        let entry = self.draft()?;

        self.transition(FormPhase::Checking);
        let check = match self
            .store
            .schedule_exists(entry.date, &entry.class_id, entry.period)
            .await
        {
            Ok(check) => check,
            Err(e) => {
                warn!("Existence check failed for {}: {}", entry.slot(), e);
                self.transition(FormPhase::Editing);
                return Err(e);
            }
        };

        if let (true, Some(id)) = (check.exists, check.id) {
            let slot = entry.slot();
            info!("Schedule already exists for {} ({}), awaiting confirmation", slot, id);
            self.transition(FormPhase::ConfirmingOverwrite(PendingOverwrite {
                id: id.clone(),
                entry,
            }));
            return Ok(SubmitOutcome::AwaitingConfirmation { id, slot });
        }

        self.transition(FormPhase::Inserting);
        let result = self.store.upsert_schedule(&entry, None).await;
        self.transition(FormPhase::Editing);

        let id = result?;
        info!("Added schedule {} for {}", id, entry.slot());
        Ok(SubmitOutcome::Inserted { id })
    }

    /// Writes the pending entry over the conflicting document.
    pub async fn confirm_overwrite(&mut self) -> Result<String, AppError> {
        let pending = match &self.phase {
            FormPhase::ConfirmingOverwrite(pending) => pending.clone(),
            _ => {
                return Err(AppError::Validation(
                    "There is no overwrite waiting for confirmation.".to_string(),
                ));
            }
        };

        self.transition(FormPhase::Updating);
        let result = self
            .store
            .upsert_schedule(&pending.entry, Some(&pending.id))
            .await;
        self.transition(FormPhase::Editing);

        let id = result?;
        info!("Updated schedule {} for {}", id, pending.slot());
        Ok(id)
    }

    /// Drops the pending overwrite. Nothing is written.
    pub fn decline_overwrite(&mut self) {
        if let FormPhase::ConfirmingOverwrite(pending) = &self.phase {
            info!("Overwrite of {} declined", pending.id);
        }
        self.transition(FormPhase::Editing);
    }

    /// Any edit invalidates a pending confirmation.
    fn touch(&mut self) {
        if matches!(self.phase, FormPhase::ConfirmingOverwrite(_)) {
            debug!("Form edited while awaiting confirmation; discarding it");
            self.transition(FormPhase::Editing);
        }
    }

    fn transition(&mut self, next: FormPhase) {
        if self.phase != next {
            debug!("form phase {} -> {}", phase_name(&self.phase), phase_name(&next));
        }
        self.phase = next;
    }
}

fn phase_name(phase: &FormPhase) -> &'static str {
    match phase {
        FormPhase::Editing => "editing",
        FormPhase::Checking => "checking",
        FormPhase::ConfirmingOverwrite(_) => "confirming_overwrite",
        FormPhase::Inserting => "inserting",
        FormPhase::Updating => "updating",
    }
}
