//! The persistence contract every schedule backend implements.
//!
//! Callers hold an `Arc<dyn ScheduleStore>` so the remote Firestore backend
//! and the local SQLite backend are interchangeable, including in tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;

use crate::error::AppError;
use crate::models::{ClassItem, Period, ScheduleEntry, ScheduleFilter};

/// Result of looking up a `(date, classId, period)` slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExistenceCheck {
    pub exists: bool,
    pub id: Option<String>,
}

impl ExistenceCheck {
    pub fn found(id: impl Into<String>) -> Self {
        Self {
            exists: true,
            id: Some(id.into()),
        }
    }

    pub fn missing() -> Self {
        Self::default()
    }
}

#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// All classes, in store-defined order. Fails with `StoreUnavailable`.
    async fn list_classes(&self) -> Result<Vec<ClassItem>, AppError>;

    /// Full fetch of the schedules collection, then `filter` applied locally.
    async fn list_schedules(&self, filter: &ScheduleFilter) -> Result<Vec<ScheduleEntry>, AppError>;

    /// Equality lookup on all three fields; only the first match is reported.
    async fn schedule_exists(
        &self,
        date: NaiveDate,
        class_id: &str,
        period: Period,
    ) -> Result<ExistenceCheck, AppError>;

    /// Creates a document when `id` is `None`, otherwise overwrites that
    /// document's fields. Last writer wins. Returns the written id.
    async fn upsert_schedule(
        &self,
        entry: &ScheduleEntry,
        id: Option<&str>,
    ) -> Result<String, AppError>;

    async fn ping(&self) -> Result<(), AppError>;
}
