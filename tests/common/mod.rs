#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use timetable::db::SqliteScheduleStore;
use timetable::error::AppError;
use timetable::models::{ClassItem, Period, ScheduleEntry, ScheduleFilter, SessionType, parse_date};
use timetable::store::{ExistenceCheck, ScheduleStore};

/// SQLite store that counts calls and can be told to fail.
pub struct CountingStore {
    pub inner: SqliteScheduleStore,
    pub exists_calls: AtomicUsize,
    pub writes: AtomicUsize,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
}

impl CountingStore {
    pub async fn new() -> Arc<Self> {
        let inner = SqliteScheduleStore::in_memory()
            .await
            .expect("Failed to create test db");
        inner
            .upsert_class(&ClassItem::new("A1", "Lớp A1"))
            .await
            .expect("seed class A1");
        inner
            .upsert_class(&ClassItem::new("B2", "Lớp B2"))
            .await
            .expect("seed class B2");

        Arc::new(Self {
            inner,
            exists_calls: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        })
    }

    pub fn exists_calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_read(&self) -> Result<(), AppError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::StoreUnavailable("simulated outage".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ScheduleStore for CountingStore {
    async fn list_classes(&self) -> Result<Vec<ClassItem>, AppError> {
        self.check_read()?;
        self.inner.list_classes().await
    }

    async fn list_schedules(&self, filter: &ScheduleFilter) -> Result<Vec<ScheduleEntry>, AppError> {
        self.check_read()?;
        self.inner.list_schedules(filter).await
    }

    async fn schedule_exists(
        &self,
        date: NaiveDate,
        class_id: &str,
        period: Period,
    ) -> Result<ExistenceCheck, AppError> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        self.check_read()?;
        self.inner.schedule_exists(date, class_id, period).await
    }

    async fn upsert_schedule(
        &self,
        entry: &ScheduleEntry,
        id: Option<&str>,
    ) -> Result<String, AppError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::WriteFailed("simulated outage".to_string()));
        }
        self.inner.upsert_schedule(entry, id).await
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.check_read()?;
        self.inner.ping().await
    }
}

pub fn date(raw: &str) -> NaiveDate {
    parse_date(raw).expect("valid date")
}

pub fn period(n: i64) -> Period {
    Period::new(n).expect("valid period")
}

pub fn entry(raw_date: &str, class_id: &str, n: i64, session_type: SessionType, subject: &str) -> ScheduleEntry {
    ScheduleEntry::new(date(raw_date), class_id, subject, period(n), session_type)
}
