use std::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{ClassItem, Period, ScheduleEntry, ScheduleFilter, format_date, parse_date};
use crate::store::{ExistenceCheck, ScheduleStore};

/// Schedule store on a local SQLite database.
#[derive(Clone)]
pub struct SqliteScheduleStore {
    db: SqlitePool,
}

#[derive(Debug, FromRow)]
struct ScheduleRow {
    id: String,
    date: String,
    class_id: String,
    subject: String,
    period: i64,
    session_type: String,
}

impl TryFrom<ScheduleRow> for ScheduleEntry {
    type Error = AppError;

    fn try_from(row: ScheduleRow) -> Result<Self, Self::Error> {
        Ok(ScheduleEntry {
            id: Some(row.id),
            date: parse_date(&row.date)?,
            class_id: row.class_id,
            subject: row.subject,
            period: Period::new(row.period)?,
            session_type: row.session_type.parse()?,
        })
    }
}

impl SqliteScheduleStore {
    /// Opens (creating if needed) the database at `url` and runs migrations.
    pub async fn connect(url: &str) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let db = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .map_err(|e| AppError::Database(e.into()))?;
        Ok(Self { db })
    }

    /// A private in-memory database. One connection, so every query sees
    /// the same data.
    pub async fn in_memory() -> Result<Self, AppError> {
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .map_err(|e| AppError::Database(e.into()))?;
        Ok(Self { db })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db
    }

    pub async fn upsert_class(&self, class: &ClassItem) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO classes (id, name) VALUES (?, ?) ON CONFLICT(id) DO UPDATE SET name = excluded.name",
        )
        .bind(&class.id)
        .bind(&class.name)
        .execute(&self.db)
        .await
        .map_err(|e| AppError::WriteFailed(format!("upsert class {}: {}", class.id, e)))?;
        Ok(())
    }
}

#[async_trait]
impl ScheduleStore for SqliteScheduleStore {
    async fn list_classes(&self) -> Result<Vec<ClassItem>, AppError> {
        sqlx::query_as::<_, (String, String)>("SELECT id, name FROM classes ORDER BY id")
            .fetch_all(&self.db)
            .await
            .map(|rows| {
                rows.into_iter()
                    .map(|(id, name)| ClassItem { id, name })
                    .collect()
            })
            .map_err(|e| AppError::StoreUnavailable(format!("list classes: {}", e)))
    }

    async fn list_schedules(&self, filter: &ScheduleFilter) -> Result<Vec<ScheduleEntry>, AppError> {
        let rows = sqlx::query_as::<_, ScheduleRow>(
            "SELECT id, date, class_id, subject, period, type AS session_type FROM schedules ORDER BY date, period, rowid",
        )
        .fetch_all(&self.db)
        .await
        .map_err(|e| AppError::StoreUnavailable(format!("list schedules: {}", e)))?;

        let mut schedules = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.id.clone();
            match ScheduleEntry::try_from(row) {
                Ok(entry) => schedules.push(entry),
                Err(e) => tracing::warn!("Failed to parse schedule row {}: {}", id, e),
            }
        }

        Ok(filter.apply(schedules))
    }

    async fn schedule_exists(
        &self,
        date: NaiveDate,
        class_id: &str,
        period: Period,
    ) -> Result<ExistenceCheck, AppError> {
        let found = sqlx::query_as::<_, (String,)>(
            "SELECT id FROM schedules WHERE date = ? AND class_id = ? AND period = ? ORDER BY rowid LIMIT 1",
        )
        .bind(format_date(date))
        .bind(class_id)
        .bind(i64::from(period))
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::StoreUnavailable(format!("schedule exists: {}", e)))?;

        Ok(match found {
            Some((id,)) => ExistenceCheck::found(id),
            None => ExistenceCheck::missing(),
        })
    }

    async fn upsert_schedule(
        &self,
        entry: &ScheduleEntry,
        id: Option<&str>,
    ) -> Result<String, AppError> {
        match id {
            Some(id) => {
                let affected = sqlx::query(
                    "UPDATE schedules SET date = ?, class_id = ?, subject = ?, period = ?, type = ? WHERE id = ?",
                )
                .bind(format_date(entry.date))
                .bind(&entry.class_id)
                .bind(&entry.subject)
                .bind(i64::from(entry.period))
                .bind(entry.session_type.as_str())
                .bind(id)
                .execute(&self.db)
                .await
                .map_err(|e| AppError::WriteFailed(format!("update schedule {}: {}", id, e)))?
                .rows_affected();

                if affected == 0 {
                    return Err(AppError::WriteFailed(format!("no schedule with id {}", id)));
                }
                tracing::info!("Updated schedule {} ({})", id, entry.slot());
                Ok(id.to_string())
            }
            None => {
                let new_id = Uuid::new_v4().to_string();
                sqlx::query(
                    "INSERT INTO schedules (id, date, class_id, subject, period, type) VALUES (?, ?, ?, ?, ?, ?)",
                )
                .bind(&new_id)
                .bind(format_date(entry.date))
                .bind(&entry.class_id)
                .bind(&entry.subject)
                .bind(i64::from(entry.period))
                .bind(entry.session_type.as_str())
                .execute(&self.db)
                .await
                .map_err(|e| AppError::WriteFailed(format!("insert schedule: {}", e)))?;

                tracing::info!("Created schedule {} ({})", new_id, entry.slot());
                Ok(new_id)
            }
        }
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("select 1")
            .execute(&self.db)
            .await
            .map_err(|e| AppError::StoreUnavailable(format!("ping: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SessionType;

    async fn setup_test_store() -> SqliteScheduleStore {
        SqliteScheduleStore::in_memory()
            .await
            .expect("Failed to create test db")
    }

    fn entry(date: &str, class_id: &str, period: i64, session_type: SessionType, subject: &str) -> ScheduleEntry {
        ScheduleEntry::new(
            parse_date(date).unwrap(),
            class_id,
            subject,
            Period::new(period).unwrap(),
            session_type,
        )
    }

    #[tokio::test]
    async fn test_insert_then_exists() {
        let store = setup_test_store().await;
        let e = entry("2025-09-30", "A1", 1, SessionType::Study, "Toán");

        let before = store
            .schedule_exists(e.date, &e.class_id, e.period)
            .await
            .expect("exists");
        assert!(!before.exists);
        assert!(before.id.is_none());

        let id = store.upsert_schedule(&e, None).await.expect("insert");
        let after = store
            .schedule_exists(e.date, &e.class_id, e.period)
            .await
            .expect("exists");
        assert_eq!(after, ExistenceCheck::found(id));
    }

    #[tokio::test]
    async fn test_update_overwrites_fields() {
        let store = setup_test_store().await;
        let id = store
            .upsert_schedule(&entry("2025-09-30", "A1", 1, SessionType::Study, "Toán"), None)
            .await
            .expect("insert");

        let replacement = entry("2025-09-30", "A1", 1, SessionType::Exam, "Văn");
        let written = store.upsert_schedule(&replacement, Some(&id)).await.expect("update");
        assert_eq!(written, id);

        let all = store.list_schedules(&ScheduleFilter::default()).await.expect("list");
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].subject, "Văn");
        assert_eq!(all[0].session_type, SessionType::Exam);
    }

    #[tokio::test]
    async fn test_update_missing_id_fails() {
        let store = setup_test_store().await;
        let result = store
            .upsert_schedule(&entry("2025-09-30", "A1", 1, SessionType::Study, "Toán"), Some("ghost"))
            .await;
        assert!(matches!(result, Err(AppError::WriteFailed(_))));
    }

    #[tokio::test]
    async fn test_list_filters_by_class_and_month() {
        let store = setup_test_store().await;
        for e in [
            entry("2025-09-30", "A1", 1, SessionType::Study, "Toán"),
            entry("2025-09-30", "A1", 2, SessionType::Exam, "Văn"),
            entry("2025-09-12", "B2", 1, SessionType::Study, "Anh"),
        ] {
            store.upsert_schedule(&e, None).await.expect("insert");
        }

        let september = ScheduleFilter {
            class_id: Some("A1".to_string()),
            month: Some("2025-09".parse().unwrap()),
        };
        assert_eq!(store.list_schedules(&september).await.unwrap().len(), 2);

        let october = ScheduleFilter {
            class_id: Some("A1".to_string()),
            month: Some("2025-10".parse().unwrap()),
        };
        assert!(store.list_schedules(&october).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_classes() {
        let store = setup_test_store().await;
        store.upsert_class(&ClassItem::new("B2", "Lớp B2")).await.unwrap();
        store.upsert_class(&ClassItem::new("A1", "Lớp A1")).await.unwrap();
        store.upsert_class(&ClassItem::new("A1", "Lớp A1 (new)")).await.unwrap();

        let classes = store.list_classes().await.expect("list classes");
        assert_eq!(
            classes,
            vec![ClassItem::new("A1", "Lớp A1 (new)"), ClassItem::new("B2", "Lớp B2")]
        );
    }

    #[tokio::test]
    async fn test_malformed_rows_are_skipped() {
        let store = setup_test_store().await;
        sqlx::query(
            "INSERT INTO schedules (id, date, class_id, subject, period, type) VALUES ('bad', '30/09/2025', 'A1', 'Toán', 1, 'study')",
        )
        .execute(store.pool())
        .await
        .unwrap();
        store
            .upsert_schedule(&entry("2025-09-30", "A1", 1, SessionType::Study, "Toán"), None)
            .await
            .unwrap();

        let all = store.list_schedules(&ScheduleFilter::default()).await.unwrap();
        assert_eq!(all.len(), 1);
    }
}
