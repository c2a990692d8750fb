//! Environment configuration, loaded once at startup.

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::error::AppError;

pub const DEFAULT_FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";
pub const SCHEDULES_COLLECTION: &str = "schedules";
pub const CLASSES_COLLECTION: &str = "classes";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    Sqlite,
}

impl FromStr for StoreBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(StoreBackend::Firestore),
            "sqlite" => Ok(StoreBackend::Sqlite),
            other => Err(AppError::Config(format!("unknown TIMETABLE_STORE: {}", other))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct FirestoreConfig {
    pub project_id: String,
    pub database: String,
    pub api_key: Option<String>,
    pub bearer_token: Option<String>,
    pub base_url: String,
    pub timeout: Duration,
    pub schedules_collection: String,
    pub classes_collection: String,
}

impl FirestoreConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        let project_id = env::var("FIRESTORE_PROJECT_ID")
            .map_err(|_| AppError::Config("FIRESTORE_PROJECT_ID is not set".to_string()))?;
        let database = env::var("FIRESTORE_DATABASE").unwrap_or_else(|_| "(default)".to_string());
        let api_key = env::var("FIRESTORE_API_KEY").ok().filter(|v| !v.is_empty());
        let bearer_token = env::var("FIRESTORE_BEARER_TOKEN").ok().filter(|v| !v.is_empty());
        let base_url = env::var("FIRESTORE_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_FIRESTORE_BASE_URL.to_string());
        let timeout_secs = match env::var("FIRESTORE_TIMEOUT_SECS") {
            Ok(raw) => raw.parse::<u64>().map_err(|_| {
                AppError::Config(format!("FIRESTORE_TIMEOUT_SECS is not a number: {}", raw))
            })?,
            Err(_) => 15,
        };

        Ok(Self {
            project_id,
            database,
            api_key,
            bearer_token,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(timeout_secs),
            schedules_collection: SCHEDULES_COLLECTION.to_string(),
            classes_collection: CLASSES_COLLECTION.to_string(),
        })
    }

    /// `projects/{p}/databases/{d}/documents`, the parent of every collection.
    pub fn documents_root(&self) -> String {
        format!(
            "projects/{}/databases/{}/documents",
            self.project_id, self.database
        )
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub store: StoreBackend,
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub firestore: Option<FirestoreConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let store = env::var("TIMETABLE_STORE")
            .unwrap_or_else(|_| "firestore".to_string())
            .parse::<StoreBackend>()?;

        let bind_addr = env::var("TIMETABLE_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string());
        let bind_addr = bind_addr
            .parse()
            .map_err(|_| AppError::Config(format!("invalid TIMETABLE_BIND_ADDR: {}", bind_addr)))?;

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://timetable.db".to_string());

        let firestore = match store {
            StoreBackend::Firestore => Some(FirestoreConfig::new_from_env()?),
            StoreBackend::Sqlite => None,
        };

        Ok(Self {
            store,
            bind_addr,
            database_url,
            firestore,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_store_backend() {
        assert_eq!("Firestore".parse::<StoreBackend>().unwrap(), StoreBackend::Firestore);
        assert_eq!(" sqlite ".parse::<StoreBackend>().unwrap(), StoreBackend::Sqlite);
        assert!("postgres".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn documents_root_includes_database() {
        let config = FirestoreConfig {
            project_id: "timetable-demo".to_string(),
            database: "(default)".to_string(),
            api_key: None,
            bearer_token: None,
            base_url: DEFAULT_FIRESTORE_BASE_URL.to_string(),
            timeout: Duration::from_secs(15),
            schedules_collection: SCHEDULES_COLLECTION.to_string(),
            classes_collection: CLASSES_COLLECTION.to_string(),
        };
        assert_eq!(
            config.documents_root(),
            "projects/timetable-demo/databases/(default)/documents"
        );
    }
}
