pub mod repository;

pub use repository::SqliteScheduleStore;
