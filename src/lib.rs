pub mod api;
pub mod calendar;
pub mod config;
pub mod db;
pub mod error;
pub mod firestore;
pub mod models;
pub mod services;
pub mod state;
pub mod store;

pub use api::router;
pub use error::AppError;
pub use state::AppState;
