pub mod board;
pub mod form;

pub use board::{BoardView, ScheduleBoard};
pub use form::{FormPhase, PendingOverwrite, ScheduleForm, SubmitOutcome};
