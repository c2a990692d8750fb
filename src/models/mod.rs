pub mod class;
pub mod schedule;

pub use class::ClassItem;
pub use schedule::{
    DEFAULT_SUBJECT, Period, SUBJECT_OPTIONS, ScheduleEntry, ScheduleFilter, ScheduleMonth,
    ScheduleSlot, SessionType, UpsertScheduleRequest, default_subject, format_date, parse_date,
};
