use std::sync::Arc;

use crate::store::ScheduleStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ScheduleStore>,
}
