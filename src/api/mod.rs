use axum::Json;
use axum::extract::Query;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::routing::post;
use axum::{Router, extract::State, http::StatusCode, routing::get};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::MarkingStyle;
use crate::error::AppError;
use crate::models::*;
use crate::services::{BoardView, ScheduleBoard, ScheduleForm, SubmitOutcome};
use crate::state::AppState;
use crate::store::ExistenceCheck;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExistsQueryParams {
    date: NaiveDate,
    class_id: String,
    period: Period,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarQueryParams {
    #[serde(default)]
    class_id: Option<String>,
    #[serde(default)]
    month: Option<ScheduleMonth>,
    #[serde(default)]
    selected: Option<NaiveDate>,
    #[serde(default)]
    style: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitScheduleRequest {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub class_id: Option<String>,
    #[serde(default = "default_subject")]
    pub subject: String,
    #[serde(default)]
    pub period: Period,
    #[serde(rename = "type", default)]
    pub session_type: SessionType,
    #[serde(default)]
    pub confirm_overwrite: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteResponse {
    pub id: String,
    pub action: WriteAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteAction {
    Inserted,
    Updated,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/classes", get(list_classes))
        .route("/subjects", get(list_subjects))
        .route("/schedules", get(list_schedules).post(upsert_schedule))
        .route("/schedules/exists", get(schedule_exists))
        .route("/schedules/submit", post(submit_schedule))
        .route("/calendar", get(calendar))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.store.ping().await?;
    Ok(StatusCode::OK)
}

async fn list_classes(State(state): State<AppState>) -> Result<Json<Vec<ClassItem>>, AppError> {
    let classes = state.store.list_classes().await?;
    Ok(Json(classes))
}

async fn list_subjects() -> Json<Vec<&'static str>> {
    Json(SUBJECT_OPTIONS.to_vec())
}

async fn list_schedules(
    State(state): State<AppState>,
    query: Result<Query<ScheduleFilter>, QueryRejection>,
) -> Result<Json<Vec<ScheduleEntry>>, AppError> {
    let Query(filter) = query?;
    let schedules = state.store.list_schedules(&filter).await?;
    Ok(Json(schedules))
}

async fn schedule_exists(
    State(state): State<AppState>,
    query: Result<Query<ExistsQueryParams>, QueryRejection>,
) -> Result<Json<ExistenceCheck>, AppError> {
    let Query(params) = query?;
    let check = state
        .store
        .schedule_exists(params.date, &params.class_id, params.period)
        .await?;
    Ok(Json(check))
}

/// Direct write, no existence check.
async fn upsert_schedule(
    State(state): State<AppState>,
    body: Result<Json<UpsertScheduleRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<WriteResponse>), AppError> {
    let Json(req) = body?;
    let (entry, id) = req.into_parts();
    if entry.class_id.is_empty() {
        return Err(AppError::Validation("Please choose a class.".to_string()));
    }

    let (status, action) = match id {
        Some(_) => (StatusCode::OK, WriteAction::Updated),
        None => (StatusCode::CREATED, WriteAction::Inserted),
    };
    let id = state.store.upsert_schedule(&entry, id.as_deref()).await?;
    Ok((status, Json(WriteResponse { id, action })))
}

/// The add-schedule flow. An occupied slot answers 409 unless the request
/// already carries `confirmOverwrite: true`.
async fn submit_schedule(
    State(state): State<AppState>,
    body: Result<Json<SubmitScheduleRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<WriteResponse>), AppError> {
    let Json(req) = body?;
    let mut form = ScheduleForm::new(state.store.clone());
    if let Some(date) = req.date {
        form.set_date(date);
    }
    if let Some(class_id) = req.class_id {
        form.set_class(class_id);
    }
    form.set_subject(req.subject);
    form.set_period(req.period);
    form.set_session_type(req.session_type);

    match form.submit().await? {
        SubmitOutcome::Inserted { id } => Ok((
            StatusCode::CREATED,
            Json(WriteResponse { id, action: WriteAction::Inserted }),
        )),
        SubmitOutcome::AwaitingConfirmation { id, slot } => {
            if !req.confirm_overwrite {
                form.decline_overwrite();
                return Err(AppError::Conflict { slot, id });
            }
            let id = form.confirm_overwrite().await?;
            Ok((StatusCode::OK, Json(WriteResponse { id, action: WriteAction::Updated })))
        }
    }
}

async fn calendar(
    State(state): State<AppState>,
    query: Result<Query<CalendarQueryParams>, QueryRejection>,
) -> Result<Json<BoardView>, AppError> {
    let Query(params) = query?;
    let style = match params.style.as_deref() {
        Some(raw) => raw.parse::<MarkingStyle>()?,
        None => MarkingStyle::default(),
    };
    let month = params.month.unwrap_or_else(ScheduleMonth::current);

    let mut board = ScheduleBoard::new(state.store.clone(), month).with_style(style);
    match params.class_id {
        Some(class_id) => board.select_class(class_id).await?,
        None => board.load_classes().await?,
    }
    board.select_date(params.selected);

    Ok(Json(board.view()))
}
