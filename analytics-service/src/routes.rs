use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use mongodb::bson::{DateTime, Document, oid::ObjectId};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use analytics_utils::aggregate::{NamedCount, VariantConversions, VariantSessions, clamp_limit};
use analytics_utils::export::to_csv;
use analytics_utils::recorder::{clamp_unit, require_fields, require_session};
use analytics_utils::window::TimeWindow;
use schema::db::{EVENT_COLLECTION, FEEDBACK_COLLECTION, get_collection};
use schema::{Event, Feedback, Variant};

use crate::config::AppState;
use crate::error::Error;
use crate::seed;
use crate::store;

/// Column order of the events export, matching the dashboard's CSV.
const EVENT_CSV_COLUMNS: [&str; 7] = ["sessionId", "variant", "name", "x", "y", "meta", "createdAt"];
/// Column order of the feedback export.
const FEEDBACK_CSV_COLUMNS: [&str; 4] = ["rating", "text", "sessionId", "createdAt"];

pub async fn get_root() -> &'static str {
    "API running. Try /api/health, /api/stats, /api/heatmap, /api/feedback, /api/events"
}

pub async fn get_health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

#[derive(Deserialize)]
pub struct EventBody {
    #[serde(rename = "sessionId", default)]
    session_id: String,
    #[serde(default)]
    variant: Variant,
    #[serde(default)]
    name: String,
    meta: Option<Document>,
    x: Option<f64>,
    y: Option<f64>,
}

pub async fn post_event(
    State(state): State<AppState>,
    Json(body): Json<EventBody>,
) -> Result<Json<Value>, Error> {
    require_fields(&body.session_id, &body.name)?;
    debug!(session = %body.session_id, name = %body.name, "EVENT");

    let event = Event {
        id: Some(ObjectId::new()),
        session_id: body.session_id,
        variant: body.variant,
        name: body.name,
        meta: body.meta,
        // Clamped on write so heatmap consumers never see a coordinate
        // outside the unit square.
        x: body.x.map(clamp_unit),
        y: body.y.map(clamp_unit),
        created_at: DateTime::now(),
    };

    let collection = get_collection::<Event>(&state.client, EVENT_COLLECTION).await;
    store::insert_event(&collection, &event).await?;

    let id = event.id.map(|id| id.to_hex()).unwrap_or_default();
    Ok(Json(json!({ "ok": true, "id": id })))
}

#[derive(Deserialize)]
pub struct FeedbackBody {
    #[serde(rename = "sessionId", default)]
    session_id: String,
    rating: Option<i32>,
    text: Option<String>,
}

pub async fn post_feedback(
    State(state): State<AppState>,
    Json(body): Json<FeedbackBody>,
) -> Result<Json<Value>, Error> {
    require_session(&body.session_id)?;
    debug!(session = %body.session_id, "FEEDBACK");

    let feedback = Feedback {
        id: None,
        session_id: body.session_id,
        rating: body.rating,
        text: body.text,
        created_at: DateTime::now(),
    };

    let collection = get_collection::<Feedback>(&state.client, FEEDBACK_COLLECTION).await;
    store::insert_feedback(&collection, &feedback).await?;

    Ok(Json(json!({ "ok": true })))
}

#[derive(Deserialize)]
pub struct WindowQuery {
    from: Option<String>,
    to: Option<String>,
    format: Option<String>,
}

#[derive(Serialize)]
struct FeedbackRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    rating: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "sessionId")]
    session_id: String,
    #[serde(rename = "createdAt")]
    created_at: String,
}

impl From<Feedback> for FeedbackRow {
    fn from(feedback: Feedback) -> Self {
        let created_at = feedback.created_at_rfc3339();
        FeedbackRow {
            rating: feedback.rating,
            text: feedback.text,
            session_id: feedback.session_id,
            created_at,
        }
    }
}

pub async fn get_feedback(
    State(state): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> Result<Response, Error> {
    let window = TimeWindow::resolve(query.from.as_deref(), query.to.as_deref());

    let collection = get_collection::<Feedback>(&state.client, FEEDBACK_COLLECTION).await;
    let rows: Vec<FeedbackRow> = store::recent_feedback(&collection, &window)
        .await?
        .into_iter()
        .map(FeedbackRow::from)
        .collect();

    if wants_csv(query.format.as_deref()) {
        return Ok(csv_response(&rows, &FEEDBACK_CSV_COLUMNS));
    }
    Ok(Json(rows).into_response())
}

pub async fn get_heatmap(
    State(state): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> Result<Json<Vec<store::HeatmapPoint>>, Error> {
    let window = TimeWindow::resolve(query.from.as_deref(), query.to.as_deref());

    let collection = get_collection::<Event>(&state.client, EVENT_COLLECTION).await;
    let points = store::recent_heatmap_points(&collection, &window).await?;
    Ok(Json(points))
}

#[derive(Deserialize)]
pub struct StatsQuery {
    from: Option<String>,
    to: Option<String>,
    /// Stats filters by `event`; the raw export filters by `name`. The
    /// asymmetry is the documented external contract and is kept as-is.
    event: Option<String>,
}

#[derive(Serialize)]
pub struct StatsResponse {
    #[serde(rename = "eventsByName")]
    pub events_by_name: Vec<NamedCount>,
    #[serde(rename = "sessionsByVariant")]
    pub sessions_by_variant: Vec<VariantSessions>,
    #[serde(rename = "conversionsByVariant")]
    pub conversions_by_variant: Vec<VariantConversions>,
}

pub async fn get_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<StatsResponse>, Error> {
    let window = TimeWindow::resolve(query.from.as_deref(), query.to.as_deref());
    let name_filter = query.event.as_deref().filter(|name| !name.is_empty());

    let collection = get_collection::<Event>(&state.client, EVENT_COLLECTION).await;

    // All-or-nothing: any storage failure fails the whole request rather
    // than returning a partial aggregate.
    let events_by_name = store::events_by_name(&collection, &window, name_filter).await?;
    let sessions_by_variant = store::sessions_by_variant(&collection, &window).await?;
    let conversions_by_variant = store::conversions_by_variant(&collection, &window).await?;

    Ok(Json(StatsResponse {
        events_by_name,
        sessions_by_variant,
        conversions_by_variant,
    }))
}

#[derive(Deserialize)]
pub struct EventsQuery {
    from: Option<String>,
    to: Option<String>,
    name: Option<String>,
    variant: Option<String>,
    limit: Option<i64>,
    format: Option<String>,
}

#[derive(Serialize)]
struct EventRow {
    #[serde(rename = "sessionId")]
    session_id: String,
    variant: Variant,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    meta: Option<Document>,
    #[serde(skip_serializing_if = "Option::is_none")]
    x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    y: Option<f64>,
    #[serde(rename = "createdAt")]
    created_at: String,
}

impl From<Event> for EventRow {
    fn from(event: Event) -> Self {
        let created_at = event.created_at_rfc3339();
        EventRow {
            session_id: event.session_id,
            variant: event.variant,
            name: event.name,
            meta: event.meta,
            x: event.x,
            y: event.y,
            created_at,
        }
    }
}

pub async fn get_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Result<Response, Error> {
    let window = TimeWindow::resolve(query.from.as_deref(), query.to.as_deref());
    let name = query.name.as_deref().filter(|name| !name.is_empty());
    let variant = query.variant.as_deref().filter(|variant| !variant.is_empty());
    let limit = clamp_limit(query.limit);

    let collection = get_collection::<Event>(&state.client, EVENT_COLLECTION).await;
    let rows: Vec<EventRow> = store::recent_events(&collection, &window, name, variant, limit)
        .await?
        .into_iter()
        .map(EventRow::from)
        .collect();

    if wants_csv(query.format.as_deref()) {
        return Ok(csv_response(&rows, &EVENT_CSV_COLUMNS));
    }
    Ok(Json(rows).into_response())
}

#[derive(Deserialize)]
pub struct SeedQuery {
    count: Option<u32>,
}

/// Bulk-generates synthetic sessions and events. The route is only mounted
/// outside production.
pub async fn post_seed(
    State(state): State<AppState>,
    Query(query): Query<SeedQuery>,
) -> Result<Json<Value>, Error> {
    let count = query.count.unwrap_or(seed::DEFAULT_SESSION_COUNT);
    debug!(count, "SEED");

    let events = seed::synthetic_sessions(count);
    let collection = get_collection::<Event>(&state.client, EVENT_COLLECTION).await;
    let inserted = store::insert_events(&collection, &events).await?;

    Ok(Json(json!({ "ok": true, "inserted": inserted })))
}

fn wants_csv(format: Option<&str>) -> bool {
    format.is_some_and(|format| format.eq_ignore_ascii_case("csv"))
}

fn csv_response<T: Serialize>(rows: &[T], columns: &[&str]) -> Response {
    // An export never fails; a row that cannot serialize becomes empty fields
    let values: Vec<Value> = rows
        .iter()
        .map(|row| serde_json::to_value(row).unwrap_or_else(|_| json!({})))
        .collect();
    let csv = to_csv(&values, columns);

    (
        [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
        csv,
    )
        .into_response()
}
