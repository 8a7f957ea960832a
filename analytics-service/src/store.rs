//! MongoDB adapter for the aggregation engine.
//!
//! Each read applies the resolved [`TimeWindow`] filter verbatim, pushes
//! `$match`/`$group` into the store, and applies the deterministic ordering
//! from `analytics_utils::aggregate` in process. Sorting a grouped view is
//! never delegated to the database, so every read path shares one ordering
//! contract. Recency-ordered raw reads are the exception: their sort and cap
//! run in the store because only a bounded slice is ever fetched.

use futures_util::TryStreamExt;
use mongodb::{
    Collection,
    bson::{Document, doc},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use analytics_utils::aggregate::{
    FEEDBACK_CAP, HEATMAP_POINT_CAP, NamedCount, VariantConversions, VariantSessions,
    sort_name_counts, sort_variant_conversions, sort_variant_sessions,
};
use analytics_utils::window::TimeWindow;
use schema::{CTA_CLICKED, Event, Feedback, SESSION_STARTED, Variant};

use crate::error::Error;

/// A heatmap projection row: only the normalized coordinates survive.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct HeatmapPoint {
    pub x: f64,
    pub y: f64,
}

/// Persists one event. The caller assigns the object id up front so the
/// acknowledged id can be returned without re-reading the document.
#[tracing::instrument(skip_all, err(Debug))]
pub async fn insert_event(collection: &Collection<Event>, event: &Event) -> Result<(), Error> {
    collection.insert_one(event).await?;
    debug!(id = ?event.id, name = %event.name, "event recorded");
    Ok(())
}

#[tracing::instrument(skip_all, err(Debug))]
pub async fn insert_events(
    collection: &Collection<Event>,
    events: &[Event],
) -> Result<usize, Error> {
    if events.is_empty() {
        return Ok(0);
    }
    let result = collection.insert_many(events).await?;
    Ok(result.inserted_ids.len())
}

#[tracing::instrument(skip_all, err(Debug))]
pub async fn insert_feedback(
    collection: &Collection<Feedback>,
    feedback: &Feedback,
) -> Result<(), Error> {
    collection.insert_one(feedback).await?;
    Ok(())
}

/// In-window feedback, newest first, capped at [`FEEDBACK_CAP`].
#[tracing::instrument(skip_all, err(Debug))]
pub async fn recent_feedback(
    collection: &Collection<Feedback>,
    window: &TimeWindow,
) -> Result<Vec<Feedback>, Error> {
    let feedback = collection
        .find(window.filter_doc())
        .sort(doc! {"createdAt": -1})
        .limit(FEEDBACK_CAP)
        .await?
        .try_collect()
        .await?;
    Ok(feedback)
}

/// The most recent in-window points carrying both coordinates, capped at
/// [`HEATMAP_POINT_CAP`].
#[tracing::instrument(skip_all, err(Debug))]
pub async fn recent_heatmap_points(
    collection: &Collection<Event>,
    window: &TimeWindow,
) -> Result<Vec<HeatmapPoint>, Error> {
    let mut filter = window.filter_doc();
    filter.insert("x", doc! {"$ne": null});
    filter.insert("y", doc! {"$ne": null});

    let points = collection
        .clone_with_type::<HeatmapPoint>()
        .find(filter)
        .sort(doc! {"createdAt": -1})
        .limit(HEATMAP_POINT_CAP as i64)
        .projection(doc! {"x": 1, "y": 1, "_id": 0})
        .await?
        .try_collect()
        .await?;
    Ok(points)
}

/// In-window events grouped by name, optionally pre-restricted to one name.
/// Count descending with the name tie-break applied in process.
#[tracing::instrument(skip_all, err(Debug))]
pub async fn events_by_name(
    collection: &Collection<Event>,
    window: &TimeWindow,
    name: Option<&str>,
) -> Result<Vec<NamedCount>, Error> {
    let mut match_doc = window.filter_doc();
    if let Some(name) = name {
        match_doc.insert("name", name);
    }

    #[derive(Deserialize)]
    struct NameGroup {
        #[serde(rename = "_id")]
        name: String,
        count: i64,
    }

    let groups: Vec<NameGroup> = collection
        .aggregate([
            doc! {"$match": match_doc},
            doc! {"$group": {"_id": "$name", "count": {"$sum": 1}}},
        ])
        .with_type::<NameGroup>()
        .await?
        .try_collect()
        .await?;

    let mut counts: Vec<NamedCount> = groups
        .into_iter()
        .map(|group| NamedCount {
            name: group.name,
            count: group.count,
        })
        .collect();
    sort_name_counts(&mut counts);
    Ok(counts)
}

/// In-window `session_started` events grouped by variant, variant ascending.
#[tracing::instrument(skip_all, err(Debug))]
pub async fn sessions_by_variant(
    collection: &Collection<Event>,
    window: &TimeWindow,
) -> Result<Vec<VariantSessions>, Error> {
    #[derive(Deserialize)]
    struct SessionGroup {
        #[serde(rename = "_id")]
        variant: Variant,
        sessions: i64,
    }

    let mut match_doc = window.filter_doc();
    match_doc.insert("name", SESSION_STARTED);

    let groups: Vec<SessionGroup> = collection
        .aggregate([
            doc! {"$match": match_doc},
            doc! {"$group": {"_id": "$variant", "sessions": {"$sum": 1}}},
        ])
        .with_type::<SessionGroup>()
        .await?
        .try_collect()
        .await?;

    let mut rows: Vec<VariantSessions> = groups
        .into_iter()
        .map(|group| VariantSessions {
            variant: group.variant,
            sessions: group.sessions,
        })
        .collect();
    sort_variant_sessions(&mut rows);
    Ok(rows)
}

/// In-window `cta_clicked` events grouped by variant, variant ascending.
#[tracing::instrument(skip_all, err(Debug))]
pub async fn conversions_by_variant(
    collection: &Collection<Event>,
    window: &TimeWindow,
) -> Result<Vec<VariantConversions>, Error> {
    #[derive(Deserialize)]
    struct ConversionGroup {
        #[serde(rename = "_id")]
        variant: Variant,
        conversions: i64,
    }

    let mut match_doc = window.filter_doc();
    match_doc.insert("name", CTA_CLICKED);

    let groups: Vec<ConversionGroup> = collection
        .aggregate([
            doc! {"$match": match_doc},
            doc! {"$group": {"_id": "$variant", "conversions": {"$sum": 1}}},
        ])
        .with_type::<ConversionGroup>()
        .await?
        .try_collect()
        .await?;

    let mut rows: Vec<VariantConversions> = groups
        .into_iter()
        .map(|group| VariantConversions {
            variant: group.variant,
            conversions: group.conversions,
        })
        .collect();
    sort_variant_conversions(&mut rows);
    Ok(rows)
}

/// In-window events, optionally filtered by name/variant, newest first, at
/// most `limit` rows. `limit` must already be clamped by the caller.
#[tracing::instrument(skip_all, err(Debug))]
pub async fn recent_events(
    collection: &Collection<Event>,
    window: &TimeWindow,
    name: Option<&str>,
    variant: Option<&str>,
    limit: i64,
) -> Result<Vec<Event>, Error> {
    let mut filter: Document = window.filter_doc();
    if let Some(name) = name {
        filter.insert("name", name);
    }
    if let Some(variant) = variant {
        filter.insert("variant", variant);
    }

    let events = collection
        .find(filter)
        .sort(doc! {"createdAt": -1})
        .limit(limit)
        .projection(
            doc! {"sessionId": 1, "variant": 1, "name": 1, "meta": 1, "x": 1, "y": 1, "createdAt": 1, "_id": 0},
        )
        .await?
        .try_collect()
        .await?;
    Ok(events)
}
