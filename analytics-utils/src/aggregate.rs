//! Pure aggregation over event slices: filter, group-count, deterministic
//! sort. The store adapter may push the `$match`/`$group` stages into the
//! database, but the ordering contract always comes from the sort functions
//! here so every read path agrees.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use schema::{CTA_CLICKED, Event, SESSION_STARTED, Variant};

use crate::heatmap::Point;
use crate::window::TimeWindow;

/// Most recent points returned to heatmap consumers. Keeps rendering cost
/// bounded; callers needing more use the raw export.
pub const HEATMAP_POINT_CAP: usize = 2000;
/// Hard cap on one raw-event read, clamped server-side.
pub const RAW_EVENT_CAP: i64 = 20_000;
/// Raw-event limit applied when the caller supplies none.
pub const RAW_EVENT_DEFAULT_LIMIT: i64 = 5_000;
/// Most recent feedback rows returned per read.
pub const FEEDBACK_CAP: i64 = 200;

/// One `eventsByName` row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedCount {
    pub name: String,
    pub count: i64,
}

/// One `sessionsByVariant` row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSessions {
    pub variant: Variant,
    pub sessions: i64,
}

/// One `conversionsByVariant` row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantConversions {
    pub variant: Variant,
    pub conversions: i64,
}

/// Groups in-window events by name, optionally pre-restricted to one name.
pub fn count_by_name(
    events: &[Event],
    window: &TimeWindow,
    name_filter: Option<&str>,
) -> Vec<NamedCount> {
    let mut groups: BTreeMap<&str, i64> = BTreeMap::new();
    for event in events {
        if !window.matches(event.created_at) {
            continue;
        }
        if let Some(name) = name_filter {
            if event.name != name {
                continue;
            }
        }
        *groups.entry(event.name.as_str()).or_insert(0) += 1;
    }

    let mut counts: Vec<NamedCount> = groups
        .into_iter()
        .map(|(name, count)| NamedCount {
            name: name.to_string(),
            count,
        })
        .collect();
    sort_name_counts(&mut counts);
    counts
}

/// Count descending, ties broken by name ascending so output is stable.
pub fn sort_name_counts(counts: &mut [NamedCount]) {
    counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
}

/// Sessions per variant: in-window `session_started` events, variant ascending.
pub fn sessions_by_variant(events: &[Event], window: &TimeWindow) -> Vec<VariantSessions> {
    count_variant(events, window, SESSION_STARTED)
        .into_iter()
        .map(|(variant, sessions)| VariantSessions { variant, sessions })
        .collect()
}

/// Conversions per variant: in-window `cta_clicked` events, variant ascending.
pub fn conversions_by_variant(events: &[Event], window: &TimeWindow) -> Vec<VariantConversions> {
    count_variant(events, window, CTA_CLICKED)
        .into_iter()
        .map(|(variant, conversions)| VariantConversions {
            variant,
            conversions,
        })
        .collect()
}

fn count_variant(events: &[Event], window: &TimeWindow, name: &str) -> BTreeMap<Variant, i64> {
    let mut groups: BTreeMap<Variant, i64> = BTreeMap::new();
    for event in events {
        if event.name == name && window.matches(event.created_at) {
            *groups.entry(event.variant).or_insert(0) += 1;
        }
    }
    groups
}

/// Variant ascending, matching the `BTreeMap` iteration order used above.
pub fn sort_variant_sessions(rows: &mut [VariantSessions]) {
    rows.sort_by_key(|row| row.variant);
}

pub fn sort_variant_conversions(rows: &mut [VariantConversions]) {
    rows.sort_by_key(|row| row.variant);
}

/// Conversion rate in percent. Zero sessions yield 0, never a division error.
pub fn conversion_rate(sessions: i64, conversions: i64) -> f64 {
    if sessions == 0 {
        return 0.0;
    }
    conversions as f64 / sessions as f64 * 100.0
}

/// Clamps a caller-requested raw-event limit into the server contract:
/// missing or non-positive requests fall back to the default, anything above
/// the hard cap is cut to it.
pub fn clamp_limit(requested: Option<i64>) -> i64 {
    requested
        .filter(|limit| *limit > 0)
        .unwrap_or(RAW_EVENT_DEFAULT_LIMIT)
        .min(RAW_EVENT_CAP)
}

/// Projects the in-window events carrying both coordinates to `(x, y)`,
/// newest first, capped at [`HEATMAP_POINT_CAP`].
pub fn heatmap_points(events: &[Event], window: &TimeWindow) -> Vec<Point> {
    let mut positioned: Vec<&Event> = events
        .iter()
        .filter(|event| {
            window.matches(event.created_at) && event.x.is_some() && event.y.is_some()
        })
        .collect();
    positioned.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    positioned
        .into_iter()
        .take(HEATMAP_POINT_CAP)
        .filter_map(|event| match (event.x, event.y) {
            (Some(x), Some(y)) => Some(Point { x, y }),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use mongodb::bson::DateTime;

    use schema::PAGE_CLICK;

    use super::*;

    fn event(name: &str, variant: Variant, millis: i64) -> Event {
        Event {
            id: None,
            session_id: format!("s-{millis}"),
            variant,
            name: name.to_string(),
            meta: None,
            x: None,
            y: None,
            created_at: DateTime::from_millis(millis),
        }
    }

    fn positioned(x: f64, y: f64, millis: i64) -> Event {
        Event {
            x: Some(x),
            y: Some(y),
            ..event(PAGE_CLICK, Variant::A, millis)
        }
    }

    #[test]
    fn equal_counts_order_by_name_ascending() {
        let events = vec![
            event("zeta", Variant::A, 1),
            event("alpha", Variant::A, 2),
            event("zeta", Variant::A, 3),
            event("alpha", Variant::A, 4),
            event("mid", Variant::B, 5),
        ];
        let counts = count_by_name(&events, &TimeWindow::default(), None);
        assert_eq!(
            counts,
            vec![
                NamedCount {
                    name: "alpha".to_string(),
                    count: 2
                },
                NamedCount {
                    name: "zeta".to_string(),
                    count: 2
                },
                NamedCount {
                    name: "mid".to_string(),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn name_filter_restricts_the_grouping() {
        let events = vec![
            event(PAGE_CLICK, Variant::A, 1),
            event(CTA_CLICKED, Variant::A, 2),
            event(PAGE_CLICK, Variant::B, 3),
        ];
        let counts = count_by_name(&events, &TimeWindow::default(), Some(PAGE_CLICK));
        assert_eq!(
            counts,
            vec![NamedCount {
                name: PAGE_CLICK.to_string(),
                count: 2
            }]
        );
    }

    #[test]
    fn variant_split_matches_the_ab_scenario() {
        let mut events = Vec::new();
        for i in 0..10 {
            events.push(event(SESSION_STARTED, Variant::A, i));
        }
        for i in 10..16 {
            events.push(event(SESSION_STARTED, Variant::B, i));
        }
        for i in 16..20 {
            events.push(event(CTA_CLICKED, Variant::A, i));
        }
        for i in 20..23 {
            events.push(event(CTA_CLICKED, Variant::B, i));
        }

        let window = TimeWindow::default();
        let sessions = sessions_by_variant(&events, &window);
        let conversions = conversions_by_variant(&events, &window);

        assert_eq!(
            sessions,
            vec![
                VariantSessions {
                    variant: Variant::A,
                    sessions: 10
                },
                VariantSessions {
                    variant: Variant::B,
                    sessions: 6
                },
            ]
        );
        assert_eq!(
            conversions,
            vec![
                VariantConversions {
                    variant: Variant::A,
                    conversions: 4
                },
                VariantConversions {
                    variant: Variant::B,
                    conversions: 3
                },
            ]
        );
        assert_eq!(conversion_rate(10, 4), 40.0);
        assert_eq!(conversion_rate(6, 3), 50.0);
    }

    #[test]
    fn zero_sessions_never_divide() {
        assert_eq!(conversion_rate(0, 0), 0.0);
        assert_eq!(conversion_rate(0, 17), 0.0);
    }

    #[test]
    fn inverted_window_empties_every_view() {
        let events = vec![
            event(SESSION_STARTED, Variant::A, 1_000),
            positioned(0.5, 0.5, 2_000),
            event(CTA_CLICKED, Variant::B, 3_000),
        ];
        let inverted = TimeWindow {
            from: Some(DateTime::from_millis(5_000)),
            to: Some(DateTime::from_millis(4_000)),
        };

        assert!(count_by_name(&events, &inverted, None).is_empty());
        assert!(sessions_by_variant(&events, &inverted).is_empty());
        assert!(conversions_by_variant(&events, &inverted).is_empty());
        assert!(heatmap_points(&events, &inverted).is_empty());
    }

    #[test]
    fn heatmap_keeps_the_most_recent_cap() {
        let mut events = Vec::new();
        for i in 0..2_500i64 {
            // Oldest 500 marked with x = 0.0, the rest with x = 0.5
            let x = if i < 500 { 0.0 } else { 0.5 };
            events.push(positioned(x, 0.5, i));
        }
        // Unpositioned events never become points
        events.push(event(SESSION_STARTED, Variant::A, 9_999));

        let points = heatmap_points(&events, &TimeWindow::default());
        assert_eq!(points.len(), HEATMAP_POINT_CAP);
        assert!(points.iter().all(|p| p.x == 0.5));
    }

    #[test]
    fn limit_clamp_holds_the_contract() {
        assert_eq!(clamp_limit(None), RAW_EVENT_DEFAULT_LIMIT);
        assert_eq!(clamp_limit(Some(0)), RAW_EVENT_DEFAULT_LIMIT);
        assert_eq!(clamp_limit(Some(-3)), RAW_EVENT_DEFAULT_LIMIT);
        assert_eq!(clamp_limit(Some(250)), 250);
        assert_eq!(clamp_limit(Some(999_999)), RAW_EVENT_CAP);
    }
}
