//! Synthetic data for demos: a batch of sessions with clicks and a
//! variant-skewed conversion, shaped like real traffic.

use mongodb::bson::DateTime;
use rand::Rng;
use uuid::Uuid;

use schema::{CTA_CLICKED, Event, PAGE_CLICK, SESSION_STARTED, Variant};

pub const DEFAULT_SESSION_COUNT: u32 = 40;

/// Variant A converts slightly more often than B in the synthetic traffic,
/// so the demo dashboard has a visible split to talk about.
const CONVERSION_RATE_A: f64 = 0.55;
const CONVERSION_RATE_B: f64 = 0.45;

/// Generates `count` sessions: one `session_started`, three to seven
/// positioned `page_click`s, and maybe one `cta_clicked` each.
pub fn synthetic_sessions(count: u32) -> Vec<Event> {
    let mut rng = rand::rng();
    let mut events = Vec::new();

    for _ in 0..count {
        let session_id = format!("seed-{}", Uuid::new_v4());
        let variant = if rng.random_bool(0.5) {
            Variant::A
        } else {
            Variant::B
        };

        events.push(session_event(&session_id, variant, SESSION_STARTED));

        let clicks = rng.random_range(3..8);
        for _ in 0..clicks {
            let mut click = session_event(&session_id, variant, PAGE_CLICK);
            click.x = Some(rng.random::<f64>());
            click.y = Some(rng.random::<f64>());
            events.push(click);
        }

        let conversion_rate = match variant {
            Variant::A => CONVERSION_RATE_A,
            Variant::B => CONVERSION_RATE_B,
        };
        if rng.random_bool(conversion_rate) {
            events.push(session_event(&session_id, variant, CTA_CLICKED));
        }
    }

    events
}

fn session_event(session_id: &str, variant: Variant, name: &str) -> Event {
    Event {
        id: None,
        session_id: session_id.to_string(),
        variant,
        name: name.to_string(),
        meta: None,
        x: None,
        y: None,
        created_at: DateTime::now(),
    }
}
