use mongodb::bson::{DateTime, Document};
use tracing::warn;

/// The inclusive `[from, to]` range applied uniformly to every read path.
///
/// A missing bound means unbounded on that side. An inverted window is not an
/// error; it simply matches nothing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimeWindow {
    pub from: Option<DateTime>,
    pub to: Option<DateTime>,
}

impl TimeWindow {
    /// Resolves raw `from`/`to` query values into a window.
    ///
    /// Bounds are RFC 3339 strings. An absent or unparsable bound becomes
    /// unbounded on that side; the read surface never rejects a malformed
    /// timestamp.
    pub fn resolve(from_raw: Option<&str>, to_raw: Option<&str>) -> Self {
        TimeWindow {
            from: parse_bound(from_raw),
            to: parse_bound(to_raw),
        }
    }

    /// Inclusive on both ends.
    pub fn matches(&self, created_at: DateTime) -> bool {
        if let Some(from) = self.from {
            if created_at < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if created_at > to {
                return false;
            }
        }
        true
    }

    /// The `createdAt` filter shared by every query operation.
    ///
    /// Returns an empty document when both bounds are absent, so callers can
    /// merge additional conditions into it unconditionally.
    pub fn filter_doc(&self) -> Document {
        let mut range = Document::new();
        if let Some(from) = self.from {
            range.insert("$gte", from);
        }
        if let Some(to) = self.to {
            range.insert("$lte", to);
        }

        let mut filter = Document::new();
        if !range.is_empty() {
            filter.insert("createdAt", range);
        }
        filter
    }
}

fn parse_bound(raw: Option<&str>) -> Option<DateTime> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    match DateTime::parse_rfc3339_str(raw) {
        Ok(datetime) => Some(datetime),
        Err(_) => {
            warn!(raw, "ignoring unparsable time bound");
            None
        }
    }
}
