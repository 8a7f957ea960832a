//! Analytics Engine Utility Functions
//!
//! ## Current API
//!
//! - Resolve inclusive time windows from raw query bounds
//! - Validate events and normalize click coordinates
//! - Aggregate events into the dashboard views with deterministic ordering
//! - Assign sticky session identity and experiment variant
//! - Format rows as CSV for export
//! - Render heatmap overlays from normalized points
//!
pub mod aggregate;
pub mod error;
pub mod export;
pub mod heatmap;
pub mod identity;
pub mod recorder;
pub mod window;
