use crate::error::Error;

/// Pointer location in viewport coordinates, as reported by a click event.
#[derive(Clone, Copy, Debug)]
pub struct PointerPosition {
    pub client_x: f64,
    pub client_y: f64,
}

/// Bounding box of the instrumented container, in the same coordinate space
/// as [`PointerPosition`].
#[derive(Clone, Copy, Debug)]
pub struct ContainerBounds {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Rejects an event that is missing either required field.
pub fn require_fields(session_id: &str, name: &str) -> Result<(), Error> {
    if session_id.trim().is_empty() || name.trim().is_empty() {
        return Err(Error::Validation("sessionId and name required".to_string()));
    }
    Ok(())
}

/// Rejects feedback that is missing its session identifier.
pub fn require_session(session_id: &str) -> Result<(), Error> {
    if session_id.trim().is_empty() {
        return Err(Error::Validation("sessionId required".to_string()));
    }
    Ok(())
}

/// Clamps a normalized coordinate into `[0, 1]`.
///
/// Heatmap consumers must never see an out-of-bounds coordinate, even when
/// the pointer is released outside the container.
pub fn clamp_unit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Computes the pointer position relative to the container, clamped to the
/// unit square. Returns `None` for degenerate bounds instead of dividing by
/// zero.
pub fn normalized_position(
    pointer: PointerPosition,
    bounds: ContainerBounds,
) -> Option<(f64, f64)> {
    if bounds.width <= 0.0 || bounds.height <= 0.0 {
        return None;
    }
    let x = (pointer.client_x - bounds.left) / bounds.width;
    let y = (pointer.client_y - bounds.top) / bounds.height;
    Some((clamp_unit(x), clamp_unit(y)))
}
