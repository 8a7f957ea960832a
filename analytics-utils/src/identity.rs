//! Sticky session identity. The original client kept `sessionId`/`abVariant`
//! in ambient module state; here the two slots are an injected capability so
//! assignment is an explicit, testable value object.

use rand::Rng;
use schema::Variant;
use tracing::warn;
use uuid::Uuid;

use crate::error::Error;

pub const SESSION_SLOT: &str = "sessionId";
pub const VARIANT_SLOT: &str = "abVariant";

/// Client-durable storage for the two identity slots.
pub trait IdentitySlots {
    fn read(&self, slot: &str) -> Result<Option<String>, Error>;
    fn write(&mut self, slot: &str, value: &str) -> Result<(), Error>;
}

/// The identity carried on every event from one browsing context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub session_id: String,
    pub variant: Variant,
}

/// Returns the stored identity, assigning and persisting one on first use.
///
/// The second value is true exactly when a new session was assigned; the
/// caller records `session_started` on that invocation and never again.
/// Assignment requires no network call: the session id is a fresh UUID and
/// the variant an unbiased coin flip.
pub fn resolve_identity(slots: &mut dyn IdentitySlots) -> Result<(Identity, bool), Error> {
    let (session_id, newly_assigned) = match slots.read(SESSION_SLOT)? {
        Some(existing) if !existing.is_empty() => (existing, false),
        _ => {
            let fresh = Uuid::new_v4().to_string();
            slots.write(SESSION_SLOT, &fresh)?;
            (fresh, true)
        }
    };

    let variant = match slots.read(VARIANT_SLOT)?.as_deref() {
        Some("A") => Variant::A,
        Some("B") => Variant::B,
        stored => {
            if let Some(stored) = stored {
                warn!(stored, "stored variant is not A or B, reassigning");
            }
            let variant = coin_flip();
            slots.write(VARIANT_SLOT, variant.as_str())?;
            variant
        }
    };

    Ok((
        Identity {
            session_id,
            variant,
        },
        newly_assigned,
    ))
}

fn coin_flip() -> Variant {
    if rand::rng().random_bool(0.5) {
        Variant::A
    } else {
        Variant::B
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[derive(Default)]
    struct MemorySlots(HashMap<String, String>);

    impl IdentitySlots for MemorySlots {
        fn read(&self, slot: &str) -> Result<Option<String>, Error> {
            Ok(self.0.get(slot).cloned())
        }

        fn write(&mut self, slot: &str, value: &str) -> Result<(), Error> {
            self.0.insert(slot.to_string(), value.to_string());
            Ok(())
        }
    }

    #[test]
    fn first_resolution_assigns_and_persists() {
        let mut slots = MemorySlots::default();
        let (identity, newly_assigned) = resolve_identity(&mut slots).unwrap();

        assert!(newly_assigned);
        assert!(!identity.session_id.is_empty());
        assert_eq!(
            slots.0.get(SESSION_SLOT),
            Some(&identity.session_id)
        );
        assert_eq!(
            slots.0.get(VARIANT_SLOT).map(String::as_str),
            Some(identity.variant.as_str())
        );
    }

    #[test]
    fn later_resolutions_are_stable() {
        let mut slots = MemorySlots::default();
        let (first, _) = resolve_identity(&mut slots).unwrap();

        for _ in 0..50 {
            let (again, newly_assigned) = resolve_identity(&mut slots).unwrap();
            assert!(!newly_assigned);
            assert_eq!(again, first);
        }
    }

    #[test]
    fn corrupt_variant_slot_is_reassigned_not_an_error() {
        let mut slots = MemorySlots::default();
        slots.0.insert(SESSION_SLOT.to_string(), "s-1".to_string());
        slots.0.insert(VARIANT_SLOT.to_string(), "C".to_string());

        let (identity, newly_assigned) = resolve_identity(&mut slots).unwrap();
        assert!(!newly_assigned);
        assert_eq!(identity.session_id, "s-1");
        let stored = slots.0.get(VARIANT_SLOT).unwrap();
        assert!(stored == "A" || stored == "B");
        assert_eq!(stored, identity.variant.as_str());
    }
}
