//! Ward factory trait and stub implementation.
//!
//! Procedural content (names, races, stat rolls) lives outside the core.
//! The marketplace asks a [`WardFactory`] for fresh wards whenever it
//! restocks its ward shelf; the [`StubWardFactory`] produces plain,
//! numbered wards so the turn cycle can run end-to-end without a content
//! pack.

use rand::{Rng, RngCore};

use warband_entities::{Ward, WardProfile};

/// What the caller wants from a generated ward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WardRequest {
    /// Origin label stamped on the ward, e.g. "black market".
    pub origin: String,
}

/// A source of freshly generated wards.
pub trait WardFactory {
    /// Generate one ward for `request`.
    fn create_ward(&mut self, request: &WardRequest, rng: &mut dyn RngCore) -> Ward;
}

/// A factory producing numbered wards with a random appeal roll.
#[derive(Debug, Clone, Default)]
pub struct StubWardFactory {
    created: u64,
}

impl StubWardFactory {
    /// Create a new stub factory.
    pub const fn new() -> Self {
        Self { created: 0 }
    }
}

impl WardFactory for StubWardFactory {
    fn create_ward(&mut self, request: &WardRequest, rng: &mut dyn RngCore) -> Ward {
        self.created = self.created.saturating_add(1);
        let mut ward = Ward::new(WardProfile {
            name: format!("Captive #{}", self.created),
            appeal: rng.random_range(5..=40),
            ..WardProfile::default()
        });
        ward.set_origin(request.origin.clone(), None);
        ward
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use warband_entities::{Attributed, WardAttr};

    use super::*;

    #[test]
    fn stub_numbers_wards_and_stamps_origin() {
        let mut rng = SmallRng::seed_from_u64(42);
        let mut factory = StubWardFactory::new();
        let request = WardRequest {
            origin: String::from("black market"),
        };
        let first = factory.create_ward(&request, &mut rng);
        let second = factory.create_ward(&request, &mut rng);
        assert_eq!(first.name(), "Captive #1");
        assert_eq!(second.name(), "Captive #2");
        assert_eq!(first.origin(), "black market");
        let appeal = first.get_attribute(WardAttr::Appeal);
        assert!((5..=40).contains(&appeal));
    }
}
