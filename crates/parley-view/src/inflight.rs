use std::sync::Arc;

use dashmap::DashSet;

/// Message ids with a remote call currently outstanding.
///
/// Shared by manual and automatic translation so two triggers never issue
/// the same call twice. A claim is released when its guard drops, including
/// when the owning task is cancelled mid-call.
#[derive(Clone, Default)]
pub struct InFlightRegistry {
    ids: Arc<DashSet<String>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `id`, or `None` if another task already holds it.
    pub fn claim(&self, id: &str) -> Option<InFlightClaim> {
        if self.ids.insert(id.to_string()) {
            Some(InFlightClaim {
                ids: self.ids.clone(),
                id: id.to_string(),
            })
        } else {
            None
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[must_use = "the claim is released as soon as it is dropped"]
pub struct InFlightClaim {
    ids: Arc<DashSet<String>>,
    id: String,
}

impl InFlightClaim {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Drop for InFlightClaim {
    fn drop(&mut self) {
        self.ids.remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_claim_is_refused_until_release() {
        let registry = InFlightRegistry::new();
        let claim = registry.claim("m1").unwrap();
        assert_eq!(claim.id(), "m1");
        assert!(registry.claim("m1").is_none());
        assert!(registry.contains("m1"));

        let other = registry.claim("m2");
        assert!(other.is_some());
        assert_eq!(registry.len(), 2);

        drop(claim);
        drop(other);
        assert!(registry.is_empty());
        assert!(registry.claim("m1").is_some());
    }

    #[test]
    fn clones_share_state() {
        let a = InFlightRegistry::new();
        let b = a.clone();
        let _held = a.claim("m1").unwrap();
        assert!(b.claim("m1").is_none());
    }
}
