use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};

/// Rejects a second run of the same keyed operation while the first is
/// still outstanding.
#[derive(Clone, Default)]
pub struct SingleFlight {
    in_flight: Arc<DashMap<String, ()>>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `key`, or returns `None` if it is already claimed. The claim
    /// lasts until the returned guard is dropped.
    pub fn try_acquire(&self, key: &str) -> Option<FlightGuard> {
        match self.in_flight.entry(key.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(());
                Some(FlightGuard {
                    key: key.to_string(),
                    in_flight: Arc::clone(&self.in_flight),
                })
            }
        }
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        self.in_flight.contains_key(key)
    }
}

#[must_use = "the key is released as soon as the guard is dropped"]
pub struct FlightGuard {
    key: String,
    in_flight: Arc<DashMap<String, ()>>,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.in_flight.remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_claim_is_rejected_until_release() {
        let flights = SingleFlight::new();
        let guard = flights.try_acquire("u1").unwrap();
        assert!(flights.is_in_flight("u1"));
        assert!(flights.try_acquire("u1").is_none());

        // other keys are independent
        assert!(flights.try_acquire("u2").is_some());

        drop(guard);
        assert!(!flights.is_in_flight("u1"));
        assert!(flights.try_acquire("u1").is_some());
    }

    #[tokio::test]
    async fn cancelled_operation_releases_its_key() {
        let flights = SingleFlight::new();
        let task = {
            let flights = flights.clone();
            tokio::spawn(async move {
                let _guard = flights.try_acquire("plans");
                std::future::pending::<()>().await;
            })
        };
        while !flights.is_in_flight("plans") {
            tokio::task::yield_now().await;
        }

        task.abort();
        let _ = task.await;
        assert!(!flights.is_in_flight("plans"));
    }
}
