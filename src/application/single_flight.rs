//! Single-flight execution of an async operation
//!
//! Concurrent callers share one in-flight run instead of starting their own.

use std::future::Future;

use thiserror::Error;
use tokio::sync::{watch, Mutex};

/// The leading caller was dropped before its run finished
#[derive(Debug, Clone, Copy, Error)]
#[error("in-flight operation was abandoned before completing")]
pub struct FlightAbandoned;

type Outcome<E> = Option<Result<(), E>>;

/// Joins concurrent callers onto a single in-flight operation.
///
/// The first caller runs the operation; callers arriving while it is in
/// flight wait for and receive the same result. Once it completes the next
/// caller starts a fresh run.
pub struct SingleFlight<E> {
    slot: Mutex<Option<watch::Receiver<Outcome<E>>>>,
}

impl<E> SingleFlight<E>
where
    E: Clone + From<FlightAbandoned>,
{
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Whether a run is currently in flight
    pub async fn is_in_flight(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    /// Run `operation`, or join the run already in flight
    pub async fn run<F, Fut>(&self, operation: F) -> Result<(), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        let mut slot = self.slot.lock().await;

        if let Some(receiver) = slot.as_ref() {
            let mut receiver = receiver.clone();
            drop(slot);
            return self.join(&mut receiver).await;
        }

        let (sender, receiver) = watch::channel(None);
        *slot = Some(receiver);
        drop(slot);

        let result = operation().await;

        *self.slot.lock().await = None;
        sender.send_replace(Some(result.clone()));
        result
    }

    async fn join(&self, receiver: &mut watch::Receiver<Outcome<E>>) -> Result<(), E> {
        let joined = match receiver.wait_for(Option::is_some).await {
            Ok(outcome) => (*outcome).clone(),
            Err(_) => None,
        };

        match joined {
            Some(result) => result,
            None => {
                // Leader dropped mid-run; let the next caller start over
                *self.slot.lock().await = None;
                Err(E::from(FlightAbandoned))
            }
        }
    }
}

impl<E> Default for SingleFlight<E>
where
    E: Clone + From<FlightAbandoned>,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    enum TestError {
        Failed(String),
        Abandoned,
    }

    impl From<FlightAbandoned> for TestError {
        fn from(_: FlightAbandoned) -> Self {
            Self::Abandoned
        }
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_run() {
        let flight = SingleFlight::<TestError>::new();
        let runs = AtomicUsize::new(0);
        let counter = &runs;

        let op = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(())
        };

        let (a, b, c) = tokio::join!(flight.run(op), flight.run(op), flight.run(op));
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(!flight.is_in_flight().await);
    }

    #[tokio::test]
    async fn waiters_receive_leader_error() {
        let flight = SingleFlight::<TestError>::new();

        let op = || async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Err(TestError::Failed("denied".to_string()))
        };

        let (a, b) = tokio::join!(flight.run(op), flight.run(op));
        assert_eq!(a, Err(TestError::Failed("denied".to_string())));
        assert_eq!(b, Err(TestError::Failed("denied".to_string())));
    }

    #[tokio::test]
    async fn sequential_calls_run_again() {
        let flight = SingleFlight::<TestError>::new();
        let runs = AtomicUsize::new(0);
        let counter = &runs;
        let op = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        };

        flight.run(op).await.unwrap();
        flight.run(op).await.unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn abandoned_leader_releases_slot() {
        let flight = SingleFlight::<TestError>::new();

        let leader = flight.run(|| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        });
        // Poll the leader once so it claims the slot, then drop it
        let _ = tokio::time::timeout(Duration::from_millis(5), leader).await;

        let joined = flight.run(|| async { Ok(()) }).await;
        assert_eq!(joined, Err(TestError::Abandoned));

        // The slot is free again
        assert!(flight.run(|| async { Ok(()) }).await.is_ok());
    }
}
