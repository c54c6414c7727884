//! Observable value holders.
//!
//! An [`Observable`] owns a current value and fans every change out to its
//! subscribers over a `tokio::sync::broadcast` channel. A [`Subscription`]
//! yields the value current at subscribe time first, then each later value
//! in the order the changes were made.

use std::sync::RwLock;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::warn;

use crate::error::SubscriptionError;

/// A value that notifies subscribers whenever it changes.
pub struct Observable<T> {
    value: RwLock<T>,
    sender: broadcast::Sender<T>,
}

impl<T: Clone + Send + Sync + 'static> Observable<T> {
    /// Create an observable holding `initial`.
    ///
    /// `capacity` bounds how many updates a slow subscriber may fall behind
    /// before it sees [`SubscriptionError::Lagged`].
    pub fn new(initial: T, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            value: RwLock::new(initial),
            sender,
        }
    }

    /// Clone of the current value.
    pub fn get(&self) -> T {
        self.value.read().expect("observable lock poisoned").clone()
    }

    /// Borrow the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self.value.read().expect("observable lock poisoned");
        f(&*guard)
    }

    /// Replace the value wholesale and notify subscribers.
    pub fn set(&self, value: T) {
        let mut guard = self.value.write().expect("observable lock poisoned");
        *guard = value;
        self.publish(&*guard);
    }

    /// Modify the value in place and notify subscribers.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let mut guard = self.value.write().expect("observable lock poisoned");
        f(&mut *guard);
        self.publish(&*guard);
    }

    /// Subscribe to this value.
    pub fn subscribe(&self) -> Subscription<T> {
        // Taken under the lock so no update lands between the snapshot and
        // the receiver.
        let guard = self.value.read().expect("observable lock poisoned");
        Subscription {
            pending: Some(guard.clone()),
            receiver: self.sender.subscribe(),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    fn publish(&self, value: &T) {
        // No receivers is fine; the new value is still readable via `get`.
        let _ = self.sender.send(value.clone());
    }
}

impl<T: Clone + Send + Sync + 'static> Observable<Vec<T>> {
    /// Append an item and notify subscribers.
    pub fn push(&self, item: T) {
        self.update(|items| items.push(item));
    }

    /// Remove every item matching `pred`. Subscribers are notified only if
    /// something was removed. Returns the number of removed items.
    pub fn remove_where(&self, mut pred: impl FnMut(&T) -> bool) -> usize {
        let mut guard = self.value.write().expect("observable lock poisoned");
        let before = guard.len();
        guard.retain(|item| !pred(item));
        let removed = before - guard.len();
        if removed > 0 {
            self.publish(&*guard);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.with(Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.with(Vec::is_empty)
    }
}

impl<T: Clone + Send + Sync + 'static + Default> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default(), 1024)
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observable")
            .field("value", &*self.value.read().expect("observable lock poisoned"))
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}

/// A stream of values from an [`Observable`].
#[derive(Debug)]
pub struct Subscription<T> {
    pending: Option<T>,
    receiver: broadcast::Receiver<T>,
}

impl<T: Clone> Subscription<T> {
    /// Wait for the next value.
    pub async fn next(&mut self) -> Result<T, SubscriptionError> {
        if let Some(value) = self.pending.take() {
            return Ok(value);
        }
        match self.receiver.recv().await {
            Ok(value) => Ok(value),
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "subscriber lagged; updates dropped");
                Err(SubscriptionError::Lagged(skipped))
            }
            Err(RecvError::Closed) => Err(SubscriptionError::Closed),
        }
    }

    /// The next value if one is ready, without waiting.
    pub fn try_next(&mut self) -> Option<Result<T, SubscriptionError>> {
        if let Some(value) = self.pending.take() {
            return Some(Ok(value));
        }
        match self.receiver.try_recv() {
            Ok(value) => Some(Ok(value)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Lagged(skipped)) => {
                warn!(skipped, "subscriber lagged; updates dropped");
                Some(Err(SubscriptionError::Lagged(skipped)))
            }
            Err(TryRecvError::Closed) => Some(Err(SubscriptionError::Closed)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_set_update() {
        let obs = Observable::new(1u32, 8);
        assert_eq!(obs.get(), 1);
        obs.set(5);
        assert_eq!(obs.get(), 5);
        obs.update(|v| *v += 1);
        assert_eq!(obs.get(), 6);
    }

    #[tokio::test]
    async fn subscriber_gets_current_then_changes() {
        let obs = Observable::new("a".to_string(), 8);
        obs.set("b".into());

        let mut sub = obs.subscribe();
        obs.set("c".into());
        obs.set("d".into());

        assert_eq!(sub.next().await.unwrap(), "b");
        assert_eq!(sub.next().await.unwrap(), "c");
        assert_eq!(sub.next().await.unwrap(), "d");
        assert!(sub.try_next().is_none());
    }

    #[test]
    fn each_change_is_seen_once() {
        let obs: Observable<Vec<u8>> = Observable::new(Vec::new(), 8);
        let mut sub = obs.subscribe();
        assert_eq!(sub.try_next(), Some(Ok(vec![])));

        obs.push(1);
        obs.push(2);
        assert_eq!(sub.try_next(), Some(Ok(vec![1])));
        assert_eq!(sub.try_next(), Some(Ok(vec![1, 2])));
        assert_eq!(sub.try_next(), None);
    }

    #[test]
    fn remove_where_without_match_is_silent() {
        let obs = Observable::new(vec![1, 2, 3], 8);
        let mut sub = obs.subscribe();
        sub.try_next();

        assert_eq!(obs.remove_where(|v| *v == 9), 0);
        assert_eq!(sub.try_next(), None);

        assert_eq!(obs.remove_where(|v| *v % 2 == 1), 2);
        assert_eq!(sub.try_next(), Some(Ok(vec![2])));
        assert_eq!(obs.get(), vec![2]);
    }

    #[test]
    fn slow_subscriber_lags() {
        let obs = Observable::new(0u32, 2);
        let mut sub = obs.subscribe();
        sub.try_next();
        for i in 1..=5 {
            obs.set(i);
        }
        assert_eq!(sub.try_next(), Some(Err(SubscriptionError::Lagged(3))));
        assert_eq!(sub.try_next(), Some(Ok(4)));
        assert_eq!(sub.try_next(), Some(Ok(5)));
    }

    #[tokio::test]
    async fn dropping_observable_closes_subscription() {
        let obs = Observable::new(0u32, 4);
        let mut sub = obs.subscribe();
        sub.next().await.unwrap();
        drop(obs);
        assert_eq!(sub.next().await, Err(SubscriptionError::Closed));
    }

    #[test]
    fn subscriber_count_tracks_drops() {
        let obs = Observable::new((), 4);
        let a = obs.subscribe();
        let _b = obs.subscribe();
        assert_eq!(obs.subscriber_count(), 2);
        drop(a);
        assert_eq!(obs.subscriber_count(), 1);
    }

    #[test]
    fn len_and_is_empty() {
        let obs: Observable<Vec<&str>> = Observable::default();
        assert!(obs.is_empty());
        obs.push("x");
        assert_eq!(obs.len(), 1);
    }
}
