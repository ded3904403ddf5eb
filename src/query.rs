//! Cached server state.
//!
//! `QueryClient` only tracks *when* a key was last invalidated. Each view owns
//! its own [`Query`] slot holding the data and the generation it was fetched
//! at, so a slot is stale as soon as the client's generation moves past it.

use log::{debug, warn};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Contacts,
}

type Listener = Box<dyn Fn(QueryKey) + Send + Sync>;

#[derive(Default)]
pub struct QueryClient {
    generations: Mutex<HashMap<QueryKey, u64>>,
    listeners: Mutex<Vec<Listener>>,
}

impl QueryClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self, key: QueryKey) -> u64 {
        self.generations
            .lock()
            .map(|g| g.get(&key).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Marks every slot for `key` stale and tells observers to refetch.
    pub fn invalidate(&self, key: QueryKey) {
        if let Ok(mut g) = self.generations.lock() {
            *g.entry(key).or_insert(0) += 1;
        }
        debug!("invalidated {:?}", key);
        if let Ok(listeners) = self.listeners.lock() {
            for l in listeners.iter() {
                l(key);
            }
        }
    }

    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(QueryKey) + Send + Sync + 'static,
    {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.push(Box::new(listener));
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryStatus {
    Loading,
    Ready,
    Failed(String),
}

#[derive(Debug)]
pub struct Query<T> {
    key: QueryKey,
    data: Option<T>,
    fetched_at: Option<u64>,
    status: QueryStatus,
}

impl<T> Query<T> {
    pub fn new(key: QueryKey) -> Self {
        Self {
            key,
            data: None,
            fetched_at: None,
            status: QueryStatus::Loading,
        }
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn status(&self) -> &QueryStatus {
        &self.status
    }

    pub fn is_stale(&self, client: &QueryClient) -> bool {
        self.fetched_at != Some(client.generation(self.key))
    }

    /// Stores a fetch result. A failed refetch keeps the previous data.
    pub fn settle<E: std::fmt::Display>(&mut self, generation: u64, result: Result<T, E>) {
        match result {
            Ok(data) => {
                self.data = Some(data);
                self.fetched_at = Some(generation);
                self.status = QueryStatus::Ready;
            }
            Err(e) => {
                warn!("query {:?} failed: {}", self.key, e);
                self.status = QueryStatus::Failed(e.to_string());
            }
        }
    }
}

/// How many extra attempts a failed call gets before surfacing the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { retries: 1 }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self { retries: 0 }
    }

    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    debug!("attempt {} failed ({}), retrying", attempt, e);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn slot_goes_stale_on_invalidate() {
        let client = QueryClient::new();
        let mut q: Query<Vec<u8>> = Query::new(QueryKey::Contacts);
        assert!(q.is_stale(&client));

        q.settle::<String>(client.generation(QueryKey::Contacts), Ok(vec![1]));
        assert!(!q.is_stale(&client));
        assert_eq!(q.status(), &QueryStatus::Ready);

        client.invalidate(QueryKey::Contacts);
        assert!(q.is_stale(&client));
    }

    #[test]
    fn failed_refetch_keeps_previous_data() {
        let client = QueryClient::new();
        let mut q: Query<Vec<u8>> = Query::new(QueryKey::Contacts);
        q.settle::<String>(0, Ok(vec![1, 2]));
        client.invalidate(QueryKey::Contacts);
        q.settle(1, Err("HTTP 500".to_string()));
        assert_eq!(q.data(), Some(&vec![1, 2]));
        assert_eq!(q.status(), &QueryStatus::Failed("HTTP 500".into()));
        assert!(q.is_stale(&client));
    }

    #[test]
    fn listeners_hear_invalidations() {
        let client = QueryClient::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        client.subscribe(move |key| {
            assert_eq!(key, QueryKey::Contacts);
            h.fetch_add(1, Ordering::SeqCst);
        });
        client.invalidate(QueryKey::Contacts);
        client.invalidate(QueryKey::Contacts);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn retry_policy_is_bounded() {
        let calls = AtomicUsize::new(0);
        let res: Result<(), String> = RetryPolicy { retries: 1 }
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("down".to_string()) }
            })
            .await;
        assert!(res.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let calls = AtomicUsize::new(0);
        let res: Result<u8, String> = RetryPolicy::default()
            .run(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { if n == 0 { Err("blip".to_string()) } else { Ok(5) } }
            })
            .await;
        assert_eq!(res, Ok(5));
    }
}
