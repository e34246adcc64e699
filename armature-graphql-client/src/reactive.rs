//! Reactive query watching with payload caching.
//!
//! A [`QueryWatcher`] keeps one query result up to date with a set of
//! variables published on a [`watch`] channel. It re-runs the query whenever
//! the variables change in a way that changes the operation key, and on
//! explicit [`QueryWatcher::refresh`]. With `trust_cache` enabled, a cached
//! result settles the watcher on activation without any network call.

use armature_graphql_proxy::{GraphQLResponse, OperationIdentity, OperationKey, normalize_variables};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{FetchOptions, GraphQLClient, GraphQLError, InvokeArgs};

/// Options for a query watcher.
#[derive(Debug, Clone, Default)]
pub struct WatchOptions {
    /// Settle from the payload cache on activation when it holds the key.
    pub trust_cache: bool,
    /// Options for every dispatched call.
    pub fetch_options: FetchOptions,
}

impl WatchOptions {
    /// Create default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Trust cached results on activation.
    pub fn trust_cache(mut self, trust: bool) -> Self {
        self.trust_cache = trust;
        self
    }

    /// Set the fetch options.
    pub fn fetch_options(mut self, options: FetchOptions) -> Self {
        self.fetch_options = options;
        self
    }
}

/// Observable state of a watched query.
#[derive(Debug, Clone)]
pub enum QueryState {
    /// Not active.
    Idle,
    /// A call for the key is in flight.
    Pending {
        /// Key being fetched.
        key: OperationKey,
    },
    /// The last call for the key succeeded.
    Settled {
        /// Key of the result.
        key: OperationKey,
        /// Result; may contain GraphQL errors.
        response: GraphQLResponse,
    },
    /// The last call for the key failed.
    Failed {
        /// Key of the failed call.
        key: OperationKey,
        /// Failure.
        error: Arc<GraphQLError>,
    },
}

impl QueryState {
    /// Operation key the state refers to.
    pub fn key(&self) -> Option<&OperationKey> {
        match self {
            Self::Idle => None,
            Self::Pending { key } | Self::Settled { key, .. } | Self::Failed { key, .. } => {
                Some(key)
            }
        }
    }

    /// Whether a call finished, successfully or not.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Settled { .. } | Self::Failed { .. })
    }

    /// Whether a call is in flight.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    /// The result, if settled successfully.
    pub fn response(&self) -> Option<&GraphQLResponse> {
        match self {
            Self::Settled { response, .. } => Some(response),
            _ => None,
        }
    }

    /// The failure, if the last call failed.
    pub fn error(&self) -> Option<&GraphQLError> {
        match self {
            Self::Failed { error, .. } => Some(error.as_ref()),
            _ => None,
        }
    }
}

/// Keeps a query result in sync with reactive variables.
///
/// Dropping the watcher stops its background task.
pub struct QueryWatcher {
    identity: OperationIdentity,
    variables: watch::Receiver<Option<Value>>,
    state: Arc<watch::Sender<QueryState>>,
    state_rx: watch::Receiver<QueryState>,
    refresh: Arc<Notify>,
    refreshes: Arc<AtomicU64>,
    dispatches: Arc<AtomicUsize>,
    task: Option<JoinHandle<()>>,
}

impl QueryWatcher {
    /// Activate a watcher.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        client: GraphQLClient,
        name: impl Into<String>,
        mut variables: watch::Receiver<Option<Value>>,
        options: WatchOptions,
    ) -> Self {
        let identity = OperationIdentity::query(name);
        let current = normalize_variables(variables.borrow_and_update().clone());
        let key = identity.key(current.as_ref());

        let cached = if options.trust_cache {
            client.cache().and_then(|cache| cache.get(&key))
        } else {
            None
        };

        let initial = match cached {
            Some(response) => {
                debug!(operation = %identity.name, key = %key, "Query settled from cache");
                QueryState::Settled {
                    key: key.clone(),
                    response,
                }
            }
            None => QueryState::Pending { key: key.clone() },
        };
        let needs_dispatch = initial.is_pending();

        let (state, state_rx) = watch::channel(initial);
        let state = Arc::new(state);
        let refresh = Arc::new(Notify::new());
        let refreshes = Arc::new(AtomicU64::new(0));
        let dispatches = Arc::new(AtomicUsize::new(0));

        let worker = Worker {
            client,
            identity: identity.clone(),
            fetch_options: options.fetch_options,
            state: state.clone(),
            refreshes: refreshes.clone(),
            dispatches: dispatches.clone(),
        };
        let task = tokio::spawn(worker.run(
            variables.clone(),
            refresh.clone(),
            key,
            current,
            needs_dispatch,
        ));

        Self {
            identity,
            variables,
            state,
            state_rx,
            refresh,
            refreshes,
            dispatches,
            task: Some(task),
        }
    }

    /// Operation name.
    pub fn name(&self) -> &str {
        &self.identity.name
    }

    /// Kind and name of the watched operation.
    pub fn identity(&self) -> &OperationIdentity {
        &self.identity
    }

    /// Key for the current variables.
    pub fn current_key(&self) -> OperationKey {
        let variables = normalize_variables(self.variables.borrow().clone());
        self.identity.key(variables.as_ref())
    }

    /// Current state.
    pub fn state(&self) -> QueryState {
        self.state_rx.borrow().clone()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<QueryState> {
        self.state_rx.clone()
    }

    /// Number of calls sent to the proxy so far.
    pub fn dispatch_count(&self) -> usize {
        self.dispatches.load(Ordering::SeqCst)
    }

    /// Wait until the query settled for the current variables.
    ///
    /// Returns [`QueryState::Idle`] once the watcher is stopped.
    pub async fn settled(&self) -> QueryState {
        let mut rx = self.state_rx.clone();
        loop {
            let key = self.current_key();
            {
                let state = rx.borrow_and_update();
                match &*state {
                    QueryState::Idle => return QueryState::Idle,
                    s if s.is_settled() && s.key() == Some(&key) => return s.clone(),
                    _ => {}
                }
            }

            // Variable changes are picked up by the worker, which then
            // publishes a new state.
            if rx.changed().await.is_err() {
                return rx.borrow().clone();
            }
        }
    }

    /// Re-run the query, bypassing the cache.
    ///
    /// A call already in flight is superseded: its result is dropped and the
    /// state stays pending until the refreshed call settles.
    pub fn refresh(&self) {
        if self.task.is_none() {
            return;
        }
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        self.state.send_replace(QueryState::Pending {
            key: self.current_key(),
        });
        self.refresh.notify_one();
    }

    /// Stop watching. The state becomes [`QueryState::Idle`].
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            self.state.send_replace(QueryState::Idle);
        }
    }

    /// Whether the watcher is still active.
    pub fn is_active(&self) -> bool {
        self.task.is_some()
    }
}

impl Drop for QueryWatcher {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for QueryWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryWatcher")
            .field("operation", &self.identity)
            .field("state", &*self.state_rx.borrow())
            .field("dispatches", &self.dispatch_count())
            .finish()
    }
}

struct Worker {
    client: GraphQLClient,
    identity: OperationIdentity,
    fetch_options: FetchOptions,
    state: Arc<watch::Sender<QueryState>>,
    refreshes: Arc<AtomicU64>,
    dispatches: Arc<AtomicUsize>,
}

impl Worker {
    async fn run(
        self,
        mut variables: watch::Receiver<Option<Value>>,
        refresh: Arc<Notify>,
        mut key: OperationKey,
        mut current: Option<Value>,
        mut needs_dispatch: bool,
    ) {
        let mut variables_open = true;

        loop {
            if needs_dispatch {
                self.dispatch(&key, current.clone()).await;
                needs_dispatch = false;
            }

            tokio::select! {
                changed = variables.changed(), if variables_open => {
                    if changed.is_err() {
                        variables_open = false;
                        continue;
                    }

                    let next = normalize_variables(variables.borrow_and_update().clone());
                    let next_key = self.identity.key(next.as_ref());
                    if next_key == key {
                        continue;
                    }

                    debug!(operation = %self.identity.name, key = %next_key, "Query variables changed");
                    self.state.send_replace(QueryState::Pending { key: next_key.clone() });
                    key = next_key;
                    current = next;
                    needs_dispatch = true;
                }
                _ = refresh.notified() => {
                    debug!(operation = %self.identity.name, key = %key, "Query refresh requested");
                    self.state.send_replace(QueryState::Pending { key: key.clone() });
                    needs_dispatch = true;
                }
            }
        }
    }

    async fn dispatch(&self, key: &OperationKey, variables: Option<Value>) {
        let generation = self.refreshes.load(Ordering::SeqCst);
        self.dispatches.fetch_add(1, Ordering::SeqCst);

        let args = InvokeArgs {
            name: self.identity.name.clone(),
            variables,
            fetch_options: self.fetch_options.clone(),
        };

        let result = self.client.query_with(args).await;

        // A refresh requested while this call was in flight owns the next state.
        if self.refreshes.load(Ordering::SeqCst) != generation {
            debug!(operation = %self.identity.name, key = %key, "Dropping result superseded by refresh");
            return;
        }

        let state = match result {
            Ok(response) => {
                if !response.has_errors()
                    && let Some(cache) = self.client.cache()
                {
                    cache.set(key, response.clone());
                }
                QueryState::Settled {
                    key: key.clone(),
                    response,
                }
            }
            Err(error) => {
                warn!(operation = %self.identity.name, key = %key, error = %error, "Query failed");
                QueryState::Failed {
                    key: key.clone(),
                    error: Arc::new(error),
                }
            }
        };

        self.state.send_replace(state);
    }
}
