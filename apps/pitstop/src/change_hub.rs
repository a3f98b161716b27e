//! Change notifications and observable queries.
//!
//! Every successful write publishes a [`ChangeEvent`]. Observers re-run their
//! query whenever an event touches one of the tables they watch for their
//! user, and hand the fresh result to a callback.

use std::future::Future;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;

use crate::error::AppResult;

/// Capacity for the change broadcast channel
const CHANNEL_CAPACITY: usize = 256;

/// Tables that emit change events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Users,
    Vehicles,
    Maintenance,
    VehicleLogs,
}

impl Table {
    /// Every table; user deletion touches all of them.
    pub const ALL: &'static [Table] = &[
        Table::Users,
        Table::Vehicles,
        Table::Maintenance,
        Table::VehicleLogs,
    ];
}

/// A write touched `table` for `user_uid`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub table: Table,
    pub user_uid: String,
}

/// Broadcaster for table changes
#[derive(Debug)]
pub struct ChangeHub {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeHub {
    /// Create a new change hub
    pub fn new() -> Self {
        Self::with_capacity(CHANNEL_CAPACITY)
    }

    /// Create a hub that buffers `capacity` events per subscriber
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sender: broadcast::channel(capacity.max(1)).0,
        }
    }

    /// Publish a change
    pub fn publish(&self, table: Table, user_uid: &str) {
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(ChangeEvent {
            table,
            user_uid: user_uid.to_string(),
        });
    }

    /// Subscribe to the raw event stream
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers (raw receivers and observers)
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Runs `query` now and after every change to `tables` for `user_uid`,
    /// passing each successful result to `callback`.
    ///
    /// A lagged observer re-queries instead of replaying what it missed.
    /// Query failures are logged and the observer keeps waiting.
    pub fn observe<T, Q, Fut, C>(
        &self,
        user_uid: &str,
        tables: &[Table],
        query: Q,
        callback: C,
    ) -> Subscription
    where
        T: Send + 'static,
        Q: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = AppResult<T>> + Send + 'static,
        C: Fn(T) + Send + 'static,
    {
        // Subscribe before the first query so no change slips between them
        let mut rx = self.sender.subscribe();
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let user_uid = user_uid.to_string();
        let tables = tables.to_vec();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => return,
                    result = query() => match result {
                        Ok(value) => callback(value),
                        Err(e) => {
                            tracing::warn!(uid = %user_uid, error = %e, "Observed query failed")
                        }
                    },
                }

                loop {
                    tokio::select! {
                        _ = cancelled.cancelled() => return,
                        event = rx.recv() => match event {
                            Ok(event)
                                if event.user_uid == user_uid
                                    && tables.contains(&event.table) =>
                            {
                                break
                            }
                            Ok(_) => continue,
                            Err(RecvError::Lagged(skipped)) => {
                                tracing::debug!(skipped, "Observer lagged, re-querying");
                                break;
                            }
                            Err(RecvError::Closed) => return,
                        },
                    }
                }
            }
        });

        Subscription { token }
    }
}

impl Default for ChangeHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps an observer alive; dropping it stops the observer.
#[derive(Debug)]
#[must_use = "dropping a Subscription stops the observer"]
pub struct Subscription {
    token: CancellationToken,
}

impl Subscription {
    /// Stops the observer.
    pub fn unsubscribe(self) {}

    /// Whether the observer is still running.
    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
