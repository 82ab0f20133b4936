pub mod listener;
pub mod memory;
pub mod query;
pub mod rest;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use yaraguard_common::{ChangeEvent, Table};

use crate::error::Result;

pub use listener::PgChangeFeed;
pub use memory::MemoryStore;
pub use query::{Direction, Filter, Order, Query};
pub use rest::RestStore;

/// Client side of the hosted relational store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Rows matching `query`, nested joins expanded inline.
    async fn select(&self, query: &Query) -> Result<Vec<Value>>;

    /// Number of rows matching `query`; select list, order and limit are ignored.
    async fn count(&self, query: &Query) -> Result<u64>;

    /// Change notifications for `table`. Delivery stops when `scope` is
    /// cancelled or the returned subscription is dropped.
    async fn subscribe(&self, table: Table, scope: &CancellationToken) -> Result<Subscription>;
}

/// Stream of change notifications for one table.
pub struct Subscription {
    table: Table,
    events: mpsc::Receiver<ChangeEvent>,
    token: CancellationToken,
}

impl Subscription {
    pub fn new(table: Table, events: mpsc::Receiver<ChangeEvent>, token: CancellationToken) -> Self {
        Self { table, events, token }
    }

    pub fn table(&self) -> Table {
        self.table
    }

    /// Next notification; `None` once unsubscribed or the transport closed.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => None,
            event = self.events.recv() => event,
        }
    }

    pub fn unsubscribe_handle(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
