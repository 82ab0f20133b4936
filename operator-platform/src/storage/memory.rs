use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use yaraguard_common::{ChangeEvent, ChangeKind, Table};

use crate::error::{OperatorError, Result};
use super::{Direction, Query, RemoteStore, Subscription};

const EVENT_BUFFER: usize = 64;

/// In-process store holding pre-joined JSON rows per table.
///
/// Used by the tests and for offline runs. Supports failure and latency
/// injection, records every query it serves, and delivers change
/// notifications on demand through [`MemoryStore::notify`].
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    tables: HashMap<Table, Vec<Value>>,
    failing: HashSet<Table>,
    latency: HashMap<Table, Duration>,
    log: Vec<Query>,
    subscribers: Vec<Subscriber>,
}

struct Subscriber {
    table: Table,
    tx: mpsc::Sender<ChangeEvent>,
    token: CancellationToken,
}

impl Subscriber {
    fn is_live(&self) -> bool {
        !self.token.is_cancelled() && !self.tx.is_closed()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert(&self, table: Table, row: Value) {
        self.lock().tables.entry(table).or_default().push(row);
    }

    pub fn replace(&self, table: Table, rows: Vec<Value>) {
        self.lock().tables.insert(table, rows);
    }

    /// Make every query on `table` fail until cleared.
    pub fn set_failing(&self, table: Table, failing: bool) {
        let mut inner = self.lock();
        if failing {
            inner.failing.insert(table);
        } else {
            inner.failing.remove(&table);
        }
    }

    /// Delay applied to queries on `table` issued from now on.
    pub fn set_latency(&self, table: Table, latency: Duration) {
        self.lock().latency.insert(table, latency);
    }

    /// Queries served so far, in issue order.
    pub fn queries(&self) -> Vec<Query> {
        self.lock().log.clone()
    }

    pub fn clear_queries(&self) {
        self.lock().log.clear();
    }

    pub fn active_subscriptions(&self, table: Table) -> usize {
        self.lock()
            .subscribers
            .iter()
            .filter(|s| s.table == table && s.is_live())
            .count()
    }

    /// Deliver a change notification to live subscribers of `table`.
    pub fn notify(&self, table: Table, kind: ChangeKind) {
        let mut inner = self.lock();
        inner.subscribers.retain(Subscriber::is_live);
        for subscriber in inner.subscribers.iter().filter(|s| s.table == table) {
            // A full buffer drops the notification, like a lossy transport.
            let _ = subscriber.tx.try_send(ChangeEvent { table, kind });
        }
    }

    // Snapshot taken when the query is issued; latency is applied afterwards.
    fn begin(&self, query: &Query) -> (Result<Vec<Value>>, Option<Duration>) {
        let mut inner = self.lock();
        inner.log.push(query.clone());
        let latency = inner.latency.get(&query.table).copied();

        if inner.failing.contains(&query.table) {
            return (Err(OperatorError::store(query.table, "injected failure")), latency);
        }

        let rows: Vec<Value> = inner
            .tables
            .get(&query.table)
            .map(|rows| rows.iter().filter(|row| row_matches(row, query)).cloned().collect())
            .unwrap_or_default();
        (Ok(rows), latency)
    }
}

fn row_matches(row: &Value, query: &Query) -> bool {
    query
        .filters
        .iter()
        .all(|filter| row.get(&filter.column).unwrap_or(&Value::Null) == &filter.value)
}

// Nulls sort last ascending, first descending.
fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

async fn wait(latency: Option<Duration>) {
    if let Some(latency) = latency {
        tokio::time::sleep(latency).await;
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn select(&self, query: &Query) -> Result<Vec<Value>> {
        let (rows, latency) = self.begin(query);
        wait(latency).await;
        let mut rows = rows?;

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = compare(a.get(&order.column), b.get(&order.column));
                match order.direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn count(&self, query: &Query) -> Result<u64> {
        let (rows, latency) = self.begin(query);
        wait(latency).await;
        Ok(rows?.len() as u64)
    }

    async fn subscribe(&self, table: Table, scope: &CancellationToken) -> Result<Subscription> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let token = scope.child_token();
        let mut inner = self.lock();
        inner.subscribers.retain(Subscriber::is_live);
        inner.subscribers.push(Subscriber {
            table,
            tx,
            token: token.clone(),
        });
        Ok(Subscription::new(table, rx, token))
    }
}
