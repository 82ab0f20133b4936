pub mod camera_monitor;
pub mod dashboard;

use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::{CancellationToken, DropGuard};

pub use camera_monitor::CameraMonitor;
pub use dashboard::DashboardController;

/// A published value tagged with the ticket of the request that produced it.
#[derive(Debug, Clone)]
pub struct Versioned<T> {
    pub seq: u64,
    pub value: T,
}

/// One view published to renderers.
///
/// Loads take a ticket before issuing their fetch and commit with it
/// afterwards. A commit is applied only when its ticket is newer than the
/// one already applied and the guard token is still live, so a slow stale
/// response never replaces a newer one and nothing lands after teardown.
pub struct ViewCell<T> {
    tx: watch::Sender<Versioned<T>>,
    next: AtomicU64,
}

impl<T> ViewCell<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _) = watch::channel(Versioned { seq: 0, value: initial });
        Self {
            tx,
            next: AtomicU64::new(0),
        }
    }

    pub fn ticket(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Returns whether the value was applied.
    pub fn commit(&self, ticket: u64, guard: &CancellationToken, value: T) -> bool {
        // Guard and ticket are checked under the channel's write lock.
        self.tx.send_if_modified(move |current| {
            if guard.is_cancelled() || ticket <= current.seq {
                return false;
            }
            current.seq = ticket;
            current.value = value;
            true
        })
    }

    pub fn watch(&self) -> watch::Receiver<Versioned<T>> {
        self.tx.subscribe()
    }

    /// Ticket of the applied value; 0 before the first commit.
    pub fn applied(&self) -> u64 {
        self.tx.borrow().seq
    }
}

impl<T: Clone> ViewCell<T> {
    pub fn snapshot(&self) -> T {
        self.tx.borrow().value.clone()
    }
}

/// A mounted view. Dropping it, or calling [`Mounted::unmount`], cancels the
/// view's lifetime: subscriptions and polling stop before the call returns.
pub struct Mounted<C> {
    view: Arc<C>,
    _guard: DropGuard,
}

impl<C> Mounted<C> {
    pub(crate) fn new(view: Arc<C>, lifetime: &CancellationToken) -> Self {
        Self {
            view,
            _guard: lifetime.clone().drop_guard(),
        }
    }

    pub fn view(&self) -> &Arc<C> {
        &self.view
    }

    pub fn unmount(self) {}
}

impl<C> Deref for Mounted<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.view
    }
}
