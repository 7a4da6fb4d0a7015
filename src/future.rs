//! Single-assignment deferred outcome of one asynchronous operation.
//!
//! A [`pending`] pair splits the cell into a [`Completer`], held by whoever
//! performs the work, and an [`OperationFuture`], handed to the caller. The
//! completer is consumed on use, so an outcome is assigned at most once; a
//! completer dropped without being used assigns [`TableError::Abandoned`], so
//! every future is eventually resolved.
//!
//! Callers either `.await` the future, attach a continuation with
//! [`OperationFuture::on_complete`] (run immediately when the outcome is
//! already stored, otherwise on the completing thread), or opt into a blocking
//! [`OperationFuture::wait`].

use std::{
    fmt,
    future::Future,
    mem,
    pin::Pin,
    sync::{Arc, Mutex, MutexGuard},
    task::{Context, Poll, Waker},
};

use crate::error::{TableError, TableResult};

type Continuation<T> = Box<dyn FnOnce(TableResult<T>) + Send>;

enum Slot<T> {
    Pending {
        waker: Option<Waker>,
        continuation: Option<Continuation<T>>,
    },
    Resolved(TableResult<T>),
    /// Outcome already handed out through `poll`.
    Taken,
}

struct Cell<T> {
    slot: Mutex<Slot<T>>,
}

impl<T> Cell<T> {
    fn new(slot: Slot<T>) -> Arc<Self> {
        Arc::new(Self {
            slot: Mutex::new(slot),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn resolve(&self, outcome: TableResult<T>) {
        let mut slot = self.lock();
        match mem::replace(&mut *slot, Slot::Taken) {
            Slot::Pending {
                continuation: Some(continuation),
                ..
            } => {
                drop(slot);
                continuation(outcome);
            }
            Slot::Pending {
                waker,
                continuation: None,
            } => {
                *slot = Slot::Resolved(outcome);
                drop(slot);
                if let Some(waker) = waker {
                    waker.wake();
                }
            }
            // A completer is consumed on use; a second assignment cannot be expressed.
            settled => *slot = settled,
        }
    }
}

/// Create a linked completer/future pair.
pub fn pending<T>() -> (Completer<T>, OperationFuture<T>) {
    let cell = Cell::new(Slot::Pending {
        waker: None,
        continuation: None,
    });
    (
        Completer {
            cell: Some(Arc::clone(&cell)),
        },
        OperationFuture { cell },
    )
}

/// Write side of a deferred outcome.
pub struct Completer<T> {
    cell: Option<Arc<Cell<T>>>,
}

impl<T> Completer<T> {
    /// Assign the outcome, waking the awaiting task or running the attached continuation.
    pub fn complete(mut self, outcome: TableResult<T>) {
        if let Some(cell) = self.cell.take() {
            cell.resolve(outcome);
        }
    }

    /// Assign a successful outcome.
    pub fn resolve(self, value: T) {
        self.complete(Ok(value));
    }

    /// Assign a failed outcome.
    pub fn fail(self, error: TableError) {
        self.complete(Err(error));
    }
}

impl<T> Drop for Completer<T> {
    fn drop(&mut self) {
        if let Some(cell) = self.cell.take() {
            cell.resolve(Err(TableError::Abandoned));
        }
    }
}

impl<T> fmt::Debug for Completer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completer").finish()
    }
}

/// Read side of a deferred outcome returned by every table operation.
///
/// Dropping the future does not cancel the underlying operation.
#[must_use = "dropping an OperationFuture discards the outcome, not the operation"]
pub struct OperationFuture<T> {
    cell: Arc<Cell<T>>,
}

impl<T> OperationFuture<T> {
    /// Future that is already resolved with `value`.
    pub fn ready(value: T) -> Self {
        Self::from_outcome(Ok(value))
    }

    /// Future that has already failed with `error`.
    pub fn failed(error: TableError) -> Self {
        Self::from_outcome(Err(error))
    }

    /// Future that already holds `outcome`.
    pub fn from_outcome(outcome: TableResult<T>) -> Self {
        Self {
            cell: Cell::new(Slot::Resolved(outcome)),
        }
    }

    /// Whether an outcome has been assigned and not yet consumed.
    pub fn is_done(&self) -> bool {
        matches!(*self.cell.lock(), Slot::Resolved(_))
    }

    /// Block the calling thread until the outcome is available.
    ///
    /// This is the only blocking entry point; nothing in the crate calls it.
    pub fn wait(self) -> TableResult<T> {
        futures::executor::block_on(self)
    }
}

impl<T: Send + 'static> OperationFuture<T> {
    /// Run `continuation` with the outcome.
    ///
    /// Runs on the calling thread right away when the outcome is already
    /// stored, otherwise on whichever thread completes the operation. Never
    /// blocks.
    pub fn on_complete<F>(self, continuation: F)
    where
        F: FnOnce(TableResult<T>) + Send + 'static,
    {
        let mut slot = self.cell.lock();
        match mem::replace(&mut *slot, Slot::Taken) {
            Slot::Resolved(outcome) => {
                drop(slot);
                continuation(outcome);
            }
            Slot::Pending { .. } => {
                *slot = Slot::Pending {
                    waker: None,
                    continuation: Some(Box::new(continuation)),
                };
            }
            Slot::Taken => {}
        }
    }

    /// Transform a successful value.
    pub fn map<U, F>(self, f: F) -> OperationFuture<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        self.try_map(move |value| Ok(f(value)))
    }

    /// Transform a successful value with a step that may itself fail.
    pub fn try_map<U, F>(self, f: F) -> OperationFuture<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> TableResult<U> + Send + 'static,
    {
        let (completer, future) = pending();
        self.on_complete(move |outcome| completer.complete(outcome.and_then(f)));
        future
    }
}

impl<T> From<TableResult<T>> for OperationFuture<T> {
    fn from(outcome: TableResult<T>) -> Self {
        Self::from_outcome(outcome)
    }
}

impl<T> Future for OperationFuture<T> {
    type Output = TableResult<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut slot = self.cell.lock();
        if let Slot::Pending { waker, .. } = &mut *slot {
            let registered = matches!(waker, Some(current) if current.will_wake(cx.waker()));
            if !registered {
                *waker = Some(cx.waker().clone());
            }
            return Poll::Pending;
        }
        match mem::replace(&mut *slot, Slot::Taken) {
            Slot::Resolved(outcome) => Poll::Ready(outcome),
            Slot::Pending { .. } | Slot::Taken => panic!("OperationFuture polled after completion"),
        }
    }
}

impl<T> fmt::Debug for OperationFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match *self.cell.lock() {
            Slot::Pending { .. } => "pending",
            Slot::Resolved(Ok(_)) => "resolved",
            Slot::Resolved(Err(_)) => "failed",
            Slot::Taken => "taken",
        };
        f.debug_struct("OperationFuture")
            .field("state", &state)
            .finish()
    }
}

struct Join<T> {
    values: Vec<Option<T>>,
    remaining: usize,
    completer: Option<Completer<Vec<T>>>,
}

/// Join futures, yielding their values in input order.
///
/// Fails with the first error to arrive; later outcomes are discarded.
pub fn all<T, I>(futures: I) -> OperationFuture<Vec<T>>
where
    T: Send + 'static,
    I: IntoIterator<Item = OperationFuture<T>>,
{
    let futures: Vec<_> = futures.into_iter().collect();
    if futures.is_empty() {
        return OperationFuture::ready(Vec::new());
    }
    let (completer, joined) = pending();
    let state = Arc::new(Mutex::new(Join {
        values: futures.iter().map(|_| None).collect(),
        remaining: futures.len(),
        completer: Some(completer),
    }));
    for (index, future) in futures.into_iter().enumerate() {
        let state = Arc::clone(&state);
        future.on_complete(move |outcome| {
            let mut join = state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if join.completer.is_none() {
                return;
            }
            match outcome {
                Err(error) => {
                    let completer = join.completer.take();
                    drop(join);
                    if let Some(completer) = completer {
                        completer.fail(error);
                    }
                }
                Ok(value) => {
                    join.values[index] = Some(value);
                    join.remaining -= 1;
                    if join.remaining == 0 {
                        let completer = join.completer.take();
                        let values = mem::take(&mut join.values).into_iter().flatten().collect();
                        drop(join);
                        if let Some(completer) = completer {
                            completer.resolve(values);
                        }
                    }
                }
            }
        });
    }
    joined
}
