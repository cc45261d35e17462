//! Single-settlement result channel returned by every client operation.
//!
//! # Design
//! [`pair`] creates a producer ([`Deferred`]) and a consumer
//! ([`AsyncResult`]). The producer settles exactly once, enforced by
//! `resolve`/`reject` taking `self`. The consumer can be awaited and also
//! carries a callback registry:
//!
//! - Awaiting subscribes to a `tokio::sync::watch` slot holding the settled
//!   outcome, so any number of clones see the same value, before or after
//!   settlement.
//! - `done`/`fail` fire for their branch only, `always` fires for either and
//!   sees the same outcome.
//! - Registrations made after settlement replay the stored outcome
//!   immediately on the registering thread.
//! - Settling publishes to awaiters first, then runs callbacks one by one
//!   outside the state lock. A panicking callback is logged and skipped; it
//!   cannot starve awaiters or the callbacks after it.
//!
//! A `Deferred` dropped without settling rejects the channel with a
//! transport error (status 0); observers are never left pending.

use std::fmt;
use std::future::{Future, IntoFuture};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::error::ApiError;
use crate::types::Response;

/// Either a `(payload, status)` success or an error carrying
/// `(error payload, status)`.
pub type Outcome<T> = Result<Response<T>, ApiError>;

type Callback<T> = Box<dyn FnOnce(&Outcome<T>) + Send>;

type Slot<T> = Option<Arc<Outcome<T>>>;

enum State<T> {
    Pending(Vec<Callback<T>>),
    Settled(Arc<Outcome<T>>),
}

struct Inner<T> {
    state: Mutex<State<T>>,
    settled: watch::Sender<Slot<T>>,
}

impl<T> Inner<T> {
    fn pending() -> Self {
        let (settled, _) = watch::channel(None);
        Self {
            state: Mutex::new(State::Pending(Vec::new())),
            settled,
        }
    }

    fn settle(&self, outcome: Outcome<T>) {
        let outcome = Arc::new(outcome);
        let callbacks = {
            let mut state = self.state.lock();
            match std::mem::replace(&mut *state, State::Settled(Arc::clone(&outcome))) {
                State::Pending(callbacks) => callbacks,
                State::Settled(previous) => {
                    *state = State::Settled(previous);
                    return;
                }
            }
        };
        self.settled.send_replace(Some(Arc::clone(&outcome)));
        for callback in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(&outcome))).is_err() {
                tracing::error!("result callback panicked");
            }
        }
    }

    fn register(&self, callback: Callback<T>) {
        let outcome = {
            let mut state = self.state.lock();
            match &mut *state {
                State::Pending(callbacks) => {
                    callbacks.push(callback);
                    return;
                }
                State::Settled(outcome) => Arc::clone(outcome),
            }
        };
        callback(&outcome);
    }

    fn peek(&self) -> Option<Arc<Outcome<T>>> {
        match &*self.state.lock() {
            State::Pending(_) => None,
            State::Settled(outcome) => Some(Arc::clone(outcome)),
        }
    }
}

/// Create a connected producer/consumer pair.
pub fn pair<T>() -> (Deferred<T>, AsyncResult<T>) {
    let inner = Arc::new(Inner::pending());
    (
        Deferred {
            inner: Some(Arc::clone(&inner)),
        },
        AsyncResult { inner },
    )
}

/// Producer half. Settles its channel exactly once.
pub struct Deferred<T> {
    inner: Option<Arc<Inner<T>>>,
}

impl<T> Deferred<T> {
    pub fn resolve(self, payload: T, status: u16) {
        self.settle(Ok(Response { payload, status }));
    }

    pub fn reject(self, error: ApiError) {
        self.settle(Err(error));
    }

    pub fn settle(mut self, outcome: Outcome<T>) {
        if let Some(inner) = self.inner.take() {
            inner.settle(outcome);
        }
    }
}

impl<T> Drop for Deferred<T> {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            inner.settle(Err(dropped()));
        }
    }
}

fn dropped() -> ApiError {
    ApiError::Transport {
        status: 0,
        message: "operation dropped before completion".to_string(),
    }
}

/// Consumer half. Await it, or observe it through callbacks; clones share
/// the same outcome.
pub struct AsyncResult<T> {
    inner: Arc<Inner<T>>,
}

impl<T> AsyncResult<T> {
    /// An already-successful result.
    pub fn resolved(payload: T, status: u16) -> Self {
        let (deferred, result) = pair();
        deferred.resolve(payload, status);
        result
    }

    /// An already-failed result.
    pub fn rejected(error: ApiError) -> Self {
        let (deferred, result) = pair();
        deferred.reject(error);
        result
    }

    pub fn is_settled(&self) -> bool {
        self.inner.peek().is_some()
    }
}

impl<T: 'static> AsyncResult<T> {
    /// Run `f` with the success value once available.
    pub fn done<F>(&self, f: F) -> &Self
    where
        F: FnOnce(&Response<T>) + Send + 'static,
    {
        self.inner.register(Box::new(move |outcome| {
            if let Ok(response) = outcome {
                f(response);
            }
        }));
        self
    }

    /// Run `f` with the error once available.
    pub fn fail<F>(&self, f: F) -> &Self
    where
        F: FnOnce(&ApiError) + Send + 'static,
    {
        self.inner.register(Box::new(move |outcome| {
            if let Err(error) = outcome {
                f(error);
            }
        }));
        self
    }

    /// Run `f` with the outcome, whichever branch it took.
    pub fn always<F>(&self, f: F) -> &Self
    where
        F: FnOnce(&Outcome<T>) + Send + 'static,
    {
        self.inner.register(Box::new(f));
        self
    }
}

impl<T: Clone> AsyncResult<T> {
    /// The outcome if already settled.
    pub fn peek(&self) -> Option<Outcome<T>> {
        self.inner.peek().map(|outcome| (*outcome).clone())
    }
}

impl<T> Clone for AsyncResult<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> IntoFuture for AsyncResult<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Output = Outcome<T>;
    type IntoFuture = Pin<Box<dyn Future<Output = Outcome<T>> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        let mut settled = self.inner.settled.subscribe();
        Box::pin(async move {
            // `self` keeps the sender alive, so the wait only ends on settlement
            let outcome = match settled.wait_for(Option::is_some).await {
                Ok(slot) => (*slot).clone(),
                Err(_) => None,
            };
            drop(self);
            match outcome {
                Some(outcome) => (*outcome).clone(),
                None => Err(dropped()),
            }
        })
    }
}

impl<T> fmt::Debug for AsyncResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncResult")
            .field("settled", &self.is_settled())
            .finish()
    }
}
