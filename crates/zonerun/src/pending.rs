//! # Pending Results
//!
//! Bridges the native zone's completion callbacks to futures.
//!
//! A [`Resolver`] and its [`Pending`] share a single-assignment cell: the
//! resolver writes it at most once (it is consumed by `resolve`), and the
//! pending side yields whatever was written. No async runtime is required to
//! poll a `Pending`.

use std::future::Future;
use std::pin::Pin;
use std::task::Context;
use std::task::Poll;

use tokio::sync::oneshot;

use crate::error::Error;
use crate::error::Result;

/// Error code reported when a completion is dropped without being called.
pub const DROPPED_CODE: i32 = -1;

/// Write side of a pending result.
pub struct Resolver<T> {
    tx: oneshot::Sender<Result<T>>,
}

impl<T> Resolver<T> {
    /// Fulfills the paired [`Pending`]. A dropped receiver is not an error.
    pub fn resolve(self, result: Result<T>) {
        if self.tx.send(result).is_err() {
            tracing::trace!("pending result dropped before resolution");
        }
    }
}

/// A result that a native zone will deliver later.
///
/// The request has already been dispatched when a `Pending` is returned;
/// dropping it does not cancel native work.
#[must_use = "the result of a zone call is only observable by awaiting it"]
pub struct Pending<T> {
    rx: oneshot::Receiver<Result<T>>,
}

impl<T> Pending<T> {
    /// Creates an unresolved pending result and its resolver.
    pub fn channel() -> (Resolver<T>, Pending<T>) {
        let (tx, rx) = oneshot::channel();
        (Resolver { tx }, Pending { rx })
    }

    /// A pending result that is already settled.
    pub fn ready(result: Result<T>) -> Self {
        let (resolver, pending) = Self::channel();
        resolver.resolve(result);
        pending
    }
}

impl<T> Future for Pending<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|received| {
            received.unwrap_or_else(|_| {
                Err(Error::NativeExecutionFailure {
                    code: DROPPED_CODE,
                    message: "native zone dropped the completion without responding".into(),
                })
            })
        })
    }
}

impl<T> std::fmt::Debug for Pending<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pending").finish_non_exhaustive()
    }
}
