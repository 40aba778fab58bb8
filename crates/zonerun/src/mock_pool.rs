//! Scripted native zone for testing.
//!
//! `StubZone` answers every execute with a responder closure and every
//! broadcast with a fixed code, recording what it was asked to do.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::atomic::AtomicI32;
use std::sync::atomic::Ordering;

use crate::native::Completion;
use crate::native::NativeZone;
use crate::protocol::ExecuteRequest;
use crate::protocol::ExecuteResponse;
use crate::protocol::ResponseCode;
use crate::protocol::SUCCESS;

type Responder = dyn Fn(&ExecuteRequest) -> ExecuteResponse + Send + Sync;

/// How asynchronous completions are delivered.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// Call the completion before `execute`/`broadcast` returns.
    Immediate,
    /// Call the completion from a separate thread.
    Deferred,
    /// Drop the completion without calling it.
    Dropped,
}

/// A native zone whose answers are scripted by the test.
pub struct StubZone {
    id: String,
    responder: Box<Responder>,
    broadcast_code: AtomicI32,
    delivery: Mutex<Delivery>,
    requests: Mutex<Vec<ExecuteRequest>>,
    sources: Mutex<Vec<String>>,
}

impl StubZone {
    /// A stub that answers each request with `responder(request)`.
    pub fn replying<F>(id: impl Into<String>, responder: F) -> Self
    where
        F: Fn(&ExecuteRequest) -> ExecuteResponse + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            responder: Box::new(responder),
            broadcast_code: AtomicI32::new(SUCCESS),
            delivery: Mutex::new(Delivery::Immediate),
            requests: Mutex::new(Vec::new()),
            sources: Mutex::new(Vec::new()),
        }
    }

    /// A stub that answers every request with a clone of `response`.
    pub fn with_response(id: impl Into<String>, response: ExecuteResponse) -> Self {
        Self::replying(id, move |_| response.clone())
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn set_broadcast_code(&self, code: ResponseCode) {
        self.broadcast_code.store(code, Ordering::SeqCst);
    }

    pub fn set_delivery(&self, delivery: Delivery) {
        *lock(&self.delivery) = delivery;
    }

    /// Number of execute requests received so far.
    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Runs `f` over the recorded requests.
    pub fn with_requests<R>(&self, f: impl FnOnce(&[ExecuteRequest]) -> R) -> R {
        f(&lock(&self.requests))
    }

    /// Broadcast sources received so far.
    pub fn sources(&self) -> Vec<String> {
        lock(&self.sources).clone()
    }

    fn respond(&self, request: ExecuteRequest) -> ExecuteResponse {
        let response = (self.responder)(&request);
        lock(&self.requests).push(request);
        response
    }

    fn deliver<T: Send + 'static>(&self, value: T, on_complete: Completion<T>) {
        let delivery = *lock(&self.delivery);
        match delivery {
            Delivery::Immediate => on_complete(value),
            Delivery::Deferred => {
                std::thread::spawn(move || on_complete(value));
            }
            Delivery::Dropped => drop(on_complete),
        }
    }
}

impl NativeZone for StubZone {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn execute(&self, request: ExecuteRequest, on_complete: Completion<ExecuteResponse>) {
        let response = self.respond(request);
        self.deliver(response, on_complete);
    }

    fn execute_sync(&self, request: ExecuteRequest) -> ExecuteResponse {
        self.respond(request)
    }

    fn broadcast(&self, source: String, on_complete: Completion<ResponseCode>) {
        let code = self.broadcast_sync(source);
        self.deliver(code, on_complete);
    }

    fn broadcast_sync(&self, source: String) -> ResponseCode {
        lock(&self.sources).push(source);
        self.broadcast_code.load(Ordering::SeqCst)
    }
}

/// Locks a mutex, recovering the data if a panicking test poisoned it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
