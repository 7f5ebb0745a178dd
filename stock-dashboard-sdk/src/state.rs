//! In-flight and last-error tracking shared by the calls of one resource client.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::error::SdkResult;

/// Counts in-flight calls. Busy while at least one [`BusyGuard`] is alive,
/// so overlapping calls never clear each other's indicator.
#[derive(Debug, Default)]
pub struct BusyFlag {
    count: AtomicUsize,
}

impl BusyFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&self) -> BusyGuard<'_> {
        self.count.fetch_add(1, Ordering::SeqCst);
        BusyGuard { flag: self }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight() > 0
    }

    pub fn in_flight(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

/// Releases its share of a [`BusyFlag`] when dropped, on every exit path.
#[derive(Debug)]
pub struct BusyGuard<'a> {
    flag: &'a BusyFlag,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.count.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
pub struct OperationState {
    busy: BusyFlag,
    last_error: Mutex<Option<String>>,
}

impl OperationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a call: clears the last error and marks the client busy.
    pub fn begin(&self) -> BusyGuard<'_> {
        self.set_error(None);
        self.busy.enter()
    }

    /// Remembers the failure message of `result`, if any.
    pub fn record<T>(&self, result: &SdkResult<T>) {
        if let Err(e) = result {
            self.set_error(Some(e.to_string()));
        }
    }

    /// Runs `operation` between [`begin`](Self::begin) and [`record`](Self::record).
    pub async fn track<T, F>(&self, operation: F) -> SdkResult<T>
    where
        F: Future<Output = SdkResult<T>>,
    {
        let _guard = self.begin();
        let result = operation.await;
        self.record(&result);
        result
    }

    pub fn is_loading(&self) -> bool {
        self.busy.is_busy()
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().ok().and_then(|slot| slot.clone())
    }

    fn set_error(&self, error: Option<String>) {
        if let Ok(mut slot) = self.last_error.lock() {
            *slot = error;
        }
    }
}
