//! # Write Gate Module
//!
//! Implements the concurrency rule from the concurrency & resource model: an
//! unbounded number of ordinary readers, at most one writer at a time, and
//! an *exclusive* read that blocks future writers (but not other readers)
//! for as long as it is held — used so that zero-copy sub-range reads are
//! safe from a concurrent writer growing the map underneath them.

use std::sync::{Condvar, Mutex};

use crate::error::{StoreError, StoreResult};

#[derive(Default)]
struct GateState {
    writer_active: bool,
    exclusive_readers: u32,
}

/// Arbitrates writer exclusivity. Ordinary reads never touch this gate at
/// all; only [`WriteGate::begin_write`] and [`WriteGate::begin_exclusive_read`]
/// do.
pub struct WriteGate {
    state: Mutex<GateState>,
    signal: Condvar,
}

impl WriteGate {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState::default()),
            signal: Condvar::new(),
        }
    }

    /// Acquires the single writer slot. Blocks while another writer holds it
    /// or an exclusive read is in progress, unless `blocking` is false, in
    /// which case it fails immediately instead of waiting.
    pub fn begin_write(&self, blocking: bool) -> StoreResult<WriterGuard<'_>> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| StoreError::Persistence("write gate lock poisoned".into()))?;

        while state.writer_active || state.exclusive_readers > 0 {
            if !blocking {
                return Err(StoreError::InvalidArgument(
                    "another writer or exclusive read is active".into(),
                ));
            }
            state = self
                .signal
                .wait(state)
                .map_err(|_| StoreError::Persistence("write gate lock poisoned".into()))?;
        }
        state.writer_active = true;
        Ok(WriterGuard { gate: self })
    }

    /// Acquires an exclusive read slot. Blocks only while a writer is
    /// active; any number of exclusive reads may be held concurrently, and
    /// ordinary readers are never blocked.
    pub fn begin_exclusive_read(&self) -> StoreResult<ExclusiveReadGuard<'_>> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| StoreError::Persistence("write gate lock poisoned".into()))?;

        while state.writer_active {
            state = self
                .signal
                .wait(state)
                .map_err(|_| StoreError::Persistence("write gate lock poisoned".into()))?;
        }
        state.exclusive_readers += 1;
        Ok(ExclusiveReadGuard { gate: self })
    }

    fn release_writer(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.writer_active = false;
        }
        self.signal.notify_all();
    }

    fn release_exclusive_read(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.exclusive_readers = state.exclusive_readers.saturating_sub(1);
        }
        self.signal.notify_all();
    }
}

impl Default for WriteGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Held for the duration of a write transaction; releases the writer slot
/// and wakes waiters on drop, regardless of whether the transaction
/// committed or aborted.
pub struct WriterGuard<'a> {
    gate: &'a WriteGate,
}

impl Drop for WriterGuard<'_> {
    fn drop(&mut self) {
        self.gate.release_writer();
    }
}

/// Held for the duration of an exclusive read.
pub struct ExclusiveReadGuard<'a> {
    gate: &'a WriteGate,
}

impl Drop for ExclusiveReadGuard<'_> {
    fn drop(&mut self) {
        self.gate.release_exclusive_read();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn non_blocking_write_fails_while_writer_active() {
        let gate = WriteGate::new();
        let first = gate.begin_write(true).unwrap();
        assert!(gate.begin_write(false).is_err());
        drop(first);
        assert!(gate.begin_write(false).is_ok());
    }

    #[test]
    fn exclusive_read_blocks_writer_until_dropped() {
        let gate = Arc::new(WriteGate::new());
        let exclusive = gate.begin_exclusive_read().unwrap();
        let gate2 = gate.clone();
        let handle = thread::spawn(move || {
            gate2.begin_write(true).unwrap();
        });
        thread::sleep(Duration::from_millis(20));
        assert!(!handle.is_finished());
        drop(exclusive);
        handle.join().unwrap();
    }

    #[test]
    fn multiple_exclusive_reads_coexist() {
        let gate = WriteGate::new();
        let a = gate.begin_exclusive_read().unwrap();
        let b = gate.begin_exclusive_read().unwrap();
        drop(a);
        drop(b);
        assert!(gate.begin_write(false).is_ok());
    }
}
