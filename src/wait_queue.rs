//! Wait queue implementation.

#![deny(unsafe_code)]

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

#[cfg(feature = "loom")]
use loom::sync::{Condvar, Mutex};
#[cfg(not(feature = "loom"))]
use std::sync::{Condvar, Mutex};

use crate::opcode::Opcode;

/// A FIFO queue of suspended acquirers.
///
/// The queue orders waiters; it takes no part in deciding who may acquire. A releaser that
/// transitions the lock to its free state signals the head entry, extending the signal to the
/// run of consecutive shared entries behind a shared head so that read traffic is granted
/// together. Signalled waiters retry against the state word themselves.
pub(crate) struct WaitQueue {
    entries: Mutex<VecDeque<Arc<Entry>>>,
}

/// A single suspended acquirer.
///
/// Wakeups are level-triggered: a signal delivered before the waiter parks is observed by the
/// next park. Both the releaser and an [`Interrupt`](crate::Interrupt) wake an entry the same
/// way; the woken thread distinguishes the cause by rechecking the lock state and its token.
pub(crate) struct Entry {
    /// The acquisition mode the waiter asked for.
    opcode: Opcode,
    /// Level-triggered wake flag.
    signal: Mutex<bool>,
    condvar: Condvar,
}

impl WaitQueue {
    #[cfg(feature = "loom")]
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
        }
    }

    #[cfg(not(feature = "loom"))]
    pub(crate) const fn new() -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
        }
    }

    /// Appends a waiter to the tail of the queue.
    pub(crate) fn push(&self, entry: Arc<Entry>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push_back(entry);
        }
    }

    /// Removes a waiter from the queue, wherever it sits.
    pub(crate) fn remove(&self, entry: &Arc<Entry>) {
        if let Ok(mut entries) = self.entries.lock() {
            if let Some(index) = entries.iter().position(|other| Arc::ptr_eq(other, entry)) {
                entries.remove(index);
            }
        }
    }

    /// Signals the waiter at the head of the queue.
    ///
    /// When the head requested shared ownership, every consecutive shared waiter behind it is
    /// signalled as well. Waiters queued behind an exclusive entry are left untouched.
    pub(crate) fn signal_head(&self) {
        if let Ok(entries) = self.entries.lock() {
            let mut iter = entries.iter();
            if let Some(head) = iter.next() {
                head.signal();
                if head.opcode() == Opcode::Shared {
                    for entry in iter.take_while(|entry| entry.opcode() == Opcode::Shared) {
                        entry.signal();
                    }
                }
            }
        }
    }

    /// The number of queued waiters.
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().map_or(0, |entries| entries.len())
    }
}

impl fmt::Debug for WaitQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitQueue")
            .field("len", &self.len())
            .finish()
    }
}

impl Entry {
    pub(crate) fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            signal: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    pub(crate) const fn opcode(&self) -> Opcode {
        self.opcode
    }

    /// Wakes the waiter, or arms the next park if the waiter is not parked yet.
    pub(crate) fn signal(&self) {
        if let Ok(mut signalled) = self.signal.lock() {
            *signalled = true;
            self.condvar.notify_one();
        }
    }

    /// Parks the calling thread until the entry is signalled, consuming the signal.
    pub(crate) fn park(&self) {
        if let Ok(mut signalled) = self.signal.lock() {
            while !*signalled {
                if let Ok(returned) = self.condvar.wait(signalled) {
                    signalled = returned;
                } else {
                    debug_assert!(false, "the mutex can never be poisoned");
                    return;
                }
            }
            *signalled = false;
        }
    }

    /// Parks the calling thread until the entry is signalled or `deadline` passes.
    ///
    /// Returns `true` if a signal was consumed, `false` on deadline expiry.
    pub(crate) fn park_until(&self, deadline: Instant) -> bool {
        if let Ok(mut signalled) = self.signal.lock() {
            loop {
                if *signalled {
                    *signalled = false;
                    return true;
                }
                let now = Instant::now();
                if now >= deadline {
                    return false;
                }
                #[cfg(not(feature = "loom"))]
                match self.condvar.wait_timeout(signalled, deadline - now) {
                    Ok((returned, _)) => signalled = returned,
                    Err(_) => {
                        debug_assert!(false, "the mutex can never be poisoned");
                        return false;
                    }
                }
                // `loom` does not model timed waits, so wait for a signal instead.
                #[cfg(feature = "loom")]
                match self.condvar.wait(signalled) {
                    Ok(returned) => signalled = returned,
                    Err(_) => return false,
                }
            }
        } else {
            debug_assert!(false, "the mutex can never be poisoned");
            false
        }
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("opcode", &self.opcode)
            .finish()
    }
}
