//! [`Interrupt`] delivers a cancellation signal to a waiting acquisition.

#![deny(unsafe_code)]

use std::fmt;
use std::sync::atomic::Ordering::{AcqRel, Acquire, Release};
use std::sync::{Arc, Weak};

#[cfg(feature = "loom")]
use loom::sync::atomic::AtomicBool;
#[cfg(feature = "loom")]
use loom::sync::Mutex;
#[cfg(not(feature = "loom"))]
use std::sync::atomic::AtomicBool;
#[cfg(not(feature = "loom"))]
use std::sync::Mutex;

use crate::wait_queue::Entry;

/// [`Interrupt`] delivers a cancellation signal to a waiting acquisition.
///
/// Threads have no ambient cancellation status, so the flag a waiting acquire observes is carried
/// by an explicit token. Cloning an [`Interrupt`] yields a handle to the same flag: one half is
/// given to the thread calling an interruptible or timed acquisition on a
/// [`Lock`](crate::Lock), the other half to whoever may cancel the wait.
///
/// A token serves at most one waiting call at a time.
///
/// # Examples
///
/// ```
/// use relock::Interrupt;
///
/// let interrupt = Interrupt::default();
/// assert!(!interrupt.is_interrupted());
///
/// interrupt.interrupt();
/// assert!(interrupt.is_interrupted());
///
/// assert!(interrupt.clear());
/// assert!(!interrupt.is_interrupted());
/// ```
#[derive(Clone, Default)]
pub struct Interrupt {
    inner: Arc<Inner>,
}

struct Inner {
    /// The cancellation flag.
    flag: AtomicBool,
    /// The waiter currently parked under this token, if any.
    parked: Mutex<Weak<Entry>>,
}

impl Interrupt {
    /// Creates a new [`Interrupt`] with the flag unset.
    ///
    /// # Examples
    ///
    /// ```
    /// use relock::Interrupt;
    ///
    /// let interrupt = Interrupt::new();
    /// assert!(!interrupt.is_interrupted());
    /// ```
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the cancellation flag and wakes the waiter parked under this token, if any.
    ///
    /// An interruptible acquisition observing the flag returns
    /// [`Error::Interrupted`](crate::Error::Interrupted) and consumes the flag; a timed,
    /// non-interruptible acquisition returns `false` and leaves the flag set.
    ///
    /// # Examples
    ///
    /// ```
    /// use relock::{Error, Interrupt, Lock, Permit};
    ///
    /// let lock = Lock::default();
    /// let interrupt = Interrupt::default();
    ///
    /// interrupt.interrupt();
    /// assert_eq!(
    ///     lock.lock_exclusive_interruptible(Permit::new(11111), &interrupt),
    ///     Err(Error::Interrupted),
    /// );
    /// ```
    #[inline]
    pub fn interrupt(&self) {
        self.inner.flag.store(true, Release);
        if let Ok(parked) = self.inner.parked.lock() {
            if let Some(entry) = parked.upgrade() {
                entry.signal();
            }
        }
    }

    /// Returns `true` if the cancellation flag is set.
    #[inline]
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        self.inner.flag.load(Acquire)
    }

    /// Clears the cancellation flag, returning its previous value.
    ///
    /// # Examples
    ///
    /// ```
    /// use relock::Interrupt;
    ///
    /// let interrupt = Interrupt::default();
    /// assert!(!interrupt.clear());
    ///
    /// interrupt.interrupt();
    /// assert!(interrupt.clear());
    /// ```
    #[inline]
    pub fn clear(&self) -> bool {
        self.inner.flag.swap(false, AcqRel)
    }

    /// Routes future [`interrupt`](Self::interrupt) calls to the given waiter.
    pub(crate) fn register(&self, entry: &Arc<Entry>) {
        if let Ok(mut parked) = self.inner.parked.lock() {
            *parked = Arc::downgrade(entry);
        }
    }

    /// Detaches the waiter registered by [`register`](Self::register).
    pub(crate) fn unregister(&self) {
        if let Ok(mut parked) = self.inner.parked.lock() {
            *parked = Weak::new();
        }
    }
}

impl fmt::Debug for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interrupt")
            .field("interrupted", &self.is_interrupted())
            .finish()
    }
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            flag: AtomicBool::new(false),
            parked: Mutex::new(Weak::new()),
        }
    }
}
