//! [`Lock`] is a reentrant, mode-aware locking primitive keyed by caller-supplied permits.

#![deny(unsafe_code)]

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::Ordering::{self, Acquire, Relaxed, Release};
use std::time::{Duration, Instant};

#[cfg(feature = "loom")]
use loom::sync::atomic::AtomicU64;
#[cfg(not(feature = "loom"))]
use std::sync::atomic::AtomicU64;

use crate::config::{Config, DefaultConfig};
use crate::interrupt::Interrupt;
use crate::opcode::Opcode;
use crate::permit::Permit;
use crate::state::{Attempt, Mode, State};
use crate::wait_queue::{Entry, WaitQueue};

/// [`Lock`] is a reentrant, mode-aware locking primitive keyed by caller-supplied permits.
///
/// [`Lock`] serializes access to a mutable model that is traversed by many readers and modified
/// by a single writer driving a multi-step transaction. It differs from a conventional
/// reader-writer lock in two ways.
///
/// * Exclusive ownership is keyed by a [`Permit`]: any number of acquisitions under the owning
///   permit reenter without blocking, regardless of which thread presents it, while acquisitions
///   under a different permit wait.
/// * The two modes are mutually exclusive and sticky: the mode can only change by passing
///   through the free state, so a holder can never upgrade or downgrade in place.
///
/// The entire state, `mode | count | permit`, lives in one atomic word mutated only by
/// compare-and-swap; suspended acquirers park in a FIFO wait queue. The lock is released only
/// once every acquisition has been paired with a release.
///
/// # Examples
///
/// ```
/// use relock::{Lock, Permit};
///
/// let lock = Lock::default();
/// let permit = Permit::new(11111);
///
/// assert_eq!(lock.lock_exclusive(permit), Ok(()));
/// assert_eq!(lock.lock_exclusive(permit), Ok(()));
///
/// assert_eq!(lock.unlock_exclusive(permit), Ok(()));
/// assert_eq!(lock.unlock_exclusive(permit), Ok(()));
/// ```
pub struct Lock {
    /// Packed `mode | count | permit` state, mutated only by compare-and-swap.
    state: AtomicU64,
    /// FIFO queue of suspended acquirers.
    waiters: WaitQueue,
}

impl Default for Lock {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/// Errors reported by [`Lock`] operations.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Error {
    /// The permit identifier does not fit in the 32-bit range.
    InvalidPermit,
    /// A release was attempted in a mode the lock is not held in, or with no holder at all.
    NotHeld,
    /// An exclusive release was attempted under a permit other than the owner's.
    NotOwner,
    /// The aggregate hold count would exceed [`Lock::COUNT_MAX`].
    CountOverflow,
    /// A cancellation was delivered while waiting for the lock.
    Interrupted,
}

impl Lock {
    /// Maximum aggregate hold count across all acquirers.
    pub const COUNT_MAX: u16 = State::COUNT_MAX;

    /// Creates a new [`Lock`] in the free state.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::atomic::Ordering::Relaxed;
    ///
    /// use relock::Lock;
    ///
    /// let lock = Lock::new();
    /// assert!(lock.is_free(Relaxed));
    /// ```
    #[cfg(not(feature = "loom"))]
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: AtomicU64::new(0),
            waiters: WaitQueue::new(),
        }
    }

    /// Creates a new [`Lock`] in the free state.
    #[cfg(feature = "loom")]
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: AtomicU64::new(0),
            waiters: WaitQueue::new(),
        }
    }

    /// Returns `true` if the lock is currently free.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::atomic::Ordering::Relaxed;
    ///
    /// use relock::{Lock, Permit};
    ///
    /// let lock = Lock::default();
    /// assert!(lock.is_free(Relaxed));
    ///
    /// assert_eq!(lock.lock_exclusive(Permit::new(11111)), Ok(()));
    /// assert!(!lock.is_free(Relaxed));
    /// ```
    #[inline]
    #[must_use]
    pub fn is_free(&self, mo: Ordering) -> bool {
        State::from_bits(self.state.load(mo)).is_free()
    }

    /// Returns `true` if exclusive ownership is currently held.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::atomic::Ordering::Relaxed;
    ///
    /// use relock::{Lock, Permit};
    ///
    /// let lock = Lock::default();
    /// assert_eq!(lock.lock_exclusive(Permit::new(11111)), Ok(()));
    ///
    /// assert!(lock.is_exclusive(Relaxed));
    /// assert!(!lock.is_shared(Relaxed));
    /// ```
    #[inline]
    #[must_use]
    pub fn is_exclusive(&self, mo: Ordering) -> bool {
        State::from_bits(self.state.load(mo)).mode() == Mode::Exclusive
    }

    /// Returns `true` if shared ownership is currently held.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::atomic::Ordering::Relaxed;
    ///
    /// use relock::{Lock, Permit};
    ///
    /// let lock = Lock::default();
    /// assert_eq!(lock.lock_shared(Permit::new(11111)), Ok(()));
    ///
    /// assert!(lock.is_shared(Relaxed));
    /// assert!(!lock.is_exclusive(Relaxed));
    /// ```
    #[inline]
    #[must_use]
    pub fn is_shared(&self, mo: Ordering) -> bool {
        State::from_bits(self.state.load(mo)).mode() == Mode::Shared
    }

    /// Acquires exclusive ownership under `permit`, waiting as long as it takes.
    ///
    /// Returns immediately when the lock is free or already held exclusively under the same
    /// permit; otherwise the calling thread is suspended until every holder has released. The
    /// wait cannot be cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CountOverflow`] if the reentrant hold count would exceed
    /// [`Self::COUNT_MAX`].
    ///
    /// # Examples
    ///
    /// ```
    /// use relock::{Lock, Permit};
    ///
    /// let lock = Lock::default();
    /// let permit = Permit::new(11111);
    ///
    /// assert_eq!(lock.lock_exclusive(permit), Ok(()));
    /// assert_eq!(lock.lock_exclusive(permit), Ok(()));
    ///
    /// assert_eq!(lock.unlock_exclusive(permit), Ok(()));
    /// assert_eq!(lock.unlock_exclusive(permit), Ok(()));
    /// ```
    #[inline]
    pub fn lock_exclusive(&self, permit: Permit) -> Result<(), Error> {
        self.acquire(permit, Opcode::Exclusive, None, None, false)
            .map(drop)
    }

    /// Acquires exclusive ownership under `permit`, giving up once `timeout` has elapsed.
    ///
    /// Returns `Ok(true)` on acquisition and `Ok(false)` on deadline expiry, with the lock state
    /// untouched. A zero `timeout` never suspends the caller: the call degenerates to a single
    /// immediate attempt. A cancellation delivered through `interrupt` is absorbed: the call
    /// returns `Ok(false)` and leaves the token set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CountOverflow`] if the reentrant hold count would exceed
    /// [`Self::COUNT_MAX`].
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use relock::{Interrupt, Lock, Permit};
    ///
    /// let lock = Lock::default();
    /// let interrupt = Interrupt::default();
    ///
    /// assert_eq!(lock.lock_shared(Permit::new(11111)), Ok(()));
    ///
    /// // An exclusive request cannot join the shared holders, not even under the same permit.
    /// let timeout = Duration::from_millis(1);
    /// assert_eq!(
    ///     lock.lock_exclusive_timeout(Permit::new(22222), timeout, &interrupt),
    ///     Ok(false),
    /// );
    /// assert_eq!(
    ///     lock.lock_exclusive_timeout(Permit::new(11111), timeout, &interrupt),
    ///     Ok(false),
    /// );
    ///
    /// assert_eq!(lock.unlock_shared(Permit::new(11111)), Ok(()));
    /// assert_eq!(
    ///     lock.lock_exclusive_timeout(Permit::new(22222), timeout, &interrupt),
    ///     Ok(true),
    /// );
    /// ```
    #[inline]
    pub fn lock_exclusive_timeout(
        &self,
        permit: Permit,
        timeout: Duration,
        interrupt: &Interrupt,
    ) -> Result<bool, Error> {
        self.acquire(
            permit,
            Opcode::Exclusive,
            Some(timeout),
            Some(interrupt),
            true,
        )
    }

    /// Acquires exclusive ownership under `permit`, waiting until acquisition or cancellation.
    ///
    /// A cancellation pending on `interrupt` at entry fails the call before the lock state is
    /// touched. Returning [`Error::Interrupted`] consumes the cancellation flag; the success
    /// path leaves it alone.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Interrupted`] if a cancellation was delivered before acquisition, and
    /// [`Error::CountOverflow`] if the reentrant hold count would exceed [`Self::COUNT_MAX`].
    ///
    /// # Examples
    ///
    /// ```
    /// use relock::{Error, Interrupt, Lock, Permit};
    ///
    /// let lock = Lock::default();
    /// let interrupt = Interrupt::default();
    /// let permit = Permit::new(11111);
    ///
    /// assert_eq!(lock.lock_exclusive_interruptible(permit, &interrupt), Ok(()));
    /// assert_eq!(lock.unlock_exclusive(permit), Ok(()));
    ///
    /// interrupt.interrupt();
    /// assert_eq!(
    ///     lock.lock_exclusive_interruptible(permit, &interrupt),
    ///     Err(Error::Interrupted),
    /// );
    /// assert!(!interrupt.is_interrupted());
    /// ```
    #[inline]
    pub fn lock_exclusive_interruptible(
        &self,
        permit: Permit,
        interrupt: &Interrupt,
    ) -> Result<(), Error> {
        self.acquire(permit, Opcode::Exclusive, None, Some(interrupt), false)
            .map(drop)
    }

    /// Acquires exclusive ownership under `permit` within `timeout`, or reports cancellation.
    ///
    /// Returns `Ok(true)` on acquisition and `Ok(false)` on deadline expiry. Unlike
    /// [`lock_exclusive_timeout`](Self::lock_exclusive_timeout), a cancellation delivered
    /// through `interrupt` is propagated as [`Error::Interrupted`] and consumes the flag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Interrupted`] if a cancellation was delivered before acquisition, and
    /// [`Error::CountOverflow`] if the reentrant hold count would exceed [`Self::COUNT_MAX`].
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use relock::{Interrupt, Lock, Permit};
    ///
    /// let lock = Lock::default();
    /// let interrupt = Interrupt::default();
    /// let permit = Permit::new(11111);
    ///
    /// assert_eq!(lock.lock_exclusive(permit), Ok(()));
    /// assert_eq!(
    ///     lock.lock_exclusive_timeout_interruptible(permit, Duration::from_millis(1), &interrupt),
    ///     Ok(true),
    /// );
    /// ```
    #[inline]
    pub fn lock_exclusive_timeout_interruptible(
        &self,
        permit: Permit,
        timeout: Duration,
        interrupt: &Interrupt,
    ) -> Result<bool, Error> {
        self.acquire(
            permit,
            Opcode::Exclusive,
            Some(timeout),
            Some(interrupt),
            false,
        )
    }

    /// Acquires shared ownership under `permit`, waiting as long as it takes.
    ///
    /// Shared holders are anonymous: the permit is recorded nowhere, and any permit may join an
    /// existing shared state. An exclusive holder blocks shared acquisition even under its own
    /// permit; there is no silent downgrade.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CountOverflow`] if the aggregate hold count would exceed
    /// [`Self::COUNT_MAX`].
    ///
    /// # Examples
    ///
    /// ```
    /// use relock::{Lock, Permit};
    ///
    /// let lock = Lock::default();
    ///
    /// assert_eq!(lock.lock_shared(Permit::new(11111)), Ok(()));
    /// assert_eq!(lock.lock_shared(Permit::new(22222)), Ok(()));
    ///
    /// assert_eq!(lock.unlock_shared(Permit::new(22222)), Ok(()));
    /// assert_eq!(lock.unlock_shared(Permit::new(11111)), Ok(()));
    /// ```
    #[inline]
    pub fn lock_shared(&self, permit: Permit) -> Result<(), Error> {
        self.acquire(permit, Opcode::Shared, None, None, false)
            .map(drop)
    }

    /// Acquires shared ownership under `permit`, giving up once `timeout` has elapsed.
    ///
    /// Returns `Ok(true)` on acquisition and `Ok(false)` on deadline expiry. A zero `timeout`
    /// never suspends the caller. A cancellation delivered through `interrupt` is absorbed: the
    /// call returns `Ok(false)` and leaves the token set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CountOverflow`] if the aggregate hold count would exceed
    /// [`Self::COUNT_MAX`].
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use relock::{Interrupt, Lock, Permit};
    ///
    /// let lock = Lock::default();
    /// let interrupt = Interrupt::default();
    ///
    /// assert_eq!(lock.lock_exclusive(Permit::new(11111)), Ok(()));
    /// assert_eq!(
    ///     lock.lock_shared_timeout(Permit::new(22222), Duration::from_millis(1), &interrupt),
    ///     Ok(false),
    /// );
    /// ```
    #[inline]
    pub fn lock_shared_timeout(
        &self,
        permit: Permit,
        timeout: Duration,
        interrupt: &Interrupt,
    ) -> Result<bool, Error> {
        self.acquire(permit, Opcode::Shared, Some(timeout), Some(interrupt), true)
    }

    /// Acquires shared ownership under `permit`, waiting until acquisition or cancellation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Interrupted`] if a cancellation was delivered before acquisition, and
    /// [`Error::CountOverflow`] if the aggregate hold count would exceed [`Self::COUNT_MAX`].
    ///
    /// # Examples
    ///
    /// ```
    /// use relock::{Interrupt, Lock, Permit};
    ///
    /// let lock = Lock::default();
    /// let interrupt = Interrupt::default();
    ///
    /// assert_eq!(lock.lock_shared_interruptible(Permit::new(11111), &interrupt), Ok(()));
    /// assert_eq!(lock.unlock_shared(Permit::new(11111)), Ok(()));
    /// ```
    #[inline]
    pub fn lock_shared_interruptible(
        &self,
        permit: Permit,
        interrupt: &Interrupt,
    ) -> Result<(), Error> {
        self.acquire(permit, Opcode::Shared, None, Some(interrupt), false)
            .map(drop)
    }

    /// Acquires shared ownership under `permit` within `timeout`, or reports cancellation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Interrupted`] if a cancellation was delivered before acquisition, and
    /// [`Error::CountOverflow`] if the aggregate hold count would exceed [`Self::COUNT_MAX`].
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use relock::{Interrupt, Lock, Permit};
    ///
    /// let lock = Lock::default();
    /// let interrupt = Interrupt::default();
    ///
    /// assert_eq!(
    ///     lock.lock_shared_timeout_interruptible(
    ///         Permit::new(11111),
    ///         Duration::from_millis(1),
    ///         &interrupt,
    ///     ),
    ///     Ok(true),
    /// );
    /// ```
    #[inline]
    pub fn lock_shared_timeout_interruptible(
        &self,
        permit: Permit,
        timeout: Duration,
        interrupt: &Interrupt,
    ) -> Result<bool, Error> {
        self.acquire(
            permit,
            Opcode::Shared,
            Some(timeout),
            Some(interrupt),
            false,
        )
    }

    /// Attempts to acquire exclusive ownership under `permit` without ever suspending.
    ///
    /// `Ok(true)` means the lock is available *to this permit*, not that it is free: a reentrant
    /// acquisition by the current owner succeeds and increments the hold count, so a caller
    /// probing for deadlock must pair a `true` result with a release. The attempt never enqueues
    /// the caller and never wakes other waiters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CountOverflow`] if the reentrant hold count would exceed
    /// [`Self::COUNT_MAX`].
    ///
    /// # Examples
    ///
    /// ```
    /// use relock::{Lock, Permit};
    ///
    /// let lock = Lock::default();
    ///
    /// assert_eq!(lock.try_lock_exclusive(Permit::new(11111)), Ok(true));
    /// assert_eq!(lock.try_lock_exclusive(Permit::new(11111)), Ok(true));
    /// assert_eq!(lock.try_lock_exclusive(Permit::new(22222)), Ok(false));
    /// ```
    #[inline]
    pub fn try_lock_exclusive(&self, permit: Permit) -> Result<bool, Error> {
        self.try_acquire(permit, Opcode::Exclusive)
    }

    /// Attempts to acquire shared ownership under `permit` without ever suspending.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CountOverflow`] if the aggregate hold count would exceed
    /// [`Self::COUNT_MAX`].
    ///
    /// # Examples
    ///
    /// ```
    /// use relock::{Lock, Permit};
    ///
    /// let lock = Lock::default();
    ///
    /// assert_eq!(lock.try_lock_shared(Permit::new(11111)), Ok(true));
    /// assert_eq!(lock.try_lock_shared(Permit::new(22222)), Ok(true));
    /// assert_eq!(lock.try_lock_exclusive(Permit::new(11111)), Ok(false));
    /// ```
    #[inline]
    pub fn try_lock_shared(&self, permit: Permit) -> Result<bool, Error> {
        self.try_acquire(permit, Opcode::Shared)
    }

    /// Releases one exclusive hold under `permit`.
    ///
    /// When the last hold is released, the lock transitions to the free state and the waiter at
    /// the head of the queue is woken; a shared head extends the wakeup to the consecutive run
    /// of shared waiters behind it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotHeld`] if the lock is free or held in shared mode, and
    /// [`Error::NotOwner`] if exclusive ownership is held under a different permit.
    ///
    /// # Examples
    ///
    /// ```
    /// use relock::{Error, Lock, Permit};
    ///
    /// let lock = Lock::default();
    ///
    /// assert_eq!(lock.unlock_exclusive(Permit::new(11111)), Err(Error::NotHeld));
    ///
    /// assert_eq!(lock.lock_exclusive(Permit::new(11111)), Ok(()));
    /// assert_eq!(lock.unlock_exclusive(Permit::new(22222)), Err(Error::NotOwner));
    /// assert_eq!(lock.unlock_exclusive(Permit::new(11111)), Ok(()));
    /// ```
    #[inline]
    pub fn unlock_exclusive(&self, permit: Permit) -> Result<(), Error> {
        self.release(permit, Opcode::Exclusive)
    }

    /// Releases one shared hold.
    ///
    /// Shared holders are anonymous, so the permit is not checked against any holder; releasing
    /// shared ownership acquired under a different permit is indistinguishable from releasing
    /// one's own.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotHeld`] if the lock is free or held in exclusive mode.
    ///
    /// # Examples
    ///
    /// ```
    /// use relock::{Error, Lock, Permit};
    ///
    /// let lock = Lock::default();
    ///
    /// assert_eq!(lock.lock_shared(Permit::new(11111)), Ok(()));
    /// assert_eq!(lock.unlock_shared(Permit::new(22222)), Ok(()));
    /// assert_eq!(lock.unlock_shared(Permit::new(11111)), Err(Error::NotHeld));
    /// ```
    #[inline]
    pub fn unlock_shared(&self, permit: Permit) -> Result<(), Error> {
        self.release(permit, Opcode::Shared)
    }

    /// Attempts a single acquisition over the current state.
    ///
    /// Returns `Ok(false)` when the attempt must wait. The CAS loop retries only on
    /// interference; it never waits.
    fn try_acquire(&self, permit: Permit, opcode: Opcode) -> Result<bool, Error> {
        let mut state = State::from_bits(self.state.load(Relaxed));
        loop {
            match state.acquire(permit, opcode) {
                Attempt::Acquired(next) => {
                    match self.state.compare_exchange(
                        state.into_bits(),
                        next.into_bits(),
                        Acquire,
                        Relaxed,
                    ) {
                        Ok(_) => return Ok(true),
                        Err(bits) => state = State::from_bits(bits),
                    }
                }
                Attempt::Wait => return Ok(false),
                Attempt::Overflow => return Err(Error::CountOverflow),
            }
        }
    }

    /// The blocking acquisition path shared by all `lock_*` variants.
    ///
    /// `absorb` selects what a delivered cancellation turns into: `Ok(false)` with the token
    /// left set, or [`Error::Interrupted`] with the token consumed.
    fn acquire(
        &self,
        permit: Permit,
        opcode: Opcode,
        timeout: Option<Duration>,
        interrupt: Option<&Interrupt>,
        absorb: bool,
    ) -> Result<bool, Error> {
        // A cancellation pending at entry beats the acquisition attempt.
        if let Some(interrupt) = interrupt {
            if interrupt.is_interrupted() {
                if absorb {
                    return Ok(false);
                }
                interrupt.clear();
                return Err(Error::Interrupted);
            }
        }

        if self.try_acquire(permit, opcode)? {
            return Ok(true);
        }
        if timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Ok(false);
        }
        // A deadline beyond the representable range degenerates to an unbounded wait.
        let deadline = timeout.and_then(|timeout| Instant::now().checked_add(timeout));

        // Bounded spin before entering the wait queue.
        for spin in 0..DefaultConfig::spin_count() {
            DefaultConfig::backoff(spin);
            if self.try_acquire(permit, opcode)? {
                return Ok(true);
            }
            if interrupt.is_some_and(Interrupt::is_interrupted) {
                break;
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Ok(false);
            }
        }

        let entry = Arc::new(Entry::new(opcode));
        self.waiters.push(entry.clone());
        if let Some(interrupt) = interrupt {
            interrupt.register(&entry);
        }
        let result = self.wait_loop(permit, opcode, deadline, interrupt, absorb, &entry);
        if let Some(interrupt) = interrupt {
            interrupt.unregister();
        }
        self.waiters.remove(&entry);
        if !matches!(result, Ok(true)) {
            // A wakeup consumed by the abandoned wait must not strand the new queue head.
            self.waiters.signal_head();
        }
        result
    }

    /// Parks on `entry` until the acquisition succeeds, the deadline passes, or a cancellation
    /// is delivered. The caller owns enqueueing and cleanup.
    fn wait_loop(
        &self,
        permit: Permit,
        opcode: Opcode,
        deadline: Option<Instant>,
        interrupt: Option<&Interrupt>,
        absorb: bool,
        entry: &Entry,
    ) -> Result<bool, Error> {
        loop {
            // Rechecking after the enqueue closes the doorway race: a release published between
            // the failed attempt and the push has already signalled the queue, or is about to
            // signal this entry.
            if self.try_acquire(permit, opcode)? {
                return Ok(true);
            }
            if let Some(interrupt) = interrupt {
                if interrupt.is_interrupted() {
                    if absorb {
                        return Ok(false);
                    }
                    interrupt.clear();
                    return Err(Error::Interrupted);
                }
            }
            match deadline {
                Some(deadline) => {
                    if !entry.park_until(deadline) {
                        return Ok(false);
                    }
                }
                None => entry.park(),
            }
        }
    }

    /// The release path shared by both `unlock_*` variants.
    fn release(&self, permit: Permit, opcode: Opcode) -> Result<(), Error> {
        let mut state = State::from_bits(self.state.load(Relaxed));
        loop {
            let next = state.release(permit, opcode)?;
            match self.state.compare_exchange(
                state.into_bits(),
                next.into_bits(),
                Release,
                Relaxed,
            ) {
                Ok(_) => {
                    if next.is_free() {
                        // Waiters are signalled only after the CAS publishes the free state, so
                        // a woken thread always observes it.
                        self.waiters.signal_head();
                    }
                    return Ok(());
                }
                Err(bits) => state = State::from_bits(bits),
            }
        }
    }
}

impl fmt::Debug for Lock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = State::from_bits(self.state.load(Relaxed));
        f.debug_struct("Lock")
            .field("mode", &state.mode())
            .field("count", &state.count())
            .field("permit", &state.permit())
            .field("waiters", &self.waiters)
            .finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::InvalidPermit => "permit is outside the 32-bit identifier range",
            Self::NotHeld => "the lock is not held in the released mode",
            Self::NotOwner => "exclusive ownership is held under a different permit",
            Self::CountOverflow => "maximum hold count exceeded",
            Self::Interrupted => "interrupted while waiting for the lock",
        };
        f.write_str(message)
    }
}

impl std::error::Error for Error {}
