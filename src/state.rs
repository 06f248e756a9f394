//! Packed lock state and its pure transition rules.

#![deny(unsafe_code)]

use crate::lock::Error;
use crate::opcode::Opcode;
use crate::permit::Permit;

/// A snapshot of the packed lock state.
///
/// The three fields share one 64-bit word, `mode : 16 | count : 16 | permit : 32`, so that every
/// externally observable transition is a single compare-and-swap. The free state is the all-zero
/// word: `count == 0`, a `Free` mode tag, and a zeroed permit field always coincide.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct State(u64);

/// Current acquisition mode.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Mode {
    /// No holder.
    Free,
    /// A single reentrant holder identified by its permit.
    Exclusive,
    /// Any number of anonymous holders.
    Shared,
}

/// Outcome of an acquisition attempt against a state snapshot.
///
/// [`State::acquire`] is a pure function; installing the returned state is the caller's job.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Attempt {
    /// The attempt succeeds immediately by installing the new state.
    Acquired(State),
    /// The attempt must wait for a compatible transition.
    Wait,
    /// The hold count ceiling would be exceeded.
    Overflow,
}

impl State {
    /// Maximum aggregate hold count.
    pub(crate) const COUNT_MAX: u16 = u16::MAX;

    const MODE_SHIFT: u32 = 48;
    const COUNT_SHIFT: u32 = 32;
    const PERMIT_MASK: u64 = 0xFFFF_FFFF;
    const COUNT_UNIT: u64 = 1_u64 << Self::COUNT_SHIFT;
    const MODE_EXCLUSIVE: u64 = 1;
    const MODE_SHARED: u64 = 2;

    /// The free state.
    pub(crate) const fn free() -> Self {
        Self(0)
    }

    pub(crate) const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub(crate) const fn into_bits(self) -> u64 {
        self.0
    }

    fn exclusive(permit: Permit, count: u16) -> Self {
        Self(
            (Self::MODE_EXCLUSIVE << Self::MODE_SHIFT)
                | (u64::from(count) << Self::COUNT_SHIFT)
                | u64::from(permit.to_bits()),
        )
    }

    fn shared(count: u16) -> Self {
        Self((Self::MODE_SHARED << Self::MODE_SHIFT) | (u64::from(count) << Self::COUNT_SHIFT))
    }

    pub(crate) const fn mode(self) -> Mode {
        match self.0 >> Self::MODE_SHIFT {
            0 => Mode::Free,
            Self::MODE_EXCLUSIVE => Mode::Exclusive,
            _ => Mode::Shared,
        }
    }

    pub(crate) const fn count(self) -> u16 {
        ((self.0 >> Self::COUNT_SHIFT) & 0xFFFF) as u16
    }

    /// The owning permit. Meaningful in exclusive mode only; zeroed otherwise.
    pub(crate) const fn permit(self) -> Permit {
        Permit::from_bits((self.0 & Self::PERMIT_MASK) as u32)
    }

    pub(crate) const fn is_free(self) -> bool {
        self.0 == 0
    }

    /// Decides an acquisition attempt by `permit` in the mode selected by `opcode`.
    ///
    /// A shared request joins any shared state without identifying itself; an exclusive request
    /// reenters only under the owning permit. Every other configuration waits. Mode never changes
    /// without passing through the free state.
    pub(crate) fn acquire(self, permit: Permit, opcode: Opcode) -> Attempt {
        match (self.mode(), opcode) {
            (Mode::Free, Opcode::Exclusive) => Attempt::Acquired(Self::exclusive(permit, 1)),
            (Mode::Free, Opcode::Shared) => Attempt::Acquired(Self::shared(1)),
            (Mode::Exclusive, Opcode::Exclusive) if self.permit() == permit => self.reenter(),
            (Mode::Shared, Opcode::Shared) => self.reenter(),
            _ => Attempt::Wait,
        }
    }

    fn reenter(self) -> Attempt {
        if self.count() == Self::COUNT_MAX {
            Attempt::Overflow
        } else {
            Attempt::Acquired(Self(self.0 + Self::COUNT_UNIT))
        }
    }

    /// Decides a release by `permit` of the mode selected by `opcode`.
    ///
    /// The permit is checked against the holder in exclusive mode only; shared holders are
    /// anonymous. Releasing the last hold yields the free state with the permit field cleared.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotHeld`] if the lock is free or held in the other mode, and
    /// [`Error::NotOwner`] if exclusive mode is held under a different permit.
    pub(crate) fn release(self, permit: Permit, opcode: Opcode) -> Result<Self, Error> {
        match (self.mode(), opcode) {
            (Mode::Exclusive, Opcode::Exclusive) => {
                if self.permit() == permit {
                    Ok(self.departed())
                } else {
                    Err(Error::NotOwner)
                }
            }
            (Mode::Shared, Opcode::Shared) => Ok(self.departed()),
            _ => Err(Error::NotHeld),
        }
    }

    fn departed(self) -> Self {
        if self.count() == 1 {
            Self::free()
        } else {
            Self(self.0 - Self::COUNT_UNIT)
        }
    }
}
