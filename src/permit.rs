//! [`Permit`] identifies a logical owner of a [`Lock`](crate::Lock).

#![deny(unsafe_code)]

use std::fmt;

use crate::lock::Error;

/// [`Permit`] identifies a logical owner of a [`Lock`](crate::Lock) for reentrancy purposes.
///
/// A [`Permit`] is opaque to the lock: equality is the only predicate ever applied to it. Two
/// threads presenting the same [`Permit`] are treated as the same holder and reenter the lock
/// freely; ownership travels with the permit, not with the thread.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Permit(i32);

impl Permit {
    /// Creates a new [`Permit`] from a 32-bit identifier.
    ///
    /// Every `i32` value is a valid identifier.
    ///
    /// # Examples
    ///
    /// ```
    /// use relock::Permit;
    ///
    /// let permit = Permit::new(11111);
    /// assert_eq!(permit.get(), 11111);
    /// ```
    #[inline]
    #[must_use]
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    /// Returns the identifier value.
    ///
    /// # Examples
    ///
    /// ```
    /// use relock::Permit;
    ///
    /// assert_eq!(Permit::new(-7).get(), -7);
    /// ```
    #[inline]
    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }

    /// Reconstructs a [`Permit`] from its state word bit pattern.
    pub(crate) const fn from_bits(bits: u32) -> Self {
        Self(bits as i32)
    }

    /// Returns the bit pattern stored in the state word.
    pub(crate) const fn to_bits(self) -> u32 {
        self.0 as u32
    }
}

impl From<i32> for Permit {
    #[inline]
    fn from(id: i32) -> Self {
        Self(id)
    }
}

impl TryFrom<i64> for Permit {
    type Error = Error;

    /// Converts a wider identifier into a [`Permit`], rejecting values outside the 32-bit range
    /// before any lock state is touched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPermit`] if `id` does not fit in an `i32`.
    ///
    /// # Examples
    ///
    /// ```
    /// use relock::{Error, Permit};
    ///
    /// assert_eq!(Permit::try_from(11111_i64), Ok(Permit::new(11111)));
    /// assert_eq!(Permit::try_from(i64::MAX), Err(Error::InvalidPermit));
    /// ```
    #[inline]
    fn try_from(id: i64) -> Result<Self, Self::Error> {
        i32::try_from(id).map(Self).map_err(|_| Error::InvalidPermit)
    }
}

impl fmt::Display for Permit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
