//! Memory address type.

use std::fmt;
use std::ops::{Add, Sub};

/// Strongly typed code address
///
/// This wrapper around `u64` keeps captured instruction pointers, module load
/// bases and module-relative offsets from being mixed up with sizes, counts or
/// other plain integers.
///
/// ## Example
///
/// ```rust
/// use stackdump_core::types::Address;
///
/// let addr = Address::new(0x1000);
/// let next_addr = addr + 0x100; // Add offset
/// assert_eq!(next_addr.value(), 0x1100);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(u64);

impl Address
{
    /// The null address (0x0)
    pub const ZERO: Self = Address(0);

    /// Create a new address from a `u64` value
    ///
    /// This is equivalent to `Address::from(value)` but can be used in const contexts.
    pub const fn new(value: u64) -> Self
    {
        Address(value)
    }

    /// Get the raw `u64` value of this address
    pub const fn value(self) -> u64
    {
        self.0
    }

    /// Subtract a base from this address, checking for underflow
    ///
    /// Returns `None` when the address lies below `base`, which means the base
    /// does not belong to the module that contains this address.
    ///
    /// ## Example
    ///
    /// ```rust
    /// use stackdump_core::types::Address;
    ///
    /// let ip = Address::new(0x5555_0000_1234);
    /// assert_eq!(ip.offset_from(Address::new(0x5555_0000_0000)), Some(0x1234));
    /// assert_eq!(ip.offset_from(Address::new(0x6000_0000_0000)), None);
    /// ```
    pub fn offset_from(self, base: Address) -> Option<u64>
    {
        self.0.checked_sub(base.0)
    }
}

impl From<u64> for Address
{
    fn from(value: u64) -> Self
    {
        Address(value)
    }
}

impl From<Address> for u64
{
    fn from(address: Address) -> Self
    {
        address.0
    }
}

impl fmt::Display for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "0x{:x}", self.0)
    }
}

impl fmt::LowerHex for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl Add<u64> for Address
{
    type Output = Address;

    fn add(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_add(rhs))
    }
}

impl Sub<u64> for Address
{
    type Output = Address;

    fn sub(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_sub(rhs))
    }
}
