use std::fmt::{self, Display, Formatter};
use std::ops::{Add, AddAssign, Mul};

/// Byte offset into a raw storage region.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ByteOffset(pub usize);

impl Display for ByteOffset {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for ByteOffset {
    fn from(offset: usize) -> Self {
        ByteOffset(offset)
    }
}

impl From<ByteOffset> for usize {
    fn from(offset: ByteOffset) -> Self {
        offset.0
    }
}

impl ByteOffset {
    pub const ZERO: Self = ByteOffset(0);

    pub fn new(offset: usize) -> Self {
        ByteOffset(offset)
    }

    pub fn checked_add(self, other: impl Into<usize>) -> Option<Self> {
        self.0.checked_add(other.into()).map(ByteOffset)
    }

    pub fn checked_mul(self, other: usize) -> Option<Self> {
        self.0.checked_mul(other).map(ByteOffset)
    }

    /// Rounds up to the next multiple of `align`, which must be a power of two.
    pub fn align_up(self, align: usize) -> Self {
        debug_assert!(align.is_power_of_two());
        ByteOffset((self.0 + align - 1) & !(align - 1))
    }

    pub fn as_usize(self) -> usize {
        self.0
    }
}

impl Add<usize> for ByteOffset {
    type Output = Self;
    fn add(self, rhs: usize) -> Self {
        ByteOffset(self.0 + rhs)
    }
}

impl Add<ByteOffset> for ByteOffset {
    type Output = Self;
    fn add(self, rhs: ByteOffset) -> Self {
        ByteOffset(self.0 + rhs.0)
    }
}

impl Mul<usize> for ByteOffset {
    type Output = Self;
    fn mul(self, rhs: usize) -> Self {
        ByteOffset(self.0 * rhs)
    }
}

impl AddAssign<usize> for ByteOffset {
    fn add_assign(&mut self, rhs: usize) {
        self.0 += rhs;
    }
}

/// Index of a reference slot inside an object's reference table.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RefSlotIndex(pub usize);

impl Display for RefSlotIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<usize> for RefSlotIndex {
    fn from(index: usize) -> Self {
        RefSlotIndex(index)
    }
}

impl RefSlotIndex {
    pub fn as_usize(self) -> usize {
        self.0
    }
}
