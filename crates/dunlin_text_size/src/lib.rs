//! Newtypes for byte offsets and byte ranges into source text.

use std::fmt;
use std::ops::{Add, AddAssign, Range, Sub, SubAssign};

/// An offset into source text, measured in bytes.
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TextSize(u32);

impl TextSize {
    #[inline]
    pub const fn new(offset: u32) -> Self {
        Self(offset)
    }

    #[inline]
    pub const fn to_u32(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn to_usize(self) -> usize {
        self.0 as usize
    }

    /// The size of `text` in bytes.
    ///
    /// # Panics
    /// If `text` is longer than `u32::MAX` bytes.
    pub fn of(text: &str) -> Self {
        Self(u32::try_from(text.len()).expect("source text larger than 4GiB"))
    }
}

impl fmt::Debug for TextSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TextSize {
    fn from(offset: u32) -> Self {
        Self(offset)
    }
}

impl From<TextSize> for u32 {
    fn from(size: TextSize) -> Self {
        size.0
    }
}

impl From<TextSize> for usize {
    fn from(size: TextSize) -> Self {
        size.to_usize()
    }
}

impl Add for TextSize {
    type Output = TextSize;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for TextSize {
    type Output = TextSize;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl AddAssign for TextSize {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for TextSize {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

/// A half-open range of byte offsets into source text.
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TextRange {
    start: TextSize,
    end: TextSize,
}

impl TextRange {
    /// # Panics
    /// If `start > end`.
    #[inline]
    pub fn new(start: TextSize, end: TextSize) -> Self {
        assert!(start <= end);
        Self { start, end }
    }

    #[inline]
    pub const fn empty(offset: TextSize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    pub fn at(start: TextSize, len: TextSize) -> Self {
        Self::new(start, start + len)
    }

    #[inline]
    pub const fn start(self) -> TextSize {
        self.start
    }

    #[inline]
    pub const fn end(self) -> TextSize {
        self.end
    }

    #[inline]
    pub fn len(self) -> TextSize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.start == self.end
    }

    pub fn contains(self, offset: TextSize) -> bool {
        self.start <= offset && offset < self.end
    }

    pub fn contains_inclusive(self, offset: TextSize) -> bool {
        self.start <= offset && offset <= self.end
    }

    pub fn contains_range(self, other: TextRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn intersect(self, other: TextRange) -> Option<TextRange> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start <= end).then(|| TextRange::new(start, end))
    }

    pub fn cover(self, other: TextRange) -> TextRange {
        TextRange::new(self.start.min(other.start), self.end.max(other.end))
    }
}

impl fmt::Debug for TextRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}..{:?}", self.start, self.end)
    }
}

impl From<TextRange> for Range<usize> {
    fn from(range: TextRange) -> Self {
        range.start().to_usize()..range.end().to_usize()
    }
}

/// A value with a [`TextRange`] into its defining source file.
pub trait Ranged {
    fn range(&self) -> TextRange;

    fn start(&self) -> TextSize {
        self.range().start()
    }

    fn end(&self) -> TextSize {
        self.range().end()
    }
}

impl Ranged for TextRange {
    fn range(&self) -> TextRange {
        *self
    }
}

impl<T> Ranged for &T
where
    T: Ranged,
{
    fn range(&self) -> TextRange {
        T::range(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_contains() {
        let range = TextRange::new(TextSize::new(2), TextSize::new(5));
        assert!(range.contains(TextSize::new(2)));
        assert!(range.contains(TextSize::new(4)));
        assert!(!range.contains(TextSize::new(5)));
        assert!(range.contains_inclusive(TextSize::new(5)));
    }

    #[test]
    fn range_cover_and_intersect() {
        let a = TextRange::new(TextSize::new(0), TextSize::new(4));
        let b = TextRange::new(TextSize::new(2), TextSize::new(8));
        assert_eq!(a.cover(b), TextRange::new(TextSize::new(0), TextSize::new(8)));
        assert_eq!(
            a.intersect(b),
            Some(TextRange::new(TextSize::new(2), TextSize::new(4)))
        );
        let c = TextRange::new(TextSize::new(9), TextSize::new(10));
        assert_eq!(a.intersect(c), None);
    }
}
