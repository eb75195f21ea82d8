//! Line/column bookkeeping over source text.
//!
//! A [`LineIndex`] is built once per source text and converts between byte
//! offsets ([`TextSize`]) and one-indexed line/column locations.

use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;

use dunlin_text_size::{TextRange, TextSize};

/// A one-indexed line or column number.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct OneIndexed(NonZeroU32);

impl OneIndexed {
    pub const MIN: Self = Self(NonZeroU32::MIN);

    pub const fn new(value: u32) -> Option<Self> {
        match NonZeroU32::new(value) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }

    /// Builds a one-indexed value from a zero-indexed one.
    pub const fn from_zero_indexed(value: u32) -> Self {
        Self(NonZeroU32::MIN.saturating_add(value))
    }

    pub const fn get(self) -> u32 {
        self.0.get()
    }

    pub const fn to_zero_indexed(self) -> u32 {
        self.0.get() - 1
    }

    pub const fn saturating_add(self, rhs: u32) -> Self {
        Self(self.0.saturating_add(rhs))
    }
}

impl fmt::Display for OneIndexed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for OneIndexed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A one-indexed line/column pair.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct SourceLocation {
    pub row: OneIndexed,
    pub column: OneIndexed,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row, self.column)
    }
}

/// Index of line-start offsets for a source text.
///
/// Cheap to clone; the offsets are shared.
#[derive(Clone, Eq, PartialEq)]
pub struct LineIndex {
    line_starts: Arc<[TextSize]>,
}

impl LineIndex {
    pub fn from_source_text(text: &str) -> Self {
        let mut line_starts = Vec::with_capacity(text.len() / 40 + 1);
        line_starts.push(TextSize::new(0));

        for (offset, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(TextSize::new(offset as u32 + 1));
            }
        }

        Self {
            line_starts: line_starts.into(),
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// The one-indexed line containing `offset`.
    pub fn line_index(&self, offset: TextSize) -> OneIndexed {
        match self.line_starts.binary_search(&offset) {
            Ok(line) => OneIndexed::from_zero_indexed(line as u32),
            Err(next_line) => OneIndexed::from_zero_indexed(next_line as u32 - 1),
        }
    }

    /// The start offset of the one-indexed `line`.
    pub fn line_start(&self, line: OneIndexed, text: &str) -> TextSize {
        self.line_starts
            .get(line.to_zero_indexed() as usize)
            .copied()
            .unwrap_or_else(|| TextSize::of(text))
    }

    /// The full range of the one-indexed `line`, including its terminator.
    pub fn line_range(&self, line: OneIndexed, text: &str) -> TextRange {
        let start = self.line_start(line, text);
        let end = self.line_start(line.saturating_add(1), text);
        TextRange::new(start, end)
    }

    /// Converts `offset` into a one-indexed row and column.
    ///
    /// The column is a character (not byte) offset into the line.
    pub fn source_location(&self, offset: TextSize, text: &str) -> SourceLocation {
        let row = self.line_index(offset);
        let line_start = self.line_start(row, text);
        let prefix = &text[line_start.to_usize()..offset.to_usize()];
        let column = prefix.chars().count() as u32;

        SourceLocation {
            row,
            column: OneIndexed::from_zero_indexed(column),
        }
    }
}

impl fmt::Debug for LineIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.line_starts.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text() {
        let index = LineIndex::from_source_text("");
        assert_eq!(index.line_count(), 1);
        assert_eq!(index.line_index(TextSize::new(0)), OneIndexed::MIN);
    }

    #[test]
    fn line_lookup() {
        let text = "a = 1\nbb = 2\n\nccc = 3";
        let index = LineIndex::from_source_text(text);
        assert_eq!(index.line_count(), 4);
        assert_eq!(index.line_index(TextSize::new(0)).get(), 1);
        assert_eq!(index.line_index(TextSize::new(5)).get(), 1);
        assert_eq!(index.line_index(TextSize::new(6)).get(), 2);
        assert_eq!(index.line_index(TextSize::new(13)).get(), 3);
        assert_eq!(index.line_index(TextSize::new(14)).get(), 4);
    }

    #[test]
    fn source_location_counts_chars() {
        let text = "x = '\u{e9}\u{e9}'\ny = 2";
        let index = LineIndex::from_source_text(text);
        // Offset of `y` on line 2.
        let offset = TextSize::of("x = '\u{e9}\u{e9}'\n");
        let location = index.source_location(offset, text);
        assert_eq!(location.row.get(), 2);
        assert_eq!(location.column.get(), 1);
    }

    #[test]
    fn line_range_includes_terminator() {
        let text = "first\nsecond\n";
        let index = LineIndex::from_source_text(text);
        let range = index.line_range(OneIndexed::MIN, text);
        assert_eq!(&text[std::ops::Range::<usize>::from(range)], "first\n");
    }
}
