use std::fmt;
use std::sync::Arc;

use serde::Serialize;

/// A source position: file name plus 1-based line and column.
///
/// Locations are produced by the parser and quoted verbatim in diagnostics.
/// A line of `0` marks a synthesized node that has not been placed yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Location {
    pub file: Arc<str>,
    pub line: u32,
    pub column: u32,
}

impl Location {
    /// Create a location in `file` at the given 1-based line and column.
    pub fn new(file: impl Into<Arc<str>>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }

    /// A placeholder location for nodes built without position information.
    pub fn unknown() -> Self {
        Self {
            file: Arc::from(""),
            line: 0,
            column: 0,
        }
    }

    /// Whether this location points at real source text.
    pub fn is_known(&self) -> bool {
        self.line > 0
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Pre-computed index of line start positions.
///
/// Constructed once per source file, then used to convert between byte
/// offsets and human-readable (line, column) pairs.
#[derive(Debug)]
pub struct LineIndex {
    /// Byte offset of the start of each line. The first entry is always 0.
    line_starts: Vec<u32>,
    len: u32,
}

impl LineIndex {
    /// Build a line index by scanning the source text for newline characters.
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0u32];
        for (i, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push((i + 1) as u32);
            }
        }
        Self {
            line_starts,
            len: source.len() as u32,
        }
    }

    /// Convert a byte offset to a 1-based (line, column) pair.
    ///
    /// Column is measured in bytes from the start of the line (1-based).
    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        // partition_point returns the index of the first line_start > offset,
        // so the line index is one less than that.
        let line_idx = self.line_starts.partition_point(|&start| start <= offset);
        let line_idx = line_idx.saturating_sub(1);
        let line = (line_idx as u32) + 1;
        let col = offset - self.line_starts[line_idx] + 1;
        (line, col)
    }

    /// Convert a 1-based (line, column) pair back to a byte offset.
    ///
    /// Returns `None` when the line does not exist. Columns running past
    /// the end of the line are clamped to the end of the source.
    pub fn offset(&self, line: u32, column: u32) -> Option<u32> {
        if line == 0 {
            return None;
        }
        let start = *self.line_starts.get(line as usize - 1)?;
        Some((start + column.saturating_sub(1)).min(self.len))
    }

    /// Return the number of lines in the source.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}
