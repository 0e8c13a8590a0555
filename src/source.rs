//! Source buffer and position tracking (spec §3.1, §4.1).
//!
//! A translation unit can span more than one physical file (via `#include`) and more
//! than one logical origin within a single physical file (via `#line`). We keep both
//! notions separate: an [`Origin`] is a cheap handle into an arena of origin records, and
//! a [`SourcePosition`] pairs an origin with a `(row, column)` inside it.

use smol_str::SmolStr;
use std::fmt;

/// A handle to a filename plus the `#line`-adjusted offset applied to rows reported
/// under it. Never an owning pointer — always looked up in `SourceMap`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Origin(pub(crate) u32);

/// One entry in the translation unit's origin table: either the physical file originally
/// opened, or a re-origin introduced by `#line N "file"`.
#[derive(Clone, Debug)]
pub struct OriginRecord {
    /// Name as it should appear in diagnostics (not necessarily a real filesystem path:
    /// `#line` can rename it arbitrarily).
    pub filename: SmolStr,
    /// Row in the physical character stream at which this origin starts.
    pub physical_row_start: u32,
    /// Row number reported for `physical_row_start` (normally 1, but `#line N` resets it).
    pub reported_row_start: u32,
    /// The full text of this origin's own physical file, when this record *is* a
    /// physical file (the main translation unit or an `#include`d file). `None` for a
    /// `#line`-introduced pseudo-origin, which renames/renumbers an already-open
    /// physical stream rather than opening a new one — see `text_origin`.
    pub text: Option<String>,
    /// For a `#line` pseudo-origin, the origin whose `text` actually backs the physical
    /// rows reported under this origin (spec §3.9: "Program owns the preprocessed
    /// source text so diagnostics can fetch line markers after parsing").
    pub text_origin: Option<Origin>,
}

/// Owns every origin introduced while scanning one translation unit (the main file plus
/// every `#include`d file, plus every `#line` re-origin within any of them).
#[derive(Default)]
pub struct SourceMap {
    origins: Vec<OriginRecord>,
}

impl SourceMap {
    pub fn new() -> SourceMap {
        SourceMap { origins: Vec::new() }
    }

    pub fn add_origin(&mut self, filename: impl Into<SmolStr>, physical_row_start: u32, reported_row_start: u32) -> Origin {
        self.origins.push(OriginRecord {
            filename: filename.into(),
            physical_row_start,
            reported_row_start,
            text: None,
            text_origin: None,
        });
        Origin((self.origins.len() - 1) as u32)
    }

    pub fn origin(&self, id: Origin) -> &OriginRecord {
        &self.origins[id.0 as usize]
    }

    /// Records the full text of the physical file backing `id` (called once, right
    /// after `add_origin`, for the main translation unit and for every `#include`).
    pub fn set_text(&mut self, id: Origin, text: impl Into<String>) {
        self.origins[id.0 as usize].text = Some(text.into());
    }

    /// Records that `id` is a `#line` pseudo-origin whose rows are physically backed by
    /// the already-open stream of `backing`.
    pub fn set_text_origin(&mut self, id: Origin, backing: Origin) {
        self.origins[id.0 as usize].text_origin = Some(backing);
    }

    /// Computes the row that should be reported for a physical row under `id`, taking
    /// any `#line` adjustment recorded for that origin into account.
    pub fn reported_row(&self, id: Origin, physical_row: u32) -> u32 {
        let rec = self.origin(id);
        physical_row.saturating_sub(rec.physical_row_start) + rec.reported_row_start
    }

    /// Resolves `id` to the origin that actually owns source text (walking `text_origin`
    /// links for `#line` pseudo-origins) and returns that origin alongside its text.
    /// `None` if no physical text was ever recorded (e.g. a report built against a
    /// synthetic/predefined-macro position).
    pub fn resolve_text(&self, id: Origin) -> Option<(Origin, &str)> {
        let mut current = id;
        loop {
            let rec = self.origin(current);
            if let Some(text) = &rec.text {
                return Some((current, text.as_str()));
            }
            current = rec.text_origin?;
        }
    }
}

/// `(origin, row, column)`. Rows and columns are 1-based, matching the diagnostic wire
/// format in spec §6.8.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct SourcePosition {
    pub origin: Origin,
    pub row: u32,
    pub column: u32,
}

impl SourcePosition {
    pub fn new(origin: Origin, row: u32, column: u32) -> SourcePosition {
        SourcePosition { origin, row, column }
    }
}

impl PartialOrd for SourcePosition {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        if self.origin != other.origin {
            return None;
        }
        Some((self.row, self.column).cmp(&(other.row, other.column)))
    }
}

/// `(position, length, column_offset)` — enough to underline a sub-range of a line with
/// a caret marker in a diagnostic (spec §3.1).
#[derive(Copy, Clone, Debug)]
pub struct SourceArea {
    pub position: SourcePosition,
    pub length: u32,
    pub column_offset: u32,
}

impl SourceArea {
    pub fn new(position: SourcePosition, length: u32) -> SourceArea {
        SourceArea {
            position,
            length,
            column_offset: 0,
        }
    }

    pub fn point(position: SourcePosition) -> SourceArea {
        SourceArea::new(position, 1)
    }
}

/// A reconstructed source line plus a caret marker string ready to print directly below
/// it, as returned by [`SourceBuffer::fetch_line_marker`].
#[derive(Debug)]
pub struct LineMarker {
    pub line_text: String,
    pub caret_marker: String,
}

/// Character stream with row/column tracking, re-origin support, and a line cache so
/// diagnostics can re-fetch already-consumed lines (spec §4.1).
pub struct SourceBuffer {
    chars: Vec<char>,
    pos: usize,
    row: u32,
    column: u32,
    origin: Origin,
    /// Absolute row (not reported row) -> line text, populated lazily as rows are
    /// consumed so `fetch_line_marker` works without re-reading the whole stream.
    line_cache: Vec<String>,
    line_start: usize,
}

impl SourceBuffer {
    pub fn new(text: &str, origin: Origin) -> SourceBuffer {
        SourceBuffer {
            chars: text.chars().collect(),
            pos: 0,
            row: 1,
            column: 1,
            origin,
            line_cache: Vec::new(),
            line_start: 0,
        }
    }

    pub fn position(&self) -> SourcePosition {
        SourcePosition::new(self.origin, self.row, self.column)
    }

    pub fn re_origin(&mut self, origin: Origin) {
        self.origin = origin;
    }

    /// Advances one character. Returns `'\0'` at end of stream; idempotent past EOF.
    pub fn next(&mut self) -> char {
        if self.pos >= self.chars.len() {
            return '\0';
        }
        let c = self.chars[self.pos];
        self.pos += 1;
        if c == '\n' {
            let line: String = self.chars[self.line_start..self.pos.saturating_sub(1)].iter().collect();
            self.line_cache.push(line);
            self.line_start = self.pos;
            self.row += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        c
    }

    pub fn peek(&self) -> char {
        self.chars.get(self.pos).copied().unwrap_or('\0')
    }

    pub fn peek_at(&self, offset: usize) -> char {
        self.chars.get(self.pos + offset).copied().unwrap_or('\0')
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.chars.len()
    }

    /// Reconstructs the physical line containing `area.position` plus a caret line
    /// underlining `area.length` columns starting at `area.position.column +
    /// area.column_offset`.
    pub fn fetch_line_marker(&mut self, area: &SourceArea) -> LineMarker {
        let row = area.position.row as usize;
        // Flush any buffered-but-not-yet-cached trailing line so row lookups at EOF work.
        while self.line_cache.len() < row && !self.is_eof() {
            self.next();
        }
        let line_text = self
            .line_cache
            .get(row - 1)
            .cloned()
            .unwrap_or_else(|| self.chars[self.line_start..].iter().collect());

        let start_col = (area.position.column + area.column_offset).saturating_sub(1) as usize;
        let len = area.length.max(1) as usize;
        let mut caret_marker = String::new();
        for _ in 0..start_col {
            caret_marker.push(' ');
        }
        caret_marker.push('^');
        for _ in 1..len {
            caret_marker.push('~');
        }

        LineMarker { line_text, caret_marker }
    }
}

impl fmt::Debug for SourceBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceBuffer")
            .field("row", &self.row)
            .field("column", &self.column)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_row_column() {
        let mut map = SourceMap::new();
        let origin = map.add_origin("test.hlsl", 1, 1);
        let mut buf = SourceBuffer::new("ab\ncd", origin);
        assert_eq!(buf.next(), 'a');
        assert_eq!(buf.position().column, 2);
        buf.next();
        assert_eq!(buf.next(), '\n');
        assert_eq!(buf.position().row, 2);
        assert_eq!(buf.position().column, 1);
    }

    #[test]
    fn eof_is_idempotent() {
        let mut map = SourceMap::new();
        let origin = map.add_origin("t", 1, 1);
        let mut buf = SourceBuffer::new("a", origin);
        buf.next();
        assert_eq!(buf.next(), '\0');
        assert_eq!(buf.next(), '\0');
    }

    #[test]
    fn fetch_line_marker_underlines_column() {
        let mut map = SourceMap::new();
        let origin = map.add_origin("t", 1, 1);
        let mut buf = SourceBuffer::new("int postion = 1;\n", origin);
        for _ in 0..4 {
            buf.next();
        }
        let area = SourceArea::new(SourcePosition::new(origin, 1, 5), 7);
        let marker = buf.fetch_line_marker(&area);
        assert_eq!(marker.line_text, "int postion = 1;");
        assert!(marker.caret_marker.starts_with("    ^"));
    }
}
