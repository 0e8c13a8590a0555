//! Reporting (spec §4.7, §6.7, §6.8). A [`Report`] is built incrementally and handed to
//! a [`Log`]; a [`ReportHandler`] sits in front of the `Log` to deduplicate cascades and
//! maintain the context stack, matching `ashley::glsl`'s `DiagnosticSink`/`DiagnosticBuilder`
//! split (see DESIGN.md).

use crate::source::{SourceArea, SourceBuffer, SourceMap};
use std::collections::HashSet;
use std::fmt;

/// spec §6.8 `phase`.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Phase {
    Lexical,
    Syntax,
    Context,
    Codegen,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Lexical => "lexical",
            Phase::Syntax => "syntax",
            Phase::Context => "context",
            Phase::Codegen => "codegen",
        };
        write!(f, "{s}")
    }
}

/// spec §4.7 `type`.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ReportType {
    Info,
    Warning,
    Error,
}

/// Stable diagnostic codes, supplementing the distilled spec per SPEC_FULL.md §E from the
/// original's `HLSLErr.h` catalogue. Intentionally only the subset this crate's passes can
/// actually emit; the full original catalogue numbers in the hundreds and is data, not
/// logic.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum DiagnosticCode {
    UnterminatedComment,
    UnterminatedString,
    InvalidNumericLiteral,
    ReservedKeyword,
    UnsupportedKeyword,
    IllegalCharacter,
    UnbalancedConditional,
    MacroArgumentMismatch,
    MacroRedefinition,
    IncludeFailure,
    InvalidDirective,
    DivisionByZeroInDirective,
    UnexpectedToken,
    MissingClosingBrace,
    IllegalMultipleInheritance,
    IllegalRecursiveInheritance,
    IllegalPackOffset,
    UndeclaredIdentifier,
    AmbiguousCall,
    IllegalCast,
    VectorWidening,
    DuplicateDeclaration,
    VoidReturnWithExpression,
    MissingReturn,
    IllegalConstantExpression,
    NonScalarCondition,
    VectorTruncation,
    ImplicitConversion,
    UnusedVariable,
    DeadCode,
    EmptyStatementBody,
    IgnoredRegister,
    RedundantPackOffset,
    TechniqueIgnored,
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A source-position hint with similar-name suggestion text, attached to some reports
/// (spec §8 scenario 5).
#[derive(Clone, Debug)]
pub struct Hint {
    pub message: String,
}

#[derive(Clone, Debug)]
pub struct Report {
    pub ty: ReportType,
    pub phase: Phase,
    pub code: Option<DiagnosticCode>,
    pub message: String,
    pub area: Option<SourceArea>,
    pub context_stack: Vec<String>,
    pub hints: Vec<Hint>,
}

impl Report {
    pub fn new(ty: ReportType, phase: Phase, message: impl Into<String>) -> Report {
        Report {
            ty,
            phase,
            code: None,
            message: message.into(),
            area: None,
            context_stack: Vec::new(),
            hints: Vec::new(),
        }
    }

    pub fn with_code(mut self, code: DiagnosticCode) -> Report {
        self.code = Some(code);
        self
    }

    pub fn with_area(mut self, area: SourceArea) -> Report {
        self.area = Some(area);
        self
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Report {
        self.hints.push(Hint { message: message.into() });
        self
    }

    /// Dedup key: `(filename placeholder via origin id, row, column)` (spec §4.7).
    fn dedup_key(&self) -> Option<(u32, u32, u32)> {
        self.area.map(|a| (a.position.origin.0, a.position.row, a.position.column))
    }
}

/// spec §6.7: `submit(report)`. Implementations may buffer and print later.
pub trait Log {
    fn submit(&mut self, report: &Report);
}

/// A `Log` that writes the spec §6.8 wire format to any `fmt::Write` sink; used by tests
/// and as the simplest possible standalone implementation (no color, no codespan
/// dependency needed at this layer — `codespan-reporting`-based pretty printing lives in
/// [`crate::report::pretty_print`] for callers that want source-line rendering).
pub struct PlainTextLog<W: fmt::Write> {
    pub sink: W,
}

impl<W: fmt::Write> Log for PlainTextLog<W> {
    fn submit(&mut self, report: &Report) {
        let ty = match report.ty {
            ReportType::Info => "info",
            ReportType::Warning => "warning",
            ReportType::Error => "error",
        };
        let (row, col) = report
            .area
            .map(|a| (a.position.row, a.position.column))
            .unwrap_or((0, 0));
        let code = report
            .code
            .map(|c| format!(" [{c}]"))
            .unwrap_or_default();
        let _ = write!(
            self.sink,
            "{} {} ({}:{}){}: {}",
            report.phase, ty, row, col, code, report.message
        );
        for ctx in &report.context_stack {
            let _ = write!(self.sink, "\n  {ctx}");
        }
        for hint in &report.hints {
            let _ = write!(self.sink, "\n  hint: {}", hint.message);
        }
        let _ = writeln!(self.sink);
    }
}

/// Per-run report handler: deduplicates by `(filename, row, column)`, tracks
/// `has_errors`, and stacks context descriptions prefixed onto the next report (spec
/// §4.7).
pub struct ReportHandler<'a> {
    log: &'a mut dyn Log,
    seen: HashSet<(u32, u32, u32)>,
    context_stack: Vec<String>,
    has_errors: bool,
    error_count: usize,
    warning_count: usize,
}

impl<'a> ReportHandler<'a> {
    pub fn new(log: &'a mut dyn Log) -> ReportHandler<'a> {
        ReportHandler {
            log,
            seen: HashSet::new(),
            context_stack: Vec::new(),
            has_errors: false,
            error_count: 0,
            warning_count: 0,
        }
    }

    pub fn push_context(&mut self, description: impl Into<String>) {
        self.context_stack.push(description.into());
    }

    pub fn pop_context(&mut self) {
        self.context_stack.pop();
    }

    pub fn has_errors(&self) -> bool {
        self.has_errors
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    /// Submits `report`, skipping it if an equivalent report (same position) was already
    /// submitted this run.
    pub fn submit(&mut self, mut report: Report) {
        if let Some(key) = report.dedup_key() {
            if !self.seen.insert(key) {
                return;
            }
        }
        report.context_stack = self.context_stack.clone();
        match report.ty {
            ReportType::Error => {
                self.has_errors = true;
                self.error_count += 1;
            }
            ReportType::Warning => self.warning_count += 1,
            ReportType::Info => {}
        }
        self.log.submit(&report);
    }
}

/// Reconstructs the `line_text`/`caret_marker` pair for `report.area`, for callers that
/// want the full multi-line rendering spec §6.8 mentions ("followed by optional line and
/// caret"). Rebuilds a transient [`SourceBuffer`] from `map`'s retained source text
/// (spec §3.9) rather than requiring the caller to keep the original scanning buffer
/// alive, since by the time reports are rendered the preprocessor/parser are long gone.
pub fn render_with_source_line(report: &Report, map: &SourceMap) -> Option<String> {
    let area = report.area?;
    let origin = map.origin(area.position.origin);
    let (_, text) = map.resolve_text(area.position.origin)?;
    let mut buffer = SourceBuffer::new(text, area.position.origin);
    let marker = buffer.fetch_line_marker(&area);
    Some(format!(
        "{}:{}:{}\n{}\n{}",
        origin.filename, area.position.row, area.position.column, marker.line_text, marker.caret_marker
    ))
}

/// `codespan-reporting`-based pretty printing (spec §6.8's "line and caret" plus a
/// rendered snippet, the way a terminal tool would show it), modeled directly on
/// `ashley::glsl`'s `DiagnosticBuilder`/`DiagnosticSink`/`Files` trio (see DESIGN.md):
/// build a `codespan_reporting::diagnostic::Diagnostic` from a [`Report`] and emit it
/// through `codespan_reporting::term::emit` against a `Files` impl over the module's
/// retained [`SourceMap`]. The (out-of-scope) terminal color layer is the caller's
/// concern — this returns plain, colorless text.
pub mod pretty_print {
    use super::{Report, ReportType};
    use crate::source::{Origin, SourceMap};
    use codespan_reporting::diagnostic::{Diagnostic, Label, LabelStyle, Severity};
    use codespan_reporting::files::{Error as FilesError, Files};
    use codespan_reporting::term::{self, termcolor::Buffer, Config};
    use std::ops::Range;

    struct ReportFiles<'a> {
        map: &'a SourceMap,
    }

    impl<'a> Files<'a> for ReportFiles<'a> {
        type FileId = Origin;
        type Name = &'a str;
        type Source = &'a str;

        fn name(&'a self, id: Origin) -> Result<&'a str, FilesError> {
            Ok(self.map.origin(id).filename.as_str())
        }

        fn source(&'a self, id: Origin) -> Result<&'a str, FilesError> {
            self.map.resolve_text(id).map(|(_, text)| text).ok_or(FilesError::FileMissing)
        }

        fn line_index(&'a self, id: Origin, byte_index: usize) -> Result<usize, FilesError> {
            let text = self.source(id)?;
            let starts: Vec<usize> = codespan_reporting::files::line_starts(text).collect();
            Ok(starts.partition_point(|&start| start <= byte_index).saturating_sub(1))
        }

        fn line_range(&'a self, id: Origin, line_index: usize) -> Result<Range<usize>, FilesError> {
            let text = self.source(id)?;
            let starts: Vec<usize> = codespan_reporting::files::line_starts(text).collect();
            let start = *starts.get(line_index).ok_or(FilesError::LineTooLarge {
                given: line_index,
                max: starts.len(),
            })?;
            let end = starts.get(line_index + 1).copied().unwrap_or(text.len());
            Ok(start..end)
        }
    }

    /// Converts a 1-based `(row, column)` source area (column counted in `char`s, as the
    /// scanner counts them) into a byte range within `text`, for a `codespan` `Label`.
    fn area_byte_range(text: &str, area: &crate::source::SourceArea) -> Range<usize> {
        let line_start = if area.position.row <= 1 {
            0
        } else {
            text.match_indices('\n')
                .nth(area.position.row as usize - 2)
                .map(|(i, _)| i + 1)
                .unwrap_or(text.len())
        };
        let rest = &text[line_start.min(text.len())..];
        let col0 = (area.position.column + area.column_offset).saturating_sub(1) as usize;
        let start = line_start + rest.char_indices().nth(col0).map(|(b, _)| b).unwrap_or(rest.len());
        let after_start = &text[start.min(text.len())..];
        let len = area.length.max(1) as usize;
        let end = start + after_start.char_indices().nth(len).map(|(b, _)| b).unwrap_or(after_start.len());
        start..end
    }

    /// Builds and renders a `Diagnostic` for `report` against `map`'s retained source
    /// text, returning the plain-text rendering `codespan_reporting::term::emit`
    /// produces (source snippet, gutter, carets, notes).
    pub fn render(report: &Report, map: &SourceMap) -> String {
        let severity = match report.ty {
            ReportType::Error => Severity::Error,
            ReportType::Warning => Severity::Warning,
            ReportType::Info => Severity::Note,
        };
        let mut diag = Diagnostic::new(severity).with_message(report.message.clone());
        if let Some(code) = report.code {
            diag.code = Some(code.to_string());
        }
        if let Some(area) = report.area {
            if let Some((_, text)) = map.resolve_text(area.position.origin) {
                let range = area_byte_range(text, &area);
                diag.labels.push(Label {
                    style: LabelStyle::Primary,
                    file_id: area.position.origin,
                    range,
                    message: String::new(),
                });
            }
        }
        diag.notes = report.context_stack.clone();
        diag.notes.extend(report.hints.iter().map(|h| format!("hint: {}", h.message)));

        let files = ReportFiles { map };
        let mut buffer = Buffer::no_color();
        let config = Config::default();
        let _ = term::emit(&mut buffer, &config, &files, &diag);
        String::from_utf8_lossy(buffer.as_slice()).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{Origin, SourcePosition};

    struct CollectLog {
        reports: Vec<Report>,
    }
    impl Log for CollectLog {
        fn submit(&mut self, report: &Report) {
            self.reports.push(report.clone());
        }
    }

    #[test]
    fn dedups_reports_at_the_same_position() {
        let mut log = CollectLog { reports: Vec::new() };
        let mut handler = ReportHandler::new(&mut log);
        let area = SourceArea::point(SourcePosition::new(Origin(0), 4, 1));
        handler.submit(Report::new(ReportType::Error, Phase::Syntax, "a").with_area(area));
        handler.submit(Report::new(ReportType::Error, Phase::Syntax, "b").with_area(area));
        assert_eq!(log.reports.len(), 1);
        assert!(handler.has_errors());
    }

    #[test]
    fn context_stack_is_attached_to_submitted_reports() {
        let mut log = CollectLog { reports: Vec::new() };
        let mut handler = ReportHandler::new(&mut log);
        handler.push_context("in 'function foo':");
        handler.submit(Report::new(ReportType::Warning, Phase::Context, "unused variable 'x'"));
        assert_eq!(log.reports[0].context_stack, vec!["in 'function foo':".to_string()]);
    }

    #[test]
    fn pretty_print_renders_source_snippet() {
        let mut map = SourceMap::new();
        let origin = map.add_origin("t.hlsl", 1, 1);
        map.set_text(origin, "int postion = 1;\n");
        let area = SourceArea::new(SourcePosition::new(origin, 1, 5), 7);
        let report = Report::new(ReportType::Error, Phase::Context, "undeclared identifier 'postion'")
            .with_code(DiagnosticCode::UndeclaredIdentifier)
            .with_area(area)
            .with_hint("did you mean 'position'?");
        let rendered = pretty_print::render(&report, &map);
        assert!(rendered.contains("undeclared identifier"));
        assert!(rendered.contains("postion"));
    }
}
