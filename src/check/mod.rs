use std::ops::Range;

use ariadne::{ColorGenerator, Label, Report, ReportKind, Source};

use crate::{
    parser::ProgramSource,
    runtime::{Fault, FaultKind},
};

#[derive(Debug, Clone)]
pub struct FileSpan {
    pub span: Range<usize>,
    pub path: String,
}

impl FileSpan {
    pub fn new(path: String, span: Range<usize>) -> Self {
        Self { path, span }
    }
}

impl ariadne::Span for FileSpan {
    type SourceId = String;

    fn source(&self) -> &Self::SourceId {
        &self.path
    }

    fn start(&self) -> usize {
        self.span.start
    }

    fn end(&self) -> usize {
        self.span.end
    }
}

fn fault_code(kind: &FaultKind) -> &'static str {
    match kind {
        FaultKind::UndefinedName(_) => "UndefinedName",
        FaultKind::ModuleNotFound(_) => "ModuleNotFound",
        FaultKind::MissingAttribute { .. } => "MissingAttribute",
        FaultKind::Type(_) => "TypeError",
        FaultKind::Value(_) => "ValueError",
        FaultKind::Index { .. } => "IndexError",
        FaultKind::ZeroDivision => "ZeroDivision",
        FaultKind::Overflow => "Overflow",
        FaultKind::RecursionLimit(_) => "RecursionLimit",
        FaultKind::Raised(_) => "Raised",
        FaultKind::Ir(_) => "CaptureError",
        FaultKind::Rewrite(_) => "BuildError",
        FaultKind::Lowering(_) => "LoweringError",
    }
}

/// The user-written line a fault points at in `path`: the provenance of
/// generated code when there is one, the innermost frame in `path`
/// otherwise.
pub fn fault_line(fault: &Fault, path: &str) -> Option<usize> {
    if let Some(cause) = &fault.cause {
        if cause.original_filename() == Some(path) {
            if let Some(line) = cause.original_line() {
                return Some(line);
            }
        }
    }
    fault
        .traceback
        .iter()
        .rev()
        .find(|entry| entry.file == path && entry.line > 0)
        .map(|entry| entry.line)
}

/// Creates a report from a runtime fault.
pub fn fault_report(fault: &Fault, source: &ProgramSource) -> Report<'static, FileSpan> {
    let path = source.path.display().to_string();
    let mut colors = ColorGenerator::new();
    colors.next();

    let lines = source.line_index();
    let span = fault_line(fault, &path).and_then(|line| lines.line_range(line, source.input.len()));
    let filespan = FileSpan::new(path.clone(), span.clone().unwrap_or(0..0));

    let mut report = Report::build(ReportKind::Error, filespan.clone())
        .with_code(fault_code(&fault.kind))
        .with_message(fault.to_string());
    if span.is_some() {
        report = report.with_label(
            Label::new(filespan)
                .with_message("raised here")
                .with_color(colors.next()),
        );
    }
    if let Some(cause) = &fault.cause {
        report = report.with_note(cause.to_string());
    }
    report.finish()
}

pub fn render_fault(fault: &Fault, source: &ProgramSource) {
    let path = source.path.display().to_string();
    if let Err(e) = fault_report(fault, source).eprint((path, Source::from(source.input.clone()))) {
        tracing::error!("failed to print diagnostics: {e}");
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{fault_line, fault_report};
    use crate::{
        parser::ProgramSource,
        runtime::{Fault, TraceEntry},
    };

    #[test]
    fn fault_line_uses_innermost_frame_of_the_file() {
        let mut fault = Fault::value_error("oh no");
        fault.traceback = vec![
            TraceEntry {
                file: "a.cap".into(),
                line: 2,
            },
            TraceEntry {
                file: "b.cap".into(),
                line: 9,
            },
            TraceEntry {
                file: "a.cap".into(),
                line: 4,
            },
        ];
        assert_eq!(fault_line(&fault, "a.cap"), Some(4));
        assert_eq!(fault_line(&fault, "c.cap"), None);
    }

    #[test]
    fn report_renders_message_and_line() {
        let source = ProgramSource::new("x = 1;\ny = z;\n".to_string(), Path::new("a.cap"));
        let mut fault = Fault::value_error("oh no");
        fault.traceback = vec![TraceEntry {
            file: "a.cap".into(),
            line: 2,
        }];
        let mut out = Vec::new();
        fault_report(&fault, &source)
            .write(
                ("a.cap".to_string(), ariadne::Source::from(source.input.clone())),
                &mut out,
            )
            .unwrap();
        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("oh no"));
        assert!(text.contains("ValueError"));
    }
}
